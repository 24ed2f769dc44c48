use crate::cert::{Certificate, CertificateFields, CertificateId, DeliveryInfo, NewCertificate};
use crate::store::{CertificateBackend, KeyValueStore};
use crate::utils::errors::{RegistryError, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

const CERTIFICATES_KEY: &str = "certificates";

/// Legacy backend: the whole collection serialized under one key of a local
/// key/value file, newest first.
pub struct LocalBackend {
    store: KeyValueStore,
    lock: Mutex<()>,
}

impl LocalBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            store: KeyValueStore::new(path),
            lock: Mutex::new(()),
        }
    }

    fn guard(&self) -> Result<MutexGuard<'_, ()>> {
        self.lock
            .lock()
            .map_err(|_| RegistryError::Connection("Local store lock poisoned".to_string()))
    }

    fn read_all(&self) -> Result<Vec<Certificate>> {
        match self.store.get(CERTIFICATES_KEY)? {
            Some(value) => Ok(serde_json::from_str(&value)?),
            None => Ok(Vec::new()),
        }
    }

    fn write_all(&self, certificates: &[Certificate]) -> Result<()> {
        self.store
            .set(CERTIFICATES_KEY, serde_json::to_string(certificates)?)
    }

    /// Apply `change` to the record with `id` and persist the collection
    fn modify<F>(&self, id: &str, change: F) -> Result<()>
    where
        F: FnOnce(&mut Certificate),
    {
        let _guard = self.guard()?;
        let mut certificates = self.read_all()?;
        let cert = certificates
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        change(cert);
        self.write_all(&certificates)
    }

    fn generate_id() -> CertificateId {
        let bytes: [u8; 16] = rand::random();
        hex::encode(bytes)
    }
}

#[async_trait]
impl CertificateBackend for LocalBackend {
    async fn list(&self) -> Result<Vec<Certificate>> {
        let _guard = self.guard()?;
        match self.read_all() {
            Ok(certificates) => Ok(certificates),
            Err(e) => {
                tracing::warn!(
                    "No usable data in {}, starting empty: {}",
                    self.store.path().display(),
                    e
                );
                Ok(Vec::new())
            }
        }
    }

    async fn insert(&self, certificates: Vec<NewCertificate>) -> Result<Vec<CertificateId>> {
        let _guard = self.guard()?;
        let mut existing = self.read_all()?;

        let mut ids = Vec::with_capacity(certificates.len());
        let mut inserted = Vec::with_capacity(certificates.len() + existing.len());
        for new_cert in certificates {
            let id = Self::generate_id();
            ids.push(id.clone());
            inserted.push(new_cert.into_certificate(id));
        }
        inserted.append(&mut existing);

        self.write_all(&inserted)?;
        tracing::debug!("Inserted {} certificates into local store", ids.len());
        Ok(ids)
    }

    async fn update_fields(&self, id: &str, fields: &CertificateFields) -> Result<()> {
        self.modify(id, |cert| {
            cert.no = fields.no.clone();
            cert.description = fields.description.clone();
            cert.part_no = fields.part_no.clone();
            cert.serial_no = fields.serial_no.clone();
            cert.status = fields.status.clone();
        })
    }

    async fn update_delivery(
        &self,
        id: &str,
        delivered: bool,
        info: Option<&DeliveryInfo>,
    ) -> Result<()> {
        self.modify(id, |cert| {
            cert.delivered = delivered;
            cert.delivery_info = info.cloned();
        })
    }

    async fn update_delivery_bulk(
        &self,
        ids: &[CertificateId],
        delivered: bool,
        info: Option<&DeliveryInfo>,
    ) -> Result<()> {
        let _guard = self.guard()?;
        let mut certificates = self.read_all()?;

        if let Some(missing) = ids
            .iter()
            .find(|id| !certificates.iter().any(|c| &c.id == *id))
        {
            return Err(RegistryError::NotFound(missing.clone()));
        }

        for cert in certificates.iter_mut().filter(|c| ids.contains(&c.id)) {
            cert.delivered = delivered;
            cert.delivery_info = info.cloned();
        }
        self.write_all(&certificates)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let _guard = self.guard()?;
        let mut certificates = self.read_all()?;
        let before = certificates.len();
        certificates.retain(|c| c.id != id);
        if certificates.len() == before {
            return Err(RegistryError::NotFound(id.to_string()));
        }
        self.write_all(&certificates)
    }

    fn name(&self) -> &'static str {
        "local"
    }
}
