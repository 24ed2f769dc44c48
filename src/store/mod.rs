pub mod kv;
pub mod local;
pub mod rest;

use crate::cert::{Certificate, CertificateFields, CertificateId, DeliveryInfo, NewCertificate};
use crate::utils::errors::Result;
use async_trait::async_trait;

pub use kv::KeyValueStore;
pub use local::LocalBackend;
pub use rest::{RestBackend, RestConfig};

/// The system of record for certificates.
///
/// The registry keeps only a cache; every write goes through a backend and
/// is followed by a full `list()`.
#[async_trait]
pub trait CertificateBackend: Send + Sync {
    /// Every certificate, newest first
    async fn list(&self) -> Result<Vec<Certificate>>;

    /// Insert a batch atomically, returning the assigned ids in input order
    async fn insert(&self, certificates: Vec<NewCertificate>) -> Result<Vec<CertificateId>>;

    async fn update_fields(&self, id: &str, fields: &CertificateFields) -> Result<()>;

    async fn update_delivery(
        &self,
        id: &str,
        delivered: bool,
        info: Option<&DeliveryInfo>,
    ) -> Result<()>;

    /// All ids are written or none are
    async fn update_delivery_bulk(
        &self,
        ids: &[CertificateId],
        delivered: bool,
        info: Option<&DeliveryInfo>,
    ) -> Result<()>;

    async fn delete(&self, id: &str) -> Result<()>;

    /// Short label for logs
    fn name(&self) -> &'static str;
}
