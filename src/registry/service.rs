use crate::cert::{
    today, Certificate, CertificateFields, CertificateId, DeliveryInfo, DeliveryReport,
    DeliveryTarget, NewCertificate,
};
use crate::csv;
use crate::filter::{SelectionState, Stats};
use crate::registry::busy::BusyFlag;
use crate::store::CertificateBackend;
use crate::utils::errors::{RegistryError, Result};
use std::sync::{RwLock, RwLockReadGuard};

/// Caller's answer to an "are you sure?" prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Declined,
}

impl From<bool> for Confirmation {
    fn from(confirmed: bool) -> Self {
        if confirmed {
            Self::Confirmed
        } else {
            Self::Declined
        }
    }
}

/// Record store: the only mutator of certificates.
///
/// The in-memory collection is a cache of the backend, rebuilt by a full
/// reload after every successful write. A failed call leaves the cache as the
/// last successful load produced it.
pub struct CertificateRegistry {
    backend: Box<dyn CertificateBackend>,
    certificates: RwLock<Vec<Certificate>>,
    busy: BusyFlag,
}

impl CertificateRegistry {
    pub fn new(backend: Box<dyn CertificateBackend>) -> Self {
        Self {
            backend,
            certificates: RwLock::new(Vec::new()),
            busy: BusyFlag::default(),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.is_busy()
    }

    fn cache(&self) -> RwLockReadGuard<'_, Vec<Certificate>> {
        self.certificates
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Snapshot of the cached collection, newest first
    pub fn certificates(&self) -> Vec<Certificate> {
        self.cache().clone()
    }

    pub fn get(&self, id: &str) -> Option<Certificate> {
        self.cache().iter().find(|c| c.id == id).cloned()
    }

    pub fn stats(&self) -> Stats {
        Stats::compute(&self.cache())
    }

    /// Fetch the whole collection from the backend
    pub async fn load(&self) -> Result<usize> {
        let _guard = self.busy.try_acquire()?;
        self.reload().await
    }

    async fn reload(&self) -> Result<usize> {
        let certificates: Vec<Certificate> = match self.backend.list().await {
            Ok(certificates) => certificates.into_iter().map(Certificate::normalized).collect(),
            Err(e) => {
                tracing::error!("Error loading certificates: {}", e);
                return Err(e);
            }
        };

        let count = certificates.len();
        *self
            .certificates
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = certificates;
        tracing::debug!("Loaded {} certificates from {} backend", count, self.backend_name());
        Ok(count)
    }

    pub async fn create(&self, fields: CertificateFields) -> Result<CertificateId> {
        fields.validate()?;
        let fields = fields.normalized();
        let _guard = self.busy.try_acquire()?;

        let ids = self
            .backend
            .insert(vec![NewCertificate::new(fields, today())])
            .await
            .inspect_err(|e| tracing::error!("Error adding certificate: {}", e))?;
        let id = ids.into_iter().next().ok_or_else(|| {
            RegistryError::Connection("Backend did not return an id for the new record".to_string())
        })?;

        tracing::info!("Certificate added: {}", id);
        self.reload().await?;
        Ok(id)
    }

    /// Edit the five editable fields; delivery state is never touched
    pub async fn update(&self, id: &str, fields: CertificateFields) -> Result<()> {
        fields.validate()?;
        let fields = fields.normalized();
        let _guard = self.busy.try_acquire()?;

        self.backend
            .update_fields(id, &fields)
            .await
            .inspect_err(|e| tracing::error!("Error updating certificate {}: {}", id, e))?;
        tracing::info!("Certificate updated: {}", id);
        self.reload().await?;
        Ok(())
    }

    /// Returns `false` without touching anything when the caller declined
    pub async fn delete(
        &self,
        id: &str,
        confirmation: Confirmation,
        selection: &mut SelectionState,
    ) -> Result<bool> {
        if confirmation == Confirmation::Declined {
            tracing::debug!("Delete of {} declined", id);
            return Ok(false);
        }
        let _guard = self.busy.try_acquire()?;

        self.backend
            .delete(id)
            .await
            .inspect_err(|e| tracing::error!("Error deleting certificate {}: {}", id, e))?;
        selection.remove(id);
        tracing::info!("Certificate deleted: {}", id);
        self.reload().await?;
        selection.retain_existing(&self.cache());
        Ok(true)
    }

    /// Mark the targets delivered. Records already delivered are skipped;
    /// an unknown id is an error for a single delivery and skipped in bulk.
    pub async fn deliver(
        &self,
        target: DeliveryTarget,
        info: DeliveryInfo,
    ) -> Result<DeliveryReport> {
        info.validate()?;
        let _guard = self.busy.try_acquire()?;

        let report = self.plan_delivery(&target)?;
        if report.is_empty() {
            tracing::info!(
                "Nothing to deliver, {} target(s) already delivered or missing",
                report.skipped.len()
            );
            return Ok(report);
        }

        let written = match &target {
            DeliveryTarget::Single(id) => self.backend.update_delivery(id, true, Some(&info)).await,
            DeliveryTarget::Bulk(_) => {
                self.backend
                    .update_delivery_bulk(&report.delivered, true, Some(&info))
                    .await
            }
        };
        written.inspect_err(|e| tracing::error!("Error delivering certificates: {}", e))?;

        tracing::info!(
            "Delivered {} certificate(s) to {}",
            report.affected(),
            info.receiver_name
        );
        self.reload().await?;
        Ok(report)
    }

    fn plan_delivery(&self, target: &DeliveryTarget) -> Result<DeliveryReport> {
        let cache = self.cache();
        let mut report = DeliveryReport::default();

        for id in target.ids() {
            match cache.iter().find(|c| &c.id == id) {
                Some(cert) if cert.is_deliverable() => {
                    if !report.delivered.contains(id) {
                        report.delivered.push(id.clone());
                    }
                }
                Some(_) => report.skipped.push(id.clone()),
                None if matches!(target, DeliveryTarget::Single(_)) => {
                    return Err(RegistryError::NotFound(id.clone()));
                }
                None => {
                    tracing::warn!("Certificate {} no longer exists, skipping", id);
                    report.skipped.push(id.clone());
                }
            }
        }
        Ok(report)
    }

    /// Bulk-deliver the delivery selection and clear it on success
    pub async fn deliver_selection(
        &self,
        info: DeliveryInfo,
        selection: &mut SelectionState,
    ) -> Result<DeliveryReport> {
        let ids: Vec<CertificateId> = selection.delivery().iter().cloned().collect();
        if ids.is_empty() {
            return Err(RegistryError::validation(
                "Please select undelivered certificates",
            ));
        }

        let report = self.deliver(DeliveryTarget::Bulk(ids), info).await?;
        selection.clear_delivery();
        selection.retain_existing(&self.cache());
        Ok(report)
    }

    /// Clear delivered flag and delivery info together
    pub async fn undo_delivery(&self, id: &str) -> Result<()> {
        let _guard = self.busy.try_acquire()?;

        self.backend
            .update_delivery(id, false, None)
            .await
            .inspect_err(|e| tracing::error!("Error undoing delivery of {}: {}", id, e))?;
        tracing::info!("Delivery undone: {}", id);
        self.reload().await?;
        Ok(())
    }

    /// Import a CSV text blob as new pending records; returns how many
    pub async fn import_csv(&self, text: &str) -> Result<usize> {
        let certificates = csv::decode_import(text, today())?;
        let count = certificates.len();
        let _guard = self.busy.try_acquire()?;

        self.backend
            .insert(certificates)
            .await
            .inspect_err(|e| tracing::error!("Error importing certificates: {}", e))?;
        tracing::info!("Imported {} certificate(s)", count);
        self.reload().await?;
        Ok(count)
    }

    /// CSV of the print selection, or of the whole collection when nothing
    /// is selected
    pub fn export_csv(&self, selection: &SelectionState) -> Result<(String, usize)> {
        let cache = self.cache();
        let records: Vec<&Certificate> = if selection.print().is_empty() {
            cache.iter().collect()
        } else {
            selection.selected_for_print(&cache)
        };

        if records.is_empty() {
            return Err(RegistryError::validation("No certificates to export"));
        }
        Ok((csv::encode_certificates(&records), records.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{SearchField, StatusFilter, ViewState};
    use crate::store::LocalBackend;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    /// Local backend whose reads or writes can be switched to fail
    struct FlakyBackend {
        inner: LocalBackend,
        fail_list: Arc<AtomicBool>,
        fail_write: Arc<AtomicBool>,
    }

    impl FlakyBackend {
        fn check_write(&self) -> Result<()> {
            if self.fail_write.load(Ordering::SeqCst) {
                return Err(RegistryError::Connection("write rejected".to_string()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl CertificateBackend for FlakyBackend {
        async fn list(&self) -> Result<Vec<Certificate>> {
            if self.fail_list.load(Ordering::SeqCst) {
                return Err(RegistryError::Connection("unreachable".to_string()));
            }
            self.inner.list().await
        }

        async fn insert(&self, certificates: Vec<NewCertificate>) -> Result<Vec<CertificateId>> {
            self.check_write()?;
            self.inner.insert(certificates).await
        }

        async fn update_fields(&self, id: &str, fields: &CertificateFields) -> Result<()> {
            self.check_write()?;
            self.inner.update_fields(id, fields).await
        }

        async fn update_delivery(
            &self,
            id: &str,
            delivered: bool,
            info: Option<&DeliveryInfo>,
        ) -> Result<()> {
            self.check_write()?;
            self.inner.update_delivery(id, delivered, info).await
        }

        async fn update_delivery_bulk(
            &self,
            ids: &[CertificateId],
            delivered: bool,
            info: Option<&DeliveryInfo>,
        ) -> Result<()> {
            self.check_write()?;
            self.inner.update_delivery_bulk(ids, delivered, info).await
        }

        async fn delete(&self, id: &str) -> Result<()> {
            self.check_write()?;
            self.inner.delete(id).await
        }

        fn name(&self) -> &'static str {
            "flaky"
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        registry: CertificateRegistry,
        fail_list: Arc<AtomicBool>,
        fail_write: Arc<AtomicBool>,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let fail_list = Arc::new(AtomicBool::new(false));
        let fail_write = Arc::new(AtomicBool::new(false));
        let backend = FlakyBackend {
            inner: LocalBackend::new(dir.path().join("store.json")),
            fail_list: fail_list.clone(),
            fail_write: fail_write.clone(),
        };
        Fixture {
            _dir: dir,
            registry: CertificateRegistry::new(Box::new(backend)),
            fail_list,
            fail_write,
        }
    }

    async fn add(registry: &CertificateRegistry, no: &str) -> CertificateId {
        registry
            .create(
                CertificateFields::new(no, format!("{no} description"))
                    .with_part_no(format!("P-{no}"))
                    .with_serial_no(format!("SN-{no}")),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_deliver_undo_scenario() {
        let f = fixture();
        let id = f
            .registry
            .create(CertificateFields::new("CERT-001", "Engine Part"))
            .await
            .unwrap();

        let stats = f.registry.stats();
        assert_eq!((stats.total, stats.pending), (1, 1));
        let cert = f.registry.get(&id).unwrap();
        assert_eq!(cert.created_date, today());
        assert_eq!(cert.status, "New");

        let report = f
            .registry
            .deliver(DeliveryTarget::Single(id.clone()), DeliveryInfo::new("J. Doe"))
            .await
            .unwrap();
        assert_eq!(report.delivered, vec![id.clone()]);
        let stats = f.registry.stats();
        assert_eq!((stats.delivered, stats.pending), (1, 0));
        assert_eq!(f.registry.get(&id).unwrap().receiver_name(), Some("J. Doe"));

        f.registry.undo_delivery(&id).await.unwrap();
        assert_eq!(f.registry.stats().pending, 1);
        let cert = f.registry.get(&id).unwrap();
        assert!(!cert.delivered);
        assert!(cert.delivery_info.is_none());
    }

    #[tokio::test]
    async fn test_invalid_create_is_noop() {
        let f = fixture();
        add(&f.registry, "CERT-001").await;

        let err = f
            .registry
            .create(CertificateFields::new("CERT-002", ""))
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(f.registry.stats().total, 1);

        f.registry.load().await.unwrap();
        assert_eq!(f.registry.stats().total, 1);
    }

    #[tokio::test]
    async fn test_update_keeps_delivery_and_created_date() {
        let f = fixture();
        let id = add(&f.registry, "CERT-001").await;
        f.registry
            .deliver(DeliveryTarget::Single(id.clone()), DeliveryInfo::new("J. Doe"))
            .await
            .unwrap();
        let before = f.registry.get(&id).unwrap();

        f.registry
            .update(
                &id,
                CertificateFields::new("CERT-001A", "Engine Part").with_status("Active"),
            )
            .await
            .unwrap();

        let after = f.registry.get(&id).unwrap();
        assert_eq!(after.no, "CERT-001A");
        assert_eq!(after.status, "Active");
        assert_eq!(after.created_date, before.created_date);
        assert_eq!(after.delivery_info, before.delivery_info);
        assert!(after.delivered);

        assert!(f
            .registry
            .update(&id, CertificateFields::new("", "x"))
            .await
            .unwrap_err()
            .is_validation());
    }

    #[tokio::test]
    async fn test_delete_requires_confirmation_and_clears_selection() {
        let f = fixture();
        let id = add(&f.registry, "CERT-001").await;
        let cert = f.registry.get(&id).unwrap();

        let mut selection = SelectionState::new();
        selection.toggle_print(&cert);
        selection.toggle_delivery(&cert);

        let deleted = f
            .registry
            .delete(&id, Confirmation::Declined, &mut selection)
            .await
            .unwrap();
        assert!(!deleted);
        assert_eq!(f.registry.stats().total, 1);
        assert!(selection.is_selected_for_print(&id));

        let deleted = f
            .registry
            .delete(&id, Confirmation::Confirmed, &mut selection)
            .await
            .unwrap();
        assert!(deleted);
        assert_eq!(f.registry.stats().total, 0);
        assert!(selection.print().is_empty());
        assert!(selection.delivery().is_empty());

        assert!(matches!(
            f.registry
                .delete(&id, Confirmation::Confirmed, &mut selection)
                .await,
            Err(RegistryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_bulk_delivery_skips_already_delivered() {
        let f = fixture();
        let a = add(&f.registry, "A").await;
        let b = add(&f.registry, "B").await;
        let c = add(&f.registry, "C").await;

        let first = DeliveryInfo::new("First Receiver").with_position("Clerk");
        f.registry
            .deliver(DeliveryTarget::Single(b.clone()), first.clone())
            .await
            .unwrap();

        let second = DeliveryInfo::new("J. Doe").with_notes("batch");
        let report = f
            .registry
            .deliver(
                DeliveryTarget::Bulk(vec![a.clone(), b.clone(), c.clone()]),
                second.clone(),
            )
            .await
            .unwrap();

        assert_eq!(report.affected(), 2);
        assert_eq!(report.skipped, vec![b.clone()]);
        assert_eq!(f.registry.get(&a).unwrap().delivery_info, Some(second.clone()));
        assert_eq!(f.registry.get(&c).unwrap().delivery_info, Some(second));
        assert_eq!(f.registry.get(&b).unwrap().delivery_info, Some(first));
    }

    #[tokio::test]
    async fn test_delivery_validation_and_zero_affected() {
        let f = fixture();
        let id = add(&f.registry, "A").await;

        let err = f
            .registry
            .deliver(DeliveryTarget::Single(id.clone()), DeliveryInfo::new(" "))
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(f.registry.stats().delivered, 0);

        f.registry
            .deliver(DeliveryTarget::Single(id.clone()), DeliveryInfo::new("J. Doe"))
            .await
            .unwrap();
        let report = f
            .registry
            .deliver(DeliveryTarget::Bulk(vec![id.clone()]), DeliveryInfo::new("Other"))
            .await
            .unwrap();
        assert_eq!(report.affected(), 0);
        assert_eq!(f.registry.get(&id).unwrap().receiver_name(), Some("J. Doe"));

        assert!(matches!(
            f.registry
                .deliver(
                    DeliveryTarget::Single("missing".to_string()),
                    DeliveryInfo::new("J. Doe")
                )
                .await,
            Err(RegistryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_deliver_selection_clears_delivery_set() {
        let f = fixture();
        add(&f.registry, "A").await;
        add(&f.registry, "B").await;
        let certs = f.registry.certificates();

        let mut selection = SelectionState::new();
        assert!(f
            .registry
            .deliver_selection(DeliveryInfo::new("J. Doe"), &mut selection)
            .await
            .unwrap_err()
            .is_validation());

        let filtered: Vec<&Certificate> = certs.iter().collect();
        selection.toggle_all_delivery(&filtered);
        let report = f
            .registry
            .deliver_selection(DeliveryInfo::new("J. Doe"), &mut selection)
            .await
            .unwrap();
        assert_eq!(report.affected(), 2);
        assert!(selection.delivery().is_empty());
        assert_eq!(f.registry.stats().delivered, 2);
    }

    #[tokio::test]
    async fn test_deliver_selection_prunes_stale_print_ids() {
        let f = fixture();
        let a = add(&f.registry, "A").await;
        let kept = f.registry.get(&a).unwrap();
        let mut stale = kept.clone();
        stale.id = "gone".to_string();

        let mut selection = SelectionState::new();
        selection.toggle_print(&kept);
        selection.toggle_print(&stale);
        selection.toggle_delivery(&kept);

        f.registry
            .deliver_selection(DeliveryInfo::new("J. Doe"), &mut selection)
            .await
            .unwrap();
        assert!(selection.is_selected_for_print(&a));
        assert!(!selection.is_selected_for_print("gone"));
        assert!(selection.delivery().is_empty());
    }

    #[tokio::test]
    async fn test_failed_load_keeps_previous_collection() {
        let f = fixture();
        add(&f.registry, "A").await;

        f.fail_list.store(true, Ordering::SeqCst);
        assert!(matches!(
            f.registry.load().await,
            Err(RegistryError::Connection(_))
        ));
        assert_eq!(f.registry.stats().total, 1);
        assert!(!f.registry.is_busy());
    }

    #[tokio::test]
    async fn test_failed_writes_propagate_and_release_busy() {
        let f = fixture();
        let a = add(&f.registry, "A").await;

        f.fail_write.store(true, Ordering::SeqCst);
        assert!(matches!(
            f.registry.create(CertificateFields::new("B", "second")).await,
            Err(RegistryError::Connection(_))
        ));
        assert!(matches!(
            f.registry
                .deliver(DeliveryTarget::Single(a.clone()), DeliveryInfo::new("J. Doe"))
                .await,
            Err(RegistryError::Connection(_))
        ));
        let mut selection = SelectionState::new();
        assert!(f
            .registry
            .delete(&a, Confirmation::Confirmed, &mut selection)
            .await
            .is_err());
        assert!(!f.registry.is_busy());

        let stats = f.registry.stats();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.pending, 1);
    }

    #[tokio::test]
    async fn test_busy_registry_rejects_operations() {
        let f = fixture();
        let _guard = f.registry.busy.try_acquire().unwrap();

        assert!(matches!(
            f.registry.create(CertificateFields::new("A", "B")).await,
            Err(RegistryError::Busy)
        ));
        assert!(matches!(f.registry.load().await, Err(RegistryError::Busy)));
        assert_eq!(f.registry.stats().total, 0);
    }

    #[tokio::test]
    async fn test_export_import_round_trip() {
        let f = fixture();
        let a = add(&f.registry, "A").await;
        add(&f.registry, "B, \"quoted\"").await;
        f.registry
            .create(CertificateFields::new("CERT-1", "line one\nline two"))
            .await
            .unwrap();
        f.registry
            .update(
                &a,
                CertificateFields::new("A", "A description").with_status("Active"),
            )
            .await
            .unwrap();
        f.registry
            .deliver(DeliveryTarget::Single(a.clone()), DeliveryInfo::new("J. Doe"))
            .await
            .unwrap();

        let originals = f.registry.certificates();
        let (csv_text, count) = f.registry.export_csv(&SelectionState::new()).unwrap();
        assert_eq!(count, 3);

        let g = fixture();
        assert_eq!(g.registry.import_csv(&csv_text).await.unwrap(), 3);
        let imported = g.registry.certificates();

        let mut expected: Vec<CertificateFields> = originals.iter().map(|c| c.fields()).collect();
        let mut actual: Vec<CertificateFields> = imported.iter().map(|c| c.fields()).collect();
        expected.sort_by(|x, y| x.no.cmp(&y.no));
        actual.sort_by(|x, y| x.no.cmp(&y.no));
        assert_eq!(expected, actual);
        assert!(actual.iter().any(|x| x.description == "line one line two"));

        assert!(imported.iter().all(|c| !c.delivered && c.delivery_info.is_none()));
        assert!(imported
            .iter()
            .all(|c| originals.iter().all(|o| o.id != c.id)));
    }

    #[tokio::test]
    async fn test_export_uses_print_selection() {
        let f = fixture();
        add(&f.registry, "A").await;
        let b = add(&f.registry, "B").await;

        let mut selection = SelectionState::new();
        selection.toggle_print(&f.registry.get(&b).unwrap());
        let (csv_text, count) = f.registry.export_csv(&selection).unwrap();
        assert_eq!(count, 1);
        assert!(csv_text.contains("\"B\""));
        assert!(!csv_text.contains("\"A\""));

        let empty = fixture();
        assert!(empty
            .registry
            .export_csv(&SelectionState::new())
            .unwrap_err()
            .is_validation());
    }

    #[tokio::test]
    async fn test_import_without_description_leaves_collection() {
        let f = fixture();
        add(&f.registry, "A").await;

        let err = f
            .registry
            .import_csv("Certificate No.,Part No.\n\"CERT-9\",\"P-1\"\n")
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(f.registry.stats().total, 1);
    }

    #[tokio::test]
    async fn test_view_over_registry_snapshot() {
        let f = fixture();
        for no in ["CERT-001", "CERT-002", "CERT-003"] {
            add(&f.registry, no).await;
        }
        let first = f.registry.certificates()[2].id.clone();
        f.registry
            .deliver(DeliveryTarget::Single(first), DeliveryInfo::new("J. Doe"))
            .await
            .unwrap();

        let certs = f.registry.certificates();
        assert_eq!(certs[0].no, "CERT-003");

        let mut view = ViewState::default();
        view.set_status_filter(StatusFilter::Pending);
        view.set_search_field(SearchField::SerialNo);
        view.set_search_term("sn-cert");
        assert_eq!(view.filtered(&certs).len(), 2);
    }
}
