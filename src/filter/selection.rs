use crate::cert::{Certificate, CertificateId};
use ordermap::OrderSet;

/// Client-local id sets chosen for a batch action. Never persisted.
///
/// Owned by the presentation layer and handed to registry calls that need it.
#[derive(Debug, Clone, Default)]
pub struct SelectionState {
    print: OrderSet<CertificateId>,
    delivery: OrderSet<CertificateId>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn print(&self) -> &OrderSet<CertificateId> {
        &self.print
    }

    pub fn delivery(&self) -> &OrderSet<CertificateId> {
        &self.delivery
    }

    pub fn is_selected_for_print(&self, id: &str) -> bool {
        self.print.contains(id)
    }

    pub fn is_selected_for_delivery(&self, id: &str) -> bool {
        self.delivery.contains(id)
    }

    /// Returns whether the record is selected afterwards
    pub fn toggle_print(&mut self, cert: &Certificate) -> bool {
        if self.print.remove(&cert.id) {
            false
        } else {
            self.print.insert(cert.id.clone());
            true
        }
    }

    /// Delivered records cannot be selected for delivery
    pub fn toggle_delivery(&mut self, cert: &Certificate) -> bool {
        if self.delivery.remove(&cert.id) {
            return false;
        }
        if !cert.is_deliverable() {
            tracing::debug!("Certificate {} is already delivered, not selectable", cert.no);
            return false;
        }
        self.delivery.insert(cert.id.clone());
        true
    }

    /// Clear the print set if it already holds exactly the filtered records,
    /// otherwise replace it with them
    pub fn toggle_all_print(&mut self, filtered: &[&Certificate]) {
        Self::toggle_all(&mut self.print, filtered.iter().map(|c| &c.id));
    }

    /// Same as `toggle_all_print`, restricted to undelivered records
    pub fn toggle_all_delivery(&mut self, filtered: &[&Certificate]) {
        Self::toggle_all(
            &mut self.delivery,
            filtered
                .iter()
                .filter(|c| c.is_deliverable())
                .map(|c| &c.id),
        );
    }

    fn toggle_all<'a>(
        set: &mut OrderSet<CertificateId>,
        eligible: impl Iterator<Item = &'a CertificateId>,
    ) {
        let eligible: OrderSet<CertificateId> = eligible.cloned().collect();
        let already_all = !set.is_empty()
            && set.len() == eligible.len()
            && eligible.iter().all(|id| set.contains(id));

        if already_all {
            set.clear();
        } else {
            *set = eligible;
        }
    }

    /// Drop an id from both sets
    pub fn remove(&mut self, id: &str) {
        self.print.remove(id);
        self.delivery.remove(id);
    }

    pub fn clear_delivery(&mut self) {
        self.delivery.clear();
    }

    /// Prune ids that vanished after a reload, and delivered records from
    /// the delivery set
    pub fn retain_existing(&mut self, certificates: &[Certificate]) {
        self.print
            .retain(|id| certificates.iter().any(|c| &c.id == id));
        self.delivery.retain(|id| {
            certificates
                .iter()
                .any(|c| &c.id == id && c.is_deliverable())
        });
    }

    /// Print selection resolved against the collection, in selection order
    pub fn selected_for_print<'a>(&self, certificates: &'a [Certificate]) -> Vec<&'a Certificate> {
        self.print
            .iter()
            .filter_map(|id| certificates.iter().find(|c| &c.id == id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::tests::{collection, deliver};

    #[test]
    fn test_toggle_print_any_record() {
        let mut certs = collection();
        deliver(&mut certs[1]);
        let mut selection = SelectionState::new();

        assert!(selection.toggle_print(&certs[1]));
        assert!(selection.is_selected_for_print(&certs[1].id));
        assert!(!selection.toggle_print(&certs[1]));
        assert!(selection.print().is_empty());
    }

    #[test]
    fn test_delivered_record_not_selectable_for_delivery() {
        let mut certs = collection();
        deliver(&mut certs[0]);
        let mut selection = SelectionState::new();

        assert!(!selection.toggle_delivery(&certs[0]));
        assert!(selection.delivery().is_empty());
        assert!(selection.toggle_delivery(&certs[1]));
        assert_eq!(selection.delivery().len(), 1);
    }

    #[test]
    fn test_toggle_all_is_not_additive() {
        let mut certs = collection();
        deliver(&mut certs[0]);
        let filtered: Vec<&Certificate> = certs.iter().collect();
        let mut selection = SelectionState::new();

        selection.toggle_delivery(&certs[2]);
        selection.toggle_all_delivery(&filtered);
        assert_eq!(selection.delivery().len(), certs.len() - 1);
        assert!(!selection.is_selected_for_delivery(&certs[0].id));

        selection.toggle_all_delivery(&filtered);
        assert!(selection.delivery().is_empty());

        selection.toggle_all_print(&filtered);
        assert_eq!(selection.print().len(), certs.len());
        selection.toggle_all_print(&filtered);
        assert!(selection.print().is_empty());
    }

    #[test]
    fn test_retain_existing_prunes_stale_and_delivered() {
        let mut certs = collection();
        let mut selection = SelectionState::new();
        for cert in &certs {
            selection.toggle_print(cert);
            selection.toggle_delivery(cert);
        }

        deliver(&mut certs[0]);
        let removed = certs.remove(1);
        selection.retain_existing(&certs);

        assert!(!selection.is_selected_for_print(&removed.id));
        assert!(selection.is_selected_for_print(&certs[0].id));
        assert!(!selection.is_selected_for_delivery(&certs[0].id));
        assert_eq!(selection.delivery().len(), certs.len() - 1);
    }

    #[test]
    fn test_resolve_keeps_selection_order() {
        let certs = collection();
        let mut selection = SelectionState::new();
        selection.toggle_print(&certs[2]);
        selection.toggle_print(&certs[0]);

        let resolved = selection.selected_for_print(&certs);
        assert_eq!(resolved[0].id, certs[2].id);
        assert_eq!(resolved[1].id, certs[0].id);
    }
}
