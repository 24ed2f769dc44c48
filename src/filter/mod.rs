pub mod search;
pub mod selection;
pub mod view;

use crate::cert::Certificate;

pub use search::{CertificateFilter, SearchField, StatusFilter};
pub use selection::SelectionState;
pub use view::{Page, PageSize, ViewState};

/// Counts over the full, unfiltered collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub total: usize,
    pub delivered: usize,
    pub pending: usize,
}

impl Stats {
    pub fn compute(certificates: &[Certificate]) -> Self {
        let delivered = certificates.iter().filter(|c| c.delivered).count();
        Self {
            total: certificates.len(),
            delivered,
            pending: certificates.len() - delivered,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::cert::{CertificateFields, DeliveryInfo, NewCertificate};
    use chrono::NaiveDate;

    fn make(id: &str, fields: CertificateFields) -> Certificate {
        NewCertificate::new(fields, NaiveDate::from_ymd_opt(2026, 3, 1).unwrap())
            .into_certificate(id.to_string())
    }

    pub(crate) fn collection() -> Vec<Certificate> {
        vec![
            make(
                "1",
                CertificateFields::new("CERT-001", "Engine Part")
                    .with_part_no("PART-123")
                    .with_serial_no("SN-1"),
            ),
            make(
                "2",
                CertificateFields::new("CERT-002", "Landing gear")
                    .with_part_no("PART-124")
                    .with_serial_no("SN-2"),
            ),
            make(
                "3",
                CertificateFields::new("CERT-003", "Engine mount").with_serial_no("SN-3"),
            ),
            make(
                "4",
                CertificateFields::new("CERT-004", "Cabin seat")
                    .with_part_no("P-9")
                    .with_serial_no("SN-4"),
            ),
        ]
    }

    pub(crate) fn numbered(count: usize) -> Vec<Certificate> {
        (1..=count)
            .map(|n| {
                make(
                    &n.to_string(),
                    CertificateFields::new(format!("CERT-{n:03}"), format!("Item {n}")),
                )
            })
            .collect()
    }

    pub(crate) fn deliver(cert: &mut Certificate) {
        cert.delivered = true;
        cert.delivery_info = Some(DeliveryInfo::new("J. Doe"));
    }

    #[test]
    fn test_stats_from_full_collection() {
        let mut certs = collection();
        assert_eq!(
            Stats::compute(&certs),
            Stats {
                total: 4,
                delivered: 0,
                pending: 4
            }
        );

        deliver(&mut certs[1]);
        let stats = Stats::compute(&certs);
        assert_eq!((stats.delivered, stats.pending), (1, 3));
        assert_eq!(Stats::compute(&[]), Stats::default());
    }
}
