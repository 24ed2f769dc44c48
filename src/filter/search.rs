use crate::cert::Certificate;
use std::fmt;
use std::str::FromStr;

/// Which text field a search term is matched against
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchField {
    #[default]
    All,
    No,
    Description,
    PartNo,
    SerialNo,
}

impl FromStr for SearchField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(Self::All),
            "no" | "number" => Ok(Self::No),
            "description" => Ok(Self::Description),
            "partno" | "part_no" | "part" => Ok(Self::PartNo),
            "serialno" | "serial_no" | "serial" => Ok(Self::SerialNo),
            _ => Err(format!("Invalid search field: {s}")),
        }
    }
}

impl fmt::Display for SearchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::All => "all",
            Self::No => "no",
            Self::Description => "description",
            Self::PartNo => "partNo",
            Self::SerialNo => "serialNo",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Pending,
    Delivered,
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(Self::All),
            "pending" => Ok(Self::Pending),
            "delivered" => Ok(Self::Delivered),
            _ => Err(format!("Invalid status filter: {s}")),
        }
    }
}

impl StatusFilter {
    pub fn matches(&self, cert: &Certificate) -> bool {
        match self {
            Self::All => true,
            Self::Pending => !cert.delivered,
            Self::Delivered => cert.delivered,
        }
    }
}

/// Search term, field and status filter combined with logical AND
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CertificateFilter {
    pub search_term: String,
    pub search_field: SearchField,
    pub status: StatusFilter,
}

impl CertificateFilter {
    pub fn new(search_term: impl Into<String>, field: SearchField, status: StatusFilter) -> Self {
        Self {
            search_term: search_term.into(),
            search_field: field,
            status,
        }
    }

    pub fn matches(&self, cert: &Certificate) -> bool {
        self.matches_search(cert) && self.status.matches(cert)
    }

    fn matches_search(&self, cert: &Certificate) -> bool {
        let needle = self.search_term.to_lowercase();
        let contains = |value: &str| value.to_lowercase().contains(&needle);

        match self.search_field {
            SearchField::All => {
                contains(&cert.no)
                    || contains(&cert.description)
                    || contains(&cert.part_no)
                    || contains(&cert.serial_no)
            }
            SearchField::No => contains(&cert.no),
            SearchField::Description => contains(&cert.description),
            SearchField::PartNo => contains(&cert.part_no),
            SearchField::SerialNo => contains(&cert.serial_no),
        }
    }

    /// Linear scan preserving collection order
    pub fn apply<'a>(&self, certificates: &'a [Certificate]) -> Vec<&'a Certificate> {
        certificates.iter().filter(|c| self.matches(c)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::tests::{collection, deliver};

    #[test]
    fn test_search_all_fields_case_insensitive() {
        let certs = collection();
        let filter = CertificateFilter::new("sn-2", SearchField::All, StatusFilter::All);
        let found = filter.apply(&certs);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].no, "CERT-002");

        let filter = CertificateFilter::new("ENGINE", SearchField::All, StatusFilter::All);
        assert_eq!(filter.apply(&certs).len(), 2);
    }

    #[test]
    fn test_search_single_field() {
        let certs = collection();
        let by_no = CertificateFilter::new("cert-003", SearchField::No, StatusFilter::All);
        assert_eq!(by_no.apply(&certs).len(), 1);

        let by_description =
            CertificateFilter::new("cert-003", SearchField::Description, StatusFilter::All);
        assert!(by_description.apply(&certs).is_empty());
    }

    #[test]
    fn test_status_filter_and_search_combine() {
        let mut certs = collection();
        deliver(&mut certs[0]);

        let pending = CertificateFilter::new("", SearchField::All, StatusFilter::Pending);
        assert_eq!(pending.apply(&certs).len(), certs.len() - 1);

        let delivered_engine =
            CertificateFilter::new("engine", SearchField::All, StatusFilter::Delivered);
        let found = delivered_engine.apply(&certs);
        assert_eq!(found.len(), 1);
        assert!(found[0].delivered);
    }

    #[test]
    fn test_filter_is_idempotent() {
        let certs = collection();
        let filter = CertificateFilter::new("part", SearchField::PartNo, StatusFilter::All);
        let first: Vec<_> = filter.apply(&certs).into_iter().cloned().collect();
        let second: Vec<_> = filter.apply(&first).into_iter().cloned().collect();
        assert_eq!(first, second);
        assert_eq!(filter.apply(&certs), filter.apply(&certs));
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("partNo".parse::<SearchField>(), Ok(SearchField::PartNo));
        assert_eq!("Delivered".parse::<StatusFilter>(), Ok(StatusFilter::Delivered));
        assert!("bogus".parse::<SearchField>().is_err());
    }
}
