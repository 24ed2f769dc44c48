use crate::cert::delivery::DeliveryInfo;
use crate::utils::errors::{RegistryError, Result};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_STATUS: &str = "New";

/// Opaque record identifier assigned by the persistence backend
pub type CertificateId = String;

/// Today's date in the local timezone, used for creation and delivery stamps
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    pub id: CertificateId,
    pub no: String,
    pub description: String,
    #[serde(default)]
    pub part_no: String,
    #[serde(default)]
    pub serial_no: String,
    #[serde(default = "default_status")]
    pub status: String,
    pub created_date: NaiveDate,
    #[serde(default)]
    pub delivered: bool,
    #[serde(default)]
    pub delivery_info: Option<DeliveryInfo>,
}

fn default_status() -> String {
    DEFAULT_STATUS.to_string()
}

/// Replace each line break (`\r\n`, `\n` or `\r`) with one space, then trim
pub fn single_line(value: &str) -> String {
    value
        .replace("\r\n", " ")
        .replace(['\n', '\r'], " ")
        .trim()
        .to_string()
}

impl Certificate {
    /// Only pending records may be selected for or receive a delivery
    pub fn is_deliverable(&self) -> bool {
        !self.delivered
    }

    pub fn receiver_name(&self) -> Option<&str> {
        self.delivery_info
            .as_ref()
            .map(|info| info.receiver_name.as_str())
    }

    pub fn fields(&self) -> CertificateFields {
        CertificateFields {
            no: self.no.clone(),
            description: self.description.clone(),
            part_no: self.part_no.clone(),
            serial_no: self.serial_no.clone(),
            status: self.status.clone(),
        }
    }

    /// Bring a record read from a backend in line with the delivery invariant:
    /// `delivered` holds exactly when delivery info with a receiver name exists.
    pub fn normalized(mut self) -> Self {
        let has_receiver = self
            .delivery_info
            .as_ref()
            .is_some_and(|info| !info.receiver_name.trim().is_empty());

        if self.delivered && !has_receiver {
            tracing::warn!(
                "Certificate {} is flagged delivered without a receiver, treating as pending",
                self.no
            );
            self.delivered = false;
        }
        if !self.delivered {
            self.delivery_info = None;
        }
        self
    }
}

impl fmt::Display for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.delivered {
            "Delivered"
        } else {
            "Pending"
        };
        write!(
            f,
            "No: {}, Description: {}, Status: {}, {}",
            self.no, self.description, self.status, state
        )
    }
}

/// The editable subset of a certificate
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateFields {
    pub no: String,
    pub description: String,
    #[serde(default)]
    pub part_no: String,
    #[serde(default)]
    pub serial_no: String,
    #[serde(default = "default_status")]
    pub status: String,
}

impl CertificateFields {
    pub fn new(no: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            no: no.into(),
            description: description.into(),
            part_no: String::new(),
            serial_no: String::new(),
            status: DEFAULT_STATUS.to_string(),
        }
    }

    pub fn with_part_no(mut self, part_no: impl Into<String>) -> Self {
        self.part_no = part_no.into();
        self
    }

    pub fn with_serial_no(mut self, serial_no: impl Into<String>) -> Self {
        self.serial_no = serial_no.into();
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    /// Trim every field, fold line breaks into spaces and fall back to the
    /// default status when blank. Stored values then survive a CSV export.
    pub fn normalized(self) -> Self {
        let status = single_line(&self.status);
        Self {
            no: single_line(&self.no),
            description: single_line(&self.description),
            part_no: single_line(&self.part_no),
            serial_no: single_line(&self.serial_no),
            status: if status.is_empty() {
                DEFAULT_STATUS.to_string()
            } else {
                status
            },
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.no.trim().is_empty() || self.description.trim().is_empty() {
            return Err(RegistryError::validation(
                "Please enter at least Number and Description",
            ));
        }
        Ok(())
    }
}

/// Insert payload: a new record is always pending with no delivery info
#[derive(Debug, Clone, PartialEq)]
pub struct NewCertificate {
    pub fields: CertificateFields,
    pub created_date: NaiveDate,
}

impl NewCertificate {
    pub fn new(fields: CertificateFields, created_date: NaiveDate) -> Self {
        Self {
            fields,
            created_date,
        }
    }

    pub fn into_certificate(self, id: CertificateId) -> Certificate {
        Certificate {
            id,
            no: self.fields.no,
            description: self.fields.description,
            part_no: self.fields.part_no,
            serial_no: self.fields.serial_no,
            status: self.fields.status,
            created_date: self.created_date,
            delivered: false,
            delivery_info: None,
        }
    }
}
