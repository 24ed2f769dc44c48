use crate::cert::model::{today, CertificateId};
use crate::utils::errors::{RegistryError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// Proof of receipt captured when a certificate is handed over
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryInfo {
    pub receiver_name: String,
    #[serde(default)]
    pub receiver_position: String,
    #[serde(default)]
    pub receiver_signature: String,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub delivery_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: String,
}

/// Form inputs leave the date blank rather than omitting it
fn deserialize_optional_date<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

impl DeliveryInfo {
    /// Delivery info dated today with only the receiver filled in
    pub fn new(receiver_name: impl Into<String>) -> Self {
        Self {
            receiver_name: receiver_name.into(),
            receiver_position: String::new(),
            receiver_signature: String::new(),
            delivery_date: Some(today()),
            notes: String::new(),
        }
    }

    pub fn with_position(mut self, position: impl Into<String>) -> Self {
        self.receiver_position = position.into();
        self
    }

    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.receiver_signature = signature.into();
        self
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.delivery_date = Some(date);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.receiver_name.trim().is_empty() {
            return Err(RegistryError::validation("Please enter receiver name"));
        }
        Ok(())
    }

    pub fn delivery_date_string(&self) -> String {
        self.delivery_date
            .map(|date| date.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    }
}

/// Which records a delivery applies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryTarget {
    Single(CertificateId),
    Bulk(Vec<CertificateId>),
}

impl DeliveryTarget {
    /// One id becomes a single delivery, anything else a bulk delivery
    pub fn from_ids(mut ids: Vec<CertificateId>) -> Self {
        if ids.len() == 1 {
            Self::Single(ids.remove(0))
        } else {
            Self::Bulk(ids)
        }
    }

    pub fn ids(&self) -> Vec<&CertificateId> {
        match self {
            Self::Single(id) => vec![id],
            Self::Bulk(ids) => ids.iter().collect(),
        }
    }
}

/// Outcome of a delivery: which targets changed and which were already delivered
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: Vec<CertificateId>,
    pub skipped: Vec<CertificateId>,
}

impl DeliveryReport {
    pub fn affected(&self) -> usize {
        self.delivered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.delivered.is_empty()
    }
}
