use crate::cert::model::Certificate;
use crate::utils::output::GetColumnValue;
use std::str::FromStr;

pub const COLUMN_NAMES: [&str; 11] = [
    "id",
    "no",
    "description",
    "part_no",
    "serial_no",
    "status",
    "created",
    "delivered",
    "receiver",
    "position",
    "delivery_date",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertificateColumn {
    Id,
    No,
    Description,
    PartNo,
    SerialNo,
    Status,
    Created,
    Delivered,
    Receiver,
    Position,
    DeliveryDate,
}

impl FromStr for CertificateColumn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "id" => Ok(Self::Id),
            "no" | "number" => Ok(Self::No),
            "description" | "desc" => Ok(Self::Description),
            "part_no" | "part" => Ok(Self::PartNo),
            "serial_no" | "serial" => Ok(Self::SerialNo),
            "status" => Ok(Self::Status),
            "created" | "created_date" => Ok(Self::Created),
            "delivered" | "d" => Ok(Self::Delivered),
            "receiver" | "receiver_name" => Ok(Self::Receiver),
            "position" | "receiver_position" => Ok(Self::Position),
            "delivery_date" => Ok(Self::DeliveryDate),
            _ => Err(format!("Invalid column: {s}")),
        }
    }
}

impl CertificateColumn {
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::Id,
            Self::No,
            Self::Description,
            Self::Status,
            Self::Created,
            Self::Delivered,
            Self::Receiver,
        ]
    }

    /// Parse a comma-separated column list; a leading `+` appends to the defaults
    pub fn parse_list(columns: Option<&str>) -> Result<Vec<Self>, String> {
        let Some(columns) = columns else {
            return Ok(Self::defaults());
        };

        let (mut result, list) = match columns.strip_prefix('+') {
            Some(stripped) => (Self::defaults(), stripped),
            None => (Vec::new(), columns),
        };

        for name in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            result.push(name.parse()?);
        }
        Ok(result)
    }

    pub fn header(&self) -> &'static str {
        match self {
            Self::Id => "ID",
            Self::No => "Certificate No.",
            Self::Description => "Description",
            Self::PartNo => "Part No.",
            Self::SerialNo => "Serial No.",
            Self::Status => "Status",
            Self::Created => "Created",
            Self::Delivered => "D",
            Self::Receiver => "Receiver",
            Self::Position => "Position",
            Self::DeliveryDate => "Delivery Date",
        }
    }
}

impl GetColumnValue for Certificate {
    fn get_column_value(&self, column: &CertificateColumn) -> String {
        let info = self.delivery_info.as_ref();
        match column {
            CertificateColumn::Id => self.id.clone(),
            CertificateColumn::No => self.no.clone(),
            CertificateColumn::Description => self.description.clone(),
            CertificateColumn::PartNo => self.part_no.clone(),
            CertificateColumn::SerialNo => self.serial_no.clone(),
            CertificateColumn::Status => self.status.clone(),
            CertificateColumn::Created => self.created_date.format("%Y-%m-%d").to_string(),
            CertificateColumn::Delivered => {
                if self.delivered {
                    "✓".to_string()
                } else {
                    " ".to_string()
                }
            }
            CertificateColumn::Receiver => info
                .map(|info| info.receiver_name.clone())
                .unwrap_or_default(),
            CertificateColumn::Position => info
                .map(|info| info.receiver_position.clone())
                .unwrap_or_default(),
            CertificateColumn::DeliveryDate => info
                .map(|info| info.delivery_date_string())
                .unwrap_or_default(),
        }
    }
}
