use crate::cert::model::single_line;
use crate::cert::Certificate;
use chrono::NaiveDate;

pub const EXPORT_HEADERS: [&str; 12] = [
    "Certificate No.",
    "Description",
    "Part No.",
    "Serial No.",
    "Status",
    "Created Date",
    "Delivered",
    "Receiver Name",
    "Receiver Position",
    "Delivery Date",
    "Signature",
    "Notes",
];

pub const TEMPLATE_HEADERS: [&str; 5] = [
    "Certificate No.",
    "Description",
    "Part No.",
    "Serial No.",
    "Status",
];

pub const TEMPLATE_FILENAME: &str = "Certificate_Import_Template.csv";

const TEMPLATE_ROWS: [[&str; 5]; 2] = [
    [
        "CERT-001",
        "Sample Certificate Description",
        "PART-123",
        "SN-456789",
        "New",
    ],
    [
        "CERT-002",
        "Another Sample Certificate",
        "PART-124",
        "SN-456790",
        "Active",
    ],
];

/// `Certificates_<YYYY-MM-DD>.csv`
pub fn export_filename(date: NaiveDate) -> String {
    format!("Certificates_{}.csv", date.format("%Y-%m-%d"))
}

/// Wrap a cell in double quotes, doubling embedded quotes.
/// Line breaks become spaces since import is line based.
pub fn quote_cell(cell: &str) -> String {
    format!("\"{}\"", single_line(cell).replace('"', "\"\""))
}

fn write_row<S: AsRef<str>>(csv: &mut String, cells: &[S]) {
    let line = cells
        .iter()
        .map(|cell| quote_cell(cell.as_ref()))
        .collect::<Vec<_>>()
        .join(",");
    csv.push_str(&line);
    csv.push('\n');
}

fn export_row(cert: &Certificate) -> [String; 12] {
    let (receiver, position, date, signature, notes) = match &cert.delivery_info {
        Some(info) => (
            info.receiver_name.clone(),
            info.receiver_position.clone(),
            info.delivery_date_string(),
            info.receiver_signature.clone(),
            info.notes.clone(),
        ),
        None => Default::default(),
    };

    [
        cert.no.clone(),
        cert.description.clone(),
        cert.part_no.clone(),
        cert.serial_no.clone(),
        cert.status.clone(),
        cert.created_date.format("%Y-%m-%d").to_string(),
        if cert.delivered { "Yes" } else { "No" }.to_string(),
        receiver,
        position,
        date,
        signature,
        notes,
    ]
}

/// Header row followed by one fully quoted row per certificate
pub fn encode_certificates(certificates: &[&Certificate]) -> String {
    let mut csv = EXPORT_HEADERS.join(",");
    csv.push('\n');
    for cert in certificates {
        write_row(&mut csv, &export_row(cert));
    }
    csv
}

/// Fixed two-row sample, independent of any stored data
pub fn template() -> String {
    let mut csv = TEMPLATE_HEADERS.join(",");
    csv.push('\n');
    for row in TEMPLATE_ROWS {
        write_row(&mut csv, &row);
    }
    csv
}
