use crate::cert::{CertificateFields, NewCertificate};
use crate::utils::errors::{RegistryError, Result};
use chrono::NaiveDate;

/// Split one CSV line into trimmed cells, honouring double-quoted fields
/// with `""` escapes
pub fn parse_line(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => cells.push(std::mem::take(&mut current).trim().to_string()),
            _ => current.push(c),
        }
    }
    cells.push(current.trim().to_string());
    cells
}

/// Positions of the recognised columns in an import header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportColumns {
    pub no: usize,
    pub description: usize,
    pub part_no: Option<usize>,
    pub serial_no: Option<usize>,
    pub status: Option<usize>,
}

impl ImportColumns {
    /// Match header names by case-insensitive substring, first match wins
    pub fn from_header(headers: &[String]) -> Result<Self> {
        let lowered: Vec<String> = headers.iter().map(|h| h.to_lowercase()).collect();
        let find = |pred: &dyn Fn(&str) -> bool| lowered.iter().position(|h| pred(h));

        let no = find(&|h| h.contains("certificate") || h.contains("no"));
        let description = find(&|h| h.contains("description"));

        let (Some(no), Some(description)) = (no, description) else {
            return Err(RegistryError::validation(
                "File must have \"Certificate No.\" and \"Description\" columns",
            ));
        };

        Ok(Self {
            no,
            description,
            part_no: find(&|h| h.contains("part")),
            serial_no: find(&|h| h.contains("serial")),
            status: find(&|h| h.contains("status")),
        })
    }

    /// Build the editable fields for one row; `None` when number or
    /// description is missing
    pub fn fields(&self, cells: &[String]) -> Option<CertificateFields> {
        let cell = |index: Option<usize>| {
            index
                .and_then(|i| cells.get(i))
                .map(String::as_str)
                .unwrap_or("")
        };

        let no = cell(Some(self.no));
        let description = cell(Some(self.description));
        if no.is_empty() || description.is_empty() {
            return None;
        }

        Some(
            CertificateFields::new(no, description)
                .with_part_no(cell(self.part_no))
                .with_serial_no(cell(self.serial_no))
                .with_status(cell(self.status))
                .normalized(),
        )
    }
}

/// Decode an import file into new pending records dated `created_date`.
///
/// Rows without a number or description are skipped; an unusable header or
/// a file with no valid rows is a validation error.
pub fn decode_import(text: &str, created_date: NaiveDate) -> Result<Vec<NewCertificate>> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut lines = text.lines().filter(|line| !line.trim().is_empty());

    let header = lines
        .next()
        .ok_or_else(|| RegistryError::validation("File is empty or invalid"))?;
    let columns = ImportColumns::from_header(&parse_line(header))?;
    tracing::debug!("Import columns: {:?}", columns);

    let mut skipped = 0;
    let certificates: Vec<NewCertificate> = lines
        .filter_map(|line| {
            let fields = columns.fields(&parse_line(line));
            if fields.is_none() {
                skipped += 1;
            }
            fields
        })
        .map(|fields| NewCertificate::new(fields, created_date))
        .collect();

    if skipped > 0 {
        tracing::info!("Skipped {} rows without number or description", skipped);
    }
    if certificates.is_empty() {
        return Err(RegistryError::validation(
            "No valid certificates found in the file",
        ));
    }
    Ok(certificates)
}
