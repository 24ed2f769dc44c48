use crate::cert::Certificate;
use crate::utils::errors::{RegistryError, Result};
use std::str::FromStr;

const RULE_WIDTH: usize = 64;
const LABEL_WIDTH: usize = 18;
const BLANK_LINE: &str = "______________________";
const PAGE_BREAK: char = '\u{c}';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintMode {
    /// One receipt for one certificate
    Single,
    /// One receipt page per certificate
    Separate,
    /// One receipt listing every certificate
    Combined,
}

impl FromStr for PrintMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "single" => Ok(Self::Single),
            "separate" => Ok(Self::Separate),
            "combined" => Ok(Self::Combined),
            _ => Err(format!("Invalid print mode: {s}")),
        }
    }
}

/// Plain-text delivery receipts for printing
pub struct ReceiptRenderer {
    organization: String,
}

impl ReceiptRenderer {
    pub fn new(organization: impl Into<String>) -> Self {
        Self {
            organization: organization.into(),
        }
    }

    pub fn render(&self, mode: PrintMode, certificates: &[&Certificate]) -> Result<String> {
        if certificates.is_empty() {
            return Err(RegistryError::validation(
                "Please select certificates to print",
            ));
        }

        Ok(match mode {
            PrintMode::Single => self.single(certificates[0], None),
            PrintMode::Separate => {
                let total = certificates.len();
                certificates
                    .iter()
                    .enumerate()
                    .map(|(index, cert)| self.single(cert, Some((index + 1, total))))
                    .collect::<Vec<_>>()
                    .join(&PAGE_BREAK.to_string())
            }
            PrintMode::Combined => self.combined(certificates),
        })
    }

    fn header(&self, out: &mut String, title: &str) {
        let rule = "=".repeat(RULE_WIDTH);
        push_line(out, &rule);
        push_line(out, &self.organization);
        push_line(out, "Certificate Management System");
        push_line(out, &rule);
        push_line(out, &format!("{title:^RULE_WIDTH$}"));
        out.push('\n');
    }

    fn single(&self, cert: &Certificate, page: Option<(usize, usize)>) -> String {
        let mut out = String::new();
        self.header(&mut out, "CERTIFICATE DELIVERY RECEIPT");

        field(&mut out, "Certificate No.", &cert.no);
        field(&mut out, "Description", &cert.description);
        field(&mut out, "Part No.", or_placeholder(&cert.part_no, "N/A"));
        field(&mut out, "Serial No.", or_placeholder(&cert.serial_no, "N/A"));
        field(&mut out, "Status", &cert.status);
        field(
            &mut out,
            "Issue Date",
            &cert.created_date.format("%Y-%m-%d").to_string(),
        );
        out.push('\n');

        match (&cert.delivery_info, cert.delivered) {
            (Some(info), true) => {
                push_line(&mut out, "DELIVERY INFORMATION");
                field(&mut out, "Receiver Name", &info.receiver_name);
                field(&mut out, "Position", &info.receiver_position);
                field(&mut out, "Delivery Date", &info.delivery_date_string());
                field(&mut out, "Signature", &info.receiver_signature);
                if !info.notes.is_empty() {
                    field(&mut out, "Notes", &info.notes);
                }
            }
            _ => acknowledgment(&mut out),
        }

        if let Some((index, total)) = page {
            out.push('\n');
            let id = format!("Certificate ID: {}", cert.id);
            let page = format!("Page {index} of {total}");
            let gap = RULE_WIDTH.saturating_sub(id.len() + page.len()).max(2);
            push_line(&mut out, &format!("{id}{}{page}", " ".repeat(gap)));
        }
        out
    }

    fn combined(&self, certificates: &[&Certificate]) -> String {
        let mut out = String::new();
        self.header(&mut out, "CERTIFICATES DELIVERY RECEIPT");
        push_line(&mut out, &format!("Total: {}", certificates.len()));
        out.push('\n');
        push_line(&mut out, "CERTIFICATES LIST");

        let mut rows = vec![vec![
            "#".to_string(),
            "Certificate No.".to_string(),
            "Description".to_string(),
            "Part No.".to_string(),
            "Serial No.".to_string(),
            "Status".to_string(),
        ]];
        for (index, cert) in certificates.iter().enumerate() {
            rows.push(vec![
                (index + 1).to_string(),
                cert.no.clone(),
                cert.description.clone(),
                or_placeholder(&cert.part_no, "-").to_string(),
                or_placeholder(&cert.serial_no, "-").to_string(),
                cert.status.clone(),
            ]);
        }

        let mut widths = vec![0; rows[0].len()];
        for row in &rows {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }
        for row in &rows {
            let cells: Vec<String> = row
                .iter()
                .enumerate()
                .map(|(i, cell)| format!("{:<width$}", cell, width = widths[i]))
                .collect();
            push_line(&mut out, cells.join("  ").trim_end());
        }
        out.push('\n');

        acknowledgment(&mut out);
        out
    }
}

impl Default for ReceiptRenderer {
    fn default() -> Self {
        Self::new("Certificate Registry")
    }
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    out.push('\n');
}

fn field(out: &mut String, label: &str, value: &str) {
    push_line(out, &format!("{label:<LABEL_WIDTH$}{value}"));
}

fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    if value.trim().is_empty() {
        placeholder
    } else {
        value
    }
}

/// Blank signature block for a receiver to fill in by hand
fn acknowledgment(out: &mut String) {
    push_line(out, "DELIVERY ACKNOWLEDGMENT");
    push_line(
        out,
        &format!("{:<LABEL_WIDTH$}{BLANK_LINE}  Position:  {BLANK_LINE}", "Receiver Name:"),
    );
    push_line(
        out,
        &format!("{:<LABEL_WIDTH$}{BLANK_LINE}  Signature: {BLANK_LINE}", "Date:"),
    );
}
