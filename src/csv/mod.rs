pub mod export;
pub mod import;

pub use export::{encode_certificates, export_filename, template, TEMPLATE_FILENAME};
pub use import::{decode_import, parse_line, ImportColumns};
