pub mod busy;
pub mod service;

pub use busy::{BusyFlag, BusyGuard};
pub use service::{CertificateRegistry, Confirmation};
