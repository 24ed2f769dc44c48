pub mod access;
pub mod cert;
pub mod cli;
pub mod csv;
pub mod filter;
pub mod receipt;
pub mod registry;
pub mod store;
pub mod utils;

// Re-export specific items to avoid conflicts
pub use cert::{Certificate, CertificateColumn, CertificateFields, DeliveryInfo, DeliveryTarget};
pub use cli::{args, commands};
pub use filter::{SelectionState, ViewState};
pub use registry::{CertificateRegistry, Confirmation};
pub use store::{CertificateBackend, LocalBackend, RestBackend};
pub use utils::{config, errors, paths};
