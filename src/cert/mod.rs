pub mod columns;
pub mod delivery;
pub mod model;

pub use columns::CertificateColumn;
pub use delivery::{DeliveryInfo, DeliveryReport, DeliveryTarget};
pub use model::{today, Certificate, CertificateFields, CertificateId, NewCertificate};
