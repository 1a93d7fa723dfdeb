// src/storage/mod.rs
pub mod certificate_store;

pub use certificate_store::{CertificateStore, StoreError, StoredCertificate};
