// src/client/mod.rs
//! HTTP side of the crate: the request wrapper and the typed certificate
//! repository built on it.

pub mod api_client;
pub mod certificates;

pub use api_client::ApiClient;
pub use certificates::CertificateRepository;
