// src/lib.rs
//! # Certificate Registry
//!
//! Issuance and public verification of university degree certificates.
//!
//! ## Architecture Overview
//! 1. **Session Layer**: `Session` holds the admin bearer credential
//! 2. **Client Layer**: `CertificateRepository` talks to the certificate API
//! 3. **Services Layer**: verification, dashboard figures and the reference API server
//! 4. **Storage Layer**: in-memory certificate store behind the server

pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod session;
pub mod storage;
pub mod utils;

pub use client::{ApiClient, CertificateRepository};
pub use error::{ClientError, ServerError};
pub use session::{Session, SessionState};
