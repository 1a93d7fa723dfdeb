// src/models/mod.rs
//! Data structures shared by the client and the reference server.

pub mod admin;
pub mod certificate;
pub mod verification;
