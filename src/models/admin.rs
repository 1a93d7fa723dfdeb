// src/models/admin.rs
//! Admin identity and the login exchange.

use serde::{Deserialize, Serialize};

/// A logged-in operator. Created server-side out of band and never mutated
/// by the client.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Admin {
    /// Opaque server identifier
    pub id: i64,
    pub username: String,
}

/// Body of `POST /api/auth/login`
#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(default)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Successful login: a bearer token plus the admin it belongs to.
#[derive(Serialize, Deserialize, Debug)]
pub struct LoginResponse {
    pub access_token: String,
    pub admin: Admin,
}
