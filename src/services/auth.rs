// src/services/auth.rs
//! Admin authentication for the reference server.
//!
//! Admins sign in with a password checked against a PBKDF2 hash and receive
//! an HS256 JWT whose subject is their numeric id.

use crate::error::ServerError;
use crate::models::admin::{Admin, LoginResponse};
use crate::storage::CertificateStore;
use crate::utils::crypto::verify_password;
use axum::http::{header, HeaderMap};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Registered JWT claims carried by access tokens.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Admin id
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct AdminAuthenticator {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_ttl_secs: i64,
}

impl AdminAuthenticator {
    pub fn new(secret: &str, token_ttl_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            token_ttl_secs: i64::try_from(token_ttl_secs).unwrap_or(i64::MAX),
        }
    }

    /// Checks credentials and issues an access token.
    ///
    /// # Errors
    /// - `BadRequest` when either field is blank
    /// - `Unauthorized` for an unknown user or a wrong password, without
    ///   saying which
    pub fn login(&self, store: &CertificateStore, username: &str, password: &str) -> Result<LoginResponse, ServerError> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(ServerError::BadRequest("Username and password required".into()));
        }
        let account = store
            .find_admin(username.trim())
            .filter(|account| verify_password(password, &account.password_hash))
            .ok_or_else(|| {
                info!("Rejected login for {}", username.trim());
                ServerError::Unauthorized("Invalid credentials".into())
            })?;

        let admin = account.admin();
        let access_token = self.issue_token(&admin)?;
        info!("Admin {} logged in", admin.username);
        Ok(LoginResponse { access_token, admin })
    }

    pub fn issue_token(&self, admin: &Admin) -> Result<String, ServerError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: admin.id.to_string(),
            iat: now,
            exp: now.saturating_add(self.token_ttl_secs),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| ServerError::Internal(format!("Could not issue token: {}", e)))
    }

    /// Validates a token's signature and expiry, returning the admin id.
    pub fn validate_token(&self, token: &str) -> Result<i64, ServerError> {
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::default()).map_err(|e| {
            debug!("Token rejected: {}", e);
            ServerError::Unauthorized("Invalid or expired token".into())
        })?;
        data.claims
            .sub
            .parse()
            .map_err(|_| ServerError::Unauthorized("Invalid or expired token".into()))
    }

    /// Resolves the admin behind the request's `Authorization: Bearer` header.
    pub fn authenticate(&self, headers: &HeaderMap, store: &CertificateStore) -> Result<Admin, ServerError> {
        let token = bearer_token(headers)
            .ok_or_else(|| ServerError::Unauthorized("Missing Authorization Header".into()))?;
        let admin_id = self.validate_token(token)?;
        store
            .admin_by_id(admin_id)
            .ok_or_else(|| ServerError::Unauthorized("Admin not found".into()))
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") || token.trim().is_empty() {
        return None;
    }
    Some(token.trim())
}
