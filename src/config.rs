// src/config.rs
//! Layered application settings.
//!
//! Sources, lowest precedence first:
//! 1. Hard-coded defaults (below)
//! 2. Environment variables prefixed `CERTS_`, nested with `__`
//!    (e.g. `CERTS_CLIENT__API_BASE_URL`), after `.env` has been loaded
//!
//! ## Commonly overridden
//! - `CERTS_CLIENT__API_BASE_URL`: origin of the certificate API
//! - `CERTS_SERVER__JWT_SECRET`: HS256 secret of the reference server
//! - `CERTS_SERVER__SIGNING_KEY`: base64 secp256k1 secret (random when unset)

use config::{Config, ConfigError, Environment};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "https://psu-certificate-verification-1.onrender.com";
const DEFAULT_JWT_SECRET: &str = "change-me";
const DEFAULT_ISSUER: &str = "Puntland State University";
const DEFAULT_VERIFY_URL_BASE: &str = "https://psu-certificate-verification-live.vercel.app/verify";
const DEFAULT_ALLOWED_ORIGINS: &str =
    "https://psu-certificate-verification-live.vercel.app,http://localhost:5173";

/// Settings of the API client and session holder.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSettings {
    /// Origin the `/api/...` paths are resolved against
    pub api_base_url: String,
    /// File holding the durable bearer credential
    pub token_path: PathBuf,
    pub request_timeout_secs: u64,
}

impl ClientSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            token_path: PathBuf::from(".certificate-registry/session.json"),
            request_timeout_secs: 30,
        }
    }
}

/// Settings of the reference server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub bind_addr: String,
    pub jwt_secret: String,
    pub token_ttl_secs: u64,
    /// Display name of the issuing authority
    pub issuer_name: String,
    /// Prefix of the public verification link printed on documents
    pub verify_url_base: String,
    pub admin_username: String,
    pub admin_password: String,
    /// Base64 secp256k1 secret; a random key is generated when absent
    #[serde(default)]
    pub signing_key: Option<String>,
    /// Comma-separated CORS origins
    pub allowed_origins: String,
}

impl ServerSettings {
    /// True while the token secret is still the shipped placeholder.
    pub fn uses_default_jwt_secret(&self) -> bool {
        self.jwt_secret == DEFAULT_JWT_SECRET
    }

    pub fn allowed_origins(&self) -> Vec<String> {
        self.allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(String::from)
            .collect()
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:5000".to_string(),
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            token_ttl_secs: 3600,
            issuer_name: DEFAULT_ISSUER.to_string(),
            verify_url_base: DEFAULT_VERIFY_URL_BASE.to_string(),
            admin_username: "admin".to_string(),
            admin_password: "admin123".to_string(),
            signing_key: None,
            allowed_origins: DEFAULT_ALLOWED_ORIGINS.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    pub client: ClientSettings,
    pub server: ServerSettings,
}

impl Settings {
    /// Loads settings from defaults and the process environment.
    ///
    /// # Errors
    /// Returns `ConfigError` when an override cannot be converted to the
    /// field's type (e.g. a non-numeric timeout).
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Environment::with_prefix("CERTS"))
    }

    fn load_from(env: Environment) -> Result<Self, ConfigError> {
        let defaults = Settings::default();
        Config::builder()
            .set_default("client.api_base_url", defaults.client.api_base_url)?
            .set_default(
                "client.token_path",
                defaults.client.token_path.to_string_lossy().into_owned(),
            )?
            .set_default("client.request_timeout_secs", defaults.client.request_timeout_secs as i64)?
            .set_default("server.bind_addr", defaults.server.bind_addr)?
            .set_default("server.jwt_secret", defaults.server.jwt_secret)?
            .set_default("server.token_ttl_secs", defaults.server.token_ttl_secs as i64)?
            .set_default("server.issuer_name", defaults.server.issuer_name)?
            .set_default("server.verify_url_base", defaults.server.verify_url_base)?
            .set_default("server.admin_username", defaults.server.admin_username)?
            .set_default("server.admin_password", defaults.server.admin_password)?
            .set_default("server.allowed_origins", defaults.server.allowed_origins)?
            .add_source(env.prefix_separator("_").separator("__"))
            .build()?
            .try_deserialize()
    }
}
