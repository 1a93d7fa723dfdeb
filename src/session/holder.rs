// src/session/holder.rs
//! Session/Token Holder.
//!
//! An explicit session object owned by the application context and passed by
//! reference to whatever needs identity. The credential lives in two places,
//! the durable [`TokenStore`] and the in-memory copy used by
//! [`Session::authorize`]; every transition writes the store first and only
//! then updates memory, so the two never disagree.

use crate::client::ApiClient;
use crate::error::{ClientError, Result};
use crate::models::admin::{Admin, LoginRequest, LoginResponse};
use crate::session::token_store::TokenStore;
use log::{info, warn};
use reqwest::RequestBuilder;

/// Authentication state as seen by callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Not yet restored from durable storage
    Unknown,
    Authenticated(Admin),
    Unauthenticated,
}

/// Holder of the current bearer credential and admin identity.
pub struct Session {
    store: Box<dyn TokenStore>,
    token: Option<String>,
    state: SessionState,
}

impl Session {
    /// Creates a session in the `Unknown` state. Call [`Session::restore`]
    /// before relying on it.
    pub fn new(store: impl TokenStore + 'static) -> Self {
        Self {
            store: Box::new(store),
            token: None,
            state: SessionState::Unknown,
        }
    }

    /// A session already holding `token` for `admin`, bypassing the server.
    #[cfg(test)]
    pub(crate) fn authenticated(store: impl TokenStore + 'static, token: &str, admin: Admin) -> Self {
        Self {
            store: Box::new(store),
            token: Some(token.to_string()),
            state: SessionState::Authenticated(admin),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn admin(&self) -> Option<&Admin> {
        match &self.state {
            SessionState::Authenticated(admin) => Some(admin),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.admin().is_some()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Decorates an outgoing request with the held credential, if any.
    pub fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Resolves the session from durable storage.
    ///
    /// With a stored token, asks the server who it belongs to. Any failure of
    /// that lookup drops the credential from both storage and memory. Never
    /// fails; afterwards the state is `Authenticated` or `Unauthenticated`.
    /// Calling it again once resolved returns the current state untouched.
    pub async fn restore(&mut self, api: &ApiClient) -> &SessionState {
        if self.state != SessionState::Unknown {
            return &self.state;
        }

        let stored = match self.store.load() {
            Ok(token) => token,
            Err(e) => {
                warn!("Could not read stored credential: {}", e);
                None
            }
        };
        let Some(token) = stored else {
            self.state = SessionState::Unauthenticated;
            return &self.state;
        };

        self.token = Some(token);
        match self.who_am_i(api).await {
            Ok(admin) => {
                info!("Session restored for {}", admin.username);
                self.state = SessionState::Authenticated(admin);
            }
            Err(e) => {
                warn!("Stored credential rejected, signing out: {}", e);
                self.drop_credential();
            }
        }
        &self.state
    }

    /// Exchanges credentials for a bearer token.
    ///
    /// On success the token is persisted, attached and the admin becomes the
    /// current identity. On any failure the previous state is left exactly as
    /// it was.
    pub async fn login(&mut self, api: &ApiClient, username: &str, password: &str) -> Result<Admin> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(ClientError::Validation {
                field: None,
                message: "Username and password required".to_string(),
            });
        }

        let request = api.post(&["api", "auth", "login"])?.json(&LoginRequest {
            username: username.trim().to_string(),
            password: password.to_string(),
        });
        let response: LoginResponse = api.json(request).await?;

        self.store.save(&response.access_token)?;
        self.token = Some(response.access_token);
        self.state = SessionState::Authenticated(response.admin.clone());
        info!("Logged in as {}", response.admin.username);
        Ok(response.admin)
    }

    /// Signs out. Safe to call when already signed out.
    ///
    /// # Errors
    /// `Storage` if the persisted credential cannot be removed; the session
    /// then keeps its credential so memory and storage stay in step.
    pub fn logout(&mut self) -> Result<()> {
        self.store.clear()?;
        if let Some(admin) = self.admin() {
            info!("Logged out {}", admin.username);
        }
        self.token = None;
        self.state = SessionState::Unauthenticated;
        Ok(())
    }

    /// Forces a logout when `error` says the credential is no longer valid.
    /// Returns true if the session was signed out.
    pub fn expire_on(&mut self, error: &ClientError) -> bool {
        if !error.is_authentication() || self.token.is_none() {
            return false;
        }
        warn!("Credential rejected by server, signing out");
        self.drop_credential();
        true
    }

    async fn who_am_i(&self, api: &ApiClient) -> Result<Admin> {
        let request = self.authorize(api.get(&["api", "auth", "me"])?);
        api.json(request).await
    }

    fn drop_credential(&mut self) {
        if let Err(e) = self.store.clear() {
            warn!("Could not clear stored credential: {}", e);
        }
        self.token = None;
        self.state = SessionState::Unauthenticated;
    }
}
