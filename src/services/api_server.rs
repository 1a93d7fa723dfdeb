// src/services/api_server.rs
//! API Server for the Certificate Registry
//!
//! Reference implementation of the certificate HTTP API, built on Axum.
//!
//! Endpoints:
//! - `POST /api/auth/login`, `GET /api/auth/me`
//! - `GET|POST /api/certificates`, `GET /api/certificates/:uuid`,
//!   `POST /api/certificates/:uuid/revoke` (bearer-protected)
//! - `GET /api/certificates/:uuid/verify`, `GET /api/certificates/:uuid/download` (public)
//! - `GET /health`
//!
//! Errors are returned as `{"error": "<message>"}` with the status chosen by
//! [`ServerError`].

use crate::config::ServerSettings;
use crate::error::ServerError;
use crate::models::admin::{Admin, LoginRequest};
use crate::models::certificate::{IssueReceipt, NewCertificate, RevokeRequest};
use crate::models::verification::VerificationStatus;
use crate::services::auth::AdminAuthenticator;
use crate::services::credential_issuer::CredentialIssuer;
use crate::services::document_renderer::render_certificate;
use crate::storage::CertificateStore;
use crate::utils::crypto::{hash_password, CertificateSigner};
use axum::{
    extract::{rejection::JsonRejection, Json, Path, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use log::{error, info, warn};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::Conflict(_) => StatusCode::CONFLICT,
            ServerError::Internal(message) => {
                error!("Request failed: {}", message);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Turns a body that failed to decode into a 400 instead of axum's default.
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ServerError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ServerError::BadRequest(rejection.body_text()))
}

/// API server state containing all service dependencies
#[derive(Clone)]
pub struct ApiServer {
    /// Service for issuing, revoking and verifying certificates
    credential_issuer: Arc<CredentialIssuer>,

    /// Token issuance and validation for admins
    authenticator: Arc<AdminAuthenticator>,

    /// Store shared with the issuer; read directly for admin lookups
    store: Arc<RwLock<CertificateStore>>,

    /// Prefix of the verification link printed on documents
    verify_url_base: String,

    allowed_origins: Vec<String>,
}

impl ApiServer {
    /// Creates a new instance of the API server
    ///
    /// Seeds the configured admin account and loads the signing key, or
    /// generates one for the lifetime of the process when none is set.
    ///
    /// # Errors
    /// `Internal` if the signing key is malformed or the admin password
    /// cannot be hashed.
    pub fn new(settings: &ServerSettings) -> Result<Self, ServerError> {
        let signer = match &settings.signing_key {
            Some(key) if !key.trim().is_empty() => {
                CertificateSigner::from_base64(key).map_err(|e| ServerError::Internal(e.to_string()))?
            }
            _ => {
                warn!("No signing key configured; certificates will not verify after a restart");
                CertificateSigner::generate()
            }
        };

        if settings.uses_default_jwt_secret() {
            warn!("Using the default JWT secret; set CERTS_SERVER__JWT_SECRET before exposing this server");
        }

        let mut store = CertificateStore::new();
        let password_hash =
            hash_password(&settings.admin_password).map_err(|e| ServerError::Internal(e.to_string()))?;
        store.add_admin(&settings.admin_username, password_hash)?;

        let store = Arc::new(RwLock::new(store));
        Ok(ApiServer {
            credential_issuer: Arc::new(CredentialIssuer::new(store.clone(), signer, &settings.issuer_name)),
            authenticator: Arc::new(AdminAuthenticator::new(&settings.jwt_secret, settings.token_ttl_secs)),
            store,
            verify_url_base: settings.verify_url_base.clone(),
            allowed_origins: settings.allowed_origins(),
        })
    }

    /// Builds the router with all routes and the CORS layer.
    pub fn router(&self) -> Router {
        let allow_origin = if self.allowed_origins.iter().any(|origin| origin == "*") {
            AllowOrigin::any()
        } else {
            AllowOrigin::list(self.allowed_origins.iter().filter_map(|origin| {
                match HeaderValue::from_str(origin) {
                    Ok(value) => Some(value),
                    Err(_) => {
                        warn!("Ignoring malformed CORS origin {:?}", origin);
                        None
                    }
                }
            }))
        };
        let cors = CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

        Router::new()
            .route("/health", get(Self::health_handler))
            .route("/api/auth/login", post(Self::login_handler))
            .route("/api/auth/me", get(Self::me_handler))
            .route(
                "/api/certificates",
                get(Self::list_certificates_handler).post(Self::issue_certificate_handler),
            )
            .route("/api/certificates/:uuid", get(Self::get_certificate_handler))
            .route("/api/certificates/:uuid/revoke", post(Self::revoke_certificate_handler))
            .route("/api/certificates/:uuid/verify", get(Self::verify_certificate_handler))
            .route("/api/certificates/:uuid/download", get(Self::download_certificate_handler))
            .layer(ServiceBuilder::new().layer(cors))
            .with_state(Arc::new(self.clone())) // Share the entire ApiServer state
    }

    /// Serves requests on an already bound listener until the task is dropped.
    pub async fn serve(&self, listener: TcpListener) -> std::io::Result<()> {
        axum::serve(listener, self.router()).await
    }

    /// Starts the API server and begins listening for requests
    ///
    /// # Arguments
    /// * `addr` - Socket address to bind to (e.g., "127.0.0.1:5000")
    pub async fn run(&self, addr: SocketAddr) -> std::io::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        info!("Certificate API listening on {}", listener.local_addr()?);
        self.serve(listener).await
    }

    async fn require_admin(&self, headers: &HeaderMap) -> Result<Admin, ServerError> {
        let store = self.store.read().await;
        self.authenticator.authenticate(headers, &store)
    }

    async fn health_handler() -> impl IntoResponse {
        Json(json!({ "status": "ok" }))
    }

    // =====================
    // Auth Handlers
    // =====================

    /// Authenticates an admin and returns an access token
    ///
    /// # Endpoint
    /// POST /api/auth/login
    ///
    /// # Responses
    /// - 200 OK: `{access_token, admin}`
    /// - 400 Bad Request: Missing username or password
    /// - 401 Unauthorized: Invalid credentials
    async fn login_handler(
        State(state): State<Arc<ApiServer>>,
        payload: Result<Json<LoginRequest>, JsonRejection>,
    ) -> Result<impl IntoResponse, ServerError> {
        let request = body(payload)?;
        let store = state.store.read().await;
        let response = state
            .authenticator
            .login(&store, &request.username, &request.password)?;
        Ok((StatusCode::OK, Json(response)))
    }

    /// GET /api/auth/me
    async fn me_handler(
        State(state): State<Arc<ApiServer>>,
        headers: HeaderMap,
    ) -> Result<impl IntoResponse, ServerError> {
        let admin = state.require_admin(&headers).await?;
        Ok((StatusCode::OK, Json(admin)))
    }

    // =====================
    // Certificate Handlers
    // =====================

    /// Lists all certificates, oldest first
    ///
    /// # Endpoint
    /// GET /api/certificates
    async fn list_certificates_handler(
        State(state): State<Arc<ApiServer>>,
        headers: HeaderMap,
    ) -> Result<impl IntoResponse, ServerError> {
        state.require_admin(&headers).await?;
        let certificates = state.credential_issuer.list_certificates().await;
        Ok((StatusCode::OK, Json(certificates)))
    }

    /// Issues a new certificate
    ///
    /// # Endpoint
    /// POST /api/certificates
    ///
    /// # Responses
    /// - 201 Created: `{id, uuid, message}`
    /// - 400 Bad Request: Missing or malformed field
    /// - 401 Unauthorized
    async fn issue_certificate_handler(
        State(state): State<Arc<ApiServer>>,
        headers: HeaderMap,
        payload: Result<Json<NewCertificate>, JsonRejection>,
    ) -> Result<impl IntoResponse, ServerError> {
        let admin = state.require_admin(&headers).await?;
        let input = body(payload)?;
        let certificate = state.credential_issuer.issue_certificate(&input).await?;
        info!("Certificate {} issued by {}", certificate.uuid, admin.username);
        Ok((
            StatusCode::CREATED,
            Json(IssueReceipt {
                id: certificate.id,
                uuid: certificate.uuid,
                message: Some("Certificate issued successfully".to_string()),
            }),
        ))
    }

    /// GET /api/certificates/:uuid
    async fn get_certificate_handler(
        State(state): State<Arc<ApiServer>>,
        headers: HeaderMap,
        Path(uuid): Path<String>,
    ) -> Result<impl IntoResponse, ServerError> {
        state.require_admin(&headers).await?;
        let certificate = state
            .credential_issuer
            .certificate(&uuid)
            .await
            .ok_or_else(|| ServerError::NotFound("Certificate not found".into()))?;
        Ok((StatusCode::OK, Json(certificate)))
    }

    /// Revokes a certificate
    ///
    /// # Endpoint
    /// POST /api/certificates/:uuid/revoke
    ///
    /// # Responses
    /// - 200 OK
    /// - 400 Bad Request: Blank reason
    /// - 404 Not Found
    /// - 409 Conflict: Already revoked
    async fn revoke_certificate_handler(
        State(state): State<Arc<ApiServer>>,
        headers: HeaderMap,
        Path(uuid): Path<String>,
        payload: Result<Json<RevokeRequest>, JsonRejection>,
    ) -> Result<impl IntoResponse, ServerError> {
        let admin = state.require_admin(&headers).await?;
        let request = body(payload)?;
        state
            .credential_issuer
            .revoke_certificate(&uuid, &request.reason)
            .await?;
        info!("Certificate {} revoked by {}", uuid, admin.username);
        Ok((
            StatusCode::OK,
            Json(json!({ "message": "Certificate revoked successfully" })),
        ))
    }

    /// Public verification
    ///
    /// # Endpoint
    /// GET /api/certificates/:uuid/verify
    ///
    /// # Responses
    /// - 200 OK: `VALID` or `REVOKED`
    /// - 404 Not Found: `NOT_FOUND`
    /// - 500 Internal Server Error: `ERROR`, e.g. a signature mismatch
    async fn verify_certificate_handler(
        State(state): State<Arc<ApiServer>>,
        Path(uuid): Path<String>,
    ) -> impl IntoResponse {
        let outcome = state.credential_issuer.verify_certificate(&uuid).await;
        let status = match outcome.status() {
            VerificationStatus::Valid | VerificationStatus::Revoked => StatusCode::OK,
            VerificationStatus::NotFound => StatusCode::NOT_FOUND,
            VerificationStatus::Error => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(outcome.to_response()))
    }

    /// Printable document, rendered on demand
    ///
    /// # Endpoint
    /// GET /api/certificates/:uuid/download
    async fn download_certificate_handler(
        State(state): State<Arc<ApiServer>>,
        Path(uuid): Path<String>,
    ) -> Result<impl IntoResponse, ServerError> {
        let certificate = state
            .credential_issuer
            .certificate(&uuid)
            .await
            .ok_or_else(|| ServerError::NotFound("Certificate not found".into()))?;
        let document = render_certificate(
            &certificate,
            state.credential_issuer.issuer_name(),
            &state.verify_url_base,
        )
        .map_err(|e| {
            error!("Failed to render certificate {}: {}", certificate.uuid, e);
            ServerError::Internal("Failed to render certificate".into())
        })?;
        let headers = [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"certificate_{}.pdf\"", certificate.uuid),
            ),
        ];
        Ok((StatusCode::OK, headers, document))
    }
}
