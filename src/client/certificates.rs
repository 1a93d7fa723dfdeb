// src/client/certificates.rs
//! Certificate Repository Client
//!
//! Typed operations against the certificate collection:
//! - Listing, detail lookup and document download
//! - Issuance and revocation (admin only)
//! - Public verification lookup
//!
//! Every operation is a single attempt; retry policy belongs to the caller.

use crate::client::ApiClient;
use crate::error::{ClientError, Result};
use crate::models::certificate::{
    Certificate, CertificateSummary, IssueReceipt, NewCertificate, RevokeRequest,
};
use crate::models::verification::{LookupOutcome, VerificationOutcome, VerificationResponse};
use crate::services::verifier::evaluate;
use crate::session::Session;
use bytes::Bytes;
use futures::TryStreamExt;
use log::{info, warn};
use reqwest::Response;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;

const COLLECTION: [&str; 2] = ["api", "certificates"];

/// Client for the `/api/certificates` collection.
#[derive(Clone, Debug)]
pub struct CertificateRepository {
    api: ApiClient,
}

impl CertificateRepository {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Lists all certificates in the order the server returns them.
    ///
    /// No ordering is guaranteed; "recent" views take a prefix of this
    /// sequence as-is.
    pub async fn list(&self, session: &Session) -> Result<Vec<CertificateSummary>> {
        let request = session.authorize(self.api.get(&COLLECTION)?);
        self.api.json(request).await
    }

    /// Fetches the full record, embedded student included.
    ///
    /// # Errors
    /// `NotFound` when no certificate has this uuid.
    pub async fn get_by_uuid(&self, session: &Session, uuid: &str) -> Result<Certificate> {
        let uuid = require_identifier(uuid)?;
        let request = session.authorize(self.api.get(&[COLLECTION[0], COLLECTION[1], uuid])?);
        let certificate: Certificate = self.api.json(request).await?;
        if !certificate.is_consistent() {
            warn!(
                "Certificate {} violates the revocation invariant (revoked={}, reason={:?})",
                certificate.uuid, certificate.revoked, certificate.revoked_reason
            );
        }
        Ok(certificate)
    }

    /// Issues a certificate.
    ///
    /// The input is validated locally first; an invalid input fails without
    /// any request being sent. The server stays the authority and may still
    /// reject the input with a `Validation` error.
    ///
    /// # Returns
    /// The stored record, read back by the uuid the server assigned. Once the
    /// server has accepted the issuance this never fails: if the read-back
    /// does, the record is assembled from the receipt and the input.
    pub async fn create(&self, session: &Session, input: &NewCertificate) -> Result<Certificate> {
        input.validate()?;

        let request = session.authorize(self.api.post(&COLLECTION)?).json(input);
        let receipt: IssueReceipt = self.api.json(request).await?;
        info!("Issued certificate {} (id {})", receipt.uuid, receipt.id);

        match self.get_by_uuid(session, &receipt.uuid).await {
            Ok(certificate) => Ok(certificate),
            Err(e) => {
                warn!("Certificate {} was issued but could not be read back: {}", receipt.uuid, e);
                receipt.into_certificate(input)
            }
        }
    }

    /// Revokes a certificate. One-way: there is no operation undoing it.
    ///
    /// # Returns
    /// The refreshed record, or `None` when the revocation went through but
    /// the record could not be read back afterwards.
    ///
    /// # Errors
    /// - `Validation` for a blank reason, before any request is sent
    /// - `NotFound` for an unknown uuid
    /// - `Conflict` when the certificate is already revoked
    pub async fn revoke(
        &self,
        session: &Session,
        uuid: &str,
        reason: &str,
    ) -> Result<Option<Certificate>> {
        let uuid = require_identifier(uuid)?;
        if reason.trim().is_empty() {
            return Err(ClientError::invalid_field(
                "reason",
                "Please provide a reason for revocation",
            ));
        }

        let request = session
            .authorize(self.api.post(&[COLLECTION[0], COLLECTION[1], uuid, "revoke"])?)
            .json(&RevokeRequest {
                reason: reason.trim().to_string(),
            });
        self.api.execute(request).await?;
        info!("Revoked certificate {}", uuid);

        match self.get_by_uuid(session, uuid).await {
            Ok(certificate) => Ok(Some(certificate)),
            Err(e) => {
                warn!("Certificate {} was revoked but could not be read back: {}", uuid, e);
                Ok(None)
            }
        }
    }

    /// Downloads the rendered document as opaque bytes.
    pub async fn download(&self, session: &Session, uuid: &str) -> Result<Bytes> {
        let uuid = require_identifier(uuid)?;
        let request = session.authorize(self.api.get(&[COLLECTION[0], COLLECTION[1], uuid, "download"])?);
        Ok(self.api.execute(request).await?.bytes().await?)
    }

    /// Streams the rendered document into `destination`, chunk by chunk.
    ///
    /// Chunks go to a `.part` sibling that is renamed over `destination`
    /// once complete, so a broken download leaves no truncated document.
    ///
    /// # Returns
    /// Number of bytes written
    pub async fn save_document(&self, session: &Session, uuid: &str, destination: &Path) -> Result<u64> {
        let uuid = require_identifier(uuid)?;
        let request = session.authorize(self.api.get(&[COLLECTION[0], COLLECTION[1], uuid, "download"])?);
        let response = self.api.execute(request).await?;

        let partial = partial_path(destination);
        let saved = async {
            let written = stream_to_file(response, &partial).await?;
            fs::rename(&partial, destination).await?;
            Ok::<u64, ClientError>(written)
        };
        match saved.await {
            Ok(written) => Ok(written),
            Err(e) => {
                if let Err(cleanup) = fs::remove_file(&partial).await {
                    warn!("Could not remove {}: {}", partial.display(), cleanup);
                }
                Err(e)
            }
        }
    }

    /// Looks up the verification record of an identifier.
    ///
    /// Absence (404 or a `NOT_FOUND` payload) is a value, not an error;
    /// transport and server failures propagate.
    pub async fn lookup(&self, uuid: &str) -> Result<LookupOutcome> {
        let uuid = require_identifier(uuid)?;
        let request = self.api.get(&[COLLECTION[0], COLLECTION[1], uuid, "verify"])?;
        match self.api.json::<VerificationResponse>(request).await {
            Ok(response) => Ok(response.into()),
            Err(ClientError::NotFound(_)) => Ok(LookupOutcome::Absent),
            Err(e) => Err(e),
        }
    }

    /// Public verification. Never fails for an unknown identifier.
    pub async fn verify(&self, uuid: &str) -> Result<VerificationOutcome> {
        Ok(evaluate(self.lookup(uuid).await?))
    }
}

fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination.file_name().map(OsString::from).unwrap_or_default();
    name.push(".part");
    destination.with_file_name(name)
}

async fn stream_to_file(response: Response, path: &Path) -> Result<u64> {
    let mut file = File::create(path).await?;
    let mut written = 0u64;
    let mut chunks = Box::pin(response.bytes_stream());
    while let Some(chunk) = chunks.try_next().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}

fn require_identifier(uuid: &str) -> Result<&str> {
    let uuid = uuid.trim();
    if uuid.is_empty() {
        return Err(ClientError::invalid_field("uuid", "Certificate ID is required"));
    }
    Ok(uuid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::admin::Admin;
    use crate::models::verification::VerificationStatus;
    use crate::session::MemoryTokenStore;
    use mockito::Matcher;
    use std::time::Duration;
    use tokio_test::{assert_err, assert_ok};

    const UUID: &str = "4b7c0c36-3f0e-4c55-9a59-6f1f2a1d1c11";

    fn certificate_json(revoked: bool) -> String {
        let reason = if revoked { Some("Academic misconduct") } else { None };
        serde_json::json!({
            "id": 7,
            "uuid": UUID,
            "student": {"name": "Amina Ali", "student_id": "S1001", "email": null},
            "degree": "Bachelor of Science",
            "program": "Computer Science",
            "issue_date": "2024-06-01",
            "revoked": revoked,
            "revoked_reason": reason,
            "created_at": "2024-06-02T09:30:00"
        })
        .to_string()
    }

    fn repository(server: &mockito::ServerGuard) -> CertificateRepository {
        CertificateRepository::new(ApiClient::new(&server.url(), Duration::from_secs(5)).unwrap())
    }

    fn signed_in() -> Session {
        Session::authenticated(
            MemoryTokenStore::with_token("tok"),
            "tok",
            Admin { id: 1, username: "admin".into() },
        )
    }

    fn amina() -> NewCertificate {
        NewCertificate {
            first_name: "Amina".into(),
            last_name: "Ali".into(),
            student_id: "S1001".into(),
            email: None,
            degree: "Bachelor of Science".into(),
            program: "Computer Science".into(),
            issue_date: "2024-06-01".into(),
        }
    }

    #[tokio::test]
    async fn test_list_keeps_server_order() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/certificates")
            .match_header("authorization", "Bearer tok")
            .with_header("content-type", "application/json")
            .with_body(r#"[
                {"id": 2, "uuid": "b", "student_name": "B", "student_id": "S2", "degree": "Master of Arts",
                 "program": "History", "issue_date": "2023-01-01", "revoked": true},
                {"id": 1, "uuid": "a", "student_name": "A", "student_id": "S1", "degree": "Bachelor of Arts",
                 "program": "Art", "issue_date": "2024-01-01", "revoked": false, "created_at": "2024-01-02T00:00:00"}
            ]"#)
            .create_async()
            .await;

        let list = assert_ok!(repository(&server).list(&signed_in()).await);
        let uuids: Vec<&str> = list.iter().map(|c| c.uuid.as_str()).collect();
        assert_eq!(uuids, ["b", "a"]);
        assert!(list[0].created_at.is_none());
    }

    #[tokio::test]
    async fn test_get_unknown_uuid_is_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/certificates/nope")
            .with_status(404)
            .with_body(r#"{"error":"Certificate not found"}"#)
            .create_async()
            .await;

        let err = assert_err!(repository(&server).get_by_uuid(&signed_in(), "nope").await);
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_create_with_missing_field_sends_nothing() {
        let mut server = mockito::Server::new_async().await;
        let post = server.mock("POST", "/api/certificates").expect(0).create_async().await;

        let input = NewCertificate { program: String::new(), ..amina() };
        let err = assert_err!(repository(&server).create(&signed_in(), &input).await);
        assert!(matches!(err, ClientError::Validation { field: Some(ref f), .. } if f == "program"));
        post.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_reads_back_the_issued_record() {
        let mut server = mockito::Server::new_async().await;
        let post = server
            .mock("POST", "/api/certificates")
            .match_header("authorization", "Bearer tok")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "first_name": "Amina",
                "degree": "Bachelor of Science",
                "issue_date": "2024-06-01"
            })))
            .with_status(201)
            .with_body(format!(r#"{{"id": 7, "uuid": "{UUID}", "message": "Certificate issued successfully"}}"#))
            .create_async()
            .await;
        server
            .mock("GET", format!("/api/certificates/{UUID}").as_str())
            .with_body(certificate_json(false))
            .create_async()
            .await;

        let certificate = assert_ok!(repository(&server).create(&signed_in(), &amina()).await);
        assert_eq!(certificate.uuid, UUID);
        assert!(!certificate.revoked);
        assert_eq!(certificate.student.name, "Amina Ali");
        post.assert_async().await;
    }

    #[tokio::test]
    async fn test_committed_issuance_survives_failed_read_back() {
        let mut server = mockito::Server::new_async().await;
        let post = server
            .mock("POST", "/api/certificates")
            .with_status(201)
            .with_body(r#"{"id": 7, "uuid": "u-7"}"#)
            .expect(1)
            .create_async()
            .await;
        server
            .mock("GET", "/api/certificates/u-7")
            .with_status(503)
            .create_async()
            .await;

        let certificate = assert_ok!(repository(&server).create(&signed_in(), &amina()).await);
        assert_eq!((certificate.id, certificate.uuid.as_str()), (7, "u-7"));
        assert_eq!(certificate.student.name, "Amina Ali");
        assert_eq!(certificate.program, "Computer Science");
        post.assert_async().await;
    }

    #[tokio::test]
    async fn test_revoke_reads_back_the_record() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", format!("/api/certificates/{UUID}/revoke").as_str())
            .with_body(r#"{"message":"Certificate revoked successfully"}"#)
            .create_async()
            .await;
        server
            .mock("GET", format!("/api/certificates/{UUID}").as_str())
            .with_body(certificate_json(true))
            .create_async()
            .await;

        let refreshed = assert_ok!(
            repository(&server)
                .revoke(&signed_in(), UUID, "Academic misconduct")
                .await
        );
        let certificate = refreshed.unwrap();
        assert!(certificate.revoked);
        assert_eq!(certificate.revoked_reason.as_deref(), Some("Academic misconduct"));
    }

    #[tokio::test]
    async fn test_committed_revocation_survives_failed_read_back() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", format!("/api/certificates/{UUID}/revoke").as_str())
            .with_body(r#"{"message":"Certificate revoked successfully"}"#)
            .create_async()
            .await;
        server
            .mock("GET", format!("/api/certificates/{UUID}").as_str())
            .with_status(503)
            .create_async()
            .await;

        let refreshed = assert_ok!(
            repository(&server)
                .revoke(&signed_in(), UUID, "Academic misconduct")
                .await
        );
        assert_eq!(refreshed, None);
    }

    #[tokio::test]
    async fn test_server_side_validation_message_is_surfaced() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/certificates")
            .with_status(400)
            .with_body(r#"{"error":"Student ID already belongs to another student"}"#)
            .create_async()
            .await;

        let err = assert_err!(repository(&server).create(&signed_in(), &amina()).await);
        assert_eq!(err.to_string(), "Student ID already belongs to another student");
    }

    #[tokio::test]
    async fn test_revoke_requires_reason() {
        let mut server = mockito::Server::new_async().await;
        let post = server
            .mock("POST", Matcher::Regex(r"/revoke$".to_string()))
            .expect(0)
            .create_async()
            .await;

        let err = assert_err!(repository(&server).revoke(&signed_in(), UUID, "   ").await);
        assert!(matches!(err, ClientError::Validation { field: Some(ref f), .. } if f == "reason"));
        post.assert_async().await;
    }

    #[tokio::test]
    async fn test_second_revocation_is_a_conflict() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", format!("/api/certificates/{UUID}/revoke").as_str())
            .match_body(Matcher::Json(serde_json::json!({"reason": "duplicate"})))
            .with_status(409)
            .with_body(r#"{"error":"Certificate already revoked"}"#)
            .create_async()
            .await;

        let err = assert_err!(repository(&server).revoke(&signed_in(), UUID, "duplicate").await);
        assert!(matches!(err, ClientError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_download_returns_opaque_bytes() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", format!("/api/certificates/{UUID}/download").as_str())
            .with_header("content-type", "application/pdf")
            .with_body(b"%PDF-1.4 fake".to_vec())
            .create_async()
            .await;

        let bytes = assert_ok!(repository(&server).download(&signed_in(), UUID).await);
        assert_eq!(&bytes[..], b"%PDF-1.4 fake");

        let path = std::env::temp_dir().join(format!("certificate-{}.pdf", uuid::Uuid::new_v4()));
        let written = assert_ok!(repository(&server).save_document(&signed_in(), UUID, &path).await);
        assert_eq!(written, 13);
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.4 fake");
        assert!(!partial_path(&path).exists());
        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn test_failed_save_leaves_no_partial_file() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", format!("/api/certificates/{UUID}/download").as_str())
            .with_body(b"%PDF-1.4 fake".to_vec())
            .create_async()
            .await;

        // A non-empty directory in the way makes the final rename fail.
        let destination = std::env::temp_dir().join(format!("certificate-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(destination.join("occupied")).unwrap();

        let err = assert_err!(
            repository(&server)
                .save_document(&signed_in(), UUID, &destination)
                .await
        );
        assert!(matches!(err, ClientError::Storage(_)));
        assert!(!partial_path(&destination).exists());
        assert!(destination.join("occupied").is_dir());
        std::fs::remove_dir_all(destination).ok();
    }

    #[test]
    fn test_partial_path_is_a_sibling() {
        let partial = partial_path(Path::new("/tmp/out/certificate_a.pdf"));
        assert_eq!(partial, Path::new("/tmp/out/certificate_a.pdf.part"));
    }

    #[tokio::test]
    async fn test_verify_not_found_is_a_value() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/certificates/00000000-0000-0000-0000-000000000000/verify")
            .with_status(404)
            .with_body(r#"{"status":"NOT_FOUND","message":"Certificate not found"}"#)
            .create_async()
            .await;

        let outcome = assert_ok!(
            repository(&server)
                .verify("00000000-0000-0000-0000-000000000000")
                .await
        );
        assert_eq!(outcome, VerificationOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_verify_revoked_carries_reason() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", format!("/api/certificates/{UUID}/verify").as_str())
            .with_body(r#"{"status":"REVOKED","message":"Certificate has been revoked","reason":"Academic misconduct"}"#)
            .create_async()
            .await;

        let outcome = assert_ok!(repository(&server).verify(UUID).await);
        assert_eq!(outcome.status(), VerificationStatus::Revoked);
        assert!(matches!(outcome, VerificationOutcome::Revoked { ref reason, certificate: None } if reason == "Academic misconduct"));
    }

    #[tokio::test]
    async fn test_verify_server_fault_propagates() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", format!("/api/certificates/{UUID}/verify").as_str())
            .with_status(503)
            .create_async()
            .await;

        let err = assert_err!(repository(&server).verify(UUID).await);
        assert!(err.is_transport());
    }
}
