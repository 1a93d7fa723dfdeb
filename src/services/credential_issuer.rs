// src/services/credential_issuer.rs
//! Certificate Issuer Service
//!
//! Issues, revokes and verifies certificates held by the reference server.
//!
//! Every certificate is signed at issuance over its canonical payload:
//! the compact JSON object
//! `{degree, issue_date, issuer, program, student_id, student_name, uuid}`
//! with keys in that (lexicographic) order. Verification recomputes the
//! payload from the stored record and checks the signature against it, so
//! any change to a signed field after issuance is detected.

use crate::error::ServerError;
use crate::models::certificate::{
    Certificate, CertificateSummary, NewCertificate, Student, ISSUE_DATE_FORMAT,
};
use crate::models::verification::{CertificateProjection, VerificationOutcome};
use crate::storage::{CertificateStore, StoredCertificate};
use crate::utils::crypto::CertificateSigner;
use crate::utils::serialization::serialize;
use chrono::Utc;
use log::{info, warn};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Service for the certificate lifecycle on the server side.
///
/// Cheap to clone; clones share the same store and signing key.
#[derive(Clone)]
pub struct CredentialIssuer {
    store: Arc<RwLock<CertificateStore>>,
    signer: CertificateSigner,
    /// Issuing authority named in every certificate
    issuer_name: String,
}

impl CredentialIssuer {
    /// Creates a new CredentialIssuer instance
    ///
    /// # Arguments
    /// * `store` - Shared certificate store
    /// * `signer` - Key used to sign canonical payloads
    /// * `issuer_name` - Issuing authority, part of every signed payload
    pub fn new(store: Arc<RwLock<CertificateStore>>, signer: CertificateSigner, issuer_name: &str) -> Self {
        Self {
            store,
            signer,
            issuer_name: issuer_name.to_string(),
        }
    }

    pub fn issuer_name(&self) -> &str {
        &self.issuer_name
    }

    /// Canonical payload signed for `certificate`.
    pub fn canonical_payload(&self, certificate: &Certificate) -> Result<String, serde_json::Error> {
        // serde_json maps keep keys sorted
        serialize(&json!({
            "degree": certificate.degree,
            "issue_date": certificate.issue_date.format(ISSUE_DATE_FORMAT).to_string(),
            "issuer": self.issuer_name,
            "program": certificate.program,
            "student_id": certificate.student.student_id,
            "student_name": certificate.student.name,
            "uuid": certificate.uuid,
        }))
    }

    /// Public display projection of `certificate`.
    pub fn projection(&self, certificate: &Certificate) -> CertificateProjection {
        CertificateProjection {
            student_name: certificate.student.name.clone(),
            student_id: certificate.student.student_id.clone(),
            degree: certificate.degree.clone(),
            program: certificate.program.clone(),
            issue_date: certificate.issue_date.format(ISSUE_DATE_FORMAT).to_string(),
            issuer: self.issuer_name.clone(),
        }
    }

    /// Issues a new certificate.
    ///
    /// # Arguments
    /// * `input` - Issuance form; validated with the same rules as the client
    ///
    /// # Returns
    /// The stored record with a fresh uuid, the next sequential id and a
    /// creation timestamp. A student already registered under the same
    /// `student_id` is reused as is.
    ///
    /// # Errors
    /// `BadRequest` for invalid input, `Internal` if signing fails.
    pub async fn issue_certificate(&self, input: &NewCertificate) -> Result<Certificate, ServerError> {
        input.validate()?;
        let issue_date = input.parsed_issue_date()?;
        let degree = input.degree.trim().to_string();

        let mut store = self.store.write().await;
        let student = store.upsert_student(Student {
            name: input.student_name(),
            student_id: input.student_id.trim().to_string(),
            email: input.email().map(str::to_string),
        });

        let certificate = Certificate {
            id: store.next_certificate_id(),
            uuid: Uuid::new_v4().to_string(),
            student,
            degree,
            program: input.program.trim().to_string(),
            issue_date,
            created_at: Utc::now().naive_utc(),
            revoked: false,
            revoked_reason: None,
        };
        let signature = self.signer.sign(self.canonical_payload(&certificate)?.as_bytes());

        store.insert(StoredCertificate {
            record: certificate.clone(),
            signature,
        })?;
        info!("Issued certificate {} to {}", certificate.uuid, certificate.student.student_id);
        Ok(certificate)
    }

    /// Revokes a certificate. Irreversible.
    ///
    /// # Errors
    /// `BadRequest` for a blank reason, `NotFound` for an unknown uuid,
    /// `Conflict` if already revoked.
    pub async fn revoke_certificate(&self, uuid: &str, reason: &str) -> Result<Certificate, ServerError> {
        let mut store = self.store.write().await;
        let revoked = store.revoke(uuid, reason)?.clone();
        info!("Revoked certificate {}", uuid);
        Ok(revoked)
    }

    pub async fn certificate(&self, uuid: &str) -> Option<Certificate> {
        let store = self.store.read().await;
        store.get(uuid).map(|stored| stored.record.clone())
    }

    pub async fn list_certificates(&self) -> Vec<CertificateSummary> {
        self.store.read().await.list()
    }

    /// Classifies a certificate for public verification.
    ///
    /// Revocation is reported before the signature is checked, with the
    /// stored reason and without the display projection.
    pub async fn verify_certificate(&self, uuid: &str) -> VerificationOutcome {
        let store = self.store.read().await;
        let Some(stored) = store.get(uuid) else {
            return VerificationOutcome::NotFound;
        };
        let record = &stored.record;

        if record.revoked {
            return VerificationOutcome::Revoked {
                reason: record.revoked_reason.clone().unwrap_or_default(),
                certificate: None,
            };
        }

        let payload = match self.canonical_payload(record) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Could not encode payload of {}: {}", uuid, e);
                return VerificationOutcome::Error {
                    message: "Certificate could not be verified".to_string(),
                };
            }
        };
        if !self.signer.verify(payload.as_bytes(), &stored.signature) {
            warn!("Signature mismatch for certificate {}", uuid);
            return VerificationOutcome::Error {
                message: "Certificate signature is invalid".to_string(),
            };
        }

        VerificationOutcome::Valid {
            certificate: self.projection(record),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::verification::VerificationStatus;

    fn issuer() -> CredentialIssuer {
        CredentialIssuer::new(
            Arc::new(RwLock::new(CertificateStore::new())),
            CertificateSigner::generate(),
            "Puntland State University",
        )
    }

    fn amina() -> NewCertificate {
        NewCertificate {
            first_name: "Amina".into(),
            last_name: "Ali".into(),
            student_id: "S1001".into(),
            email: Some("amina@example.edu".into()),
            degree: "Bachelor of Science".into(),
            program: "Computer Science".into(),
            issue_date: "2024-06-01".into(),
        }
    }

    #[tokio::test]
    async fn test_issue_then_verify_valid() {
        let issuer = issuer();
        let cert = issuer.issue_certificate(&amina()).await.unwrap();

        assert_eq!(cert.id, 1);
        assert!(!cert.revoked);
        assert!(Uuid::parse_str(&cert.uuid).is_ok());

        match issuer.verify_certificate(&cert.uuid).await {
            VerificationOutcome::Valid { certificate } => {
                assert_eq!(certificate.student_name, "Amina Ali");
                assert_eq!(certificate.issue_date, "2024-06-01");
                assert_eq!(certificate.issuer, "Puntland State University");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_canonical_payload_key_order() {
        let issuer = issuer();
        let cert = issuer.issue_certificate(&amina()).await.unwrap();
        let payload = issuer.canonical_payload(&cert).unwrap();
        assert_eq!(
            payload,
            format!(
                r#"{{"degree":"Bachelor of Science","issue_date":"2024-06-01","issuer":"Puntland State University","program":"Computer Science","student_id":"S1001","student_name":"Amina Ali","uuid":"{}"}}"#,
                cert.uuid
            )
        );
    }

    #[tokio::test]
    async fn test_tampered_record_fails_signature_check() {
        let issuer = issuer();
        let cert = issuer.issue_certificate(&amina()).await.unwrap();
        {
            let mut store = issuer.store.write().await;
            let stored = StoredCertificate {
                record: Certificate {
                    uuid: "tampered".into(),
                    program: "Medicine".into(),
                    ..cert.clone()
                },
                signature: store.get(&cert.uuid).unwrap().signature.clone(),
            };
            store.insert(stored).unwrap();
        }

        let outcome = issuer.verify_certificate("tampered").await;
        assert_eq!(outcome.status(), VerificationStatus::Error);
        assert_eq!(outcome.message(), "Certificate signature is invalid");
    }

    #[tokio::test]
    async fn test_revoke_then_verify() {
        let issuer = issuer();
        let cert = issuer.issue_certificate(&amina()).await.unwrap();

        let revoked = issuer.revoke_certificate(&cert.uuid, "Academic misconduct").await.unwrap();
        assert!(revoked.revoked);

        assert_eq!(
            issuer.verify_certificate(&cert.uuid).await,
            VerificationOutcome::Revoked {
                reason: "Academic misconduct".into(),
                certificate: None
            }
        );
        assert_eq!(
            issuer.revoke_certificate(&cert.uuid, "duplicate").await.unwrap_err(),
            ServerError::Conflict("Certificate already revoked".into())
        );
    }

    #[tokio::test]
    async fn test_unknown_and_invalid() {
        let issuer = issuer();
        assert_eq!(
            issuer.verify_certificate("00000000-0000-0000-0000-000000000000").await,
            VerificationOutcome::NotFound
        );

        let input = NewCertificate { program: String::new(), ..amina() };
        assert_eq!(
            issuer.issue_certificate(&input).await.unwrap_err(),
            ServerError::BadRequest("Program is required".into())
        );
        assert!(issuer.list_certificates().await.is_empty());
    }

    #[tokio::test]
    async fn test_student_record_reused_across_certificates() {
        let issuer = issuer();
        issuer.issue_certificate(&amina()).await.unwrap();
        let second = NewCertificate {
            first_name: "Other".into(),
            degree: "Master of Science".into(),
            ..amina()
        };
        let cert = issuer.issue_certificate(&second).await.unwrap();

        assert_eq!(cert.id, 2);
        assert_eq!(cert.student.name, "Amina Ali");
        let list = issuer.list_certificates().await;
        assert_eq!(list.len(), 2);
        assert_eq!(list[1].uuid, cert.uuid);
    }
}
