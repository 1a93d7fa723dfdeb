// src/models/verification.rs
//! Public verification contract.
//!
//! `VerificationResponse` is the wire shape of
//! `GET /api/certificates/:uuid/verify`; [`VerificationOutcome`] is the closed
//! four-way classification the client works with.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Display projection of a certificate shown to the public.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CertificateProjection {
    pub student_name: String,
    pub student_id: String,
    pub degree: String,
    pub program: String,
    /// `YYYY-MM-DD`
    pub issue_date: String,
    /// Issuing authority
    pub issuer: String,
}

/// Status tags of the verification contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerificationStatus {
    Valid,
    Revoked,
    NotFound,
    Error,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Valid => "VALID",
            VerificationStatus::Revoked => "REVOKED",
            VerificationStatus::NotFound => "NOT_FOUND",
            VerificationStatus::Error => "ERROR",
        }
    }

    /// Parses a wire tag; anything outside the four known tags is `None`.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "VALID" => Some(VerificationStatus::Valid),
            "REVOKED" => Some(VerificationStatus::Revoked),
            "NOT_FOUND" => Some(VerificationStatus::NotFound),
            "ERROR" => Some(VerificationStatus::Error),
            _ => None,
        }
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw verification payload. The status stays textual so that servers
/// emitting tags outside the contract still decode.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct VerificationResponse {
    pub status: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate: Option<CertificateProjection>,
}

/// What a verification lookup learned about an identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    Found {
        revoked: bool,
        reason: Option<String>,
        certificate: Option<CertificateProjection>,
    },
    /// Nothing is stored under the identifier.
    Absent,
    /// The lookup failed for a reason other than absence.
    Failed(String),
}

/// Result of verifying a certificate. Each case carries only its own data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    Valid {
        certificate: CertificateProjection,
    },
    Revoked {
        reason: String,
        certificate: Option<CertificateProjection>,
    },
    NotFound,
    Error {
        message: String,
    },
}

impl VerificationOutcome {
    pub fn status(&self) -> VerificationStatus {
        match self {
            VerificationOutcome::Valid { .. } => VerificationStatus::Valid,
            VerificationOutcome::Revoked { .. } => VerificationStatus::Revoked,
            VerificationOutcome::NotFound => VerificationStatus::NotFound,
            VerificationOutcome::Error { .. } => VerificationStatus::Error,
        }
    }

    /// User-facing summary line
    pub fn message(&self) -> &str {
        match self {
            VerificationOutcome::Valid { .. } => "Certificate is valid",
            VerificationOutcome::Revoked { .. } => "Certificate has been revoked",
            VerificationOutcome::NotFound => "Certificate not found",
            VerificationOutcome::Error { message } => message,
        }
    }

    pub fn certificate(&self) -> Option<&CertificateProjection> {
        match self {
            VerificationOutcome::Valid { certificate } => Some(certificate),
            VerificationOutcome::Revoked { certificate, .. } => certificate.as_ref(),
            _ => None,
        }
    }

    /// Converts the outcome back into its wire shape.
    pub fn to_response(&self) -> VerificationResponse {
        VerificationResponse {
            status: self.status().as_str().to_string(),
            message: self.message().to_string(),
            reason: match self {
                VerificationOutcome::Revoked { reason, .. } => Some(reason.clone()),
                _ => None,
            },
            certificate: self.certificate().cloned(),
        }
    }
}

impl From<VerificationResponse> for LookupOutcome {
    /// Interprets a verification payload. Tags outside the contract are
    /// treated as a failed lookup rather than a statement about the record.
    fn from(response: VerificationResponse) -> Self {
        match VerificationStatus::parse(&response.status) {
            Some(VerificationStatus::Valid) => LookupOutcome::Found {
                revoked: false,
                reason: response.reason,
                certificate: response.certificate,
            },
            Some(VerificationStatus::Revoked) => LookupOutcome::Found {
                revoked: true,
                reason: response.reason,
                certificate: response.certificate,
            },
            Some(VerificationStatus::NotFound) => LookupOutcome::Absent,
            Some(VerificationStatus::Error) | None => {
                let message = if response.message.trim().is_empty() {
                    format!("Unexpected verification status {:?}", response.status)
                } else {
                    response.message
                };
                LookupOutcome::Failed(message)
            }
        }
    }
}
