// src/models/certificate.rs
//! Certificate data model and issuance input.
//!
//! Field names are part of the wire contract of the certificate API and are
//! serialised exactly as declared here.

use crate::error::{ClientError, Result};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Wire format of `issue_date`.
pub const ISSUE_DATE_FORMAT: &str = "%Y-%m-%d";

/// Degrees accepted at issuance time.
///
/// Stored certificates keep their degree as free text so that records issued
/// under a wider set still read back; the closed set only gates new issuance.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Degree {
    #[serde(rename = "Bachelor of Science")]
    BachelorOfScience,
    #[serde(rename = "Bachelor of Arts")]
    BachelorOfArts,
    #[serde(rename = "Master of Science")]
    MasterOfScience,
    #[serde(rename = "Master of Arts")]
    MasterOfArts,
    #[serde(rename = "Doctor of Philosophy")]
    DoctorOfPhilosophy,
}

impl Degree {
    pub const ALL: [Degree; 5] = [
        Degree::BachelorOfScience,
        Degree::BachelorOfArts,
        Degree::MasterOfScience,
        Degree::MasterOfArts,
        Degree::DoctorOfPhilosophy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Degree::BachelorOfScience => "Bachelor of Science",
            Degree::BachelorOfArts => "Bachelor of Arts",
            Degree::MasterOfScience => "Master of Science",
            Degree::MasterOfArts => "Master of Arts",
            Degree::DoctorOfPhilosophy => "Doctor of Philosophy",
        }
    }
}

impl fmt::Display for Degree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Degree {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        Degree::ALL
            .iter()
            .copied()
            .find(|d| d.as_str() == s.trim())
            .ok_or_else(|| ClientError::invalid_field("degree", format!("Unknown degree: {}", s)))
    }
}

/// Student embedded in a certificate. Not independently addressable.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Student {
    /// Full display name ("first last")
    pub name: String,
    /// Institution-assigned identifier, distinct from the certificate ids
    pub student_id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// A full certificate record as returned by `GET /api/certificates/:uuid`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    /// Server-assigned numeric id
    pub id: i64,
    /// Public, unguessable identifier. Immutable and never reused.
    pub uuid: String,
    pub student: Student,
    pub degree: String,
    pub program: String,
    pub issue_date: NaiveDate,
    pub created_at: NaiveDateTime,
    #[serde(default)]
    pub revoked: bool,
    /// Present iff `revoked` is true
    #[serde(default)]
    pub revoked_reason: Option<String>,
}

impl Certificate {
    /// Checks the revocation invariant: a revoked record carries a non-empty
    /// reason and a live record carries none.
    pub fn is_consistent(&self) -> bool {
        let has_reason = self
            .revoked_reason
            .as_deref()
            .map_or(false, |r| !r.trim().is_empty());
        self.revoked == has_reason
    }

    /// List-view projection of this record.
    pub fn summary(&self) -> CertificateSummary {
        CertificateSummary {
            id: self.id,
            uuid: self.uuid.clone(),
            student_name: self.student.name.clone(),
            student_id: self.student.student_id.clone(),
            degree: self.degree.clone(),
            program: self.program.clone(),
            issue_date: self.issue_date,
            revoked: self.revoked,
            created_at: Some(self.created_at),
        }
    }
}

/// One row of `GET /api/certificates`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CertificateSummary {
    pub id: i64,
    pub uuid: String,
    pub student_name: String,
    pub student_id: String,
    pub degree: String,
    pub program: String,
    pub issue_date: NaiveDate,
    #[serde(default)]
    pub revoked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<NaiveDateTime>,
}

/// Issuance input, as submitted by the issuance form.
///
/// Fields are kept as raw text so that the same value can be validated on
/// both sides of the HTTP boundary.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct NewCertificate {
    pub first_name: String,
    pub last_name: String,
    pub student_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub degree: String,
    pub program: String,
    /// `YYYY-MM-DD`
    pub issue_date: String,
}

impl NewCertificate {
    /// Validates the input before it is submitted.
    ///
    /// Every field except `email` is mandatory; `degree` must come from
    /// [`Degree::ALL`] and `issue_date` must be a calendar date. The first
    /// offending field is reported.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("first_name", &self.first_name, "First name is required"),
            ("last_name", &self.last_name, "Last name is required"),
            ("student_id", &self.student_id, "Student ID is required"),
            ("degree", &self.degree, "Degree is required"),
            ("program", &self.program, "Program is required"),
            ("issue_date", &self.issue_date, "Issue date is required"),
        ];
        for (field, value, message) in required {
            if value.trim().is_empty() {
                return Err(ClientError::invalid_field(field, message));
            }
        }

        self.degree.parse::<Degree>()?;
        self.parsed_issue_date()?;
        Ok(())
    }

    pub fn parsed_issue_date(&self) -> Result<NaiveDate> {
        NaiveDate::parse_from_str(self.issue_date.trim(), ISSUE_DATE_FORMAT).map_err(|_| {
            ClientError::invalid_field(
                "issue_date",
                format!("Issue date must be YYYY-MM-DD, got {:?}", self.issue_date),
            )
        })
    }

    /// Email with blank input treated as absent.
    pub fn email(&self) -> Option<&str> {
        self.email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
    }

    pub fn student_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
    }
}

/// Body of `POST /api/certificates/:uuid/revoke`
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct RevokeRequest {
    pub reason: String,
}

/// Response to a successful issuance.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct IssueReceipt {
    pub id: i64,
    pub uuid: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl IssueReceipt {
    /// Record assembled from the receipt and the submitted input, for when
    /// the stored record cannot be read back. `created_at` is the local clock.
    pub fn into_certificate(self, input: &NewCertificate) -> Result<Certificate> {
        Ok(Certificate {
            id: self.id,
            uuid: self.uuid,
            student: Student {
                name: input.student_name(),
                student_id: input.student_id.trim().to_string(),
                email: input.email().map(String::from),
            },
            degree: input.degree.trim().to_string(),
            program: input.program.trim().to_string(),
            issue_date: input.parsed_issue_date()?,
            created_at: Utc::now().naive_utc(),
            revoked: false,
            revoked_reason: None,
        })
    }
}
