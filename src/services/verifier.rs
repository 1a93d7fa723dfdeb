// src/services/verifier.rs
//! Certificate verification for the public verification surface.
//!
//! Two layers:
//! - [`evaluate`]: a pure four-way classification of a lookup outcome
//! - [`Verifier`]: runs lookups through the repository, folds transport
//!   failures into `Error` and discards responses to superseded requests

use crate::client::CertificateRepository;
use crate::models::verification::{LookupOutcome, VerificationOutcome};
use log::{debug, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Message shown when a lookup fails for reasons other than absence.
pub const GENERIC_FAILURE: &str = "Verification failed. Please try again.";

/// Classifies a lookup outcome. Performs no I/O.
///
/// # Returns
/// - `Valid` for a found, live certificate carrying its display projection
/// - `Revoked` for a found, revoked certificate carrying its reason
/// - `NotFound` for an absent identifier
/// - `Error` for failed lookups and for found records that break the
///   contract (live without projection, revoked without reason)
pub fn evaluate(lookup: LookupOutcome) -> VerificationOutcome {
    match lookup {
        LookupOutcome::Found {
            revoked: false,
            certificate: Some(certificate),
            ..
        } => VerificationOutcome::Valid { certificate },
        LookupOutcome::Found { revoked: false, .. } => VerificationOutcome::Error {
            message: "Verification response is missing the certificate details".to_string(),
        },
        LookupOutcome::Found {
            revoked: true,
            reason: Some(reason),
            certificate,
        } if !reason.trim().is_empty() => VerificationOutcome::Revoked { reason, certificate },
        LookupOutcome::Found { revoked: true, .. } => VerificationOutcome::Error {
            message: "Revoked certificate is missing its revocation reason".to_string(),
        },
        LookupOutcome::Absent => VerificationOutcome::NotFound,
        LookupOutcome::Failed(message) => VerificationOutcome::Error { message },
    }
}

/// Identity of one issued request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

/// Last-request-wins bookkeeping.
///
/// Every request takes a ticket; only the holder of the newest ticket may
/// publish its response.
#[derive(Debug, Clone, Default)]
pub struct RequestTracker {
    latest: Arc<AtomicU64>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> Ticket {
        Ticket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }
}

/// Public certificate verifier.
///
/// Clones share the same tracker, so a verification started from any clone
/// supersedes those still in flight on the others.
#[derive(Clone, Debug)]
pub struct Verifier {
    repository: CertificateRepository,
    tracker: RequestTracker,
}

impl Verifier {
    pub fn new(repository: CertificateRepository) -> Self {
        Self {
            repository,
            tracker: RequestTracker::new(),
        }
    }

    /// Verifies a certificate by identifier.
    ///
    /// # Returns
    /// - `None` for blank input (nothing is sent) or when a newer
    ///   verification started before this one resolved
    /// - `Some(outcome)` otherwise; never an error
    pub async fn verify_certificate(&self, identifier: &str) -> Option<VerificationOutcome> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return None;
        }

        let ticket = self.tracker.begin();
        let lookup = match self.repository.lookup(identifier).await {
            Ok(lookup) => lookup,
            Err(e) => {
                warn!("Verification of {} failed: {}", identifier, e);
                LookupOutcome::Failed(GENERIC_FAILURE.to_string())
            }
        };

        if !self.tracker.is_current(ticket) {
            debug!("Discarding stale verification result for {}", identifier);
            return None;
        }
        Some(evaluate(lookup))
    }
}
