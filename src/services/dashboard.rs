// src/services/dashboard.rs
//! Admin dashboard figures derived from the certificate list.

use crate::models::certificate::CertificateSummary;
use serde::Serialize;

/// Number of recent certificates shown when the caller does not say.
pub const DEFAULT_RECENT: usize = 5;

/// Totals and the most recent issuances.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct DashboardSummary {
    pub total: usize,
    pub valid: usize,
    pub revoked: usize,
    /// Leading `recent` entries of the list, in server order
    pub recent: Vec<CertificateSummary>,
}

impl DashboardSummary {
    /// Summarises a certificate list.
    ///
    /// # Arguments
    /// * `certificates` - List as returned by the server
    /// * `recent` - How many leading entries to keep
    pub fn from_certificates(certificates: &[CertificateSummary], recent: usize) -> Self {
        let revoked = certificates.iter().filter(|c| c.revoked).count();
        Self {
            total: certificates.len(),
            valid: certificates.len() - revoked,
            revoked,
            recent: certificates.iter().take(recent).cloned().collect(),
        }
    }
}
