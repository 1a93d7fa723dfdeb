// src/storage/certificate_store.rs
//! In-memory certificate storage for the reference server.
//!
//! Holds certificates by uuid alongside the student and admin records they
//! reference. Insertion order is kept so that listings come back in the
//! order certificates were issued. Not thread-safe on its own; the server
//! wraps it in a lock.

use crate::models::admin::Admin;
use crate::models::certificate::{Certificate, CertificateSummary, Student};
use std::collections::HashMap;
use thiserror::Error;

/// Failures of store mutations.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum StoreError {
    #[error("Certificate not found")]
    NotFound,
    #[error("Certificate already revoked")]
    AlreadyRevoked,
    #[error("Revocation reason is required")]
    EmptyReason,
    #[error("Certificate {0} already exists")]
    DuplicateUuid(String),
    #[error("Admin {0} already exists")]
    DuplicateAdmin(String),
}

/// A certificate together with the issuer signature over its canonical payload.
#[derive(Debug, Clone)]
pub struct StoredCertificate {
    pub record: Certificate,
    /// Base64 ECDSA signature
    pub signature: String,
}

/// Admin account with its password hash.
#[derive(Debug, Clone)]
pub struct AdminAccount {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
}

impl AdminAccount {
    pub fn admin(&self) -> Admin {
        Admin {
            id: self.id,
            username: self.username.clone(),
        }
    }
}

#[derive(Default)]
pub struct CertificateStore {
    certificates: HashMap<String, StoredCertificate>,
    /// Uuids in issuance order
    order: Vec<String>,
    /// Students by institution-assigned id
    students: HashMap<String, Student>,
    admins: HashMap<String, AdminAccount>,
    last_certificate_id: i64,
    last_admin_id: i64,
}

impl CertificateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the student registered under `student.student_id`, registering
    /// `student` first if there is none. An existing record is never altered.
    pub fn upsert_student(&mut self, student: Student) -> Student {
        self.students
            .entry(student.student_id.clone())
            .or_insert(student)
            .clone()
    }

    /// Reserves the next sequential certificate id.
    pub fn next_certificate_id(&mut self) -> i64 {
        self.last_certificate_id += 1;
        self.last_certificate_id
    }

    /// Stores a new certificate.
    ///
    /// # Errors
    /// `DuplicateUuid` if a certificate with the same uuid exists; uuids are
    /// never reused.
    pub fn insert(&mut self, certificate: StoredCertificate) -> Result<(), StoreError> {
        let uuid = certificate.record.uuid.clone();
        if self.certificates.contains_key(&uuid) {
            return Err(StoreError::DuplicateUuid(uuid));
        }
        self.order.push(uuid.clone());
        self.certificates.insert(uuid, certificate);
        Ok(())
    }

    pub fn get(&self, uuid: &str) -> Option<&StoredCertificate> {
        self.certificates.get(uuid)
    }

    /// All certificates as list rows, oldest first.
    pub fn list(&self) -> Vec<CertificateSummary> {
        self.order
            .iter()
            .filter_map(|uuid| self.certificates.get(uuid))
            .map(|stored| stored.record.summary())
            .collect()
    }

    pub fn count(&self) -> usize {
        self.certificates.len()
    }

    /// Marks a certificate revoked. Revocation is permanent and happens once.
    ///
    /// # Errors
    /// - `EmptyReason` for a blank reason
    /// - `NotFound` for an unknown uuid
    /// - `AlreadyRevoked` if the certificate is revoked; its reason is kept
    pub fn revoke(&mut self, uuid: &str, reason: &str) -> Result<&Certificate, StoreError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(StoreError::EmptyReason);
        }
        let stored = self.certificates.get_mut(uuid).ok_or(StoreError::NotFound)?;
        if stored.record.revoked {
            return Err(StoreError::AlreadyRevoked);
        }
        stored.record.revoked = true;
        stored.record.revoked_reason = Some(reason.to_string());
        Ok(&stored.record)
    }

    /// Registers an admin account.
    pub fn add_admin(&mut self, username: &str, password_hash: String) -> Result<Admin, StoreError> {
        if self.admins.contains_key(username) {
            return Err(StoreError::DuplicateAdmin(username.to_string()));
        }
        self.last_admin_id += 1;
        let account = AdminAccount {
            id: self.last_admin_id,
            username: username.to_string(),
            password_hash,
        };
        let admin = account.admin();
        self.admins.insert(username.to_string(), account);
        Ok(admin)
    }

    pub fn find_admin(&self, username: &str) -> Option<&AdminAccount> {
        self.admins.get(username)
    }

    pub fn admin_by_id(&self, id: i64) -> Option<Admin> {
        self.admins
            .values()
            .find(|account| account.id == id)
            .map(AdminAccount::admin)
    }
}
