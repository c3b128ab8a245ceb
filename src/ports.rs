//! Storage seams.
//!
//! The core never persists anything itself. Lookups and writes go through
//! these traits, implemented by the embedding service over its database or
//! LDAP directory. [`InMemoryStore`] is a complete implementation for tests
//! and small deployments.
//!
//! All methods are synchronous and may be called from several threads.

use {
    crate::pki::{Certificate, CertificateType, RevocationList},
    anyhow::{anyhow, Result},
    std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

pub trait CertificateRepository: Send + Sync {
    /// Certificates whose subject DN equals `subject_dn`.
    fn find_by_subject_dn(&self, subject_dn: &str) -> Result<Vec<Certificate>>;

    fn find_all_by_type(&self, certificate_type: CertificateType) -> Result<Vec<Certificate>>;

    /// `sha256` is the uppercase hex SHA-256 fingerprint.
    fn exists_by_fingerprint(&self, sha256: &str) -> Result<bool>;
}

pub trait CrlRepository: Send + Sync {
    /// Of the CRLs issued by `issuer_dn`, the one with the latest `nextUpdate`.
    fn find_latest_by_issuer_dn(&self, issuer_dn: &str) -> Result<Option<RevocationList>>;
}

pub trait CertificateSink: Send + Sync {
    /// Stores certificates, ignoring those already present by fingerprint.
    /// Returns the ones actually written.
    fn save_all(&self, certificates: &[Certificate]) -> Result<Vec<Certificate>>;
}

pub trait CrlSink: Send + Sync {
    /// Stores a CRL. Storing the same CRL twice is a no-op.
    fn save_crl(&self, crl: &RevocationList) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    certificates: RwLock<Vec<Certificate>>,
    crls:         RwLock<Vec<RevocationList>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_certificates(certificates: impl IntoIterator<Item = Certificate>) -> Result<Self> {
        let store = Self::new();
        store.save_all(&certificates.into_iter().collect::<Vec<_>>())?;
        Ok(store)
    }

    pub fn certificate_count(&self) -> Result<usize> {
        Ok(read(&self.certificates)?.len())
    }

    pub fn crl_count(&self) -> Result<usize> {
        Ok(read(&self.crls)?.len())
    }
}

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>> {
    lock.read().map_err(|_| anyhow!("Store lock poisoned"))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>> {
    lock.write().map_err(|_| anyhow!("Store lock poisoned"))
}

impl CertificateRepository for InMemoryStore {
    fn find_by_subject_dn(&self, subject_dn: &str) -> Result<Vec<Certificate>> {
        Ok(read(&self.certificates)?
            .iter()
            .filter(|cert| cert.subject_dn() == subject_dn)
            .cloned()
            .collect())
    }

    fn find_all_by_type(&self, certificate_type: CertificateType) -> Result<Vec<Certificate>> {
        Ok(read(&self.certificates)?
            .iter()
            .filter(|cert| cert.certificate_type() == certificate_type)
            .cloned()
            .collect())
    }

    fn exists_by_fingerprint(&self, sha256: &str) -> Result<bool> {
        Ok(read(&self.certificates)?
            .iter()
            .any(|cert| cert.fingerprint().sha256 == sha256))
    }
}

impl CertificateSink for InMemoryStore {
    fn save_all(&self, certificates: &[Certificate]) -> Result<Vec<Certificate>> {
        let mut stored = write(&self.certificates)?;
        let mut written = Vec::new();
        for cert in certificates {
            if !stored.contains(cert) && !written.contains(cert) {
                stored.push(cert.clone());
                written.push(cert.clone());
            }
        }
        Ok(written)
    }
}

impl CrlRepository for InMemoryStore {
    fn find_latest_by_issuer_dn(&self, issuer_dn: &str) -> Result<Option<RevocationList>> {
        let crls = read(&self.crls)?;
        Ok(
            RevocationList::latest(crls.iter().filter(|crl| crl.issuer_dn() == issuer_dn))
                .cloned(),
        )
    }
}

impl CrlSink for InMemoryStore {
    fn save_crl(&self, crl: &RevocationList) -> Result<()> {
        let mut crls = write(&self.crls)?;
        if !crls.iter().any(|c| c.fingerprint() == crl.fingerprint()) {
            crls.push(crl.clone());
        }
        Ok(())
    }
}
