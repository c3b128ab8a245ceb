//! DSC to CSCA path building.
//!
//! Issuers are found by exact subject DN string match and tried in the order
//! the repository returns them. The first candidate that validates all the way
//! to a self-signed root wins. Revocation is not checked here, see
//! [`super::revocation`].

use {
    super::{certificate::Validity, Certificate},
    crate::{crypto::SignatureError, error::ErrorCode, ports::CertificateRepository},
    chrono::{DateTime, Utc},
    thiserror::Error,
    tracing::{debug, warn},
};

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("No trust anchor found for issuer {0}")]
    NoTrustAnchorFound(String),

    #[error("Chain exceeds the maximum depth of {0}")]
    ChainTooDeep(usize),

    #[error("Signature of {0} does not verify")]
    SignatureMismatch(String),

    #[error("Unsupported signature algorithm or key for {0}")]
    UnsupportedAlgorithm(String),

    #[error("Certificate {0} has expired")]
    Expired(String),

    #[error("Certificate {0} is not yet valid")]
    NotYetValid(String),

    #[error("Issuer {0} is not a CA")]
    IssuerNotCa(String),

    #[error("Path length constraint of {0} exceeded")]
    PathLengthExceeded(String),

    #[error("Trust anchor country {found:?} does not match {expected}")]
    CountryMismatch {
        expected: String,
        found:    Option<String>,
    },
}

impl ChainError {
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NoTrustAnchorFound(_) => ErrorCode::NoTrustAnchorFound,
            Self::ChainTooDeep(_) => ErrorCode::ChainTooDeep,
            Self::SignatureMismatch(_) => ErrorCode::SignatureMismatch,
            Self::UnsupportedAlgorithm(_) => ErrorCode::UnsupportedAlgorithm,
            Self::Expired(_) => ErrorCode::CertificateExpired,
            Self::NotYetValid(_) => ErrorCode::CertificateNotYetValid,
            Self::IssuerNotCa(_) => ErrorCode::IssuerNotCa,
            Self::PathLengthExceeded(_) => ErrorCode::PathLengthExceeded,
            Self::CountryMismatch { .. } => ErrorCode::TrustAnchorCountryMismatch,
        }
    }
}

/// A validated path, leaf first, self-signed root last.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrustChain {
    pub path: Vec<Certificate>,
}

impl TrustChain {
    pub fn anchor(&self) -> Option<&Certificate> {
        self.path.last()
    }
}

pub struct TrustChainBuilder<'a> {
    repository:     &'a dyn CertificateRepository,
    max_depth:      usize,
    anchor_country: Option<String>,
}

impl<'a> TrustChainBuilder<'a> {
    pub const DEFAULT_MAX_DEPTH: usize = 5;

    pub fn new(repository: &'a dyn CertificateRepository, max_depth: usize) -> Self {
        Self {
            repository,
            max_depth,
            anchor_country: None,
        }
    }

    /// Requires the root's subject `C` to equal `country`.
    #[must_use]
    pub fn with_anchor_country(mut self, country: impl Into<String>) -> Self {
        self.anchor_country = Some(country.into());
        self
    }

    pub fn build(&self, leaf: &Certificate, at: DateTime<Utc>) -> Result<TrustChain, ChainError> {
        if leaf.is_self_issued() {
            check_validity(leaf, at)?;
            self.check_root(leaf)?;
            return Ok(TrustChain {
                path: vec![leaf.clone()],
            });
        }

        let path = vec![leaf.clone()];
        let issuers = self.extend(&path, leaf, self.max_depth, at)?;
        Ok(TrustChain {
            path: path.into_iter().chain(issuers).collect(),
        })
    }

    /// Returns the issuers above `current`, up to and including the root.
    fn extend(
        &self,
        path: &[Certificate],
        current: &Certificate,
        remaining: usize,
        at: DateTime<Utc>,
    ) -> Result<Vec<Certificate>, ChainError> {
        if remaining == 0 {
            return Err(ChainError::ChainTooDeep(self.max_depth));
        }

        let candidates = self.candidates(current, path);
        let mut first_error = None;
        for candidate in candidates {
            match self.try_candidate(path, current, candidate, remaining, at) {
                Ok(issuers) => return Ok(issuers),
                Err(e) => {
                    debug!(subject = current.subject_dn(), error = %e, "Issuer candidate rejected");
                    first_error.get_or_insert(e);
                }
            }
        }
        Err(first_error
            .unwrap_or_else(|| ChainError::NoTrustAnchorFound(current.issuer_dn().to_owned())))
    }

    fn candidates(&self, current: &Certificate, path: &[Certificate]) -> Vec<Certificate> {
        let found = match self.repository.find_by_subject_dn(current.issuer_dn()) {
            Ok(found) => found,
            Err(e) => {
                warn!(issuer = current.issuer_dn(), error = %e, "Issuer lookup failed");
                Vec::new()
            }
        };
        found
            .into_iter()
            .filter(|cert| cert.subject_dn() == current.issuer_dn())
            .filter(|cert| !path.contains(cert))
            .collect()
    }

    fn try_candidate(
        &self,
        path: &[Certificate],
        current: &Certificate,
        candidate: Certificate,
        remaining: usize,
        at: DateTime<Utc>,
    ) -> Result<Vec<Certificate>, ChainError> {
        current
            .verify_issued_by(&candidate)
            .map_err(|e| signature_error(current, &e))?;
        check_validity(current, at)?;
        check_validity(&candidate, at)?;
        if !candidate.is_ca() {
            return Err(ChainError::IssuerNotCa(candidate.subject_dn().to_owned()));
        }
        if let Some(max) = candidate.path_len() {
            // Intermediate CAs below the candidate, self-issued ones excepted.
            let intermediates = path
                .iter()
                .skip(1)
                .filter(|cert| !cert.is_self_issued())
                .count();
            if intermediates > usize::from(max) {
                return Err(ChainError::PathLengthExceeded(
                    candidate.subject_dn().to_owned(),
                ));
            }
        }

        if candidate.is_self_issued() {
            self.check_root(&candidate)?;
            return Ok(vec![candidate]);
        }

        let mut extended = path.to_vec();
        extended.push(candidate.clone());
        let issuers = self.extend(&extended, &candidate, remaining - 1, at)?;
        Ok(std::iter::once(candidate).chain(issuers).collect())
    }

    fn check_root(&self, root: &Certificate) -> Result<(), ChainError> {
        root.verify_issued_by(root)
            .map_err(|e| signature_error(root, &e))?;
        if let Some(expected) = &self.anchor_country {
            if root.country() != Some(expected.as_str()) {
                return Err(ChainError::CountryMismatch {
                    expected: expected.clone(),
                    found:    root.country().map(str::to_owned),
                });
            }
        }
        Ok(())
    }
}

fn check_validity(cert: &Certificate, at: DateTime<Utc>) -> Result<(), ChainError> {
    match cert.validity_at(at) {
        Validity::Valid => Ok(()),
        Validity::Expired => Err(ChainError::Expired(cert.subject_dn().to_owned())),
        Validity::NotYetValid => Err(ChainError::NotYetValid(cert.subject_dn().to_owned())),
    }
}

fn signature_error(cert: &Certificate, error: &SignatureError) -> ChainError {
    match error.code() {
        ErrorCode::SignatureMismatch => ChainError::SignatureMismatch(cert.subject_dn().to_owned()),
        _ => ChainError::UnsupportedAlgorithm(cert.subject_dn().to_owned()),
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::ports::{CertificateSink, InMemoryStore},
        anyhow::Result,
        chrono::TimeZone,
    };

    const CSCA: &[u8] = include_bytes!("../../tests/dataset/csca.der");
    const CSCA_EC: &[u8] = include_bytes!("../../tests/dataset/csca_ec.der");
    const CSCA_LINK: &[u8] = include_bytes!("../../tests/dataset/csca_link.der");
    const DSC: &[u8] = include_bytes!("../../tests/dataset/dsc.der");
    const DSC_EC: &[u8] = include_bytes!("../../tests/dataset/dsc_ec.der");
    const DSC_LINK: &[u8] = include_bytes!("../../tests/dataset/dsc_link.der");
    const DSC_ROGUE: &[u8] = include_bytes!("../../tests/dataset/dsc_rogue.der");
    const DSC_BY_DSC: &[u8] = include_bytes!("../../tests/dataset/dsc_by_dsc.der");
    const CSCA_PL0: &[u8] = include_bytes!("../../tests/dataset/csca_pl0.der");
    const ICA_PL0: &[u8] = include_bytes!("../../tests/dataset/ica_pl0.der");
    const DSC_PL0: &[u8] = include_bytes!("../../tests/dataset/dsc_pl0.der");
    const CSCA_BP: &[u8] = include_bytes!("../../tests/dataset/csca_bp.der");
    const DSC_BP: &[u8] = include_bytes!("../../tests/dataset/dsc_bp.der");
    const DSC_EXPLICIT: &[u8] = include_bytes!("../../tests/dataset/dsc_explicit.der");

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()
    }

    fn store() -> Result<InMemoryStore> {
        let store = InMemoryStore::new();
        store.save_all(&[
            Certificate::from_der(CSCA)?,
            Certificate::from_der(CSCA_EC)?,
            Certificate::from_der(CSCA_LINK)?,
        ])?;
        Ok(store)
    }

    #[test]
    fn test_direct() -> Result<()> {
        let store = store()?;
        let chain = TrustChainBuilder::new(&store, 5).build(&Certificate::from_der(DSC)?, at())?;
        assert_eq!(chain.path.len(), 2);
        assert_eq!(chain.anchor().map(Certificate::serial_number), Some("1001"));
        Ok(())
    }

    #[test]
    fn test_ecdsa_with_path_length_zero() -> Result<()> {
        let store = store()?;
        let chain =
            TrustChainBuilder::new(&store, 5).build(&Certificate::from_der(DSC_EC)?, at())?;
        assert_eq!(chain.anchor().map(Certificate::serial_number), Some("2001"));
        Ok(())
    }

    #[test]
    fn test_link_certificate() -> Result<()> {
        let store = store()?;
        let dsc = Certificate::from_der(DSC_LINK)?;
        let chain = TrustChainBuilder::new(&store, 5).build(&dsc, at())?;
        let serials: Vec<_> = chain.path.iter().map(Certificate::serial_number).collect();
        assert_eq!(serials, ["3002", "1002", "1001"]);

        let error = TrustChainBuilder::new(&store, 1).build(&dsc, at()).unwrap_err();
        assert_eq!(error, ChainError::ChainTooDeep(1));
        Ok(())
    }

    #[test]
    fn test_wrong_key() -> Result<()> {
        let store = store()?;
        let error = TrustChainBuilder::new(&store, 5)
            .build(&Certificate::from_der(DSC_ROGUE)?, at())
            .unwrap_err();
        assert_eq!(error.code(), ErrorCode::SignatureMismatch);
        Ok(())
    }

    #[test]
    fn test_no_anchor() -> Result<()> {
        let store = InMemoryStore::new();
        let error = TrustChainBuilder::new(&store, 5)
            .build(&Certificate::from_der(DSC)?, at())
            .unwrap_err();
        assert_eq!(error.code(), ErrorCode::NoTrustAnchorFound);
        Ok(())
    }

    #[test]
    fn test_anchor_country() -> Result<()> {
        let store = store()?;
        let dsc = Certificate::from_der(DSC)?;
        TrustChainBuilder::new(&store, 5)
            .with_anchor_country("UT")
            .build(&dsc, at())?;
        let error = TrustChainBuilder::new(&store, 5)
            .with_anchor_country("DE")
            .build(&dsc, at())
            .unwrap_err();
        assert_eq!(error.code(), ErrorCode::TrustAnchorCountryMismatch);
        Ok(())
    }

    #[test]
    fn test_self_signed_leaf() -> Result<()> {
        let store = InMemoryStore::new();
        let csca = Certificate::from_der(CSCA)?;
        let chain = TrustChainBuilder::new(&store, 5).build(&csca, at())?;
        assert_eq!(chain.path, vec![csca]);
        Ok(())
    }

    #[test]
    fn test_issuer_not_ca() -> Result<()> {
        let store = store()?;
        store.save_all(&[Certificate::from_der(DSC)?])?;
        let error = TrustChainBuilder::new(&store, 5)
            .build(&Certificate::from_der(DSC_BY_DSC)?, at())
            .unwrap_err();
        assert_eq!(error.code(), ErrorCode::IssuerNotCa);
        assert_eq!(
            error,
            ChainError::IssuerNotCa(Certificate::from_der(DSC)?.subject_dn().to_owned())
        );
        Ok(())
    }

    #[test]
    fn test_path_length_exceeded() -> Result<()> {
        let store = InMemoryStore::with_certificates([
            Certificate::from_der(CSCA_PL0)?,
            Certificate::from_der(ICA_PL0)?,
        ])?;
        let builder = TrustChainBuilder::new(&store, 5);

        // The intermediate itself sits directly below the root.
        let chain = builder.build(&Certificate::from_der(ICA_PL0)?, at())?;
        assert_eq!(chain.path.len(), 2);

        let error = builder
            .build(&Certificate::from_der(DSC_PL0)?, at())
            .unwrap_err();
        assert_eq!(error.code(), ErrorCode::PathLengthExceeded);
        assert_eq!(
            error,
            ChainError::PathLengthExceeded(
                Certificate::from_der(CSCA_PL0)?.subject_dn().to_owned()
            )
        );
        Ok(())
    }

    #[test]
    fn test_brainpool() -> Result<()> {
        let store = InMemoryStore::with_certificates([Certificate::from_der(CSCA_BP)?])?;
        let chain =
            TrustChainBuilder::new(&store, 5).build(&Certificate::from_der(DSC_BP)?, at())?;
        assert_eq!(chain.anchor().map(Certificate::serial_number), Some("2002"));
        Ok(())
    }

    #[test]
    fn test_explicit_curve_parameters() -> Result<()> {
        let store = store()?;
        let dsc = Certificate::from_der(DSC_EXPLICIT)?;
        dsc.public_key()?;
        let chain = TrustChainBuilder::new(&store, 5).build(&dsc, at())?;
        assert_eq!(chain.anchor().map(Certificate::serial_number), Some("1001"));
        Ok(())
    }
}
