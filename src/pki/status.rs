use {
    super::{
        certificate::Validity,
        revocation::{RevocationCheck, RevocationChecker, RevocationStatus},
        trust_chain::{ChainError, TrustChainBuilder},
        Certificate, CertificateStatus,
    },
    crate::{
        config::Config,
        error::{ErrorCode, ValidationError},
        ports::{CertificateRepository, CrlRepository},
    },
    chrono::{DateTime, Utc},
    serde::Serialize,
    std::time::Instant,
    tracing::info,
};

/// Combines validity and revocation into a status.
///
/// Priority is `REVOKED > EXPIRED > SUSPENDED > VALID`. A certificate that is
/// not yet valid is reported `VALID`, its `validityValid` flag is what tells.
pub struct CertificateStatusEvaluator;

impl CertificateStatusEvaluator {
    pub const fn evaluate(validity: Validity, revocation: RevocationStatus) -> CertificateStatus {
        match (validity, revocation) {
            (_, RevocationStatus::Revoked) => CertificateStatus::Revoked,
            (Validity::Expired, _) => CertificateStatus::Expired,
            (_, RevocationStatus::Suspended) => CertificateStatus::Suspended,
            _ => CertificateStatus::Valid,
        }
    }
}

/// Snapshot of one certificate validation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub signature_valid:   bool,
    pub chain_valid:       bool,
    pub not_revoked:       bool,
    pub validity_valid:    bool,
    pub constraints_valid: bool,
    pub status:            CertificateStatus,
    pub revocation:        RevocationCheck,
    pub errors:            Vec<ValidationError>,
    pub validated_at:      DateTime<Utc>,
    pub duration_ms:       u64,
}

/// Validates a stored certificate against the trust store and CRLs.
pub struct CertificateValidator<'a> {
    config:       &'a Config,
    certificates: &'a dyn CertificateRepository,
    crls:         &'a dyn CrlRepository,
}

impl<'a> CertificateValidator<'a> {
    pub fn new(
        config: &'a Config,
        certificates: &'a dyn CertificateRepository,
        crls: &'a dyn CrlRepository,
    ) -> Self {
        Self {
            config,
            certificates,
            crls,
        }
    }

    pub fn validate(&self, cert: &mut Certificate) -> ValidationResult {
        self.validate_at(cert, Utc::now())
    }

    /// Validates `cert` as of `at` and updates its status.
    pub fn validate_at(&self, cert: &mut Certificate, at: DateTime<Utc>) -> ValidationResult {
        let started = Instant::now();

        let validity = cert.validity_at(at);
        let chain = TrustChainBuilder::new(self.certificates, self.config.max_chain_depth)
            .build(cert, at);
        // A root has nobody to revoke it.
        let revocation = if cert.is_self_issued() {
            RevocationCheck {
                status:          RevocationStatus::NotChecked,
                crl_this_update: None,
                crl_next_update: None,
                revocation_date: None,
                reason:          None,
            }
        } else {
            RevocationChecker::new(self.crls, self.config.strict_crl).check_certificate(cert, at)
        };

        let status = CertificateStatusEvaluator::evaluate(validity, revocation.status);
        cert.set_status(status);

        let chain_error = chain.as_ref().err();
        let mut errors = Vec::new();
        if let Some(e) = chain_error {
            errors.push(ValidationError::new(e.code(), e.to_string()));
        }
        let validity_code = match validity {
            Validity::Valid => None,
            Validity::Expired => Some(ErrorCode::CertificateExpired),
            Validity::NotYetValid => Some(ErrorCode::CertificateNotYetValid),
        };
        if let Some(code) = validity_code.filter(|&code| chain_error.map(ChainError::code) != Some(code)) {
            errors.push(ValidationError::new(code, format!("Certificate {cert} is outside its validity window")));
        }
        if let Some(code) = revocation.status.code().filter(|_| revocation.status != RevocationStatus::NotChecked) {
            errors.push(ValidationError::new(code, format!("Revocation status {:?}", revocation.status)));
        }

        let result = ValidationResult {
            signature_valid: !matches!(
                chain_error,
                Some(
                    ChainError::SignatureMismatch(_)
                        | ChainError::UnsupportedAlgorithm(_)
                        | ChainError::NoTrustAnchorFound(_)
                )
            ),
            chain_valid: chain.is_ok(),
            not_revoked: !revocation.status.is_revoked(),
            validity_valid: validity == Validity::Valid,
            constraints_valid: !matches!(
                chain_error,
                Some(ChainError::IssuerNotCa(_) | ChainError::PathLengthExceeded(_))
            ),
            status,
            revocation,
            errors,
            validated_at: at,
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        };
        info!(
            fingerprint = %cert.fingerprint(),
            status = ?result.status,
            chain_valid = result.chain_valid,
            "Certificate validated"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            pki::RevocationList,
            ports::{CertificateSink, CrlSink, InMemoryStore},
        },
        anyhow::Result,
        chrono::TimeZone,
    };

    const CSCA: &[u8] = include_bytes!("../../tests/dataset/csca.der");
    const CRL: &[u8] = include_bytes!("../../tests/dataset/crl.der");
    const DSC: &[u8] = include_bytes!("../../tests/dataset/dsc.der");
    const DSC_EXPIRED: &[u8] = include_bytes!("../../tests/dataset/dsc_expired.der");
    const DSC_FUTURE: &[u8] = include_bytes!("../../tests/dataset/dsc_future.der");
    const DSC_REVOKED: &[u8] = include_bytes!("../../tests/dataset/dsc_revoked.der");
    const DSC_HELD: &[u8] = include_bytes!("../../tests/dataset/dsc_held.der");

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_priority() {
        use {CertificateStatus as S, RevocationStatus as R, Validity as V};
        let eval = CertificateStatusEvaluator::evaluate;
        assert_eq!(eval(V::Expired, R::Revoked), S::Revoked);
        assert_eq!(eval(V::Expired, R::Suspended), S::Expired);
        assert_eq!(eval(V::Valid, R::Suspended), S::Suspended);
        assert_eq!(eval(V::Valid, R::NotChecked), S::Valid);
        assert_eq!(eval(V::NotYetValid, R::Good), S::Valid);
    }

    fn validate(der: &[u8]) -> Result<(Certificate, ValidationResult)> {
        let store = InMemoryStore::new();
        store.save_all(&[Certificate::from_der(CSCA)?])?;
        store.save_crl(&RevocationList::from_der(CRL)?)?;
        let config = Config::default();
        let mut cert = Certificate::from_der(der)?;
        let result = CertificateValidator::new(&config, &store, &store).validate_at(&mut cert, at());
        Ok((cert, result))
    }

    #[test]
    fn test_valid_dsc() -> Result<()> {
        let (cert, result) = validate(DSC)?;
        assert_eq!(cert.status(), CertificateStatus::Valid);
        assert!(result.chain_valid && result.signature_valid && result.not_revoked);
        assert!(result.validity_valid && result.constraints_valid);
        assert!(result.errors.is_empty());
        Ok(())
    }

    #[test]
    fn test_expired_dsc() -> Result<()> {
        let (cert, result) = validate(DSC_EXPIRED)?;
        assert_eq!(cert.status(), CertificateStatus::Expired);
        assert!(!result.chain_valid);
        assert!(result.signature_valid);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].code, ErrorCode::CertificateExpired);
        Ok(())
    }

    #[test]
    fn test_not_yet_valid_dsc_keeps_valid_status() -> Result<()> {
        let (cert, result) = validate(DSC_FUTURE)?;
        assert_eq!(cert.status(), CertificateStatus::Valid);
        assert!(!result.validity_valid);
        assert!(!result.chain_valid);
        Ok(())
    }

    #[test]
    fn test_revoked_and_held() -> Result<()> {
        let (revoked, result) = validate(DSC_REVOKED)?;
        assert_eq!(revoked.status(), CertificateStatus::Revoked);
        assert!(result.chain_valid);
        assert!(!result.not_revoked);

        let (held, _) = validate(DSC_HELD)?;
        assert_eq!(held.status(), CertificateStatus::Suspended);
        Ok(())
    }

    #[test]
    fn test_csca() -> Result<()> {
        let (csca, result) = validate(CSCA)?;
        assert_eq!(csca.status(), CertificateStatus::Valid);
        assert!(result.chain_valid);
        assert_eq!(result.revocation.status, RevocationStatus::NotChecked);
        Ok(())
    }
}
