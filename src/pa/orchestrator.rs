use {
    super::{
        data_group::{DataGroupHashVerifier, DataGroupNumber, DataGroupValidation},
        result::{
            CertificateChainValidation, PaState, PaStatus, PassiveAuthenticationResult,
            SodSignatureValidation,
        },
    },
    crate::{
        asn1::{
            emrtd::{EfSod, LdsSecurityObject},
            DigestAlgorithmIdentifier,
        },
        config::Config,
        error::{ErrorCode, ValidationError},
        pki::{CmsVerifier, RevocationChecker, RevocationStatus, SignerSource, TrustChainBuilder},
        ports::{CertificateRepository, CrlRepository},
    },
    chrono::{DateTime, Utc},
    std::{collections::BTreeMap, fmt::Display, time::Instant},
    tracing::{debug, info, info_span, warn},
    uuid::Uuid,
};

/// A document presented for verification.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PaRequest {
    /// As printed in the MRZ, usually alpha-3. Reported, not matched.
    pub issuing_country: String,
    pub document_number: String,
    /// `EF.SOD`, with or without its `[APPLICATION 23]` wrapper.
    pub sod:             Vec<u8>,
    pub data_groups:     BTreeMap<DataGroupNumber, Vec<u8>>,
}

impl PaRequest {
    pub fn new(
        issuing_country: impl Into<String>,
        document_number: impl Into<String>,
        sod: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            issuing_country: issuing_country.into(),
            document_number: document_number.into(),
            sod:             sod.into(),
            data_groups:     BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_data_group(mut self, number: DataGroupNumber, content: impl Into<Vec<u8>>) -> Self {
        self.data_groups.insert(number, content.into());
        self
    }
}

/// Runs Passive Authentication, ICAO 9303-11 5.1.
///
/// The three checks (DSC chain, SOD signature, data group hashes) all run
/// and report independently; the verdict is `VALID` only when each passes.
/// Only an unparseable SOD ends in `ERROR`.
pub struct PassiveAuthenticator<'a> {
    config:       Config,
    certificates: &'a dyn CertificateRepository,
    crls:         &'a dyn CrlRepository,
}

/// Accumulates findings while a verification runs.
#[derive(Default)]
struct Findings {
    errors:   Vec<ValidationError>,
    warnings: Vec<ValidationError>,
    states:   Vec<PaState>,
}

impl Findings {
    /// Records an error unless the same finding was already reported by an
    /// earlier stage.
    fn error(&mut self, code: ErrorCode, message: impl Into<String>) {
        let error = ValidationError::new(code, message);
        if !self.errors.contains(&error) {
            self.errors.push(error);
        }
    }

    fn warning(&mut self, code: ErrorCode, message: impl Into<String>) {
        self.warnings.push(ValidationError::new(code, message));
    }
}

impl<'a> PassiveAuthenticator<'a> {
    pub fn new(
        config: Config,
        certificates: &'a dyn CertificateRepository,
        crls: &'a dyn CrlRepository,
    ) -> Self {
        Self {
            config,
            certificates,
            crls,
        }
    }

    pub const fn config(&self) -> &Config {
        &self.config
    }

    pub fn verify(&self, request: &PaRequest) -> PassiveAuthenticationResult {
        self.verify_at(request, Utc::now())
    }

    /// Verifies `request` with certificate validity evaluated at `at`.
    pub fn verify_at(&self, request: &PaRequest, at: DateTime<Utc>) -> PassiveAuthenticationResult {
        let started = Instant::now();
        let verification_id = Uuid::new_v4();
        let span = info_span!(
            "passive_authentication",
            %verification_id,
            country = %request.issuing_country,
        );
        let _guard = span.enter();

        let mut findings = Findings {
            states: vec![PaState::Received],
            ..Findings::default()
        };
        let mut chain = CertificateChainValidation::default();
        let mut signature = SodSignatureValidation::default();
        let mut data_groups = DataGroupValidation::default();

        let status = match parse(&request.sod) {
            Err(e) => {
                warn!(error = %e.message, "SOD rejected");
                findings.errors.push(e);
                PaStatus::Error
            }
            Ok((sod, lso, digest)) => {
                findings.states.push(PaState::SodParsed);

                chain = self.validate_chain(&sod, at, &mut findings);
                findings.states.push(PaState::ChainValidated);

                signature = self.validate_signature(&sod, &mut findings);
                findings.states.push(PaState::SodSignatureValidated);

                let (validation, errors) =
                    DataGroupHashVerifier.verify(&lso, digest, &request.data_groups);
                findings.errors.extend(errors);
                findings.states.push(PaState::DataGroupsValidated);

                let groups_valid = validation.invalid_groups == 0
                    && request.data_groups.contains_key(&DataGroupNumber::Dg1);
                data_groups = validation;

                if chain.valid && signature.valid && groups_valid {
                    PaStatus::Valid
                } else {
                    PaStatus::Invalid
                }
            }
        };
        findings.states.push(status.into());

        let processing_duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(
            ?status,
            errors = findings.errors.len(),
            duration_ms = processing_duration_ms,
            "Passive authentication finished"
        );

        PassiveAuthenticationResult {
            verification_id,
            status,
            issuing_country: request.issuing_country.clone(),
            document_number: request.document_number.clone(),
            certificate_chain_validation: chain,
            sod_signature_validation: signature,
            data_group_validation: data_groups,
            errors: findings.errors,
            warnings: findings.warnings,
            states: findings.states,
            verified_at: at,
            processing_duration_ms,
        }
    }

    fn validate_chain(
        &self,
        sod: &EfSod,
        at: DateTime<Utc>,
        findings: &mut Findings,
    ) -> CertificateChainValidation {
        let mut result = CertificateChainValidation::default();
        let dsc = match CmsVerifier::new(self.config.structure).signer_certificate(sod.signed_data()) {
            Ok(dsc) => dsc,
            Err(e) => {
                findings.error(e.code(), e.to_string());
                return result;
            }
        };
        result.dsc_subject = Some(dsc.subject_dn().to_owned());
        result.dsc_serial_number = Some(dsc.serial_number().to_owned());

        match TrustChainBuilder::new(self.certificates, self.config.max_chain_depth).build(&dsc, at) {
            Ok(chain) => {
                result.csca_subject = chain.anchor().map(|csca| csca.subject_dn().to_owned());
                result.valid = true;
            }
            Err(e) => {
                debug!(error = %e, "DSC chain rejected");
                findings.error(e.code(), e.to_string());
            }
        }

        if self.config.check_revocation {
            let check = RevocationChecker::new(self.crls, self.config.strict_crl)
                .check_certificate(&dsc, at);
            let message = format!("DSC {dsc} revocation status {:?}", check.status);
            match check.status {
                RevocationStatus::Good => {}
                RevocationStatus::Revoked | RevocationStatus::Suspended => {
                    result.valid = false;
                    if let Some(code) = check.status.code() {
                        findings.error(code, message);
                    }
                }
                RevocationStatus::NotChecked if !self.config.accept_unchecked_revocation => {
                    result.valid = false;
                    findings.error(ErrorCode::RevocationNotChecked, message);
                }
                RevocationStatus::NotChecked | RevocationStatus::CrlExpired => {
                    if let Some(code) = check.status.code() {
                        findings.warning(code, message);
                    }
                }
            }
            result.revocation_status = Some(check.status);
        }
        result
    }

    fn validate_signature(&self, sod: &EfSod, findings: &mut Findings) -> SodSignatureValidation {
        match CmsVerifier::new(self.config.structure).verify(sod.signed_data(), SignerSource::Embedded) {
            Ok(verified) => SodSignatureValidation {
                valid:            true,
                digest_algorithm: Some(verified.digest_algorithm),
            },
            Err(e) => {
                debug!(error = %e, "SOD signature rejected");
                findings.error(e.code(), e.to_string());
                SodSignatureValidation::default()
            }
        }
    }
}

fn parse(
    sod: &[u8],
) -> Result<(EfSod, LdsSecurityObject, DigestAlgorithmIdentifier), ValidationError> {
    let sod = EfSod::from_der(sod).map_err(parse_error)?;
    sod.signer_info().map_err(parse_error)?;
    let lso = sod.lds_security_object().map_err(parse_error)?;
    let digest = lso.digest_algorithm().map_err(parse_error)?;
    Ok((sod, lso, digest))
}

fn parse_error(e: impl Display) -> ValidationError {
    ValidationError::new(ErrorCode::SodParseError, format!("Invalid SOD: {e}"))
}
