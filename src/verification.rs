//! The verification kinds the engine offers, behind one entry point.

use {
    crate::{
        config::Config,
        pa::{PaRequest, PassiveAuthenticationResult, PassiveAuthenticator},
        pki::{
            Certificate, CertificateType, CertificateValidator, CmsVerifier, MasterListExtractor,
            ValidationResult, VerifiedMasterList,
        },
        ports::{CertificateRepository, CrlRepository},
    },
    anyhow::{Context, Result},
    chrono::{DateTime, Utc},
    serde::Serialize,
    tracing::debug,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationKind {
    /// A CMS-signed CSCA Master List against the stored CSCAs.
    MasterList,
    /// A CSCA or DSC against the trust store and CRLs.
    CertificateChain,
    /// Passive Authentication of an SOD and its data groups.
    DataGroups,
}

#[derive(Clone, Copy, Debug)]
pub enum VerificationRequest<'r> {
    MasterList(&'r [u8]),
    CertificateChain(&'r [u8]),
    DataGroups(&'r PaRequest),
}

#[derive(Clone, Debug)]
pub enum VerificationOutcome {
    MasterList(VerifiedMasterList),
    CertificateChain {
        certificate: Certificate,
        result:      ValidationResult,
    },
    DataGroups(PassiveAuthenticationResult),
}

impl VerificationRequest<'_> {
    pub const fn kind(&self) -> VerificationKind {
        match self {
            Self::MasterList(_) => VerificationKind::MasterList,
            Self::CertificateChain(_) => VerificationKind::CertificateChain,
            Self::DataGroups(_) => VerificationKind::DataGroups,
        }
    }
}

impl VerificationOutcome {
    pub const fn kind(&self) -> VerificationKind {
        match self {
            Self::MasterList(_) => VerificationKind::MasterList,
            Self::CertificateChain { .. } => VerificationKind::CertificateChain,
            Self::DataGroups(_) => VerificationKind::DataGroups,
        }
    }
}

pub struct Verifier<'a> {
    config:       Config,
    certificates: &'a dyn CertificateRepository,
    crls:         &'a dyn CrlRepository,
}

impl<'a> Verifier<'a> {
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

    pub fn verify(&self, request: VerificationRequest) -> Result<VerificationOutcome> {
        self.verify_at(request, Utc::now())
    }

    /// Errors are reserved for inputs that cannot be verified at all, such
    /// as a Master List no stored CSCA signed. Failed checks are reported in
    /// the outcome.
    pub fn verify_at(&self, request: VerificationRequest, at: DateTime<Utc>) -> Result<VerificationOutcome> {
        debug!(kind = ?request.kind(), "Verification requested");
        match request {
            VerificationRequest::MasterList(der) => self.master_list(der),
            VerificationRequest::CertificateChain(der) => self.certificate_chain(der, at),
            VerificationRequest::DataGroups(request) => Ok(VerificationOutcome::DataGroups(
                PassiveAuthenticator::new(self.config.clone(), self.certificates, self.crls)
                    .verify_at(request, at),
            )),
        }
    }

    fn master_list(&self, der: &[u8]) -> Result<VerificationOutcome> {
        let anchors = self.certificates.find_all_by_type(CertificateType::Csca)?;
        let verified = MasterListExtractor::new(CmsVerifier::new(self.config.structure))
            .verify_and_extract(der, &anchors)
            .context("Master List verification failed")?;
        Ok(VerificationOutcome::MasterList(verified))
    }

    fn certificate_chain(&self, der: &[u8], at: DateTime<Utc>) -> Result<VerificationOutcome> {
        let mut certificate = Certificate::from_der(der).context("Invalid certificate")?;
        let result = CertificateValidator::new(&self.config, self.certificates, self.crls)
            .validate_at(&mut certificate, at);
        Ok(VerificationOutcome::CertificateChain {
            certificate,
            result,
        })
    }
}
