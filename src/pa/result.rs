use {
    super::data_group::DataGroupValidation,
    crate::{asn1::DigestAlgorithmIdentifier, error::ValidationError, pki::RevocationStatus},
    chrono::{DateTime, Utc},
    serde::Serialize,
    uuid::Uuid,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaStatus {
    Valid,
    Invalid,
    /// The verification could not be carried out.
    Error,
}

/// Stages of a verification, in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaState {
    Received,
    SodParsed,
    ChainValidated,
    SodSignatureValidated,
    DataGroupsValidated,
    Valid,
    Invalid,
    Error,
}

impl From<PaStatus> for PaState {
    fn from(status: PaStatus) -> Self {
        match status {
            PaStatus::Valid => Self::Valid,
            PaStatus::Invalid => Self::Invalid,
            PaStatus::Error => Self::Error,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateChainValidation {
    pub valid:             bool,
    pub dsc_subject:       Option<String>,
    pub dsc_serial_number: Option<String>,
    pub csca_subject:      Option<String>,
    /// Present when the revocation step ran.
    pub revocation_status: Option<RevocationStatus>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SodSignatureValidation {
    pub valid:            bool,
    pub digest_algorithm: Option<DigestAlgorithmIdentifier>,
}

/// The verdict of one Passive Authentication.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassiveAuthenticationResult {
    pub verification_id:              Uuid,
    pub status:                       PaStatus,
    pub issuing_country:              String,
    pub document_number:              String,
    pub certificate_chain_validation: CertificateChainValidation,
    pub sod_signature_validation:     SodSignatureValidation,
    pub data_group_validation:        DataGroupValidation,
    pub errors:                       Vec<ValidationError>,
    /// Findings that do not affect the verdict, such as an unchecked
    /// revocation status.
    pub warnings:                     Vec<ValidationError>,
    pub states:                       Vec<PaState>,
    pub verified_at:                  DateTime<Utc>,
    pub processing_duration_ms:       u64,
}

impl PassiveAuthenticationResult {
    pub fn is_valid(&self) -> bool {
        self.status == PaStatus::Valid
    }
}
