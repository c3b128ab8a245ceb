//! Error taxonomy.
//!
//! Three kinds of failure are kept apart:
//!
//! * [`ParseError`]: the input bytes are not the structure they claim to be.
//!   Fatal for that one record.
//! * Domain outcomes ([`ErrorCode`], carried in [`ValidationError`]): the input
//!   parsed fine but does not validate. These are data, never `Err`.
//! * System faults: everything else, reported as `anyhow::Error` and mapped to
//!   the `ERROR` verdict by the caller.

use {
    der::asn1::ObjectIdentifier as Oid,
    serde::Serialize,
    std::fmt::{self, Display, Formatter},
    thiserror::Error,
};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("DER decoding failed: {0}")]
    Der(#[from] der::Error),

    #[error("Unexpected content type {found}, expected {expected}")]
    ContentType { expected: Oid, found: Oid },

    #[error("Invalid structure: {0}")]
    Structure(&'static str),
}

/// Stable machine readable codes for validation outcomes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    SodParseError,
    MalformedCms,
    CertificateNotFound,
    DscNotFound,
    AmbiguousSigner,
    NoTrustAnchorFound,
    ChainTooDeep,
    SignatureMismatch,
    MessageDigestMismatch,
    ContentTypeMismatch,
    UnsupportedAlgorithm,
    CertificateExpired,
    CertificateNotYetValid,
    IssuerNotCa,
    PathLengthExceeded,
    TrustAnchorCountryMismatch,
    CertificateRevoked,
    CertificateSuspended,
    RevocationNotChecked,
    CrlExpired,
    MissingDataGroup,
    HashMismatch,
    DataGroupNotInSod,
    InternalError,
}

impl ErrorCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SodParseError => "SOD_PARSE_ERROR",
            Self::MalformedCms => "MALFORMED_CMS",
            Self::CertificateNotFound => "CERTIFICATE_NOT_FOUND",
            Self::DscNotFound => "DSC_NOT_FOUND",
            Self::AmbiguousSigner => "AMBIGUOUS_SIGNER",
            Self::NoTrustAnchorFound => "NO_TRUST_ANCHOR_FOUND",
            Self::ChainTooDeep => "CHAIN_TOO_DEEP",
            Self::SignatureMismatch => "SIGNATURE_MISMATCH",
            Self::MessageDigestMismatch => "MESSAGE_DIGEST_MISMATCH",
            Self::ContentTypeMismatch => "CONTENT_TYPE_MISMATCH",
            Self::UnsupportedAlgorithm => "UNSUPPORTED_ALGORITHM",
            Self::CertificateExpired => "CERTIFICATE_EXPIRED",
            Self::CertificateNotYetValid => "CERTIFICATE_NOT_YET_VALID",
            Self::IssuerNotCa => "ISSUER_NOT_CA",
            Self::PathLengthExceeded => "PATH_LENGTH_EXCEEDED",
            Self::TrustAnchorCountryMismatch => "TRUST_ANCHOR_COUNTRY_MISMATCH",
            Self::CertificateRevoked => "CERTIFICATE_REVOKED",
            Self::CertificateSuspended => "CERTIFICATE_SUSPENDED",
            Self::RevocationNotChecked => "REVOCATION_NOT_CHECKED",
            Self::CrlExpired => "CRL_EXPIRED",
            Self::MissingDataGroup => "MISSING_DATA_GROUP",
            Self::HashMismatch => "HASH_MISMATCH",
            Self::DataGroupNotInSod => "DATA_GROUP_NOT_IN_SOD",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl Display for ErrorCode {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a result's `errors[]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub code:    ErrorCode,
    pub message: String,
}

impl ValidationError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}
