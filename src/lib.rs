//! ICAO PKD trust engine and ePassport Passive Authentication.
//!
//! The crate ingests ICAO PKD material (CSCA and DSC certificates, CRLs and
//! CMS-signed Master Lists) and verifies an eMRTD's Security Object Document
//! (`EF.SOD`) against the presented data groups, per ICAO 9303 parts 10-12.
//!
//! Layering, from the leaves up:
//!
//! * [`asn1`] holds the pure ASN.1 types.
//! * [`crypto`] does digests and signature verification.
//! * [`pki`] turns those into certificates, CRLs, CMS verification, Master List
//!   extraction, trust chains and revocation.
//! * [`pa`] composes everything into a Passive Authentication verdict.
//!
//! Storage is never done here. Lookups and writes go through the traits in
//! [`ports`], which an embedding service implements over its own database or
//! directory.

pub mod asn1;
pub mod config;
pub mod crypto;
pub mod error;
pub mod ingest;
pub mod pa;
pub mod pki;
pub mod ports;
pub mod verification;

pub use self::{
    config::{Config, Leniency},
    error::{ErrorCode, ParseError},
    pa::{PassiveAuthenticationResult, PassiveAuthenticator, PaRequest, PaStatus},
    pki::{Certificate, CertificateStatus, CertificateType, Fingerprint, RevocationList},
};

/// Like [`anyhow::ensure`], but returns the given error value unchanged.
///
/// Used where the error type is fixed, such as `der::Result`.
#[macro_export]
macro_rules! ensure_err {
    ($cond:expr, $err:expr $(,)?) => {
        if !$cond {
            return Err($err);
        }
    };
}
