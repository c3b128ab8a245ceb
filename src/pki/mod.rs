//! The PKI trust engine: certificates, CRLs, CMS, Master Lists, trust chains
//! and revocation.

mod certificate;
pub mod crl;
mod fingerprint;
pub mod master_list;
pub mod revocation;
pub mod signed_data;
pub mod status;
pub mod trust_chain;

pub use self::{
    certificate::{Certificate, CertificateStatus, CertificateType, Validity},
    crl::RevocationList,
    fingerprint::{sha1_hex, sha256_hex, Fingerprint},
    master_list::{MasterListExtractor, VerifiedMasterList},
    revocation::{RevocationCheck, RevocationChecker, RevocationStatus},
    signed_data::{CmsError, CmsVerifier, SignerSource, VerifiedContent},
    status::{CertificateStatusEvaluator, CertificateValidator, ValidationResult},
    trust_chain::{ChainError, TrustChain, TrustChainBuilder},
};
