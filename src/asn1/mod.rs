//! Pure ASN1 types, no application logic.
//!
//! Parsing is done as deeply as is useful, for example a signature algorithm
//! is parsed into an enum of the schemes eMRTDs actually use, with a typed
//! error for the rest. This ensures that rich types are available for the
//! application to use.
//!
//! Real world data is not always DER compliant. Where signatures are computed
//! over encoded bytes we take care to use the bytes as received (see
//! [`first_element`]) instead of a re-encoding, so that a non-canonical
//! encoding by the issuer does not turn into a spurious signature failure.

mod application_tagged;
mod content_info;
mod digest_algorithm_identifier;
pub mod emrtd;
mod signature_algorithm_identifier;

pub use self::{
    application_tagged::{is_application_tagged, strip_application_tag},
    content_info::{encapsulated_content, ContentInfo, ContentType, ID_SIGNED_DATA},
    digest_algorithm_identifier::DigestAlgorithmIdentifier,
    signature_algorithm_identifier::{
        RsaSsaPssParameters, SignatureAlgorithmIdentifier, UnsupportedAlgorithm,
    },
};
use der::{Decode, Header, Length, Reader, SliceReader};

/// Returns the encoded bytes of the first element inside a `SEQUENCE`.
///
/// For a certificate or CRL this is the to-be-signed part exactly as it
/// appears in the input.
pub fn first_element(der: &[u8]) -> der::Result<&[u8]> {
    let mut reader = SliceReader::new(der)?;
    let _outer = Header::decode(&mut reader)?;
    let start = reader.position();
    let inner = Header::decode(&mut reader)?;
    let end = (reader.position() + inner.length)?;
    let start = usize::try_from(start)?;
    let end = usize::try_from(end)?;
    der.get(start..end)
        .ok_or_else(|| der::ErrorKind::Incomplete {
            expected_len: end.try_into().unwrap_or(Length::ZERO),
            actual_len:   der.len().try_into().unwrap_or(Length::ZERO),
        })
        .map_err(der::Error::from)
}
