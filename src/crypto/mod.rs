//! Implements the required cryptography.
//!
//! Verification only. Keys come from a certificate's `SubjectPublicKeyInfo`
//! and signatures are checked against a resolved
//! [`SignatureAlgorithmIdentifier`].

mod curve;
mod digest;
mod ecdsa;
mod rsa;

use {
    crate::{
        asn1::{SignatureAlgorithmIdentifier, UnsupportedAlgorithm},
        error::ErrorCode,
    },
    ::rsa::{pkcs1::DecodeRsaPublicKey, RsaPublicKey},
    curve::{Curve, CurveKey},
    der::{
        asn1::{Any, ObjectIdentifier as Oid},
        Tag, Tagged,
    },
    spki::SubjectPublicKeyInfoOwned,
    thiserror::Error,
};

const ID_RSA_ENCRYPTION: Oid = Oid::new_unwrap("1.2.840.113549.1.1.1");
const ID_RSASSA_PSS: Oid = Oid::new_unwrap("1.2.840.113549.1.1.10");
const ID_EC_PUBLIC_KEY: Oid = Oid::new_unwrap("1.2.840.10045.2.1");
const SECP256R1: Oid = Oid::new_unwrap("1.2.840.10045.3.1.7");
const SECP384R1: Oid = Oid::new_unwrap("1.3.132.0.34");

#[derive(Debug, Error)]
pub enum SignatureError {
    #[error(transparent)]
    Unsupported(#[from] UnsupportedAlgorithm),

    #[error("Invalid public key")]
    InvalidKey,

    #[error("Signature algorithm does not match the key type")]
    KeyMismatch,

    #[error("Signature does not verify")]
    Mismatch,
}

impl SignatureError {
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Mismatch | Self::KeyMismatch => ErrorCode::SignatureMismatch,
            Self::Unsupported(_) | Self::InvalidKey => ErrorCode::UnsupportedAlgorithm,
        }
    }
}

/// A verification key.
#[derive(Clone, Debug)]
pub enum PublicKey {
    Rsa(RsaPublicKey),
    P256(p256::ecdsa::VerifyingKey),
    P384(p384::ecdsa::VerifyingKey),
    /// Brainpool or explicitly parameterised prime curves.
    Curve(Box<CurveKey>),
}

impl PublicKey {
    pub fn from_spki(spki: &SubjectPublicKeyInfoOwned) -> Result<Self, SignatureError> {
        let key_bytes = spki.subject_public_key.raw_bytes();
        match spki.algorithm.oid {
            ID_RSA_ENCRYPTION | ID_RSASSA_PSS => RsaPublicKey::from_pkcs1_der(key_bytes)
                .map(Self::Rsa)
                .map_err(|_| SignatureError::InvalidKey),
            ID_EC_PUBLIC_KEY => {
                // ECParameters: namedCurve or specifiedCurve. implicitCurve
                // (NULL) leaves nothing to verify with.
                let params = spki
                    .algorithm
                    .parameters
                    .as_ref()
                    .filter(|params| params.tag() != Tag::Null)
                    .ok_or(UnsupportedAlgorithm(ID_EC_PUBLIC_KEY))?;
                Self::from_ec_parameters(params, key_bytes)
            }
            other => Err(UnsupportedAlgorithm(other).into()),
        }
    }

    fn from_ec_parameters(params: &Any, key_bytes: &[u8]) -> Result<Self, SignatureError> {
        if params.tag() != Tag::ObjectIdentifier {
            let curve = Curve::from_explicit(params)?;
            return Ok(Self::Curve(Box::new(CurveKey::from_sec1(curve, key_bytes)?)));
        }
        let oid = params
            .decode_as::<Oid>()
            .map_err(|_| SignatureError::InvalidKey)?;
        match oid {
            SECP256R1 => p256::ecdsa::VerifyingKey::from_sec1_bytes(key_bytes)
                .map(Self::P256)
                .map_err(|_| SignatureError::InvalidKey),
            SECP384R1 => p384::ecdsa::VerifyingKey::from_sec1_bytes(key_bytes)
                .map(Self::P384)
                .map_err(|_| SignatureError::InvalidKey),
            other => {
                let curve = Curve::named(other).ok_or(UnsupportedAlgorithm(other))?;
                Ok(Self::Curve(Box::new(CurveKey::from_sec1(curve, key_bytes)?)))
            }
        }
    }

    pub fn verify(
        &self,
        algorithm: SignatureAlgorithmIdentifier,
        message: &[u8],
        signature: &[u8],
    ) -> Result<(), SignatureError> {
        match self {
            Self::Rsa(key) => rsa::verify(key, algorithm, message, signature),
            Self::P256(key) => ecdsa::verify_p256(key, algorithm, message, signature),
            Self::P384(key) => ecdsa::verify_p384(key, algorithm, message, signature),
            Self::Curve(key) => ecdsa::verify_curve(key, algorithm, message, signature),
        }
    }
}
