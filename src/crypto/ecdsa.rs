//! ECDSA signature verification over the curves ICAO 9303 uses in practice.
//!
//! The message digest is computed by the caller's algorithm and handed to the
//! curve as a prehash, so any of the SHA family works with any curve.

use {
    super::{curve::CurveKey, SignatureError},
    crate::asn1::SignatureAlgorithmIdentifier,
    ::rsa::BigUint,
    der::{asn1::Uint, Decode, Sequence},
    p256::ecdsa::signature::hazmat::PrehashVerifier,
};

// Ecdsa-Sig-Value ::= SEQUENCE { r INTEGER, s INTEGER }
#[derive(Clone, Debug, Sequence)]
struct EcdsaSigValue {
    r: Uint,
    s: Uint,
}

/// Signature encodings, X9.62 `Ecdsa-Sig-Value` or TR-03111 plain `r || s`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Encoding {
    Der,
    Plain,
}

fn encoding(algorithm: SignatureAlgorithmIdentifier) -> Result<Encoding, SignatureError> {
    match algorithm {
        SignatureAlgorithmIdentifier::Ecdsa(_) => Ok(Encoding::Der),
        SignatureAlgorithmIdentifier::EcdsaPlain(_) => Ok(Encoding::Plain),
        _ => Err(SignatureError::KeyMismatch),
    }
}

pub fn verify_p256(
    key: &p256::ecdsa::VerifyingKey,
    algorithm: SignatureAlgorithmIdentifier,
    message: &[u8],
    signature: &[u8],
) -> Result<(), SignatureError> {
    let signature = match encoding(algorithm)? {
        Encoding::Der => p256::ecdsa::Signature::from_der(signature),
        Encoding::Plain => p256::ecdsa::Signature::from_slice(signature),
    }
    .map_err(|_| SignatureError::Mismatch)?;
    let prehash = algorithm.digest().hash_bytes(message);
    key.verify_prehash(&prehash, &signature)
        .map_err(|_| SignatureError::Mismatch)
}

pub fn verify_p384(
    key: &p384::ecdsa::VerifyingKey,
    algorithm: SignatureAlgorithmIdentifier,
    message: &[u8],
    signature: &[u8],
) -> Result<(), SignatureError> {
    let signature = match encoding(algorithm)? {
        Encoding::Der => p384::ecdsa::Signature::from_der(signature),
        Encoding::Plain => p384::ecdsa::Signature::from_slice(signature),
    }
    .map_err(|_| SignatureError::Mismatch)?;
    let prehash = algorithm.digest().hash_bytes(message);
    key.verify_prehash(&prehash, &signature)
        .map_err(|_| SignatureError::Mismatch)
}

pub fn verify_curve(
    key: &CurveKey,
    algorithm: SignatureAlgorithmIdentifier,
    message: &[u8],
    signature: &[u8],
) -> Result<(), SignatureError> {
    let (r, s) = match encoding(algorithm)? {
        Encoding::Der => {
            let value = EcdsaSigValue::from_der(signature).map_err(|_| SignatureError::Mismatch)?;
            (
                BigUint::from_bytes_be(value.r.as_bytes()),
                BigUint::from_bytes_be(value.s.as_bytes()),
            )
        }
        Encoding::Plain => {
            if signature.is_empty() || signature.len() % 2 != 0 {
                return Err(SignatureError::Mismatch);
            }
            let (r, s) = signature.split_at(signature.len() / 2);
            (BigUint::from_bytes_be(r), BigUint::from_bytes_be(s))
        }
    };
    let prehash = algorithm.digest().hash_bytes(message);
    if key.verify_prehash(&prehash, &r, &s) {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}
