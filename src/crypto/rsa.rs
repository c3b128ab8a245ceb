//! RSA signature verification, PKCS#1 v1.5 and RSASSA-PSS (RFC 8017 8).

use {
    super::SignatureError,
    crate::asn1::{DigestAlgorithmIdentifier, SignatureAlgorithmIdentifier},
    ::rsa::{Pkcs1v15Sign, Pss, RsaPublicKey},
    sha1::Sha1,
    sha2::{Sha224, Sha256, Sha384, Sha512},
};

pub fn verify(
    key: &RsaPublicKey,
    algorithm: SignatureAlgorithmIdentifier,
    message: &[u8],
    signature: &[u8],
) -> Result<(), SignatureError> {
    let hashed = algorithm.digest().hash_bytes(message);
    let result = match algorithm {
        SignatureAlgorithmIdentifier::RsaPkcs1v15(digest) => {
            key.verify(pkcs1v15(digest), &hashed, signature)
        }
        SignatureAlgorithmIdentifier::RsaPss {
            digest,
            salt_length,
        } => key.verify(pss(digest, salt_length), &hashed, signature),
        _ => return Err(SignatureError::KeyMismatch),
    };
    result.map_err(|_| SignatureError::Mismatch)
}

fn pkcs1v15(digest: DigestAlgorithmIdentifier) -> Pkcs1v15Sign {
    match digest {
        DigestAlgorithmIdentifier::Sha1 => Pkcs1v15Sign::new::<Sha1>(),
        DigestAlgorithmIdentifier::Sha224 => Pkcs1v15Sign::new::<Sha224>(),
        DigestAlgorithmIdentifier::Sha256 => Pkcs1v15Sign::new::<Sha256>(),
        DigestAlgorithmIdentifier::Sha384 => Pkcs1v15Sign::new::<Sha384>(),
        DigestAlgorithmIdentifier::Sha512 => Pkcs1v15Sign::new::<Sha512>(),
    }
}

// MGF1 uses the same hash as the message digest.
fn pss(digest: DigestAlgorithmIdentifier, salt_length: usize) -> Pss {
    match digest {
        DigestAlgorithmIdentifier::Sha1 => Pss::new_with_salt::<Sha1>(salt_length),
        DigestAlgorithmIdentifier::Sha224 => Pss::new_with_salt::<Sha224>(salt_length),
        DigestAlgorithmIdentifier::Sha256 => Pss::new_with_salt::<Sha256>(salt_length),
        DigestAlgorithmIdentifier::Sha384 => Pss::new_with_salt::<Sha384>(salt_length),
        DigestAlgorithmIdentifier::Sha512 => Pss::new_with_salt::<Sha512>(salt_length),
    }
}
