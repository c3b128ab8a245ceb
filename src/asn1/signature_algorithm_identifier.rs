use {
    super::DigestAlgorithmIdentifier,
    der::{asn1::ObjectIdentifier as Oid, Decode, Encode, Sequence},
    spki::AlgorithmIdentifierOwned,
    thiserror::Error,
};

pub const ID_RSA_ENCRYPTION: Oid = Oid::new_unwrap("1.2.840.113549.1.1.1");
pub const ID_SHA1_WITH_RSA: Oid = Oid::new_unwrap("1.2.840.113549.1.1.5");
pub const ID_SIG_RSASSA_PSS: Oid = Oid::new_unwrap("1.2.840.113549.1.1.10");
pub const ID_SHA256_WITH_RSA: Oid = Oid::new_unwrap("1.2.840.113549.1.1.11");
pub const ID_SHA384_WITH_RSA: Oid = Oid::new_unwrap("1.2.840.113549.1.1.12");
pub const ID_SHA512_WITH_RSA: Oid = Oid::new_unwrap("1.2.840.113549.1.1.13");
pub const ID_SHA224_WITH_RSA: Oid = Oid::new_unwrap("1.2.840.113549.1.1.14");
pub const ID_MGF1: Oid = Oid::new_unwrap("1.2.840.113549.1.1.8");

pub const ID_EC_PUBLIC_KEY: Oid = Oid::new_unwrap("1.2.840.10045.2.1");
pub const ID_ECDSA_WITH_SHA1: Oid = Oid::new_unwrap("1.2.840.10045.4.1");
pub const ID_ECDSA_WITH_SHA224: Oid = Oid::new_unwrap("1.2.840.10045.4.3.1");
pub const ID_ECDSA_WITH_SHA256: Oid = Oid::new_unwrap("1.2.840.10045.4.3.2");
pub const ID_ECDSA_WITH_SHA384: Oid = Oid::new_unwrap("1.2.840.10045.4.3.3");
pub const ID_ECDSA_WITH_SHA512: Oid = Oid::new_unwrap("1.2.840.10045.4.3.4");

/// BSI TR-03111 `ecdsa-plain-signatures`, signature is `r || s`.
pub const ID_ECDSA_PLAIN_SHA1: Oid = Oid::new_unwrap("0.4.0.127.0.7.1.1.4.1.1");
pub const ID_ECDSA_PLAIN_SHA224: Oid = Oid::new_unwrap("0.4.0.127.0.7.1.1.4.1.2");
pub const ID_ECDSA_PLAIN_SHA256: Oid = Oid::new_unwrap("0.4.0.127.0.7.1.1.4.1.3");
pub const ID_ECDSA_PLAIN_SHA384: Oid = Oid::new_unwrap("0.4.0.127.0.7.1.1.4.1.4");
pub const ID_ECDSA_PLAIN_SHA512: Oid = Oid::new_unwrap("0.4.0.127.0.7.1.1.4.1.5");

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("Unsupported algorithm {0}")]
pub struct UnsupportedAlgorithm(pub Oid);

/// Signature schemes, with the hash function resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignatureAlgorithmIdentifier {
    RsaPkcs1v15(DigestAlgorithmIdentifier),
    RsaPss {
        digest:      DigestAlgorithmIdentifier,
        salt_length: usize,
    },
    /// ECDSA with a DER `Ecdsa-Sig-Value` signature.
    Ecdsa(DigestAlgorithmIdentifier),
    /// ECDSA with a plain `r || s` signature.
    EcdsaPlain(DigestAlgorithmIdentifier),
}

// RFC 4055 3.1:
// RSASSA-PSS-params  ::=  SEQUENCE  {
//     hashAlgorithm      [0] HashAlgorithm DEFAULT
//                               sha1Identifier,
//     maskGenAlgorithm   [1] MaskGenAlgorithm DEFAULT
//                               mgf1SHA1Identifier,
//     saltLength         [2] INTEGER DEFAULT 20,
//     trailerField       [3] INTEGER DEFAULT 1
//  }
#[derive(Clone, Debug, Default, Eq, PartialEq, Sequence)]
pub struct RsaSsaPssParameters {
    #[asn1(context_specific = "0", tag_mode = "EXPLICIT", optional = "true")]
    pub hash_algorithm:     Option<AlgorithmIdentifierOwned>,
    #[asn1(context_specific = "1", tag_mode = "EXPLICIT", optional = "true")]
    pub mask_gen_algorithm: Option<AlgorithmIdentifierOwned>,
    #[asn1(context_specific = "2", tag_mode = "EXPLICIT", optional = "true")]
    pub salt_length:        Option<u32>,
    #[asn1(context_specific = "3", tag_mode = "EXPLICIT", optional = "true")]
    pub trailer_field:      Option<u32>,
}

impl RsaSsaPssParameters {
    fn resolve(&self, oid: Oid) -> Result<SignatureAlgorithmIdentifier, UnsupportedAlgorithm> {
        let digest = match &self.hash_algorithm {
            Some(algo) => DigestAlgorithmIdentifier::try_from(algo)?,
            None => DigestAlgorithmIdentifier::Sha1,
        };

        // MGF1 must use the same hash, the verifier has no way to express
        // anything else.
        let mgf_digest = match &self.mask_gen_algorithm {
            Some(mgf) if mgf.oid == ID_MGF1 => {
                let params = mgf.parameters.as_ref().ok_or(UnsupportedAlgorithm(ID_MGF1))?;
                let inner = params
                    .to_der()
                    .and_then(|der| AlgorithmIdentifierOwned::from_der(&der))
                    .map_err(|_| UnsupportedAlgorithm(ID_MGF1))?;
                DigestAlgorithmIdentifier::try_from(&inner)?
            }
            Some(mgf) => return Err(UnsupportedAlgorithm(mgf.oid)),
            None => DigestAlgorithmIdentifier::Sha1,
        };
        if mgf_digest != digest {
            return Err(UnsupportedAlgorithm(oid));
        }

        // Only the 0xBC trailer is defined.
        if self.trailer_field.unwrap_or(1) != 1 {
            return Err(UnsupportedAlgorithm(oid));
        }

        Ok(SignatureAlgorithmIdentifier::RsaPss {
            digest,
            salt_length: self.salt_length.unwrap_or(20) as usize,
        })
    }
}

impl SignatureAlgorithmIdentifier {
    /// Resolves an `AlgorithmIdentifier` from a certificate, CRL or CMS signer.
    ///
    /// CMS signers frequently name only the key type (`rsaEncryption`,
    /// `id-ecPublicKey`) and leave the hash to the signer's `digestAlgorithm`,
    /// which is passed as `digest_hint`.
    pub fn resolve(
        algorithm: &AlgorithmIdentifierOwned,
        digest_hint: Option<DigestAlgorithmIdentifier>,
    ) -> Result<Self, UnsupportedAlgorithm> {
        use DigestAlgorithmIdentifier::*;
        let oid = algorithm.oid;
        let hinted = || digest_hint.ok_or(UnsupportedAlgorithm(oid));
        Ok(match oid {
            ID_RSA_ENCRYPTION => Self::RsaPkcs1v15(hinted()?),
            ID_SHA1_WITH_RSA => Self::RsaPkcs1v15(Sha1),
            ID_SHA224_WITH_RSA => Self::RsaPkcs1v15(Sha224),
            ID_SHA256_WITH_RSA => Self::RsaPkcs1v15(Sha256),
            ID_SHA384_WITH_RSA => Self::RsaPkcs1v15(Sha384),
            ID_SHA512_WITH_RSA => Self::RsaPkcs1v15(Sha512),
            ID_SIG_RSASSA_PSS => {
                let params = match &algorithm.parameters {
                    Some(any) => any
                        .to_der()
                        .and_then(|der| RsaSsaPssParameters::from_der(&der))
                        .map_err(|_| UnsupportedAlgorithm(oid))?,
                    None => RsaSsaPssParameters::default(),
                };
                params.resolve(oid)?
            }
            ID_EC_PUBLIC_KEY => Self::Ecdsa(hinted()?),
            ID_ECDSA_WITH_SHA1 => Self::Ecdsa(Sha1),
            ID_ECDSA_WITH_SHA224 => Self::Ecdsa(Sha224),
            ID_ECDSA_WITH_SHA256 => Self::Ecdsa(Sha256),
            ID_ECDSA_WITH_SHA384 => Self::Ecdsa(Sha384),
            ID_ECDSA_WITH_SHA512 => Self::Ecdsa(Sha512),
            ID_ECDSA_PLAIN_SHA1 => Self::EcdsaPlain(Sha1),
            ID_ECDSA_PLAIN_SHA224 => Self::EcdsaPlain(Sha224),
            ID_ECDSA_PLAIN_SHA256 => Self::EcdsaPlain(Sha256),
            ID_ECDSA_PLAIN_SHA384 => Self::EcdsaPlain(Sha384),
            ID_ECDSA_PLAIN_SHA512 => Self::EcdsaPlain(Sha512),
            _ => return Err(UnsupportedAlgorithm(oid)),
        })
    }

    pub const fn digest(&self) -> DigestAlgorithmIdentifier {
        match *self {
            Self::RsaPkcs1v15(digest)
            | Self::RsaPss { digest, .. }
            | Self::Ecdsa(digest)
            | Self::EcdsaPlain(digest) => digest,
        }
    }
}
