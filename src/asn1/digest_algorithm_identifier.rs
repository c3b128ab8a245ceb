use {
    super::UnsupportedAlgorithm,
    der::{asn1::ObjectIdentifier as Oid, Tag, Tagged},
    serde::Serialize,
    spki::AlgorithmIdentifierOwned,
    std::fmt::{self, Display, Formatter},
};

pub const ID_SHA1: Oid = Oid::new_unwrap("1.3.14.3.2.26");
pub const ID_SHA224: Oid = Oid::new_unwrap("2.16.840.1.101.3.4.2.4");
pub const ID_SHA256: Oid = Oid::new_unwrap("2.16.840.1.101.3.4.2.1");
pub const ID_SHA384: Oid = Oid::new_unwrap("2.16.840.1.101.3.4.2.2");
pub const ID_SHA512: Oid = Oid::new_unwrap("2.16.840.1.101.3.4.2.3");

/// The hash functions ICAO 9303-11 allows for SOD and certificate signatures.
///
/// RFC 5754 lets the parameters be either absent or `NULL`, both occur in
/// practice and both are accepted here.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum DigestAlgorithmIdentifier {
    #[serde(rename = "SHA-1")]
    Sha1,
    #[serde(rename = "SHA-224")]
    Sha224,
    #[serde(rename = "SHA-256")]
    Sha256,
    #[serde(rename = "SHA-384")]
    Sha384,
    #[serde(rename = "SHA-512")]
    Sha512,
}

impl DigestAlgorithmIdentifier {
    pub fn from_oid(oid: &Oid) -> Option<Self> {
        Some(match *oid {
            ID_SHA1 => Self::Sha1,
            ID_SHA224 => Self::Sha224,
            ID_SHA256 => Self::Sha256,
            ID_SHA384 => Self::Sha384,
            ID_SHA512 => Self::Sha512,
            _ => return None,
        })
    }

    pub const fn oid(self) -> Oid {
        match self {
            Self::Sha1 => ID_SHA1,
            Self::Sha224 => ID_SHA224,
            Self::Sha256 => ID_SHA256,
            Self::Sha384 => ID_SHA384,
            Self::Sha512 => ID_SHA512,
        }
    }

    /// Output size in bytes.
    pub const fn output_len(self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha224 => 28,
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }
}

impl TryFrom<&AlgorithmIdentifierOwned> for DigestAlgorithmIdentifier {
    type Error = UnsupportedAlgorithm;

    fn try_from(algorithm: &AlgorithmIdentifierOwned) -> Result<Self, Self::Error> {
        let params_ok = algorithm
            .parameters
            .as_ref()
            .map_or(true, |params| params.tag() == Tag::Null);
        Self::from_oid(&algorithm.oid)
            .filter(|_| params_ok)
            .ok_or(UnsupportedAlgorithm(algorithm.oid))
    }
}

impl Display for DigestAlgorithmIdentifier {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::Sha1 => "SHA-1",
            Self::Sha224 => "SHA-224",
            Self::Sha256 => "SHA-256",
            Self::Sha384 => "SHA-384",
            Self::Sha512 => "SHA-512",
        })
    }
}

#[cfg(test)]
mod tests {
    use {super::*, der::Decode, hex_literal::hex};

    #[test]
    fn test_parameters_absent_or_null() -> anyhow::Result<()> {
        let absent = AlgorithmIdentifierOwned::from_der(&hex!("300b0609608648016503040201"))?;
        let null = AlgorithmIdentifierOwned::from_der(&hex!("300d06096086480165030402010500"))?;
        assert_eq!(
            DigestAlgorithmIdentifier::try_from(&absent)?,
            DigestAlgorithmIdentifier::Sha256
        );
        assert_eq!(
            DigestAlgorithmIdentifier::try_from(&null)?,
            DigestAlgorithmIdentifier::Sha256
        );
        Ok(())
    }

    #[test]
    fn test_unknown() {
        // MD5
        let md5 = AlgorithmIdentifierOwned {
            oid:        Oid::new_unwrap("1.2.840.113549.2.5"),
            parameters: None,
        };
        assert!(DigestAlgorithmIdentifier::try_from(&md5).is_err());
    }
}
