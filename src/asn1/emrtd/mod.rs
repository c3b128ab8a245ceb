//! eMRTD elementary files and PKD objects, ICAO 9303-10 and 9303-12.

pub mod pki;

use {
    super::{
        encapsulated_content, is_application_tagged, strip_application_tag, ContentInfo,
        ContentType, DigestAlgorithmIdentifier, UnsupportedAlgorithm,
    },
    crate::{ensure_err, error::ParseError},
    cms::signed_data::{SignedData, SignerInfo},
    der::{
        asn1::{ObjectIdentifier as Oid, OctetString, PrintableString},
        Decode, Sequence,
    },
    spki::AlgorithmIdentifierOwned,
};

/// `EF.SOD` is wrapped in `[APPLICATION 23]`.
pub const EF_SOD_TAG: u8 = 23;

/// Document Security Object, ICAO 9303-10 4.6.2.
///
/// Accepts both the elementary file as read from the chip (with the `0x77`
/// wrapper) and the bare `ContentInfo`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EfSod(SignedData);

// ICAO 9303-10 4.6.2.3
// LDSSecurityObject ::= SEQUENCE {
//   version LDSSecurityObjectVersion,
//   hashAlgorithm DigestAlgorithmIdentifier,
//   dataGroupHashValues SEQUENCE SIZE (2..ub-DataGroups) OF DataGroupHash,
//   ldsVersionInfo LDSVersionInfo OPTIONAL
//   -- if present, version MUST be V1 }
#[derive(Clone, Debug, PartialEq, Eq, Sequence)]
pub struct LdsSecurityObject {
    pub version:                u64,
    pub hash_algorithm:         AlgorithmIdentifierOwned,
    pub data_group_hash_values: Vec<DataGroupHash>,
    pub lds_version_info:       Option<LdsVersionInfo>,
}

#[derive(Clone, Debug, PartialEq, Eq, Sequence)]
pub struct DataGroupHash {
    pub data_group_number:     u64,
    pub data_group_hash_value: OctetString,
}

#[derive(Clone, Debug, PartialEq, Eq, Sequence)]
pub struct LdsVersionInfo {
    pub lds_version:     PrintableString,
    pub unicode_version: PrintableString,
}

impl ContentType for LdsSecurityObject {
    const CONTENT_TYPE: Oid = Oid::new_unwrap("2.23.136.1.1.1");
}

impl EfSod {
    pub fn from_der(bytes: &[u8]) -> Result<Self, ParseError> {
        let content_info = if is_application_tagged(bytes, EF_SOD_TAG) {
            strip_application_tag(bytes, EF_SOD_TAG)?
        } else {
            bytes
        };
        let signed_data = ContentInfo::<SignedData>::from_der(content_info)?.into_inner();
        Ok(Self(signed_data))
    }

    pub const fn signed_data(&self) -> &SignedData {
        &self.0
    }

    /// ICAO 9303-10 mandates exactly one signer.
    pub fn signer_info(&self) -> Result<&SignerInfo, ParseError> {
        let mut signers = self.0.signer_infos.0.iter();
        let signer = signers
            .next()
            .ok_or(ParseError::Structure("SOD has no SignerInfo"))?;
        ensure_err!(
            signers.next().is_none(),
            ParseError::Structure("SOD has more than one SignerInfo")
        );
        Ok(signer)
    }

    pub fn lds_security_object(&self) -> Result<LdsSecurityObject, ParseError> {
        let content = encapsulated_content(&self.0, LdsSecurityObject::CONTENT_TYPE)?;
        let lso = LdsSecurityObject::from_der(&content)?;
        ensure_err!(
            !lso.data_group_hash_values.is_empty(),
            ParseError::Structure("LDSSecurityObject has no data group hashes")
        );
        Ok(lso)
    }
}

impl LdsSecurityObject {
    pub fn digest_algorithm(&self) -> Result<DigestAlgorithmIdentifier, UnsupportedAlgorithm> {
        DigestAlgorithmIdentifier::try_from(&self.hash_algorithm)
    }

    /// Declared hash for data group `number`.
    pub fn hash_for(&self, number: u64) -> Option<&[u8]> {
        self.data_group_hash_values
            .iter()
            .find(|dgh| dgh.data_group_number == number)
            .map(|dgh| dgh.data_group_hash_value.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use {super::*, hex_literal::hex};

    #[test]
    fn test_decode_lds_security_object() -> anyhow::Result<()> {
        // Version 0, SHA-256, DG1 and DG2 with short dummy hashes.
        let der = hex!(
            "3021 020100
                  300b 0609608648016503040201
                  300f 3006 020101 040111
                       3005 020102 0400"
        );
        let lso = LdsSecurityObject::from_der(&der)?;
        assert_eq!(lso.version, 0);
        assert_eq!(lso.digest_algorithm()?, DigestAlgorithmIdentifier::Sha256);
        assert_eq!(lso.hash_for(1), Some(&[0x11][..]));
        assert_eq!(lso.hash_for(2), Some(&[][..]));
        assert_eq!(lso.hash_for(3), None);
        assert!(lso.lds_version_info.is_none());
        Ok(())
    }

    #[test]
    fn test_sod_garbage() {
        assert!(EfSod::from_der(&hex!("7703 020105")).is_err());
        assert!(EfSod::from_der(&[]).is_err());
    }
}
