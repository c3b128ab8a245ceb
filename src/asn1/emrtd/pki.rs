use {
    crate::{
        asn1::{encapsulated_content, ContentInfo, ContentType},
        ensure_err,
        error::ParseError,
    },
    cms::signed_data::SignedData,
    der::{asn1::ObjectIdentifier as Oid, Any, Decode, Reader, Sequence, SliceReader, Tag, Tagged},
};

/// Master Lists are implemented as instances of the ContentInfo Type, as
/// specified in [RFC 5652]. The ContentInfo contains a single instance of
/// SignedData.
///
/// See ICAO 9303-12 9
pub type MasterList = ContentInfo<SignedData>;

/// `CscaMasterList ::= SEQUENCE { version INTEGER, certList SET OF Certificate }`
///
/// Entries are kept as the encoded bytes found in `certList`. Whether each one
/// is a well formed certificate is up to the caller, one bad entry must not
/// take the rest of the list with it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CscaMasterList {
    pub version:   u64,
    pub cert_list: Vec<Vec<u8>>,
}

#[derive(Sequence)]
struct RawCscaMasterList {
    version:   u64,
    cert_list: Any,
}

impl ContentType for CscaMasterList {
    /// ICAO 9303-12 9.2
    const CONTENT_TYPE: Oid = Oid::new_unwrap("2.23.136.1.1.2");
}

impl CscaMasterList {
    pub fn from_der(bytes: &[u8]) -> Result<Self, ParseError> {
        let raw = RawCscaMasterList::from_der(bytes)?;
        ensure_err!(
            raw.cert_list.tag() == Tag::Set,
            ParseError::Structure("certList must be a SET")
        );

        let set = raw.cert_list.value();
        let mut reader = SliceReader::new(set)?;
        let mut cert_list = Vec::new();
        while !reader.is_finished() {
            let start = usize::try_from(reader.position())?;
            let _element = Any::decode(&mut reader)?;
            let end = usize::try_from(reader.position())?;
            if let Some(element) = set.get(start..end) {
                cert_list.push(element.to_vec());
            }
        }

        Ok(Self {
            version: raw.version,
            cert_list,
        })
    }
}

impl MasterList {
    pub const fn signed_data(&self) -> &SignedData {
        &self.0
    }

    /// MasterList contains the CSCA Master List as encapsulated content.
    pub fn csca_ml(&self) -> Result<CscaMasterList, ParseError> {
        let content = encapsulated_content(&self.0, CscaMasterList::CONTENT_TYPE)?;
        CscaMasterList::from_der(&content)
    }
}
