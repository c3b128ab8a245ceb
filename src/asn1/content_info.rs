use {
    crate::error::ParseError,
    cms::{content_info::ContentInfo as RawContentInfo, signed_data::SignedData},
    der::{
        asn1::{ObjectIdentifier as Oid, OctetString},
        Decode, DecodeOwned, Encode,
    },
};

/// RFC 5652 `id-signedData`.
pub const ID_SIGNED_DATA: Oid = Oid::new_unwrap("1.2.840.113549.1.7.2");

/// Types that can appear as the content of a CMS `ContentInfo` or as
/// encapsulated content.
pub trait ContentType {
    const CONTENT_TYPE: Oid;
}

impl ContentType for SignedData {
    const CONTENT_TYPE: Oid = ID_SIGNED_DATA;
}

/// RFC 5652 `ContentInfo` with the content type fixed by `T`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentInfo<T>(pub T);

impl<T> ContentInfo<T>
where
    T: ContentType + DecodeOwned,
{
    pub fn from_der(bytes: &[u8]) -> Result<Self, ParseError> {
        let raw = RawContentInfo::from_der(bytes)?;
        if raw.content_type != T::CONTENT_TYPE {
            return Err(ParseError::ContentType {
                expected: T::CONTENT_TYPE,
                found:    raw.content_type,
            });
        }
        let content = T::from_der(&raw.content.to_der()?)?;
        Ok(Self(content))
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

/// Returns the encapsulated content of `signed_data`, checking its type.
pub fn encapsulated_content(
    signed_data: &SignedData,
    expected: Oid,
) -> Result<Vec<u8>, ParseError> {
    let econ = &signed_data.encap_content_info;
    if econ.econtent_type != expected {
        return Err(ParseError::ContentType {
            expected,
            found: econ.econtent_type,
        });
    }
    let octet_string = econ
        .econtent
        .as_ref()
        .ok_or(ParseError::Structure(
            "SignedData must contain encapsulated content",
        ))?
        .decode_as::<OctetString>()?;
    Ok(octet_string.as_bytes().to_vec())
}
