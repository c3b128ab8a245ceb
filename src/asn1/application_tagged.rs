//! ASN.1 `[APPLICATION n]` wrappers as used by ICAO 9303-10 elementary files.
//!
//! `EF.SOD` for example is `[APPLICATION 23]` (`0x77`) around a CMS
//! `ContentInfo`.

use der::{Decode, Header, Reader, SliceReader, Tag, TagNumber};

const fn tag(number: u8) -> Tag {
    Tag::Application {
        constructed: true,
        number:      TagNumber::new(number),
    }
}

/// Returns true if `bytes` starts with the constructed `[APPLICATION number]`
/// tag.
pub fn is_application_tagged(bytes: &[u8], number: u8) -> bool {
    bytes
        .first()
        .is_some_and(|&first| Tag::try_from(first).is_ok_and(|t| t == tag(number)))
}

/// Strips a constructed `[APPLICATION number]` wrapper and returns the contents.
///
/// Trailing bytes after the wrapper are an error.
pub fn strip_application_tag(bytes: &[u8], number: u8) -> der::Result<&[u8]> {
    let mut reader = SliceReader::new(bytes)?;
    let header = Header::decode(&mut reader)?;
    header.tag.assert_eq(tag(number))?;
    let contents = reader.read_slice(header.length)?;
    reader.finish(contents)
}

#[cfg(test)]
mod tests {
    use {super::*, hex_literal::hex};

    #[test]
    fn test_strip() -> der::Result<()> {
        let wrapped = hex!("7703 020105");
        assert!(is_application_tagged(&wrapped, 23));
        assert_eq!(strip_application_tag(&wrapped, 23)?, &hex!("020105"));
        Ok(())
    }

    #[test]
    fn test_wrong_tag() {
        let sequence = hex!("3003 020105");
        assert!(!is_application_tagged(&sequence, 23));
        assert!(strip_application_tag(&sequence, 23).is_err());
    }

    #[test]
    fn test_trailing_data() {
        let wrapped = hex!("7703 020105 00");
        assert!(strip_application_tag(&wrapped, 23).is_err());
    }
}
