use {
    super::{
        signed_data::{CmsError, CmsVerifier, SignerSource, VerifiedContent},
        Certificate, CertificateType,
    },
    crate::{
        asn1::{
            emrtd::pki::{CscaMasterList, MasterList},
            ContentType,
        },
        error::ParseError,
    },
    std::collections::HashSet,
    tracing::{debug, info, warn},
};

/// Country code of the ICAO global Master List.
pub const GLOBAL_COUNTRY: &str = "ZZ";

/// A verified Master List and the CSCAs extracted from it.
#[derive(Clone, Debug)]
pub struct VerifiedMasterList {
    pub country:      String,
    pub signer:       Certificate,
    pub certificates: Vec<Certificate>,
    /// Entries in `certList` that were not certificates.
    pub skipped:      usize,
}

impl VerifiedMasterList {
    /// Equals `certificates.len()`.
    pub fn csca_count(&self) -> usize {
        self.certificates.len()
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct MasterListExtractor {
    verifier: CmsVerifier,
}

impl MasterListExtractor {
    pub const fn new(verifier: CmsVerifier) -> Self {
        Self { verifier }
    }

    /// Parses and verifies a Master List, trying each anchor in turn, then
    /// extracts its CSCAs.
    pub fn verify_and_extract(
        &self,
        der: &[u8],
        anchors: &[Certificate],
    ) -> Result<VerifiedMasterList, CmsError> {
        let master_list = MasterList::from_der(der)?;
        let mut first_error = None;
        for anchor in anchors {
            match self
                .verifier
                .verify(master_list.signed_data(), SignerSource::Anchor(anchor))
            {
                Ok(verified) => {
                    debug!(anchor = %anchor, "Master List signature verified");
                    return self.extract(&verified).map_err(CmsError::from);
                }
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        Err(first_error.unwrap_or(CmsError::NoMatchingSigner))
    }

    /// Collects the CA certificates of a verified Master List.
    ///
    /// Sources are the `certificates` field less the signer, and the
    /// `certList` of the signed `CscaMasterList`. Duplicates by issuer and
    /// serial number are dropped.
    pub fn extract(&self, verified: &VerifiedContent) -> Result<VerifiedMasterList, ParseError> {
        if verified.content_type != CscaMasterList::CONTENT_TYPE {
            return Err(ParseError::ContentType {
                expected: CscaMasterList::CONTENT_TYPE,
                found:    verified.content_type,
            });
        }
        let csca_ml = CscaMasterList::from_der(&verified.content)?;

        let mut skipped = 0;
        let from_content = csca_ml
            .cert_list
            .iter()
            .filter_map(|der| match Certificate::from_der_as(der, CertificateType::Csca) {
                Ok(cert) => Some(cert),
                Err(e) => {
                    warn!(error = %e, "Skipping malformed Master List entry");
                    skipped += 1;
                    None
                }
            })
            .collect::<Vec<_>>();
        let from_cms = verified
            .embedded
            .iter()
            .filter(|cert| **cert != verified.signer)
            .cloned();

        let mut seen = HashSet::new();
        let certificates = from_cms
            .chain(from_content)
            .filter(Certificate::is_ca)
            .filter(|cert| seen.insert((cert.serial_number().to_owned(), cert.issuer_dn().to_owned())))
            .collect::<Vec<_>>();

        let country = verified
            .signer
            .country()
            .unwrap_or(GLOBAL_COUNTRY)
            .to_owned();
        info!(
            country = %country,
            cscas = certificates.len(),
            skipped,
            "Extracted CSCAs from Master List"
        );

        Ok(VerifiedMasterList {
            country,
            signer: verified.signer.clone(),
            certificates,
            skipped,
        })
    }
}
