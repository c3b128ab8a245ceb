//! CMS `SignedData` verification, RFC 5652 5 with the ICAO 9303 profile.
//!
//! Two ways to find the key a signer is verified with:
//!
//! * [`SignerSource::Anchor`]: Master Lists. A signer verifies when the anchor
//!   key verifies it directly, or when the embedded certificate named by the
//!   signer identifier verifies it and is itself issued by the anchor.
//! * [`SignerSource::Embedded`]: SODs. The signer identifier must name exactly
//!   one certificate in `certificates`, the DSC.

use {
    super::Certificate,
    crate::{
        asn1::{DigestAlgorithmIdentifier, SignatureAlgorithmIdentifier, UnsupportedAlgorithm},
        config::Leniency,
        crypto::SignatureError,
        error::{ErrorCode, ParseError},
    },
    cms::{
        cert::CertificateChoices,
        content_info::CmsVersion,
        signed_data::{SignedData, SignerIdentifier, SignerInfo},
    },
    der::{
        asn1::{ObjectIdentifier as Oid, OctetString},
        Encode,
    },
    subtle::ConstantTimeEq,
    thiserror::Error,
    tracing::{debug, warn},
};

const ID_CONTENT_TYPE: Oid = Oid::new_unwrap("1.2.840.113549.1.9.3");
const ID_MESSAGE_DIGEST: Oid = Oid::new_unwrap("1.2.840.113549.1.9.4");

#[derive(Clone, Copy, Debug)]
pub enum SignerSource<'a> {
    Anchor(&'a Certificate),
    Embedded,
}

#[derive(Debug, Error)]
pub enum CmsError {
    #[error("Malformed CMS: {0}")]
    Malformed(#[from] ParseError),

    #[error("No signer matched a certificate")]
    NoMatchingSigner,

    #[error("Signer identifier matches more than one certificate")]
    AmbiguousSigner,

    #[error("messageDigest attribute does not match the content")]
    MessageDigestMismatch,

    #[error("contentType attribute does not match the content")]
    ContentTypeMismatch,

    #[error("Signature does not verify: {0}")]
    Signature(#[from] SignatureError),
}

impl CmsError {
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Malformed(_) => ErrorCode::MalformedCms,
            Self::NoMatchingSigner => ErrorCode::DscNotFound,
            Self::AmbiguousSigner => ErrorCode::AmbiguousSigner,
            Self::MessageDigestMismatch => ErrorCode::MessageDigestMismatch,
            Self::ContentTypeMismatch => ErrorCode::ContentTypeMismatch,
            Self::Signature(e) => e.code(),
        }
    }
}

impl From<UnsupportedAlgorithm> for CmsError {
    fn from(e: UnsupportedAlgorithm) -> Self {
        Self::Signature(e.into())
    }
}

/// Outcome of a successful verification.
#[derive(Clone, Debug)]
pub struct VerifiedContent {
    /// The certificate whose key verified the signature.
    pub signer:           Certificate,
    /// All parseable certificates from the `certificates` field.
    pub embedded:         Vec<Certificate>,
    pub content_type:     Oid,
    pub content:          Vec<u8>,
    pub digest_algorithm: DigestAlgorithmIdentifier,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct CmsVerifier {
    structure: Leniency,
}

impl CmsVerifier {
    pub const fn new(structure: Leniency) -> Self {
        Self { structure }
    }

    /// Verifies `signed_data`, returning the signer and the signed content.
    ///
    /// With several signer infos the first one that verifies wins, otherwise
    /// the first signer's failure is returned.
    pub fn verify(
        &self,
        signed_data: &SignedData,
        source: SignerSource,
    ) -> Result<VerifiedContent, CmsError> {
        self.check_structure(signed_data, source)?;
        let (content_type, content) = encapsulated(signed_data)?;
        let embedded = embedded_certificates(signed_data);

        let mut first_error = None;
        for signer_info in signed_data.signer_infos.0.iter() {
            let result = verify_signer(signer_info, content_type, &content, &embedded, source);
            match result {
                Ok((signer, digest_algorithm)) => {
                    debug!(signer = %signer, "CMS signature verified");
                    return Ok(VerifiedContent {
                        signer,
                        embedded,
                        content_type,
                        content,
                        digest_algorithm,
                    });
                }
                Err(e) => {
                    debug!(error = %e, "CMS signer did not verify");
                    first_error.get_or_insert(e);
                }
            }
        }
        Err(first_error.unwrap_or(CmsError::NoMatchingSigner))
    }

    /// The embedded certificate the (single) signer identifier refers to.
    ///
    /// Used to locate the DSC of an SOD before its signature is checked.
    pub fn signer_certificate(&self, signed_data: &SignedData) -> Result<Certificate, CmsError> {
        let signer_info = signed_data
            .signer_infos
            .0
            .iter()
            .next()
            .ok_or(ParseError::Structure("SignedData has no SignerInfo"))?;
        let embedded = embedded_certificates(signed_data);
        unique_match(&signer_info.sid, &embedded).cloned()
    }

    fn check_structure(&self, signed_data: &SignedData, source: SignerSource) -> Result<(), CmsError> {
        let rules = [
            (
                signed_data.version == CmsVersion::V3,
                "SignedData must be version 3",
            ),
            (
                !signed_data.digest_algorithms.is_empty(),
                "SignedData must list its digest algorithms",
            ),
            (
                matches!(source, SignerSource::Anchor(_)) || signed_data.crls.is_none(),
                "SOD SignedData must not contain the crls field",
            ),
        ];
        for (cond, msg) in rules {
            self.structure
                .ensure(cond, msg)
                .map_err(|_| ParseError::Structure(msg))?;
        }
        Ok(())
    }
}

fn encapsulated(signed_data: &SignedData) -> Result<(Oid, Vec<u8>), CmsError> {
    let econ = &signed_data.encap_content_info;
    let content = econ
        .econtent
        .as_ref()
        .ok_or(ParseError::Structure(
            "SignedData must contain encapsulated content",
        ))?
        .decode_as::<OctetString>()
        .map_err(ParseError::from)?;
    Ok((econ.econtent_type, content.as_bytes().to_vec()))
}

fn embedded_certificates(signed_data: &SignedData) -> Vec<Certificate> {
    let mut certificates: Vec<Certificate> = Vec::new();
    for choice in signed_data.certificates.iter().flat_map(|set| set.0.iter()) {
        let CertificateChoices::Certificate(cert) = choice else {
            continue;
        };
        match cert
            .to_der()
            .map_err(ParseError::from)
            .and_then(|der| Certificate::from_der(&der))
        {
            Ok(cert) if !certificates.contains(&cert) => certificates.push(cert),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Skipping unparseable embedded certificate"),
        }
    }
    certificates
}

fn matches_sid(sid: &SignerIdentifier, cert: &Certificate) -> bool {
    match sid {
        SignerIdentifier::IssuerAndSerialNumber(isn) => {
            cert.has_issuer_and_serial(&isn.issuer, &isn.serial_number)
        }
        SignerIdentifier::SubjectKeyIdentifier(ski) => {
            cert.subject_key_identifier() == Some(ski.0.as_bytes())
        }
    }
}

fn unique_match<'a>(
    sid: &SignerIdentifier,
    certificates: &'a [Certificate],
) -> Result<&'a Certificate, CmsError> {
    let mut matches = certificates.iter().filter(|cert| matches_sid(sid, cert));
    let cert = matches.next().ok_or(CmsError::NoMatchingSigner)?;
    if matches.next().is_some() {
        return Err(CmsError::AmbiguousSigner);
    }
    Ok(cert)
}

/// The bytes the signature is computed over, RFC 5652 5.4.
fn signed_message(
    signer_info: &SignerInfo,
    digest: DigestAlgorithmIdentifier,
    content_type: Oid,
    content: &[u8],
) -> Result<Vec<u8>, CmsError> {
    let Some(attrs) = &signer_info.signed_attrs else {
        return Ok(content.to_vec());
    };

    let mut message_digest = None;
    for attr in attrs.iter() {
        let Some(value) = attr.values.iter().next() else {
            continue;
        };
        if attr.oid == ID_MESSAGE_DIGEST {
            let os = value.decode_as::<OctetString>().map_err(ParseError::from)?;
            message_digest = Some(os.as_bytes().to_vec());
        } else if attr.oid == ID_CONTENT_TYPE {
            let oid = value.decode_as::<Oid>().map_err(ParseError::from)?;
            if oid != content_type {
                return Err(CmsError::ContentTypeMismatch);
            }
        }
    }

    let message_digest = message_digest.ok_or(ParseError::Structure(
        "signedAttrs must contain messageDigest",
    ))?;
    let actual = digest.hash_bytes(content);
    if !bool::from(actual.ct_eq(&message_digest)) {
        return Err(CmsError::MessageDigestMismatch);
    }

    // Signed over the DER of SET OF Attribute, not the [0] IMPLICIT tag.
    attrs
        .to_der()
        .map_err(|e| CmsError::Malformed(e.into()))
}

fn verify_signer(
    signer_info: &SignerInfo,
    content_type: Oid,
    content: &[u8],
    embedded: &[Certificate],
    source: SignerSource,
) -> Result<(Certificate, DigestAlgorithmIdentifier), CmsError> {
    let digest = DigestAlgorithmIdentifier::try_from(&signer_info.digest_alg)?;
    let algorithm = SignatureAlgorithmIdentifier::resolve(&signer_info.signature_algorithm, Some(digest))?;
    let message = signed_message(signer_info, digest, content_type, content)?;
    let signature = signer_info.signature.as_bytes();

    match source {
        SignerSource::Embedded => {
            let cert = unique_match(&signer_info.sid, embedded)?;
            cert.public_key()?.verify(algorithm, &message, signature)?;
            Ok((cert.clone(), digest))
        }
        SignerSource::Anchor(anchor) => {
            let direct = match anchor.public_key()?.verify(algorithm, &message, signature) {
                Ok(()) => return Ok((anchor.clone(), digest)),
                Err(e) => e,
            };
            let verifies = |cert: &Certificate| {
                cert.public_key()
                    .is_ok_and(|key| key.verify(algorithm, &message, signature).is_ok())
            };
            for cert in embedded.iter().filter(|cert| matches_sid(&signer_info.sid, cert)) {
                if verifies(cert) && cert.verify_issued_by(anchor).is_ok() {
                    return Ok((cert.clone(), digest));
                }
            }
            Err(direct.into())
        }
    }
}
