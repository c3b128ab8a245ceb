use {
    super::Fingerprint,
    crate::{
        asn1::{first_element, SignatureAlgorithmIdentifier, UnsupportedAlgorithm},
        crypto::{PublicKey, SignatureError},
        error::ParseError,
    },
    chrono::{DateTime, Utc},
    const_oid::AssociatedOid,
    der::{asn1::ObjectIdentifier as Oid, Decode},
    serde::{Deserialize, Serialize},
    std::fmt::{self, Display, Formatter},
    x509_cert::{
        ext::pkix::{BasicConstraints, SubjectKeyIdentifier},
        name::Name,
        serial_number::SerialNumber,
        time::Time,
    },
};

const ID_AT_COUNTRY_NAME: Oid = Oid::new_unwrap("2.5.4.6");

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CertificateType {
    /// Country Signing CA, the national trust anchor.
    Csca,
    /// Document Signer.
    Dsc,
    /// Non-conformant Document Signer, as published in the PKD `nc-data`
    /// branch.
    DscNc,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CertificateStatus {
    #[default]
    Valid,
    Expired,
    Revoked,
    Suspended,
}

/// Position of an instant relative to a validity window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Validity {
    NotYetValid,
    Valid,
    Expired,
}

/// A parsed X.509 certificate together with the attributes the trust engine
/// keys on.
#[derive(Clone, Debug)]
pub struct Certificate {
    tbs:                    Vec<u8>,
    inner:                  x509_cert::Certificate,
    subject_dn:             String,
    issuer_dn:              String,
    serial_number:          String,
    fingerprint:            Fingerprint,
    not_before:             DateTime<Utc>,
    not_after:              DateTime<Utc>,
    certificate_type:       CertificateType,
    status:                 CertificateStatus,
    is_ca:                  bool,
    path_len:               Option<u8>,
    subject_key_identifier: Option<Vec<u8>>,
    country:                Option<String>,
}

impl Certificate {
    /// Parses a certificate, classifying it by its CA flag.
    pub fn from_der(der: &[u8]) -> Result<Self, ParseError> {
        let mut cert = Self::parse(der)?;
        cert.certificate_type = if cert.is_ca {
            CertificateType::Csca
        } else {
            CertificateType::Dsc
        };
        Ok(cert)
    }

    /// Parses a certificate whose type is known from its source.
    pub fn from_der_as(der: &[u8], certificate_type: CertificateType) -> Result<Self, ParseError> {
        let mut cert = Self::parse(der)?;
        cert.certificate_type = certificate_type;
        Ok(cert)
    }

    fn parse(der: &[u8]) -> Result<Self, ParseError> {
        let inner = x509_cert::Certificate::from_der(der)?;
        let tbs = first_element(der)?.to_vec();
        let tbs_cert = &inner.tbs_certificate;

        let mut is_ca = false;
        let mut path_len = None;
        let mut subject_key_identifier = None;
        for ext in tbs_cert.extensions.iter().flatten() {
            if ext.extn_id == BasicConstraints::OID {
                let bc = BasicConstraints::from_der(ext.extn_value.as_bytes())?;
                is_ca = bc.ca;
                path_len = bc.path_len_constraint;
            } else if ext.extn_id == SubjectKeyIdentifier::OID {
                let ski = SubjectKeyIdentifier::from_der(ext.extn_value.as_bytes())?;
                subject_key_identifier = Some(ski.0.as_bytes().to_vec());
            }
        }

        let not_before = to_utc(&tbs_cert.validity.not_before)
            .ok_or(ParseError::Structure("notBefore out of range"))?;
        let not_after = to_utc(&tbs_cert.validity.not_after)
            .ok_or(ParseError::Structure("notAfter out of range"))?;

        Ok(Self {
            tbs,
            subject_dn: tbs_cert.subject.to_string(),
            issuer_dn: tbs_cert.issuer.to_string(),
            serial_number: serial_hex(tbs_cert.serial_number.as_bytes()),
            fingerprint: Fingerprint::of(der),
            not_before,
            not_after,
            certificate_type: CertificateType::Dsc,
            status: CertificateStatus::Valid,
            is_ca,
            path_len,
            subject_key_identifier,
            country: country_of(&tbs_cert.subject),
            inner,
        })
    }

    /// RFC 4514 string form of the subject.
    pub fn subject_dn(&self) -> &str {
        &self.subject_dn
    }

    /// RFC 4514 string form of the issuer.
    pub fn issuer_dn(&self) -> &str {
        &self.issuer_dn
    }

    /// Uppercase hex, without leading zero bytes.
    pub fn serial_number(&self) -> &str {
        &self.serial_number
    }

    pub const fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    pub const fn not_before(&self) -> DateTime<Utc> {
        self.not_before
    }

    pub const fn not_after(&self) -> DateTime<Utc> {
        self.not_after
    }

    pub const fn certificate_type(&self) -> CertificateType {
        self.certificate_type
    }

    pub const fn status(&self) -> CertificateStatus {
        self.status
    }

    pub(crate) fn set_status(&mut self, status: CertificateStatus) {
        self.status = status;
    }

    /// BasicConstraints `cA`.
    pub const fn is_ca(&self) -> bool {
        self.is_ca
    }

    /// BasicConstraints `pathLenConstraint`.
    pub const fn path_len(&self) -> Option<u8> {
        self.path_len
    }

    pub fn subject_key_identifier(&self) -> Option<&[u8]> {
        self.subject_key_identifier.as_deref()
    }

    /// Subject `C` attribute.
    pub fn country(&self) -> Option<&str> {
        self.country.as_deref()
    }

    pub fn validity_at(&self, at: DateTime<Utc>) -> Validity {
        if at < self.not_before {
            Validity::NotYetValid
        } else if at > self.not_after {
            Validity::Expired
        } else {
            Validity::Valid
        }
    }

    /// Subject and issuer names are equal. Whether the certificate is also
    /// self-signed is up to [`Self::verify_issued_by`].
    pub fn is_self_issued(&self) -> bool {
        self.subject_dn == self.issuer_dn
    }

    pub fn public_key(&self) -> Result<PublicKey, SignatureError> {
        PublicKey::from_spki(&self.inner.tbs_certificate.subject_public_key_info)
    }

    pub fn signature_algorithm(&self) -> Result<SignatureAlgorithmIdentifier, UnsupportedAlgorithm> {
        SignatureAlgorithmIdentifier::resolve(&self.inner.signature_algorithm, None)
    }

    /// Verifies this certificate's signature with `issuer`'s public key.
    pub fn verify_issued_by(&self, issuer: &Self) -> Result<(), SignatureError> {
        let algorithm = self.signature_algorithm()?;
        issuer
            .public_key()?
            .verify(algorithm, &self.tbs, self.inner.signature.raw_bytes())
    }

    /// CMS `IssuerAndSerialNumber` match.
    pub fn has_issuer_and_serial(&self, issuer: &Name, serial_number: &SerialNumber) -> bool {
        self.inner.tbs_certificate.issuer == *issuer
            && self.inner.tbs_certificate.serial_number == *serial_number
    }
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.fingerprint.sha256 == other.fingerprint.sha256
    }
}

impl Eq for Certificate {}

impl Display for Certificate {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{} (serial {})", self.subject_dn, self.serial_number)
    }
}

pub(crate) fn to_utc(time: &Time) -> Option<DateTime<Utc>> {
    let secs = i64::try_from(time.to_unix_duration().as_secs()).ok()?;
    DateTime::from_timestamp(secs, 0)
}

/// Serial numbers are compared in this form, between certificates and CRL
/// entries alike.
pub(crate) fn serial_hex(bytes: &[u8]) -> String {
    let start = bytes
        .iter()
        .position(|&b| b != 0)
        .unwrap_or(bytes.len().saturating_sub(1));
    hex::encode_upper(bytes.get(start..).unwrap_or_default())
}

pub(crate) fn country_of(name: &Name) -> Option<String> {
    name.0
        .iter()
        .flat_map(|rdn| rdn.0.iter())
        .find(|atv| atv.oid == ID_AT_COUNTRY_NAME)
        .map(|atv| String::from_utf8_lossy(atv.value.value()).into_owned())
}

#[cfg(test)]
mod tests {
    use {super::*, anyhow::Result, chrono::TimeZone};

    const CSCA: &[u8] = include_bytes!("../../tests/dataset/csca.der");
    const DSC: &[u8] = include_bytes!("../../tests/dataset/dsc.der");

    #[test]
    fn test_parse_csca() -> Result<()> {
        let csca = Certificate::from_der(CSCA)?;
        assert_eq!(csca.certificate_type(), CertificateType::Csca);
        assert!(csca.is_ca());
        assert!(csca.is_self_issued());
        assert_eq!(csca.serial_number(), "1001");
        assert_eq!(csca.country(), Some("UT"));
        assert!(csca.subject_dn().contains("CN=CSCA Utopia"));
        assert!(csca.subject_key_identifier().is_some());
        csca.verify_issued_by(&csca)?;
        Ok(())
    }

    #[test]
    fn test_parse_dsc() -> Result<()> {
        let csca = Certificate::from_der(CSCA)?;
        let dsc = Certificate::from_der(DSC)?;
        assert_eq!(dsc.certificate_type(), CertificateType::Dsc);
        assert!(!dsc.is_ca());
        assert_eq!(dsc.issuer_dn(), csca.subject_dn());
        dsc.verify_issued_by(&csca)?;
        assert!(csca.verify_issued_by(&dsc).is_err());
        Ok(())
    }

    #[test]
    fn test_validity() -> Result<()> {
        let dsc = Certificate::from_der(DSC)?;
        let at = |y| Utc.with_ymd_and_hms(y, 6, 1, 0, 0, 0).unwrap();
        assert_eq!(dsc.validity_at(at(2020)), Validity::NotYetValid);
        assert_eq!(dsc.validity_at(at(2030)), Validity::Valid);
        assert_eq!(dsc.validity_at(at(2041)), Validity::Expired);
        Ok(())
    }

    #[test]
    fn test_serial_hex() {
        assert_eq!(serial_hex(&[0x00, 0x80, 0x01]), "8001");
        assert_eq!(serial_hex(&[0x00]), "00");
        assert_eq!(serial_hex(&[]), "");
    }

    #[test]
    fn test_garbage() {
        assert!(Certificate::from_der(&[0x30, 0x00]).is_err());
    }
}
