use {
    super::{
        certificate::{country_of, serial_hex, to_utc},
        Certificate, Fingerprint,
    },
    crate::{
        asn1::{first_element, SignatureAlgorithmIdentifier},
        crypto::SignatureError,
        error::ParseError,
    },
    chrono::{DateTime, Utc},
    der::{asn1::ObjectIdentifier as Oid, Any, Decode, Tag, Tagged},
    num_enum::TryFromPrimitive,
    serde::Serialize,
    std::collections::HashMap,
    x509_cert::crl::CertificateList,
};

const ID_CE_CRL_REASONS: Oid = Oid::new_unwrap("2.5.29.21");

/// RFC 5280 5.3.1 `CRLReason`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, TryFromPrimitive, Serialize)]
#[serde(rename_all = "camelCase")]
#[repr(u8)]
pub enum RevocationReason {
    Unspecified          = 0,
    KeyCompromise        = 1,
    CaCompromise         = 2,
    AffiliationChanged   = 3,
    Superseded           = 4,
    CessationOfOperation = 5,
    CertificateHold      = 6,
    RemoveFromCrl        = 8,
    PrivilegeWithdrawn   = 9,
    AaCompromise         = 10,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RevokedEntry {
    pub serial_number:   String,
    pub revocation_date: Option<DateTime<Utc>>,
    pub reason:          Option<RevocationReason>,
}

/// A parsed X.509 CRL, indexed by revoked serial number.
#[derive(Clone, Debug)]
pub struct RevocationList {
    der:         Vec<u8>,
    tbs:         Vec<u8>,
    inner:       CertificateList,
    issuer_dn:   String,
    country:     Option<String>,
    fingerprint: Fingerprint,
    this_update: DateTime<Utc>,
    next_update: Option<DateTime<Utc>>,
    revoked:     HashMap<String, RevokedEntry>,
}

impl RevocationList {
    pub fn from_der(der: &[u8]) -> Result<Self, ParseError> {
        let inner = CertificateList::from_der(der)?;
        let tbs = first_element(der)?.to_vec();
        let tbs_list = &inner.tbs_cert_list;

        let this_update = to_utc(&tbs_list.this_update)
            .ok_or(ParseError::Structure("thisUpdate out of range"))?;
        let next_update = tbs_list.next_update.as_ref().and_then(to_utc);

        let mut revoked = HashMap::new();
        for entry in tbs_list.revoked_certificates.iter().flatten() {
            let mut reason = None;
            for ext in entry.crl_entry_extensions.iter().flatten() {
                if ext.extn_id == ID_CE_CRL_REASONS {
                    reason = Some(decode_reason(ext.extn_value.as_bytes())?);
                }
            }
            let serial_number = serial_hex(entry.serial_number.as_bytes());
            revoked.insert(serial_number.clone(), RevokedEntry {
                serial_number,
                revocation_date: to_utc(&entry.revocation_date),
                reason,
            });
        }

        Ok(Self {
            der: der.to_vec(),
            tbs,
            issuer_dn: tbs_list.issuer.to_string(),
            country: country_of(&tbs_list.issuer),
            fingerprint: Fingerprint::of(der),
            this_update,
            next_update,
            revoked,
            inner,
        })
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    pub fn issuer_dn(&self) -> &str {
        &self.issuer_dn
    }

    pub fn country(&self) -> Option<&str> {
        self.country.as_deref()
    }

    pub const fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    pub const fn this_update(&self) -> DateTime<Utc> {
        self.this_update
    }

    pub const fn next_update(&self) -> Option<DateTime<Utc>> {
        self.next_update
    }

    pub fn revoked_count(&self) -> usize {
        self.revoked.len()
    }

    /// Looks up a serial number in the uppercase hex form used by
    /// [`Certificate::serial_number`].
    pub fn entry(&self, serial_number: &str) -> Option<&RevokedEntry> {
        self.revoked.get(serial_number)
    }

    /// `thisUpdate <= at <= nextUpdate`. A CRL without `nextUpdate` does not
    /// expire.
    pub fn is_current_at(&self, at: DateTime<Utc>) -> bool {
        self.this_update <= at && self.next_update.map_or(true, |next| at <= next)
    }

    /// Verifies the CRL signature with the issuing CSCA's key.
    pub fn verify_signature(&self, issuer: &Certificate) -> Result<(), SignatureError> {
        let algorithm = SignatureAlgorithmIdentifier::resolve(&self.inner.signature_algorithm, None)?;
        issuer
            .public_key()?
            .verify(algorithm, &self.tbs, self.inner.signature.raw_bytes())
    }

    /// The CRL with the latest `nextUpdate`. One without `nextUpdate` counts as
    /// latest.
    pub fn latest<'a>(crls: impl IntoIterator<Item = &'a Self>) -> Option<&'a Self> {
        crls.into_iter()
            .max_by_key(|crl| (crl.next_update.is_none(), crl.next_update, crl.this_update))
    }
}

// CRLReason ::= ENUMERATED
fn decode_reason(bytes: &[u8]) -> Result<RevocationReason, ParseError> {
    let any = Any::from_der(bytes)?;
    if any.tag() != Tag::Enumerated {
        return Err(ParseError::Structure("CRLReason must be ENUMERATED"));
    }
    match any.value() {
        [value] => RevocationReason::try_from(*value)
            .map_err(|_| ParseError::Structure("Unknown CRLReason")),
        _ => Err(ParseError::Structure("Unknown CRLReason")),
    }
}

#[cfg(test)]
mod tests {
    use {super::*, anyhow::Result, chrono::TimeZone, hex_literal::hex};

    const CRL: &[u8] = include_bytes!("../../tests/dataset/crl.der");
    const CSCA: &[u8] = include_bytes!("../../tests/dataset/csca.der");
    const DSC: &[u8] = include_bytes!("../../tests/dataset/dsc.der");

    #[test]
    fn test_parse() -> Result<()> {
        let crl = RevocationList::from_der(CRL)?;
        let csca = Certificate::from_der(CSCA)?;
        assert_eq!(crl.issuer_dn(), csca.subject_dn());
        assert_eq!(crl.country(), Some("UT"));
        assert_eq!(crl.revoked_count(), 2);
        assert_eq!(
            crl.entry("3006").and_then(|e| e.reason),
            Some(RevocationReason::KeyCompromise)
        );
        assert_eq!(
            crl.entry("3007").and_then(|e| e.reason),
            Some(RevocationReason::CertificateHold)
        );
        assert!(crl.entry("3001").is_none());
        Ok(())
    }

    #[test]
    fn test_window() -> Result<()> {
        let crl = RevocationList::from_der(CRL)?;
        assert!(crl.is_current_at(Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()));
        assert!(!crl.is_current_at(Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap()));
        assert!(!crl.is_current_at(Utc.with_ymd_and_hms(2045, 1, 1, 0, 0, 0).unwrap()));
        Ok(())
    }

    #[test]
    fn test_signature() -> Result<()> {
        let crl = RevocationList::from_der(CRL)?;
        crl.verify_signature(&Certificate::from_der(CSCA)?)?;
        assert!(crl.verify_signature(&Certificate::from_der(DSC)?).is_err());
        Ok(())
    }

    #[test]
    fn test_decode_reason() -> Result<()> {
        assert_eq!(decode_reason(&hex!("0a0106"))?, RevocationReason::CertificateHold);
        assert!(decode_reason(&hex!("0a0107")).is_err());
        assert!(decode_reason(&hex!("020101")).is_err());
        Ok(())
    }
}
