use {
    super::{crl::RevocationReason, Certificate},
    crate::{error::ErrorCode, ports::CrlRepository},
    chrono::{DateTime, Utc},
    serde::Serialize,
    tracing::warn,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RevocationStatus {
    /// Covered by a current CRL and not listed.
    Good,
    Revoked,
    /// Listed with reason `certificateHold`.
    Suspended,
    /// No CRL for the issuer.
    NotChecked,
    /// The only CRL is outside its validity window, strict mode.
    CrlExpired,
}

impl RevocationStatus {
    pub const fn code(self) -> Option<ErrorCode> {
        match self {
            Self::Good => None,
            Self::Revoked => Some(ErrorCode::CertificateRevoked),
            Self::Suspended => Some(ErrorCode::CertificateSuspended),
            Self::NotChecked => Some(ErrorCode::RevocationNotChecked),
            Self::CrlExpired => Some(ErrorCode::CrlExpired),
        }
    }

    pub const fn is_revoked(self) -> bool {
        matches!(self, Self::Revoked | Self::Suspended)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevocationCheck {
    pub status:          RevocationStatus,
    pub crl_this_update: Option<DateTime<Utc>>,
    pub crl_next_update: Option<DateTime<Utc>>,
    pub revocation_date: Option<DateTime<Utc>>,
    pub reason:          Option<RevocationReason>,
}

impl RevocationCheck {
    const fn not_checked() -> Self {
        Self {
            status:          RevocationStatus::NotChecked,
            crl_this_update: None,
            crl_next_update: None,
            revocation_date: None,
            reason:          None,
        }
    }
}

pub struct RevocationChecker<'a> {
    crls:   &'a dyn CrlRepository,
    strict: bool,
}

impl<'a> RevocationChecker<'a> {
    /// With `strict` a CRL outside `thisUpdate..=nextUpdate` is not applied.
    pub fn new(crls: &'a dyn CrlRepository, strict: bool) -> Self {
        Self { crls, strict }
    }

    pub fn check_certificate(&self, cert: &Certificate, at: DateTime<Utc>) -> RevocationCheck {
        self.check(cert.issuer_dn(), cert.serial_number(), at)
    }

    /// `serial_number` in the uppercase hex form of
    /// [`Certificate::serial_number`].
    pub fn check(&self, issuer_dn: &str, serial_number: &str, at: DateTime<Utc>) -> RevocationCheck {
        let crl = match self.crls.find_latest_by_issuer_dn(issuer_dn) {
            Ok(Some(crl)) => crl,
            Ok(None) => return RevocationCheck::not_checked(),
            Err(e) => {
                warn!(issuer = issuer_dn, error = %e, "CRL lookup failed");
                return RevocationCheck::not_checked();
            }
        };

        let mut check = RevocationCheck {
            crl_this_update: Some(crl.this_update()),
            crl_next_update: crl.next_update(),
            ..RevocationCheck::not_checked()
        };
        if self.strict && !crl.is_current_at(at) {
            check.status = RevocationStatus::CrlExpired;
            return check;
        }

        check.status = match crl.entry(serial_number) {
            Some(entry) => {
                check.revocation_date = entry.revocation_date;
                check.reason = entry.reason;
                if entry.reason == Some(RevocationReason::CertificateHold) {
                    RevocationStatus::Suspended
                } else {
                    RevocationStatus::Revoked
                }
            }
            None => RevocationStatus::Good,
        };
        check
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            pki::RevocationList,
            ports::{CrlSink, InMemoryStore},
        },
        anyhow::Result,
        chrono::TimeZone,
    };

    const CRL: &[u8] = include_bytes!("../../tests/dataset/crl.der");
    const CRL_EXPIRED: &[u8] = include_bytes!("../../tests/dataset/crl_expired.der");
    const DSC: &[u8] = include_bytes!("../../tests/dataset/dsc.der");
    const DSC_REVOKED: &[u8] = include_bytes!("../../tests/dataset/dsc_revoked.der");
    const DSC_HELD: &[u8] = include_bytes!("../../tests/dataset/dsc_held.der");

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_statuses() -> Result<()> {
        let store = InMemoryStore::new();
        store.save_crl(&RevocationList::from_der(CRL)?)?;
        let checker = RevocationChecker::new(&store, true);

        let good = checker.check_certificate(&Certificate::from_der(DSC)?, at());
        assert_eq!(good.status, RevocationStatus::Good);

        let revoked = checker.check_certificate(&Certificate::from_der(DSC_REVOKED)?, at());
        assert_eq!(revoked.status, RevocationStatus::Revoked);
        assert_eq!(revoked.reason, Some(RevocationReason::KeyCompromise));

        let held = checker.check_certificate(&Certificate::from_der(DSC_HELD)?, at());
        assert_eq!(held.status, RevocationStatus::Suspended);
        Ok(())
    }

    #[test]
    fn test_no_crl() -> Result<()> {
        let store = InMemoryStore::new();
        let check = RevocationChecker::new(&store, true)
            .check_certificate(&Certificate::from_der(DSC_REVOKED)?, at());
        assert_eq!(check.status, RevocationStatus::NotChecked);
        Ok(())
    }

    #[test]
    fn test_expired_crl() -> Result<()> {
        let store = InMemoryStore::new();
        store.save_crl(&RevocationList::from_der(CRL_EXPIRED)?)?;
        let dsc = Certificate::from_der(DSC_REVOKED)?;

        let strict = RevocationChecker::new(&store, true).check_certificate(&dsc, at());
        assert_eq!(strict.status, RevocationStatus::CrlExpired);

        let lenient = RevocationChecker::new(&store, false).check_certificate(&dsc, at());
        assert_eq!(lenient.status, RevocationStatus::Revoked);
        assert_eq!(lenient.reason, None);
        Ok(())
    }
}
