
use {
    anyhow::{anyhow as err, Result},
    cms::content_info::CmsVersion,
    dataset::Dataset,
    der::Decode,
    icao_pkd::{
        asn1::{
            emrtd::{pki::{CscaMasterList, MasterList}, EfSod, LdsSecurityObject},
            DigestAlgorithmIdentifier,
        },
        pki::{sha256_hex, Fingerprint},
        Certificate, CertificateType, RevocationList,
    },
};

#[test]
fn test_decode_sod() -> Result<()> {
    let dataset = Dataset::load()?;
    let sod = EfSod::from_der(&dataset.sod)?;

    let security_object = sod.lds_security_object()?;
    for dg in [1, 2, 14] {
        security_object
            .hash_for(dg)
            .ok_or_else(|| err!("DataGroup hash {dg} not found"))?;
    }
    assert!(security_object.hash_for(15).is_none());
    assert_eq!(security_object.digest_algorithm()?, DigestAlgorithmIdentifier::Sha256);
    assert_eq!(security_object, LdsSecurityObject::from_der(&dataset.lds)?);

    // Signer by issuer and serial number.
    assert_eq!(sod.signer_info()?.version, CmsVersion::V1);
    Ok(())
}

#[test]
fn test_decode_sod_without_wrapper() -> Result<()> {
    let dataset = Dataset::load()?;
    // Bare ContentInfo: skip the two-byte tag and the length bytes.
    let wrapped = EfSod::from_der(&dataset.sod)?;
    let header = match dataset.sod[1] {
        len if len < 0x80 => 2,
        len => 2 + usize::from(len & 0x7f),
    };
    let bare = EfSod::from_der(&dataset.sod[header..])?;
    assert_eq!(wrapped, bare);

    // Signer by subject key identifier.
    let ec = EfSod::from_der(&dataset.sod_ec)?;
    assert_eq!(ec.signer_info()?.version, CmsVersion::V3);
    Ok(())
}

#[test]
fn test_decode_rejects_garbage() {
    assert!(EfSod::from_der(&[0x77, 0x02, 0x30, 0x00]).is_err());
    assert!(EfSod::from_der(&[]).is_err());
}

#[test]
fn test_decode_master_list() -> Result<()> {
    let dataset = Dataset::load()?;
    let master_list = MasterList::from_der(&dataset.master_list)?;
    let content = master_list.csca_ml()?;
    assert_eq!(content, CscaMasterList::from_der(&dataset.csca_ml)?);
    assert_eq!(content.version, 0);
    assert_eq!(content.cert_list.len(), 4);
    for der in &content.cert_list {
        Certificate::from_der(der)?;
    }
    Ok(())
}

#[test]
fn test_decode_certificates() -> Result<()> {
    let dataset = Dataset::load()?;

    let csca = Certificate::from_der(&dataset.csca)?;
    assert_eq!(csca.certificate_type(), CertificateType::Csca);
    assert!(csca.is_ca() && csca.is_self_issued());
    assert_eq!(csca.country(), Some("UT"));
    assert_eq!(csca.serial_number(), "1001");

    let dsc = Certificate::from_der(&dataset.dsc)?;
    assert_eq!(dsc.certificate_type(), CertificateType::Dsc);
    assert!(!dsc.is_ca());
    assert_eq!(dsc.issuer_dn(), csca.subject_dn());
    assert_eq!(dsc.serial_number(), "3001");

    let csca_ec = Certificate::from_der(&dataset.csca_ec)?;
    assert_eq!(csca_ec.path_len(), Some(0));
    Ok(())
}

#[test]
fn test_fingerprints_are_stable() -> Result<()> {
    let dataset = Dataset::load()?;
    let fingerprint = Fingerprint::of(&dataset.dsc);
    assert_eq!(fingerprint, Fingerprint::of(&dataset.dsc));
    assert_eq!(fingerprint.sha256, sha256_hex(&dataset.dsc));
    assert_eq!(fingerprint.sha1.len(), 40);
    assert_eq!(fingerprint.sha256.len(), 64);
    assert!(fingerprint
        .sha256
        .chars()
        .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));
    assert_eq!(Certificate::from_der(&dataset.dsc)?.fingerprint(), &fingerprint);
    assert_ne!(fingerprint, Fingerprint::of(&dataset.dsc_ec));
    Ok(())
}

#[test]
fn test_decode_crl() -> Result<()> {
    let dataset = Dataset::load()?;
    let crl = RevocationList::from_der(&dataset.crl)?;
    let csca = Certificate::from_der(&dataset.csca)?;
    assert_eq!(crl.issuer_dn(), csca.subject_dn());
    assert_eq!(crl.country(), Some("UT"));
    assert_eq!(crl.revoked_count(), 2);
    assert!(crl.entry("3006").is_some());
    assert!(crl.entry("3001").is_none());
    crl.verify_signature(&csca)?;
    assert!(crl
        .verify_signature(&Certificate::from_der(&dataset.csca_ec)?)
        .is_err());
    Ok(())
}
