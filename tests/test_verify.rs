
use {
    anyhow::Result,
    chrono::{TimeZone, Utc},
    dataset::{at, Dataset},
    icao_pkd::{
        asn1::emrtd::EfSod,
        pa::{DataGroupNumber, PaState},
        pki::{
            ChainError, CmsError, CmsVerifier, RevocationStatus, SignerSource, TrustChainBuilder,
        },
        ports::{CertificateSink, CrlSink, InMemoryStore},
        Certificate, Config, ErrorCode, Leniency, PaStatus, PassiveAuthenticator, RevocationList,
    },
};

fn trust_store(dataset: &Dataset) -> Result<InMemoryStore> {
    InMemoryStore::with_certificates(dataset.cscas()?)
}

#[test]
fn test_verify_sod_signature() -> Result<()> {
    let dataset = Dataset::load()?;
    for sod in [
        &dataset.sod,
        &dataset.sod_pss,
        &dataset.sod_ec,
        &dataset.sod_bp,
        &dataset.sod_explicit,
    ] {
        let sod = EfSod::from_der(sod)?;
        let verified = CmsVerifier::default().verify(sod.signed_data(), SignerSource::Embedded)?;
        assert_eq!(verified.content, dataset.lds);
    }
    Ok(())
}

#[test]
fn test_tampered_sod_signature() -> Result<()> {
    let dataset = Dataset::load()?;
    let mut tampered = dataset.sod.clone();
    if let Some(last) = tampered.last_mut() {
        *last ^= 0x01;
    }
    let sod = EfSod::from_der(&tampered)?;
    let result = CmsVerifier::default().verify(sod.signed_data(), SignerSource::Embedded);
    assert!(matches!(result, Err(CmsError::Signature(_))));

    let store = trust_store(&dataset)?;
    let result = PassiveAuthenticator::new(Config::default(), &store, &store)
        .verify_at(&dataset.request(&tampered), at());
    assert_eq!(result.status, PaStatus::Invalid);
    assert!(result.certificate_chain_validation.valid);
    assert!(!result.sod_signature_validation.valid);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].code, ErrorCode::SignatureMismatch);
    Ok(())
}

#[test]
fn test_chain() -> Result<()> {
    let dataset = Dataset::load()?;
    let store = trust_store(&dataset)?;
    let builder = TrustChainBuilder::new(&store, TrustChainBuilder::DEFAULT_MAX_DEPTH);

    let chain = builder.build(&Certificate::from_der(&dataset.dsc_link)?, at())?;
    assert_eq!(chain.path.len(), 3);
    assert_eq!(chain.anchor(), Some(&Certificate::from_der(&dataset.csca)?));

    let rogue = builder.build(&Certificate::from_der(&dataset.dsc_rogue)?, at());
    assert_eq!(rogue.map_err(|e| e.code()).err(), Some(ErrorCode::SignatureMismatch));

    let shallow = TrustChainBuilder::new(&store, 1).build(&Certificate::from_der(&dataset.dsc_link)?, at());
    assert_eq!(shallow.err(), Some(ChainError::ChainTooDeep(1)));
    Ok(())
}

#[test]
fn test_passive_authentication() -> Result<()> {
    let dataset = Dataset::load()?;
    let store = trust_store(&dataset)?;
    let pa = PassiveAuthenticator::new(Config::default(), &store, &store);

    for sod in [&dataset.sod, &dataset.sod_pss, &dataset.sod_ec] {
        let result = pa.verify_at(&dataset.request(sod), at());
        assert_eq!(result.status, PaStatus::Valid, "{:?}", result.errors);
        assert!(result.errors.is_empty());
        let groups = &result.data_group_validation;
        assert_eq!((groups.total_groups, groups.valid_groups, groups.invalid_groups), (3, 3, 0));
        assert!(result.certificate_chain_validation.valid);
        assert!(result.sod_signature_validation.valid);
        assert_eq!(result.states.last(), Some(&PaState::Valid));
    }

    let result = pa.verify_at(&dataset.request(&dataset.sod_ec), at());
    let chain = &result.certificate_chain_validation;
    assert_eq!(chain.dsc_serial_number.as_deref(), Some("4001"));
    assert_eq!(
        chain.csca_subject.as_deref(),
        Some(Certificate::from_der(&dataset.csca_ec)?.subject_dn())
    );
    Ok(())
}

#[test]
fn test_chain_constraints() -> Result<()> {
    let dataset = Dataset::load()?;
    let store = trust_store(&dataset)?;
    store.save_all(&[
        Certificate::from_der(&dataset.dsc)?,
        Certificate::from_der(&dataset.csca_pl0)?,
        Certificate::from_der(&dataset.ica_pl0)?,
    ])?;
    let builder = TrustChainBuilder::new(&store, TrustChainBuilder::DEFAULT_MAX_DEPTH);

    let not_ca = builder.build(&Certificate::from_der(&dataset.dsc_by_dsc)?, at());
    assert_eq!(not_ca.map_err(|e| e.code()).err(), Some(ErrorCode::IssuerNotCa));

    let too_long = builder.build(&Certificate::from_der(&dataset.dsc_pl0)?, at());
    assert_eq!(too_long.map_err(|e| e.code()).err(), Some(ErrorCode::PathLengthExceeded));
    Ok(())
}

#[test]
fn test_passive_authentication_brainpool() -> Result<()> {
    let dataset = Dataset::load()?;
    let store = trust_store(&dataset)?;
    store.save_all(&[Certificate::from_der(&dataset.csca_bp)?])?;
    let pa = PassiveAuthenticator::new(Config::default(), &store, &store);

    let named = pa.verify_at(&dataset.request(&dataset.sod_bp), at());
    assert_eq!(named.status, PaStatus::Valid, "{:?}", named.errors);
    let chain = &named.certificate_chain_validation;
    assert_eq!(chain.dsc_serial_number.as_deref(), Some("4002"));
    assert_eq!(
        chain.csca_subject.as_deref(),
        Some(Certificate::from_der(&dataset.csca_bp)?.subject_dn())
    );

    // Explicit domain parameters instead of a curve OID.
    let explicit = pa.verify_at(&dataset.request(&dataset.sod_explicit), at());
    assert_eq!(explicit.status, PaStatus::Valid, "{:?}", explicit.errors);
    let chain = &explicit.certificate_chain_validation;
    assert_eq!(chain.dsc_serial_number.as_deref(), Some("4003"));
    assert_eq!(
        chain.csca_subject.as_deref(),
        Some(Certificate::from_der(&dataset.csca)?.subject_dn())
    );
    Ok(())
}

#[test]
fn test_passive_authentication_tampered_dg1() -> Result<()> {
    let dataset = Dataset::load()?;
    let store = trust_store(&dataset)?;
    let mut request = dataset.request(&dataset.sod);
    if let Some(dg1) = request.data_groups.get_mut(&DataGroupNumber::Dg1) {
        dg1[10] ^= 0x01;
        dg1[20] ^= 0x01;
    }

    let result = PassiveAuthenticator::new(Config::default(), &store, &store).verify_at(&request, at());
    assert_eq!(result.status, PaStatus::Invalid);
    assert!(result.certificate_chain_validation.valid);
    assert!(result.sod_signature_validation.valid);
    let groups = &result.data_group_validation;
    assert_eq!(groups.invalid_groups, 1);
    assert!(!groups.details[&DataGroupNumber::Dg1].valid);
    assert!(groups.details[&DataGroupNumber::Dg2].valid);
    assert!(groups.details[&DataGroupNumber::Dg14].valid);
    assert!(result.errors.iter().any(|e| e.code == ErrorCode::HashMismatch));
    Ok(())
}

#[test]
fn test_passive_authentication_missing_dg1() -> Result<()> {
    let dataset = Dataset::load()?;
    let store = trust_store(&dataset)?;
    let mut request = dataset.request(&dataset.sod);
    request.data_groups.remove(&DataGroupNumber::Dg1);

    let result = PassiveAuthenticator::new(Config::default(), &store, &store).verify_at(&request, at());
    assert_eq!(result.status, PaStatus::Invalid);
    assert_eq!(result.data_group_validation.invalid_groups, 0);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].code, ErrorCode::MissingDataGroup);
    Ok(())
}

#[test]
fn test_passive_authentication_expired_dsc() -> Result<()> {
    let dataset = Dataset::load()?;
    let store = trust_store(&dataset)?;
    let pa = PassiveAuthenticator::new(Config::default(), &store, &store);
    let late = Utc.with_ymd_and_hms(2041, 6, 1, 0, 0, 0).unwrap();

    let result = pa.verify_at(&dataset.request(&dataset.sod), late);
    assert_eq!(result.status, PaStatus::Invalid);
    assert!(!result.certificate_chain_validation.valid);
    assert!(result.sod_signature_validation.valid);
    assert_eq!(result.errors[0].code, ErrorCode::CertificateExpired);
    Ok(())
}

#[test]
fn test_passive_authentication_revocation() -> Result<()> {
    let dataset = Dataset::load()?;
    let store = trust_store(&dataset)?;
    let config = Config {
        check_revocation: true,
        accept_unchecked_revocation: false,
        ..Config::default()
    };

    // No CRL yet.
    let result = PassiveAuthenticator::new(config.clone(), &store, &store)
        .verify_at(&dataset.request(&dataset.sod), at());
    assert_eq!(result.status, PaStatus::Invalid);
    assert_eq!(
        result.certificate_chain_validation.revocation_status,
        Some(RevocationStatus::NotChecked)
    );
    assert_eq!(result.errors[0].code, ErrorCode::RevocationNotChecked);

    store.save_crl(&RevocationList::from_der(&dataset.crl)?)?;
    let result = PassiveAuthenticator::new(config, &store, &store)
        .verify_at(&dataset.request(&dataset.sod), at());
    assert_eq!(result.status, PaStatus::Valid, "{:?}", result.errors);
    assert_eq!(
        result.certificate_chain_validation.revocation_status,
        Some(RevocationStatus::Good)
    );
    Ok(())
}

#[test]
fn test_passive_authentication_strict_structure() -> Result<()> {
    let dataset = Dataset::load()?;
    let store = InMemoryStore::new();
    store.save_all(&dataset.cscas()?)?;
    let config = Config {
        structure: Leniency::Strict,
        ..Config::default()
    };
    let pa = PassiveAuthenticator::new(config, &store, &store);

    // Both SODs are version 3 SignedData without crls.
    for sod in [&dataset.sod, &dataset.sod_ec] {
        let result = pa.verify_at(&dataset.request(sod), at());
        assert_eq!(result.status, PaStatus::Valid, "{:?}", result.errors);
    }
    Ok(())
}

#[test]
fn test_result_json() -> Result<()> {
    let dataset = Dataset::load()?;
    let store = trust_store(&dataset)?;
    let result = PassiveAuthenticator::new(Config::default(), &store, &store)
        .verify_at(&dataset.request(&dataset.sod), at());
    let json = serde_json::to_value(&result)?;
    assert_eq!(json["status"], "VALID");
    assert_eq!(json["certificateChainValidation"]["valid"], true);
    assert_eq!(json["sodSignatureValidation"]["valid"], true);
    assert_eq!(json["dataGroupValidation"]["totalGroups"], 3);
    assert_eq!(json["states"][1], "SOD_PARSED");
    assert!(json["verificationId"].is_string());
    assert!(json["processingDurationMs"].is_u64());
    Ok(())
}
