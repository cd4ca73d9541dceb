use erynoa_credentials::{
    CoseAlgorithm, CoseKey, DidMethod, Namespace, create_identity,
    extract_public_key_from_authenticator_data, generate_key_did, generate_namespaced_did,
    is_valid_did, parse_did,
};
use testresult::TestResult;

fn registration_auth_data(credential_id: &[u8], cose_key: &[u8]) -> Vec<u8> {
    let mut bytes = vec![0u8; 32];
    bytes.push(0x45);
    bytes.extend_from_slice(&0u32.to_be_bytes());
    bytes.extend_from_slice(&[0u8; 16]);
    bytes.extend_from_slice(&(credential_id.len() as u16).to_be_bytes());
    bytes.extend_from_slice(credential_id);
    bytes.extend_from_slice(cose_key);
    bytes
}

#[test]
fn it_round_trips_a_namespaced_did_through_parse_and_validate() -> TestResult {
    let did = generate_namespaced_did(&[0xaa; 32], Namespace::Guild);
    assert_eq!(did, "did:erynoa:guild:aaaaaaaaaaaaaaaa");

    let parsed = parse_did(&did).ok_or("did did not parse")?;
    assert_eq!(parsed.method, DidMethod::Erynoa);
    assert_eq!(parsed.namespace.as_deref(), Some("guild"));
    assert_eq!(parsed.identifier, "aaaaaaaaaaaaaaaa");
    assert!(is_valid_did(&did));
    Ok(())
}

#[test]
fn it_derives_identical_dids_for_identical_inputs() {
    for namespace in Namespace::ALL {
        let a = create_identity(&[7; 32], namespace, CoseAlgorithm::EDDSA);
        let b = create_identity(&[7; 32], namespace, CoseAlgorithm::EDDSA);
        assert_eq!(a.did, b.did);
        assert!(is_valid_did(&a.did));
        assert_eq!(parse_did(&a.did).and_then(|p| p.namespace), Some(namespace.to_string()));
    }
}

#[test]
fn it_derives_a_did_from_registration_authenticator_data() -> TestResult {
    let public_key = [0x5c; 32];
    let cose_key = CoseKey::ed25519(public_key).to_cbor()?;
    let auth_data = registration_auth_data(b"credential-0001", &cose_key);

    let extracted = extract_public_key_from_authenticator_data(&auth_data)?;
    assert_eq!(extracted, public_key);

    let identity = create_identity(&extracted, Namespace::Personal, CoseAlgorithm::EDDSA);
    assert_eq!(identity.did, "did:erynoa:self:5c5c5c5c5c5c5c5c");

    let key_did = identity.key_did()?;
    assert!(is_valid_did(&key_did));
    assert_eq!(key_did, generate_key_did(&public_key)?);
    Ok(())
}
