mod util;

use std::sync::Arc;

use certkit_identity::cert::{Certificate, IssuerClass};
use certkit_identity::error::{IdentityError, Result};
use certkit_identity::identity::{Identity, Options};
use certkit_identity::issuer::CertificateAuthority;
use certkit_identity::key::KeyPair;
use certkit_identity::store::MemoryStore;
use certkit_identity::trust::{BasicTrustEngine, TrustEngine, evaluate_trust};
use time::{Duration, OffsetDateTime};
use util::StaticAuthority;

struct FailingEngine;

impl TrustEngine for FailingEngine {
    fn evaluate(&self, _leaf: &Certificate, _anchors: &[Certificate]) -> Result<bool> {
        Err(IdentityError::TrustEngineFailure("keychain locked".to_string()))
    }
}

fn root(ca: &CertificateAuthority) -> Certificate {
    ca.self_signed_certificate(3650).unwrap()
}

#[test]
fn trusted_when_issuing_root_is_an_anchor() {
    let ca = util::authority(IssuerClass::Standalone);
    let leaf = util::issue(&ca, util::DEVICE, &KeyPair::generate_ed25519(), 30);
    let other = util::authority(IssuerClass::Reporting);

    assert_eq!(
        evaluate_trust(&leaf, &[root(&other), root(&ca)], &BasicTrustEngine::new()),
        Ok(())
    );
}

#[test]
fn not_trusted_without_issuing_root() {
    let ca = util::authority(IssuerClass::Standalone);
    let leaf = util::issue(&ca, util::DEVICE, &KeyPair::generate_ed25519(), 30);
    let other = util::authority(IssuerClass::Reporting);

    assert_eq!(
        evaluate_trust(&leaf, &[root(&other)], &BasicTrustEngine::new()),
        Err(IdentityError::NotTrusted)
    );
    assert_eq!(
        evaluate_trust(&leaf, &[], &BasicTrustEngine::new()),
        Err(IdentityError::NotTrusted)
    );
}

#[test]
fn not_trusted_when_anchor_name_matches_but_key_differs() {
    let ca = util::authority(IssuerClass::Standalone);
    let impostor = util::authority(IssuerClass::Standalone);
    let leaf = util::issue(&ca, util::DEVICE, &KeyPair::generate_ed25519(), 30);

    assert_eq!(
        evaluate_trust(&leaf, &[root(&impostor)], &BasicTrustEngine::new()),
        Err(IdentityError::NotTrusted)
    );
}

#[test]
fn expired_leaf_is_not_trusted() {
    let ca = util::authority(IssuerClass::Reporting);
    let now = OffsetDateTime::now_utc();
    let leaf = util::issue_between(
        &ca,
        util::DEVICE,
        &KeyPair::generate_ed25519(),
        now - Duration::days(30),
        now - Duration::days(1),
    );

    assert_eq!(
        evaluate_trust(&leaf, &[root(&ca)], &BasicTrustEngine::new()),
        Err(IdentityError::NotTrusted)
    );
    let long_standing_root = util::issue_between(
        &ca,
        &ca.common_name,
        &ca.key,
        now - Duration::days(365),
        now + Duration::days(3650),
    );
    assert_eq!(
        evaluate_trust(
            &leaf,
            &[long_standing_root],
            &BasicTrustEngine::at(now - Duration::days(2))
        ),
        Ok(())
    );
}

#[test]
fn leaf_listed_as_anchor_is_trusted() {
    let ca = util::authority(IssuerClass::Reporting);
    let leaf = util::issue(&ca, util::DEVICE, &KeyPair::generate_ed25519(), 30);
    assert_eq!(
        evaluate_trust(&leaf, &[leaf.clone()], &BasicTrustEngine::new()),
        Ok(())
    );
}

#[test]
fn engine_errors_become_trust_engine_failure() {
    let ca = util::authority(IssuerClass::Reporting);
    let leaf = util::issue(&ca, util::DEVICE, &KeyPair::generate_ed25519(), 30);
    assert_eq!(
        evaluate_trust(&leaf, &[root(&ca)], &FailingEngine),
        Err(IdentityError::TrustEngineFailure("keychain locked".to_string()))
    );
}

#[test]
fn rsa_signed_leaf_verifies() {
    let ca = CertificateAuthority::for_class(IssuerClass::Standalone, util::other_device_key());
    let leaf = util::issue(&ca, util::DEVICE, &util::device_key(), 30);
    assert_eq!(
        evaluate_trust(&leaf, &[root(&ca)], &BasicTrustEngine::new()),
        Ok(())
    );
}

#[test]
fn identity_evaluates_its_current_certificate() {
    let ca = util::authority(IssuerClass::Standalone);
    let key = KeyPair::generate_ed25519();
    let identity = Identity::builder()
        .certificate(util::issue(&ca, util::DEVICE, &key, 90))
        .private_key(key)
        .store(Arc::new(MemoryStore::new()))
        .authority(Arc::new(StaticAuthority::unreachable()))
        .options(Options::empty())
        .build()
        .unwrap();

    let engine = BasicTrustEngine::new();
    assert_eq!(identity.evaluate_trust(&[root(&ca)], &engine), Ok(()));
    assert_eq!(
        identity.evaluate_trust(&[root(&util::authority(IssuerClass::Standalone))], &engine),
        Err(IdentityError::NotTrusted)
    );
}
