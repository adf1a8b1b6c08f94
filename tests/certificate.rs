mod util;

use certkit_identity::cert::{Certificate, IssuerClass};
use certkit_identity::error::IdentityError;
use certkit_identity::issuer::{CertificateAuthority, CertificateParams, Issuer};
use certkit_identity::key::KeyPair;
use certkit_identity::pem_utils::certificates_from_pem;
use time::{Duration, OffsetDateTime};

#[test]
fn classifies_issuer_by_common_name() {
    let key = KeyPair::generate_ed25519();
    for class in IssuerClass::ALL {
        let ca = util::authority(class);
        let certificate = util::issue(&ca, util::DEVICE, &key, 30);
        assert_eq!(certificate.issuer(), Ok(class));
        assert_eq!(certificate.issuer_common_name().as_deref(), Some(class.common_name()));
    }
}

#[test]
fn only_reporting_and_standalone_are_renewable() {
    let key = KeyPair::generate_ed25519();
    let renewable = |class| util::issue(&util::authority(class), util::DEVICE, &key, 30).is_renewable();
    assert!(!renewable(IssuerClass::Evaluation));
    assert!(renewable(IssuerClass::Reporting));
    assert!(renewable(IssuerClass::Standalone));
}

#[test]
fn unknown_issuer_is_unrecognized_and_not_renewable() {
    let ca = CertificateAuthority::new("Some Other CA", KeyPair::generate_ecdsa_p256());
    let certificate = util::issue(&ca, util::DEVICE, &KeyPair::generate_ed25519(), 30);
    assert_eq!(certificate.issuer(), Err(IdentityError::IssuerUnrecognized));
    assert!(!certificate.is_renewable());
}

#[test]
fn expiry_comparison() {
    let ca = util::authority(IssuerClass::Standalone);
    let key = KeyPair::generate_ed25519();
    let short = util::issue(&ca, util::DEVICE, &key, 10);
    let long = util::issue(&ca, util::DEVICE, &key, 90);

    assert!(long.expires_after(&short));
    assert!(!short.expires_after(&long));
    assert!(!short.expires_after(&short));
}

#[test]
fn public_key_comparison() {
    let ca = util::authority(IssuerClass::Standalone);
    let key = KeyPair::generate_ed25519();
    let a = util::issue(&ca, util::DEVICE, &key, 10);
    let b = util::issue(&ca, "someone-else", &key, 90);
    let c = util::issue(&ca, util::DEVICE, &KeyPair::generate_ed25519(), 10);

    assert!(a.has_same_public_key(&b));
    assert!(!a.has_same_public_key(&c));
    assert_eq!(
        a.public_key_fingerprint(),
        Some(key.public_key().fingerprint().unwrap())
    );
}

#[test]
fn unreadable_public_key_never_matches() {
    let ca = util::authority(IssuerClass::Standalone);
    let key = KeyPair::generate_ed25519();
    let certificate = util::issue(&ca, util::DEVICE, &key, 10);
    let mut broken = certificate.clone();
    broken.inner.tbs_certificate.subject_public_key_info.algorithm.oid =
        const_oid::db::rfc5912::ID_DSA;

    assert!(matches!(
        broken.public_key(),
        Err(IdentityError::PublicKeyExtractionFailed(_))
    ));
    assert_eq!(broken.public_key_fingerprint(), None);
    assert!(!broken.has_same_public_key(&certificate));
    assert!(!certificate.has_same_public_key(&broken));
}

#[test]
fn subject_and_serial_number() {
    let ca = util::authority(IssuerClass::Reporting);
    let now = OffsetDateTime::now_utc();
    let params = CertificateParams::builder()
        .subject_common_name(util::DEVICE)
        .subject_public_key(KeyPair::generate_ed25519().public_key())
        .not_after(now + Duration::days(1))
        .serial_number(0x0102_0304)
        .build();
    let certificate = ca.issue(&params).unwrap();

    assert_eq!(certificate.common_name().as_deref(), Some(util::DEVICE));
    assert_eq!(certificate.serial_number(), Some(0x0102_0304));
}

#[test]
fn validity_window() {
    let ca = util::authority(IssuerClass::Reporting);
    let key = KeyPair::generate_ed25519();
    let now = OffsetDateTime::now_utc();
    let certificate = util::issue(&ca, util::DEVICE, &key, 10);

    assert!(certificate.is_valid_at(now));
    assert!(!certificate.is_valid_at(now + Duration::days(11)));
    assert!(!certificate.is_valid_at(now - Duration::days(2)));
    assert!(certificate.expires_within(Duration::days(30), now));
    assert!(!certificate.expires_within(Duration::days(5), now));
}

#[test]
fn pem_and_der_encodings_agree() {
    let ca = util::authority(IssuerClass::Standalone);
    let certificate = util::issue(&ca, util::DEVICE, &KeyPair::generate_ed25519(), 10);

    let pem = certificate.to_pem().unwrap();
    assert!(pem.starts_with("-----BEGIN CERTIFICATE-----"));
    assert_eq!(Certificate::from_pem(&pem).unwrap(), certificate);
    assert_eq!(
        Certificate::from_der(&certificate.to_der().unwrap()).unwrap(),
        certificate
    );
}

#[test]
fn pem_extraction_keeps_order_and_ignores_surrounding_text() {
    let ca = util::authority(IssuerClass::Standalone);
    let key = KeyPair::generate_ed25519();
    let first = util::issue(&ca, util::DEVICE, &key, 10);
    let second = util::issue(&ca, util::DEVICE, &key, 20);

    let text = format!(
        "leading text\n{}\nbetween\n  {}  \ntrailing",
        first.to_pem().unwrap(),
        second.to_pem().unwrap()
    );
    assert_eq!(certificates_from_pem(&text).unwrap(), vec![first, second]);
}

#[test]
fn pem_without_certificate_is_an_error() {
    assert!(matches!(
        Certificate::from_pem("nothing to see"),
        Err(IdentityError::DecodingError(_))
    ));
}
