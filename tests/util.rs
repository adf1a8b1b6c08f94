#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, OnceLock};

use async_trait::async_trait;
use certkit_identity::authority::AuthorityClient;
use certkit_identity::cert::{Certificate, IssuerClass};
use certkit_identity::error::{IdentityError, Result};
use certkit_identity::issuer::{CertificateAuthority, CertificateParams, Issuer};
use certkit_identity::key::KeyPair;
use time::{Duration, OffsetDateTime};
use tracing_subscriber::EnvFilter;

pub const DEVICE: &str = "device-1";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// RSA-2048 key shared by the tests of one binary; generation is slow.
pub fn device_key() -> KeyPair {
    static KEY: OnceLock<KeyPair> = OnceLock::new();
    KEY.get_or_init(|| KeyPair::generate_rsa(2048).unwrap()).clone()
}

/// A second RSA-2048 key, distinct from [`device_key`].
pub fn other_device_key() -> KeyPair {
    static KEY: OnceLock<KeyPair> = OnceLock::new();
    KEY.get_or_init(|| KeyPair::generate_rsa(2048).unwrap()).clone()
}

pub fn authority(class: IssuerClass) -> CertificateAuthority {
    CertificateAuthority::for_class(class, KeyPair::generate_ecdsa_p256())
}

/// Issues a certificate valid from yesterday until `days` from now.
pub fn issue(ca: &CertificateAuthority, common_name: &str, key: &KeyPair, days: i64) -> Certificate {
    let now = OffsetDateTime::now_utc();
    issue_between(
        ca,
        common_name,
        key,
        now - Duration::days(1),
        now + Duration::days(days),
    )
}

pub fn issue_between(
    ca: &CertificateAuthority,
    common_name: &str,
    key: &KeyPair,
    not_before: OffsetDateTime,
    not_after: OffsetDateTime,
) -> Certificate {
    let params = CertificateParams::builder()
        .subject_common_name(common_name)
        .subject_public_key(key.public_key())
        .not_before(not_before)
        .not_after(not_after)
        .build();
    ca.issue(&params).unwrap()
}

pub fn pem_bundle(certificates: &[&Certificate]) -> String {
    certificates
        .iter()
        .map(|c| c.to_pem().unwrap())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Authority returning canned responses and counting requests.
pub struct StaticAuthority {
    fetch_response: Result<String>,
    renew_response: Result<String>,
    pub fetches: AtomicUsize,
    pub renewals: AtomicUsize,
    pub last_csr: Mutex<Option<String>>,
}

impl StaticAuthority {
    pub fn new(fetch_response: Result<String>, renew_response: Result<String>) -> Self {
        Self {
            fetch_response,
            renew_response,
            fetches: AtomicUsize::new(0),
            renewals: AtomicUsize::new(0),
            last_csr: Mutex::new(None),
        }
    }

    pub fn unreachable() -> Self {
        let down = || Err(IdentityError::DownloadFailed("connection refused".to_string()));
        Self::new(down(), down())
    }

    pub fn requests(&self) -> usize {
        self.fetches.load(Ordering::SeqCst) + self.renewals.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthorityClient for StaticAuthority {
    async fn fetch_certificates(&self, _common_name: &str) -> Result<String> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.fetch_response.clone()
    }

    async fn submit_renewal(&self, _common_name: &str, csr_pem: &str) -> Result<String> {
        self.renewals.fetch_add(1, Ordering::SeqCst);
        *self.last_csr.lock().unwrap() = Some(csr_pem.to_string());
        self.renew_response.clone()
    }
}
