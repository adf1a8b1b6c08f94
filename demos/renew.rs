use std::sync::Arc;

use async_trait::async_trait;
use certkit_identity::authority::AuthorityClient;
use certkit_identity::cert::IssuerClass;
use certkit_identity::error::{IdentityError, Result};
use certkit_identity::identity::{Identity, IdentityOption};
use certkit_identity::issuer::{CertificateAuthority, CertificateParams, Issuer};
use certkit_identity::key::{KeyPair, PublicKey};
use certkit_identity::pem_utils::pem_to_der;
use certkit_identity::store::MemoryStore;
use certkit_identity::trust::BasicTrustEngine;
use der::Decode;
use time::{Duration, OffsetDateTime};
use x509_cert::request::CertReq;

/// Authority answering renewal requests in-process with a local CA.
struct LocalAuthority {
    ca: CertificateAuthority,
}

#[async_trait]
impl AuthorityClient for LocalAuthority {
    async fn fetch_certificates(&self, _common_name: &str) -> Result<String> {
        Ok(String::new())
    }

    async fn submit_renewal(&self, common_name: &str, csr_pem: &str) -> Result<String> {
        let der = pem_to_der(csr_pem).map_err(|e| IdentityError::DownloadFailed(e.to_string()))?;
        let request = CertReq::from_der(&der)?;
        let now = OffsetDateTime::now_utc();
        let params = CertificateParams::builder()
            .subject_common_name(common_name)
            .subject_public_key(PublicKey::from_x509spki(&request.info.public_key)?)
            .not_after(now + Duration::days(365))
            .build();
        self.ca.issue(&params)?.to_pem()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let ca = CertificateAuthority::for_class(IssuerClass::Standalone, KeyPair::generate_ecdsa_p256());
    let root = ca.self_signed_certificate(3650)?;

    // A device certificate that expires in a week.
    let device_key = KeyPair::generate_rsa(2048)?;
    let now = OffsetDateTime::now_utc();
    let certificate = ca.issue(
        &CertificateParams::builder()
            .subject_common_name("demo-device")
            .subject_public_key(device_key.public_key())
            .not_after(now + Duration::days(7))
            .build(),
    )?;

    let mut identity = Identity::builder()
        .certificate(certificate)
        .private_key(device_key)
        .store(Arc::new(MemoryStore::new()))
        .authority(Arc::new(LocalAuthority { ca }))
        .options(IdentityOption::AutoRenew.into())
        .build()?;
    println!(
        "{} expires {:?}",
        identity.common_name(),
        identity.certificate()?.expiry()
    );

    if let Some(task) = identity.take_background_task() {
        task.await?;
    }
    println!("after renewal it expires {:?}", identity.certificate()?.expiry());

    identity.evaluate_trust(&[root], &BasicTrustEngine::new())?;
    println!("trusted by the local root");

    let signature = identity.sign(b"hello", None)?;
    println!("signature: {} bytes", signature.len());
    Ok(())
}
