//! # CertKit Identity - Certificate Identity Lifecycle in Pure Rust
//!
//! CertKit Identity manages a client's cryptographic identity: a private key
//! paired with an X.509 certificate, used to sign messages and to prove trust
//! to a relying party. It is built entirely with rustcrypto libraries.
//!
//! The interesting part is the certificate lifecycle policy:
//!
//! - **Replacement guard**: a stored certificate is only ever replaced by one
//!   carrying the same public key and expiring strictly later, so a
//!   certificate can neither be downgraded nor substituted.
//! - **Refresh**: near expiry, newer certificates already issued for the key
//!   are downloaded from the authority.
//! - **Renewal**: certificates of a renewable issuer class are renewed with a
//!   PKCS#10 signing request for the existing RSA key.
//! - **Trust**: the current certificate is evaluated against caller supplied
//!   anchors.
//!
//! ## Issuer Classes
//!
//! Identity certificates are issued by one of three authorities, recognized
//! by the issuer common name:
//! - **Evaluation**: `com.appliedrec.ver-id.evaluation`, never renewed
//! - **Reporting**: `com.appliedrec.ver-id.reporting`, renewable
//! - **Standalone**: `com.appliedrec.ver-id.standalone`, renewable
//!
//! ## Quick Start
//!
//! ### Installing an Identity
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use certkit_identity::{
//!     cert::Certificate,
//!     identity::{Identity, IdentityOption},
//!     key::KeyPair,
//!     store::MemoryStore,
//! };
//!
//! # fn main() -> Result<(), certkit_identity::error::IdentityError> {
//! let key = KeyPair::from_pkcs8_pem(&std::fs::read_to_string("device.key").unwrap())?;
//! let certificate = Certificate::from_pem(&std::fs::read_to_string("device.pem").unwrap())?;
//!
//! let identity = Identity::builder()
//!     .certificate(certificate)
//!     .private_key(key)
//!     .store(Arc::new(MemoryStore::new()))
//!     .options(IdentityOption::AutoRenew | IdentityOption::DownloadLatest)
//!     .build()?;
//!
//! let signature = identity.sign(b"hello", None)?;
//! println!("{} signed {} bytes", identity.common_name(), signature.len());
//! # Ok(())
//! # }
//! ```
//!
//! ### Renewing Explicitly
//!
//! Renewal started at construction runs in the background and its failures
//! are only logged. Await the flow directly to observe the result:
//!
//! ```rust,no_run
//! use certkit_identity::{identity::Identity, renewal::RenewalOutcome};
//!
//! # async fn renew(identity: &Identity) -> Result<(), certkit_identity::error::IdentityError> {
//! match identity.renew_certificate().await? {
//!     RenewalOutcome::Replaced(certificate) => println!("renewed until {:?}", certificate.expiry()),
//!     RenewalOutcome::NotRenewable => println!("evaluation certificates are not renewed"),
//!     RenewalOutcome::NoNewerCertificate => println!("nothing newer"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### Evaluating Trust
//!
//! ```rust,no_run
//! use certkit_identity::{cert::Certificate, identity::Identity, trust::BasicTrustEngine};
//!
//! # fn check(identity: &Identity, root: Certificate) -> Result<(), certkit_identity::error::IdentityError> {
//! identity.evaluate_trust(&[root], &BasicTrustEngine::new())?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Every fallible operation returns [`error::IdentityError`]:
//!
//! ```rust
//! use certkit_identity::{key::KeyPair, error::IdentityError};
//!
//! match KeyPair::from_pkcs8_pem("invalid pem data") {
//!     Ok(_) => println!("Key imported successfully"),
//!     Err(IdentityError::DecodingError(msg)) => println!("Failed to decode key: {}", msg),
//!     Err(IdentityError::InvalidInput(msg)) => println!("Invalid input: {}", msg),
//!     Err(e) => println!("Other error: {}", e),
//! }
//! ```
//!
//! ## Logging
//!
//! The crate emits [`tracing`] events and never installs a subscriber.
//!
//! ## Module Organization
//!
//! - [`identity`]: The managed identity and its construction options
//! - [`renewal`]: Refresh and renewal flows, candidate selection
//! - [`store`]: Credential storage and the replacement guard
//! - [`authority`]: Client of the certificate authority
//! - [`trust`]: Trust evaluation against anchors
//! - [`csr`]: Renewal signing requests
//! - [`cert`]: Certificate decoding and the facts the policy relies on
//! - [`key`]: Key generation, import and signatures
//! - [`issuer`]: Certificate issuing, for authorities and tests
//! - [`identity_file`]: `.identity` and `.p12` files
//! - [`config`]: Renewal settings
//! - [`error`]: Error types
//! - [`tbs_certificate`]: Low-level certificate structure

pub mod authority;
pub mod cert;
pub mod config;
pub mod csr;
pub mod error;
pub mod identity;
pub mod identity_file;
pub mod issuer;
pub mod key;
pub mod pem_utils;
pub mod renewal;
pub mod store;
pub mod tbs_certificate;
pub mod trust;
