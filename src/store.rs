//! Secure credential storage.
//!
//! A store keeps at most one private key and one certificate per identity,
//! keyed by the identity's common name. Every write that would replace an
//! existing certificate goes through [`check_replacement`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::cert::Certificate;
use crate::error::{IdentityError, Result};
use crate::key::KeyPair;

/// The replacement guard.
///
/// `candidate` may replace `current` only if it carries the same public key
/// and expires strictly later. The key clause is checked first.
pub fn check_replacement(current: &Certificate, candidate: &Certificate) -> Result<()> {
    if !candidate.has_same_public_key(current) {
        return Err(IdentityError::PublicKeyMismatch);
    }
    if !candidate.expires_after(current) {
        return Err(IdentityError::ExpiresBeforeCurrent);
    }
    Ok(())
}

/// Storage for the key material of identities.
///
/// Implementations must serialize access per identity so that a certificate
/// replacement is atomic with respect to readers.
pub trait CredentialStore: Send + Sync {
    fn private_key(&self, id: &str) -> Option<KeyPair>;

    /// Sets or, with `None`, removes the private key.
    fn set_private_key(&self, id: &str, key: Option<KeyPair>);

    fn certificate(&self, id: &str) -> Option<Certificate>;

    /// Sets or, with `None`, removes the certificate.
    ///
    /// When a certificate is already present the new one must pass
    /// [`check_replacement`]; on failure the store is left unchanged.
    fn set_certificate(&self, id: &str, certificate: Option<Certificate>) -> Result<()>;

    /// Installs a key and its certificate in one step.
    ///
    /// If `key` does not belong to `certificate`, or the identity already holds
    /// a certificate for a different public key, this fails with
    /// [`IdentityError::PublicKeyMismatch`] and changes nothing.
    /// If it holds a certificate for the same key that expires no earlier than
    /// `certificate`, the stored certificate is kept.
    fn install(&self, id: &str, key: KeyPair, certificate: Certificate) -> Result<()>;

    /// Removes both the key and the certificate.
    fn clear(&self, id: &str);
}

#[derive(Default)]
struct StoredCredential {
    private_key: Option<KeyPair>,
    certificate: Option<Certificate>,
}

/// An in-process credential store.
///
/// Clones share the same entries, so several identities created for the same
/// common name see the same credential.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, StoredCredential>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, StoredCredential>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CredentialStore for MemoryStore {
    fn private_key(&self, id: &str) -> Option<KeyPair> {
        self.lock().get(id)?.private_key.clone()
    }

    fn set_private_key(&self, id: &str, key: Option<KeyPair>) {
        let mut entries = self.lock();
        entries.entry(id.to_string()).or_default().private_key = key;
    }

    fn certificate(&self, id: &str) -> Option<Certificate> {
        self.lock().get(id)?.certificate.clone()
    }

    fn set_certificate(&self, id: &str, certificate: Option<Certificate>) -> Result<()> {
        let mut entries = self.lock();
        let entry = entries.entry(id.to_string()).or_default();
        if let (Some(current), Some(candidate)) = (&entry.certificate, &certificate) {
            if let Err(err) = check_replacement(current, candidate) {
                debug!(id, %err, "certificate replacement rejected");
                return Err(err);
            }
        }
        entry.certificate = certificate;
        Ok(())
    }

    fn install(&self, id: &str, key: KeyPair, certificate: Certificate) -> Result<()> {
        if !certificate.matches_private_key(&key) {
            debug!(id, "private key does not belong to the certificate");
            return Err(IdentityError::PublicKeyMismatch);
        }
        let mut entries = self.lock();
        let entry = entries.entry(id.to_string()).or_default();
        match &entry.certificate {
            Some(current) if !current.has_same_public_key(&certificate) => {
                return Err(IdentityError::PublicKeyMismatch);
            }
            Some(current) if !certificate.expires_after(current) => {
                debug!(id, "keeping stored certificate, it does not expire before the new one");
            }
            _ => entry.certificate = Some(certificate),
        }
        entry.private_key = Some(key);
        Ok(())
    }

    fn clear(&self, id: &str) {
        self.lock().remove(id);
    }
}
