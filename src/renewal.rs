//! Renewal policy: when to refresh a certificate, how to pick a replacement
//! from an authority response and how to install it.
//!
//! Two flows end in the same selection step:
//!
//! * [`refresh`] downloads the certificates the authority already issued.
//!   Finding nothing newer is the expected steady state, not an error.
//! * [`renew`] submits a signing request for the current key. Only
//!   certificates of a renewable issuer class are renewed; any failure after
//!   that point is surfaced.
//!
//! Every install goes through [`CredentialStore::set_certificate`], so a late
//! write from a slower flow is rejected by the replacement guard.

use time::{Duration, OffsetDateTime};
use tracing::{debug, info};

use crate::authority::AuthorityClient;
use crate::cert::Certificate;
use crate::csr::create_renewal_csr;
use crate::error::{IdentityError, Result};
use crate::pem_utils::certificates_from_pem;
use crate::store::CredentialStore;

/// Result of a renewal flow that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenewalOutcome {
    /// The stored certificate was replaced.
    Replaced(Certificate),
    /// The authority had nothing newer for the current key.
    NoNewerCertificate,
    /// The certificate's issuer class is not renewed; nothing was sent.
    NotRenewable,
}

impl RenewalOutcome {
    pub fn is_replaced(&self) -> bool {
        matches!(self, RenewalOutcome::Replaced(_))
    }
}

/// Whether `certificate` is close enough to expiry to look for a replacement.
pub fn needs_refresh(certificate: &Certificate, interval: Duration, now: OffsetDateTime) -> bool {
    certificate.expires_within(interval, now)
}

/// Picks the replacement for `current` out of an authority response.
///
/// Only certificates carrying the current public key qualify; among those the
/// one expiring last wins. Ties keep the order of appearance.
///
/// # Errors
///
/// * [`IdentityError::DownloadFailed`] if the response holds an undecodable certificate.
/// * [`IdentityError::NoMatchingCandidate`] if no certificate carries the current key.
pub fn select_candidate(current: &Certificate, response: &str) -> Result<Certificate> {
    let mut candidates: Vec<Certificate> = certificates_from_pem(response)
        .map_err(|e| IdentityError::DownloadFailed(format!("undecodable response: {e}")))?
        .into_iter()
        .filter(|candidate| candidate.has_same_public_key(current))
        .collect();
    candidates.sort_by(|a, b| b.expiry().cmp(&a.expiry()));
    candidates
        .into_iter()
        .next()
        .ok_or(IdentityError::NoMatchingCandidate)
}

/// Downloads the latest certificate for `common_name` and installs it if it
/// expires after the stored one.
pub async fn refresh(
    common_name: &str,
    store: &dyn CredentialStore,
    authority: &dyn AuthorityClient,
) -> Result<RenewalOutcome> {
    let current = store
        .certificate(common_name)
        .ok_or(IdentityError::CertificateUnavailable)?;
    debug!(common_name, "downloading latest certificate");
    let response = authority.fetch_certificates(common_name).await?;

    let candidate = match select_candidate(&current, &response) {
        Ok(candidate) => candidate,
        Err(IdentityError::NoMatchingCandidate) => {
            debug!(common_name, "no certificate for the current key");
            return Ok(RenewalOutcome::NoNewerCertificate);
        }
        Err(err) => return Err(err),
    };
    if !candidate.expires_after(&current) {
        debug!(common_name, "downloaded certificate is not newer");
        return Ok(RenewalOutcome::NoNewerCertificate);
    }

    match store.set_certificate(common_name, Some(candidate.clone())) {
        Ok(()) => {
            info!(common_name, expiry = ?candidate.expiry(), "installed downloaded certificate");
            Ok(RenewalOutcome::Replaced(candidate))
        }
        // Another flow installed a newer certificate in the meantime.
        Err(IdentityError::ExpiresBeforeCurrent) => Ok(RenewalOutcome::NoNewerCertificate),
        Err(err) => Err(err),
    }
}

/// Renews the certificate for `common_name` with a signing request for the
/// stored key and installs the authority's answer.
pub async fn renew(
    common_name: &str,
    store: &dyn CredentialStore,
    authority: &dyn AuthorityClient,
) -> Result<RenewalOutcome> {
    let current = store
        .certificate(common_name)
        .ok_or(IdentityError::CertificateUnavailable)?;
    if !current.is_renewable() {
        debug!(common_name, "certificate issuer is not renewable");
        return Ok(RenewalOutcome::NotRenewable);
    }

    let csr = create_renewal_csr(
        common_name,
        &current,
        store.private_key(common_name).as_ref(),
    )?;
    debug!(common_name, "submitting renewal request");
    let response = authority.submit_renewal(common_name, &csr).await?;

    let candidate = select_candidate(&current, &response)?;
    store.set_certificate(common_name, Some(candidate.clone()))?;
    info!(common_name, expiry = ?candidate.expiry(), "installed renewed certificate");
    Ok(RenewalOutcome::Replaced(candidate))
}
