//! Trust evaluation of an identity certificate against caller supplied anchors.

use der::Encode;
use time::OffsetDateTime;
use tracing::debug;

use crate::cert::Certificate;
use crate::error::{IdentityError, Result};
use crate::key::SignatureAlgorithm;

/// Decides whether a leaf certificate chains to one of a set of anchors.
///
/// `Ok(false)` means the leaf is not trusted. `Err` means no decision could
/// be made.
pub trait TrustEngine: Send + Sync {
    fn evaluate(&self, leaf: &Certificate, anchors: &[Certificate]) -> Result<bool>;
}

/// Single-hop X.509 evaluation.
///
/// The leaf is trusted if it is valid at the evaluation time and either is one
/// of the anchors, or names an anchor as its issuer and carries a signature
/// that the anchor's key verifies. The anchor must be valid at that time too.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicTrustEngine {
    at: Option<OffsetDateTime>,
}

impl BasicTrustEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluates at a fixed time instead of the current time.
    pub fn at(time: OffsetDateTime) -> Self {
        Self { at: Some(time) }
    }

    fn signed_by(leaf: &Certificate, anchor: &Certificate) -> Result<bool> {
        let algorithm_oid = leaf.inner.signature_algorithm.oid;
        let algorithm = SignatureAlgorithm::from_oid(algorithm_oid).ok_or_else(|| {
            IdentityError::TrustEngineFailure(format!(
                "unsupported signature algorithm {algorithm_oid}"
            ))
        })?;
        let anchor_key = anchor
            .public_key()
            .map_err(|e| IdentityError::TrustEngineFailure(e.to_string()))?;
        let tbs = leaf
            .inner
            .tbs_certificate
            .to_der()
            .map_err(|e| IdentityError::TrustEngineFailure(e.to_string()))?;
        Ok(anchor_key.verify(&tbs, leaf.inner.signature.raw_bytes(), algorithm))
    }
}

impl TrustEngine for BasicTrustEngine {
    fn evaluate(&self, leaf: &Certificate, anchors: &[Certificate]) -> Result<bool> {
        let at = self.at.unwrap_or_else(OffsetDateTime::now_utc);
        if !leaf.is_valid_at(at) {
            debug!("leaf certificate is outside its validity period");
            return Ok(false);
        }
        for anchor in anchors {
            if anchor == leaf {
                return Ok(true);
            }
            if anchor.inner.tbs_certificate.subject != leaf.inner.tbs_certificate.issuer {
                continue;
            }
            if !anchor.is_valid_at(at) {
                debug!("issuing anchor is outside its validity period");
                continue;
            }
            if Self::signed_by(leaf, anchor)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// Evaluates `certificate` against `anchors` with `engine`.
///
/// Fails with [`IdentityError::NotTrusted`] if the engine rejects the
/// certificate and with [`IdentityError::TrustEngineFailure`] if it errors.
pub fn evaluate_trust(
    certificate: &Certificate,
    anchors: &[Certificate],
    engine: &dyn TrustEngine,
) -> Result<()> {
    match engine.evaluate(certificate, anchors) {
        Ok(true) => Ok(()),
        Ok(false) => Err(IdentityError::NotTrusted),
        Err(IdentityError::TrustEngineFailure(reason)) => {
            Err(IdentityError::TrustEngineFailure(reason))
        }
        Err(other) => Err(IdentityError::TrustEngineFailure(other.to_string())),
    }
}
