pub mod name;

use core::fmt;

use der::{Decode, Encode, EncodePem};
use time::{Duration, OffsetDateTime};

use crate::error::{IdentityError, Result};
use crate::key::{KeyPair, PublicKey};

/// The authorities that issue identity certificates.
///
/// Each class is identified by the common name of the issuing authority.
/// Only `Reporting` and `Standalone` certificates are renewed automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IssuerClass {
    Evaluation,
    Reporting,
    Standalone,
}

impl IssuerClass {
    pub const ALL: [IssuerClass; 3] = [
        IssuerClass::Evaluation,
        IssuerClass::Reporting,
        IssuerClass::Standalone,
    ];

    /// Common name of the issuing authority.
    pub const fn common_name(self) -> &'static str {
        match self {
            IssuerClass::Evaluation => "com.appliedrec.ver-id.evaluation",
            IssuerClass::Reporting => "com.appliedrec.ver-id.reporting",
            IssuerClass::Standalone => "com.appliedrec.ver-id.standalone",
        }
    }

    pub fn from_common_name(common_name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|class| class.common_name() == common_name)
    }

    pub const fn is_renewable(self) -> bool {
        matches!(self, IssuerClass::Reporting | IssuerClass::Standalone)
    }
}

impl fmt::Display for IssuerClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.common_name())
    }
}

/// Represents an X.509 certificate.
///
/// Besides DER/PEM conversion this exposes the read-only facts the renewal
/// policy is built on: expiry, issuer class and public key identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    /// The inner representation of the certificate.
    pub inner: x509_cert::Certificate,
}

impl From<x509_cert::Certificate> for Certificate {
    fn from(inner: x509_cert::Certificate) -> Self {
        Self { inner }
    }
}

impl Certificate {
    /// Decodes a DER encoded certificate.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        Ok(Self {
            inner: x509_cert::Certificate::from_der(der)?,
        })
    }

    /// Decodes the first certificate found in a PEM string.
    pub fn from_pem(pem: &str) -> Result<Self> {
        crate::pem_utils::certificates_from_pem(pem)?
            .into_iter()
            .next()
            .ok_or_else(|| IdentityError::DecodingError("no certificate in PEM input".to_string()))
    }

    /// Encodes the certificate into DER format.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        self.inner
            .to_der()
            .map_err(|e| IdentityError::EncodingError(e.to_string()))
    }

    /// Encodes the certificate into PEM format.
    pub fn to_pem(&self) -> Result<String> {
        self.inner
            .to_pem(pkcs8::LineEnding::LF)
            .map_err(|e| IdentityError::EncodingError(e.to_string()))
    }

    /// Subject common name.
    pub fn common_name(&self) -> Option<String> {
        name::common_name(&self.inner.tbs_certificate.subject)
    }

    /// Issuer common name.
    pub fn issuer_common_name(&self) -> Option<String> {
        name::common_name(&self.inner.tbs_certificate.issuer)
    }

    /// `notAfter`, if it is representable.
    pub fn expiry(&self) -> Option<OffsetDateTime> {
        to_offset_date_time(self.inner.tbs_certificate.validity.not_after)
    }

    /// `notBefore`, if it is representable.
    pub fn not_before(&self) -> Option<OffsetDateTime> {
        to_offset_date_time(self.inner.tbs_certificate.validity.not_before)
    }

    pub fn public_key(&self) -> Result<PublicKey> {
        PublicKey::from_x509spki(&self.inner.tbs_certificate.subject_public_key_info)
    }

    /// SHA-256 fingerprint of the subject public key, `None` if the key cannot be read.
    pub fn public_key_fingerprint(&self) -> Option<[u8; 32]> {
        self.public_key().ok()?.fingerprint().ok()
    }

    /// Serial number as an unsigned 64-bit integer.
    ///
    /// Returns `None` when the encoded serial is longer than 8 bytes.
    pub fn serial_number(&self) -> Option<u64> {
        let bytes = self.inner.tbs_certificate.serial_number.as_bytes();
        if bytes.len() > 8 {
            return None;
        }
        Some(bytes.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
    }

    /// True iff both certificates have an expiry and this one expires later.
    pub fn expires_after(&self, other: &Certificate) -> bool {
        match (self.expiry(), other.expiry()) {
            (Some(mine), Some(theirs)) => mine > theirs,
            _ => false,
        }
    }

    /// True iff both public keys can be read and their fingerprints are equal.
    pub fn has_same_public_key(&self, other: &Certificate) -> bool {
        match (self.public_key_fingerprint(), other.public_key_fingerprint()) {
            (Some(mine), Some(theirs)) => mine == theirs,
            _ => false,
        }
    }

    /// True iff `key` is the private half of the subject public key.
    pub fn matches_private_key(&self, key: &KeyPair) -> bool {
        match (self.public_key_fingerprint(), key.public_key().fingerprint()) {
            (Some(mine), Ok(theirs)) => mine == theirs,
            _ => false,
        }
    }

    /// Classifies the issuer by its common name.
    pub fn issuer(&self) -> Result<IssuerClass> {
        self.issuer_common_name()
            .as_deref()
            .and_then(IssuerClass::from_common_name)
            .ok_or(IdentityError::IssuerUnrecognized)
    }

    /// Whether the certificate may be renewed through a signing request.
    ///
    /// Classification failures count as not renewable.
    pub fn is_renewable(&self) -> bool {
        self.issuer().is_ok_and(IssuerClass::is_renewable)
    }

    /// Whether `at` falls inside the validity window.
    pub fn is_valid_at(&self, at: OffsetDateTime) -> bool {
        match (self.not_before(), self.expiry()) {
            (Some(not_before), Some(not_after)) => not_before <= at && at <= not_after,
            _ => false,
        }
    }

    /// Whether the certificate expires less than `interval` after `now`.
    ///
    /// Already expired certificates qualify; a certificate without a
    /// readable expiry does not.
    pub fn expires_within(&self, interval: Duration, now: OffsetDateTime) -> bool {
        self.expiry().is_some_and(|expiry| expiry - now < interval)
    }
}

fn to_offset_date_time(time: x509_cert::time::Time) -> Option<OffsetDateTime> {
    let seconds = i64::try_from(time.to_unix_duration().as_secs()).ok()?;
    OffsetDateTime::from_unix_timestamp(seconds).ok()
}
