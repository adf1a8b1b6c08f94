//! Error types for certificate identity management.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, IdentityError>;

/// Represents errors that can occur while managing a certificate identity.
///
/// The variants mirror the lifecycle stages: certificate parsing and
/// classification, the replacement guard, CSR preconditions, the renewal
/// protocol and trust evaluation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// The certificate subject carries no common name.
    #[error("Certificate subject has no common name")]
    MissingCommonName,

    /// The issuer common name is not one of the known authorities.
    #[error("Certificate issuer is not a recognized authority")]
    IssuerUnrecognized,

    /// The candidate certificate does not carry the registered public key.
    #[error("Certificate public key does not match the registered key")]
    PublicKeyMismatch,

    /// The candidate certificate does not expire after the current one.
    #[error("Certificate expires before the current certificate")]
    ExpiresBeforeCurrent,

    /// The store holds no private key for this identity.
    #[error("Private key is not available")]
    PrivateKeyUnavailable,

    /// The store holds no certificate for this identity.
    #[error("Certificate is not available")]
    CertificateUnavailable,

    /// Renewal requires an RSA key.
    #[error("Unsupported key type: {0}")]
    UnsupportedKeyType(String),

    /// Renewal requires a key of at most 2048 bits.
    #[error("Key too large: {bits} bits (maximum 2048)")]
    KeyTooLarge { bits: usize },

    /// The public key could not be read from the certificate.
    #[error("Failed to extract public key: {0}")]
    PublicKeyExtractionFailed(String),

    /// The signing algorithm cannot be used with the stored key.
    #[error("Unsupported signature algorithm")]
    UnsupportedAlgorithm,

    /// The authority request failed or returned an unusable body.
    #[error("Download failed: {0}")]
    DownloadFailed(String),

    /// The authority response held no certificate for the registered key.
    #[error("No certificate in the response matches the registered key")]
    NoMatchingCandidate,

    /// The certificate does not chain to any of the given anchors.
    #[error("Certificate is not trusted")]
    NotTrusted,

    /// The trust engine could not reach a decision.
    #[error("Trust evaluation failed: {0}")]
    TrustEngineFailure(String),

    /// Error during data encoding.
    #[error("Failed to encode data: {0}")]
    EncodingError(String),

    /// Error during data decoding.
    #[error("Failed to decode data: {0}")]
    DecodingError(String),

    /// Error due to invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Error during key generation.
    #[error("Key generation error: {0}")]
    KeyGenerationError(String),

    /// Error while producing a signature.
    #[error("Signing error: {0}")]
    SigningError(String),

    /// Invalid or unreadable configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed `.identity` or `.p12` input.
    #[error("Invalid identity file: {0}")]
    InvalidIdentityFile(String),
}

impl From<der::Error> for IdentityError {
    /// Converts a `der::Error` into an `IdentityError`.
    fn from(err: der::Error) -> Self {
        IdentityError::DecodingError(err.to_string())
    }
}

impl From<rsa::Error> for IdentityError {
    fn from(err: rsa::Error) -> Self {
        IdentityError::KeyGenerationError(err.to_string())
    }
}

impl From<pkcs8::Error> for IdentityError {
    fn from(err: pkcs8::Error) -> Self {
        IdentityError::DecodingError(err.to_string())
    }
}

impl From<pkcs8::spki::Error> for IdentityError {
    fn from(err: pkcs8::spki::Error) -> Self {
        IdentityError::PublicKeyExtractionFailed(err.to_string())
    }
}

impl From<reqwest::Error> for IdentityError {
    fn from(err: reqwest::Error) -> Self {
        IdentityError::DownloadFailed(err.to_string())
    }
}
