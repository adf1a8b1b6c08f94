use std::sync::LazyLock;

use base64::{Engine, engine::general_purpose::STANDARD};
use regex::Regex;

use crate::cert::Certificate;
use crate::error::{IdentityError, Result};

static CERTIFICATE_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)-----BEGIN\sCERTIFICATE-----(.*?)-----END\sCERTIFICATE-----")
        .expect("certificate block pattern is valid")
});

/// Extract every certificate from a PEM encoded string, in order of appearance.
///
/// Text outside the `CERTIFICATE` blocks is ignored and whitespace inside a
/// block is tolerated. A block whose body is not base64 encoded DER fails the
/// whole call.
pub fn certificates_from_pem(text: &str) -> Result<Vec<Certificate>> {
    CERTIFICATE_BLOCK
        .captures_iter(text)
        .map(|captures| {
            let body: String = captures[1]
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect();
            let der = STANDARD
                .decode(body.as_bytes())
                .map_err(|e| IdentityError::DecodingError(e.to_string()))?;
            Certificate::from_der(&der)
        })
        .collect()
}

/// Convert DER‑encoded data into a PEM‑encoded string with the provided label.
pub fn der_to_pem(der: &[u8], label: &str) -> String {
    let pem = pem::Pem::new(label, der);
    pem::encode_config(&pem, pem::EncodeConfig::new())
}

/// Convert a PEM‑encoded string to DER‑encoded bytes.
pub fn pem_to_der(pem_str: &str) -> std::result::Result<Vec<u8>, pem::PemError> {
    let pem = pem::parse(pem_str)?;
    Ok(pem.contents().to_vec())
}
