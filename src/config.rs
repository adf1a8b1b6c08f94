//! Configuration for identity renewal.

use std::path::Path;
use std::time::Duration as StdDuration;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::{IdentityError, Result};

pub const DEFAULT_RENEWAL_ENDPOINT: &str = "https://licensing.ver-id.com";
pub const DEFAULT_RENEWAL_INTERVAL_DAYS: u32 = 30;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Renewal settings of an identity.
///
/// Every field has a default, so an empty TOML document is a valid
/// configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Renew once the certificate expires within this many days.
    pub renewal_interval_days: u32,

    /// Base URL of the certificate authority.
    pub renewal_endpoint: String,

    /// Timeout for a single authority request.
    pub request_timeout_secs: u64,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            renewal_interval_days: DEFAULT_RENEWAL_INTERVAL_DAYS,
            renewal_endpoint: DEFAULT_RENEWAL_ENDPOINT.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl IdentityConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| IdentityError::Config(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| IdentityError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn renewal_interval(&self) -> time::Duration {
        time::Duration::days(i64::from(self.renewal_interval_days))
    }

    pub fn request_timeout(&self) -> StdDuration {
        StdDuration::from_secs(self.request_timeout_secs)
    }

    /// Parsed authority endpoint. Only `http` and `https` URLs are accepted.
    pub fn renewal_url(&self) -> Result<Url> {
        let url = Url::parse(&self.renewal_endpoint)
            .map_err(|e| IdentityError::Config(format!("invalid renewal endpoint: {e}")))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(IdentityError::Config(format!(
                "unsupported renewal endpoint scheme {scheme}"
            ))),
        }
    }
}
