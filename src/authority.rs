//! Client side of the certificate authority protocol.
//!
//! The authority exposes one resource per identity,
//! `{endpoint}/api/certificates/{common name}`:
//!
//! * `GET` returns the certificates currently issued for the identity.
//! * `POST` with a PEM certificate signing request as body returns the
//!   renewed certificate.
//!
//! Responses are PEM text holding one or more `CERTIFICATE` blocks. Any
//! status of 400 and above is a failure.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use tracing::debug;

use crate::config::IdentityConfig;
use crate::error::{IdentityError, Result};

/// Transport to the certificate authority.
#[async_trait]
pub trait AuthorityClient: Send + Sync {
    /// Fetches the PEM text of all certificates issued for `common_name`.
    async fn fetch_certificates(&self, common_name: &str) -> Result<String>;

    /// Submits a PEM encoded CSR and returns the PEM text of the response.
    async fn submit_renewal(&self, common_name: &str, csr_pem: &str) -> Result<String>;
}

/// [`AuthorityClient`] speaking HTTP(S) via `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpAuthorityClient {
    client: Client,
    endpoint: Url,
}

impl HttpAuthorityClient {
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IdentityError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, endpoint })
    }

    pub fn from_config(config: &IdentityConfig) -> Result<Self> {
        Self::new(config.renewal_url()?, config.request_timeout())
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// `{endpoint}/api/certificates/{common_name}`, with the name percent-encoded.
    pub fn certificates_url(&self, common_name: &str) -> Result<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| IdentityError::Config(format!("{} cannot be a base URL", self.endpoint)))?
            .pop_if_empty()
            .extend(["api", "certificates", common_name]);
        Ok(url)
    }

    async fn read_body(response: Response) -> Result<String> {
        let status = response.status();
        if status.as_u16() >= 400 {
            return Err(IdentityError::DownloadFailed(format!(
                "authority responded with {status}"
            )));
        }
        let bytes = response.bytes().await?;
        String::from_utf8(bytes.to_vec()).map_err(|_| {
            IdentityError::DownloadFailed("response body is not valid UTF-8".to_string())
        })
    }
}

#[async_trait]
impl AuthorityClient for HttpAuthorityClient {
    async fn fetch_certificates(&self, common_name: &str) -> Result<String> {
        let url = self.certificates_url(common_name)?;
        debug!(%url, "fetching certificates");
        let response = self.client.get(url).send().await?;
        Self::read_body(response).await
    }

    async fn submit_renewal(&self, common_name: &str, csr_pem: &str) -> Result<String> {
        let url = self.certificates_url(common_name)?;
        debug!(%url, "submitting renewal request");
        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/x-pem-file")
            .body(csr_pem.to_string())
            .send()
            .await?;
        Self::read_body(response).await
    }
}
