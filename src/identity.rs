//! The managed identity: a private key and its certificate, kept in a
//! [`CredentialStore`] under the certificate's common name.

use std::fmt;
use std::sync::Arc;

use bon::bon;
use der::flagset::{FlagSet, flags};
use time::OffsetDateTime;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::authority::{AuthorityClient, HttpAuthorityClient};
use crate::cert::Certificate;
use crate::config::IdentityConfig;
use crate::csr;
use crate::error::{IdentityError, Result};
use crate::identity_file::{ArchiveImporter, IdentityArchive};
use crate::key::{KeyPair, SignatureAlgorithm};
use crate::renewal::{self, RenewalOutcome};
use crate::store::CredentialStore;
use crate::trust::{self, TrustEngine};

flags! {
    /// Construction options of an [`Identity`].
    pub enum IdentityOption: u8 {
        /// Remove any stored key and certificate for the common name before installing.
        OverwriteExisting = 0b001,
        /// Download a newer certificate in the background when close to expiry.
        DownloadLatest = 0b010,
        /// Renew a renewable certificate in the background when close to expiry.
        AutoRenew = 0b100,
    }
}

/// A set of [`IdentityOption`]s.
///
/// `Options::default()` is the empty set; the identity builders default to
/// [`default_options`].
pub type Options = FlagSet<IdentityOption>;

/// [`IdentityOption::AutoRenew`] alone.
pub fn default_options() -> Options {
    IdentityOption::AutoRenew.into()
}

/// A handle onto the credential stored for one common name.
///
/// Handles are cheap; every handle created for the same common name over the
/// same store sees the same key and certificate.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use certkit_identity::{cert::Certificate, identity::Identity, key::KeyPair, store::MemoryStore};
///
/// # async fn run(certificate: Certificate, key: KeyPair) -> certkit_identity::error::Result<()> {
/// let identity = Identity::builder()
///     .certificate(certificate)
///     .private_key(key)
///     .store(Arc::new(MemoryStore::new()))
///     .build()?;
///
/// let signature = identity.sign(b"message", None)?;
/// # Ok(())
/// # }
/// ```
pub struct Identity {
    common_name: String,
    store: Arc<dyn CredentialStore>,
    authority: Arc<dyn AuthorityClient>,
    config: IdentityConfig,
    background: Option<JoinHandle<()>>,
}

#[bon]
impl Identity {
    /// Installs `private_key` and `certificate` and, depending on `options`,
    /// starts a background refresh.
    ///
    /// Without [`IdentityOption::OverwriteExisting`] an existing entry for the
    /// common name must hold the same public key; the later expiring of the
    /// two certificates is kept.
    ///
    /// The background refresh runs on the current Tokio runtime, if any. Its
    /// failures are logged and never reach the caller.
    ///
    /// # Errors
    ///
    /// * [`IdentityError::MissingCommonName`] if the certificate subject has no common name.
    /// * [`IdentityError::PublicKeyMismatch`] if `private_key` does not belong to the
    ///   certificate or the store holds a different key.
    /// * [`IdentityError::Config`] if no `authority` is given and the configured endpoint is invalid.
    #[builder]
    pub fn new(
        certificate: Certificate,
        private_key: KeyPair,
        store: Arc<dyn CredentialStore>,
        authority: Option<Arc<dyn AuthorityClient>>,
        #[builder(default = default_options())] options: Options,
        #[builder(default)] config: IdentityConfig,
    ) -> Result<Self> {
        Self::install(certificate, private_key, store, authority, options, config)
    }

    /// Like [`Identity::builder`], with the key and certificate unpacked from
    /// `archive` by `importer`.
    ///
    /// # Errors
    ///
    /// Any error of `importer` is returned unchanged, otherwise as [`Identity::builder`].
    #[builder(finish_fn = build)]
    pub fn from_archive(
        archive: &IdentityArchive,
        importer: &dyn ArchiveImporter,
        store: Arc<dyn CredentialStore>,
        authority: Option<Arc<dyn AuthorityClient>>,
        #[builder(default = default_options())] options: Options,
        #[builder(default)] config: IdentityConfig,
    ) -> Result<Self> {
        let (certificate, private_key) = importer.import(archive)?;
        debug!(?archive, "imported identity archive");
        Self::install(certificate, private_key, store, authority, options, config)
    }
}

impl Identity {
    fn install(
        certificate: Certificate,
        private_key: KeyPair,
        store: Arc<dyn CredentialStore>,
        authority: Option<Arc<dyn AuthorityClient>>,
        options: Options,
        config: IdentityConfig,
    ) -> Result<Self> {
        let common_name = certificate
            .common_name()
            .filter(|cn| !cn.is_empty())
            .ok_or(IdentityError::MissingCommonName)?;
        if !certificate.matches_private_key(&private_key) {
            return Err(IdentityError::PublicKeyMismatch);
        }
        let authority: Arc<dyn AuthorityClient> = match authority {
            Some(authority) => authority,
            None => Arc::new(HttpAuthorityClient::from_config(&config)?),
        };

        if options.contains(IdentityOption::OverwriteExisting) {
            debug!(%common_name, "clearing stored credential");
            store.clear(&common_name);
        }
        store.install(&common_name, private_key, certificate)?;
        info!(%common_name, "identity installed");

        let mut identity = Self {
            common_name,
            store,
            authority,
            config,
            background: None,
        };
        identity.background = identity.schedule_refresh(options);
        Ok(identity)
    }

    pub fn common_name(&self) -> &str {
        &self.common_name
    }

    pub fn config(&self) -> &IdentityConfig {
        &self.config
    }

    /// The certificate currently in the store.
    pub fn certificate(&self) -> Result<Certificate> {
        self.store
            .certificate(&self.common_name)
            .ok_or(IdentityError::CertificateUnavailable)
    }

    /// Signs `message` with the stored private key.
    ///
    /// `algorithm` defaults to RSA PKCS#1 v1.5 with SHA-256.
    pub fn sign(&self, message: &[u8], algorithm: Option<SignatureAlgorithm>) -> Result<Vec<u8>> {
        let key = self
            .store
            .private_key(&self.common_name)
            .ok_or(IdentityError::PrivateKeyUnavailable)?;
        key.sign(message, algorithm.unwrap_or_default())
    }

    /// Replaces the stored certificate if `candidate` has the same public key
    /// and expires later.
    pub fn update_certificate(&self, candidate: Certificate) -> Result<()> {
        self.store.set_certificate(&self.common_name, Some(candidate))
    }

    /// Whether the current certificate expires within the renewal interval.
    pub fn needs_refresh(&self) -> Result<bool> {
        Ok(renewal::needs_refresh(
            &self.certificate()?,
            self.config.renewal_interval(),
            OffsetDateTime::now_utc(),
        ))
    }

    /// PEM encoded signing request for renewing the current certificate.
    pub fn create_renewal_csr(&self) -> Result<String> {
        let certificate = self.certificate()?;
        csr::create_renewal_csr(
            &self.common_name,
            &certificate,
            self.store.private_key(&self.common_name).as_ref(),
        )
    }

    /// Downloads and installs a newer certificate for the current key, if the
    /// authority has one.
    pub async fn download_latest_certificate(&self) -> Result<RenewalOutcome> {
        renewal::refresh(&self.common_name, self.store.as_ref(), self.authority.as_ref()).await
    }

    /// Renews the current certificate through a signing request.
    ///
    /// Returns [`RenewalOutcome::NotRenewable`] without contacting the
    /// authority when the issuer class is not renewed.
    pub async fn renew_certificate(&self) -> Result<RenewalOutcome> {
        renewal::renew(&self.common_name, self.store.as_ref(), self.authority.as_ref()).await
    }

    /// Evaluates the current certificate against `anchors`.
    pub fn evaluate_trust(&self, anchors: &[Certificate], engine: &dyn TrustEngine) -> Result<()> {
        trust::evaluate_trust(&self.certificate()?, anchors, engine)
    }

    /// Takes the handle of the refresh started at construction, if one was started.
    pub fn take_background_task(&mut self) -> Option<JoinHandle<()>> {
        self.background.take()
    }

    fn schedule_refresh(&self, options: Options) -> Option<JoinHandle<()>> {
        let certificate = self.store.certificate(&self.common_name)?;
        let now = OffsetDateTime::now_utc();
        if !renewal::needs_refresh(&certificate, self.config.renewal_interval(), now) {
            return None;
        }

        let renew = options.contains(IdentityOption::AutoRenew) && certificate.is_renewable();
        if !renew && !options.contains(IdentityOption::DownloadLatest) {
            debug!(common_name = %self.common_name, "certificate expires soon, no refresh enabled");
            return None;
        }

        let Ok(runtime) = Handle::try_current() else {
            warn!(common_name = %self.common_name, "no async runtime, skipping background refresh");
            return None;
        };

        let common_name = self.common_name.clone();
        let store = Arc::clone(&self.store);
        let authority = Arc::clone(&self.authority);
        debug!(%common_name, renew, "scheduling background refresh");
        Some(runtime.spawn(async move {
            let result = if renew {
                renewal::renew(&common_name, store.as_ref(), authority.as_ref()).await
            } else {
                renewal::refresh(&common_name, store.as_ref(), authority.as_ref()).await
            };
            match result {
                Ok(outcome) => debug!(%common_name, ?outcome, "background refresh finished"),
                Err(err) => warn!(%common_name, %err, "background refresh failed"),
            }
        }))
    }
}

impl Clone for Identity {
    /// The clone does not own the background task.
    fn clone(&self) -> Self {
        Self {
            common_name: self.common_name.clone(),
            store: Arc::clone(&self.store),
            authority: Arc::clone(&self.authority),
            config: self.config.clone(),
            background: None,
        }
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("common_name", &self.common_name)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
