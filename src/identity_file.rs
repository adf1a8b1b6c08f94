//! Identity files.
//!
//! An identity is distributed either as a raw PKCS#12 archive (`.p12`) with a
//! separately known password, or as an `.identity` envelope bundling both:
//!
//! ```text
//! u32 LE version (1) | u32 LE archive length | u32 LE password length
//! archive bytes      | UTF-8 password
//! ```
//!
//! Unpacking the PKCS#12 archive itself is left to an [`ArchiveImporter`];
//! [`Identity::from_archive`](crate::identity::Identity::from_archive) installs
//! what it returns.

use std::path::Path;

use crate::cert::Certificate;
use crate::error::{IdentityError, Result};
use crate::key::KeyPair;

pub const IDENTITY_FILE_VERSION: u32 = 1;

const HEADER_LEN: usize = 12;

/// A PKCS#12 archive together with its password.
#[derive(Clone, PartialEq, Eq)]
pub struct IdentityArchive {
    pub pkcs12: Vec<u8>,
    pub password: String,
}

impl std::fmt::Debug for IdentityArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityArchive")
            .field("pkcs12_len", &self.pkcs12.len())
            .finish_non_exhaustive()
    }
}

/// Unpacks a PKCS#12 archive into the certificate and private key of an identity.
pub trait ArchiveImporter {
    fn import(&self, archive: &IdentityArchive) -> Result<(Certificate, KeyPair)>;
}

impl IdentityArchive {
    pub fn new(pkcs12: Vec<u8>, password: impl Into<String>) -> Self {
        Self {
            pkcs12,
            password: password.into(),
        }
    }

    /// Parses the contents of an `.identity` file.
    pub fn from_identity_file(bytes: &[u8]) -> Result<Self> {
        let field = |index: usize| -> Result<usize> {
            let start = index * 4;
            let raw: [u8; 4] = bytes
                .get(start..start + 4)
                .and_then(|b| b.try_into().ok())
                .ok_or_else(|| invalid("truncated header"))?;
            usize::try_from(u32::from_le_bytes(raw)).map_err(|_| invalid("length out of range"))
        };

        if field(0)? != IDENTITY_FILE_VERSION as usize {
            return Err(invalid("unsupported version"));
        }
        let pkcs12_len = field(1)?;
        let password_len = field(2)?;

        let pkcs12_end = HEADER_LEN
            .checked_add(pkcs12_len)
            .ok_or_else(|| invalid("length out of range"))?;
        let password_end = pkcs12_end
            .checked_add(password_len)
            .ok_or_else(|| invalid("length out of range"))?;
        let pkcs12 = bytes
            .get(HEADER_LEN..pkcs12_end)
            .ok_or_else(|| invalid("truncated archive"))?;
        let password = bytes
            .get(pkcs12_end..password_end)
            .ok_or_else(|| invalid("truncated password"))?;
        let password = std::str::from_utf8(password)
            .map_err(|_| invalid("password is not valid UTF-8"))?;

        Ok(Self::new(pkcs12.to_vec(), password))
    }

    /// Encodes the archive as an `.identity` file.
    pub fn to_identity_file(&self) -> Result<Vec<u8>> {
        let pkcs12_len =
            u32::try_from(self.pkcs12.len()).map_err(|_| invalid("archive too large"))?;
        let password_len =
            u32::try_from(self.password.len()).map_err(|_| invalid("password too long"))?;
        let mut out = Vec::with_capacity(HEADER_LEN + self.pkcs12.len() + self.password.len());
        out.extend_from_slice(&IDENTITY_FILE_VERSION.to_le_bytes());
        out.extend_from_slice(&pkcs12_len.to_le_bytes());
        out.extend_from_slice(&password_len.to_le_bytes());
        out.extend_from_slice(&self.pkcs12);
        out.extend_from_slice(self.password.as_bytes());
        Ok(out)
    }

    /// Loads an `.identity` or `.p12` file.
    ///
    /// A `.p12` archive requires `password`; an `.identity` file carries its own
    /// and ignores it. The extension is matched case-insensitively.
    pub fn load(path: impl AsRef<Path>, password: Option<&str>) -> Result<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let read = || {
            std::fs::read(path).map_err(|e| invalid(&format!("{}: {e}", path.display())))
        };
        match extension.as_deref() {
            Some("identity") => Self::from_identity_file(&read()?),
            Some("p12") => {
                let password = password.ok_or_else(|| invalid("a .p12 archive needs a password"))?;
                Ok(Self::new(read()?, password))
            }
            _ => Err(invalid(&format!(
                "unsupported identity file {}",
                path.display()
            ))),
        }
    }
}

fn invalid(reason: &str) -> IdentityError {
    IdentityError::InvalidIdentityFile(reason.to_string())
}
