use std::fmt;

use const_oid::ObjectIdentifier;
use der::{Decode, asn1::AnyRef};
use ed25519_dalek::{SigningKey as Ed25519SigningKey, VerifyingKey as Ed25519VerifyingKey};
use p256::ecdsa::{SigningKey as P256SigningKey, VerifyingKey as P256VerifyingKey};
use pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePublicKey};
use rsa::{
    RsaPrivateKey, RsaPublicKey,
    signature::{RandomizedSigner, SignatureEncoding, Signer, Verifier},
    traits::PublicKeyParts,
};
use sha2::{Digest, Sha256, Sha512};
use x509_cert::spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};

use crate::error::{IdentityError, Result};

/// The family of a key, independent of its size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    Rsa,
    EcdsaP256,
    Ed25519,
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyType::Rsa => write!(f, "RSA"),
            KeyType::EcdsaP256 => write!(f, "ECDSA P-256"),
            KeyType::Ed25519 => write!(f, "Ed25519"),
        }
    }
}

/// Algorithms available for message signatures.
///
/// `RsaPkcs1v15Sha256` is the default used by [`crate::identity::Identity::sign`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignatureAlgorithm {
    /// RSASSA-PKCS1-v1_5 with SHA-256.
    #[default]
    RsaPkcs1v15Sha256,
    /// RSASSA-PKCS1-v1_5 with SHA-512.
    RsaPkcs1v15Sha512,
    /// RSASSA-PSS with SHA-256.
    RsaPssSha256,
    /// ECDSA over P-256 with SHA-256, DER encoded signature.
    EcdsaP256Sha256,
    /// Pure Ed25519.
    Ed25519,
}

impl SignatureAlgorithm {
    /// The algorithm an issuer uses for X.509 structures signed with `key`.
    pub fn for_key(key: &KeyPair) -> Self {
        match key {
            KeyPair::Rsa { .. } => SignatureAlgorithm::RsaPkcs1v15Sha256,
            KeyPair::EcdsaP256 { .. } => SignatureAlgorithm::EcdsaP256Sha256,
            KeyPair::Ed25519 { .. } => SignatureAlgorithm::Ed25519,
        }
    }

    /// Maps an X.509 signature algorithm OID back to a supported algorithm.
    pub fn from_oid(oid: ObjectIdentifier) -> Option<Self> {
        match oid {
            const_oid::db::rfc5912::SHA_256_WITH_RSA_ENCRYPTION => {
                Some(SignatureAlgorithm::RsaPkcs1v15Sha256)
            }
            const_oid::db::rfc5912::SHA_512_WITH_RSA_ENCRYPTION => {
                Some(SignatureAlgorithm::RsaPkcs1v15Sha512)
            }
            const_oid::db::rfc5912::ECDSA_WITH_SHA_256 => Some(SignatureAlgorithm::EcdsaP256Sha256),
            const_oid::db::rfc8410::ID_ED_25519 => Some(SignatureAlgorithm::Ed25519),
            _ => None,
        }
    }

    /// Returns the algorithm identifier used in certificates and requests.
    ///
    /// RSA-PSS needs explicit parameters and is only offered for raw message signatures.
    pub fn algorithm_identifier(self) -> Result<AlgorithmIdentifierOwned> {
        let rsa_null = Some(der::Any::from(AnyRef::NULL));
        match self {
            SignatureAlgorithm::RsaPkcs1v15Sha256 => Ok(AlgorithmIdentifierOwned {
                oid: const_oid::db::rfc5912::SHA_256_WITH_RSA_ENCRYPTION,
                parameters: rsa_null,
            }),
            SignatureAlgorithm::RsaPkcs1v15Sha512 => Ok(AlgorithmIdentifierOwned {
                oid: const_oid::db::rfc5912::SHA_512_WITH_RSA_ENCRYPTION,
                parameters: rsa_null,
            }),
            SignatureAlgorithm::EcdsaP256Sha256 => Ok(AlgorithmIdentifierOwned {
                oid: const_oid::db::rfc5912::ECDSA_WITH_SHA_256,
                parameters: None,
            }),
            SignatureAlgorithm::Ed25519 => Ok(AlgorithmIdentifierOwned {
                oid: const_oid::db::rfc8410::ID_ED_25519,
                parameters: None,
            }),
            SignatureAlgorithm::RsaPssSha256 => Err(IdentityError::UnsupportedAlgorithm),
        }
    }
}

/// Supported private keys.
#[derive(Clone)]
pub enum KeyPair {
    Rsa {
        private: Box<RsaPrivateKey>,
        public: RsaPublicKey,
    },
    EcdsaP256 {
        signing_key: P256SigningKey,
        verifying_key: P256VerifyingKey,
    },
    Ed25519 {
        signing_key: Ed25519SigningKey,
    },
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("type", &self.key_type())
            .field("bits", &self.size_bits())
            .finish_non_exhaustive()
    }
}

impl KeyPair {
    /// Generate an RSA key pair with the specified number of bits.
    pub fn generate_rsa(bits: usize) -> Result<Self> {
        let mut rng = rand_core::OsRng;
        let private = RsaPrivateKey::new(&mut rng, bits)?;
        Ok(Self::from_rsa(private))
    }

    /// Generate an ECDSA P-256 key pair.
    pub fn generate_ecdsa_p256() -> Self {
        let mut rng = rand_core::OsRng;
        let signing_key = P256SigningKey::random(&mut rng);
        let verifying_key = signing_key.verifying_key().to_owned();
        KeyPair::EcdsaP256 {
            signing_key,
            verifying_key,
        }
    }

    /// Generate an Ed25519 key pair.
    pub fn generate_ed25519() -> Self {
        let mut rng = rand_core::OsRng;
        let signing_key: Ed25519SigningKey = Ed25519SigningKey::generate(&mut rng);
        KeyPair::Ed25519 { signing_key }
    }

    fn from_rsa(private: RsaPrivateKey) -> Self {
        let public = RsaPublicKey::from(&private);
        KeyPair::Rsa {
            private: Box::new(private),
            public,
        }
    }

    /// Import an unencrypted PKCS#8 private key (RSA, P-256 or Ed25519).
    pub fn from_pkcs8_der(der: &[u8]) -> Result<Self> {
        if let Ok(private) = RsaPrivateKey::from_pkcs8_der(der) {
            return Ok(Self::from_rsa(private));
        }
        if let Ok(signing_key) = P256SigningKey::from_pkcs8_der(der) {
            let verifying_key = signing_key.verifying_key().to_owned();
            return Ok(KeyPair::EcdsaP256 {
                signing_key,
                verifying_key,
            });
        }
        let signing_key = Ed25519SigningKey::from_pkcs8_der(der).map_err(|_| {
            IdentityError::DecodingError("unsupported PKCS#8 private key".to_string())
        })?;
        Ok(KeyPair::Ed25519 { signing_key })
    }

    /// Import a PEM encoded (`PRIVATE KEY`) PKCS#8 private key.
    pub fn from_pkcs8_pem(pem_str: &str) -> Result<Self> {
        let pem = pem::parse(pem_str).map_err(|e| IdentityError::DecodingError(e.to_string()))?;
        if pem.tag() != "PRIVATE KEY" {
            return Err(IdentityError::InvalidInput(format!(
                "expected a PRIVATE KEY block, found {}",
                pem.tag()
            )));
        }
        Self::from_pkcs8_der(pem.contents())
    }

    pub fn key_type(&self) -> KeyType {
        match self {
            KeyPair::Rsa { .. } => KeyType::Rsa,
            KeyPair::EcdsaP256 { .. } => KeyType::EcdsaP256,
            KeyPair::Ed25519 { .. } => KeyType::Ed25519,
        }
    }

    /// Key size in bits (modulus size for RSA).
    pub fn size_bits(&self) -> usize {
        match self {
            KeyPair::Rsa { public, .. } => public.size() * 8,
            KeyPair::EcdsaP256 { .. } => 256,
            KeyPair::Ed25519 { .. } => 256,
        }
    }

    pub fn public_key(&self) -> PublicKey {
        match self {
            KeyPair::Rsa { public, .. } => PublicKey::Rsa(public.clone()),
            KeyPair::EcdsaP256 { verifying_key, .. } => PublicKey::EcdsaP256(*verifying_key),
            KeyPair::Ed25519 { signing_key } => PublicKey::Ed25519(signing_key.verifying_key()),
        }
    }

    /// Sign `message` with the given algorithm.
    ///
    /// Fails with [`IdentityError::UnsupportedAlgorithm`] when the algorithm does not
    /// belong to this key's family.
    pub fn sign(&self, message: &[u8], algorithm: SignatureAlgorithm) -> Result<Vec<u8>> {
        let signing_error = |e: rsa::signature::Error| IdentityError::SigningError(e.to_string());
        match (self, algorithm) {
            (KeyPair::Rsa { private, .. }, SignatureAlgorithm::RsaPkcs1v15Sha256) => {
                let signing_key = rsa::pkcs1v15::SigningKey::<Sha256>::new(*private.clone());
                Ok(signing_key.try_sign(message).map_err(signing_error)?.to_vec())
            }
            (KeyPair::Rsa { private, .. }, SignatureAlgorithm::RsaPkcs1v15Sha512) => {
                let signing_key = rsa::pkcs1v15::SigningKey::<Sha512>::new(*private.clone());
                Ok(signing_key.try_sign(message).map_err(signing_error)?.to_vec())
            }
            (KeyPair::Rsa { private, .. }, SignatureAlgorithm::RsaPssSha256) => {
                let signing_key = rsa::pss::BlindedSigningKey::<Sha256>::new(*private.clone());
                let mut rng = rand_core::OsRng;
                Ok(signing_key
                    .try_sign_with_rng(&mut rng, message)
                    .map_err(signing_error)?
                    .to_vec())
            }
            (KeyPair::EcdsaP256 { signing_key, .. }, SignatureAlgorithm::EcdsaP256Sha256) => {
                let signature: p256::ecdsa::Signature =
                    signing_key.try_sign(message).map_err(signing_error)?;
                Ok(signature.to_der().as_bytes().to_vec())
            }
            (KeyPair::Ed25519 { signing_key }, SignatureAlgorithm::Ed25519) => {
                let signature = signing_key.try_sign(message).map_err(signing_error)?;
                Ok(signature.to_bytes().to_vec())
            }
            _ => Err(IdentityError::UnsupportedAlgorithm),
        }
    }
}

/// Public half of a [`KeyPair`], as found in a certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKey {
    Rsa(RsaPublicKey),
    EcdsaP256(P256VerifyingKey),
    Ed25519(Ed25519VerifyingKey),
}

impl PublicKey {
    /// Decode a subject public key info structure.
    pub fn from_x509spki(spki: &SubjectPublicKeyInfoOwned) -> Result<Self> {
        let der = der::Encode::to_der(spki)?;
        let extraction_error = |e: pkcs8::spki::Error| {
            IdentityError::PublicKeyExtractionFailed(e.to_string())
        };
        match spki.algorithm.oid {
            const_oid::db::rfc5912::RSA_ENCRYPTION => RsaPublicKey::from_public_key_der(&der)
                .map(PublicKey::Rsa)
                .map_err(extraction_error),
            const_oid::db::rfc5912::ID_EC_PUBLIC_KEY => {
                P256VerifyingKey::from_public_key_der(&der)
                    .map(PublicKey::EcdsaP256)
                    .map_err(extraction_error)
            }
            const_oid::db::rfc8410::ID_ED_25519 => Ed25519VerifyingKey::from_public_key_der(&der)
                .map(PublicKey::Ed25519)
                .map_err(extraction_error),
            other => Err(IdentityError::PublicKeyExtractionFailed(format!(
                "unsupported key algorithm {other}"
            ))),
        }
    }

    pub fn key_type(&self) -> KeyType {
        match self {
            PublicKey::Rsa(_) => KeyType::Rsa,
            PublicKey::EcdsaP256(_) => KeyType::EcdsaP256,
            PublicKey::Ed25519(_) => KeyType::Ed25519,
        }
    }

    /// Encode as a subject public key info structure.
    pub fn to_x509spki(&self) -> Result<SubjectPublicKeyInfoOwned> {
        let document = match self {
            PublicKey::Rsa(key) => key.to_public_key_der(),
            PublicKey::EcdsaP256(key) => key.to_public_key_der(),
            PublicKey::Ed25519(key) => key.to_public_key_der(),
        }
        .map_err(|e| IdentityError::EncodingError(e.to_string()))?;
        Ok(SubjectPublicKeyInfoOwned::from_der(document.as_bytes())?)
    }

    /// SHA-256 digest of the DER encoded subject public key info.
    pub fn fingerprint(&self) -> Result<[u8; 32]> {
        let der = der::Encode::to_der(&self.to_x509spki()?)?;
        Ok(Sha256::digest(der).into())
    }

    /// Checks `signature` over `message`. Any decoding problem counts as a failed check.
    pub fn verify(&self, message: &[u8], signature: &[u8], algorithm: SignatureAlgorithm) -> bool {
        match (self, algorithm) {
            (PublicKey::Rsa(key), SignatureAlgorithm::RsaPkcs1v15Sha256) => {
                let verifying_key = rsa::pkcs1v15::VerifyingKey::<Sha256>::new(key.clone());
                rsa::pkcs1v15::Signature::try_from(signature)
                    .is_ok_and(|s| verifying_key.verify(message, &s).is_ok())
            }
            (PublicKey::Rsa(key), SignatureAlgorithm::RsaPkcs1v15Sha512) => {
                let verifying_key = rsa::pkcs1v15::VerifyingKey::<Sha512>::new(key.clone());
                rsa::pkcs1v15::Signature::try_from(signature)
                    .is_ok_and(|s| verifying_key.verify(message, &s).is_ok())
            }
            (PublicKey::Rsa(key), SignatureAlgorithm::RsaPssSha256) => {
                let verifying_key = rsa::pss::VerifyingKey::<Sha256>::new(key.clone());
                rsa::pss::Signature::try_from(signature)
                    .is_ok_and(|s| verifying_key.verify(message, &s).is_ok())
            }
            (PublicKey::EcdsaP256(key), SignatureAlgorithm::EcdsaP256Sha256) => {
                p256::ecdsa::Signature::from_der(signature)
                    .is_ok_and(|s| key.verify(message, &s).is_ok())
            }
            (PublicKey::Ed25519(key), SignatureAlgorithm::Ed25519) => {
                ed25519_dalek::Signature::from_slice(signature)
                    .is_ok_and(|s| key.verify(message, &s).is_ok())
            }
            _ => false,
        }
    }
}
