use der::Encode;
use der::asn1::BitString;
use x509_cert::request::{CertReq, CertReqInfo, Version};
use tracing::debug;

use crate::cert::{Certificate, name};
use crate::error::{IdentityError, Result};
use crate::key::{KeyPair, KeyType, SignatureAlgorithm};
use crate::pem_utils::der_to_pem;

/// Largest RSA modulus the renewal authority accepts.
pub const MAX_RENEWAL_KEY_BITS: usize = 2048;

/// Builds the PEM encoded PKCS#10 request used to renew `certificate`.
///
/// The request carries `common_name` as its only subject attribute and the
/// public key of the stored `private_key`, signed with RSA PKCS#1 v1.5 and
/// SHA-256. The key is never regenerated.
///
/// # Errors
///
/// The preconditions are checked in this order:
/// * [`IdentityError::PublicKeyExtractionFailed`] if the certificate key cannot be read.
/// * [`IdentityError::PrivateKeyUnavailable`] if there is no private key.
/// * [`IdentityError::UnsupportedKeyType`] if the private key is not RSA.
/// * [`IdentityError::KeyTooLarge`] if the modulus exceeds [`MAX_RENEWAL_KEY_BITS`].
/// * [`IdentityError::PublicKeyMismatch`] if the private key does not belong to the certificate.
pub fn create_renewal_csr(
    common_name: &str,
    certificate: &Certificate,
    private_key: Option<&KeyPair>,
) -> Result<String> {
    let certificate_key = certificate.public_key()?;
    let private_key = private_key.ok_or(IdentityError::PrivateKeyUnavailable)?;
    if private_key.key_type() != KeyType::Rsa {
        return Err(IdentityError::UnsupportedKeyType(
            private_key.key_type().to_string(),
        ));
    }
    let bits = private_key.size_bits();
    if bits > MAX_RENEWAL_KEY_BITS {
        return Err(IdentityError::KeyTooLarge { bits });
    }
    let public_key = private_key.public_key();
    if public_key.fingerprint()? != certificate_key.fingerprint()? {
        return Err(IdentityError::PublicKeyMismatch);
    }

    let info = CertReqInfo {
        version: Version::V1,
        subject: name::from_common_name(common_name)?,
        public_key: public_key.to_x509spki()?,
        attributes: Default::default(),
    };

    let algorithm = SignatureAlgorithm::RsaPkcs1v15Sha256;
    let info_der = info
        .to_der()
        .map_err(|e| IdentityError::EncodingError(e.to_string()))?;
    let signature = private_key.sign(&info_der, algorithm)?;

    let request = CertReq {
        info,
        algorithm: algorithm.algorithm_identifier()?,
        signature: BitString::from_bytes(&signature)?,
    };
    let der = request
        .to_der()
        .map_err(|e| IdentityError::EncodingError(e.to_string()))?;
    debug!(common_name, bits, "created renewal request");
    Ok(der_to_pem(&der, "CERTIFICATE REQUEST"))
}
