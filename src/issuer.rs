use bon::Builder;
use der::Encode;
use der::asn1::BitString;
use time::{Duration, OffsetDateTime};

use crate::cert::{Certificate, IssuerClass};
use crate::error::Result;
use crate::key::{KeyPair, PublicKey, SignatureAlgorithm};
use crate::tbs_certificate::TbsCertificate;

/// Parameters of a certificate to be issued.
///
/// # Fields
/// * `subject_common_name` - The common name the certificate is issued to.
/// * `subject_public_key` - The public key bound to the subject.
/// * `not_before` - Start of validity, defaults to now.
/// * `not_after` - End of validity.
/// * `serial_number` - Serial number, random when not given.
#[derive(Clone, Debug, Builder)]
pub struct CertificateParams {
    #[builder(into)]
    pub subject_common_name: String,
    pub subject_public_key: PublicKey,
    #[builder(default = OffsetDateTime::now_utc())]
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
    pub serial_number: Option<u64>,
}

/// Represents an entity capable of issuing certificates.
///
/// This is the certificate factory used to mint identity certificates and
/// trust anchors; the issuer is identified by its common name only.
pub trait Issuer {
    /// Returns the common name of the issuer.
    fn issuer_common_name(&self) -> &str;

    /// Returns the signing key of the issuer.
    fn signing_key(&self) -> &KeyPair;

    /// Issues a certificate for the given parameters, signed with [`Issuer::signing_key`].
    fn issue(&self, params: &CertificateParams) -> Result<Certificate> {
        let signature_algorithm = SignatureAlgorithm::for_key(self.signing_key());
        let serial_number = params
            .serial_number
            .unwrap_or_else(|| u64::from(rand::random::<u32>()) + 1);

        let tbs_cert = TbsCertificate {
            serial_number,
            signature_algorithm,
            issuer: self.issuer_common_name().to_string(),
            not_before: params.not_before,
            not_after: params.not_after,
            subject: params.subject_common_name.clone(),
            subject_public_key: params.subject_public_key.clone(),
        };

        let tbs_cert_inner = tbs_cert.to_tbs_certificate_inner()?;
        let signature = self
            .signing_key()
            .sign(&tbs_cert_inner.to_der()?, signature_algorithm)?;

        Ok(Certificate {
            inner: x509_cert::Certificate {
                tbs_certificate: tbs_cert_inner,
                signature_algorithm: signature_algorithm.algorithm_identifier()?,
                signature: BitString::from_bytes(&signature)?,
            },
        })
    }
}

/// A named signing key acting as a certificate authority.
#[derive(Debug, Clone)]
pub struct CertificateAuthority {
    pub common_name: String,
    pub key: KeyPair,
}

impl CertificateAuthority {
    pub fn new(common_name: impl Into<String>, key: KeyPair) -> Self {
        Self {
            common_name: common_name.into(),
            key,
        }
    }

    /// An authority named after one of the known issuer classes.
    pub fn for_class(class: IssuerClass, key: KeyPair) -> Self {
        Self::new(class.common_name(), key)
    }

    /// Self-signed certificate for this authority, usable as a trust anchor.
    pub fn self_signed_certificate(&self, validity_days: i64) -> Result<Certificate> {
        let now = OffsetDateTime::now_utc();
        let params = CertificateParams::builder()
            .subject_common_name(self.common_name.clone())
            .subject_public_key(self.key.public_key())
            .not_before(now)
            .not_after(now + Duration::days(validity_days))
            .serial_number(1)
            .build();
        self.issue(&params)
    }
}

impl Issuer for CertificateAuthority {
    fn issuer_common_name(&self) -> &str {
        &self.common_name
    }

    fn signing_key(&self) -> &KeyPair {
        &self.key
    }
}
