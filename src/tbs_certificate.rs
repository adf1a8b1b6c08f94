use std::time::SystemTime;

use der::asn1::{GeneralizedTime, UtcTime};
use time::OffsetDateTime;
use x509_cert::Version;
use x509_cert::certificate::TbsCertificateInner;
use x509_cert::serial_number::SerialNumber;
use x509_cert::time::{Time, Validity};

use crate::cert::name;
use crate::error::Result;
use crate::key::{PublicKey, SignatureAlgorithm};

/// Represents the "To Be Signed" (TBS) portion of an X.509 certificate.
///
/// Identity certificates only carry a common name on both sides and no
/// extensions.
///
/// # Fields
/// * `serial_number` - The unique identifier for the certificate.
/// * `signature_algorithm` - The algorithm used to sign the certificate.
/// * `issuer` - The common name of the certificate issuer.
/// * `not_before` - The start of the certificate's validity period.
/// * `not_after` - The end of the certificate's validity period.
/// * `subject` - The common name of the certificate subject.
/// * `subject_public_key` - The public key of the certificate subject.
pub struct TbsCertificate {
    pub serial_number: u64,
    pub signature_algorithm: SignatureAlgorithm,
    pub issuer: String,
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
    pub subject: String,
    pub subject_public_key: PublicKey,
}

impl TbsCertificate {
    /// Converts the `TbsCertificate` into a `TbsCertificateInner` for DER encoding.
    pub fn to_tbs_certificate_inner(&self) -> Result<TbsCertificateInner> {
        let validity = Validity {
            not_before: to_x509_time(self.not_before)?,
            not_after: to_x509_time(self.not_after)?,
        };

        Ok(TbsCertificateInner {
            version: Version::V3,
            serial_number: SerialNumber::new(&serial_bytes(self.serial_number))?,
            signature: self.signature_algorithm.algorithm_identifier()?,
            issuer: name::from_common_name(&self.issuer)?,
            validity,
            subject: name::from_common_name(&self.subject)?,
            subject_public_key_info: self.subject_public_key.to_x509spki()?,
            issuer_unique_id: None,
            subject_unique_id: None,
            extensions: None,
        })
    }
}

// UTCTime covers 1950..2049, later dates need GeneralizedTime.
fn to_x509_time(at: OffsetDateTime) -> Result<Time> {
    let system_time = SystemTime::from(at);
    if at.year() < 2050 {
        Ok(Time::UtcTime(UtcTime::from_system_time(system_time)?))
    } else {
        Ok(Time::GeneralTime(GeneralizedTime::from_system_time(
            system_time,
        )?))
    }
}

/// Minimal big-endian encoding of a positive serial number.
fn serial_bytes(serial: u64) -> Vec<u8> {
    let bytes = serial.to_be_bytes();
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len() - 1);
    let mut minimal = bytes[first..].to_vec();
    if minimal[0] & 0x80 != 0 {
        minimal.insert(0, 0);
    }
    minimal
}
