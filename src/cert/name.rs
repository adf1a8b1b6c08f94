use core::str::FromStr;

use const_oid::ObjectIdentifier;
use der::asn1::{Ia5StringRef, PrintableStringRef};
use x509_cert::name::{Name, RdnSequence};

use crate::error::{IdentityError, Result};

/// `id-at-commonName`
pub const COMMON_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.3");

/// Returns the first common name attribute of an X.509 name.
///
/// UTF8String, PrintableString and IA5String values are accepted.
pub fn common_name(name: &Name) -> Option<String> {
    name.0
        .iter()
        .flat_map(|rdn| rdn.0.iter())
        .filter(|attr| attr.oid == COMMON_NAME)
        .find_map(|attr| {
            if let Ok(s) = attr.value.decode_as::<String>() {
                return Some(s);
            }
            if let Ok(s) = attr.value.decode_as::<PrintableStringRef<'_>>() {
                return Some(s.to_string());
            }
            attr.value
                .decode_as::<Ia5StringRef<'_>>()
                .ok()
                .map(|s| s.to_string())
        })
}

/// Builds a name holding a single common name attribute.
pub fn from_common_name(common_name: &str) -> Result<Name> {
    if common_name.is_empty() {
        return Err(IdentityError::MissingCommonName);
    }
    RdnSequence::from_str(&format!("CN={}", escape_rfc4514(common_name)))
        .map_err(|e| IdentityError::InvalidInput(e.to_string()))
}

fn escape_rfc4514(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for (i, c) in value.chars().enumerate() {
        let leading = i == 0 && (c == '#' || c == ' ');
        if leading || matches!(c, ',' | '+' | '"' | '\\' | '<' | '>' | ';') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    if escaped.ends_with(' ') && !escaped.ends_with("\\ ") {
        escaped.pop();
        escaped.push_str("\\ ");
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_name_round_trips_through_name() {
        let name = from_common_name("verid.client.identity").unwrap();
        assert_eq!(common_name(&name).as_deref(), Some("verid.client.identity"));
    }

    #[test]
    fn special_characters_are_escaped() {
        assert_eq!(escape_rfc4514("a,b"), "a\\,b");
        assert_eq!(escape_rfc4514("#x "), "\\#x\\ ");
    }

    #[test]
    fn empty_common_name_is_rejected() {
        assert_eq!(
            from_common_name("").unwrap_err(),
            IdentityError::MissingCommonName
        );
    }
}
