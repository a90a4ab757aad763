//! Small helpers shared by the auth handlers.

use base64::{engine::general_purpose::STANDARD as BASE_64, Engine};
use regex::Regex;

/// Normalize an email for lookup/uniqueness checks.
pub(super) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
pub(super) fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}

/// Decode a base64 request field, with the field name in the error message.
pub(super) fn decode_base64_field(value: &str, field: &str) -> Result<Vec<u8>, String> {
    BASE_64
        .decode(value.trim())
        .map_err(|_| format!("Invalid base64 in {field}"))
}

pub(super) fn encode_base64(value: &[u8]) -> String {
    BASE_64.encode(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_and_whitespace() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn validates_email_shape() {
        assert!(valid_email("alice@example.com"));
        assert!(!valid_email("alice"));
        assert!(!valid_email("alice@example"));
        assert!(!valid_email("a lice@example.com"));
    }

    #[test]
    fn rejects_bad_base64_with_the_field_name() {
        let err = decode_base64_field("not base64!!!", "client_proof").unwrap_err();
        assert!(err.contains("client_proof"));
        assert_eq!(decode_base64_field("c2FsdA==", "salt").as_deref(), Ok(b"salt".as_ref()));
    }
}
