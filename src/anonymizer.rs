//! Irreversible transforms applied to sensitive fields before they leave the
//! pipeline.

use secrecy::{ExposeSecret as _, SecretString};
use sha2::{Digest as _, Sha256};

/// Mask returned when a card number has fewer than four digits.
pub const FULL_CARD_MASK: &str = "XXXX-XXXX-XXXX-XXXX";

const CARD_MASK_PREFIX: &str = "XXXX-XXXX-XXXX-";

/// Salted SHA-256 hasher.
///
/// The same value and salt always produce the same digest, so anonymized
/// columns stay joinable across tables and reruns are idempotent.
#[derive(Clone)]
pub struct Anonymizer {
    salt: SecretString,
}

impl std::fmt::Debug for Anonymizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Anonymizer")
            .field("salt", &"[REDACTED]")
            .finish()
    }
}

impl Anonymizer {
    pub fn new(salt: SecretString) -> Self {
        Self { salt }
    }

    /// Lowercase hex SHA-256 of `salt ‖ value`, or `None` for absent input.
    pub fn hash_value(&self, value: Option<&str>) -> Option<String> {
        let value = value?;
        let mut hasher = Sha256::new();
        hasher.update(self.salt.expose_secret().as_bytes());
        hasher.update(value.as_bytes());
        let hash = hasher.finalize();
        Some(format!("{hash:x}"))
    }
}

/// Display form of a card number keeping only the last four digits.
pub fn mask_card(card: &str) -> String {
    let digits: Vec<char> = card.chars().filter(char::is_ascii_digit).collect();
    match digits.len().checked_sub(4).and_then(|start| digits.get(start..)) {
        Some(last_four) => {
            let mut masked = CARD_MASK_PREFIX.to_owned();
            masked.extend(last_four);
            masked
        }
        None => FULL_CARD_MASK.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anonymizer(salt: &str) -> Anonymizer {
        Anonymizer::new(SecretString::from(salt.to_owned()))
    }

    #[test]
    fn test_hash_matches_salted_sha256() {
        // sha256("hello world") with an empty salt
        let hash = anonymizer("").hash_value(Some("hello world")).unwrap();
        assert_eq!(
            hash,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
        // salt is a plain prefix
        assert_eq!(
            anonymizer("hello ").hash_value(Some("world")),
            Some(hash)
        );
    }

    #[test]
    fn test_hash_deterministic() {
        let a = anonymizer("MI_SALT");
        let first = a.hash_value(Some("12345678Z"));
        let second = a.hash_value(Some("12345678Z"));
        assert_eq!(first, second);
        assert_eq!(first.as_ref().map(String::len), Some(64));
    }

    #[test]
    fn test_hash_salt_sensitive() {
        let first = anonymizer("salt-a").hash_value(Some("12345678Z"));
        let second = anonymizer("salt-b").hash_value(Some("12345678Z"));
        assert_ne!(first, second);
    }

    #[test]
    fn test_hash_absent() {
        assert_eq!(anonymizer("salt").hash_value(None), None);
    }

    #[test]
    fn test_debug_hides_salt() {
        let rendered = format!("{:?}", anonymizer("super-secret"));
        assert!(!rendered.contains("super-secret"));
    }

    #[test]
    fn test_mask_card() {
        assert_eq!(mask_card("4111 1111 1111 1234"), "XXXX-XXXX-XXXX-1234");
        assert_eq!(mask_card("4111-1111-1111-9876"), "XXXX-XXXX-XXXX-9876");
        assert_eq!(mask_card("1234"), "XXXX-XXXX-XXXX-1234");
        assert_eq!(mask_card("12"), FULL_CARD_MASK);
        assert_eq!(mask_card(""), FULL_CARD_MASK);
    }
}
