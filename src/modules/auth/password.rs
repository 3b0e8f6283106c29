//! Salted password digests for stored users.
//!
//! Stored form is `salt$hex(sha256(salt ++ password))` with a random uuid
//! salt per user. Digests are only ever compared, never decoded.

use sha2::{Digest, Sha256};
use uuid::Uuid;

pub fn hash_password(password: &str) -> String {
    let salt = Uuid::new_v4().simple().to_string();
    format!("{salt}${}", digest(&salt, password))
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt, expected)) = stored.split_once('$') else {
        return false;
    };
    digest(salt, password) == expected
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hasher
        .finalize()
        .iter()
        .fold(String::with_capacity(64), |mut out, byte| {
            use std::fmt::Write;
            let _ = write!(out, "{byte:02x}");
            out
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_round_trips() {
        let stored = hash_password("hunter2secret");
        assert!(verify_password("hunter2secret", &stored));
        assert!(!verify_password("hunter2wrong", &stored));
    }

    #[test]
    fn hashes_are_salted() {
        assert_ne!(hash_password("same"), hash_password("same"));
    }

    #[test]
    fn malformed_stored_value_never_verifies() {
        assert!(!verify_password("anything", "no-separator-here"));
        assert!(!verify_password("anything", ""));
    }

    #[test]
    fn plaintext_is_not_stored() {
        let stored = hash_password("sekrit-password");
        assert!(!stored.contains("sekrit-password"));
    }
}
