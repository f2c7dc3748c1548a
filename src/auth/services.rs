use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use rand::seq::SliceRandom;
use rand::Rng;
use regex::Regex;
use tracing::error;

const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";
const SYMBOLS: &[u8] = b"!@#$%^&*";

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

/// Username issued on approval: the member's name, lowercased, with
/// everything outside `[a-z0-9]` stripped ("Asha Rao" becomes "asharao").
pub fn derive_username(name: &str) -> String {
    let cleaned: String = name
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();
    if cleaned.is_empty() {
        "member".to_string()
    } else {
        cleaned
    }
}

/// Random password with at least one character from each class, padded to
/// `len` from the combined alphabet and shuffled so class order leaks nothing.
pub fn generate_password(len: usize) -> String {
    let mut rng = OsRng;
    let len = len.max(4);

    let mut chars: Vec<u8> = vec![
        LOWERCASE[rng.gen_range(0..LOWERCASE.len())],
        UPPERCASE[rng.gen_range(0..UPPERCASE.len())],
        DIGITS[rng.gen_range(0..DIGITS.len())],
        SYMBOLS[rng.gen_range(0..SYMBOLS.len())],
    ];
    let all: Vec<u8> = [LOWERCASE, UPPERCASE, DIGITS, SYMBOLS].concat();
    while chars.len() < len {
        chars.push(all[rng.gen_range(0..all.len())]);
    }
    chars.shuffle(&mut rng);

    chars.into_iter().map(char::from).collect()
}

/// Deterministic avatar URL, seeded by the member's email.
pub fn avatar_url(seed: &str) -> String {
    format!("https://api.dicebear.com/7.x/avataaars/svg?seed={seed}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let password = "Secur3P@ssw0rd!";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(hash != password, "hash must not be the plaintext");
        assert!(verify_password(password, &hash).expect("verify should succeed"));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let hash = hash_password("correct-horse-battery-staple").expect("hashing should succeed");
        assert!(!verify_password("wrong-password", &hash).expect("verify should not error"));
    }

    #[test]
    fn verify_errors_on_malformed_hash() {
        let err = verify_password("anything", "not-a-valid-hash").unwrap_err();
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn username_strips_whitespace_and_symbols() {
        assert_eq!(derive_username("Asha Rao"), "asharao");
        assert_eq!(derive_username("  Jean-Luc  O'Neil "), "jeanluconeil");
        assert_eq!(derive_username("Злата"), "member");
        assert_eq!(derive_username(""), "member");
        assert_eq!(derive_username("Dev 404"), "dev404");
    }

    #[test]
    fn generated_password_meets_complexity_rules() {
        for len in [4, 8, 12, 32] {
            let pw = generate_password(len);
            assert_eq!(pw.len(), len);
            assert!(pw.bytes().any(|b| LOWERCASE.contains(&b)), "{pw}: no lowercase");
            assert!(pw.bytes().any(|b| UPPERCASE.contains(&b)), "{pw}: no uppercase");
            assert!(pw.bytes().any(|b| DIGITS.contains(&b)), "{pw}: no digit");
            assert!(pw.bytes().any(|b| SYMBOLS.contains(&b)), "{pw}: no symbol");
        }
    }

    #[test]
    fn short_requests_are_padded_to_the_minimum() {
        assert_eq!(generate_password(1).len(), 4);
    }

    #[test]
    fn email_validation() {
        assert!(is_valid_email("asha@example.com"));
        assert!(!is_valid_email("asha@example"));
        assert!(!is_valid_email("not-an-email"));
    }
}
