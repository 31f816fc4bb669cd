use rand::Rng;
use sha2::{Digest, Sha256};

pub const RESET_TOKEN_TTL_MINUTES: i64 = 10;
pub const OTP_TTL_MINUTES: i64 = 5;

/// Random token embedded in password-reset links. 20 bytes of entropy,
/// hex-encoded.
pub fn generate_reset_token() -> String {
    let mut bytes = [0u8; 20];
    rand::thread_rng().fill(&mut bytes[..]);
    hex::encode(bytes)
}

/// Random 6-digit code for one-time login.
pub fn generate_otp() -> String {
    let code: u32 = rand::thread_rng().gen_range(100_000..1_000_000);
    code.to_string()
}

/// One-way hash stored in place of the raw token. Mirrors password storage
/// discipline: a database read alone cannot impersonate a user.
pub fn hash_token(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_tokens_are_40_hex_chars_and_unique() {
        let a = generate_reset_token();
        let b = generate_reset_token();
        assert_eq!(a.len(), 40);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn otp_is_always_six_digits() {
        for _ in 0..1000 {
            let code = generate_otp();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
            assert_ne!(code.as_bytes()[0], b'0');
        }
    }

    #[test]
    fn token_hash_is_deterministic_and_opaque() {
        let raw = "123456";
        let hash = hash_token(raw);
        assert_eq!(hash, hash_token(raw));
        assert_ne!(hash, raw);
        assert_eq!(hash.len(), 64);
        assert_ne!(hash_token("123457"), hash);
    }
}
