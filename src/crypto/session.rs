use rand::{rngs::OsRng, RngCore};
use crate::error::CryptoError;

/// The size of a session secret in bytes (256 bits).
const SESSION_SECRET_SIZE: usize = 32;

/// Generates a new per-user session secret.
///
/// # Returns
///
/// The secret as 64 lowercase hex characters.
pub fn generate_session_secret() -> Result<String, CryptoError> {
    let mut secret = [0u8; SESSION_SECRET_SIZE];
    OsRng
        .try_fill_bytes(&mut secret)
        .map_err(|e| CryptoError::Random(format!("failed to generate session secret: {}", e)))?;

    Ok(hex::encode(secret))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secrets_are_256_bit_hex_and_distinct() {
        let a = generate_session_secret().unwrap();
        let b = generate_session_secret().unwrap();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }
}
