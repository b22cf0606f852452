//! WireGuard (X25519) identities.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::{rngs::OsRng, RngCore};
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;

/// Length of a raw Curve25519 key.
pub const KEY_LEN: usize = 32;

/// A base64-encoded key pair. The private half is wiped on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyPair {
    pub private_key: String,
    pub public_key: String,
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

/// Applies X25519 scalar clamping.
pub fn clamp(scalar: &mut [u8; KEY_LEN]) {
    scalar[0] &= 248;
    scalar[31] &= 127;
    scalar[31] |= 64;
}

/// Generates a fresh key pair from the OS random source.
pub fn generate() -> Result<KeyPair, CryptoError> {
    let mut private_key = [0u8; KEY_LEN];
    OsRng
        .try_fill_bytes(&mut private_key)
        .map_err(|e| CryptoError::Random(format!("failed to generate private key: {}", e)))?;
    clamp(&mut private_key);

    let secret = StaticSecret::from(private_key);
    let public = PublicKey::from(&secret);

    let pair = KeyPair {
        private_key: STANDARD.encode(private_key),
        public_key: STANDARD.encode(public.as_bytes()),
    };
    private_key.zeroize();
    Ok(pair)
}

/// Checks that `b64` decodes to exactly one Curve25519 key.
pub fn validate_public_key(b64: &str) -> Result<(), CryptoError> {
    let bytes = STANDARD
        .decode(b64)
        .map_err(|e| CryptoError::InvalidKey(format!("public key is not base64: {}", e)))?;
    if bytes.len() != KEY_LEN {
        return Err(CryptoError::InvalidKey(format!(
            "public key must be {} bytes, got {}",
            KEY_LEN,
            bytes.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use x25519_dalek::{x25519, X25519_BASEPOINT_BYTES};

    fn decode(b64: &str) -> [u8; KEY_LEN] {
        STANDARD.decode(b64).unwrap().try_into().unwrap()
    }

    #[test]
    fn public_key_is_the_clamped_scalar_times_the_base_point() {
        let pair = generate().unwrap();
        let private_key = decode(&pair.private_key);

        assert_eq!(x25519(private_key, X25519_BASEPOINT_BYTES), decode(&pair.public_key));
    }

    #[test]
    fn private_keys_come_out_clamped() {
        for _ in 0..16 {
            let private_key = decode(&generate().unwrap().private_key);
            assert_eq!(private_key[0] & 0b0000_0111, 0);
            assert_eq!(private_key[31] & 0b1000_0000, 0);
            assert_eq!(private_key[31] & 0b0100_0000, 0b0100_0000);
        }
    }

    #[test]
    fn encoding_is_lossless() {
        let pair = generate().unwrap();
        assert_eq!(STANDARD.encode(decode(&pair.private_key)), pair.private_key);
        assert_eq!(STANDARD.encode(decode(&pair.public_key)), pair.public_key);
        assert_eq!(pair.public_key.len(), 44);
    }

    #[test]
    fn clamp_fixes_extreme_scalars() {
        let mut ones = [0xffu8; KEY_LEN];
        clamp(&mut ones);
        assert_eq!(ones[0], 0xf8);
        assert_eq!(ones[31], 0x7f);

        let mut zeros = [0u8; KEY_LEN];
        clamp(&mut zeros);
        assert_eq!(zeros[31], 0x40);
    }

    #[test]
    fn validates_public_keys() {
        let pair = generate().unwrap();
        assert!(validate_public_key(&pair.public_key).is_ok());
        assert!(validate_public_key("not base64!").is_err());
        assert!(validate_public_key(&STANDARD.encode([1u8; 16])).is_err());
        assert!(validate_public_key("AAAA; rm -rf /").is_err());
    }
}
