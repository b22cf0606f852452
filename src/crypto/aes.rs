use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::{rngs::OsRng, RngCore};
use crate::error::CryptoError;

/// The size of the AES-256 key in bytes.
pub const KEY_SIZE: usize = 32;
/// The size of the AES-GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;

fn cipher(key: &[u8]) -> Result<Aes256Gcm, CryptoError> {
    let key: &[u8; KEY_SIZE] = key
        .try_into()
        .map_err(|_| CryptoError::InvalidKey(format!("master key must be {} bytes", KEY_SIZE)))?;
    Ok(Aes256Gcm::new(key.into()))
}

/// Seals a secret under the master key.
///
/// # Returns
///
/// `ciphertext || nonce`, with the 12-byte nonce at the end.
pub fn seal(key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = cipher(key)?;

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    OsRng
        .try_fill_bytes(&mut nonce_bytes)
        .map_err(|e| CryptoError::Random(e.to_string()))?;
    let nonce = Nonce::from(nonce_bytes);

    let mut sealed = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| CryptoError::Cipher(format!("Encryption failed: {}", e)))?;
    sealed.extend_from_slice(&nonce_bytes);

    Ok(sealed)
}

/// Opens a value produced by [`seal`].
pub fn open(key: &[u8], sealed: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if sealed.len() < NONCE_SIZE {
        return Err(CryptoError::Cipher("sealed value too short".to_string()));
    }
    let cipher = cipher(key)?;
    let (ciphertext, nonce) = sealed.split_at(sealed.len() - NONCE_SIZE);
    let nonce: [u8; NONCE_SIZE] = nonce
        .try_into()
        .map_err(|_| CryptoError::Cipher("invalid nonce".to_string()))?;

    cipher
        .decrypt(&Nonce::from(nonce), ciphertext)
        .map_err(|e| CryptoError::Cipher(format!("Decryption failed: {}", e)))
}
