//! Authenticated encryption for the vault blob
//!
//! Blob layout: `MAGIC (8) || nonce (12) || ciphertext || tag (16)`.
//! Every parse or authentication failure collapses into [`CryptoError`].

use chacha20poly1305::{aead::Aead, ChaCha20Poly1305, KeyInit, Nonce};
use rand::RngCore;
use zeroize::Zeroizing;

/// Symmetric key length in bytes
pub const KEY_LEN: usize = 32;

/// ChaCha20-Poly1305 nonce length
pub const NONCE_LEN: usize = 12;

/// Poly1305 tag length
pub const TAG_LEN: usize = 16;

/// Header identifying a vault blob
pub const BLOB_MAGIC: &[u8; 8] = b"SFMVLT01";

/// Opaque decryption/authentication failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CryptoError;

pub type VaultKey = Zeroizing<[u8; KEY_LEN]>;

/// Generate a fresh random key from the OS RNG
pub fn generate_key() -> VaultKey {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    rand::rngs::OsRng.fill_bytes(&mut *key);
    key
}

/// Interpret raw key file contents
pub fn key_from_bytes(bytes: &[u8]) -> Option<VaultKey> {
    if bytes.len() != KEY_LEN {
        return None;
    }
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    key.copy_from_slice(bytes);
    Some(key)
}

/// Encrypt `plaintext` under `key` with a fresh random nonce
pub fn encrypt(key: &[u8; KEY_LEN], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let mut nonce = [0u8; NONCE_LEN];
    rand::rngs::OsRng.fill_bytes(&mut nonce);

    let cipher = ChaCha20Poly1305::new_from_slice(key).map_err(|_| CryptoError)?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|_| CryptoError)?;

    let mut blob = Vec::with_capacity(BLOB_MAGIC.len() + NONCE_LEN + ciphertext.len());
    blob.extend_from_slice(BLOB_MAGIC);
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

/// Decrypt and authenticate a blob produced by [`encrypt`]
pub fn decrypt(key: &[u8; KEY_LEN], blob: &[u8]) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    let header_len = BLOB_MAGIC.len() + NONCE_LEN;
    if blob.len() < header_len + TAG_LEN {
        return Err(CryptoError);
    }
    if &blob[..BLOB_MAGIC.len()] != BLOB_MAGIC {
        return Err(CryptoError);
    }

    let nonce = Nonce::from_slice(&blob[BLOB_MAGIC.len()..header_len]);
    let cipher = ChaCha20Poly1305::new_from_slice(key).map_err(|_| CryptoError)?;

    cipher
        .decrypt(nonce, &blob[header_len..])
        .map(Zeroizing::new)
        .map_err(|_| CryptoError)
}
