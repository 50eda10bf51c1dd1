//! ChaCha20-Poly1305 sealing of values and keys.
//!
//! Sealed values travel as base64 of `nonce || ciphertext || tag`.

use crate::error::{CryptoError, CryptoResult};
use crate::key::{SessionKey, SymmetricKey};
use base64::{engine::general_purpose::STANDARD, Engine};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use rand::RngCore;

/// Size of nonce in bytes (96 bits for ChaCha20-Poly1305).
pub const NONCE_SIZE: usize = 12;

/// Size of authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// Ciphertext plus the nonce it was sealed with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SealedData {
    pub nonce: [u8; NONCE_SIZE],
    /// Ciphertext including the auth tag.
    pub ciphertext: Vec<u8>,
}

impl SealedData {
    pub fn to_base64(&self) -> String {
        let mut bytes = Vec::with_capacity(NONCE_SIZE + self.ciphertext.len());
        bytes.extend_from_slice(&self.nonce);
        bytes.extend_from_slice(&self.ciphertext);
        STANDARD.encode(&bytes)
    }

    pub fn from_base64(encoded: &str) -> CryptoResult<Self> {
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|e| CryptoError::Decryption(format!("invalid base64: {e}")))?;

        if bytes.len() < NONCE_SIZE + TAG_SIZE {
            return Err(CryptoError::Decryption("data too short".to_string()));
        }

        let mut nonce = [0u8; NONCE_SIZE];
        nonce.copy_from_slice(&bytes[..NONCE_SIZE]);
        Ok(Self {
            nonce,
            ciphertext: bytes[NONCE_SIZE..].to_vec(),
        })
    }
}

/// Seals `plaintext` under `key` with a fresh random nonce.
pub fn seal(key: &SymmetricKey, plaintext: &[u8]) -> CryptoResult<SealedData> {
    let cipher = ChaCha20Poly1305::new(key.as_bytes().into());

    let mut nonce = [0u8; NONCE_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut nonce);

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;

    Ok(SealedData { nonce, ciphertext })
}

/// Opens data sealed by [`seal`].
pub fn open(key: &SymmetricKey, sealed: &SealedData) -> CryptoResult<Vec<u8>> {
    let cipher = ChaCha20Poly1305::new(key.as_bytes().into());
    cipher
        .decrypt(Nonce::from_slice(&sealed.nonce), sealed.ciphertext.as_ref())
        .map_err(|_| {
            CryptoError::Decryption("decryption failed (wrong key or tampered data)".to_string())
        })
}

/// Seals a string and returns the base64 encoding.
pub fn seal_string(key: &SymmetricKey, plaintext: &str) -> CryptoResult<String> {
    Ok(seal(key, plaintext.as_bytes())?.to_base64())
}

/// Opens a base64 string produced by [`seal_string`].
pub fn open_string(key: &SymmetricKey, encoded: &str) -> CryptoResult<String> {
    let plaintext = open(key, &SealedData::from_base64(encoded)?)?;
    String::from_utf8(plaintext)
        .map_err(|e| CryptoError::Decryption(format!("invalid UTF-8: {e}")))
}

/// Wraps a session key with a group key, base64-encoded for the wire.
pub fn wrap_key(group_key: &SymmetricKey, session_key: &SessionKey) -> CryptoResult<String> {
    Ok(seal(group_key, session_key.as_bytes())?.to_base64())
}

/// Unwraps a session key previously wrapped by [`wrap_key`].
pub fn unwrap_key(group_key: &SymmetricKey, wrapped: &str) -> CryptoResult<SessionKey> {
    let bytes = open(group_key, &SealedData::from_base64(wrapped)?)?;
    SymmetricKey::from_slice(&bytes)
}
