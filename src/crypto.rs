// src/crypto.rs
use crate::config::Argon2Params;
use crate::error::{CryptoError, CryptoResult};

use argon2::Argon2;
use chacha20poly1305::{
    aead::{Aead, NewAead, Payload},
    ChaCha20Poly1305, Key, Nonce,
};
use rand::rngs::OsRng;
use rand::RngCore;

pub const SALT_LEN: usize = 16;
pub const NONCE_LEN: usize = 12;
pub const KEY_LEN: usize = 32;
/// Poly1305 authentication tag appended to every ciphertext.
pub const TAG_LEN: usize = 16;

/// Encrypts data using ChaCha20Poly1305.
pub fn encrypt_data(data: &[u8], key_bytes: &[u8; KEY_LEN], nonce_bytes: &[u8; NONCE_LEN]) -> CryptoResult<Vec<u8>> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key_bytes));
    let nonce = Nonce::from_slice(nonce_bytes);

    cipher
        .encrypt(nonce, Payload { msg: data, aad: &[] })
        .map_err(|e| {
            let msg = format!("Encryption failed: {}", e);
            log::error!("encrypt_data: {}", msg);
            CryptoError::ChaCha(msg)
        })
}

/// Decrypts data using ChaCha20Poly1305.
///
/// Fails on a wrong key, a wrong nonce or tampered ciphertext; the AEAD tag
/// does not distinguish between them.
pub fn decrypt_data(encrypted_data: &[u8], key_bytes: &[u8; KEY_LEN], nonce_bytes: &[u8; NONCE_LEN]) -> CryptoResult<Vec<u8>> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key_bytes));
    let nonce = Nonce::from_slice(nonce_bytes);

    cipher
        .decrypt(nonce, Payload { msg: encrypted_data, aad: &[] })
        .map_err(|e| {
            let msg = format!("Decryption failed (key/nonce/data mismatch?): {}", e);
            log::warn!("decrypt_data: {}", msg);
            CryptoError::ChaCha(msg)
        })
}

pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    salt
}

pub fn generate_nonce() -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

/// Derives a 32-byte vault key from a passphrase and salt using Argon2id.
pub fn derive_key(passphrase: &str, salt: &[u8], argon2_config: &Argon2Params) -> CryptoResult<[u8; KEY_LEN]> {
    let params = argon2::Params::new(argon2_config.m_cost, argon2_config.t_cost, argon2_config.p_cost, Some(KEY_LEN))
        .map_err(|e| {
            let msg = format!("Argon2 params error for key derivation: {}", e);
            log::error!("derive_key: {}", msg);
            CryptoError::Argon2(msg)
        })?;
    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let mut key_bytes = [0u8; KEY_LEN];
    argon2
        .hash_password_into(passphrase.as_bytes(), salt, &mut key_bytes)
        .map_err(|e| {
            let msg = format!("Key derivation failed: {}", e);
            log::error!("derive_key: {}", msg);
            CryptoError::Argon2(msg)
        })?;

    Ok(key_bytes)
}
