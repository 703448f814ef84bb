// src/error.rs
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Argon2 key derivation failed: {0}")]
    Argon2(String),
    #[error("ChaCha20Poly1305 operation failed: {0}")]
    ChaCha(String),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Deserialization error: {0}")]
    Deserialization(String),
    #[error("Vault format error: {0}")]
    Format(String),
    #[error("Cryptography error during storage operation: {0}")]
    Crypto(#[from] CryptoError),
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Pass not found: {0}")]
    NotFound(String),
    #[error("CLI error: {0}")]
    Cli(String),
}

pub type AppResult<T> = Result<T, AppError>;
pub type CryptoResult<T> = Result<T, CryptoError>;
pub type StorageResult<T> = Result<T, StorageError>;
