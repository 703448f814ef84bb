// src/lib.rs
//! Saved barcode/QR passes, kept in secure storage.
//!
//! [`store::PassStore`] owns the pass list and persists it in the background
//! through any [`storage::SecureStorage`]. [`vault::EncryptedFileStorage`] is
//! the on-disk implementation used by the `passbook` binary.

pub mod cli;
pub mod config;
pub mod crypto;
pub mod error;
pub mod models;
pub mod storage;
pub mod store;
pub mod symbology;
pub mod vault;

pub use error::{AppError, AppResult, StorageError, StorageResult};
pub use models::Pass;
pub use storage::{MemoryStorage, SecureStorage};
pub use store::{PassStore, PersistOutcome, SubscriptionId};
pub use symbology::Symbology;
