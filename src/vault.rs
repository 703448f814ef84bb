// src/vault.rs
use crate::config::Argon2Params;
use crate::crypto::{self, KEY_LEN, NONCE_LEN, SALT_LEN, TAG_LEN};
use crate::error::{StorageError, StorageResult};
use crate::storage::SecureStorage;
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

struct VaultState {
    salt: [u8; SALT_LEN],
    key: [u8; KEY_LEN],
    entries: BTreeMap<String, String>,
}

/// Secure storage backed by a single passphrase-encrypted vault file.
///
/// The file format is:
/// [SALT (SALT_LEN bytes)] [NONCE (NONCE_LEN bytes)] [ENCRYPTED bincode(map) (...)]
///
/// The key is derived once at open time. Every `set` rewrites the whole
/// vault with a fresh nonce; the salt stays fixed for the vault's lifetime.
pub struct EncryptedFileStorage {
    path: PathBuf,
    state: Mutex<VaultState>,
}

impl EncryptedFileStorage {
    /// Opens the vault at `path`, or prepares a new one if the file does not exist.
    /// Nothing is written until the first `set`.
    pub fn open(path: &Path, passphrase: &str, argon2_config: &Argon2Params) -> StorageResult<Self> {
        let state = if path.exists() {
            log::info!("Opening vault at {:?}", path);
            read_vault(path, passphrase, argon2_config)?
        } else {
            log::info!("No vault at {:?}; a new one will be created on first write", path);
            let salt = crypto::generate_salt();
            let key = crypto::derive_key(passphrase, &salt, argon2_config)?;
            VaultState { salt, key, entries: BTreeMap::new() }
        };

        Ok(EncryptedFileStorage {
            path: path.to_path_buf(),
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> StorageResult<std::sync::MutexGuard<'_, VaultState>> {
        self.state
            .lock()
            .map_err(|_| StorageError::Unavailable("vault lock poisoned".to_string()))
    }
}

impl SecureStorage for EncryptedFileStorage {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.lock()?.entries.get(key).cloned())
    }

    fn set(&self, key: &str, blob: &str) -> StorageResult<()> {
        let mut state = self.lock()?;
        let mut entries = state.entries.clone();
        entries.insert(key.to_string(), blob.to_string());

        write_vault(&self.path, &state.salt, &state.key, &entries)?;
        // Cache only what made it to disk.
        state.entries = entries;
        Ok(())
    }
}

fn read_vault(filepath: &Path, passphrase: &str, argon2_config: &Argon2Params) -> StorageResult<VaultState> {
    let mut file = File::open(filepath).map_err(|e| {
        log::error!("Failed to open vault file {:?}: {:?}", filepath, e);
        StorageError::Io(e)
    })?;

    let mut file_contents = Vec::new();
    file.read_to_end(&mut file_contents).map_err(|e| {
        log::error!("Failed to read vault file {:?}: {:?}", filepath, e);
        StorageError::Io(e)
    })?;

    if file_contents.len() < SALT_LEN + NONCE_LEN + TAG_LEN {
        let msg = format!(
            "File {:?} is too short to contain salt, nonce and tag (len: {})",
            filepath,
            file_contents.len()
        );
        log::error!("read_vault: {}", msg);
        return Err(StorageError::Format(msg));
    }

    let mut salt = [0u8; SALT_LEN];
    salt.copy_from_slice(&file_contents[..SALT_LEN]);
    let mut nonce = [0u8; NONCE_LEN];
    nonce.copy_from_slice(&file_contents[SALT_LEN..SALT_LEN + NONCE_LEN]);
    let encrypted_data = &file_contents[SALT_LEN + NONCE_LEN..];

    let key = crypto::derive_key(passphrase, &salt, argon2_config)?;
    let decrypted_data = crypto::decrypt_data(encrypted_data, &key, &nonce).map_err(|e| {
        log::warn!(
            "Decryption failed for vault {:?}. Wrong passphrase or corrupted data? Error: {:?}",
            filepath,
            e
        );
        StorageError::Crypto(e)
    })?;

    let entries: BTreeMap<String, String> = bincode::deserialize(&decrypted_data).map_err(|e| {
        let msg = format!("Bincode deserialization failed: {}", e);
        log::error!("read_vault: {}", msg);
        StorageError::Deserialization(msg)
    })?;

    log::info!("Vault {:?} opened with {} key(s)", filepath, entries.len());
    Ok(VaultState { salt, key, entries })
}

fn write_vault(
    filepath: &Path,
    salt: &[u8; SALT_LEN],
    key: &[u8; KEY_LEN],
    entries: &BTreeMap<String, String>,
) -> StorageResult<()> {
    let serialized_data = bincode::serialize(entries).map_err(|e| {
        let msg = format!("Bincode serialization failed: {}", e);
        log::error!("write_vault: {}", msg);
        StorageError::Serialization(msg)
    })?;

    let nonce = crypto::generate_nonce();
    let encrypted_data = crypto::encrypt_data(&serialized_data, key, &nonce)?;

    if let Some(parent_dir) = filepath.parent() {
        if !parent_dir.as_os_str().is_empty() && !parent_dir.exists() {
            fs::create_dir_all(parent_dir)?;
            log::info!("Created vault directory: {:?}", parent_dir);
        }
    }

    // Write beside the vault and rename over it so a crash never leaves half a file.
    let tmp_path = filepath.with_extension("vault.tmp");
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&tmp_path)
        .map_err(|e| {
            log::error!("Failed to open file {:?} for writing: {:?}", tmp_path, e);
            StorageError::Io(e)
        })?;

    file.write_all(salt)?;
    file.write_all(&nonce)?;
    file.write_all(&encrypted_data)?;
    file.sync_all()?;
    drop(file);

    fs::rename(&tmp_path, filepath).map_err(|e| {
        log::error!("Failed to move {:?} into place at {:?}: {:?}", tmp_path, filepath, e);
        StorageError::Io(e)
    })?;

    log::debug!("Vault written to {:?} ({} key(s))", filepath, entries.len());
    Ok(())
}
