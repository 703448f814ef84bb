// src/cli.rs
use crate::config::{self, Config};
use crate::error::{AppError, AppResult};
use crate::models::Pass;
use crate::store::PassStore;
use crate::symbology::{renderer_id_for, Symbology};
use crate::vault::EncryptedFileStorage;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const PASSPHRASE_ENV: &str = "PASSBOOK_PASSPHRASE";

/// Keep barcode and QR passes in an encrypted vault.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the vault file (overrides the configured location)
    #[clap(long, global = true, value_parser)]
    pub vault: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Save a new pass
    Add {
        /// Display name for the pass
        #[clap(short, long)]
        name: String,
        /// Payload encoded in the barcode
        #[clap(short, long)]
        data: String,
        /// Symbology tag, e.g. qr, ean13, code128 (see `types`)
        #[clap(short = 't', long = "type")]
        kind: String,
    },
    /// List all saved passes
    List,
    /// Show a single pass
    Show {
        id: String,
    },
    /// Delete a pass
    Delete {
        id: String,
    },
    /// List the supported symbologies
    Types,
}

pub fn handle_cli_command(cli: Cli) -> AppResult<()> {
    log::debug!("Handling CLI command: {:?}", cli.command);

    match &cli.command {
        Commands::Types => {
            print_types();
            return Ok(());
        }
        Commands::Add { name, data, kind } => validate_new_pass(name, data, kind)?,
        _ => {}
    }

    let config = config::load_config();
    let vault_path = match cli.vault.or_else(|| config.resolve_vault_path()) {
        Some(path) => path,
        None => {
            return Err(AppError::Cli(
                "Could not determine a vault location; pass --vault <PATH>.".to_string(),
            ))
        }
    };
    let creating = creates_vault(&cli.command, vault_path.exists());
    let mut store = open_store(&config, &vault_path, creating)?;

    match cli.command {
        Commands::Add { name, data, kind } => {
            if Symbology::from_tag(&kind).is_none() {
                log::warn!("Unrecognised symbology tag {:?}; storing it as given", kind);
                eprintln!("Warning: {:?} is not a known symbology; it will be rendered as-is.", kind);
            }
            let pass = store.add(&name, &data, &kind);
            finish_write(&store)?;
            println!("Saved pass {:?} with id {}", pass.name, pass.id);
            log::info!("Added pass {} to {:?}", pass.id, vault_path);
        }
        Commands::List => {
            if store.is_empty() {
                println!("No passes saved.");
            } else {
                for pass in store.list() {
                    print_pass_line(pass);
                }
            }
            log::info!("Listed {} pass(es) from {:?}", store.len(), vault_path);
        }
        Commands::Show { id } => {
            let pass = store
                .get_by_id(&id)
                .ok_or_else(|| AppError::NotFound(id.clone()))?;
            println!("Id:       {}", pass.id);
            println!("Name:     {}", pass.name);
            println!("Type:     {} (renderer: {})", pass.kind, renderer_id_for(&pass.kind));
            if let Some(symbology) = pass.symbology() {
                let shape = if symbology.is_one_dimensional() { "linear" } else { "matrix" };
                println!("Shape:    {} ({})", shape, symbology);
            }
            println!("Data:     {}", pass.data);
        }
        Commands::Delete { id } => {
            if store.get_by_id(&id).is_none() {
                println!("No pass with id {}; nothing deleted.", id);
                return Ok(());
            }
            store.delete_by_id(&id);
            finish_write(&store)?;
            println!("Deleted pass {}", id);
            log::info!("Deleted pass {} from {:?}", id, vault_path);
        }
        Commands::Types => print_types(),
    }
    Ok(())
}

/// Only `add` can bring a new vault into existence, so only `add` confirms the passphrase.
fn creates_vault(command: &Commands, vault_exists: bool) -> bool {
    matches!(command, Commands::Add { .. }) && !vault_exists
}

/// A pass needs a name, a payload and a symbology before it is worth saving.
fn validate_new_pass(name: &str, data: &str, kind: &str) -> AppResult<()> {
    for (field, value) in [("Name", name), ("Data", data), ("Type", kind)] {
        if value.is_empty() {
            log::warn!("Refusing to add pass: {} is empty", field.to_lowercase());
            return Err(AppError::Cli(format!("{} cannot be empty.", field)));
        }
    }
    Ok(())
}

fn open_store(config: &Config, vault_path: &Path, creating: bool) -> AppResult<PassStore> {
    let passphrase = read_passphrase(creating)?;
    let storage = EncryptedFileStorage::open(vault_path, &passphrase, &config.argon2_params)?;
    Ok(PassStore::open(Arc::new(storage), &config.storage_key))
}

/// Waits for the background write and turns a failed save into an error.
fn finish_write(store: &PassStore) -> AppResult<()> {
    store.flush();
    match store.last_persist_error() {
        Some(error) => Err(AppError::Cli(format!(
            "The change was not saved and will be lost: {}",
            error
        ))),
        None => Ok(()),
    }
}

fn read_passphrase(creating: bool) -> AppResult<String> {
    if let Ok(passphrase) = std::env::var(PASSPHRASE_ENV) {
        if !passphrase.is_empty() {
            log::debug!("Using passphrase from {}", PASSPHRASE_ENV);
            return Ok(passphrase);
        }
    }

    let passphrase = rpassword::prompt_password("Vault passphrase: ").map_err(|e| {
        log::error!("Failed to read passphrase: {}", e);
        AppError::Cli(format!("Failed to read passphrase: {}", e))
    })?;
    if passphrase.is_empty() {
        return Err(AppError::Cli("Passphrase cannot be empty.".to_string()));
    }

    if creating {
        let confirm = rpassword::prompt_password("Confirm passphrase for new vault: ").map_err(|e| {
            log::error!("Failed to read passphrase confirmation: {}", e);
            AppError::Cli(format!("Failed to read passphrase confirmation: {}", e))
        })?;
        if passphrase != confirm {
            log::warn!("Passphrase confirmation failed: passphrases do not match.");
            return Err(AppError::Cli("Passphrases do not match.".to_string()));
        }
    }
    Ok(passphrase)
}

fn print_pass_line(pass: &Pass) {
    println!(
        "{}  {:<24} {:<12} {}",
        pass.id,
        pass.name,
        pass.kind,
        renderer_id_for(&pass.kind)
    );
}

fn print_types() {
    println!("{:<12} {:<20} shape", "tag", "renderer");
    for symbology in Symbology::ALL {
        let shape = if symbology.is_one_dimensional() { "linear" } else { "matrix" };
        println!("{:<12} {:<20} {}", symbology, symbology.renderer_id(), shape);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_add() {
        let cli = Cli::parse_from([
            "passbook", "add", "--name", "Work Badge", "--data", "12345", "--type", "qr",
        ]);
        match cli.command {
            Commands::Add { name, data, kind } => {
                assert_eq!(name, "Work Badge");
                assert_eq!(data, "12345");
                assert_eq!(kind, "qr");
            }
            other => panic!("Expected Add, got {:?}", other),
        }
        assert!(cli.vault.is_none());
    }

    #[test]
    fn test_parse_global_vault_after_subcommand() {
        let cli = Cli::parse_from(["passbook", "delete", "abc", "--vault", "/tmp/p.vault"]);
        assert_eq!(cli.vault, Some(PathBuf::from("/tmp/p.vault")));
        assert!(matches!(cli.command, Commands::Delete { ref id } if id == "abc"));
    }

    #[test]
    fn test_add_requires_type() {
        let result = Cli::try_parse_from(["passbook", "add", "--name", "x", "--data", "y"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_new_pass() {
        assert!(validate_new_pass("Work Badge", "12345", "qr").is_ok());
        for (name, data, kind, field) in [
            ("", "12345", "qr", "Name"),
            ("Work Badge", "", "qr", "Data"),
            ("Work Badge", "12345", "", "Type"),
        ] {
            match validate_new_pass(name, data, kind) {
                Err(AppError::Cli(msg)) => assert_eq!(msg, format!("{} cannot be empty.", field)),
                other => panic!("Expected empty {} to be rejected, got {:?}", field, other),
            }
        }
    }

    #[test]
    fn test_only_add_creates_vault() {
        let add = Commands::Add {
            name: "Gym".to_string(),
            data: "1".to_string(),
            kind: "qr".to_string(),
        };
        assert!(creates_vault(&add, false));
        assert!(!creates_vault(&add, true));
        assert!(!creates_vault(&Commands::List, false));
        assert!(!creates_vault(&Commands::Show { id: "x".to_string() }, false));
        assert!(!creates_vault(&Commands::Delete { id: "x".to_string() }, false));
    }

    #[test]
    fn test_add_with_empty_fields_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let vault = dir.path().join("passbook.vault");
        let vault_arg = vault.to_string_lossy().to_string();
        let cli = Cli::parse_from([
            "passbook", "--vault", vault_arg.as_str(), "add", "--name", "", "--data", "", "--type", "",
        ]);

        match handle_cli_command(cli) {
            Err(AppError::Cli(msg)) => assert!(msg.contains("cannot be empty"), "unexpected message: {}", msg),
            other => panic!("Expected empty pass to be rejected, got {:?}", other),
        }
        assert!(!vault.exists());
    }

    #[test]
    fn test_finish_write_reports_failed_save() {
        use crate::storage::MemoryStorage;

        let storage = Arc::new(MemoryStorage::new());
        storage.set_fail_writes(true);
        let mut store = PassStore::open(storage, "userPasses_v1");
        store.add("Badge", "1", "qr");
        match finish_write(&store) {
            Err(AppError::Cli(msg)) => assert!(msg.contains("not saved")),
            other => panic!("Expected CLI error for failed save, got {:?}", other),
        }
    }
}
