// src/models.rs
use crate::error::{StorageError, StorageResult};
use crate::symbology::Symbology;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A saved scannable code: a named payload plus the symbology it renders as.
///
/// Field names match the persisted JSON layout (`id`, `name`, `data`, `type`).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Pass {
    pub id: String,
    pub name: String,
    pub data: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl Pass {
    // Only the store mints passes.
    pub(crate) fn new(name: String, data: String, kind: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            data,
            kind,
        }
    }

    /// The recognised symbology for this pass, if its tag is one we know.
    pub fn symbology(&self) -> Option<Symbology> {
        Symbology::from_tag(&self.kind)
    }
}

/// Serializes the whole list into the blob written under the storage key.
pub fn encode_passes(passes: &[Pass]) -> StorageResult<String> {
    serde_json::to_string(passes).map_err(|e| {
        let msg = format!("JSON serialization failed: {}", e);
        log::error!("encode_passes: {}", msg);
        StorageError::Serialization(msg)
    })
}

/// Parses a stored blob back into the pass list.
pub fn decode_passes(blob: &str) -> StorageResult<Vec<Pass>> {
    serde_json::from_str(blob).map_err(|e| {
        let msg = format!("JSON deserialization failed: {}", e);
        log::error!("decode_passes: {}", msg);
        StorageError::Deserialization(msg)
    })
}
