// Knowledge compilation
// Turns item table rows into natural-language sentences and stores them for the embedding build

pub mod items;


use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::persist::write_atomically;

pub use items::{ItemRow, parse_item_table, read_item_table};

#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("Knowledge source not found: {0}")]
    MissingSource(PathBuf),

    #[error("Invalid item table: {0}")]
    InvalidTable(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One sentence of knowledge about a single item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeRecord {
    #[serde(rename = "itemId")]
    pub id: i64,
    pub sentence: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KnowledgeFile {
    knowledge_entries: Vec<KnowledgeRecord>,
}

/// Compile item rows into knowledge records.
///
/// Rows are deduplicated by id with the first occurrence winning, output keeps
/// first-seen order, and rows that describe to an empty sentence are dropped.
#[inline]
pub fn compile(rows: &[ItemRow]) -> Vec<KnowledgeRecord> {
    let mut seen = HashSet::with_capacity(rows.len());
    let mut records = Vec::with_capacity(rows.len());

    for row in rows {
        if !seen.insert(row.id) {
            debug!("Skipping duplicate item id {}", row.id);
            continue;
        }

        let sentence = describe(row);
        if sentence.is_empty() {
            debug!("Skipping item {} with no describable name", row.id);
            continue;
        }

        records.push(KnowledgeRecord {
            id: row.id,
            sentence,
        });
    }

    info!(
        "Compiled {} knowledge records from {} rows",
        records.len(),
        rows.len()
    );
    records
}

/// Render one row as a sentence, or an empty string when the row has no name
#[inline]
pub fn describe(row: &ItemRow) -> String {
    let name = row.name.trim();
    if name.is_empty() {
        return String::new();
    }

    let item_type = match row.item_type.trim() {
        "" | "0" => "unknown",
        other => other,
    };

    let article = if item_type.starts_with(['a', 'e', 'i', 'o', 'u', 'A', 'E', 'I', 'O', 'U']) {
        "an"
    } else {
        "a"
    };

    let mut parts = vec![format!("{} is {} {}-type item.", name, article, item_type)];

    let material = row.material_name.trim();
    if !material.is_empty() {
        parts.push(format!(
            "Crafting it requires {} x {}.",
            row.material_count, material
        ));
    }

    let reinforce = row.reinforce_name.trim();
    if !reinforce.is_empty() {
        parts.push(format!(
            "Reinforcing it to level {} requires {} x {}.",
            row.level, row.reinforce_count, reinforce
        ));
    }

    parts.join("\n")
}

/// Write compiled records as the knowledge file consumed by the store build
#[inline]
pub fn persist(records: &[KnowledgeRecord], path: &Path) -> Result<(), KnowledgeError> {
    let file = KnowledgeFile {
        knowledge_entries: records.to_vec(),
    };
    let json = serde_json::to_string_pretty(&file)?;
    write_atomically(path, &json)?;

    info!(
        "Wrote {} knowledge records to {}",
        records.len(),
        path.display()
    );
    Ok(())
}

/// Read a knowledge file written by [`persist`]
#[inline]
pub fn load(path: &Path) -> Result<Vec<KnowledgeRecord>, KnowledgeError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(KnowledgeError::MissingSource(path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };

    let file: KnowledgeFile = serde_json::from_str(&content)?;
    debug!(
        "Loaded {} knowledge records from {}",
        file.knowledge_entries.len(),
        path.display()
    );
    Ok(file.knowledge_entries)
}
