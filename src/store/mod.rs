// Vector store
// In-memory (id, sentence, embedding) records with a flat JSON snapshot and cosine search

pub mod shared;


use std::collections::HashSet;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::knowledge::KnowledgeRecord;
use crate::llm::{ClientError, EmbeddingClient};
use crate::persist::write_atomically;

pub use shared::SharedStore;

/// A knowledge sentence together with its embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    #[serde(rename = "itemId")]
    pub id: i64,
    pub sentence: String,
    pub embedding: Vec<f32>,
}

/// Best match returned by [`VectorStore::search`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit<'a> {
    pub record: &'a VectorRecord,
    pub similarity: f32,
}

/// Reported after each record is embedded during a build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildProgress {
    pub completed: usize,
    pub total: usize,
    pub item_id: i64,
}

/// A build aborted on the first record that could not be embedded
#[derive(Debug, Error)]
#[error("failed to embed item {failed_id}: {cause}")]
pub struct BuildFailure {
    pub failed_id: i64,
    pub cause: BuildCause,
}

#[derive(Debug, Error)]
pub enum BuildCause {
    #[error(transparent)]
    Embedding(#[from] ClientError),

    #[error("embedding is empty")]
    EmptyEmbedding,

    #[error("embedding contains non-finite values")]
    NonFinite,

    #[error("embedding has {actual} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("item id appears more than once")]
    DuplicateId,
}

#[derive(Debug, Error)]
pub enum LoadFailure {
    #[error("no vector snapshot found at {0}")]
    MissingSource(PathBuf),

    #[error("malformed vector snapshot: {0}")]
    Malformed(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VectorDatabase {
    vector_entries: Vec<VectorRecord>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VectorDatabaseRef<'a> {
    vector_entries: &'a [VectorRecord],
}

/// Immutable collection of embedded knowledge.
///
/// Every embedding has the same non-zero length and ids are unique. A store
/// is never edited in place; a rebuild produces a new instance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorStore {
    records: Vec<VectorRecord>,
    dimension: usize,
}

impl VectorStore {
    /// Validate and wrap records in build order
    #[inline]
    pub fn from_records(records: Vec<VectorRecord>) -> Result<Self, LoadFailure> {
        let mut dimension = 0;
        let mut ids = HashSet::with_capacity(records.len());

        for record in &records {
            if let Err(cause) = check_embedding(&record.embedding, dimension) {
                return Err(LoadFailure::Malformed(format!(
                    "item {}: {}",
                    record.id, cause
                )));
            }
            if !ids.insert(record.id) {
                return Err(LoadFailure::Malformed(format!(
                    "duplicate item id {}",
                    record.id
                )));
            }
            dimension = record.embedding.len();
        }

        Ok(Self { records, dimension })
    }

    /// Embed every record in order. The first failure aborts the whole build
    /// and nothing is returned for the records already embedded. Duplicate
    /// ids are rejected before any record is embedded.
    #[inline]
    pub async fn build<E, F>(
        records: &[KnowledgeRecord],
        embedder: &E,
        mut on_progress: F,
    ) -> Result<Self, BuildFailure>
    where
        E: EmbeddingClient + ?Sized,
        F: FnMut(BuildProgress) + Send,
    {
        let total = records.len();

        let mut ids = HashSet::with_capacity(total);
        if let Some(duplicate) = records.iter().find(|record| !ids.insert(record.id)) {
            return Err(BuildFailure {
                failed_id: duplicate.id,
                cause: BuildCause::DuplicateId,
            });
        }

        info!("Embedding {} knowledge records", total);

        let mut built = Vec::with_capacity(total);
        let mut dimension = 0;

        for (index, record) in records.iter().enumerate() {
            let failure = |cause: BuildCause| {
                error!("Embedding failed for item {}: {}", record.id, cause);
                BuildFailure {
                    failed_id: record.id,
                    cause,
                }
            };

            let embedding = embedder
                .embed(&record.sentence)
                .await
                .map_err(|e| failure(BuildCause::Embedding(e)))?;
            check_embedding(&embedding, dimension).map_err(failure)?;
            dimension = embedding.len();

            built.push(VectorRecord {
                id: record.id,
                sentence: record.sentence.clone(),
                embedding,
            });

            debug!("Processed item {}/{}", index + 1, total);
            on_progress(BuildProgress {
                completed: index + 1,
                total,
                item_id: record.id,
            });
        }

        info!(
            "Built vector store with {} records ({} dimensions)",
            built.len(),
            dimension
        );
        Ok(Self {
            records: built,
            dimension,
        })
    }

    /// Load a snapshot written by [`VectorStore::save`]
    #[inline]
    pub fn load(path: &Path) -> Result<Self, LoadFailure> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                error!("Vector snapshot not found at {}", path.display());
                return Err(LoadFailure::MissingSource(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };

        let database: VectorDatabase =
            serde_json::from_str(&content).map_err(|e| LoadFailure::Malformed(e.to_string()))?;
        let store = Self::from_records(database.vector_entries)?;

        info!(
            "Loaded vector store from {} with {} records",
            path.display(),
            store.len()
        );
        Ok(store)
    }

    /// Persist the snapshot, replacing any previous file only once fully written
    #[inline]
    pub fn save(&self, path: &Path) -> io::Result<()> {
        let database = VectorDatabaseRef {
            vector_entries: &self.records,
        };
        let json = serde_json::to_string_pretty(&database)?;
        write_atomically(path, &json)?;

        info!("Saved {} vector records to {}", self.len(), path.display());
        Ok(())
    }

    /// Return the record most similar to `query`, or `None` when the store is empty.
    /// Ties go to the record inserted first.
    #[inline]
    pub fn search(&self, query: &[f32]) -> Option<SearchHit<'_>> {
        let mut best: Option<SearchHit<'_>> = None;

        for record in &self.records {
            let similarity = cosine_similarity(query, &record.embedding);
            if best.is_none_or(|hit| similarity > hit.similarity) {
                best = Some(SearchHit { record, similarity });
            }
        }

        if let Some(hit) = &best {
            debug!(
                "Best match: item {} (similarity {:.4})",
                hit.record.id, hit.similarity
            );
        }
        best
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Embedding length shared by every record, 0 for an empty store
    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    pub fn records(&self) -> &[VectorRecord] {
        &self.records
    }
}

/// Cosine similarity in `[-1, 1]`.
///
/// Vectors of different lengths, and vectors with zero magnitude, score 0.
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let (dot, norm_a, norm_b) = a.iter().zip(b).fold(
        (0.0_f64, 0.0_f64, 0.0_f64),
        |(dot, norm_a, norm_b), (&x, &y)| {
            let (x, y) = (f64::from(x), f64::from(y));
            (x.mul_add(y, dot), x.mul_add(x, norm_a), y.mul_add(y, norm_b))
        },
    );

    let magnitude = norm_a.sqrt() * norm_b.sqrt();
    if magnitude == 0.0 {
        return 0.0;
    }

    let similarity = (dot / magnitude) as f32;
    if similarity.is_nan() { 0.0 } else { similarity }
}

/// `expected` of 0 means no dimension has been fixed yet
fn check_embedding(embedding: &[f32], expected: usize) -> Result<(), BuildCause> {
    if embedding.is_empty() {
        return Err(BuildCause::EmptyEmbedding);
    }
    if expected != 0 && embedding.len() != expected {
        return Err(BuildCause::DimensionMismatch {
            expected,
            actual: embedding.len(),
        });
    }
    if embedding.iter().any(|value| !value.is_finite()) {
        return Err(BuildCause::NonFinite);
    }
    Ok(())
}
