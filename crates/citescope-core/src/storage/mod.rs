pub mod json_records;
pub mod memory;
pub mod network_file;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::WorkRecord;

/// A persisted work record together with the crawl depth it was reached at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub depth: u32,
    pub fetched_at: DateTime<Utc>,
    #[serde(flatten)]
    pub record: WorkRecord,
}

impl StoredRecord {
    pub fn new(depth: u32, record: WorkRecord) -> Self {
        Self {
            depth,
            fetched_at: Utc::now(),
            record,
        }
    }
}

/// Persistence for fetched work records, addressed by `(depth, id)`.
///
/// Implementations decide the physical layout; callers only ever see the
/// logical depth.
pub trait RecordStore: Send + Sync {
    fn put(&self, depth: u32, record: &WorkRecord) -> Result<()>;

    fn get(&self, depth: u32, id: &str) -> Result<StoredRecord>;

    /// All records stored at exactly `depth`, in a stable order.
    fn list_depth(&self, depth: u32) -> Result<Vec<StoredRecord>>;

    /// Depths that currently hold at least one partition, ascending.
    fn depths(&self) -> Result<Vec<u32>>;

    /// Human-readable location used in error messages.
    fn location(&self) -> String;

    /// All records at depth `<= max_depth`, shallowest first.
    fn list_up_to(&self, max_depth: u32) -> Result<Vec<StoredRecord>> {
        let mut out = Vec::new();
        for depth in self.depths()?.into_iter().filter(|d| *d <= max_depth) {
            out.extend(self.list_depth(depth)?);
        }
        Ok(out)
    }
}

/// Filesystem-safe stem for a work identifier.
///
/// `https://openalex.org/W2741809807` becomes `W2741809807`. Any other
/// character outside `[A-Za-z0-9._-]` is replaced by `_`, and a stem that had
/// characters replaced gets a `-<hash>` suffix of the stripped id so that
/// `10.1/a b`, `10.1/a_b` and `10.1/a/b` land in different files.
pub fn file_stem(id: &str) -> String {
    let id = id
        .strip_prefix("https://openalex.org/")
        .or_else(|| id.strip_prefix("http://openalex.org/"))
        .unwrap_or(id);
    let mut replaced = false;
    let stem: String = id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                replaced = true;
                '_'
            }
        })
        .collect();
    if stem.is_empty() {
        "_".to_string()
    } else if replaced {
        format!("{stem}-{:08x}", fnv1a(id.as_bytes()))
    } else {
        stem
    }
}

// 32-bit FNV-1a; stable across runs and platforms, unlike `DefaultHasher`.
fn fnv1a(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0x811c_9dc5, |hash, b| {
        (hash ^ u32::from(*b)).wrapping_mul(0x0100_0193)
    })
}
