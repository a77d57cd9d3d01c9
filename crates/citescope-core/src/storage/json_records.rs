use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CitescopeError, Result};
use crate::models::WorkRecord;
use crate::storage::{RecordStore, StoredRecord, file_stem};

/// JSON-file record store: `{root}/depth-{d}/{stem}.json`.
#[derive(Debug, Clone)]
pub struct JsonRecordStore {
    root: PathBuf,
}

impl JsonRecordStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn depth_dir(&self, depth: u32) -> PathBuf {
        self.root.join(format!("depth-{depth}"))
    }

    pub fn record_path(&self, depth: u32, id: &str) -> PathBuf {
        self.depth_dir(depth).join(format!("{}.json", file_stem(id)))
    }
}

/// Load a single stored record from a JSON file.
pub fn load_record(path: &Path) -> Result<StoredRecord> {
    let contents = fs::read_to_string(path)?;
    let record: StoredRecord = serde_json::from_str(&contents)?;
    Ok(record)
}

fn parse_depth_dir(name: &str) -> Option<u32> {
    name.strip_prefix("depth-")?.parse().ok()
}

impl RecordStore for JsonRecordStore {
    fn put(&self, depth: u32, record: &WorkRecord) -> Result<()> {
        let dir = self.depth_dir(depth);
        fs::create_dir_all(&dir)?;
        let path = self.record_path(depth, &record.id);
        if path.exists()
            && let Ok(existing) = load_record(&path)
            && existing.record.id != record.id
        {
            tracing::warn!(
                id = %record.id,
                replaced = %existing.record.id,
                path = %path.display(),
                "record file already held a different id, overwriting"
            );
        }
        let stored = StoredRecord::new(depth, record.clone());
        let json = serde_json::to_string_pretty(&stored)?;
        fs::write(&path, json)?;
        tracing::debug!(id = %record.id, path = %path.display(), "stored record");
        Ok(())
    }

    fn get(&self, depth: u32, id: &str) -> Result<StoredRecord> {
        let path = self.record_path(depth, id);
        if !path.exists() {
            return Err(CitescopeError::RecordNotFound(format!("{id} (depth {depth})")));
        }
        load_record(&path)
    }

    fn list_depth(&self, depth: u32) -> Result<Vec<StoredRecord>> {
        let dir = self.depth_dir(depth);
        if !dir.is_dir() {
            return Err(CitescopeError::DirectoryNotFound(dir.display().to_string()));
        }

        let mut paths = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut records = Vec::with_capacity(paths.len());
        for path in paths {
            match load_record(&path) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!("skipping invalid record {}: {e}", path.display());
                }
            }
        }
        Ok(records)
    }

    fn depths(&self) -> Result<Vec<u32>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let mut depths = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(depth) = entry.file_name().to_str().and_then(parse_depth_dir) {
                depths.push(depth);
            }
        }
        depths.sort_unstable();
        Ok(depths)
    }

    fn location(&self) -> String {
        self.root.display().to_string()
    }
}
