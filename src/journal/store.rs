//! # Journal Persistence
//!
//! Entries live in a single JSON file. Writes go to a `.tmp` sibling first
//! and are moved into place with `rename()`, so a crash mid-write never
//! leaves a truncated journal behind.

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// One journal line.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    pub id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Entry {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            text: text.into(),
            created_at: Utc::now(),
        }
    }
}

/// On-disk layout.
#[derive(Serialize, Deserialize, Default, Debug)]
struct JournalFile {
    entries: Vec<Entry>,
}

#[derive(Clone, Debug)]
pub struct JournalStore {
    path: PathBuf,
}

impl JournalStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads all entries. A missing file is an empty journal.
    pub async fn load(&self) -> io::Result<Vec<Entry>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No journal at {}, starting empty", self.path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };
        let file: JournalFile = serde_json::from_slice(&bytes)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        info!(
            "Loaded {} entries from {}",
            file.entries.len(),
            self.path.display()
        );
        Ok(file.entries)
    }

    /// Replaces the journal with `entries`.
    pub async fn save(&self, entries: &[Entry]) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let file = JournalFile {
            entries: entries.to_vec(),
        };
        let json = serde_json::to_vec_pretty(&file)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!("Saved {} entries to {}", entries.len(), self.path.display());
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn temp_store() -> JournalStore {
    let dir = std::env::temp_dir().join(format!("lineloop-test-{}", uuid::Uuid::new_v4()));
    JournalStore::new(dir.join("journal.json"))
}
