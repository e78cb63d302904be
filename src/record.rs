use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// The one persisted record type: a session timestamp
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct SessionRecord {
    /// Seconds since the Unix epoch
    pub timestamp: f64,
}

/// Append-only store of session records, one JSON line each.
///
/// Failure to create the store is the only fatal error in the program; it
/// propagates out of startup and terminates the process.
pub struct SessionStore {
    file: File,
    path: PathBuf,
}

impl SessionStore {
    /// Open (or create) the store at the given path
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .context(format!("Failed to create session directory: {}", parent.display()))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .context(format!("Failed to open session store: {}", path.display()))?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record
    pub fn record(&mut self, record: &SessionRecord) -> Result<()> {
        let line = serde_json::to_string(record).context("Failed to serialize session record")?;
        writeln!(self.file, "{}", line)
            .context(format!("Failed to append to session store: {}", self.path.display()))?;
        Ok(())
    }
}

/// Default store location under the user's config directory
pub fn default_store_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".config/motionview/sessions.jsonl")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_append_as_json_lines() {
        let dir = std::env::temp_dir().join(format!("motionview-store-{}", std::process::id()));
        fs::remove_dir_all(&dir).ok();
        let path = dir.join("sessions.jsonl");

        let mut store = SessionStore::create(&path).unwrap();
        store.record(&SessionRecord { timestamp: 1700000000.5 }).unwrap();
        store.record(&SessionRecord { timestamp: 1700000060.0 }).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let records: Vec<SessionRecord> = contents
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].timestamp, 1700000000.5);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_create_makes_parent_directories() {
        let dir = std::env::temp_dir().join(format!("motionview-nested-{}", std::process::id()));
        let path = dir.join("deep").join("sessions.jsonl");

        let store = SessionStore::create(&path).unwrap();
        assert_eq!(store.path(), path);
        assert!(path.exists());

        fs::remove_dir_all(&dir).ok();
    }
}
