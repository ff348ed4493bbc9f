//! File-backed knowledge store
//!
//! One pretty-printed JSON document per deployment. Each write becomes the
//! current entry and is appended to the revision history.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::GatewayError;
use crate::gateway::KnowledgeStore;

/// Stored knowledge document
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredEntry {
    /// Deployment name
    pub name: String,

    /// Latest data written
    pub current: Value,

    /// Timestamp of the latest write
    pub updated_at: DateTime<Utc>,

    /// Past writes, oldest first (includes the current one)
    pub history: Vec<Revision>,
}

/// One write to a knowledge entry
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Revision {
    pub id: String,
    pub recorded_at: DateTime<Utc>,
    pub data: Value,
}

pub struct JsonKnowledgeStore {
    base_dir: PathBuf,
    max_history: usize,
    write_lock: Mutex<()>,
}

impl JsonKnowledgeStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            max_history: 0,
            write_lock: Mutex::new(()),
        }
    }

    /// Default location under the user data directory
    pub fn default_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("saas-orchestrator")
            .join("knowledge")
    }

    /// Keep at most `max` revisions per entry; 0 keeps all
    pub fn with_max_history(mut self, max: usize) -> Self {
        self.max_history = max;
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn entry_path(&self, name: &str) -> PathBuf {
        self.base_dir.join(format!("{}.json", file_stem(name)))
    }

    /// Load the stored entry for `name`, if any
    pub async fn load(&self, name: &str) -> Result<Option<StoredEntry>> {
        let path = self.entry_path(name);
        if !path.exists() {
            return Ok(None);
        }
        let content = tokio::fs::read(&path)
            .await
            .with_context(|| format!("Failed to read knowledge entry: {}", path.display()))?;
        let entry = serde_json::from_slice(&content)
            .with_context(|| format!("Failed to parse knowledge entry: {}", path.display()))?;
        Ok(Some(entry))
    }

    /// Names of all stored entries, sorted
    pub async fn list(&self) -> Result<Vec<String>> {
        if !self.base_dir.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.base_dir)
            .await
            .context("Failed to read knowledge directory")?;
        while let Some(item) = dir.next_entry().await? {
            let path = item.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                if let Some(entry) = self.load_path(&path).await? {
                    names.push(entry.name);
                }
            }
        }
        names.sort();
        Ok(names)
    }

    async fn load_path(&self, path: &Path) -> Result<Option<StoredEntry>> {
        let content = tokio::fs::read(path).await?;
        Ok(serde_json::from_slice(&content).ok())
    }

    async fn write(&self, name: &str, data: &Value) -> Result<StoredEntry> {
        let _guard = self.write_lock.lock().await;

        let now = Utc::now();
        let revision = Revision {
            id: generate_revision_id(now),
            recorded_at: now,
            data: data.clone(),
        };

        let mut entry = match self.load(name).await? {
            Some(entry) => entry,
            None => StoredEntry {
                name: name.to_string(),
                current: Value::Null,
                updated_at: now,
                history: Vec::new(),
            },
        };
        entry.current = data.clone();
        entry.updated_at = now;
        entry.history.push(revision);
        if self.max_history > 0 && entry.history.len() > self.max_history {
            let excess = entry.history.len() - self.max_history;
            entry.history.drain(..excess);
        }

        tokio::fs::create_dir_all(&self.base_dir)
            .await
            .with_context(|| format!("Failed to create {}", self.base_dir.display()))?;

        let path = self.entry_path(name);
        let tmp = path.with_extension("json.tmp");
        let content = serde_json::to_vec_pretty(&entry).context("Failed to serialize entry")?;
        tokio::fs::write(&tmp, content)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("Failed to replace {}", path.display()))?;

        debug!("Saved knowledge entry to {}", path.display());
        Ok(entry)
    }
}

#[async_trait]
impl KnowledgeStore for JsonKnowledgeStore {
    async fn update_entry(&self, name: &str, data: &Value) -> Result<(), GatewayError> {
        let entry = self
            .write(name, data)
            .await
            .map_err(|e| GatewayError::knowledge(format!("{e:#}")))?;
        info!(deployment = %name, revisions = entry.history.len(), "Knowledge entry updated");
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "json"
    }
}

/// Revision id: timestamp plus a random suffix
fn generate_revision_id(now: DateTime<Utc>) -> String {
    let timestamp = now.format("%Y%m%d_%H%M%S");
    let random: u32 = rand::random::<u32>() % 10000;
    format!("{timestamp}_{random:04}")
}

/// Filesystem-safe stem for a deployment name.
///
/// Bytes outside `[A-Za-z0-9._-]` are percent-encoded, so distinct names
/// never share a file.
fn file_stem(name: &str) -> String {
    let mut stem = String::with_capacity(name.len());
    for byte in name.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.') {
            stem.push(char::from(byte));
        } else {
            stem.push_str(&format!("%{byte:02X}"));
        }
    }
    stem
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_update_creates_entry() {
        let dir = tempdir().unwrap();
        let store = JsonKnowledgeStore::new(dir.path());

        store
            .update_entry("acme", &json!({ "region": "eu-west-1" }))
            .await
            .unwrap();

        let entry = store.load("acme").await.unwrap().unwrap();
        assert_eq!(entry.name, "acme");
        assert_eq!(entry.current["region"], "eu-west-1");
        assert_eq!(entry.history.len(), 1);
    }

    #[tokio::test]
    async fn test_history_accumulates_and_trims() {
        let dir = tempdir().unwrap();
        let store = JsonKnowledgeStore::new(dir.path()).with_max_history(2);

        for version in 1..=3 {
            store
                .update_entry("acme", &json!({ "version": version }))
                .await
                .unwrap();
        }

        let entry = store.load("acme").await.unwrap().unwrap();
        assert_eq!(entry.current["version"], 3);
        assert_eq!(entry.history.len(), 2);
        assert_eq!(entry.history[0].data["version"], 2);
    }

    #[tokio::test]
    async fn test_opaque_data_is_stored_verbatim() {
        let dir = tempdir().unwrap();
        let store = JsonKnowledgeStore::new(dir.path());

        store.update_entry("acme", &json!([1, "two", null])).await.unwrap();
        let entry = store.load("acme").await.unwrap().unwrap();
        assert_eq!(entry.current, json!([1, "two", null]));
    }

    #[tokio::test]
    async fn test_list_and_unsafe_names() {
        let dir = tempdir().unwrap();
        let store = JsonKnowledgeStore::new(dir.path().join("kb"));
        assert!(store.list().await.unwrap().is_empty());

        store.update_entry("globex", &json!({})).await.unwrap();
        store.update_entry("team/acme", &json!({})).await.unwrap();

        assert!(dir.path().join("kb").join("team%2Facme.json").exists());
        assert_eq!(store.list().await.unwrap(), vec!["globex", "team/acme"]);
        assert!(store.load("initech").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_similar_names_keep_separate_entries() {
        let dir = tempdir().unwrap();
        let store = JsonKnowledgeStore::new(dir.path());

        store.update_entry("team/acme", &json!({ "owner": "a" })).await.unwrap();
        store.update_entry("team_acme", &json!({ "owner": "b" })).await.unwrap();
        store.update_entry("team%2Facme", &json!({ "owner": "c" })).await.unwrap();

        let slashed = store.load("team/acme").await.unwrap().unwrap();
        assert_eq!(slashed.current, json!({ "owner": "a" }));
        assert_eq!(slashed.history.len(), 1);
        assert_eq!(
            store.list().await.unwrap(),
            vec!["team%2Facme", "team/acme", "team_acme"]
        );
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("acme-prod_1.eu"), "acme-prod_1.eu");
        assert_eq!(file_stem("team/acme"), "team%2Facme");
        assert_eq!(file_stem("50%"), "50%25");
        assert_eq!(file_stem("café"), "caf%C3%A9");
    }

    #[tokio::test]
    async fn test_unwritable_dir_is_knowledge_error() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "not a directory").unwrap();
        let store = JsonKnowledgeStore::new(blocker.join("kb"));

        let err = store.update_entry("acme", &json!({})).await.unwrap_err();
        assert!(matches!(err, GatewayError::Knowledge { .. }));
    }

    #[test]
    fn test_revision_id_format() {
        let id = generate_revision_id(Utc::now());
        assert_eq!(id.len(), "20260101_120000_0000".len());
    }
}
