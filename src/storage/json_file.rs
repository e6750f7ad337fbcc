use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tokio::fs;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::warn;

use super::{PropertyFilter, Storage};
use crate::models::{HistoryEntry, Id, PropertyRecord};

/// JSON file-based storage implementation.
///
/// Directory structure:
/// ```text
/// data/
///   properties/
///     {id}/
///       property.json
///       history.jsonl
/// ```
///
/// A property and its history share one directory, so removing the
/// directory removes both.
pub struct JsonFileStorage {
    base_path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    fn properties_dir(&self) -> PathBuf {
        self.base_path.join("properties")
    }

    fn property_dir(&self, id: &Id) -> PathBuf {
        self.properties_dir().join(id.to_string())
    }

    fn property_file(&self, id: &Id) -> PathBuf {
        self.property_dir(id).join("property.json")
    }

    fn history_file(&self, id: &Id) -> PathBuf {
        self.property_dir(id).join("history.jsonl")
    }

    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create directory")?;
        }
        Ok(())
    }

    async fn read_json<T: for<'de> serde::Deserialize<'de>>(&self, path: &Path) -> Result<Option<T>> {
        match fs::read_to_string(path).await {
            Ok(content) => {
                let value = serde_json::from_str(&content)
                    .with_context(|| format!("Failed to parse JSON from {:?}", path))?;
                Ok(Some(value))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).context("Failed to read file"),
        }
    }

    async fn write_json<T: serde::Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        self.ensure_dir(path).await?;
        let content = serde_json::to_string_pretty(value).context("Failed to serialize JSON")?;
        fs::write(path, content)
            .await
            .context("Failed to write file")?;
        Ok(())
    }

    async fn read_jsonl<T: for<'de> serde::Deserialize<'de>>(&self, path: &Path) -> Result<Vec<T>> {
        let file = match fs::File::open(path).await {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).context("Failed to open file"),
        };

        let reader = BufReader::new(file);
        let mut lines = reader.lines();
        let mut items = Vec::new();

        while let Some(line) = lines.next_line().await.context("Failed to read line")? {
            if line.trim().is_empty() {
                continue;
            }
            let item: T = serde_json::from_str(&line)
                .with_context(|| format!("Failed to parse JSONL line: {}", line))?;
            items.push(item);
        }

        Ok(items)
    }

    async fn append_jsonl<T: serde::Serialize>(&self, path: &Path, item: &T) -> Result<()> {
        self.ensure_dir(path).await?;

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .context("Failed to open file for append")?;

        let line = serde_json::to_string(item).context("Failed to serialize item")?;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;

        Ok(())
    }

    async fn list_dirs(&self, path: &Path) -> Result<Vec<Id>> {
        let mut ids = Vec::new();

        let mut entries = match fs::read_dir(path).await {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ids),
            Err(e) => return Err(e).context("Failed to read directory"),
        };

        while let Some(entry) = entries.next_entry().await.context("Failed to read entry")? {
            if let Ok(file_type) = entry.file_type().await {
                if file_type.is_dir() {
                    if let Some(name) = entry.file_name().to_str() {
                        if !name.is_empty() {
                            ids.push(Id::from(name));
                        }
                    }
                }
            }
        }

        Ok(ids)
    }
}

#[async_trait::async_trait]
impl Storage for JsonFileStorage {
    async fn get_property(&self, id: &Id) -> Result<Option<PropertyRecord>> {
        self.read_json(&self.property_file(id)).await
    }

    async fn put_property(&self, record: &PropertyRecord) -> Result<()> {
        self.write_json(&self.property_file(&record.id), record).await
    }

    async fn delete_property(&self, id: &Id) -> Result<bool> {
        match fs::remove_dir_all(self.property_dir(id)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).context("Failed to remove property directory"),
        }
    }

    async fn list_properties(&self, filter: &PropertyFilter) -> Result<Vec<PropertyRecord>> {
        let ids = self.list_dirs(&self.properties_dir()).await?;
        let mut properties = Vec::new();

        for id in ids {
            // A directory that fails to parse should not take down the
            // whole listing.
            match self.get_property(&id).await {
                Ok(Some(record)) if filter.matches(&record) => properties.push(record),
                Ok(_) => {}
                Err(e) => {
                    warn!(id = %id, error = %e, "Skipping unreadable property record");
                }
            }
        }

        Ok(properties)
    }

    async fn find_by_url(&self, url: &str) -> Result<Option<PropertyRecord>> {
        let records = self.list_properties(&PropertyFilter::default()).await?;
        Ok(records.into_iter().find(|r| r.url.as_deref() == Some(url)))
    }

    async fn append_history(&self, entry: &HistoryEntry) -> Result<()> {
        self.append_jsonl(&self.history_file(&entry.property_id), entry)
            .await
    }

    async fn history_since(
        &self,
        property_id: &Id,
        since: DateTime<Utc>,
    ) -> Result<Vec<HistoryEntry>> {
        let mut entries: Vec<HistoryEntry> =
            self.read_jsonl(&self.history_file(property_id)).await?;
        entries.retain(|entry| entry.recorded_at >= since);
        entries.sort_by_key(|entry| entry.recorded_at);
        Ok(entries)
    }

    async fn delete_history(&self, property_id: &Id) -> Result<()> {
        match fs::remove_file(self.history_file(property_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).context("Failed to remove history file"),
        }
    }
}
