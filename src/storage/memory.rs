// src/storage/memory.rs
//! In-memory storage implementation for testing.

use std::collections::HashMap;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::{PropertyFilter, Storage};
use crate::models::{HistoryEntry, Id, PropertyRecord};

/// In-memory storage for testing purposes.
pub struct MemoryStorage {
    properties: Mutex<HashMap<Id, PropertyRecord>>,
    history: Mutex<HashMap<Id, Vec<HistoryEntry>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            properties: Mutex::new(HashMap::new()),
            history: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Storage for MemoryStorage {
    async fn get_property(&self, id: &Id) -> Result<Option<PropertyRecord>> {
        let properties = self.properties.lock().await;
        Ok(properties.get(id).cloned())
    }

    async fn put_property(&self, record: &PropertyRecord) -> Result<()> {
        let mut properties = self.properties.lock().await;
        properties.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn delete_property(&self, id: &Id) -> Result<bool> {
        let mut properties = self.properties.lock().await;
        Ok(properties.remove(id).is_some())
    }

    async fn list_properties(&self, filter: &PropertyFilter) -> Result<Vec<PropertyRecord>> {
        let properties = self.properties.lock().await;
        Ok(properties
            .values()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect())
    }

    async fn find_by_url(&self, url: &str) -> Result<Option<PropertyRecord>> {
        let properties = self.properties.lock().await;
        Ok(properties
            .values()
            .find(|record| record.url.as_deref() == Some(url))
            .cloned())
    }

    async fn append_history(&self, entry: &HistoryEntry) -> Result<()> {
        let mut history = self.history.lock().await;
        history
            .entry(entry.property_id.clone())
            .or_default()
            .push(entry.clone());
        Ok(())
    }

    async fn history_since(
        &self,
        property_id: &Id,
        since: DateTime<Utc>,
    ) -> Result<Vec<HistoryEntry>> {
        let history = self.history.lock().await;
        let mut entries: Vec<HistoryEntry> = history
            .get(property_id)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|entry| entry.recorded_at >= since)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        entries.sort_by_key(|entry| entry.recorded_at);
        Ok(entries)
    }

    async fn delete_history(&self, property_id: &Id) -> Result<()> {
        let mut history = self.history.lock().await;
        history.remove(property_id);
        Ok(())
    }
}
