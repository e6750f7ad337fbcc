mod json_file;
mod memory;

pub use json_file::JsonFileStorage;
pub use memory::MemoryStorage;

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::models::{HistoryEntry, Id, PropertyRecord, Purpose};

/// Filter for property listings. All present criteria must hold.
#[derive(Debug, Clone, Default)]
pub struct PropertyFilter {
    /// Case-insensitive substring match over address, nickname or suburb.
    pub search: Option<String>,
    /// Case-insensitive substring match over suburb only.
    pub suburb: Option<String>,
    /// Exact purpose match.
    pub purpose: Option<Purpose>,
}

impl PropertyFilter {
    pub fn matches(&self, record: &PropertyRecord) -> bool {
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let hit = [&record.address, &record.nickname, &record.suburb]
                .into_iter()
                .flatten()
                .any(|field| field.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }

        if let Some(suburb) = &self.suburb {
            let needle = suburb.to_lowercase();
            match &record.suburb {
                Some(actual) if actual.to_lowercase().contains(&needle) => {}
                _ => return false,
            }
        }

        if let Some(purpose) = self.purpose {
            if record.purpose != purpose {
                return false;
            }
        }

        true
    }
}

/// Storage trait for persisting property records and their value history.
#[async_trait::async_trait]
pub trait Storage: Send + Sync {
    // Properties
    async fn get_property(&self, id: &Id) -> Result<Option<PropertyRecord>>;
    async fn put_property(&self, record: &PropertyRecord) -> Result<()>;
    /// Delete a stored record. Returns false when the property was not
    /// tracked. Callers removing a property also call `delete_history`;
    /// backends that key everything by one directory may already have
    /// dropped the history here.
    async fn delete_property(&self, id: &Id) -> Result<bool>;
    /// Matching records in no particular order; callers sort.
    async fn list_properties(&self, filter: &PropertyFilter) -> Result<Vec<PropertyRecord>>;
    async fn find_by_url(&self, url: &str) -> Result<Option<PropertyRecord>>;

    // History
    async fn append_history(&self, entry: &HistoryEntry) -> Result<()>;
    /// Entries at or after `since`, ascending by observation time.
    async fn history_since(
        &self,
        property_id: &Id,
        since: DateTime<Utc>,
    ) -> Result<Vec<HistoryEntry>>;
    /// Drop every history entry for a property. Not an error when none exist.
    async fn delete_history(&self, property_id: &Id) -> Result<()>;
}
