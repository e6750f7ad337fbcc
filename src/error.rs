use thiserror::Error;

use crate::models::Id;

/// Errors surfaced at the tracker boundary.
///
/// Harvest failures do not appear here: the tracker absorbs them into the
/// record's `error` status rather than failing the caller.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("property not found: {0}")]
    NotFound(Id),

    /// Malformed input rejected before any storage or network work.
    #[error("invalid listing url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// A record for this listing URL already exists.
    #[error("url already tracked: {0}")]
    AlreadyTracked(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl TrackerError {
    pub fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }
}
