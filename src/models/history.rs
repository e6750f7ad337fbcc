use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Id;

/// One observed valuation of a property.
/// One line in the JSONL file = one observation; entries are append-only and
/// only disappear when the property itself is deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub property_id: Id,
    pub value: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loan: Option<Decimal>,
    /// `value - loan` at observation time; absent when the loan was unknown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub net_value: Option<Decimal>,
    pub recorded_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(
        property_id: Id,
        value: Decimal,
        loan: Option<Decimal>,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            property_id,
            value,
            loan,
            net_value: loan.map(|loan| value - loan),
            recorded_at,
        }
    }
}
