use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::Id;

/// What the owner uses the property for.
/// Cash-flow metrics only apply to investment properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Purpose {
    Investment,
    PrimaryResidence,
}

impl Purpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            Purpose::Investment => "investment",
            Purpose::PrimaryResidence => "primary_residence",
        }
    }
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cadence of a quoted rent figure. Derivation normalizes everything to monthly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RentFrequency {
    Weekly,
    Monthly,
}

impl RentFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            RentFrequency::Weekly => "weekly",
            RentFrequency::Monthly => "monthly",
        }
    }
}

impl fmt::Display for RentFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a tracked property.
///
/// `Pending` until the first harvest or manual update succeeds, `Active`
/// after any successful reconciliation, `Error` after a failed harvest.
/// Error is recoverable: the next successful pass returns the record to
/// `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyStatus {
    Pending,
    Active,
    Error,
}

impl PropertyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyStatus::Pending => "pending",
            PropertyStatus::Active => "active",
            PropertyStatus::Error => "error",
        }
    }
}

impl fmt::Display for PropertyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One tracked real-estate asset: identity, location, user-entered financial
/// facts, and the metrics derived from them.
///
/// All money fields are optional: absent means "not known yet", never zero.
/// Derived fields are recomputed on every reconciliation and should not be
/// written directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyRecord {
    pub id: Id,
    /// Listing URL this record was created from, if any. Manual records have none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    pub purpose: Purpose,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suburb: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postcode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_value: Option<Decimal>,
    /// Value held before the most recent material change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_value: Option<Decimal>,
    /// `current_value - previous_value`; only set when a previous value existed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_change: Option<Decimal>,
    /// Percent change against the previous value, rounded to two decimals.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_change_percent: Option<Decimal>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outstanding_loan: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_loan_repayment: Option<Decimal>,
    /// Rent as quoted, interpreted through `rent_frequency`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rent_amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rent_frequency: Option<RentFrequency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yearly_expenses: Option<Decimal>,

    // Derived financials. Recomputed in full on every reconciliation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_rent: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub net_value: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annual_rental_income: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annual_loan_repayments: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yearly_cash_flow: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yearly_shortage: Option<Decimal>,

    pub status: PropertyStatus,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl PropertyRecord {
    /// Create an empty record with a fresh id. Starts `Pending`; callers that
    /// supply facts directly promote it on their first reconciliation.
    pub fn new(purpose: Purpose, now: DateTime<Utc>) -> Self {
        Self::new_with(Id::new(), purpose, now)
    }

    pub fn new_with(id: Id, purpose: Purpose, now: DateTime<Utc>) -> Self {
        Self {
            id,
            url: None,
            nickname: None,
            purpose,
            address: None,
            suburb: None,
            state: None,
            postcode: None,
            image_url: None,
            current_value: None,
            previous_value: None,
            daily_change: None,
            daily_change_percent: None,
            outstanding_loan: None,
            monthly_loan_repayment: None,
            rent_amount: None,
            rent_frequency: None,
            yearly_expenses: None,
            monthly_rent: None,
            net_value: None,
            annual_rental_income: None,
            annual_loan_repayments: None,
            yearly_cash_flow: None,
            yearly_shortage: None,
            status: PropertyStatus::Pending,
            created_at: now,
            last_updated: now,
        }
    }

    pub fn is_investment(&self) -> bool {
        self.purpose == Purpose::Investment
    }

    /// Best human label for the record: nickname, then address, then URL, then id.
    pub fn display_name(&self) -> &str {
        self.nickname
            .as_deref()
            .or(self.address.as_deref())
            .or(self.url.as_deref())
            .unwrap_or_else(|| self.id.as_str())
    }
}
