//! The merge core: fold a patch of observed or user-entered facts into a
//! property record without losing anything already known, decide whether the
//! value change is material enough for a history entry, and refresh every
//! derived metric.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::finance::{self, FinancialInputs};
use crate::models::{HistoryEntry, Patch, PropertyPatch, PropertyRecord};

/// Result of one reconciliation pass: the merged record plus the history
/// entry to append, when the value change warranted one.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub record: PropertyRecord,
    pub history: Option<HistoryEntry>,
}

/// Merge `patch` into `record` at time `now`.
///
/// Merge policy: every field the patch sets overwrites; every field it keeps
/// retains the stored value. A partial update can never null a field.
///
/// Materiality: a history entry is produced iff the patch sets a
/// `current_value` that strictly differs from the stored one. On a material
/// change `previous_value` takes the old value, and when that old value was
/// present and positive, `daily_change` and `daily_change_percent` (rounded
/// to two decimals) are computed against it; otherwise both are cleared.
/// An equal value leaves the value fields and history untouched even when
/// other fields change.
///
/// Every pass recomputes the full derived set, so a loan-only edit still
/// refreshes net value and cash flow. Status is untouched; lifecycle
/// transitions belong to the caller.
pub fn reconcile(
    mut record: PropertyRecord,
    patch: &PropertyPatch,
    now: DateTime<Utc>,
) -> Reconciliation {
    // Non-value fields merge first so the history entry sees the post-merge
    // loan.
    patch.nickname.apply_to(&mut record.nickname);
    patch.purpose.apply(&mut record.purpose);
    patch.address.apply_to(&mut record.address);
    patch.suburb.apply_to(&mut record.suburb);
    patch.state.apply_to(&mut record.state);
    patch.postcode.apply_to(&mut record.postcode);
    patch.image_url.apply_to(&mut record.image_url);
    patch.outstanding_loan.apply_to(&mut record.outstanding_loan);
    patch
        .monthly_loan_repayment
        .apply_to(&mut record.monthly_loan_repayment);
    patch.rent_amount.apply_to(&mut record.rent_amount);
    patch.rent_frequency.apply_to(&mut record.rent_frequency);
    patch.yearly_expenses.apply_to(&mut record.yearly_expenses);

    let mut history = None;
    if let Patch::Set(new_value) = patch.current_value {
        let prior = record.current_value;
        if prior != Some(new_value) {
            record.previous_value = prior;
            (record.daily_change, record.daily_change_percent) = match prior {
                Some(old) if old > Decimal::ZERO => {
                    let change = new_value - old;
                    let percent = (Decimal::ONE_HUNDRED * change / old).round_dp(2);
                    (Some(change), Some(percent))
                }
                _ => (None, None),
            };
            record.current_value = Some(new_value);
            history = Some(HistoryEntry::new(
                record.id.clone(),
                new_value,
                record.outstanding_loan,
                now,
            ));
        }
    }

    finance::derive(&FinancialInputs::from(&record)).apply_to(&mut record);
    record.last_updated = now;

    Reconciliation { record, history }
}
