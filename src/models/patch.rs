use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};

use super::{Purpose, RentFrequency};

/// Presence marker for a single writable field in a partial update.
///
/// `Keep` means the caller did not supply the field and the stored value
/// stays; `Set` overwrites it. This keeps "absent" distinguishable from any
/// real value, so a partial update can never null a field by accident.
/// Clearing a field back to unknown is deliberately not expressible.
///
/// In JSON, a missing field deserializes to `Keep` and a present value to
/// `Set`; struct fields using `Patch` pair it with
/// `#[serde(default, skip_serializing_if = "Patch::is_keep")]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Patch<T> {
    Keep,
    Set(T),
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Patch::Keep
    }
}

impl<T> Patch<T> {
    pub fn is_keep(&self) -> bool {
        matches!(self, Patch::Keep)
    }

    pub fn is_set(&self) -> bool {
        matches!(self, Patch::Set(_))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Patch::Keep => None,
            Patch::Set(value) => Some(value),
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Patch::Keep => None,
            Patch::Set(value) => Some(value),
        }
    }
}

impl<T: Clone> Patch<T> {
    /// Overwrite an optional slot when set; leave it alone when kept.
    pub fn apply_to(&self, slot: &mut Option<T>) {
        if let Patch::Set(value) = self {
            *slot = Some(value.clone());
        }
    }

    /// Overwrite a required slot when set; leave it alone when kept.
    pub fn apply(&self, slot: &mut T) {
        if let Patch::Set(value) = self {
            *slot = value.clone();
        }
    }
}

impl<T> From<Option<T>> for Patch<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Patch::Set(value),
            None => Patch::Keep,
        }
    }
}

impl<T: Serialize> Serialize for Patch<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Patch::Keep => serializer.serialize_none(),
            Patch::Set(value) => value.serialize(serializer),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        T::deserialize(deserializer).map(Patch::Set)
    }
}

/// Everything a caller (or a harvest) may change about a property in one
/// reconciliation pass. Defaults to all-`Keep`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PropertyPatch {
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub nickname: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub purpose: Patch<Purpose>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub address: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub suburb: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub state: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub postcode: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub image_url: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub current_value: Patch<Decimal>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub outstanding_loan: Patch<Decimal>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub monthly_loan_repayment: Patch<Decimal>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub rent_amount: Patch<Decimal>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub rent_frequency: Patch<RentFrequency>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub yearly_expenses: Patch<Decimal>,
}

impl PropertyPatch {
    /// Patch that only sets a new observed value.
    pub fn value_only(value: Decimal) -> Self {
        Self {
            current_value: Patch::Set(value),
            ..Self::default()
        }
    }

    /// Field-wise overlay: fields set on `self` win, everything else falls
    /// back to `base`. Used at creation to let caller-supplied facts override
    /// the URL-derived floor.
    pub fn over(self, base: PropertyPatch) -> PropertyPatch {
        fn pick<T>(primary: Patch<T>, fallback: Patch<T>) -> Patch<T> {
            if primary.is_set() {
                primary
            } else {
                fallback
            }
        }

        PropertyPatch {
            nickname: pick(self.nickname, base.nickname),
            purpose: pick(self.purpose, base.purpose),
            address: pick(self.address, base.address),
            suburb: pick(self.suburb, base.suburb),
            state: pick(self.state, base.state),
            postcode: pick(self.postcode, base.postcode),
            image_url: pick(self.image_url, base.image_url),
            current_value: pick(self.current_value, base.current_value),
            outstanding_loan: pick(self.outstanding_loan, base.outstanding_loan),
            monthly_loan_repayment: pick(self.monthly_loan_repayment, base.monthly_loan_repayment),
            rent_amount: pick(self.rent_amount, base.rent_amount),
            rent_frequency: pick(self.rent_frequency, base.rent_frequency),
            yearly_expenses: pick(self.yearly_expenses, base.yearly_expenses),
        }
    }
}
