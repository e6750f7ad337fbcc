mod history;
mod id;
mod patch;
mod property;

pub use history::HistoryEntry;
pub use id::{Id, IdError};
pub use patch::{Patch, PropertyPatch};
pub use property::{PropertyRecord, PropertyStatus, Purpose, RentFrequency};
