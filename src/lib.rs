pub mod audit;
pub mod config;
pub mod document;
pub mod entry;
pub mod error;
pub mod query;
pub mod storage;
pub mod store;

#[cfg(test)]
mod test_helpers;

pub use entry::EntryRecord;
pub use error::{HistoryError, StorageError, ValidationError};
pub use query::QueryFacade;
pub use store::HistoryStore;
