//! Storage layer for the file index.
//!
//! The store is a flat path-keyed map. It validates every write and can
//! report aggregate figures used by the statistics and health score.

mod store;

pub use store::{estimated_entry_bytes, validate_entry, EntryRejection, IndexStore, StoreStatistics};
