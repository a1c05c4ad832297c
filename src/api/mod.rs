mod types;
mod client;
mod memory;
mod store;

pub use types::*;
pub use client::SupabaseClient;
pub use memory::{MemoryStore, StoreCall};
pub use store::{fetch_all, to_record, Entity, RecordStore, Select, StoreError, StoreResult, LESSON_COLUMNS};
