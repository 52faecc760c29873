pub mod error;
pub mod log;
pub mod store;

pub use error::{Result, StoreError};
pub use log::EventLog;
pub use store::{EventStore, JsonFileStore, MemoryStore};
