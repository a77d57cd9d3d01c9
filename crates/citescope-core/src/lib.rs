//! Citescope core: work records, configuration, record storage.

pub mod config;
pub mod error;
pub mod models;
pub mod storage;

pub use config::AppConfig;
pub use error::{CitescopeError, ExitCode, Result};
pub use models::*;

pub use storage::json_records::JsonRecordStore;
pub use storage::memory::MemoryRecordStore;
pub use storage::network_file::{load_network, save_network};
pub use storage::{RecordStore, StoredRecord};
