//! assessa-store — Record storage, question sources, and configuration.
//!
//! Implements the `RecordStore` and `QuestionSource` traits from
//! `assessa-core` on top of the local filesystem, plus an in-memory store
//! for tests.

pub mod config;
pub mod file;
pub mod memory;

pub use config::{load_config, load_config_from, AssessaConfig, CatalogEntry};
pub use file::{DirectorySource, FileRecordStore};
pub use memory::MemoryStore;
