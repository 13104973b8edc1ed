//! assessa-core — Question graphs, branching, scoring, and profiles.
//!
//! This crate defines the assessment data model, the branch resolver that
//! decides which questions are shown, score aggregation, macro profile
//! normalization, and the engine that drives sessions to durable records.

pub mod engine;
pub mod error;
pub mod history;
pub mod model;
pub mod parser;
pub mod profile;
pub mod record;
pub mod resolver;
pub mod scoring;
pub mod session;
pub mod traits;
