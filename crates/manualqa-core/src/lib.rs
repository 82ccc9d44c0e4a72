//! manualqa-core
//!
//! Shared domain types, collaborator traits, configuration and the
//! block-aware chunker used by the ingestion and query paths.

pub mod chunker;
pub mod config;
pub mod error;
pub mod extract;
pub mod traits;
pub mod types;
