//! # aicp-registry
//!
//! A durable registry of model versions, backed by an atomically-written
//! JSON file on disk. Tracks which version of a named model is in staging,
//! production, or archived.

pub mod atomic;
pub mod registry;

pub use registry::{ModelRegistry, ModelStatus, ModelVersion};
