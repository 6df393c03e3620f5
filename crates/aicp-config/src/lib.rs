//! # aicp-config
//!
//! Operational configuration for the control plane: default retry, circuit
//! breaker, and provider-timeout tunables, plus the model registry file
//! path. Reads `aicp.toml`, then applies environment overrides.
//!
//! Provider API keys are never read through this crate — by convention they
//! come exclusively from `OPENAI_API_KEY` / `GEMINI_API_KEY`, resolved
//! directly by each provider at construction time.

pub mod loader;
pub mod schema;

pub use loader::ConfigLoader;
pub use schema::{AicpConfig, CircuitBreakerConfig, LoggingConfig, ReliabilityConfig, RegistryConfig};
