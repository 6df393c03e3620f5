//! # aicp-cli
//!
//! Command-line interface for the AI control plane.
//!
//! ## Commands
//!
//! - `aicp chat <message>` — send a single completion request through the gateway
//! - `aicp run-eval <prompt>` — run a small demonstration pipeline over a prompt
//! - `aicp registry list|register|promote` — inspect and mutate the model registry

mod commands;

pub use commands::Cli;
