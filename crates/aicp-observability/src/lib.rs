//! # aicp-observability
//!
//! Ambient logging and metrics setup shared by every binary in the
//! workspace: structured `tracing` output with secret masking, and a
//! Prometheus metrics recorder with the control plane's named series.

pub mod logging;
pub mod metrics;

pub use logging::setup_logging;
pub use metrics::init_metrics;
