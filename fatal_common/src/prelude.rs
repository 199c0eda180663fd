//! Prelude module for common re-exports.
//!
//! ```rust
//! use fatal_common::prelude::*;
//! ```

// ─── Logging ────────────────────────────────────────────────────────
pub use crate::config::LogLevel;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, SharedConfig};
pub use crate::fatal::{CrashSignal, FatalErrorConfig, ProbeConfig};

// ─── Constants ──────────────────────────────────────────────────────
pub use crate::consts::{CRASH_BANNER, CRASH_FOOTER, DEFAULT_CONFIG_PATH};
