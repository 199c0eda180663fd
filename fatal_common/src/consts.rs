//! Workspace-wide constants.
//!
//! Single source of truth for default paths and crash-dump framing.

/// Default probe configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/fatal/probe.toml";

/// Default service name when none is configured.
pub const DEFAULT_SERVICE_NAME: &str = "fatal-probe";

/// First line written to the crash sink before any handler runs.
pub const CRASH_BANNER: &str = "=== fatal error: collecting subsystem diagnostics ===";

/// Last line written to the crash sink after all handlers ran.
pub const CRASH_FOOTER: &str = "=== end of fatal error diagnostics ===";
