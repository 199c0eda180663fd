//! Fatal error registry and crash trap settings.
//!
//! # TOML Example
//!
//! ```toml
//! [shared]
//! service_name = "edge-proxy-01"
//!
//! [fatal_error]
//! enabled = true
//! free_list_after_invoke = true
//! install_signal_trap = true
//! signals = ["SIGSEGV", "SIGBUS", "SIGILL", "SIGFPE", "SIGABRT"]
//! ```
//!
//! Every key in `[fatal_error]` is optional, and the table itself may be
//! omitted.

use crate::config::{ConfigError, SharedConfig};
use serde::{Deserialize, Serialize};

/// Signals that indicate an unrecoverable fault in the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CrashSignal {
    /// Invalid memory reference.
    #[serde(rename = "SIGSEGV")]
    Segv,
    /// Bus error (bad memory access).
    #[serde(rename = "SIGBUS")]
    Bus,
    /// Illegal instruction.
    #[serde(rename = "SIGILL")]
    Ill,
    /// Floating-point exception.
    #[serde(rename = "SIGFPE")]
    Fpe,
    /// Abort, raised by `abort()` and failed assertions.
    #[serde(rename = "SIGABRT")]
    Abrt,
}

impl CrashSignal {
    /// Every supported crash signal, in the default trap order.
    pub const ALL: [CrashSignal; 5] = [
        CrashSignal::Segv,
        CrashSignal::Bus,
        CrashSignal::Ill,
        CrashSignal::Fpe,
        CrashSignal::Abrt,
    ];

    /// Raw signal number.
    pub const fn as_raw(self) -> i32 {
        match self {
            CrashSignal::Segv => libc::SIGSEGV,
            CrashSignal::Bus => libc::SIGBUS,
            CrashSignal::Ill => libc::SIGILL,
            CrashSignal::Fpe => libc::SIGFPE,
            CrashSignal::Abrt => libc::SIGABRT,
        }
    }

    /// Conventional signal name, e.g. `"SIGSEGV"`.
    pub const fn name(self) -> &'static str {
        match self {
            CrashSignal::Segv => "SIGSEGV",
            CrashSignal::Bus => "SIGBUS",
            CrashSignal::Ill => "SIGILL",
            CrashSignal::Fpe => "SIGFPE",
            CrashSignal::Abrt => "SIGABRT",
        }
    }

    /// Map a raw signal number back to a crash signal.
    pub fn from_raw(raw: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_raw() == raw)
    }
}

impl std::fmt::Display for CrashSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

fn default_true() -> bool {
    true
}

fn default_signals() -> Vec<CrashSignal> {
    CrashSignal::ALL.to_vec()
}

/// `[fatal_error]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FatalErrorConfig {
    /// Runtime switch for the whole registry. When `false`, register,
    /// remove and invoke are no-ops and no handler list is allocated.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Free the handler list on the crash path after the handlers ran.
    ///
    /// Set to `false` on targets whose allocator must not be entered from
    /// a signal handler; the list is then leaked instead.
    #[serde(default = "default_true")]
    pub free_list_after_invoke: bool,

    /// Install the crash signal trap at startup.
    #[serde(default = "default_true")]
    pub install_signal_trap: bool,

    /// Signals routed to the fatal error handlers.
    #[serde(default = "default_signals")]
    pub signals: Vec<CrashSignal>,
}

impl Default for FatalErrorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            free_list_after_invoke: true,
            install_signal_trap: true,
            signals: default_signals(),
        }
    }
}

impl FatalErrorConfig {
    /// Configuration with the registry switched off.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            install_signal_trap: false,
            ..Self::default()
        }
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if:
    /// - the trap is requested with an empty signal list
    /// - a signal is listed twice
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.install_signal_trap && self.signals.is_empty() {
            return Err(ConfigError::ValidationError(
                "install_signal_trap requires at least one signal".to_string(),
            ));
        }

        for (i, signal) in self.signals.iter().enumerate() {
            if self.signals[..i].contains(signal) {
                return Err(ConfigError::ValidationError(format!(
                    "signal {signal} listed more than once"
                )));
            }
        }
        Ok(())
    }
}

/// Top-level configuration file of the probe binary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Shared fields.
    #[serde(default)]
    pub shared: SharedConfig,

    /// Registry and trap settings.
    #[serde(default)]
    pub fatal_error: FatalErrorConfig,
}

impl ProbeConfig {
    /// Validate every table.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.fatal_error.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigLoader;

    #[test]
    fn defaults_trap_every_crash_signal() {
        let config = FatalErrorConfig::default();
        assert!(config.enabled);
        assert!(config.free_list_after_invoke);
        assert!(config.install_signal_trap);
        assert_eq!(config.signals, CrashSignal::ALL.to_vec());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_table_yields_defaults() {
        let config = ProbeConfig::parse("[shared]\nservice_name = \"x\"\n").unwrap();
        assert_eq!(config.fatal_error, FatalErrorConfig::default());
    }

    #[test]
    fn signal_names_round_trip_through_raw_numbers() {
        for signal in CrashSignal::ALL {
            assert_eq!(CrashSignal::from_raw(signal.as_raw()), Some(signal));
            assert_eq!(signal.to_string(), signal.name());
        }
        assert_eq!(CrashSignal::from_raw(libc::SIGTERM), None);
    }

    #[test]
    fn parses_signal_list_by_name() {
        let config = ProbeConfig::parse(
            r#"
[fatal_error]
enabled = false
signals = ["SIGABRT", "SIGSEGV"]
"#,
        )
        .unwrap();

        assert!(!config.fatal_error.enabled);
        assert_eq!(
            config.fatal_error.signals,
            vec![CrashSignal::Abrt, CrashSignal::Segv]
        );
    }

    #[test]
    fn rejects_unknown_signal_name() {
        let result = ProbeConfig::parse("[fatal_error]\nsignals = [\"SIGTERM\"]\n");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn rejects_trap_without_signals() {
        let config = FatalErrorConfig {
            signals: Vec::new(),
            ..FatalErrorConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));

        let no_trap = FatalErrorConfig {
            install_signal_trap: false,
            signals: Vec::new(),
            ..FatalErrorConfig::default()
        };
        assert!(no_trap.validate().is_ok());
    }

    #[test]
    fn rejects_duplicate_signal() {
        let config = FatalErrorConfig {
            signals: vec![CrashSignal::Segv, CrashSignal::Bus, CrashSignal::Segv],
            ..FatalErrorConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("SIGSEGV"));
    }

    #[test]
    fn disabled_config_skips_trap() {
        let config = FatalErrorConfig::disabled();
        assert!(!config.enabled);
        assert!(!config.install_signal_trap);
        assert!(config.validate().is_ok());
    }
}
