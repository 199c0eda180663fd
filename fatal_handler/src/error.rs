//! Error types for the crash trap
//!
//! The registry itself never fails; only installing OS signal dispositions
//! can.

use fatal::fatal::CrashSignal;
use thiserror::Error;

/// Errors that can occur while installing or removing the crash trap
#[derive(Error, Debug)]
pub enum TrapError {
    /// `install` called while a trap is already in place
    #[error("Crash trap already installed")]
    AlreadyInstalled,

    /// `uninstall` called without a prior `install`
    #[error("Crash trap not installed")]
    NotInstalled,

    /// No signals requested
    #[error("Crash trap needs at least one signal")]
    NoSignals,

    /// `sigaction` rejected a signal
    #[error("Failed to set disposition for {signal}: {source}")]
    Signal {
        /// Signal being configured
        signal: CrashSignal,
        /// Source nix error
        #[source]
        source: nix::Error,
    },

    /// `sigaltstack` failed
    #[error("Failed to set up the alternate signal stack: {0}")]
    AltStack(#[source] nix::Error),
}

/// Result type for crash trap operations
pub type TrapResult<T> = Result<T, TrapError>;
