//! Process-wide registry instance
//!
//! Subsystems register into one registry per process; the crash trap reads
//! from it. The instance is created either explicitly by [`init`] at
//! startup, or on first use with the build default (enabled when the
//! `object-trace` feature is on).
//!
//! [`call_fatal_error_handlers`] never creates the instance, so it stays
//! lock-free even if a crash happens before startup finished.

use crate::handler::FatalErrorHandler;
use crate::registry::FatalErrorRegistry;
use fatal::fatal::FatalErrorConfig;
use std::io::Write;
use std::sync::OnceLock;
use tracing::{info, warn};

static GLOBAL: OnceLock<FatalErrorRegistry> = OnceLock::new();

/// Create the process-wide registry from configuration.
///
/// Only the first initialisation takes effect, whether it came from `init`
/// or from first use through [`global`]. Later calls log a warning and
/// return the existing registry.
pub fn init(config: &FatalErrorConfig) -> &'static FatalErrorRegistry {
    let mut created = false;
    let registry = GLOBAL.get_or_init(|| {
        created = true;
        FatalErrorRegistry::from_config(config)
    });

    if created {
        info!(
            enabled = registry.is_enabled(),
            free_list_after_invoke = config.free_list_after_invoke,
            "fatal error registry initialised"
        );
    } else {
        warn!("fatal error registry already initialised; keeping existing settings");
    }
    registry
}

/// The process-wide registry, created with the build default on first use.
pub fn global() -> &'static FatalErrorRegistry {
    GLOBAL.get_or_init(FatalErrorRegistry::default)
}

/// Register `handler` with the process-wide registry.
///
/// # Safety
///
/// Same contract as [`FatalErrorRegistry::register`]: call
/// [`remove_fatal_error_handler`] before `handler` is moved or dropped.
pub unsafe fn register_fatal_error_handler(handler: &(dyn FatalErrorHandler + 'static)) {
    // SAFETY: forwarded caller contract.
    unsafe { global().register(handler) }
}

/// Register a handler that lives for the rest of the process.
pub fn register_static_fatal_error_handler(handler: &'static dyn FatalErrorHandler) {
    global().register_static(handler);
}

/// Remove `handler` from the process-wide registry.
pub fn remove_fatal_error_handler(handler: &dyn FatalErrorHandler) {
    if let Some(registry) = GLOBAL.get() {
        registry.remove(handler);
    }
}

/// Run every handler of the process-wide registry into `out`.
///
/// Crash-path entry point: no locks, no initialisation.
pub fn call_fatal_error_handlers(out: &mut dyn Write) {
    if let Some(registry) = GLOBAL.get() {
        registry.invoke_all(out);
    }
}
