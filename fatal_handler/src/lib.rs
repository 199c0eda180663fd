//! # Fatal Error Handler Registry
//!
//! Lets independent subsystems register diagnostic callbacks that run when
//! the process hits a fatal, unrecoverable error (a crash signal), so the
//! crash report carries subsystem-specific state.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────┐  register/remove   ┌──────────────────────┐
//! │  Subsystem A    ├───────────────────►│  FatalErrorRegistry  │
//! │  Subsystem B    │   (mutex-serial)   │                      │
//! └─────────────────┘                    │  AtomicPtr<Vec<&H>>  │
//!                                        └──────────┬───────────┘
//! ┌─────────────────┐   invoke_all (swap, no lock)  │
//! │  Crash trap     │◄──────────────────────────────┘
//! │  (SIGSEGV, ...) ├──► FdSink (stderr, write(2))
//! └─────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use fatal_handler::{FatalErrorHandler, FatalErrorRegistry};
//! use std::io::Write;
//!
//! struct Listeners {
//!     active: usize,
//! }
//!
//! impl FatalErrorHandler for Listeners {
//!     fn on_fatal_error(&self, out: &mut dyn Write) {
//!         let _ = writeln!(out, "listeners: {} active", self.active);
//!     }
//! }
//!
//! let registry = FatalErrorRegistry::default();
//! let listeners = Listeners { active: 3 };
//!
//! // SAFETY: `listeners` is removed below, before it goes out of scope.
//! unsafe { registry.register(&listeners) };
//!
//! let mut dump = Vec::new();
//! registry.invoke_all(&mut dump);
//! # #[cfg(feature = "object-trace")]
//! assert_eq!(dump, b"listeners: 3 active\n");
//!
//! registry.remove(&listeners);
//! ```
//!
//! ## Process-wide use
//!
//! ```rust,no_run
//! use fatal_handler::{FatalErrorConfig, StaticTextHandler, global, trap};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! static BUILD: StaticTextHandler = StaticTextHandler::new_static("build", "build: 1.4.2\n");
//!
//! let config = FatalErrorConfig::default();
//! global::init(&config);
//! global::register_static_fatal_error_handler(&BUILD);
//! trap::install(&config.signals)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Thread Safety
//!
//! - **register / remove**: thread-safe, serialized by a short mutex
//! - **invoke_all**: lock-free, async-signal-safe apart from the handlers
//!   themselves and the final free of the list
//!   (see `free_list_after_invoke`)

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod global;
pub mod handler;
pub mod registry;
#[cfg(unix)]
pub mod sink;
#[cfg(unix)]
pub mod trap;

pub use error::{TrapError, TrapResult};
pub use fatal::fatal::{CrashSignal, FatalErrorConfig};
pub use global::{
    call_fatal_error_handlers, register_fatal_error_handler, register_static_fatal_error_handler,
    remove_fatal_error_handler,
};
pub use handler::{FatalErrorHandler, StaticTextHandler};
pub use registry::FatalErrorRegistry;
#[cfg(unix)]
pub use sink::FdSink;
