//! Fatal Common Library
//!
//! Shared configuration types and constants for the fatal error handler
//! workspace crates.
//!
//! # Module Structure
//!
//! - [`config`] - Configuration loading traits and shared fields
//! - [`fatal`] - Fatal error registry and crash trap settings
//! - [`consts`] - Workspace-wide defaults
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! Add to your `Cargo.toml` with alias for shorter imports:
//! ```toml
//! [dependencies]
//! fatal = { package = "fatal_common", path = "../fatal_common" }
//! ```
//!
//! Then import:
//! ```rust
//! use fatal_common::config::{ConfigLoader, SharedConfig};
//! use fatal_common::fatal::{CrashSignal, FatalErrorConfig};
//! ```

pub mod config;
pub mod consts;
pub mod fatal;
pub mod prelude;
