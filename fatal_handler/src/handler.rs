//! Handler capability invoked on fatal errors

use std::borrow::Cow;
use std::io::Write;

/// A subsystem that can describe its state when the process dies.
///
/// Implementations run on the crash path, possibly inside a signal handler
/// on an arbitrary thread. They must:
///
/// - never panic; write errors are ignored
/// - never call back into the registry (register/remove)
/// - return quickly and avoid allocating, unless the target guarantees the
///   allocator is usable from a signal handler
///
/// Pre-render anything expensive at registration time and only copy bytes
/// into `out` here.
pub trait FatalErrorHandler: Sync {
    /// Write diagnostic text for this subsystem to `out`.
    fn on_fatal_error(&self, out: &mut dyn Write);

    /// Label used in registration logs. Never consulted on the crash path.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Handler that writes a fixed block of text.
///
/// Useful for subsystems whose dump can be rendered once up front, such as
/// a configuration summary.
#[derive(Debug, Clone)]
pub struct StaticTextHandler {
    name: Cow<'static, str>,
    text: Cow<'static, str>,
}

impl StaticTextHandler {
    /// Create a handler that writes `text` verbatim.
    pub fn new(name: impl Into<Cow<'static, str>>, text: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }

    /// `const` constructor, usable in `static` items.
    pub const fn new_static(name: &'static str, text: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
            text: Cow::Borrowed(text),
        }
    }

    /// The text written on a fatal error.
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl FatalErrorHandler for StaticTextHandler {
    fn on_fatal_error(&self, out: &mut dyn Write) {
        let _ = out.write_all(self.text.as_bytes());
    }

    fn name(&self) -> &str {
        &self.name
    }
}
