//! Fatal error handler registry
//!
//! The handler list lives behind a single [`AtomicPtr`] slot. Whoever swaps
//! the pointer out of the slot owns the list exclusively until it stores it
//! back (or frees it); a null slot means either "no handlers" or "someone is
//! holding the list right now", and every operation treats both the same.
//!
//! ```text
//!   register/remove                         invoke_all (crash path)
//!   ───────────────                         ───────────────────────
//!   lock mutation mutex                     (no lock)
//!   list = swap(null, Acquire)              list = swap(null, Acquire)
//!   edit list                               run every handler in order
//!   store(list, Release) | free if empty    free list (or leak, see config)
//!   unlock
//! ```
//!
//! The mutation mutex only serializes register/remove against each other.
//! `invoke_all` never touches it, so a crash on a thread that holds the
//! mutex cannot deadlock the dump. Losing a race against a mutation means
//! `invoke_all` sees a null slot and writes nothing.

use crate::handler::FatalErrorHandler;
use fatal::fatal::FatalErrorConfig;
use parking_lot::Mutex;
use static_assertions::{assert_eq_size, assert_impl_all};
use std::io::Write;
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicPtr, Ordering};
use tracing::debug;

/// Non-owning reference to a registered handler.
struct HandlerRef(NonNull<dyn FatalErrorHandler>);

// SAFETY: `FatalErrorHandler: Sync`, so sharing the pointee across threads
// is fine; liveness is the caller contract of `register`.
unsafe impl Send for HandlerRef {}

impl HandlerRef {
    fn points_to(&self, handler: &dyn FatalErrorHandler) -> bool {
        ptr::addr_eq(self.0.as_ptr(), handler)
    }
}

type HandlerList = Vec<HandlerRef>;

assert_eq_size!(AtomicPtr<HandlerList>, usize);

/// Registry of handlers run when the process hits a fatal error.
///
/// See the module docs for the ownership protocol.
pub struct FatalErrorRegistry {
    enabled: bool,
    free_list_after_invoke: bool,
    mutation: Mutex<()>,
    handlers: AtomicPtr<HandlerList>,
}

assert_impl_all!(FatalErrorRegistry: Send, Sync);

impl FatalErrorRegistry {
    /// Create an empty registry.
    ///
    /// `enabled` is ANDed with the `object-trace` cargo feature. A disabled
    /// registry never allocates and all operations return immediately.
    pub const fn new(enabled: bool) -> Self {
        Self {
            enabled: enabled && cfg!(feature = "object-trace"),
            free_list_after_invoke: true,
            mutation: parking_lot::const_mutex(()),
            handlers: AtomicPtr::new(ptr::null_mut()),
        }
    }

    /// Create a registry whose operations are all no-ops.
    pub const fn disabled() -> Self {
        Self::new(false)
    }

    /// Create a registry from the `[fatal_error]` configuration table.
    pub fn from_config(config: &FatalErrorConfig) -> Self {
        Self::new(config.enabled).with_free_list_after_invoke(config.free_list_after_invoke)
    }

    /// Choose whether [`invoke_all`](Self::invoke_all) frees the handler
    /// list after running it (the default) or leaks it.
    pub fn with_free_list_after_invoke(mut self, free: bool) -> Self {
        self.free_list_after_invoke = free;
        self
    }

    /// Whether operations on this registry have any effect.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Append `handler` to the end of the handler list.
    ///
    /// Registering the same handler twice yields two entries, and it will be
    /// invoked twice.
    ///
    /// # Safety
    ///
    /// The registry keeps only the address of `handler`. The caller must
    /// [`remove`](Self::remove) it before the handler is moved or dropped,
    /// otherwise a later [`invoke_all`](Self::invoke_all) dereferences a
    /// dangling pointer.
    pub unsafe fn register(&self, handler: &(dyn FatalErrorHandler + 'static)) {
        if !self.enabled {
            return;
        }

        let _guard = self.mutation.lock();
        let mut list = self.take().unwrap_or_default();
        list.push(HandlerRef(NonNull::from(handler)));
        let count = list.len();
        self.put(list);

        debug!(handler = handler.name(), count, "fatal error handler registered");
    }

    /// Register a handler that lives for the rest of the process.
    pub fn register_static(&self, handler: &'static dyn FatalErrorHandler) {
        // SAFETY: a 'static handler outlives every invoke_all.
        unsafe { self.register(handler) }
    }

    /// Remove every entry referring to `handler`.
    ///
    /// Handlers are matched by address. Removing a handler that was never
    /// registered is a no-op. If a concurrent [`invoke_all`](Self::invoke_all)
    /// already took the list, the removal is dropped: that invocation still
    /// runs the handler, later ones will not see it.
    pub fn remove(&self, handler: &dyn FatalErrorHandler) {
        if !self.enabled {
            return;
        }

        let _guard = self.mutation.lock();
        let Some(mut list) = self.take() else {
            // Empty, or the crash path owns the list. Either way nothing to
            // put back.
            return;
        };

        list.retain(|entry| !entry.points_to(handler));
        let count = list.len();
        if list.is_empty() {
            drop(list);
        } else {
            self.put(list);
        }

        debug!(handler = handler.name(), count, "fatal error handler removed");
    }

    /// Run every registered handler, in registration order, writing to `out`.
    ///
    /// Safe to call from a signal handler: takes no lock and never blocks.
    /// The list is consumed, so a second call (without new registrations)
    /// writes nothing. Handlers registered or removed after the list was
    /// taken are not seen by this call.
    pub fn invoke_all(&self, out: &mut dyn Write) {
        if !self.enabled {
            return;
        }

        let Some(list) = self.take() else {
            return;
        };

        for entry in list.iter() {
            // SAFETY: `register` callers keep handlers alive until removed.
            let handler = unsafe { entry.0.as_ref() };
            handler.on_fatal_error(out);
        }

        if self.free_list_after_invoke {
            drop(list);
        } else {
            let _ = Box::leak(list);
        }
    }

    /// Discard every registration.
    ///
    /// Meant for test teardown; the handlers themselves are not touched.
    pub fn reset(&self) {
        let _guard = self.mutation.lock();
        drop(self.take());
    }

    fn take(&self) -> Option<Box<HandlerList>> {
        let raw = self.handlers.swap(ptr::null_mut(), Ordering::Acquire);
        // SAFETY: every non-null pointer in the slot came from `Box::into_raw`
        // in `put`, and the swap made us its only owner.
        NonNull::new(raw).map(|list| unsafe { Box::from_raw(list.as_ptr()) })
    }

    fn put(&self, list: Box<HandlerList>) {
        // Only called under the mutation lock, right after `take`, so the
        // slot is null and nothing is overwritten.
        self.handlers.store(Box::into_raw(list), Ordering::Release);
    }
}

impl Default for FatalErrorRegistry {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Drop for FatalErrorRegistry {
    fn drop(&mut self) {
        let raw = *self.handlers.get_mut();
        if !raw.is_null() {
            // SAFETY: see `take`; `&mut self` rules out other owners.
            drop(unsafe { Box::from_raw(raw) });
        }
    }
}

impl std::fmt::Debug for FatalErrorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FatalErrorRegistry")
            .field("enabled", &self.enabled)
            .field("free_list_after_invoke", &self.free_list_after_invoke)
            .finish_non_exhaustive()
    }
}
