//! Crash signal trap
//!
//! Routes fatal signals to the process-wide registry. On delivery the
//! handler writes a banner, runs [`call_fatal_error_handlers`] into stderr,
//! resets the signal to its default disposition and re-raises it, so the
//! process terminates with the original cause and exit status. Execution is
//! never resumed.
//!
//! The handler runs on the alternate signal stack (`SA_ONSTACK`), so a
//! SIGSEGV caused by stack overflow still produces a report. `install` gives
//! the calling thread a stack of [`ALT_STACK_SIZE`] bytes; threads spawned by
//! `std` already carry the one the runtime sets up.
//!
//! Only one thread dumps. Another thread that faults meanwhile parks until
//! the dumping thread takes the process down.

use crate::error::{TrapError, TrapResult};
use crate::global::call_fatal_error_handlers;
use crate::sink::FdSink;
use fatal::consts::{CRASH_BANNER, CRASH_FOOTER};
use fatal::fatal::CrashSignal;
use nix::errno::Errno;
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
use parking_lot::Mutex;
use std::io::Write;
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info};

/// Alternate signal stack size installed on the thread calling [`install`].
pub const ALT_STACK_SIZE: usize = 64 * 1024;

/// Dispositions replaced by `install`, restored by `uninstall`.
static PREVIOUS: Mutex<Vec<(CrashSignal, SigAction)>> = parking_lot::const_mutex(Vec::new());

/// Thread currently writing the report, `NO_DUMPER` if none.
static DUMPER: AtomicUsize = AtomicUsize::new(NO_DUMPER);

const NO_DUMPER: usize = 0;

fn to_nix(signal: CrashSignal) -> Signal {
    match signal {
        CrashSignal::Segv => Signal::SIGSEGV,
        CrashSignal::Bus => Signal::SIGBUS,
        CrashSignal::Ill => Signal::SIGILL,
        CrashSignal::Fpe => Signal::SIGFPE,
        CrashSignal::Abrt => Signal::SIGABRT,
    }
}

/// Install the trap for `signals`.
///
/// On failure every disposition already replaced is restored.
pub fn install(signals: &[CrashSignal]) -> TrapResult<()> {
    if signals.is_empty() {
        return Err(TrapError::NoSignals);
    }

    let mut previous = PREVIOUS.lock();
    if !previous.is_empty() {
        return Err(TrapError::AlreadyInstalled);
    }

    ensure_alt_stack()?;

    let action = SigAction::new(
        SigHandler::Handler(on_crash_signal),
        SaFlags::SA_ONSTACK | SaFlags::SA_NODEFER,
        SigSet::empty(),
    );

    for &crash in signals {
        // SAFETY: `on_crash_signal` only performs async-signal-safe work
        // (atomics, write(2), signal(2), raise(3), pause(2)) besides the
        // registered handlers, which are bound by the `FatalErrorHandler`
        // contract.
        match unsafe { signal::sigaction(to_nix(crash), &action) } {
            Ok(old) => previous.push((crash, old)),
            Err(source) => {
                let _ = restore(&mut previous);
                return Err(TrapError::Signal {
                    signal: crash,
                    source,
                });
            }
        }
    }

    DUMPER.store(NO_DUMPER, Ordering::Release);
    info!(?signals, "crash trap installed");
    Ok(())
}

/// Restore the dispositions that were in place before [`install`].
pub fn uninstall() -> TrapResult<()> {
    let mut previous = PREVIOUS.lock();
    if previous.is_empty() {
        return Err(TrapError::NotInstalled);
    }

    restore(&mut previous)?;
    info!("crash trap removed");
    Ok(())
}

/// Whether the trap is currently installed.
pub fn is_installed() -> bool {
    !PREVIOUS.lock().is_empty()
}

/// Write a complete crash report: banner, cause, every handler, footer.
///
/// This is what the signal handler emits; binaries can also call it to
/// preview a dump. It consumes the process-wide handler list.
pub fn write_report(out: &mut dyn Write, cause: &str) {
    let _ = writeln!(out, "{CRASH_BANNER}");
    let _ = writeln!(out, "cause: {cause}");
    call_fatal_error_handlers(out);
    let _ = writeln!(out, "{CRASH_FOOTER}");
}

fn restore(previous: &mut Vec<(CrashSignal, SigAction)>) -> TrapResult<()> {
    let mut result = Ok(());
    for (crash, old) in previous.drain(..).rev() {
        // SAFETY: `old` is the disposition the kernel handed back to us.
        if let Err(source) = unsafe { signal::sigaction(to_nix(crash), &old) } {
            if result.is_ok() {
                result = Err(TrapError::Signal {
                    signal: crash,
                    source,
                });
            }
        }
    }
    result
}

/// Give the calling thread an alternate signal stack of at least
/// [`ALT_STACK_SIZE`] bytes. The memory is never freed.
fn ensure_alt_stack() -> TrapResult<()> {
    // SAFETY: all-zero is a valid `stack_t`.
    let mut current: libc::stack_t = unsafe { std::mem::zeroed() };
    // SAFETY: query only; `current` is a valid out pointer.
    Errno::result(unsafe { libc::sigaltstack(ptr::null(), &mut current) })
        .map_err(TrapError::AltStack)?;

    if current.ss_flags & libc::SS_DISABLE == 0 && current.ss_size >= ALT_STACK_SIZE {
        return Ok(());
    }

    let stack: &'static mut [u8] = Box::leak(vec![0u8; ALT_STACK_SIZE].into_boxed_slice());
    let replacement = libc::stack_t {
        ss_sp: stack.as_mut_ptr().cast(),
        ss_flags: 0,
        ss_size: stack.len(),
    };
    // SAFETY: the stack is leaked, so it outlives the thread.
    Errno::result(unsafe { libc::sigaltstack(&replacement, ptr::null_mut()) })
        .map_err(TrapError::AltStack)?;

    debug!(size = ALT_STACK_SIZE, "alternate signal stack installed");
    Ok(())
}

fn thread_token() -> usize {
    // SAFETY: pthread_self(3) cannot fail.
    unsafe { libc::pthread_self() as usize }
}

extern "C" fn on_crash_signal(signum: libc::c_int) {
    let me = thread_token();
    match DUMPER.compare_exchange(NO_DUMPER, me, Ordering::AcqRel, Ordering::Acquire) {
        Ok(_) => {
            let cause = CrashSignal::from_raw(signum).map_or("unknown signal", CrashSignal::name);
            write_report(&mut FdSink::stderr(), cause);
        }
        // A fault inside a handler re-enters here (SA_NODEFER); die now.
        Err(owner) if owner == me => {}
        Err(_) => loop {
            // SAFETY: pause(2) is async-signal-safe. The dumping thread
            // terminates the process.
            unsafe {
                libc::pause();
            }
        },
    }

    // SAFETY: signal(2) and raise(3) are async-signal-safe. With the default
    // action back in place the raise terminates the process.
    unsafe {
        libc::signal(signum, libc::SIG_DFL);
        libc::raise(signum);
    }
}
