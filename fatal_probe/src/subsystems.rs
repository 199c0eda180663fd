//! Demonstration subsystems that report state on a fatal error.
//!
//! Text that never changes is rendered once at startup; live counters are
//! formatted on the crash path with `write!`, which does not allocate.

use fatal::config::SharedConfig;
use fatal::fatal::FatalErrorConfig;
use fatal_handler::{FatalErrorHandler, StaticTextHandler};
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};

/// Service name and process id.
pub fn identity(shared: &SharedConfig, pid: u32) -> StaticTextHandler {
    StaticTextHandler::new(
        "identity",
        format!("service: {}\npid: {}\n", shared.service_name, pid),
    )
}

/// Effective registry and trap settings.
pub fn config_summary(config: &FatalErrorConfig) -> StaticTextHandler {
    let signals: Vec<&str> = config.signals.iter().map(|s| s.name()).collect();
    StaticTextHandler::new(
        "config",
        format!(
            "fatal_error: enabled={} free_list_after_invoke={} trap={} signals={}\n",
            config.enabled,
            config.free_list_after_invoke,
            config.install_signal_trap,
            signals.join(","),
        ),
    )
}

/// Live count of simulated requests.
#[derive(Debug, Default)]
pub struct RequestCounter {
    served: AtomicU64,
}

impl RequestCounter {
    pub const fn new() -> Self {
        Self {
            served: AtomicU64::new(0),
        }
    }

    /// Count one request, returning the new total.
    pub fn record(&self) -> u64 {
        self.served.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn served(&self) -> u64 {
        self.served.load(Ordering::Relaxed)
    }
}

impl FatalErrorHandler for RequestCounter {
    fn on_fatal_error(&self, out: &mut dyn Write) {
        let _ = writeln!(out, "requests served: {}", self.served());
    }

    fn name(&self) -> &str {
        "requests"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fatal::fatal::CrashSignal;

    fn render(handler: &dyn FatalErrorHandler) -> String {
        let mut out = Vec::new();
        handler.on_fatal_error(&mut out);
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn identity_names_service_and_pid() {
        let shared = SharedConfig {
            service_name: "edge-01".to_string(),
            ..SharedConfig::default()
        };
        assert_eq!(render(&identity(&shared, 4242)), "service: edge-01\npid: 4242\n");
    }

    #[test]
    fn config_summary_lists_signals_in_order() {
        let config = FatalErrorConfig {
            signals: vec![CrashSignal::Abrt, CrashSignal::Segv],
            ..FatalErrorConfig::default()
        };
        assert_eq!(
            render(&config_summary(&config)),
            "fatal_error: enabled=true free_list_after_invoke=true trap=true signals=SIGABRT,SIGSEGV\n"
        );
    }

    #[test]
    fn request_counter_reports_live_value() {
        let counter = RequestCounter::new();
        assert_eq!(render(&counter), "requests served: 0\n");

        counter.record();
        assert_eq!(counter.record(), 2);
        assert_eq!(render(&counter), "requests served: 2\n");
    }
}
