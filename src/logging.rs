//! Tracing initialization.

use std::sync::Once;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

static INIT: Once = Once::new();

/// Target prefix shared by every event this crate emits.
const TARGET: &str = env!("CARGO_CRATE_NAME");

/// Filter used when `RUST_LOG` is unset: this crate at INFO (DEBUG under
/// tests), everything else at WARN.
fn default_directives(is_test: bool) -> String {
    let level = if is_test { "debug" } else { "info" };
    format!("warn,{TARGET}={level}")
}

/// Initialize tracing. Safe to call multiple times.
///
/// Logs go to stderr so stdout stays clean for JSON output. `RUST_LOG`
/// replaces the default filter entirely.
pub fn init() {
    INIT.call_once(|| {
        let is_test =
            std::env::var("NEXTEST").is_ok() || std::env::var("CARGO_TARGET_TMPDIR").is_ok();
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directives(is_test)));

        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_target(true)
            .with_span_events(FmtSpan::NONE)
            .compact();

        if cfg!(test) {
            let _ = builder.with_test_writer().try_init();
        } else if let Err(e) = builder.with_writer(std::io::stderr).try_init() {
            eprintln!("Failed to initialize tracing: {}", e);
        }
    });
}
