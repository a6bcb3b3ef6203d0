//! Structured logging setup for the hiddeck CLI.
//!
//! Human or JSON output on stderr, filtered by verbosity.

use std::io::{self, IsTerminal};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Filter directive for a verbosity level: 0 = warn, 1 = info, 2 = debug,
/// 3+ = trace. `quiet` wins over `verbose`.
pub const fn default_directive(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "hiddeck=error";
    }
    match verbose {
        0 => "hiddeck=warn",
        1 => "hiddeck=info",
        2 => "hiddeck=debug",
        _ => "hiddeck=trace",
    }
}

/// Install the global subscriber. `RUST_LOG` overrides the verbosity flags.
///
/// | Mode | TTY | Output |
/// |------|-----|--------|
/// | Robot | any | JSON lines to stderr |
/// | Human | yes | Colored output to stderr |
/// | Human | no | Compact plain output to stderr |
pub fn init_logging(robot_mode: bool, verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose, quiet)));
    let tty = io::stderr().is_terminal();

    let json = robot_mode.then(|| {
        fmt::layer()
            .json()
            .with_target(true)
            .with_span_events(FmtSpan::NONE)
            .with_writer(io::stderr)
    });
    let pretty = (!robot_mode && tty).then(|| {
        fmt::layer()
            .with_target(false)
            .with_span_events(FmtSpan::NONE)
            .with_writer(io::stderr)
    });
    let compact = (!robot_mode && !tty).then(|| {
        fmt::layer()
            .compact()
            .with_ansi(false)
            .with_target(false)
            .with_writer(io::stderr)
    });

    // A second call (tests, embedding apps) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(pretty)
        .with(compact)
        .try_init();
}
