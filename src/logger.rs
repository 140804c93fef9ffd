use chrono::Utc;
use regex::Regex;
use std::env;
use std::sync::LazyLock;

static ANSI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]").expect("valid ANSI pattern"));

pub const TRACE_ENV: &str = "CMDFLOW_TRACE";
pub const VERBOSE_ENV: &str = "CMDFLOW_VERBOSE";

pub fn strip_ansi(content: &str) -> String {
    ANSI_RE.replace_all(content, "").to_string()
}

/// Reads the verbose trace switch from the environment.
///
/// `CMDFLOW_TRACE=true|false` wins; otherwise `CMDFLOW_VERBOSE=true` turns
/// tracing on. Runners read this once when they start.
pub fn is_trace_enabled() -> bool {
    trace_flag(
        env::var(TRACE_ENV).ok().as_deref(),
        env::var(VERBOSE_ENV).ok().as_deref(),
    )
}

fn trace_flag(trace: Option<&str>, verbose: Option<&str>) -> bool {
    match trace {
        Some("false") | Some("0") => false,
        Some("true") | Some("1") => true,
        _ => matches!(verbose, Some("true") | Some("1")),
    }
}

/// Per-invocation tracer. Captures the switch once so a long-running command
/// doesn't flip its trace output halfway through.
#[derive(Debug, Clone, Copy)]
pub struct Tracer {
    enabled: bool,
}

impl Tracer {
    pub fn from_env() -> Self {
        Self {
            enabled: is_trace_enabled(),
        }
    }

    pub fn disabled() -> Self {
        Self { enabled: false }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Writes `[TRACE ts] [category] message` to stderr when the switch is
    /// on, otherwise hands the message to the `log` facade at trace level.
    pub fn trace<F>(&self, category: &str, message: F)
    where
        F: FnOnce() -> String,
    {
        if self.enabled {
            eprintln!("[TRACE {}] [{}] {}", Utc::now().to_rfc3339(), category, message());
        } else if log::log_enabled!(log::Level::Trace) {
            log::trace!(target: "cmdflow", "[{}] {}", category, message());
        }
    }
}
