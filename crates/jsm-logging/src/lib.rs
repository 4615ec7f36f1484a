//! ---
//! jsm_section: "03-logging"
//! jsm_subsection: "module"
//! jsm_type: "source"
//! jsm_scope: "code"
//! jsm_description: "Structured logging adapters and sinks."
//! jsm_version: "v0.0.0-prealpha"
//! jsm_owner: "tbd"
//! ---
#![warn(missing_docs)]

//! Context-enriched logging helpers for the translator.

use tracing::Level;
use tracing_subscriber::{fmt as subscriber_fmt, prelude::*, EnvFilter, Registry};

pub mod macros;

#[doc(hidden)]
pub use tracing;

/// Initialize a baseline tracing subscriber writing to stderr.
///
/// The filter comes from `JSM_LOG`, then `RUST_LOG`, defaulting to `info`.
pub fn init() {
    let filter = std::env::var("JSM_LOG")
        .ok()
        .and_then(|directive| EnvFilter::try_new(directive).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("info"));
    let _ = Registry::default()
        .with(filter)
        .with(subscriber_fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Structured logging context propagated by the convenience macros.
#[derive(Debug, Default, Clone)]
pub struct LogContext<'a> {
    /// Wire name of the command being processed.
    pub command: Option<&'a str>,
    /// Entry point that received the request (`command` or `json`).
    pub entry: Option<&'a str>,
    /// Per-translator request counter.
    pub sequence: Option<u64>,
}

impl<'a> LogContext<'a> {
    /// Create an empty logging context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a command wire name.
    pub fn with_command(mut self, command: &'a str) -> Self {
        self.command = Some(command);
        self
    }

    /// Attach the entry point label.
    pub fn with_entry(mut self, entry: &'a str) -> Self {
        self.entry = Some(entry);
        self
    }

    /// Attach a sequence number.
    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = Some(sequence);
        self
    }
}

/// How a single dispatch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A response without an error object was produced.
    Success,
    /// A response carrying an error object was produced.
    Fault,
    /// Nothing was emitted (echo, empty poll, unbound translator).
    Ignored,
}

impl DispatchOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            DispatchOutcome::Success => "success",
            DispatchOutcome::Fault => "fault",
            DispatchOutcome::Ignored => "ignored",
        }
    }
}

/// Emit a standardized dispatch event carrying the outcome and response size.
pub fn log_dispatch_outcome(
    context: Option<&LogContext>,
    outcome: DispatchOutcome,
    response_len: usize,
) {
    let ctx = context.cloned().unwrap_or_default();
    let command = ctx.command.unwrap_or("");
    let entry = ctx.entry.unwrap_or("");
    let sequence = ctx.sequence.unwrap_or_default();
    let outcome_label = outcome.as_str();
    // `tracing::event!` needs a constant level, so branch per outcome.
    match outcome {
        DispatchOutcome::Fault => tracing::event!(
            Level::WARN,
            command,
            entry,
            sequence,
            outcome = outcome_label,
            response_len,
            "dispatch finished"
        ),
        _ => tracing::event!(
            Level::DEBUG,
            command,
            entry,
            sequence,
            outcome = outcome_label,
            response_len,
            "dispatch finished"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macros_emit_without_panic() {
        init();
        let ctx = LogContext::new()
            .with_command("getLimitData")
            .with_entry("json");
        jsm_info!(context = ctx.clone(), "command received");
        jsm_debug!("debug message");
        jsm_error!(context = ctx, "error code: {}", 42);
    }

    #[test]
    fn init_does_not_panic() {
        init();
        init();
    }

    #[test]
    fn outcome_helper_emits() {
        init();
        let ctx = LogContext::new().with_command("setReset").with_sequence(7);
        log_dispatch_outcome(Some(&ctx), DispatchOutcome::Success, 120);
        log_dispatch_outcome(None, DispatchOutcome::Fault, 88);
        log_dispatch_outcome(None, DispatchOutcome::Ignored, 0);
    }

    #[test]
    fn context_builders_fill_fields() {
        let ctx = LogContext::new()
            .with_command("setDelay")
            .with_entry("command")
            .with_sequence(3);
        assert_eq!(ctx.command, Some("setDelay"));
        assert_eq!(ctx.entry, Some("command"));
        assert_eq!(ctx.sequence, Some(3));
    }
}
