//! ---
//! jsm_section: "03-logging"
//! jsm_subsection: "module"
//! jsm_type: "source"
//! jsm_scope: "code"
//! jsm_description: "Structured logging adapters and sinks."
//! jsm_version: "v0.0.0-prealpha"
//! jsm_owner: "tbd"
//! ---
/// Emit an informational log enriched with translator context.
#[macro_export]
macro_rules! jsm_info {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        $crate::tracing::event!(
            $crate::tracing::Level::INFO,
            command = ctx.command.unwrap_or(""),
            entry = ctx.entry.unwrap_or(""),
            sequence = ctx.sequence.unwrap_or_default(),
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        let ctx = &$crate::LogContext::default();
        $crate::tracing::event!(
            $crate::tracing::Level::INFO,
            command = ctx.command.unwrap_or(""),
            entry = ctx.entry.unwrap_or(""),
            sequence = ctx.sequence.unwrap_or_default(),
            message = %format_args!($($arg)+)
        );
    }};
}

/// Emit a debug log enriched with translator context.
#[macro_export]
macro_rules! jsm_debug {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        $crate::tracing::event!(
            $crate::tracing::Level::DEBUG,
            command = ctx.command.unwrap_or(""),
            entry = ctx.entry.unwrap_or(""),
            sequence = ctx.sequence.unwrap_or_default(),
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        let ctx = &$crate::LogContext::default();
        $crate::tracing::event!(
            $crate::tracing::Level::DEBUG,
            command = ctx.command.unwrap_or(""),
            entry = ctx.entry.unwrap_or(""),
            sequence = ctx.sequence.unwrap_or_default(),
            message = %format_args!($($arg)+)
        );
    }};
}

/// Emit an error log enriched with translator context.
#[macro_export]
macro_rules! jsm_error {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        $crate::tracing::event!(
            $crate::tracing::Level::ERROR,
            command = ctx.command.unwrap_or(""),
            entry = ctx.entry.unwrap_or(""),
            sequence = ctx.sequence.unwrap_or_default(),
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        let ctx = &$crate::LogContext::default();
        $crate::tracing::event!(
            $crate::tracing::Level::ERROR,
            command = ctx.command.unwrap_or(""),
            entry = ctx.entry.unwrap_or(""),
            sequence = ctx.sequence.unwrap_or_default(),
            message = %format_args!($($arg)+)
        );
    }};
}
