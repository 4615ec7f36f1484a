//! ---
//! jsm_section: "01-core-functionality"
//! jsm_subsection: "module"
//! jsm_type: "source"
//! jsm_scope: "code"
//! jsm_description: "Shared primitives and utilities for the translator runtime."
//! jsm_version: "v0.0.0-prealpha"
//! jsm_owner: "tbd"
//! ---
//! Core shared primitives for the JSM workspace.
//! This crate exposes configuration loading, tracing initialisation and the
//! monotonic clock used to stamp responses.

pub mod config;
pub mod logging;
pub mod time;

pub use config::{
    AppConfig, CoercionPolicy, LoadedAppConfig, LoggingConfig, MeterConfig, TranslatorConfig,
};
pub use logging::{init_tracing, LogFormat};
pub use time::MonotonicClock;
