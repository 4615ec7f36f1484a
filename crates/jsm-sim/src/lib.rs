//! ---
//! jsm_section: "04-simulation"
//! jsm_subsection: "bootstrap"
//! jsm_type: "source"
//! jsm_scope: "code"
//! jsm_description: "Simulated meter module exports."
//! jsm_version: "v0.0.0-prealpha"
//! jsm_owner: "tbd"
//! ---
//! Simulated DDS238 meter for the JSON translator.
//!
//! [`SimulatedMeter`] keeps the meter registers in memory and implements
//! [`jsm_core::MeterDriver`], so the translator can be exercised end to end
//! without a serial line.

pub mod meter;
#[cfg(feature = "raw-messages")]
pub mod raw;

pub use meter::{PowerCutReason, SimOperation, SimulatedMeter, DEVICE_FAULT_KIND};
#[cfg(feature = "raw-messages")]
pub use raw::RawLink;
