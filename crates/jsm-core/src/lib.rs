//! ---
//! jsm_section: "02-command-protocol"
//! jsm_subsection: "module"
//! jsm_type: "source"
//! jsm_scope: "code"
//! jsm_description: "JSON command translator for DDS238 smart meters."
//! jsm_version: "v0.0.0-prealpha"
//! jsm_owner: "tbd"
//! ---
#![warn(missing_docs)]

//! Translates JSON requests into typed meter driver calls and encodes the
//! resulting device state back into JSON responses.
//!
//! The entry point is [`Translator`]: bind it to a [`SharedDeviceState`] with
//! [`Translator::begin`], then feed it either a pre-resolved [`Command`]
//! ([`Translator::handle`]) or a full request carrying `"cmd"`
//! ([`Translator::handle_json`]).

pub mod command;
pub mod dispatch;
pub mod driver;
pub mod encode;
pub mod error;
pub mod validate;

pub use command::{Command, Direction};
pub use dispatch::Translator;
pub use driver::{
    DelaySettings, DeviceState, DriverResult, LimitAndPurchaseData, LimitSettings,
    MeasurementData, MeterDriver, PowerCompanyData, PowerCutData, PurchaseSettings,
    SharedDeviceState, TariffSettings,
};
pub use encode::{EncodeOptions, Fixed, ResponseEncoder};
pub use error::{DeviceFault, EncodeError, ErrorCode, ErrorLatch, ErrorType, Fault};
pub use validate::{DecodeLimits, Payload};
