//! ---
//! jsm_section: "02-command-protocol"
//! jsm_subsection: "module"
//! jsm_type: "source"
//! jsm_scope: "code"
//! jsm_description: "Wire command registry."
//! jsm_version: "v0.0.0-prealpha"
//! jsm_owner: "tbd"
//! ---
use std::fmt;

use strum::{AsRefStr, Display};

/// Wire name reported for [`Command::Invalid`].
pub const INVALID_COMMAND_NAME: &str = "commandInvalid";

const PROTOCOL: [Command; 11] = [
    Command::GetPowerCutData,
    Command::GetMeasurementData,
    Command::GetLimitData,
    Command::GetPurchaseData,
    Command::GetPowerCompanyData,
    Command::SetLimitsData,
    Command::SetPurchaseData,
    Command::SetPowerCutData,
    Command::SetDelay,
    Command::SetReset,
    Command::SetPowerCompanyData,
];

#[cfg(feature = "raw-messages")]
const RAW: [Command; 2] = [Command::GetRawMessage, Command::SendRawMessage];

#[cfg(not(feature = "raw-messages"))]
const RAW: [Command; 0] = [];

/// Whether a command only reads the meter or changes its configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum Direction {
    /// Read-only.
    Query,
    /// Read-modify-write.
    Mutation,
}

/// Operations understood by the translator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// `getPowerCutData`
    GetPowerCutData,
    /// `getMeasurementData`
    GetMeasurementData,
    /// `getLimitData`
    GetLimitData,
    /// `getPurchaseData`
    GetPurchaseData,
    /// `getPowerCompanyData`
    GetPowerCompanyData,
    /// `setLimitsData`
    SetLimitsData,
    /// `setPurchaseData`
    SetPurchaseData,
    /// `setPowerCutData`
    SetPowerCutData,
    /// `setDelay`
    SetDelay,
    /// `setReset`
    SetReset,
    /// `setPowerCompanyData`
    SetPowerCompanyData,
    /// `getRawMessage`
    #[cfg(feature = "raw-messages")]
    GetRawMessage,
    /// `sendRawMessage`
    #[cfg(feature = "raw-messages")]
    SendRawMessage,
    /// Anything that did not resolve to a known name.
    Invalid,
}

impl Command {
    /// Map a wire name to its command. Matching is exact and case-sensitive;
    /// unknown names resolve to [`Command::Invalid`].
    pub fn resolve(name: &str) -> Self {
        Self::all()
            .find(|cmd| cmd.wire_name() == name)
            .unwrap_or(Command::Invalid)
    }

    /// Every command except the [`Command::Invalid`] sentinel.
    pub fn all() -> impl Iterator<Item = Command> {
        PROTOCOL.into_iter().chain(RAW)
    }

    /// Wire name used in `"cmd"` and `"response"`.
    pub const fn wire_name(self) -> &'static str {
        match self {
            Command::GetPowerCutData => "getPowerCutData",
            Command::GetMeasurementData => "getMeasurementData",
            Command::GetLimitData => "getLimitData",
            Command::GetPurchaseData => "getPurchaseData",
            Command::GetPowerCompanyData => "getPowerCompanyData",
            Command::SetLimitsData => "setLimitsData",
            Command::SetPurchaseData => "setPurchaseData",
            Command::SetPowerCutData => "setPowerCutData",
            Command::SetDelay => "setDelay",
            Command::SetReset => "setReset",
            Command::SetPowerCompanyData => "setPowerCompanyData",
            #[cfg(feature = "raw-messages")]
            Command::GetRawMessage => "getRawMessage",
            #[cfg(feature = "raw-messages")]
            Command::SendRawMessage => "sendRawMessage",
            Command::Invalid => INVALID_COMMAND_NAME,
        }
    }

    /// Query or mutation.
    pub const fn direction(self) -> Direction {
        match self {
            Command::SetLimitsData
            | Command::SetPurchaseData
            | Command::SetPowerCutData
            | Command::SetDelay
            | Command::SetReset
            | Command::SetPowerCompanyData => Direction::Mutation,
            #[cfg(feature = "raw-messages")]
            Command::SendRawMessage => Direction::Mutation,
            _ => Direction::Query,
        }
    }

    /// Whether the request must carry a `"data"` object.
    pub const fn carries_payload(self) -> bool {
        match self {
            Command::SetLimitsData
            | Command::SetPurchaseData
            | Command::SetPowerCutData
            | Command::SetDelay
            | Command::SetPowerCompanyData => true,
            #[cfg(feature = "raw-messages")]
            Command::SendRawMessage => true,
            _ => false,
        }
    }

    /// The continuously polled raw receive command.
    pub const fn is_raw_poll(self) -> bool {
        #[cfg(feature = "raw-messages")]
        {
            matches!(self, Command::GetRawMessage)
        }
        #[cfg(not(feature = "raw-messages"))]
        {
            false
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl From<&str> for Command {
    fn from(name: &str) -> Self {
        Command::resolve(name)
    }
}
