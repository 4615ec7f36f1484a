//! ---
//! jsm_section: "02-command-protocol"
//! jsm_subsection: "module"
//! jsm_type: "source"
//! jsm_scope: "code"
//! jsm_description: "Error taxonomy shared by the translator and meter drivers."
//! jsm_version: "v0.0.0-prealpha"
//! jsm_owner: "tbd"
//! ---
use std::fmt;

use thiserror::Error;

const TYPE_TEXT: [&str; 2] = ["No error type", "Parse Json"];

const CODE_TEXT: [&str; 11] = [
    "No Errors",
    "The nesting limit was reached",
    "Small JsonDocument, increase its capacity",
    "The input is not recognized",
    "The end of the input is missing",
    "Features in Json not supported by the parser",
    "No info about this error",
    "Data not present",
    "Data not valid",
    "Command is not present",
    "Command not valid",
];

/// Coarse classification of a translator-raised failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ErrorType {
    /// Nothing went wrong.
    #[default]
    None,
    /// The request could not be decoded or validated.
    MalformedRequest,
}

impl ErrorType {
    /// Wire text reported in `error.type`.
    pub const fn description(self) -> &'static str {
        TYPE_TEXT[self as usize]
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Closed set of translator failure codes. The discriminants index
/// [`ErrorCode::description`]'s table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ErrorCode {
    /// Nothing went wrong.
    #[default]
    None,
    /// The request nests objects/arrays deeper than allowed.
    TooDeep,
    /// The request or the response does not fit the JSON buffer.
    OutOfMemory,
    /// The request is not valid JSON.
    InvalidInput,
    /// The request ends before the JSON value is complete.
    IncompleteInput,
    /// The request uses a JSON feature the decoder rejects.
    UnsupportedFeature,
    /// Any other decoder failure.
    OtherDecodeError,
    /// `"data"` is absent or not an object.
    PayloadMissing,
    /// `"data"` lacks a required field or a field has the wrong type.
    PayloadInvalid,
    /// `"cmd"` is absent.
    CommandMissing,
    /// The command is not part of the protocol.
    CommandInvalid,
}

impl ErrorCode {
    /// Wire text reported in `error.description`.
    pub const fn description(self) -> &'static str {
        CODE_TEXT[self as usize]
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Sticky error fields. Each getter can optionally clear what it returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ErrorLatch {
    kind: ErrorType,
    code: ErrorCode,
}

impl ErrorLatch {
    /// Record a translator failure. Raising [`ErrorCode::None`] resets both fields.
    pub fn raise(&mut self, code: ErrorCode) {
        self.kind = match code {
            ErrorCode::None => ErrorType::None,
            _ => ErrorType::MalformedRequest,
        };
        self.code = code;
    }

    /// Current error type, reset to [`ErrorType::None`] when `clear` is set.
    pub fn error_type(&mut self, clear: bool) -> ErrorType {
        let current = self.kind;
        if clear {
            self.clear_type();
        }
        current
    }

    /// Current error code, reset to [`ErrorCode::None`] when `clear` is set.
    pub fn error_code(&mut self, clear: bool) -> ErrorCode {
        let current = self.code;
        if clear {
            self.clear_code();
        }
        current
    }

    /// Reset the error type only.
    pub fn clear_type(&mut self) {
        self.kind = ErrorType::None;
    }

    /// Reset the error code only.
    pub fn clear_code(&mut self) {
        self.code = ErrorCode::None;
    }

    /// Reset both fields.
    pub fn reset(&mut self) {
        self.clear_type();
        self.clear_code();
    }

    /// Whether a translator failure is currently latched.
    pub fn is_raised(&self) -> bool {
        self.kind != ErrorType::None
    }
}

/// Failure reported by a meter driver, in the driver's own vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {description}")]
pub struct DeviceFault {
    /// Text reported in `error.type`.
    pub kind: String,
    /// Text reported in `error.description`.
    pub description: String,
}

impl DeviceFault {
    /// Construct a fault from its type and description text.
    pub fn new(kind: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            description: description.into(),
        }
    }
}

/// The single failure attached to a response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Fault {
    /// Raised by the translator while decoding or validating.
    #[error("malformed request: {0}")]
    Request(ErrorCode),
    /// Raised by the meter driver.
    #[error("device error: {0}")]
    Device(#[from] DeviceFault),
}

impl Fault {
    /// Text for `error.type`.
    pub fn type_text(&self) -> &str {
        match self {
            Fault::Request(_) => ErrorType::MalformedRequest.description(),
            Fault::Device(fault) => &fault.kind,
        }
    }

    /// Text for `error.description`.
    pub fn description_text(&self) -> &str {
        match self {
            Fault::Request(code) => code.description(),
            Fault::Device(fault) => &fault.description,
        }
    }

    /// Translator code when the fault was raised by the translator.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Fault::Request(code) => Some(*code),
            Fault::Device(_) => None,
        }
    }
}

impl From<ErrorCode> for Fault {
    fn from(code: ErrorCode) -> Self {
        Fault::Request(code)
    }
}

/// Failure to render a response document.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// The rendered document does not fit the configured buffer.
    #[error("encoded response of {size} bytes exceeds the {limit} byte buffer")]
    Overflow {
        /// Rendered size in bytes.
        size: usize,
        /// Configured buffer size in bytes.
        limit: usize,
    },
    /// serde_json refused the document.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_follow_declaration_order() {
        assert_eq!(ErrorType::None.description(), "No error type");
        assert_eq!(ErrorType::MalformedRequest.description(), "Parse Json");
        assert_eq!(ErrorCode::None.description(), "No Errors");
        assert_eq!(
            ErrorCode::OutOfMemory.description(),
            "Small JsonDocument, increase its capacity"
        );
        assert_eq!(ErrorCode::PayloadMissing.description(), "Data not present");
        assert_eq!(ErrorCode::PayloadInvalid.description(), "Data not valid");
        assert_eq!(
            ErrorCode::CommandMissing.description(),
            "Command is not present"
        );
        assert_eq!(ErrorCode::CommandInvalid.description(), "Command not valid");
    }

    #[test]
    fn latch_get_with_clear_resets_only_that_axis() {
        let mut latch = ErrorLatch::default();
        latch.raise(ErrorCode::PayloadInvalid);
        assert!(latch.is_raised());

        assert_eq!(latch.error_code(true), ErrorCode::PayloadInvalid);
        assert_eq!(latch.error_code(false), ErrorCode::None);
        assert_eq!(latch.error_type(false), ErrorType::MalformedRequest);

        assert_eq!(latch.error_type(true), ErrorType::MalformedRequest);
        assert_eq!(latch.error_type(false), ErrorType::None);
        assert!(!latch.is_raised());
    }

    #[test]
    fn latch_reset_and_raise_none() {
        let mut latch = ErrorLatch::default();
        latch.raise(ErrorCode::TooDeep);
        latch.reset();
        assert_eq!(latch, ErrorLatch::default());

        latch.raise(ErrorCode::CommandMissing);
        latch.raise(ErrorCode::None);
        assert!(!latch.is_raised());
    }

    #[test]
    fn fault_texts_come_from_the_raising_side() {
        let request = Fault::from(ErrorCode::CommandMissing);
        assert_eq!(request.type_text(), "Parse Json");
        assert_eq!(request.description_text(), "Command is not present");
        assert_eq!(request.code(), Some(ErrorCode::CommandMissing));

        let device = Fault::from(DeviceFault::new("Smart Meter", "Timeout"));
        assert_eq!(device.type_text(), "Smart Meter");
        assert_eq!(device.description_text(), "Timeout");
        assert_eq!(device.code(), None);
        assert_eq!(device.to_string(), "device error: Smart Meter: Timeout");
    }
}
