//! ---
//! jsm_section: "02-command-protocol"
//! jsm_subsection: "module"
//! jsm_type: "source"
//! jsm_scope: "code"
//! jsm_description: "Command dispatch between the JSON protocol and the meter driver."
//! jsm_version: "v0.0.0-prealpha"
//! jsm_owner: "tbd"
//! ---
use jsm_common::config::TranslatorConfig;
use jsm_common::time::MonotonicClock;
use jsm_logging::{
    jsm_debug, jsm_error, jsm_info, log_dispatch_outcome, DispatchOutcome, LogContext,
};
use serde_json::Value;
use tracing::warn;

use crate::command::Command;
use crate::driver::{DeviceState, DriverResult, MeterDriver, SharedDeviceState};
use crate::encode::{EncodeOptions, ResponseEncoder};
use crate::error::{EncodeError, ErrorCode, ErrorLatch, ErrorType, Fault};
use crate::validate::{decode, validate, DecodeLimits, Payload};

const ENTRY_COMMAND: &str = "command";
const ENTRY_JSON: &str = "json";

/// Outcome of request decoding and validation, before the driver runs.
type Prepared = Result<Option<Payload>, ErrorCode>;

/// Translates JSON requests into [`MeterDriver`] calls and encodes the
/// resulting [`DeviceState`] as a JSON response.
///
/// A translator does nothing until [`Translator::begin`] binds it to the
/// device state. Every call resets the error latch, so the error getters
/// always describe the most recent request.
pub struct Translator<D: MeterDriver> {
    driver: D,
    state: Option<SharedDeviceState>,
    config: TranslatorConfig,
    limits: DecodeLimits,
    encoder: ResponseEncoder,
    latch: ErrorLatch,
    last_fault: Option<Fault>,
    clock: MonotonicClock,
    sequence: u64,
}

impl<D: MeterDriver> Translator<D> {
    /// Create an unbound translator around `driver`.
    pub fn new(driver: D, config: TranslatorConfig) -> Self {
        Self {
            driver,
            state: None,
            limits: DecodeLimits::from(&config),
            encoder: ResponseEncoder::new(EncodeOptions::from(&config)),
            config,
            latch: ErrorLatch::default(),
            last_fault: None,
            clock: MonotonicClock::start(),
            sequence: 0,
        }
    }

    /// Bind the device state that driver calls update and responses report.
    pub fn begin(&mut self, state: SharedDeviceState) {
        self.state = Some(state);
        jsm_debug!("translator bound to device state");
    }

    /// Whether [`Translator::begin`] has been called.
    pub fn is_bound(&self) -> bool {
        self.state.is_some()
    }

    /// Toggle indented output.
    pub fn set_pretty(&mut self, pretty: bool) {
        self.config.pretty = pretty;
        self.encoder.set_pretty(pretty);
    }

    /// Active translator settings.
    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    /// The wrapped meter driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Mutable access to the wrapped meter driver.
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Process a command selected out of band. `raw_payload` is decoded only
    /// when the command carries a payload and must then hold a document with
    /// a `"data"` object.
    pub fn handle(&mut self, cmd: Command, raw_payload: &[u8]) -> Vec<u8> {
        let Some(state) = self.prepare_call() else {
            return Vec::new();
        };
        let context = self.context(cmd, ENTRY_COMMAND);
        self.log_inbound(cmd, &context);

        let prepared = if cmd.carries_payload() {
            decode(raw_payload, &self.limits)
                .and_then(|document| validate(cmd, &document, self.config.coercion))
                .map(Some)
        } else {
            Ok(None)
        };
        self.complete(cmd, prepared, &state, &context)
    }

    /// Process a request that names its command in `"cmd"`.
    ///
    /// Documents carrying `"response"` are treated as echoes of our own
    /// output and produce no response.
    pub fn handle_json(&mut self, raw: &[u8]) -> Vec<u8> {
        let Some(state) = self.prepare_call() else {
            return Vec::new();
        };

        let document = match decode(raw, &self.limits) {
            Ok(document) => document,
            Err(code) => {
                let context = self.context(Command::Invalid, ENTRY_JSON);
                return self.complete(Command::Invalid, Err(code), &state, &context);
            }
        };

        if document.get("response").is_some() {
            let context = self.context(Command::Invalid, ENTRY_JSON);
            jsm_debug!(context = context, "ignoring echoed response document");
            log_dispatch_outcome(Some(&context), DispatchOutcome::Ignored, 0);
            return Vec::new();
        }

        let cmd = match document.get("cmd") {
            None => {
                let context = self.context(Command::Invalid, ENTRY_JSON);
                let missing = Err(ErrorCode::CommandMissing);
                return self.complete(Command::Invalid, missing, &state, &context);
            }
            Some(Value::String(name)) => Command::resolve(name),
            Some(_) => Command::Invalid,
        };

        let context = self.context(cmd, ENTRY_JSON);
        self.log_inbound(cmd, &context);
        let prepared = if cmd.carries_payload() {
            validate(cmd, &document, self.config.coercion).map(Some)
        } else {
            Ok(None)
        };
        self.complete(cmd, prepared, &state, &context)
    }

    /// Error type of the last call, cleared afterwards when `clear` is set.
    pub fn error_type(&mut self, clear: bool) -> ErrorType {
        self.latch.error_type(clear)
    }

    /// Error code of the last call, cleared afterwards when `clear` is set.
    pub fn error_code(&mut self, clear: bool) -> ErrorCode {
        self.latch.error_code(clear)
    }

    /// Reset the latched error type.
    pub fn clear_error_type(&mut self) {
        self.latch.clear_type();
    }

    /// Reset the latched error code.
    pub fn clear_error_code(&mut self) {
        self.latch.clear_code();
    }

    /// Failure reported by the last call, translator or device side.
    pub fn last_fault(&self) -> Option<&Fault> {
        self.last_fault.as_ref()
    }

    fn prepare_call(&mut self) -> Option<SharedDeviceState> {
        self.latch.reset();
        self.last_fault = None;
        self.sequence += 1;
        if self.state.is_none() {
            jsm_error!("translator used before begin; call begin with the device state first");
        }
        self.state.clone()
    }

    fn context(&self, cmd: Command, entry: &'static str) -> LogContext<'static> {
        LogContext::new()
            .with_command(cmd.wire_name())
            .with_entry(entry)
            .with_sequence(self.sequence)
    }

    fn log_inbound(&self, cmd: Command, context: &LogContext<'_>) {
        if !cmd.is_raw_poll() {
            jsm_info!(context = context, "request received, direction {}", cmd.direction());
        }
    }

    fn complete(
        &mut self,
        cmd: Command,
        prepared: Prepared,
        state: &SharedDeviceState,
        context: &LogContext<'_>,
    ) -> Vec<u8> {
        let fault = match prepared {
            Ok(payload) => self.execute(cmd, payload, state),
            Err(code) => Some(Fault::Request(code)),
        };
        if let Some(Fault::Request(code)) = &fault {
            self.latch.raise(*code);
        }

        let (output, fault) = self.render(cmd, fault, state);
        if !cmd.is_raw_poll() || !output.is_empty() {
            let outcome = match (&fault, output.is_empty()) {
                (_, true) => DispatchOutcome::Ignored,
                (Some(_), false) => DispatchOutcome::Fault,
                (None, false) => DispatchOutcome::Success,
            };
            if let Some(fault) = &fault {
                jsm_debug!(context = *context, "{}", fault);
            }
            log_dispatch_outcome(Some(context), outcome, output.len());
        }
        self.last_fault = fault;
        output
    }

    fn execute(
        &mut self,
        cmd: Command,
        payload: Option<Payload>,
        state: &SharedDeviceState,
    ) -> Option<Fault> {
        if cmd == Command::Invalid {
            return Some(Fault::Request(ErrorCode::CommandInvalid));
        }
        let mut guard = state.write();
        let Some(result) = invoke(&mut self.driver, cmd, payload, &mut guard) else {
            return Some(Fault::Request(ErrorCode::CommandInvalid));
        };
        drop(guard);
        result.err().map(Fault::from)
    }

    fn render(
        &mut self,
        cmd: Command,
        fault: Option<Fault>,
        state: &SharedDeviceState,
    ) -> (Vec<u8>, Option<Fault>) {
        let time = self.clock.elapsed_millis();
        let guard = state.read();
        let raw_hex = pending_hex(&self.driver, cmd);
        match self.encoder.encode(cmd, &guard, fault.as_ref(), raw_hex, time) {
            Ok(bytes) => (bytes, fault),
            Err(EncodeError::Overflow { size, limit }) => {
                warn!(command = %cmd, size, limit, "response exceeds the JSON buffer");
                self.latch.raise(ErrorCode::OutOfMemory);
                let fault = Fault::Request(ErrorCode::OutOfMemory);
                let bytes = self.encoder.encode_fault(cmd, &fault, time).unwrap_or_default();
                (bytes, Some(fault))
            }
            Err(err) => {
                warn!(command = %cmd, error = %err, "response could not be encoded");
                (Vec::new(), fault)
            }
        }
    }
}

/// Run the driver operation for `cmd`. `None` means the payload did not
/// belong to the command, which validation rules out.
fn invoke<D: MeterDriver>(
    driver: &mut D,
    cmd: Command,
    payload: Option<Payload>,
    state: &mut DeviceState,
) -> Option<DriverResult> {
    let result = match (cmd, payload) {
        (Command::GetPowerCutData, _) => driver.get_power_cut_data(state),
        (Command::GetMeasurementData, _) => driver.get_measurement_data(state),
        (Command::GetLimitData | Command::GetPurchaseData, _) => {
            driver.get_limit_and_purchase_data(state)
        }
        (Command::GetPowerCompanyData, _) => driver.get_power_company_data(state),
        (Command::SetLimitsData, Some(Payload::Limits(limits))) => {
            driver.set_limits_data(limits, state)
        }
        (Command::SetPurchaseData, Some(Payload::Purchase(purchase))) => {
            driver.set_purchase_data(purchase, state)
        }
        (Command::SetPowerCutData, Some(Payload::PowerCut(power_cut))) => {
            driver.set_power_cut_data(power_cut, state)
        }
        (Command::SetDelay, Some(Payload::Delay(delay))) => driver.set_delay(delay, state),
        (Command::SetReset, _) => driver.set_reset(state),
        (Command::SetPowerCompanyData, Some(Payload::Tariff(tariff))) => {
            driver.set_power_company_data(tariff, state)
        }
        #[cfg(feature = "raw-messages")]
        (Command::GetRawMessage, _) => driver.process_incoming_messages(),
        #[cfg(feature = "raw-messages")]
        (Command::SendRawMessage, Some(Payload::RawHex(hex))) => driver.send_hex_message(&hex),
        _ => return None,
    };
    Some(result)
}

#[cfg(feature = "raw-messages")]
fn pending_hex<D: MeterDriver>(driver: &D, cmd: Command) -> &str {
    match cmd {
        Command::GetRawMessage | Command::SendRawMessage => driver.incoming_hex_message(),
        _ => "",
    }
}

#[cfg(not(feature = "raw-messages"))]
fn pending_hex<D: MeterDriver>(_driver: &D, _cmd: Command) -> &'static str {
    ""
}
