//! ---
//! jsm_section: "02-command-protocol"
//! jsm_subsection: "module"
//! jsm_type: "source"
//! jsm_scope: "code"
//! jsm_description: "Response document encoding."
//! jsm_version: "v0.0.0-prealpha"
//! jsm_owner: "tbd"
//! ---
use std::fmt;

use jsm_common::config::TranslatorConfig;
use serde::{Serialize, Serializer};

use crate::command::Command;
use crate::driver::DeviceState;
use crate::error::{EncodeError, Fault};

/// Rendering options for response documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Indent the output.
    pub pretty: bool,
    /// Largest response in bytes.
    pub max_bytes: usize,
}

impl From<&TranslatorConfig> for EncodeOptions {
    fn from(config: &TranslatorConfig) -> Self {
        Self {
            pretty: config.pretty,
            max_bytes: config.json_buffer,
        }
    }
}

/// A reading rounded half-up to a fixed number of decimals and serialized as
/// a JSON string, e.g. `Fixed::new(12.3456, 3)` becomes `"12.346"`.
///
/// The value is scaled by `10^places` in `f64`, `0.5` is added and the result
/// is floored, so exact ties move towards positive infinity
/// (`0.125 -> "0.13"`, `-0.125 -> "-0.12"`). The decimal point is inserted
/// into the integer result; no second float formatting happens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fixed {
    value: f32,
    places: u8,
}

impl Fixed {
    /// Wrap `value` for rendering with `places` decimals.
    pub const fn new(value: f32, places: u8) -> Self {
        Self { value, places }
    }
}

impl fmt::Display for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let factor = 10_u64.pow(u32::from(self.places));
        let scaled = (f64::from(self.value) * factor as f64 + 0.5).floor();
        if !scaled.is_finite() || scaled.abs() >= i64::MAX as f64 {
            return write!(f, "{}", self.value);
        }
        let scaled = scaled as i64;
        let sign = if scaled < 0 { "-" } else { "" };
        let magnitude = scaled.unsigned_abs();
        if self.places == 0 {
            return write!(f, "{sign}{magnitude}");
        }
        write!(
            f,
            "{sign}{}.{:0width$}",
            magnitude / factor,
            magnitude % factor,
            width = usize::from(self.places)
        )
    }
}

impl Serialize for Fixed {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Serialize)]
struct ResponseDocument<'a> {
    response: &'static str,
    time: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<ResponseData<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorObject<'a>>,
}

#[derive(Serialize)]
struct ErrorObject<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    description: &'a str,
}

#[derive(Serialize)]
#[serde(untagged)]
enum ResponseData<'a> {
    PowerCut(PowerCutView),
    Measurement(MeasurementView),
    Limits(LimitsView),
    Purchase(PurchaseView),
    Delay(DelayView),
    Reset(ResetView),
    PowerCompany(PowerCompanyView),
    #[cfg_attr(not(feature = "raw-messages"), allow(dead_code))]
    Raw(RawView<'a>),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PowerCutView {
    power_cut: bool,
    power_cut_details: u16,
    delay: u16,
    delay_set_power_cut: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MeasurementView {
    current: Fixed,
    voltage: Fixed,
    frequency: Fixed,
    reactive_power: Fixed,
    active_power: Fixed,
    power_factor: Fixed,
    lapse_of_time_total_energy: Fixed,
    lapse_of_time_import_energy: Fixed,
    lapse_of_time_export_energy: Fixed,
    lapse_of_time_price_energy: Fixed,
    #[serde(rename = "totalKWh")]
    total_kwh: Fixed,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LimitsView {
    max_current_limit: u16,
    max_voltage_limit: u16,
    min_voltage_limit: u16,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PurchaseView {
    energy_purchase: Fixed,
    energy_purchase_balance: Fixed,
    energy_purchase_alarm: Fixed,
    energy_purchase_status: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DelayView {
    delay: u16,
    delay_set_power_cut: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResetView {
    lapse_of_time_total_energy: Fixed,
    lapse_of_time_import_energy: Fixed,
    lapse_of_time_export_energy: Fixed,
    lapse_of_time_price_energy: Fixed,
    #[serde(rename = "totalKWh")]
    total_kwh: Fixed,
}

#[derive(Serialize)]
struct PowerCompanyView {
    #[serde(rename = "startingKWh")]
    starting_kwh: Fixed,
    #[serde(rename = "priceKWh")]
    price_kwh: Fixed,
}

#[derive(Serialize)]
#[cfg_attr(not(feature = "raw-messages"), allow(dead_code))]
struct RawView<'a> {
    hex: &'a str,
}

/// Builds one response document per call from the current device state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseEncoder {
    options: EncodeOptions,
}

impl ResponseEncoder {
    /// Encoder rendering with `options`.
    pub const fn new(options: EncodeOptions) -> Self {
        Self { options }
    }

    /// Active options.
    pub const fn options(&self) -> EncodeOptions {
        self.options
    }

    /// Switch between compact and indented output.
    pub fn set_pretty(&mut self, pretty: bool) {
        self.options.pretty = pretty;
    }

    /// Encode the response for `cmd`.
    ///
    /// `raw_hex` is the driver's pending incoming frame and is only read for
    /// the raw passthrough commands. A raw poll with nothing pending yields an
    /// empty buffer.
    pub fn encode(
        &self,
        cmd: Command,
        state: &DeviceState,
        fault: Option<&Fault>,
        raw_hex: &str,
        time: u64,
    ) -> Result<Vec<u8>, EncodeError> {
        if cmd.is_raw_poll() && raw_hex.is_empty() {
            return Ok(Vec::new());
        }
        let document = ResponseDocument {
            response: cmd.wire_name(),
            time,
            data: data_for(cmd, state, raw_hex),
            error: fault.and_then(error_object),
        };
        self.render(&document)
    }

    /// Encode a response for `cmd` that carries only the error object.
    pub fn encode_fault(&self, cmd: Command, fault: &Fault, time: u64) -> Result<Vec<u8>, EncodeError> {
        let document = ResponseDocument {
            response: cmd.wire_name(),
            time,
            data: None,
            error: error_object(fault),
        };
        self.render(&document)
    }

    fn render(&self, document: &ResponseDocument<'_>) -> Result<Vec<u8>, EncodeError> {
        let bytes = if self.options.pretty {
            serde_json::to_vec_pretty(document)?
        } else {
            serde_json::to_vec(document)?
        };
        if bytes.len() > self.options.max_bytes {
            return Err(EncodeError::Overflow {
                size: bytes.len(),
                limit: self.options.max_bytes,
            });
        }
        Ok(bytes)
    }
}

fn error_object(fault: &Fault) -> Option<ErrorObject<'_>> {
    let kind = fault.type_text();
    let description = fault.description_text();
    if kind.is_empty() || description.is_empty() {
        return None;
    }
    Some(ErrorObject { kind, description })
}

fn data_for<'a>(cmd: Command, state: &DeviceState, raw_hex: &'a str) -> Option<ResponseData<'a>> {
    let power_cut = &state.power_cut;
    let measurement = &state.measurement;
    let limits = &state.limits;
    let tariff = &state.power_company;

    let data = match cmd {
        Command::GetPowerCutData | Command::SetPowerCutData => ResponseData::PowerCut(PowerCutView {
            power_cut: power_cut.power_cut,
            power_cut_details: power_cut.power_cut_details,
            delay: power_cut.delay,
            delay_set_power_cut: power_cut.delay_set_power_cut,
        }),
        Command::GetMeasurementData => ResponseData::Measurement(MeasurementView {
            current: Fixed::new(measurement.current, 3),
            voltage: Fixed::new(measurement.voltage, 1),
            frequency: Fixed::new(measurement.frequency, 2),
            reactive_power: Fixed::new(measurement.reactive_power, 3),
            active_power: Fixed::new(measurement.active_power, 3),
            power_factor: Fixed::new(measurement.power_factor, 2),
            lapse_of_time_total_energy: Fixed::new(measurement.lapse_of_time_total_energy, 2),
            lapse_of_time_import_energy: Fixed::new(measurement.lapse_of_time_import_energy, 2),
            lapse_of_time_export_energy: Fixed::new(measurement.lapse_of_time_export_energy, 2),
            lapse_of_time_price_energy: Fixed::new(measurement.lapse_of_time_price_energy, 1),
            total_kwh: Fixed::new(measurement.total_kwh, 2),
        }),
        Command::GetLimitData | Command::SetLimitsData => ResponseData::Limits(LimitsView {
            max_current_limit: limits.max_current_limit,
            max_voltage_limit: limits.max_voltage_limit,
            min_voltage_limit: limits.min_voltage_limit,
        }),
        Command::GetPurchaseData | Command::SetPurchaseData => ResponseData::Purchase(PurchaseView {
            energy_purchase: Fixed::new(limits.energy_purchase, 2),
            energy_purchase_balance: Fixed::new(limits.energy_purchase_balance, 2),
            energy_purchase_alarm: Fixed::new(limits.energy_purchase_alarm, 2),
            energy_purchase_status: limits.energy_purchase_status,
        }),
        Command::SetDelay => ResponseData::Delay(DelayView {
            delay: power_cut.delay,
            delay_set_power_cut: power_cut.delay_set_power_cut,
        }),
        Command::SetReset => ResponseData::Reset(ResetView {
            lapse_of_time_total_energy: Fixed::new(measurement.lapse_of_time_total_energy, 2),
            lapse_of_time_import_energy: Fixed::new(measurement.lapse_of_time_import_energy, 2),
            lapse_of_time_export_energy: Fixed::new(measurement.lapse_of_time_export_energy, 2),
            lapse_of_time_price_energy: Fixed::new(measurement.lapse_of_time_price_energy, 2),
            total_kwh: Fixed::new(measurement.total_kwh, 2),
        }),
        Command::GetPowerCompanyData | Command::SetPowerCompanyData => {
            ResponseData::PowerCompany(PowerCompanyView {
                starting_kwh: Fixed::new(tariff.starting_kwh, 2),
                price_kwh: Fixed::new(tariff.price_kwh, 2),
            })
        }
        #[cfg(feature = "raw-messages")]
        Command::GetRawMessage | Command::SendRawMessage => ResponseData::Raw(RawView { hex: raw_hex }),
        Command::Invalid => return None,
    };
    #[cfg(not(feature = "raw-messages"))]
    let _ = raw_hex;
    Some(data)
}
