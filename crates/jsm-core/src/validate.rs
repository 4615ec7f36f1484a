//! ---
//! jsm_section: "02-command-protocol"
//! jsm_subsection: "module"
//! jsm_type: "source"
//! jsm_scope: "code"
//! jsm_description: "Request decoding and payload validation."
//! jsm_version: "v0.0.0-prealpha"
//! jsm_owner: "tbd"
//! ---
use jsm_common::config::{CoercionPolicy, TranslatorConfig};
use serde_json::error::Category;
use serde_json::{Map, Value};
use tracing::debug;

use crate::command::Command;
use crate::driver::{DelaySettings, LimitSettings, PurchaseSettings, TariffSettings};
use crate::error::ErrorCode;

/// Bounds applied while decoding a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeLimits {
    /// Largest accepted request in bytes.
    pub max_bytes: usize,
    /// Deepest accepted object/array nesting.
    pub max_nesting: usize,
}

impl From<&TranslatorConfig> for DecodeLimits {
    fn from(config: &TranslatorConfig) -> Self {
        Self {
            max_bytes: config.json_buffer,
            max_nesting: config.max_nesting,
        }
    }
}

/// Typed contents of a validated `"data"` object.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// `setLimitsData`
    Limits(LimitSettings),
    /// `setPurchaseData`
    Purchase(PurchaseSettings),
    /// `setPowerCutData`
    PowerCut(bool),
    /// `setDelay`
    Delay(DelaySettings),
    /// `setPowerCompanyData`
    Tariff(TariffSettings),
    /// `sendRawMessage`
    #[cfg(feature = "raw-messages")]
    RawHex(String),
}

/// Fields that must be present in `"data"` for `cmd`. Empty for commands
/// without a payload.
pub fn required_fields(cmd: Command) -> &'static [&'static str] {
    match cmd {
        Command::SetLimitsData => &["maxCurrentLimit", "maxVoltageLimit", "minVoltageLimit"],
        Command::SetPurchaseData => &[
            "energyPurchase",
            "energyPurchaseAlarm",
            "energyPurchaseStatus",
        ],
        Command::SetPowerCutData => &["powerCut"],
        Command::SetDelay => &["delaySetPowerCut", "delay"],
        Command::SetPowerCompanyData => &["startingKWh", "priceKWh"],
        #[cfg(feature = "raw-messages")]
        Command::SendRawMessage => &["hex"],
        _ => &[],
    }
}

/// Parse a request buffer into a JSON document.
pub fn decode(raw: &[u8], limits: &DecodeLimits) -> Result<Value, ErrorCode> {
    if raw.len() > limits.max_bytes {
        return Err(ErrorCode::OutOfMemory);
    }
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Err(ErrorCode::OtherDecodeError);
    }
    let document: Value = serde_json::from_slice(raw).map_err(|err| classify(&err))?;
    if nesting_depth(&document) > limits.max_nesting {
        return Err(ErrorCode::TooDeep);
    }
    Ok(document)
}

fn classify(err: &serde_json::Error) -> ErrorCode {
    let code = match err.classify() {
        Category::Eof => ErrorCode::IncompleteInput,
        Category::Syntax if err.to_string().starts_with("recursion limit exceeded") => {
            ErrorCode::TooDeep
        }
        Category::Syntax => ErrorCode::InvalidInput,
        Category::Data => ErrorCode::UnsupportedFeature,
        Category::Io => ErrorCode::OtherDecodeError,
    };
    debug!(error = %err, line = err.line(), column = err.column(), code = ?code, "request rejected by decoder");
    code
}

fn nesting_depth(value: &Value) -> usize {
    match value {
        Value::Array(items) => 1 + items.iter().map(nesting_depth).max().unwrap_or(0),
        Value::Object(fields) => 1 + fields.values().map(nesting_depth).max().unwrap_or(0),
        _ => 0,
    }
}

/// Check the `"data"` object of `document` for `cmd` and extract its fields.
///
/// Stages run in order and stop at the first failure: `"data"` must be an
/// object ([`ErrorCode::PayloadMissing`]), then every required field must be
/// present ([`ErrorCode::PayloadInvalid`]), then fields are read according to
/// `policy`.
pub fn validate(
    cmd: Command,
    document: &Value,
    policy: CoercionPolicy,
) -> Result<Payload, ErrorCode> {
    let data = document
        .get("data")
        .and_then(Value::as_object)
        .ok_or(ErrorCode::PayloadMissing)?;

    let required = required_fields(cmd);
    if required.is_empty() {
        return Err(ErrorCode::CommandInvalid);
    }
    if let Some(missing) = required.iter().find(|field| !data.contains_key(**field)) {
        debug!(command = %cmd, field = *missing, "required payload field missing");
        return Err(ErrorCode::PayloadInvalid);
    }

    let fields = Fields { data, policy };
    let payload = match cmd {
        Command::SetLimitsData => Payload::Limits(LimitSettings {
            max_current: fields.number("maxCurrentLimit")?,
            max_voltage: fields.number("maxVoltageLimit")?,
            min_voltage: fields.number("minVoltageLimit")?,
        }),
        Command::SetPurchaseData => Payload::Purchase(PurchaseSettings {
            energy_purchase: fields.number("energyPurchase")?,
            alarm: fields.number("energyPurchaseAlarm")?,
            enabled: fields.flag("energyPurchaseStatus")?,
        }),
        Command::SetPowerCutData => Payload::PowerCut(fields.flag("powerCut")?),
        Command::SetDelay => Payload::Delay(DelaySettings {
            delay_set_power_cut: fields.flag("delaySetPowerCut")?,
            delay: fields.number("delay")?,
        }),
        Command::SetPowerCompanyData => Payload::Tariff(TariffSettings {
            starting_kwh: fields.number("startingKWh")?,
            price_kwh: fields.number("priceKWh")?,
        }),
        #[cfg(feature = "raw-messages")]
        Command::SendRawMessage => Payload::RawHex(fields.text("hex")?),
        _ => return Err(ErrorCode::CommandInvalid),
    };
    Ok(payload)
}

struct Fields<'a> {
    data: &'a Map<String, Value>,
    policy: CoercionPolicy,
}

impl Fields<'_> {
    fn mismatch<T>(&self, key: &str, fallback: T) -> Result<T, ErrorCode> {
        match self.policy {
            CoercionPolicy::Lenient => Ok(fallback),
            CoercionPolicy::Strict => {
                debug!(field = key, "payload field has the wrong type");
                Err(ErrorCode::PayloadInvalid)
            }
        }
    }

    fn number(&self, key: &str) -> Result<f32, ErrorCode> {
        match self.data.get(key).and_then(Value::as_f64) {
            Some(value) => Ok(value as f32),
            None => self.mismatch(key, 0.0),
        }
    }

    fn flag(&self, key: &str) -> Result<bool, ErrorCode> {
        match self.data.get(key) {
            Some(Value::Bool(value)) => Ok(*value),
            Some(Value::Number(number)) if self.policy == CoercionPolicy::Lenient => {
                Ok(number.as_f64().is_some_and(|value| value != 0.0))
            }
            _ => self.mismatch(key, false),
        }
    }

    #[cfg(feature = "raw-messages")]
    fn text(&self, key: &str) -> Result<String, ErrorCode> {
        match self.data.get(key).and_then(Value::as_str) {
            Some(value) => Ok(value.to_owned()),
            None => self.mismatch(key, String::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn limits() -> DecodeLimits {
        DecodeLimits {
            max_bytes: 512,
            max_nesting: 10,
        }
    }

    #[test]
    fn decode_maps_decoder_failures() {
        assert_eq!(decode(b"{\"cmd\":", &limits()), Err(ErrorCode::IncompleteInput));
        assert_eq!(decode(b"{cmd}", &limits()), Err(ErrorCode::InvalidInput));
        assert_eq!(decode(b"{\"a\":1} x", &limits()), Err(ErrorCode::InvalidInput));
        assert_eq!(decode(b"   ", &limits()), Err(ErrorCode::OtherDecodeError));
        assert_eq!(decode(b"", &limits()), Err(ErrorCode::OtherDecodeError));
    }

    #[test]
    fn decode_enforces_buffer_size() {
        let tight = DecodeLimits {
            max_bytes: 8,
            max_nesting: 10,
        };
        assert_eq!(
            decode(br#"{"cmd":"getLimitData"}"#, &tight),
            Err(ErrorCode::OutOfMemory)
        );
    }

    #[test]
    fn decode_enforces_nesting_limit() {
        let shallow = DecodeLimits {
            max_bytes: 512,
            max_nesting: 2,
        };
        assert!(decode(br#"{"data":{"a":1}}"#, &shallow).is_ok());
        assert_eq!(
            decode(br#"{"data":{"a":[1]}}"#, &shallow),
            Err(ErrorCode::TooDeep)
        );

        let deep = format!("{}{}", "[".repeat(200), "]".repeat(200));
        let roomy = DecodeLimits {
            max_bytes: 1024,
            max_nesting: 500,
        };
        assert_eq!(decode(deep.as_bytes(), &roomy), Err(ErrorCode::TooDeep));
    }

    #[test]
    fn missing_or_non_object_data_is_payload_missing() {
        for document in [json!({}), json!({"data": 5}), json!({"data": [1, 2]}), json!([])] {
            assert_eq!(
                validate(Command::SetLimitsData, &document, CoercionPolicy::Lenient),
                Err(ErrorCode::PayloadMissing),
                "{document}"
            );
        }
    }

    #[test]
    fn incomplete_data_is_payload_invalid() {
        let document = json!({"data": {"maxCurrentLimit": 10}});
        assert_eq!(
            validate(Command::SetLimitsData, &document, CoercionPolicy::Lenient),
            Err(ErrorCode::PayloadInvalid)
        );
    }

    #[test]
    fn extracts_typed_settings() {
        let document = json!({"data": {
            "maxCurrentLimit": 10,
            "maxVoltageLimit": 250,
            "minVoltageLimit": 180.5
        }});
        assert_eq!(
            validate(Command::SetLimitsData, &document, CoercionPolicy::Lenient),
            Ok(Payload::Limits(LimitSettings {
                max_current: 10.0,
                max_voltage: 250.0,
                min_voltage: 180.5,
            }))
        );

        let document = json!({"data": {"delaySetPowerCut": true, "delay": 15}});
        assert_eq!(
            validate(Command::SetDelay, &document, CoercionPolicy::Lenient),
            Ok(Payload::Delay(DelaySettings {
                delay_set_power_cut: true,
                delay: 15.0,
            }))
        );
    }

    #[test]
    fn lenient_policy_coerces_mismatched_types() {
        let document = json!({"data": {
            "energyPurchase": "lots",
            "energyPurchaseAlarm": null,
            "energyPurchaseStatus": 1
        }});
        assert_eq!(
            validate(Command::SetPurchaseData, &document, CoercionPolicy::Lenient),
            Ok(Payload::Purchase(PurchaseSettings {
                energy_purchase: 0.0,
                alarm: 0.0,
                enabled: true,
            }))
        );

        let document = json!({"data": {"powerCut": "yes"}});
        assert_eq!(
            validate(Command::SetPowerCutData, &document, CoercionPolicy::Lenient),
            Ok(Payload::PowerCut(false))
        );
    }

    #[test]
    fn strict_policy_rejects_mismatched_types() {
        let document = json!({"data": {"startingKWh": "12", "priceKWh": 0.2}});
        assert_eq!(
            validate(Command::SetPowerCompanyData, &document, CoercionPolicy::Strict),
            Err(ErrorCode::PayloadInvalid)
        );

        let document = json!({"data": {"powerCut": 1}});
        assert_eq!(
            validate(Command::SetPowerCutData, &document, CoercionPolicy::Strict),
            Err(ErrorCode::PayloadInvalid)
        );

        let document = json!({"data": {"startingKWh": 12, "priceKWh": 0.2}});
        assert!(validate(Command::SetPowerCompanyData, &document, CoercionPolicy::Strict).is_ok());
    }

    #[test]
    fn commands_without_payload_are_not_validated() {
        let document = json!({"data": {}});
        assert!(required_fields(Command::GetLimitData).is_empty());
        assert_eq!(
            validate(Command::SetReset, &document, CoercionPolicy::Lenient),
            Err(ErrorCode::CommandInvalid)
        );
    }

    #[cfg(feature = "raw-messages")]
    #[test]
    fn raw_hex_is_read_as_text() {
        let document = json!({"data": {"hex": "01 03 00 00"}});
        assert_eq!(
            validate(Command::SendRawMessage, &document, CoercionPolicy::Lenient),
            Ok(Payload::RawHex("01 03 00 00".to_owned()))
        );
    }
}
