//! ---
//! jsm_section: "02-command-protocol"
//! jsm_subsection: "module"
//! jsm_type: "source"
//! jsm_scope: "code"
//! jsm_description: "Meter driver seam and the device state it maintains."
//! jsm_version: "v0.0.0-prealpha"
//! jsm_owner: "tbd"
//! ---
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::DeviceFault;

/// Device state shared between the application and the translator.
pub type SharedDeviceState = Arc<RwLock<DeviceState>>;

/// Outcome of a single driver operation.
pub type DriverResult = Result<(), DeviceFault>;

/// Relay status and delayed cut configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PowerCutData {
    /// Relay is open.
    pub power_cut: bool,
    /// Bit flags describing why the relay opened.
    pub power_cut_details: u16,
    /// Delay in minutes applied before a scheduled cut.
    pub delay: u16,
    /// A delayed cut is armed.
    pub delay_set_power_cut: bool,
}

/// Latest electrical readings and accumulated counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MeasurementData {
    /// Amperes.
    pub current: f32,
    /// Volts.
    pub voltage: f32,
    /// Hertz.
    pub frequency: f32,
    /// kVAr.
    pub reactive_power: f32,
    /// kW.
    pub active_power: f32,
    /// Unitless, -1..=1.
    pub power_factor: f32,
    /// kWh since the last reset.
    pub lapse_of_time_total_energy: f32,
    /// Imported kWh since the last reset.
    pub lapse_of_time_import_energy: f32,
    /// Exported kWh since the last reset.
    pub lapse_of_time_export_energy: f32,
    /// Cost of the energy since the last reset.
    pub lapse_of_time_price_energy: f32,
    /// Meter reading in kWh.
    pub total_kwh: f32,
}

/// Protection limits and prepaid energy bookkeeping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LimitAndPurchaseData {
    /// Amperes.
    pub max_current_limit: u16,
    /// Volts.
    pub max_voltage_limit: u16,
    /// Volts.
    pub min_voltage_limit: u16,
    /// kWh purchased.
    pub energy_purchase: f32,
    /// kWh left of the purchase.
    pub energy_purchase_balance: f32,
    /// Balance at which the alarm fires.
    pub energy_purchase_alarm: f32,
    /// Prepaid mode is active.
    pub energy_purchase_status: bool,
}

/// Utility tariff configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PowerCompanyData {
    /// Meter reading when the tariff started.
    pub starting_kwh: f32,
    /// Price per kWh.
    pub price_kwh: f32,
}

/// Everything the translator can report about the meter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceState {
    /// Relay state.
    pub power_cut: PowerCutData,
    /// Readings.
    pub measurement: MeasurementData,
    /// Limits and purchase.
    pub limits: LimitAndPurchaseData,
    /// Tariff.
    pub power_company: PowerCompanyData,
}

impl DeviceState {
    /// Wrap a state for sharing with a [`crate::Translator`].
    pub fn shared(self) -> SharedDeviceState {
        Arc::new(RwLock::new(self))
    }
}

/// Requested protection limits, as received on the wire.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimitSettings {
    /// Amperes.
    pub max_current: f32,
    /// Volts.
    pub max_voltage: f32,
    /// Volts.
    pub min_voltage: f32,
}

/// Requested prepaid configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PurchaseSettings {
    /// kWh purchased.
    pub energy_purchase: f32,
    /// Alarm threshold in kWh.
    pub alarm: f32,
    /// Enable prepaid mode.
    pub enabled: bool,
}

/// Requested delayed cut.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelaySettings {
    /// Arm the delayed cut.
    pub delay_set_power_cut: bool,
    /// Minutes.
    pub delay: f32,
}

/// Requested tariff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TariffSettings {
    /// Meter reading when the tariff starts.
    pub starting_kwh: f32,
    /// Price per kWh.
    pub price_kwh: f32,
}

/// Operations a meter must provide to be driven by the translator.
///
/// Every operation receives the bound [`DeviceState`] and is expected to
/// refresh the records it touches. Failures carry the driver's own
/// type/description text, which is reported verbatim.
pub trait MeterDriver {
    /// Refresh [`DeviceState::power_cut`].
    fn get_power_cut_data(&mut self, state: &mut DeviceState) -> DriverResult;

    /// Refresh [`DeviceState::measurement`].
    fn get_measurement_data(&mut self, state: &mut DeviceState) -> DriverResult;

    /// Refresh [`DeviceState::limits`].
    fn get_limit_and_purchase_data(&mut self, state: &mut DeviceState) -> DriverResult;

    /// Refresh [`DeviceState::power_company`].
    fn get_power_company_data(&mut self, state: &mut DeviceState) -> DriverResult;

    /// Write protection limits.
    fn set_limits_data(&mut self, limits: LimitSettings, state: &mut DeviceState)
        -> DriverResult;

    /// Write prepaid configuration.
    fn set_purchase_data(
        &mut self,
        purchase: PurchaseSettings,
        state: &mut DeviceState,
    ) -> DriverResult;

    /// Open or close the relay.
    fn set_power_cut_data(&mut self, power_cut: bool, state: &mut DeviceState) -> DriverResult;

    /// Configure the delayed cut.
    fn set_delay(&mut self, delay: DelaySettings, state: &mut DeviceState) -> DriverResult;

    /// Zero the lapse-of-time counters.
    fn set_reset(&mut self, state: &mut DeviceState) -> DriverResult;

    /// Write the tariff.
    fn set_power_company_data(
        &mut self,
        tariff: TariffSettings,
        state: &mut DeviceState,
    ) -> DriverResult;

    /// Pull pending frames off the line so [`MeterDriver::incoming_hex_message`]
    /// reflects the newest one.
    #[cfg(feature = "raw-messages")]
    fn process_incoming_messages(&mut self) -> DriverResult {
        Ok(())
    }

    /// Transmit a raw frame given as hex text.
    #[cfg(feature = "raw-messages")]
    fn send_hex_message(&mut self, hex: &str) -> DriverResult {
        let _ = hex;
        Err(DeviceFault::new(
            "Smart Meter",
            "Raw messages are not supported by this driver",
        ))
    }

    /// Newest received frame as hex text, empty when nothing is pending.
    #[cfg(feature = "raw-messages")]
    fn incoming_hex_message(&self) -> &str {
        ""
    }
}
