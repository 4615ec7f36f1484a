//! ---
//! jsm_section: "04-simulation"
//! jsm_subsection: "module"
//! jsm_type: "source"
//! jsm_scope: "code"
//! jsm_description: "In-memory DDS238 register model."
//! jsm_version: "v0.0.0-prealpha"
//! jsm_owner: "tbd"
//! ---
use std::collections::HashMap;

use jsm_common::config::MeterConfig;
use jsm_core::{
    DelaySettings, DeviceFault, DeviceState, DriverResult, LimitAndPurchaseData, LimitSettings,
    MeasurementData, MeterDriver, PowerCompanyData, PowerCutData, PurchaseSettings,
    TariffSettings,
};
use strum::{AsRefStr, Display};
use tracing::{debug, info};

#[cfg(feature = "raw-messages")]
use crate::raw::RawLink;

/// `error.type` text for every fault raised by the simulated meter.
pub const DEVICE_FAULT_KIND: &str = "Smart Meter";

/// Bits reported in `powerCutDetails`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum PowerCutReason {
    /// Opened by `setPowerCutData`.
    Manual,
    /// Current above the configured limit.
    OverCurrent,
    /// Voltage above the configured limit.
    OverVoltage,
    /// Voltage below the configured limit.
    UnderVoltage,
    /// Prepaid balance ran out.
    PurchaseExhausted,
    /// Armed delayed cut expired.
    Delayed,
}

impl PowerCutReason {
    /// Bit mask of this reason.
    pub const fn bit(self) -> u16 {
        match self {
            PowerCutReason::Manual => 0x01,
            PowerCutReason::OverCurrent => 0x02,
            PowerCutReason::OverVoltage => 0x04,
            PowerCutReason::UnderVoltage => 0x08,
            PowerCutReason::PurchaseExhausted => 0x10,
            PowerCutReason::Delayed => 0x20,
        }
    }
}

/// Driver entry points, used to count invocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum SimOperation {
    GetPowerCutData,
    GetMeasurementData,
    GetLimitAndPurchaseData,
    GetPowerCompanyData,
    SetLimitsData,
    SetPurchaseData,
    SetPowerCutData,
    SetDelay,
    SetReset,
    SetPowerCompanyData,
    ProcessIncomingMessages,
    SendHexMessage,
}

/// A DDS238 meter living entirely in memory.
#[derive(Debug, Clone)]
pub struct SimulatedMeter {
    registers: DeviceState,
    delay_remaining_secs: f32,
    pending_fault: Option<DeviceFault>,
    calls: HashMap<SimOperation, u32>,
    #[cfg(feature = "raw-messages")]
    link: RawLink,
}

impl Default for SimulatedMeter {
    fn default() -> Self {
        Self::from_config(&MeterConfig::default())
    }
}

impl SimulatedMeter {
    /// Build a meter seeded from `config`, relay closed and no load.
    pub fn from_config(config: &MeterConfig) -> Self {
        let registers = DeviceState {
            power_cut: PowerCutData::default(),
            measurement: MeasurementData {
                voltage: config.nominal_voltage,
                frequency: config.nominal_frequency,
                power_factor: 1.0,
                total_kwh: config.starting_kwh,
                ..MeasurementData::default()
            },
            limits: LimitAndPurchaseData {
                max_current_limit: config.max_current_limit,
                max_voltage_limit: config.max_voltage_limit,
                min_voltage_limit: config.min_voltage_limit,
                energy_purchase: config.energy_purchase,
                energy_purchase_balance: config.energy_purchase,
                energy_purchase_alarm: config.energy_purchase_alarm,
                energy_purchase_status: config.energy_purchase > 0.0,
            },
            power_company: PowerCompanyData {
                starting_kwh: config.starting_kwh,
                price_kwh: config.price_kwh,
            },
        };
        Self {
            registers,
            delay_remaining_secs: 0.0,
            pending_fault: None,
            calls: HashMap::new(),
            #[cfg(feature = "raw-messages")]
            link: RawLink::default(),
        }
    }

    /// Replace the instantaneous readings. Powers are derived from the inputs.
    pub fn with_readings(mut self, current: f32, voltage: f32, frequency: f32, power_factor: f32) -> Self {
        self.set_readings(current, voltage, frequency, power_factor);
        self
    }

    /// In-place variant of [`SimulatedMeter::with_readings`].
    pub fn set_readings(&mut self, current: f32, voltage: f32, frequency: f32, power_factor: f32) {
        let pf = power_factor.clamp(-1.0, 1.0);
        let apparent_kva = current * voltage / 1000.0;
        let m = &mut self.registers.measurement;
        m.current = current;
        m.voltage = voltage;
        m.frequency = frequency;
        m.power_factor = pf;
        m.active_power = apparent_kva * pf;
        m.reactive_power = apparent_kva * (1.0 - pf * pf).sqrt();
    }

    /// Current register contents.
    pub fn registers(&self) -> &DeviceState {
        &self.registers
    }

    /// Make the next driver call fail with `fault`.
    pub fn inject_fault(&mut self, fault: DeviceFault) {
        self.pending_fault = Some(fault);
    }

    /// How many times `operation` has been invoked.
    pub fn call_count(&self, operation: SimOperation) -> u32 {
        self.calls.get(&operation).copied().unwrap_or(0)
    }

    /// Queue a frame for `getRawMessage` to pick up.
    #[cfg(feature = "raw-messages")]
    pub fn queue_incoming(&mut self, frame: impl Into<Vec<u8>>) {
        self.link.queue_incoming(frame);
    }

    /// Frames sent through `sendRawMessage`.
    #[cfg(feature = "raw-messages")]
    pub fn sent_frames(&self) -> &[Vec<u8>] {
        self.link.sent_frames()
    }

    /// Let `seconds` of wall time pass: integrate energy, run protection and
    /// count down an armed delayed cut.
    pub fn advance(&mut self, seconds: f32) {
        if seconds <= 0.0 {
            return;
        }
        if !self.registers.power_cut.power_cut {
            self.integrate(seconds);
        }
        self.check_protection();
        self.count_down(seconds);
    }

    fn integrate(&mut self, seconds: f32) {
        let hours = seconds / 3600.0;
        let energy = self.registers.measurement.active_power * hours;
        let price = self.registers.power_company.price_kwh;
        let m = &mut self.registers.measurement;
        m.lapse_of_time_total_energy += energy.abs();
        if energy >= 0.0 {
            m.lapse_of_time_import_energy += energy;
            m.lapse_of_time_price_energy += energy * price;
        } else {
            m.lapse_of_time_export_energy += -energy;
        }
        m.total_kwh += energy;

        let limits = &mut self.registers.limits;
        if limits.energy_purchase_status && energy > 0.0 {
            limits.energy_purchase_balance = (limits.energy_purchase_balance - energy).max(0.0);
        }
    }

    fn check_protection(&mut self) {
        let m = self.registers.measurement;
        let limits = self.registers.limits;
        if m.current > f32::from(limits.max_current_limit) {
            self.cut(PowerCutReason::OverCurrent);
        }
        if m.voltage > f32::from(limits.max_voltage_limit) {
            self.cut(PowerCutReason::OverVoltage);
        }
        if m.voltage < f32::from(limits.min_voltage_limit) {
            self.cut(PowerCutReason::UnderVoltage);
        }
        if limits.energy_purchase_status && limits.energy_purchase_balance <= 0.0 {
            self.cut(PowerCutReason::PurchaseExhausted);
        }
    }

    fn count_down(&mut self, seconds: f32) {
        if !self.registers.power_cut.delay_set_power_cut {
            return;
        }
        self.delay_remaining_secs -= seconds;
        if self.delay_remaining_secs <= 0.0 {
            self.delay_remaining_secs = 0.0;
            self.registers.power_cut.delay_set_power_cut = false;
            self.cut(PowerCutReason::Delayed);
        }
    }

    fn cut(&mut self, reason: PowerCutReason) {
        let relay = &mut self.registers.power_cut;
        if relay.power_cut_details & reason.bit() == 0 {
            info!(reason = %reason, "simulated relay opened");
        }
        relay.power_cut = true;
        relay.power_cut_details |= reason.bit();
    }

    /// Count the call and consume an injected fault, if any.
    fn enter(&mut self, operation: SimOperation) -> DriverResult {
        *self.calls.entry(operation).or_insert(0) += 1;
        debug!(operation = %operation, "simulated meter call");
        match self.pending_fault.take() {
            Some(fault) => Err(fault),
            None => Ok(()),
        }
    }
}

fn out_of_range(what: &str) -> DeviceFault {
    DeviceFault::new(DEVICE_FAULT_KIND, format!("{what} out of range"))
}

fn register_value(value: f32, what: &str) -> Result<u16, DeviceFault> {
    if !value.is_finite() || value < 0.0 || value > f32::from(u16::MAX) {
        return Err(out_of_range(what));
    }
    Ok(value.round() as u16)
}

fn non_negative(value: f32, what: &str) -> Result<f32, DeviceFault> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(out_of_range(what))
    }
}

impl MeterDriver for SimulatedMeter {
    fn get_power_cut_data(&mut self, state: &mut DeviceState) -> DriverResult {
        self.enter(SimOperation::GetPowerCutData)?;
        state.power_cut = self.registers.power_cut;
        Ok(())
    }

    fn get_measurement_data(&mut self, state: &mut DeviceState) -> DriverResult {
        self.enter(SimOperation::GetMeasurementData)?;
        state.measurement = self.registers.measurement;
        Ok(())
    }

    fn get_limit_and_purchase_data(&mut self, state: &mut DeviceState) -> DriverResult {
        self.enter(SimOperation::GetLimitAndPurchaseData)?;
        state.limits = self.registers.limits;
        Ok(())
    }

    fn get_power_company_data(&mut self, state: &mut DeviceState) -> DriverResult {
        self.enter(SimOperation::GetPowerCompanyData)?;
        state.power_company = self.registers.power_company;
        Ok(())
    }

    fn set_limits_data(&mut self, limits: LimitSettings, state: &mut DeviceState) -> DriverResult {
        self.enter(SimOperation::SetLimitsData)?;
        let max_current = register_value(limits.max_current, "Current limit")?;
        let max_voltage = register_value(limits.max_voltage, "Voltage limit")?;
        let min_voltage = register_value(limits.min_voltage, "Voltage limit")?;
        if max_current == 0 {
            return Err(out_of_range("Current limit"));
        }
        if min_voltage >= max_voltage {
            return Err(out_of_range("Voltage limit"));
        }
        let registers = &mut self.registers.limits;
        registers.max_current_limit = max_current;
        registers.max_voltage_limit = max_voltage;
        registers.min_voltage_limit = min_voltage;
        state.limits = *registers;
        Ok(())
    }

    fn set_purchase_data(
        &mut self,
        purchase: PurchaseSettings,
        state: &mut DeviceState,
    ) -> DriverResult {
        self.enter(SimOperation::SetPurchaseData)?;
        let energy = non_negative(purchase.energy_purchase, "Energy purchase")?;
        let alarm = non_negative(purchase.alarm, "Energy purchase alarm")?;
        let registers = &mut self.registers.limits;
        registers.energy_purchase = energy;
        registers.energy_purchase_balance = energy;
        registers.energy_purchase_alarm = alarm;
        registers.energy_purchase_status = purchase.enabled;
        state.limits = *registers;
        Ok(())
    }

    fn set_power_cut_data(&mut self, power_cut: bool, state: &mut DeviceState) -> DriverResult {
        self.enter(SimOperation::SetPowerCutData)?;
        let relay = &mut self.registers.power_cut;
        relay.power_cut = power_cut;
        relay.power_cut_details = if power_cut {
            PowerCutReason::Manual.bit()
        } else {
            0
        };
        state.power_cut = *relay;
        Ok(())
    }

    fn set_delay(&mut self, delay: DelaySettings, state: &mut DeviceState) -> DriverResult {
        self.enter(SimOperation::SetDelay)?;
        let minutes = register_value(delay.delay, "Delay")?;
        let relay = &mut self.registers.power_cut;
        relay.delay = minutes;
        relay.delay_set_power_cut = delay.delay_set_power_cut;
        self.delay_remaining_secs = f32::from(minutes) * 60.0;
        state.power_cut = *relay;
        Ok(())
    }

    fn set_reset(&mut self, state: &mut DeviceState) -> DriverResult {
        self.enter(SimOperation::SetReset)?;
        let m = &mut self.registers.measurement;
        m.lapse_of_time_total_energy = 0.0;
        m.lapse_of_time_import_energy = 0.0;
        m.lapse_of_time_export_energy = 0.0;
        m.lapse_of_time_price_energy = 0.0;
        state.measurement = *m;
        Ok(())
    }

    fn set_power_company_data(
        &mut self,
        tariff: TariffSettings,
        state: &mut DeviceState,
    ) -> DriverResult {
        self.enter(SimOperation::SetPowerCompanyData)?;
        let starting_kwh = non_negative(tariff.starting_kwh, "Starting kWh")?;
        let price_kwh = non_negative(tariff.price_kwh, "Price")?;
        let registers = &mut self.registers.power_company;
        registers.starting_kwh = starting_kwh;
        registers.price_kwh = price_kwh;
        state.power_company = *registers;
        Ok(())
    }

    #[cfg(feature = "raw-messages")]
    fn process_incoming_messages(&mut self) -> DriverResult {
        *self
            .calls
            .entry(SimOperation::ProcessIncomingMessages)
            .or_insert(0) += 1;
        if let Some(fault) = self.pending_fault.take() {
            return Err(fault);
        }
        self.link.poll();
        Ok(())
    }

    #[cfg(feature = "raw-messages")]
    fn send_hex_message(&mut self, hex: &str) -> DriverResult {
        self.enter(SimOperation::SendHexMessage)?;
        self.link.send(hex)
    }

    #[cfg(feature = "raw-messages")]
    fn incoming_hex_message(&self) -> &str {
        self.link.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meter() -> SimulatedMeter {
        SimulatedMeter::default()
    }

    #[test]
    fn seeded_from_config() {
        let config = MeterConfig {
            starting_kwh: 1200.0,
            price_kwh: 0.21,
            ..MeterConfig::default()
        };
        let meter = SimulatedMeter::from_config(&config);
        let registers = meter.registers();
        assert_eq!(registers.limits.max_current_limit, config.max_current_limit);
        assert_eq!(registers.measurement.total_kwh, 1200.0);
        assert_eq!(registers.measurement.voltage, config.nominal_voltage);
        assert_eq!(registers.power_company.price_kwh, 0.21);
        assert!(!registers.power_cut.power_cut);
    }

    #[test]
    fn getters_copy_registers_into_state() {
        let mut meter = meter().with_readings(10.0, 230.0, 50.0, 0.8);
        let mut state = DeviceState::default();
        meter.get_measurement_data(&mut state).unwrap();
        assert_eq!(state.measurement.current, 10.0);
        assert!((state.measurement.active_power - 1.84).abs() < 1e-4);
        assert!((state.measurement.reactive_power - 1.38).abs() < 1e-4);
        assert_eq!(state.limits, LimitAndPurchaseData::default());
        assert_eq!(meter.call_count(SimOperation::GetMeasurementData), 1);
    }

    #[test]
    fn limits_are_range_checked() {
        let mut meter = meter();
        let mut state = DeviceState::default();
        let inverted = LimitSettings {
            max_current: 10.0,
            max_voltage: 180.0,
            min_voltage: 250.0,
        };
        let err = meter.set_limits_data(inverted, &mut state).unwrap_err();
        assert_eq!(err.kind, DEVICE_FAULT_KIND);
        assert_eq!(err.description, "Voltage limit out of range");

        let zero_current = LimitSettings {
            max_current: 0.0,
            max_voltage: 250.0,
            min_voltage: 180.0,
        };
        assert!(meter.set_limits_data(zero_current, &mut state).is_err());

        let valid = LimitSettings {
            max_current: 32.4,
            max_voltage: 250.0,
            min_voltage: 180.0,
        };
        meter.set_limits_data(valid, &mut state).unwrap();
        assert_eq!(state.limits.max_current_limit, 32);
        assert_eq!(meter.call_count(SimOperation::SetLimitsData), 3);
    }

    #[test]
    fn injected_fault_fails_only_the_next_call() {
        let mut meter = meter();
        let mut state = DeviceState::default();
        meter.inject_fault(DeviceFault::new(DEVICE_FAULT_KIND, "Timeout"));
        let err = meter.get_power_cut_data(&mut state).unwrap_err();
        assert_eq!(err.description, "Timeout");
        assert!(meter.get_power_cut_data(&mut state).is_ok());
    }

    #[test]
    fn reset_zeroes_lapse_counters_only() {
        let mut meter = meter().with_readings(20.0, 230.0, 50.0, 1.0);
        meter.advance(3600.0);
        let total_before = meter.registers().measurement.total_kwh;
        assert!(meter.registers().measurement.lapse_of_time_import_energy > 4.5);

        let mut state = DeviceState::default();
        meter.set_reset(&mut state).unwrap();
        assert_eq!(state.measurement.lapse_of_time_total_energy, 0.0);
        assert_eq!(state.measurement.lapse_of_time_price_energy, 0.0);
        assert_eq!(state.measurement.total_kwh, total_before);
    }

    #[test]
    fn manual_cut_sets_details() {
        let mut meter = meter();
        let mut state = DeviceState::default();
        meter.set_power_cut_data(true, &mut state).unwrap();
        assert!(state.power_cut.power_cut);
        assert_eq!(state.power_cut.power_cut_details, PowerCutReason::Manual.bit());
        meter.set_power_cut_data(false, &mut state).unwrap();
        assert_eq!(state.power_cut.power_cut_details, 0);
    }

    #[test]
    fn protection_opens_relay_on_over_current() {
        let mut meter = meter().with_readings(80.0, 230.0, 50.0, 1.0);
        meter.advance(1.0);
        let relay = meter.registers().power_cut;
        assert!(relay.power_cut);
        assert_ne!(relay.power_cut_details & PowerCutReason::OverCurrent.bit(), 0);
    }

    #[test]
    fn purchase_balance_runs_out() {
        let mut meter = meter().with_readings(10.0, 230.0, 50.0, 1.0);
        let mut state = DeviceState::default();
        let purchase = PurchaseSettings {
            energy_purchase: 1.0,
            alarm: 0.2,
            enabled: true,
        };
        meter.set_purchase_data(purchase, &mut state).unwrap();
        assert_eq!(state.limits.energy_purchase_balance, 1.0);
        meter.advance(3600.0);
        let registers = meter.registers();
        assert_eq!(registers.limits.energy_purchase_balance, 0.0);
        assert_ne!(
            registers.power_cut.power_cut_details & PowerCutReason::PurchaseExhausted.bit(),
            0
        );
    }

    #[test]
    fn delayed_cut_fires_after_countdown() {
        let mut meter = meter();
        let mut state = DeviceState::default();
        let delay = DelaySettings {
            delay_set_power_cut: true,
            delay: 2.0,
        };
        meter.set_delay(delay, &mut state).unwrap();
        assert_eq!(state.power_cut.delay, 2);
        meter.advance(60.0);
        assert!(!meter.registers().power_cut.power_cut);
        meter.advance(61.0);
        let relay = meter.registers().power_cut;
        assert!(relay.power_cut);
        assert!(!relay.delay_set_power_cut);
        assert_eq!(relay.power_cut_details, PowerCutReason::Delayed.bit());
    }

    #[test]
    fn negative_tariff_is_rejected() {
        let mut meter = meter();
        let mut state = DeviceState::default();
        let tariff = TariffSettings {
            starting_kwh: 10.0,
            price_kwh: -0.1,
        };
        let err = meter.set_power_company_data(tariff, &mut state).unwrap_err();
        assert_eq!(err.description, "Price out of range");
        assert_eq!(state.power_company, PowerCompanyData::default());
    }

    #[test]
    fn operation_names_are_snake_case() {
        assert_eq!(SimOperation::SetPowerCompanyData.as_ref(), "set_power_company_data");
        assert_eq!(PowerCutReason::PurchaseExhausted.to_string(), "purchase_exhausted");
    }
}
