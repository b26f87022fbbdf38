use embassy_time::Duration;

use crate::sensors::SensorError;

/// Interval between pipeline ticks (one ADC sample, one detector update)
pub const REPORT_INTERVAL: Duration = Duration::from_secs(10);

/// Delay between sensor init attempts in the firmware
pub const INIT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Concentration reported when the ADC read fails
pub const FALLBACK_PPM: u16 = 0;

/// Datasheet Rs/R0 of the MQ-135 in clean air
pub const CLEAN_AIR_RATIO: f32 = 3.6;

/// Floor applied to the ADC voltage before it is used as a divisor
pub const MIN_ADC_VOLTAGE: f32 = 0.001;

/// Headroom kept below the supply rail when the sensor output saturates
pub const SUPPLY_HEADROOM: f32 = 0.01;

/// Floor applied to the computed sensor resistance (kΩ)
pub const MIN_SENSOR_RESISTANCE_KOHM: f32 = 0.01;

/// Static calibration of one physical MQ-135 unit and its analog front end
///
/// Resistances are in kΩ. `r0_kohm` is device specific and has to be
/// measured per unit, see [`Calibration::r0_from_clean_air`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    pub supply_voltage: f32,
    pub load_resistance_kohm: f32,
    /// Sensor output / ADC input; 1.0 when AOUT is wired straight to the pin
    pub divider_ratio: f32,
    pub adc_reference_voltage: f32,
    pub adc_resolution_bits: u8,
    pub r0_kohm: f32,
    /// `ppm = curve_a * (Rs/R0)^curve_b`
    pub curve_a: f32,
    pub curve_b: f32,
    pub max_ppm: u16,
    /// Heater settling time after init
    pub warm_up: Duration,
}

impl Calibration {
    /// MQ-135 on 5 V VBUS behind a 100k/100k divider into the ESP32-C6 ADC
    pub const fn mq135_default() -> Self {
        Self {
            supply_voltage: 5.0,
            load_resistance_kohm: 10.0,
            divider_ratio: 2.0,
            adc_reference_voltage: 3.3,
            adc_resolution_bits: 12,
            r0_kohm: 10.0,
            curve_a: 102.2,
            curve_b: -2.473,
            max_ppm: 1000,
            warm_up: Duration::from_secs(20),
        }
    }

    /// Largest raw value the ADC can produce (4095 at 12 bits)
    pub const fn full_scale(&self) -> u16 {
        let bits = if self.adc_resolution_bits > 16 { 16 } else { self.adc_resolution_bits };
        ((1u32 << bits) - 1) as u16
    }

    pub const fn with_r0(mut self, r0_kohm: f32) -> Self {
        self.r0_kohm = r0_kohm;
        self
    }

    /// Sensor resistance (kΩ) for a raw ADC sample, with the divider and
    /// singularity guards applied
    pub fn sensor_resistance(&self, raw: u16) -> f32 {
        let v_adc = (raw as f32 / self.full_scale() as f32) * self.adc_reference_voltage;
        let v_adc = v_adc.max(MIN_ADC_VOLTAGE);

        let mut v_sensor = v_adc * self.divider_ratio;
        if v_sensor >= self.supply_voltage {
            v_sensor = self.supply_voltage - SUPPLY_HEADROOM;
        }

        let rs = self.load_resistance_kohm * (self.supply_voltage - v_sensor) / v_sensor;
        if rs <= 0.0 {
            MIN_SENSOR_RESISTANCE_KOHM
        } else {
            rs
        }
    }

    /// Derive R0 from a raw sample taken in clean outdoor air after the
    /// sensor has been powered for at least 20 minutes
    pub fn r0_from_clean_air(&self, raw: u16) -> f32 {
        self.sensor_resistance(raw) / CLEAN_AIR_RATIO
    }

    pub fn validate(&self) -> Result<(), SensorError> {
        let positive = [
            self.supply_voltage,
            self.load_resistance_kohm,
            self.divider_ratio,
            self.adc_reference_voltage,
            self.r0_kohm,
            self.curve_a,
        ];
        if positive.iter().any(|v| !v.is_finite() || *v <= 0.0) {
            return Err(SensorError::ConfigError);
        }
        if !self.curve_b.is_finite() || self.curve_b >= 0.0 {
            return Err(SensorError::ConfigError);
        }
        if self.adc_resolution_bits == 0 || self.adc_resolution_bits > 16 {
            return Err(SensorError::ConfigError);
        }
        if self.max_ppm == 0 {
            return Err(SensorError::ConfigError);
        }
        Ok(())
    }
}

impl Default for Calibration {
    fn default() -> Self {
        Self::mq135_default()
    }
}

/// Tuning of the litter event detector. Tick counts assume [`REPORT_INTERVAL`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorConfig {
    /// EMA coefficient for the idle baseline (~200 s time constant at 0.05)
    pub baseline_alpha: f32,
    /// Excess over baseline that starts an event
    pub trigger_delta_ppm: f32,
    /// Margin over baseline that counts as "back to baseline"
    pub hysteresis_delta_ppm: f32,
    /// Consecutive near-baseline ticks that end an event
    pub end_ticks: u8,
    /// Ticks the classified event stays exposed
    pub cooldown_ticks: u8,
    /// Peak at or before this active tick classifies as urination
    pub fast_peak_ticks: u16,
    /// Peak excess above this classifies as urination regardless of timing
    pub high_delta_ppm: f32,
}

impl DetectorConfig {
    pub const fn litterbox_default() -> Self {
        Self {
            baseline_alpha: 0.05,
            trigger_delta_ppm: 10.0,
            hysteresis_delta_ppm: 3.0,
            end_ticks: 3,
            cooldown_ticks: 6,
            fast_peak_ticks: 3,
            high_delta_ppm: 30.0,
        }
    }

    pub fn validate(&self) -> Result<(), SensorError> {
        if !(self.baseline_alpha > 0.0 && self.baseline_alpha <= 1.0) {
            return Err(SensorError::ConfigError);
        }
        if !self.trigger_delta_ppm.is_finite() || !self.hysteresis_delta_ppm.is_finite() {
            return Err(SensorError::ConfigError);
        }
        if self.trigger_delta_ppm <= 0.0 {
            return Err(SensorError::ConfigError);
        }
        if self.hysteresis_delta_ppm >= self.trigger_delta_ppm {
            return Err(SensorError::ConfigError);
        }
        if self.end_ticks == 0 || self.cooldown_ticks == 0 || self.fast_peak_ticks == 0 {
            return Err(SensorError::ConfigError);
        }
        if !self.high_delta_ppm.is_finite() || self.high_delta_ppm < 0.0 {
            return Err(SensorError::ConfigError);
        }
        Ok(())
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self::litterbox_default()
    }
}
