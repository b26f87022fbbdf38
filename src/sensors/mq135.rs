//! MQ-135 NH₃ concentration estimator
//!
//! Electrical model of the module (AOUT across the on-board load resistor):
//!
//! ```text
//! AOUT  = VCC * RL / (Rs + RL)
//! V_adc = AOUT / divider_ratio
//! Rs    = RL * (VCC - AOUT) / AOUT
//! ppm   = A * (Rs / R0)^B
//! ```

use embassy_time::{Duration, Instant};
use log::debug;

use super::{ConcentrationReading, SensorError, SensorInfo};
use crate::config::Calibration;

pub const INFO: SensorInfo = SensorInfo {
    name: "MQ-135",
    gas: "NH3",
    version: "1.0.0",
    manufacturer: "Winsen Electronics",
};

/// Raw sample to ppm conversion
/// Stateless apart from the instant the sensor was powered up
#[derive(Debug, Clone, Copy)]
pub struct Mq135 {
    calibration: Calibration,
    started_at: Instant,
}

impl Mq135 {
    pub fn new(calibration: Calibration, started_at: Instant) -> Result<Self, SensorError> {
        calibration.validate()?;
        Ok(Self {
            calibration,
            started_at,
        })
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started_at)
    }

    pub fn is_warming_up(&self, now: Instant) -> bool {
        self.elapsed(now) < self.calibration.warm_up
    }

    /// Concentration for a raw sample, clamped to `0..=max_ppm`. Never NaN.
    pub fn ppm(&self, raw: u16) -> f32 {
        let cal = &self.calibration;
        let rs = cal.sensor_resistance(raw);
        let ratio = rs / cal.r0_kohm;
        let ppm = cal.curve_a * libm::powf(ratio, cal.curve_b);

        let max = cal.max_ppm as f32;
        if ppm.is_nan() {
            0.0
        } else {
            ppm.clamp(0.0, max)
        }
    }

    /// Convert one raw sample into a reading
    ///
    /// Samples above the ADC full scale cannot come from a healthy
    /// acquisition and are rejected with [`SensorError::InvalidData`].
    pub fn convert(&self, raw: u16, now: Instant) -> Result<ConcentrationReading, SensorError> {
        if raw > self.calibration.full_scale() {
            return Err(SensorError::InvalidData);
        }

        let is_warming_up = self.is_warming_up(now);
        let ppm_f = self.ppm(raw);

        debug!(
            "MQ135 raw={} Rs={:.2}kΩ NH3={:.1}ppm{}",
            raw,
            self.calibration.sensor_resistance(raw),
            ppm_f,
            if is_warming_up { " [WARMUP]" } else { "" }
        );

        Ok(ConcentrationReading {
            ppm: ppm_f as u16,
            ppm_f,
            raw,
            is_warming_up,
            is_valid: true,
        })
    }

    /// Reading for a tick whose acquisition failed
    pub fn failed(&self, now: Instant) -> ConcentrationReading {
        ConcentrationReading::invalid(self.is_warming_up(now))
    }
}
