pub mod mq135;

use embassy_time::Duration;

use crate::config::REPORT_INTERVAL;

/// Analog gas sensor front end
/// Implemented by the board layer; the library only consumes raw samples
pub trait Sensor: Send {
    /// Initialize the sensor hardware
    /// Called once before the first read; starts the warm-up window
    async fn init(&mut self) -> Result<(), SensorError>;

    /// Acquire one raw ADC sample
    async fn read(&mut self) -> Result<u16, SensorError>;

    /// Get static information about this sensor
    fn info(&self) -> SensorInfo;

    /// How long the heater needs before readings are trustworthy
    fn warm_up_time(&self) -> Duration {
        Duration::from_secs(0)
    }

    /// Interval between samples
    fn reading_interval(&self) -> Duration {
        REPORT_INTERVAL
    }
}

/// Output of the concentration estimator for one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConcentrationReading {
    /// Clamped and truncated ppm for coarse reporting (0..=max_ppm)
    pub ppm: u16,
    /// Full resolution ppm fed to the event detector
    pub ppm_f: f32,
    /// Originating ADC value, kept for diagnostics
    pub raw: u16,
    /// Heater still settling: value is computed but provisional
    pub is_warming_up: bool,
    /// False when the acquisition failed; concentration fields are zero then
    pub is_valid: bool,
}

/// Data quality indicator
/// Helps downstream processing decide how to handle readings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quality {
    /// Sensor warmed up, data is reliable
    Good,
    /// Sensor warming up, data is usable but provisional
    Degraded,
    /// Acquisition failed, data must not be used
    Bad,
}

/// Static information about a sensor
#[derive(Debug, Clone)]
pub struct SensorInfo {
    pub name: &'static str,
    pub gas: &'static str,
    pub version: &'static str,
    pub manufacturer: &'static str,
}

/// Unified error type for the sensor path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// Sensor hasn't been initialized yet
    NotInitialized,

    /// ADC or driver error
    CommunicationError,

    /// Sample outside the ADC's representable range
    InvalidData,

    /// Hardware failure detected
    HardwareFailure,

    /// Configuration error
    ConfigError,
}

impl ConcentrationReading {
    /// Reading for a tick whose acquisition failed
    pub const fn invalid(is_warming_up: bool) -> Self {
        Self {
            ppm: 0,
            ppm_f: 0.0,
            raw: 0,
            is_warming_up,
            is_valid: false,
        }
    }

    pub fn quality(&self) -> Quality {
        if !self.is_valid {
            Quality::Bad
        } else if self.is_warming_up {
            Quality::Degraded
        } else {
            Quality::Good
        }
    }

    /// Valid and past warm-up
    pub fn is_reliable(&self) -> bool {
        self.quality() == Quality::Good
    }
}

impl core::fmt::Display for SensorError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SensorError::NotInitialized => write!(f, "Sensor not initialized"),
            SensorError::CommunicationError => write!(f, "ADC read error"),
            SensorError::InvalidData => write!(f, "Sample out of ADC range"),
            SensorError::HardwareFailure => write!(f, "Hardware failure"),
            SensorError::ConfigError => write!(f, "Configuration error"),
        }
    }
}

impl core::fmt::Display for Quality {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Quality::Good => write!(f, "good"),
            Quality::Degraded => write!(f, "warming up"),
            Quality::Bad => write!(f, "bad"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_reading() {
        let reading = ConcentrationReading::invalid(false);

        assert_eq!(reading.ppm, 0);
        assert_eq!(reading.ppm_f, 0.0);
        assert_eq!(reading.quality(), Quality::Bad);
        assert!(!reading.is_reliable());
    }

    #[test]
    fn test_warm_up_reading_is_degraded() {
        let reading = ConcentrationReading {
            ppm: 12,
            ppm_f: 12.4,
            raw: 1800,
            is_warming_up: true,
            is_valid: true,
        };

        assert_eq!(reading.quality(), Quality::Degraded);
        assert!(!reading.is_reliable());
    }

    #[test]
    fn test_invalid_wins_over_warm_up() {
        assert_eq!(ConcentrationReading::invalid(true).quality(), Quality::Bad);
    }
}
