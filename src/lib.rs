//! LitterBox NH₃ monitor core
//!
//! Hardware independent part of the firmware: MQ-135 concentration estimate
//! and the litter event detector, tested on the host. The ESP32-C6 binary
//! (`main.rs`, `firmware` feature) owns the ADC, timers and reporting tasks.

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod detector;
pub mod monitor;
pub mod sensors;

pub use config::{Calibration, DetectorConfig};
pub use detector::{DetectorState, EventDetector, EventSummary, LitterEvent};
pub use monitor::{FailurePolicy, Monitor, MonitorStats, TickReport};
pub use sensors::{ConcentrationReading, Quality, Sensor, SensorError, SensorInfo};
