//! Per-tick pipeline: ADC sample -> concentration -> event detector -> report
//!
//! `Monitor` owns the estimator and the detector context. It is meant to be
//! owned by exactly one task and ticked once per [`REPORT_INTERVAL`];
//! `tick` takes `&mut self`, so there is never more than one tick in flight.
//!
//! [`REPORT_INTERVAL`]: crate::config::REPORT_INTERVAL

use embassy_time::Instant;
use heapless::HistoryBuffer;
use log::{info, warn};

use crate::config::{Calibration, DetectorConfig, FALLBACK_PPM};
use crate::detector::{DetectorState, EventDetector, EventSummary, LitterEvent};
use crate::sensors::mq135::Mq135;
use crate::sensors::{ConcentrationReading, SensorError};

/// Number of classified events kept for diagnostics
pub const EVENT_HISTORY: usize = 8;

/// What the detector sees on a tick whose acquisition failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Leave the detector untouched for that tick
    #[default]
    Skip,
    /// Feed the last valid reading again (skipped until one exists)
    HoldLast,
    /// Feed 0 ppm. Pulls the idle baseline down when failures are frequent.
    Zero,
}

/// Values handed to the reporting side after each tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    pub reading: ConcentrationReading,
    /// Concentration attribute value; [`FALLBACK_PPM`] when the read failed
    pub ppm: u16,
    pub event: LitterEvent,
    /// Event differs from the last reported one (always true on the first tick)
    pub event_changed: bool,
    /// Why the acquisition failed; `None` on a valid reading
    pub error: Option<SensorError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MonitorStats {
    pub ticks: u32,
    pub failures: u32,
    pub consecutive_failures: u32,
    pub events: u32,
}

pub struct Monitor {
    sensor: Mq135,
    detector: EventDetector,
    policy: FailurePolicy,
    last_valid_ppm: Option<f32>,
    reported_event: Option<LitterEvent>,
    history: HistoryBuffer<EventSummary, EVENT_HISTORY>,
    stats: MonitorStats,
}

impl Monitor {
    pub fn new(
        calibration: Calibration,
        detector: DetectorConfig,
        started_at: Instant,
        policy: FailurePolicy,
    ) -> Result<Self, SensorError> {
        detector.validate()?;
        let sensor = Mq135::new(calibration, started_at)?;

        info!(
            "MQ-135 VCC={:.1}V divider={:.1} R0={:.1}kΩ warmup {}s",
            calibration.supply_voltage,
            calibration.divider_ratio,
            calibration.r0_kohm,
            calibration.warm_up.as_secs()
        );

        Ok(Self {
            sensor,
            detector: EventDetector::new(detector),
            policy,
            last_valid_ppm: None,
            reported_event: None,
            history: HistoryBuffer::new(),
            stats: MonitorStats::default(),
        })
    }

    /// Process one acquisition result. Never fails: a bad sample degrades
    /// to the fallback value instead of stopping the reporting loop.
    pub fn tick(&mut self, sample: Result<u16, SensorError>, now: Instant) -> TickReport {
        self.stats.ticks = self.stats.ticks.wrapping_add(1);

        let converted = sample.and_then(|raw| self.sensor.convert(raw, now));

        let (reading, ppm, detector_input, error) = match converted {
            Ok(reading) => {
                self.stats.consecutive_failures = 0;
                self.last_valid_ppm = Some(reading.ppm_f);
                (reading, reading.ppm, Some(reading.ppm_f), None)
            }
            Err(e) => {
                self.stats.failures = self.stats.failures.wrapping_add(1);
                self.stats.consecutive_failures = self.stats.consecutive_failures.saturating_add(1);
                warn!(
                    "Sensor read failed ({}): {}, reporting {} ppm",
                    self.stats.consecutive_failures, e, FALLBACK_PPM
                );

                let input = match self.policy {
                    FailurePolicy::Skip => None,
                    FailurePolicy::HoldLast => self.last_valid_ppm,
                    FailurePolicy::Zero => Some(0.0),
                };
                (self.sensor.failed(now), FALLBACK_PPM, input, Some(e))
            }
        };

        let event = match detector_input {
            Some(ppm_f) => self.advance(ppm_f),
            None => self.detector.current_event(),
        };

        let event_changed = self.reported_event != Some(event);
        self.reported_event = Some(event);

        TickReport {
            reading,
            ppm,
            event,
            event_changed,
            error,
        }
    }

    fn advance(&mut self, ppm_f: f32) -> LitterEvent {
        let was_active = self.detector.state() == DetectorState::Active;
        let event = self.detector.update(ppm_f);

        // Classification happens exactly on ACTIVE -> COOLDOWN
        if was_active && self.detector.state() == DetectorState::Cooldown {
            if let Some(summary) = self.detector.last_summary() {
                self.history.write(summary);
                self.stats.events = self.stats.events.wrapping_add(1);
            }
        }
        event
    }

    pub fn baseline(&self) -> f32 {
        self.detector.baseline()
    }

    pub fn detector(&self) -> &EventDetector {
        &self.detector
    }

    pub fn sensor(&self) -> &Mq135 {
        &self.sensor
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    pub fn stats(&self) -> MonitorStats {
        self.stats
    }

    /// Classified events, oldest first
    pub fn recent_events(&self) -> impl Iterator<Item = &EventSummary> {
        self.history.oldest_ordered()
    }

    pub fn last_event(&self) -> Option<&EventSummary> {
        self.history.recent()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor(policy: FailurePolicy) -> Monitor {
        Monitor::new(
            Calibration::default(),
            DetectorConfig::default(),
            Instant::from_secs(0),
            policy,
        )
        .unwrap()
    }

    /// Raw sample whose concentration is closest to `ppm`
    fn raw_for(monitor: &Monitor, ppm: f32) -> u16 {
        (0..=4095u16)
            .min_by(|a, b| {
                let da = (monitor.sensor().ppm(*a) - ppm).abs();
                let db = (monitor.sensor().ppm(*b) - ppm).abs();
                da.total_cmp(&db)
            })
            .unwrap()
    }

    fn at(tick: u64) -> Instant {
        Instant::from_secs(tick * 10)
    }

    #[test]
    fn test_first_tick_reports_change() {
        let mut monitor = monitor(FailurePolicy::Skip);
        let raw = raw_for(&monitor, 20.0);
        let report = monitor.tick(Ok(raw), at(0));

        assert!(report.event_changed);
        assert_eq!(report.event, LitterEvent::None);
        assert!(report.reading.is_valid);
        assert!(report.reading.is_warming_up);
        assert_eq!(report.ppm, report.reading.ppm);
        assert_eq!(report.error, None);

        let again = monitor.tick(Ok(raw), at(1));
        assert!(!again.event_changed);
    }

    #[test]
    fn test_end_to_end_urination() {
        let mut monitor = monitor(FailurePolicy::Skip);
        let sequence = [20.0, 20.0, 20.0, 35.0, 40.0, 38.0, 21.0, 20.0, 19.0];
        let raws: Vec<u16> = sequence.iter().map(|ppm| raw_for(&monitor, *ppm)).collect();

        let mut reports = Vec::new();
        for (i, raw) in raws.iter().enumerate() {
            reports.push(monitor.tick(Ok(*raw), at(i as u64)));
        }

        let last = reports.last().unwrap();
        assert_eq!(last.event, LitterEvent::Urination);
        assert!(last.event_changed);
        assert_eq!(monitor.detector().state(), DetectorState::Cooldown);
        assert_eq!(monitor.stats().events, 1);
        assert_eq!(monitor.last_event().unwrap().event, LitterEvent::Urination);

        // Attribute only changes again when cooldown clears
        let idle_raw = raw_for(&monitor, 20.0);
        let mut changes = 0;
        for i in 0..6 {
            let report = monitor.tick(Ok(idle_raw), at(20 + i));
            if report.event_changed {
                changes += 1;
                assert_eq!(report.event, LitterEvent::None);
                assert_eq!(i, 5);
            }
        }
        assert_eq!(changes, 1);
        assert_eq!(monitor.stats().events, 1);
    }

    #[test]
    fn test_failure_reports_fallback() {
        let mut monitor = monitor(FailurePolicy::Skip);
        let report = monitor.tick(Err(SensorError::CommunicationError), at(3));

        assert_eq!(report.ppm, FALLBACK_PPM);
        assert!(!report.reading.is_valid);
        assert_eq!(report.error, Some(SensorError::CommunicationError));
        assert_eq!(report.event, LitterEvent::None);
        assert_eq!(monitor.stats().failures, 1);
        assert_eq!(monitor.stats().consecutive_failures, 1);
        assert!(!monitor.detector().is_initialized());
    }

    #[test]
    fn test_skip_policy_leaves_baseline_alone() {
        let mut monitor = monitor(FailurePolicy::Skip);
        let raw = raw_for(&monitor, 20.0);
        monitor.tick(Ok(raw), at(0));
        let baseline = monitor.baseline();

        for i in 1..20 {
            monitor.tick(Err(SensorError::CommunicationError), at(i));
        }
        assert_eq!(monitor.baseline(), baseline);
        assert_eq!(monitor.stats().consecutive_failures, 19);

        monitor.tick(Ok(raw), at(20));
        assert_eq!(monitor.stats().consecutive_failures, 0);
        assert_eq!(monitor.stats().failures, 19);
    }

    #[test]
    fn test_zero_policy_depresses_baseline() {
        let mut monitor = monitor(FailurePolicy::Zero);
        let raw = raw_for(&monitor, 20.0);
        monitor.tick(Ok(raw), at(0));
        let baseline = monitor.baseline();

        for i in 1..20 {
            let report = monitor.tick(Err(SensorError::CommunicationError), at(i));
            assert_eq!(report.event, LitterEvent::None);
        }
        assert!(monitor.baseline() < baseline);
    }

    #[test]
    fn test_hold_last_policy_replays_reading() {
        let mut monitor = monitor(FailurePolicy::HoldLast);

        // Nothing to replay yet: detector stays unseeded
        monitor.tick(Err(SensorError::CommunicationError), at(0));
        assert!(!monitor.detector().is_initialized());

        let raw = raw_for(&monitor, 20.0);
        monitor.tick(Ok(raw), at(1));
        let baseline = monitor.baseline();

        for i in 2..10 {
            monitor.tick(Err(SensorError::CommunicationError), at(i));
        }
        assert!((monitor.baseline() - baseline).abs() < 1e-4);
    }

    #[test]
    fn test_out_of_range_sample_is_a_failure() {
        let mut monitor = monitor(FailurePolicy::Skip);
        let report = monitor.tick(Ok(5000), at(0));

        assert!(!report.reading.is_valid);
        assert_eq!(report.ppm, FALLBACK_PPM);
        assert_eq!(report.error, Some(SensorError::InvalidData));
        assert_eq!(monitor.stats().failures, 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut detector = DetectorConfig::default();
        detector.end_ticks = 0;
        let result = Monitor::new(
            Calibration::default(),
            detector,
            Instant::from_secs(0),
            FailurePolicy::Skip,
        );
        assert!(matches!(result, Err(SensorError::ConfigError)));
    }

    #[test]
    fn test_history_keeps_most_recent_events() {
        let mut monitor = monitor(FailurePolicy::Skip);
        let base = raw_for(&monitor, 20.0);
        let spike = raw_for(&monitor, 80.0);

        let mut tick = 0;
        let mut next = |monitor: &mut Monitor, raw: u16| {
            tick += 1;
            monitor.tick(Ok(raw), at(tick))
        };

        next(&mut monitor, base);
        for _ in 0..(EVENT_HISTORY + 2) {
            next(&mut monitor, base);
            next(&mut monitor, spike);
            for _ in 0..3 {
                next(&mut monitor, base);
            }
            for _ in 0..6 {
                next(&mut monitor, base);
            }
            assert_eq!(monitor.detector().state(), DetectorState::Idle);
        }

        assert_eq!(monitor.stats().events as usize, EVENT_HISTORY + 2);
        assert_eq!(monitor.recent_events().count(), EVENT_HISTORY);
        assert!(monitor
            .recent_events()
            .all(|summary| summary.event == LitterEvent::Urination));
    }
}
