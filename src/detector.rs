//! Three-state NH₃ litter event detector
//!
//! ```text
//! IDLE ──spike──▶ ACTIVE ──back to baseline──▶ COOLDOWN ──timeout──▶ IDLE
//! ```
//!
//! - IDLE: follows the ambient baseline with an EMA, starts an event when
//!   the reading rises `trigger_delta_ppm` above it.
//! - ACTIVE: baseline frozen, tracks the peak and its tick; the event ends
//!   after `end_ticks` consecutive readings below baseline + hysteresis.
//! - COOLDOWN: the classified event is exposed for `cooldown_ticks` ticks.
//!
//! Classification happens once, on ACTIVE → COOLDOWN:
//! peak within `fast_peak_ticks` OR peak excess above `high_delta_ppm`
//! is urination, anything else is defecation.

use log::{debug, info};

use crate::config::DetectorConfig;

/// Event type exposed to the reporting side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LitterEvent {
    #[default]
    None,
    /// Fast rise or large peak
    Urination,
    /// Slow, moderate rise
    Defecation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetectorState {
    #[default]
    Idle,
    Active,
    Cooldown,
}

/// Shape of a finished event, captured when it is classified
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventSummary {
    pub event: LitterEvent,
    pub peak_ppm: f32,
    pub baseline_ppm: f32,
    /// Active tick (1-based) at which the peak was reached
    pub peak_tick: u16,
    /// Active ticks including the near-baseline tail
    pub duration_ticks: u16,
}

impl EventSummary {
    pub fn delta_ppm(&self) -> f32 {
        self.peak_ppm - self.baseline_ppm
    }
}

/// Detector context. Owned by the caller and threaded through every tick.
#[derive(Debug, Clone, PartialEq)]
pub struct EventDetector {
    config: DetectorConfig,
    baseline_ppm: f32,
    state: DetectorState,
    current_event: LitterEvent,
    peak_ppm: f32,
    event_ticks: u16,
    peak_tick: u16,
    below_count: u8,
    cooldown_count: u8,
    initialized: bool,
    last_summary: Option<EventSummary>,
}

impl EventDetector {
    pub const fn new(config: DetectorConfig) -> Self {
        Self {
            config,
            baseline_ppm: 0.0,
            state: DetectorState::Idle,
            current_event: LitterEvent::None,
            peak_ppm: 0.0,
            event_ticks: 0,
            peak_tick: 0,
            below_count: 0,
            cooldown_count: 0,
            initialized: false,
            last_summary: None,
        }
    }

    /// Back to the power-on state; the next reading seeds a new baseline
    pub fn reset(&mut self) {
        *self = Self::new(self.config);
    }

    /// Feed one ppm reading and return the event the attribute should hold:
    /// `None` while idle or active, the classified type during cooldown.
    pub fn update(&mut self, ppm: f32) -> LitterEvent {
        if !self.initialized {
            self.baseline_ppm = ppm;
            self.initialized = true;
            info!("Baseline initialised: {:.1} ppm", ppm);
            return LitterEvent::None;
        }

        match self.state {
            DetectorState::Idle => self.idle(ppm),
            DetectorState::Active => self.active(ppm),
            DetectorState::Cooldown => self.cooldown(),
        }

        self.current_event
    }

    fn idle(&mut self, ppm: f32) {
        let alpha = self.config.baseline_alpha;
        self.baseline_ppm = (1.0 - alpha) * self.baseline_ppm + alpha * ppm;

        debug!(
            "state=IDLE baseline={:.1} ppm current={:.1} ppm",
            self.baseline_ppm, ppm
        );

        if ppm > self.baseline_ppm + self.config.trigger_delta_ppm {
            self.state = DetectorState::Active;
            self.peak_ppm = ppm;
            self.event_ticks = 1;
            self.peak_tick = 1;
            self.below_count = 0;
            info!(
                "Event START: ppm={:.1} baseline={:.1} delta={:.1}",
                ppm,
                self.baseline_ppm,
                ppm - self.baseline_ppm
            );
        }
    }

    fn active(&mut self, ppm: f32) {
        self.event_ticks = self.event_ticks.saturating_add(1);

        if ppm > self.peak_ppm {
            self.peak_ppm = ppm;
            self.peak_tick = self.event_ticks;
        }

        // Consecutive, not cumulative: one excursion restarts the countdown
        if ppm < self.baseline_ppm + self.config.hysteresis_delta_ppm {
            self.below_count = self.below_count.saturating_add(1);
        } else {
            self.below_count = 0;
        }

        debug!(
            "state=ACTIVE tick={} ppm={:.1} peak={:.1}@tick{} below={}",
            self.event_ticks, ppm, self.peak_ppm, self.peak_tick, self.below_count
        );

        if self.below_count >= self.config.end_ticks {
            let summary = self.classify();
            self.current_event = summary.event;
            self.last_summary = Some(summary);
            self.state = DetectorState::Cooldown;
            self.cooldown_count = 0;

            info!(
                "Event END -> {} (peak={:.1}ppm @ tick{}, baseline={:.1}ppm, delta={:.1})",
                summary.event,
                summary.peak_ppm,
                summary.peak_tick,
                summary.baseline_ppm,
                summary.delta_ppm()
            );
        }
    }

    fn cooldown(&mut self) {
        self.cooldown_count = self.cooldown_count.saturating_add(1);

        debug!(
            "state=COOLDOWN {}/{} ticks",
            self.cooldown_count, self.config.cooldown_ticks
        );

        if self.cooldown_count >= self.config.cooldown_ticks {
            self.state = DetectorState::Idle;
            self.current_event = LitterEvent::None;
            info!("Cooldown complete, returning to IDLE");
        }
    }

    fn classify(&self) -> EventSummary {
        let fast_peak = self.peak_tick <= self.config.fast_peak_ticks;
        let high_peak = self.peak_ppm - self.baseline_ppm > self.config.high_delta_ppm;

        let event = if fast_peak || high_peak {
            LitterEvent::Urination
        } else {
            LitterEvent::Defecation
        };

        EventSummary {
            event,
            peak_ppm: self.peak_ppm,
            baseline_ppm: self.baseline_ppm,
            peak_tick: self.peak_tick,
            duration_ticks: self.event_ticks,
        }
    }

    pub fn baseline(&self) -> f32 {
        self.baseline_ppm
    }

    pub fn state(&self) -> DetectorState {
        self.state
    }

    pub fn current_event(&self) -> LitterEvent {
        self.current_event
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Summary of the most recently classified event
    pub fn last_summary(&self) -> Option<EventSummary> {
        self.last_summary
    }

    /// Peak and its tick for the event in progress
    pub fn active_peak(&self) -> Option<(f32, u16)> {
        match self.state {
            DetectorState::Active => Some((self.peak_ppm, self.peak_tick)),
            _ => None,
        }
    }
}

impl Default for EventDetector {
    fn default() -> Self {
        Self::new(DetectorConfig::default())
    }
}

impl LitterEvent {
    /// Integer value of the event attribute on the mesh:
    /// 0 = none, 1 = urination, 2 = defecation
    pub const fn attribute_value(self) -> u8 {
        match self {
            LitterEvent::None => 0,
            LitterEvent::Urination => 1,
            LitterEvent::Defecation => 2,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LitterEvent::None => "NONE",
            LitterEvent::Urination => "URINATION",
            LitterEvent::Defecation => "DEFECATION",
        }
    }
}

impl TryFrom<u8> for LitterEvent {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(LitterEvent::None),
            1 => Ok(LitterEvent::Urination),
            2 => Ok(LitterEvent::Defecation),
            other => Err(other),
        }
    }
}

impl core::fmt::Display for LitterEvent {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.name())
    }
}
