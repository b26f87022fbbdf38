use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender};
use embassy_time::{Instant, Ticker, Timer};

use litterbox::config::{Calibration, DetectorConfig, INIT_RETRY_DELAY};
use litterbox::monitor::{FailurePolicy, Monitor, TickReport};
use litterbox::sensors::Sensor;

use crate::hw::Mq135Adc;

/// Reports from the sampling task to the reporting task
/// One report per tick; a few slots absorb a slow radio
pub static REPORT_CHANNEL: Channel<CriticalSectionRawMutex, TickReport, 4> = Channel::new();

/// Get sender for tick reports
pub fn get_report_sender() -> Sender<'static, CriticalSectionRawMutex, TickReport, 4> {
    REPORT_CHANNEL.sender()
}

/// Get receiver for tick reports
pub fn get_report_receiver() -> Receiver<'static, CriticalSectionRawMutex, TickReport, 4> {
    REPORT_CHANNEL.receiver()
}

/// Startup configuration of the sampling task
pub struct MonitorConfig {
    pub calibration: Calibration,
    pub detector: DetectorConfig,
    pub failure_policy: FailurePolicy,
}

/// MQ-135 sampling task
#[embassy_executor::task]
pub async fn ammonia_sensor_task(mut sensor: Mq135Adc, config: MonitorConfig) {
    sensor_task_impl(&mut sensor, config).await;
}

/// Init the sensor, then run one monitor tick per reading interval
/// The monitor lives on this task's stack: it is the only writer
async fn sensor_task_impl<S: Sensor>(sensor: &mut S, config: MonitorConfig) {
    let sensor_info = sensor.info();
    let sender = get_report_sender();

    esp_println::println!("[{}] Starting sensor task", sensor_info.name);

    loop {
        match sensor.init().await {
            Ok(()) => {
                esp_println::println!("[{}] Initialized successfully", sensor_info.name);
                break;
            }
            Err(e) => {
                esp_println::println!("[{}] Init failed: {}, retrying in {}s",
                    sensor_info.name, e, INIT_RETRY_DELAY.as_secs());
                Timer::after(INIT_RETRY_DELAY).await;
            }
        }
    }

    let mut monitor = match Monitor::new(
        config.calibration,
        config.detector,
        Instant::now(),
        config.failure_policy,
    ) {
        Ok(monitor) => monitor,
        Err(e) => {
            esp_println::println!("[{}] Invalid configuration: {}", sensor_info.name, e);
            return;
        }
    };

    // Readings during warm-up still feed the detector so the baseline converges early
    esp_println::println!("[{}] {} warm-up {}s, sampling every {}s, on read failure: {:?}",
        sensor_info.name, sensor_info.gas,
        sensor.warm_up_time().as_secs(), sensor.reading_interval().as_secs(),
        monitor.policy());

    let mut ticker = Ticker::every(sensor.reading_interval());

    loop {
        let sample = sensor.read().await;
        let report = monitor.tick(sample, Instant::now());

        if report.event_changed {
            if let Some(summary) = monitor.last_event() {
                esp_println::println!("[{}] Last event {}: peak {:.1} ppm @ tick {}, delta {:.1} ppm",
                    sensor_info.name, summary.event, summary.peak_ppm,
                    summary.peak_tick, summary.delta_ppm());
            }
        }

        if sender.try_send(report).is_err() {
            esp_println::println!("[{}] Channel full, dropping report", sensor_info.name);
        }

        ticker.next().await;
    }
}

/// Boundary to the mesh stack: concentration every tick, event attribute on change
#[embassy_executor::task]
pub async fn report_task() {
    let receiver = get_report_receiver();

    esp_println::println!("[REPORT] Starting reporter");

    loop {
        let report = receiver.receive().await;

        match report.error {
            Some(e) => esp_println::println!("[REPORT] NH3={} ppm (fallback: {})", report.ppm, e),
            None => esp_println::println!("[REPORT] NH3={} ppm ({})", report.ppm, report.reading.quality()),
        }

        if report.event_changed {
            esp_println::println!("[REPORT] Event attribute -> {} ({})",
                report.event.attribute_value(), report.event);
        }
    }
}
