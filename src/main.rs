#![no_std]
#![no_main]

mod hw;
mod tasks;

use embassy_executor::Spawner;
use esp_backtrace as _;
use esp_hal::{gpio::Io, timer::timg::TimerGroup};
use esp_println::println;

use litterbox::config::{Calibration, DetectorConfig, REPORT_INTERVAL};
use litterbox::monitor::FailurePolicy;

use hw::Mq135Adc;
use tasks::MonitorConfig;

#[esp_hal_embassy::main]
async fn main(spawner: Spawner) {
    esp_println::logger::init_logger(log::LevelFilter::Info);
    println!("LitterBox.v1: NH3 monitor starting");

    // Initialize system and take peripherals
    let peripherals = esp_hal::init(esp_hal::Config::default());

    // Initialize Embassy timer
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_hal_embassy::init(timg0.timer0);

    let io = Io::new(peripherals.GPIO, peripherals.IO_MUX);

    // R0 has to be measured per unit, see Calibration::r0_from_clean_air
    let calibration = Calibration::mq135_default();
    let sensor = Mq135Adc::new(peripherals.ADC1, io.pins.gpio0, calibration);

    let config = MonitorConfig {
        calibration,
        detector: DetectorConfig::litterbox_default(),
        failure_policy: FailurePolicy::Skip,
    };

    spawner.must_spawn(tasks::report_task());
    spawner.must_spawn(tasks::ammonia_sensor_task(sensor, config));

    println!("Tasks spawned, reporting every {}s", REPORT_INTERVAL.as_secs());
}
