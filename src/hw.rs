use embassy_time::Duration;
use esp_hal::analog::adc::{Adc, AdcConfig, AdcPin, Attenuation};
use esp_hal::gpio::GpioPin;
use esp_hal::peripherals::ADC1;

use litterbox::config::Calibration;
use litterbox::sensors::{mq135, Sensor, SensorError, SensorInfo};

/// MQ-135 AOUT through a 100k/100k divider into GPIO0 (XIAO A0, ADC1 channel 0)
///
/// 11 dB attenuation gives the ADC a ~0-3.1 V input range, enough for the
/// halved 5 V sensor output.
pub struct Mq135Adc {
    adc: Adc<'static, ADC1>,
    pin: AdcPin<GpioPin<0>, ADC1>,
    calibration: Calibration,
    initialized: bool,
}

impl Mq135Adc {
    pub fn new(adc1: ADC1, gpio0: GpioPin<0>, calibration: Calibration) -> Self {
        let mut config = AdcConfig::new();
        let pin = config.enable_pin(gpio0, Attenuation::Attenuation11dB);
        let adc = Adc::new(adc1, config);

        Self {
            adc,
            pin,
            calibration,
            initialized: false,
        }
    }
}

impl Sensor for Mq135Adc {
    async fn init(&mut self) -> Result<(), SensorError> {
        // One throwaway conversion proves the channel answers
        nb::block!(self.adc.read_oneshot(&mut self.pin))
            .map_err(|_| SensorError::HardwareFailure)?;
        self.initialized = true;
        Ok(())
    }

    async fn read(&mut self) -> Result<u16, SensorError> {
        if !self.initialized {
            return Err(SensorError::NotInitialized);
        }

        nb::block!(self.adc.read_oneshot(&mut self.pin)).map_err(|_| SensorError::CommunicationError)
    }

    fn info(&self) -> SensorInfo {
        mq135::INFO
    }

    fn warm_up_time(&self) -> Duration {
        self.calibration.warm_up
    }
}
