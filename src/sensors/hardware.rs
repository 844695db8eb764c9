//! The actual Enviro+ stack, only compiled with the `hardware` feature.

use std::io::Read;
use std::thread;
use std::time::Duration;

use bme280::BME280;
use i2cdev::core::I2CDevice;
use i2cdev::linux::LinuxI2CDevice;
use linux_embedded_hal::{Delay, I2cdev};
use rppal::gpio::{Gpio, OutputPin};
use serialport::SerialPort;

use super::{EnviroSample, EnviroSensors, ParticulateError, ParticulateSensor, Particulates};
use crate::device;
use crate::prelude::*;

const I2C_DEVICE: &str = "/dev/i2c-1";
const LTR559_ADDRESS: u16 = 0x23;
const ADS1015_ADDRESS: u16 = 0x49;

const PMS5003_DEVICE: &str = "/dev/ttyAMA0";
const PMS5003_BAUD_RATE: u32 = 9600;
const PMS5003_READ_TIMEOUT: Duration = Duration::from_secs(5);
const PMS5003_ENABLE_PIN: u8 = 22;
const PMS5003_RESET_PIN: u8 = 27;

/// BME280 + MICS6814 (behind an ADS1015 ADC) + LTR559 on the shared I²C bus.
pub struct EnviroBoard {
    bme280: BME280<I2cdev, Delay>,
    als: LinuxI2CDevice,
    adc: LinuxI2CDevice,
}

impl EnviroBoard {
    pub fn open() -> Result<Self> {
        let mut bme280 = BME280::new_primary(I2cdev::new(I2C_DEVICE)?, Delay);
        bme280
            .init()
            .map_err(|error| anyhow!("failed to initialise the BME280: {:?}", error))?;
        let mut als = LinuxI2CDevice::new(I2C_DEVICE, LTR559_ADDRESS)?;
        // ALS active mode, gain ×1.
        als.smbus_write_byte_data(0x80, 0x01)?;
        let adc = LinuxI2CDevice::new(I2C_DEVICE, ADS1015_ADDRESS)?;
        Ok(Self { bme280, als, adc })
    }

    fn read_lux(&mut self) -> Result<f64> {
        let ch1 = u16::from(self.als.smbus_read_byte_data(0x88)?)
            | u16::from(self.als.smbus_read_byte_data(0x89)?) << 8;
        let ch0 = u16::from(self.als.smbus_read_byte_data(0x8A)?)
            | u16::from(self.als.smbus_read_byte_data(0x8B)?) << 8;
        Ok(lux_from_channels(f64::from(ch0), f64::from(ch1)))
    }

    /// Single-ended conversion on the given ADS1015 channel, as a resistance.
    fn read_gas_channel(&mut self, channel: u16) -> Result<f64> {
        // Single shot, ±6.144 V, 1600 SPS, comparator off. The ADS1015 talks
        // big-endian, SMBus word ops are little-endian.
        let config: u16 = 0x8000 | ((0b100 | channel) << 12) | 0x0100 | (0b100 << 5) | 0b11;
        self.adc.smbus_write_word_data(0x01, config.swap_bytes())?;
        thread::sleep(Duration::from_millis(2));
        let code = (self.adc.smbus_read_word_data(0x00)?.swap_bytes() as i16) >> 4;
        let volts = f64::from(code) * 6.144 / 2048.0;
        if volts >= 3.3 {
            return Ok(0.0);
        }
        Ok(volts * 56_000.0 / (3.3 - volts))
    }
}

impl EnviroSensors for EnviroBoard {
    fn sample(&mut self) -> Result<EnviroSample> {
        let measurements = self
            .bme280
            .measure()
            .map_err(|error| anyhow!("failed to read the BME280: {:?}", error))?;
        Ok(EnviroSample {
            raw_temperature: f64::from(measurements.temperature),
            cpu_temperature: device::cpu_temperature()?,
            pressure: f64::from(measurements.pressure) / 100.0,
            humidity: f64::from(measurements.humidity),
            oxidising: self.read_gas_channel(0)?,
            reducing: self.read_gas_channel(1)?,
            nh3: self.read_gas_channel(2)?,
            lux: self.read_lux()?,
        })
    }
}

/// Lite-On application note formula, gain ×1, 100 ms integration.
fn lux_from_channels(ch0: f64, ch1: f64) -> f64 {
    if ch0 + ch1 == 0.0 {
        return 0.0;
    }
    let ratio = ch1 / (ch0 + ch1);
    if ratio < 0.45 {
        1.7743 * ch0 + 1.1059 * ch1
    } else if ratio < 0.64 {
        4.2785 * ch0 - 1.9548 * ch1
    } else if ratio < 0.85 {
        0.5926 * ch0 + 0.1185 * ch1
    } else {
        0.0
    }
}

/// PMS5003 on the Pi's UART, reset wired to a GPIO pin.
pub struct Pms5003 {
    port: Box<dyn SerialPort>,
    reset_pin: OutputPin,
    _enable_pin: OutputPin,
}

impl Pms5003 {
    pub fn open() -> Result<Self> {
        let gpio = Gpio::new()?;
        let mut enable_pin = gpio.get(PMS5003_ENABLE_PIN)?.into_output();
        enable_pin.set_high();
        let mut reset_pin = gpio.get(PMS5003_RESET_PIN)?.into_output();
        reset_pin.set_high();
        let port = serialport::new(PMS5003_DEVICE, PMS5003_BAUD_RATE)
            .timeout(PMS5003_READ_TIMEOUT)
            .open()?;
        Ok(Self {
            port,
            reset_pin,
            _enable_pin: enable_pin,
        })
    }

    fn read_byte(&mut self) -> std::result::Result<u8, ParticulateError> {
        let mut byte = [0u8];
        self.port.read_exact(&mut byte).map_err(particulate_error)?;
        Ok(byte[0])
    }

    /// Scans for the `0x42 0x4D` frame marker and decodes one data frame.
    fn read_frame(&mut self) -> std::result::Result<Particulates, ParticulateError> {
        loop {
            if self.read_byte()? != 0x42 {
                continue;
            }
            if self.read_byte()? != 0x4D {
                continue;
            }
            let mut length = [0u8; 2];
            self.port.read_exact(&mut length).map_err(particulate_error)?;
            let length = usize::from(u16::from_be_bytes(length));
            if length != 28 {
                continue;
            }
            let mut payload = [0u8; 28];
            self.port.read_exact(&mut payload).map_err(particulate_error)?;
            let expected = u16::from_be_bytes([payload[26], payload[27]]);
            let actual = (0x42u16 + 0x4D)
                .wrapping_add(28)
                .wrapping_add(payload[..26].iter().map(|&byte| u16::from(byte)).sum());
            if actual != expected {
                return Err(ParticulateError::Sensor(format!(
                    "frame checksum mismatch: {:#06x} != {:#06x}",
                    actual, expected,
                )));
            }
            return Ok(Particulates {
                pm1: u16::from_be_bytes([payload[0], payload[1]]),
                pm25: u16::from_be_bytes([payload[2], payload[3]]),
                pm10: u16::from_be_bytes([payload[4], payload[5]]),
            });
        }
    }
}

fn particulate_error(error: std::io::Error) -> ParticulateError {
    if error.kind() == std::io::ErrorKind::TimedOut {
        ParticulateError::ReadTimeout
    } else {
        ParticulateError::Sensor(error.to_string())
    }
}

impl ParticulateSensor for Pms5003 {
    fn read(&mut self) -> std::result::Result<Particulates, ParticulateError> {
        self.read_frame()
    }

    fn reset(&mut self) -> std::result::Result<(), ParticulateError> {
        self.reset_pin.set_low();
        thread::sleep(Duration::from_millis(100));
        self.reset_pin.set_high();
        self.port
            .clear(serialport::ClearBuffer::Input)
            .map_err(|error| ParticulateError::Sensor(error.to_string()))
    }
}

/// Probes for a PMS5003 with a single read, like the original detection pass.
pub fn detect_pms5003() -> Option<Box<dyn ParticulateSensor + Send>> {
    match Pms5003::open() {
        Ok(mut sensor) => match sensor.read() {
            Ok(_) => {
                info!("PMS5003 sensor is connected");
                Some(Box::new(sensor))
            }
            Err(error) => {
                info!("No PMS5003 sensor connected: {}", error);
                None
            }
        },
        Err(error) => {
            info!("No PMS5003 sensor connected: {}", error);
            None
        }
    }
}
