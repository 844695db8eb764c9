//! Seams for the Enviro+ sensors and the particulate retry policy.

use crate::prelude::*;

pub mod demo;
#[cfg(test)]
pub mod fake;
#[cfg(feature = "hardware")]
pub mod hardware;

/// Raw values from one pass over the environmental sensors, before any
/// conversion. Gas resistances are in Ω, pressure in hPa.
#[derive(Debug, Clone, PartialEq)]
pub struct EnviroSample {
    pub raw_temperature: f64,
    pub cpu_temperature: f64,
    pub pressure: f64,
    pub humidity: f64,
    pub oxidising: f64,
    pub reducing: f64,
    pub nh3: f64,
    pub lux: f64,
}

/// The BME280 + MICS6814 + LTR559 stack, read as one unit.
pub trait EnviroSensors {
    fn sample(&mut self) -> Result<EnviroSample>;
}

/// PM concentrations in µg/m³ from the PMS5003.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Particulates {
    pub pm1: u16,
    pub pm25: u16,
    pub pm10: u16,
}

#[derive(Debug, thiserror::Error)]
pub enum ParticulateError {
    #[error("particulate read timed out")]
    ReadTimeout,

    #[error("particulate sensor failed: {0}")]
    Sensor(String),
}

pub trait ParticulateSensor {
    fn read(&mut self) -> std::result::Result<Particulates, ParticulateError>;
    fn reset(&mut self) -> std::result::Result<(), ParticulateError>;
}

/// Reads the particulate sensor, recovering from a single read timeout by
/// resetting the sensor and retrying exactly once. A second failure, or any
/// non-timeout failure, propagates to the iteration's outer handler.
pub fn read_particulates(sensor: &mut dyn ParticulateSensor) -> Result<Particulates> {
    match sensor.read() {
        Ok(particulates) => Ok(particulates),
        Err(ParticulateError::ReadTimeout) => {
            warn!("Particulate read timed out, resetting the sensor…");
            sensor.reset()?;
            Ok(sensor.read()?)
        }
        Err(error) => Err(error.into()),
    }
}
