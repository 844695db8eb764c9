//! Deterministic stand-in sensors for running the pipeline off-Pi.

use super::{EnviroSample, EnviroSensors};
use crate::prelude::*;

/// Produces slowly drifting values around plausible indoor conditions.
pub struct DemoSensors {
    tick: u64,
}

impl DemoSensors {
    pub fn new() -> Self {
        Self { tick: 0 }
    }
}

impl EnviroSensors for DemoSensors {
    fn sample(&mut self) -> Result<EnviroSample> {
        self.tick += 1;
        let phase = (self.tick as f64 / 10.0).sin();
        Ok(EnviroSample {
            raw_temperature: 21.5 + phase,
            cpu_temperature: 45.0 + phase * 2.0,
            pressure: 1013.0 + phase * 3.0,
            humidity: 44.0 + phase * 5.0,
            oxidising: 18_000.0 + phase * 500.0,
            reducing: 450_000.0 + phase * 10_000.0,
            nh3: 120_000.0 + phase * 3_000.0,
            lux: 150.0 + phase * 100.0,
        })
    }
}
