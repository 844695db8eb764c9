//! A single published reading and the value conversions behind it.

use crate::prelude::*;
use crate::sensors::{EnviroSample, Particulates};

/// Compensation factor for the heat bled into the BME280 by the CPU.
const TEMPERATURE_COMPENSATION_FACTOR: f64 = 2.25;

/// One fully converted reading, assembled fresh on every loop iteration.
///
/// Serializes to the flat JSON object published to the broker. The particulate
/// keys are left out entirely when no PMS5003 was detected at startup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    pub temperature: f64,
    pub pressure: i64,
    pub humidity: i64,
    pub oxidised: i64,
    pub reduced: i64,
    pub nh3: i64,
    pub lux: i64,
    pub serial: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pm1: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pm25: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pm10: Option<u16>,
}

impl Reading {
    pub fn compose(sample: &EnviroSample, serial: &str) -> Self {
        Self {
            temperature: round_to_1_decimal(compensate_temperature(
                sample.raw_temperature,
                sample.cpu_temperature,
            )),
            // hPa × 100, truncated, then rounded to the nearest 10.
            pressure: round_to_tens((sample.pressure * 100.0) as i64),
            humidity: sample.humidity as i64,
            // Ω → kΩ, truncated.
            oxidised: (sample.oxidising / 1000.0) as i64,
            reduced: (sample.reducing / 1000.0) as i64,
            nh3: (sample.nh3 / 1000.0) as i64,
            lux: sample.lux as i64,
            serial: serial.to_string(),
            pm1: None,
            pm25: None,
            pm10: None,
        }
    }

    pub fn set_particulates(&mut self, particulates: Particulates) {
        self.pm1 = Some(particulates.pm1);
        self.pm25 = Some(particulates.pm25);
        self.pm10 = Some(particulates.pm10);
    }

    /// The bare value published to a discovery state topic.
    pub fn channel_value(&self, key: &str) -> Option<serde_json::Value> {
        match key {
            "temperature" => Some(serde_json::json!(self.temperature)),
            "pressure" => Some(serde_json::json!(self.pressure)),
            "humidity" => Some(serde_json::json!(self.humidity)),
            "oxidised" => Some(serde_json::json!(self.oxidised)),
            "reduced" => Some(serde_json::json!(self.reduced)),
            "nh3" => Some(serde_json::json!(self.nh3)),
            "lux" => Some(serde_json::json!(self.lux)),
            _ => None,
        }
    }
}

/// Corrects the raw reading against the CPU-temperature proxy.
fn compensate_temperature(raw: f64, cpu_temperature: f64) -> f64 {
    raw - (cpu_temperature - raw) / TEMPERATURE_COMPENSATION_FACTOR
}

fn round_to_1_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn round_to_tens(value: i64) -> i64 {
    ((value as f64 / 10.0).round() as i64) * 10
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> EnviroSample {
        EnviroSample {
            raw_temperature: 22.0,
            cpu_temperature: 40.0,
            pressure: 1013.26,
            humidity: 45.9,
            oxidising: 12_345.0,
            reducing: 450_777.0,
            nh3: 80_123.0,
            lux: 120.7,
        }
    }

    #[test]
    fn compensates_temperature() {
        // 22 − (40 − 22) / 2.25 = 14.0.
        assert_eq!(compensate_temperature(22.0, 40.0), 14.0);
        assert_eq!(round_to_1_decimal(compensate_temperature(21.3, 47.2)), 9.8);
    }

    #[test]
    fn pressure_is_a_multiple_of_ten() {
        for hpa in [950.0, 1013.26, 1013.24, 999.99, 1084.3] {
            let mut sample = sample();
            sample.pressure = hpa;
            let reading = Reading::compose(&sample, "serial");
            assert_eq!(reading.pressure % 10, 0, "pressure {}", hpa);
        }
    }

    #[test]
    fn converts_the_sample() {
        let reading = Reading::compose(&sample(), "00000000deadbeef");
        assert_eq!(reading.temperature, 14.0);
        assert_eq!(reading.pressure, 101_330);
        assert_eq!(reading.humidity, 45);
        assert_eq!(reading.oxidised, 12);
        assert_eq!(reading.reduced, 450);
        assert_eq!(reading.nh3, 80);
        assert_eq!(reading.lux, 120);
        assert_eq!(reading.serial, "00000000deadbeef");
    }

    #[test]
    fn serializes_without_particulate_keys() -> Result {
        let json = serde_json::to_value(Reading::compose(&sample(), "serial"))?;
        let object = json.as_object().unwrap();
        assert_eq!(object["serial"], "serial");
        assert!(!object.contains_key("pm1"));
        assert!(!object.contains_key("pm25"));
        assert!(!object.contains_key("pm10"));
        Ok(())
    }

    #[test]
    fn serializes_with_particulate_keys() -> Result {
        let mut reading = Reading::compose(&sample(), "serial");
        reading.set_particulates(Particulates {
            pm1: 3,
            pm25: 7,
            pm10: 12,
        });
        let json = serde_json::to_value(&reading)?;
        assert_eq!(json["pm1"], 3);
        assert_eq!(json["pm25"], 7);
        assert_eq!(json["pm10"], 12);
        Ok(())
    }
}
