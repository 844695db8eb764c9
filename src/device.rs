//! Raspberry Pi identity and system probes.

use std::fs;
use std::process::Command;

use crate::prelude::*;

/// Device identity derived once at startup from the Pi's hardware serial.
#[derive(Debug, Clone)]
pub struct Device {
    pub serial_number: String,
    pub client_id: String,
}

impl Device {
    pub fn detect() -> Result<Self> {
        let cpuinfo = fs::read_to_string("/proc/cpuinfo").context("failed to read `/proc/cpuinfo`")?;
        let serial_number = parse_serial_number(&cpuinfo)
            .ok_or_else(|| anyhow!("no `Serial` line in `/proc/cpuinfo`"))?;
        let client_id = format!("raspi-{}", serial_number);
        Ok(Self {
            serial_number,
            client_id,
        })
    }
}

fn parse_serial_number(cpuinfo: &str) -> Option<String> {
    cpuinfo
        .lines()
        .find(|line| line.starts_with("Serial"))
        .and_then(|line| line.split(':').nth(1))
        .map(|serial| serial.trim().to_string())
}

/// CPU temperature in °C, used as the heat proxy for temperature compensation.
pub fn cpu_temperature() -> Result<f64> {
    let output = Command::new("vcgencmd")
        .arg("measure_temp")
        .output()
        .context("failed to run `vcgencmd measure_temp`")?;
    parse_cpu_temperature(&String::from_utf8_lossy(&output.stdout))
}

fn parse_cpu_temperature(output: &str) -> Result<f64> {
    output
        .trim()
        .strip_prefix("temp=")
        .and_then(|rest| rest.strip_suffix("'C"))
        .ok_or_else(|| anyhow!("unexpected `vcgencmd` output: `{}`", output.trim()))?
        .parse()
        .map_err(Error::from)
}

/// The Pi is considered connected when `hostname -I` reports at least one address.
pub fn is_wifi_connected() -> bool {
    Command::new("hostname")
        .arg("-I")
        .output()
        .map(|output| !String::from_utf8_lossy(&output.stdout).trim().is_empty())
        .unwrap_or(false)
}
