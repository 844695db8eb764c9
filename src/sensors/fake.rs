//! Scripted sensors used in tests.

use std::collections::VecDeque;

use super::{EnviroSample, EnviroSensors, ParticulateError, ParticulateSensor, Particulates};
use crate::prelude::*;

/// Plays back a script of samples, one per call.
pub struct FakeEnviroSensors {
    script: VecDeque<Result<EnviroSample>>,
}

impl FakeEnviroSensors {
    pub fn new(script: Vec<Result<EnviroSample>>) -> Self {
        Self {
            script: script.into(),
        }
    }
}

impl EnviroSensors for FakeEnviroSensors {
    fn sample(&mut self) -> Result<EnviroSample> {
        self.script
            .pop_front()
            .unwrap_or_else(|| Err(anyhow!("the sample script is exhausted")))
    }
}

/// Plays back a script of particulate reads and counts the reset calls.
pub struct FakeParticulateSensor {
    script: VecDeque<std::result::Result<Particulates, ParticulateError>>,
    reads: usize,
    resets: usize,
}

impl FakeParticulateSensor {
    pub fn new(script: Vec<std::result::Result<Particulates, ParticulateError>>) -> Self {
        Self {
            script: script.into(),
            reads: 0,
            resets: 0,
        }
    }

    pub fn read_count(&self) -> usize {
        self.reads
    }

    pub fn reset_count(&self) -> usize {
        self.resets
    }
}

impl ParticulateSensor for FakeParticulateSensor {
    fn read(&mut self) -> std::result::Result<Particulates, ParticulateError> {
        self.reads += 1;
        self.script
            .pop_front()
            .unwrap_or_else(|| Err(ParticulateError::Sensor("the read script is exhausted".into())))
    }

    fn reset(&mut self) -> std::result::Result<(), ParticulateError> {
        self.resets += 1;
        Ok(())
    }
}
