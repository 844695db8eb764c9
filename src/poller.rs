//! The poll-format-publish loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crate::discovery::Discovery;
use crate::display::{self, StatusScreen};
use crate::mqtt::Publisher;
use crate::prelude::*;
use crate::reading::Reading;
use crate::sensors::{self, EnviroSensors, ParticulateSensor};

/// How often the sleep between iterations checks the shutdown flag.
const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct Settings {
    pub broker: String,
    pub topic: String,
    pub interval: Duration,
}

/// Everything the loop touches, owned by the entry point. No globals, so every
/// exit path can release the handles.
pub struct Context {
    pub serial_number: String,
    pub publisher: Box<dyn Publisher + Send>,
    pub enviro: Box<dyn EnviroSensors + Send>,
    pub particulate: Option<Box<dyn ParticulateSensor + Send>>,
    pub screen: Box<dyn StatusScreen + Send>,
    pub discovery: Option<Discovery>,
    pub wifi_probe: fn() -> bool,
}

/// Runs the loop until the shutdown flag is raised, then closes the discovery
/// handles. An iteration failure is logged and never terminates the loop.
pub fn run(context: &mut Context, settings: &Settings, shutdown: &AtomicBool) -> Result {
    if let Some(discovery) = &context.discovery {
        discovery.announce(context.publisher.as_ref())?;
    }
    while !shutdown.load(Ordering::Relaxed) {
        if let Err(error) = run_iteration(context, settings) {
            error!("The iteration has failed: {:#}", error);
        }
        sleep(settings.interval, shutdown);
    }
    if let Some(discovery) = context.discovery.as_mut() {
        discovery.close(context.publisher.as_ref())?;
    }
    Ok(())
}

fn run_iteration(context: &mut Context, settings: &Settings) -> Result {
    let sample = context.enviro.sample()?;
    let mut reading = Reading::compose(&sample, &context.serial_number);
    if let Some(particulate) = context.particulate.as_mut() {
        reading.set_particulates(sensors::read_particulates(particulate.as_mut())?);
    }
    info!("{:?}", reading);
    context
        .publisher
        .publish(&settings.topic, serde_json::to_vec(&reading)?, true)?;
    if let Some(discovery) = &context.discovery {
        discovery.publish_states(context.publisher.as_ref(), &reading)?;
    }
    let panel = display::status_panel(
        (context.wifi_probe)(),
        &settings.broker,
        &context.serial_number,
    );
    context.screen.show(&panel)
}

/// Sleeps for the interval, waking up early when the shutdown flag is raised.
fn sleep(interval: Duration, shutdown: &AtomicBool) {
    let deadline = Instant::now() + interval;
    loop {
        let now = Instant::now();
        if now >= deadline || shutdown.load(Ordering::Relaxed) {
            return;
        }
        thread::sleep(SHUTDOWN_POLL_INTERVAL.min(deadline - now));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::discovery::CHANNELS;
    use crate::display::fake::FakeScreen;
    use crate::mqtt::fake::FakePublisher;
    use crate::sensors::fake::{FakeEnviroSensors, FakeParticulateSensor};
    use crate::sensors::{EnviroSample, ParticulateError, Particulates};

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

    fn settings() -> Settings {
        Settings {
            broker: "broker.local".into(),
            topic: "enviroplus".into(),
            interval: Duration::from_millis(1),
        }
    }

    fn context(
        publisher: &FakePublisher,
        screen: &FakeScreen,
        enviro: FakeEnviroSensors,
        particulate: Option<FakeParticulateSensor>,
        discovery: Option<Discovery>,
    ) -> Context {
        Context {
            serial_number: "deadbeef".into(),
            publisher: Box::new(publisher.clone()),
            enviro: Box::new(enviro),
            particulate: particulate
                .map(|sensor| Box::new(sensor) as Box<dyn ParticulateSensor + Send>),
            screen: Box::new(screen.clone()),
            discovery,
            wifi_probe: || true,
        }
    }

    #[test]
    fn iteration_without_particulate_sensor() -> Result {
        let publisher = FakePublisher::default();
        let screen = FakeScreen::default();
        let mut context = context(
            &publisher,
            &screen,
            FakeEnviroSensors::new(vec![Ok(sample())]),
            None,
            None,
        );
        run_iteration(&mut context, &settings())?;

        let messages = publisher.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].topic, "enviroplus");
        assert!(messages[0].retain);
        let payload: serde_json::Value = serde_json::from_slice(&messages[0].payload)?;
        assert_eq!(payload["serial"], "deadbeef");
        assert!(payload.get("pm1").is_none());
        assert!(payload.get("pm25").is_none());
        assert!(payload.get("pm10").is_none());

        let panels = screen.panels();
        assert_eq!(panels.len(), 1);
        assert_eq!(panels[0].lines[2], "mqtt-broker: broker.local");
        Ok(())
    }

    #[test]
    fn iteration_recovers_from_a_single_particulate_timeout() -> Result {
        let publisher = FakePublisher::default();
        let screen = FakeScreen::default();
        let particulate = FakeParticulateSensor::new(vec![
            Err(ParticulateError::ReadTimeout),
            Ok(Particulates {
                pm1: 3,
                pm25: 7,
                pm10: 12,
            }),
        ]);
        let mut context = context(
            &publisher,
            &screen,
            FakeEnviroSensors::new(vec![Ok(sample())]),
            Some(particulate),
            None,
        );
        run_iteration(&mut context, &settings())?;

        let payload: serde_json::Value = serde_json::from_slice(&publisher.messages()[0].payload)?;
        assert_eq!(payload["pm1"], 3);
        assert_eq!(payload["pm25"], 7);
        assert_eq!(payload["pm10"], 12);
        Ok(())
    }

    #[test]
    fn iteration_aborts_on_a_second_particulate_timeout() {
        let publisher = FakePublisher::default();
        let screen = FakeScreen::default();
        let particulate = FakeParticulateSensor::new(vec![
            Err(ParticulateError::ReadTimeout),
            Err(ParticulateError::ReadTimeout),
        ]);
        let mut context = context(
            &publisher,
            &screen,
            FakeEnviroSensors::new(vec![Ok(sample())]),
            Some(particulate),
            None,
        );
        assert!(run_iteration(&mut context, &settings()).is_err());
        assert!(publisher.messages().is_empty());
    }

    #[test]
    fn loop_continues_after_a_failed_iteration() -> Result {
        let publisher = FakePublisher::default();
        let screen = FakeScreen::default();
        let mut context = context(
            &publisher,
            &screen,
            FakeEnviroSensors::new(vec![Err(anyhow!("sensor glitch")), Ok(sample())]),
            None,
            None,
        );
        let shutdown = Arc::new(AtomicBool::new(false));

        let handle = {
            let shutdown = shutdown.clone();
            let settings = settings();
            thread::spawn(move || run(&mut context, &settings, &shutdown))
        };
        let deadline = Instant::now() + Duration::from_secs(5);
        while publisher.messages().is_empty() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        shutdown.store(true, Ordering::Relaxed);
        handle.join().unwrap()?;

        // The first iteration failed, the second one still published.
        assert!(!publisher.messages().is_empty());
        Ok(())
    }

    #[test]
    fn shutdown_closes_the_discovery_channels_once() -> Result {
        let publisher = FakePublisher::default();
        let screen = FakeScreen::default();
        let mut context = context(
            &publisher,
            &screen,
            FakeEnviroSensors::new(vec![]),
            None,
            Some(Discovery::new("homeassistant", "raspi-deadbeef")),
        );
        let shutdown = AtomicBool::new(true);
        run(&mut context, &settings(), &shutdown)?;

        let removals: Vec<_> = publisher
            .messages()
            .into_iter()
            .filter(|message| message.payload.is_empty() && message.topic.ends_with("/config"))
            .collect();
        assert_eq!(removals.len(), CHANNELS.len());
        Ok(())
    }
}
