//! Entry point: wires the configuration, broker session, sensors and the loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use structopt::StructOpt;

mod device;
mod discovery;
mod display;
mod logging;
mod mqtt;
mod opts;
mod poller;
mod prelude;
mod reading;
mod sensors;

use crate::discovery::Discovery;
use crate::display::StatusScreen;
use crate::opts::Opts;
use crate::prelude::*;
use crate::sensors::{EnviroSensors, ParticulateSensor};

fn main() -> Result {
    let opts = Opts::from_args();
    logging::init(&opts)?;

    let device = device::Device::detect()?;
    info!("Client ID: {}", device.client_id);
    info!(
        "Broker: {}:{} (TLS: {}), topic: `{}`",
        opts.broker, opts.port, opts.tls, opts.topic
    );
    info!(
        "Wi-Fi: {}",
        if device::is_wifi_connected() {
            "connected"
        } else {
            "disconnected"
        },
    );

    info!("Connecting to the broker…");
    let publisher = Box::new(mqtt::connect(&opts, &device.client_id)?);

    let (enviro, particulate, screen) = open_sensors(&opts)?;
    let discovery = if opts.homeassistant {
        Some(Discovery::new(&opts.discovery_prefix, &device.client_id))
    } else {
        None
    };

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || {
            shutdown.store(true, Ordering::Relaxed);
        })?;
    }

    let settings = poller::Settings {
        broker: opts.broker.clone(),
        topic: opts.topic.clone(),
        interval: Duration::from_secs(opts.interval),
    };
    let mut context = poller::Context {
        serial_number: device.serial_number,
        publisher,
        enviro,
        particulate,
        screen,
        discovery,
        wifi_probe: device::is_wifi_connected,
    };
    info!("Press Ctrl+C to exit");
    poller::run(&mut context, &settings, &shutdown)
}

type Sensors = (
    Box<dyn EnviroSensors + Send>,
    Option<Box<dyn ParticulateSensor + Send>>,
    Box<dyn StatusScreen + Send>,
);

fn open_sensors(opts: &Opts) -> Result<Sensors> {
    if opts.demo {
        info!("Polling the built-in demo sensors");
        return Ok((
            Box::new(sensors::demo::DemoSensors::new()),
            None,
            Box::new(display::ConsoleScreen),
        ));
    }
    #[cfg(feature = "hardware")]
    {
        Ok((
            Box::new(sensors::hardware::EnviroBoard::open()?),
            sensors::hardware::detect_pms5003(),
            Box::new(display::lcd::Lcd::open()?),
        ))
    }
    #[cfg(not(feature = "hardware"))]
    {
        Err(anyhow!(
            "built without the `hardware` feature, pass `--demo` to poll the demo sensors"
        ))
    }
}
