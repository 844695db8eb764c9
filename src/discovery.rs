//! Home Assistant MQTT discovery: announces each channel once, publishes its
//! state every iteration, and removes the entities on shutdown.

use crate::mqtt::Publisher;
use crate::prelude::*;
use crate::reading::Reading;

/// Static description of one announced sensor channel.
pub struct Channel {
    /// Key of the value inside a [`Reading`].
    pub key: &'static str,
    /// Suffix of the Home Assistant object and unique ids.
    pub object_id: &'static str,
    pub name: &'static str,
    pub unit: &'static str,
    pub device_class: &'static str,
}

/// The fixed channel set of the Enviro+ board.
pub const CHANNELS: &[Channel] = &[
    Channel {
        key: "temperature",
        object_id: "temperature",
        name: "Temperature",
        unit: "°C",
        device_class: "temperature",
    },
    Channel {
        key: "pressure",
        object_id: "pressure",
        name: "Pressure",
        unit: "Pa",
        device_class: "pressure",
    },
    Channel {
        key: "humidity",
        object_id: "humidity",
        name: "Humidity",
        unit: "%",
        device_class: "humidity",
    },
    Channel {
        key: "oxidised",
        object_id: "oxidised",
        name: "Oxidised",
        unit: "ppm",
        device_class: "nitrous_oxide",
    },
    Channel {
        key: "reduced",
        object_id: "reduced",
        name: "Reduced",
        unit: "ppm",
        device_class: "carbon_monoxide",
    },
    Channel {
        key: "nh3",
        object_id: "nh3",
        name: "NH3",
        unit: "ppm",
        device_class: "volatile_organic_compounds",
    },
    Channel {
        key: "lux",
        object_id: "light",
        name: "Light",
        unit: "lux",
        device_class: "illuminance",
    },
];

#[derive(Serialize)]
struct ConfigPayload<'a> {
    name: String,
    unique_id: &'a str,
    state_topic: &'a str,
    unit_of_measurement: &'a str,
    device_class: &'a str,
    device: DeviceBlock<'a>,
}

/// Shared device block so the hub groups the channels under one device.
#[derive(Serialize)]
struct DeviceBlock<'a> {
    identifiers: [&'a str; 1],
    name: &'a str,
    manufacturer: &'a str,
}

pub struct Discovery {
    prefix: String,
    device_id: String,
    closed: bool,
}

impl Discovery {
    pub fn new<P: Into<String>, D: Into<String>>(prefix: P, device_id: D) -> Self {
        Self {
            prefix: prefix.into(),
            device_id: device_id.into(),
            closed: false,
        }
    }

    fn unique_id(&self, channel: &Channel) -> String {
        format!("{}_{}", self.device_id, channel.object_id)
    }

    fn config_topic(&self, channel: &Channel) -> String {
        format!("{}/sensor/{}/config", self.prefix, self.unique_id(channel))
    }

    fn state_topic(&self, channel: &Channel) -> String {
        format!("{}/sensor/{}/state", self.prefix, self.unique_id(channel))
    }

    /// One-shot announcement: a retained config message per channel.
    pub fn announce(&self, publisher: &dyn Publisher) -> Result {
        info!("Announcing {} channels to Home Assistant…", CHANNELS.len());
        for channel in CHANNELS {
            let unique_id = self.unique_id(channel);
            let payload = ConfigPayload {
                name: format!("Enviro+ {}", channel.name),
                unique_id: &unique_id,
                state_topic: &self.state_topic(channel),
                unit_of_measurement: channel.unit,
                device_class: channel.device_class,
                device: DeviceBlock {
                    identifiers: [&self.device_id],
                    name: "Enviro+",
                    manufacturer: "Pimoroni",
                },
            };
            publisher.publish(&self.config_topic(channel), serde_json::to_vec(&payload)?, true)?;
        }
        Ok(())
    }

    /// Publishes each channel's bare value to its state topic.
    pub fn publish_states(&self, publisher: &dyn Publisher, reading: &Reading) -> Result {
        for channel in CHANNELS {
            let value = reading
                .channel_value(channel.key)
                .ok_or_else(|| anyhow!("no value for channel `{}`", channel.key))?;
            publisher.publish(
                &self.state_topic(channel),
                value.to_string().into_bytes(),
                false,
            )?;
        }
        Ok(())
    }

    /// Removes the entities by clearing the retained config messages.
    /// Safe to call more than once, only the first call publishes.
    pub fn close(&mut self, publisher: &dyn Publisher) -> Result {
        if self.closed {
            return Ok(());
        }
        info!("Closing the Home Assistant channels…");
        for channel in CHANNELS {
            publisher.publish(&self.config_topic(channel), Vec::new(), true)?;
        }
        self.closed = true;
        Ok(())
    }
}
