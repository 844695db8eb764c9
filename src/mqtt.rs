//! MQTT transport: a thin seam over `rumqttc`.

use std::thread;
use std::time::Duration;

use rumqttc::{Client, Event, Incoming, MqttOptions, Outgoing, QoS, Transport};

use crate::opts::Opts;
use crate::prelude::*;

const CHANNEL_CAPACITY: usize = 64;
const KEEP_ALIVE: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// The narrow publish contract the rest of the crate depends on.
pub trait Publisher {
    fn publish(&self, topic: &str, payload: Vec<u8>, retain: bool) -> Result;
}

pub struct Mqtt {
    client: Client,
}

impl Publisher for Mqtt {
    fn publish(&self, topic: &str, payload: Vec<u8>, retain: bool) -> Result {
        self.client.publish(topic, QoS::AtMostOnce, retain, payload)?;
        Ok(())
    }
}

/// Opens the broker session and waits for the first acknowledgement, so that a
/// bad broker address fails startup instead of surfacing in a callback later.
///
/// The connection's event loop keeps running on a named background thread to
/// service keep-alives and reconnects; it only gets logged from there on.
pub fn connect(opts: &Opts, client_id: &str) -> Result<Mqtt> {
    let mut options = MqttOptions::new(client_id, &opts.broker, opts.port);
    options.set_keep_alive(KEEP_ALIVE);
    if let Some(username) = &opts.username {
        options.set_credentials(username, opts.password.clone().unwrap_or_default());
    }
    if opts.tls {
        options.set_transport(Transport::tls_with_default_config());
    }

    let (client, mut connection) = Client::new(options, CHANNEL_CAPACITY);
    let (connected_tx, connected_rx) = crossbeam_channel::bounded(1);
    thread::Builder::new()
        .name("mqtt::connection".into())
        .spawn(move || {
            let mut connected_tx = Some(connected_tx);
            for event in connection.iter() {
                match event {
                    Ok(Event::Incoming(Incoming::ConnAck(ack))) => {
                        info!("Connected to the broker: {:?}", ack.code);
                        if let Some(tx) = connected_tx.take() {
                            let _ = tx.send(Ok(()));
                        }
                    }
                    Ok(Event::Outgoing(Outgoing::Publish(packet_id))) => {
                        debug!("Publish #{} sent", packet_id);
                    }
                    Ok(_) => {}
                    Err(error) => {
                        if let Some(tx) = connected_tx.take() {
                            let _ = tx.send(Err(anyhow!("failed to connect: {}", error)));
                        } else {
                            warn!("Connection error: {}", error);
                        }
                        thread::sleep(RECONNECT_DELAY);
                    }
                }
            }
        })?;

    connected_rx
        .recv_timeout(CONNECT_TIMEOUT)
        .context("timed out waiting for the broker")??;
    Ok(Mqtt { client })
}
