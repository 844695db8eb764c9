use structopt::StructOpt;

#[derive(StructOpt, Debug)]
#[structopt(name = "enviro-mqtt", author, about)]
pub struct Opts {
    /// Show only warnings and errors
    #[structopt(short = "s", long = "silent", conflicts_with = "verbose")]
    pub silent: bool,

    /// Show all log messages
    #[structopt(short = "v", long = "verbose", conflicts_with = "silent")]
    pub verbose: bool,

    /// Suppress timestamps in logs, useful with journald
    #[structopt(long = "suppress-log-timestamps")]
    pub suppress_log_timestamps: bool,

    /// MQTT broker host
    #[structopt(long, env = "ENVIRO_MQTT_BROKER", default_value = "localhost")]
    pub broker: String,

    /// MQTT broker port
    #[structopt(long, default_value = "1883")]
    pub port: u16,

    /// MQTT topic for the combined readings
    #[structopt(long, default_value = "enviroplus")]
    pub topic: String,

    /// Read interval in seconds
    #[structopt(long, default_value = "10")]
    pub interval: u64,

    /// Enable TLS towards the broker
    #[structopt(long)]
    pub tls: bool,

    /// MQTT username, omit to connect anonymously
    #[structopt(long, env = "ENVIRO_MQTT_USERNAME")]
    pub username: Option<String>,

    /// MQTT password
    #[structopt(long, env = "ENVIRO_MQTT_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Announce the sensors to Home Assistant via MQTT discovery
    #[structopt(long = "homeassistant")]
    pub homeassistant: bool,

    /// Home Assistant discovery topic prefix
    #[structopt(long = "discovery-prefix", default_value = "homeassistant")]
    pub discovery_prefix: String,

    /// Poll built-in demo sensors instead of the Enviro+ hardware
    #[structopt(long)]
    pub demo: bool,
}
