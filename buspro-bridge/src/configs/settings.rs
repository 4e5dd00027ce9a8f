use std::env;

use buspro_api::{DEFAULT_GATEWAY_PORT, DeviceAddress};
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logger {
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gateway {
    pub host: String,
    #[serde(default = "Gateway::default_port")]
    pub port: u16,
    /// Local address the UDP socket binds to
    pub bind: String,
    /// Subnet and device id the bridge announces itself with
    pub subnet: u8,
    pub device_id: u8,
    pub reply_timeout_ms: u64,
}

impl Gateway {
    fn default_port() -> u16 {
        DEFAULT_GATEWAY_PORT
    }

    pub fn controller(&self) -> DeviceAddress {
        DeviceAddress::new(self.subnet, self.device_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Database {
    /// Keeps accessory state in memory when absent
    pub url: Option<String>,
    pub clean_start: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Light {
    #[serde(default = "Light::default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "Light::default_echo_window_ms")]
    pub echo_window_ms: u64,
    #[serde(default)]
    pub ramp_seconds: u16,
}

impl Light {
    fn default_debounce_ms() -> u64 {
        50
    }

    fn default_echo_window_ms() -> u64 {
        500
    }
}

impl Default for Light {
    fn default() -> Self {
        Self {
            debounce_ms: Self::default_debounce_ms(),
            echo_window_ms: Self::default_echo_window_ms(),
            ramp_seconds: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurtainDevice {
    pub name: String,
    pub address: DeviceAddress,
    pub curtain: u8,
    /// Wiring polarity of the relay pair
    #[serde(default = "CurtainDevice::default_nc")]
    pub nc: bool,
    /// Seconds for a full 0 to 100 traverse
    pub duration: f64,
    #[serde(default = "CurtainDevice::default_precision")]
    pub precision: u8,
}

impl CurtainDevice {
    fn default_nc() -> bool {
        true
    }

    fn default_precision() -> u8 {
        1
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RgbDevice {
    pub name: String,
    pub address: DeviceAddress,
    pub red_channel: Option<u8>,
    pub green_channel: Option<u8>,
    pub blue_channel: Option<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DeviceConfig {
    Curtain(CurtainDevice),
    Rgb(RgbDevice),
    /// Any device type this bridge does not drive
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub server: Server,
    pub logger: Logger,
    pub gateway: Gateway,
    pub database: Database,
    #[serde(default)]
    pub light: Light,
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or("development".into());

        Config::builder()
            .add_source(File::with_name("configs/default"))
            .add_source(File::with_name(&format!("configs/{run_mode}")).required(false))
            .add_source(Environment::default().separator("_"))
            .build()?
            .try_deserialize()
    }

    /// Loads settings from an inline TOML document
    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from_str(source, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}
