use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use buspro_api::DeviceAddress;
use buspro_bridge::app::{Accessories, build_accessories, create_router};
use buspro_bridge::configs::{MemoryStore, Settings};
use buspro_bridge::services::{Cover, MockBus, RgbLight};

pub const CURTAIN_DEVICE: DeviceAddress = DeviceAddress::new(1, 20);
pub const DIMMER_DEVICE: DeviceAddress = DeviceAddress::new(1, 30);

pub const SETTINGS: &str = r#"
    [server]
    host = "127.0.0.1"
    port = 3000

    [logger]
    level = "debug"

    [gateway]
    host = "192.168.1.255"
    port = 6000
    bind = "0.0.0.0:0"
    subnet = 1
    device_id = 254
    reply_timeout_ms = 1000

    [database]
    clean_start = true

    [light]
    debounce_ms = 50
    echo_window_ms = 500

    [[devices]]
    type = "curtain"
    name = "Living Room"
    address = "1.20"
    curtain = 1
    duration = 10

    [[devices]]
    type = "rgb"
    name = "Kitchen Strip"
    address = "1.30"
    red_channel = 1
    green_channel = 2
    blue_channel = 3

    [[devices]]
    type = "rgb"
    name = "Half Wired"
    address = "1.31"
    red_channel = 1
    green_channel = 2
"#;

pub struct MockApp {
    pub bus: MockBus,
    pub store: Arc<MemoryStore>,
    pub accessories: Arc<Accessories>,
    pub router: Router,
}

impl MockApp {
    pub async fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new())).await
    }

    pub async fn with_store(store: Arc<MemoryStore>) -> Self {
        let settings = Settings::from_toml(SETTINGS).unwrap();
        let bus = MockBus::new().with_echo();

        let accessories = Arc::new(
            build_accessories(
                &settings,
                Arc::new(bus.clone()),
                Arc::new(bus.clone()),
                store.clone(),
            )
            .await,
        );
        let router = create_router(accessories.clone());

        Self {
            bus,
            store,
            accessories,
            router,
        }
    }

    pub fn cover(&self) -> &Cover {
        &self.accessories.covers[0]
    }

    pub fn light(&self) -> &RgbLight {
        &self.accessories.lights[0]
    }
}

/// Lets spawned listeners and timers that are already due run
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}
