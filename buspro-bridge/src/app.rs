use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use buspro_api::{CommandChannel, DeviceAddress, StatusSource};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::configs::settings::Gateway;
use crate::configs::{AccessoryStore, DeviceConfig, MemoryStore, Settings, Storage};
use crate::handles::*;
use crate::services::{Cover, CoverConfig, LightConfig, ListenerRegistry, RgbLight, UdpGateway};

/// Everything built from the configured devices
pub struct Accessories {
    pub covers: Vec<Cover>,
    pub lights: Vec<RgbLight>,
    pub listeners: ListenerRegistry,
}

impl Accessories {
    pub fn cover(&self, id: &Uuid) -> Option<&Cover> {
        self.covers.iter().find(|cover| cover.id() == *id)
    }

    pub fn light(&self, id: &Uuid) -> Option<&RgbLight> {
        self.lights.iter().find(|light| light.id() == *id)
    }
}

/// Stable accessory id derived from where the unit lives on the bus
pub fn accessory_id(gateway: &Gateway, address: DeviceAddress, suffix: &str) -> Uuid {
    let unique = format!(
        "{}:{}.{}.{}.{}",
        gateway.host, gateway.port, address.subnet, address.device, suffix
    );
    Uuid::new_v5(&Uuid::NAMESPACE_OID, unique.as_bytes())
}

pub async fn build_accessories(
    settings: &Settings,
    bus: Arc<dyn CommandChannel>,
    source: Arc<dyn StatusSource>,
    store: Arc<dyn AccessoryStore>,
) -> Accessories {
    let listeners = ListenerRegistry::new(source);
    let mut covers = Vec::new();
    let mut lights = Vec::new();

    for device in &settings.devices {
        match device {
            DeviceConfig::Curtain(curtain) => {
                let id = accessory_id(
                    &settings.gateway,
                    curtain.address,
                    &format!("curtain.{}", curtain.curtain),
                );
                let cover = Cover::new(id, CoverConfig::from(curtain), bus.clone(), store.clone()).await;

                let listener = listeners.listener(curtain.address).await;
                cover.attach(listener.curtain(curtain.curtain).await);
                cover.query_status();

                tracing::info!(
                    "added cover {} at {} curtain {}",
                    curtain.name,
                    curtain.address,
                    curtain.curtain
                );
                covers.push(cover);
            }
            DeviceConfig::Rgb(rgb) => {
                let config = match LightConfig::new(rgb, &settings.light) {
                    Ok(config) => config,
                    Err(e) => {
                        tracing::error!("{} - check configuration", e);
                        continue;
                    }
                };

                let channels = config.channels;
                let id = accessory_id(
                    &settings.gateway,
                    rgb.address,
                    &format!("rgb.{}-{}-{}", channels.red, channels.green, channels.blue),
                );
                let light = RgbLight::new(id, config, bus.clone(), store.clone()).await;

                let listener = listeners.listener(rgb.address).await;
                light.attach(
                    listener.channel(channels.red).await,
                    listener.channel(channels.green).await,
                    listener.channel(channels.blue).await,
                );
                light.query_status();

                tracing::info!(
                    "added RGB light {} at {} channels {}-{}-{}",
                    rgb.name,
                    rgb.address,
                    channels.red,
                    channels.green,
                    channels.blue
                );
                lights.push(light);
            }
            DeviceConfig::Unsupported => {
                tracing::error!("invalid device type in configuration, skipped");
            }
        }
    }

    Accessories {
        covers,
        lights,
        listeners,
    }
}

pub fn create_router(accessories: Arc<Accessories>) -> Router {
    let covers = Router::new()
        .route("/", get(get_covers))
        .route("/:cover_id", get(get_cover).put(update_cover))
        .with_state(CoversState {
            accessories: accessories.clone(),
        });

    let lights = Router::new()
        .route("/", get(get_lights))
        .route("/:light_id", get(get_light).put(update_light))
        .with_state(LightsState {
            accessories: accessories.clone(),
        });

    Router::new()
        .nest("/covers", covers)
        .nest("/lights", lights)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

pub async fn create_app(settings: &Arc<Settings>) -> Router {
    let store: Arc<dyn AccessoryStore> = match Storage::from_settings(&settings.database)
        .await
        .expect("Failed to open database.")
    {
        Some(storage) => Arc::new(storage),
        None => {
            tracing::warn!("no database configured, accessory state is kept in memory");
            Arc::new(MemoryStore::new())
        }
    };

    let gateway = UdpGateway::connect(&settings.gateway)
        .await
        .expect("Failed to connect bus gateway.");
    // Receives until the process exits
    let _ = gateway.start();

    let accessories = build_accessories(
        settings,
        Arc::new(gateway.clone()),
        Arc::new(gateway),
        store,
    )
    .await;

    create_router(Arc::new(accessories))
}
