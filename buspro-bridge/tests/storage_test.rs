use std::sync::Arc;

use buspro_bridge::configs::settings::{CurtainDevice, Database};
use buspro_bridge::configs::{AccessoryStore, SchemaManager, Storage};
use buspro_bridge::models::{AccessoryContext, ColorSnapshot, MotionState};
use buspro_bridge::services::{Cover, CoverConfig, MockBus};
use uuid::Uuid;

use crate::common::mock_app::CURTAIN_DEVICE;

mod common;

async fn memory_storage() -> Storage {
    Storage::new("sqlite::memory:", true, SchemaManager::default())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_save_and_load() {
    let storage = memory_storage().await;
    let id = Uuid::new_v4();

    let context = AccessoryContext {
        current_position: Some(40),
        target_position: Some(70),
        last_color: Some(ColorSnapshot {
            hue: 200,
            saturation: 60,
            brightness: 80,
        }),
    };
    storage.save(&id, &context).await.unwrap();

    assert_eq!(storage.load(&id).await.unwrap(), Some(context));
}

#[tokio::test]
async fn test_save_replaces_context() {
    let storage = memory_storage().await;
    let id = Uuid::new_v4();

    let first = AccessoryContext {
        current_position: Some(10),
        target_position: Some(10),
        last_color: None,
    };
    let second = AccessoryContext {
        current_position: Some(90),
        target_position: Some(100),
        last_color: None,
    };
    storage.save(&id, &first).await.unwrap();
    storage.save(&id, &second).await.unwrap();

    assert_eq!(storage.load(&id).await.unwrap(), Some(second));
}

#[tokio::test]
async fn test_load_unknown_accessory() {
    let storage = memory_storage().await;

    assert_eq!(storage.load(&Uuid::new_v4()).await.unwrap(), None);
}

#[tokio::test]
async fn test_no_database_configured() {
    let database = Database {
        url: None,
        clean_start: false,
    };

    assert!(Storage::from_settings(&database).await.unwrap().is_none());
}

#[tokio::test]
async fn test_cover_resumes_from_storage() {
    let storage = Arc::new(memory_storage().await);
    let id = Uuid::new_v4();
    storage
        .save(
            &id,
            &AccessoryContext {
                current_position: Some(65),
                target_position: Some(65),
                last_color: None,
            },
        )
        .await
        .unwrap();

    let config = CoverConfig::from(&CurtainDevice {
        name: "Stored Curtain".into(),
        address: CURTAIN_DEVICE,
        curtain: 1,
        nc: true,
        duration: 10.0,
        precision: 1,
    });
    let cover = Cover::new(id, config, Arc::new(MockBus::new()), storage).await;

    let state = cover.state().await;
    assert_eq!(state.current_position, 65);
    assert_eq!(state.target_position, 65);
    assert_eq!(state.motion, MotionState::Stopped);
}
