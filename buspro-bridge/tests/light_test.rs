use std::sync::Arc;
use std::time::Duration;

use buspro_api::Command;
use buspro_bridge::configs::MemoryStore;
use buspro_bridge::configs::settings::{Light, RgbDevice};
use buspro_bridge::errors::DeviceError;
use buspro_bridge::models::{AccessoryContext, ChannelLevels, ColorSnapshot};
use buspro_bridge::services::color::hsv_to_rgb;
use buspro_bridge::services::{LightConfig, MockBus, RgbLight, UnitListener};
use tokio::time::sleep;
use uuid::Uuid;

use crate::common::mock_app::{DIMMER_DEVICE, settle};

mod common;

const LIGHT_ID: Uuid = Uuid::from_u128(0x30_01);

fn device() -> RgbDevice {
    RgbDevice {
        name: "Test Strip".into(),
        address: DIMMER_DEVICE,
        red_channel: Some(1),
        green_channel: Some(2),
        blue_channel: Some(3),
    }
}

struct TestLight {
    bus: MockBus,
    store: Arc<MemoryStore>,
    light: RgbLight,
    _listener: UnitListener,
}

async fn test_light(bus: MockBus, store: Arc<MemoryStore>) -> TestLight {
    let config = LightConfig::new(&device(), &Light::default()).unwrap();
    let light = RgbLight::new(LIGHT_ID, config, Arc::new(bus.clone()), store.clone()).await;

    let listener = UnitListener::new(DIMMER_DEVICE, &bus);
    light.attach(
        listener.channel(1).await,
        listener.channel(2).await,
        listener.channel(3).await,
    );

    TestLight {
        bus,
        store,
        light,
        _listener: listener,
    }
}

/// Channel levels written so far, in order
fn writes(bus: &MockBus) -> Vec<(u8, u8)> {
    bus.sent()
        .into_iter()
        .filter_map(|(_, command)| match command {
            Command::SingleChannelControl { channel, level, .. } => Some((channel, level)),
            _ => None,
        })
        .collect()
}

/// Last batch of writes as channel levels
fn last_levels(bus: &MockBus) -> ChannelLevels {
    let mut levels = ChannelLevels::OFF;
    for (channel, level) in writes(bus) {
        match channel {
            1 => levels.red = level,
            2 => levels.green = level,
            3 => levels.blue = level,
            _ => panic!("unexpected channel {channel}"),
        }
    }
    levels
}

fn report(bus: &MockBus, red: u8, green: u8, blue: u8) {
    bus.report(
        DIMMER_DEVICE,
        Command::ChannelStatus {
            levels: vec![red, green, blue],
        },
    );
}

#[tokio::test(start_paused = true)]
async fn test_off_on_restores_color() {
    let test = test_light(MockBus::new(), Arc::new(MemoryStore::new())).await;

    test.light.set_on(true).await;
    test.light.set_hue(200).await;
    test.light.set_saturation(60).await;
    test.light.set_brightness(80).await;
    sleep(Duration::from_millis(100)).await;
    assert_eq!(last_levels(&test.bus), hsv_to_rgb(200, 60, 80));

    test.light.set_on(false).await;
    sleep(Duration::from_millis(100)).await;
    assert_eq!(last_levels(&test.bus), ChannelLevels::OFF);
    assert!(!test.light.on().await);

    test.light.set_on(true).await;
    assert!(test.light.on().await);
    assert_eq!(test.light.hue().await, 200);
    assert_eq!(test.light.saturation().await, 60);
    assert_eq!(test.light.brightness().await, 80);

    sleep(Duration::from_millis(100)).await;
    assert_eq!(last_levels(&test.bus), hsv_to_rgb(200, 60, 80));
}

#[tokio::test(start_paused = true)]
async fn test_zero_brightness_switches_off() {
    let test = test_light(MockBus::new(), Arc::new(MemoryStore::new())).await;

    test.light.set_on(true).await;
    test.light.set_brightness(60).await;
    sleep(Duration::from_millis(100)).await;
    assert_eq!(last_levels(&test.bus), ChannelLevels::new(60, 0, 0));

    test.light.set_brightness(0).await;
    assert!(!test.light.on().await);
    assert_eq!(test.light.brightness().await, 0);

    sleep(Duration::from_millis(100)).await;
    assert_eq!(last_levels(&test.bus), ChannelLevels::OFF);
    assert_eq!(test.light.color().await.last_color.brightness, 60);

    test.light.set_on(true).await;
    assert_eq!(test.light.brightness().await, 60);

    sleep(Duration::from_millis(100)).await;
    assert!(test.light.on().await);
    assert_eq!(last_levels(&test.bus), ChannelLevels::new(60, 0, 0));
}

#[tokio::test(start_paused = true)]
async fn test_rapid_edits_write_once() {
    let test = test_light(MockBus::new(), Arc::new(MemoryStore::new())).await;

    test.light.set_on(true).await;
    for hue in [0u16, 60, 120, 180, 240] {
        test.light.set_hue(hue).await;
        sleep(Duration::from_millis(10)).await;
    }
    assert!(writes(&test.bus).is_empty());

    sleep(Duration::from_millis(100)).await;

    let mut written = writes(&test.bus);
    written.sort();
    assert_eq!(written, vec![(1, 0), (2, 0), (3, 100)]);
    assert_eq!(test.light.hue().await, 240);
}

#[tokio::test(start_paused = true)]
async fn test_echo_is_not_reinterpreted() {
    let test = test_light(MockBus::new().with_echo(), Arc::new(MemoryStore::new())).await;

    test.light.set_on(true).await;
    test.light.set_hue(120).await;
    sleep(Duration::from_millis(100)).await;
    assert_eq!(last_levels(&test.bus), ChannelLevels::new(0, 100, 0));

    // Inside the suppression window
    report(&test.bus, 10, 0, 0);
    settle().await;
    assert_eq!(test.light.levels().await, ChannelLevels::new(10, 0, 0));
    assert!(test.light.on().await);
    assert_eq!(test.light.hue().await, 120);
    assert_eq!(test.light.brightness().await, 100);

    sleep(Duration::from_secs(1)).await;
    report(&test.bus, 0, 0, 40);
    settle().await;

    assert!(test.light.on().await);
    assert_eq!(test.light.hue().await, 240);
    assert_eq!(test.light.saturation().await, 100);
    assert_eq!(test.light.brightness().await, 40);
}

#[tokio::test(start_paused = true)]
async fn test_external_off_keeps_restore_point() {
    let test = test_light(MockBus::new(), Arc::new(MemoryStore::new())).await;

    report(&test.bus, 0, 0, 40);
    settle().await;
    assert!(test.light.on().await);
    assert_eq!(test.light.hue().await, 240);

    report(&test.bus, 0, 0, 0);
    settle().await;

    let color = test.light.color().await;
    assert!(!color.on);
    assert_eq!(color.brightness, 0);
    assert_eq!(
        color.last_color,
        ColorSnapshot {
            hue: 240,
            saturation: 100,
            brightness: 40
        }
    );

    test.light.set_on(true).await;
    assert_eq!(test.light.hue().await, 240);
    assert_eq!(test.light.brightness().await, 40);
}

#[tokio::test(start_paused = true)]
async fn test_low_saturation_drives_white() {
    let test = test_light(MockBus::new(), Arc::new(MemoryStore::new())).await;

    test.light.set_on(true).await;
    test.light.set_hue(30).await;
    test.light.set_saturation(5).await;
    test.light.set_brightness(70).await;
    sleep(Duration::from_millis(100)).await;

    assert_eq!(last_levels(&test.bus), ChannelLevels::white(70));
    assert_eq!(test.light.hue().await, 30);

    test.bus.clear();
    test.light.set_saturation(80).await;
    sleep(Duration::from_millis(100)).await;

    assert_eq!(last_levels(&test.bus), hsv_to_rgb(30, 80, 70));
}

#[tokio::test(start_paused = true)]
async fn test_stale_report_while_restoring() {
    let test = test_light(MockBus::new(), Arc::new(MemoryStore::new())).await;

    test.light.set_on(true).await;

    // Arrives before the restored color is written
    report(&test.bus, 0, 0, 0);
    settle().await;
    assert!(test.light.on().await);
    assert_eq!(test.light.brightness().await, 100);

    sleep(Duration::from_millis(100)).await;
    assert_eq!(last_levels(&test.bus), ChannelLevels::new(100, 0, 0));

    // Confirmation of the restored color
    report(&test.bus, 100, 0, 0);
    settle().await;

    sleep(Duration::from_secs(1)).await;
    report(&test.bus, 0, 50, 0);
    settle().await;
    assert_eq!(test.light.hue().await, 120);
    assert_eq!(test.light.brightness().await, 50);
}

#[tokio::test(start_paused = true)]
async fn test_failed_write_keeps_model() {
    let bus = MockBus::new();
    bus.set_failing(true);
    let test = test_light(bus, Arc::new(MemoryStore::new())).await;

    test.light.set_on(true).await;
    test.light.set_hue(90).await;
    sleep(Duration::from_millis(100)).await;

    assert_eq!(writes(&test.bus).len(), 3);
    assert!(test.light.on().await);
    assert_eq!(test.light.hue().await, 90);
}

#[tokio::test(start_paused = true)]
async fn test_last_color_is_persisted() {
    let store = Arc::new(MemoryStore::new());
    let test = test_light(MockBus::new(), store.clone()).await;

    test.light.set_on(true).await;
    test.light.set_hue(200).await;
    sleep(Duration::from_millis(100)).await;

    let expected = ColorSnapshot {
        hue: 200,
        saturation: 100,
        brightness: 100,
    };
    assert_eq!(test.store.get(&LIGHT_ID).unwrap().last_color, Some(expected));

    let restarted = test_light(MockBus::new(), store).await;
    let color = restarted.light.color().await;
    assert!(!color.on);
    assert_eq!(color.hue, 200);
    assert_eq!(color.last_color, expected);
}

#[tokio::test(start_paused = true)]
async fn test_dark_restore_point_turns_on_bright() {
    let store = Arc::new(MemoryStore::new());
    store.insert(
        LIGHT_ID,
        AccessoryContext {
            last_color: Some(ColorSnapshot {
                hue: 120,
                saturation: 100,
                brightness: 0,
            }),
            ..AccessoryContext::default()
        },
    );
    let test = test_light(MockBus::new(), store).await;

    test.light.set_on(true).await;
    sleep(Duration::from_millis(100)).await;

    assert_eq!(test.light.hue().await, 120);
    assert_eq!(test.light.brightness().await, 100);
    assert_eq!(last_levels(&test.bus), ChannelLevels::new(0, 100, 0));
}

#[test]
fn test_missing_channel_is_rejected() {
    let device = RgbDevice {
        blue_channel: None,
        ..device()
    };

    let result = LightConfig::new(&device, &Light::default());

    assert!(matches!(
        result,
        Err(DeviceError::MissingChannel { channel: "blue", .. })
    ));
}
