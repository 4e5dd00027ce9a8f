use std::sync::Arc;
use std::time::Duration;

use buspro_api::{Command, CommandChannel, DeviceAddress};
use futures::future::join_all;
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use uuid::Uuid;

use crate::configs::AccessoryStore;
use crate::configs::settings::{Light, RgbDevice};
use crate::errors::DeviceError;
use crate::models::{
    AccessoryContext, Channel, ChannelLevels, ChannelMap, ColorSnapshot, ColorState,
};
use crate::services::color;

#[derive(Debug, Clone)]
pub struct LightConfig {
    pub name: String,
    pub address: DeviceAddress,
    pub channels: ChannelMap,
    /// Quiet period after the last edit before levels are written
    pub debounce: Duration,
    /// How long reports following a write are taken as its echo
    pub echo_window: Duration,
    pub ramp: u16,
}

impl LightConfig {
    pub fn new(device: &RgbDevice, light: &Light) -> Result<Self, DeviceError> {
        let missing = |channel| DeviceError::MissingChannel {
            name: device.name.clone(),
            channel,
        };

        let channels = ChannelMap {
            red: device.red_channel.ok_or_else(|| missing("red"))?,
            green: device.green_channel.ok_or_else(|| missing("green"))?,
            blue: device.blue_channel.ok_or_else(|| missing("blue"))?,
        };

        Ok(Self {
            name: device.name.clone(),
            address: device.address,
            channels,
            debounce: Duration::from_millis(light.debounce_ms),
            echo_window: Duration::from_millis(light.echo_window_ms),
            ramp: light.ramp_seconds,
        })
    }
}

/// Three channel light presented as hue, saturation and brightness.
///
/// Edits are applied to the model immediately and written to the device as
/// one batch of channel commands once edits pause for `debounce`. Reports
/// arriving within `echo_window` of a write are not fed back into the model.
#[derive(Clone)]
pub struct RgbLight {
    inner: Arc<LightInner>,
}

struct LightInner {
    id: Uuid,
    config: LightConfig,
    bus: Arc<dyn CommandChannel>,
    store: Arc<dyn AccessoryStore>,
    runtime: Mutex<LightRuntime>,
}

struct LightRuntime {
    color: ColorState,
    /// Last levels written to or reported by the device
    levels: ChannelLevels,
    suppress_until: Option<Instant>,
    restoring: Option<Restoring>,
    flush: Option<JoinHandle<()>>,
}

/// Switched back on, waiting for the device to confirm the restored color
#[derive(Debug, Clone, Copy)]
struct Restoring {
    expected: Option<ChannelLevels>,
    until: Instant,
}

impl RgbLight {
    pub async fn new(
        id: Uuid,
        config: LightConfig,
        bus: Arc<dyn CommandChannel>,
        store: Arc<dyn AccessoryStore>,
    ) -> Self {
        let color = match store.load(&id).await {
            Ok(context) => context
                .and_then(|context| context.last_color)
                .map(ColorState::restored)
                .unwrap_or_default(),
            Err(e) => {
                tracing::error!("failed to restore {}: {}", config.name, e);
                ColorState::default()
            }
        };

        Self {
            inner: Arc::new(LightInner {
                id,
                config,
                bus,
                store,
                runtime: Mutex::new(LightRuntime {
                    color,
                    levels: ChannelLevels::OFF,
                    suppress_until: None,
                    restoring: None,
                    flush: None,
                }),
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    pub async fn color(&self) -> ColorState {
        self.inner.runtime.lock().await.color
    }

    pub async fn levels(&self) -> ChannelLevels {
        self.inner.runtime.lock().await.levels
    }

    pub async fn on(&self) -> bool {
        self.color().await.on
    }

    pub async fn hue(&self) -> u16 {
        self.color().await.hue
    }

    pub async fn saturation(&self) -> u8 {
        self.color().await.saturation
    }

    pub async fn brightness(&self) -> u8 {
        self.color().await.brightness
    }

    pub async fn set_on(&self, on: bool) {
        let mut runtime = self.inner.runtime.lock().await;
        let was_on = runtime.color.on;

        if on && !was_on {
            let mut last_color = runtime.color.last_color;
            if last_color.brightness == 0 {
                last_color.brightness = ColorSnapshot::default().brightness;
            }
            runtime.color = ColorState {
                on: true,
                ..ColorState::restored(last_color)
            };
            runtime.restoring = Some(Restoring {
                expected: None,
                until: Instant::now() + self.inner.config.debounce + self.inner.config.echo_window,
            });
        } else if !on && was_on {
            runtime.color.last_color = runtime.color.snapshot();
            runtime.color.on = false;
        }

        self.inner.schedule_flush(&mut runtime);
    }

    pub async fn set_hue(&self, hue: u16) {
        self.edit(|color| color.hue = hue.min(359)).await;
    }

    pub async fn set_saturation(&self, saturation: u8) {
        self.edit(|color| color.saturation = saturation.min(100)).await;
    }

    /// Zero brightness switches the light off, keeping the previous
    /// brightness as the restore point
    pub async fn set_brightness(&self, brightness: u8) {
        let brightness = brightness.min(100);
        if brightness > 0 {
            return self.edit(|color| color.brightness = brightness).await;
        }

        let mut runtime = self.inner.runtime.lock().await;
        let color = &mut runtime.color;
        if color.on {
            color.last_color = color.snapshot();
            color.on = false;
        }
        color.brightness = 0;

        self.inner.schedule_flush(&mut runtime);
    }

    /// Asks the device to report every channel level
    pub fn query_status(&self) {
        self.inner
            .bus
            .post(self.inner.config.address, Command::ReadChannelStatus);
    }

    /// Feeds the level streams of the three channels into the model
    pub fn attach(
        &self,
        mut red: broadcast::Receiver<u8>,
        mut green: broadcast::Receiver<u8>,
        mut blue: broadcast::Receiver<u8>,
    ) -> JoinHandle<()> {
        let this = Arc::downgrade(&self.inner);

        tokio::spawn(async move {
            loop {
                let (channel, received) = tokio::select! {
                    received = red.recv() => (Channel::Red, received),
                    received = green.recv() => (Channel::Green, received),
                    received = blue.recv() => (Channel::Blue, received),
                };

                match received {
                    Ok(level) => {
                        let Some(inner) = this.upgrade() else { break };
                        inner.on_channel_update(channel, level).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!("{:?} channel stream lagged, {} reports skipped", channel, skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    async fn edit(&self, apply: impl FnOnce(&mut ColorState)) {
        let mut runtime = self.inner.runtime.lock().await;
        let color = &mut runtime.color;

        apply(color);
        if color.on {
            color.last_color = color.snapshot();
        }

        self.inner.schedule_flush(&mut runtime);
    }
}

impl LightInner {
    fn schedule_flush(self: &Arc<Self>, runtime: &mut LightRuntime) {
        if let Some(flush) = runtime.flush.take() {
            flush.abort();
        }

        let this = Arc::downgrade(self);
        let debounce = self.config.debounce;

        runtime.flush = Some(tokio::spawn(async move {
            time::sleep(debounce).await;

            if let Some(inner) = this.upgrade() {
                inner.flush().await;
            }
        }));
    }

    async fn flush(&self) {
        let levels = {
            let mut runtime = self.runtime.lock().await;
            // Past this point the write is no longer cancelled by new edits
            runtime.flush = None;

            let levels = color::levels_for(&runtime.color);
            let now = Instant::now();

            runtime.suppress_until = Some(now + self.config.echo_window);
            if let Some(restoring) = runtime.restoring.as_mut() {
                restoring.expected = Some(levels);
                restoring.until = now + self.config.echo_window;
            }
            runtime.levels = levels;

            self.persist(&runtime.color).await;
            levels
        };

        tracing::debug!("writing {:?} to {}", levels, self.config.name);

        let writes = self.config.channels.iter().map(|(channel, number)| {
            let command = Command::SingleChannelControl {
                channel: number,
                level: levels.get(channel),
                ramp: self.config.ramp,
            };
            async move { (number, self.bus.send(self.config.address, command).await) }
        });

        for (number, result) in join_all(writes).await {
            if let Err(e) = result {
                tracing::error!(
                    "error setting channel {} for {}: {}",
                    number,
                    self.config.name,
                    e
                );
            }
        }
    }

    async fn on_channel_update(&self, channel: Channel, level: u8) {
        let mut runtime = self.runtime.lock().await;
        runtime.levels.set(channel, level);

        let now = Instant::now();

        if let Some(restoring) = runtime.restoring {
            if now < restoring.until {
                if restoring.expected == Some(runtime.levels) {
                    runtime.restoring = None;
                    tracing::debug!("{} confirmed restored color", self.config.name);
                }
                return;
            }
            runtime.restoring = None;
        }

        if runtime.suppress_until.is_some_and(|until| now < until) {
            return;
        }

        let (hue, saturation, brightness) = color::rgb_to_hsv(runtime.levels);
        let color = &mut runtime.color;

        color.on = brightness > 0;
        color.brightness = brightness;
        if color.on {
            color.hue = hue;
            color.saturation = saturation;
            color.last_color = color.snapshot();
        }

        tracing::debug!(
            "{} changed externally to {:?}",
            self.config.name,
            runtime.levels
        );

        self.persist(&runtime.color).await;
    }

    async fn persist(&self, color: &ColorState) {
        let context = AccessoryContext {
            last_color: Some(color.last_color),
            ..AccessoryContext::default()
        };

        if let Err(e) = self.store.save(&self.id, &context).await {
            tracing::error!("failed to persist {}: {}", self.config.name, e);
        }
    }
}
