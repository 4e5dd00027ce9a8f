use std::collections::HashMap;
use std::sync::Arc;

use buspro_api::{Command, DeviceAddress, Frame, StatusSource};
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;

use crate::services::event_bus::EventBus;

/// `(curtain, raw status)` entries carried by a curtain report
pub fn curtain_updates(command: &Command) -> Vec<(u8, u8)> {
    match command {
        Command::CurtainControlResponse { curtain, status }
        | Command::CurtainStatus { curtain, status } => vec![(*curtain, *status)],
        Command::CurtainBroadcast { curtains } => curtains.clone(),
        _ => Vec::new(),
    }
}

/// `(channel, level)` entries carried by a channel report
pub fn channel_updates(command: &Command) -> Vec<(u8, u8)> {
    match command {
        Command::SingleChannelControlResponse {
            channel,
            success: true,
            level,
        } => vec![(*channel, *level)],
        Command::ChannelStatus { levels } => levels
            .iter()
            .enumerate()
            .map(|(i, level)| (i as u8 + 1, *level))
            .collect(),
        _ => Vec::new(),
    }
}

/// Splits the reports of one physical device into per-unit streams
pub struct UnitListener {
    curtains: EventBus<u8, u8>,
    channels: EventBus<u8, u8>,
    task: JoinHandle<()>,
}

impl UnitListener {
    pub fn new(device: DeviceAddress, source: &dyn StatusSource) -> Self {
        let curtains = EventBus::new();
        let channels = EventBus::new();
        let task = tokio::spawn(Self::listen(
            device,
            source.subscribe(),
            curtains.clone(),
            channels.clone(),
        ));

        Self {
            curtains,
            channels,
            task,
        }
    }

    /// Raw status codes reported for one curtain
    pub async fn curtain(&self, curtain: u8) -> broadcast::Receiver<u8> {
        self.curtains.subscribe(curtain).await
    }

    /// Levels reported for one output channel
    pub async fn channel(&self, channel: u8) -> broadcast::Receiver<u8> {
        self.channels.subscribe(channel).await
    }

    async fn listen(
        device: DeviceAddress,
        mut frames: broadcast::Receiver<Frame>,
        curtains: EventBus<u8, u8>,
        channels: EventBus<u8, u8>,
    ) {
        loop {
            let frame = match frames.recv().await {
                Ok(frame) => frame,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("listener for {} lagged, {} frames skipped", device, skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };

            if frame.sender != device {
                continue;
            }

            let Some(command) = frame.command() else {
                tracing::warn!(
                    "discarding malformed {} report from {}: {:?}",
                    frame.opcode,
                    device,
                    frame.content
                );
                continue;
            };

            // Units nobody listens to are dropped
            for (curtain, status) in curtain_updates(&command) {
                let _ = curtains.publish(curtain, status).await;
            }
            for (channel, level) in channel_updates(&command) {
                let _ = channels.publish(channel, level).await;
            }
        }
    }
}

impl Drop for UnitListener {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// One listener per physical device, shared by every accessory on it
pub struct ListenerRegistry {
    source: Arc<dyn StatusSource>,
    listeners: Mutex<HashMap<DeviceAddress, Arc<UnitListener>>>,
}

impl ListenerRegistry {
    pub fn new(source: Arc<dyn StatusSource>) -> Self {
        Self {
            source,
            listeners: Mutex::new(HashMap::new()),
        }
    }

    pub async fn listener(&self, device: DeviceAddress) -> Arc<UnitListener> {
        let mut listeners = self.listeners.lock().await;
        listeners
            .entry(device)
            .or_insert_with(|| Arc::new(UnitListener::new(device, self.source.as_ref())))
            .clone()
    }

    pub async fn device_count(&self) -> usize {
        self.listeners.lock().await.len()
    }
}
