use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use buspro_api::{BusError, Command, CommandChannel, DeviceAddress, Frame, StatusSource};
use tokio::sync::broadcast;

/// In-process bus recording every command it is given.
///
/// With echo enabled, replies are also heard as device reports, the way a
/// gateway rebroadcasts them.
#[derive(Clone)]
pub struct MockBus {
    inner: Arc<MockBusInner>,
}

struct MockBusInner {
    sent: Mutex<Vec<(DeviceAddress, Command)>>,
    posted: Mutex<Vec<(DeviceAddress, Command)>>,
    failing: AtomicBool,
    echo: AtomicBool,
    frames: broadcast::Sender<Frame>,
}

impl MockBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MockBusInner {
                sent: Mutex::new(Vec::new()),
                posted: Mutex::new(Vec::new()),
                failing: AtomicBool::new(false),
                echo: AtomicBool::new(false),
                frames: broadcast::channel(100).0,
            }),
        }
    }

    pub fn with_echo(self) -> Self {
        self.set_echo(true);
        self
    }

    pub fn set_echo(&self, echo: bool) {
        self.inner.echo.store(echo, Ordering::SeqCst);
    }

    /// Makes every `send` fail with a timeout
    pub fn set_failing(&self, failing: bool) {
        self.inner.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<(DeviceAddress, Command)> {
        self.inner.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }

    pub fn posted(&self) -> Vec<(DeviceAddress, Command)> {
        self.inner
            .posted
            .lock()
            .map(|posted| posted.clone())
            .unwrap_or_default()
    }

    /// Sent and posted commands matching `predicate`
    pub fn count(&self, predicate: impl Fn(&Command) -> bool) -> usize {
        self.sent()
            .iter()
            .chain(self.posted().iter())
            .filter(|(_, command)| predicate(command))
            .count()
    }

    pub fn clear(&self) {
        if let Ok(mut sent) = self.inner.sent.lock() {
            sent.clear();
        }
        if let Ok(mut posted) = self.inner.posted.lock() {
            posted.clear();
        }
    }

    /// Simulates a report broadcast by `device`
    pub fn report(&self, device: DeviceAddress, command: Command) {
        let frame = Frame::new(device, 0, DeviceAddress::BROADCAST, &command);
        let _ = self.inner.frames.send(frame);
    }

    /// Report a device answers a control command with
    fn reply_to(command: &Command) -> Option<Command> {
        match command {
            Command::SingleChannelControl { channel, level, .. } => {
                Some(Command::SingleChannelControlResponse {
                    channel: *channel,
                    success: true,
                    level: *level,
                })
            }
            Command::CurtainControl { curtain, status } => Some(Command::CurtainControlResponse {
                curtain: *curtain,
                status: *status,
            }),
            _ => None,
        }
    }

    fn is_echoing(&self) -> bool {
        self.inner.echo.load(Ordering::SeqCst)
    }
}

impl Default for MockBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandChannel for MockBus {
    async fn send(&self, target: DeviceAddress, command: Command) -> Result<Frame, BusError> {
        if let Ok(mut sent) = self.inner.sent.lock() {
            sent.push((target, command.clone()));
        }

        if self.inner.failing.load(Ordering::SeqCst) {
            return Err(BusError::Timeout {
                opcode: command.opcode().0,
            });
        }

        let reply = match Self::reply_to(&command) {
            Some(reply) => {
                if self.is_echoing() {
                    self.report(target, reply.clone());
                }
                reply
            }
            None => Command::Unknown {
                opcode: command.reply_opcode(),
                content: Vec::new(),
            },
        };

        Ok(Frame::new(target, 0, DeviceAddress::BROADCAST, &reply))
    }

    fn post(&self, target: DeviceAddress, command: Command) {
        if let Ok(mut posted) = self.inner.posted.lock() {
            posted.push((target, command.clone()));
        }

        if self.is_echoing() && !self.inner.failing.load(Ordering::SeqCst) {
            if let Some(reply) = Self::reply_to(&command) {
                self.report(target, reply);
            }
        }
    }
}

impl StatusSource for MockBus {
    fn subscribe(&self) -> broadcast::Receiver<Frame> {
        self.inner.frames.subscribe()
    }
}
