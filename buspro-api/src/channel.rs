use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::address::DeviceAddress;
use crate::command::Command;
use crate::error::BusError;
use crate::frame::Frame;

/// Outbound side of the bus
#[async_trait]
pub trait CommandChannel: Send + Sync {
    /// Sends a command and waits for the target's reply frame.
    ///
    /// Fails with [`BusError::Rejected`] when the reply carries a failure flag.
    async fn send(&self, target: DeviceAddress, command: Command) -> Result<Frame, BusError>;

    /// Sends a command without waiting for any reply
    fn post(&self, target: DeviceAddress, command: Command);
}

/// Inbound side of the bus
pub trait StatusSource: Send + Sync {
    /// Every frame heard on the bus from now on, in delivery order
    fn subscribe(&self) -> broadcast::Receiver<Frame>;
}
