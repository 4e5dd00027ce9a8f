use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use buspro_api::{
    BRIDGE_DEVICE_TYPE, BusError, Command, CommandChannel, DeviceAddress, Frame, OpCode,
    StatusSource,
};
use tokio::net::{UdpSocket, lookup_host};
use tokio::sync::{broadcast, oneshot};

use crate::configs::settings::Gateway;

const MAX_DATAGRAM: usize = 512;

type PendingReplies = HashMap<(DeviceAddress, OpCode), Vec<oneshot::Sender<Frame>>>;

/// UDP link to a bus gateway.
///
/// Every datagram heard is decoded once, handed to the request waiting for it
/// (if any) and rebroadcast to all status subscribers.
#[derive(Clone)]
pub struct UdpGateway {
    inner: Arc<GatewayInner>,
}

struct GatewayInner {
    socket: UdpSocket,
    gateway: SocketAddr,
    local_ip: Ipv4Addr,
    controller: DeviceAddress,
    reply_timeout: Duration,
    pending: Mutex<PendingReplies>,
    frames: broadcast::Sender<Frame>,
}

impl UdpGateway {
    pub async fn connect(settings: &Gateway) -> Result<Self, BusError> {
        let socket = UdpSocket::bind(&settings.bind).await?;
        socket.set_broadcast(true)?;

        let gateway = lookup_host((settings.host.as_str(), settings.port))
            .await?
            .find(SocketAddr::is_ipv4)
            .ok_or_else(|| BusError::Io(format!("cannot resolve gateway {}", settings.host)))?;

        let local_ip = match socket.local_addr()?.ip() {
            IpAddr::V4(ip) => ip,
            IpAddr::V6(_) => Ipv4Addr::UNSPECIFIED,
        };

        tracing::info!("bus gateway {} via {}", gateway, socket.local_addr()?);

        Ok(Self {
            inner: Arc::new(GatewayInner {
                socket,
                gateway,
                local_ip,
                controller: settings.controller(),
                reply_timeout: Duration::from_millis(settings.reply_timeout_ms),
                pending: Mutex::new(HashMap::new()),
                frames: broadcast::channel(100).0,
            }),
        })
    }

    /// Starts receiving datagrams, returns the sender that stops it.
    ///
    /// Dropping the sender leaves the receiver running.
    pub fn start(&self) -> oneshot::Sender<()> {
        let (stop_tx, mut stop_rx) = oneshot::channel();
        let inner = self.inner.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; MAX_DATAGRAM];
            let mut stoppable = true;

            loop {
                tokio::select! {
                    stop = &mut stop_rx, if stoppable => {
                        if stop.is_ok() {
                            tracing::info!("bus gateway shutting down");
                            break;
                        }
                        stoppable = false;
                    },
                    received = inner.socket.recv_from(&mut buffer) => {
                        match received {
                            Ok((len, peer)) => inner.dispatch(&buffer[..len], peer),
                            Err(e) => tracing::warn!("failed to receive from bus: {}", e),
                        }
                    }
                }
            }
        });

        stop_tx
    }

    async fn transmit(&self, target: DeviceAddress, command: &Command) -> Result<(), BusError> {
        let inner = &self.inner;
        let frame = Frame::new(inner.controller, BRIDGE_DEVICE_TYPE, target, command);
        let datagram = frame.encode(inner.local_ip)?;

        inner.socket.send_to(&datagram, inner.gateway).await?;

        Ok(())
    }
}

impl GatewayInner {
    fn dispatch(&self, datagram: &[u8], peer: SocketAddr) {
        let frame = match Frame::decode(datagram) {
            Ok((_, frame)) => frame,
            Err(e) => {
                tracing::debug!("dropping datagram from {}: {}", peer, e);
                return;
            }
        };

        // Our own broadcasts come back through the gateway
        if frame.sender == self.controller {
            return;
        }

        if let Ok(mut pending) = self.pending.lock() {
            if let Some(waiters) = pending.remove(&(frame.sender, frame.opcode)) {
                for waiter in waiters {
                    let _ = waiter.send(frame.clone());
                }
            }
        }

        let _ = self.frames.send(frame);
    }

    fn register(&self, key: (DeviceAddress, OpCode)) -> oneshot::Receiver<Frame> {
        let (tx, rx) = oneshot::channel();
        if let Ok(mut pending) = self.pending.lock() {
            pending.entry(key).or_default().push(tx);
        }
        rx
    }

    fn forget_abandoned(&self, key: &(DeviceAddress, OpCode)) {
        if let Ok(mut pending) = self.pending.lock() {
            if let Some(waiters) = pending.get_mut(key) {
                waiters.retain(|waiter| !waiter.is_closed());
                if waiters.is_empty() {
                    pending.remove(key);
                }
            }
        }
    }
}

#[async_trait]
impl CommandChannel for UdpGateway {
    async fn send(&self, target: DeviceAddress, command: Command) -> Result<Frame, BusError> {
        let opcode = command.opcode();
        let key = (target, command.reply_opcode());
        let reply = self.inner.register(key);

        if let Err(e) = self.transmit(target, &command).await {
            drop(reply);
            self.inner.forget_abandoned(&key);
            return Err(e);
        }

        let result = tokio::time::timeout(self.inner.reply_timeout, reply).await;

        match result {
            Ok(Ok(frame)) => match frame.command() {
                Some(reply) if reply.is_rejection() => Err(BusError::Rejected { opcode: opcode.0 }),
                _ => Ok(frame),
            },
            Ok(Err(_)) => Err(BusError::Closed),
            Err(_) => {
                self.inner.forget_abandoned(&key);
                Err(BusError::Timeout { opcode: opcode.0 })
            }
        }
    }

    fn post(&self, target: DeviceAddress, command: Command) {
        let gateway = self.clone();

        tokio::spawn(async move {
            if let Err(e) = gateway.transmit(target, &command).await {
                tracing::warn!("failed to post {} to {}: {}", command.opcode(), target, e);
            }
        });
    }
}

impl StatusSource for UdpGateway {
    fn subscribe(&self) -> broadcast::Receiver<Frame> {
        self.inner.frames.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(bind: &str, port: u16) -> Gateway {
        Gateway {
            host: "127.0.0.1".into(),
            port,
            bind: bind.into(),
            subnet: 1,
            device_id: 254,
            reply_timeout_ms: 200,
        }
    }

    #[tokio::test]
    async fn test_send_resolves_reply() {
        let device = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let device_port = device.local_addr().unwrap().port();

        let gateway = UdpGateway::connect(&settings("127.0.0.1:0", device_port))
            .await
            .unwrap();
        let _stop = gateway.start();
        let mut frames = gateway.subscribe();

        tokio::spawn(async move {
            let mut buffer = [0u8; MAX_DATAGRAM];
            let (len, peer) = device.recv_from(&mut buffer).await.unwrap();
            let (_, request) = Frame::decode(&buffer[..len]).unwrap();

            let reply = Frame::new(
                request.target,
                0x0001,
                request.sender,
                &Command::CurtainControlResponse {
                    curtain: 1,
                    status: 1,
                },
            );
            let datagram = reply.encode(Ipv4Addr::LOCALHOST).unwrap();
            device.send_to(&datagram, peer).await.unwrap();
        });

        let reply = gateway
            .send(
                DeviceAddress::new(1, 20),
                Command::CurtainControl {
                    curtain: 1,
                    status: 1,
                },
            )
            .await
            .unwrap();

        assert_eq!(reply.sender, DeviceAddress::new(1, 20));
        assert_eq!(reply.opcode, OpCode::CURTAIN_CONTROL_RESPONSE);

        let heard = frames.recv().await.unwrap();
        assert_eq!(heard, reply);
    }

    #[tokio::test]
    async fn test_send_times_out() {
        let device = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let device_port = device.local_addr().unwrap().port();

        let gateway = UdpGateway::connect(&settings("127.0.0.1:0", device_port))
            .await
            .unwrap();
        let _stop = gateway.start();

        let result = gateway
            .send(DeviceAddress::new(1, 20), Command::ReadChannelStatus)
            .await;

        assert_eq!(result, Err(BusError::Timeout { opcode: 0x0033 }));
        assert!(gateway.inner.pending.lock().unwrap().is_empty());
    }
}
