pub mod address;
pub mod channel;
pub mod command;
pub mod crc;
pub mod error;
pub mod frame;

pub use address::DeviceAddress;
pub use channel::{CommandChannel, StatusSource};
pub use command::{Command, OpCode};
pub use crc::{Crc16, crc16};
pub use error::{AddressError, BusError, FrameError};
pub use frame::Frame;

/// Default UDP port HDL gateways listen on
pub const DEFAULT_GATEWAY_PORT: u16 = 6000;

/// Device type this bridge announces in the frames it sends
pub const BRIDGE_DEVICE_TYPE: u16 = 0xFFFE;
