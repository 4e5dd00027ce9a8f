use std::net::Ipv4Addr;

use crate::address::DeviceAddress;
use crate::command::{Command, OpCode};
use crate::crc::crc16;
use crate::error::FrameError;

const SIGNATURE: &[u8; 10] = b"HDLMIRACLE";
const LEADING_CODE: [u8; 2] = [0xAA, 0xAA];

/// One packet exchanged with the bus gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub sender: DeviceAddress,
    pub device_type: u16,
    pub opcode: OpCode,
    pub target: DeviceAddress,
    pub content: Vec<u8>,
}

impl Frame {
    /// Sender IP(4) + signature(10) + leading code(2)
    pub const HEADER_SIZE: usize = 16;
    /// Length byte, addressing, device type, opcode and CRC around the content
    pub const PACKET_OVERHEAD: usize = 11;
    pub const MAX_CONTENT: usize = u8::MAX as usize - Self::PACKET_OVERHEAD;

    pub fn new(
        sender: DeviceAddress,
        device_type: u16,
        target: DeviceAddress,
        command: &Command,
    ) -> Self {
        Self {
            sender,
            device_type,
            opcode: command.opcode(),
            target,
            content: command.encode_content(),
        }
    }

    /// Interprets the content according to the operation code
    pub fn command(&self) -> Option<Command> {
        Command::decode(self.opcode, &self.content)
    }

    /// Encodes the frame into a UDP datagram announcing `source_ip` as sender
    pub fn encode(&self, source_ip: Ipv4Addr) -> Result<Vec<u8>, FrameError> {
        if self.content.len() > Self::MAX_CONTENT {
            return Err(FrameError::ContentTooLong(self.content.len()));
        }

        let length = Self::PACKET_OVERHEAD + self.content.len();
        let mut buffer = Vec::with_capacity(Self::HEADER_SIZE + length);

        buffer.extend_from_slice(&source_ip.octets());
        buffer.extend_from_slice(SIGNATURE);
        buffer.extend_from_slice(&LEADING_CODE);

        let packet_start = buffer.len();
        buffer.push(length as u8);
        buffer.push(self.sender.subnet);
        buffer.push(self.sender.device);
        buffer.extend_from_slice(&self.device_type.to_be_bytes());
        buffer.extend_from_slice(&self.opcode.0.to_be_bytes());
        buffer.push(self.target.subnet);
        buffer.push(self.target.device);
        buffer.extend_from_slice(&self.content);

        let crc = crc16(&buffer[packet_start..]);
        buffer.extend_from_slice(&crc.to_be_bytes());

        Ok(buffer)
    }

    /// Decodes a UDP datagram, returns (sender_ip, frame)
    pub fn decode(data: &[u8]) -> Result<(Ipv4Addr, Self), FrameError> {
        if data.len() < Self::HEADER_SIZE + Self::PACKET_OVERHEAD {
            return Err(FrameError::Truncated(data.len()));
        }

        if &data[4..14] != SIGNATURE || data[14..16] != LEADING_CODE {
            return Err(FrameError::BadHeader);
        }

        let source_ip = Ipv4Addr::new(data[0], data[1], data[2], data[3]);
        let packet = &data[Self::HEADER_SIZE..];

        let declared = packet[0] as usize;
        if declared < Self::PACKET_OVERHEAD || declared > packet.len() {
            return Err(FrameError::LengthMismatch {
                declared,
                available: packet.len(),
            });
        }

        let packet = &packet[..declared];
        let (body, crc_bytes) = packet.split_at(declared - 2);
        let expected = u16::from_be_bytes([crc_bytes[0], crc_bytes[1]]);
        let actual = crc16(body);
        if expected != actual {
            return Err(FrameError::CrcMismatch { expected, actual });
        }

        let frame = Self {
            sender: DeviceAddress::new(body[1], body[2]),
            device_type: u16::from_be_bytes([body[3], body[4]]),
            opcode: OpCode(u16::from_be_bytes([body[5], body[6]])),
            target: DeviceAddress::new(body[7], body[8]),
            content: body[9..].to_vec(),
        };

        Ok((source_ip, frame))
    }
}
