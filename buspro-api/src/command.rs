use core::fmt;

/// Operation code carried in every bus frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OpCode(pub u16);

impl OpCode {
    pub const SINGLE_CHANNEL_CONTROL: Self = Self(0x0031);
    pub const SINGLE_CHANNEL_CONTROL_RESPONSE: Self = Self(0x0032);
    pub const READ_CHANNEL_STATUS: Self = Self(0x0033);
    pub const CHANNEL_STATUS: Self = Self(0x0034);
    pub const CURTAIN_CONTROL: Self = Self(0xE3E0);
    pub const CURTAIN_CONTROL_RESPONSE: Self = Self(0xE3E1);
    pub const READ_CURTAIN_STATUS: Self = Self(0xE3E2);
    pub const CURTAIN_STATUS: Self = Self(0xE3E3);
    pub const CURTAIN_BROADCAST: Self = Self(0xE3E4);

    /// Operation code the target device answers a request with
    pub const fn reply(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

impl From<u16> for OpCode {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

const SUCCESS: u8 = 0xF8;
const FAILURE: u8 = 0xF5;

/// Typed payload of a bus frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Set a relay/dimmer channel to a level 0-100 with a ramp time in seconds
    SingleChannelControl { channel: u8, level: u8, ramp: u16 },
    SingleChannelControlResponse { channel: u8, success: bool, level: u8 },
    ReadChannelStatus,
    /// Levels of channels 1..=n, in channel order
    ChannelStatus { levels: Vec<u8> },
    CurtainControl { curtain: u8, status: u8 },
    CurtainControlResponse { curtain: u8, status: u8 },
    ReadCurtainStatus { curtain: u8 },
    CurtainStatus { curtain: u8, status: u8 },
    /// `(curtain, status)` pairs reported in one broadcast
    CurtainBroadcast { curtains: Vec<(u8, u8)> },
    /// Any operation code this crate does not interpret
    Unknown { opcode: OpCode, content: Vec<u8> },
}

impl Command {
    pub fn opcode(&self) -> OpCode {
        match self {
            Self::SingleChannelControl { .. } => OpCode::SINGLE_CHANNEL_CONTROL,
            Self::SingleChannelControlResponse { .. } => OpCode::SINGLE_CHANNEL_CONTROL_RESPONSE,
            Self::ReadChannelStatus => OpCode::READ_CHANNEL_STATUS,
            Self::ChannelStatus { .. } => OpCode::CHANNEL_STATUS,
            Self::CurtainControl { .. } => OpCode::CURTAIN_CONTROL,
            Self::CurtainControlResponse { .. } => OpCode::CURTAIN_CONTROL_RESPONSE,
            Self::ReadCurtainStatus { .. } => OpCode::READ_CURTAIN_STATUS,
            Self::CurtainStatus { .. } => OpCode::CURTAIN_STATUS,
            Self::CurtainBroadcast { .. } => OpCode::CURTAIN_BROADCAST,
            Self::Unknown { opcode, .. } => *opcode,
        }
    }

    /// Operation code of the reply the target device is expected to send
    pub fn reply_opcode(&self) -> OpCode {
        self.opcode().reply()
    }

    pub fn encode_content(&self) -> Vec<u8> {
        match self {
            Self::SingleChannelControl {
                channel,
                level,
                ramp,
            } => {
                let ramp = ramp.to_be_bytes();
                vec![*channel, *level, ramp[0], ramp[1]]
            }
            Self::SingleChannelControlResponse {
                channel,
                success,
                level,
            } => vec![*channel, if *success { SUCCESS } else { FAILURE }, *level],
            Self::ReadChannelStatus => Vec::new(),
            Self::ChannelStatus { levels } => {
                let mut content = Vec::with_capacity(levels.len() + 1);
                content.push(levels.len() as u8);
                content.extend_from_slice(levels);
                content
            }
            Self::CurtainControl { curtain, status }
            | Self::CurtainControlResponse { curtain, status }
            | Self::CurtainStatus { curtain, status } => vec![*curtain, *status],
            Self::ReadCurtainStatus { curtain } => vec![*curtain],
            Self::CurtainBroadcast { curtains } => {
                let mut content = Vec::with_capacity(curtains.len() * 2 + 1);
                content.push(curtains.len() as u8);
                for (curtain, status) in curtains {
                    content.push(*curtain);
                    content.push(*status);
                }
                content
            }
            Self::Unknown { content, .. } => content.clone(),
        }
    }

    /// Interprets frame content for the given operation code.
    ///
    /// Returns `None` when a known single-entry payload is too short to carry
    /// its fields. Batched payloads keep every complete entry and drop the rest.
    pub fn decode(opcode: OpCode, content: &[u8]) -> Option<Self> {
        let command = match opcode {
            OpCode::SINGLE_CHANNEL_CONTROL => match content {
                [channel, level, rest @ ..] => {
                    let ramp = match rest {
                        [hi, lo, ..] => u16::from_be_bytes([*hi, *lo]),
                        _ => 0,
                    };
                    Self::SingleChannelControl {
                        channel: *channel,
                        level: *level,
                        ramp,
                    }
                }
                _ => return None,
            },
            OpCode::SINGLE_CHANNEL_CONTROL_RESPONSE => match content {
                [channel, flag, level, ..] => Self::SingleChannelControlResponse {
                    channel: *channel,
                    success: *flag == SUCCESS,
                    level: *level,
                },
                _ => return None,
            },
            OpCode::READ_CHANNEL_STATUS => Self::ReadChannelStatus,
            OpCode::CHANNEL_STATUS => {
                let (count, levels) = content.split_first()?;
                let count = (*count as usize).min(levels.len());
                Self::ChannelStatus {
                    levels: levels[..count].to_vec(),
                }
            }
            OpCode::CURTAIN_CONTROL => match content {
                [curtain, status, ..] => Self::CurtainControl {
                    curtain: *curtain,
                    status: *status,
                },
                _ => return None,
            },
            OpCode::CURTAIN_CONTROL_RESPONSE => match content {
                [curtain, status, ..] => Self::CurtainControlResponse {
                    curtain: *curtain,
                    status: *status,
                },
                _ => return None,
            },
            OpCode::READ_CURTAIN_STATUS => match content {
                [curtain, ..] => Self::ReadCurtainStatus { curtain: *curtain },
                _ => return None,
            },
            OpCode::CURTAIN_STATUS => match content {
                [curtain, status, ..] => Self::CurtainStatus {
                    curtain: *curtain,
                    status: *status,
                },
                _ => return None,
            },
            OpCode::CURTAIN_BROADCAST => {
                let (count, entries) = content.split_first()?;
                let curtains = entries
                    .chunks_exact(2)
                    .take(*count as usize)
                    .map(|pair| (pair[0], pair[1]))
                    .collect();
                Self::CurtainBroadcast { curtains }
            }
            opcode => Self::Unknown {
                opcode,
                content: content.to_vec(),
            },
        };

        Some(command)
    }

    /// Whether a reply reports that the device refused the request
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::SingleChannelControlResponse { success: false, .. }
        )
    }
}
