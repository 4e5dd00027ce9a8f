use core::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Datagram shorter than the smallest valid frame
    Truncated(usize),
    /// Missing `HDLMIRACLE` signature or leading code
    BadHeader,
    /// Length byte disagrees with the datagram size
    LengthMismatch { declared: usize, available: usize },
    /// Content does not fit in a single packet
    ContentTooLong(usize),
    /// CRC checksum validation failed
    CrcMismatch { expected: u16, actual: u16 },
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated(len) => write!(f, "Frame truncated: {} bytes", len),
            Self::BadHeader => write!(f, "Bad frame header"),
            Self::LengthMismatch {
                declared,
                available,
            } => write!(
                f,
                "Frame length mismatch: declared {}, available {}",
                declared, available
            ),
            Self::ContentTooLong(len) => write!(f, "Frame content too long: {} bytes", len),
            Self::CrcMismatch { expected, actual } => write!(
                f,
                "CRC checksum mismatch: expected {:#06x}, got {:#06x}",
                expected, actual
            ),
        }
    }
}

impl std::error::Error for FrameError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    /// No reply arrived for the given operation code
    Timeout { opcode: u16 },
    /// Device answered with a failure flag
    Rejected { opcode: u16 },
    /// Socket level failure
    Io(String),
    /// Bus connection has been shut down
    Closed,
    /// Outgoing frame could not be built
    Frame(FrameError),
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout { opcode } => write!(f, "No reply to {:#06x}", opcode),
            Self::Rejected { opcode } => write!(f, "Device rejected {:#06x}", opcode),
            Self::Io(e) => write!(f, "IO error: {}", e),
            Self::Closed => write!(f, "Bus closed"),
            Self::Frame(e) => write!(f, "Frame error: {}", e),
        }
    }
}

impl std::error::Error for BusError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Frame(e) => Some(e),
            _ => None,
        }
    }
}

impl From<FrameError> for BusError {
    fn from(err: FrameError) -> Self {
        Self::Frame(err)
    }
}

impl From<std::io::Error> for BusError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressError(pub String);

impl fmt::Display for AddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid device address '{}', expected <subnet>.<device>", self.0)
    }
}

impl std::error::Error for AddressError {}
