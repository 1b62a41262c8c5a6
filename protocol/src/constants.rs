//! Protocol constants and packet type definitions

/// Protocol version byte used by the binary UDP protocol.
pub const GROWL_PROTOCOL_VERSION: u8 = 1;

/// UDP port the binary protocol listens on.
pub const UDP_PORT: u16 = 9887;

/// TCP port the GNTP protocol listens on.
pub const GNTP_PORT: u16 = 23053;

/// GNTP protocol version carried in every info line.
pub const GNTP_VERSION: &str = "1.0";

/// Frame terminator for GNTP requests and responses.
pub const FRAME_TERMINATOR: &[u8] = b"\r\n\r\n\r\n";

/// Packet types for the binary UDP protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketType {
    /// Registers the application and its notification types
    Registration = 0,

    /// Requests display of one notification
    Notification = 1,
}

impl PacketType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(PacketType::Registration),
            1 => Some(PacketType::Notification),
            _ => None,
        }
    }

    pub fn to_u8(self) -> u8 {
        self as u8
    }
}
