use core::net::Ipv4Addr;

use super::Ssid;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
    ConnectFailed,
}

impl ConnectionState {
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Disconnected => 0,
            Self::Connected => 1,
            Self::ConnectFailed => 2,
        }
    }

    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Disconnected),
            1 => Some(Self::Connected),
            2 => Some(Self::ConnectFailed),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connected => "connected",
            Self::ConnectFailed => "connect_failed",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanRecord {
    pub ssid: Ssid,
    pub rssi: i8,
}

/// Live association details as reported by the driver.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkInfo {
    pub ssid: Ssid,
    pub rssi: i8,
    pub bssid: [u8; 6],
    pub ip: Ipv4Addr,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected(LinkInfo),
    Disconnected,
}

impl ConnectionStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected(_))
    }
}
