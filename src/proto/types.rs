//! Protocol enumerations shared by commands and events.
//!
//! Interface and status codes travel as raw integers on the wire. Decoding
//! never fails on an unknown value: interfaces come back as `None` (the
//! caller logs and drops), status codes come back as
//! [`StatusCode::Unknown`] so newer coprocessor firmware cannot crash an
//! older host.

use core::fmt;

use serde::{Deserialize, Serialize};

// ───────────────────────────────────────────────────────────────
// Interface
// ───────────────────────────────────────────────────────────────

/// Logical subsystem a command or event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Interface {
    WiFi = 0,
    Bluetooth = 1,
    Ethernet = 2,
    Cellular = 3,
    System = 4,
    Transport = 5,
}

impl Interface {
    /// Every interface, in wire-code order.
    pub const ALL: [Interface; 6] = [
        Interface::WiFi,
        Interface::Bluetooth,
        Interface::Ethernet,
        Interface::Cellular,
        Interface::System,
        Interface::Transport,
    ];

    pub const COUNT: usize = Self::ALL.len();

    pub const fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(raw: u8) -> Option<Self> {
        Self::ALL.get(raw as usize).copied()
    }

    /// Position of this interface in per-interface tables.
    pub(crate) const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::WiFi => "wifi",
            Self::Bluetooth => "bluetooth",
            Self::Ethernet => "ethernet",
            Self::Cellular => "cellular",
            Self::System => "system",
            Self::Transport => "transport",
        };
        f.write_str(name)
    }
}

// ───────────────────────────────────────────────────────────────
// Status codes
// ───────────────────────────────────────────────────────────────

/// Completion status reported by the coprocessor (or synthesised by the
/// host when the transport itself fails).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    CompletedOk,
    Failure,
    Timeout,
    AuthenticationFailed,
    AccessPointNotFound,
    ConnectionFailed,
    AlreadyStarted,
    CoprocessorNotResponding,
    UnmappedErrorCode,
    InvalidInterface,
    InvalidFunction,
    NotStarted,
    Busy,
    InvalidParameter,
    NoMemory,
    NotSupported,
    /// A code this host does not know about.
    Unknown(u32),
}

impl StatusCode {
    pub fn from_code(raw: u32) -> Self {
        match raw {
            0 => Self::CompletedOk,
            1 => Self::Failure,
            2 => Self::Timeout,
            3 => Self::AuthenticationFailed,
            4 => Self::AccessPointNotFound,
            5 => Self::ConnectionFailed,
            6 => Self::AlreadyStarted,
            7 => Self::CoprocessorNotResponding,
            8 => Self::UnmappedErrorCode,
            9 => Self::InvalidInterface,
            10 => Self::InvalidFunction,
            11 => Self::NotStarted,
            12 => Self::Busy,
            13 => Self::InvalidParameter,
            14 => Self::NoMemory,
            15 => Self::NotSupported,
            other => Self::Unknown(other),
        }
    }

    pub fn code(self) -> u32 {
        match self {
            Self::CompletedOk => 0,
            Self::Failure => 1,
            Self::Timeout => 2,
            Self::AuthenticationFailed => 3,
            Self::AccessPointNotFound => 4,
            Self::ConnectionFailed => 5,
            Self::AlreadyStarted => 6,
            Self::CoprocessorNotResponding => 7,
            Self::UnmappedErrorCode => 8,
            Self::InvalidInterface => 9,
            Self::InvalidFunction => 10,
            Self::NotStarted => 11,
            Self::Busy => 12,
            Self::InvalidParameter => 13,
            Self::NoMemory => 14,
            Self::NotSupported => 15,
            Self::Unknown(raw) => raw,
        }
    }

    pub fn is_ok(self) -> bool {
        self == Self::CompletedOk
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(raw) => write!(f, "unknown status {raw}"),
            other => write!(f, "{other:?}"),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Function codes
// ───────────────────────────────────────────────────────────────
//
// Function codes are scoped to an interface. Codes below 0x20 are host
// requests; codes from 0x20 upwards are events raised by the coprocessor.

/// WiFi interface functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum WifiFunction {
    Start = 0x01,
    Stop = 0x02,
    ConnectToAccessPoint = 0x03,
    DisconnectFromAccessPoint = 0x04,
    Scan = 0x05,
    GetAntenna = 0x06,
    SetAntenna = 0x07,
    GetMacAddress = 0x08,
    StartAccessPoint = 0x09,
    StopAccessPoint = 0x0A,

    InterfaceStarted = 0x20,
    InterfaceStopped = 0x21,
    ConnectedToAccessPoint = 0x22,
    DisconnectedFromAccessPoint = 0x23,
    AccessPointStarted = 0x24,
    AccessPointStopped = 0x25,
    StationConnected = 0x26,
    StationDisconnected = 0x27,
}

impl WifiFunction {
    pub fn from_code(raw: u32) -> Option<Self> {
        Some(match raw {
            0x01 => Self::Start,
            0x02 => Self::Stop,
            0x03 => Self::ConnectToAccessPoint,
            0x04 => Self::DisconnectFromAccessPoint,
            0x05 => Self::Scan,
            0x06 => Self::GetAntenna,
            0x07 => Self::SetAntenna,
            0x08 => Self::GetMacAddress,
            0x09 => Self::StartAccessPoint,
            0x0A => Self::StopAccessPoint,
            0x20 => Self::InterfaceStarted,
            0x21 => Self::InterfaceStopped,
            0x22 => Self::ConnectedToAccessPoint,
            0x23 => Self::DisconnectedFromAccessPoint,
            0x24 => Self::AccessPointStarted,
            0x25 => Self::AccessPointStopped,
            0x26 => Self::StationConnected,
            0x27 => Self::StationDisconnected,
            _ => return None,
        })
    }

    pub const fn code(self) -> u32 {
        self as u32
    }
}

/// Wired Ethernet interface functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum EthernetFunction {
    Start = 0x01,
    Stop = 0x02,
    GetMacAddress = 0x03,

    InterfaceStarted = 0x20,
    InterfaceStopped = 0x21,
    Connected = 0x22,
    Disconnected = 0x23,
}

impl EthernetFunction {
    pub fn from_code(raw: u32) -> Option<Self> {
        Some(match raw {
            0x01 => Self::Start,
            0x02 => Self::Stop,
            0x03 => Self::GetMacAddress,
            0x20 => Self::InterfaceStarted,
            0x21 => Self::InterfaceStopped,
            0x22 => Self::Connected,
            0x23 => Self::Disconnected,
            _ => return None,
        })
    }

    pub const fn code(self) -> u32 {
        self as u32
    }
}

/// System interface functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum SystemFunction {
    GetDeviceInformation = 0x01,
    Restart = 0x02,

    CoprocessorStarted = 0x20,
    ErrorReported = 0x21,
    /// Raised by the host itself when the event pump dies.
    PumpFailed = 0xFF,
}

impl SystemFunction {
    pub fn from_code(raw: u32) -> Option<Self> {
        Some(match raw {
            0x01 => Self::GetDeviceInformation,
            0x02 => Self::Restart,
            0x20 => Self::CoprocessorStarted,
            0x21 => Self::ErrorReported,
            0xFF => Self::PumpFailed,
            _ => return None,
        })
    }

    pub const fn code(self) -> u32 {
        self as u32
    }
}
