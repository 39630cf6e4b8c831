use core::fmt;

/// Session authentication type carried in the IPMI v1.5 session header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AuthType {
    /// No authentication; the session header has no auth code field.
    None = 0x00,
    /// MD2 authentication.
    Md2 = 0x01,
    /// MD5 authentication.
    Md5 = 0x02,
    /// Straight (clear-text) password.
    Password = 0x04,
    /// OEM proprietary.
    Oem = 0x05,
}

impl AuthType {
    pub(crate) fn as_u8(self) -> u8 {
        self as u8
    }

    /// Parse the wire value, returning `None` for reserved codes.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::None),
            0x01 => Some(Self::Md2),
            0x02 => Some(Self::Md5),
            0x04 => Some(Self::Password),
            0x05 => Some(Self::Oem),
            _ => None,
        }
    }

    /// Whether a 16-byte auth code follows the session id in the session header.
    pub fn has_auth_code(self) -> bool {
        self != Self::None
    }
}

/// The privilege level requested for the IPMI session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PrivilegeLevel {
    /// Callback privilege.
    Callback = 0x01,
    /// User privilege.
    User = 0x02,
    /// Operator privilege.
    Operator = 0x03,
    /// Administrator privilege.
    Administrator = 0x04,
    /// OEM-defined privilege.
    Oem = 0x05,
}

impl PrivilegeLevel {
    pub(crate) fn as_u8(self) -> u8 {
        self as u8
    }

    /// Parse the low nibble of a privilege byte.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value & 0x0F {
            0x01 => Some(Self::Callback),
            0x02 => Some(Self::User),
            0x03 => Some(Self::Operator),
            0x04 => Some(Self::Administrator),
            0x05 => Some(Self::Oem),
            _ => None,
        }
    }
}

/// Chassis control operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChassisControl {
    /// Power down the system.
    PowerDown,
    /// Power up the system.
    PowerUp,
    /// Power cycle the system.
    PowerCycle,
    /// Hard reset the system.
    HardReset,
    /// Pulse diagnostic interrupt.
    PulseDiagnosticInterrupt,
    /// ACPI soft shutdown.
    SoftShutdown,
}

impl ChassisControl {
    pub(crate) fn as_u8(self) -> u8 {
        match self {
            Self::PowerDown => 0x00,
            Self::PowerUp => 0x01,
            Self::PowerCycle => 0x02,
            Self::HardReset => 0x03,
            Self::PulseDiagnosticInterrupt => 0x04,
            Self::SoftShutdown => 0x05,
        }
    }

    /// Parse a control byte (low nibble).
    pub fn from_u8(value: u8) -> Option<Self> {
        match value & 0x0F {
            0x00 => Some(Self::PowerDown),
            0x01 => Some(Self::PowerUp),
            0x02 => Some(Self::PowerCycle),
            0x03 => Some(Self::HardReset),
            0x04 => Some(Self::PulseDiagnosticInterrupt),
            0x05 => Some(Self::SoftShutdown),
            _ => None,
        }
    }
}

impl fmt::Display for ChassisControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PowerDown => "power down",
            Self::PowerUp => "power up",
            Self::PowerCycle => "power cycle",
            Self::HardReset => "hard reset",
            Self::PulseDiagnosticInterrupt => "pulse diagnostic interrupt",
            Self::SoftShutdown => "soft shutdown",
        };
        f.write_str(name)
    }
}
