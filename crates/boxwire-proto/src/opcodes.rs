//! Message type codes carried in the frame header.

/// Identifies the payload type of a frame.
///
/// The payload itself carries no variant tag; the opcode is the only
/// discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    /// Client handshake
    Join = 0x01,
    /// Session settings (handshake ack or out-of-band push)
    Set = 0x02,
    /// Rendered widget tree plus optional edit
    Output = 0x03,
    /// User input values
    Input = 0x04,
    /// Context switch request or acknowledgement
    Switch = 0x05,
    /// Error report
    Error = 0x06,
}

impl Opcode {
    /// Every opcode, in wire order.
    pub const ALL: [Self; 6] =
        [Self::Join, Self::Set, Self::Output, Self::Input, Self::Switch, Self::Error];

    /// Raw opcode byte.
    #[must_use]
    pub const fn to_u8(self) -> u8 {
        self as u8
    }

    /// Parse a raw opcode byte. `None` if unrecognized.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Self::Join),
            0x02 => Some(Self::Set),
            0x03 => Some(Self::Output),
            0x04 => Some(Self::Input),
            0x05 => Some(Self::Switch),
            0x06 => Some(Self::Error),
            _ => None,
        }
    }

    /// Human-readable name, used in logs and error reports.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Join => "Join",
            Self::Set => "Set",
            Self::Output => "Output",
            Self::Input => "Input",
            Self::Switch => "Switch",
            Self::Error => "Error",
        }
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
