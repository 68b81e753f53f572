//! Command opcodes for the AM43 protocol.
//!
//! Each command frame carries a one-byte opcode selecting the operation,
//! followed by a length-prefixed payload. Read commands carry the fixed
//! [`NO_DATA`] payload; move commands carry a [`MoveDirection`] sentinel.

/// Command opcodes sent to the motor controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    /// Start or stop movement (payload: [`MoveDirection`]).
    Move = 0x0A,
    /// Move to an absolute position (payload: percentage 0-100).
    SetPosition = 0x0D,
    /// Request the current position.
    GetPosition = 0xA7,
    /// Request the battery level.
    GetBattery = 0xA2,
    /// Request the light sensor reading.
    GetLight = 0xAA,
    /// PIN login (defined by the firmware, unused by this library).
    Login = 0x17,
}

impl From<Opcode> for u8 {
    fn from(op: Opcode) -> Self {
        op as Self
    }
}

/// Payload sentinels for the [`Opcode::Move`] command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MoveDirection {
    /// Open the blind fully.
    Open = 0xDD,
    /// Close the blind fully.
    Close = 0xEE,
    /// Stop any movement in progress.
    Stop = 0xCC,
}

impl From<MoveDirection> for u8 {
    fn from(dir: MoveDirection) -> Self {
        dir as Self
    }
}

/// Fixed payload for read commands that carry no parameters.
pub const NO_DATA: [u8; 1] = [0x01];

/// Two-byte prefixes identifying status replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyPrefix {
    /// Battery status reply.
    Battery,
    /// Light sensor reply.
    Light,
    /// Position reply.
    Position,
}

impl ReplyPrefix {
    /// Returns the leading bytes a reply of this kind must start with.
    #[must_use]
    pub const fn bytes(self) -> [u8; 2] {
        match self {
            Self::Battery => [0x9A, 0xA2],
            Self::Light => [0x9A, 0xAA],
            Self::Position => [0x9A, 0xA7],
        }
    }
}
