//! Wire protocol for the AM43 motor controller.
//!
//! This module contains the low-level protocol pieces:
//! - Command frame construction and CRC
//! - Command opcodes and move sentinels
//! - Reply validation and field decoding

pub mod command;
pub mod frame;
pub mod reply;

pub use command::{MoveDirection, Opcode, ReplyPrefix, NO_DATA};
pub use frame::{crc, encode as encode_frame, FRAME_PREAMBLE};
pub use reply::{decode_battery, decode_light, decode_position, verify_reply};
