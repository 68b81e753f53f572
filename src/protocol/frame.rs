//! Frame construction for the AM43 protocol.
//!
//! The wire format is:
//! ```text
//! ┌──────────────────┬──────────┬──────────┬─────────────┬──────────┐
//! │ 00 FF 00 00 9A   │  opcode  │  length  │   payload   │   crc    │
//! │    preamble      │  1 byte  │  1 byte  │ length bytes│  1 byte  │
//! └──────────────────┴──────────┴──────────┴─────────────┴──────────┘
//! ```
//!
//! The trailer is the running XOR of every preceding byte, XORed against
//! `0xFF`. The device firmware is the CRC authority: a frame with a wrong
//! trailer is silently rejected on the air, so the trailer must be
//! byte-exact.

use bytes::{BufMut, Bytes, BytesMut};

use crate::protocol::command::Opcode;

/// Fixed preamble opening every command frame.
pub const FRAME_PREAMBLE: [u8; 5] = [0x00, 0xFF, 0x00, 0x00, 0x9A];

/// Computes the CRC trailer over a frame body (preamble through payload).
#[must_use]
pub fn crc(body: &[u8]) -> u8 {
    body.iter().fold(0u8, |acc, b| acc ^ b) ^ 0xFF
}

/// Encodes a command frame: preamble, opcode, payload length, payload, CRC.
#[must_use]
pub fn encode(opcode: Opcode, payload: &[u8]) -> Bytes {
    debug_assert!(payload.len() <= u8::MAX as usize);

    let mut buf = BytesMut::with_capacity(FRAME_PREAMBLE.len() + 3 + payload.len());
    buf.put_slice(&FRAME_PREAMBLE);
    buf.put_u8(opcode.into());
    buf.put_u8(payload.len() as u8);
    buf.put_slice(payload);
    let trailer = crc(&buf);
    buf.put_u8(trailer);
    buf.freeze()
}
