//! Reply validation and field decoding for the AM43 protocol.
//!
//! Status replies arrive as GATT notifications. Field extraction is
//! positional and command-specific; the length checks here double as the
//! completeness check for replies delivered across multiple notification
//! fragments.

use crate::error::{Error, Result};
use crate::protocol::command::ReplyPrefix;

/// Byte offset of the percentage in a battery reply.
const BATTERY_OFFSET: usize = 7;

/// Byte offset of the raw sensor value in a light reply.
const LIGHT_OFFSET: usize = 4;

/// Byte offset of the percentage in a position reply.
///
/// The position packet also carries configuration flags (byte 3), the speed
/// setting (byte 4), shade length (bytes 6-7), roller diameter (byte 8) and
/// roller type (byte 9), none of which this library exposes.
const POSITION_OFFSET: usize = 5;

/// Sentinel meaning the travel limits are not configured, so the device
/// cannot report a position.
const POSITION_UNKNOWN: u8 = 255;

/// Verifies that a reply starts with the prefix expected for the
/// outstanding command.
pub fn verify_reply(expected: ReplyPrefix, reply: &[u8]) -> Result<()> {
    let prefix = expected.bytes();
    if reply.len() >= prefix.len() && reply[..prefix.len()] == prefix {
        Ok(())
    } else {
        Err(Error::UnexpectedReply {
            expected: prefix,
            received: reply.iter().copied().take(prefix.len()).collect(),
        })
    }
}

fn field_at(reply: &[u8], offset: usize, what: &str) -> Result<u8> {
    reply.get(offset).copied().ok_or_else(|| Error::Protocol {
        message: format!(
            "{what} reply too short: need at least {} bytes, got {}",
            offset + 1,
            reply.len()
        ),
    })
}

/// Decodes a battery reply into a percentage (0-100).
pub fn decode_battery(reply: &[u8]) -> Result<u8> {
    verify_reply(ReplyPrefix::Battery, reply)?;
    field_at(reply, BATTERY_OFFSET, "battery")
}

/// Decodes a light reply into the raw sensor reading.
pub fn decode_light(reply: &[u8]) -> Result<u8> {
    verify_reply(ReplyPrefix::Light, reply)?;
    field_at(reply, LIGHT_OFFSET, "light")
}

/// Decodes a position reply into a percentage.
///
/// Returns `None` when the device reports the limits-not-configured
/// sentinel. Values between 101 and 254 are undefined by the protocol and
/// are rejected as a protocol error rather than surfaced as a percentage.
pub fn decode_position(reply: &[u8]) -> Result<Option<u8>> {
    verify_reply(ReplyPrefix::Position, reply)?;
    match field_at(reply, POSITION_OFFSET, "position")? {
        POSITION_UNKNOWN => Ok(None),
        pos @ 0..=100 => Ok(Some(pos)),
        pos => Err(Error::Protocol {
            message: format!("position value {pos} outside the 0-100 range"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_reply_accepts_exact_prefix() {
        assert!(verify_reply(ReplyPrefix::Battery, &[0x9A, 0xA2, 0x00]).is_ok());
    }

    #[test]
    fn test_verify_reply_rejects_with_both_values() {
        let err = verify_reply(ReplyPrefix::Battery, &[0x9A, 0xAA, 0x00]).unwrap_err();
        match err {
            Error::UnexpectedReply { expected, received } => {
                assert_eq!(expected, [0x9A, 0xA2]);
                assert_eq!(received, vec![0x9A, 0xAA]);
            }
            other => panic!("expected UnexpectedReply, got {other:?}"),
        }
    }

    #[test]
    fn test_verify_reply_rejects_truncated() {
        assert!(verify_reply(ReplyPrefix::Position, &[0x9A]).is_err());
        assert!(verify_reply(ReplyPrefix::Position, &[]).is_err());
    }

    #[test]
    fn test_decode_battery() {
        let reply = [0x9A, 0xA2, 0x00, 0x00, 0x00, 0x00, 0x00, 0x57];
        assert_eq!(decode_battery(&reply).unwrap(), 87);
    }

    #[test]
    fn test_decode_battery_too_short() {
        let err = decode_battery(&[0x9A, 0xA2, 0x00]).unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));
    }

    #[test]
    fn test_decode_light() {
        let reply = [0x9A, 0xAA, 0x00, 0x00, 0x03];
        assert_eq!(decode_light(&reply).unwrap(), 3);
    }

    #[test]
    fn test_decode_position() {
        let reply = [0x9A, 0xA7, 0x00, 0x00, 0x00, 0x2A];
        assert_eq!(decode_position(&reply).unwrap(), Some(42));
    }

    #[test]
    fn test_decode_position_limits_not_set() {
        let reply = [0x9A, 0xA7, 0x00, 0x00, 0x00, 0xFF];
        assert_eq!(decode_position(&reply).unwrap(), None);
    }

    #[test]
    fn test_decode_position_bounds() {
        let reply = [0x9A, 0xA7, 0x00, 0x00, 0x00, 0x00];
        assert_eq!(decode_position(&reply).unwrap(), Some(0));

        let reply = [0x9A, 0xA7, 0x00, 0x00, 0x00, 0x64];
        assert_eq!(decode_position(&reply).unwrap(), Some(100));
    }

    #[test]
    fn test_decode_position_anomaly_rejected() {
        let reply = [0x9A, 0xA7, 0x00, 0x00, 0x00, 0x65];
        assert!(matches!(
            decode_position(&reply),
            Err(Error::Protocol { .. })
        ));
    }
}
