//! High-level AM43 device API.
//!
//! [`Am43Device`] layers the AM43 wire protocol over a [`GattLink`]: domain
//! operations become command frames going out and decoded status fields
//! coming back. The AM43-specific wiring (control characteristic, write
//! mode) is injected into the link at construction.

use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use uuid::{Uuid, uuid};

use crate::error::{Error, Result};
use crate::link::{GattLink, LinkConfig};
use crate::protocol::{self, MoveDirection, NO_DATA, Opcode};
use crate::transport::GattTransport;
use crate::types::Am43State;

/// GATT service exposing the motor control characteristic.
pub const CONTROL_SERVICE: Uuid = uuid!("0000fe50-0000-1000-8000-00805f9b34fb");

/// Characteristic used both for command writes and reply notifications.
pub const CONTROL_CHARACTERISTIC: Uuid = uuid!("0000fe51-0000-1000-8000-00805f9b34fb");

/// Default transport connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Client for one AM43 motor controller.
pub struct Am43Device<T> {
    link: GattLink<T>,
    name: Option<String>,
}

impl<T: GattTransport> fmt::Debug for Am43Device<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Am43Device")
            .field("address", &self.link.address())
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<T: GattTransport> Am43Device<T> {
    /// Creates a device over a (not yet connected) transport.
    #[must_use]
    pub fn new(transport: T) -> Self {
        let config = LinkConfig::new(CONTROL_CHARACTERISTIC, CONTROL_CHARACTERISTIC);
        Self {
            link: GattLink::new(transport, config),
            name: None,
        }
    }

    /// Attaches a display name, usually taken from a discovery descriptor.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Returns the transport address.
    #[must_use]
    pub fn address(&self) -> &str {
        self.link.address()
    }

    /// Returns the display name, if known.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Connects and subscribes for reply notifications.
    pub async fn connect(&self, timeout: Duration) -> Result<()> {
        self.link.connect(timeout).await
    }

    /// Disconnects. A no-op unless currently connected.
    pub async fn disconnect(&self) -> Result<()> {
        self.link.disconnect().await
    }

    /// Returns true if connected, re-verified against the transport.
    pub async fn is_connected(&self) -> bool {
        self.link.is_connected().await
    }

    /// Enumerates the GATT services the device exposes.
    pub async fn services(&self) -> Result<Vec<Uuid>> {
        self.link.services().await
    }

    async fn command(
        &self,
        opcode: Opcode,
        payload: &[u8],
        expect_reply: bool,
    ) -> Result<Option<Bytes>> {
        let frame = protocol::encode_frame(opcode, payload);
        self.link.send_command(frame, expect_reply).await
    }

    async fn request(&self, opcode: Opcode) -> Result<Bytes> {
        self.command(opcode, &NO_DATA, true)
            .await?
            .ok_or_else(|| Error::Protocol {
                message: "expected a reply".into(),
            })
    }

    /// Opens the blind fully.
    pub async fn open(&self) -> Result<()> {
        self.command(Opcode::Move, &[MoveDirection::Open.into()], false)
            .await?;
        Ok(())
    }

    /// Closes the blind fully.
    pub async fn close(&self) -> Result<()> {
        self.command(Opcode::Move, &[MoveDirection::Close.into()], false)
            .await?;
        Ok(())
    }

    /// Stops any movement in progress.
    pub async fn stop(&self) -> Result<()> {
        self.command(Opcode::Move, &[MoveDirection::Stop.into()], false)
            .await?;
        Ok(())
    }

    /// Moves the blind to an absolute position, in percent (0 open, 100
    /// closed). Fails validation before any transport I/O when out of range.
    pub async fn set_position(&self, position: u8) -> Result<()> {
        if position > 100 {
            return Err(Error::InvalidPosition(position));
        }
        self.command(Opcode::SetPosition, &[position], false).await?;
        Ok(())
    }

    /// Reads the battery level in percent.
    pub async fn read_battery(&self) -> Result<u8> {
        let reply = self.request(Opcode::GetBattery).await?;
        protocol::decode_battery(&reply)
    }

    /// Reads the raw ambient light sensor value.
    pub async fn read_light(&self) -> Result<u8> {
        let reply = self.request(Opcode::GetLight).await?;
        protocol::decode_light(&reply)
    }

    /// Reads the current position in percent. `None` means the travel
    /// limits are not configured, so the device cannot report a position.
    pub async fn read_position(&self) -> Result<Option<u8>> {
        let reply = self.request(Opcode::GetPosition).await?;
        protocol::decode_position(&reply)
    }

    /// Reads battery, light and position in three round-trips and returns
    /// one state snapshot. Any failing round-trip fails the whole read; no
    /// partial state is returned.
    pub async fn read_state(&self) -> Result<Am43State> {
        Ok(Am43State {
            battery: self.read_battery().await?,
            light: self.read_light().await?,
            position: self.read_position().await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::transport::mock::{MockState, MockTransport};

    const ADDRESS: &str = "AA:BB:CC:DD:EE:FF";

    async fn connected_device() -> (Am43Device<MockTransport>, Arc<Mutex<MockState>>) {
        let (transport, state) = MockTransport::new(ADDRESS);
        let device = Am43Device::new(transport);
        device.connect(DEFAULT_CONNECT_TIMEOUT).await.unwrap();
        (device, state)
    }

    fn can_reply(state: &Arc<Mutex<MockState>>, opcode: u8, reply: &[u8]) {
        state
            .lock()
            .unwrap()
            .replies
            .insert(opcode, vec![reply.to_vec()]);
    }

    #[tokio::test]
    async fn test_read_state_end_to_end() {
        let (device, state) = connected_device().await;
        can_reply(&state, 0xA2, &[0x9A, 0xA2, 0, 0, 0, 0, 0, 0x57]);
        can_reply(&state, 0xAA, &[0x9A, 0xAA, 0, 0, 0x03]);
        can_reply(&state, 0xA7, &[0x9A, 0xA7, 0, 0, 0, 0x2A]);

        let shade = device.read_state().await.unwrap();
        assert_eq!(
            shade,
            Am43State {
                battery: 87,
                light: 3,
                position: Some(42),
            }
        );
    }

    #[tokio::test]
    async fn test_read_state_fails_as_a_whole() {
        let (device, state) = connected_device().await;
        can_reply(&state, 0xA2, &[0x9A, 0xA2, 0, 0, 0, 0, 0, 0x57]);
        // Light replies with the wrong prefix; the whole read must fail.
        can_reply(&state, 0xAA, &[0x9A, 0xA2, 0, 0, 0x03]);
        assert!(device.read_state().await.is_err());
    }

    #[tokio::test]
    async fn test_read_position_sentinel() {
        let (device, state) = connected_device().await;
        can_reply(&state, 0xA7, &[0x9A, 0xA7, 0, 0, 0, 0xFF]);
        assert_eq!(device.read_position().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_position_rejects_out_of_range_without_io() {
        let (device, state) = connected_device().await;
        let err = device.set_position(150).await.unwrap_err();
        assert!(matches!(err, Error::InvalidPosition(150)));
        assert!(state.lock().unwrap().writes.is_empty());
    }

    #[tokio::test]
    async fn test_set_position_frame_bytes() {
        let (device, state) = connected_device().await;
        device.set_position(20).await.unwrap();

        let writes = state.lock().unwrap().writes.clone();
        assert_eq!(writes.len(), 1);
        let (char_id, frame) = &writes[0];
        assert_eq!(*char_id, CONTROL_CHARACTERISTIC);
        assert_eq!(frame, &[0x00, 0xFF, 0x00, 0x00, 0x9A, 0x0D, 0x01, 0x14, 0x82]);
    }

    #[tokio::test]
    async fn test_move_commands_write_sentinels() {
        let (device, state) = connected_device().await;
        device.open().await.unwrap();
        device.close().await.unwrap();
        device.stop().await.unwrap();

        let writes = state.lock().unwrap().writes.clone();
        let payloads: Vec<u8> = writes.iter().map(|(_, frame)| frame[7]).collect();
        assert_eq!(payloads, vec![0xDD, 0xEE, 0xCC]);
        for (_, frame) in &writes {
            assert_eq!(frame[5], 0x0A);
        }
    }

    #[tokio::test]
    async fn test_commands_require_connection() {
        let (transport, _state) = MockTransport::new(ADDRESS);
        let device = Am43Device::new(transport);
        assert!(matches!(
            device.read_battery().await.unwrap_err(),
            Error::NotConnected
        ));
        assert!(matches!(device.open().await.unwrap_err(), Error::NotConnected));
    }
}
