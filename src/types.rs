//! Data types for discovered devices and shade state.

use std::fmt;

/// A device found during a discovery scan.
///
/// Descriptors are produced fresh on every scan and carry no live
/// connection state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    /// Transport-level identifier (MAC address on Linux/Windows).
    pub address: String,
    /// Raw name taken from the advertisement.
    pub advertised_name: String,
    /// Normalized display name (advertised name with whitespace trimmed).
    pub name: String,
    /// Signal strength at scan time, if reported by the backend.
    pub rssi: Option<i16>,
}

/// Identifies a device to connect to: a raw address or a descriptor from a
/// previous discovery scan.
#[derive(Debug, Clone)]
pub enum DeviceTarget {
    /// Raw transport address, e.g. `"AA:BB:CC:DD:EE:FF"`.
    Address(String),
    /// Previously discovered descriptor (also supplies the display name).
    Descriptor(DeviceDescriptor),
}

impl DeviceTarget {
    /// Returns the transport address for this target.
    #[must_use]
    pub fn address(&self) -> &str {
        match self {
            Self::Address(addr) => addr,
            Self::Descriptor(desc) => &desc.address,
        }
    }

    /// Returns the display name, if known.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Address(_) => None,
            Self::Descriptor(desc) => Some(&desc.name),
        }
    }
}

impl From<&str> for DeviceTarget {
    fn from(address: &str) -> Self {
        Self::Address(address.to_owned())
    }
}

impl From<String> for DeviceTarget {
    fn from(address: String) -> Self {
        Self::Address(address)
    }
}

impl From<DeviceDescriptor> for DeviceTarget {
    fn from(descriptor: DeviceDescriptor) -> Self {
        Self::Descriptor(descriptor)
    }
}

/// Snapshot of the shade state, rebuilt on every [`read_state`] call.
///
/// [`read_state`]: crate::device::Am43Device::read_state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Am43State {
    /// Battery level in percent (0-100).
    pub battery: u8,
    /// Raw ambient light sensor reading.
    pub light: u8,
    /// Shade position in percent (0 open, 100 closed), or `None` when the
    /// travel limits are not configured on the device.
    pub position: Option<u8>,
}

impl Am43State {
    /// Returns true if the shade is fully closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.position == Some(100)
    }

    /// Returns true if the shade is anything other than fully closed.
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.is_closed()
    }
}

impl fmt::Display for Am43State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.is_open() { "OPEN" } else { "CLOSED" };
        match self.position {
            Some(pos) => write!(
                f,
                "AM43 {state}, position: {pos}%, battery: {}%, luminosity: {}",
                self.battery, self.light
            ),
            None => write!(
                f,
                "AM43 {state}, position: unknown, battery: {}%, luminosity: {}",
                self.battery, self.light
            ),
        }
    }
}
