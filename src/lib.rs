//! # am43
//!
//! A Rust client library for AM43-family motorized blind/shade controllers
//! over Bluetooth Low Energy.
//!
//! ## Features
//!
//! - Async/await based API using Tokio
//! - Discovery scan with name-prefix filtering and a per-address device
//!   registry with connect retries
//! - Byte-exact AM43 wire protocol (XOR CRC framing, positional replies)
//! - Transport abstraction with a btleplug backend
//!
//! ## Quick Start
//!
//! ```no_run
//! use am43::{BtleplugAdapter, ConnectOptions, DeviceRegistry};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), am43::Error> {
//!     let adapter = BtleplugAdapter::new().await?;
//!     let registry = DeviceRegistry::new(adapter);
//!
//!     // Find advertising blinds
//!     for blind in registry.discover().await? {
//!         println!("{} ({})", blind.name, blind.address);
//!     }
//!
//!     // Connect and read the current state
//!     let blind = registry
//!         .connect("AA:BB:CC:DD:EE:FF", ConnectOptions::default())
//!         .await?;
//!     let state = blind.read_state().await?;
//!     println!("battery {}%, position {:?}", state.battery, state.position);
//!
//!     // Move to half-open
//!     blind.set_position(50).await?;
//!
//!     registry.disconnect_all().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`protocol`] - AM43 wire protocol (frames, CRC, opcodes, reply decoding)
//! - [`transport`] - Transport capability traits and the btleplug backend
//! - [`link`] - Connection lifecycle and command/response correlation
//! - [`device`] - High-level [`Am43Device`] operations
//! - [`registry`] - Discovery and the per-address [`DeviceRegistry`]
//! - [`types`] - Data structures (descriptors, shade state)

pub mod device;
pub mod error;
pub mod link;
pub mod protocol;
pub mod registry;
pub mod transport;
pub mod types;

// Re-exports for convenience
pub use device::{Am43Device, CONTROL_CHARACTERISTIC, CONTROL_SERVICE};
pub use error::{Error, Result};
pub use link::{GattLink, LinkConfig};
pub use protocol::{MoveDirection, Opcode, ReplyPrefix};
pub use registry::{ConnectOptions, DeviceRegistry, DiscoveryConfig, RetryPolicy};
pub use transport::{
    Advertisement, BleAdapter, BtleplugAdapter, BtleplugTransport, GattTransport,
};
pub use types::{Am43State, DeviceDescriptor, DeviceTarget};
