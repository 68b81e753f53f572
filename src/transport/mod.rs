//! Transport layer for BLE communication.
//!
//! This module defines the capability traits the rest of the library is
//! written against: [`GattTransport`] for a single peripheral session and
//! [`BleAdapter`] for scanning and opening sessions. A btleplug-backed
//! implementation is provided in [`btleplug`].

pub mod btleplug;
#[cfg(test)]
pub(crate) mod mock;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::Result;

/// Boxed future returned by the transport trait methods.
pub type TransportFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Trait for a GATT session with one peripheral.
///
/// Notifications are delivered as raw characteristic payloads through the
/// channel registered via [`subscribe_notifications`]; the transport never
/// parses them.
///
/// [`subscribe_notifications`]: GattTransport::subscribe_notifications
pub trait GattTransport: Send + Sync {
    /// Connects to the peripheral, bounding the attempt by `timeout`.
    fn connect(&mut self, timeout: Duration) -> TransportFuture<'_, ()>;

    /// Disconnects from the peripheral.
    fn disconnect(&mut self) -> TransportFuture<'_, ()>;

    /// Re-verifies the connection against the backend.
    fn is_connected(&self) -> TransportFuture<'_, bool>;

    /// Writes bytes to a characteristic.
    fn write_characteristic(
        &mut self,
        id: Uuid,
        data: Bytes,
        with_response: bool,
    ) -> TransportFuture<'_, ()>;

    /// Writes bytes to a descriptor.
    fn write_descriptor(&mut self, id: Uuid, data: Bytes) -> TransportFuture<'_, ()>;

    /// Reads the current value of a characteristic.
    fn read_characteristic(&mut self, id: Uuid) -> TransportFuture<'_, Bytes>;

    /// Subscribes to notifications on a characteristic, delivering each
    /// notification payload to `tx`.
    fn subscribe_notifications(
        &mut self,
        id: Uuid,
        tx: mpsc::Sender<Bytes>,
    ) -> TransportFuture<'_, ()>;

    /// Enumerates the service UUIDs exposed by the peripheral.
    fn services(&mut self) -> TransportFuture<'_, Vec<Uuid>>;

    /// Returns the peripheral's transport address.
    fn address(&self) -> &str;
}

/// Raw advertisement record produced by a scan, before any filtering.
#[derive(Debug, Clone)]
pub struct Advertisement {
    /// Transport address of the advertising device.
    pub address: String,
    /// Local name from the advertisement, if present.
    pub local_name: Option<String>,
    /// Signal strength, if reported.
    pub rssi: Option<i16>,
}

/// Trait for a BLE adapter capable of scanning and opening sessions.
pub trait BleAdapter: Send + Sync {
    /// The transport type produced by [`open`](BleAdapter::open).
    type Transport: GattTransport + 'static;

    /// Listens for advertisements for `timeout` and returns everything heard.
    fn scan(&self, timeout: Duration) -> TransportFuture<'_, Vec<Advertisement>>;

    /// Opens a (not yet connected) session with the given address.
    fn open(&self, address: &str) -> TransportFuture<'_, Self::Transport>;
}

pub use self::btleplug::{BtleplugAdapter, BtleplugTransport};
