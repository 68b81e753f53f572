//! btleplug-backed implementation of the transport capability traits.
//!
//! This is the only module that talks to the OS Bluetooth stack. Everything
//! above it sees the [`GattTransport`]/[`BleAdapter`] traits only.

use std::time::Duration;

use btleplug::api::{
    Central, Characteristic, Descriptor, Manager as _, Peripheral as _, ScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use bytes::Bytes;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::transport::{Advertisement, BleAdapter, GattTransport, TransportFuture};

/// Scan window used when opening a session for an address that has not been
/// seen by the adapter yet.
const ADDRESS_SCAN_TIMEOUT: Duration = Duration::from_secs(5);

/// BLE adapter backed by btleplug.
pub struct BtleplugAdapter {
    adapter: Adapter,
}

impl BtleplugAdapter {
    /// Creates an adapter from the first Bluetooth controller on the system.
    pub async fn new() -> Result<Self> {
        let manager = Manager::new().await?;
        let adapter = manager
            .adapters()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Transport {
                message: "no bluetooth adapters found".into(),
            })?;
        Ok(Self { adapter })
    }

    async fn find_peripheral(&self, address: &str) -> Result<Option<Peripheral>> {
        for peripheral in self.adapter.peripherals().await? {
            if let Some(props) = peripheral.properties().await? {
                if props.address.to_string().eq_ignore_ascii_case(address) {
                    return Ok(Some(peripheral));
                }
            }
        }
        Ok(None)
    }
}

impl BleAdapter for BtleplugAdapter {
    type Transport = BtleplugTransport;

    fn scan(&self, timeout: Duration) -> TransportFuture<'_, Vec<Advertisement>> {
        Box::pin(async move {
            tracing::debug!("scanning for advertisements for {timeout:?}");
            self.adapter.start_scan(ScanFilter::default()).await?;
            tokio::time::sleep(timeout).await;
            self.adapter.stop_scan().await?;

            let mut found = Vec::new();
            for peripheral in self.adapter.peripherals().await? {
                if let Some(props) = peripheral.properties().await? {
                    found.push(Advertisement {
                        address: props.address.to_string(),
                        local_name: props.local_name,
                        rssi: props.rssi,
                    });
                }
            }
            tracing::debug!("scan finished, {} advertisements", found.len());
            Ok(found)
        })
    }

    fn open(&self, address: &str) -> TransportFuture<'_, Self::Transport> {
        let address = address.to_owned();
        Box::pin(async move {
            let peripheral = match self.find_peripheral(&address).await? {
                Some(p) => p,
                None => {
                    // Not seen yet, give the radio a chance to hear it.
                    self.adapter.start_scan(ScanFilter::default()).await?;
                    tokio::time::sleep(ADDRESS_SCAN_TIMEOUT).await;
                    self.adapter.stop_scan().await?;
                    self.find_peripheral(&address)
                        .await?
                        .ok_or(Error::DeviceNotFound {
                            address: address.clone(),
                        })?
                }
            };
            Ok(BtleplugTransport {
                peripheral,
                address,
                notify_task: None,
            })
        })
    }
}

/// GATT session with one peripheral, backed by btleplug.
pub struct BtleplugTransport {
    peripheral: Peripheral,
    address: String,
    notify_task: Option<JoinHandle<()>>,
}

impl BtleplugTransport {
    fn characteristic(&self, id: Uuid) -> Result<Characteristic> {
        self.peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == id)
            .ok_or(Error::CharacteristicNotFound(id))
    }

    fn descriptor(&self, id: Uuid) -> Result<Descriptor> {
        self.peripheral
            .characteristics()
            .into_iter()
            .flat_map(|c| c.descriptors)
            .find(|d| d.uuid == id)
            .ok_or(Error::CharacteristicNotFound(id))
    }
}

impl GattTransport for BtleplugTransport {
    fn connect(&mut self, timeout: Duration) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            tracing::info!("connecting to {}", self.address);
            tokio::time::timeout(timeout, self.peripheral.connect())
                .await
                .map_err(|_| Error::Timeout {
                    timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                })??;
            self.peripheral.discover_services().await?;
            tracing::info!("connected to {}", self.address);
            Ok(())
        })
    }

    fn disconnect(&mut self) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            if let Some(task) = self.notify_task.take() {
                task.abort();
            }
            tracing::info!("disconnecting from {}", self.address);
            self.peripheral.disconnect().await?;
            Ok(())
        })
    }

    fn is_connected(&self) -> TransportFuture<'_, bool> {
        Box::pin(async move { Ok(self.peripheral.is_connected().await?) })
    }

    fn write_characteristic(
        &mut self,
        id: Uuid,
        data: Bytes,
        with_response: bool,
    ) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            let characteristic = self.characteristic(id)?;
            let write_type = if with_response {
                WriteType::WithResponse
            } else {
                WriteType::WithoutResponse
            };
            tracing::trace!("writing {} bytes to {id}", data.len());
            self.peripheral
                .write(&characteristic, &data, write_type)
                .await?;
            Ok(())
        })
    }

    fn write_descriptor(&mut self, id: Uuid, data: Bytes) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            let descriptor = self.descriptor(id)?;
            self.peripheral.write_descriptor(&descriptor, &data).await?;
            Ok(())
        })
    }

    fn read_characteristic(&mut self, id: Uuid) -> TransportFuture<'_, Bytes> {
        Box::pin(async move {
            let characteristic = self.characteristic(id)?;
            let value = self.peripheral.read(&characteristic).await?;
            Ok(Bytes::from(value))
        })
    }

    fn subscribe_notifications(
        &mut self,
        id: Uuid,
        tx: mpsc::Sender<Bytes>,
    ) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            let characteristic = self.characteristic(id)?;
            self.peripheral.subscribe(&characteristic).await?;

            let mut stream = self.peripheral.notifications().await?;
            if let Some(task) = self.notify_task.take() {
                task.abort();
            }
            self.notify_task = Some(tokio::spawn(async move {
                while let Some(notification) = stream.next().await {
                    if notification.uuid != id {
                        continue;
                    }
                    tracing::trace!("notification: {} bytes", notification.value.len());
                    if tx.send(Bytes::from(notification.value)).await.is_err() {
                        tracing::debug!("notification receiver dropped");
                        return;
                    }
                }
            }));
            Ok(())
        })
    }

    fn services(&mut self) -> TransportFuture<'_, Vec<Uuid>> {
        Box::pin(async move {
            Ok(self
                .peripheral
                .services()
                .into_iter()
                .map(|s| s.uuid)
                .collect())
        })
    }

    fn address(&self) -> &str {
        &self.address
    }
}

impl Drop for BtleplugTransport {
    fn drop(&mut self) {
        if let Some(task) = self.notify_task.take() {
            task.abort();
        }
    }
}
