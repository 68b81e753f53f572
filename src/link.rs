//! Connection lifecycle and command/response correlation.
//!
//! GATT communication is notification-driven: a command is written to a
//! characteristic and the reply arrives later as an unsolicited push.
//! [`GattLink`] turns that into a blocking-style call: it serializes
//! commands behind one per-device lock, routes reply notifications into a
//! mailbox, and suspends the caller until the reply arrives or the fixed
//! timeout elapses.

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::sync::{Mutex, mpsc};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::transport::GattTransport;

/// Fixed window a command waits for its reply notification.
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(1);

/// Mailbox depth; replies fit one or two notification fragments.
const MAILBOX_CAPACITY: usize = 16;

/// Device-specific wiring for a [`GattLink`], injected at construction.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Characteristic command frames are written to.
    pub command_characteristic: Uuid,
    /// Characteristic subscribed for reply notifications after connect.
    pub reply_characteristic: Uuid,
    /// Whether characteristic writes request a GATT-level response.
    pub write_with_response: bool,
    /// Reply wait window.
    pub reply_timeout: Duration,
}

impl LinkConfig {
    /// Creates a configuration with default write mode and timeout.
    #[must_use]
    pub const fn new(command_characteristic: Uuid, reply_characteristic: Uuid) -> Self {
        Self {
            command_characteristic,
            reply_characteristic,
            write_with_response: false,
            reply_timeout: DEFAULT_REPLY_TIMEOUT,
        }
    }

    /// Sets whether writes request a GATT-level response.
    #[must_use]
    pub const fn write_with_response(mut self, with_response: bool) -> Self {
        self.write_with_response = with_response;
        self
    }

    /// Sets the reply wait window.
    #[must_use]
    pub const fn reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = timeout;
        self
    }
}

struct LinkInner<T> {
    transport: T,
    /// Accumulates notification fragments since the last command was issued.
    mailbox: mpsc::Receiver<Bytes>,
    /// False until the first transport connect succeeds; short-circuits the
    /// status check so an untouched link never queries the backend.
    attempted: bool,
}

/// Command/response correlator over one [`GattTransport`] session.
///
/// The inner mutex is the per-device exclusive lock: it is held for the
/// full duration of connect, disconnect and `send_command`, so at most one
/// command is in flight per device and frames are never pipelined.
pub struct GattLink<T> {
    inner: Mutex<LinkInner<T>>,
    mailbox_tx: mpsc::Sender<Bytes>,
    config: LinkConfig,
    address: String,
}

impl<T: GattTransport> GattLink<T> {
    /// Creates a link over a (not yet connected) transport.
    #[must_use]
    pub fn new(transport: T, config: LinkConfig) -> Self {
        let (mailbox_tx, mailbox) = mpsc::channel(MAILBOX_CAPACITY);
        let address = transport.address().to_owned();
        Self {
            inner: Mutex::new(LinkInner {
                transport,
                mailbox,
                attempted: false,
            }),
            mailbox_tx,
            config,
            address,
        }
    }

    /// Returns the transport address of the peer.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Returns the link configuration.
    #[must_use]
    pub const fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Re-verifies the session against the transport. A failing status
    /// check degrades to `false` with a warning instead of propagating.
    async fn verify_connected(inner: &LinkInner<T>, address: &str) -> bool {
        if !inner.attempted {
            return false;
        }
        match inner.transport.is_connected().await {
            Ok(connected) => connected,
            Err(err) => {
                tracing::warn!("{address}: failed to verify connection status: {err}");
                false
            }
        }
    }

    /// Connects the transport and subscribes the reply characteristic.
    ///
    /// A no-op when the session is already up.
    pub async fn connect(&self, timeout: Duration) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if Self::verify_connected(&inner, &self.address).await {
            return Ok(());
        }
        inner.transport.connect(timeout).await?;
        inner.attempted = true;
        // Post-connect setup: reply notifications feed the mailbox.
        inner
            .transport
            .subscribe_notifications(self.config.reply_characteristic, self.mailbox_tx.clone())
            .await?;
        tracing::info!("{}: link established", self.address);
        Ok(())
    }

    /// Returns true if the session is up, re-verified against the transport.
    pub async fn is_connected(&self) -> bool {
        let inner = self.inner.lock().await;
        Self::verify_connected(&inner, &self.address).await
    }

    /// Disconnects the transport. A no-op unless currently connected.
    pub async fn disconnect(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if !Self::verify_connected(&inner, &self.address).await {
            return Ok(());
        }
        inner.transport.disconnect().await
    }

    /// Writes a command frame and, when a reply is expected, waits for the
    /// correlated notification bytes.
    ///
    /// The mailbox is cleared before the write, so whatever is returned
    /// accumulated strictly after this command went out. Fragments already
    /// queued behind the first one are folded in, in arrival order;
    /// completeness is the downstream decoder's concern.
    pub async fn send_command(&self, frame: Bytes, expect_reply: bool) -> Result<Option<Bytes>> {
        let mut inner = self.inner.lock().await;
        if !Self::verify_connected(&inner, &self.address).await {
            return Err(Error::NotConnected);
        }

        // Clear anything left over from a previous command.
        while inner.mailbox.try_recv().is_ok() {}

        tracing::trace!("{}: sending frame {:02x?}", self.address, &frame[..]);
        inner
            .transport
            .write_characteristic(
                self.config.command_characteristic,
                frame,
                self.config.write_with_response,
            )
            .await?;

        if !expect_reply {
            return Ok(None);
        }

        let timeout = self.config.reply_timeout;
        let first = match tokio::time::timeout(timeout, inner.mailbox.recv()).await {
            Ok(Some(fragment)) => fragment,
            Ok(None) => return Err(Error::ChannelClosed),
            Err(_) => {
                return Err(Error::Timeout {
                    timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                });
            }
        };

        let mut reply = BytesMut::from(&first[..]);
        while let Ok(more) = inner.mailbox.try_recv() {
            reply.extend_from_slice(&more);
        }
        tracing::trace!("{}: reply {:02x?}", self.address, &reply[..]);
        Ok(Some(reply.freeze()))
    }

    /// Writes bytes to a descriptor, serialized behind the command lock.
    pub async fn write_descriptor(&self, id: Uuid, data: Bytes) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if !Self::verify_connected(&inner, &self.address).await {
            return Err(Error::NotConnected);
        }
        inner.transport.write_descriptor(id, data).await
    }

    /// Enumerates the peer's service UUIDs.
    pub async fn services(&self) -> Result<Vec<Uuid>> {
        let mut inner = self.inner.lock().await;
        if !Self::verify_connected(&inner, &self.address).await {
            return Err(Error::NotConnected);
        }
        inner.transport.services().await
    }
}
