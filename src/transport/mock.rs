//! Scripted in-memory transport for tests.
//!
//! The mock records every write and answers with canned notification
//! fragments keyed by command opcode, optionally after a delay, so the
//! correlator and device layers can be exercised without a radio.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::Error;
use crate::transport::{Advertisement, BleAdapter, GattTransport, TransportFuture};

/// Byte offset of the opcode inside a command frame.
const OPCODE_OFFSET: usize = 5;

#[derive(Default)]
pub(crate) struct MockState {
    pub connected: bool,
    /// Number of upcoming connect calls that should fail.
    pub connect_failures: u32,
    pub connect_calls: u32,
    pub is_connected_fails: bool,
    pub disconnect_fails: bool,
    /// Every characteristic write, in order.
    pub writes: Vec<(Uuid, Vec<u8>)>,
    /// Canned notification fragments keyed by command opcode.
    pub replies: HashMap<u8, Vec<Vec<u8>>>,
    /// Deliver replies after this delay instead of inline.
    pub reply_delay: Option<Duration>,
    /// Interleaving log: "write 0xa2", "reply 0xa2", ...
    pub events: Vec<String>,
    pub subscriptions: Vec<Uuid>,
    pub opens: u32,
    notify_tx: Option<mpsc::Sender<Bytes>>,
}

pub(crate) struct MockTransport {
    shared: Arc<Mutex<MockState>>,
    address: String,
}

impl MockTransport {
    pub(crate) fn new(address: impl Into<String>) -> (Self, Arc<Mutex<MockState>>) {
        let shared = Arc::new(Mutex::new(MockState::default()));
        let transport = Self {
            shared: Arc::clone(&shared),
            address: address.into(),
        };
        (transport, shared)
    }

    fn with_shared(shared: Arc<Mutex<MockState>>, address: impl Into<String>) -> Self {
        Self {
            shared,
            address: address.into(),
        }
    }
}

async fn deliver(
    shared: Arc<Mutex<MockState>>,
    tx: mpsc::Sender<Bytes>,
    opcode: u8,
    fragments: Vec<Vec<u8>>,
) {
    shared
        .lock()
        .expect("mock state poisoned")
        .events
        .push(format!("reply {opcode:#04x}"));
    for fragment in fragments {
        if tx.send(Bytes::from(fragment)).await.is_err() {
            return;
        }
    }
}

impl GattTransport for MockTransport {
    fn connect(&mut self, _timeout: Duration) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            let mut state = self.shared.lock().expect("mock state poisoned");
            state.connect_calls += 1;
            if state.connect_failures > 0 {
                state.connect_failures -= 1;
                return Err(Error::Transport {
                    message: "connect refused".into(),
                });
            }
            state.connected = true;
            Ok(())
        })
    }

    fn disconnect(&mut self) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            let mut state = self.shared.lock().expect("mock state poisoned");
            if state.disconnect_fails {
                return Err(Error::Transport {
                    message: "disconnect refused".into(),
                });
            }
            state.connected = false;
            Ok(())
        })
    }

    fn is_connected(&self) -> TransportFuture<'_, bool> {
        Box::pin(async move {
            let state = self.shared.lock().expect("mock state poisoned");
            if state.is_connected_fails {
                return Err(Error::Transport {
                    message: "status check failed".into(),
                });
            }
            Ok(state.connected)
        })
    }

    fn write_characteristic(
        &mut self,
        id: Uuid,
        data: Bytes,
        _with_response: bool,
    ) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            let (reply, delay) = {
                let mut state = self.shared.lock().expect("mock state poisoned");
                state.writes.push((id, data.to_vec()));
                let opcode = data.get(OPCODE_OFFSET).copied();
                if let Some(op) = opcode {
                    state.events.push(format!("write {op:#04x}"));
                }
                let fragments = opcode.and_then(|op| state.replies.get(&op).cloned());
                let tx = state.notify_tx.clone();
                (
                    opcode.zip(fragments).zip(tx),
                    state.reply_delay,
                )
            };

            if let Some(((opcode, fragments), tx)) = reply {
                let shared = Arc::clone(&self.shared);
                if let Some(delay) = delay {
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        deliver(shared, tx, opcode, fragments).await;
                    });
                } else {
                    deliver(shared, tx, opcode, fragments).await;
                }
            }
            Ok(())
        })
    }

    fn write_descriptor(&mut self, _id: Uuid, _data: Bytes) -> TransportFuture<'_, ()> {
        Box::pin(async move { Ok(()) })
    }

    fn read_characteristic(&mut self, _id: Uuid) -> TransportFuture<'_, Bytes> {
        Box::pin(async move { Ok(Bytes::new()) })
    }

    fn subscribe_notifications(
        &mut self,
        id: Uuid,
        tx: mpsc::Sender<Bytes>,
    ) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            let mut state = self.shared.lock().expect("mock state poisoned");
            state.subscriptions.push(id);
            state.notify_tx = Some(tx);
            Ok(())
        })
    }

    fn services(&mut self) -> TransportFuture<'_, Vec<Uuid>> {
        Box::pin(async move { Ok(Vec::new()) })
    }

    fn address(&self) -> &str {
        &self.address
    }
}

/// Adapter returning a fixed advertisement list; every opened transport
/// shares one [`MockState`], so tests can count attempts across retries.
pub(crate) struct MockAdapter {
    pub advertisements: Vec<Advertisement>,
    pub shared: Arc<Mutex<MockState>>,
}

impl MockAdapter {
    pub(crate) fn new(advertisements: Vec<Advertisement>) -> Self {
        Self {
            advertisements,
            shared: Arc::new(Mutex::new(MockState::default())),
        }
    }
}

impl BleAdapter for MockAdapter {
    type Transport = MockTransport;

    fn scan(&self, _timeout: Duration) -> TransportFuture<'_, Vec<Advertisement>> {
        Box::pin(async move { Ok(self.advertisements.clone()) })
    }

    fn open(&self, address: &str) -> TransportFuture<'_, Self::Transport> {
        let address = address.to_owned();
        Box::pin(async move {
            let mut state = self.shared.lock().expect("mock state poisoned");
            state.opens += 1;
            drop(state);
            Ok(MockTransport::with_shared(Arc::clone(&self.shared), address))
        })
    }
}

/// Convenience for tests: an advertisement with the given name.
pub(crate) fn advertisement(address: &str, name: Option<&str>) -> Advertisement {
    Advertisement {
        address: address.to_owned(),
        local_name: name.map(str::to_owned),
        rssi: Some(-60),
    }
}
