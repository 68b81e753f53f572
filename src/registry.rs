//! Device discovery and the per-address device registry.
//!
//! The registry owns the sole [`Am43Device`] instance per address:
//! reconnecting a known address reuses the existing instance instead of
//! creating a second connection object. Discovery filters advertisement
//! scans down to devices whose name matches the configured prefixes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::device::Am43Device;
use crate::error::{Error, Result};
use crate::transport::{Advertisement, BleAdapter};
use crate::types::{DeviceDescriptor, DeviceTarget};

/// Default advertisement scan window.
pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(5);

/// Advertised name prefix of AM43-family devices.
pub const DEFAULT_NAME_PREFIX: &str = "Blind";

/// Discovery scan settings.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Keep devices whose advertised name starts with any of these.
    pub name_prefixes: Vec<String>,
    /// Scan window.
    pub scan_timeout: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            name_prefixes: vec![DEFAULT_NAME_PREFIX.to_owned()],
            scan_timeout: DEFAULT_SCAN_TIMEOUT,
        }
    }
}

impl DiscoveryConfig {
    /// Replaces the name prefix list.
    #[must_use]
    pub fn name_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.name_prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the scan window.
    #[must_use]
    pub const fn scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan_timeout = timeout;
        self
    }
}

/// Connect retry policy: attempt count and the backoff between attempts.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total connect attempts (at least 1).
    pub attempts: u32,
    /// Pause between failed attempts. Not applied after the final one.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 1,
            backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Sets the attempt count.
    #[must_use]
    pub const fn attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    /// Sets the backoff between attempts.
    #[must_use]
    pub const fn backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }
}

/// Options for [`DeviceRegistry::connect`].
#[derive(Debug, Clone, Copy)]
pub struct ConnectOptions {
    /// Per-attempt transport connect timeout.
    pub timeout: Duration,
    /// Retry policy across attempts.
    pub retry: RetryPolicy,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            retry: RetryPolicy::default(),
        }
    }
}

/// Finds AM43 devices over the air and manages one long-lived device
/// instance per address.
pub struct DeviceRegistry<A: BleAdapter> {
    adapter: A,
    config: DiscoveryConfig,
    devices: Mutex<HashMap<String, Arc<Am43Device<A::Transport>>>>,
}

impl<A: BleAdapter> DeviceRegistry<A> {
    /// Creates a registry with the default discovery configuration.
    #[must_use]
    pub fn new(adapter: A) -> Self {
        Self::with_config(adapter, DiscoveryConfig::default())
    }

    /// Creates a registry with a custom discovery configuration.
    #[must_use]
    pub fn with_config(adapter: A, config: DiscoveryConfig) -> Self {
        Self {
            adapter,
            config,
            devices: Mutex::new(HashMap::new()),
        }
    }

    fn is_target(&self, advertisement: &Advertisement) -> bool {
        advertisement.local_name.as_deref().is_some_and(|name| {
            self.config
                .name_prefixes
                .iter()
                .any(|prefix| name.starts_with(prefix.as_str()))
        })
    }

    /// Scans for advertisements and returns descriptors for every device
    /// matching the configured name prefixes, in the order heard.
    pub async fn discover(&self) -> Result<Vec<DeviceDescriptor>> {
        let heard = self.adapter.scan(self.config.scan_timeout).await?;
        let matches = heard
            .into_iter()
            .filter(|adv| self.is_target(adv))
            .map(|adv| {
                let advertised = adv.local_name.unwrap_or_default();
                DeviceDescriptor {
                    name: advertised.trim().to_owned(),
                    advertised_name: advertised,
                    address: adv.address,
                    rssi: adv.rssi,
                }
            })
            .collect::<Vec<_>>();
        tracing::info!("discovered {} matching device(s)", matches.len());
        Ok(matches)
    }

    /// Returns the managed device for an address, if one exists.
    pub async fn device(&self, address: &str) -> Option<Arc<Am43Device<A::Transport>>> {
        self.devices.lock().await.get(address).cloned()
    }

    /// Connects to a device by address or descriptor, retrying per the
    /// given policy.
    ///
    /// The registry keeps one device instance per address; subsequent calls
    /// for the same address reconnect that instance. With `attempts == 1` a
    /// failure propagates as-is; otherwise failed attempts are logged,
    /// separated by the backoff, and exhausting them raises
    /// [`Error::ConnectionFailed`].
    pub async fn connect(
        &self,
        target: impl Into<DeviceTarget>,
        options: ConnectOptions,
    ) -> Result<Arc<Am43Device<A::Transport>>> {
        let target = target.into();
        let address = target.address().to_owned();

        let device = {
            let mut devices = self.devices.lock().await;
            match devices.get(&address) {
                Some(device) => Arc::clone(device),
                None => {
                    let transport = self.adapter.open(&address).await?;
                    let mut device = Am43Device::new(transport);
                    if let Some(name) = target.name() {
                        device = device.with_name(name);
                    }
                    let device = Arc::new(device);
                    devices.insert(address.clone(), Arc::clone(&device));
                    device
                }
            }
        };

        let attempts = options.retry.attempts.max(1);
        for attempt in 1..=attempts {
            match device.connect(options.timeout).await {
                Ok(()) => return Ok(device),
                Err(err) if attempts == 1 => return Err(err),
                Err(err) => {
                    tracing::warn!(
                        "connection to {address} failed (attempt {attempt}/{attempts}): {err}"
                    );
                    if attempt < attempts {
                        tokio::time::sleep(options.retry.backoff).await;
                    }
                }
            }
        }
        Err(Error::ConnectionFailed { address, attempts })
    }

    /// Disconnects every managed device and empties the registry.
    ///
    /// Individual failures are logged and suppressed so cleanup always
    /// completes for the remaining devices.
    pub async fn disconnect_all(&self) {
        let mut devices = self.devices.lock().await;
        for (address, device) in devices.drain() {
            tracing::info!("disconnecting {address}...");
            if let Err(err) = device.disconnect().await {
                tracing::error!("unable to disconnect device {address}: {err}");
            }
        }
    }
}
