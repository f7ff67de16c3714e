//! mDNS/DNS-SD discovery for Grabdrop.
//!
//! Each running device registers `_grabdrop._tcp.local.` pointing at its
//! receiver port, and browses the same service type to keep a
//! [`DeviceRegistry`] up to date.
//!
//! The browser is the only writer of the registry in a running system and it
//! only translates two events: a resolved service becomes
//! [`DeviceRegistry::announce`], a removed service becomes
//! [`DeviceRegistry::withdraw`].

use std::net::IpAddr;
use std::thread::JoinHandle;
use std::time::Duration;

use mdns_sd::{ServiceDaemon, ServiceEvent, ServiceInfo};
use parking_lot::Mutex;
use uuid::Uuid;

use super::DeviceRegistry;
use crate::error::{Error, Result};

/// mDNS service type for Grabdrop.
pub const SERVICE_TYPE: &str = "_grabdrop._tcp.local.";

const SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(500);

/// TXT record keys for service properties.
pub mod txt_keys {
    /// Device name key
    pub const DEVICE_NAME: &str = "device_name";
    /// Device ID key
    pub const DEVICE_ID: &str = "device_id";
    /// Protocol version key
    pub const VERSION: &str = "version";
}

/// Properties for mDNS service registration.
#[derive(Debug, Clone)]
pub struct AnnounceProperties {
    /// Device name
    pub device_name: String,
    /// Device ID, used by browsers to skip their own announcement
    pub device_id: Uuid,
    /// Receiver port
    pub port: u16,
    /// Protocol version
    pub version: String,
}

impl AnnounceProperties {
    /// Convert to TXT record properties.
    #[must_use]
    pub fn to_txt_properties(&self) -> Vec<(&'static str, String)> {
        vec![
            (txt_keys::DEVICE_NAME, self.device_name.clone()),
            (txt_keys::DEVICE_ID, self.device_id.to_string()),
            (txt_keys::VERSION, self.version.clone()),
        ]
    }

    /// Instance name used for registration.
    #[must_use]
    pub fn instance_name(&self) -> String {
        let short_id = self.device_id.simple().to_string();
        format!("{}-{}", sanitize_label(&self.device_name), &short_id[..8])
    }
}

/// A resolved service, as seen by the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPeer {
    /// Full service name, used as the peer id
    pub id: String,
    /// Advertised device name
    pub name: String,
    /// Advertised device id, if any
    pub device_id: Option<Uuid>,
    /// Preferred address
    pub address: IpAddr,
    /// Receiver port
    pub port: u16,
}

impl ResolvedPeer {
    /// Parse from a resolved ServiceInfo. IPv4 addresses are preferred.
    #[must_use]
    pub fn from_service_info(info: &ServiceInfo) -> Option<Self> {
        let properties = info.get_properties();
        let get_str =
            |key: &str| -> Option<String> { properties.get(key).map(|p| p.val_str().to_string()) };

        let id = info.get_fullname().to_string();
        let name = get_str(txt_keys::DEVICE_NAME).unwrap_or_else(|| {
            id.strip_suffix(&format!(".{SERVICE_TYPE}"))
                .unwrap_or(&id)
                .to_string()
        });
        let device_id = get_str(txt_keys::DEVICE_ID).and_then(|s| Uuid::parse_str(&s).ok());

        let addresses = info.get_addresses();
        let address = addresses
            .iter()
            .find(|addr| addr.is_ipv4())
            .or_else(|| addresses.iter().next())
            .copied()?;

        Some(Self {
            id,
            name,
            device_id,
            address,
            port: info.get_port(),
        })
    }
}

/// Registers this device as an mDNS service.
pub struct MdnsAnnouncer {
    /// The mDNS daemon (wrapped in Option to support Drop)
    daemon: Option<ServiceDaemon>,
    /// Full name of the registered service
    fullname: Mutex<Option<String>>,
}

impl MdnsAnnouncer {
    /// Create a new announcer.
    ///
    /// # Errors
    ///
    /// Returns an error if the mDNS daemon cannot be created.
    pub fn new() -> Result<Self> {
        let daemon = ServiceDaemon::new()
            .map_err(|e| Error::DiscoveryUnavailable(format!("mDNS daemon error: {e}")))?;

        Ok(Self {
            daemon: Some(daemon),
            fullname: Mutex::new(None),
        })
    }

    /// Register this device.
    ///
    /// # Errors
    ///
    /// Returns an error if registration fails.
    pub fn register(&self, properties: &AnnounceProperties) -> Result<()> {
        let instance_name = properties.instance_name();
        let txt_props = properties.to_txt_properties();

        let service_info = ServiceInfo::new(
            SERVICE_TYPE,
            &instance_name,
            &local_hostname(),
            (),
            properties.port,
            txt_props.as_slice(),
        )
        .map_err(|e| Error::Internal(format!("Failed to create mDNS service info: {e}")))?
        .enable_addr_auto();

        let fullname = service_info.get_fullname().to_string();

        self.daemon()?
            .register(service_info)
            .map_err(|e| Error::DiscoveryUnavailable(format!("Failed to register: {e}")))?;

        *self.fullname.lock() = Some(fullname);

        tracing::info!(
            device = %properties.device_name,
            instance = %instance_name,
            port = properties.port,
            "Registered mDNS service"
        );

        Ok(())
    }

    /// Unregister the service, if registered.
    ///
    /// # Errors
    ///
    /// Returns an error if unregistration fails.
    pub fn unregister(&self) -> Result<()> {
        let Some(fullname) = self.fullname.lock().take() else {
            return Ok(());
        };

        let receiver = self
            .daemon()?
            .unregister(&fullname)
            .map_err(|e| Error::Internal(format!("Failed to unregister mDNS service: {e}")))?;

        match receiver.recv_timeout(SHUTDOWN_TIMEOUT) {
            Ok(status) => tracing::debug!(service = %fullname, ?status, "mDNS unregister completed"),
            Err(e) => tracing::debug!(service = %fullname, "mDNS unregister not confirmed: {e}"),
        }

        tracing::info!(service = %fullname, "Unregistered mDNS service");
        Ok(())
    }

    /// Unregister and shut the daemon down.
    ///
    /// # Errors
    ///
    /// Returns an error if the shutdown fails.
    pub fn shutdown(mut self) -> Result<()> {
        self.unregister()?;
        if let Some(daemon) = self.daemon.take() {
            shutdown_daemon(daemon, "announcer")?;
        }
        Ok(())
    }

    fn daemon(&self) -> Result<&ServiceDaemon> {
        self.daemon
            .as_ref()
            .ok_or_else(|| Error::Internal("mDNS daemon already shutdown".to_string()))
    }
}

impl Drop for MdnsAnnouncer {
    fn drop(&mut self) {
        if self.daemon.is_some() {
            if let Err(e) = self.unregister() {
                tracing::debug!("mDNS unregister during drop: {e}");
            }
        }
        if let Some(daemon) = self.daemon.take() {
            if let Err(e) = shutdown_daemon(daemon, "announcer") {
                tracing::debug!("mDNS announcer shutdown during drop: {e}");
            }
        }
    }
}

/// Browses for peers and mirrors them into a [`DeviceRegistry`].
///
/// Events are drained on a dedicated thread; the registry is the only state
/// it touches.
pub struct MdnsBrowser {
    daemon: Option<ServiceDaemon>,
    worker: Option<JoinHandle<()>>,
}

impl MdnsBrowser {
    /// Start browsing.
    ///
    /// Services whose `device_id` equals `own_device_id` are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the mDNS daemon cannot be created or browsing fails.
    pub fn start(registry: DeviceRegistry, own_device_id: Option<Uuid>) -> Result<Self> {
        let daemon = ServiceDaemon::new()
            .map_err(|e| Error::DiscoveryUnavailable(format!("mDNS daemon error: {e}")))?;

        let receiver = daemon
            .browse(SERVICE_TYPE)
            .map_err(|e| Error::DiscoveryUnavailable(format!("Failed to browse: {e}")))?;

        let worker = std::thread::Builder::new()
            .name("grabdrop-mdns-browser".to_string())
            .spawn(move || {
                let handler = EventHandler {
                    registry,
                    own_device_id,
                };
                while let Ok(event) = receiver.recv() {
                    handler.handle(event);
                }
                tracing::debug!("mDNS browse channel closed");
            })
            .map_err(|e| Error::Internal(format!("Failed to spawn mDNS browser thread: {e}")))?;

        tracing::info!(service = SERVICE_TYPE, "Browsing for peers");

        Ok(Self {
            daemon: Some(daemon),
            worker: Some(worker),
        })
    }

    /// Stop browsing and shut the daemon down.
    ///
    /// # Errors
    ///
    /// Returns an error if the shutdown fails.
    pub fn shutdown(mut self) -> Result<()> {
        self.stop()
    }

    fn stop(&mut self) -> Result<()> {
        if let Some(daemon) = self.daemon.take() {
            if let Err(e) = daemon.stop_browse(SERVICE_TYPE) {
                tracing::debug!("Failed to stop mDNS browse: {e}");
            }
            shutdown_daemon(daemon, "browser")?;
        }
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::warn!("mDNS browser thread panicked");
            }
        }
        Ok(())
    }
}

impl Drop for MdnsBrowser {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            tracing::debug!("mDNS browser shutdown during drop: {e}");
        }
    }
}

/// Translates daemon events into registry calls.
struct EventHandler {
    registry: DeviceRegistry,
    own_device_id: Option<Uuid>,
}

impl EventHandler {
    fn handle(&self, event: ServiceEvent) {
        match event {
            ServiceEvent::ServiceResolved(info) => {
                let Some(peer) = ResolvedPeer::from_service_info(&info) else {
                    tracing::debug!(service = %info.get_fullname(), "Ignoring service without address");
                    return;
                };
                if peer.device_id.is_some() && peer.device_id == self.own_device_id {
                    return;
                }
                self.registry
                    .announce(&peer.id, &peer.name, peer.address, peer.port);
            }
            ServiceEvent::ServiceRemoved(_, fullname) => {
                self.registry.withdraw(&fullname);
            }
            other => tracing::trace!(?other, "mDNS event"),
        }
    }
}

fn shutdown_daemon(daemon: ServiceDaemon, role: &str) -> Result<()> {
    let receiver = daemon
        .shutdown()
        .map_err(|e| Error::Internal(format!("Failed to shutdown mDNS daemon: {e}")))?;

    match receiver.recv_timeout(SHUTDOWN_TIMEOUT) {
        Ok(status) => tracing::debug!(role, ?status, "mDNS shutdown completed"),
        Err(flume::RecvTimeoutError::Timeout) => tracing::debug!(role, "mDNS shutdown timed out"),
        Err(flume::RecvTimeoutError::Disconnected) => {
            tracing::debug!(role, "mDNS shutdown channel disconnected");
        }
    }
    Ok(())
}

fn local_hostname() -> String {
    let raw_hostname = hostname::get().map_or_else(
        |_| "localhost".to_string(),
        |h| h.to_string_lossy().to_string(),
    );

    if raw_hostname.ends_with(".local.") {
        raw_hostname
    } else if raw_hostname.to_lowercase().ends_with(".local") {
        format!("{raw_hostname}.")
    } else {
        format!("{raw_hostname}.local.")
    }
}

/// DNS-SD instance labels may not contain dots.
fn sanitize_label(name: &str) -> String {
    let label: String = name
        .chars()
        .map(|c| if c == '.' || c.is_control() { '-' } else { c })
        .collect();
    if label.trim().is_empty() {
        "grabdrop".to_string()
    } else {
        label
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props() -> AnnounceProperties {
        AnnounceProperties {
            device_name: "Office.PC".to_string(),
            device_id: Uuid::nil(),
            port: 5000,
            version: "1.0".to_string(),
        }
    }

    #[test]
    fn test_announce_properties_to_txt() {
        let txt = props().to_txt_properties();
        assert_eq!(txt.len(), 3);

        let name_prop = txt.iter().find(|(k, _)| *k == txt_keys::DEVICE_NAME);
        assert_eq!(name_prop.map(|(_, v)| v.as_str()), Some("Office.PC"));
    }

    #[test]
    fn test_instance_name_has_no_dots() {
        let name = props().instance_name();
        assert_eq!(name, "Office-PC-00000000");
    }

    #[test]
    fn test_service_type_format() {
        assert!(SERVICE_TYPE.ends_with(".local."));
        assert!(SERVICE_TYPE.starts_with("_grabdrop._tcp"));
    }

    #[test]
    fn test_resolved_peer_from_service_info() {
        let info = ServiceInfo::new(
            SERVICE_TYPE,
            "Laptop-1234",
            "laptop.local.",
            "192.168.1.20",
            5000,
            &[(txt_keys::DEVICE_NAME, "Laptop"), (txt_keys::VERSION, "1.0")][..],
        )
        .unwrap();

        let peer = ResolvedPeer::from_service_info(&info).unwrap();
        assert_eq!(peer.id, format!("Laptop-1234.{SERVICE_TYPE}"));
        assert_eq!(peer.name, "Laptop");
        assert_eq!(peer.address, "192.168.1.20".parse::<IpAddr>().unwrap());
        assert_eq!(peer.port, 5000);
        assert!(peer.device_id.is_none());
    }

    #[test]
    fn test_event_handler_skips_own_service_and_withdraws() {
        let own = Uuid::new_v4();
        let registry = DeviceRegistry::new();
        let handler = EventHandler {
            registry: registry.clone(),
            own_device_id: Some(own),
        };

        let own_id = own.to_string();
        let mine = ServiceInfo::new(
            SERVICE_TYPE,
            "Me",
            "me.local.",
            "192.168.1.2",
            5000,
            &[(txt_keys::DEVICE_ID, own_id.as_str())][..],
        )
        .unwrap();
        handler.handle(ServiceEvent::ServiceResolved(mine));
        assert!(registry.is_empty());

        let other = ServiceInfo::new(
            SERVICE_TYPE,
            "Other",
            "other.local.",
            "192.168.1.3",
            5001,
            &[(txt_keys::DEVICE_NAME, "Other")][..],
        )
        .unwrap();
        let fullname = other.get_fullname().to_string();
        handler.handle(ServiceEvent::ServiceResolved(other));
        assert_eq!(registry.len(), 1);

        handler.handle(ServiceEvent::ServiceRemoved(
            SERVICE_TYPE.to_string(),
            fullname,
        ));
        assert!(registry.is_empty());
    }
}
