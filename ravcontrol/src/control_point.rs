//! Control point: from discovery events to usable proxies.
//!
//! The control point consumes `resource-available` / `resource-unavailable`
//! events produced by an external discovery component (typically an SSDP
//! listener), fetches and parses device descriptions, and emits device and
//! service proxies built through the [`ResourceFactory`].

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex, RwLock};
use std::thread;
use std::time::Duration;

use crossbeam_channel::Receiver;
use tracing::{debug, info, warn};
use url::Url;

use ravupnp::devices::Describable;

use crate::device_info::{DeviceInfo, fetch_device_description};
use crate::errors::ControlPointError;
use crate::events::{ControlPointEvent, ControlPointEventBus};
use crate::factory::{DeviceProxyLike, ResourceFactory, ServiceProxyLike};
use crate::proxy::{EventBroker, ServiceProxy};

/// Discovery events fed to the control point by the external SSDP
/// collaborator.
#[derive(Debug, Clone)]
pub enum DiscoveryEvent {
    ResourceAvailable {
        usn: String,
        locations: Vec<String>,
    },
    ResourceUnavailable {
        usn: String,
    },
}

/// Matches "all devices".
pub const TARGET_ALL: &str = "ssdp:all";

struct DeviceEntry {
    /// Locations currently advertising this device
    locations: Vec<String>,
    device: Arc<dyn DeviceProxyLike>,
    services: Vec<Arc<dyn ServiceProxyLike>>,
}

#[derive(Default)]
struct CpRegistry {
    devices: HashMap<String, DeviceEntry>,
    usn_to_udn: HashMap<String, String>,
}

/// Control point bound to a target URN.
pub struct ControlPoint {
    target: String,
    timeout: Duration,
    registry: Arc<RwLock<CpRegistry>>,
    bus: ControlPointEventBus,
    broker: Arc<EventBroker>,
    /// Guards against concurrent handling of the same UDN
    fetch_lock: Arc<Mutex<()>>,
}

impl ControlPoint {
    /// Creates a control point for `target` (a device type URN, a service
    /// type URN, or [`TARGET_ALL`]).
    pub fn new(target: impl Into<String>) -> io::Result<Self> {
        let broker = EventBroker::spawn()?;
        Ok(Self {
            target: target.into(),
            timeout: Duration::from_secs(10),
            registry: Arc::new(RwLock::new(CpRegistry::default())),
            bus: ControlPointEventBus::new(),
            broker,
            fetch_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// The broker used by proxies built here, for standalone subscriptions.
    pub fn event_broker(&self) -> &Arc<EventBroker> {
        &self.broker
    }

    /// Subscribes to proxy availability events.
    pub fn subscribe(&self) -> Receiver<ControlPointEvent> {
        self.bus.subscribe()
    }

    /// Spawns a thread draining a discovery event channel.
    pub fn start(self: &Arc<Self>, discovery_rx: Receiver<DiscoveryEvent>) -> io::Result<()> {
        let control_point = Arc::clone(self);
        thread::Builder::new()
            .name("control-point".into())
            .spawn(move || {
                for event in discovery_rx {
                    control_point.handle_discovery_event(event);
                }
                debug!("Discovery channel closed, control point thread exiting");
            })
            .map(|_| ())
    }

    /// Processes one discovery event synchronously.
    pub fn handle_discovery_event(&self, event: DiscoveryEvent) {
        match event {
            DiscoveryEvent::ResourceAvailable { usn, locations } => {
                if let Err(e) = self.resource_available(&usn, &locations) {
                    warn!(usn = usn.as_str(), "Ignoring resource: {}", e);
                }
            }
            DiscoveryEvent::ResourceUnavailable { usn } => {
                self.resource_unavailable(&usn);
            }
        }
    }

    fn matches_target(&self, usn: &str) -> bool {
        self.target == TARGET_ALL || usn.contains(&self.target)
    }

    fn resource_available(
        &self,
        usn: &str,
        locations: &[String],
    ) -> Result<(), ControlPointError> {
        if !self.matches_target(usn) {
            return Ok(());
        }

        let udn = udn_of_usn(usn);

        let _guard = self.fetch_lock.lock().unwrap();

        // A device advertised from several locations is fetched only once;
        // extra locations are recorded so the device stays present until all
        // of them are gone.
        {
            let mut registry = self.registry.write().unwrap();
            registry
                .usn_to_udn
                .insert(usn.to_string(), udn.clone());
            if let Some(entry) = registry.devices.get_mut(&udn) {
                for location in locations {
                    if !entry.locations.contains(location) {
                        entry.locations.push(location.clone());
                    }
                }
                return Ok(());
            }
        }

        // First reachable location wins
        let (location, description) = locations
            .iter()
            .find_map(|raw| {
                let location = Url::parse(raw).ok()?;
                match fetch_device_description(&location, self.timeout) {
                    Ok(description) => Some((raw.clone(), description)),
                    Err(e) => {
                        debug!(location = raw.as_str(), "Description fetch failed: {}", e);
                        None
                    }
                }
            })
            .ok_or_else(|| ControlPointError::DescriptionFetch {
                location: locations.join(", "),
                reason: "no reachable location".to_string(),
            })?;

        let info = DeviceInfo::find(Arc::clone(&description), &udn)
            .ok_or_else(|| ControlPointError::DeviceNotInDescription(udn.clone()))?;

        let factory = ResourceFactory::global();
        let device_proxy = factory.build_device_proxy(info.clone());

        let service_proxies: Vec<Arc<dyn ServiceProxyLike>> = info
            .services()
            .into_iter()
            .map(|service_info| {
                factory.build_service_proxy(ServiceProxy::new(
                    service_info,
                    Arc::clone(&self.broker),
                ))
            })
            .collect();

        {
            let mut registry = self.registry.write().unwrap();
            registry.devices.insert(
                udn.clone(),
                DeviceEntry {
                    locations: vec![location],
                    device: Arc::clone(&device_proxy),
                    services: service_proxies.clone(),
                },
            );
        }

        info!(
            udn = udn.as_str(),
            friendly_name = info.friendly_name(),
            services = service_proxies.len(),
            "Device proxy available"
        );

        // Device first, then its services
        self.bus
            .broadcast(ControlPointEvent::DeviceProxyAvailable(device_proxy));
        for proxy in service_proxies {
            self.bus
                .broadcast(ControlPointEvent::ServiceProxyAvailable(proxy));
        }

        Ok(())
    }

    fn resource_unavailable(&self, usn: &str) {
        let mut registry = self.registry.write().unwrap();
        let Some(udn) = registry.usn_to_udn.remove(usn) else {
            return;
        };

        // Other USNs may still reference this UDN (device + services share it)
        let still_referenced = registry.usn_to_udn.values().any(|other| other == &udn);
        if still_referenced {
            return;
        }

        let Some(entry) = registry.devices.remove(&udn) else {
            return;
        };
        drop(registry);

        info!(
            udn = udn.as_str(),
            locations = entry.locations.len(),
            "Device proxy unavailable"
        );

        for proxy in &entry.services {
            self.bus.broadcast(ControlPointEvent::ServiceProxyUnavailable {
                udn: udn.clone(),
                service_type: proxy.proxy().service_type().to_string(),
            });
        }
        self.bus
            .broadcast(ControlPointEvent::DeviceProxyUnavailable { udn });

        drop(entry.device);
    }

    /// Currently known device proxies.
    pub fn device_proxies(&self) -> Vec<Arc<dyn DeviceProxyLike>> {
        self.registry
            .read()
            .unwrap()
            .devices
            .values()
            .map(|entry| Arc::clone(&entry.device))
            .collect()
    }

    /// Device proxy by UDN.
    pub fn device_proxy(&self, udn: &str) -> Option<Arc<dyn DeviceProxyLike>> {
        self.registry
            .read()
            .unwrap()
            .devices
            .get(udn)
            .map(|entry| Arc::clone(&entry.device))
    }
}

/// Extracts the UDN from a USN (`uuid:x::urn:...` → `uuid:x`).
fn udn_of_usn(usn: &str) -> String {
    match usn.split_once("::") {
        Some((udn, _)) => udn.to_string(),
        None => usn.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_udn_of_usn() {
        assert_eq!(
            udn_of_usn("uuid:1234::urn:schemas-upnp-org:device:MediaServer:1"),
            "uuid:1234"
        );
        assert_eq!(udn_of_usn("uuid:1234"), "uuid:1234");
    }

    #[test]
    fn test_target_matching() {
        let cp = ControlPoint::new("urn:schemas-upnp-org:device:MediaServer:1").unwrap();
        assert!(cp.matches_target(
            "uuid:1::urn:schemas-upnp-org:device:MediaServer:1"
        ));
        assert!(!cp.matches_target(
            "uuid:1::urn:schemas-upnp-org:device:MediaRenderer:1"
        ));

        let all = ControlPoint::new(TARGET_ALL).unwrap();
        assert!(all.matches_target("uuid:anything"));
    }

    #[test]
    fn test_unavailable_unknown_usn_is_noop() {
        let cp = ControlPoint::new(TARGET_ALL).unwrap();
        cp.handle_discovery_event(DiscoveryEvent::ResourceUnavailable {
            usn: "uuid:ghost".to_string(),
        });
        assert!(cp.device_proxies().is_empty());
    }
}
