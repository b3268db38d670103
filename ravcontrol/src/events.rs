//! Control point event bus.

use std::sync::{Arc, Mutex};

use crossbeam_channel::{Receiver, Sender, unbounded};

use crate::factory::{DeviceProxyLike, ServiceProxyLike};

/// Events emitted by a [`ControlPoint`](crate::ControlPoint).
///
/// For a given device, `DeviceProxyAvailable` is always delivered before the
/// `ServiceProxyAvailable` of its services.
#[derive(Clone)]
pub enum ControlPointEvent {
    DeviceProxyAvailable(Arc<dyn DeviceProxyLike>),
    ServiceProxyAvailable(Arc<dyn ServiceProxyLike>),
    DeviceProxyUnavailable { udn: String },
    ServiceProxyUnavailable { udn: String, service_type: String },
}

impl std::fmt::Debug for ControlPointEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControlPointEvent::DeviceProxyAvailable(_) => {
                f.write_str("DeviceProxyAvailable")
            }
            ControlPointEvent::ServiceProxyAvailable(_) => {
                f.write_str("ServiceProxyAvailable")
            }
            ControlPointEvent::DeviceProxyUnavailable { udn } => {
                write!(f, "DeviceProxyUnavailable({})", udn)
            }
            ControlPointEvent::ServiceProxyUnavailable { udn, service_type } => {
                write!(f, "ServiceProxyUnavailable({}, {})", udn, service_type)
            }
        }
    }
}

/// Fan-out bus: every subscriber gets every event.
#[derive(Clone, Default)]
pub(crate) struct ControlPointEventBus {
    subscribers: Arc<Mutex<Vec<Sender<ControlPointEvent>>>>,
}

impl ControlPointEventBus {
    pub(crate) fn new() -> Self {
        Self {
            subscribers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn subscribe(&self) -> Receiver<ControlPointEvent> {
        let (tx, rx) = unbounded::<ControlPointEvent>();
        self.subscribers.lock().unwrap().push(tx);
        rx
    }

    pub(crate) fn broadcast(&self, event: ControlPointEvent) {
        let mut subscribers = self.subscribers.lock().unwrap();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}
