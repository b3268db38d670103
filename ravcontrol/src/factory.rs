//! Resource factory.
//!
//! Process-wide registry mapping exact device/service type URNs to builders
//! producing application proxies, so applications can attach behavior to the
//! types they know. Unregistered types get the generic
//! [`DeviceProxy`]/[`ServiceProxy`]. Registration is additive and the last
//! registration for a given type wins.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;

use crate::device_info::DeviceInfo;
use crate::proxy::{DeviceProxy, ServiceProxy};

/// Application-visible service proxy: either the generic proxy or a wrapper
/// built by a registered builder.
pub trait ServiceProxyLike: Send + Sync {
    fn proxy(&self) -> &ServiceProxy;
}

impl ServiceProxyLike for ServiceProxy {
    fn proxy(&self) -> &ServiceProxy {
        self
    }
}

/// Application-visible device proxy.
pub trait DeviceProxyLike: Send + Sync {
    fn proxy(&self) -> &DeviceProxy;
}

impl DeviceProxyLike for DeviceProxy {
    fn proxy(&self) -> &DeviceProxy {
        self
    }
}

pub type ServiceProxyBuilder = Arc<dyn Fn(ServiceProxy) -> Arc<dyn ServiceProxyLike> + Send + Sync>;
pub type DeviceProxyBuilder = Arc<dyn Fn(DeviceProxy) -> Arc<dyn DeviceProxyLike> + Send + Sync>;

/// Registry of proxy builders keyed by exact type URN.
pub struct ResourceFactory {
    services: RwLock<HashMap<String, ServiceProxyBuilder>>,
    devices: RwLock<HashMap<String, DeviceProxyBuilder>>,
}

static GLOBAL_FACTORY: Lazy<ResourceFactory> = Lazy::new(ResourceFactory::new);

impl ResourceFactory {
    fn new() -> Self {
        Self {
            services: RwLock::new(HashMap::new()),
            devices: RwLock::new(HashMap::new()),
        }
    }

    /// The process-wide factory.
    pub fn global() -> &'static ResourceFactory {
        &GLOBAL_FACTORY
    }

    /// Registers a builder for a service type. Replaces any previous
    /// registration for the same URN.
    pub fn register_service_type(&self, urn: impl Into<String>, builder: ServiceProxyBuilder) {
        self.services.write().unwrap().insert(urn.into(), builder);
    }

    /// Registers a builder for a device type.
    pub fn register_device_type(&self, urn: impl Into<String>, builder: DeviceProxyBuilder) {
        self.devices.write().unwrap().insert(urn.into(), builder);
    }

    /// Builds the application proxy for a service.
    pub fn build_service_proxy(&self, proxy: ServiceProxy) -> Arc<dyn ServiceProxyLike> {
        let builder = self
            .services
            .read()
            .unwrap()
            .get(proxy.service_type())
            .cloned();
        match builder {
            Some(builder) => builder(proxy),
            None => Arc::new(proxy),
        }
    }

    /// Builds the application proxy for a device.
    pub fn build_device_proxy(&self, info: DeviceInfo) -> Arc<dyn DeviceProxyLike> {
        use ravupnp::devices::Describable;

        let device_type = info.device_type();
        let proxy = DeviceProxy::new(info);
        let builder = self.devices.read().unwrap().get(&device_type).cloned();
        match builder {
            Some(builder) => builder(proxy),
            None => Arc::new(proxy),
        }
    }
}
