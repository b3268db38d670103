//! Registre des devices hébergés.

use std::collections::HashMap;
use std::sync::Arc;

use crate::devices::{Describable, DeviceError, DeviceInstance};

/// Registre indexé par UDN, ordre d'enregistrement préservé.
#[derive(Default)]
pub struct DeviceRegistry {
    devices: HashMap<String, Arc<DeviceInstance>>,
    order: Vec<String>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, device: Arc<DeviceInstance>) -> Result<(), DeviceError> {
        let key = device.udn().to_ascii_lowercase();
        if self.devices.contains_key(&key) {
            return Err(DeviceError::AlreadyRegistered(device.udn().to_string()));
        }
        self.order.push(key.clone());
        self.devices.insert(key, device);
        Ok(())
    }

    pub fn unregister(&mut self, udn: &str) -> Option<Arc<DeviceInstance>> {
        let key = udn.to_ascii_lowercase();
        self.order.retain(|entry| entry != &key);
        self.devices.remove(&key)
    }

    pub fn get_device(&self, udn: &str) -> Option<Arc<DeviceInstance>> {
        self.devices.get(&udn.to_ascii_lowercase()).cloned()
    }

    pub fn list_devices(&self) -> Vec<Arc<DeviceInstance>> {
        self.order
            .iter()
            .filter_map(|udn| self.devices.get(udn).cloned())
            .collect()
    }

    pub fn count(&self) -> usize {
        self.devices.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::Device;

    fn instance(udn: &str) -> Arc<DeviceInstance> {
        let device = Arc::new(Device::new("X", "Basic", "Test"));
        Arc::new(DeviceInstance::with_udn(device, udn.to_string()))
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = DeviceRegistry::new();
        registry.register(instance("uuid:one")).unwrap();
        registry.register(instance("uuid:two")).unwrap();

        assert_eq!(registry.count(), 2);
        assert!(registry.get_device("uuid:one").is_some());
        // UDN insensible à la casse
        assert!(registry.get_device("UUID:ONE").is_some());

        assert!(matches!(
            registry.register(instance("uuid:one")),
            Err(DeviceError::AlreadyRegistered(_))
        ));

        registry.unregister("uuid:one");
        assert_eq!(registry.count(), 1);
        assert!(registry.get_device("uuid:one").is_none());
    }
}
