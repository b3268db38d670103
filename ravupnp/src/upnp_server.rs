//! Extension UPnP pour ravserver.
//!
//! Le trait [`UpnpServerExt`] étend `ravserver::Server` avec l'hébergement de
//! devices UPnP : enregistrement des devices et de leurs endpoints, accès au
//! registre, installation de la politique d'accès du contexte.

use std::future::Future;
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;
use ravserver::Server;
use tracing::info;

use crate::acl::{self, Acl};
use crate::devices::{Describable, Device, DeviceError, DeviceInstance, DeviceRegistry};
use crate::server::UpnpServer;

/// Registre de devices global et thread-safe.
///
/// Les handlers Axum s'exécutent dans des tâches différentes ; le registre
/// partagé leur donne accès aux devices du process.
static DEVICE_REGISTRY: Lazy<RwLock<DeviceRegistry>> =
    Lazy::new(|| RwLock::new(DeviceRegistry::new()));

/// Trait d'extension UPnP pour un serveur web.
pub trait UpnpServerExt {
    /// Enregistre un device UPnP et toutes ses URLs.
    ///
    /// Retourne l'instance créée et enregistrée.
    fn register_device(
        &mut self,
        device: Arc<Device>,
    ) -> impl Future<Output = Result<Arc<DeviceInstance>, DeviceError>> + Send;

    /// Enregistre un device avec un UDN stable fourni par l'application.
    fn register_device_with_udn(
        &mut self,
        device: Arc<Device>,
        udn: String,
    ) -> impl Future<Output = Result<Arc<DeviceInstance>, DeviceError>> + Send;

    /// Nombre de devices enregistrés.
    fn device_count(&self) -> usize;

    /// Liste des devices enregistrés.
    fn list_devices(&self) -> Vec<Arc<DeviceInstance>>;

    /// Device par UDN.
    fn get_device(&self, udn: &str) -> Option<Arc<DeviceInstance>>;

    /// Installe la politique d'accès partagée par tous les services du
    /// contexte.
    fn set_acl(&self, acl: Arc<dyn Acl>);
}

impl UpnpServerExt for Server {
    async fn register_device(
        &mut self,
        device: Arc<Device>,
    ) -> Result<Arc<DeviceInstance>, DeviceError> {
        let instance = Arc::new(DeviceInstance::new(device));
        register_instance(self, instance).await
    }

    async fn register_device_with_udn(
        &mut self,
        device: Arc<Device>,
        udn: String,
    ) -> Result<Arc<DeviceInstance>, DeviceError> {
        let instance = Arc::new(DeviceInstance::with_udn(device, udn));
        register_instance(self, instance).await
    }

    fn device_count(&self) -> usize {
        DEVICE_REGISTRY.read().unwrap().count()
    }

    fn list_devices(&self) -> Vec<Arc<DeviceInstance>> {
        DEVICE_REGISTRY.read().unwrap().list_devices()
    }

    fn get_device(&self, udn: &str) -> Option<Arc<DeviceInstance>> {
        DEVICE_REGISTRY.read().unwrap().get_device(udn)
    }

    fn set_acl(&self, acl: Arc<dyn Acl>) {
        acl::set_context_acl(acl);
    }
}

async fn register_instance(
    server: &mut Server,
    instance: Arc<DeviceInstance>,
) -> Result<Arc<DeviceInstance>, DeviceError> {
    instance.register_urls(server).await?;

    DEVICE_REGISTRY
        .write()
        .unwrap()
        .register(Arc::clone(&instance))?;

    info!(udn = instance.udn(), "🎛️ Device registered");
    Ok(instance)
}

/// Exécute une closure avec la liste des devices enregistrés.
pub fn with_devices<F, R>(f: F) -> R
where
    F: FnOnce(&Vec<Arc<DeviceInstance>>) -> R,
{
    let devices = DEVICE_REGISTRY.read().unwrap().list_devices();
    f(&devices)
}

/// Device par UDN, accessible hors de tout handle serveur.
pub fn get_device_by_udn(udn: &str) -> Option<Arc<DeviceInstance>> {
    DEVICE_REGISTRY.read().unwrap().get_device(udn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_device_registration() {
        let mut server = Server::new("TestServer", "127.0.0.1", 0);

        let device = Arc::new(Device::new("Light", "BinaryLight", "Test Light"));
        let instance = server
            .register_device_with_udn(device, "uuid:upnp-server-test-light".to_string())
            .await
            .unwrap();

        let retrieved = server.get_device(instance.udn());
        assert!(retrieved.is_some());

        DEVICE_REGISTRY.write().unwrap().unregister(instance.udn());
    }
}
