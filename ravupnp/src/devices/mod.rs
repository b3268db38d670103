//! Devices UPnP hébergés.
//!
//! Un [`Device`] est le modèle d'un device : identité, services, devices
//! embarqués. Une [`DeviceInstance`] le publie : document de description,
//! endpoints de ses services, entrée au registre.

mod instance;
mod registry;

use std::sync::Arc;

use xmltree::{Element, XMLNode};

use crate::object_set::Named;
use crate::services::{Service, ServiceError};

pub use instance::DeviceInstance;
pub use registry::DeviceRegistry;

/// Capacité commune aux devices hébergés et aux devices distants.
pub trait Describable {
    fn udn(&self) -> &str;
    fn device_type(&self) -> String;
    fn friendly_name(&self) -> &str;
}

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("device already registered: {0}")]
    AlreadyRegistered(String),

    #[error("URL registration failed: {0}")]
    UrlRegistrationError(String),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Icône embarquée d'un device hébergé.
///
/// `url` est le chemin relatif sous lequel l'application sert l'image.
#[derive(Debug, Clone)]
pub struct DeviceIcon {
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub url: String,
}

impl DeviceIcon {
    fn to_xml_element(&self) -> Element {
        let mut elem = Element::new("icon");
        for (name, content) in [
            ("mimetype", self.mime_type.clone()),
            ("width", self.width.to_string()),
            ("height", self.height.to_string()),
            ("depth", self.depth.to_string()),
            ("url", self.url.clone()),
        ] {
            let mut child = Element::new(name);
            child.children.push(XMLNode::Text(content));
            elem.children.push(XMLNode::Element(child));
        }
        elem
    }
}

/// Modèle d'un device UPnP.
#[derive(Debug, Clone)]
pub struct Device {
    name: String,
    type_name: String,
    version: u32,
    friendly_name: String,
    manufacturer: String,
    manufacturer_url: Option<String>,
    model_description: Option<String>,
    model_name: String,
    model_number: Option<String>,
    model_url: Option<String>,
    serial_number: Option<String>,
    upc: Option<String>,
    presentation_url: Option<String>,
    icons: Vec<DeviceIcon>,
    services: Vec<Arc<Service>>,
    sub_devices: Vec<Arc<Device>>,
}

impl Named for Device {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Device {
    /// Crée un device.
    ///
    /// * `name` - segment de route (ex: "MediaRenderer")
    /// * `type_name` - segment de type UPnP (ex: "MediaRenderer")
    /// * `friendly_name` - nom affiché aux utilisateurs
    pub fn new(
        name: impl Into<String>,
        type_name: impl Into<String>,
        friendly_name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            version: 1,
            friendly_name: friendly_name.into(),
            manufacturer: String::new(),
            manufacturer_url: None,
            model_description: None,
            model_name: String::new(),
            model_number: None,
            model_url: None,
            serial_number: None,
            upc: None,
            presentation_url: None,
            icons: Vec::new(),
            services: Vec::new(),
            sub_devices: Vec::new(),
        }
    }

    pub fn set_version(&mut self, version: u32) {
        self.version = version.max(1);
    }

    pub fn set_manufacturer(&mut self, manufacturer: impl Into<String>) {
        self.manufacturer = manufacturer.into();
    }

    pub fn set_manufacturer_url(&mut self, url: impl Into<String>) {
        self.manufacturer_url = Some(url.into());
    }

    pub fn set_model_description(&mut self, description: impl Into<String>) {
        self.model_description = Some(description.into());
    }

    pub fn set_model_name(&mut self, model_name: impl Into<String>) {
        self.model_name = model_name.into();
    }

    pub fn set_model_number(&mut self, model_number: impl Into<String>) {
        self.model_number = Some(model_number.into());
    }

    pub fn set_model_url(&mut self, url: impl Into<String>) {
        self.model_url = Some(url.into());
    }

    pub fn set_serial_number(&mut self, serial: impl Into<String>) {
        self.serial_number = Some(serial.into());
    }

    pub fn set_upc(&mut self, upc: impl Into<String>) {
        self.upc = Some(upc.into());
    }

    pub fn set_presentation_url(&mut self, url: impl Into<String>) {
        self.presentation_url = Some(url.into());
    }

    pub fn add_icon(&mut self, icon: DeviceIcon) {
        self.icons.push(icon);
    }

    pub fn add_service(&mut self, service: Arc<Service>) {
        self.services.push(service);
    }

    pub fn add_sub_device(&mut self, device: Arc<Device>) {
        self.sub_devices.push(device);
    }

    pub fn friendly_name(&self) -> &str {
        &self.friendly_name
    }

    pub fn manufacturer(&self) -> &str {
        &self.manufacturer
    }

    pub fn manufacturer_url(&self) -> Option<&str> {
        self.manufacturer_url.as_deref()
    }

    pub fn model_description(&self) -> Option<&str> {
        self.model_description.as_deref()
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn model_number(&self) -> Option<&str> {
        self.model_number.as_deref()
    }

    pub fn model_url(&self) -> Option<&str> {
        self.model_url.as_deref()
    }

    pub fn serial_number(&self) -> Option<&str> {
        self.serial_number.as_deref()
    }

    pub fn upc(&self) -> Option<&str> {
        self.upc.as_deref()
    }

    pub fn presentation_url(&self) -> Option<&str> {
        self.presentation_url.as_deref()
    }

    /// Type de device.
    ///
    /// Format : `urn:schemas-upnp-org:device:{type}:{version}`
    pub fn device_type(&self) -> String {
        format!(
            "urn:schemas-upnp-org:device:{}:{}",
            self.type_name, self.version
        )
    }

    pub fn services(&self) -> &[Arc<Service>] {
        &self.services
    }

    pub fn sub_devices(&self) -> &[Arc<Device>] {
        &self.sub_devices
    }

    pub fn icons(&self) -> &[DeviceIcon] {
        &self.icons
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_type_format() {
        let mut device = Device::new("TV", "MediaRenderer", "Salon");
        assert_eq!(
            device.device_type(),
            "urn:schemas-upnp-org:device:MediaRenderer:1"
        );
        device.set_version(2);
        assert_eq!(
            device.device_type(),
            "urn:schemas-upnp-org:device:MediaRenderer:2"
        );
    }
}
