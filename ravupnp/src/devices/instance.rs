//! Implémentation de DeviceInstance.

use std::sync::{Arc, RwLock};

use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use tracing::info;
use uuid::Uuid;
use xmltree::{Element, EmitterConfig, XMLNode};

use crate::description::DEVICE_SCHEMA_NS;
use crate::devices::{Describable, Device, DeviceError};
use crate::object_set::Named;
use crate::server::UpnpServer;
use crate::services::ServiceInstance;

fn text_element(name: &str, content: &str) -> Element {
    let mut elem = Element::new(name);
    elem.children.push(XMLNode::Text(content.to_string()));
    elem
}

/// Instance d'un device hébergé.
///
/// Porte l'UDN, les instances de services et les devices embarqués ; publie
/// le document de description et enregistre récursivement les endpoints des
/// services.
pub struct DeviceInstance {
    model: Arc<Device>,
    udn: String,
    route: String,
    services: Vec<ServiceInstance>,
    sub_devices: Vec<Arc<DeviceInstance>>,
    base_url: RwLock<String>,
}

impl std::fmt::Debug for DeviceInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceInstance")
            .field("udn", &self.udn)
            .field("route", &self.route)
            .field("services", &self.services.len())
            .finish()
    }
}

impl DeviceInstance {
    /// Crée une instance avec un UDN fraîchement tiré.
    pub fn new(model: Arc<Device>) -> Self {
        Self::with_udn(model, format!("uuid:{}", Uuid::new_v4()))
    }

    /// Crée une instance avec un UDN stable fourni par l'application.
    ///
    /// Un device doit garder le même UDN d'un démarrage à l'autre pour que
    /// les points de contrôle le reconnaissent.
    pub fn with_udn(model: Arc<Device>, udn: String) -> Self {
        Self::build(model, udn, "")
    }

    fn build(model: Arc<Device>, udn: String, parent_route: &str) -> Self {
        let route = format!("{}/device/{}", parent_route, model.name());

        let services: Vec<ServiceInstance> = model
            .services()
            .iter()
            .map(|service| {
                let instance = ServiceInstance::new(Arc::clone(service));
                instance.set_device(&route, &udn);
                instance
            })
            .collect();

        let sub_devices = model
            .sub_devices()
            .iter()
            .map(|sub| {
                // Chaque device embarqué reçoit son propre UDN
                let sub_udn = format!("uuid:{}", Uuid::new_v4());
                Arc::new(Self::build(Arc::clone(sub), sub_udn, &route))
            })
            .collect();

        Self {
            model,
            udn,
            route,
            services,
            sub_devices,
            base_url: RwLock::new(String::new()),
        }
    }

    pub fn model(&self) -> &Arc<Device> {
        &self.model
    }

    pub fn get_name(&self) -> &str {
        self.model.name()
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    /// Route du document de description (device racine).
    pub fn description_route(&self) -> String {
        format!("{}/description.xml", self.route)
    }

    pub fn base_url(&self) -> String {
        self.base_url.read().unwrap().clone()
    }

    pub fn set_server_base_url(&self, base_url: impl Into<String>) {
        *self.base_url.write().unwrap() = base_url.into();
    }

    pub fn services(&self) -> &[ServiceInstance] {
        &self.services
    }

    pub fn sub_devices(&self) -> &[Arc<DeviceInstance>] {
        &self.sub_devices
    }

    /// Service par nom, sur ce device uniquement.
    pub fn get_service(&self, name: &str) -> Option<&ServiceInstance> {
        self.services
            .iter()
            .find(|service| service.get_name() == name)
    }

    /// Enregistre la description et tous les endpoints de services.
    pub async fn register_urls<S: UpnpServer + ?Sized>(
        &self,
        server: &mut S,
    ) -> Result<(), DeviceError> {
        self.set_server_base_url(server.base_url());

        let description = match self.description_xml() {
            Ok(xml) => Arc::new(xml),
            Err(e) => {
                return Err(DeviceError::UrlRegistrationError(format!(
                    "cannot serialize description: {}",
                    e
                )));
            }
        };

        info!(
            "✅ Device description for {} available at : {}{}",
            self.get_name(),
            server.base_url(),
            self.description_route(),
        );

        let body = Arc::clone(&description);
        server
            .add_handler(&self.description_route(), move || {
                let body = Arc::clone(&body);
                async move {
                    (
                        StatusCode::OK,
                        [(header::CONTENT_TYPE, "text/xml; charset=\"utf-8\"")],
                        body.as_ref().clone(),
                    )
                        .into_response()
                }
            })
            .await;

        self.register_service_urls(server).await
    }

    fn register_service_urls<'a, S: UpnpServer + ?Sized>(
        &'a self,
        server: &'a mut S,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<(), DeviceError>> + Send + 'a>,
    > {
        Box::pin(async move {
            for service in &self.services {
                service.register_urls(server).await?;
            }
            for sub in &self.sub_devices {
                sub.register_service_urls(server).await?;
            }
            Ok(())
        })
    }

    /// Élément `<device>` avec ses services et devices embarqués.
    fn device_element(&self) -> Element {
        let mut elem = Element::new("device");

        elem.children
            .push(XMLNode::Element(text_element("deviceType", &self.device_type())));
        elem.children.push(XMLNode::Element(text_element(
            "friendlyName",
            self.model.friendly_name(),
        )));

        let model = &self.model;
        let optional = [
            ("manufacturer", Some(model.manufacturer().to_string())),
            ("manufacturerURL", model.manufacturer_url().map(String::from)),
            (
                "modelDescription",
                model.model_description().map(String::from),
            ),
            ("modelName", Some(model.model_name().to_string())),
            ("modelNumber", model.model_number().map(String::from)),
            ("modelURL", model.model_url().map(String::from)),
            ("serialNumber", model.serial_number().map(String::from)),
            ("UDN", Some(self.udn.clone())),
            ("UPC", model.upc().map(String::from)),
            ("presentationURL", model.presentation_url().map(String::from)),
        ];
        for (name, content) in optional {
            if let Some(content) = content {
                elem.children
                    .push(XMLNode::Element(text_element(name, &content)));
            }
        }

        if !model.icons().is_empty() {
            let mut list = Element::new("iconList");
            for icon in model.icons() {
                list.children.push(XMLNode::Element(icon.to_xml_element()));
            }
            elem.children.push(XMLNode::Element(list));
        }

        if !self.services.is_empty() {
            let mut list = Element::new("serviceList");
            for service in &self.services {
                list.children.push(XMLNode::Element(service.to_xml_element()));
            }
            elem.children.push(XMLNode::Element(list));
        }

        if !self.sub_devices.is_empty() {
            let mut list = Element::new("deviceList");
            for sub in &self.sub_devices {
                list.children.push(XMLNode::Element(sub.device_element()));
            }
            elem.children.push(XMLNode::Element(list));
        }

        elem
    }

    /// Document de description complet (`<root>`).
    pub fn description_element(&self) -> Element {
        let mut root = Element::new("root");
        root.attributes
            .insert("xmlns".to_string(), DEVICE_SCHEMA_NS.to_string());

        let mut spec = Element::new("specVersion");
        spec.children.push(XMLNode::Element(text_element("major", "1")));
        spec.children.push(XMLNode::Element(text_element("minor", "0")));
        root.children.push(XMLNode::Element(spec));

        root.children.push(XMLNode::Element(self.device_element()));
        root
    }

    pub fn description_xml(&self) -> Result<String, xmltree::Error> {
        let config = EmitterConfig::new().write_document_declaration(true);
        let mut buf = Vec::new();
        self.description_element().write_with_config(&mut buf, config)?;
        Ok(String::from_utf8_lossy(&buf).to_string())
    }
}

impl Describable for DeviceInstance {
    fn udn(&self) -> &str {
        &self.udn
    }

    fn device_type(&self) -> String {
        self.model.device_type()
    }

    fn friendly_name(&self) -> &str {
        self.model.friendly_name()
    }
}
