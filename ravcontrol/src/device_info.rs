//! Remote device and service descriptions.

use std::sync::Arc;
use std::time::Duration;

use url::Url;

use ravupnp::description::{
    DeviceDescription, DeviceNode, Icon, IconSpec, ServiceEntry, parse_device_description,
    select_icon,
};
use ravupnp::devices::Describable;
use ravupnp::errors::UpnpError;

use crate::cancel::CancelToken;
use crate::introspection::{ServiceIntrospection, fetch_scpd};
use crate::soap_client::{build_agent, map_transport_error};

/// Downloads and parses a device description document.
///
/// The description URL itself is the base for relative URLs unless the
/// document carries an `URLBase`.
pub fn fetch_device_description(
    location: &Url,
    timeout: Duration,
) -> Result<Arc<DeviceDescription>, UpnpError> {
    let agent = build_agent(timeout);
    let mut response = agent
        .get(location.as_str())
        .call()
        .map_err(map_transport_error)?;

    if !response.status().is_success() {
        return Err(UpnpError::Server(
            ravupnp::errors::ServerError::from_status(
                response.status().as_u16(),
                response.status().canonical_reason().unwrap_or(""),
            ),
        ));
    }

    let body = response
        .body_mut()
        .read_to_string()
        .map_err(map_transport_error)?;

    let description = parse_device_description(body.as_bytes(), location)?;
    Ok(Arc::new(description))
}

/// A device seen through its fetched description.
///
/// Cheap to clone: the parsed document is shared, the info only points at one
/// `<device>` node inside it.
#[derive(Clone)]
pub struct DeviceInfo {
    doc: Arc<DeviceDescription>,
    node: Arc<DeviceNode>,
}

impl DeviceInfo {
    /// Info on the root device of a description.
    pub fn root(doc: Arc<DeviceDescription>) -> Self {
        let node = Arc::clone(&doc.root);
        Self { doc, node }
    }

    /// Info on the device carrying `udn`, anywhere in the description tree.
    pub fn find(doc: Arc<DeviceDescription>, udn: &str) -> Option<Self> {
        let node = doc.find_by_udn(udn)?;
        Some(Self { doc, node })
    }

    pub fn description(&self) -> &Arc<DeviceDescription> {
        &self.doc
    }

    pub fn location(&self) -> &Url {
        &self.doc.base_url
    }

    pub fn manufacturer(&self) -> &str {
        &self.node.manufacturer
    }

    pub fn model_name(&self) -> &str {
        &self.node.model_name
    }

    pub fn icons(&self) -> &[Icon] {
        &self.node.icons
    }

    /// Picks an icon URL matching the given constraints.
    pub fn icon_url(&self, spec: &IconSpec) -> Option<Url> {
        select_icon(&self.node.icons, spec).map(|icon| icon.url.clone())
    }

    /// Services declared directly on this device node.
    pub fn services(&self) -> Vec<ServiceInfo> {
        self.node
            .services
            .iter()
            .map(|entry| ServiceInfo {
                device_udn: self.node.udn.clone(),
                entry: entry.clone(),
            })
            .collect()
    }

    pub fn service_by_type(&self, service_type: &str) -> Option<ServiceInfo> {
        self.services()
            .into_iter()
            .find(|service| service.service_type() == service_type)
    }

    /// Embedded devices, one level down.
    pub fn sub_devices(&self) -> Vec<DeviceInfo> {
        self.node
            .sub_devices
            .iter()
            .map(|sub| DeviceInfo {
                doc: Arc::clone(&self.doc),
                node: Arc::clone(sub),
            })
            .collect()
    }
}

impl Describable for DeviceInfo {
    fn udn(&self) -> &str {
        &self.node.udn
    }

    fn device_type(&self) -> String {
        self.node.device_type.clone()
    }

    fn friendly_name(&self) -> &str {
        &self.node.friendly_name
    }
}

impl std::fmt::Debug for DeviceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceInfo")
            .field("udn", &self.node.udn)
            .field("device_type", &self.node.device_type)
            .finish()
    }
}

/// A service seen through its device description entry.
#[derive(Debug, Clone)]
pub struct ServiceInfo {
    device_udn: String,
    entry: ServiceEntry,
}

impl ServiceInfo {
    pub fn new(device_udn: String, entry: ServiceEntry) -> Self {
        Self { device_udn, entry }
    }

    pub fn device_udn(&self) -> &str {
        &self.device_udn
    }

    pub fn service_type(&self) -> &str {
        &self.entry.service_type
    }

    pub fn service_id(&self) -> &str {
        &self.entry.service_id
    }

    pub fn control_url(&self) -> &Url {
        &self.entry.control_url
    }

    pub fn event_url(&self) -> &Url {
        &self.entry.event_url
    }

    pub fn scpd_url(&self) -> &Url {
        &self.entry.scpd_url
    }

    /// Downloads the SCPD and returns the typed action/variable model.
    pub fn introspect(
        &self,
        cancel: &CancelToken,
        timeout: Duration,
    ) -> Result<ServiceIntrospection, UpnpError> {
        fetch_scpd(self.entry.scpd_url.clone(), cancel, timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DESCRIPTION: &str = r#"<?xml version="1.0"?>
<root xmlns="urn:schemas-upnp-org:device-1-0">
  <specVersion><major>1</major><minor>0</minor></specVersion>
  <device>
    <deviceType>urn:schemas-upnp-org:device:MediaRenderer:1</deviceType>
    <friendlyName>Living room</friendlyName>
    <manufacturer>Rav</manufacturer>
    <modelName>RavRenderer</modelName>
    <UDN>uuid:root-device</UDN>
    <iconList>
      <icon>
        <mimetype>image/png</mimetype>
        <width>48</width><height>48</height><depth>24</depth>
        <url>/icons/48.png</url>
      </icon>
      <icon>
        <mimetype>image/png</mimetype>
        <width>120</width><height>120</height><depth>24</depth>
        <url>/icons/120.png</url>
      </icon>
    </iconList>
    <serviceList>
      <service>
        <serviceType>urn:schemas-upnp-org:service:RenderingControl:1</serviceType>
        <serviceId>urn:upnp-org:serviceId:RenderingControl</serviceId>
        <SCPDURL>/rc/desc.xml</SCPDURL>
        <controlURL>/rc/control</controlURL>
        <eventSubURL>/rc/event</eventSubURL>
      </service>
    </serviceList>
  </device>
</root>"#;

    fn info() -> DeviceInfo {
        let location = Url::parse("http://192.168.1.20:9000/desc.xml").unwrap();
        let doc = parse_device_description(DESCRIPTION.as_bytes(), &location).unwrap();
        DeviceInfo::root(Arc::new(doc))
    }

    #[test]
    fn test_accessors() {
        let info = info();
        assert_eq!(info.udn(), "uuid:root-device");
        assert_eq!(
            info.device_type(),
            "urn:schemas-upnp-org:device:MediaRenderer:1"
        );
        assert_eq!(info.friendly_name(), "Living room");
    }

    #[test]
    fn test_services_carry_resolved_urls() {
        let info = info();
        let services = info.services();
        assert_eq!(services.len(), 1);

        let service = &services[0];
        assert_eq!(service.device_udn(), "uuid:root-device");
        assert_eq!(
            service.control_url().as_str(),
            "http://192.168.1.20:9000/rc/control"
        );
        assert_eq!(
            service.event_url().as_str(),
            "http://192.168.1.20:9000/rc/event"
        );
    }

    #[test]
    fn test_icon_url_selection() {
        let info = info();
        let spec = IconSpec {
            prefer_bigger: true,
            ..Default::default()
        };
        assert_eq!(
            info.icon_url(&spec).unwrap().as_str(),
            "http://192.168.1.20:9000/icons/120.png"
        );
    }
}
