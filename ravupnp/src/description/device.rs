//! Parsing du document de description de device.

use std::io::BufReader;
use std::sync::Arc;

use tracing::warn;
use url::Url;
use xmltree::Element;

use crate::description::icon::Icon;
use crate::errors::XmlError;
use crate::xml;

/// Un service annoncé dans un `<serviceList>`.
///
/// Les trois URLs sont résolues en absolu au parsing, par rapport à
/// l'URLBase du document ou à défaut à l'URL de la description.
#[derive(Debug, Clone)]
pub struct ServiceEntry {
    pub service_type: String,
    pub service_id: String,
    pub scpd_url: Url,
    pub control_url: Url,
    pub event_url: Url,
}

/// Un noeud `<device>` de l'arbre de description.
#[derive(Debug, Clone)]
pub struct DeviceNode {
    pub device_type: String,
    pub udn: String,
    pub friendly_name: String,
    pub manufacturer: String,
    pub manufacturer_url: Option<String>,
    pub model_description: Option<String>,
    pub model_name: String,
    pub model_number: Option<String>,
    pub model_url: Option<String>,
    pub serial_number: Option<String>,
    pub upc: Option<String>,
    pub presentation_url: Option<Url>,
    pub icons: Vec<Icon>,
    pub services: Vec<ServiceEntry>,
    pub sub_devices: Vec<Arc<DeviceNode>>,
}

/// Document de description parsé, enraciné sur le `<device>` racine.
#[derive(Debug, Clone)]
pub struct DeviceDescription {
    /// Base de résolution des URLs relatives
    pub base_url: Url,
    /// specVersion (major, minor)
    pub spec_version: (i64, i64),
    pub root: Arc<DeviceNode>,
}

impl DeviceDescription {
    /// Cherche un device par UDN dans tout l'arbre (`deviceList` récursifs).
    pub fn find_by_udn(&self, udn: &str) -> Option<Arc<DeviceNode>> {
        find_by_udn_in(&self.root, udn)
    }
}

fn find_by_udn_in(node: &Arc<DeviceNode>, udn: &str) -> Option<Arc<DeviceNode>> {
    if node.udn.eq_ignore_ascii_case(udn) {
        return Some(Arc::clone(node));
    }
    node.sub_devices
        .iter()
        .find_map(|sub| find_by_udn_in(sub, udn))
}

fn resolve_url(base: &Url, raw: &str) -> Option<Url> {
    match base.join(raw) {
        Ok(url) => Some(url),
        Err(e) => {
            warn!("Cannot resolve URL '{}' against {}: {}", raw, base, e);
            None
        }
    }
}

/// Parse un document de description de device.
///
/// `location` est l'URL d'où le document a été téléchargé ; elle sert de base
/// de résolution si le document ne porte pas d'`URLBase`.
pub fn parse_device_description(
    bytes: &[u8],
    location: &Url,
) -> Result<DeviceDescription, XmlError> {
    let reader = BufReader::new(bytes);
    let root = Element::parse(reader).map_err(XmlError::from)?;

    if root.name != "root" {
        return Err(XmlError::NoNode("root".to_string()));
    }

    let base_url = match xml::child_text(&root, "URLBase") {
        Some(raw) if !raw.trim().is_empty() => Url::parse(raw.trim())
            .map_err(|e| XmlError::ParseError(format!("invalid URLBase: {}", e)))?,
        _ => location.clone(),
    };

    let spec_version = xml::find_child(&root, "specVersion")
        .map(|spec| {
            (
                xml::child_int(spec, "major").unwrap_or(1),
                xml::child_int(spec, "minor").unwrap_or(0),
            )
        })
        .unwrap_or((1, 0));

    let device_elem = xml::find_child(&root, "device")
        .ok_or_else(|| XmlError::NoNode("device".to_string()))?;

    let root_node = parse_device_node(device_elem, &base_url)?;

    Ok(DeviceDescription {
        base_url,
        spec_version,
        root: Arc::new(root_node),
    })
}

fn parse_device_node(elem: &Element, base: &Url) -> Result<DeviceNode, XmlError> {
    let device_type = xml::child_text(elem, "deviceType")
        .ok_or_else(|| XmlError::NoNode("deviceType".to_string()))?;
    let udn =
        xml::child_text(elem, "UDN").ok_or_else(|| XmlError::NoNode("UDN".to_string()))?;

    let services = match xml::find_child(elem, "serviceList") {
        Some(list) => xml::children(list)
            .filter(|child| child.name == "service")
            .filter_map(|service| parse_service_entry(service, base))
            .collect(),
        None => Vec::new(),
    };

    let icons = match xml::find_child(elem, "iconList") {
        Some(list) => xml::children(list)
            .filter(|child| child.name == "icon")
            .filter_map(|icon| parse_icon(icon, base))
            .collect(),
        None => Vec::new(),
    };

    let sub_devices = match xml::find_child(elem, "deviceList") {
        Some(list) => {
            let mut subs = Vec::new();
            for child in xml::children(list).filter(|child| child.name == "device") {
                subs.push(Arc::new(parse_device_node(child, base)?));
            }
            subs
        }
        None => Vec::new(),
    };

    Ok(DeviceNode {
        device_type,
        udn,
        friendly_name: xml::child_text(elem, "friendlyName").unwrap_or_default(),
        manufacturer: xml::child_text(elem, "manufacturer").unwrap_or_default(),
        manufacturer_url: xml::child_text(elem, "manufacturerURL"),
        model_description: xml::child_text(elem, "modelDescription"),
        model_name: xml::child_text(elem, "modelName").unwrap_or_default(),
        model_number: xml::child_text(elem, "modelNumber"),
        model_url: xml::child_text(elem, "modelURL"),
        serial_number: xml::child_text(elem, "serialNumber"),
        upc: xml::child_text(elem, "UPC"),
        presentation_url: xml::child_text(elem, "presentationURL")
            .and_then(|raw| resolve_url(base, &raw)),
        icons,
        services,
        sub_devices,
    })
}

fn parse_service_entry(elem: &Element, base: &Url) -> Option<ServiceEntry> {
    let service_type = xml::child_text(elem, "serviceType")?;
    let service_id = xml::child_text(elem, "serviceId").unwrap_or_default();

    let scpd_url = resolve_url(base, &xml::child_text(elem, "SCPDURL")?)?;
    let control_url = resolve_url(base, &xml::child_text(elem, "controlURL")?)?;
    let event_url = resolve_url(base, &xml::child_text(elem, "eventSubURL")?)?;

    Some(ServiceEntry {
        service_type,
        service_id,
        scpd_url,
        control_url,
        event_url,
    })
}

fn parse_icon(elem: &Element, base: &Url) -> Option<Icon> {
    let url = resolve_url(base, &xml::child_text(elem, "url")?)?;

    Some(Icon {
        mime_type: xml::child_text(elem, "mimetype").unwrap_or_default(),
        width: xml::child_int(elem, "width").unwrap_or(0) as u32,
        height: xml::child_int(elem, "height").unwrap_or(0) as u32,
        depth: xml::child_int(elem, "depth").unwrap_or(0) as u32,
        url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const DESCRIPTION: &str = r#"<?xml version="1.0"?>
<root xmlns="urn:schemas-upnp-org:device-1-0">
  <specVersion><major>1</major><minor>0</minor></specVersion>
  <device>
    <deviceType>urn:schemas-upnp-org:device:MediaServer:1</deviceType>
    <friendlyName>Bibliothèque</friendlyName>
    <manufacturer>Rav</manufacturer>
    <modelName>RavServer</modelName>
    <UDN>uuid:11111111-2222-3333-4444-555555555555</UDN>
    <serviceList>
      <service>
        <serviceType>urn:schemas-upnp-org:service:ContentDirectory:1</serviceType>
        <serviceId>urn:upnp-org:serviceId:ContentDirectory</serviceId>
        <SCPDURL>/cd/desc.xml</SCPDURL>
        <controlURL>/cd/control</controlURL>
        <eventSubURL>/cd/event</eventSubURL>
      </service>
    </serviceList>
    <deviceList>
      <device>
        <deviceType>urn:schemas-upnp-org:device:Printer:1</deviceType>
        <friendlyName>Imprimante</friendlyName>
        <UDN>uuid:embedded-device</UDN>
      </device>
    </deviceList>
  </device>
</root>"#;

    fn location() -> Url {
        Url::parse("http://192.168.1.10:4004/desc.xml").unwrap()
    }

    #[test]
    fn test_parse_basic_description() {
        let doc = parse_device_description(DESCRIPTION.as_bytes(), &location()).unwrap();

        assert_eq!(doc.spec_version, (1, 0));
        assert_eq!(doc.root.friendly_name, "Bibliothèque");
        assert_eq!(
            doc.root.udn,
            "uuid:11111111-2222-3333-4444-555555555555"
        );
        assert_eq!(doc.root.services.len(), 1);

        let service = &doc.root.services[0];
        assert_eq!(
            service.control_url.as_str(),
            "http://192.168.1.10:4004/cd/control"
        );
    }

    #[test]
    fn test_url_base_overrides_location() {
        let with_base = DESCRIPTION.replace(
            "<device>",
            "<URLBase>http://10.0.0.1:9000/</URLBase><device>",
        );
        let doc = parse_device_description(with_base.as_bytes(), &location()).unwrap();

        let service = &doc.root.services[0];
        assert_eq!(
            service.event_url.as_str(),
            "http://10.0.0.1:9000/cd/event"
        );
    }

    #[test]
    fn test_find_by_udn_recurses_device_list() {
        let doc = parse_device_description(DESCRIPTION.as_bytes(), &location()).unwrap();

        let embedded = doc.find_by_udn("uuid:embedded-device").unwrap();
        assert_eq!(embedded.friendly_name, "Imprimante");

        // Insensible à la casse
        assert!(doc.find_by_udn("UUID:EMBEDDED-DEVICE").is_some());
        assert!(doc.find_by_udn("uuid:unknown").is_none());
    }

    #[test]
    fn test_missing_device_is_fatal() {
        let xml = r#"<root xmlns="urn:schemas-upnp-org:device-1-0"/>"#;
        assert!(matches!(
            parse_device_description(xml.as_bytes(), &location()),
            Err(XmlError::NoNode(_))
        ));
    }
}
