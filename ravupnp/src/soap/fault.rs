//! SOAP Faults pour UPnP.

use xmltree::{Element, EmitterConfig, XMLNode};

use super::{SOAP_ENVELOPE_NS, SoapBody, UPNP_CONTROL_NS};
use crate::errors::ControlError;
use crate::xml;

/// Erreur SOAP (Fault).
#[derive(Debug, Clone)]
pub struct SoapFault {
    /// Code du fault (ex: "s:Client")
    pub fault_code: String,

    /// Message du fault ("UPnPError" pour les erreurs de contrôle)
    pub fault_string: String,

    /// Détail UPnP, si présent et bien formé
    pub upnp_error: Option<ControlError>,
}

impl SoapFault {
    /// Extrait un Fault du corps d'une enveloppe, s'il y en a un.
    pub fn from_body(body: &SoapBody) -> Option<SoapFault> {
        let fault_elem = xml::children(&body.content).find(|e| e.name == "Fault")?;

        let fault_code = xml::child_text(fault_elem, "faultcode").unwrap_or_default();
        let fault_string = xml::child_text(fault_elem, "faultstring").unwrap_or_default();

        let upnp_error = xml::find_path(fault_elem, &["detail", "UPnPError"]).and_then(|detail| {
            let code = xml::child_int(detail, "errorCode")?;
            let code = u32::try_from(code).ok()?;
            let description = xml::child_text(detail, "errorDescription").unwrap_or_default();
            Some(ControlError::new(code, description))
        });

        Some(SoapFault {
            fault_code,
            fault_string,
            upnp_error,
        })
    }
}

fn text_element(name: &str, content: &str) -> Element {
    let mut elem = Element::new(name);
    elem.children.push(XMLNode::Text(content.to_string()));
    elem
}

/// Construit l'enveloppe complète d'un SOAP Fault UPnP.
///
/// `faultcode` est toujours `s:Client` et `faultstring` `UPnPError` ; le
/// détail porte le code et la description dans le namespace
/// `urn:schemas-upnp-org:control-1-0`.
pub fn build_soap_fault(error_code: u32, error_description: &str) -> String {
    let mut upnp_error = Element::new("UPnPError");
    upnp_error
        .attributes
        .insert("xmlns".to_string(), UPNP_CONTROL_NS.to_string());
    upnp_error
        .children
        .push(XMLNode::Element(text_element("errorCode", &error_code.to_string())));
    upnp_error
        .children
        .push(XMLNode::Element(text_element("errorDescription", error_description)));

    let mut detail = Element::new("detail");
    detail.children.push(XMLNode::Element(upnp_error));

    let mut fault = Element::new("s:Fault");
    fault
        .children
        .push(XMLNode::Element(text_element("faultcode", "s:Client")));
    fault
        .children
        .push(XMLNode::Element(text_element("faultstring", "UPnPError")));
    fault.children.push(XMLNode::Element(detail));

    let mut body = Element::new("s:Body");
    body.children.push(XMLNode::Element(fault));

    let mut envelope = Element::new("s:Envelope");
    envelope
        .attributes
        .insert("xmlns:s".to_string(), SOAP_ENVELOPE_NS.to_string());
    envelope.children.push(XMLNode::Element(body));

    let mut buf = Vec::new();
    let config = EmitterConfig::new().write_document_declaration(true);
    envelope
        .write_with_config(&mut buf, config)
        .expect("fault serialization cannot fail");

    String::from_utf8(buf).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::soap::parse_soap_envelope;

    #[test]
    fn test_build_and_parse_fault() {
        let xml = build_soap_fault(401, "Invalid Action");

        assert!(xml.contains("<faultcode>s:Client</faultcode>"));
        assert!(xml.contains("<faultstring>UPnPError</faultstring>"));
        assert!(xml.contains("urn:schemas-upnp-org:control-1-0"));

        let envelope = parse_soap_envelope(xml.as_bytes()).unwrap();
        let fault = SoapFault::from_body(&envelope.body).unwrap();
        assert_eq!(fault.fault_code, "s:Client");
        let error = fault.upnp_error.unwrap();
        assert_eq!(error.code, 401);
        assert_eq!(error.description, "Invalid Action");
    }

    #[test]
    fn test_malformed_fault_has_no_upnp_error() {
        let xml = r#"<?xml version="1.0"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
  <s:Body>
    <s:Fault>
      <faultcode>s:Client</faultcode>
      <faultstring>UPnPError</faultstring>
      <detail><UPnPError><errorCode>oops</errorCode></UPnPError></detail>
    </s:Fault>
  </s:Body>
</s:Envelope>"#;

        let envelope = parse_soap_envelope(xml.as_bytes()).unwrap();
        let fault = SoapFault::from_body(&envelope.body).unwrap();
        assert!(fault.upnp_error.is_none());
    }

    #[test]
    fn test_no_fault_in_regular_body() {
        let xml = r#"<?xml version="1.0"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
  <s:Body><u:PlayResponse xmlns:u="urn:x"/></s:Body>
</s:Envelope>"#;

        let envelope = parse_soap_envelope(xml.as_bytes()).unwrap();
        assert!(SoapFault::from_body(&envelope.body).is_none());
    }
}
