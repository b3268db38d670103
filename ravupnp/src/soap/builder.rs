//! Construction de requêtes et réponses SOAP.
//!
//! Les corps sont construits dans un buffer `String` réutilisable. Le préfixe
//! d'enveloppe est émis une fois, la position de l'élément d'action est
//! retournée par [`begin_envelope`] : l'ouverture `<u:Action xmlns:u="...">`
//! n'est insérée qu'au moment de l'envoi, ce qui permet de ré-émettre la même
//! requête sans re-sérialiser les arguments.

use super::{SOAP_ENCODING, SOAP_ENVELOPE_NS};
use crate::xml;

/// Émet le préfixe d'enveloppe et retourne la position d'insertion de
/// l'élément d'action.
pub fn begin_envelope(buf: &mut String) -> usize {
    buf.push_str("<?xml version=\"1.0\"?>");
    buf.push_str("<s:Envelope xmlns:s=\"");
    buf.push_str(SOAP_ENVELOPE_NS);
    buf.push_str("\" s:encodingStyle=\"");
    buf.push_str(SOAP_ENCODING);
    buf.push_str("\"><s:Body>");
    buf.len()
}

/// Émet une paire nom/valeur d'argument.
pub fn append_argument(buf: &mut String, name: &str, value: &str) {
    xml::start_element(buf, name);
    xml::append_escaped(buf, value);
    xml::end_element(buf, name);
}

/// Clôt l'élément d'action et l'enveloppe.
pub fn end_envelope(buf: &mut String, action_name: &str) {
    buf.push_str("</u:");
    buf.push_str(action_name);
    buf.push('>');
    buf.push_str("</s:Body></s:Envelope>");
}

/// Balise ouvrante de l'élément d'action, avec le namespace du service.
pub fn action_open_tag(action_name: &str, service_urn: &str) -> String {
    format!("<u:{} xmlns:u=\"{}\">", action_name, service_urn)
}

/// Construit une requête SOAP complète.
///
/// Les arguments sont sérialisés dans l'ordre fourni.
pub fn build_soap_request(
    service_urn: &str,
    action: &str,
    args: &[(&str, &str)],
) -> String {
    let mut buf = String::new();
    let header_pos = begin_envelope(&mut buf);
    for (name, value) in args {
        append_argument(&mut buf, name, value);
    }
    end_envelope(&mut buf, action);
    buf.insert_str(header_pos, &action_open_tag(action, service_urn));
    buf
}

/// Construit une réponse SOAP de succès.
///
/// Format : `<u:{Action}Response xmlns:u="{urn}">OUTARG*</u:{Action}Response>`
/// dans une enveloppe standard.
pub fn build_soap_response(
    service_urn: &str,
    action: &str,
    values: &[(&str, &str)],
) -> String {
    let response_name = format!("{}Response", action);
    let mut buf = String::new();
    let header_pos = begin_envelope(&mut buf);
    for (name, value) in values {
        append_argument(&mut buf, name, value);
    }
    end_envelope(&mut buf, &response_name);
    buf.insert_str(header_pos, &action_open_tag(&response_name, service_urn));
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::soap::parse_soap_action;

    #[test]
    fn test_build_request_round_trips() {
        let xml = build_soap_request(
            "urn:schemas-upnp-org:service:AVTransport:1",
            "Play",
            &[("InstanceID", "0"), ("Speed", "1")],
        );

        let action = parse_soap_action(xml.as_bytes()).unwrap();
        assert_eq!(action.name, "Play");
        assert_eq!(
            action.namespace.as_deref(),
            Some("urn:schemas-upnp-org:service:AVTransport:1")
        );
        assert_eq!(action.arg("InstanceID"), Some("0"));
        assert_eq!(action.arg("Speed"), Some("1"));
    }

    #[test]
    fn test_arguments_are_escaped() {
        let xml = build_soap_request("urn:x", "Set", &[("Value", "a<b&\"c\"")]);
        assert!(xml.contains("<Value>a&lt;b&amp;&quot;c&quot;</Value>"));

        let action = parse_soap_action(xml.as_bytes()).unwrap();
        assert_eq!(action.arg("Value"), Some("a<b&\"c\""));
    }

    #[test]
    fn test_build_response() {
        let xml = build_soap_response(
            "urn:schemas-upnp-org:service:AVTransport:1",
            "GetPositionInfo",
            &[("Track", "5"), ("TrackDuration", "00:03:45")],
        );

        assert!(xml.contains("<u:GetPositionInfoResponse xmlns:u=\"urn:schemas-upnp-org:service:AVTransport:1\">"));
        assert!(xml.contains("<Track>5</Track>"));
        assert!(xml.contains("<TrackDuration>00:03:45</TrackDuration>"));
        assert!(xml.ends_with("</u:GetPositionInfoResponse></s:Body></s:Envelope>"));
    }

    #[test]
    fn test_build_empty_response() {
        let xml = build_soap_response("urn:x", "Stop", &[]);
        assert!(xml.contains("<u:StopResponse xmlns:u=\"urn:x\"></u:StopResponse>"));
    }
}
