//! Parser SOAP pour actions UPnP.

use std::io::BufReader;

use xmltree::Element;

use super::{SoapBody, SoapEnvelope, SoapHeader};
use crate::xml;

/// Action UPnP extraite d'une enveloppe SOAP.
#[derive(Debug, Clone)]
pub struct SoapAction {
    /// Nom de l'action (ex: "Play", "Browse")
    pub name: String,

    /// Namespace de l'action : l'URN du type de service
    pub namespace: Option<String>,

    /// Arguments, dans l'ordre du document
    pub args: Vec<(String, String)>,
}

impl SoapAction {
    /// Valeur d'un argument par nom.
    pub fn arg(&self, name: &str) -> Option<&str> {
        self.args
            .iter()
            .find(|(arg_name, _)| arg_name == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Erreur de parsing SOAP.
#[derive(Debug, thiserror::Error)]
pub enum SoapParseError {
    #[error("XML parse error: {0}")]
    XmlError(#[from] xmltree::ParseError),

    #[error("missing SOAP Envelope")]
    MissingEnvelope,

    #[error("missing SOAP Body")]
    MissingBody,

    #[error("no action found in SOAP Body")]
    NoAction,
}

/// Parse une action SOAP à partir de bytes XML.
pub fn parse_soap_action(xml_bytes: &[u8]) -> Result<SoapAction, SoapParseError> {
    let envelope = parse_soap_envelope(xml_bytes)?;
    extract_action_from_body(&envelope.body)
}

/// Parse une enveloppe SOAP complète.
pub fn parse_soap_envelope(xml_bytes: &[u8]) -> Result<SoapEnvelope, SoapParseError> {
    let reader = BufReader::new(xml_bytes);
    let root = Element::parse(reader)?;

    if root.name != "Envelope" {
        return Err(SoapParseError::MissingEnvelope);
    }

    let header = xml::find_child(&root, "Header").map(|e| SoapHeader { content: e.clone() });

    let body_elem = xml::find_child(&root, "Body").ok_or(SoapParseError::MissingBody)?;

    Ok(SoapEnvelope {
        header,
        body: SoapBody {
            content: body_elem.clone(),
        },
    })
}

/// Extrait l'action UPnP du corps SOAP.
///
/// Format attendu : `<u:ActionName xmlns:u="service-urn">...</u:ActionName>`,
/// avec les arguments en enfants directs, dans l'ordre de la requête.
fn extract_action_from_body(body: &SoapBody) -> Result<SoapAction, SoapParseError> {
    let action_elem = body.first_element().ok_or(SoapParseError::NoAction)?;

    let name = action_elem.name.clone();
    let namespace = action_elem.namespace.clone();

    let mut args = Vec::new();
    for elem in xml::children(action_elem) {
        args.push((elem.name.clone(), xml::text_of(elem)));
    }

    Ok(SoapAction {
        name,
        namespace,
        args,
    })
}
