//! Enveloppe SOAP parsée.

use xmltree::Element;

use crate::xml;

/// En-tête SOAP optionnel.
#[derive(Debug, Clone)]
pub struct SoapHeader {
    pub content: Element,
}

/// Corps SOAP.
#[derive(Debug, Clone)]
pub struct SoapBody {
    pub content: Element,
}

impl SoapBody {
    /// Premier élément du corps : l'action, la réponse d'action ou le Fault.
    pub fn first_element(&self) -> Option<&Element> {
        xml::children(&self.content).next()
    }
}

/// Enveloppe SOAP complète.
#[derive(Debug, Clone)]
pub struct SoapEnvelope {
    pub header: Option<SoapHeader>,
    pub body: SoapBody,
}
