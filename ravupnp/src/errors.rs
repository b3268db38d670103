//! Taxonomie d'erreurs exposée aux applications.
//!
//! Trois familles suivent le découpage du protocole : erreurs serveur vues par
//! les clients HTTP, erreurs de contrôle décodées des SOAP Faults, erreurs
//! d'événementiel GENA. S'y ajoutent les erreurs XML et les conditions
//! transverses (annulation, timeout, transport).

use crate::values::ValueError;

/// Erreurs HTTP côté serveur, observées par les clients.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ServerError {
    #[error("internal server error: {0}")]
    InternalServerError(String),

    #[error("not implemented: {0}")]
    NotImplemented(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("server error {0}: {1}")]
    Other(u16, String),
}

impl ServerError {
    /// Classe un statut HTTP en erreur serveur.
    pub fn from_status(status: u16, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        match status {
            500 => ServerError::InternalServerError(reason),
            501 => ServerError::NotImplemented(reason),
            404 => ServerError::NotFound(reason),
            _ => ServerError::Other(status, reason),
        }
    }
}

/// Classification d'un code d'erreur UPnP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlErrorKind {
    InvalidAction,
    InvalidArgs,
    OutOfSync,
    ActionFailed,
    /// 600-699 : erreurs communes définies par le forum UPnP
    UpnpForumDefined,
    /// 700-799 : erreurs définies par le type de device
    DeviceTypeDefined,
    /// 800-899 : erreurs vendeur
    VendorDefined,
    Unknown,
}

/// Erreur de contrôle décodée d'un SOAP Fault.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("UPnP error {code}: {description}")]
pub struct ControlError {
    pub code: u32,
    pub description: String,
}

impl ControlError {
    pub fn new(code: u32, description: impl Into<String>) -> Self {
        Self {
            code,
            description: description.into(),
        }
    }

    pub fn kind(&self) -> ControlErrorKind {
        match self.code {
            401 => ControlErrorKind::InvalidAction,
            402 => ControlErrorKind::InvalidArgs,
            403 => ControlErrorKind::OutOfSync,
            501 => ControlErrorKind::ActionFailed,
            600..=699 => ControlErrorKind::UpnpForumDefined,
            700..=799 => ControlErrorKind::DeviceTypeDefined,
            800..=899 => ControlErrorKind::VendorDefined,
            _ => ControlErrorKind::Unknown,
        }
    }

    /// Description standard pour les codes dont le message est normalisé.
    pub fn default_description(code: u32) -> Option<&'static str> {
        match code {
            401 => Some("Invalid Action"),
            402 => Some("Invalid Args"),
            403 => Some("Out of Sync"),
            501 => Some("Action Failed"),
            _ => None,
        }
    }
}

/// Erreurs du sous-système d'événementiel GENA.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum EventingError {
    #[error("subscription failed: {0}")]
    SubscriptionFailed(String),

    #[error("subscription lost: {0}")]
    SubscriptionLost(String),

    #[error("notify delivery failed: {0}")]
    NotifyFailed(String),
}

/// Erreurs de traitement XML.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum XmlError {
    #[error("XML parse error: {0}")]
    ParseError(String),

    #[error("missing node: {0}")]
    NoNode(String),

    #[error("empty node: {0}")]
    EmptyNode(String),

    #[error("invalid attribute: {0}")]
    InvalidAttribute(String),
}

impl From<xmltree::ParseError> for XmlError {
    fn from(e: xmltree::ParseError) -> Self {
        XmlError::ParseError(e.to_string())
    }
}

/// Erreur de plus haut niveau de la pile.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UpnpError {
    #[error(transparent)]
    Server(#[from] ServerError),

    #[error(transparent)]
    Control(#[from] ControlError),

    #[error(transparent)]
    Eventing(#[from] EventingError),

    #[error(transparent)]
    Xml(#[from] XmlError),

    #[error(transparent)]
    Value(#[from] ValueError),

    #[error("operation cancelled")]
    Cancelled,

    #[error("operation timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),
}

impl UpnpError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, UpnpError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_error_from_status() {
        assert!(matches!(
            ServerError::from_status(500, "boom"),
            ServerError::InternalServerError(_)
        ));
        assert!(matches!(
            ServerError::from_status(501, ""),
            ServerError::NotImplemented(_)
        ));
        assert!(matches!(
            ServerError::from_status(404, ""),
            ServerError::NotFound(_)
        ));
        assert!(matches!(
            ServerError::from_status(418, ""),
            ServerError::Other(418, _)
        ));
    }

    #[test]
    fn test_control_error_classification() {
        assert_eq!(
            ControlError::new(401, "x").kind(),
            ControlErrorKind::InvalidAction
        );
        assert_eq!(
            ControlError::new(402, "x").kind(),
            ControlErrorKind::InvalidArgs
        );
        assert_eq!(
            ControlError::new(403, "x").kind(),
            ControlErrorKind::OutOfSync
        );
        assert_eq!(
            ControlError::new(501, "x").kind(),
            ControlErrorKind::ActionFailed
        );
        assert_eq!(
            ControlError::new(612, "x").kind(),
            ControlErrorKind::UpnpForumDefined
        );
        assert_eq!(
            ControlError::new(714, "x").kind(),
            ControlErrorKind::DeviceTypeDefined
        );
        assert_eq!(
            ControlError::new(803, "x").kind(),
            ControlErrorKind::VendorDefined
        );
        // Code inconnu : transmis tel quel
        assert_eq!(ControlError::new(42, "x").kind(), ControlErrorKind::Unknown);
    }

    #[test]
    fn test_default_descriptions() {
        assert_eq!(
            ControlError::default_description(401),
            Some("Invalid Action")
        );
        assert_eq!(ControlError::default_description(501), Some("Action Failed"));
        assert_eq!(ControlError::default_description(605), None);
    }
}
