//! # ravupnp - Coeur UPnP 1.0/1.1
//!
//! Cette crate implémente le coeur d'une pile UPnP côté device :
//!
//! - Types scalaires UPnP et conversions chaîne ↔ valeur ([`values`])
//! - Helpers XML de parcours et d'émission ([`xml`])
//! - Modèle de description device/service et SCPD ([`description`])
//! - Codec d'en-têtes HTTP UPnP ([`http_headers`])
//! - Codec SOAP : enveloppes, réponses, faults ([`soap`])
//! - Runtime de service : dispatch SOAP, abonnements GENA, notifications
//!   ([`services`], [`actions`], [`state_variables`])
//! - Hébergement de devices et registre global ([`devices`], [`upnp_server`])
//! - Contrôle d'accès par requête ([`acl`])
//!
//! Le transport SSDP (découverte multicast) est un collaborateur externe :
//! cette crate n'en consomme que les événements, via `ravcontrol`.

mod object_set;

pub mod acl;
pub mod actions;
pub mod description;
pub mod devices;
pub mod errors;
pub mod http_headers;
pub mod server;
pub mod services;
pub mod soap;
pub mod state_variables;
pub mod upnp_server;
pub mod value_ranges;
pub mod values;
pub mod xml;

pub use errors::UpnpError;
pub use object_set::{Named, ObjectSet, ObjectSetError};
pub use server::UpnpServer;
pub use upnp_server::UpnpServerExt;
