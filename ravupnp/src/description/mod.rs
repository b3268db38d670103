//! # Modèle de description UPnP
//!
//! Parsing des documents de description de device (namespace
//! `urn:schemas-upnp-org:device-1-0`) et des SCPD (namespace
//! `urn:schemas-upnp-org:service-1-0`) vers un modèle typé partagé entre le
//! côté device et le côté point de contrôle.

mod device;
mod icon;
mod scpd;

pub use device::{
    DeviceDescription, DeviceNode, ServiceEntry, parse_device_description,
};
pub use icon::{Icon, IconSpec, select_icon};
pub use scpd::{Direction, Scpd, ScpdAction, ScpdArgument, ScpdStateVariable, parse_scpd};

/// Namespace du schéma de description de device.
pub const DEVICE_SCHEMA_NS: &str = "urn:schemas-upnp-org:device-1-0";

/// Namespace du schéma SCPD.
pub const SERVICE_SCHEMA_NS: &str = "urn:schemas-upnp-org:service-1-0";
