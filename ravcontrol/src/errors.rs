//! Control-point specific errors.
//!
//! Protocol-level failures use the shared taxonomy from `ravupnp::errors`;
//! this module only adds the failures specific to building proxies from
//! discovery events.

use ravupnp::errors::UpnpError;

#[derive(Debug, thiserror::Error)]
pub enum ControlPointError {
    #[error("failed to fetch description from {location}: {reason}")]
    DescriptionFetch { location: String, reason: String },

    #[error("device {0} not present in fetched description")]
    DeviceNotInDescription(String),

    #[error("event broker is not running")]
    EventBrokerUnavailable,

    #[error(transparent)]
    Upnp(#[from] UpnpError),
}
