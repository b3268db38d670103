//! # ravcontrol - UPnP control point
//!
//! Client side of the UPnP stack built on `ravupnp`:
//!
//! - Remote device and service descriptions ([`device_info`])
//! - SCPD introspection ([`introspection`])
//! - Service proxies: SOAP action invocation with cancellation
//!   ([`proxy`]), GENA subscriptions and typed change callbacks
//! - Resource factory mapping device/service types to application proxies
//!   ([`factory`])
//! - A control point turning discovery events into ready-to-use proxies
//!   ([`control_point`])
//!
//! The SSDP transport itself is an external collaborator: the control point
//! consumes `resource-available` / `resource-unavailable` events from any
//! source able to produce them.

pub mod cancel;
pub mod control_point;
pub mod device_info;
pub mod errors;
pub mod events;
pub mod factory;
pub mod introspection;
pub mod proxy;
pub mod soap_client;

pub use cancel::CancelToken;
pub use control_point::{ControlPoint, DiscoveryEvent, TARGET_ALL};
pub use device_info::{DeviceInfo, ServiceInfo, fetch_device_description};
pub use errors::ControlPointError;
pub use events::ControlPointEvent;
pub use factory::{
    DeviceProxyBuilder, DeviceProxyLike, ResourceFactory, ServiceProxyBuilder, ServiceProxyLike,
};
pub use introspection::ServiceIntrospection;
pub use proxy::{
    DeviceProxy, EventBroker, LostCallback, NotifyCallback, NotifyHandle, PendingCall,
    ProxyAction, ServiceProxy,
};
