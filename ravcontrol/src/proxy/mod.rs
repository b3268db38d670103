//! Device and service proxies.

mod action;
mod subscription;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use tracing::debug;
use url::Url;
use xmltree::Element;

use ravupnp::description::IconSpec;
use ravupnp::devices::Describable;
use ravupnp::errors::{ServerError, UpnpError};
use ravupnp::soap::SoapFault;
use ravupnp::values::{Value, VarType};

use crate::cancel::CancelToken;
use crate::device_info::{DeviceInfo, ServiceInfo};
use crate::introspection::ServiceIntrospection;
use crate::soap_client::{SoapCallResult, post_soap};

pub use action::{PendingCall, ProxyAction};
pub use subscription::{EventBroker, LostCallback, NotifyCallback};

use subscription::{NotifyEntry, NotifyRegistry};

/// Default timeout of a SOAP call.
const CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Handle on a registered notify callback, used for removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotifyHandle {
    id: u64,
}

/// Proxy on a remote UPnP service.
///
/// Invokes actions over SOAP and manages one GENA subscription with typed
/// per-variable callbacks.
pub struct ServiceProxy {
    info: ServiceInfo,
    broker: Arc<EventBroker>,
    timeout: Duration,
    /// Broker key while subscribed
    subscription: Mutex<Option<String>>,
    callbacks: NotifyRegistry,
    lost_callback: Mutex<Option<LostCallback>>,
    next_callback_id: AtomicU64,
}

impl ServiceProxy {
    pub fn new(info: ServiceInfo, broker: Arc<EventBroker>) -> Self {
        Self {
            info,
            broker,
            timeout: CALL_TIMEOUT,
            subscription: Mutex::new(None),
            callbacks: Arc::new(Mutex::new(HashMap::new())),
            lost_callback: Mutex::new(None),
            next_callback_id: AtomicU64::new(1),
        }
    }

    pub fn info(&self) -> &ServiceInfo {
        &self.info
    }

    pub fn service_type(&self) -> &str {
        self.info.service_type()
    }

    pub fn service_id(&self) -> &str {
        self.info.service_id()
    }

    pub fn control_url(&self) -> &Url {
        self.info.control_url()
    }

    pub fn set_call_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Builds a pending action. Arguments are serialized in the given order,
    /// which must be the SCPD declaration order.
    pub fn action(&self, name: &str, in_args: &[(&str, Value)]) -> Arc<ProxyAction> {
        ProxyAction::new(name, in_args)
    }

    /// Invokes an action and waits for its completion.
    pub fn call(&self, action: &Arc<ProxyAction>) -> Result<(), UpnpError> {
        self.call_async(action).wait()
    }

    /// Starts an action invocation and returns immediately.
    ///
    /// The pending action can be cancelled at any time; a cancelled call
    /// resolves with `Cancelled` while the underlying transfer finishes (and
    /// is discarded) in the background.
    pub fn call_async(&self, action: &Arc<ProxyAction>) -> PendingCall {
        let action = Arc::clone(action);
        let worker_action = Arc::clone(&action);
        let control_url = self.info.control_url().to_string();
        let service_type = self.info.service_type().to_string();
        let timeout = self.timeout;

        thread::spawn(move || {
            if worker_action.cancel_token().is_cancelled() {
                worker_action.complete(Err(UpnpError::Cancelled));
                return;
            }

            let body = worker_action.body_for(&service_type);
            let outcome = post_soap(
                &control_url,
                &service_type,
                worker_action.name(),
                body,
                timeout,
            )
            .and_then(interpret_response);

            worker_action.complete(outcome);
        });

        PendingCall::new(action)
    }

    /// Downloads and parses the service's SCPD.
    pub fn introspect(&self, cancel: &CancelToken) -> Result<ServiceIntrospection, UpnpError> {
        self.info.introspect(cancel, self.timeout)
    }

    /// Registers a typed callback for a state variable notification.
    pub fn add_notify(
        &self,
        variable: &str,
        var_type: VarType,
        callback: NotifyCallback,
    ) -> NotifyHandle {
        let id = self.next_callback_id.fetch_add(1, Ordering::SeqCst);
        self.callbacks
            .lock()
            .unwrap()
            .entry(variable.to_string())
            .or_default()
            .push(NotifyEntry {
                id,
                var_type,
                callback,
            });
        NotifyHandle { id }
    }

    /// Removes a notify callback. Safe to call from inside the callback
    /// itself: dispatch iterates over a snapshot.
    pub fn remove_notify(&self, variable: &str, handle: NotifyHandle) {
        let mut callbacks = self.callbacks.lock().unwrap();
        if let Some(entries) = callbacks.get_mut(variable) {
            entries.retain(|entry| entry.id != handle.id);
            if entries.is_empty() {
                callbacks.remove(variable);
            }
        }
    }

    /// Installs the `subscription-lost` callback.
    pub fn on_subscription_lost(&self, callback: LostCallback) {
        *self.lost_callback.lock().unwrap() = Some(callback);
    }

    /// Subscribes to (or unsubscribes from) the service's events.
    ///
    /// On subscription failure the error is returned and nothing is retried;
    /// a later loss (failed renewal) fires the `subscription-lost` callback
    /// exactly once.
    pub fn set_subscribed(&self, subscribed: bool) -> Result<(), UpnpError> {
        let mut current = self.subscription.lock().unwrap();

        if subscribed {
            if current.is_some() {
                return Ok(());
            }
            let lost = self.lost_callback.lock().unwrap().clone();
            let key = self.broker.subscribe(
                self.info.event_url().clone(),
                Arc::clone(&self.callbacks),
                lost,
            )?;
            *current = Some(key);
            Ok(())
        } else {
            if let Some(key) = current.take() {
                self.broker.unsubscribe(&key);
            }
            Ok(())
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.lock().unwrap().is_some()
    }
}

impl Drop for ServiceProxy {
    fn drop(&mut self) {
        if let Some(key) = self.subscription.lock().unwrap().take() {
            self.broker.unsubscribe(&key);
        }
    }
}

impl std::fmt::Debug for ServiceProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceProxy")
            .field("service_type", &self.info.service_type())
            .field("control_url", &self.info.control_url().as_str())
            .finish()
    }
}

/// Turns an HTTP exchange into the parsed response element.
///
/// - 200: the first element of the SOAP body, stored for `get_result`
/// - 500 with a well-formed fault: `ControlError` with the UPnP code
/// - 500 with a malformed fault: `ServerError::InvalidResponse`
/// - anything else: `ServerError::from_status`
fn interpret_response(call: SoapCallResult) -> Result<Element, UpnpError> {
    match call.status {
        200 | 500 => {}
        status => {
            let reason = ureq::http::StatusCode::from_u16(status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or("");
            return Err(UpnpError::Server(ServerError::from_status(status, reason)));
        }
    }

    let Some(envelope) = call.envelope else {
        return Err(UpnpError::Server(if call.status == 200 {
            ServerError::InvalidResponse("could not parse SOAP response".to_string())
        } else {
            ServerError::InternalServerError("Internal Server Error".to_string())
        }));
    };

    if call.status == 500 {
        return match SoapFault::from_body(&envelope.body) {
            Some(fault) => match fault.upnp_error {
                Some(error) => {
                    debug!(code = error.code, "SOAP fault decoded");
                    Err(UpnpError::Control(error))
                }
                None => Err(UpnpError::Server(ServerError::InvalidResponse(
                    "Invalid Fault".to_string(),
                ))),
            },
            None => Err(UpnpError::Server(ServerError::InvalidResponse(
                "Invalid Fault".to_string(),
            ))),
        };
    }

    envelope
        .body
        .first_element()
        .cloned()
        .ok_or_else(|| {
            UpnpError::Server(ServerError::InvalidResponse("Invalid Envelope".to_string()))
        })
}

/// Proxy on a remote UPnP device.
pub struct DeviceProxy {
    info: DeviceInfo,
}

impl DeviceProxy {
    pub fn new(info: DeviceInfo) -> Self {
        Self { info }
    }

    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    pub fn icon_url(&self, spec: &IconSpec) -> Option<Url> {
        self.info.icon_url(spec)
    }

    pub fn service_infos(&self) -> Vec<ServiceInfo> {
        self.info.services()
    }

    pub fn sub_devices(&self) -> Vec<DeviceInfo> {
        self.info.sub_devices()
    }
}

impl Describable for DeviceProxy {
    fn udn(&self) -> &str {
        self.info.udn()
    }

    fn device_type(&self) -> String {
        self.info.device_type()
    }

    fn friendly_name(&self) -> &str {
        self.info.friendly_name()
    }
}

impl std::fmt::Debug for DeviceProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceProxy")
            .field("udn", &self.info.udn())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ravupnp::soap::build_soap_fault;

    fn call(status: u16, body: &str) -> SoapCallResult {
        SoapCallResult {
            status,
            raw_body: body.to_string(),
            envelope: ravupnp::soap::parse_soap_envelope(body.as_bytes()).ok(),
        }
    }

    #[test]
    fn test_interpret_success() {
        let body = r#"<?xml version="1.0"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
  <s:Body><u:PlayResponse xmlns:u="urn:x"><Out>1</Out></u:PlayResponse></s:Body>
</s:Envelope>"#;

        let element = interpret_response(call(200, body)).unwrap();
        assert_eq!(element.name, "PlayResponse");
    }

    #[test]
    fn test_interpret_fault() {
        let body = build_soap_fault(401, "Invalid Action");
        let result = interpret_response(call(500, &body));
        match result {
            Err(UpnpError::Control(error)) => {
                assert_eq!(error.code, 401);
                assert_eq!(error.description, "Invalid Action");
            }
            other => panic!("expected ControlError, got {:?}", other),
        }
    }

    #[test]
    fn test_interpret_malformed_fault() {
        let body = r#"<?xml version="1.0"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
  <s:Body><s:Fault><faultcode>s:Client</faultcode></s:Fault></s:Body>
</s:Envelope>"#;

        assert!(matches!(
            interpret_response(call(500, body)),
            Err(UpnpError::Server(ServerError::InvalidResponse(_)))
        ));
    }

    #[test]
    fn test_interpret_unparseable_success_body() {
        assert!(matches!(
            interpret_response(call(200, "this is not xml")),
            Err(UpnpError::Server(ServerError::InvalidResponse(_)))
        ));
    }

    #[test]
    fn test_interpret_other_status() {
        assert!(matches!(
            interpret_response(call(404, "")),
            Err(UpnpError::Server(ServerError::NotFound(_)))
        ));
        assert!(matches!(
            interpret_response(call(501, "")),
            Err(UpnpError::Server(ServerError::NotImplemented(_)))
        ));
    }
}
