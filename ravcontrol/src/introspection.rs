//! SCPD download and introspection.

use std::sync::Arc;
use std::time::Duration;

use url::Url;

use ravupnp::description::{Scpd, ScpdAction, ScpdStateVariable, parse_scpd};
use ravupnp::errors::{ServerError, UpnpError};

use crate::cancel::{CancelToken, run_cancellable};
use crate::soap_client::{build_agent, map_transport_error};

/// Typed view of a service as declared by its SCPD.
#[derive(Debug, Clone)]
pub struct ServiceIntrospection {
    scpd: Scpd,
}

impl ServiceIntrospection {
    pub fn new(scpd: Scpd) -> Self {
        Self { scpd }
    }

    pub fn scpd(&self) -> &Scpd {
        &self.scpd
    }

    pub fn action_names(&self) -> &[String] {
        self.scpd.actions.names()
    }

    pub fn action(&self, name: &str) -> Option<Arc<ScpdAction>> {
        self.scpd.action(name)
    }

    pub fn state_variable_names(&self) -> &[String] {
        self.scpd.state_variables.names()
    }

    pub fn state_variable(&self, name: &str) -> Option<Arc<ScpdStateVariable>> {
        self.scpd.state_variable(name)
    }
}

/// Downloads and parses an SCPD document, with cancellation.
pub fn fetch_scpd(
    scpd_url: Url,
    cancel: &CancelToken,
    timeout: Duration,
) -> Result<ServiceIntrospection, UpnpError> {
    run_cancellable(cancel, move || {
        let agent = build_agent(timeout);
        let mut response = agent
            .get(scpd_url.as_str())
            .call()
            .map_err(map_transport_error)?;

        if !response.status().is_success() {
            return Err(UpnpError::Server(ServerError::from_status(
                response.status().as_u16(),
                response.status().canonical_reason().unwrap_or(""),
            )));
        }

        let body = response
            .body_mut()
            .read_to_string()
            .map_err(map_transport_error)?;

        let scpd = parse_scpd(body.as_bytes())?;
        Ok(ServiceIntrospection::new(scpd))
    })
}
