//! Low-level SOAP HTTP client.

use std::time::Duration;

use tracing::debug;
use ureq::Agent;

use ravupnp::errors::UpnpError;
use ravupnp::http_headers::{accept_language_from_locale, user_agent};
use ravupnp::soap::{SoapEnvelope, parse_soap_envelope};

/// Result of a SOAP call:
/// - HTTP status code
/// - raw XML body (always)
/// - parsed SOAP envelope if parsing succeeded
pub struct SoapCallResult {
    pub status: u16,
    pub raw_body: String,
    pub envelope: Option<SoapEnvelope>,
}

/// Builds an agent that does NOT treat 4xx/5xx as errors: SOAP faults come
/// back as HTTP 500 and must reach the caller as regular responses.
pub(crate) fn build_agent(timeout: Duration) -> Agent {
    Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .allow_non_standard_methods(true)
        .build()
        .into()
}

pub(crate) fn map_transport_error(e: ureq::Error) -> UpnpError {
    let text = e.to_string();
    if text.to_ascii_lowercase().contains("timeout")
        || text.to_ascii_lowercase().contains("timed out")
    {
        UpnpError::Timeout
    } else {
        UpnpError::Transport(text)
    }
}

/// POSTs a rendered SOAP envelope to a control URL.
///
/// Headers carry the quoted `SOAPAction`, the process-wide `User-Agent`, the
/// `Accept-Language` derived from the locale and `Accept-Encoding: gzip`.
pub fn post_soap(
    control_url: &str,
    service_type: &str,
    action: &str,
    body_xml: String,
    timeout: Duration,
) -> Result<SoapCallResult, UpnpError> {
    let agent = build_agent(timeout);

    let soap_action_header = format!(r#""{}#{}""#, service_type, action);

    let mut request = agent
        .post(control_url)
        .header("Content-Type", r#"text/xml; charset="utf-8""#)
        .header("SOAPAction", &soap_action_header)
        .header("User-Agent", user_agent())
        .header("Accept-Encoding", "gzip");

    if let Some(languages) = accept_language_from_locale() {
        request = request.header("Accept-Language", &languages);
    }

    let mut response = request.send(body_xml).map_err(map_transport_error)?;

    let status = response.status().as_u16();
    let raw_body = response
        .body_mut()
        .read_to_string()
        .map_err(map_transport_error)?;

    // Parsing failures are not fatal here; the caller decides what an
    // unparseable body means for the status it came with.
    let envelope = match parse_soap_envelope(raw_body.as_bytes()) {
        Ok(env) => Some(env),
        Err(e) => {
            debug!("SOAP response body does not parse: {}", e);
            None
        }
    };

    Ok(SoapCallResult {
        status,
        raw_body,
        envelope,
    })
}
