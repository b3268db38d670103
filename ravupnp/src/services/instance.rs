//! Implémentation de ServiceInstance.

use std::collections::HashMap;
use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use flate2::Compression;
use flate2::write::GzEncoder;
use std::io::Write;
use tracing::{debug, info, warn};
use xmltree::{Element, EmitterConfig, XMLNode};

use crate::acl::{self, AclRequest};
use crate::actions::{ActionHandler, ActionInvocation, InvocationStatus};
use crate::http_headers::{self, locale_to_http_tag, parse_accept_language};
use crate::object_set::Named;
use crate::server::{Request, UpnpServer};
use crate::services::eventing::{
    SubscriptionSet, parse_callback_header, parse_timeout_header,
};
use crate::services::host::parse_host_header;
use crate::services::{Service, ServiceError};
use crate::state_variables::{StateVarInstance, StateVarInstanceSet};
use crate::values::Value;

/// Méthodes HTTP de l'événementiel UPnP.
pub const METHOD_SUBSCRIBE: &str = "SUBSCRIBE";
pub const METHOD_UNSUBSCRIBE: &str = "UNSUBSCRIBE";

/// Taille maximale acceptée d'un corps de requête SOAP.
const MAX_SOAP_BODY: usize = 4 * 1024 * 1024;

/// Seuil de compression gzip des réponses SOAP.
const GZIP_THRESHOLD: usize = 1024;

/// Callback de lecture d'une variable pour l'événement initial.
///
/// Permet à l'application de fournir la valeur courante sans passer par
/// [`ServiceInstance::set_variable`].
pub type QueryHandler = Arc<dyn Fn(&str) -> Option<Value> + Send + Sync>;

#[derive(Default)]
struct Attachment {
    device_route: Option<String>,
    device_udn: Option<String>,
    bound: Option<Arc<RwLock<Option<SocketAddr>>>>,
}

/// Instance de service UPnP.
///
/// Publie les trois endpoints du service (description SCPD, contrôle SOAP,
/// abonnements GENA), exécute les actions via les handlers enregistrés et
/// notifie les abonnés des changements de variables.
#[derive(Clone)]
pub struct ServiceInstance {
    model: Arc<Service>,
    variables: Arc<StateVarInstanceSet>,
    handlers: Arc<RwLock<HashMap<String, ActionHandler>>>,
    query_handler: Arc<RwLock<Option<QueryHandler>>>,
    subscriptions: SubscriptionSet,
    attachment: Arc<RwLock<Attachment>>,
    expiry_scan_started: Arc<AtomicBool>,
}

impl std::fmt::Debug for ServiceInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceInstance")
            .field("name", &self.get_name())
            .field("subscriptions", &self.subscriptions.count())
            .finish()
    }
}

impl ServiceInstance {
    pub fn new(model: Arc<Service>) -> Self {
        let mut variables = StateVarInstanceSet::new();
        for variable in model.variables().iter() {
            if let Err(e) = variables.insert(Arc::new(StateVarInstance::new(variable))) {
                warn!("Failed to insert state variable: {}", e);
            }
        }

        Self {
            model,
            variables: Arc::new(variables),
            handlers: Arc::new(RwLock::new(HashMap::new())),
            query_handler: Arc::new(RwLock::new(None)),
            subscriptions: SubscriptionSet::new(),
            attachment: Arc::new(RwLock::new(Attachment::default())),
            expiry_scan_started: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn get_name(&self) -> &str {
        self.model.name()
    }

    pub fn model(&self) -> &Arc<Service> {
        &self.model
    }

    pub fn service_type(&self) -> String {
        self.model.service_type()
    }

    pub fn service_id(&self) -> String {
        self.model.service_id()
    }

    /// Rattache le service à un device hébergé.
    pub fn set_device(&self, device_route: &str, device_udn: &str) {
        let mut attachment = self.attachment.write().unwrap();
        attachment.device_route = Some(device_route.to_string());
        attachment.device_udn = Some(device_udn.to_string());
    }

    fn device_udn(&self) -> Option<String> {
        self.attachment.read().unwrap().device_udn.clone()
    }

    fn bound_addr(&self) -> Option<SocketAddr> {
        let attachment = self.attachment.read().unwrap();
        attachment.bound.as_ref().and_then(|b| *b.read().unwrap())
    }

    /// Route du service (chemin relatif).
    pub fn route(&self) -> String {
        let attachment = self.attachment.read().unwrap();
        match &attachment.device_route {
            Some(device_route) => format!("{}/service/{}", device_route, self.get_name()),
            None => format!("/service/{}", self.get_name()),
        }
    }

    /// Route de contrôle SOAP.
    pub fn control_route(&self) -> String {
        format!("{}/control", self.route())
    }

    /// Route de souscription aux événements.
    pub fn event_route(&self) -> String {
        format!("{}/event", self.route())
    }

    /// Route de la description SCPD.
    pub fn scpd_route(&self) -> String {
        format!("{}/desc.xml", self.route())
    }

    /// Variable d'état par nom.
    pub fn get_variable(&self, name: &str) -> Option<Arc<StateVarInstance>> {
        self.variables.get(name)
    }

    pub fn subscriptions(&self) -> &SubscriptionSet {
        &self.subscriptions
    }

    /// Enregistre le handler d'une action déclarée.
    pub fn register_action_handler(
        &self,
        action: &str,
        handler: ActionHandler,
    ) -> Result<(), ServiceError> {
        if self.model.get_action(action).is_none() {
            return Err(ServiceError::UnknownAction(action.to_string()));
        }
        self.handlers
            .write()
            .unwrap()
            .insert(action.to_string(), handler);
        Ok(())
    }

    /// Installe le callback de lecture des variables pour l'événement
    /// initial.
    pub fn set_query_handler(&self, handler: QueryHandler) {
        *self.query_handler.write().unwrap() = Some(handler);
    }

    /// Installe le callback `notify-failed`.
    pub fn set_notify_failed_callback(&self, callback: super::NotifyFailedCallback) {
        self.subscriptions.set_notify_failed_callback(callback);
    }

    /// Change la valeur d'une variable d'état.
    ///
    /// Si la valeur change et que la variable est événementée, le changement
    /// est notifié aux abonnés (coalescé si un NOTIFY est déjà en vol).
    pub fn set_variable(&self, name: &str, value: Value) -> Result<(), ServiceError> {
        let instance = self
            .variables
            .get(name)
            .ok_or_else(|| ServiceError::UnknownVariable(name.to_string()))?;

        let wire = value.to_wire();
        if instance.set_value(value) && instance.sends_events() {
            self.subscriptions.notify_change(name, &wire);
        }
        Ok(())
    }

    /// Valeurs courantes de toutes les variables événementées, pour
    /// l'événement initial d'un nouvel abonné.
    fn initial_event_values(&self) -> Vec<(String, String)> {
        let query = self.query_handler.read().unwrap().clone();
        self.variables
            .iter()
            .filter(|instance| instance.sends_events())
            .map(|instance| {
                let name = instance.name().to_string();
                let value = query
                    .as_ref()
                    .and_then(|q| q(&name))
                    .unwrap_or_else(|| instance.value());
                (name, value.to_wire())
            })
            .collect()
    }

    /// Enregistre les routes UPnP du service dans le serveur.
    pub async fn register_urls<S: UpnpServer + ?Sized>(
        &self,
        server: &mut S,
    ) -> Result<(), ServiceError> {
        self.attachment.write().unwrap().bound = Some(server.bound_addr());

        info!(
            "✅ Service description for {} available at : {}{}",
            self.get_name(),
            server.base_url(),
            self.scpd_route(),
        );

        server
            .add_handler_with_state(&self.scpd_route(), scpd_handler, self.clone())
            .await;
        server
            .add_post_handler_with_state(&self.control_route(), control_handler, self.clone())
            .await;
        server
            .add_handler_with_state(&self.event_route(), event_sub_handler, self.clone())
            .await;

        if !self.expiry_scan_started.swap(true, Ordering::SeqCst) {
            self.subscriptions.start_expiry_scan();
        }

        Ok(())
    }

    /// Élément `<service>` pour la description du device.
    pub fn to_xml_element(&self) -> Element {
        let mut elem = Element::new("service");
        for (name, content) in [
            ("serviceType", self.service_type()),
            ("serviceId", self.service_id()),
            ("SCPDURL", self.scpd_route()),
            ("controlURL", self.control_route()),
            ("eventSubURL", self.event_route()),
        ] {
            let mut child = Element::new(name);
            child.children.push(XMLNode::Text(content));
            elem.children.push(XMLNode::Element(child));
        }
        elem
    }

    /// Document SCPD du service.
    pub fn scpd_element(&self) -> Element {
        let mut elem = Element::new("scpd");
        elem.attributes.insert(
            "xmlns".to_string(),
            crate::description::SERVICE_SCHEMA_NS.to_string(),
        );

        let mut spec = Element::new("specVersion");
        for (name, number) in [("major", "1"), ("minor", "0")] {
            let mut child = Element::new(name);
            child.children.push(XMLNode::Text(number.to_string()));
            spec.children.push(XMLNode::Element(child));
        }
        elem.children.push(XMLNode::Element(spec));

        if !self.model.actions().is_empty() {
            let mut list = Element::new("actionList");
            for action in self.model.actions().iter() {
                list.children.push(XMLNode::Element(action.to_xml_element()));
            }
            elem.children.push(XMLNode::Element(list));
        }

        if !self.model.variables().is_empty() {
            let mut table = Element::new("serviceStateTable");
            for variable in self.model.variables().iter() {
                table
                    .children
                    .push(XMLNode::Element(variable.to_xml_element()));
            }
            elem.children.push(XMLNode::Element(table));
        }

        elem
    }

    fn scpd_xml(&self) -> Result<String, xmltree::Error> {
        let config = EmitterConfig::new().write_document_declaration(true);
        let mut buf = Vec::new();
        self.scpd_element().write_with_config(&mut buf, config)?;
        Ok(String::from_utf8_lossy(&buf).to_string())
    }

    /// Valide l'en-tête Host d'une requête entrante.
    ///
    /// Tant que le serveur n'est pas lié, tout passe ; lié en adresse
    /// wildcard, seule l'égalité de port est exigée (l'adresse reste une
    /// littérale IP valide).
    fn host_header_ok(&self, headers: &HeaderMap) -> bool {
        let Some(bound) = self.bound_addr() else {
            return true;
        };
        let Some(host) = headers.get(header::HOST).and_then(|v| v.to_str().ok()) else {
            return false;
        };

        match parse_host_header(host) {
            Some((ip, port)) => {
                port == bound.port() && (bound.ip().is_unspecified() || ip == bound.ip())
            }
            None => false,
        }
    }

    async fn acl_allows(&self, path: String, peer: IpAddr, headers: &HeaderMap) -> bool {
        let request = AclRequest {
            device_udn: self.device_udn(),
            service_id: Some(self.service_id()),
            path,
            peer,
            user_agent: headers
                .get(header::USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
        };
        acl::check(&request).await
    }
}

fn peer_of(req: &Request) -> IpAddr {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

/// Parse un en-tête `SOAPAction: "urn:...#Action"`.
fn parse_soap_action_header(headers: &HeaderMap) -> Option<(String, String)> {
    let raw = headers.get("SOAPAction")?.to_str().ok()?;
    let unquoted = raw.trim().trim_matches('"');
    let (urn, name) = unquoted.split_once('#')?;
    if urn.is_empty() || name.is_empty() {
        return None;
    }
    Some((urn.to_string(), name.to_string()))
}

fn gzip_body(body: &str) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(body.as_bytes())
        .and_then(|_| encoder.finish())
        .unwrap_or_else(|_| body.as_bytes().to_vec())
}

/// Assemble la réponse HTTP d'une invocation SOAP.
fn soap_http_response(
    status: u16,
    body: String,
    accept_gzip: bool,
    locales: &[String],
) -> Response {
    let mut builder = Response::builder()
        .status(StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR))
        .header(header::CONTENT_TYPE, "text/xml; charset=\"utf-8\"")
        .header("Ext", "")
        .header("Server", http_headers::server_id());

    if let Some(tag) = locales.first().and_then(|locale| locale_to_http_tag(locale)) {
        builder = builder.header(header::CONTENT_LANGUAGE, tag);
    }

    if accept_gzip && body.len() >= GZIP_THRESHOLD {
        builder = builder.header(header::CONTENT_ENCODING, "gzip");
        builder.body(Body::from(gzip_body(&body))).unwrap()
    } else {
        builder.body(Body::from(body)).unwrap()
    }
}

fn finalize_invocation(invocation: ActionInvocation) -> Response {
    let accept_gzip = invocation.accepts_gzip();
    let locales = invocation.get_locales().to_vec();
    let (status, body) = invocation.finalize();
    soap_http_response(status, body, accept_gzip, &locales)
}

/// Réponse 500 + Fault UPnP, sans passer par un handler.
fn fault_response(
    action: &str,
    service_type: &str,
    code: u32,
    accept_gzip: bool,
    locales: &[String],
) -> Response {
    let mut invocation = ActionInvocation::new(
        action,
        service_type,
        Vec::new(),
        locales.to_vec(),
        accept_gzip,
    );
    invocation.return_error(code, None);
    finalize_invocation(invocation)
}

/// Handler Axum du contrôle SOAP.
pub(crate) fn control_handler(
    State(instance): State<ServiceInstance>,
    headers: HeaderMap,
    req: Request,
) -> Pin<Box<dyn Future<Output = Response> + Send>> {
    Box::pin(async move {
        let peer = peer_of(&req);

        // Validation de la requête avant tout dispatch
        if !instance.host_header_ok(&headers) {
            debug!("Rejecting control request with bad Host header");
            return StatusCode::BAD_REQUEST.into_response();
        }

        let content_type_ok = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.starts_with("text/xml"))
            .unwrap_or(false);
        if !content_type_ok {
            return StatusCode::UNSUPPORTED_MEDIA_TYPE.into_response();
        }

        if !instance
            .acl_allows(instance.control_route(), peer, &headers)
            .await
        {
            return StatusCode::FORBIDDEN.into_response();
        }

        let Some((soap_urn, action_name)) = parse_soap_action_header(&headers) else {
            debug!("Missing or malformed SOAPAction header");
            return (StatusCode::BAD_REQUEST, "Invalid Action").into_response();
        };

        let accept_gzip = headers
            .get(header::ACCEPT_ENCODING)
            .and_then(|v| v.to_str().ok())
            .map(|enc| enc.contains("gzip"))
            .unwrap_or(false);
        let locales = headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|v| v.to_str().ok())
            .map(parse_accept_language)
            .unwrap_or_default();

        let service_type = instance.service_type();
        if soap_urn != service_type {
            debug!(
                received = soap_urn.as_str(),
                expected = service_type.as_str(),
                "SOAPAction URN differs from service type"
            );
        }

        // L'action doit exister dans le SCPD
        if instance.model().get_action(&action_name).is_none() {
            info!(action = action_name.as_str(), "Unknown action invoked");
            return fault_response(&action_name, &service_type, 401, accept_gzip, &locales);
        }

        let body = match axum::body::to_bytes(req.into_body(), MAX_SOAP_BODY).await {
            Ok(bytes) => bytes,
            Err(_) => {
                return fault_response(&action_name, &service_type, 402, accept_gzip, &locales);
            }
        };

        // L'enveloppe doit contenir Body/<ActionName>
        let soap_action = match crate::soap::parse_soap_action(&body) {
            Ok(soap_action) if soap_action.name == action_name => soap_action,
            _ => {
                debug!(
                    action = action_name.as_str(),
                    "Request body does not carry the announced action"
                );
                return fault_response(&action_name, &service_type, 402, accept_gzip, &locales);
            }
        };

        let handler = instance
            .handlers
            .read()
            .unwrap()
            .get(&action_name)
            .cloned();
        let Some(handler) = handler else {
            info!(
                action = action_name.as_str(),
                "No handler registered, optional action not implemented"
            );
            return StatusCode::NOT_IMPLEMENTED.into_response();
        };

        let invocation = ActionInvocation::new(
            action_name,
            service_type,
            soap_action.args,
            locales,
            accept_gzip,
        );

        let invocation = handler(invocation).await;
        if invocation.status() == InvocationStatus::Pending {
            debug!(
                action = invocation.name(),
                "Handler returned without status, assuming success"
            );
        }
        finalize_invocation(invocation)
    })
}

/// Handler Axum des abonnements GENA (SUBSCRIBE/UNSUBSCRIBE).
pub(crate) fn event_sub_handler(
    State(instance): State<ServiceInstance>,
    headers: HeaderMap,
    req: Request,
) -> Pin<Box<dyn Future<Output = Response> + Send>> {
    Box::pin(async move {
        let peer = peer_of(&req);
        let method = req.method().as_str().to_string();

        if !instance.host_header_ok(&headers) {
            return StatusCode::BAD_REQUEST.into_response();
        }

        if !instance
            .acl_allows(instance.event_route(), peer, &headers)
            .await
        {
            return StatusCode::FORBIDDEN.into_response();
        }

        let header_str = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string()
        };
        let sid = header_str("SID");
        let callback = header_str("Callback");
        let nt = header_str("NT");
        let timeout = headers
            .get("Timeout")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        match method.as_str() {
            METHOD_SUBSCRIBE => {
                if sid.is_empty() {
                    // Nouvelle souscription
                    if callback.is_empty() || nt.is_empty() {
                        return StatusCode::PRECONDITION_FAILED.into_response();
                    }
                    if nt != "upnp:event" {
                        return StatusCode::PRECONDITION_FAILED.into_response();
                    }
                    let callbacks = parse_callback_header(&callback);
                    if callbacks.is_empty() {
                        return StatusCode::PRECONDITION_FAILED.into_response();
                    }

                    let timeout_secs = parse_timeout_header(timeout.as_deref());
                    let new_sid = instance.subscriptions.subscribe(callbacks, timeout_secs);

                    // Événement initial : valeurs courantes de toutes les
                    // variables événementées, SEQ=0
                    let values = instance.initial_event_values();
                    instance.subscriptions.enqueue_initial(&new_sid, values);

                    subscription_response(&new_sid, timeout_secs)
                } else {
                    // Renouvellement : SID seul, sans Callback ni NT
                    if !callback.is_empty() || !nt.is_empty() {
                        return StatusCode::BAD_REQUEST.into_response();
                    }
                    let timeout_secs = parse_timeout_header(timeout.as_deref());
                    if instance.subscriptions.renew(&sid, timeout_secs) {
                        subscription_response(&sid, timeout_secs)
                    } else {
                        StatusCode::PRECONDITION_FAILED.into_response()
                    }
                }
            }
            METHOD_UNSUBSCRIBE => {
                if !sid.is_empty() && instance.subscriptions.unsubscribe(&sid) {
                    info!(sid = sid.as_str(), "❌ Unsubscribed");
                    StatusCode::OK.into_response()
                } else {
                    StatusCode::PRECONDITION_FAILED.into_response()
                }
            }
            other => {
                warn!("Unsupported EventSub method: {}", other);
                StatusCode::METHOD_NOT_ALLOWED.into_response()
            }
        }
    })
}

fn subscription_response(sid: &str, timeout_secs: u64) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header("SID", sid)
        .header("Timeout", format!("Second-{}", timeout_secs))
        .header("Server", http_headers::server_id())
        .body(Body::empty())
        .unwrap()
}

/// Handler Axum de la description SCPD.
pub(crate) fn scpd_handler(
    State(instance): State<ServiceInstance>,
    headers: HeaderMap,
    req: Request,
) -> Pin<Box<dyn Future<Output = Response> + Send>> {
    Box::pin(async move {
        if req.method() != axum::http::Method::GET {
            return StatusCode::METHOD_NOT_ALLOWED.into_response();
        }

        let peer = peer_of(&req);
        if !instance
            .acl_allows(instance.scpd_route(), peer, &headers)
            .await
        {
            return StatusCode::FORBIDDEN.into_response();
        }

        match instance.scpd_xml() {
            Ok(xml) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/xml; charset=\"utf-8\"")],
                xml,
            )
                .into_response(),
            Err(e) => {
                warn!("Failed to serialize SCPD XML: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{Action, Argument};
    use crate::state_variables::StateVariable;
    use crate::values::VarType;

    fn sample_service() -> Arc<Service> {
        let mut service = Service::new("RenderingControl");
        service
            .add_variable(StateVariable::new("Volume", VarType::UI2).with_default(Value::UI2(10)))
            .unwrap();
        service
            .add_variable(StateVariable::new("Mute", VarType::Boolean))
            .unwrap();
        let volume = service.get_variable("Volume").unwrap();
        service
            .add_action(
                Action::new("GetVolume")
                    .add_argument(Argument::new_out("CurrentVolume", volume)),
            )
            .unwrap();
        Arc::new(service)
    }

    #[test]
    fn test_routes() {
        let instance = ServiceInstance::new(sample_service());
        assert_eq!(instance.route(), "/service/RenderingControl");
        assert_eq!(
            instance.control_route(),
            "/service/RenderingControl/control"
        );

        instance.set_device("/device/TV", "uuid:tv");
        assert_eq!(
            instance.event_route(),
            "/device/TV/service/RenderingControl/event"
        );
        assert_eq!(
            instance.scpd_route(),
            "/device/TV/service/RenderingControl/desc.xml"
        );
    }

    #[test]
    fn test_set_variable_unknown_fails() {
        let instance = ServiceInstance::new(sample_service());
        assert!(matches!(
            instance.set_variable("Ghost", Value::UI2(1)),
            Err(ServiceError::UnknownVariable(_))
        ));
    }

    #[test]
    fn test_initial_event_values_cover_evented_variables() {
        let instance = ServiceInstance::new(sample_service());
        let values = instance.initial_event_values();
        assert_eq!(values.len(), 2);
        assert!(values.contains(&("Volume".to_string(), "10".to_string())));
        assert!(values.contains(&("Mute".to_string(), "0".to_string())));
    }

    #[test]
    fn test_query_handler_overrides_instance_value() {
        let instance = ServiceInstance::new(sample_service());
        instance.set_query_handler(Arc::new(|name| {
            (name == "Volume").then(|| Value::UI2(99))
        }));

        let values = instance.initial_event_values();
        assert!(values.contains(&("Volume".to_string(), "99".to_string())));
        // Mute n'est pas couvert par le callback : valeur d'instance
        assert!(values.contains(&("Mute".to_string(), "0".to_string())));
    }

    #[test]
    fn test_register_handler_requires_declared_action() {
        let instance = ServiceInstance::new(sample_service());
        let result = instance.register_action_handler(
            "Ghost",
            Arc::new(|invocation| Box::pin(async move { invocation })),
        );
        assert!(matches!(result, Err(ServiceError::UnknownAction(_))));
    }

    #[test]
    fn test_scpd_document() {
        let instance = ServiceInstance::new(sample_service());
        let xml = instance.scpd_xml().unwrap();
        assert!(xml.contains("urn:schemas-upnp-org:service-1-0"));
        assert!(xml.contains("<name>GetVolume</name>"));
        assert!(xml.contains("<name>Volume</name>"));
    }

    #[test]
    fn test_parse_soap_action_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "SOAPAction",
            "\"urn:schemas-upnp-org:service:RenderingControl:1#GetVolume\""
                .parse()
                .unwrap(),
        );
        let (urn, name) = parse_soap_action_header(&headers).unwrap();
        assert_eq!(urn, "urn:schemas-upnp-org:service:RenderingControl:1");
        assert_eq!(name, "GetVolume");

        headers.insert("SOAPAction", "garbage".parse().unwrap());
        assert!(parse_soap_action_header(&headers).is_none());
    }
}
