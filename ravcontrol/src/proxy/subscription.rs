//! GENA subscription runtime for proxies.
//!
//! A single [`EventBroker`] per control point listens for incoming NOTIFY
//! requests on an ephemeral TCP port and manages the lifecycle of every
//! proxy subscription: SUBSCRIBE, renewal ahead of expiry, UNSUBSCRIBE,
//! sequence checking and dispatch of property changes to the registered
//! per-variable callbacks.

use std::collections::HashMap;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{IpAddr, TcpListener, TcpStream, UdpSocket};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, unbounded};
use tracing::{debug, info, warn};
use url::Url;
use xmltree::Element;

use ravupnp::errors::{EventingError, UpnpError};
use ravupnp::values::{Value, VarType};
use ravupnp::xml;

use crate::soap_client::build_agent;

const SUBSCRIPTION_TIMEOUT_SECS: u64 = 1800;
const RENEWAL_SAFETY_MARGIN_SECS: u64 = 30;
const HTTP_TIMEOUT_SECS: u64 = 5;
const WORKER_LOOP_INTERVAL_MILLIS: u64 = 250;

/// Callback invoked on a state-variable change notification.
pub type NotifyCallback = Arc<dyn Fn(&str, &Value) + Send + Sync>;

/// Callback invoked exactly once when a subscription is lost.
pub type LostCallback = Arc<dyn Fn(&EventingError) + Send + Sync>;

pub(crate) struct NotifyEntry {
    pub id: u64,
    pub var_type: VarType,
    pub callback: NotifyCallback,
}

/// Per-variable callback registry of one proxy.
pub(crate) type NotifyRegistry = Arc<Mutex<HashMap<String, Vec<NotifyEntry>>>>;

struct IncomingNotify {
    path: String,
    sid: Option<String>,
    seq: Option<u32>,
    body: Vec<u8>,
}

struct BrokerEntry {
    event_url: Url,
    sid: String,
    renew_at: Instant,
    /// Next SEQ we are willing to accept; None until the initial event
    expected_seq: Option<u32>,
    registry: NotifyRegistry,
    lost: Option<LostCallback>,
}

/// NOTIFY listener plus subscription bookkeeping.
pub struct EventBroker {
    listener_port: u16,
    entries: Arc<Mutex<HashMap<String, BrokerEntry>>>,
}

impl EventBroker {
    /// Binds the NOTIFY listener and starts the worker threads.
    pub fn spawn() -> io::Result<Arc<EventBroker>> {
        let listener = TcpListener::bind("0.0.0.0:0")?;
        let listener_addr = listener.local_addr()?;

        info!("UPnP event listener bound on {}", listener_addr);

        let (notify_tx, notify_rx) = unbounded::<IncomingNotify>();
        thread::Builder::new()
            .name("upnp-event-http".into())
            .spawn(move || run_http_listener(listener, notify_tx))?;

        let broker = Arc::new(EventBroker {
            listener_port: listener_addr.port(),
            entries: Arc::new(Mutex::new(HashMap::new())),
        });

        let worker = Arc::clone(&broker);
        thread::Builder::new()
            .name("upnp-event-worker".into())
            .spawn(move || worker.run(notify_rx))?;

        Ok(broker)
    }

    fn run(&self, notify_rx: Receiver<IncomingNotify>) {
        // Un NOTIFY initial peut arriver avant que subscribe() ait fini
        // d'enregistrer l'abonnement ; on le remet en attente quelques tours.
        let mut parked: Vec<(IncomingNotify, u8)> = Vec::new();
        loop {
            while let Ok(notify) = notify_rx.try_recv() {
                if let Some(notify) = self.handle_notification(notify) {
                    parked.push((notify, 0));
                }
            }

            for (notify, attempts) in std::mem::take(&mut parked) {
                if let Some(notify) = self.handle_notification(notify) {
                    if attempts < 4 {
                        parked.push((notify, attempts + 1));
                    } else {
                        debug!("Dropping notify for unknown path {}", notify.path);
                    }
                }
            }

            self.renew_due();
            thread::sleep(Duration::from_millis(WORKER_LOOP_INTERVAL_MILLIS));
        }
    }

    /// Subscribes to a service's event URL.
    ///
    /// Returns the broker key identifying the subscription. Failure is
    /// reported to the caller; nothing is retried automatically.
    pub(crate) fn subscribe(
        &self,
        event_url: Url,
        registry: NotifyRegistry,
        lost: Option<LostCallback>,
    ) -> Result<String, UpnpError> {
        let key = format!("/events/{:016x}", rand::random::<u64>());

        let (remote_host, remote_port) = host_port_of(&event_url)?;
        let local_ip = determine_local_ip(&remote_host, remote_port).map_err(|e| {
            UpnpError::Eventing(EventingError::SubscriptionFailed(format!(
                "cannot determine local address: {}",
                e
            )))
        })?;

        let callback_url = format!(
            "http://{}:{}{}",
            format_ip(&local_ip),
            self.listener_port,
            key
        );

        debug!(
            event_url = event_url.as_str(),
            callback = callback_url.as_str(),
            "Subscribing to UPnP events"
        );

        let request = ureq::http::Request::builder()
            .method("SUBSCRIBE")
            .uri(event_url.as_str())
            .header("HOST", format!("{}:{}", remote_host, remote_port))
            .header("CALLBACK", format!("<{}>", callback_url))
            .header("NT", "upnp:event")
            .header("TIMEOUT", format!("Second-{}", SUBSCRIPTION_TIMEOUT_SECS))
            .body(())
            .map_err(|e| {
                UpnpError::Eventing(EventingError::SubscriptionFailed(e.to_string()))
            })?;

        let response = build_agent(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .run(request)
            .map_err(|e| {
                UpnpError::Eventing(EventingError::SubscriptionFailed(e.to_string()))
            })?;

        if !response.status().is_success() {
            return Err(UpnpError::Eventing(EventingError::SubscriptionFailed(
                format!("SUBSCRIBE returned HTTP {}", response.status()),
            )));
        }

        let sid = response
            .headers()
            .get("SID")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                UpnpError::Eventing(EventingError::SubscriptionFailed(
                    "SUBSCRIBE response missing SID".to_string(),
                ))
            })?;

        let timeout_secs = parse_timeout(
            response
                .headers()
                .get("TIMEOUT")
                .and_then(|value| value.to_str().ok()),
        )
        .unwrap_or(SUBSCRIPTION_TIMEOUT_SECS);

        let entry = BrokerEntry {
            event_url,
            sid: sid.clone(),
            renew_at: Instant::now() + renewal_delay(timeout_secs),
            expected_seq: None,
            registry,
            lost,
        };
        self.entries.lock().unwrap().insert(key.clone(), entry);

        info!(sid = sid.as_str(), timeout = timeout_secs, "Subscribed to UPnP events");
        Ok(key)
    }

    /// Drops a subscription, sending a best-effort UNSUBSCRIBE.
    pub(crate) fn unsubscribe(&self, key: &str) {
        let Some(entry) = self.entries.lock().unwrap().remove(key) else {
            return;
        };

        let Ok((remote_host, remote_port)) = host_port_of(&entry.event_url) else {
            return;
        };

        let request = ureq::http::Request::builder()
            .method("UNSUBSCRIBE")
            .uri(entry.event_url.as_str())
            .header("HOST", format!("{}:{}", remote_host, remote_port))
            .header("SID", &entry.sid)
            .body(());

        match request {
            Ok(request) => {
                match build_agent(Duration::from_secs(HTTP_TIMEOUT_SECS)).run(request) {
                    Ok(response) if response.status().is_success() => {
                        debug!(sid = entry.sid.as_str(), "Unsubscribed from UPnP events");
                    }
                    Ok(response) => {
                        warn!(
                            sid = entry.sid.as_str(),
                            status = %response.status(),
                            "UNSUBSCRIBE returned non-success status"
                        );
                    }
                    Err(e) => {
                        warn!(sid = entry.sid.as_str(), "UNSUBSCRIBE request failed: {}", e);
                    }
                }
            }
            Err(e) => warn!("Failed to build UNSUBSCRIBE request: {}", e),
        }
    }

    /// Renews subscriptions approaching expiry. A failed renewal drops the
    /// subscription and fires `subscription-lost` exactly once.
    fn renew_due(&self) {
        let due: Vec<String> = {
            let now = Instant::now();
            let entries = self.entries.lock().unwrap();
            entries
                .iter()
                .filter(|(_, entry)| entry.renew_at <= now)
                .map(|(key, _)| key.clone())
                .collect()
        };

        for key in due {
            let (event_url, sid) = {
                let entries = self.entries.lock().unwrap();
                let Some(entry) = entries.get(&key) else {
                    continue;
                };
                (entry.event_url.clone(), entry.sid.clone())
            };

            match renew_subscription(&event_url, &sid) {
                Ok(timeout_secs) => {
                    let mut entries = self.entries.lock().unwrap();
                    if let Some(entry) = entries.get_mut(&key) {
                        entry.renew_at = Instant::now() + renewal_delay(timeout_secs);
                    }
                    debug!(sid = sid.as_str(), "Subscription renewed");
                }
                Err(e) => {
                    warn!(sid = sid.as_str(), "Subscription renewal failed: {}", e);
                    let removed = self.entries.lock().unwrap().remove(&key);
                    if let Some(entry) = removed {
                        if let Some(lost) = entry.lost {
                            lost(&EventingError::SubscriptionLost(e.to_string()));
                        }
                    }
                }
            }
        }
    }

    /// Processes one NOTIFY. Returns the notify back when its path is not
    /// known (yet), so the caller may retry it shortly.
    fn handle_notification(&self, notify: IncomingNotify) -> Option<IncomingNotify> {
        let mut entries = self.entries.lock().unwrap();
        let Some(entry) = entries.get_mut(&notify.path) else {
            return Some(notify);
        };

        let sid_ok = notify
            .sid
            .as_deref()
            .map(|sid| sid.eq_ignore_ascii_case(&entry.sid))
            .unwrap_or(false);
        if !sid_ok {
            debug!(
                expected = entry.sid.as_str(),
                received = notify.sid.as_deref().unwrap_or("none"),
                "Ignoring notify with mismatched SID"
            );
            return None;
        }

        // SEQ must be monotonic modulo wrap; the initial 0 is always accepted
        let Some(seq) = notify.seq else {
            debug!(sid = entry.sid.as_str(), "Ignoring notify without SEQ");
            return None;
        };
        let accepted = seq == 0 || entry.expected_seq == Some(seq);
        if !accepted {
            debug!(
                sid = entry.sid.as_str(),
                seq = seq,
                expected = ?entry.expected_seq,
                "Ignoring out-of-order notify"
            );
            return None;
        }
        entry.expected_seq = Some(match seq {
            u32::MAX => 1,
            n => n + 1,
        });

        let registry = Arc::clone(&entry.registry);
        drop(entries);

        for (variable, raw_value) in parse_propertyset(&notify.body) {
            // Snapshot so a callback may remove itself while we iterate
            let callbacks: Vec<(VarType, NotifyCallback)> = {
                let registry = registry.lock().unwrap();
                registry
                    .get(&variable)
                    .map(|entries| {
                        entries
                            .iter()
                            .map(|entry| (entry.var_type, Arc::clone(&entry.callback)))
                            .collect()
                    })
                    .unwrap_or_default()
            };

            for (var_type, callback) in callbacks {
                match Value::from_wire(&raw_value, var_type) {
                    Ok(value) => callback(&variable, &value),
                    Err(e) => {
                        warn!(
                            variable = variable.as_str(),
                            "Cannot coerce notified value: {}",
                            e
                        );
                    }
                }
            }
        }

        None
    }
}

fn renewal_delay(timeout_secs: u64) -> Duration {
    // Renew at min(timeout - 30s, timeout / 2)
    let margin = timeout_secs.saturating_sub(RENEWAL_SAFETY_MARGIN_SECS);
    Duration::from_secs(margin.min(timeout_secs / 2).max(1))
}

fn renew_subscription(event_url: &Url, sid: &str) -> Result<u64, UpnpError> {
    let (remote_host, remote_port) = host_port_of(event_url)?;

    let request = ureq::http::Request::builder()
        .method("SUBSCRIBE")
        .uri(event_url.as_str())
        .header("HOST", format!("{}:{}", remote_host, remote_port))
        .header("TIMEOUT", format!("Second-{}", SUBSCRIPTION_TIMEOUT_SECS))
        .header("SID", sid)
        .body(())
        .map_err(|e| UpnpError::Eventing(EventingError::SubscriptionLost(e.to_string())))?;

    let response = build_agent(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .run(request)
        .map_err(|e| UpnpError::Eventing(EventingError::SubscriptionLost(e.to_string())))?;

    if !response.status().is_success() {
        return Err(UpnpError::Eventing(EventingError::SubscriptionLost(
            format!("renewal returned HTTP {}", response.status()),
        )));
    }

    Ok(parse_timeout(
        response
            .headers()
            .get("TIMEOUT")
            .and_then(|value| value.to_str().ok()),
    )
    .unwrap_or(SUBSCRIPTION_TIMEOUT_SECS))
}

/// Parses `<e:propertyset><e:property><Var>value</Var></e:property>…`.
fn parse_propertyset(body: &[u8]) -> Vec<(String, String)> {
    let mut values = Vec::new();
    let Ok(root) = Element::parse(std::io::Cursor::new(body)) else {
        warn!("Failed to parse notify propertyset");
        return values;
    };
    if root.name != "propertyset" {
        warn!("Notify body is not a propertyset");
        return values;
    }

    for property in xml::children(&root).filter(|e| e.name == "property") {
        for variable in xml::children(property) {
            values.push((variable.name.clone(), xml::text_of(variable)));
        }
    }
    values
}

fn run_http_listener(listener: TcpListener, notify_tx: Sender<IncomingNotify>) {
    for stream in listener.incoming() {
        match stream {
            Ok(mut stream) => {
                if let Err(e) =
                    stream.set_read_timeout(Some(Duration::from_secs(HTTP_TIMEOUT_SECS)))
                {
                    warn!("Failed to set read timeout on notify connection: {}", e);
                }

                match read_http_request(&mut stream) {
                    Ok(request) => {
                        if request.method != "NOTIFY" {
                            let _ = write_http_response(&mut stream, 405, "Method Not Allowed");
                            continue;
                        }

                        let nt_ok = request.header("nt").map(|v| v == "upnp:event").unwrap_or(false);
                        let nts_ok = request
                            .header("nts")
                            .map(|v| v == "upnp:propchange")
                            .unwrap_or(false);
                        if !nt_ok || !nts_ok {
                            let _ =
                                write_http_response(&mut stream, 412, "Precondition Failed");
                            continue;
                        }

                        let notify = IncomingNotify {
                            path: request.path.clone(),
                            sid: request.header("sid").map(str::to_string),
                            seq: request.header("seq").and_then(|v| v.trim().parse().ok()),
                            body: request.body,
                        };

                        if notify_tx.send(notify).is_err() {
                            warn!("Dropping notify because worker channel is closed");
                        }
                        let _ = write_http_response(&mut stream, 200, "OK");
                    }
                    Err(e) => {
                        warn!("Failed to parse incoming notify request: {}", e);
                        let _ = write_http_response(&mut stream, 400, "Bad Request");
                    }
                }
            }
            Err(e) => {
                warn!("Incoming notify connection failed: {}", e);
            }
        }
    }
}

struct HttpRequest {
    method: String,
    path: String,
    headers: HashMap<String, String>,
    body: Vec<u8>,
}

impl HttpRequest {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

fn read_http_request(stream: &mut TcpStream) -> io::Result<HttpRequest> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut request_line = String::new();
    if reader.read_line(&mut request_line)? == 0 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "missing request line",
        ));
    }

    let request_line = request_line.trim_end_matches(['\r', '\n']);
    let mut parts = request_line.split_whitespace();
    let method = parts
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "missing method"))?
        .to_ascii_uppercase();
    let path = parts
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "missing path"))?
        .to_string();

    let mut headers = HashMap::new();
    loop {
        let mut line = String::new();
        let len = reader.read_line(&mut line)?;
        if len == 0 {
            break;
        }
        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed.is_empty() {
            break;
        }
        if let Some((name, value)) = trimmed.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }

    let content_length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);

    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body)?;

    Ok(HttpRequest {
        method,
        path,
        headers,
        body,
    })
}

fn write_http_response(stream: &mut TcpStream, status: u16, message: &str) -> io::Result<()> {
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        status, message
    );
    stream.write_all(response.as_bytes())
}

fn host_port_of(url: &Url) -> Result<(String, u16), UpnpError> {
    let host = url
        .host_str()
        .ok_or_else(|| UpnpError::Transport(format!("URL without host: {}", url)))?
        .to_string();
    let port = url.port_or_known_default().unwrap_or(80);
    Ok((host, port))
}

fn determine_local_ip(remote_host: &str, remote_port: u16) -> io::Result<IpAddr> {
    let is_ipv6 = remote_host.contains(':') && !remote_host.contains('.');
    let target = if is_ipv6 {
        format!(
            "[{}]:{}",
            remote_host.trim_matches(|c| c == '[' || c == ']'),
            remote_port
        )
    } else {
        format!("{}:{}", remote_host, remote_port)
    };
    let bind_addr = if is_ipv6 { "[::]:0" } else { "0.0.0.0:0" };
    let socket = UdpSocket::bind(bind_addr)?;
    socket.connect(&target)?;
    Ok(socket.local_addr()?.ip())
}

fn format_ip(ip: &IpAddr) -> String {
    match ip {
        IpAddr::V4(v4) => v4.to_string(),
        IpAddr::V6(v6) => format!("[{}]", v6),
    }
}

fn parse_timeout(raw: Option<&str>) -> Option<u64> {
    let lower = raw?.trim().to_ascii_lowercase();
    if lower == "second-infinite" {
        return Some(SUBSCRIPTION_TIMEOUT_SECS);
    }
    lower.strip_prefix("second-")?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timeout() {
        assert_eq!(parse_timeout(Some("Second-1800")), Some(1800));
        assert_eq!(parse_timeout(Some("second-300")), Some(300));
        assert_eq!(parse_timeout(Some("Second-infinite")), Some(1800));
        assert_eq!(parse_timeout(Some("garbage")), None);
        assert_eq!(parse_timeout(None), None);
    }

    #[test]
    fn test_renewal_delay() {
        // min(timeout - 30, timeout / 2)
        assert_eq!(renewal_delay(1800), Duration::from_secs(900));
        assert_eq!(renewal_delay(100), Duration::from_secs(50));
        assert_eq!(renewal_delay(40), Duration::from_secs(10));
    }

    #[test]
    fn test_parse_propertyset() {
        let body = br#"<?xml version="1.0"?>
<e:propertyset xmlns:e="urn:schemas-upnp-org:event-1-0">
  <e:property><Volume>42</Volume></e:property>
  <e:property><Mute>0</Mute></e:property>
</e:propertyset>"#;

        let values = parse_propertyset(body);
        assert_eq!(
            values,
            vec![
                ("Volume".to_string(), "42".to_string()),
                ("Mute".to_string(), "0".to_string())
            ]
        );
    }

    #[test]
    fn test_parse_propertyset_rejects_other_documents() {
        assert!(parse_propertyset(b"<root><x>1</x></root>").is_empty());
        assert!(parse_propertyset(b"not xml").is_empty());
    }

    #[test]
    fn test_host_port_of() {
        let url = Url::parse("http://10.0.0.5:4711/event").unwrap();
        assert_eq!(host_port_of(&url).unwrap(), ("10.0.0.5".to_string(), 4711));

        let url = Url::parse("http://10.0.0.5/event").unwrap();
        assert_eq!(host_port_of(&url).unwrap(), ("10.0.0.5".to_string(), 80));
    }
}
