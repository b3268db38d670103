//! Abonnements GENA côté serveur et livraison des NOTIFY.
//!
//! Chaque abonnement porte son SID, ses URLs de callback, son échéance et son
//! compteur de séquence. Les changements de variables s'accumulent dans un
//! ensemble en attente par abonnement (dernière écriture gagne) ; tant qu'un
//! NOTIFY est en vol, rien d'autre ne part pour cet abonnement, ce qui
//! garantit l'ordre strict des SEQ.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use tokio::time;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::errors::EventingError;
use crate::soap::UPNP_EVENT_NS;
use crate::xml;

/// Bornes du timeout d'abonnement, en secondes.
pub const SUBSCRIPTION_TIMEOUT_MIN: u64 = 300;
pub const SUBSCRIPTION_TIMEOUT_MAX: u64 = 1800;
pub const SUBSCRIPTION_TIMEOUT_DEFAULT: u64 = 1800;

/// Intervalle du balayage d'expiration.
const EXPIRY_SCAN_INTERVAL: Duration = Duration::from_secs(1);

/// Timeout HTTP d'une livraison NOTIFY.
const NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Callback applicatif invoqué quand toutes les livraisons d'un NOTIFY ont
/// échoué et que l'abonnement est abandonné.
pub type NotifyFailedCallback = Arc<dyn Fn(&[Url], &EventingError) + Send + Sync>;

/// Parse un en-tête `Timeout: Second-n | infinite` et le borne à
/// [300, 1800] ; absent ou illisible vaut 1800.
pub fn parse_timeout_header(raw: Option<&str>) -> u64 {
    let requested = raw
        .map(|value| value.trim().to_ascii_lowercase())
        .and_then(|lower| {
            if lower == "infinite" {
                Some(SUBSCRIPTION_TIMEOUT_MAX)
            } else {
                lower.strip_prefix("second-")?.parse::<u64>().ok()
            }
        })
        .unwrap_or(SUBSCRIPTION_TIMEOUT_DEFAULT);

    requested.clamp(SUBSCRIPTION_TIMEOUT_MIN, SUBSCRIPTION_TIMEOUT_MAX)
}

/// Parse un en-tête `Callback: <uri1><uri2>…` en liste ordonnée d'URLs HTTP.
pub fn parse_callback_header(raw: &str) -> Vec<Url> {
    let mut urls = Vec::new();
    let mut rest = raw;
    while let Some(start) = rest.find('<') {
        let Some(end) = rest[start..].find('>') else {
            break;
        };
        let candidate = &rest[start + 1..start + end];
        match Url::parse(candidate) {
            Ok(url) if url.scheme() == "http" => urls.push(url),
            _ => debug!("Ignoring non-HTTP callback URL: {}", candidate),
        }
        rest = &rest[start + end + 1..];
    }
    urls
}

/// Corps `<e:propertyset>` d'un NOTIFY.
pub fn build_propertyset(values: &[(String, String)]) -> String {
    let mut body = format!("<e:propertyset xmlns:e=\"{}\">", UPNP_EVENT_NS);
    for (name, value) in values {
        body.push_str("<e:property>");
        xml::start_element(&mut body, name);
        xml::append_escaped(&mut body, value);
        xml::end_element(&mut body, name);
        body.push_str("</e:property>");
    }
    body.push_str("</e:propertyset>");
    body
}

struct Subscription {
    callbacks: Vec<Url>,
    expires_at: Instant,
    /// SEQ du prochain NOTIFY : 0 pour l'événement initial, puis 1, 2, …
    /// avec retour à 1 après 2³²−1.
    next_seq: u32,
    /// Changements en attente, coalescés par nom de variable
    pending: Vec<(String, String)>,
    /// Un NOTIFY est en vol ; le suivant attendra sa complétion
    in_flight: bool,
}

impl Subscription {
    fn take_batch(&mut self) -> Option<(u32, Vec<(String, String)>)> {
        if self.pending.is_empty() {
            return None;
        }
        let seq = self.next_seq;
        self.next_seq = match self.next_seq {
            u32::MAX => 1,
            n => n + 1,
        };
        Some((seq, std::mem::take(&mut self.pending)))
    }

    fn coalesce(&mut self, name: &str, value: &str) {
        match self.pending.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.pending.push((name.to_string(), value.to_string())),
        }
    }
}

/// Table des abonnements d'un service.
#[derive(Clone)]
pub struct SubscriptionSet {
    subs: Arc<Mutex<HashMap<String, Subscription>>>,
    on_notify_failed: Arc<RwLock<Option<NotifyFailedCallback>>>,
}

impl SubscriptionSet {
    pub fn new() -> Self {
        Self {
            subs: Arc::new(Mutex::new(HashMap::new())),
            on_notify_failed: Arc::new(RwLock::new(None)),
        }
    }

    /// Installe le callback `notify-failed`.
    pub fn set_notify_failed_callback(&self, callback: NotifyFailedCallback) {
        *self.on_notify_failed.write().unwrap() = Some(callback);
    }

    pub fn count(&self) -> usize {
        self.subs.lock().unwrap().len()
    }

    pub fn contains(&self, sid: &str) -> bool {
        self.subs.lock().unwrap().contains_key(sid)
    }

    /// Crée un abonnement et retourne son SID.
    pub fn subscribe(&self, callbacks: Vec<Url>, timeout_secs: u64) -> String {
        let sid = format!("uuid:{}", Uuid::new_v4());
        let subscription = Subscription {
            callbacks,
            expires_at: Instant::now() + Duration::from_secs(timeout_secs),
            next_seq: 0,
            pending: Vec::new(),
            in_flight: false,
        };
        self.subs.lock().unwrap().insert(sid.clone(), subscription);
        info!(sid = sid.as_str(), timeout = timeout_secs, "🔒 New subscription");
        sid
    }

    /// Renouvelle un abonnement. Faux si le SID est inconnu.
    pub fn renew(&self, sid: &str, timeout_secs: u64) -> bool {
        let mut subs = self.subs.lock().unwrap();
        match subs.get_mut(sid) {
            Some(subscription) => {
                subscription.expires_at = Instant::now() + Duration::from_secs(timeout_secs);
                debug!(sid = sid, timeout = timeout_secs, "♻️ Subscription renewed");
                true
            }
            None => false,
        }
    }

    /// Supprime un abonnement. Faux si le SID est inconnu.
    pub fn unsubscribe(&self, sid: &str) -> bool {
        self.subs.lock().unwrap().remove(sid).is_some()
    }

    /// Enfile l'événement initial (toutes les variables événementées) pour un
    /// abonnement fraîchement créé et lance la livraison.
    pub fn enqueue_initial(&self, sid: &str, values: Vec<(String, String)>) {
        {
            let mut subs = self.subs.lock().unwrap();
            let Some(subscription) = subs.get_mut(sid) else {
                return;
            };
            subscription.pending = values;
        }
        self.kick(sid);
    }

    /// Enregistre un changement de variable pour tous les abonnés.
    pub fn notify_change(&self, name: &str, value: &str) {
        let to_kick: Vec<String> = {
            let mut subs = self.subs.lock().unwrap();
            subs.iter_mut()
                .map(|(sid, subscription)| {
                    subscription.coalesce(name, value);
                    sid.clone()
                })
                .collect()
        };
        for sid in to_kick {
            self.kick(&sid);
        }
    }

    /// Démarre une boucle de livraison pour un abonnement si aucune n'est en
    /// cours. La boucle draine l'ensemble en attente batch par batch, en SEQ
    /// croissant.
    fn kick(&self, sid: &str) {
        {
            let mut subs = self.subs.lock().unwrap();
            let Some(subscription) = subs.get_mut(sid) else {
                return;
            };
            if subscription.in_flight || subscription.pending.is_empty() {
                return;
            }
            subscription.in_flight = true;
        }

        let set = self.clone();
        let sid = sid.to_string();
        tokio::spawn(async move {
            set.delivery_loop(&sid).await;
        });
    }

    async fn delivery_loop(&self, sid: &str) {
        loop {
            let (seq, batch, callbacks) = {
                let mut subs = self.subs.lock().unwrap();
                let Some(subscription) = subs.get_mut(sid) else {
                    return;
                };
                match subscription.take_batch() {
                    Some((seq, batch)) => (seq, batch, subscription.callbacks.clone()),
                    None => {
                        subscription.in_flight = false;
                        return;
                    }
                }
            };

            let body = build_propertyset(&batch);
            if !deliver_notify(&callbacks, sid, seq, body).await {
                // Échec sur toutes les URLs : abandon de l'abonnement
                self.subs.lock().unwrap().remove(sid);
                let error = EventingError::NotifyFailed(format!(
                    "all callback URLs failed for SID {}",
                    sid
                ));
                warn!(sid = sid, "Dropping subscription: {}", error);
                if let Some(callback) = self.on_notify_failed.read().unwrap().clone() {
                    callback(&callbacks, &error);
                }
                return;
            }
        }
    }

    /// Lance la tâche périodique d'expiration des abonnements.
    pub fn start_expiry_scan(&self) -> tokio::task::JoinHandle<()> {
        let set = self.clone();
        tokio::spawn(async move {
            let mut ticker = time::interval(EXPIRY_SCAN_INTERVAL);
            loop {
                ticker.tick().await;
                let now = Instant::now();
                let mut subs = set.subs.lock().unwrap();
                subs.retain(|sid, subscription| {
                    let keep = subscription.expires_at > now;
                    if !keep {
                        debug!(sid = sid.as_str(), "Subscription expired");
                    }
                    keep
                });
            }
        })
    }
}

impl Default for SubscriptionSet {
    fn default() -> Self {
        Self::new()
    }
}

/// Livre un NOTIFY aux URLs de callback, dans l'ordre, en s'arrêtant au
/// premier succès HTTP.
async fn deliver_notify(callbacks: &[Url], sid: &str, seq: u32, body: String) -> bool {
    let client = reqwest::Client::builder()
        .timeout(NOTIFY_TIMEOUT)
        .build()
        .expect("reqwest client");

    for callback in callbacks {
        let result = client
            .request(
                reqwest::Method::from_bytes(b"NOTIFY").unwrap(),
                callback.clone(),
            )
            .header("Content-Type", "text/xml; charset=\"utf-8\"")
            .header("NT", "upnp:event")
            .header("NTS", "upnp:propchange")
            .header("SID", sid)
            .header("SEQ", seq.to_string())
            .body(body.clone())
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                debug!(sid = sid, seq = seq, callback = %callback, "NOTIFY delivered");
                return true;
            }
            Ok(response) => {
                warn!(
                    sid = sid,
                    callback = %callback,
                    status = %response.status(),
                    "NOTIFY rejected"
                );
            }
            Err(e) => {
                warn!(sid = sid, callback = %callback, "NOTIFY failed: {}", e);
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timeout_header() {
        assert_eq!(parse_timeout_header(Some("Second-600")), 600);
        assert_eq!(parse_timeout_header(Some("second-600")), 600);
        // Bornage [300, 1800]
        assert_eq!(parse_timeout_header(Some("Second-10")), 300);
        assert_eq!(parse_timeout_header(Some("Second-86400")), 1800);
        assert_eq!(parse_timeout_header(Some("infinite")), 1800);
        assert_eq!(parse_timeout_header(None), 1800);
        assert_eq!(parse_timeout_header(Some("garbage")), 1800);
    }

    #[test]
    fn test_parse_callback_header() {
        let urls =
            parse_callback_header("<http://10.0.0.2:8080/cb><http://10.0.0.3/fallback>");
        assert_eq!(urls.len(), 2);
        assert_eq!(urls[0].as_str(), "http://10.0.0.2:8080/cb");

        assert!(parse_callback_header("<ftp://nope>").is_empty());
        assert!(parse_callback_header("").is_empty());
    }

    #[test]
    fn test_build_propertyset_escapes_values() {
        let body = build_propertyset(&[("Track".to_string(), "a & b".to_string())]);
        assert!(body.starts_with("<e:propertyset xmlns:e=\"urn:schemas-upnp-org:event-1-0\">"));
        assert!(body.contains("<e:property><Track>a &amp; b</Track></e:property>"));
    }

    #[test]
    fn test_seq_sequence_and_wrap() {
        let mut subscription = Subscription {
            callbacks: Vec::new(),
            expires_at: Instant::now() + Duration::from_secs(60),
            next_seq: 0,
            pending: Vec::new(),
            in_flight: false,
        };

        subscription.coalesce("A", "1");
        let (seq, _) = subscription.take_batch().unwrap();
        assert_eq!(seq, 0);

        subscription.coalesce("A", "2");
        let (seq, _) = subscription.take_batch().unwrap();
        assert_eq!(seq, 1);

        // Après 2³²−1 on repart à 1, jamais 0
        subscription.next_seq = u32::MAX;
        subscription.coalesce("A", "3");
        let (seq, _) = subscription.take_batch().unwrap();
        assert_eq!(seq, u32::MAX);
        subscription.coalesce("A", "4");
        let (seq, _) = subscription.take_batch().unwrap();
        assert_eq!(seq, 1);
    }

    #[test]
    fn test_coalescing_last_write_wins() {
        let mut subscription = Subscription {
            callbacks: Vec::new(),
            expires_at: Instant::now() + Duration::from_secs(60),
            next_seq: 1,
            pending: Vec::new(),
            in_flight: false,
        };

        subscription.coalesce("Volume", "10");
        subscription.coalesce("Mute", "0");
        subscription.coalesce("Volume", "20");

        let (_, batch) = subscription.take_batch().unwrap();
        assert_eq!(
            batch,
            vec![
                ("Volume".to_string(), "20".to_string()),
                ("Mute".to_string(), "0".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn test_subscribe_renew_unsubscribe() {
        let set = SubscriptionSet::new();
        let sid = set.subscribe(Vec::new(), 1800);
        assert!(sid.starts_with("uuid:"));
        assert!(set.contains(&sid));

        assert!(set.renew(&sid, 600));
        assert!(!set.renew("uuid:unknown", 600));

        assert!(set.unsubscribe(&sid));
        assert!(!set.unsubscribe(&sid));
    }
}
