//! Codec des en-têtes HTTP spécifiques à UPnP/DLNA.
//!
//! Range, Accept-Language, User-Agent et devinette de Content-Type. Le
//! User-Agent et l'identifiant Server sont les deux seuls états globaux du
//! process avec la factory de proxies.

use once_cell::sync::OnceCell;

/// Intervalle d'octets demandé par un en-tête Range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub offset: u64,
    pub length: u64,
}

/// Parse un en-tête `Range`.
///
/// Accepte `bytes=a-b` et `bytes=a-` ; la forme suffixe `bytes=-b` est
/// rejetée. `default_length` est la taille de la ressource, utilisée quand la
/// borne haute est absente.
pub fn parse_range(header: &str, default_length: u64) -> Option<ByteRange> {
    let spec = header.strip_prefix("bytes=")?;
    let (first, last) = spec.split_once('-')?;

    // Pas de support des ranges sans position de départ
    if first.is_empty() {
        return None;
    }
    let offset: u64 = first.trim().parse().ok()?;

    let length = if last.is_empty() {
        default_length.checked_sub(offset)?
    } else {
        let end: u64 = last.trim().parse().ok()?;
        end.checked_sub(offset)?
    };

    Some(ByteRange { offset, length })
}

/// Convertit une locale POSIX en tag de langue HTTP.
///
/// `en_US.UTF-8` devient `en-US` ; retourne aussi la langue de base (`en`)
/// quand un pays est présent.
fn http_tag_from_locale(locale: &str) -> Option<(String, Option<String>)> {
    let stripped = locale
        .split(['.', '@'])
        .next()
        .unwrap_or(locale)
        .trim();
    if stripped.is_empty() || stripped == "C" || stripped == "POSIX" {
        return None;
    }

    match stripped.split_once('_') {
        Some((lang, country)) => {
            let tag = format!("{}-{}", lang, country.to_ascii_uppercase());
            Some((tag, Some(lang.to_string())))
        }
        None => Some((stripped.to_string(), None)),
    }
}

/// Convertit une locale POSIX en tag de langue HTTP (`en_US.UTF-8` → `en-US`).
pub fn locale_to_http_tag(locale: &str) -> Option<String> {
    http_tag_from_locale(locale).map(|(tag, _)| tag)
}

/// Convertit un tag de langue HTTP en locale POSIX (`en-us` → `en_US`).
pub fn locale_from_http_tag(tag: &str) -> String {
    let tag = tag.split(';').next().unwrap_or(tag).trim();
    match tag.split_once('-') {
        Some((lang, country)) => format!("{}_{}", lang, country.to_ascii_uppercase()),
        None => tag.to_string(),
    }
}

/// Valeur `Accept-Language` dérivée de la locale du process.
///
/// Lit `LC_ALL`, `LC_MESSAGES` puis `LANG` ; `None` pour la locale `C`.
pub fn accept_language_from_locale() -> Option<String> {
    let locale = ["LC_ALL", "LC_MESSAGES", "LANG"]
        .iter()
        .find_map(|var| std::env::var(var).ok().filter(|v| !v.is_empty()))?;

    let (tag, base) = http_tag_from_locale(&locale)?;

    let mut value = format!("{};q=1", tag);
    if let Some(base) = base {
        value.push_str(&format!(", {};q=0.5", base));
    }
    Some(value)
}

fn quality_of(item: &str) -> f64 {
    item.split_once(";q=")
        .and_then(|(_, q)| q.trim().parse().ok())
        .unwrap_or(1.0)
}

/// Parse un en-tête `Accept-Language` en liste ordonnée de locales POSIX.
///
/// Tri par insertion, stable, par qualité décroissante ; les entrées vides et
/// les jokers `*` sont ignorés.
pub fn parse_accept_language(header: &str) -> Vec<String> {
    let mut items: Vec<&str> = Vec::new();

    for raw in header.split(',') {
        let item = raw.trim();
        let q = quality_of(item);

        // Insertion stable : on se place après les entrées de qualité >= q
        let pos = items
            .iter()
            .position(|existing| quality_of(existing) < q)
            .unwrap_or(items.len());
        items.insert(pos, item);
    }

    items
        .into_iter()
        .filter(|item| !item.is_empty() && !item.starts_with('*'))
        .map(locale_from_http_tag)
        .collect()
}

static USER_AGENT: OnceCell<String> = OnceCell::new();
static SERVER_ID: OnceCell<String> = OnceCell::new();

/// User-Agent du process, calculé une seule fois.
///
/// Format : `"<app> GUPnP/<version> DLNADOC/1.50"`. Le premier appel fixe le
/// nom d'application pour toute la durée du process.
pub fn user_agent_for(app_name: &str) -> &'static str {
    USER_AGENT.get_or_init(|| {
        format!(
            "{} GUPnP/{} DLNADOC/1.50",
            app_name,
            env!("CARGO_PKG_VERSION")
        )
        .trim_start()
        .to_string()
    })
}

/// User-Agent sans nom d'application.
pub fn user_agent() -> &'static str {
    user_agent_for("")
}

/// Identifiant envoyé dans l'en-tête `Server` des réponses.
pub fn server_id() -> &'static str {
    SERVER_ID.get_or_init(|| {
        format!(
            "{} UPnP/1.0 ravupnp/{}",
            std::env::consts::OS,
            env!("CARGO_PKG_VERSION")
        )
    })
}

/// Devine un Content-Type à partir du chemin puis des premiers octets.
pub fn guess_content_type(path: &str, prefix: &[u8]) -> &'static str {
    let extension = path.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());

    if let Some(ext) = extension {
        let by_ext = match ext.as_str() {
            "xml" => Some("text/xml"),
            "html" | "htm" => Some("text/html"),
            "txt" => Some("text/plain"),
            "json" => Some("application/json"),
            "css" => Some("text/css"),
            "js" => Some("application/javascript"),
            "png" => Some("image/png"),
            "jpg" | "jpeg" => Some("image/jpeg"),
            "gif" => Some("image/gif"),
            "ico" => Some("image/x-icon"),
            "mp3" => Some("audio/mpeg"),
            "flac" => Some("audio/flac"),
            "wav" => Some("audio/wav"),
            "ogg" => Some("audio/ogg"),
            "mp4" => Some("video/mp4"),
            _ => None,
        };
        if let Some(mime) = by_ext {
            return mime;
        }
    }

    // Sniffing sur les premiers octets
    if prefix.starts_with(b"\x89PNG") {
        "image/png"
    } else if prefix.starts_with(b"\xff\xd8") {
        "image/jpeg"
    } else if prefix.starts_with(b"GIF8") {
        "image/gif"
    } else if prefix.starts_with(b"fLaC") {
        "audio/flac"
    } else if prefix.starts_with(b"ID3") {
        "audio/mpeg"
    } else if prefix.starts_with(b"<?xml") {
        "text/xml"
    } else {
        "application/octet-stream"
    }
}
