//! Sélection d'icônes de device.

use url::Url;

/// Une icône annoncée dans `<iconList>`.
#[derive(Debug, Clone)]
pub struct Icon {
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub url: Url,
}

/// Critères de sélection d'icône.
#[derive(Debug, Clone, Default)]
pub struct IconSpec {
    /// Type MIME exigé (filtre exact)
    pub mime_type: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub depth: Option<u32>,
    /// À poids égal, préférer la plus grande icône
    pub prefer_bigger: bool,
}

/// Poids d'une dimension contrainte.
///
/// La cible effective est doublée quand on préfère les grandes icônes et
/// divisée par deux sinon, puis la candidate la plus proche l'emporte. Sans
/// contrainte, la dimension ne pèse pas.
fn dimension_weight(requested: Option<u32>, candidate: u32, prefer_bigger: bool) -> i64 {
    match requested {
        None => 0,
        Some(t) => {
            let t = t as i64;
            let c = candidate as i64;
            if prefer_bigger {
                (2 * t - c).abs()
            } else {
                (t - 2 * c).abs()
            }
        }
    }
}

fn icon_weight(icon: &Icon, spec: &IconSpec) -> i64 {
    dimension_weight(spec.width, icon.width, spec.prefer_bigger)
        + dimension_weight(spec.height, icon.height, spec.prefer_bigger)
        + dimension_weight(spec.depth, icon.depth, spec.prefer_bigger)
}

fn icon_area(icon: &Icon) -> u64 {
    icon.width as u64 * icon.height.max(1) as u64
}

/// Choisit la meilleure icône selon les critères.
///
/// Le type MIME, s'il est demandé, filtre strictement. Les dimensions
/// contraintes pèsent chacune par proximité ; les égalités se départagent par
/// la taille, dans le sens de `prefer_bigger`.
pub fn select_icon<'a>(icons: &'a [Icon], spec: &IconSpec) -> Option<&'a Icon> {
    let mut best: Option<(&Icon, i64)> = None;

    for icon in icons {
        if let Some(mime) = &spec.mime_type {
            if &icon.mime_type != mime {
                continue;
            }
        }

        let weight = icon_weight(icon, spec);

        best = match best {
            None => Some((icon, weight)),
            Some((current, current_weight)) => {
                let replace = if weight != current_weight {
                    weight < current_weight
                } else if spec.prefer_bigger {
                    icon_area(icon) > icon_area(current)
                } else {
                    icon_area(icon) < icon_area(current)
                };
                if replace {
                    Some((icon, weight))
                } else {
                    Some((current, current_weight))
                }
            }
        };
    }

    best.map(|(icon, _)| icon)
}
