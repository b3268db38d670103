//! Helpers XML : parcours DOM et émission de fragments.
//!
//! Le parcours s'appuie sur le DOM `xmltree` ; les noms d'éléments sont
//! comparés sans leur préfixe de namespace (xmltree les sépare déjà).
//! L'émission produit des fragments minimalement échappés (`&`, `<`, `>`,
//! `"`), utilisés pour les corps SOAP et GENA construits en streaming.

use xmltree::Element;

/// Itère sur les enfants éléments (ignore textes et commentaires).
pub fn children(element: &Element) -> impl Iterator<Item = &Element> {
    element.children.iter().filter_map(|node| node.as_element())
}

/// Premier enfant élément portant ce nom local.
pub fn find_child<'a>(element: &'a Element, name: &str) -> Option<&'a Element> {
    children(element).find(|child| child.name == name)
}

/// Descend une séquence fixe de noms d'éléments.
pub fn find_path<'a>(root: &'a Element, path: &[&str]) -> Option<&'a Element> {
    let mut current = root;
    for name in path {
        current = find_child(current, name)?;
    }
    Some(current)
}

/// Contenu textuel d'un élément.
pub fn text_of(element: &Element) -> String {
    element
        .get_text()
        .map(|cow| cow.into_owned())
        .unwrap_or_default()
}

/// Contenu textuel d'un enfant nommé.
pub fn child_text(element: &Element, name: &str) -> Option<String> {
    find_child(element, name).map(text_of)
}

/// Contenu entier d'un enfant nommé.
pub fn child_int(element: &Element, name: &str) -> Option<i64> {
    child_text(element, name).and_then(|text| text.trim().parse().ok())
}

/// Émet une balise ouvrante.
///
/// `name` peut contenir des attributs (`r#"u:Play xmlns:u="...""#`) ; la
/// balise fermante correspondante se fait avec le nom seul.
pub fn start_element(buf: &mut String, name: &str) {
    buf.push('<');
    buf.push_str(name);
    buf.push('>');
}

/// Émet une balise fermante.
pub fn end_element(buf: &mut String, name: &str) {
    buf.push_str("</");
    buf.push_str(name);
    buf.push('>');
}

/// Émet du contenu textuel échappé.
pub fn append_escaped(buf: &mut String, content: &str) {
    for c in content.chars() {
        match c {
            '&' => buf.push_str("&amp;"),
            '<' => buf.push_str("&lt;"),
            '>' => buf.push_str("&gt;"),
            '"' => buf.push_str("&quot;"),
            other => buf.push(other),
        }
    }
}
