//! Flattening of extracted markup into plain text.

use crate::parse::{Document, Element, NodeKind};

/// Elements whose content is dropped entirely.
const DROPPED_TAGS: [&str; 5] = ["script", "style", "noscript", "textarea", "option"];

/// Attributes an `<img>` keeps when images are allowed.
const IMAGE_ATTRIBUTES: [&str; 4] = ["src", "alt", "height", "width"];

/// Strips all markup from `markup`, returning unescaped text.
///
/// With `keep_images`, `<img>` tags survive with only their `src`, `alt`,
/// `height` and `width` attributes.
///
/// # Example
///
/// ```rust
/// use blogsift_core::sanitize::sanitize;
///
/// let text = sanitize(r#"<div><p>Fish &amp; chips</p><img src="a.png" class="wide"></div>"#, true);
/// assert_eq!(text, r#"Fish & chips<img src="a.png">"#);
/// ```
pub fn sanitize(markup: &str, keep_images: bool) -> String {
    let Ok(doc) = Document::parse(markup) else {
        return String::new();
    };

    let mut out = String::new();
    write_sanitized(doc.root(), keep_images, &mut out);
    out
}

fn write_sanitized(element: Element<'_>, keep_images: bool, out: &mut String) {
    match element.kind() {
        NodeKind::Text(text) => out.push_str(text),
        NodeKind::Element(data) if DROPPED_TAGS.contains(&data.name.as_str()) => {}
        NodeKind::Element(data) if data.name == "img" => {
            if keep_images {
                out.push_str("<img");
                for (key, value) in data.attrs.iter().filter(|(key, _)| IMAGE_ATTRIBUTES.contains(&key.as_str())) {
                    out.push_str(&format!(" {}=\"{}\"", key, value.replace('"', "&quot;")));
                }
                out.push('>');
            }
        }
        NodeKind::Element(_) => {
            for child in element.children() {
                write_sanitized(child, keep_images, out);
            }
        }
    }
}
