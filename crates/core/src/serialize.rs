//! Text and markup serialization for indexed documents.

use std::collections::BTreeSet;

use crate::parse::{Document, NodeKind};

/// Elements whose content never counts as readable text.
pub const NON_TEXT_TAGS: [&str; 3] = ["script", "style", "noscript"];

/// Elements serialized without a closing tag.
pub const VOID_TAGS: [&str; 13] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track", "wbr",
];

const RAW_TEXT_TAGS: [&str; 8] = [
    "script", "style", "xmp", "iframe", "noembed", "noframes", "noscript", "plaintext",
];

/// How [`write_markup`] renders a subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkupStyle {
    /// Whitespace-normalized text, non-text elements collapsed to `...`.
    Compact,
    /// Text kept as parsed.
    Faithful,
}

/// Collapses runs of whitespace to a single space and trims both ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Removes every whitespace character.
pub fn strip_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Escapes `& < > " '` as character entities.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Appends the normalized text of the subtree at `index`.
pub(crate) fn write_text(doc: &Document, index: usize, out: &mut String) {
    let node = doc.node(index);
    match &node.kind {
        NodeKind::Text(text) => out.push_str(&normalize_whitespace(text)),
        NodeKind::Element(data) if NON_TEXT_TAGS.contains(&data.name.as_str()) => {}
        NodeKind::Element(_) => {
            for &child in &node.children {
                write_text(doc, child, out);
            }
        }
    }
}

/// Appends the markup of the subtree at `index`, skipping any subtree rooted
/// at an index in `removed`.
pub(crate) fn write_markup(doc: &Document, index: usize, style: MarkupStyle, removed: &BTreeSet<usize>, out: &mut String) {
    if removed.contains(&index) {
        return;
    }

    let node = doc.node(index);
    let data = match &node.kind {
        NodeKind::Text(text) => {
            let raw_parent = doc
                .entry(index)
                .and_then(|entry| entry.parent_index)
                .and_then(|parent| doc.get(parent))
                .and_then(|parent| parent.tag_name())
                .is_some_and(|name| RAW_TEXT_TAGS.contains(&name));
            match style {
                MarkupStyle::Compact => out.push_str(&escape(&normalize_whitespace(text))),
                MarkupStyle::Faithful if raw_parent => out.push_str(text),
                MarkupStyle::Faithful => out.push_str(&escape(text)),
            }
            return;
        }
        NodeKind::Element(data) => data,
    };

    out.push('<');
    out.push_str(&data.name);
    for (key, value) in &data.attrs {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(&escape(value));
        out.push('"');
    }
    out.push('>');

    if VOID_TAGS.contains(&data.name.as_str()) {
        return;
    }

    if style == MarkupStyle::Compact && NON_TEXT_TAGS.contains(&data.name.as_str()) {
        out.push_str("...");
    } else {
        for &child in &node.children {
            write_markup(doc, child, style, removed, out);
        }
    }

    out.push_str("</");
    out.push_str(&data.name);
    out.push('>');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  a \n\t b  "), "a b");
        assert_eq!(normalize_whitespace(" \n "), "");
    }

    #[test]
    fn test_strip_whitespace() {
        assert_eq!(strip_whitespace(" a b\u{3000}c\n"), "abc");
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape(r#"<a href="x">'&'</a>"#), "&lt;a href=&quot;x&quot;&gt;&apos;&amp;&apos;&lt;/a&gt;");
    }

    #[test]
    fn test_faithful_markup_keeps_whitespace_and_scripts() {
        let doc = Document::parse("<html><head></head><body><p>a  b</p><script>if (a < b) {}</script></body></html>").unwrap();
        assert_eq!(
            doc.to_html(),
            "<html><head></head><body><p>a  b</p><script>if (a < b) {}</script></body></html>"
        );
    }

    #[test]
    fn test_doctype_is_emitted() {
        let doc = Document::parse("<!DOCTYPE html><html><head></head><body></body></html>").unwrap();
        assert_eq!(doc.to_html(), "<!DOCTYPE html><html><head></head><body></body></html>");
    }

    #[test]
    fn test_markup_skips_removed_subtrees() {
        let doc = Document::parse("<html><head></head><body><p>keep</p><div>drop <b>me</b></div></body></html>").unwrap();
        let div = doc.elements_by_tag(&["div"]).next().unwrap();
        let removed = BTreeSet::from([div.index()]);
        assert_eq!(
            doc.to_html_excluding(&removed),
            "<html><head></head><body><p>keep</p></body></html>"
        );
    }

    #[test]
    fn test_compact_markup_void_and_noscript() {
        let doc = Document::parse(r#"<html><body><p>one<br>two</p><noscript><img src="x"></noscript></body></html>"#).unwrap();
        let body = doc.elements_by_tag(&["body"]).next().unwrap();
        assert_eq!(body.to_html(), "<body><p>one<br>two</p><noscript>...</noscript></body>");
    }
}
