//! Preparation of downloaded pages before they are diffed.
//!
//! Two steps narrow a page down when part of its content is already known
//! (for example a feed summary):
//!
//! - [`get_html_of_inner_most_element`] finds the innermost container whose
//!   text holds the known content and returns its markup.
//! - [`remove_unrelated_elements`] drops containers whose `class` or `id`
//!   marks them as widgets (affiliate boxes, related-post lists, paging).

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::Result;
use crate::parse::{Document, Element};
use crate::serialize::strip_whitespace;

/// Characters dropped from the end of the known content before searching.
const REMOVAL_SUFFIX_LEN: usize = 10;

/// Search attempts; the search string is halved after each miss.
const MAX_RETRY_COUNT: usize = 2;

const ARTICLE_CONTAINER_TAGS: [&str; 4] = ["div", "p", "td", "article"];

const TEXT_CONTAINER_TAGS: [&str; 5] = ["div", "p", "td", "article", "span"];

const ATTRIBUTES_TO_CHECK: [&str; 2] = ["class", "id"];

const STOP_WORDS_IN_ATTRIBUTE: [&str; 12] = [
    "affiliate",
    "amazlet",
    "kaereba",
    "relate",
    "nextpage",
    "pagelink",
    "kanren",
    "footer",
    "menu",
    "btnarea",
    "linkarea",
    "paging",
];

/// Attribute values ending in `-ad`, `_ads` and the like.
#[allow(clippy::expect_used)]
static AD_SUFFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[-_]ads?$").expect("valid regex"));

/// Whether an element's `class` or `id` contains a widget stop word.
pub fn has_stop_words(element: Element<'_>) -> bool {
    ATTRIBUTES_TO_CHECK
        .iter()
        .filter_map(|name| element.attr(name))
        .filter(|value| !value.is_empty())
        .map(str::to_lowercase)
        .any(|value| {
            let compact = value.replace('-', "");
            STOP_WORDS_IN_ATTRIBUTE.iter().any(|word| compact.contains(word)) || AD_SUFFIX.is_match(&value)
        })
}

/// Indices of the widget containers below `scope` that should be removed.
///
/// A container whose whitespace-free text appears inside `keep_text` is
/// never removed.
pub fn unrelated_elements(scope: Element<'_>, keep_text: Option<&str>) -> BTreeSet<usize> {
    scope
        .descendants()
        .filter(|el| el.tag_name().is_some_and(|name| TEXT_CONTAINER_TAGS.contains(&name)))
        .filter(|&el| has_stop_words(el))
        .filter(|el| keep_text.is_none_or(|keep| !keep.contains(&strip_whitespace(&el.to_text()))))
        .map(|el| el.index())
        .collect()
}

/// Removes widget containers from a whole page.
///
/// Returns the page markup with every container flagged by
/// [`unrelated_elements`] left out. `keep_text` protects containers whose
/// text is part of known content.
///
/// # Errors
///
/// Returns [`crate::SiftError::Parse`] if `html` is blank.
pub fn remove_unrelated_elements(html: &str, keep_text: Option<&str>) -> Result<String> {
    let doc = Document::parse(html)?;
    let removed = unrelated_elements(doc.root(), keep_text);
    tracing::debug!(removed = removed.len(), "removed unrelated elements");
    Ok(doc.to_html_excluding(&removed))
}

/// Finds the innermost container holding `partial_content` and `title`.
///
/// Whitespace is ignored on both sides and the last few characters of the
/// partial content are not required to match. Containers are scanned from
/// the last one in document order backwards, so the deepest match wins.
/// When nothing matches, the search string is halved and the scan repeated
/// once. The match is returned with its widget containers removed.
///
/// # Errors
///
/// Returns [`crate::SiftError::Parse`] if `html` is blank.
pub fn get_html_of_inner_most_element(html: &str, partial_content: &str, title: Option<&str>) -> Result<Option<String>> {
    let partial = strip_whitespace(partial_content);
    let title = title.map(strip_whitespace).unwrap_or_default();

    let partial_chars: Vec<char> = partial.chars().collect();
    let mut search = partial_chars[..partial_chars.len().saturating_sub(REMOVAL_SUFFIX_LEN)].to_vec();

    let doc = Document::parse(html)?;
    let containers: Vec<(Element<'_>, String)> = doc
        .elements_by_tag(&ARTICLE_CONTAINER_TAGS)
        .map(|el| (el, strip_whitespace(&el.to_text())))
        .collect();

    for attempt in 0..MAX_RETRY_COUNT {
        if search.is_empty() {
            break;
        }
        let needle: String = search.iter().collect();

        let found = containers
            .iter()
            .rev()
            .find(|(_, text)| text.contains(&needle) && text.contains(&title));
        if let Some((el, _)) = found {
            let removed = unrelated_elements(*el, Some(&partial));
            tracing::debug!(attempt, index = el.index(), removed = removed.len(), "located content container");
            return Ok(Some(el.outer_html_excluding(&removed)));
        }

        tracing::trace!(attempt, length = search.len(), "no container matched; shrinking search string");
        search.truncate(search.len() / 2);
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    const IGNORED_SUFFIX: &str = "xxxxxxxxxx";

    fn make_html(inner_body: &str) -> String {
        format!("<html><head></head><body><article>{}</article></body></html>", inner_body)
    }

    fn locate(inner_body: &str, partial: &str) -> Option<String> {
        get_html_of_inner_most_element(&make_html(inner_body), &format!("{}{}", partial, IGNORED_SUFFIX), None).unwrap()
    }

    #[test]
    fn test_locator_without_match() {
        assert_eq!(locate("<p>abc</p><p>def</p>", "z"), None);
    }

    #[test]
    fn test_locator_single_tag() {
        assert_eq!(locate("<p>abc</p><p>def</p>", "a"), Some("<p>abc</p>".to_string()));
    }

    #[test]
    fn test_locator_spanning_tags() {
        assert_eq!(
            locate("<p>abc</p><p>def</p>", "abcd"),
            Some("<article><p>abc</p><p>def</p></article>".to_string())
        );
        assert_eq!(
            locate("<p>abc</p><p>def</p><p>ghi</p>", "abcd"),
            Some("<article><p>abc</p><p>def</p><p>ghi</p></article>".to_string())
        );
    }

    #[test]
    fn test_locator_escapes_quotes() {
        let expected = Some("<p>&apos;a&quot;a</p>".to_string());
        assert_eq!(locate(r#"<p>'a"a</p><p>def</p>"#, "'a"), expected);
        assert_eq!(locate(r#"<p>'a"a</p><p>def</p>"#, "\"a"), expected);
        assert_eq!(locate(r#"<p>'a"a</p><p>def</p>"#, r#"'a"a"#), expected);
    }

    #[test]
    fn test_locator_parenthesis() {
        assert_eq!(locate("<p>bbb)aaa</p><p>def</p>", "bbb)"), Some("<p>bbb)aaa</p>".to_string()));
        assert_eq!(locate("<p>)aaa</p><p>def</p>", ")aaa"), Some("<p>)aaa</p>".to_string()));
    }

    #[test]
    fn test_locator_halves_search_string() {
        assert_eq!(locate("<p>abcdef</p><p>ghi</p>", "abcdXYZW"), Some("<p>abcdef</p>".to_string()));
    }

    #[test]
    fn test_locator_requires_title() {
        let html = make_html("<div><h1>My Title</h1><p>abc</p></div><p>abc</p>");
        let found = get_html_of_inner_most_element(&html, &format!("abc{}", IGNORED_SUFFIX), Some("My Title")).unwrap();
        assert_eq!(found, Some("<div><h1>My Title</h1><p>abc</p></div>".to_string()));
    }

    #[test]
    fn test_locator_removes_widgets() {
        let html = make_html(r#"<div><p>abc</p><p>def</p><div class="related-posts">other</div></div>"#);
        let found = get_html_of_inner_most_element(&html, &format!("abcdef{}", IGNORED_SUFFIX), Some("")).unwrap();
        assert_eq!(found, Some("<div><p>abc</p><p>def</p></div>".to_string()));
    }

    #[test]
    fn test_locator_keeps_widgets_holding_content() {
        let html = make_html(r#"<div><p>abc</p><div class="related-posts">other</div></div>"#);
        let found = get_html_of_inner_most_element(&html, &format!("abcother{}", IGNORED_SUFFIX), None).unwrap();
        assert_eq!(found, Some(r#"<div><p>abc</p><div class="related-posts">other</div></div>"#.to_string()));
    }

    #[test]
    fn test_keep_plain_elements() {
        let html = make_html("<div>abc</div><p>def</p>");
        assert_eq!(remove_unrelated_elements(&html, None).unwrap(), html);
    }

    #[test]
    fn test_remove_by_class() {
        let html = make_html(r#"<div class="webryblog_rakuten_affiliate_box">abc</div><p>def</p>"#);
        assert_eq!(remove_unrelated_elements(&html, None).unwrap(), make_html("<p>def</p>"));
    }

    #[test]
    fn test_remove_by_id() {
        let html = make_html(r#"<div id="ldblog_related_articles_5a463303">abc</div><p>def</p>"#);
        assert_eq!(remove_unrelated_elements(&html, None).unwrap(), make_html("<p>def</p>"));
    }

    #[test]
    fn test_remove_ad_suffix_and_hyphenated_words() {
        let html = make_html(r#"<span class="side_ads">ad</span><div id="Foot-er">f</div><p class="adsense">x</p>"#);
        assert_eq!(
            remove_unrelated_elements(&html, None).unwrap(),
            make_html(r#"<p class="adsense">x</p>"#)
        );
    }

    #[test]
    fn test_keep_text_protects_content() {
        let html = make_html(r#"<div class="menu">abc</div><div class="menu">zzz</div>"#);
        assert_eq!(
            remove_unrelated_elements(&html, Some("abcdef")).unwrap(),
            make_html(r#"<div class="menu">abc</div>"#)
        );
    }
}
