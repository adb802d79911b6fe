//! Article-level orchestration over already downloaded pages.
//!
//! Feeds often carry only a teaser of each post. When the teasers look
//! incomplete, every article page is narrowed to the container holding its
//! teaser, diffed against a sibling article from the same blog and the
//! differing subtree becomes the article content.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::Result;
use crate::extract::{ExtractConfig, extract_content};
use crate::postprocess::cleanup_articles;
use crate::preprocess::{get_html_of_inner_most_element, remove_unrelated_elements};
use crate::sanitize::sanitize;

/// Number of trailing characters checked for a "read more" marker.
const SUFFIX_LEN: usize = 10;

/// Contents at most this long are considered teasers.
const MAX_CONTENT_LEN: usize = 200;

#[allow(clippy::expect_used)]
static INCOMPLETENESS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\.{3}|…|続きを読む").expect("valid regex"));

/// Where an article's content came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractMethod {
    #[default]
    Rss,
    Feedly,
    Scrape,
}

/// A blog post.
///
/// The intermediate markup fields are not serialized.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub author: String,
    pub content: String,
    #[serde(default)]
    pub extract_method: ExtractMethod,
    /// Page markup with widget containers removed.
    #[serde(skip)]
    pub html: Option<String>,
    /// Markup of the innermost container holding the known content.
    #[serde(skip)]
    pub partial_html: Option<String>,
}

impl Article {
    pub fn new(url: impl Into<String>, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self { url: url.into(), title: title.into(), content: content.into(), ..Default::default() }
    }

    /// Host of the article URL, if it parses.
    pub fn host(&self) -> Option<String> {
        Url::parse(&self.url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
    }
}

/// Whether the feed contents should be replaced by content scraped from pages.
///
/// True when there is more than one article and any content is empty, any
/// content ends with a "read more" marker, or every content is short.
pub fn needs_html_extraction(articles: &[Article]) -> bool {
    if articles.len() <= 1 {
        return false;
    }

    let has_empty = articles.iter().any(|a| a.content.is_empty());
    let has_incomplete = articles.iter().any(|a| {
        let chars: Vec<char> = a.content.chars().collect();
        let tail: String = chars[chars.len().saturating_sub(SUFFIX_LEN)..].iter().collect();
        INCOMPLETENESS.is_match(&tail)
    });
    let all_short = articles.iter().all(|a| a.content.chars().count() <= MAX_CONTENT_LEN);

    has_empty || has_incomplete || all_short
}

/// Picks the article to diff `index` against.
///
/// Only articles for which `field` is present qualify; one on the same host
/// is preferred, otherwise the first one.
pub fn partner<F>(articles: &[Article], index: usize, field: F) -> Option<usize>
where
    F: Fn(&Article) -> Option<&str>,
{
    let host = articles.get(index)?.host();
    let others: Vec<usize> = (0..articles.len())
        .filter(|&j| j != index && field(&articles[j]).is_some())
        .collect();

    others
        .iter()
        .copied()
        .find(|&j| host.is_some() && articles[j].host() == host)
        .or_else(|| others.first().copied())
}

/// Diff-based content for one article, `None` when it has no partner.
fn scrape(articles: &[Article], index: usize, config: &ExtractConfig) -> Result<Option<String>> {
    let article = &articles[index];
    let pair = if let Some(own) = article.partial_html.as_deref() {
        partner(articles, index, |a| a.partial_html.as_deref())
            .and_then(|j| articles[j].partial_html.as_deref())
            .map(|other| (own, other))
    } else if let Some(own) = article.html.as_deref() {
        partner(articles, index, |a| a.html.as_deref())
            .and_then(|j| articles[j].html.as_deref())
            .map(|other| (own, other))
    } else {
        None
    };

    let Some((own, other)) = pair else {
        tracing::debug!(url = %article.url, "no partner article to diff against");
        return Ok(None);
    };

    let extracted = extract_content(&[own, other], config)?;
    Ok(Some(sanitize(&extracted.content, config.keep_images)))
}

/// Fills in article contents from their downloaded `pages`.
///
/// `pages[i]` is the markup of `articles[i]`. Scraping only happens when
/// forced, when [`needs_html_extraction`] says so, or when some content is
/// empty. Afterwards the text shared by every content is stripped.
pub fn process_articles<S: AsRef<str>>(articles: &mut [Article], pages: &[S], config: &ExtractConfig) -> Result<()> {
    let using_diff =
        config.force_diff || needs_html_extraction(articles) || articles.iter().any(|a| a.content.is_empty());

    if using_diff {
        for (article, page) in articles.iter_mut().zip(pages) {
            let page = page.as_ref();
            if !article.content.is_empty() {
                article.partial_html = get_html_of_inner_most_element(page, &article.content, Some(article.title.as_str()))?;
            }
            article.html = Some(remove_unrelated_elements(page, None)?);
        }

        let scraped = (0..articles.len())
            .map(|index| scrape(articles, index, config))
            .collect::<Result<Vec<_>>>()?;
        for (article, content) in articles.iter_mut().zip(scraped) {
            if let Some(content) = content {
                article.content = content;
                article.extract_method = ExtractMethod::Scrape;
            }
        }
        tracing::debug!(articles = articles.len(), "scraped article contents");
    }

    cleanup_articles(articles, config.min_common_characters);
    Ok(())
}

/// Serializes articles as a JSON array.
pub fn to_json(articles: &[Article]) -> Result<String> {
    Ok(serde_json::to_string_pretty(articles)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post_page(title: &str, first: &str, second: &str) -> String {
        format!(
            concat!(
                "<html><head><title>{0} | Tiny Blog</title></head><body>",
                "<header><a href=\"/\">Tiny Blog</a></header>",
                "<div class=\"post\"><h1>{0}</h1><div class=\"entry-body\"><p>{1}</p><p>{2}</p></div></div>",
                "<div class=\"related-posts\"><a href=\"/1\">Alpha Day</a><a href=\"/2\">Beta Rain</a></div>",
                "<footer>Copyright Tiny Blog</footer></body></html>"
            ),
            title, first, second
        )
    }

    fn fixture() -> (Vec<Article>, Vec<String>) {
        let articles = vec![
            Article::new("https://tiny.example/1", "Alpha Day", "Alpha day one was sunny and warm..."),
            Article::new("https://tiny.example/2", "Beta Rain", "Beta morning brought heavy rain..."),
            Article::new("https://tiny.example/3", "Gamma Night", "Gamma evening had clear skies..."),
        ];
        let pages = vec![
            post_page("Alpha Day", "Alpha day one was sunny and warm.", "We walked to the river at noon!"),
            post_page("Beta Rain", "Beta morning brought heavy rain.", "Nobody left the house all day?"),
            post_page("Gamma Night", "Gamma evening had clear skies.", "Stars filled the night sky."),
        ];
        (articles, pages)
    }

    #[test]
    fn test_needs_html_extraction() {
        let long = "x".repeat(300);
        let full = vec![Article::new("a", "A", long.clone()), Article::new("b", "B", long.clone())];
        assert!(!needs_html_extraction(&full));

        let teaser = vec![Article::new("a", "A", format!("{}続きを読む", long)), Article::new("b", "B", long.clone())];
        assert!(needs_html_extraction(&teaser));

        let dots = vec![Article::new("a", "A", format!("{}…", long)), Article::new("b", "B", long.clone())];
        assert!(needs_html_extraction(&dots));

        let empty = vec![Article::new("a", "A", ""), Article::new("b", "B", long.clone())];
        assert!(needs_html_extraction(&empty));

        let short = vec![Article::new("a", "A", "short"), Article::new("b", "B", "also short")];
        assert!(needs_html_extraction(&short));

        let single = vec![Article::new("a", "A", "")];
        assert!(!needs_html_extraction(&single));
    }

    #[test]
    fn test_partner_prefers_same_host() {
        let mut articles = vec![
            Article::new("https://a.example/1", "1", "x"),
            Article::new("https://b.example/2", "2", "x"),
            Article::new("https://a.example/3", "3", "x"),
        ];
        for article in &mut articles {
            article.html = Some("<p>x</p>".to_string());
        }

        assert_eq!(partner(&articles, 0, |a| a.html.as_deref()), Some(2));
        assert_eq!(partner(&articles, 1, |a| a.html.as_deref()), Some(0));
        assert_eq!(partner(&articles, 0, |a| a.partial_html.as_deref()), None);
    }

    #[test]
    fn test_process_articles_scrapes_teasers() {
        let (mut articles, pages) = fixture();
        process_articles(&mut articles, &pages, &ExtractConfig::default()).unwrap();

        assert_eq!(articles[0].content, "Alpha day one was sunny and warm.We walked to the river at noon!");
        assert_eq!(articles[1].content, "Beta morning brought heavy rain.Nobody left the house all day?");
        assert_eq!(articles[2].content, "Gamma evening had clear skies.Stars filled the night sky.");
        assert!(articles.iter().all(|a| a.extract_method == ExtractMethod::Scrape));
        assert!(articles.iter().all(|a| a.partial_html.is_some()));
    }

    #[test]
    fn test_process_articles_keeps_complete_contents() {
        let long_a = format!("Alpha {}", "a".repeat(250));
        let long_b = format!("Beta {}", "b".repeat(250));
        let mut articles = vec![
            Article::new("https://tiny.example/1", "Alpha Day", long_a.clone()),
            Article::new("https://tiny.example/2", "Beta Rain", long_b.clone()),
        ];
        let pages = vec!["<p>unused</p>", "<p>unused</p>"];

        process_articles(&mut articles, &pages, &ExtractConfig::default()).unwrap();
        assert_eq!(articles[0].content, long_a);
        assert_eq!(articles[0].extract_method, ExtractMethod::Rss);
        assert!(articles[0].html.is_none());
    }

    #[test]
    fn test_to_json_skips_markup() {
        let (mut articles, pages) = fixture();
        process_articles(&mut articles, &pages, &ExtractConfig::default()).unwrap();

        let json = to_json(&articles).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["extractMethod"], "scrape");
        assert_eq!(value[0]["title"], "Alpha Day");
        assert!(value[0].get("html").is_none());
        assert!(value[0].get("partialHtml").is_none());
    }
}
