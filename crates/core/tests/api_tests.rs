//! Library API integration tests
use std::collections::BTreeSet;

use blogsift_core::*;

fn get_fixture_path(name: &str) -> String {
    format!("../../tests/fixtures/blog/{}", name)
}

fn load_pages() -> Vec<String> {
    ["page1.html", "page2.html", "page3.html"]
        .iter()
        .map(|name| std::fs::read_to_string(get_fixture_path(name)).unwrap())
        .collect()
}

#[test]
fn test_extract_content_api() {
    let pages = load_pages();
    let extracted = extract_content(&pages, &ExtractConfig::default()).expect("should extract");

    assert!(extracted.content.starts_with("<div class=\"entry-body\">"));
    assert!(extracted.content.contains("Spring finally arrived"));
    assert!(extracted.content.contains("pegboard where they belong"));
    assert!(!extracted.content.contains("Recent posts"));
    assert!(!extracted.content.contains("Copyright"));
    assert_eq!(extracted.total_weight, 6.0);
    assert_eq!(extracted.threshold, 3.0);
}

#[test]
fn test_each_page_as_baseline() {
    let pages = load_pages();
    let config = ExtractConfig::default();

    let mut rotated = pages.clone();
    rotated.rotate_left(1);
    let second = extract_content(&rotated, &config).expect("should extract");
    assert!(second.content.contains("Walnut boards"));
    assert!(!second.content.contains("Spring finally arrived"));

    rotated.rotate_left(1);
    let third = extract_content(&rotated, &config).expect("should extract");
    assert!(third.content.contains("leather strop"));
}

#[test]
fn test_text_length_metric() {
    let pages = load_pages();
    let config = ExtractConfig::builder().weight_metric(WeightMetric::TextLength).build();
    let extracted = extract_content(&pages, &config).expect("should extract");

    assert!(extracted.content.contains("Sawdust had collected"));
    assert!(extracted.total_weight > extracted.threshold);
    assert!(!extracted.content.contains("Sawdust Notes"));
}

#[test]
fn test_matching_strategy() {
    let pages = load_pages();
    let config = ExtractConfig::builder()
        .strategy(AlignStrategy::Matching(MatchOptions::default()))
        .build();
    let extracted = extract_content(&pages, &config).expect("should extract");

    assert!(extracted.content.contains("Spring finally arrived"));
    assert!(!extracted.content.contains("Recent posts"));
}

#[test]
fn test_identical_pages_extract_nothing() {
    let pages = load_pages();
    let same = [pages[0].as_str(), pages[0].as_str()];
    let extracted = extract_content(&same, &ExtractConfig::default()).expect("should extract");

    assert!(extracted.content.is_empty());
    assert_eq!(extracted.candidate_count, 0);
}

#[test]
fn test_blank_page_is_an_error() {
    let pages = load_pages();
    let result = extract_content(&[pages[0].as_str(), ""], &ExtractConfig::default());
    assert!(matches!(result, Err(SiftError::Parse(_))));
}

#[test]
fn test_document_from_path() {
    let doc = Document::from_path(get_fixture_path("page1.html")).expect("should load");
    assert_eq!(doc.title().as_deref(), Some("Spring Cleaning the Workshop | Sawdust Notes"));
    assert_eq!(doc.doctype(), Some("html"));
    assert!(doc.source().is_some());
}

#[test]
fn test_document_diff_api() {
    let pages = load_pages();
    let a = Document::parse(&pages[0]).unwrap();
    let b = Document::parse(&pages[1]).unwrap();

    let info = a.diff(&b);
    let replaced = info.replaced();
    assert_eq!(replaced.len(), 6);
    assert!(replaced.iter().all(|el| el.is_text()));
}

#[test]
fn test_align_api() {
    let pages = load_pages();
    let documents: Vec<Document> = pages.iter().map(|page| Document::parse(page).unwrap()).collect();
    let rows = align(&documents).expect("should align");

    assert_eq!(rows.len(), 6);
    for row in &rows {
        assert_eq!(row.cells().len(), 3);
        assert!(row.baseline().is_some());
    }
    let indices: Vec<f64> = rows.iter().map(DiffRow::mean_index).collect();
    assert!(indices.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn test_align_rows_independent_of_baseline() {
    let pages = load_pages();
    let row_set = |order: [usize; 3]| {
        let documents: Vec<Document> = order.iter().map(|&i| Document::parse(&pages[i]).unwrap()).collect();
        align(&documents)
            .unwrap()
            .iter()
            .map(|row| {
                let mut cells: Vec<String> = row
                    .cells()
                    .iter()
                    .map(|cell| cell.map(|el| el.to_text()).unwrap_or_default())
                    .collect();
                cells.sort();
                cells
            })
            .collect::<BTreeSet<_>>()
    };

    let forward = row_set([0, 1, 2]);
    assert_eq!(forward.len(), 6);
    assert_eq!(forward, row_set([1, 2, 0]));
    assert_eq!(forward, row_set([2, 0, 1]));
}

#[test]
fn test_content_tree_outline() {
    let pages = load_pages();
    let documents: Vec<Document> = pages.iter().map(|page| Document::parse(page).unwrap()).collect();
    let roots: Vec<Element<'_>> = documents.iter().map(Document::root).collect();

    let tree = content_tree(&roots, &ExtractConfig::default()).unwrap().expect("tree");
    assert_eq!(tree.total_weight(), 6.0);

    let outline = tree.debug_outline(3.0);
    assert!(outline.starts_with("+ 6) <html>"));
    assert!(outline.contains("+ 3) <div>Spring finally"));
}

#[test]
fn test_remove_common_text_api() {
    let texts = [
        "Sawdust Notes Spring finally arrived! Share this post",
        "Sawdust Notes Walnut boards were ready? Share this post",
    ];
    assert_eq!(remove_common_text(&texts, 3), vec!["Spring finally arrived!", "Walnut boards were ready?"]);
}

#[test]
fn test_remove_unrelated_elements_api() {
    let pages = load_pages();
    let html = pages[0]
        .replace("<aside class=\"sidebar\">", "<div class=\"related-posts\">")
        .replace("</aside>", "</div>");

    let cleaned = remove_unrelated_elements(&html, None).expect("should clean");
    assert!(!cleaned.contains("Recent posts"));
    assert!(cleaned.contains("Spring finally arrived"));
    assert!(cleaned.starts_with("<!DOCTYPE html>"));
}

#[test]
fn test_locate_content_container_api() {
    let pages = load_pages();
    let teaser = "Spring finally arrived and the workshop needed a serious cleanup...";

    let found = get_html_of_inner_most_element(&pages[0], teaser, Some("Spring Cleaning the Workshop"))
        .expect("should parse")
        .expect("should find container");
    assert!(found.starts_with("<article class=\"post\">"));
    assert!(found.contains("pegboard"));
}

#[test]
fn test_process_articles_api() {
    let pages = load_pages();
    let mut articles = vec![
        Article::new(
            "https://sawdust.example/posts/spring-cleaning",
            "Spring Cleaning the Workshop",
            "Spring finally arrived and the workshop needed a serious cleanup...",
        ),
        Article::new(
            "https://sawdust.example/posts/walnut-side-table",
            "Building a Walnut Side Table",
            "Walnut boards from the lumber yard had been drying...",
        ),
        Article::new(
            "https://sawdust.example/posts/sharpening-chisels",
            "Sharpening Chisels by Hand",
            "",
        ),
    ];

    process_articles(&mut articles, &pages, &ExtractConfig::default()).expect("should process");

    assert!(articles[0].content.contains("pegboard where they belong"));
    assert!(articles[1].content.contains("reading chair"));
    assert!(articles[2].content.contains("leather strop"));
    assert!(articles.iter().all(|a| a.extract_method == ExtractMethod::Scrape));
    assert!(!articles[0].content.contains('<'));
}

#[test]
fn test_config_from_json() {
    let config: ExtractConfig =
        serde_json::from_str(r#"{"weight_metric": "text-length", "threshold_ratio": 0.7}"#).expect("valid config");
    assert_eq!(config.weight_metric, WeightMetric::TextLength);
    assert_eq!(config.threshold_ratio, 0.7);
    assert!(config.include_elements);
    assert_eq!(config.strategy, AlignStrategy::Structural);
}
