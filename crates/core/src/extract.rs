//! Main-content extraction.
//!
//! This module ties the pipeline together: documents are aligned, rows are
//! filtered into candidates, the baseline candidates are built into a
//! [`ContentTree`] and the finest subtree holding at least a share of the
//! total weight is serialized.
//!
//! # Example
//!
//! ```rust
//! use blogsift_core::extract::{ExtractConfig, extract_content};
//!
//! let pages = [
//!     "<html><body><nav>Home</nav><div><p>First post body</p></div></body></html>",
//!     "<html><body><nav>Home</nav><div><p>Second post body</p></div></body></html>",
//! ];
//!
//! let extracted = extract_content(&pages, &ExtractConfig::default()).unwrap();
//! assert!(extracted.content.contains("First post body"));
//! assert!(!extracted.content.contains("Home"));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::align::{AlignStrategy, align_with};
use crate::candidate::find_candidates;
use crate::parse::{Document, Element};
use crate::tree::{ContentTree, build_tree};

/// Weight assigned to each candidate when building the content tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WeightMetric {
    /// Every candidate weighs 1.
    #[default]
    Constant,
    /// Characters of normalized text.
    TextLength,
    /// Characters of compact markup.
    MarkupLength,
}

impl WeightMetric {
    /// Weight of one candidate node.
    pub fn weigh(&self, element: Element<'_>) -> f64 {
        match self {
            Self::Constant => 1.0,
            Self::TextLength => element.to_text().chars().count() as f64,
            Self::MarkupLength => element.to_html().chars().count() as f64,
        }
    }
}

impl FromStr for WeightMetric {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "constant" | "element-count" => Ok(Self::Constant),
            "text-length" | "text-size" => Ok(Self::TextLength),
            "markup-length" | "html-size" => Ok(Self::MarkupLength),
            other => Err(format!("unknown weight metric: {}", other)),
        }
    }
}

impl fmt::Display for WeightMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Constant => "constant",
            Self::TextLength => "text-length",
            Self::MarkupLength => "markup-length",
        };
        f.write_str(name)
    }
}

/// Output of [`select_main_content`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentFormat {
    #[default]
    Html,
    Text,
}

/// Configuration for content extraction.
///
/// # Example
///
/// ```rust
/// use blogsift_core::{ExtractConfig, WeightMetric};
///
/// let config = ExtractConfig::builder()
///     .weight_metric(WeightMetric::TextLength)
///     .threshold_ratio(0.6)
///     .include_elements(false)
///     .build();
/// assert_eq!(config.threshold_ratio, 0.6);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Whether element-level differences count as candidates (default: true).
    pub include_elements: bool,

    /// Candidate weighting (default: constant).
    pub weight_metric: WeightMetric,

    /// Share of the total weight a subtree needs to be selected (default: 0.5).
    pub threshold_ratio: f64,

    /// Shared prefix/suffix length that must be exceeded before it is stripped (default: 0).
    pub min_common_characters: usize,

    /// Whether the sanitizer keeps `<img>` tags (default: false).
    pub keep_images: bool,

    /// Whether article processing always diffs downloaded pages (default: false).
    pub force_diff: bool,

    /// How rows are aligned (default: structural).
    pub strategy: AlignStrategy,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            include_elements: true,
            weight_metric: WeightMetric::default(),
            threshold_ratio: 0.5,
            min_common_characters: 0,
            keep_images: false,
            force_diff: false,
            strategy: AlignStrategy::default(),
        }
    }
}

impl ExtractConfig {
    /// Creates a new builder for ExtractConfig.
    pub fn builder() -> ExtractConfigBuilder {
        ExtractConfigBuilder::new()
    }
}

/// Builder for ExtractConfig.
pub struct ExtractConfigBuilder {
    config: ExtractConfig,
}

impl ExtractConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self { config: ExtractConfig::default() }
    }

    /// Sets whether element-level differences count as candidates.
    pub fn include_elements(mut self, value: bool) -> Self {
        self.config.include_elements = value;
        self
    }

    /// Sets the candidate weighting.
    pub fn weight_metric(mut self, value: WeightMetric) -> Self {
        self.config.weight_metric = value;
        self
    }

    /// Sets the selection threshold as a share of the total weight.
    pub fn threshold_ratio(mut self, value: f64) -> Self {
        self.config.threshold_ratio = value;
        self
    }

    /// Sets the common prefix/suffix length that must be exceeded.
    pub fn min_common_characters(mut self, value: usize) -> Self {
        self.config.min_common_characters = value;
        self
    }

    /// Sets whether images survive sanitizing.
    pub fn keep_images(mut self, value: bool) -> Self {
        self.config.keep_images = value;
        self
    }

    /// Sets whether article processing always diffs.
    pub fn force_diff(mut self, value: bool) -> Self {
        self.config.force_diff = value;
        self
    }

    /// Sets the alignment strategy.
    pub fn strategy(mut self, value: AlignStrategy) -> Self {
        self.config.strategy = value;
        self
    }

    /// Builds the config.
    pub fn build(self) -> ExtractConfig {
        self.config
    }
}

impl Default for ExtractConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The result of content extraction
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ExtractedContent {
    /// Compact markup of the selected subtrees, empty if nothing was selected
    pub content: String,
    /// Total weight of the content tree
    pub total_weight: f64,
    /// Weight a subtree needed to be selected
    pub threshold: f64,
    /// Number of rows kept as candidates
    pub candidate_count: usize,
}

/// Arena ids of the nodes whose own serialization is emitted.
///
/// Children are visited first; once any child emits output its ancestors
/// stay silent. A node without emitting children emits itself when its
/// total weight reaches `threshold` and its serialization is non-empty.
pub fn selected_nodes(tree: &ContentTree<'_>, threshold: f64, format: ContentFormat) -> Vec<usize> {
    let mut selected = Vec::new();
    collect_selected(tree, tree.root(), threshold, format, &mut selected);
    selected
}

fn collect_selected(tree: &ContentTree<'_>, id: usize, threshold: f64, format: ContentFormat, selected: &mut Vec<usize>) {
    let Some(node) = tree.node(id) else { return };
    let before = selected.len();
    for &child in &node.children {
        collect_selected(tree, child, threshold, format, selected);
    }
    if selected.len() > before || node.total_weight() < threshold {
        return;
    }
    if tree.element(id).is_some_and(|el| !serialize(el, format).is_empty()) {
        selected.push(id);
    }
}

fn serialize(element: Element<'_>, format: ContentFormat) -> String {
    match format {
        ContentFormat::Html => element.to_html(),
        ContentFormat::Text => element.to_text(),
    }
}

/// Serializes the main content of a content tree.
pub fn select_main_content(tree: &ContentTree<'_>, threshold: f64, format: ContentFormat) -> String {
    selected_nodes(tree, threshold, format)
        .into_iter()
        .filter_map(|id| tree.element(id))
        .map(|el| serialize(el, format))
        .collect()
}

/// Aligns `roots`, filters candidates and builds the tree over the baseline column.
///
/// Returns the number of candidates alongside the tree.
pub fn candidate_tree<'a>(roots: &[Element<'a>], config: &ExtractConfig) -> Result<(usize, Option<ContentTree<'a>>)> {
    let rows = align_with(roots, &config.strategy)?;
    let candidates = find_candidates(rows, config.include_elements);

    let mut elements: Vec<Element<'a>> = candidates.iter().filter_map(|candidate| candidate.baseline()).collect();
    elements.sort_by_key(Element::index);
    elements.dedup();

    // Each baseline node is weighed by its row's first fitting cell.
    let mut measured: HashMap<usize, Element<'a>> = HashMap::with_capacity(candidates.len());
    for candidate in &candidates {
        if let (Some(baseline), Some(cell)) = (candidate.baseline(), candidate.fitting_cell()) {
            measured.entry(baseline.index()).or_insert(cell);
        }
    }

    let metric = config.weight_metric;
    let tree = build_tree(&elements, |el| {
        metric.weigh(measured.get(&el.index()).copied().unwrap_or(el))
    })?;
    Ok((candidates.len(), tree))
}

/// Builds the content tree for `roots`, `None` when nothing differs.
pub fn content_tree<'a>(roots: &[Element<'a>], config: &ExtractConfig) -> Result<Option<ContentTree<'a>>> {
    candidate_tree(roots, config).map(|(_, tree)| tree)
}

/// Extracts the content of `roots[0]` by comparing it with the other roots.
pub fn extract_from_roots(roots: &[Element<'_>], config: &ExtractConfig) -> Result<ExtractedContent> {
    let (candidate_count, tree) = candidate_tree(roots, config)?;
    let Some(tree) = tree else {
        tracing::debug!(documents = roots.len(), "no candidates; nothing extracted");
        return Ok(ExtractedContent { candidate_count, ..Default::default() });
    };

    let total_weight = tree.total_weight();
    let threshold = total_weight * config.threshold_ratio;
    let content = select_main_content(&tree, threshold, ContentFormat::Html);
    tracing::debug!(candidate_count, total_weight, threshold, length = content.len(), "selected main content");

    Ok(ExtractedContent { content, total_weight, threshold, candidate_count })
}

/// Extracts the content of `documents[0]` by comparing it with the others.
pub fn extract_documents(documents: &[Document], config: &ExtractConfig) -> Result<ExtractedContent> {
    let roots: Vec<Element<'_>> = documents.iter().map(Document::root).collect();
    extract_from_roots(&roots, config)
}

/// Parses `pages` and extracts the content of the first one.
///
/// # Errors
///
/// Returns [`crate::SiftError::Parse`] for a blank page, and
/// [`crate::SiftError::UnreachableAlignment`] for inconsistent alignments.
pub fn extract_content<S: AsRef<str>>(pages: &[S], config: &ExtractConfig) -> Result<ExtractedContent> {
    let documents = pages
        .iter()
        .map(|page| Document::parse(page.as_ref()))
        .collect::<Result<Vec<_>>>()?;
    extract_documents(&documents, config)
}
