//! Cost-based element matching.
//!
//! An alternative to the positional differ: text nodes of two documents are
//! paired by minimizing a cost built from edit distance on their text and
//! cosine distance on the tag/class histograms around them. Pairing uses the
//! Hungarian algorithm (or a greedy per-row minimum).

use std::collections::HashMap;

use pathfinding::kuhn_munkres::{Weights, kuhn_munkres_min};
use serde::{Deserialize, Serialize};

use crate::align::DiffRow;
use crate::parse::Element;

/// Scale applied to float costs before integer assignment.
const COST_SCALE: f64 = 1_000_000.0;

/// Per-feature weights of [`calculate_cost`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchWeights {
    pub text: f64,
    pub tags: f64,
    pub classes: f64,
}

impl Default for MatchWeights {
    fn default() -> Self {
        Self { text: 1.0, tags: 0.5, classes: 0.5 }
    }
}

/// Assignment algorithm used by [`match_elements`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchingAlgorithm {
    /// Minimum total cost (Kuhn-Munkres).
    #[default]
    Hungarian,
    /// Each row takes its cheapest column; columns may repeat.
    Greedy,
}

/// Options for [`match_elements`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchOptions {
    pub weights: MatchWeights,
    /// Texts are truncated to this many characters before edit distance.
    pub max_text_length: usize,
    pub algorithm: MatchingAlgorithm,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self { weights: MatchWeights::default(), max_text_length: 300, algorithm: MatchingAlgorithm::default() }
    }
}

/// Matching features of one node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Features {
    pub text: String,
    /// Tag histogram of the surrounding subtree.
    pub tags: HashMap<String, f64>,
    /// Class-token histogram of the surrounding subtree.
    pub classes: HashMap<String, f64>,
}

impl Features {
    /// Builds the features of `element`.
    ///
    /// The histograms cover the subtree of the grandparent (or the nearest
    /// existing ancestor), skipping script and style elements.
    pub fn of(element: Element<'_>) -> Self {
        let context = element
            .parent()
            .map(|parent| parent.parent().unwrap_or(parent))
            .unwrap_or(element);

        let mut tags: HashMap<String, f64> = HashMap::new();
        let mut classes: HashMap<String, f64> = HashMap::new();
        for el in std::iter::once(context).chain(context.descendants()) {
            let Some(name) = el.tag_name() else { continue };
            if matches!(name, "script" | "style") {
                continue;
            }
            *tags.entry(name.to_string()).or_default() += 1.0;
            if let Some(class) = el.attr("class") {
                for token in class.split_whitespace() {
                    *classes.entry(token.to_string()).or_default() += 1.0;
                }
            }
        }

        Self { text: element.to_text(), tags, classes }
    }
}

/// Edit distance between two strings, counted in characters.
pub fn levenshtein(a: &str, b: &str) -> usize {
    strsim::levenshtein(a, b)
}

/// Cosine similarity of two sparse vectors, 0 when either is empty.
pub fn cosine_similarity(a: &HashMap<String, f64>, b: &HashMap<String, f64>) -> f64 {
    let dot: f64 = a
        .iter()
        .map(|(key, value)| value * b.get(key).copied().unwrap_or(0.0))
        .sum();
    let norm_a: f64 = a.values().map(|v| v * v).sum();
    let norm_b: f64 = b.values().map(|v| v * v).sum();

    if norm_a * norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b).sqrt()
}

/// Weighted cost of pairing two nodes; 0 for identical features.
pub fn calculate_cost(a: &Features, b: &Features, weights: &MatchWeights, max_text_length: usize) -> f64 {
    let text_a: String = a.text.chars().take(max_text_length).collect();
    let text_b: String = b.text.chars().take(max_text_length).collect();

    let mut cost = 0.0;
    let distance = levenshtein(&text_a, &text_b);
    if distance != 0 {
        let longest = text_a.chars().count().max(text_b.chars().count());
        cost += distance as f64 * weights.text / longest as f64;
    }
    cost += (1.0 - cosine_similarity(&a.tags, &b.tags)) * weights.tags;
    cost += (1.0 - cosine_similarity(&a.classes, &b.classes)) * weights.classes;
    cost
}

/// Pairs every row with its cheapest column.
pub fn greedy_matching(costs: &[Vec<f64>]) -> Vec<(usize, usize)> {
    costs
        .iter()
        .enumerate()
        .filter_map(|(row, values)| {
            values
                .iter()
                .enumerate()
                .min_by(|a, b| a.1.total_cmp(b.1))
                .map(|(column, _)| (row, column))
        })
        .collect()
}

/// Minimum-cost one-to-one assignment.
///
/// Rectangular inputs are padded to a square with zero-cost cells; pairs
/// landing in the padding are dropped, so `min(rows, columns)` pairs come
/// back.
pub fn hungarian_matching(costs: &[Vec<f64>]) -> Vec<(usize, usize)> {
    let rows = costs.len();
    let columns = costs.iter().map(Vec::len).max().unwrap_or(0);
    if rows == 0 || columns == 0 {
        return Vec::new();
    }

    let size = rows.max(columns);
    let mut data = vec![vec![0i64; size]; size];
    for (i, values) in costs.iter().enumerate() {
        for (j, &cost) in values.iter().enumerate() {
            data[i][j] = (cost * COST_SCALE).round() as i64;
        }
    }

    let (_, assignments) = kuhn_munkres_min(&CostMatrix { data, size });
    assignments
        .into_iter()
        .enumerate()
        .filter(|&(row, column)| row < rows && column < costs[row].len())
        .collect()
}

/// Square integer cost matrix fed to `kuhn_munkres_min`.
struct CostMatrix {
    data: Vec<Vec<i64>>,
    size: usize,
}

impl Weights<i64> for CostMatrix {
    fn rows(&self) -> usize {
        self.size
    }

    fn columns(&self) -> usize {
        self.size
    }

    fn at(&self, row: usize, col: usize) -> i64 {
        self.data.get(row).and_then(|r| r.get(col)).copied().unwrap_or(0)
    }

    fn neg(&self) -> Self {
        let data = self
            .data
            .iter()
            .map(|row| row.iter().map(|&v| -v).collect())
            .collect();
        Self { data, size: self.size }
    }
}

/// Pairs nodes of `left` with nodes of `right`.
pub fn match_elements<'a>(left: &[Element<'a>], right: &[Element<'a>], options: &MatchOptions) -> Vec<(Element<'a>, Element<'a>)> {
    let left_features: Vec<Features> = left.iter().map(|&el| Features::of(el)).collect();
    let right_features: Vec<Features> = right.iter().map(|&el| Features::of(el)).collect();

    let costs: Vec<Vec<f64>> = left_features
        .iter()
        .map(|a| {
            right_features
                .iter()
                .map(|b| calculate_cost(a, b, &options.weights, options.max_text_length))
                .collect()
        })
        .collect();

    let assignments = match options.algorithm {
        MatchingAlgorithm::Hungarian => hungarian_matching(&costs),
        MatchingAlgorithm::Greedy => greedy_matching(&costs),
    };
    assignments.into_iter().map(|(i, j)| (left[i], right[j])).collect()
}

/// Text nodes under `root` with readable text.
fn text_leaves(root: Element<'_>) -> Vec<Element<'_>> {
    std::iter::once(root)
        .chain(root.descendants())
        .filter(|el| el.is_text())
        .filter(|el| !matches!(el.tag_name_or_ancestor(), Some("script" | "style")))
        .filter(|el| !el.to_text().is_empty())
        .collect()
}

/// Builds diff rows by matching baseline text leaves against every other root.
///
/// A row is emitted for each baseline leaf whose matched counterpart differs
/// in text, or is missing, in at least one other document.
pub fn align_by_matching<'a>(roots: &[Element<'a>], options: &MatchOptions) -> Vec<DiffRow<'a>> {
    let width = roots.len();
    if width < 2 {
        return Vec::new();
    }

    let baseline = text_leaves(roots[0]);
    let mut counterparts: Vec<HashMap<Element<'a>, Element<'a>>> = Vec::with_capacity(width - 1);
    for &root in &roots[1..] {
        let leaves = text_leaves(root);
        counterparts.push(match_elements(&baseline, &leaves, options).into_iter().collect());
    }

    let mut rows: Vec<DiffRow<'a>> = Vec::new();
    for leaf in &baseline {
        let text = leaf.to_text();
        let mut row = DiffRow::new(width);
        row.set(0, *leaf);

        let mut differs = false;
        for (offset, pairs) in counterparts.iter().enumerate() {
            match pairs.get(leaf) {
                Some(other) => {
                    differs |= other.to_text() != text;
                    row.set(offset + 1, *other);
                }
                None => differs = true,
            }
        }

        if differs {
            rows.push(row);
        }
    }

    rows.sort_by(|a, b| a.mean_index().total_cmp(&b.mean_index()));
    tracing::debug!(documents = width, rows = rows.len(), leaves = baseline.len(), "matched text nodes");
    rows
}
