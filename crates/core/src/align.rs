//! Alignment of structural differences across several documents.
//!
//! The first document is the baseline. Every other document is diffed
//! against it in both directions and the replaced nodes are paired up into
//! [`DiffRow`]s, one per content slot. A second pass fills cells the baseline
//! could not see by diffing two non-baseline documents against each other.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::diff::diff;
use crate::matching::{MatchOptions, align_by_matching};
use crate::parse::{Document, Element};
use crate::{Result, SiftError};

/// How rows are produced from a set of documents.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignStrategy {
    /// Positional structural diff against the baseline.
    #[default]
    Structural,
    /// Cost-based assignment of text nodes.
    Matching(MatchOptions),
}

impl FromStr for AlignStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "structural" | "diff" => Ok(Self::Structural),
            "matching" | "match" => Ok(Self::Matching(MatchOptions::default())),
            other => Err(format!("unknown alignment strategy: {}", other)),
        }
    }
}

/// One aligned content slot: a cell per document, `None` where that
/// document showed no corresponding difference.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffRow<'a> {
    cells: Vec<Option<Element<'a>>>,
}

impl<'a> DiffRow<'a> {
    /// Creates an empty row of `width` cells.
    pub fn new(width: usize) -> Self {
        Self { cells: vec![None; width] }
    }

    pub fn cells(&self) -> &[Option<Element<'a>>] {
        &self.cells
    }

    pub fn get(&self, column: usize) -> Option<Element<'a>> {
        self.cells.get(column).copied().flatten()
    }

    pub fn set(&mut self, column: usize, element: Element<'a>) {
        if let Some(cell) = self.cells.get_mut(column) {
            *cell = Some(element);
        }
    }

    /// The baseline (first) document's cell.
    pub fn baseline(&self) -> Option<Element<'a>> {
        self.get(0)
    }

    /// Mean index of the non-empty cells, 0 when every cell is empty.
    pub fn mean_index(&self) -> f64 {
        let indices: Vec<usize> = self.cells.iter().flatten().map(Element::index).collect();
        if indices.is_empty() {
            return 0.0;
        }
        indices.iter().sum::<usize>() as f64 / indices.len() as f64
    }
}

/// Aligns the differences of several documents against the first one.
pub fn align(documents: &[Document]) -> Result<Vec<DiffRow<'_>>> {
    let roots: Vec<Element<'_>> = documents.iter().map(Document::root).collect();
    align_elements(&roots)
}

/// Aligns with the requested strategy.
pub fn align_with<'a>(roots: &[Element<'a>], strategy: &AlignStrategy) -> Result<Vec<DiffRow<'a>>> {
    match strategy {
        AlignStrategy::Structural => align_elements(roots),
        AlignStrategy::Matching(options) => Ok(align_by_matching(roots, options)),
    }
}

/// Aligns the differences of several subtrees against the first one.
///
/// Returns no rows for fewer than two subtrees. Rows are sorted by the
/// mean index of their cells, which follows reading order.
///
/// # Errors
///
/// Returns [`SiftError::UnreachableAlignment`] if the two directions of a
/// pairwise diff disagree on how many nodes were replaced.
pub fn align_elements<'a>(roots: &[Element<'a>]) -> Result<Vec<DiffRow<'a>>> {
    let width = roots.len();
    if width < 2 {
        return Ok(Vec::new());
    }

    let baseline = roots[0];
    let mut rows: Vec<DiffRow<'a>> = Vec::new();
    let mut by_baseline: HashMap<Element<'a>, usize> = HashMap::new();

    for (column, &root) in roots.iter().enumerate().skip(1) {
        for (left, right) in diff_pairs(baseline, root)? {
            let row = *by_baseline.entry(left).or_insert_with(|| {
                let mut row = DiffRow::new(width);
                row.set(0, left);
                rows.push(row);
                rows.len() - 1
            });
            rows[row].set(column, right);
        }
    }

    let mut pair_cache: HashMap<(usize, usize), Vec<(Element<'a>, Element<'a>)>> = HashMap::new();
    for row in 0..rows.len() {
        let Some(pivot) = (1..width).find(|&column| rows[row].get(column).is_some()) else {
            continue;
        };

        for column in 1..width {
            if rows[row].get(column).is_some() {
                continue;
            }

            let pairs = match pair_cache.entry((pivot, column)) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => entry.insert(diff_pairs(roots[pivot], roots[column])?),
            };

            for &(pivot_side, other_side) in pairs.iter() {
                if let Some(target) = rows.iter_mut().find(|r| r.get(pivot) == Some(pivot_side))
                    && target.get(column).is_none()
                {
                    target.set(column, other_side);
                }
            }
        }
    }

    rows.sort_by(|a, b| a.mean_index().total_cmp(&b.mean_index()));
    tracing::debug!(documents = width, rows = rows.len(), "aligned differences");
    Ok(rows)
}

/// Replaced nodes of `diff(a, b)` paired with those of `diff(b, a)`.
fn diff_pairs<'a>(a: Element<'a>, b: Element<'a>) -> Result<Vec<(Element<'a>, Element<'a>)>> {
    let left = diff(a, b).replaced();
    let right = diff(b, a).replaced();

    if left.len() != right.len() {
        return Err(SiftError::UnreachableAlignment(format!(
            "diff of nodes {} and {} replaced {} nodes one way and {} the other",
            a.index(),
            b.index(),
            left.len(),
            right.len()
        )));
    }

    Ok(left.into_iter().zip(right).collect())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    fn page(body: &str) -> Document {
        Document::parse(&format!("<html><head></head><body>{}</body></html>", body)).unwrap()
    }

    fn texts(row: &DiffRow<'_>) -> Vec<Option<String>> {
        row.cells().iter().map(|cell| cell.map(|el| el.to_text())).collect()
    }

    fn row_set(rows: &[DiffRow<'_>]) -> BTreeSet<Vec<String>> {
        rows.iter()
            .map(|row| {
                let mut cells: Vec<String> = texts(row).into_iter().map(Option::unwrap_or_default).collect();
                cells.sort();
                cells
            })
            .collect()
    }

    #[test]
    fn test_single_document_has_no_rows() {
        let docs = vec![page("<p>a</p>")];
        assert!(align(&docs).unwrap().is_empty());
    }

    #[test]
    fn test_rows_pair_corresponding_differences() {
        let docs = vec![
            page("<nav>menu</nav><p>first post</p>"),
            page("<nav>menu</nav><p>second post</p>"),
            page("<nav>menu</nav><p>third post</p>"),
        ];

        let rows = align(&docs).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(
            texts(&rows[0]),
            vec![
                Some("first post".to_string()),
                Some("second post".to_string()),
                Some("third post".to_string())
            ]
        );
    }

    #[test]
    fn test_gap_fill_uses_secondary_pivot() {
        let docs = vec![
            page("<p>A</p><span>x</span>"),
            page("<p>B</p><span>y</span>"),
            page("<p>C</p><span>x</span>"),
        ];

        let rows = align(&docs).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            texts(&rows[1]),
            vec![Some("x".to_string()), Some("y".to_string()), Some("x".to_string())]
        );
    }

    #[test]
    fn test_rows_follow_reading_order() {
        let docs = vec![
            page("<h1>t1</h1><div><p>b1</p></div><footer>f1</footer>"),
            page("<h1>t2</h1><div><p>b2</p></div><footer>f2</footer>"),
        ];

        let rows = align(&docs).unwrap();
        let means: Vec<f64> = rows.iter().map(DiffRow::mean_index).collect();
        assert!(means.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(rows[0].baseline().unwrap().to_text(), "t1");
        assert_eq!(rows[2].baseline().unwrap().to_text(), "f1");
    }

    #[test]
    fn test_row_set_is_independent_of_baseline() {
        let a = page("<header>Blog</header><article><p>alpha one</p><p>alpha two</p></article>");
        let b = page("<header>Blog</header><article><p>beta one</p><p>beta two</p></article>");
        let c = page("<header>Blog</header><article><p>gamma one</p><p>gamma two</p></article>");

        let forward = vec![a.clone(), b.clone(), c.clone()];
        let rotated = vec![b, c, a];

        let forward_rows = align(&forward).unwrap();
        let rotated_rows = align(&rotated).unwrap();
        assert_eq!(forward_rows.len(), rotated_rows.len());
        assert_eq!(row_set(&forward_rows), row_set(&rotated_rows));
    }

    #[test]
    fn test_mean_index_of_empty_row() {
        assert_eq!(DiffRow::new(3).mean_index(), 0.0);
    }

    #[test]
    fn test_strategy_from_str() {
        assert_eq!("structural".parse::<AlignStrategy>().unwrap(), AlignStrategy::Structural);
        assert!(matches!("matching".parse::<AlignStrategy>().unwrap(), AlignStrategy::Matching(_)));
        assert!("fuzzy".parse::<AlignStrategy>().is_err());
    }
}
