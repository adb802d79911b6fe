//! Filtering of aligned rows down to content candidates.

use crate::align::DiffRow;
use crate::parse::Element;

/// Tags whose text never seeds the content tree.
const IGNORED_TAGS: [&str; 2] = ["script", "style"];

/// A row that survived filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate<'a> {
    pub row: DiffRow<'a>,
    /// First column whose cell fits.
    pub first_fit: usize,
}

impl<'a> Candidate<'a> {
    /// The baseline cell, always present for a candidate.
    pub fn baseline(&self) -> Option<Element<'a>> {
        self.row.baseline()
    }

    /// The cell at `first_fit`, which weighting measures in place of a blank baseline.
    pub fn fitting_cell(&self) -> Option<Element<'a>> {
        self.row.cells().get(self.first_fit).copied().flatten()
    }
}

/// Whether a cell can count as content.
///
/// Without `include_elements` only text nodes qualify. The node's nearest
/// element must not be a script or style, and its text must be non-empty.
pub fn fits(cell: Option<Element<'_>>, include_elements: bool) -> bool {
    let Some(el) = cell else { return false };
    if !include_elements && !el.is_text() {
        return false;
    }
    if el.tag_name_or_ancestor().is_some_and(|name| IGNORED_TAGS.contains(&name)) {
        return false;
    }
    !el.to_text().is_empty()
}

/// Keeps rows with a baseline cell and at least one fitting cell.
pub fn find_candidates<'a>(rows: Vec<DiffRow<'a>>, include_elements: bool) -> Vec<Candidate<'a>> {
    let total = rows.len();
    let candidates: Vec<Candidate<'a>> = rows
        .into_iter()
        .filter(|row| row.baseline().is_some())
        .filter_map(|row| {
            let first_fit = row.cells().iter().position(|&cell| fits(cell, include_elements))?;
            Some(Candidate { row, first_fit })
        })
        .collect();

    tracing::debug!(rows = total, candidates = candidates.len(), include_elements, "filtered candidates");
    candidates
}
