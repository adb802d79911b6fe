pub mod align;
pub mod blog;
pub mod candidate;
pub mod diff;
pub mod error;
pub mod extract;
pub mod matching;
pub mod parse;
pub mod postprocess;
pub mod preprocess;
pub mod sanitize;
pub mod serialize;
pub mod tree;

pub use align::{AlignStrategy, DiffRow, align, align_elements, align_with};
pub use blog::{Article, ExtractMethod, needs_html_extraction, process_articles};
pub use candidate::{Candidate, find_candidates};
pub use diff::{DiffInfo, Patch, PatchKind, diff};
pub use error::{Result, SiftError};
pub use extract::{
    ContentFormat, ExtractConfig, ExtractConfigBuilder, ExtractedContent, WeightMetric, content_tree,
    extract_content, extract_documents, extract_from_roots, select_main_content,
};
#[doc(hidden)]
pub use matching::{Features, calculate_cost, cosine_similarity, greedy_matching, hungarian_matching, levenshtein};
pub use matching::{MatchOptions, MatchWeights, MatchingAlgorithm, match_elements};
pub use parse::{Document, Element, IndexEntry, SelectorOptions};
pub use postprocess::{cleanup_articles, remove_common_text};
pub use preprocess::{get_html_of_inner_most_element, remove_unrelated_elements};
pub use sanitize::sanitize;
pub use tree::{ContentTree, TreeNode, build_tree};
