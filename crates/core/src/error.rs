//! Error types for blogsift operations.
//!
//! This module defines the main error type [`SiftError`]. Parse failures are
//! fatal for the document they concern, while index and alignment failures
//! point at inconsistent input (for instance elements from two different
//! documents mixed into one content tree).
//!
//! # Example
//!
//! ```rust
//! use blogsift_core::{Document, SiftError};
//!
//! match Document::parse("   ") {
//!     Err(SiftError::Parse(reason)) => println!("no document: {}", reason),
//!     Err(e) => println!("Error: {}", e),
//!     Ok(_) => unreachable!(),
//! }
//! ```

use thiserror::Error;

/// Main error type for structural diffing and content extraction.
#[derive(Error, Debug)]
pub enum SiftError {
    /// HTML could not be turned into a document.
    ///
    /// Returned when the input is empty or yields no root element.
    #[error("Failed to parse HTML: {0}")]
    Parse(String),

    /// A pre-order index does not exist in the document.
    ///
    /// Only reachable through a bug in tree construction or a caller passing
    /// an index taken from another document.
    #[error("Node index {index} is out of range (document has {len} nodes)")]
    IndexOutOfRange { index: usize, len: usize },

    /// An ancestor walk or row lookup could not find what it needs.
    ///
    /// Raised when the two directions of a pairwise diff disagree, or when a
    /// content tree is fed elements from different documents or out of
    /// document order.
    #[error("Unreachable alignment: {0}")]
    UnreachableAlignment(String),

    /// Reading a document from disk failed.
    #[error("Failed to read document: {0}")]
    Io(#[from] std::io::Error),

    /// JSON conversion of an article failed.
    #[error("Failed to serialize: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type alias for SiftError.
pub type Result<T> = std::result::Result<T, SiftError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SiftError::Parse("document has no root element".to_string());
        assert!(err.to_string().contains("Failed to parse HTML"));
    }

    #[test]
    fn test_index_out_of_range_error() {
        let err = SiftError::IndexOutOfRange { index: 42, len: 7 };
        assert!(err.to_string().contains("42"));
        assert!(err.to_string().contains("7"));
    }

    #[test]
    fn test_unreachable_alignment_error() {
        let err = SiftError::UnreachableAlignment("mixed documents".to_string());
        assert!(err.to_string().contains("mixed documents"));
    }
}
