//! The small failure taxonomy for loading and building a Poptrie.
//!
//! Build and lookup preconditions (valid stride indices, `direct_bits` a
//! multiple of 6 or zero, array bounds derived from observed counts) are
//! structural invariants, not recoverable errors — violating them is a
//! programmer error and is caught with `debug_assert!`, not surfaced here.

use std::fmt;

#[derive(Debug)]
pub enum PoptrieError {
    /// A line of the input file could not be parsed: an octet out of
    /// range, a length greater than 32, or a missing next-hop field.
    MalformedPrefix { line: usize, reason: String },
    /// Reading the data file failed.
    IoFailure(std::io::Error),
    /// `build_poptrie` was invoked with zero inserted prefixes.
    Empty,
}

impl std::error::Error for PoptrieError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PoptrieError::IoFailure(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for PoptrieError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PoptrieError::MalformedPrefix { line, reason } => {
                write!(f, "malformed prefix at line {line}: {reason}")
            }
            PoptrieError::IoFailure(e) => write!(f, "I/O failure: {e}"),
            PoptrieError::Empty => {
                write!(f, "build_poptrie called with zero inserted prefixes")
            }
        }
    }
}

impl From<std::io::Error> for PoptrieError {
    fn from(e: std::io::Error) -> Self {
        PoptrieError::IoFailure(e)
    }
}
