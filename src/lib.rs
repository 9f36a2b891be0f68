//! A longest-prefix-match IPv4 forwarding lookup engine built on the
//! Poptrie data structure of Asai and Ohara.
//!
//! Build a [`multiway::Builder`], insert (address, prefix length, fib
//! index) tuples, then call [`multiway::Builder::build_poptrie`] to
//! compile an immutable, thread-safe [`poptrie::Poptrie`] that answers
//! [`poptrie::Poptrie::lookup`] queries.

pub mod bits;
pub mod error;
pub mod loader;
pub mod multiway;
pub mod poptrie;
pub mod stats;

pub use error::PoptrieError;
pub use loader::{load_file, load_str, PrefixEntry, PrefixFile};
pub use multiway::Builder;
pub use poptrie::Poptrie;
pub use stats::PoptrieStats;
