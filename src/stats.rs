//! Diagnostic counters for a compiled [`crate::poptrie::Poptrie`].
//!
//! Not part of the build or lookup hot path; purely informational,
//! reporting array occupancy and memory footprint for a compiled
//! Poptrie.

use std::fmt;
use std::time::Duration;

use crate::poptrie::{Leaf, Poptrie, PoptrieNode};

/// Snapshot of array sizes and memory footprint for a compiled Poptrie,
/// plus however long the build took to produce it.
#[derive(Debug, Clone, Copy)]
pub struct PoptrieStats {
    pub internal_nodes: usize,
    pub leaves: usize,
    pub direct_entries: usize,
    pub direct_bits: u8,
    pub build_time: Duration,
}

impl PoptrieStats {
    /// Captures a stats snapshot for `t`. `build_time` is supplied by the
    /// caller (the compiler itself does not time its own run).
    pub fn capture(t: &Poptrie, build_time: Duration) -> Self {
        PoptrieStats {
            internal_nodes: t.internal_node_count(),
            leaves: t.leaf_count(),
            direct_entries: t.direct_array_len(),
            direct_bits: t.direct_bits(),
            build_time,
        }
    }

    /// Approximate resident size of `N`, `L` and `D` combined, in bytes.
    pub fn mem_usage(&self) -> usize {
        self.internal_nodes * std::mem::size_of::<PoptrieNode>()
            + self.leaves * std::mem::size_of::<Leaf>()
            + self.direct_entries * std::mem::size_of::<u32>()
    }
}

impl fmt::Display for PoptrieStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "N={} L={} D={} (s={}) {}KiB built in {:?}",
            self.internal_nodes,
            self.leaves,
            self.direct_entries,
            self.direct_bits,
            self.mem_usage() / 1024,
            self.build_time,
        )
    }
}
