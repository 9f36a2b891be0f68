//! C4/C5/C6 — the Poptrie compiler and lookup.
//!
//! The compiler walks the multiway trie breadth-first, turning it into
//! three flat, immutable arrays (`N`, `L`, `D`) that `lookup` then walks
//! using popcount-indexed child location. Once compiled, a [`Poptrie`] is
//! read-only and `Send + Sync`: nothing under it is ever mutated again.

use std::collections::VecDeque;

use log::{debug, trace};

use crate::bits::extract32;
use crate::error::PoptrieError;
use crate::multiway::{Builder, MultiNode};

const CHILDREN: usize = 64;
const LEAF_TAG: u32 = 1 << 31;
/// Reserved `direct_index` pattern (high bit set, every low bit set too)
/// meaning "no prefix in the table reaches this direct-pointing slot".
/// Distinguished from a real leaf by the all-ones low 31 bits, which a
/// genuine fib_index would have to equal 2^31 - 1 to collide with —
/// `to_leaf` asserts against that.
const NO_ROUTE: u32 = u32::MAX;

/// Stride width remaining at bit depth `offset`: 6 everywhere except the
/// final, partial level (32 isn't a multiple of 6).
#[inline]
fn effective_stride(offset: u8) -> u8 {
    6.min(32 - offset)
}

/// One slot of the direct-pointing array `D`: a pre-resolved fib index
/// (high bit set), an index into `N`, or [`NO_ROUTE`] when no prefix in
/// the table covers this slot at all — the direct-pointing analogue of
/// the `None` `lookup` otherwise returns on an uncovered key, rather than
/// a stale pointer at the root.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DirectSlot(u32);

impl DirectSlot {
    fn to_node(index: u32) -> Self {
        debug_assert!(index & LEAF_TAG == 0);
        DirectSlot(index)
    }

    fn to_leaf(fib_index: u32) -> Self {
        debug_assert!(fib_index & LEAF_TAG == 0, "fib_index exceeds 2^31 - 1");
        debug_assert!(
            LEAF_TAG | fib_index != NO_ROUTE,
            "fib_index collides with the no-route sentinel"
        );
        DirectSlot(LEAF_TAG | fib_index)
    }

    fn no_route() -> Self {
        DirectSlot(NO_ROUTE)
    }

    #[inline]
    fn is_no_route(self) -> bool {
        self.0 == NO_ROUTE
    }

    #[inline]
    fn is_leaf(self) -> bool {
        self.0 & LEAF_TAG != 0
    }

    #[inline]
    fn fib(self) -> u32 {
        self.0 & !LEAF_TAG
    }

    #[inline]
    fn node_index(self) -> usize {
        self.0 as usize
    }
}

/// One internal-array slot. `base1`/`base0` are `None` rather than a
/// signed `-1` sentinel: that "no children of this kind" case only needs
/// checking while compiling (see below), so a post-compile node can say
/// so directly instead of carrying a signed placeholder.
///
/// Note this intentionally does *not* carry a `direct_index` field: the
/// lookup walk only ever reads `direct_index` off a `D` slot, never off
/// an `N` entry, so giving every `N` entry a field it never reads would
/// just be dead weight — see DESIGN.md.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct PoptrieNode {
    pub(crate) vector: u64,
    pub(crate) leafvec: u64,
    pub(crate) base1: Option<u32>,
    pub(crate) base0: Option<u32>,
}

/// An `L`-array entry: a fib index, reference-compacted across whatever
/// run of identical-next-hop slots it represents.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Leaf {
    pub(crate) fib_index: u32,
}

/// A compiled, immutable Poptrie. Build once via
/// [`crate::multiway::Builder::build_poptrie`], then share across as many
/// readers as you like — nothing here is ever mutated again.
pub struct Poptrie {
    n: Vec<PoptrieNode>,
    l: Vec<Leaf>,
    d: Vec<DirectSlot>,
    s: u8,
}

/// One node still waiting to be expanded into its reserved `N` slot.
/// Dropped as soon as it is processed — the compiler never keeps a
/// multiway-trie node alive past the BFS step that consumes it: exclusive
/// ownership, not a shared back-reference nulled out after the fact.
struct WorkItem {
    n_index: usize,
    node: Box<MultiNode>,
}

impl Poptrie {
    /// Consumes `builder` and compiles it into a Poptrie with a `direct_bits`-wide
    /// direct-pointing array. `direct_bits` must be 0 or a multiple of 6 up to 24;
    /// validated with a `debug_assert!`, since an out-of-range value here is a
    /// programmer error, not a runtime failure.
    pub(crate) fn compile(builder: Builder, direct_bits: u8) -> Result<Poptrie, PoptrieError> {
        debug_assert!(
            matches!(direct_bits, 0 | 6 | 12 | 18 | 24),
            "direct_bits must be 0, 6, 12, 18 or 24, got {direct_bits}"
        );

        if builder.insert_count == 0 {
            return Err(PoptrieError::Empty);
        }

        let Builder {
            root,
            internal_count,
            leaf_count_hint,
            insert_count: _,
        } = builder;

        let d_len = if direct_bits == 0 {
            1
        } else {
            1usize << direct_bits
        };
        let mut d = vec![DirectSlot::no_route(); d_len];
        if direct_bits == 0 {
            // s == 0: D has a single entry that always resolves to the root.
            d[0] = DirectSlot::to_node(0);
        }

        let mut n: Vec<PoptrieNode> = Vec::with_capacity(internal_count);
        n.push(PoptrieNode::default()); // root reserves N[0]
        let mut l: Vec<Leaf> = Vec::with_capacity(leaf_count_hint);

        let mut queue: VecDeque<WorkItem> = VecDeque::new();
        queue.push_back(WorkItem {
            n_index: 0,
            node: Box::new(root),
        });

        let mut start_base1: u32 = 1;
        let mut start_base0: u32 = 0;
        let mut n_point = 0usize;

        while let Some(WorkItem { n_index, node }) = queue.pop_front() {
            trace!("compiling N[{n_index}] (level {})", node.level);
            let MultiNode { children, .. } = *node;
            let children: [Option<Box<MultiNode>>; CHILDREN] = *children;

            let mut vector: u64 = 0;
            let mut leafvec: u64 = 0;
            let mut base1: Option<u32> = None;
            let mut base0: Option<u32> = None;
            let mut current_run_fib: Option<u32> = None;

            for (i, slot) in children.into_iter().enumerate() {
                let Some(child) = slot else { continue };

                if child.leaf {
                    let fib = child.fib_index;
                    if base0.is_none() {
                        base0 = Some(start_base0);
                    }
                    if current_run_fib != Some(fib) {
                        l.push(Leaf { fib_index: fib });
                        leafvec |= 1u64 << i;
                        current_run_fib = Some(fib);
                        start_base0 += 1;
                    }

                    if child.level == direct_bits {
                        d[child.prefix_value as usize] = DirectSlot::to_leaf(fib);
                    } else if child.level < direct_bits {
                        let shift = direct_bits - child.level;
                        let base = (child.prefix_value as usize) << shift;
                        for z in base..=(base | ((1usize << shift) - 1)) {
                            d[z] = DirectSlot::to_leaf(fib);
                        }
                    }
                } else {
                    if base1.is_none() {
                        base1 = Some(start_base1);
                    }
                    vector |= 1u64 << i;
                    let child_index = start_base1;
                    start_base1 += 1;
                    n.push(PoptrieNode::default());

                    if child.level == direct_bits {
                        d[child.prefix_value as usize] = DirectSlot::to_node(child_index);
                    }

                    queue.push_back(WorkItem {
                        n_index: child_index as usize,
                        node: child,
                    });
                }
            }

            n[n_index] = PoptrieNode {
                vector,
                leafvec,
                base1,
                base0,
            };
            n_point += 1;
        }

        debug!(
            "compiled poptrie: {} internal nodes, {} leaves, direct_bits={direct_bits}",
            n_point,
            l.len()
        );
        debug_assert_eq!(n_point, n.len());

        Ok(Poptrie {
            n,
            l,
            d,
            s: direct_bits,
        })
    }

    /// Looks up the longest matching prefix for `key`.
    /// Returns `None` if no prefix in the table covers `key` (a
    /// fib-index-typed variant of "no route", rather than reading past
    /// the end of the arrays on a dataset without a default route — see
    /// DESIGN.md).
    #[inline]
    pub fn lookup(&self, key: u32) -> Option<u32> {
        // Inclusive popcount of vector's bits at position <= v. v never
        // reaches 63 in this crate (the deepest internal array node sits
        // at bit depth 30, leaving a 2-bit effective stride), but the
        // arithmetic is kept overflow-safe regardless.
        #[inline]
        fn low_mask(v: u64) -> u64 {
            if v == 63 {
                u64::MAX
            } else {
                (2u64 << v) - 1
            }
        }

        let index = if self.s == 0 { 0 } else { extract32(key, 0, self.s) as usize };

        let d = self.d[index];
        if d.is_no_route() {
            return None;
        }
        if d.is_leaf() {
            return Some(d.fib());
        }

        let mut index = d.node_index();
        let mut offset = self.s;
        let mut node = self.n[index];
        let mut v = extract32(key, offset, effective_stride(offset)) as u64;

        while offset < 32 && node.vector & (1u64 << v) != 0 {
            let bc = (node.vector & low_mask(v)).count_ones();
            // base1 is guaranteed set whenever `vector` has any bit set.
            index = node.base1.expect("vector bit set implies base1") as usize + bc as usize - 1;
            node = self.n[index];
            offset += 6;
            if offset < 32 {
                v = extract32(key, offset, effective_stride(offset)) as u64;
            }
        }

        let bc = (node.leafvec & low_mask(v)).count_ones();
        if bc == 0 {
            return None;
        }
        let base0 = node.base0?;
        self.l
            .get(base0 as usize + bc as usize - 1)
            .map(|leaf| leaf.fib_index)
    }

    /// Number of entries in the internal-node array `N`. Diagnostic only.
    pub fn internal_node_count(&self) -> usize {
        self.n.len()
    }

    /// Number of entries in the leaf array `L`. Diagnostic only.
    pub fn leaf_count(&self) -> usize {
        self.l.len()
    }

    /// Length of the direct-pointing array `D` (1 when direct-pointing is
    /// disabled). Diagnostic only.
    pub fn direct_array_len(&self) -> usize {
        self.d.len()
    }

    /// The `direct_bits` this Poptrie was compiled with.
    pub fn direct_bits(&self) -> u8 {
        self.s
    }
}
