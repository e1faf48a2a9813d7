//! Dividing a list of sibling nodes among lenses by abstract type
//!
//! The abstract type of a lens is a language over label strings: every node contributes
//! its label followed by [`LABEL_SEP`]. [`Siblings`] holds that string for one list of
//! nodes together with the offset at which each node starts, so any run of nodes can be
//! tested against an abstract type as a byte slice.

use crate::fa::{Regexp, LABEL_SEP};
use crate::lens::Lens;
use crate::tree::{segment_names, Node};

pub(super) struct Siblings<'a> {
    pub(super) nodes: &'a [Node],
    labels: Vec<u8>,
    offsets: Vec<usize>,
    names: Vec<String>,
}

impl<'a> Siblings<'a> {
    pub(super) fn new(nodes: &'a [Node]) -> Self {
        let mut labels = Vec::new();
        let mut offsets = Vec::with_capacity(nodes.len() + 1);
        for node in nodes {
            offsets.push(labels.len());
            if let Some(label) = &node.label {
                labels.extend_from_slice(label.as_bytes());
            }
            labels.push(LABEL_SEP);
        }
        offsets.push(labels.len());
        Self {
            nodes,
            labels,
            offsets,
            names: segment_names(nodes),
        }
    }

    /// Label string of `nodes[lo..hi]`.
    pub(super) fn bytes(&self, lo: usize, hi: usize) -> &[u8] {
        &self.labels[self.offsets[lo]..self.offsets[hi]]
    }

    pub(super) fn fits(&self, lens: &Lens, lo: usize, hi: usize) -> bool {
        lens.atype().matches_bytes(self.bytes(lo, hi))
    }

    /// Path segment of `nodes[i]`.
    pub(super) fn name(&self, i: usize) -> &str {
        &self.names[i]
    }

    /// Every `end` in `start..=hi` such that `nodes[start..end]` is in `ty`, ascending.
    fn ends(&self, ty: &Regexp, start: usize, hi: usize) -> Vec<usize> {
        let bounds = &self.offsets[start..=hi];
        ty.match_ends(&self.labels, self.offsets[start], self.offsets[hi])
            .into_iter()
            .filter_map(|p| bounds.binary_search(&p).ok().map(|i| start + i))
            .collect()
    }

    /// Entry `i - lo` tells whether `nodes[i..hi]` is in `ty`, for every `i` in `lo..=hi`.
    fn starts(&self, ty: &Regexp, lo: usize, hi: usize) -> Vec<bool> {
        let base = self.offsets[lo];
        let flags = ty.match_starts(&self.labels, base, self.offsets[hi]);
        self.offsets[lo..=hi].iter().map(|&p| flags[p - base]).collect()
    }
}

/// Cut `nodes[lo..hi]` into one run per child of a concatenation, `atails[i]` being the
/// abstract type of the children after `i`. Each child takes the longest run after which
/// the rest can still be placed. Returns the `children.len() + 1` boundaries.
pub(super) fn split_concat(
    children: &[Lens],
    atails: &[Regexp],
    siblings: &Siblings<'_>,
    lo: usize,
    hi: usize,
) -> Option<Vec<usize>> {
    let mut cuts = Vec::with_capacity(children.len() + 1);
    cuts.push(lo);
    let mut pos = lo;
    for (child, tail) in children.iter().zip(atails) {
        let rest = siblings.starts(tail, pos, hi);
        pos = siblings
            .ends(child.atype(), pos, hi)
            .into_iter()
            .rev()
            .find(|&end| rest[end - pos])?;
        cuts.push(pos);
    }
    (pos == hi).then_some(cuts)
}

/// Iterations of a star over `nodes[lo..hi]`.
pub(super) struct Iterations<'s, 'a> {
    child: &'s Lens,
    siblings: &'s Siblings<'a>,
    lo: usize,
    hi: usize,
    /// Whether the star accepts `nodes[i..hi]`, at `i - lo`.
    rest: Vec<bool>,
}

impl<'s, 'a> Iterations<'s, 'a> {
    pub(super) fn new(
        star: &Lens,
        child: &'s Lens,
        siblings: &'s Siblings<'a>,
        lo: usize,
        hi: usize,
    ) -> Self {
        Self {
            child,
            siblings,
            lo,
            hi,
            rest: siblings.starts(star.atype(), lo, hi),
        }
    }

    /// End of the iteration starting at `start`: the longest non-empty run the body
    /// accepts after which the star can still accept the rest.
    pub(super) fn next(&self, start: usize) -> Option<usize> {
        self.siblings
            .ends(self.child.atype(), start, self.hi)
            .into_iter()
            .rev()
            .find(|&end| end > start && self.rest[end - self.lo])
    }
}
