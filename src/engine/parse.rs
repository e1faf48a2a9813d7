//! Text to (skeleton, dictionary, tree)
//!
//! The whole input is first checked against the top lens's concrete type, so the walk
//! below only ever has to divide a region that is known to match. Concatenations give
//! each child the longest prefix after which the remaining children can still match;
//! stars do the same per iteration. With typechecked lenses that split is the only one.
//! Which suffixes of a region the rest can match is worked out once per region by a
//! backward scan, so a region is never rescanned for every candidate split.

use std::collections::HashMap;

use log::debug;

use crate::config::ParseFlags;
use crate::error::{LnsError, LnsResult};
use crate::lens::{Lens, LensKind};
use crate::skel::{Dict, Skel, SkelKind};
use crate::tree::Node;

/// What one lens produced over one region.
pub(super) struct Walked {
    pub(super) skel: Skel,
    pub(super) dict: Dict,
    pub(super) key: Option<String>,
    pub(super) value: Option<String>,
    pub(super) nodes: Vec<Node>,
}

impl Walked {
    fn leaf(lens: &Lens, kind: SkelKind) -> Self {
        Self {
            skel: Skel::new(lens, kind),
            dict: Dict::new(),
            key: None,
            value: None,
            nodes: Vec::new(),
        }
    }
}

pub(super) struct Parser<'t> {
    text: &'t str,
    flags: ParseFlags,
    build_tree: bool,
    counters: HashMap<String, u64>,
}

impl<'t> Parser<'t> {
    pub(super) fn new(text: &'t str, flags: ParseFlags, build_tree: bool) -> Self {
        Self {
            text,
            flags,
            build_tree,
            counters: HashMap::new(),
        }
    }

    fn bytes(&self) -> &'t [u8] {
        self.text.as_bytes()
    }

    pub(super) fn run(&mut self, lens: &Lens) -> LnsResult<Walked> {
        let bytes = self.bytes();
        if !lens.ctype().matches_bytes(bytes) {
            let pos = lens.ctype().viable_prefix(bytes);
            let partial = lens
                .ctype()
                .match_ends(bytes, 0, bytes.len())
                .into_iter()
                .any(|end| end > 0);
            let message = if partial {
                "Get did not match entire input"
            } else {
                "Syntax error"
            };
            debug!("{message} at {pos} for {}", lens.ctype());
            return Err(LnsError::get(lens, pos, message));
        }
        self.walk(lens, 0, bytes.len())
    }

    fn slice(&self, lens: &Lens, start: usize, end: usize) -> LnsResult<&'t str> {
        let text = self.text;
        text.get(start..end).ok_or_else(|| {
            LnsError::get(lens, start, "match does not end on a character boundary")
        })
    }

    fn walk(&mut self, lens: &Lens, start: usize, end: usize) -> LnsResult<Walked> {
        if self.flags.show_advance {
            debug!(target: "bilens::advance", "{} at {start}..{end}", lens.tag());
        }
        match lens.kind() {
            LensKind::Del { .. } => {
                let text = self.token(lens, start, end)?;
                Ok(Walked::leaf(lens, SkelKind::Del(text.to_string())))
            }
            LensKind::Store { .. } => {
                let text = self.token(lens, start, end)?;
                Ok(Walked {
                    value: Some(text.to_string()),
                    ..Walked::leaf(lens, SkelKind::Store)
                })
            }
            LensKind::Key { .. } => {
                let text = self.token(lens, start, end)?;
                Ok(Walked {
                    key: Some(text.to_string()),
                    ..Walked::leaf(lens, SkelKind::Key)
                })
            }
            LensKind::Label { name } => Ok(Walked {
                key: Some(name.clone()),
                ..Walked::leaf(lens, SkelKind::Label)
            }),
            LensKind::Seq { name } => {
                let counter = self.counters.entry(name.clone()).or_insert(0);
                *counter += 1;
                Ok(Walked {
                    key: Some(counter.to_string()),
                    ..Walked::leaf(lens, SkelKind::Seq)
                })
            }
            LensKind::Counter { name } => {
                self.counters.insert(name.clone(), 0);
                Ok(Walked::leaf(lens, SkelKind::Counter))
            }
            LensKind::Concat { children, tails, .. } => {
                let mut out = Walked::leaf(lens, SkelKind::Concat(Vec::new()));
                let mut skels = Vec::with_capacity(children.len());
                let mut pos = start;
                for (child, tail) in children.iter().zip(tails) {
                    let rest = tail.match_starts(self.bytes(), pos, end);
                    let split = child
                        .ctype()
                        .match_ends(self.bytes(), pos, end)
                        .into_iter()
                        .rev()
                        .find(|&p| rest[p - pos])
                        .ok_or_else(|| LnsError::get(child, pos, "no match for concatenation"))?;
                    self.matched(child, pos, split);
                    let walked = self.walk(child, pos, split)?;
                    skels.push(walked.skel);
                    absorb(&mut out, walked.dict, walked.key, walked.value, walked.nodes);
                    pos = split;
                }
                out.skel = Skel::new(lens, SkelKind::Concat(skels));
                Ok(out)
            }
            LensKind::Union { children } => {
                let region = &self.bytes()[start..end];
                let child = children
                    .iter()
                    .find(|c| c.ctype().matches_bytes(region))
                    .ok_or_else(|| LnsError::get(lens, start, "no match for union"))?;
                self.matched(child, start, end);
                self.walk(child, start, end)
            }
            LensKind::Subtree { child } => {
                let walked = self.walk(child, start, end)?;
                let mut out = Walked::leaf(lens, SkelKind::Subtree);
                if self.build_tree {
                    out.nodes.push(Node {
                        label: walked.key.clone(),
                        value: walked.value,
                        children: walked.nodes,
                    });
                }
                out.dict = Dict::singleton(walked.key, walked.skel, walked.dict);
                Ok(out)
            }
            LensKind::Star { child } => {
                let mut out = Walked::leaf(lens, SkelKind::Star(Vec::new()));
                let mut skels = Vec::new();
                let rest = lens.ctype().match_starts(self.bytes(), start, end);
                let mut pos = start;
                while pos < end {
                    let split = child
                        .ctype()
                        .match_ends(self.bytes(), pos, end)
                        .into_iter()
                        .rev()
                        .find(|&p| p > pos && rest[p - start])
                        .ok_or_else(|| LnsError::get(child, pos, "no match for iteration"))?;
                    self.matched(child, pos, split);
                    let walked = self.walk(child, pos, split)?;
                    skels.push(walked.skel);
                    absorb(&mut out, walked.dict, walked.key, walked.value, walked.nodes);
                    pos = split;
                }
                out.skel = Skel::new(lens, SkelKind::Star(skels));
                Ok(out)
            }
            LensKind::Maybe { child } => {
                if start == end {
                    return Ok(Walked::leaf(lens, SkelKind::Maybe(None)));
                }
                self.matched(child, start, end);
                let walked = self.walk(child, start, end)?;
                Ok(Walked {
                    skel: Skel::new(lens, SkelKind::Maybe(Some(Box::new(walked.skel)))),
                    ..walked
                })
            }
        }
    }

    /// Text of a primitive's region.
    fn token(&self, lens: &Lens, start: usize, end: usize) -> LnsResult<&'t str> {
        let text = self.slice(lens, start, end)?;
        if self.flags.show_tokens {
            debug!(target: "bilens::token", "{} {text:?} at {start}", lens.tag());
        }
        Ok(text)
    }

    fn matched(&self, lens: &Lens, start: usize, end: usize) {
        if self.flags.show_matches {
            debug!(
                target: "bilens::match",
                "{} matched {start}..{end} ({} bytes)",
                lens.ctype(),
                end - start
            );
        }
    }
}

fn absorb(
    out: &mut Walked,
    dict: Dict,
    key: Option<String>,
    value: Option<String>,
    nodes: Vec<Node>,
) {
    out.dict.merge(dict);
    if out.key.is_none() {
        out.key = key;
    }
    if out.value.is_none() {
        out.value = value;
    }
    out.nodes.extend(nodes);
}
