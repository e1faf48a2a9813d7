//! Tree to text
//!
//! The walk follows the lens and the new tree together. Old formatting comes from two
//! places: the skeleton handed down from the parent, which is only trusted where it is an
//! instance of the current lens, and the dictionary, which is consulted by label whenever
//! a subtree is entered. Where neither has anything, `del` falls back to its default
//! text and the rest of the output is synthesized from the tree.

use log::debug;

use super::split::{split_concat, Iterations, Siblings};
use crate::error::{LnsError, LnsResult};
use crate::lens::{Lens, LensKind, Slot};
use crate::skel::{Dict, Skel, SkelKind};
use crate::tree::Tree;

/// The part of the tree one lens is responsible for: label and value of the enclosing
/// node, and a run of its children.
#[derive(Clone, Copy)]
struct Level<'a> {
    key: Option<&'a str>,
    value: Option<&'a str>,
    siblings: &'a Siblings<'a>,
    lo: usize,
    hi: usize,
    path: &'a str,
}

impl<'a> Level<'a> {
    fn run(self, lo: usize, hi: usize) -> Self {
        Self { lo, hi, ..self }
    }

    fn fits(&self, lens: &Lens) -> bool {
        self.siblings.fits(lens, self.lo, self.hi)
    }
}

#[derive(Default)]
pub(super) struct Putter {
    out: String,
}

impl Putter {
    pub(super) fn new() -> Self {
        Self::default()
    }

    pub(super) fn finish(self) -> String {
        self.out
    }

    pub(super) fn put_tree(
        &mut self,
        lens: &Lens,
        tree: &Tree,
        skel: Option<&Skel>,
        dict: &mut Dict,
    ) -> LnsResult<()> {
        let owns_key = lens.key_type().is_some();
        let owns_value = lens.value_type().is_some();
        if owns_key || owns_value {
            let [root] = tree.children.as_slice() else {
                return Err(LnsError::put(
                    lens,
                    "/",
                    format!(
                        "expected a single root node, found {}",
                        tree.children.len()
                    ),
                ));
            };
            let siblings = Siblings::new(&root.children);
            let path = format!("/{}", Siblings::new(&tree.children).name(0));
            let level = Level {
                key: root.label.as_deref(),
                value: root.value.as_deref(),
                siblings: &siblings,
                lo: 0,
                hi: root.children.len(),
                path: &path,
            };
            self.put_checked(lens, level, skel, dict, owns_key, owns_value)
        } else {
            let siblings = Siblings::new(&tree.children);
            let level = Level {
                key: None,
                value: None,
                siblings: &siblings,
                lo: 0,
                hi: tree.children.len(),
                path: "",
            };
            self.put_checked(lens, level, skel, dict, false, false)
        }
    }

    fn put_checked(
        &mut self,
        lens: &Lens,
        level: Level<'_>,
        skel: Option<&Skel>,
        dict: &mut Dict,
        owns_key: bool,
        owns_value: bool,
    ) -> LnsResult<()> {
        if !applies(lens, &level, owns_key, owns_value) {
            return Err(error(lens, &level, "tree does not match the lens"));
        }
        self.put(lens, level, skel, dict)
    }

    fn put(
        &mut self,
        lens: &Lens,
        level: Level<'_>,
        skel: Option<&Skel>,
        dict: &mut Dict,
    ) -> LnsResult<()> {
        let skel = skel.filter(|s| s.instance_of(lens));
        match lens.kind() {
            LensKind::Del { default, .. } => {
                match skel.map(Skel::kind) {
                    Some(SkelKind::Del(text)) => self.out.push_str(text),
                    _ => self.out.push_str(default),
                }
                Ok(())
            }
            LensKind::Store { regexp } => {
                let value = level
                    .value
                    .ok_or_else(|| error(lens, &level, "no value to store"))?;
                if !regexp.matches(value) {
                    return Err(error(
                        lens,
                        &level,
                        format!("value '{value}' does not match {regexp}"),
                    ));
                }
                self.out.push_str(value);
                Ok(())
            }
            LensKind::Key { regexp } => {
                let key = level
                    .key
                    .ok_or_else(|| error(lens, &level, "no label for key"))?;
                if !regexp.matches(key) {
                    return Err(error(
                        lens,
                        &level,
                        format!("label '{key}' does not match {regexp}"),
                    ));
                }
                self.out.push_str(key);
                Ok(())
            }
            LensKind::Label { name } => {
                if level.key != Some(name.as_str()) {
                    return Err(error(
                        lens,
                        &level,
                        format!("expected label '{name}', found {:?}", level.key),
                    ));
                }
                Ok(())
            }
            LensKind::Seq { .. } => {
                let numbered = level
                    .key
                    .is_some_and(|k| lens.key_type().is_some_and(|ty| ty.matches(k)));
                if !numbered {
                    return Err(error(
                        lens,
                        &level,
                        format!("expected a number as label, found {:?}", level.key),
                    ));
                }
                Ok(())
            }
            LensKind::Counter { .. } => Ok(()),
            LensKind::Concat { children, atails, .. } => {
                let cuts = split_concat(children, atails, level.siblings, level.lo, level.hi)
                    .ok_or_else(|| error(lens, &level, "nodes do not fit the concatenation"))?;
                let skels = match skel.map(Skel::kind) {
                    Some(SkelKind::Concat(skels)) if skels.len() == children.len() => {
                        Some(skels.as_slice())
                    }
                    _ => None,
                };
                for (i, child) in children.iter().enumerate() {
                    let part = level.run(cuts[i], cuts[i + 1]);
                    self.put(child, part, skels.map(|s| &s[i]), dict)?;
                }
                Ok(())
            }
            LensKind::Union { children } => {
                let owns_key = lens.key_type().is_some();
                let owns_value = lens.value_type().is_some();
                let applicable: Vec<&Lens> = children
                    .iter()
                    .filter(|c| applies(c, &level, owns_key, owns_value))
                    .collect();
                let chosen = applicable
                    .iter()
                    .find(|c| reusable(c, &level, skel, dict))
                    .or_else(|| applicable.first())
                    .copied()
                    .ok_or_else(|| error(lens, &level, "no alternative of the union fits"))?;
                self.put(chosen, level, skel, dict)
            }
            LensKind::Subtree { child } => self.put_subtree(lens, child, level, dict),
            LensKind::Star { child } => self.put_star(lens, child, level, skel, dict),
            LensKind::Maybe { child } => {
                let owns_key = lens.key_type().is_some();
                let owns_value = lens.value_type().is_some();
                let evidence = level.hi > level.lo
                    || (owns_key && level.key.is_some())
                    || (owns_value && level.value.is_some());
                let fits = applies(child, &level, owns_key, owns_value);
                let inner = match skel.map(Skel::kind) {
                    Some(SkelKind::Maybe(Some(inner))) => Some(&**inner),
                    _ => None,
                };
                if evidence {
                    if !fits {
                        return Err(error(lens, &level, "tree does not fit the optional lens"));
                    }
                    self.put(child, level, inner, dict)
                } else if inner.is_some() && fits {
                    self.put(child, level, inner, dict)
                } else {
                    Ok(())
                }
            }
        }
    }

    fn put_subtree(
        &mut self,
        lens: &Lens,
        child: &Lens,
        level: Level<'_>,
        dict: &mut Dict,
    ) -> LnsResult<()> {
        if level.hi != level.lo + 1 {
            return Err(error(lens, &level, "expected exactly one node"));
        }
        let node = &level.siblings.nodes[level.lo];
        let path = format!("{}/{}", level.path, level.siblings.name(level.lo));
        let children = Siblings::new(&node.children);
        let inner = Level {
            key: node.label.as_deref(),
            value: node.value.as_deref(),
            siblings: &children,
            lo: 0,
            hi: node.children.len(),
            path: &path,
        };
        if node.label.is_some() && child.key_type().is_none() {
            return Err(error(child, &inner, "node has a label but the lens sets none"));
        }
        if node.value.is_some() && child.value_type().is_none() {
            return Err(error(child, &inner, "node has a value but the lens stores none"));
        }
        if !inner.fits(child) {
            return Err(error(child, &inner, "children do not match the lens"));
        }
        let label = inner.key;
        if dict.peek(label).is_some_and(|e| e.skel.instance_of(child)) {
            if let Some(entry) = dict.lookup(label) {
                return self.put(child, inner, Some(&entry.skel), &mut entry.dict);
            }
        }
        debug!("{path}: nothing stored for this label, creating");
        self.put(child, inner, None, &mut Dict::new())
    }

    fn put_star(
        &mut self,
        lens: &Lens,
        child: &Lens,
        level: Level<'_>,
        skel: Option<&Skel>,
        dict: &mut Dict,
    ) -> LnsResult<()> {
        let old: &[Skel] = match skel.map(Skel::kind) {
            Some(SkelKind::Star(skels)) => skels,
            _ => &[],
        };
        let iterations = Iterations::new(lens, child, level.siblings, level.lo, level.hi);
        let mut k = 0;
        let mut at = level.lo;
        loop {
            // iterations that left no trace in the tree are replayed where they were
            while let Some(prev) = old.get(k).filter(|s| !s.produces_nodes()) {
                self.replay(child, level.run(at, at), prev, dict)?;
                k += 1;
            }
            if at == level.hi {
                // old iterations whose nodes are gone leave their text-only neighbours behind
                for prev in old.iter().skip(k).filter(|s| !s.produces_nodes()) {
                    self.replay(child, level.run(at, at), prev, dict)?;
                }
                return Ok(());
            }
            let end = iterations.next(at).ok_or_else(|| {
                error(lens, &level.run(at, level.hi), "nodes do not fit the iteration")
            })?;
            // old iterations that produced nodes are paired with new ones by position
            let reuse = old.get(k);
            k += 1;
            self.put(child, level.run(at, end), reuse, dict)?;
            at = end;
        }
    }

    /// Print an old iteration that produced no nodes, if the body can still produce it.
    fn replay(
        &mut self,
        child: &Lens,
        empty: Level<'_>,
        prev: &Skel,
        dict: &mut Dict,
    ) -> LnsResult<()> {
        if prev.instance_of(child) && applies(child, &empty, false, false) {
            self.put(child, empty, Some(prev), dict)?;
        }
        Ok(())
    }
}

/// Whether `lens` can produce the nodes of `level`, and, for the slots the caller says
/// `lens` is responsible for, the label and value.
fn applies(lens: &Lens, level: &Level<'_>, owns_key: bool, owns_value: bool) -> bool {
    let slot_ok = |slot: Option<&Slot>, given: Option<&str>| match slot {
        Some(slot) => slot.admits(given),
        None => given.is_none(),
    };
    let node = lens.node();
    let inside = match lens.kind() {
        // a subtree can also tell whether the node's own label and value suit it
        LensKind::Subtree { child } if level.hi == level.lo + 1 => {
            let target = &level.siblings.nodes[level.lo];
            slot_ok(child.node().key.as_ref(), target.label.as_deref())
                && slot_ok(child.node().value.as_ref(), target.value.as_deref())
        }
        _ => true,
    };
    level.fits(lens)
        && inside
        && (!owns_key || slot_ok(node.key.as_ref(), level.key))
        && (!owns_value || slot_ok(node.value.as_ref(), level.value))
}

/// Whether choosing union alternative `alt` would reuse stored formatting.
fn reusable(alt: &Lens, level: &Level<'_>, skel: Option<&Skel>, dict: &Dict) -> bool {
    match alt.kind() {
        LensKind::Subtree { child } if level.hi == level.lo + 1 => {
            let label = level.siblings.nodes[level.lo].label.as_deref();
            dict.peek(label).is_some_and(|e| e.skel.instance_of(child))
        }
        _ => skel.is_some_and(|s| s.instance_of(alt)),
    }
}

fn error(lens: &Lens, level: &Level<'_>, message: impl Into<String>) -> LnsError {
    let path = if level.path.is_empty() { "/" } else { level.path };
    LnsError::put(lens, path, message)
}
