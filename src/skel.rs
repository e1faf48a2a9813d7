//! Skeletons and dictionaries
//!
//!     A skeleton records the shape of one parse: which alternative of each union was taken,
//!     how many times each star iterated, and the literal text every `del` consumed. It is
//!     what `put` replays to reproduce formatting that never made it into the tree.
//!
//!     Skeletons stop at subtree boundaries. What happened inside a subtree is filed in a
//!     [`Dict`] under the subtree's label, so that `put` can find it again by label even
//!     after the tree has been reordered:
//!
//!         "a = 1\nb = 2\n"  ->  skel  Star[Subtree, Subtree]
//!                               dict  a -> (Concat[Key, Del(" = "), Store, Del("\n")], {})
//!                                     b -> (Concat[Key, Del(" = "), Store, Del("\n")], {})
//!
//!     Entries for one label form a queue. Lookups consume it front to back; [`Dict::reset`]
//!     rewinds every queue so the same dictionary can serve another `put`.

use std::collections::HashMap;
use std::fmt;

use crate::lens::{Lens, LensKind};

/// One node of a skeleton.
#[derive(Clone)]
pub struct Skel {
    lens: Lens,
    kind: SkelKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkelKind {
    /// Text matched by a `del`.
    Del(String),
    Store,
    Key,
    Label,
    Seq,
    Counter,
    Concat(Vec<Skel>),
    /// Contents live in the dictionary.
    Subtree,
    Star(Vec<Skel>),
    Maybe(Option<Box<Skel>>),
}

impl Skel {
    pub(crate) fn new(lens: &Lens, kind: SkelKind) -> Skel {
        Skel {
            lens: lens.clone(),
            kind,
        }
    }

    /// The lens that produced this skeleton.
    pub fn lens(&self) -> &Lens {
        &self.lens
    }

    pub fn kind(&self) -> &SkelKind {
        &self.kind
    }

    /// Whether this skeleton could have been produced by `lens`.
    ///
    /// Unions leave no trace of their own, so a skeleton is an instance of a union when it
    /// is an instance of one of the alternatives.
    pub fn instance_of(&self, lens: &Lens) -> bool {
        if self.lens.ptr_eq(lens) {
            return true;
        }
        match (lens.kind(), &self.kind) {
            (LensKind::Union { children }, _) => children.iter().any(|c| self.instance_of(c)),
            (LensKind::Del { regexp, .. }, SkelKind::Del(text)) => regexp.matches(text),
            (LensKind::Store { .. }, SkelKind::Store)
            | (LensKind::Key { .. }, SkelKind::Key)
            | (LensKind::Label { .. }, SkelKind::Label)
            | (LensKind::Seq { .. }, SkelKind::Seq)
            | (LensKind::Counter { .. }, SkelKind::Counter)
            | (LensKind::Subtree { .. }, SkelKind::Subtree) => true,
            (LensKind::Concat { children, .. }, SkelKind::Concat(skels)) => {
                children.len() == skels.len()
                    && children.iter().zip(skels).all(|(l, s)| s.instance_of(l))
            }
            (LensKind::Star { child }, SkelKind::Star(skels)) => {
                skels.iter().all(|s| s.instance_of(child))
            }
            (LensKind::Maybe { child }, SkelKind::Maybe(inner)) => {
                inner.as_ref().map_or(true, |s| s.instance_of(child))
            }
            _ => false,
        }
    }

    /// Whether the parse this skeleton records produced any tree node.
    pub fn produces_nodes(&self) -> bool {
        match &self.kind {
            SkelKind::Subtree => true,
            SkelKind::Concat(skels) | SkelKind::Star(skels) => {
                skels.iter().any(Skel::produces_nodes)
            }
            SkelKind::Maybe(inner) => inner.as_ref().is_some_and(|s| s.produces_nodes()),
            _ => false,
        }
    }

    /// Concatenation of all `del` text, in order.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match &self.kind {
            SkelKind::Del(text) => out.push_str(text),
            SkelKind::Concat(skels) | SkelKind::Star(skels) => {
                skels.iter().for_each(|s| s.collect_text(out))
            }
            SkelKind::Maybe(Some(inner)) => inner.collect_text(out),
            _ => {}
        }
    }
}

impl PartialEq for Skel {
    /// Skeletons compare by shape and text; the producing lens must be the same node.
    fn eq(&self, other: &Self) -> bool {
        self.lens.ptr_eq(&other.lens) && self.kind == other.kind
    }
}

impl Eq for Skel {}

impl fmt::Debug for Skel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            SkelKind::Del(text) => write!(f, "Del({text:?})"),
            SkelKind::Concat(skels) => f.debug_tuple("Concat").field(skels).finish(),
            SkelKind::Star(skels) => f.debug_tuple("Star").field(skels).finish(),
            SkelKind::Maybe(inner) => f.debug_tuple("Maybe").field(inner).finish(),
            other => write!(f, "{other:?}"),
        }
    }
}

/// A skeleton filed under a label, with the dictionary of the subtree it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictEntry {
    pub skel: Skel,
    pub dict: Dict,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct DictSlot {
    key: Option<String>,
    entries: Vec<DictEntry>,
    cursor: usize,
}

/// Queues of [`DictEntry`] keyed by subtree label, in first-seen key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dict {
    slots: Vec<DictSlot>,
    /// Position in `slots` of every labeled key.
    labeled: HashMap<String, usize>,
    unlabeled: Option<usize>,
}

impl Dict {
    pub fn new() -> Dict {
        Dict::default()
    }

    pub(crate) fn singleton(key: Option<String>, skel: Skel, dict: Dict) -> Dict {
        let mut d = Dict::new();
        d.push(key, DictEntry { skel, dict });
        d
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = Option<&str>> {
        self.slots.iter().map(|s| s.key.as_deref())
    }

    /// All entries filed under `key`, consumed or not.
    pub fn entries(&self, key: Option<&str>) -> &[DictEntry] {
        self.slot(key)
            .map(|s| s.entries.as_slice())
            .unwrap_or_default()
    }

    fn position(&self, key: Option<&str>) -> Option<usize> {
        match key {
            Some(label) => self.labeled.get(label).copied(),
            None => self.unlabeled,
        }
    }

    fn slot(&self, key: Option<&str>) -> Option<&DictSlot> {
        self.position(key).map(|i| &self.slots[i])
    }

    fn slot_mut(&mut self, key: Option<&str>) -> Option<&mut DictSlot> {
        self.position(key).map(|i| &mut self.slots[i])
    }

    /// Queue `entries` behind whatever is already filed under `key`.
    fn append(&mut self, key: Option<String>, entries: Vec<DictEntry>) {
        if let Some(slot) = self.slot_mut(key.as_deref()) {
            slot.entries.extend(entries);
            return;
        }
        let i = self.slots.len();
        match &key {
            Some(label) => {
                self.labeled.insert(label.clone(), i);
            }
            None => self.unlabeled = Some(i),
        }
        self.slots.push(DictSlot {
            key,
            entries,
            cursor: 0,
        });
    }

    fn push(&mut self, key: Option<String>, entry: DictEntry) {
        self.append(key, vec![entry]);
    }

    /// Append every queue of `other` behind the entries already filed under the same key.
    pub(crate) fn merge(&mut self, other: Dict) {
        for slot in other.slots {
            self.append(slot.key, slot.entries);
        }
    }

    /// The next unconsumed entry for `key`, without consuming it.
    pub fn peek(&self, key: Option<&str>) -> Option<&DictEntry> {
        self.slot(key).and_then(|s| s.entries.get(s.cursor))
    }

    /// Consume the next entry for `key`.
    pub fn lookup(&mut self, key: Option<&str>) -> Option<&mut DictEntry> {
        let slot = self.slot_mut(key)?;
        let entry = slot.entries.get_mut(slot.cursor)?;
        slot.cursor += 1;
        Some(entry)
    }

    /// Rewind every queue, including those of nested dictionaries.
    pub fn reset(&mut self) {
        for slot in &mut self.slots {
            slot.cursor = 0;
            for entry in &mut slot.entries {
                entry.dict.reset();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lens::Info;

    fn del(text: &str) -> (Lens, Skel) {
        let lens = Lens::del(Info::unknown(), "[a-z0-9 ]+", "x").unwrap();
        let skel = Skel::new(&lens, SkelKind::Del(text.to_string()));
        (lens, skel)
    }

    #[test]
    fn lookup_is_fifo_per_key() {
        let mut dict = Dict::new();
        for text in ["a1", "b1", "a2"] {
            let (_, skel) = del(text);
            let key = text[..1].to_string();
            dict.merge(Dict::singleton(Some(key), skel, Dict::new()));
        }
        assert_eq!(dict.len(), 2);
        assert_eq!(dict.entries(Some("a")).len(), 2);

        assert_eq!(dict.lookup(Some("a")).unwrap().skel.text(), "a1");
        assert_eq!(dict.peek(Some("a")).unwrap().skel.text(), "a2");
        assert_eq!(dict.lookup(Some("a")).unwrap().skel.text(), "a2");
        assert!(dict.lookup(Some("a")).is_none());
        assert_eq!(dict.lookup(Some("b")).unwrap().skel.text(), "b1");
        assert!(dict.lookup(None).is_none());

        dict.reset();
        assert_eq!(dict.lookup(Some("a")).unwrap().skel.text(), "a1");
    }

    #[test]
    fn merge_keeps_first_seen_key_order() {
        let mut dict = Dict::new();
        for key in ["b", "a", "b", "c", "a"] {
            let (_, skel) = del(key);
            dict.merge(Dict::singleton(Some(key.to_string()), skel, Dict::new()));
        }
        let (_, skel) = del("none");
        dict.merge(Dict::singleton(None, skel, Dict::new()));
        assert_eq!(
            dict.keys().collect::<Vec<_>>(),
            vec![Some("b"), Some("a"), Some("c"), None]
        );
        assert_eq!(dict.entries(Some("a")).len(), 2);
        assert_eq!(dict.lookup(None).unwrap().skel.text(), "none");
    }

    #[test]
    fn reset_reaches_nested_dictionaries() {
        let (_, inner_skel) = del("inner");
        let mut inner = Dict::singleton(Some("k".into()), inner_skel, Dict::new());
        inner.lookup(Some("k"));
        let (_, outer_skel) = del("outer");
        let mut outer = Dict::singleton(None, outer_skel, inner);
        outer.reset();
        let entry = outer.lookup(None).unwrap();
        assert!(entry.dict.peek(Some("k")).is_some());
    }

    #[test]
    fn instance_of_checks_structure() {
        let (lens, skel) = del("abc");
        assert!(skel.instance_of(&lens));

        let other = Lens::del(Info::unknown(), "[a-c]+", "a").unwrap();
        assert!(skel.instance_of(&other));
        let digits = Lens::del(Info::unknown(), "[0-9]+", "0").unwrap();
        assert!(!skel.instance_of(&digits));

        let either = Lens::make_union(Info::unknown(), digits.clone(), other, true).unwrap();
        assert!(skel.instance_of(&either));

        let star_digits = Lens::make_star(Info::unknown(), digits, true).unwrap();
        let star_words = Lens::make_star(Info::unknown(), lens, true).unwrap();
        let iterations = Skel::new(&star_digits, SkelKind::Star(vec![skel]));
        assert!(iterations.instance_of(&star_words));
        assert!(!iterations.produces_nodes());
        assert_eq!(iterations.text(), "abc");
    }
}
