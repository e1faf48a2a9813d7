//! Lenses
//!
//!     A lens is one node of a combinator tree that describes, at the same time, how to parse
//!     text into a tree and how to print a tree back into text. There are six primitives,
//!     which consume text (or not) without recursing, and five combinators:
//!
//!         del     match text, keep it only in the skeleton
//!         store   match text, it becomes the value of the enclosing tree node
//!         key     match text, it becomes the label of the enclosing tree node
//!         label   no text, fixed label
//!         seq     no text, label is the next number of a named counter
//!         counter no text, resets a named counter
//!
//!         concat  children in sequence            union   first matching alternative
//!         subtree child produces one tree node    star    zero or more repetitions
//!         maybe   zero or one occurrence
//!
//!     Lenses are immutable once built and shared through reference counting. Constructors
//!     take their children by value and either return the new lens or a [`LensError`] when
//!     typechecking rejects the combination. See [typecheck] for the rules.
//!
//!     Each lens carries four regular types, computed bottom-up:
//!     - ctype: the text it matches
//!     - atype: the sequences of tree nodes it produces, written as labels each followed by
//!       a separator byte
//!     - key slot: the labels it can give to the enclosing node
//!     - value slot: the values it can store in the enclosing node

pub mod info;
pub(crate) mod typecheck;

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::error::{LensError, LensResult};
use crate::fa::Regexp;
pub use info::Info;

/// Labels produced by `seq`.
static SEQ_LABELS: Lazy<Regexp> = Lazy::new(|| Regexp::new("[0-9]+").unwrap());

/// The eleven kinds of lens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Del,
    Store,
    Key,
    Label,
    Seq,
    Counter,
    Concat,
    Union,
    Subtree,
    Star,
    Maybe,
}

impl Tag {
    pub fn name(self) -> &'static str {
        match self {
            Tag::Del => "del",
            Tag::Store => "store",
            Tag::Key => "key",
            Tag::Label => "label",
            Tag::Seq => "seq",
            Tag::Counter => "counter",
            Tag::Concat => "concat",
            Tag::Union => "union",
            Tag::Subtree => "subtree",
            Tag::Star => "star",
            Tag::Maybe => "maybe",
        }
    }

    pub fn is_primitive(self) -> bool {
        matches!(
            self,
            Tag::Del | Tag::Store | Tag::Key | Tag::Label | Tag::Seq | Tag::Counter
        )
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The language of labels (or values) a lens can put into the enclosing node.
///
/// `optional` is set when some path through the lens leaves the label (value) unset.
#[derive(Debug, Clone)]
pub(crate) struct Slot {
    pub(crate) ty: Regexp,
    pub(crate) optional: bool,
}

impl Slot {
    fn required(ty: Regexp) -> Self {
        Self {
            ty,
            optional: false,
        }
    }

    fn into_optional(self) -> Self {
        Self {
            optional: true,
            ..self
        }
    }

    /// Whether `given` can fill this slot. An absent label or value is only acceptable when
    /// the slot is optional.
    pub(crate) fn admits(&self, given: Option<&str>) -> bool {
        match given {
            Some(text) => self.ty.matches(text),
            None => self.optional,
        }
    }

    fn merge(a: Option<&Slot>, b: Option<&Slot>) -> Option<Slot> {
        match (a, b) {
            (None, None) => None,
            (Some(s), None) | (None, Some(s)) => Some(s.clone().into_optional()),
            (Some(a), Some(b)) => Some(Slot {
                ty: a.ty.union(&b.ty),
                optional: a.optional || b.optional,
            }),
        }
    }
}

#[derive(Debug)]
pub(crate) enum LensKind {
    Del { regexp: Regexp, default: String },
    Store { regexp: Regexp },
    Key { regexp: Regexp },
    Label { name: String },
    Seq { name: String },
    Counter { name: String },
    /// `tails[i]` and `atails[i]` are the ctype and atype of `children[i + 1..]`, used to
    /// find split points in text and in lists of nodes.
    Concat {
        children: Vec<Lens>,
        tails: Vec<Regexp>,
        atails: Vec<Regexp>,
    },
    Union { children: Vec<Lens> },
    Subtree { child: Lens },
    Star { child: Lens },
    Maybe { child: Lens },
}

#[derive(Debug)]
pub(crate) struct LensNode {
    pub(crate) info: Info,
    pub(crate) ctype: Regexp,
    pub(crate) atype: Regexp,
    pub(crate) key: Option<Slot>,
    pub(crate) value: Option<Slot>,
    pub(crate) kind: LensKind,
}

/// Shared handle to an immutable lens node.
#[derive(Clone)]
pub struct Lens(Arc<LensNode>);

impl Lens {
    fn build(info: Info, ctype: Regexp, atype: Regexp, kind: LensKind) -> Lens {
        Lens::build_with_slots(info, ctype, atype, None, None, kind)
    }

    fn build_with_slots(
        info: Info,
        ctype: Regexp,
        atype: Regexp,
        key: Option<Slot>,
        value: Option<Slot>,
        kind: LensKind,
    ) -> Lens {
        Lens(Arc::new(LensNode {
            info,
            ctype,
            atype,
            key,
            value,
            kind,
        }))
    }

    pub(crate) fn node(&self) -> &LensNode {
        &self.0
    }

    pub(crate) fn kind(&self) -> &LensKind {
        &self.0.kind
    }

    /// Build any of the six primitives. `del` needs both a regexp and a default string,
    /// `store` and `key` a regexp, `label`, `seq` and `counter` a string.
    pub fn make_prim(
        tag: Tag,
        info: Info,
        regexp: Option<Regexp>,
        string: Option<String>,
    ) -> LensResult<Lens> {
        let missing = |what| LensError::MissingPayload {
            info: info.clone(),
            tag: tag.name(),
            what,
        };
        let nonempty = |regexp: Regexp| {
            if regexp.is_empty() {
                Err(LensError::EmptyLanguage {
                    info: info.clone(),
                    tag: tag.name(),
                    regexp: regexp.to_string(),
                })
            } else {
                Ok(regexp)
            }
        };
        let eps = Regexp::epsilon();
        let lens = match tag {
            Tag::Del => {
                let regexp = nonempty(regexp.ok_or_else(|| missing("regexp"))?)?;
                let default = string.ok_or_else(|| missing("default string"))?;
                if !regexp.matches(&default) {
                    return Err(LensError::DefaultMismatch {
                        info,
                        regexp: regexp.to_string(),
                        default,
                    });
                }
                Lens::build(info, regexp.clone(), eps, LensKind::Del { regexp, default })
            }
            Tag::Store => {
                let regexp = nonempty(regexp.ok_or_else(|| missing("regexp"))?)?;
                Lens::build_with_slots(
                    info,
                    regexp.clone(),
                    eps,
                    None,
                    Some(Slot::required(regexp.clone())),
                    LensKind::Store { regexp },
                )
            }
            Tag::Key => {
                let regexp = nonempty(regexp.ok_or_else(|| missing("regexp"))?)?;
                Lens::build_with_slots(
                    info,
                    regexp.clone(),
                    eps,
                    Some(Slot::required(regexp.clone())),
                    None,
                    LensKind::Key { regexp },
                )
            }
            Tag::Label => {
                let name = string.ok_or_else(|| missing("label"))?;
                Lens::build_with_slots(
                    info,
                    eps.clone(),
                    eps,
                    Some(Slot::required(Regexp::literal(&name))),
                    None,
                    LensKind::Label { name },
                )
            }
            Tag::Seq => {
                let name = string.ok_or_else(|| missing("counter name"))?;
                Lens::build_with_slots(
                    info,
                    eps.clone(),
                    eps,
                    Some(Slot::required(SEQ_LABELS.clone())),
                    None,
                    LensKind::Seq { name },
                )
            }
            Tag::Counter => {
                let name = string.ok_or_else(|| missing("counter name"))?;
                Lens::build(info, eps.clone(), eps, LensKind::Counter { name })
            }
            Tag::Concat | Tag::Union | Tag::Subtree | Tag::Star | Tag::Maybe => {
                return Err(missing("child lens, it is not a primitive"));
            }
        };
        Ok(lens)
    }

    fn compile(info: &Info, pattern: &str) -> LensResult<Regexp> {
        Regexp::new(pattern).map_err(|source| LensError::Regexp {
            info: info.clone(),
            source,
        })
    }

    pub fn del(info: Info, pattern: &str, default: impl Into<String>) -> LensResult<Lens> {
        let regexp = Lens::compile(&info, pattern)?;
        Lens::make_prim(Tag::Del, info, Some(regexp), Some(default.into()))
    }

    pub fn store(info: Info, pattern: &str) -> LensResult<Lens> {
        let regexp = Lens::compile(&info, pattern)?;
        Lens::make_prim(Tag::Store, info, Some(regexp), None)
    }

    pub fn key(info: Info, pattern: &str) -> LensResult<Lens> {
        let regexp = Lens::compile(&info, pattern)?;
        Lens::make_prim(Tag::Key, info, Some(regexp), None)
    }

    pub fn label(info: Info, name: impl Into<String>) -> LensResult<Lens> {
        Lens::make_prim(Tag::Label, info, None, Some(name.into()))
    }

    pub fn seq(info: Info, name: impl Into<String>) -> LensResult<Lens> {
        Lens::make_prim(Tag::Seq, info, None, Some(name.into()))
    }

    pub fn counter(info: Info, name: impl Into<String>) -> LensResult<Lens> {
        Lens::make_prim(Tag::Counter, info, None, Some(name.into()))
    }

    /// `l | r`. With `check`, the two alternatives must not match a common string.
    pub fn make_union(info: Info, l: Lens, r: Lens, check: bool) -> LensResult<Lens> {
        if check {
            typecheck::union(&info, &l, &r)?;
        }
        let ctype = l.0.ctype.union(&r.0.ctype);
        let atype = l.0.atype.union(&r.0.atype);
        let key = Slot::merge(l.0.key.as_ref(), r.0.key.as_ref());
        let value = Slot::merge(l.0.value.as_ref(), r.0.value.as_ref());
        let mut children = l.flatten(Tag::Union);
        children.extend(r.flatten(Tag::Union));
        Ok(Lens::build_with_slots(
            info,
            ctype,
            atype,
            key,
            value,
            LensKind::Union { children },
        ))
    }

    /// `l . r`. With `check`, every string of the concatenation must split in only one way.
    pub fn make_concat(info: Info, l: Lens, r: Lens, check: bool) -> LensResult<Lens> {
        typecheck::concat_slots(&info, &l, &r)?;
        if check {
            typecheck::concat(&info, &l, &r)?;
        }
        let ctype = l.0.ctype.concat(&r.0.ctype);
        let atype = l.0.atype.concat(&r.0.atype);
        let key = l.0.key.clone().or_else(|| r.0.key.clone());
        let value = l.0.value.clone().or_else(|| r.0.value.clone());
        let mut children = l.flatten(Tag::Concat);
        children.extend(r.flatten(Tag::Concat));
        let tails = concat_tails(&children, |l| &l.0.ctype);
        let atails = concat_tails(&children, |l| &l.0.atype);
        Ok(Lens::build_with_slots(
            info,
            ctype,
            atype,
            key,
            value,
            LensKind::Concat {
                children,
                tails,
                atails,
            },
        ))
    }

    /// `[ child ]`: everything `child` produces goes into one new tree node.
    pub fn make_subtree(info: Info, child: Lens) -> LensResult<Lens> {
        let label = match &child.0.key {
            Some(slot) if slot.optional => slot.ty.union(&Regexp::epsilon()),
            Some(slot) => slot.ty.clone(),
            None => Regexp::epsilon(),
        };
        let atype = label.concat(&Regexp::label_sep());
        Ok(Lens::build(
            info,
            child.0.ctype.clone(),
            atype,
            LensKind::Subtree { child },
        ))
    }

    /// `child*`. With `check`, `child` must not match the empty string and iterations
    /// must split unambiguously.
    pub fn make_star(info: Info, child: Lens, check: bool) -> LensResult<Lens> {
        typecheck::iter_slots(&info, &child)?;
        if check {
            typecheck::iter(&info, &child)?;
        }
        let ctype = child.0.ctype.star();
        let atype = child.0.atype.star();
        Ok(Lens::build(info, ctype, atype, LensKind::Star { child }))
    }

    /// `child+`, written as `child . child*`.
    pub fn make_plus(info: Info, child: Lens, check: bool) -> LensResult<Lens> {
        let star = Lens::make_star(info.clone(), child.clone(), check)?;
        Lens::make_concat(info, child, star, check)
    }

    /// `child?`. With `check`, `child` must not match the empty string.
    pub fn make_maybe(info: Info, child: Lens, check: bool) -> LensResult<Lens> {
        if check {
            typecheck::maybe(&info, &child)?;
        }
        let ctype = child.0.ctype.maybe();
        let atype = child.0.atype.maybe();
        let key = child.0.key.clone().map(Slot::into_optional);
        let value = child.0.value.clone().map(Slot::into_optional);
        Ok(Lens::build_with_slots(
            info,
            ctype,
            atype,
            key,
            value,
            LensKind::Maybe { child },
        ))
    }

    fn flatten(self, tag: Tag) -> Vec<Lens> {
        match (&self.0.kind, tag) {
            (LensKind::Concat { children, .. }, Tag::Concat)
            | (LensKind::Union { children }, Tag::Union) => children.clone(),
            _ => vec![self],
        }
    }

    pub fn tag(&self) -> Tag {
        match &self.0.kind {
            LensKind::Del { .. } => Tag::Del,
            LensKind::Store { .. } => Tag::Store,
            LensKind::Key { .. } => Tag::Key,
            LensKind::Label { .. } => Tag::Label,
            LensKind::Seq { .. } => Tag::Seq,
            LensKind::Counter { .. } => Tag::Counter,
            LensKind::Concat { .. } => Tag::Concat,
            LensKind::Union { .. } => Tag::Union,
            LensKind::Subtree { .. } => Tag::Subtree,
            LensKind::Star { .. } => Tag::Star,
            LensKind::Maybe { .. } => Tag::Maybe,
        }
    }

    pub fn info(&self) -> &Info {
        &self.0.info
    }

    /// The language of text this lens accepts.
    pub fn ctype(&self) -> &Regexp {
        &self.0.ctype
    }

    /// The language of node sequences this lens produces.
    pub fn atype(&self) -> &Regexp {
        &self.0.atype
    }

    pub fn key_type(&self) -> Option<&Regexp> {
        self.0.key.as_ref().map(|s| &s.ty)
    }

    pub fn value_type(&self) -> Option<&Regexp> {
        self.0.value.as_ref().map(|s| &s.ty)
    }

    /// The primitive's regexp (`del`, `store`, `key`).
    pub fn regexp(&self) -> Option<&Regexp> {
        match &self.0.kind {
            LensKind::Del { regexp, .. }
            | LensKind::Store { regexp }
            | LensKind::Key { regexp } => Some(regexp),
            _ => None,
        }
    }

    /// The primitive's string: the `del` default, or the label/counter name.
    pub fn string(&self) -> Option<&str> {
        match &self.0.kind {
            LensKind::Del { default, .. } => Some(default),
            LensKind::Label { name } | LensKind::Seq { name } | LensKind::Counter { name } => {
                Some(name)
            }
            _ => None,
        }
    }

    pub fn children(&self) -> &[Lens] {
        match &self.0.kind {
            LensKind::Concat { children, .. } | LensKind::Union { children } => children,
            LensKind::Subtree { child } | LensKind::Star { child } | LensKind::Maybe { child } => {
                std::slice::from_ref(child)
            }
            _ => &[],
        }
    }

    pub fn ptr_eq(&self, other: &Lens) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Number of live handles to this node.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }
}

fn concat_tails(children: &[Lens], ty: impl Fn(&Lens) -> &Regexp) -> Vec<Regexp> {
    let mut tails = vec![Regexp::epsilon(); children.len()];
    let mut acc = Regexp::epsilon();
    for i in (0..children.len()).rev() {
        tails[i] = acc.clone();
        acc = ty(&children[i]).concat(&acc);
    }
    tails
}

impl fmt::Display for Lens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |f: &mut fmt::Formatter<'_>, children: &[Lens], sep: &str| {
            write!(f, "(")?;
            for (i, c) in children.iter().enumerate() {
                if i > 0 {
                    write!(f, "{sep}")?;
                }
                write!(f, "{c}")?;
            }
            write!(f, ")")
        };
        match &self.0.kind {
            LensKind::Del { regexp, default } => write!(f, "del {regexp} {default:?}"),
            LensKind::Store { regexp } => write!(f, "store {regexp}"),
            LensKind::Key { regexp } => write!(f, "key {regexp}"),
            LensKind::Label { name } => write!(f, "label {name:?}"),
            LensKind::Seq { name } => write!(f, "seq {name:?}"),
            LensKind::Counter { name } => write!(f, "counter {name:?}"),
            LensKind::Concat { children, .. } => join(f, children, " . "),
            LensKind::Union { children } => join(f, children, " | "),
            LensKind::Subtree { child } => write!(f, "[ {child} ]"),
            LensKind::Star { child } => write!(f, "({child})*"),
            LensKind::Maybe { child } => write!(f, "({child})?"),
        }
    }
}

impl fmt::Debug for Lens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lens")
            .field("tag", &self.tag())
            .field("info", &self.0.info)
            .field("ctype", &self.0.ctype.pattern())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at() -> Info {
        Info::unknown()
    }

    #[test]
    fn primitives_carry_their_types() {
        let store = Lens::store(at(), "[0-9]+").unwrap();
        assert_eq!(store.tag(), Tag::Store);
        assert!(store.ctype().matches("42"));
        assert!(store.atype().matches_empty());
        assert!(store.value_type().is_some());
        assert!(store.key_type().is_none());

        let label = Lens::label(at(), "entry").unwrap();
        assert!(label.ctype().matches(""));
        assert!(label.key_type().unwrap().matches("entry"));
        assert_eq!(label.string(), Some("entry"));
    }

    #[test]
    fn make_prim_requires_payload() {
        let err = Lens::make_prim(Tag::Del, at(), Regexp::new("a").ok(), None).unwrap_err();
        assert!(matches!(err, LensError::MissingPayload { .. }));
        let err = Lens::make_prim(Tag::Star, at(), None, None).unwrap_err();
        assert!(matches!(err, LensError::MissingPayload { .. }));
    }

    #[test]
    fn del_default_must_match() {
        let err = Lens::del(at(), "[ \t]+", "").unwrap_err();
        assert!(matches!(err, LensError::DefaultMismatch { .. }));
        assert!(Lens::del(at(), "[ \t]+", " ").is_ok());
    }

    #[test]
    fn bad_pattern_is_reported_with_location() {
        let err = Lens::key(Info::new("test.lns", 2, 7), "[a-z").unwrap_err();
        assert!(matches!(err, LensError::Regexp { .. }));
        assert!(err.to_string().starts_with("test.lns:2.7: "));
    }

    #[test]
    fn concat_and_union_flatten() {
        let a = Lens::del(at(), "a", "a").unwrap();
        let b = Lens::del(at(), "b", "b").unwrap();
        let c = Lens::del(at(), "c", "c").unwrap();
        let ab = Lens::make_concat(at(), a.clone(), b.clone(), true).unwrap();
        let abc = Lens::make_concat(at(), ab, c.clone(), true).unwrap();
        assert_eq!(abc.children().len(), 3);
        assert!(abc.ctype().matches("abc"));

        let either = Lens::make_union(at(), a, b, true).unwrap();
        let any = Lens::make_union(at(), either, c, true).unwrap();
        assert_eq!(any.tag(), Tag::Union);
        assert_eq!(any.children().len(), 3);
    }

    #[test]
    fn subtree_atype_is_one_labelled_node() {
        let key = Lens::key(at(), "[a-z]+").unwrap();
        let sub = Lens::make_subtree(at(), key).unwrap();
        assert!(sub.atype().matches_bytes(b"abc\xff"));
        assert!(!sub.atype().matches_bytes(b"abc"));
        assert!(sub.key_type().is_none());
    }

    #[test]
    fn sharing_is_reference_counted() {
        let del = Lens::del(at(), "x", "x").unwrap();
        assert_eq!(del.ref_count(), 1);
        let star = Lens::make_star(at(), del.clone(), true).unwrap();
        assert_eq!(del.ref_count(), 2);
        drop(star);
        assert_eq!(del.ref_count(), 1);
    }

    #[test]
    fn display_reads_like_a_grammar() {
        let key = Lens::key(at(), "[a-z]+").unwrap();
        let eq = Lens::del(at(), " = ", " = ").unwrap();
        let value = Lens::store(at(), "[0-9]+").unwrap();
        let line = Lens::make_concat(at(), key, eq, true).unwrap();
        let line = Lens::make_concat(at(), line, value, true).unwrap();
        let entry = Lens::make_subtree(at(), line).unwrap();
        assert_eq!(
            entry.to_string(),
            "[ (key /[a-z]+/ . del / = / \" = \" . store /[0-9]+/) ]"
        );
    }
}
