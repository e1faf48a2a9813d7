//! Regular types
//!
//!     Every lens carries regular languages describing what it accepts: the concrete type
//!     (raw text), the abstract type (sequences of tree labels), and the key and value types.
//!     [`Regexp`] is the opaque handle for such a language. It answers the questions the lens
//!     combinators ask at construction time (do two languages overlap, can a concatenation
//!     be split in more than one way, does a language contain the empty word) and the
//!     questions the engines ask at run time (is this slice in the language, where can a
//!     match starting here end).
//!
//!     Patterns use the `regex-syntax` dialect without anchors or look-around. Matching is
//!     always whole-slice: there is no implicit `.*` on either side.

mod ambig;
mod dfa;
mod nfa;

use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use regex_syntax::ParserBuilder;

use crate::error::RegexpError;
use dfa::Dfa;
use nfa::Builder;

/// Byte that separates labels in the string form of a list of tree nodes. It never occurs
/// in UTF-8, so no key or label language can contain it.
pub(crate) const LABEL_SEP: u8 = 0xFF;

/// A regular language with its pattern kept around for display.
#[derive(Clone)]
pub struct Regexp {
    pattern: Arc<str>,
    dfa: Arc<Dfa>,
    /// Built on the first backward scan, shared between clones.
    reversed: Arc<OnceCell<Dfa>>,
}

impl Regexp {
    /// Compile a pattern.
    pub fn new(pattern: &str) -> Result<Regexp, RegexpError> {
        let hir = ParserBuilder::new()
            .build()
            .parse(pattern)
            .map_err(|e| RegexpError::Syntax {
                pattern: pattern.to_string(),
                message: e.to_string(),
            })?;
        let mut builder = Builder::new();
        let frag = builder.hir(&hir).map_err(|e| match e {
            RegexpError::Unsupported(what) => RegexpError::Unsupported(format!(
                "{what} in /{pattern}/"
            )),
            other => other,
        })?;
        Ok(Regexp::from_builder(pattern, builder, frag))
    }

    /// The language containing exactly `text`.
    pub fn literal(text: &str) -> Regexp {
        let mut builder = Builder::new();
        let frag = builder.bytes(text.as_bytes());
        Regexp::from_builder(&regex_syntax::escape(text), builder, frag)
    }

    /// The language containing only the empty word.
    pub fn epsilon() -> Regexp {
        Regexp::literal("")
    }

    /// The single label separator used by abstract types.
    pub(crate) fn label_sep() -> Regexp {
        let mut builder = Builder::new();
        let frag = builder.bytes(&[LABEL_SEP]);
        Regexp::from_builder("/", builder, frag)
    }

    fn from_builder(pattern: &str, builder: Builder, frag: nfa::Frag) -> Regexp {
        let nfa = builder.finish(frag);
        Regexp {
            pattern: pattern.into(),
            dfa: Arc::new(Dfa::from_nfa(&nfa)),
            reversed: Arc::new(OnceCell::new()),
        }
    }

    fn compose(
        pattern: String,
        parts: &[&Regexp],
        f: impl FnOnce(&mut Builder, Vec<nfa::Frag>) -> nfa::Frag,
    ) -> Regexp {
        let mut builder = Builder::new();
        let frags = parts.iter().map(|r| builder.embed(&r.dfa)).collect();
        let frag = f(&mut builder, frags);
        Regexp::from_builder(&pattern, builder, frag)
    }

    pub fn concat(&self, other: &Regexp) -> Regexp {
        if self.is_epsilon() {
            return other.clone();
        }
        if other.is_epsilon() {
            return self.clone();
        }
        let pattern = format!("{}{}", group(&self.pattern), group(&other.pattern));
        Regexp::compose(pattern, &[self, other], |b, frags| b.concat(&frags))
    }

    pub fn union(&self, other: &Regexp) -> Regexp {
        let pattern = format!("(?:{}|{})", self.pattern, other.pattern);
        Regexp::compose(pattern, &[self, other], |b, frags| b.alternate(&frags))
    }

    pub fn star(&self) -> Regexp {
        let pattern = format!("{}*", group(&self.pattern));
        Regexp::compose(pattern, &[self], |b, frags| b.star(frags[0]))
    }

    pub fn maybe(&self) -> Regexp {
        let pattern = format!("{}?", group(&self.pattern));
        Regexp::compose(pattern, &[self], |b, frags| b.optional(frags[0]))
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Whole-string membership.
    pub fn matches(&self, text: &str) -> bool {
        self.dfa.accepts(text.as_bytes())
    }

    pub(crate) fn matches_bytes(&self, bytes: &[u8]) -> bool {
        self.dfa.accepts(bytes)
    }

    pub fn matches_empty(&self) -> bool {
        self.dfa.is_accepting(self.dfa.start())
    }

    pub fn is_empty(&self) -> bool {
        self.dfa.is_empty()
    }

    fn is_epsilon(&self) -> bool {
        self.matches_empty() && (0..=255u8).all(|b| self.dfa.next(self.dfa.start(), b) == dfa::DEAD)
    }

    /// A word in both languages, if there is one.
    pub fn overlap(&self, other: &Regexp) -> Option<String> {
        ambig::overlap(&self.dfa, &other.dfa).map(lossy)
    }

    /// A non-empty word that can be moved across the boundary of `self . other`, if any.
    pub fn ambiguous_concat(&self, other: &Regexp) -> Option<String> {
        ambig::ambiguous_concat(&self.dfa, &other.dfa).map(lossy)
    }

    /// Ambiguity of `self*`, checked as `self . self*`.
    pub fn ambiguous_iter(&self) -> Option<String> {
        self.ambiguous_concat(&self.star())
    }

    pub(crate) fn match_ends(&self, bytes: &[u8], from: usize, to: usize) -> Vec<usize> {
        self.dfa.match_ends(bytes, from, to)
    }

    /// Entry `p - from` tells whether `bytes[p..to]` is in the language, for every `p` in
    /// `from..=to`. One backward pass answers for all suffixes at once.
    pub(crate) fn match_starts(&self, bytes: &[u8], from: usize, to: usize) -> Vec<bool> {
        self.reversed
            .get_or_init(|| self.dfa.reversed())
            .match_starts(bytes, from, to)
    }

    pub(crate) fn viable_prefix(&self, bytes: &[u8]) -> usize {
        self.dfa.viable_prefix(bytes)
    }

    /// Number of states of the minimal automaton, dead state included.
    pub fn state_count(&self) -> usize {
        self.dfa.len()
    }
}

fn group(pattern: &str) -> String {
    let simple = pattern
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == ' ');
    if simple && pattern.chars().count() <= 1 {
        pattern.to_string()
    } else if pattern.starts_with("(?:") && pattern.ends_with(')') && balanced_group(pattern) {
        pattern.to_string()
    } else {
        format!("(?:{pattern})")
    }
}

/// Whether the leading `(?:` is closed by the final `)`.
fn balanced_group(pattern: &str) -> bool {
    let mut depth = 0i64;
    let mut escaped = false;
    let mut in_class = false;
    let last = pattern.len() - 1;
    for (i, c) in pattern.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '[' => in_class = true,
            ']' => in_class = false,
            '(' if !in_class => depth += 1,
            ')' if !in_class => {
                depth -= 1;
                if depth <= 0 && i != last {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

fn lossy(bytes: Vec<u8>) -> String {
    String::from_utf8_lossy(&bytes).into_owned()
}

impl fmt::Display for Regexp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/", self.pattern)
    }
}

impl fmt::Debug for Regexp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Regexp")
            .field("pattern", &self.pattern)
            .field("states", &self.dfa.len())
            .finish()
    }
}
