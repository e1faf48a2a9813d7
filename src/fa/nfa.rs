//! Thompson NFA over bytes
//!
//!     Patterns are parsed by `regex-syntax` into its high-level IR and compiled here into a
//!     byte-level NFA with epsilon moves. Unicode classes are expanded into UTF-8 byte
//!     sequences, so every automaton in the crate runs over raw bytes and never sees a char.
//!
//!     The NFA is also the composition format: concatenation, union and star of two regular
//!     types embed their (minimal) DFAs back into a fresh NFA and determinize the result.

use regex_syntax::hir::{Class, Hir, HirKind};
use regex_syntax::utf8::Utf8Sequences;

use super::dfa::{Dfa, DEAD};
use crate::error::RegexpError;

pub(crate) type NfaState = usize;

#[derive(Debug, Clone, Default)]
pub(crate) struct State {
    pub(crate) eps: Vec<NfaState>,
    pub(crate) ranges: Vec<(u8, u8, NfaState)>,
}

/// A fragment under construction: one entry state and one exit state.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Frag {
    start: NfaState,
    end: NfaState,
}

#[derive(Debug, Clone)]
pub(crate) struct Nfa {
    pub(crate) states: Vec<State>,
    pub(crate) start: NfaState,
    pub(crate) accept: NfaState,
}

#[derive(Debug, Default)]
pub(crate) struct Builder {
    states: Vec<State>,
}

impl Builder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn add(&mut self) -> NfaState {
        self.states.push(State::default());
        self.states.len() - 1
    }

    fn eps(&mut self, from: NfaState, to: NfaState) {
        self.states[from].eps.push(to);
    }

    fn range(&mut self, from: NfaState, lo: u8, hi: u8, to: NfaState) {
        self.states[from].ranges.push((lo, hi, to));
    }

    pub(crate) fn finish(self, frag: Frag) -> Nfa {
        Nfa {
            states: self.states,
            start: frag.start,
            accept: frag.end,
        }
    }

    pub(crate) fn epsilon(&mut self) -> Frag {
        let s = self.add();
        Frag { start: s, end: s }
    }

    pub(crate) fn bytes(&mut self, bytes: &[u8]) -> Frag {
        let start = self.add();
        let mut cur = start;
        for &b in bytes {
            let next = self.add();
            self.range(cur, b, b, next);
            cur = next;
        }
        Frag { start, end: cur }
    }

    pub(crate) fn byte_ranges(&mut self, ranges: &[(u8, u8)]) -> Frag {
        let start = self.add();
        let end = self.add();
        for &(lo, hi) in ranges {
            self.range(start, lo, hi, end);
        }
        Frag { start, end }
    }

    fn char_ranges(&mut self, ranges: impl Iterator<Item = (char, char)>) -> Frag {
        let start = self.add();
        let end = self.add();
        for (lo, hi) in ranges {
            for seq in Utf8Sequences::new(lo, hi) {
                let slice = seq.as_slice();
                let mut cur = start;
                for (i, r) in slice.iter().enumerate() {
                    let next = if i + 1 == slice.len() { end } else { self.add() };
                    self.range(cur, r.start, r.end, next);
                    cur = next;
                }
            }
        }
        Frag { start, end }
    }

    pub(crate) fn concat(&mut self, frags: &[Frag]) -> Frag {
        match frags.split_first() {
            None => self.epsilon(),
            Some((first, rest)) => {
                let mut end = first.end;
                for f in rest {
                    self.eps(end, f.start);
                    end = f.end;
                }
                Frag {
                    start: first.start,
                    end,
                }
            }
        }
    }

    pub(crate) fn alternate(&mut self, frags: &[Frag]) -> Frag {
        let start = self.add();
        let end = self.add();
        for f in frags {
            self.eps(start, f.start);
            self.eps(f.end, end);
        }
        Frag { start, end }
    }

    pub(crate) fn star(&mut self, sub: Frag) -> Frag {
        let start = self.add();
        let end = self.add();
        self.eps(start, sub.start);
        self.eps(start, end);
        self.eps(sub.end, sub.start);
        self.eps(sub.end, end);
        Frag { start, end }
    }

    pub(crate) fn optional(&mut self, sub: Frag) -> Frag {
        let start = self.add();
        let end = self.add();
        self.eps(start, sub.start);
        self.eps(start, end);
        self.eps(sub.end, end);
        Frag { start, end }
    }

    /// Copy the states of a DFA into this builder. The dead state is dropped.
    pub(crate) fn embed(&mut self, dfa: &Dfa) -> Frag {
        let base = self.states.len();
        let offset = |s: u32| base + s as usize;
        for _ in 0..dfa.len() {
            self.add();
        }
        let end = self.add();
        for s in 0..dfa.len() as u32 {
            if s == DEAD {
                continue;
            }
            let mut b = 0usize;
            while b < 256 {
                let target = dfa.next(s, b as u8);
                let lo = b;
                while b + 1 < 256 && dfa.next(s, (b + 1) as u8) == target {
                    b += 1;
                }
                if target != DEAD {
                    self.range(offset(s), lo as u8, b as u8, offset(target));
                }
                b += 1;
            }
            if dfa.is_accepting(s) {
                self.eps(offset(s), end);
            }
        }
        Frag {
            start: offset(dfa.start()),
            end,
        }
    }

    /// Copy a DFA with every transition turned around, so the fragment accepts the reversal
    /// of its language.
    pub(crate) fn embed_reversed(&mut self, dfa: &Dfa) -> Frag {
        let base = self.states.len();
        let offset = |s: u32| base + s as usize;
        for _ in 0..dfa.len() {
            self.add();
        }
        let start = self.add();
        let end = self.add();
        for s in 0..dfa.len() as u32 {
            if s == DEAD {
                continue;
            }
            let mut b = 0usize;
            while b < 256 {
                let target = dfa.next(s, b as u8);
                let lo = b;
                while b + 1 < 256 && dfa.next(s, (b + 1) as u8) == target {
                    b += 1;
                }
                if target != DEAD {
                    self.range(offset(target), lo as u8, b as u8, offset(s));
                }
                b += 1;
            }
            if dfa.is_accepting(s) {
                self.eps(start, offset(s));
            }
        }
        if dfa.start() != DEAD {
            self.eps(offset(dfa.start()), end);
        }
        Frag { start, end }
    }

    pub(crate) fn hir(&mut self, hir: &Hir) -> Result<Frag, RegexpError> {
        Ok(match hir.kind() {
            HirKind::Empty => self.epsilon(),
            HirKind::Literal(lit) => self.bytes(&lit.0),
            HirKind::Class(Class::Bytes(cls)) => {
                let ranges: Vec<(u8, u8)> =
                    cls.ranges().iter().map(|r| (r.start(), r.end())).collect();
                self.byte_ranges(&ranges)
            }
            HirKind::Class(Class::Unicode(cls)) => {
                self.char_ranges(cls.ranges().iter().map(|r| (r.start(), r.end())))
            }
            HirKind::Look(look) => {
                return Err(RegexpError::Unsupported(format!("{look:?}")));
            }
            HirKind::Capture(cap) => self.hir(&cap.sub)?,
            HirKind::Concat(subs) => {
                let frags = subs
                    .iter()
                    .map(|h| self.hir(h))
                    .collect::<Result<Vec<_>, _>>()?;
                self.concat(&frags)
            }
            HirKind::Alternation(subs) => {
                let frags = subs
                    .iter()
                    .map(|h| self.hir(h))
                    .collect::<Result<Vec<_>, _>>()?;
                self.alternate(&frags)
            }
            HirKind::Repetition(rep) => {
                let mut frags = Vec::new();
                for _ in 0..rep.min {
                    frags.push(self.hir(&rep.sub)?);
                }
                match rep.max {
                    None => {
                        let sub = self.hir(&rep.sub)?;
                        frags.push(self.star(sub));
                    }
                    Some(max) => {
                        for _ in rep.min..max {
                            let sub = self.hir(&rep.sub)?;
                            frags.push(self.optional(sub));
                        }
                    }
                }
                self.concat(&frags)
            }
        })
    }
}

impl Nfa {
    /// Epsilon closure of `seeds`, returned sorted.
    pub(crate) fn closure(&self, seeds: &[NfaState], seen: &mut Vec<bool>) -> Vec<NfaState> {
        seen.clear();
        seen.resize(self.states.len(), false);
        let mut stack: Vec<NfaState> = seeds.to_vec();
        let mut out = Vec::new();
        while let Some(s) = stack.pop() {
            if seen[s] {
                continue;
            }
            seen[s] = true;
            out.push(s);
            stack.extend(self.states[s].eps.iter().copied().filter(|&t| !seen[t]));
        }
        out.sort_unstable();
        out
    }
}
