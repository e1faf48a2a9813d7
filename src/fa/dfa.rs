//! Dense minimal DFAs over bytes
//!
//! State 0 is always the dead state: it rejects and loops on every byte. Because every DFA
//! is minimised right after subset construction, any state whose language is empty collapses
//! into it. That makes "can this prefix still be extended into a match" a single comparison
//! against [`DEAD`].

use std::collections::HashMap;

use super::nfa::{Builder, Nfa};

pub(crate) type StateId = u32;

pub(crate) const DEAD: StateId = 0;

#[derive(Debug, Clone)]
pub(crate) struct Dfa {
    table: Vec<StateId>,
    accept: Vec<bool>,
    start: StateId,
}

impl Dfa {
    pub(crate) fn from_nfa(nfa: &Nfa) -> Dfa {
        let mut seen = Vec::new();
        let mut sets: Vec<Vec<usize>> = vec![Vec::new()];
        let mut index: HashMap<Vec<usize>, StateId> = HashMap::new();
        index.insert(Vec::new(), DEAD);

        let start_set = nfa.closure(&[nfa.start], &mut seen);
        index.insert(start_set.clone(), 1);
        sets.push(start_set);

        let mut table: Vec<StateId> = vec![DEAD; 256];
        let mut accept = vec![false];
        let mut buckets: Vec<Vec<usize>> = vec![Vec::new(); 256];

        let mut current = 1;
        while current < sets.len() {
            for bucket in buckets.iter_mut() {
                bucket.clear();
            }
            for &s in &sets[current] {
                for &(lo, hi, to) in &nfa.states[s].ranges {
                    for b in lo..=hi {
                        buckets[b as usize].push(to);
                    }
                }
            }
            let mut row = [DEAD; 256];
            for (b, bucket) in buckets.iter().enumerate() {
                if bucket.is_empty() {
                    continue;
                }
                let target = nfa.closure(bucket, &mut seen);
                let next_id = sets.len() as StateId;
                let id = *index.entry(target.clone()).or_insert_with(|| {
                    sets.push(target);
                    next_id
                });
                row[b] = id;
            }
            table.extend_from_slice(&row);
            accept.push(sets[current].binary_search(&nfa.accept).is_ok());
            current += 1;
        }

        Dfa {
            table,
            accept,
            start: 1,
        }
        .minimize()
    }

    /// Moore partition refinement. The dead state keeps id 0 in the result.
    fn minimize(&self) -> Dfa {
        let n = self.len();
        let mut class: Vec<u32> = self.accept.iter().map(|&a| a as u32).collect();
        let mut count = if class.iter().any(|&c| c == 1) && class.iter().any(|&c| c == 0) {
            2
        } else {
            1
        };
        loop {
            let mut ids: HashMap<Vec<u32>, u32> = HashMap::new();
            let mut next_class = vec![0u32; n];
            for s in 0..n {
                let mut sig = Vec::with_capacity(257);
                sig.push(class[s]);
                sig.extend(self.row(s as StateId).iter().map(|&t| class[t as usize]));
                let fresh = ids.len() as u32;
                next_class[s] = *ids.entry(sig).or_insert(fresh);
            }
            let next_count = ids.len();
            class = next_class;
            if next_count == count {
                break;
            }
            count = next_count;
        }

        // Renumber so that the dead state's class becomes 0.
        let dead_class = class[DEAD as usize];
        let renumber = |c: u32| -> u32 {
            if c == dead_class {
                0
            } else if c < dead_class {
                c + 1
            } else {
                c
            }
        };
        let mut table = vec![DEAD; count * 256];
        let mut accept = vec![false; count];
        for s in 0..n {
            let c = renumber(class[s]) as usize;
            accept[c] = self.accept[s];
            for (b, &t) in self.row(s as StateId).iter().enumerate() {
                table[c * 256 + b] = renumber(class[t as usize]);
            }
        }
        Dfa {
            table,
            accept,
            start: renumber(class[self.start as usize]),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.accept.len()
    }

    pub(crate) fn start(&self) -> StateId {
        self.start
    }

    pub(crate) fn next(&self, s: StateId, b: u8) -> StateId {
        self.table[s as usize * 256 + b as usize]
    }

    fn row(&self, s: StateId) -> &[StateId] {
        &self.table[s as usize * 256..(s as usize + 1) * 256]
    }

    pub(crate) fn is_accepting(&self, s: StateId) -> bool {
        self.accept[s as usize]
    }

    pub(crate) fn run(&self, bytes: &[u8]) -> StateId {
        let mut s = self.start;
        for &b in bytes {
            s = self.next(s, b);
            if s == DEAD {
                break;
            }
        }
        s
    }

    pub(crate) fn accepts(&self, bytes: &[u8]) -> bool {
        self.is_accepting(self.run(bytes))
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.start == DEAD
    }

    pub(crate) fn accepting_states(&self) -> impl Iterator<Item = StateId> + '_ {
        (0..self.len() as StateId).filter(move |&s| self.is_accepting(s))
    }

    /// Ends `p` in `from..=to` such that `bytes[from..p]` is accepted, in increasing order.
    pub(crate) fn match_ends(&self, bytes: &[u8], from: usize, to: usize) -> Vec<usize> {
        let mut ends = Vec::new();
        let mut s = self.start;
        if self.is_accepting(s) {
            ends.push(from);
        }
        for (i, &b) in bytes[from..to].iter().enumerate() {
            s = self.next(s, b);
            if s == DEAD {
                break;
            }
            if self.is_accepting(s) {
                ends.push(from + i + 1);
            }
        }
        ends
    }

    /// The automaton of the reversed language.
    pub(crate) fn reversed(&self) -> Dfa {
        let mut builder = Builder::new();
        let frag = builder.embed_reversed(self);
        Dfa::from_nfa(&builder.finish(frag))
    }

    /// Run as the reversal of some language `L`, scanning `bytes[from..to]` from the back.
    /// Entry `p - from` of the result tells whether `bytes[p..to]` is in `L`, for every `p`
    /// in `from..=to`.
    pub(crate) fn match_starts(&self, bytes: &[u8], from: usize, to: usize) -> Vec<bool> {
        let mut starts = vec![false; to - from + 1];
        let mut s = self.start;
        starts[to - from] = self.is_accepting(s);
        for p in (from..to).rev() {
            s = self.next(s, bytes[p]);
            if s == DEAD {
                break;
            }
            starts[p - from] = self.is_accepting(s);
        }
        starts
    }

    /// Length of the longest prefix of `bytes` that is still a prefix of some accepted word.
    pub(crate) fn viable_prefix(&self, bytes: &[u8]) -> usize {
        if self.start == DEAD {
            return 0;
        }
        let mut s = self.start;
        for (i, &b) in bytes.iter().enumerate() {
            s = self.next(s, b);
            if s == DEAD {
                return i;
            }
        }
        bytes.len()
    }
}
