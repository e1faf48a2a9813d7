//! Language-level queries that need more than one automaton: overlap and ambiguity.
//!
//! A concatenation `A . B` is ambiguous when some word splits in two different ways. That
//! happens exactly when there is a non-empty `y` with `x` and `xy` in `A` and `z` and `yz`
//! in `B`. The `y` candidates on the left are the words leading from an accepting state of
//! `A` to another accepting state; on the right they are the words leading from the start
//! of `B` into a state whose language meets `B` itself. Both searches return the shortest
//! witness so error messages can show it.

use std::collections::{HashMap, HashSet, VecDeque};

use super::dfa::{Dfa, StateId, DEAD};

/// Shortest word accepted by both automata.
pub(crate) fn overlap(a: &Dfa, b: &Dfa) -> Option<Vec<u8>> {
    let start = (a.start(), b.start());
    if start.0 == DEAD || start.1 == DEAD {
        return None;
    }
    let mut parents: HashMap<(StateId, StateId), Option<((StateId, StateId), u8)>> =
        HashMap::new();
    parents.insert(start, None);
    let mut queue = VecDeque::from([start]);
    while let Some(pair) = queue.pop_front() {
        if a.is_accepting(pair.0) && b.is_accepting(pair.1) {
            return Some(walk_back(&parents, pair));
        }
        for byte in 0..=255u8 {
            let next = (a.next(pair.0, byte), b.next(pair.1, byte));
            if next.0 == DEAD || next.1 == DEAD || parents.contains_key(&next) {
                continue;
            }
            parents.insert(next, Some((pair, byte)));
            queue.push_back(next);
        }
    }
    None
}

/// States `p` of `b` from which some word `z` leads to acceptance while `z` itself is in `b`.
fn meets_own_language(b: &Dfa) -> Vec<bool> {
    let mut sources: HashMap<(StateId, u8), Vec<StateId>> = HashMap::new();
    let mut incoming: Vec<Vec<(u8, StateId)>> = vec![Vec::new(); b.len()];
    for s in 0..b.len() as StateId {
        if s == DEAD {
            continue;
        }
        for byte in 0..=255u8 {
            let t = b.next(s, byte);
            if t != DEAD {
                sources.entry((t, byte)).or_default().push(s);
                incoming[t as usize].push((byte, s));
            }
        }
    }

    let mut reached: HashSet<(StateId, StateId)> = HashSet::new();
    let mut queue = VecDeque::new();
    for x in b.accepting_states() {
        for y in b.accepting_states() {
            reached.insert((x, y));
            queue.push_back((x, y));
        }
    }
    while let Some((x, y)) = queue.pop_front() {
        for &(byte, px) in &incoming[x as usize] {
            let Some(pys) = sources.get(&(y, byte)) else {
                continue;
            };
            for &py in pys {
                if reached.insert((px, py)) {
                    queue.push_back((px, py));
                }
            }
        }
    }

    (0..b.len() as StateId)
        .map(|p| reached.contains(&(p, b.start())))
        .collect()
}

/// Shortest non-empty `y` witnessing an ambiguous split of `a . b`.
pub(crate) fn ambiguous_concat(a: &Dfa, b: &Dfa) -> Option<Vec<u8>> {
    if a.is_empty() || b.is_empty() {
        return None;
    }
    let good = meets_own_language(b);

    type Node = (Vec<StateId>, StateId, bool);
    let start: Node = (a.accepting_states().collect(), b.start(), false);
    let mut parents: HashMap<Node, Option<(Node, u8)>> = HashMap::new();
    parents.insert(start.clone(), None);
    let mut queue = VecDeque::from([start]);
    while let Some(node) = queue.pop_front() {
        let (set, q, nonempty) = &node;
        if *nonempty && set.iter().any(|&s| a.is_accepting(s)) && good[*q as usize] {
            return Some(walk_back(&parents, node.clone()));
        }
        for byte in 0..=255u8 {
            let nq = b.next(*q, byte);
            if nq == DEAD {
                continue;
            }
            let mut nset: Vec<StateId> = set
                .iter()
                .map(|&s| a.next(s, byte))
                .filter(|&s| s != DEAD)
                .collect();
            if nset.is_empty() {
                continue;
            }
            nset.sort_unstable();
            nset.dedup();
            let next: Node = (nset, nq, true);
            if parents.contains_key(&next) {
                continue;
            }
            parents.insert(next.clone(), Some((node.clone(), byte)));
            queue.push_back(next);
        }
    }
    None
}

fn walk_back<K: Clone + Eq + std::hash::Hash>(
    parents: &HashMap<K, Option<(K, u8)>>,
    mut at: K,
) -> Vec<u8> {
    let mut word = Vec::new();
    while let Some(Some((prev, byte))) = parents.get(&at) {
        word.push(*byte);
        at = prev.clone();
    }
    word.reverse();
    word
}

#[cfg(test)]
mod tests {
    use crate::fa::Regexp;

    fn re(p: &str) -> Regexp {
        Regexp::new(p).unwrap()
    }

    #[test]
    fn overlap_finds_shortest_common_word() {
        assert_eq!(re("[a-c]+").overlap(&re("b|bb")).as_deref(), Some("b"));
        assert_eq!(re("[a-c]+").overlap(&re("[0-9]+")), None);
    }

    #[test]
    fn concat_of_greedy_classes_is_ambiguous() {
        assert!(re("a*").ambiguous_concat(&re("a*")).is_some());
        assert!(re("[a-z]+").ambiguous_concat(&re("[a-z]*=")).is_some());
    }

    #[test]
    fn concat_with_separator_is_not_ambiguous() {
        assert_eq!(re("[a-z]+").ambiguous_concat(&re(" = ")), None);
        assert_eq!(re("[a-z]+ ").ambiguous_concat(&re("[0-9]+")), None);
    }

    #[test]
    fn iteration_ambiguity() {
        assert!(re("a|aa").ambiguous_iter().is_some());
        assert_eq!(re("[a-z]+\n").ambiguous_iter(), None);
    }
}
