//! The three runtime operations
//!
//!     parse   text -> (skeleton, dictionary)
//!     get     text -> (tree, skeleton, dictionary)
//!     put     (tree, skeleton, dictionary, text) -> text
//!
//! together with two conveniences built from them: [`put_text`], which parses the old
//! text itself, and [`create`], which prints a tree with no old text at all.
//!
//! The round-trip laws these satisfy for every lens `l`:
//!
//!     get(l, t) = (tree, s, d)        =>  put(l, tree, s, d, t) = t
//!     put(l, tree', s, d, t) = t'     =>  get(l, t').tree = tree'
//!
//! Every call is independent: counters used by `seq` start over, and `put` rewinds the
//! dictionary before consuming it, so one `(skeleton, dictionary)` pair can serve any
//! number of puts.

mod parse;
mod put;
mod split;

use log::debug;

use crate::config::ParseFlags;
use crate::error::LnsResult;
use crate::lens::Lens;
use crate::skel::{Dict, Skel};
use crate::tree::{Node, Tree};
use parse::Parser;
use put::Putter;

/// Result of [`get`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parsed {
    pub tree: Tree,
    pub skel: Skel,
    pub dict: Dict,
}

/// Parse `text` without building a tree.
pub fn parse(lens: &Lens, text: &str) -> LnsResult<(Skel, Dict)> {
    let walked = Parser::new(text, ParseFlags::default(), false).run(lens)?;
    Ok((walked.skel, walked.dict))
}

/// Parse `text` into a tree. A lens that sets a label or value outside of any subtree
/// yields a single root node carrying them.
pub fn get(lens: &Lens, text: &str, flags: ParseFlags) -> LnsResult<Parsed> {
    let walked = Parser::new(text, flags, true).run(lens)?;
    let tree = if has_root(lens) {
        Tree::new(vec![Node {
            label: walked.key,
            value: walked.value,
            children: walked.nodes,
        }])
    } else {
        Tree::new(walked.nodes)
    };
    Ok(Parsed {
        tree,
        skel: walked.skel,
        dict: walked.dict,
    })
}

/// Print `tree`, reusing the formatting recorded in `skel` and `dict`.
///
/// `text` is the text `skel` and `dict` came from. It is only read when `skel` was not
/// produced by `lens`, in which case it is parsed again.
pub fn put(lens: &Lens, tree: &Tree, skel: &Skel, dict: &mut Dict, text: &str) -> LnsResult<String> {
    if !skel.instance_of(lens) {
        debug!("skeleton was produced by another lens, parsing the old text again");
        return put_text(lens, tree, text);
    }
    dict.reset();
    let mut putter = Putter::new();
    putter.put_tree(lens, tree, Some(skel), dict)?;
    Ok(putter.finish())
}

/// Print `tree` with the formatting of `text`.
pub fn put_text(lens: &Lens, tree: &Tree, text: &str) -> LnsResult<String> {
    let (skel, mut dict) = parse(lens, text)?;
    let mut putter = Putter::new();
    putter.put_tree(lens, tree, Some(&skel), &mut dict)?;
    Ok(putter.finish())
}

/// Print `tree` from scratch: every `del` emits its default text.
pub fn create(lens: &Lens, tree: &Tree) -> LnsResult<String> {
    let mut putter = Putter::new();
    putter.put_tree(lens, tree, None, &mut Dict::new())?;
    Ok(putter.finish())
}

fn has_root(lens: &Lens) -> bool {
    lens.key_type().is_some() || lens.value_type().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lens::Info;

    fn at() -> Info {
        Info::unknown()
    }

    /// `[ key /[a-z]+/ . del / = / " = " . store /[0-9]+/ . del /\n/ "\n" ]*`
    fn entries() -> Lens {
        let key = Lens::key(at(), "[a-z]+").unwrap();
        let eq = Lens::del(at(), "[ \t]*=[ \t]*", " = ").unwrap();
        let value = Lens::store(at(), "[0-9]+").unwrap();
        let eol = Lens::del(at(), "\n", "\n").unwrap();
        let line = [eq, value, eol]
            .into_iter()
            .try_fold(key, |acc, l| Lens::make_concat(at(), acc, l, true))
            .unwrap();
        let entry = Lens::make_subtree(at(), line).unwrap();
        Lens::make_star(at(), entry, true).unwrap()
    }

    #[test]
    fn get_then_put_is_identity() {
        let lens = entries();
        let text = "a = 1\nbee=22\nc  =  3\n";
        let mut parsed = get(&lens, text, ParseFlags::default()).unwrap();
        assert_eq!(parsed.tree.children.len(), 3);
        assert_eq!(parsed.tree.children[1].label(), Some("bee"));
        assert_eq!(parsed.tree.children[1].value(), Some("22"));
        let out = put(&lens, &parsed.tree, &parsed.skel, &mut parsed.dict, text).unwrap();
        assert_eq!(out, text);
        // the dictionary rewinds, so a second put works the same
        let again = put(&lens, &parsed.tree, &parsed.skel, &mut parsed.dict, text).unwrap();
        assert_eq!(again, text);
    }

    #[test]
    fn parse_agrees_with_get() {
        let lens = entries();
        let text = "x = 1\n";
        let (skel, dict) = parse(&lens, text).unwrap();
        let parsed = get(&lens, text, ParseFlags::all()).unwrap();
        assert_eq!(skel, parsed.skel);
        assert_eq!(dict, parsed.dict);
    }

    #[test]
    fn errors_carry_positions() {
        let lens = entries();
        let err = get(&lens, "a = 1\nb = x\n", ParseFlags::default()).unwrap_err();
        assert_eq!(err.pos(), Some(10));
        assert_eq!(err.message(), "Get did not match entire input");

        let err = get(&lens, "1 = a\n", ParseFlags::default()).unwrap_err();
        assert_eq!(err.pos(), Some(0));
        assert_eq!(err.message(), "Syntax error");
    }

    #[test]
    fn new_nodes_use_defaults() {
        let lens = entries();
        let tree = Tree::new(vec![Node::new("k").with_value("7")]);
        assert_eq!(create(&lens, &tree).unwrap(), "k = 7\n");
        assert_eq!(put_text(&lens, &tree, "k=1\n").unwrap(), "k=7\n");
    }

    #[test]
    fn put_rejects_values_the_lens_cannot_print() {
        let lens = entries();
        let tree = Tree::new(vec![Node::new("k").with_value("seven")]);
        let err = create(&lens, &tree).unwrap_err();
        assert_eq!(err.path(), Some("/k"));
        assert!(err.message().contains("does not match"), "{}", err.message());

        let tree = Tree::new(vec![Node::new("k")]);
        assert!(create(&lens, &tree).is_err());
    }

    #[test]
    fn foreign_skeleton_falls_back_to_text() {
        let lens = entries();
        let other = Lens::del(at(), "[a-z]+", "a").unwrap();
        let (skel, mut dict) = parse(&other, "abc").unwrap();
        let tree = Tree::new(vec![Node::new("x").with_value("2")]);
        let out = put(&lens, &tree, &skel, &mut dict, "x  =  1\n").unwrap();
        assert_eq!(out, "x  =  2\n");
    }
}
