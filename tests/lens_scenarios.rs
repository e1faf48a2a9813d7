//! End-to-end behavior of get and put on small hand-built lenses and on `keyvalue`

use bilens::library::keyvalue;
use bilens::testing::assert_tree;
use bilens::{create, get, put, put_text, Info, Lens, LnsError, Node, ParseFlags, Tree};
use rstest::rstest;

fn at() -> Info {
    Info::unknown()
}

fn seq_of(lenses: Vec<Lens>) -> Lens {
    let mut lenses = lenses.into_iter();
    let first = lenses.next().unwrap();
    lenses
        .try_fold(first, |acc, l| Lens::make_concat(at(), acc, l, true))
        .unwrap()
}

/// `key /[a-z]+/ . del / = / " = " . store /[0-9]+/`
fn assignment() -> Lens {
    seq_of(vec![
        Lens::key(at(), "[a-z]+").unwrap(),
        Lens::del(at(), " = ", " = ").unwrap(),
        Lens::store(at(), "[0-9]+").unwrap(),
    ])
}

/// `[ key /[a-z]+/ . del /[ \t]*=[ \t]*/ " = " . store /[0-9]+/ . del /\n/ "\n" ]*`
fn assignments() -> Lens {
    let line = seq_of(vec![
        Lens::key(at(), "[a-z]+").unwrap(),
        Lens::del(at(), "[ \t]*=[ \t]*", " = ").unwrap(),
        Lens::store(at(), "[0-9]+").unwrap(),
        Lens::del(at(), "\n", "\n").unwrap(),
    ]);
    Lens::make_star(at(), Lens::make_subtree(at(), line).unwrap(), true).unwrap()
}

/// `[ key /[a-z]+/ . del /\n/ "\n" ]*`
fn words() -> Lens {
    let line = seq_of(vec![
        Lens::key(at(), "[a-z]+").unwrap(),
        Lens::del(at(), "\n", "\n").unwrap(),
    ]);
    Lens::make_star(at(), Lens::make_subtree(at(), line).unwrap(), true).unwrap()
}

fn round_trip(lens: &Lens, text: &str, edit: impl FnOnce(&mut Tree)) -> String {
    let mut parsed = get(lens, text, ParseFlags::default()).unwrap();
    edit(&mut parsed.tree);
    put(lens, &parsed.tree, &parsed.skel, &mut parsed.dict, text).unwrap()
}

#[test]
fn top_level_key_and_value_make_a_root_node() {
    let lens = assignment();
    let parsed = get(&lens, "x = 1", ParseFlags::default()).unwrap();
    assert_tree(&parsed.tree).node_count(1).node(0, |n| {
        n.label("x").value("1").child_count(0);
    });

    assert_eq!(round_trip(&lens, "x = 1", |_| {}), "x = 1");
    let edited = round_trip(&lens, "x = 1", |tree| {
        tree.children[0].value = Some("2".into());
    });
    assert_eq!(edited, "x = 2");
}

#[test]
fn deleting_a_node_deletes_its_line() {
    let lens = words();
    let out = round_trip(&lens, "a\nb\n", |tree| {
        tree.remove("/a").unwrap();
    });
    assert_eq!(out, "b\n");
}

#[rstest]
#[case::comment_after_the_rest("a=1\nb=2\n# end\n", &["/a"], "b=2\n# end\n")]
#[case::comment_after_the_only_entry("a=1\n# keep me\n", &["/a"], "# keep me\n")]
#[case::last_entry_before_trailing_comment("a=1\nb=2\n# end\n", &["/b"], "a=1\n# end\n")]
#[case::every_entry("# head\na=1\n\nb=2\n# tail\n", &["/a", "/b"], "# head\n\n# tail\n")]
fn deleting_nodes_keeps_comments_and_blank_lines(
    #[case] text: &str,
    #[case] paths: &[&str],
    #[case] expected: &str,
) {
    let lens = keyvalue().unwrap();
    let out = round_trip(&lens, text, |tree| {
        for path in paths {
            assert_eq!(tree.remove(path).unwrap(), 1);
        }
    });
    assert_eq!(out, expected);
}

#[test]
fn reordered_nodes_keep_their_own_formatting() {
    let lens = assignments();
    let out = round_trip(&lens, "a = 1\nb=2\n", |tree| tree.children.swap(0, 1));
    assert_eq!(out, "b=2\na = 1\n");
}

#[test]
fn reordered_same_key_nodes_swap_lines() {
    let lens = assignments();
    let out = round_trip(&lens, "a = 1\na = 2\n", |tree| tree.children.swap(0, 1));
    assert_eq!(out, "a = 2\na = 1\n");
}

#[test]
fn same_key_nodes_take_formatting_in_order() {
    // formatting of same-key siblings stays with the position, not the node
    let lens = assignments();
    let out = round_trip(&lens, "a = 1\na=2\n", |tree| tree.children.swap(0, 1));
    assert_eq!(out, "a = 2\na=1\n");
}

#[test]
fn extra_same_key_nodes_use_defaults() {
    let lens = assignments();
    let out = round_trip(&lens, "a = 1\nb=2\na  =  3\n", |tree| {
        tree.children.push(Node::new("a").with_value("4"));
    });
    assert_eq!(out, "a = 1\nb=2\na  =  3\na = 4\n");
}

#[test]
fn dictionary_hands_out_entries_first_in_first_out() {
    let lens = assignments();
    let mut parsed = get(&lens, "a = 1\nb=2\na  =  3\n", ParseFlags::default()).unwrap();
    let dict = &mut parsed.dict;
    assert_eq!(dict.entries(Some("a")).len(), 2);
    assert_eq!(dict.entries(Some("b")).len(), 1);

    let first = dict.lookup(Some("a")).map(|e| e.skel.text());
    let second = dict.lookup(Some("a")).map(|e| e.skel.text());
    assert_eq!(first.as_deref(), Some(" = \n"));
    assert_eq!(second.as_deref(), Some("  =  \n"));
    assert!(dict.lookup(Some("a")).is_none());

    dict.reset();
    assert_eq!(
        dict.lookup(Some("a")).map(|e| e.skel.text()).as_deref(),
        Some(" = \n")
    );
}

#[test]
fn changed_values_keep_surrounding_text() {
    let lens = assignments();
    let out = round_trip(&lens, "a\t=\t1\nb=2\n", |tree| {
        tree.set("/a", "10").unwrap();
    });
    assert_eq!(out, "a\t=\t10\nb=2\n");
}

#[test]
fn inserted_nodes_are_printed_with_defaults() {
    let lens = assignments();
    let out = round_trip(&lens, "a=1\n", |tree| {
        tree.children.insert(0, Node::new("z").with_value("0"));
    });
    // the new first node takes the position of the old one, the old node finds its
    // formatting by label
    assert_eq!(out, "z = 0\na=1\n");
}

#[rstest]
#[case::empty_tree(vec![], "")]
#[case::one(vec![Node::new("k").with_value("7")], "k = 7\n")]
#[case::two(
    vec![Node::new("k").with_value("7"), Node::new("m").with_value("8")],
    "k = 7\nm = 8\n"
)]
fn create_prints_defaults(#[case] nodes: Vec<Node>, #[case] expected: &str) {
    assert_eq!(create(&assignments(), &Tree::new(nodes)).unwrap(), expected);
}

#[test]
fn put_text_parses_the_old_text_itself() {
    let tree = Tree::new(vec![Node::new("k").with_value("9")]);
    assert_eq!(put_text(&assignments(), &tree, "k  =  1\n").unwrap(), "k  =  9\n");
}

#[rstest]
#[case::bad_value(vec![Node::new("k").with_value("x")], "/k")]
#[case::missing_value(vec![Node::new("k")], "/k")]
#[case::bad_label(vec![Node::new("K").with_value("1")], "/")]
fn put_errors_carry_paths(#[case] nodes: Vec<Node>, #[case] path: &str) {
    let err = create(&assignments(), &Tree::new(nodes)).unwrap_err();
    assert!(matches!(err, LnsError::Put { .. }));
    assert_eq!(err.path(), Some(path), "{err}");
}

#[rstest]
#[case::truncated("a = 1\nb = 2\nc", 13, "Get did not match entire input")]
#[case::bad_second_line("a = 1\nb = x\n", 10, "Get did not match entire input")]
#[case::bad_start("= 1\n", 0, "Syntax error")]
#[case::bad_value("a = x\n", 4, "Syntax error")]
fn get_errors_report_positions(#[case] text: &str, #[case] pos: usize, #[case] message: &str) {
    let err = get(&assignments(), text, ParseFlags::default()).unwrap_err();
    assert_eq!(err.pos(), Some(pos), "{err}");
    assert_eq!(err.message(), message);
}

#[test]
fn seq_numbers_nodes_from_one_on_every_get() {
    let line = seq_of(vec![
        Lens::seq(at(), "n").unwrap(),
        Lens::store(at(), "[a-z]+").unwrap(),
        Lens::del(at(), "\n", "\n").unwrap(),
    ]);
    let lens = Lens::make_star(at(), Lens::make_subtree(at(), line).unwrap(), true).unwrap();
    for _ in 0..2 {
        let parsed = get(&lens, "x\ny\nz\n", ParseFlags::default()).unwrap();
        assert_tree(&parsed.tree)
            .labels(&["1", "2", "3"])
            .value_at("/2", "y");
    }
}

#[test]
fn optional_parts_follow_the_tree() {
    // [ key /[a-z]+/ . ( del /=/ "=" . store /[0-9]+/ )? . del /\n/ "\n" ]*
    let value = seq_of(vec![
        Lens::del(at(), "=", "=").unwrap(),
        Lens::store(at(), "[0-9]+").unwrap(),
    ]);
    let line = seq_of(vec![
        Lens::key(at(), "[a-z]+").unwrap(),
        Lens::make_maybe(at(), value, true).unwrap(),
        Lens::del(at(), "\n", "\n").unwrap(),
    ]);
    let lens = Lens::make_star(at(), Lens::make_subtree(at(), line).unwrap(), true).unwrap();

    let parsed = get(&lens, "a=1\nb\n", ParseFlags::default()).unwrap();
    assert_tree(&parsed.tree)
        .node(0, |n| {
            n.label("a").value("1");
        })
        .node(1, |n| {
            n.label("b").no_value();
        });

    let out = round_trip(&lens, "a=1\nb\n", |tree| {
        tree.children[0].value = None;
        tree.children[1].value = Some("2".into());
    });
    assert_eq!(out, "a\nb=2\n");
}

#[test]
fn union_picks_the_alternative_matching_the_tree() {
    // [ key /[a-z]+/ . del /=/ "=" . store /[0-9]+/ . del /\n/ "\n" ] | del /#[^\n]*\n/ "#\n"
    let entry = Lens::make_subtree(
        at(),
        seq_of(vec![
            Lens::key(at(), "[a-z]+").unwrap(),
            Lens::del(at(), "=", "=").unwrap(),
            Lens::store(at(), "[0-9]+").unwrap(),
            Lens::del(at(), "\n", "\n").unwrap(),
        ]),
    )
    .unwrap();
    let comment = Lens::del(at(), "#[^\n]*\n", "#\n").unwrap();
    let line = Lens::make_union(at(), entry, comment, true).unwrap();
    let lens = Lens::make_star(at(), line, true).unwrap();

    let text = "# one\na=1\n# two\nb=2\n";
    let parsed = get(&lens, text, ParseFlags::default()).unwrap();
    assert_tree(&parsed.tree).labels(&["a", "b"]);
    assert_eq!(round_trip(&lens, text, |_| {}), text);
    assert_eq!(
        round_trip(&lens, text, |tree| {
            tree.set("/b", "3").unwrap();
        }),
        "# one\na=1\n# two\nb=3\n"
    );
}
