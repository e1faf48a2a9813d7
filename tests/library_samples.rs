//! The built-in lenses against the sample files under `samples/`

use bilens::library::LensRegistry;
use bilens::testing::{assert_tree, Samples};
use bilens::{get, put, Lens, ParseFlags};
use rstest::rstest;

fn lens(name: &str) -> Lens {
    LensRegistry::with_defaults().get(name).unwrap()
}

/// Load a sample, apply `edit` to its tree and put it back.
fn edited(name: &str, number: usize, edit: impl FnOnce(&mut bilens::Tree)) -> String {
    let loader = Samples::load(name, number);
    let source = loader.source();
    let mut parsed = loader.get();
    edit(&mut parsed.tree);
    put(&lens(name), &parsed.tree, &parsed.skel, &mut parsed.dict, &source).unwrap()
}

#[rstest]
fn every_sample_round_trips(#[values("keyvalue", "shellvars", "hosts")] name: &str) {
    let numbers = Samples::list_numbers_for(name).unwrap();
    assert!(!numbers.is_empty(), "no samples for {name}");
    for number in numbers {
        let source = Samples::must_get_source_for(name, number);
        assert_eq!(edited(name, number, |_| {}), source, "{name} sample #{number}");
    }
}

#[test]
fn keyvalue_basic() {
    let parsed = Samples::load("keyvalue", 1).get();
    insta::assert_snapshot!(parsed.tree.render_paths(), @r###"
    /host = db.example.com
    /port = 5432
    /user = admin
    "###);
}

#[test]
fn keyvalue_values_keep_inner_spaces() {
    let parsed = Samples::load("keyvalue", 2).get();
    assert_tree(&parsed.tree)
        .labels(&["name", "path"])
        .value_at("/name", "two words here")
        .value_at("/path", "/usr/local/bin");
}

#[test]
fn keyvalue_edits() {
    let out = edited("keyvalue", 1, |tree| {
        tree.set("/port", "6543").unwrap();
        tree.set("/timeout", "30").unwrap();
    });
    assert_eq!(
        out,
        "# database settings\nhost = db.example.com\nport=6543\n\nuser   =   admin\ntimeout = 30\n"
    );
}

#[test]
fn shellvars_exports() {
    let parsed = Samples::load("shellvars", 1).get();
    assert_tree(&parsed.tree)
        .labels(&["PATH", "LANG", "EMPTY", "EDITOR"])
        .value_at("/PATH", "/usr/bin:/bin")
        .value_at("/EMPTY", "")
        .value_at("/EDITOR", "\"vim\"");
}

#[test]
fn shellvars_edits_keep_export() {
    let out = edited("shellvars", 1, |tree| {
        tree.set("/EDITOR", "nano").unwrap();
        tree.set("/LANG", "C").unwrap();
        tree.set("/NEW", "1").unwrap();
    });
    assert_eq!(
        out,
        "# generated by installer\nexport PATH=/usr/bin:/bin\nLANG=C\nEMPTY=\n\nexport\tEDITOR=nano\nNEW=1\n"
    );
}

#[test]
fn hosts_basic() {
    let parsed = Samples::load("hosts", 1).get();
    insta::assert_snapshot!(parsed.tree.render_paths(), @r###"
    /1
    /1/ipaddr = 127.0.0.1
    /1/canonical = localhost
    /2
    /2/ipaddr = ::1
    /2/canonical = localhost
    /2/alias[1] = ip6-localhost
    /2/alias[2] = ip6-loopback
    /3
    /3/ipaddr = 192.168.0.10
    /3/canonical = db.example.com
    /3/alias[1] = db
    /3/alias[2] = db1
    "###);
}

#[test]
fn hosts_trailing_comment() {
    let parsed = Samples::load("hosts", 2).get();
    assert_tree(&parsed.tree).node_count(1).node(0, |n| {
        n.label("1")
            .no_value()
            .child_count(2)
            .child_value("ipaddr", "10.0.0.1")
            .child_value("canonical", "gateway");
    });
}

#[rstest]
#[case::change_alias("/3/alias[2]", "db2", "192.168.0.10 db.example.com db db2\n")]
#[case::add_alias("/1/alias", "lo", "127.0.0.1\tlocalhost lo\n")]
#[case::change_address("/2/ipaddr", "::2", "::2\tlocalhost ip6-localhost ip6-loopback\n")]
fn hosts_edits_touch_one_line(#[case] path: &str, #[case] value: &str, #[case] line: &str) {
    let source = Samples::must_get_source_for("hosts", 1);
    let out = edited("hosts", 1, |tree| tree.set(path, value).unwrap());
    let changed: Vec<_> = out
        .split_inclusive('\n')
        .zip(source.split_inclusive('\n'))
        .filter(|(new, old)| new != old)
        .map(|(new, _)| new)
        .collect();
    assert_eq!(changed, [line]);
    assert_eq!(out.lines().count(), source.lines().count());
}

#[test]
fn hosts_remove_record() {
    let out = edited("hosts", 1, |tree| {
        assert_eq!(tree.remove("/3").unwrap(), 1);
    });
    assert_eq!(
        out,
        "# static table lookup for hostnames\n127.0.0.1\tlocalhost\n::1\tlocalhost ip6-localhost ip6-loopback\n\n"
    );
}

#[test]
fn large_files_round_trip() {
    let lens = lens("keyvalue");
    let mut text = String::new();
    for i in 0..20_000 {
        if i % 50 == 0 {
            text.push_str(&format!("# section {i}\n\n"));
        }
        text.push_str(&format!("key{i} = value number {i}\n"));
    }
    let mut parsed = get(&lens, &text, ParseFlags::default()).unwrap();
    assert_eq!(parsed.tree.children.len(), 20_000);
    let out = put(&lens, &parsed.tree, &parsed.skel, &mut parsed.dict, &text).unwrap();
    assert_eq!(out, text);

    assert_eq!(parsed.tree.remove("/key10000").unwrap(), 1);
    let out = put(&lens, &parsed.tree, &parsed.skel, &mut parsed.dict, &text).unwrap();
    assert_eq!(out.len(), text.len() - "key10000 = value number 10000\n".len());
    assert_eq!(out.matches("# section").count(), 400);
}
