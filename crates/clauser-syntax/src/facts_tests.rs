use indoc::indoc;

use crate::facts::{FactId, ValueFact};
use crate::options::ParseOptions;
use crate::ParsedSource;

fn parse(source: &str) -> ParsedSource {
    ParsedSource::parse(source, ParseOptions::jomini())
}

#[test]
fn root_fact_indexes_top_level() {
    let parsed = parse("a = 1\nb = { }\na = 2");
    let facts = parsed.facts();

    let root = facts.root();
    assert!(root.path.is_empty());
    assert!(root.key_range.is_none());
    assert_eq!(root.fields.len(), 2);
    assert_eq!(root.fields["a"].len(), 2);
    assert_eq!(root.fields["a"][0].occurrence, 0);
    assert_eq!(root.fields["a"][1].occurrence, 1);
    assert_eq!(root.fields["b"].len(), 1);
}

#[test]
fn declaration_paths_carry_occurrences() {
    let source = indoc! {r#"
        modifier = { x = 1 }
        modifier = { y = 2 }
    "#};
    let parsed = parse(source);
    let facts = parsed.facts();

    let paths: Vec<String> = facts
        .iter()
        .filter(|f| f.id != FactId::ROOT)
        .map(|f| f.path_string())
        .collect();
    assert_eq!(paths, vec!["modifier[0]", "modifier[1]"]);
}

#[test]
fn nested_paths() {
    let source = "outer = { inner = { leaf = 1 } inner = { } }";
    let parsed = parse(source);
    let facts = parsed.facts();

    let paths: Vec<String> = facts
        .iter()
        .filter(|f| f.id != FactId::ROOT)
        .map(|f| f.path_string())
        .collect();
    assert_eq!(
        paths,
        vec!["outer[0]", "outer[0]/inner[0]", "outer[0]/inner[1]"]
    );

    let leaf_holder = facts
        .iter()
        .find(|f| f.path_string() == "outer[0]/inner[0]")
        .unwrap();
    assert!(leaf_holder.fields.contains_key("leaf"));
}

#[test]
fn array_items_recorded() {
    let parsed = parse("list = { 1 2 three }");
    let facts = parsed.facts();
    let list = facts.iter().find(|f| f.key() == Some("list")).unwrap();
    assert_eq!(list.items.len(), 3);
    assert_eq!(list.items[2].value.as_scalar_text(), Some("three"));
}

#[test]
fn tagged_blocks_become_objects() {
    let parsed = parse("color = rgb { 1 2 3 }");
    let facts = parsed.facts();
    let root = facts.root();
    match &root.fields["color"][0].value {
        ValueFact::Tagged { tag, body } => {
            assert_eq!(tag, "rgb");
            assert_eq!(facts.get(*body).items.len(), 3);
        }
        other => panic!("expected tagged value, got {other:?}"),
    }
}

#[test]
fn key_ranges_point_at_keys() {
    let source = "tech = { cost = 100 }";
    let parsed = parse(source);
    let facts = parsed.facts();
    let tech = facts.iter().find(|f| f.key() == Some("tech")).unwrap();
    let key_range = tech.key_range.unwrap();
    assert_eq!(&source[std::ops::Range::<usize>::from(key_range)], "tech");

    let cost = &tech.fields["cost"][0];
    assert_eq!(
        &source[std::ops::Range::<usize>::from(cost.key_range)],
        "cost"
    );
}

#[test]
fn facts_cached_once() {
    let parsed = parse("a = { b = 1 }");
    let first = parsed.facts() as *const _;
    let second = parsed.facts() as *const _;
    assert_eq!(first, second);
}
