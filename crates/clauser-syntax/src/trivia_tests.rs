//! Losslessness and trivia-ownership invariants.

use indoc::indoc;

use crate::options::ParseOptions;
use crate::syntax::SyntaxTokenExt;
use crate::{ParsedSource, SyntaxKind};

fn parse(source: &str) -> ParsedSource {
    ParsedSource::parse(source, ParseOptions::jomini())
}

/// Byte-exact reconstruction plus ownership uniqueness: the tree's tokens
/// tile the source with no gaps and no overlaps.
fn assert_lossless(source: &str) {
    let parsed = parse(source);
    assert_eq!(
        parsed.syntax().text().to_string(),
        parsed.source(),
        "reconstruction differs for {source:?}"
    );

    let root = parsed.syntax();
    let mut offset = 0u32;
    let mut token = root.first_token();
    while let Some(t) = token {
        let range = t.text_range();
        assert_eq!(u32::from(range.start()), offset, "gap or overlap at {t:?}");
        offset = range.end().into();
        token = t.next_token();
    }
    assert_eq!(offset as usize, parsed.source().len());
}

#[test]
fn lossless_corpus() {
    let cases = [
        "",
        "   ",
        "# only a comment",
        "a=b",
        "a={b=\"1\"c=d}foo=bar#good\n",
        "color = rgb { 100 200 150 }",
        "color = rgb\n{ 100 200 150 }",
        "a = { 1 }\n}\nb = 2",
        "a = { b = 1",
        "a = \"multi\nline\"",
        "a = \"unterminated",
        "a = & % b",
        "key{nested{deep=1}}",
        "\tweird   \t whitespace\t= 1 \t",
        "a ?= b\nc >= 2.5\nd != 1444.11.11",
        "== \"bar\"",
        "a =\nb = 2",
    ];
    for source in cases {
        assert_lossless(source);
    }
}

#[test]
fn trailing_comment_ownership() {
    let parsed = parse("foo=bar#good\n");
    let root = parsed.syntax();
    let bar = root
        .descendants_with_tokens()
        .filter_map(|e| e.into_token())
        .find(|t| t.text() == "bar")
        .unwrap();

    let trailing: Vec<String> = bar
        .trailing_trivia()
        .iter()
        .map(|t| t.text().to_string())
        .collect();
    assert_eq!(trailing, vec!["#good", "\n"]);
    assert!(bar.leading_trivia().is_empty());
    assert_eq!(bar.text_with_trivia(), "bar#good\n");
}

#[test]
fn leading_ownership_after_newline() {
    let source = "a = 1 # tail\n# lead\nb = 2";
    let parsed = parse(source);
    let root = parsed.syntax();

    let one = root
        .descendants_with_tokens()
        .filter_map(|e| e.into_token())
        .find(|t| t.text() == "1")
        .unwrap();
    let trailing: Vec<String> = one
        .trailing_trivia()
        .iter()
        .map(|t| t.text().to_string())
        .collect();
    assert_eq!(trailing, vec![" ", "# tail", "\n"]);

    let b = root
        .descendants_with_tokens()
        .filter_map(|e| e.into_token())
        .find(|t| t.text() == "b")
        .unwrap();
    let leading: Vec<String> = b
        .leading_trivia()
        .iter()
        .map(|t| t.text().to_string())
        .collect();
    assert_eq!(leading, vec!["# lead", "\n"]);
}

#[test]
fn file_header_leads_first_token() {
    let parsed = parse("# header\n\na = 1");
    let root = parsed.syntax();
    let a = root
        .descendants_with_tokens()
        .filter_map(|e| e.into_token())
        .find(|t| t.text() == "a")
        .unwrap();
    let leading: Vec<String> = a
        .leading_trivia()
        .iter()
        .map(|t| t.text().to_string())
        .collect();
    assert_eq!(leading, vec!["# header", "\n", "\n"]);
}

#[test]
fn eof_collects_file_tail() {
    let parsed = parse("a = 1 # tail\n# footer");
    let root = parsed.syntax();
    let eof = root
        .descendants_with_tokens()
        .filter_map(|e| e.into_token())
        .find(|t| t.kind() == SyntaxKind::Eof)
        .unwrap();
    let leading: Vec<String> = eof
        .leading_trivia()
        .iter()
        .map(|t| t.text().to_string())
        .collect();
    assert_eq!(leading, vec!["# footer"]);
}

#[test]
fn trivia_piece_view() {
    let parsed = parse("a = 1 # note");
    let root = parsed.syntax();
    let comment = root
        .descendants_with_tokens()
        .filter_map(|e| e.into_token())
        .find(|t| t.kind() == SyntaxKind::Comment)
        .unwrap();
    let piece = comment.trivia_piece().unwrap();
    assert_eq!(u32::from(piece.len), "# note".len() as u32);
}

#[test]
fn full_dump_shows_attachment() {
    let source = indoc! {"
        # header
        a = 1 # tail
    "};
    let parsed = parse(source);
    insta::assert_snapshot!(parsed.dump_cst_full(), @r##"
    Root
      SourceFile
        StatementList
          KeyValue
            Scalar
              Comment "# header"
              Newline "\n"
              ScalarUnquoted "a"
              Whitespace " "
            Eq "="
            Whitespace " "
            Scalar
              ScalarUnquoted "1"
              Whitespace " "
              Comment "# tail"
              Newline "\n"
    "##);
}
