use crate::diagnostics::codes;
use crate::kind::SyntaxKind;
use crate::lexer::{LexContext, LexOptions, TokenFlags, lex, token_text};

fn kinds(source: &str) -> Vec<SyntaxKind> {
    lex(source, LexContext::Jomini, &LexOptions::default())
        .tokens
        .iter()
        .map(|t| t.kind)
        .collect()
}

fn texts(source: &str, ctx: LexContext) -> Vec<(SyntaxKind, String)> {
    lex(source, ctx, &LexOptions::default())
        .tokens
        .iter()
        .map(|t| (t.kind, token_text(source, t).to_string()))
        .collect()
}

#[test]
fn basic_statement() {
    use SyntaxKind::*;
    assert_eq!(
        kinds("a = b # c\n"),
        vec![
            ScalarUnquoted,
            Whitespace,
            Eq,
            Whitespace,
            ScalarUnquoted,
            Whitespace,
            Comment,
            Newline,
        ]
    );
}

#[test]
fn all_operators() {
    use SyntaxKind::*;
    assert_eq!(
        kinds("= == != > >= < <= ?="),
        vec![
            Eq, Whitespace, EqEq, Whitespace, NotEq, Whitespace, Gt, Whitespace, GtEq, Whitespace,
            Lt, Whitespace, LtEq, Whitespace, QuestionEq,
        ]
    );
}

#[test]
fn question_eq_without_space() {
    // The scalar machine grabs the `?`; the post-pass gives it back.
    assert_eq!(
        texts("a?=b", LexContext::Jomini),
        vec![
            (SyntaxKind::ScalarUnquoted, "a".to_string()),
            (SyntaxKind::QuestionEq, "?=".to_string()),
            (SyntaxKind::ScalarUnquoted, "b".to_string()),
        ]
    );
}

#[test]
fn question_stays_in_scalar() {
    assert_eq!(
        texts("a? b", LexContext::Jomini),
        vec![
            (SyntaxKind::ScalarUnquoted, "a?".to_string()),
            (SyntaxKind::Whitespace, " ".to_string()),
            (SyntaxKind::ScalarUnquoted, "b".to_string()),
        ]
    );
}

#[test]
fn scalar_charset() {
    // Dots, dashes, colons, at, dollar all continue a scalar.
    assert_eq!(
        texts("1444.11.11 a-b_c:d @var $PARAM$", LexContext::Jomini)
            .into_iter()
            .filter(|(k, _)| *k == SyntaxKind::ScalarUnquoted)
            .map(|(_, t)| t)
            .collect::<Vec<_>>(),
        vec!["1444.11.11", "a-b_c:d", "@var", "$PARAM$"]
    );
}

#[test]
fn quoted_scalar_flags() {
    let out = lex(r#"a = "b \" c""#, LexContext::Jomini, &LexOptions::default());
    assert!(out.diagnostics.is_empty());
    let quoted = out
        .tokens
        .iter()
        .find(|t| t.kind == SyntaxKind::ScalarQuoted)
        .unwrap();
    assert!(quoted.flags.contains(TokenFlags::WAS_QUOTED));
    assert!(quoted.flags.contains(TokenFlags::HAS_ESCAPE));
    assert_eq!(token_text(r#"a = "b \" c""#, quoted), r#""b \" c""#);
}

#[test]
fn quoted_scalar_embedded_hash() {
    let out = lex(r##"a = "b # c""##, LexContext::Jomini, &LexOptions::default());
    assert!(out.diagnostics.is_empty());
    assert!(
        out.tokens
            .iter()
            .all(|t| t.kind != SyntaxKind::Comment)
    );
}

#[test]
fn multiline_string_spans_newline_by_default() {
    let source = "a = \"line1\nline2\"";
    let out = lex(source, LexContext::Jomini, &LexOptions::default());
    assert!(out.diagnostics.is_empty());
    let quoted = out
        .tokens
        .iter()
        .find(|t| t.kind == SyntaxKind::ScalarQuoted)
        .unwrap();
    assert_eq!(token_text(source, quoted), "\"line1\nline2\"");
}

#[test]
fn string_closes_at_newline_when_multiline_off() {
    let source = "a = \"line1\nb = c";
    let options = LexOptions {
        allow_multiline_strings: false,
        ..LexOptions::default()
    };
    let out = lex(source, LexContext::Jomini, &options);
    assert_eq!(out.diagnostics.len(), 1);
    assert_eq!(out.diagnostics[0].code, codes::LEXER_UNTERMINATED_STRING);
    let quoted = out
        .tokens
        .iter()
        .find(|t| t.kind == SyntaxKind::ScalarQuoted)
        .unwrap();
    assert_eq!(token_text(source, quoted), "\"line1");
    // The second line still tokenises normally.
    assert!(out.tokens.iter().any(|t| t.kind == SyntaxKind::Eq && t.range.start() > quoted.range.end()));
}

#[test]
fn unterminated_string_at_eof() {
    let out = lex("a = \"oops", LexContext::Jomini, &LexOptions::default());
    assert_eq!(out.diagnostics.len(), 1);
    assert_eq!(out.diagnostics[0].code, codes::LEXER_UNTERMINATED_STRING);

    let silent = LexOptions {
        allow_unterminated_strings: true,
        ..LexOptions::default()
    };
    let out = lex("a = \"oops", LexContext::Jomini, &silent);
    assert!(out.diagnostics.is_empty());
}

#[test]
fn invalid_escape_reported_once() {
    let out = lex(r#"a = "b \n c""#, LexContext::Jomini, &LexOptions::default());
    assert_eq!(out.diagnostics.len(), 1);
    assert_eq!(out.diagnostics[0].code, codes::LEXER_INVALID_ESCAPE);
}

#[test]
fn garbage_coalesces() {
    let source = "a &&% b";
    let out = lex(source, LexContext::Jomini, &LexOptions::default());
    let garbage: Vec<_> = out
        .tokens
        .iter()
        .filter(|t| t.kind == SyntaxKind::Garbage)
        .collect();
    assert_eq!(garbage.len(), 1);
    assert_eq!(token_text(source, garbage[0]), "&&%");
    assert_eq!(out.diagnostics.len(), 1);
    assert_eq!(out.diagnostics[0].code, codes::LEXER_INVALID_CHARACTER);
}

#[test]
fn schema_dsl_context_folds_brackets() {
    assert_eq!(
        texts("alias_name[trigger] = <technology>", LexContext::SchemaDsl),
        vec![
            (SyntaxKind::ScalarUnquoted, "alias_name[trigger]".to_string()),
            (SyntaxKind::Whitespace, " ".to_string()),
            (SyntaxKind::Eq, "=".to_string()),
            (SyntaxKind::Whitespace, " ".to_string()),
            (SyntaxKind::ScalarUnquoted, "<technology>".to_string()),
        ]
    );
}

#[test]
fn jomini_context_splits_angle_brackets() {
    use SyntaxKind::*;
    assert_eq!(
        kinds("<technology>"),
        vec![Lt, ScalarUnquoted, Gt]
    );
}

#[test]
fn schema_dsl_int_range_is_one_scalar() {
    assert_eq!(
        texts("factor = int[0..100]", LexContext::SchemaDsl)
            .last()
            .unwrap()
            .1,
        "int[0..100]"
    );
}

#[test]
fn preceding_line_break_flag() {
    let out = lex("a = 1\nb = 2", LexContext::Jomini, &LexOptions::default());
    let scalars: Vec<_> = out
        .tokens
        .iter()
        .filter(|t| t.kind == SyntaxKind::ScalarUnquoted)
        .collect();
    // `a` opens the file, `b` opens a line; `1` and `2` do not.
    assert!(scalars[0].has_preceding_line_break());
    assert!(!scalars[1].has_preceding_line_break());
    assert!(scalars[2].has_preceding_line_break());
    assert!(!scalars[3].has_preceding_line_break());
}

#[test]
fn crlf_newlines() {
    use SyntaxKind::*;
    assert_eq!(kinds("a\r\nb"), vec![ScalarUnquoted, Newline, ScalarUnquoted]);
}
