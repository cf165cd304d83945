use crate::ast::scalar::{GameDate, Number, ScalarValue, interpret_scalar};
use crate::options::ParseOptions;
use crate::ParsedSource;

#[test]
fn precedence_bool_first() {
    assert_eq!(interpret_scalar("yes"), ScalarValue::Bool(true));
    assert_eq!(interpret_scalar("no"), ScalarValue::Bool(false));
    // Only the exact words.
    assert_eq!(interpret_scalar("Yes"), ScalarValue::Unknown);
    assert_eq!(interpret_scalar("noo"), ScalarValue::Unknown);
}

#[test]
fn dates() {
    assert_eq!(
        interpret_scalar("1444.11.11"),
        ScalarValue::Date(GameDate {
            year: 1444,
            month: 11,
            day: 11
        })
    );
    // Leap-year unaware: Feb 31 is a date.
    assert_eq!(
        interpret_scalar("1444.2.31"),
        ScalarValue::Date(GameDate {
            year: 1444,
            month: 2,
            day: 31
        })
    );
    assert_eq!(interpret_scalar("1444.13.1"), ScalarValue::Unknown);
    assert_eq!(interpret_scalar("1444.0.1"), ScalarValue::Unknown);
    assert_eq!(interpret_scalar("1444.1.32"), ScalarValue::Unknown);
    // Signs disqualify a date.
    assert_eq!(interpret_scalar("-1.2.3"), ScalarValue::Unknown);
}

#[test]
fn numbers() {
    assert_eq!(interpret_scalar("42"), ScalarValue::Number(Number::Int(42)));
    assert_eq!(
        interpret_scalar("-17"),
        ScalarValue::Number(Number::Int(-17))
    );
    assert_eq!(
        interpret_scalar("+5"),
        ScalarValue::Number(Number::Int(5))
    );
    assert_eq!(
        interpret_scalar("2147483648"),
        ScalarValue::Number(Number::Wide(2_147_483_648))
    );
    match interpret_scalar("0.250") {
        ScalarValue::Number(Number::Decimal(d)) => {
            assert_eq!(d.text(), "0.250");
            assert!((d.value() - 0.25).abs() < f64::EPSILON);
        }
        other => panic!("expected decimal, got {other:?}"),
    }
    assert_eq!(interpret_scalar("1.2.3.4"), ScalarValue::Unknown);
    assert_eq!(interpret_scalar("five"), ScalarValue::Unknown);
    assert_eq!(interpret_scalar("5."), ScalarValue::Unknown);
}

#[test]
fn date_beats_number_shape() {
    // Three dotted parts in range: a date, not a malformed number.
    assert!(matches!(
        interpret_scalar("5.5.5"),
        ScalarValue::Date(_)
    ));
    // Two parts: a decimal.
    assert!(matches!(
        interpret_scalar("5.5"),
        ScalarValue::Number(Number::Decimal(_))
    ));
}

#[test]
fn idempotent_interpretation() {
    let cases = [
        "yes", "no", "42", "-17", "2147483648", "0.250", "-0.5", "1444.11.11", "1.1.1",
    ];
    for case in cases {
        let first = interpret_scalar(case);
        let rendered = first.source_text().unwrap();
        assert_eq!(interpret_scalar(&rendered), first, "not idempotent: {case}");
    }
}

#[test]
fn quoted_scalars_do_not_coerce() {
    let parsed = ParsedSource::parse("a = \"yes\"\nb = yes", ParseOptions::jomini());
    let ast = parsed.ast();

    let quoted = ast.statements[0].as_key_value().unwrap();
    let scalar = quoted.value.as_scalar().unwrap();
    assert_eq!(scalar.interpret(), ScalarValue::Unknown);
    // Explicit opt-in interprets the payload.
    assert_eq!(scalar.interpret_with_quoted(), ScalarValue::Bool(true));

    let bare = ast.statements[1].as_key_value().unwrap();
    assert_eq!(
        bare.value.as_scalar().unwrap().interpret(),
        ScalarValue::Bool(true)
    );
}
