//! Delayed scalar interpretation.
//!
//! Precedence: bool (`yes`/`no`) → date-like (`Y.M.D`) → number → unknown.
//! Dates are leap-year unaware. Numbers preserve precision: integers beyond
//! the i32 range widen to i64, decimals keep their source text.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarValue {
    Unknown,
    Bool(bool),
    Number(Number),
    Date(GameDate),
}

impl ScalarValue {
    /// Canonical source rendering; `None` for [`ScalarValue::Unknown`].
    /// Interpreting the rendering yields the same value back.
    pub fn source_text(&self) -> Option<String> {
        match self {
            ScalarValue::Unknown => None,
            ScalarValue::Bool(true) => Some("yes".to_string()),
            ScalarValue::Bool(false) => Some("no".to_string()),
            ScalarValue::Number(n) => Some(n.to_string()),
            ScalarValue::Date(d) => Some(d.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Number {
    Int(i32),
    /// Integer outside the i32 range.
    Wide(i64),
    Decimal(Decimal),
}

impl std::fmt::Display for Number {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Number::Int(v) => write!(f, "{v}"),
            Number::Wide(v) => write!(f, "{v}"),
            Number::Decimal(d) => f.write_str(&d.text),
        }
    }
}

/// A decimal kept as source text so `0.250` survives a round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Decimal {
    text: String,
}

impl Decimal {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn value(&self) -> f64 {
        // The constructor only admits `[+-]? digits? '.' digits`.
        self.text.parse().expect("validated decimal text")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GameDate {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

impl std::fmt::Display for GameDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.year, self.month, self.day)
    }
}

/// Interprets raw scalar text. Quoted-scalar gating happens at the caller;
/// this function sees only the payload.
pub fn interpret_scalar(text: &str) -> ScalarValue {
    match text {
        "yes" => return ScalarValue::Bool(true),
        "no" => return ScalarValue::Bool(false),
        _ => {}
    }
    if let Some(date) = try_date(text) {
        return ScalarValue::Date(date);
    }
    if let Some(number) = try_number(text) {
        return ScalarValue::Number(number);
    }
    ScalarValue::Unknown
}

fn try_date(text: &str) -> Option<GameDate> {
    let mut parts = text.split('.');
    let year = parts.next()?;
    let month = parts.next()?;
    let day = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    if [year, month, day]
        .iter()
        .any(|p| p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit()))
    {
        return None;
    }

    let year: u16 = year.parse().ok()?;
    let month: u8 = month.parse().ok()?;
    let day: u8 = day.parse().ok()?;
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }
    Some(GameDate { year, month, day })
}

fn try_number(text: &str) -> Option<Number> {
    let unsigned = text.strip_prefix(['+', '-']).unwrap_or(text);
    if unsigned.is_empty() {
        return None;
    }

    match unsigned.split_once('.') {
        None => {
            if !unsigned.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            if let Ok(v) = text.parse::<i32>() {
                return Some(Number::Int(v));
            }
            text.parse::<i64>().ok().map(Number::Wide)
        }
        Some((int_part, frac_part)) => {
            // `.5` is accepted; `5.` is not.
            if frac_part.is_empty()
                || !int_part.bytes().all(|b| b.is_ascii_digit())
                || !frac_part.bytes().all(|b| b.is_ascii_digit())
            {
                return None;
            }
            Some(Number::Decimal(Decimal {
                text: text.to_string(),
            }))
        }
    }
}
