//! The `.cwt` field grammar: classifying rule keys and scalar values.

use serde::Serialize;

/// What a rule key or scalar value means to the checker.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    // primitives
    Bool,
    Int {
        min: Option<i64>,
        max: Option<i64>,
    },
    Float {
        min: Option<f64>,
        max: Option<f64>,
    },
    Scalar,
    PercentageField,
    DateField,
    Localisation,
    LocalisationSynced,
    LocalisationInline,
    Filepath {
        prefix: Option<String>,
        extension: Option<String>,
    },
    Icon {
        path: String,
    },
    VariableField {
        int: bool,
    },
    ValueField {
        int: bool,
    },
    AliasKeysField(String),

    // references
    Enum(String),
    TypeRef {
        type_name: String,
        subtype: Option<String>,
        prefix: Option<String>,
        suffix: Option<String>,
    },
    Scope(String),
    ScopeField,
    EventTarget(String),
    Value(String),
    ValueSet(String),
    AliasName(String),
    AliasMatchLeft(String),
    SingleAliasRight(String),

    /// A bracket form this grammar does not know.
    UnknownBracket {
        name: String,
        arg: String,
    },
    /// A plain literal key/value.
    Literal(String),
}

impl FieldKind {
    pub fn parse(text: &str) -> FieldKind {
        match text {
            "bool" => return FieldKind::Bool,
            "int" => return FieldKind::Int {
                min: None,
                max: None,
            },
            "float" => return FieldKind::Float {
                min: None,
                max: None,
            },
            "scalar" => return FieldKind::Scalar,
            "percentage_field" => return FieldKind::PercentageField,
            "date_field" => return FieldKind::DateField,
            "localisation" => return FieldKind::Localisation,
            "localisation_synced" => return FieldKind::LocalisationSynced,
            "localisation_inline" => return FieldKind::LocalisationInline,
            "variable_field" => return FieldKind::VariableField { int: false },
            "int_variable_field" => return FieldKind::VariableField { int: true },
            "value_field" => return FieldKind::ValueField { int: false },
            "int_value_field" => return FieldKind::ValueField { int: true },
            "scope_field" => return FieldKind::ScopeField,
            "filepath" => return FieldKind::Filepath {
                prefix: None,
                extension: None,
            },
            _ => {}
        }

        if let Some(kind) = parse_type_ref(text) {
            return kind;
        }
        if let Some(kind) = parse_bracket(text) {
            return kind;
        }
        FieldKind::Literal(text.to_string())
    }

    /// Whether this kind is matched against field keys by reference rather
    /// than literally.
    pub fn is_dynamic_key(&self) -> bool {
        !matches!(self, FieldKind::Literal(_))
    }
}

/// `<type>`, `<type.subtype>`, and the affixed `pre_<type>_suf` forms.
fn parse_type_ref(text: &str) -> Option<FieldKind> {
    let open = text.find('<')?;
    let close = text.rfind('>')?;
    if close <= open {
        return None;
    }

    let prefix = (open > 0).then(|| text[..open].to_string());
    let suffix = (close + 1 < text.len()).then(|| text[close + 1..].to_string());
    let inner = &text[open + 1..close];
    if inner.is_empty() || inner.contains(['<', '>', '[', ']']) {
        return None;
    }

    let (type_name, subtype) = match inner.split_once('.') {
        Some((t, s)) => (t.to_string(), Some(s.to_string())),
        None => (inner.to_string(), None),
    };
    Some(FieldKind::TypeRef {
        type_name,
        subtype,
        prefix,
        suffix,
    })
}

fn parse_bracket(text: &str) -> Option<FieldKind> {
    let open = text.find('[')?;
    let close = text.rfind(']')?;
    if close != text.len() - 1 || close <= open {
        return None;
    }
    let name = &text[..open];
    let arg = &text[open + 1..close];

    Some(match name {
        "enum" => FieldKind::Enum(arg.to_string()),
        "scope" => FieldKind::Scope(arg.to_string()),
        "event_target" => FieldKind::EventTarget(arg.to_string()),
        "value" => FieldKind::Value(arg.to_string()),
        "value_set" => FieldKind::ValueSet(arg.to_string()),
        "alias_name" => FieldKind::AliasName(arg.to_string()),
        "alias_match_left" => FieldKind::AliasMatchLeft(arg.to_string()),
        "single_alias_right" => FieldKind::SingleAliasRight(arg.to_string()),
        "alias_keys_field" => FieldKind::AliasKeysField(arg.to_string()),
        "int" => {
            let (min, max) = parse_range(arg)?;
            FieldKind::Int {
                min: min.map(|v| v as i64),
                max: max.map(|v| v as i64),
            }
        }
        "float" => {
            let (min, max) = parse_range(arg)?;
            FieldKind::Float { min, max }
        }
        "filepath" => match arg.split_once(',') {
            Some((path, ext)) => FieldKind::Filepath {
                prefix: Some(path.trim().to_string()),
                extension: Some(ext.trim().to_string()),
            },
            None => FieldKind::Filepath {
                prefix: Some(arg.trim().to_string()),
                extension: None,
            },
        },
        "icon" => FieldKind::Icon {
            path: arg.trim().to_string(),
        },
        _ => FieldKind::UnknownBracket {
            name: name.to_string(),
            arg: arg.to_string(),
        },
    })
}

/// `a..b` with `inf`/`-inf` leaving a side open.
fn parse_range(arg: &str) -> Option<(Option<f64>, Option<f64>)> {
    let (lo, hi) = arg.split_once("..")?;
    let parse_side = |side: &str, open_words: &[&str]| -> Option<Option<f64>> {
        let side = side.trim();
        if open_words.contains(&side) {
            return Some(None);
        }
        side.parse::<f64>().ok().map(Some)
    };
    let min = parse_side(lo, &["-inf", "inf"])?;
    let max = parse_side(hi, &["inf"])?;
    Some((min, max))
}
