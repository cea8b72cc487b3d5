//! Literal Printer: materialized values as KSQL literal text.

use crate::ast::Value;
use crate::schema::TypeKind;

/// Casing of boolean literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolCase {
    /// `True` / `False`, used at statement level.
    Capitalized,
    /// `true` / `false`, used inside named projections and INSERT values.
    Lower,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiteralStyle {
    pub bool_case: BoolCase,
    /// Arrays print as a bare comma list (the inside of `IN (...)`).
    pub membership: bool,
    pub decimal_separator: char,
}

impl Default for LiteralStyle {
    fn default() -> Self {
        Self {
            bool_case: BoolCase::Capitalized,
            membership: false,
            decimal_separator: '.',
        }
    }
}

impl LiteralStyle {
    pub fn lower_bools(mut self) -> Self {
        self.bool_case = BoolCase::Lower;
        self
    }

    fn nested(&self) -> Self {
        Self {
            membership: false,
            ..*self
        }
    }
}

/// Render `value` as literal text.
pub fn print(value: &Value, style: &LiteralStyle) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => match (style.bool_case, b) {
            (BoolCase::Capitalized, true) => "True".to_string(),
            (BoolCase::Capitalized, false) => "False".to_string(),
            (BoolCase::Lower, b) => b.to_string(),
        },
        Value::Int(n) => n.to_string(),
        Value::Float(n) => with_separator(n.to_string(), style.decimal_separator),
        Value::Decimal(d) => with_separator(d.to_string(), style.decimal_separator),
        Value::String(s) => format!("'{}'", s),
        Value::Enum(name) => format!("'{}'", name),
        Value::Bytes(bytes) => {
            let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
            format!("TO_BYTES('{}', 'hex')", hex)
        }
        Value::Date(d) => format!("'{}'", d.format("%Y-%m-%d")),
        Value::Time(t) => format!("'{}'", t.format("%H:%M:%S")),
        Value::Timestamp(ts) => format!("'{}'", ts.format("%Y-%m-%dT%H:%M:%S%.3f")),
        Value::Array(items) => {
            let inner = style.nested();
            let items: Vec<String> = items.iter().map(|v| print(v, &inner)).collect();
            if style.membership {
                items.join(", ")
            } else if items.is_empty() {
                empty_array(None)
            } else {
                format!("ARRAY[{}]", items.join(", "))
            }
        }
        Value::Map(entries) => {
            let inner = style.nested();
            let entries: Vec<String> = entries
                .iter()
                .map(|(k, v)| format!("{} := {}", print(k, &inner), print(v, &inner)))
                .collect();
            format!("MAP({})", entries.join(", "))
        }
        Value::Struct(fields) => {
            let inner = style.nested();
            let fields: Vec<String> = fields
                .iter()
                .map(|(name, v)| format!("{} := {}", name, print(v, &inner)))
                .collect();
            format!("STRUCT({})", fields.join(", "))
        }
    }
}

/// KSQL has no empty array literal; build one by removing the only
/// element of a one-element array.
pub fn empty_array(element: Option<&TypeKind>) -> String {
    match element {
        Some(TypeKind::String) => "ARRAY_REMOVE(ARRAY[''], '')".to_string(),
        _ => "ARRAY_REMOVE(ARRAY[0], 0)".to_string(),
    }
}

pub(crate) fn with_separator(text: String, separator: char) -> String {
    if separator == '.' {
        text
    } else {
        text.replace('.', &separator.to_string())
    }
}
