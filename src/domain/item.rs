use serde::Serialize;
use serde_json::{Map, Value};

use crate::app::{PricewatchError, Result};

/// A raw item as printed by the worker. Nothing is guaranteed: every field is
/// optional and wrong-typed values are dropped rather than rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub name: Option<String>,
    pub price: Option<String>,
    pub price_amount: Option<f64>,
    pub reference: Option<String>,
    pub overview: Option<String>,
    pub category: Option<String>,
    pub url: Option<String>,
    pub image: Option<String>,
    pub domain: Option<String>,
}

impl Item {
    /// Read an item out of worker JSON. Only a non-object value is an error.
    pub fn from_value(value: &Value) -> Result<Self> {
        let obj = value.as_object().ok_or_else(|| {
            PricewatchError::MalformedItem(format!("expected an object, got {}", type_name(value)))
        })?;

        Ok(Self {
            name: text_field(obj, "name"),
            price: text_field(obj, "price"),
            price_amount: obj.get("priceAmount").and_then(amount_value),
            reference: text_field(obj, "reference"),
            overview: text_field(obj, "overview"),
            category: text_field(obj, "category"),
            url: text_field(obj, "url"),
            image: text_field(obj, "image"),
            domain: text_field(obj, "domain"),
        })
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("(unnamed)")
    }
}

/// Strings pass through, numbers are rendered; anything else counts as absent.
fn text_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn amount_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_leading_float(s),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

/// Best-effort float parse: reads the longest numeric prefix, so "12.50 EUR"
/// yields 12.5 and "EUR 12" yields nothing.
pub fn parse_leading_float(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        if digits > 0 || frac_end > frac_start {
            digits += frac_end - frac_start;
            end = frac_end;
        }
    }

    if digits == 0 {
        return None;
    }

    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+') | Some(b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    s[..end].parse::<f64>().ok()
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
