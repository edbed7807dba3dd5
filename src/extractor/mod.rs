use serde_json::Value;
use tracing::debug;

use crate::app::{PricewatchError, Result};
use crate::domain::ScrapeResult;

/// Keys that mark a JSON line as the worker's result rather than debug output.
const RESULT_KEYS: [&str; 3] = ["data", "error", "success"];

/// Pulls the worker's result out of its mixed log/JSON stdout.
#[derive(Clone, Default)]
pub struct Extractor;

impl Extractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, stdout: &str) -> Result<ScrapeResult> {
        let result = Self::find_result_line(stdout).ok_or(PricewatchError::NoResultFound)?;

        if let Some(message) = Self::reported_error(&result) {
            return Err(PricewatchError::WorkerReported(message));
        }

        Ok(Self::normalize(result))
    }

    /// Scan from the last line backwards. The first object carrying a result
    /// key wins; otherwise the last object that parsed at all.
    fn find_result_line(stdout: &str) -> Option<Value> {
        let mut fallback = None;

        for line in stdout.lines().rev() {
            let line = line.trim();
            if !(line.starts_with('{') && line.ends_with('}')) {
                continue;
            }

            let value = match serde_json::from_str::<Value>(line) {
                Ok(value @ Value::Object(_)) => value,
                Ok(_) => continue,
                Err(e) => {
                    debug!("Skipping JSON-looking line that does not parse: {}", e);
                    continue;
                }
            };

            if RESULT_KEYS.iter().any(|key| value.get(key).is_some()) {
                return Some(value);
            }
            if fallback.is_none() {
                fallback = Some(value);
            }
        }

        fallback
    }

    /// An `error` field counts when it is truthy: `null`, `false`, `0` and
    /// `""` are ignored, while any array or object (even empty) is a failure.
    fn reported_error(result: &Value) -> Option<String> {
        match result.get("error")? {
            Value::Null | Value::Bool(false) => None,
            Value::Number(n) if n.as_f64() == Some(0.0) => None,
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    fn normalize(result: Value) -> ScrapeResult {
        let mut payload = match result {
            Value::Object(mut obj) => match obj.remove("data") {
                Some(data) if !data.is_null() => data,
                _ => Value::Object(obj),
            },
            other => other,
        };

        let list = payload
            .as_object()
            .filter(|obj| obj.get("type").and_then(Value::as_str) == Some("list"))
            .and_then(|obj| obj.get("data"))
            .and_then(Value::as_array)
            .cloned();

        if let Some(items) = list {
            if let Some(obj) = payload.as_object_mut() {
                obj.insert("count".to_string(), Value::from(items.len()));
            }
            return ScrapeResult {
                payload,
                items,
                list_shaped: true,
            };
        }

        if let Value::Array(items) = &payload {
            let items = items.clone();
            return ScrapeResult {
                payload,
                items,
                list_shaped: true,
            };
        }

        ScrapeResult {
            items: vec![payload.clone()],
            payload,
            list_shaped: false,
        }
    }
}
