//! Turns the model's free-text answer into an [`AnalysisResult`].
//!
//! The output is untrusted: it may be wrapped in markdown fences, carry a
//! sentence of prose, miss fields or use strings where numbers belong.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

use crate::models::{AnalysisResult, DEFAULT_CALORIES, DEFAULT_FRESHNESS, DEFAULT_SUMMARY};

fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    // Opening fences may carry a language tag (```json, ```JSON, ```javascript)
    FENCE.get_or_init(|| Regex::new(r"```[A-Za-z0-9_+-]*\s*").expect("valid fence regex"))
}

/// Removes every markdown code-fence marker and trims the rest.
pub fn strip_code_fences(text: &str) -> String {
    fence_regex().replace_all(text.trim(), "").trim().to_string()
}

/// Parses a sanitized model answer. `None` means the text held no JSON
/// object at all and the caller should use the fallback result.
pub fn parse_analysis(text: &str) -> Option<AnalysisResult> {
    let cleaned = strip_code_fences(text);

    let value = match serde_json::from_str::<Value>(&cleaned) {
        Ok(value) => value,
        Err(e) => {
            log::debug!("Direct JSON parse failed ({}), looking for an embedded object", e);
            let embedded = outermost_object(&cleaned)?;
            serde_json::from_str::<Value>(embedded).ok()?
        }
    };

    match value {
        Value::Object(fields) => Some(coerce_fields(&fields)),
        other => {
            log::warn!("Model answer is JSON but not an object: {}", other);
            None
        }
    }
}

fn outermost_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

fn coerce_fields(fields: &Map<String, Value>) -> AnalysisResult {
    let missing: Vec<&str> = ["freshness", "calories", "summary"]
        .into_iter()
        .filter(|key| !fields.contains_key(*key))
        .collect();
    if !missing.is_empty() {
        log::warn!("Model answer is missing {:?}, substituting defaults", missing);
    }

    AnalysisResult {
        freshness: fields
            .get("freshness")
            .and_then(int_from_value)
            .unwrap_or(DEFAULT_FRESHNESS),
        calories: fields
            .get("calories")
            .and_then(int_from_value)
            .unwrap_or(DEFAULT_CALORIES),
        summary: fields
            .get("summary")
            .and_then(string_from_value)
            .unwrap_or_else(|| DEFAULT_SUMMARY.to_string()),
    }
}

/// Integer from a JSON number or numeric string; floats truncate toward zero.
pub fn int_from_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(truncate)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(truncate))
        }
        _ => None,
    }
}

fn truncate(f: f64) -> Option<i64> {
    (f.is_finite() && f.abs() < i64::MAX as f64).then(|| f.trunc() as i64)
}

/// String from any JSON value except `null`.
pub fn string_from_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PLAIN: &str = r#"{"freshness": 85, "calories": 320, "summary": "Nasi goreng dengan telur."}"#;

    fn expected() -> AnalysisResult {
        AnalysisResult {
            freshness: 85,
            calories: 320,
            summary: "Nasi goreng dengan telur.".to_string(),
        }
    }

    #[test]
    fn test_fenced_and_plain_parse_identically() {
        let tagged = format!("```json\n{}\n```", PLAIN);
        let untagged = format!("```\n{}\n```", PLAIN);
        let upper = format!("  ```JSON {}```  ", PLAIN);

        assert_eq!(parse_analysis(PLAIN), Some(expected()));
        assert_eq!(parse_analysis(&tagged), Some(expected()));
        assert_eq!(parse_analysis(&untagged), Some(expected()));
        assert_eq!(parse_analysis(&upper), Some(expected()));
    }

    #[test]
    fn test_prose_around_object() {
        let text = format!("Berikut hasil analisis:\n{}\nSemoga membantu!", PLAIN);
        assert_eq!(parse_analysis(&text), Some(expected()));
    }

    #[test]
    fn test_missing_fields_get_defaults() {
        let result = parse_analysis(r#"{"freshness": "90", "summary": "Salad segar."}"#).unwrap();

        assert_eq!(result.freshness, 90);
        assert_eq!(result.calories, DEFAULT_CALORIES);
        assert_eq!(result.summary, "Salad segar.");

        let result = parse_analysis("{}").unwrap();
        assert_eq!(result, AnalysisResult::fallback());
    }

    #[test]
    fn test_string_numbers_are_coerced() {
        let result =
            parse_analysis(r#"{"freshness": " 70 ", "calories": "450.8", "summary": 12}"#).unwrap();

        assert_eq!(result.freshness, 70);
        assert_eq!(result.calories, 450);
        assert_eq!(result.summary, "12");
    }

    #[test]
    fn test_out_of_range_values_pass_through() {
        let result =
            parse_analysis(r#"{"freshness": 140, "calories": -20, "summary": "Aneh."}"#).unwrap();

        assert_eq!(result.freshness, 140);
        assert_eq!(result.calories, -20);
    }

    #[test]
    fn test_unparseable_answers() {
        assert_eq!(parse_analysis("Maaf, saya tidak bisa melihat gambar ini."), None);
        assert_eq!(parse_analysis("```json\n{\"freshness\": 80,\n```"), None);
        assert_eq!(parse_analysis("[1, 2, 3]"), None);
        assert_eq!(parse_analysis(""), None);
    }

    #[test]
    fn test_value_coercion() {
        assert_eq!(int_from_value(&json!(42)), Some(42));
        assert_eq!(int_from_value(&json!(42.9)), Some(42));
        assert_eq!(int_from_value(&json!("17")), Some(17));
        assert_eq!(int_from_value(&json!("banyak")), None);
        assert_eq!(int_from_value(&json!(null)), None);
        assert_eq!(int_from_value(&json!(true)), None);

        assert_eq!(string_from_value(&json!("ok")), Some("ok".to_string()));
        assert_eq!(string_from_value(&json!(false)), Some("false".to_string()));
        assert_eq!(string_from_value(&json!(null)), None);
        assert_eq!(string_from_value(&json!(["a"])), Some(r#"["a"]"#.to_string()));
    }
}
