/*
 * src/ports/llm.rs
 *
 * File for the LLM Gateway capability
 *
 * Purpose:
 *   Two methods consumed by every LLM-assisted stage (spec.md §6):
 *   `generate_text` for free-form prose (trip chat replies) and
 *   `generate_structured` for JSON-shaped responses. The structured path
 *   must tolerate fenced or bare JSON, strip `//` line comments, and accept
 *   an explicit leading `+` on numbers — `json5` handles all three once the
 *   surrounding fence is stripped.
 *
 * Include:
 *   LlmGateway           - generate_text/generate_structured port
 *   extract_structured_json - the tolerant-parse helper every adapter and
 *                             fallback path shares
 */

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::error::{CoreResult, Error};

#[async_trait]
pub trait LlmGateway: Send + Sync {
	async fn generate_text(&self, prompt: &str, system: Option<&str>, max_tokens: u32) -> CoreResult<String>;

	/// Returns parsed JSON. Implementations should call
	/// [`extract_structured_json`] on the raw completion rather than
	/// re-deriving fence/comment tolerance themselves.
	async fn generate_structured(&self, prompt: &str, system: Option<&str>, max_tokens: u32) -> CoreResult<Value>;
}

static FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").unwrap());
/// A `//` that isn't inside a string literal is rare enough in LLM JSON that
/// a line-anchored strip is good enough without a full tokenizer.
static LINE_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)//[^\n]*$").unwrap());
static LEADING_PLUS_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"([:\[,]\s*)\+(\d)").unwrap());

/// Tolerant JSON extraction shared by every structured LLM call site: pulls
/// the first fenced block if present (else uses the raw text), strips line
/// comments, strips an explicit `+` prefix on numbers, then parses with
/// `json5` (which already tolerates trailing commas and comments).
///
/// Any failure here is the caller's cue to fall back deterministically
/// (spec.md §4.11, §6, §9).
pub fn extract_structured_json(raw: &str) -> CoreResult<Value> {
	let body = FENCE
		.captures(raw)
		.and_then(|c| c.get(1))
		.map(|m| m.as_str())
		.unwrap_or(raw)
		.trim();

	let without_comments = LINE_COMMENT.replace_all(body, "");
	let normalized = LEADING_PLUS_NUMBER.replace_all(&without_comments, "$1$2");

	json5::from_str(&normalized)
		.map_err(|e| Error::ProviderUnavailable(format!("llm response was not valid JSON: {e}")))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_fenced_json_with_comments_and_plus_numbers() {
		let raw = r#"Here is the plan:
```json
{
  // assignments for day 1
  "block_index": +0,
  "district_id": "A"
}
```"#;
		let v = extract_structured_json(raw).unwrap();
		assert_eq!(v["district_id"], "A");
		assert_eq!(v["block_index"], 0);
	}

	#[test]
	fn parses_bare_json() {
		let v = extract_structured_json(r#"{"a": 1}"#).unwrap();
		assert_eq!(v["a"], 1);
	}

	#[test]
	fn malformed_json_is_provider_unavailable() {
		let err = extract_structured_json("not json at all").unwrap_err();
		assert!(matches!(err, Error::ProviderUnavailable(_)));
	}
}
