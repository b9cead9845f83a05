/*
 * src/pipeline/trip_chat.rs
 *
 * File for the Trip Chat Assistant
 *
 * Purpose:
 *   Free-form NL message → `{assistant_message, trip_updates}` via a
 *   structured LLM call (spec.md §4.13), grounded on
 *   `original_source/src/application/trip_chat.py`. Responses are
 *   cached in-process keyed by (trip id, normalized message) for one hour,
 *   so repeated identical messages within a session skip the LLM round trip.
 *
 * Include:
 *   TripUpdates    - the merge-shaped fields the assistant may propose
 *   ChatResponse   - assistant_message + trip_updates
 *   handle_message - entry point; applies the merge and persists the trip
 */

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::domain::trip_spec::{Budget, Pace, StructuredPreference, TripSpec};
use crate::error::CoreResult;
use crate::ports::Deps;

const CACHE_TTL: Duration = Duration::hours(1);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TripUpdates {
	pub interests: Option<Vec<String>>,
	pub additional_preferences: Option<HashMap<String, String>>,
	pub structured_preferences: Option<Vec<StructuredPreference>>,
	pub pace: Option<Pace>,
	pub budget: Option<Budget>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
	pub assistant_message: String,
	pub trip_updates: TripUpdates,
}

struct CacheEntry {
	inserted_at: DateTime<Utc>,
	response: ChatResponse,
}

static RESPONSE_CACHE: Lazy<Mutex<HashMap<(Uuid, String), CacheEntry>>> = Lazy::new(|| Mutex::new(HashMap::new()));

/// Lowercases and collapses whitespace so trivially-different phrasing of
/// the same message still hits the cache.
fn normalize_message(message: &str) -> String {
	message.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

fn cache_get(trip_id: Uuid, normalized: &str, now: DateTime<Utc>) -> Option<ChatResponse> {
	let guard = RESPONSE_CACHE.lock().unwrap();
	guard.get(&(trip_id, normalized.to_string())).and_then(|entry| {
		if now - entry.inserted_at < CACHE_TTL {
			Some(entry.response.clone())
		} else {
			None
		}
	})
}

fn cache_put(trip_id: Uuid, normalized: String, response: ChatResponse, now: DateTime<Utc>) {
	RESPONSE_CACHE.lock().unwrap().insert((trip_id, normalized), CacheEntry { inserted_at: now, response });
}

/// §4.13 merge rules: interests union, additional_preferences dict merge
/// (new overrides), structured_preferences append, pace/budget override
/// when provided. Every other `TripSpec` field is untouched.
fn merge_updates(trip: &mut TripSpec, updates: &TripUpdates) {
	if let Some(interests) = &updates.interests {
		for interest in interests {
			if !trip.interests.iter().any(|existing| existing.eq_ignore_ascii_case(interest)) {
				trip.interests.push(interest.clone());
			}
		}
	}
	if let Some(prefs) = &updates.additional_preferences {
		for (key, value) in prefs {
			trip.additional_preferences.insert(key.clone(), value.clone());
		}
	}
	if let Some(structured) = &updates.structured_preferences {
		trip.structured_preferences.extend(structured.iter().cloned());
	}
	if let Some(pace) = updates.pace {
		trip.pace = pace;
	}
	if let Some(budget) = updates.budget {
		trip.budget = budget;
	}
}

fn build_prompt(trip: &TripSpec, message: &str) -> String {
	format!(
		"Trip to {} (pace: {:?}, budget: {:?}, interests: {:?}). User says: \"{}\". \
		 Reply with assistant_message and any trip_updates (interests/additional_preferences/\
		 structured_preferences/pace/budget) the message implies; omit fields it does not touch.",
		trip.city, trip.pace, trip.budget, trip.interests, message
	)
}

/// Entry point: takes the user's message, asks the LLM for a structured
/// reply, merges any `trip_updates` into `trip`, persists it, and returns
/// the full response. Falls back to an update-free acknowledgement on any
/// LLM failure per §9's fallback contract.
pub async fn handle_message(deps: &Deps, trip: &mut TripSpec, message: &str) -> CoreResult<ChatResponse> {
	let now = Utc::now();
	let normalized = normalize_message(message);

	if let Some(cached) = cache_get(trip.id, &normalized, now) {
		merge_updates(trip, &cached.trip_updates);
		deps.repository.put_trip(trip).await?;
		return Ok(cached);
	}

	let prompt = build_prompt(trip, message);
	let response = match deps
		.llm
		.generate_structured(&prompt, Some("You are a trip planning assistant. Respond with JSON only."), 500)
		.await
		.and_then(|value| parse_response(&value))
	{
		Ok(parsed) => parsed,
		Err(err) => {
			warn!(stage = "trip_chat", trip_id = %trip.id, reason = %err, "chat LLM call failed, returning update-free reply");
			ChatResponse {
				assistant_message: "I noted your message, but couldn't extract any trip changes from it right now."
					.to_string(),
				trip_updates: TripUpdates::default(),
			}
		}
	};

	merge_updates(trip, &response.trip_updates);
	deps.repository.put_trip(trip).await?;
	cache_put(trip.id, normalized, response.clone(), now);

	Ok(response)
}

fn parse_response(value: &serde_json::Value) -> CoreResult<ChatResponse> {
	serde_json::from_value(value.clone())
		.map_err(|e| crate::error::Error::ProviderUnavailable(format!("malformed chat response: {e}")))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::test_deps;
	use chrono::NaiveDate;
	use std::collections::HashMap as StdHashMap;

	fn trip() -> TripSpec {
		TripSpec {
			id: Uuid::new_v4(),
			city: "Lisbon".into(),
			city_center: (38.7223, -9.1393),
			start_date: NaiveDate::from_ymd_opt(2026, 8, 1).unwrap(),
			end_date: NaiveDate::from_ymd_opt(2026, 8, 3).unwrap(),
			traveler_count: 2,
			pace: Pace::Medium,
			budget: Budget::Medium,
			interests: vec!["food".into()],
			daily_routine: Default::default(),
			hotel: crate::domain::trip_spec::Hotel { text: "H".into(), lat: 38.71, lon: -9.14 },
			additional_preferences: StdHashMap::new(),
			structured_preferences: vec![],
			owner: crate::domain::trip_spec::Owner::LegacyPublic,
		}
	}

	#[test]
	fn merge_unions_interests_without_duplicates() {
		let mut t = trip();
		let updates = TripUpdates { interests: Some(vec!["Food".into(), "hiking".into()]), ..Default::default() };
		merge_updates(&mut t, &updates);
		assert_eq!(t.interests, vec!["food".to_string(), "hiking".to_string()]);
	}

	#[test]
	fn merge_overrides_additional_preferences_by_key() {
		let mut t = trip();
		t.additional_preferences.insert("seating".into(), "indoor".into());
		let mut incoming = HashMap::new();
		incoming.insert("seating".to_string(), "outdoor".to_string());
		let updates = TripUpdates { additional_preferences: Some(incoming), ..Default::default() };
		merge_updates(&mut t, &updates);
		assert_eq!(t.additional_preferences.get("seating").unwrap(), "outdoor");
	}

	#[test]
	fn merge_overrides_pace_and_budget_when_provided() {
		let mut t = trip();
		let updates = TripUpdates { pace: Some(Pace::Fast), budget: Some(Budget::High), ..Default::default() };
		merge_updates(&mut t, &updates);
		assert_eq!(t.pace, Pace::Fast);
		assert_eq!(t.budget, Budget::High);
	}

	#[tokio::test]
	async fn llm_failure_falls_back_to_update_free_reply() {
		let deps = test_deps();
		let mut t = trip();
		let response = handle_message(&deps, &mut t, "surprise me").await.unwrap();
		assert!(response.trip_updates.interests.is_none());
		assert_eq!(t.interests, vec!["food".to_string()]);
	}
}
