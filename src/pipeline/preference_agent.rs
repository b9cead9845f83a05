/*
 * src/pipeline/preference_agent.rs
 *
 * File for the Preference Agent
 *
 * Purpose:
 *   Builds a `PreferenceProfile` from a `TripSpec`, either via LLM (taxonomy
 *   -constrained prompt) or heuristics (spec.md §4.1), grounded on
 *   `original_source/src/application/poi_agent.py`'s
 *   `POIPreferenceAgent`/`_build_heuristic_profile`.
 *
 * Include:
 *   build_profile - entry point; tries LLM when enabled, always falls back
 */

use serde_json::Value;
use tracing::warn;

use crate::domain::poi::PreferenceProfile;
use crate::domain::trip_spec::{PriceLevel, TripSpec};
use crate::ports::{Deps, LlmGateway};

const SYSTEM_PROMPT: &str = r#"You are a travel preference analyzer.
Extract preference signals for POI ranking. Return ONLY JSON.

Constraints:
- Use only the provided taxonomy keys for category_boosts:
  restaurant, cafe, bar, museum, attraction, park, shopping, nightlife, wellness
- Keep keyword lists short (<= 6 items each).
- min_rating must be between 3.5 and 4.8.
- preferred_price_levels must be a list of 0-4 integers."#;

pub async fn build_profile(deps: &Deps, trip: &TripSpec) -> PreferenceProfile {
	if !deps.settings.use_llm_for_poi_preferences {
		return heuristic_profile(trip);
	}

	let payload = serde_json::json!({
		"city": trip.city,
		"interests": trip.interests,
		"additional_preferences": trip.additional_preferences,
	});
	let prompt = format!(
		"Trip preferences (JSON):\n{payload}\n\nReturn JSON with must_include_keywords, avoid_keywords, \
		 search_keywords, category_boosts, tag_boosts, min_rating, preferred_price_levels, rating_weight, \
		 popularity_weight, price_level_weight."
	);

	match deps.llm.generate_structured(&prompt, Some(SYSTEM_PROMPT), 512).await {
		Ok(response) => {
			let mut profile = parse_llm_profile(&response);
			profile.structured_preferences = trip.structured_preferences.clone();
			profile.clamp_min_rating();
			profile
		}
		Err(err) => {
			warn!(stage = "preference_agent", reason = %err, "llm profile failed, falling back to heuristics");
			heuristic_profile(trip)
		}
	}
}

fn parse_llm_profile(response: &Value) -> PreferenceProfile {
	let strings = |key: &str| -> Vec<String> {
		response[key]
			.as_array()
			.map(|a| a.iter().filter_map(|v| v.as_str()).map(|s| s.to_lowercase()).collect())
			.unwrap_or_default()
	};
	let floats = |key: &str| -> std::collections::HashMap<String, f64> {
		response[key]
			.as_object()
			.map(|o| o.iter().filter_map(|(k, v)| v.as_f64().map(|f| (k.clone(), f))).collect())
			.unwrap_or_default()
	};

	PreferenceProfile {
		must_include_keywords: strings("must_include_keywords"),
		avoid_keywords: strings("avoid_keywords"),
		search_keywords: strings("search_keywords"),
		category_boosts: floats("category_boosts"),
		tag_boosts: floats("tag_boosts"),
		min_rating: response["min_rating"].as_f64().unwrap_or(4.2),
		preferred_price_levels: response["preferred_price_levels"]
			.as_array()
			.map(|a| a.iter().filter_map(|v| v.as_u64()).map(|v| v as u8).collect())
			.unwrap_or_default(),
		rating_weight: response["rating_weight"].as_f64().unwrap_or(1.0),
		popularity_weight: response["popularity_weight"].as_f64().unwrap_or(0.25),
		price_level_weight: response["price_level_weight"].as_f64().unwrap_or(1.5),
		structured_preferences: Vec::new(),
	}
}

/// Keyword heuristics, grounded on
/// `original_source/src/application/poi_agent.py:_build_heuristic_profile`.
pub fn heuristic_profile(trip: &TripSpec) -> PreferenceProfile {
	let interests = trip.interests.join(" ").to_lowercase();
	let prefs = trip
		.additional_preferences
		.values()
		.cloned()
		.collect::<Vec<_>>()
		.join(" ")
		.to_lowercase();
	let text = format!("{interests} {prefs}");

	let mut profile = PreferenceProfile::default();
	profile.structured_preferences = trip.structured_preferences.clone();

	if text.contains("michelin") || text.contains("star restaurant") || text.contains("fine dining") {
		profile.must_include_keywords = vec!["michelin".into(), "fine dining".into(), "tasting".into()];
		profile.search_keywords = vec!["michelin".into(), "fine dining".into()];
		profile.tag_boosts.insert("michelin".into(), 4.0);
		profile.tag_boosts.insert("fine dining".into(), 2.5);
		profile.min_rating = 4.5;
		profile.preferred_price_levels = vec![3, 4];
	}

	if text.contains("budget") || text.contains("cheap") {
		profile.preferred_price_levels = vec![0, 1];
		profile.min_rating = profile.min_rating.min(4.2);
	}

	if text.contains("expensive") {
		profile.preferred_price_levels = vec![3, 4];
		profile.min_rating = 4.4;
	}

	if text.contains("shop") {
		profile.category_boosts.insert("shopping".into(), 8.0);
		*profile.category_boosts.entry("museum".into()).or_insert(0.0) -= 3.0;
	}

	if text.contains("nightlife") || text.contains("club") {
		profile.category_boosts.insert("nightlife".into(), 8.0);
		profile.category_boosts.insert("bar".into(), 6.0);
		*profile.category_boosts.entry("museum".into()).or_insert(0.0) -= 3.0;
	}

	if text.contains("museum") || text.contains("history") {
		profile.category_boosts.insert("museum".into(), 10.0);
		profile.category_boosts.insert("art_gallery".into(), 8.0);
		profile.category_boosts.insert("attraction".into(), 3.0);
		*profile.category_boosts.entry("shopping".into()).or_insert(0.0) -= 4.0;
		*profile.category_boosts.entry("nightlife".into()).or_insert(0.0) -= 4.0;
	}

	if text.contains("modern art") || (text.contains("art") && !text.contains("museum")) {
		profile.category_boosts.insert("art_gallery".into(), 10.0);
		profile.category_boosts.insert("museum".into(), 4.0);
		profile.category_boosts.insert("attraction".into(), 3.0);
	}

	if text.contains("food") || text.contains("gastronomy") || text.contains("culinary") {
		profile.category_boosts.insert("restaurant".into(), 8.0);
		profile.category_boosts.insert("cafe".into(), 5.0);
	}

	if text.contains("architecture") || text.contains("view") || text.contains("landmark") {
		profile.category_boosts.insert("attraction".into(), 10.0);
		profile.category_boosts.insert("park".into(), 5.0);
		if !text.contains("museum") && !text.contains("art") {
			*profile.category_boosts.entry("museum".into()).or_insert(0.0) -= 6.0;
		}
		*profile.category_boosts.entry("shopping".into()).or_insert(0.0) -= 3.0;
	}

	for sp in &profile.structured_preferences.clone() {
		if let Some(keyword) = &sp.keyword {
			profile.search_keywords.push(keyword.clone());
			profile.must_include_keywords.push(keyword.clone());
		}
		if let Some(price_level) = sp.price_level {
			profile.preferred_price_levels = match price_level {
				PriceLevel::Expensive => vec![3, 4],
				PriceLevel::Moderate => vec![2],
				PriceLevel::Cheap => vec![0, 1],
			};
		}
	}

	profile.clamp_min_rating();
	profile
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::NaiveDate;
	use std::collections::HashMap;

	fn trip(interests: Vec<&str>) -> TripSpec {
		TripSpec {
			id: uuid::Uuid::nil(),
			city: "Paris".into(),
			city_center: (48.8566, 2.3522),
			start_date: NaiveDate::from_ymd_opt(2026, 7, 1).unwrap(),
			end_date: NaiveDate::from_ymd_opt(2026, 7, 3).unwrap(),
			traveler_count: 2,
			pace: crate::domain::trip_spec::Pace::Medium,
			budget: crate::domain::trip_spec::Budget::Medium,
			interests: interests.into_iter().map(String::from).collect(),
			daily_routine: Default::default(),
			hotel: crate::domain::trip_spec::Hotel { text: "H".into(), lat: 48.85, lon: 2.35 },
			additional_preferences: HashMap::new(),
			structured_preferences: vec![],
			owner: crate::domain::trip_spec::Owner::LegacyPublic,
		}
	}

	#[test]
	fn museum_interest_boosts_museum_and_penalizes_shopping() {
		let profile = heuristic_profile(&trip(vec!["museum", "history"]));
		assert!(profile.category_boosts["museum"] >= 8.0);
		assert!(profile.category_boosts.get("shopping").copied().unwrap_or(0.0) <= -3.0);
	}

	#[test]
	fn min_rating_always_clamped() {
		let profile = heuristic_profile(&trip(vec!["michelin"]));
		assert!((3.5..=4.8).contains(&profile.min_rating));
	}

	#[test]
	fn budget_sets_low_price_levels() {
		let profile = heuristic_profile(&trip(vec!["budget travel"]));
		assert_eq!(profile.preferred_price_levels, vec![0, 1]);
	}
}
