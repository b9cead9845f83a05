/*
 * src/pipeline/scoring.rs
 *
 * File for the shared scoring function and haversine distance
 *
 * Purpose:
 *   Implements spec.md §4.12 field-for-field, grounded on
 *   `original_source/src/application/poi_agent.py:score_candidate`. Shared
 *   by the POI planner, smart route optimizer, and place replacement.
 *
 * Include:
 *   haversine_km    - great-circle distance in kilometers
 *   ScoreContext    - the optional anchor/day-center/weight inputs to scoring
 *   score_candidate - §4.12 scoring formula
 */

use crate::domain::poi::{POICandidate, PreferenceProfile};
use crate::domain::skeleton::BlockType;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Symmetric, zero on identical points, within 5% of the known great-circle
/// distance for the calibration pair in spec.md §8.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
	let lat1_rad = lat1.to_radians();
	let lat2_rad = lat2.to_radians();
	let delta_lat = (lat2 - lat1).to_radians();
	let delta_lon = (lon2 - lon1).to_radians();

	let a = (delta_lat / 2.0).sin().powi(2)
		+ lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
	let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

	EARTH_RADIUS_KM * c
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreContext {
	pub anchor: Option<(f64, f64)>,
	pub day_center: Option<(f64, f64)>,
	pub distance_weight: f64,
}

/// §4.12 scoring formula, verbatim from
/// `original_source/src/application/poi_agent.py:score_candidate`.
pub fn score_candidate(
	candidate: &POICandidate,
	block_type: BlockType,
	profile: &PreferenceProfile,
	ctx: &ScoreContext,
) -> f64 {
	let mut score = candidate.rank_score;

	if let Some(rating) = candidate.rating {
		score += profile.rating_weight * rating;
	}

	if let Some(total) = candidate.user_ratings_total {
		score += profile.popularity_weight * (total as f64).ln_1p();
	}

	if let Some(price_level) = candidate.price_level {
		if !profile.preferred_price_levels.is_empty() {
			if profile.preferred_price_levels.contains(&price_level) {
				score += profile.price_level_weight;
			} else {
				score -= profile.price_level_weight * 0.75;
			}
		}
	}

	if let Some(boost) = profile.category_boosts.get(&candidate.category) {
		score += boost;
	}

	let haystack = candidate.haystack();
	for (keyword, boost) in &profile.tag_boosts {
		if haystack.contains(keyword.as_str()) {
			score += boost;
		}
	}
	for keyword in &profile.must_include_keywords {
		if haystack.contains(keyword.as_str()) {
			score += 6.0;
		}
	}
	for keyword in &profile.avoid_keywords {
		if haystack.contains(keyword.as_str()) {
			score -= 5.0;
		}
	}

	for sp in &profile.structured_preferences {
		let mut matches = true;
		if let Some(keyword) = &sp.keyword {
			if !haystack.contains(&keyword.to_lowercase()) {
				matches = false;
			}
		}
		if let Some(category) = &sp.category {
			if !candidate.category.to_lowercase().contains(&category.to_lowercase()) {
				matches = false;
			}
		}
		if let (Some(price_level_pref), Some(price_level)) = (&sp.price_level, candidate.price_level) {
			if !price_level_pref.levels().contains(&price_level) {
				matches = false;
			}
		}
		if matches {
			score += 50.0;
		}
	}

	if let Some(status) = &candidate.business_status {
		if !status.eq_ignore_ascii_case("operational") {
			score -= 2.5;
		}
	}

	if block_type == BlockType::Meal && candidate.open_now == Some(false) {
		score -= 1.0;
	}

	if let Some((lat, lon)) = candidate.coords() {
		if let Some((alat, alon)) = ctx.anchor {
			score -= ctx.distance_weight * haversine_km(alat, alon, lat, lon);
		}
		if let Some((clat, clon)) = ctx.day_center {
			score -= (ctx.distance_weight * 0.5) * haversine_km(clat, clon, lat, lon);
		}
	}

	if block_type == BlockType::Meal {
		if let Some(rating) = candidate.rating {
			score += 0.25 * rating;
		}
	}

	score
}

/// §4.5 step 4 / `filter_candidates_for_block`: rating floor, operational
/// preference, then structured-preference / must-include narrowing.
pub fn filter_candidates_for_block(
	candidates: &[POICandidate],
	profile: &PreferenceProfile,
	block_type: BlockType,
) -> Vec<POICandidate> {
	if candidates.is_empty() {
		return Vec::new();
	}

	let mut filtered: Vec<POICandidate> =
		candidates.iter().filter(|c| c.rating.unwrap_or(0.0) >= profile.min_rating).cloned().collect();
	if filtered.is_empty() {
		filtered = candidates.to_vec();
	}

	if filtered.iter().any(|c| c.business_status.is_some()) {
		let operational: Vec<POICandidate> = filtered.iter().filter(|c| c.is_operational()).cloned().collect();
		if !operational.is_empty() {
			filtered = operational;
		}
	}

	let block_categories: &[&str] = match block_type {
		BlockType::Meal => &["restaurant", "cafe"],
		BlockType::Activity => &["museum", "attraction", "park"],
		BlockType::Nightlife => &["bar", "nightclub"],
		_ => &[],
	};

	let applicable_sp: Vec<_> = profile
		.structured_preferences
		.iter()
		.filter(|sp| sp.category.as_deref().is_some_and(|c| block_categories.contains(&c)))
		.collect();

	if !applicable_sp.is_empty() {
		let matched: Vec<POICandidate> = applicable_sp
			.iter()
			.flat_map(|sp| {
				filtered.iter().filter(move |c| {
					sp.keyword.as_deref().is_some_and(|kw| c.haystack().contains(&kw.to_lowercase()))
				})
			})
			.cloned()
			.collect();
		if !matched.is_empty() {
			return matched;
		}
	}

	if !profile.must_include_keywords.is_empty() && block_type == BlockType::Meal {
		let matched: Vec<POICandidate> = filtered
			.iter()
			.filter(|c| profile.must_include_keywords.iter().any(|kw| c.haystack().contains(kw.as_str())))
			.cloned()
			.collect();
		if !matched.is_empty() {
			return matched;
		}
	}

	filtered
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn haversine_calibration_paris_london() {
		let km = haversine_km(48.8566, 2.3522, 51.5074, -0.1278);
		assert!((km - 343.0).abs() / 343.0 < 0.05, "got {km}");
	}

	#[test]
	fn haversine_is_symmetric_and_zero_on_identity() {
		let a = haversine_km(48.8566, 2.3522, 51.5074, -0.1278);
		let b = haversine_km(51.5074, -0.1278, 48.8566, 2.3522);
		assert!((a - b).abs() < 1e-9);
		assert_eq!(haversine_km(1.0, 1.0, 1.0, 1.0), 0.0);
	}

	fn candidate(rating: f64, category: &str) -> POICandidate {
		POICandidate {
			poi_id: uuid::Uuid::new_v4(),
			name: "Place".into(),
			category: category.into(),
			tags: vec![],
			rating: Some(rating),
			user_ratings_total: Some(100),
			price_level: Some(2),
			business_status: Some("OPERATIONAL".into()),
			open_now: Some(true),
			address: None,
			lat: Some(48.86),
			lon: Some(2.35),
			description: None,
			reviews: vec![],
			rank_score: 1.0,
		}
	}

	#[test]
	fn category_boost_and_penalty_apply() {
		let mut profile = PreferenceProfile::default();
		profile.category_boosts.insert("museum".into(), 10.0);
		profile.category_boosts.insert("shopping".into(), -4.0);

		let museum = candidate(4.5, "museum");
		let shop = candidate(4.5, "shopping");
		let ctx = ScoreContext::default();

		let museum_score = score_candidate(&museum, BlockType::Activity, &profile, &ctx);
		let shop_score = score_candidate(&shop, BlockType::Activity, &profile, &ctx);
		assert!(museum_score > shop_score);
	}

	#[test]
	fn structured_preference_full_match_dominates() {
		let mut profile = PreferenceProfile::default();
		profile.structured_preferences.push(crate::domain::trip_spec::StructuredPreference {
			keyword: Some("jazz".into()),
			category: Some("bar".into()),
			price_level: None,
		});
		let mut matching = candidate(4.0, "bar");
		matching.name = "Jazz Bar".into();
		let non_matching = candidate(4.9, "bar");

		let ctx = ScoreContext::default();
		let matching_score = score_candidate(&matching, BlockType::Nightlife, &profile, &ctx);
		let non_matching_score = score_candidate(&non_matching, BlockType::Nightlife, &profile, &ctx);
		assert!(matching_score > non_matching_score);
	}
}
