/*
 * src/pipeline/poi_planner.rs
 *
 * File for the POI Planner
 *
 * Purpose:
 *   Per macro day, fetches candidates per block, applies the hotel-anchor
 *   bias, trip-wide dedup, preference filters, §4.12 scoring, optional
 *   LLM day-level selection, and long-hop repair (spec.md §4.5), grounded on
 *   `original_source/src/application/poi_planner.py`.
 *
 * Include:
 *   plan_pois - entry point; produces POIPlanBlock[] for the whole trip
 */

use std::collections::{HashMap, HashSet};

use tracing::warn;
use uuid::Uuid;

use crate::domain::poi::{POICandidate, PreferenceProfile};
use crate::domain::skeleton::{BlockType, DaySkeleton};
use crate::domain::trip_spec::TripSpec;
use crate::domain::itinerary::POIPlanBlock;
use crate::pipeline::poi_selection_llm;
use crate::pipeline::scoring::{filter_candidates_for_block, score_candidate, haversine_km, ScoreContext};
use crate::ports::catalog::PoiSearchQuery;
use crate::ports::{Deps, PlacesCatalog};

/// Produces `POIPlanBlock[]` across every macro day, maintaining trip-wide
/// POI dedup and a running hotel/previous-day anchor (§4.5 steps 1-9).
///
/// Within a day, candidates for every active block are gathered first
/// (§4.5 step 5); if `use_llm_for_poi_selection` and
/// `enable_day_level_poi_selection` are both set, the §4.11 LLM service
/// batch-selects one pick per block from those pools before the final
/// per-block pass applies the pick (or the per-block LLM fallback, or the
/// deterministic top-scored order) and the long-hop repair (step 7).
pub async fn plan_pois(deps: &Deps, trip: &TripSpec, skeletons: &[DaySkeleton], profile: &PreferenceProfile) -> Vec<POIPlanBlock> {
	let mut plan = Vec::new();
	let mut trip_wide_selected: HashSet<Uuid> = HashSet::new();
	let mut previous_day_anchor = (trip.hotel.lat, trip.hotel.lon);

	for skeleton in skeletons {
		let mut day_anchor_blocks_used = 0usize;
		let mut pools: HashMap<usize, Vec<POICandidate>> = HashMap::new();
		let mut provisional_anchor = previous_day_anchor;

		for (block_index, block) in skeleton.blocks.iter().enumerate() {
			if !block.block_type.is_active() {
				continue;
			}

			let scored = gather_scored_candidates(
				deps,
				trip,
				block,
				profile,
				provisional_anchor,
				&mut day_anchor_blocks_used,
				&trip_wide_selected,
			)
			.await;

			if scored.is_empty() {
				warn!(
					stage = "poi_planner",
					day = skeleton.day_number,
					block = block_index,
					"no candidates available for block after filtering"
				);
				continue;
			}
			if let Some(coords) = scored[0].coords() {
				provisional_anchor = coords;
			}
			pools.insert(block_index, scored);
		}

		let day_level_picks = if deps.settings.use_llm_for_poi_selection && deps.settings.enable_day_level_poi_selection {
			poi_selection_llm::select_day(deps, trip, skeleton, &pools, &trip_wide_selected).await
		} else {
			HashMap::new()
		};

		for (block_index, block) in skeleton.blocks.iter().enumerate() {
			let Some(mut scored) = pools.remove(&block_index) else { continue };

			let llm_pick = match day_level_picks.get(&block_index) {
				Some(poi_id) => Some(*poi_id),
				None if deps.settings.use_llm_for_poi_selection => {
					poi_selection_llm::select_block(deps, trip, skeleton, block_index, &scored).await
				}
				None => None,
			};
			if let Some(poi_id) = llm_pick {
				move_candidate_to_front(&mut scored, poi_id);
			}

			let repaired = repair_long_hop(deps, &scored, previous_day_anchor, &trip_wide_selected);

			if let Some(selected) = repaired.first() {
				trip_wide_selected.insert(selected.poi_id);
				if let Some(coords) = selected.coords() {
					previous_day_anchor = coords;
				}
			}

			plan.push(POIPlanBlock {
				day_number: skeleton.day_number,
				block_index,
				block_theme: block.theme.clone(),
				block_type: block.block_type,
				candidates: repaired,
			});
		}
	}

	plan
}

/// Fetches, dedups, preference-filters, §4.12-scores, sorts and truncates
/// the candidate pool for one active block (§4.5 steps 2-6).
async fn gather_scored_candidates(
	deps: &Deps,
	trip: &TripSpec,
	block: &crate::domain::skeleton::SkeletonBlock,
	profile: &PreferenceProfile,
	anchor: (f64, f64),
	day_anchor_blocks_used: &mut usize,
	trip_wide_selected: &HashSet<Uuid>,
) -> Vec<POICandidate> {
	let candidates = fetch_candidates(deps, trip, block, profile).await;
	let hotel_anchor_active = deps.settings.hotel_anchor_enabled && *day_anchor_blocks_used < deps.settings.hotel_anchor_blocks;
	if hotel_anchor_active {
		*day_anchor_blocks_used += 1;
	}

	let filtered: Vec<POICandidate> = candidates.into_iter().filter(|c| !trip_wide_selected.contains(&c.poi_id)).collect();
	let filtered = filter_candidates_for_block(&filtered, profile, block.block_type);

	let ctx = ScoreContext {
		anchor: if hotel_anchor_active { Some(anchor) } else { None },
		day_center: None,
		distance_weight: deps.settings.hotel_anchor_distance_weight,
	};
	let mut scored: Vec<POICandidate> = filtered;
	scored.sort_by(|a, b| {
		score_candidate(b, block.block_type, profile, &ctx)
			.partial_cmp(&score_candidate(a, block.block_type, profile, &ctx))
			.unwrap_or(std::cmp::Ordering::Equal)
	});
	scored.truncate(deps.settings.poi_selection_max_candidates.max(1));
	scored
}

/// Moves the candidate matching `poi_id`, if present, to the front of
/// `scored` without disturbing the relative order of the rest.
fn move_candidate_to_front(scored: &mut Vec<POICandidate>, poi_id: Uuid) {
	if let Some(idx) = scored.iter().position(|c| c.poi_id == poi_id) {
		let picked = scored.remove(idx);
		scored.insert(0, picked);
	}
}

async fn fetch_candidates(deps: &Deps, trip: &TripSpec, block: &crate::domain::skeleton::SkeletonBlock, profile: &PreferenceProfile) -> Vec<POICandidate> {
	let query = PoiSearchQuery {
		city: trip.city.clone(),
		desired_categories: block.desired_categories.clone(),
		budget: Some(trip.budget),
		limit: deps.settings.candidates_per_block * 2,
		center_location: None,
		city_center: Some(trip.city_center),
		max_radius_km: Some(deps.settings.max_radius_km),
		block_type: Some(block.block_type),
		search_keywords: if block.block_type == BlockType::Meal { profile.search_keywords.clone() } else { Vec::new() },
	};

	match deps.catalog.search_pois(query).await {
		Ok(candidates) => candidates,
		Err(err) => {
			warn!(stage = "poi_planner", reason = %err, "places catalog fetch failed, continuing with no candidates");
			Vec::new()
		}
	}
}

/// §4.5 step 7: replace the first candidate with the best fitting alternative
/// whenever it sits farther than `max_hop_distance_km` from the anchor.
fn repair_long_hop(
	deps: &Deps,
	scored: &[POICandidate],
	anchor: (f64, f64),
	trip_wide_selected: &HashSet<Uuid>,
) -> Vec<POICandidate> {
	if !deps.settings.enable_travel_hop_limit || scored.is_empty() {
		return scored.to_vec();
	}

	let top = &scored[0];
	let within_limit = top
		.coords()
		.map(|(lat, lon)| haversine_km(anchor.0, anchor.1, lat, lon) <= deps.settings.max_hop_distance_km)
		.unwrap_or(true);
	if within_limit {
		return scored.to_vec();
	}

	let replacement_index = scored.iter().skip(1).position(|c| {
		!trip_wide_selected.contains(&c.poi_id)
			&& c.coords()
				.map(|(lat, lon)| haversine_km(anchor.0, anchor.1, lat, lon) <= deps.settings.max_hop_distance_km)
				.unwrap_or(false)
	});

	match replacement_index {
		Some(idx) => {
			let mut repaired = scored.to_vec();
			repaired.swap(0, idx + 1);
			repaired
		}
		None => scored.to_vec(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn candidate(poi_id: Uuid, lat: f64, lon: f64, rank_score: f64) -> POICandidate {
		POICandidate {
			poi_id,
			name: "P".into(),
			category: "museum".into(),
			tags: vec![],
			rating: Some(4.5),
			user_ratings_total: Some(100),
			price_level: None,
			business_status: None,
			open_now: None,
			address: None,
			lat: Some(lat),
			lon: Some(lon),
			description: None,
			reviews: vec![],
			rank_score,
		}
	}

	fn settings_with_hop_limit(km: f64) -> crate::config::Settings {
		let mut s = crate::config::Settings::default();
		s.enable_travel_hop_limit = true;
		s.max_hop_distance_km = km;
		s
	}

	#[test]
	fn repair_keeps_top_candidate_within_limit() {
		let scored = vec![candidate(Uuid::new_v4(), 48.86, 2.35, 10.0)];
		let deps = test_deps(settings_with_hop_limit(50.0));
		let repaired = repair_long_hop(&deps, &scored, (48.86, 2.35), &HashSet::new());
		assert_eq!(repaired[0].poi_id, scored[0].poi_id);
	}

	#[test]
	fn repair_swaps_in_nearer_alternative_when_top_is_too_far() {
		let far = candidate(Uuid::new_v4(), 49.50, 3.00, 10.0);
		let near = candidate(Uuid::new_v4(), 48.86, 2.351, 5.0);
		let scored = vec![far.clone(), near.clone()];
		let deps = test_deps(settings_with_hop_limit(8.0));
		let repaired = repair_long_hop(&deps, &scored, (48.86, 2.35), &HashSet::new());
		assert_eq!(repaired[0].poi_id, near.poi_id);
	}

	fn test_deps(settings: crate::config::Settings) -> Deps {
		crate::testing::test_deps_with_settings(settings)
	}

	fn skeleton_with_one_activity_block() -> DaySkeleton {
		use chrono::{NaiveDate, NaiveTime};
		DaySkeleton {
			day_number: 1,
			date: NaiveDate::from_ymd_opt(2026, 7, 1).unwrap(),
			theme: "Day".into(),
			blocks: vec![crate::domain::skeleton::SkeletonBlock {
				block_type: BlockType::Activity,
				start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
				end_time: NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
				theme: String::new(),
				desired_categories: vec!["museum".to_string()],
			}],
		}
	}

	fn test_trip() -> TripSpec {
		use chrono::NaiveDate;
		TripSpec {
			id: Uuid::nil(),
			city: "Paris".into(),
			city_center: (48.8566, 2.3522),
			start_date: NaiveDate::from_ymd_opt(2026, 7, 1).unwrap(),
			end_date: NaiveDate::from_ymd_opt(2026, 7, 1).unwrap(),
			traveler_count: 1,
			pace: crate::domain::trip_spec::Pace::Medium,
			budget: crate::domain::trip_spec::Budget::Medium,
			interests: vec![],
			daily_routine: Default::default(),
			hotel: crate::domain::trip_spec::Hotel { text: "H".into(), lat: 48.85, lon: 2.35 },
			additional_preferences: Default::default(),
			structured_preferences: vec![],
			owner: crate::domain::trip_spec::Owner::LegacyPublic,
		}
	}

	#[tokio::test]
	async fn day_level_llm_pick_is_promoted_to_front_when_flags_enabled() {
		let preferred = candidate(Uuid::new_v4(), 48.86, 2.35, 1.0);
		let top_scored = candidate(Uuid::new_v4(), 48.86, 2.351, 10.0);
		let pois = vec![top_scored.clone(), preferred.clone()];

		let mut settings = crate::config::Settings::default();
		settings.use_llm_for_poi_selection = true;
		settings.enable_day_level_poi_selection = true;

		let deps = Deps {
			settings,
			repository: std::sync::Arc::new(crate::testing::InMemoryRepository::new()),
			catalog: std::sync::Arc::new(crate::testing::NullPlacesCatalog { pois }),
			travel_time: std::sync::Arc::new(crate::testing::NullTravelTimeService),
			llm: std::sync::Arc::new(crate::testing::StubLlmGateway {
				structured_response: serde_json::json!({
					"selections": [{"block_index": 0, "poi_id": preferred.poi_id.to_string()}]
				}),
				text_response: String::new(),
			}),
		};

		let skeletons = vec![skeleton_with_one_activity_block()];
		let plan = plan_pois(&deps, &test_trip(), &skeletons, &PreferenceProfile::default()).await;

		assert_eq!(plan.len(), 1);
		assert_eq!(plan[0].candidates.first().unwrap().poi_id, preferred.poi_id);
	}

	#[tokio::test]
	async fn deterministic_order_kept_when_llm_selection_disabled() {
		let first = candidate(Uuid::new_v4(), 48.86, 2.35, 10.0);
		let second = candidate(Uuid::new_v4(), 48.86, 2.351, 5.0);
		let pois = vec![first.clone(), second.clone()];

		let deps = crate::testing::test_deps_with_pois(pois);
		let skeletons = vec![skeleton_with_one_activity_block()];
		let plan = plan_pois(&deps, &test_trip(), &skeletons, &PreferenceProfile::default()).await;

		assert_eq!(plan.len(), 1);
		assert_eq!(plan[0].candidates.first().unwrap().poi_id, first.poi_id);
	}
}
