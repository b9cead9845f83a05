/*
 * src/pipeline/fast_draft_planner.rs
 *
 * File for the Fast-Draft Planner
 *
 * Purpose:
 *   Low-latency itinerary draft (spec.md §4.14), grounded on
 *   `original_source/src/application/fast_draft_planner.py`. Trades the
 *   full macro→POI→route→critique pipeline for a hard-timeout LLM attempt,
 *   bounded-concurrency external fetch, and greedy POI assignment with no
 *   permutation search or critique pass.
 *
 * Include:
 *   fast_draft - entry point; returns a filled-in Itinerary
 */

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use tokio::sync::Semaphore;
use tracing::warn;

use crate::domain::itinerary::{Itinerary, ItineraryBlock, ItineraryDay};
use crate::domain::poi::POICandidate;
use crate::domain::skeleton::DaySkeleton;
use crate::domain::trip_spec::TripSpec;
use crate::pipeline::macro_planner::{deterministic_skeleton, plan_macro_days};
use crate::ports::catalog::PoiSearchQuery;
use crate::ports::travel_time::{haversine_fallback, TravelMode};
use crate::ports::{Deps, PlacesCatalog};

/// §4.14 step 1: attempts the themed LLM macro plan under a hard timeout;
/// any timeout or error falls back to the deterministic skeleton.
async fn skeleton_with_deadline(deps: &Deps, trip: &TripSpec) -> Vec<DaySkeleton> {
	let timeout = StdDuration::from_secs(deps.settings.fast_draft_llm_timeout_seconds);
	match tokio::time::timeout(timeout, plan_macro_days(deps, trip)).await {
		Ok(days) => days,
		Err(_) => {
			warn!(stage = "fast_draft_planner", trip_id = %trip.id, "macro planning exceeded the fast-draft timeout, using deterministic skeleton");
			deterministic_skeleton(trip)
		}
	}
}

/// §4.14 step 2: fetches candidates for every unique category referenced by
/// the skeleton, bounded by `fast_draft_external_concurrency` concurrent
/// calls and `fast_draft_per_category_limit` results per category, the
/// whole gather bounded by `fast_draft_fetch_deadline_seconds`.
async fn fetch_candidates_by_category(
	deps: &Deps,
	trip: &TripSpec,
	skeletons: &[DaySkeleton],
) -> HashMap<String, Vec<POICandidate>> {
	let mut categories: Vec<String> = skeletons
		.iter()
		.flat_map(|d| d.blocks.iter())
		.flat_map(|b| b.desired_categories.iter().cloned())
		.collect();
	categories.sort();
	categories.dedup();

	let semaphore = Arc::new(Semaphore::new(deps.settings.fast_draft_external_concurrency.max(1)));
	let deadline = StdDuration::from_secs(deps.settings.fast_draft_fetch_deadline_seconds);

	let fetch_all = async {
		let tasks = categories.into_iter().map(|category| {
			let semaphore = semaphore.clone();
			let trip = trip.clone();
			let limit = deps.settings.fast_draft_per_category_limit;
			async move {
				let _permit = semaphore.acquire_owned().await.ok()?;
				let query = PoiSearchQuery {
					city: trip.city.clone(),
					desired_categories: vec![category.clone()],
					budget: Some(trip.budget),
					limit,
					center_location: Some((trip.hotel.lat, trip.hotel.lon)),
					city_center: Some(trip.city_center),
					max_radius_km: None,
					block_type: None,
					search_keywords: Vec::new(),
				};
				let result = deps.catalog.search_pois(query).await.ok()?;
				Some((category, result))
			}
		});
		futures::future::join_all(tasks).await
	};

	match tokio::time::timeout(deadline, fetch_all).await {
		Ok(results) => results.into_iter().flatten().collect(),
		Err(_) => {
			warn!(stage = "fast_draft_planner", trip_id = %trip.id, "external POI fetch exceeded the fast-draft deadline, continuing with whatever arrived");
			HashMap::new()
		}
	}
}

/// Greedily assigns the first unused, not-yet-selected candidate from each
/// block's desired categories. No scoring, no permutation search.
fn fill_greedy(
	skeletons: Vec<DaySkeleton>,
	candidates_by_category: &HashMap<String, Vec<POICandidate>>,
) -> Vec<ItineraryDay> {
	let mut trip_wide_selected = std::collections::HashSet::new();

	skeletons
		.iter()
		.map(|skeleton| {
			let mut day = ItineraryDay::from_skeleton(skeleton);
			for (block, skeleton_block) in day.blocks.iter_mut().zip(skeleton.blocks.iter()) {
				if !skeleton_block.block_type.is_active() {
					continue;
				}
				let pick = skeleton_block.desired_categories.iter().find_map(|category| {
					candidates_by_category
						.get(category)
						.and_then(|pois| pois.iter().find(|p| !trip_wide_selected.contains(&p.poi_id)))
				});
				if let Some(poi) = pick {
					trip_wide_selected.insert(poi.poi_id);
					block.poi = Some(poi.clone());
				}
			}
			annotate_walk(&mut day);
			day
		})
		.collect()
}

fn annotate_walk(day: &mut ItineraryDay) {
	let mut previous_coords: Option<(f64, f64)> = None;
	for block in day.blocks.iter_mut() {
		let coords = block.coords();
		if let (Some(prev), Some(cur)) = (previous_coords, coords) {
			let estimate = haversine_fallback(prev, cur, TravelMode::Walk);
			block.travel_time_from_prev = estimate.duration_minutes;
			block.travel_distance_meters = estimate.distance_meters;
		}
		if coords.is_some() {
			previous_coords = coords;
		}
	}
}

/// Entry point. Returns a complete `Itinerary` (macro plan + days filled)
/// optimized for latency: no LLM POI selection, no permutation-search route
/// optimization, no critique pass, and travel annotation is the haversine
/// walking estimate rather than a real travel-time lookup.
pub async fn fast_draft(deps: &Deps, trip: &TripSpec, now: chrono::DateTime<chrono::Utc>) -> Itinerary {
	let skeletons = skeleton_with_deadline(deps, trip).await;
	let candidates = fetch_candidates_by_category(deps, trip, &skeletons).await;
	let days = fill_greedy(skeletons.clone(), &candidates);

	let mut itinerary = Itinerary::new(trip.id, now);
	itinerary.macro_plan = Some(skeletons);
	itinerary.days = Some(days);
	itinerary
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::test_deps_with_pois;
	use chrono::NaiveDate;
	use uuid::Uuid;

	fn poi(category: &str) -> POICandidate {
		POICandidate {
			poi_id: Uuid::new_v4(),
			name: "Place".into(),
			category: category.into(),
			tags: vec![],
			rating: Some(4.5),
			user_ratings_total: Some(100),
			price_level: None,
			business_status: None,
			open_now: None,
			address: None,
			lat: Some(48.86),
			lon: Some(2.35),
			description: None,
			reviews: vec![],
			rank_score: 1.0,
		}
	}

	fn trip() -> TripSpec {
		TripSpec {
			id: Uuid::new_v4(),
			city: "Paris".into(),
			city_center: (48.8566, 2.3522),
			start_date: NaiveDate::from_ymd_opt(2026, 8, 1).unwrap(),
			end_date: NaiveDate::from_ymd_opt(2026, 8, 1).unwrap(),
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
	async fn fast_draft_returns_a_filled_single_day() {
		let deps = test_deps_with_pois(vec![poi("restaurant"), poi("cafe"), poi("museum"), poi("attraction"), poi("bar")]);
		let t = trip();
		let itinerary = fast_draft(&deps, &t, chrono::Utc::now()).await;
		let days = itinerary.days.expect("days filled");
		assert_eq!(days.len(), 1);
		assert!(days[0].blocks.iter().any(|b| b.poi.is_some()));
	}

	#[test]
	fn fill_greedy_never_reuses_a_poi_across_blocks() {
		let mut candidates = HashMap::new();
		candidates.insert("museum".to_string(), vec![poi("museum")]);
		let routine = crate::domain::trip_spec::DailyRoutine::default();
		let skeleton = DaySkeleton {
			day_number: 1,
			date: NaiveDate::from_ymd_opt(2026, 8, 1).unwrap(),
			theme: String::new(),
			blocks: crate::pipeline::macro_planner::build_day_blocks(&routine, false)
				.into_iter()
				.map(|mut b| {
					b.desired_categories = vec!["museum".to_string()];
					b
				})
				.collect(),
		};
		let days = fill_greedy(vec![skeleton], &candidates);
		let filled_count = days[0].blocks.iter().filter(|b| b.poi.is_some()).count();
		assert_eq!(filled_count, 1);
	}
}
