/*
 * src/pipeline/smart_route_optimizer.rs
 *
 * File for the Smart Route Optimizer
 *
 * Purpose:
 *   District-based end-to-end route builder superseding POI Planner + Route
 *   Optimizer when enabled (spec.md §4.6), grounded on
 *   `original_source/src/application/smart_route_optimizer.py`.
 *
 * Include:
 *   build_smart_itinerary - entry point; produces ItineraryDay[] for the trip
 */

use std::collections::{HashMap, HashSet};

use tracing::warn;
use uuid::Uuid;

use crate::domain::district::{ClusteringResult, District};
use crate::domain::itinerary::{ItineraryBlock, ItineraryDay};
use crate::domain::poi::{POICandidate, PreferenceProfile};
use crate::domain::skeleton::{BlockType, DaySkeleton};
use crate::domain::trip_spec::TripSpec;
use crate::pipeline::district_planner::plan_day_districts;
use crate::pipeline::geo_clustering::cluster_pois;
use crate::pipeline::scoring::{haversine_km, score_candidate, ScoreContext};
use crate::ports::catalog::PoiSearchQuery;
use crate::ports::travel_time::{haversine_fallback, TravelMode};
use crate::ports::Deps;

/// §4.6 step 1: one fetch per unique category across every macro block,
/// deduped by poi_id, filtered by (raised) min_rating with a last-resort
/// widening to the top 30 regardless of rating.
async fn fetch_all_candidates(deps: &Deps, trip: &TripSpec, skeletons: &[DaySkeleton], profile: &PreferenceProfile) -> Vec<POICandidate> {
	let mut categories: HashSet<String> = HashSet::new();
	for day in skeletons {
		for block in &day.blocks {
			categories.extend(block.desired_categories.iter().cloned());
		}
	}

	let min_rating = profile.min_rating.max(deps.settings.smart_routing_min_rating);
	let mut by_id: HashMap<Uuid, POICandidate> = HashMap::new();

	for category in &categories {
		let query = PoiSearchQuery {
			city: trip.city.clone(),
			desired_categories: vec![category.clone()],
			budget: Some(trip.budget),
			limit: 100,
			center_location: None,
			city_center: Some(trip.city_center),
			max_radius_km: Some(deps.settings.max_radius_km),
			block_type: None,
			search_keywords: Vec::new(),
		};
		match deps.catalog.search_pois(query).await {
			Ok(candidates) => {
				for c in candidates {
					by_id.entry(c.poi_id).or_insert(c);
				}
			}
			Err(err) => warn!(stage = "smart_route_optimizer", category, reason = %err, "catalog fetch failed"),
		}
	}

	let mut all: Vec<POICandidate> = by_id.into_values().collect();
	all.sort_by(|a, b| b.rank_score.partial_cmp(&a.rank_score).unwrap_or(std::cmp::Ordering::Equal));

	let filtered: Vec<POICandidate> = all.iter().filter(|c| c.rating.unwrap_or(0.0) >= min_rating).cloned().collect();
	if filtered.len() >= 10 {
		filtered
	} else {
		all.into_iter().take(30).collect()
	}
}

/// §4.6 step 3: per-district preference-score summary, computed once right
/// after clustering and before the per-day loop. `preference_score` averages
/// the top-5 `score_candidate` values over the district's POIs against the
/// union of every day's required categories; `preference_signals` collects
/// the must-include/tag-boost keywords matched by name+tags across those
/// POIs; `category_coverage` is the subset of the required categories the
/// district actually covers.
fn annotate_district_preferences(clustering: &mut ClusteringResult, skeletons: &[DaySkeleton], profile: &PreferenceProfile) {
	let required_categories: Vec<String> = {
		let mut set = HashSet::new();
		for day in skeletons {
			for block in &day.blocks {
				set.extend(block.desired_categories.iter().cloned());
			}
		}
		set.into_iter().collect()
	};

	let ctx = ScoreContext::default();
	let keywords: Vec<&String> = profile.must_include_keywords.iter().chain(profile.tag_boosts.keys()).collect();

	for district in clustering.districts.values_mut() {
		let mut scored: Vec<f64> =
			district.pois.iter().map(|poi| score_candidate(poi, BlockType::Activity, profile, &ctx)).collect();
		scored.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
		scored.truncate(5);
		district.preference_score = if scored.is_empty() { 0.0 } else { scored.iter().sum::<f64>() / scored.len() as f64 };

		let mut signals: HashSet<String> = HashSet::new();
		for poi in &district.pois {
			let haystack = poi.haystack();
			for keyword in &keywords {
				if haystack.contains(keyword.as_str()) {
					signals.insert((*keyword).clone());
				}
			}
		}
		district.preference_signals = signals.into_iter().collect();
		district.preference_signals.sort();

		district.category_coverage = required_categories
			.iter()
			.filter(|c| district.has_category(std::slice::from_ref(*c)))
			.cloned()
			.collect();
	}
}

/// §4.6 step 4: draw from the assigned district, widening to nearby
/// districts and finally lowering min_rating to 4.0 as a last resort.
fn select_for_block(
	deps: &Deps,
	clustering: &ClusteringResult,
	district_id: &str,
	desired_categories: &[String],
	profile: &PreferenceProfile,
	block_type: BlockType,
	anchor: (f64, f64),
	exclude: &HashSet<Uuid>,
) -> Option<POICandidate> {
	let mut candidates = clustering
		.get(district_id)
		.map(|d| d.pois_by_category(desired_categories, profile.min_rating, exclude))
		.unwrap_or_default();

	if candidates.len() < deps.settings.district_poi_min_candidates {
		if let Some(origin) = clustering.get(district_id).map(|d| d.center) {
			for (nearby, _) in clustering.districts_sorted_by_distance(origin.0, origin.1) {
				if nearby.id == district_id {
					continue;
				}
				candidates.extend(nearby.pois_by_category(desired_categories, profile.min_rating, exclude));
				if candidates.len() >= deps.settings.district_poi_min_candidates {
					break;
				}
			}
		}
	}

	if candidates.is_empty() {
		if let Some(district) = clustering.get(district_id) {
			candidates = district.pois_by_category(desired_categories, 4.0, exclude);
		}
	}

	let day_center = clustering.get(district_id).map(|d| d.center);
	let ctx = ScoreContext { anchor: Some(anchor), day_center, distance_weight: deps.settings.hotel_anchor_distance_weight };

	candidates
		.into_iter()
		.max_by(|a, b| {
			score_candidate(a, block_type, profile, &ctx)
				.partial_cmp(&score_candidate(b, block_type, profile, &ctx))
				.unwrap_or(std::cmp::Ordering::Equal)
		})
}

/// §4.6 end-to-end build: cluster -> per-day district plan -> per-block
/// selection -> intra-district reordering -> long-hop repair -> travel
/// annotation.
pub async fn build_smart_itinerary(
	deps: &Deps,
	trip: &TripSpec,
	skeletons: &[DaySkeleton],
	profile: &PreferenceProfile,
) -> Vec<ItineraryDay> {
	let all_candidates = fetch_all_candidates(deps, trip, skeletons, profile).await;
	let mut clustering = cluster_pois(
		&all_candidates,
		deps.settings.cluster_cell_size_km,
		deps.settings.min_pois_per_district,
		deps.settings.max_districts_per_city,
		Some((trip.hotel.lat, trip.hotel.lon)),
		Some(trip.city_center),
	);
	annotate_district_preferences(&mut clustering, skeletons, profile);

	let mut days = Vec::new();
	let mut trip_wide_selected: HashSet<Uuid> = HashSet::new();
	let mut previous_day_anchor = (trip.hotel.lat, trip.hotel.lon);
	let mut previous_day_district: Option<String> = None;

	for skeleton in skeletons {
		let district_plan =
			plan_day_districts(deps, &trip.city, skeleton, &clustering, Some(previous_day_anchor), previous_day_district.as_deref())
				.await;

		let mut day = ItineraryDay::from_skeleton(skeleton);
		let mut anchor = previous_day_anchor;
		let mut last_district: Option<String> = None;

		for (idx, block) in skeleton.blocks.iter().enumerate() {
			if !block.block_type.is_active() {
				continue;
			}
			let Some(district_id) = district_plan.district_for(idx) else { continue };
			last_district = Some(district_id.to_string());

			if let Some(selected) = select_for_block(
				deps,
				&clustering,
				district_id,
				&block.desired_categories,
				profile,
				block.block_type,
				anchor,
				&trip_wide_selected,
			) {
				if let Some(coords) = selected.coords() {
					anchor = coords;
				}
				trip_wide_selected.insert(selected.poi_id);
				day.blocks[idx].poi = Some(selected);
			}
		}

		reorder_within_districts(&mut day, &district_plan);
		repair_long_hops(deps, &mut day, &clustering, &district_plan, profile, &trip_wide_selected);
		annotate_travel(deps, &mut day).await;

		previous_day_anchor = anchor;
		previous_day_district = last_district;
		days.push(day);
	}

	days
}

/// §4.6 step 6: within each consecutive same-district run, nearest-neighbor
/// reorder the reorderable blocks starting from the run's entry anchor.
fn reorder_within_districts(day: &mut ItineraryDay, district_plan: &crate::pipeline::district_planner::DayDistrictPlan) {
	let mut idx = 0;
	while idx < day.blocks.len() {
		let Some(district) = district_plan.district_for(idx) else {
			idx += 1;
			continue;
		};
		let mut end = idx;
		while end + 1 < day.blocks.len() && district_plan.district_for(end + 1) == Some(district) {
			end += 1;
		}

		let entry_anchor = if idx > 0 { day.blocks[idx - 1].coords() } else { None };
		nearest_neighbor_reorder(&mut day.blocks[idx..=end], entry_anchor);
		idx = end + 1;
	}
}

fn nearest_neighbor_reorder(blocks: &mut [ItineraryBlock], entry_anchor: Option<(f64, f64)>) {
	let reorderable_indices: Vec<usize> =
		(0..blocks.len()).filter(|&i| blocks[i].block_type.is_reorderable() && blocks[i].poi.is_some()).collect();
	if reorderable_indices.len() < 2 {
		return;
	}

	let mut remaining = reorderable_indices.clone();
	let mut ordered_blocks: Vec<ItineraryBlock> = Vec::with_capacity(remaining.len());
	let mut current_anchor = entry_anchor;

	while !remaining.is_empty() {
		let next_pos = match current_anchor {
			Some((lat, lon)) => remaining
				.iter()
				.enumerate()
				.min_by(|(_, &a), (_, &b)| {
					let da = blocks[a].coords().map(|c| haversine_km(lat, lon, c.0, c.1)).unwrap_or(f64::MAX);
					let db = blocks[b].coords().map(|c| haversine_km(lat, lon, c.0, c.1)).unwrap_or(f64::MAX);
					da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
				})
				.map(|(pos, _)| pos)
				.unwrap_or(0),
			None => 0,
		};
		let chosen = remaining.remove(next_pos);
		current_anchor = blocks[chosen].coords().or(current_anchor);
		ordered_blocks.push(blocks[chosen].clone());
	}

	for (slot, new_block) in reorderable_indices.into_iter().zip(ordered_blocks) {
		blocks[slot] = new_block;
	}
}

/// §4.6 step 7: two repair passes swapping in a same-district alternative
/// when a block's hop to its previous or next neighbor exceeds the limit.
fn repair_long_hops(
	deps: &Deps,
	day: &mut ItineraryDay,
	clustering: &ClusteringResult,
	district_plan: &crate::pipeline::district_planner::DayDistrictPlan,
	profile: &PreferenceProfile,
	trip_wide_selected: &HashSet<Uuid>,
) {
	if !deps.settings.enable_travel_hop_limit {
		return;
	}

	for _pass in 0..2 {
		for idx in 0..day.blocks.len() {
			let Some(current_coords) = day.blocks[idx].coords() else { continue };
			let prev_coords = (0..idx).rev().find_map(|i| day.blocks[i].coords());
			let next_coords = (idx + 1..day.blocks.len()).find_map(|i| day.blocks[i].coords());

			let prev_dist = prev_coords.map(|c| haversine_km(c.0, c.1, current_coords.0, current_coords.1)).unwrap_or(0.0);
			let next_dist = next_coords.map(|c| haversine_km(c.0, c.1, current_coords.0, current_coords.1)).unwrap_or(0.0);
			let worst = prev_dist.max(next_dist);
			if worst <= deps.settings.max_hop_distance_km {
				continue;
			}

			let Some(district_id) = district_plan.district_for(idx) else { continue };
			let Some(district) = clustering.get(district_id) else { continue };
			let mut exclude = trip_wide_selected.clone();
			if let Some(poi) = &day.blocks[idx].poi {
				exclude.insert(poi.poi_id);
			}
			let desired: Vec<String> = vec![];
			let alternative = district
				.pois_by_category(&desired, profile.min_rating, &exclude)
				.into_iter()
				.filter(|c| c.has_coords())
				.min_by(|a, b| {
					let ca = a.coords().unwrap();
					let cb = b.coords().unwrap();
					let worst_a = prev_coords.map(|p| haversine_km(p.0, p.1, ca.0, ca.1)).unwrap_or(0.0).max(
						next_coords.map(|n| haversine_km(n.0, n.1, ca.0, ca.1)).unwrap_or(0.0),
					);
					let worst_b = prev_coords.map(|p| haversine_km(p.0, p.1, cb.0, cb.1)).unwrap_or(0.0).max(
						next_coords.map(|n| haversine_km(n.0, n.1, cb.0, cb.1)).unwrap_or(0.0),
					);
					worst_a.partial_cmp(&worst_b).unwrap_or(std::cmp::Ordering::Equal)
				});

			if let Some(replacement) = alternative {
				let replacement_coords = replacement.coords().unwrap();
				let replacement_worst = prev_coords
					.map(|p| haversine_km(p.0, p.1, replacement_coords.0, replacement_coords.1))
					.unwrap_or(0.0)
					.max(next_coords.map(|n| haversine_km(n.0, n.1, replacement_coords.0, replacement_coords.1)).unwrap_or(0.0));
				if replacement_worst < worst {
					day.blocks[idx].poi = Some(replacement);
				}
			}
		}
	}
}

async fn annotate_travel(deps: &Deps, day: &mut ItineraryDay) {
	let mut previous_coords: Option<(f64, f64)> = None;
	for i in 0..day.blocks.len() {
		let coords = day.blocks[i].coords();
		match (previous_coords, coords) {
			(Some(prev), Some(cur)) => {
				let estimate = match deps.travel_time.estimate_travel(prev, cur, TravelMode::Walk).await {
					Ok(estimate) => estimate,
					Err(err) => {
						warn!(stage = "smart_route_optimizer", reason = %err, "travel-time provider failed, using haversine fallback");
						haversine_fallback(prev, cur, TravelMode::Walk)
					}
				};
				day.blocks[i].travel_time_from_prev = estimate.duration_minutes;
				day.blocks[i].travel_distance_meters = estimate.distance_meters;
				day.blocks[i].geo_suboptimal = estimate.duration_minutes > deps.settings.max_travel_minutes_per_hop;
			}
			_ => {
				day.blocks[i].travel_time_from_prev = 0;
				day.blocks[i].travel_distance_meters = None;
				day.blocks[i].geo_suboptimal = false;
			}
		}
		if coords.is_some() {
			previous_coords = coords;
		}
	}
}
