/*
 * src/pipeline/route_optimizer.rs
 *
 * File for the classic Route & Time Optimizer
 *
 * Purpose:
 *   Used when smart routing is disabled (spec.md §4.7), grounded on
 *   `original_source/src/application/route_optimizer.py`. Builds
 *   `ItineraryBlock[]` from the POI plan's top candidate per block,
 *   reorders maximal reorderable clusters by brute-force permutation within
 *   a size limit, and annotates travel.
 *
 * Include:
 *   optimize_day_route - entry point for one day
 */

use itertools::Itertools;
use tracing::warn;

use crate::domain::itinerary::{ItineraryBlock, ItineraryDay, POIPlanBlock};
use crate::domain::poi::POICandidate;
use crate::domain::skeleton::{BlockType, DaySkeleton};
use crate::pipeline::scoring::haversine_km;
use crate::ports::travel_time::{haversine_fallback, TravelMode};
use crate::ports::Deps;

/// Builds one day's `ItineraryDay` from its skeleton and POI plan blocks
/// (§4.7 steps 1-3). `poi_plan` holds only the POI-needing blocks for this
/// day, keyed by `block_index`.
pub async fn optimize_day_route(deps: &Deps, skeleton: &DaySkeleton, poi_plan: &[POIPlanBlock]) -> ItineraryDay {
	let mut day = crate::domain::itinerary::ItineraryDay::from_skeleton(skeleton);

	for plan_block in poi_plan {
		if plan_block.day_number != skeleton.day_number {
			continue;
		}
		if let Some(block) = day.blocks.get_mut(plan_block.block_index) {
			block.poi = plan_block.selected().cloned();
		}
	}

	reorder_clusters(&mut day, deps.settings.max_optimization_blocks_per_cluster);
	annotate_travel(deps, &mut day).await;
	day
}

fn is_reorderable_with_poi(block: &ItineraryBlock) -> bool {
	block.block_type.is_reorderable() && block.poi.is_some()
}

/// §4.7 step 2: find maximal contiguous reorderable runs bounded by
/// `max_cluster_size`, and within each, brute-force the permutation that
/// minimizes anchor→...→anchor haversine cost.
fn reorder_clusters(day: &mut ItineraryDay, max_cluster_size: usize) {
	let mut idx = 0;
	while idx < day.blocks.len() {
		if !is_reorderable_with_poi(&day.blocks[idx]) {
			idx += 1;
			continue;
		}
		let mut end = idx;
		while end + 1 < day.blocks.len()
			&& is_reorderable_with_poi(&day.blocks[end + 1])
			&& (end + 1 - idx) < max_cluster_size
		{
			end += 1;
		}

		if end > idx {
			let prev_anchor = if idx > 0 { day.blocks[idx - 1].coords() } else { None };
			let next_anchor = if end + 1 < day.blocks.len() { day.blocks[end + 1].coords() } else { None };
			let cluster: Vec<ItineraryBlock> = day.blocks[idx..=end].to_vec();
			let best = best_permutation(cluster, prev_anchor, next_anchor);
			day.blocks[idx..=end].clone_from_slice(&best);
		}

		idx = end + 1;
	}
}

fn best_permutation(
	cluster: Vec<ItineraryBlock>,
	prev_anchor: Option<(f64, f64)>,
	next_anchor: Option<(f64, f64)>,
) -> Vec<ItineraryBlock> {
	let len = cluster.len();
	cluster
		.into_iter()
		.permutations(len)
		.min_by(|a, b| {
			tour_cost(a, prev_anchor, next_anchor)
				.partial_cmp(&tour_cost(b, prev_anchor, next_anchor))
				.unwrap_or(std::cmp::Ordering::Equal)
		})
		.unwrap_or_default()
}

fn tour_cost(order: &[ItineraryBlock], prev_anchor: Option<(f64, f64)>, next_anchor: Option<(f64, f64)>) -> f64 {
	let mut cost = 0.0;
	let coords: Vec<(f64, f64)> = order.iter().filter_map(|b| b.coords()).collect();
	if coords.is_empty() {
		return 0.0;
	}

	if let Some((alat, alon)) = prev_anchor {
		cost += haversine_km(alat, alon, coords[0].0, coords[0].1);
	}
	for pair in coords.windows(2) {
		cost += haversine_km(pair[0].0, pair[0].1, pair[1].0, pair[1].1);
	}
	if let Some((alat, alon)) = next_anchor {
		let (lat, lon) = *coords.last().unwrap();
		cost += haversine_km(lat, lon, alat, alon);
	}
	cost
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
						warn!(stage = "route_optimizer", reason = %err, "travel-time provider failed, using haversine fallback");
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

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::NaiveTime;
	use uuid::Uuid;

	fn poi(lat: f64, lon: f64) -> POICandidate {
		POICandidate {
			poi_id: Uuid::new_v4(),
			name: "P".into(),
			category: "attraction".into(),
			tags: vec![],
			rating: Some(4.5),
			user_ratings_total: Some(10),
			price_level: None,
			business_status: None,
			open_now: None,
			address: None,
			lat: Some(lat),
			lon: Some(lon),
			description: None,
			reviews: vec![],
			rank_score: 1.0,
		}
	}

	fn block(block_type: BlockType, poi_opt: Option<POICandidate>) -> ItineraryBlock {
		ItineraryBlock {
			block_type,
			start_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
			end_time: NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
			poi: poi_opt,
			travel_time_from_prev: 0,
			travel_distance_meters: None,
			travel_polyline: None,
			notes: None,
			geo_suboptimal: false,
		}
	}

	#[test]
	fn reorders_cluster_to_minimize_total_distance() {
		let hotel = (48.8566, 2.3522);
		let near = poi(48.8570, 2.3528);
		let far = poi(48.9000, 2.4000);

		let mut day = ItineraryDay {
			day_number: 1,
			date: chrono::NaiveDate::from_ymd_opt(2026, 7, 1).unwrap(),
			theme: String::new(),
			blocks: vec![
				block(BlockType::Meal, Some({ let mut h = poi(hotel.0, hotel.1); h.name = "Hotel Breakfast".into(); h })),
				block(BlockType::Activity, Some(far.clone())),
				block(BlockType::Activity, Some(near.clone())),
			],
		};

		reorder_clusters(&mut day, 5);
		// Visiting the near POI first from the hotel anchor is the shorter tour.
		assert_eq!(day.blocks[1].poi.as_ref().unwrap().poi_id, near.poi_id);
		assert_eq!(day.blocks[2].poi.as_ref().unwrap().poi_id, far.poi_id);
	}

	#[tokio::test]
	async fn first_block_has_zero_travel_time() {
		let mut day = ItineraryDay {
			day_number: 1,
			date: chrono::NaiveDate::from_ymd_opt(2026, 7, 1).unwrap(),
			theme: String::new(),
			blocks: vec![block(BlockType::Activity, Some(poi(48.85, 2.35)))],
		};
		let deps = crate::testing::test_deps();
		annotate_travel(&deps, &mut day).await;
		assert_eq!(day.blocks[0].travel_time_from_prev, 0);
	}
}
