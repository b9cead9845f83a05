/*
 * src/pipeline/place_replacement.rs
 *
 * File for the Place Replacement service
 *
 * Purpose:
 *   Ranked alternatives and atomic apply for a single block (spec.md §4.10),
 *   grounded on `original_source/src/application/place_replacement_service.py`.
 *   Auto-replace (used by the Day Editor) and manual get-options/apply share
 *   the same scoring and exclusion logic.
 *
 * Include:
 *   ReplacementOutcome  - the persisted result of an apply, also the
 *                         idempotency ledger's value type
 *   RankedAlternative   - a scored candidate returned by get_options
 *   ReplacementOptions  - get_options's full response
 *   get_options         - ranked alternatives for a block
 *   auto_replace        - top-1 pick used by the Day Editor
 *   apply_replacement   - atomic substitution with travel-time recomputation
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::domain::itinerary::{Itinerary, ItineraryBlock, ItineraryDay};
use crate::domain::poi::POICandidate;
use crate::domain::trip_spec::TripSpec;
use crate::error::{CoreResult, Error};
use crate::pipeline::scoring::haversine_km;
use crate::ports::catalog::PoiSearchQuery;
use crate::ports::travel_time::{haversine_fallback, TravelMode};
use crate::ports::{Deps, PlacesCatalog, Repository};

const CANDIDATE_FETCH_LIMIT: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedAlternative {
	pub poi: POICandidate,
	pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplacementOptions {
	pub request_id: Uuid,
	pub alternatives: Vec<RankedAlternative>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplacementOutcome {
	pub day_number: u32,
	pub block_index: usize,
	pub block: ItineraryBlock,
	pub version: i64,
}

/// §4.10 step 5: proximity dominates at 60%, rating 30%, popularity 10%.
fn score_alternative(candidate: &POICandidate, distance_m: f64, max_distance_m: f64) -> f64 {
	let proximity = 1.0 - (distance_m / max_distance_m);
	let rating = candidate.rating.unwrap_or(3.0) / 5.0;
	let popularity = ((candidate.user_ratings_total.unwrap_or(0) as f64) / 10_000.0).sqrt().min(1.0);
	0.60 * proximity + 0.30 * rating + 0.10 * popularity
}

/// Shared exclusion+fetch+score+sort used by both `get_options` and
/// `auto_replace`. Returns candidates already sorted best-first.
async fn ranked_candidates(
	deps: &Deps,
	trip: &TripSpec,
	current: &POICandidate,
	exclude: &std::collections::HashSet<Uuid>,
	same_category: bool,
	max_distance_m: f64,
) -> CoreResult<Vec<RankedAlternative>> {
	let (current_lat, current_lon) = current
		.coords()
		.ok_or_else(|| Error::Internal("current POI has no coordinates".into()))?;

	let query = PoiSearchQuery {
		city: trip.city.clone(),
		desired_categories: if same_category { vec![current.category.clone()] } else { Vec::new() },
		budget: Some(trip.budget),
		limit: CANDIDATE_FETCH_LIMIT,
		center_location: Some((current_lat, current_lon)),
		city_center: Some(trip.city_center),
		max_radius_km: None,
		block_type: None,
		search_keywords: Vec::new(),
	};
	let candidates = deps.catalog.search_pois(query).await?;

	let mut ranked: Vec<RankedAlternative> = candidates
		.into_iter()
		.filter(|c| !exclude.contains(&c.poi_id))
		.filter(|c| c.has_coords())
		.filter(|c| !same_category || c.category == current.category)
		.filter_map(|c| {
			let (lat, lon) = c.coords().unwrap();
			let distance_m = haversine_km(current_lat, current_lon, lat, lon) * 1000.0;
			if distance_m > max_distance_m {
				None
			} else {
				let score = score_alternative(&c, distance_m, max_distance_m);
				Some(RankedAlternative { poi: c, score })
			}
		})
		.collect();

	ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
	Ok(ranked)
}

/// §4.10 "Get options". `limit` is clamped to [3, 10].
pub async fn get_options(
	deps: &Deps,
	trip: &TripSpec,
	day: &ItineraryDay,
	block_index: usize,
	client_excludes: &[Uuid],
	same_category: bool,
	exclude_existing_in_day: bool,
	limit: usize,
) -> CoreResult<ReplacementOptions> {
	let block = day
		.blocks
		.get(block_index)
		.ok_or_else(|| Error::NotFound(format!("block {block_index} not found in day {}", day.day_number)))?;
	let current = block
		.poi
		.as_ref()
		.ok_or_else(|| Error::InvalidInput("block has no POI to replace".into()))?;

	let mut exclude: std::collections::HashSet<Uuid> = std::collections::HashSet::from([current.poi_id]);
	exclude.extend(client_excludes.iter().copied());
	if exclude_existing_in_day {
		exclude.extend(day.poi_ids());
	}

	let mut ranked =
		ranked_candidates(deps, trip, current, &exclude, same_category, deps.settings.replacement_max_distance_m)
			.await?;
	ranked.truncate(limit.clamp(3, 10));

	Ok(ReplacementOptions { request_id: Uuid::new_v4(), alternatives: ranked })
}

/// §4.10 "Auto-replace": same scoring, exclusion set is every POI already
/// used in the day, returns the top-1 candidate (or `None` if nothing
/// qualifies, matching the deterministic-fallback contract in §9).
pub async fn auto_replace(
	deps: &Deps,
	trip: &TripSpec,
	day: &ItineraryDay,
	block_index: usize,
) -> CoreResult<Option<POICandidate>> {
	let block = day
		.blocks
		.get(block_index)
		.ok_or_else(|| Error::NotFound(format!("block {block_index} not found in day {}", day.day_number)))?;
	let current = match &block.poi {
		Some(poi) => poi,
		None => return Ok(None),
	};

	let exclude: std::collections::HashSet<Uuid> = day.poi_ids().into_iter().collect();
	let ranked =
		ranked_candidates(deps, trip, current, &exclude, true, deps.settings.replacement_max_distance_m).await?;
	Ok(ranked.into_iter().next().map(|r| r.poi))
}

fn recompute_travel_annotation(from: Option<(f64, f64)>, to: (f64, f64)) -> (i64, Option<f64>) {
	match from {
		None => (0, None),
		Some(origin) => {
			let estimate = haversine_fallback(origin, to, TravelMode::Walk);
			(estimate.duration_minutes, estimate.distance_meters)
		}
	}
}

/// §4.10 "Apply replacement": atomic load → mutate → write, idempotent under
/// replays with an unchanged `idempotency_key`.
pub async fn apply_replacement(
	deps: &Deps,
	trip_id: Uuid,
	day_index: usize,
	block_index: usize,
	new_place_id: Uuid,
	client_old_place_id: Option<Uuid>,
	idempotency_key: Option<&str>,
	now: DateTime<Utc>,
) -> CoreResult<ReplacementOutcome> {
	if let Some(key) = idempotency_key {
		if let Some(previous) = deps.repository.get_idempotent_replacement(key).await? {
			return Ok(previous);
		}
	}

	let mut itinerary: Itinerary = deps
		.repository
		.get_itinerary(trip_id)
		.await?
		.ok_or_else(|| Error::NotFound(format!("no itinerary for trip {trip_id}")))?;

	let days = itinerary
		.days
		.as_mut()
		.ok_or_else(|| Error::NotFound("itinerary has no days yet".into()))?;
	let day = days
		.get_mut(day_index)
		.ok_or_else(|| Error::NotFound(format!("day {day_index} not found")))?;

	if let Some(current) = day.blocks.get(block_index).and_then(|b| b.poi.as_ref()) {
		if let Some(claimed) = client_old_place_id {
			if claimed != current.poi_id {
				warn!(
					stage = "place_replacement",
					trip_id = %trip_id,
					claimed = %claimed,
					actual = %current.poi_id,
					"client-supplied old_place_id mismatch, proceeding with server state"
				);
			}
		}
	}

	let new_poi = deps.catalog.fetch_place_details(&new_place_id.to_string()).await?;

	let prev_coords = if block_index > 0 { day.blocks.get(block_index - 1).and_then(|b| b.coords()) } else { None };

	{
		let block = day
			.blocks
			.get_mut(block_index)
			.ok_or_else(|| Error::NotFound(format!("block {block_index} not found")))?;
		let new_coords = new_poi.coords().ok_or_else(|| Error::Internal("replacement POI has no coordinates".into()))?;
		block.poi = Some(new_poi);
		let (minutes, distance) = recompute_travel_annotation(prev_coords, new_coords);
		block.travel_time_from_prev = minutes;
		block.travel_distance_meters = distance;
		block.geo_suboptimal = minutes > deps.settings.max_travel_minutes_per_hop;
	}

	let this_coords = day.blocks[block_index].coords();
	if let (Some(this_coords), Some(next_block)) = (this_coords, day.blocks.get_mut(block_index + 1)) {
		if let Some(next_coords) = next_block.coords() {
			let (minutes, distance) = recompute_travel_annotation(Some(this_coords), next_coords);
			next_block.travel_time_from_prev = minutes;
			next_block.travel_distance_meters = distance;
			next_block.geo_suboptimal = minutes > deps.settings.max_travel_minutes_per_hop;
		}
	}

	let day_number = day.day_number;
	let updated_block = day.blocks[block_index].clone();

	itinerary.updated_at = now;
	let version = itinerary.version();
	deps.repository.put_itinerary(&itinerary).await?;

	let outcome = ReplacementOutcome { day_number, block_index, block: updated_block, version };
	if let Some(key) = idempotency_key {
		deps.repository.put_idempotent_replacement(key, &outcome).await?;
	}

	Ok(outcome)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn poi(poi_id: Uuid, lat: f64, lon: f64, rating: f64, reviews: u32) -> POICandidate {
		POICandidate {
			poi_id,
			name: "P".into(),
			category: "restaurant".into(),
			tags: vec![],
			rating: Some(rating),
			user_ratings_total: Some(reviews),
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

	#[test]
	fn proximity_dominates_scoring() {
		// §8 scenario 6: X at 100m/4.0/50 reviews must outrank Y at 2500m/4.9/10000 reviews.
		let x = poi(Uuid::new_v4(), 48.8566, 2.3522, 4.0, 50);
		let y = poi(Uuid::new_v4(), 48.8566, 2.3522, 4.9, 10_000);
		let max_distance = 3000.0;
		let x_score = score_alternative(&x, 100.0, max_distance);
		let y_score = score_alternative(&y, 2500.0, max_distance);
		assert!(x_score > y_score, "x={x_score} y={y_score}");
	}

	#[test]
	fn recompute_travel_is_zero_for_first_block() {
		let (minutes, distance) = recompute_travel_annotation(None, (48.86, 2.35));
		assert_eq!(minutes, 0);
		assert!(distance.is_none());
	}

	#[test]
	fn recompute_travel_uses_walking_speed() {
		let (minutes, distance) = recompute_travel_annotation(Some((48.8566, 2.3522)), (48.8606, 2.3376));
		assert!(minutes > 0);
		assert!(distance.unwrap() > 0.0);
	}
}
