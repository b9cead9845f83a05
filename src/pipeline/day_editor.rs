/*
 * src/pipeline/day_editor.rs
 *
 * File for the Day Editor
 *
 * Purpose:
 *   Applies a batch of granular edits to a single day while preserving
 *   trip-wide invariants (spec.md §4.9), grounded on
 *   `original_source/src/application/day_editor.py`.
 *
 * Include:
 *   DayContext          - folded settings/preset/wish state for one edit batch
 *   apply_changes_to_day - entry point
 */

use std::collections::HashSet;

use chrono::NaiveTime;
use uuid::Uuid;

use crate::domain::change::{Change, Placement};
use crate::domain::itinerary::{Itinerary, ItineraryBlock, ItineraryDay};
use crate::domain::poi::POICandidate;
use crate::domain::skeleton::BlockType;
use crate::domain::trip_spec::{Budget, Pace, TripSpec};
use crate::error::{CoreResult, Error};
use crate::pipeline::macro_planner::build_day_blocks_in_window;
use crate::pipeline::place_replacement::auto_replace;
use crate::pipeline::preference_agent::build_profile;
use crate::ports::catalog::PoiSearchQuery;
use crate::ports::travel_time::{haversine_fallback, TravelMode};
use crate::ports::{Deps, PlacesCatalog, Repository};

#[derive(Debug, Clone)]
pub struct DayContext {
	pub start_time: NaiveTime,
	pub end_time: NaiveTime,
	pub pace: Pace,
	pub budget: Budget,
	pub wishes: Vec<String>,
	pub preset: Option<String>,
}

impl DayContext {
	fn from_day(day: &ItineraryDay, trip: &TripSpec) -> Self {
		let start_time = day.blocks.first().map(|b| b.start_time).unwrap_or(trip.daily_routine.wake_time);
		let end_time = day.blocks.last().map(|b| b.end_time).unwrap_or(trip.daily_routine.sleep_time);
		Self { start_time, end_time, pace: trip.pace, budget: trip.budget, wishes: Vec::new(), preset: None }
	}

	fn fold(&mut self, change: &Change) {
		match change {
			Change::UpdateSettings { tempo, start, end, budget } => {
				if let Some(tempo) = tempo {
					self.pace = *tempo;
				}
				if let Some(start) = start {
					self.start_time = *start;
				}
				if let Some(end) = end {
					self.end_time = *end;
				}
				if let Some(budget) = budget {
					self.budget = *budget;
				}
			}
			Change::SetPreset { preset } => {
				self.preset = preset.clone();
			}
			Change::AddWishMessage { text } => {
				self.wishes.push(text.clone());
			}
			_ => {}
		}
	}
}

fn infer_block_type(category: &str) -> BlockType {
	let category = category.to_lowercase();
	if category.contains("cafe") || category.contains("restaurant") || category.contains("food") {
		BlockType::Meal
	} else if category.contains("bar") || category.contains("night") || category.contains("club") {
		BlockType::Nightlife
	} else {
		BlockType::Activity
	}
}

fn synth_block(poi: POICandidate, start_time: NaiveTime) -> ItineraryBlock {
	let block_type = infer_block_type(&poi.category);
	let end_time = (start_time + chrono::Duration::minutes(90)).min(NaiveTime::from_hms_opt(23, 59, 0).unwrap());
	ItineraryBlock {
		block_type,
		start_time,
		end_time,
		poi: Some(poi),
		travel_time_from_prev: 0,
		travel_distance_meters: None,
		travel_polyline: None,
		notes: None,
		geo_suboptimal: false,
	}
}

/// §4.9: applies `changes` to `day_index` of `trip_id`'s itinerary,
/// rebuilding the day when POI count drops below the floor or any context
/// change occurred. `apply_changes_to_day([])` is a no-op per §8.
pub async fn apply_changes_to_day(
	deps: &Deps,
	trip: &TripSpec,
	day_index: usize,
	changes: &[Change],
) -> CoreResult<ItineraryDay> {
	let mut itinerary: Itinerary = deps
		.repository
		.get_itinerary(trip.id)
		.await?
		.ok_or_else(|| Error::NotFound(format!("no itinerary for trip {}", trip.id)))?;

	let days = itinerary.days.as_mut().ok_or_else(|| Error::NotFound("itinerary has no days yet".into()))?;
	if day_index >= days.len() {
		return Err(Error::NotFound(format!("day {day_index} not found")));
	}

	if changes.is_empty() {
		return Ok(days[day_index].clone());
	}

	let (deterministic, context): (Vec<&Change>, Vec<&Change>) = changes.iter().partition(|c| c.is_deterministic());

	let mut ctx = DayContext::from_day(&days[day_index], trip);
	for change in &context {
		ctx.fold(change);
	}

	let explicitly_removed: HashSet<Uuid> = deterministic
		.iter()
		.filter_map(|c| match c {
			Change::RemovePlace { place_id } => Some(*place_id),
			Change::ReplacePlace { from_place_id, .. } => Some(*from_place_id),
			_ => None,
		})
		.collect();

	for change in &deterministic {
		match change {
			Change::RemovePlace { place_id } => {
				days[day_index].blocks.retain(|b| b.poi.as_ref().map(|p| p.poi_id) != Some(*place_id));
			}
			Change::ReplacePlace { from_place_id, to_place_id } => {
				let replacement = match to_place_id {
					Some(to_id) => Some(deps.catalog.fetch_place_details(&to_id.to_string()).await?),
					None => auto_replace_for(deps, trip, &days[day_index], *from_place_id).await?,
				};
				if let Some(new_poi) = replacement {
					if let Some(block) = days[day_index]
						.blocks
						.iter_mut()
						.find(|b| b.poi.as_ref().map(|p| p.poi_id) == Some(*from_place_id))
					{
						block.poi = Some(new_poi);
					}
				}
			}
			Change::AddPlace { place_id, placement } => {
				let poi = deps.catalog.fetch_place_details(&place_id.to_string()).await?;
				let block = synth_block(poi, ctx.start_time);
				let day_blocks = &mut days[day_index].blocks;
				match placement {
					Placement::InSlot(idx) => {
						let idx = (*idx).min(day_blocks.len());
						day_blocks.insert(idx, block);
					}
					Placement::AtTime(_) | Placement::Auto => {
						day_blocks.push(block);
					}
				}
			}
			_ => {}
		}
	}

	let poi_count = days[day_index].blocks.iter().filter(|b| b.poi.is_some()).count();
	let needs_rebuild = poi_count < 4 || !context.is_empty();

	if needs_rebuild {
		rebuild_day(deps, trip, &mut itinerary, day_index, &ctx, &explicitly_removed).await?;
	}

	let days = itinerary.days.as_mut().unwrap();
	annotate_walking_travel(deps, &mut days[day_index]);

	itinerary.updated_at = chrono::Utc::now();
	deps.repository.put_itinerary(&itinerary).await?;

	Ok(itinerary.days.as_ref().unwrap()[day_index].clone())
}

/// §4.9 step 7: re-derives travel time/distance for every block after an
/// edit, at a flat walking speed via haversine (no external travel-time
/// call for a same-day edit).
fn annotate_walking_travel(deps: &Deps, day: &mut ItineraryDay) {
	let mut previous_coords: Option<(f64, f64)> = None;
	for block in day.blocks.iter_mut() {
		let coords = block.coords();
		match (previous_coords, coords) {
			(Some(prev), Some(cur)) => {
				let estimate = haversine_fallback(prev, cur, TravelMode::Walk);
				block.travel_time_from_prev = estimate.duration_minutes;
				block.travel_distance_meters = estimate.distance_meters;
				block.geo_suboptimal = estimate.duration_minutes > deps.settings.max_travel_minutes_per_hop;
			}
			_ => {
				block.travel_time_from_prev = 0;
				block.travel_distance_meters = None;
				block.geo_suboptimal = false;
			}
		}
		if coords.is_some() {
			previous_coords = coords;
		}
	}
}

async fn auto_replace_for(
	deps: &Deps,
	trip: &TripSpec,
	day: &ItineraryDay,
	from_place_id: Uuid,
) -> CoreResult<Option<POICandidate>> {
	let block_index = day.blocks.iter().position(|b| b.poi.as_ref().map(|p| p.poi_id) == Some(from_place_id));
	match block_index {
		Some(idx) => auto_replace(deps, trip, day, idx).await,
		None => Ok(None),
	}
}

/// §4.9 step 6: generates a single-day skeleton from the folded context and
/// fills each meal/activity/nightlife block, excluding every POI already
/// used elsewhere in the trip and every explicitly removed POI.
async fn rebuild_day(
	deps: &Deps,
	trip: &TripSpec,
	itinerary: &mut Itinerary,
	day_index: usize,
	ctx: &DayContext,
	explicitly_removed: &HashSet<Uuid>,
) -> CoreResult<()> {
	let profile = build_profile(deps, trip).await;

	let wants_nightlife = ctx.preset.as_deref().map(|p| p.to_lowercase().contains("nightlife")).unwrap_or(false);
	let skeleton_blocks = build_day_blocks_in_window(ctx.start_time, ctx.end_time, &trip.daily_routine, wants_nightlife);

	let days = itinerary.days.as_ref().unwrap();
	let mut exclusion: HashSet<Uuid> = explicitly_removed.clone();
	for (idx, day) in days.iter().enumerate() {
		if idx != day_index {
			exclusion.extend(day.poi_ids());
		}
	}
	let mut used_this_day: HashSet<Uuid> = HashSet::new();

	let mut new_blocks = Vec::with_capacity(skeleton_blocks.len());
	for skeleton_block in &skeleton_blocks {
		if !skeleton_block.block_type.is_active() {
			new_blocks.push(ItineraryBlock {
				block_type: skeleton_block.block_type,
				start_time: skeleton_block.start_time,
				end_time: skeleton_block.end_time,
				poi: None,
				travel_time_from_prev: 0,
				travel_distance_meters: None,
				travel_polyline: None,
				notes: if skeleton_block.theme.is_empty() { None } else { Some(skeleton_block.theme.clone()) },
				geo_suboptimal: false,
			});
			continue;
		}

		let query = PoiSearchQuery {
			city: trip.city.clone(),
			desired_categories: skeleton_block.desired_categories.clone(),
			budget: Some(ctx.budget),
			limit: deps.settings.candidates_per_block,
			center_location: None,
			city_center: Some(trip.city_center),
			max_radius_km: Some(deps.settings.max_radius_km),
			block_type: Some(skeleton_block.block_type),
			search_keywords: Vec::new(),
		};
		let candidates = deps.catalog.search_pois(query).await.unwrap_or_default();
		let candidates = crate::pipeline::scoring::filter_candidates_for_block(&candidates, &profile, skeleton_block.block_type);
		let picked = candidates
			.into_iter()
			.find(|c| !exclusion.contains(&c.poi_id) && !used_this_day.contains(&c.poi_id));

		if let Some(poi) = &picked {
			used_this_day.insert(poi.poi_id);
		}

		new_blocks.push(ItineraryBlock {
			block_type: skeleton_block.block_type,
			start_time: skeleton_block.start_time,
			end_time: skeleton_block.end_time,
			poi: picked,
			travel_time_from_prev: 0,
			travel_distance_meters: None,
			travel_polyline: None,
			notes: None,
			geo_suboptimal: false,
		});
	}

	itinerary.days.as_mut().unwrap()[day_index].blocks = new_blocks;
	Ok(())
}
