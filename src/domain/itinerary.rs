/*
 * src/domain/itinerary.rs
 *
 * File for POIPlanBlock / ItineraryBlock / ItineraryDay / Itinerary
 *
 * Purpose:
 *   The persisted trip artifacts downstream of the macro plan: the POI
 *   planner's per-block candidate lists, and the final dated, POI-annotated
 *   itinerary that the day editor and place replacement service mutate.
 *
 * Include:
 *   POIPlanBlock   - ordered candidates for one skeleton block
 *   ItineraryBlock - a scheduled block with an optional POI and travel data
 *   ItineraryDay   - one day of the final itinerary
 *   Itinerary      - the trip's single itinerary row
 */

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::critique::CritiqueIssue;
use crate::domain::poi::POICandidate;
use crate::domain::skeleton::{BlockType, DaySkeleton};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct POIPlanBlock {
	pub day_number: u32,
	pub block_index: usize,
	pub block_theme: String,
	pub block_type: BlockType,
	/// Sorted by `rank_score` descending; index 0 is the intended selection.
	pub candidates: Vec<POICandidate>,
}

impl POIPlanBlock {
	pub fn selected(&self) -> Option<&POICandidate> {
		self.candidates.first()
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItineraryBlock {
	pub block_type: BlockType,
	pub start_time: NaiveTime,
	pub end_time: NaiveTime,
	pub poi: Option<POICandidate>,
	/// Minutes of travel from the previous block's POI; 0 for the first
	/// block of the day.
	pub travel_time_from_prev: i64,
	pub travel_distance_meters: Option<f64>,
	pub travel_polyline: Option<String>,
	pub notes: Option<String>,
	/// True iff `travel_time_from_prev > max_travel_minutes_per_hop`.
	pub geo_suboptimal: bool,
}

impl ItineraryBlock {
	pub fn coords(&self) -> Option<(f64, f64)> {
		self.poi.as_ref().and_then(|p| p.coords())
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItineraryDay {
	pub day_number: u32,
	pub date: NaiveDate,
	pub theme: String,
	pub blocks: Vec<ItineraryBlock>,
}

impl ItineraryDay {
	/// Builds the (empty-POI) day shell from its skeleton, preserving block
	/// types, themes, and time windows.
	pub fn from_skeleton(skeleton: &DaySkeleton) -> Self {
		Self {
			day_number: skeleton.day_number,
			date: skeleton.date,
			theme: skeleton.theme.clone(),
			blocks: skeleton
				.blocks
				.iter()
				.map(|b| ItineraryBlock {
					block_type: b.block_type,
					start_time: b.start_time,
					end_time: b.end_time,
					poi: None,
					travel_time_from_prev: 0,
					travel_distance_meters: None,
					travel_polyline: None,
					notes: if b.theme.is_empty() { None } else { Some(b.theme.clone()) },
					geo_suboptimal: false,
				})
				.collect(),
		}
	}

	pub fn poi_ids(&self) -> Vec<Uuid> {
		self.blocks.iter().filter_map(|b| b.poi.as_ref().map(|p| p.poi_id)).collect()
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Itinerary {
	pub trip_id: Uuid,
	pub macro_plan: Option<Vec<DaySkeleton>>,
	pub poi_plan: Option<Vec<POIPlanBlock>>,
	pub days: Option<Vec<ItineraryDay>>,
	pub critique_issues: Vec<CritiqueIssue>,
	/// Acts as the logical route version (spec.md §3, §4.10).
	pub updated_at: DateTime<Utc>,
}

impl Itinerary {
	pub fn new(trip_id: Uuid, now: DateTime<Utc>) -> Self {
		Self {
			trip_id,
			macro_plan: None,
			poi_plan: None,
			days: None,
			critique_issues: Vec::new(),
			updated_at: now,
		}
	}

	/// The route version as a Unix timestamp, per §4.10 "Apply replacement".
	pub fn version(&self) -> i64 {
		self.updated_at.timestamp()
	}

	/// Every `poi_id` selected across the whole itinerary, for trip-wide
	/// dedup (spec.md §8).
	pub fn all_selected_poi_ids(&self) -> std::collections::HashSet<Uuid> {
		self.days
			.iter()
			.flatten()
			.flat_map(|d| d.poi_ids())
			.collect()
	}
}
