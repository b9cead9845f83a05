/*
 * src/config.rs
 *
 * File for pipeline-wide configuration
 *
 * Purpose:
 *   Mirrors `original_source/src/config.py`'s `Settings` for every field that
 *   affects core pipeline behavior (clustering, hotel anchoring, route
 *   optimization, hop limits, smart routing, guest limits, LLM feature
 *   flags). Loaded once via `dotenvy` and passed around explicitly as part
 *   of `Deps` rather than read from a module-level global.
 *
 * Include:
 *   Settings - pipeline configuration, `Default` carries the original's defaults
 */

use serde::{Deserialize, Serialize};

/// Pipeline-wide tunables. Every field here maps to a `Settings` field in
/// `original_source/src/config.py`; fields that only affect the HTTP/db/auth
/// layers (database_url, host, port, ...) are out of scope and not carried.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
	// --- LLM feature flags ---
	pub use_llm_for_poi_preferences: bool,
	pub use_llm_for_poi_selection: bool,
	pub enable_day_level_poi_selection: bool,
	pub poi_selection_max_candidates: usize,
	pub use_llm_for_district_planning: bool,
	pub use_llm_for_route_optimization: bool,

	// --- Hotel anchor ---
	pub hotel_anchor_enabled: bool,
	pub hotel_anchor_blocks: usize,
	pub hotel_anchor_distance_weight: f64,

	// --- Daily route optimization (classic) ---
	pub enable_daily_route_optimization: bool,
	pub max_optimization_blocks_per_cluster: usize,

	// --- Hop limits ---
	pub enable_travel_hop_limit: bool,
	pub max_travel_minutes_per_hop: i64,
	pub max_hop_distance_km: f64,

	// --- Smart district-based routing ---
	pub enable_smart_routing: bool,
	pub cluster_cell_size_km: f64,
	pub min_pois_per_district: usize,
	pub max_districts_per_city: usize,
	pub smart_routing_min_rating: f64,
	pub district_poi_min_candidates: usize,
	pub district_poi_expansion_factor: f64,

	// --- Candidate fetch ---
	pub candidates_per_block: usize,
	pub max_radius_km: f64,

	// --- Guest limits ---
	pub guest_max_trips: u32,

	// --- Fast draft planner ---
	pub fast_draft_llm_timeout_seconds: u64,
	pub fast_draft_external_concurrency: usize,
	pub fast_draft_per_category_limit: usize,
	pub fast_draft_fetch_deadline_seconds: u64,

	// --- Place replacement ---
	pub replacement_default_limit: usize,
	pub replacement_max_distance_m: f64,
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			use_llm_for_poi_preferences: true,
			use_llm_for_poi_selection: false,
			enable_day_level_poi_selection: true,
			poi_selection_max_candidates: 15,
			use_llm_for_district_planning: true,
			use_llm_for_route_optimization: true,

			hotel_anchor_enabled: true,
			hotel_anchor_blocks: 2,
			hotel_anchor_distance_weight: 0.5,

			enable_daily_route_optimization: true,
			max_optimization_blocks_per_cluster: 5,

			enable_travel_hop_limit: true,
			max_travel_minutes_per_hop: 40,
			max_hop_distance_km: 8.0,

			enable_smart_routing: true,
			cluster_cell_size_km: 1.5,
			min_pois_per_district: 5,
			max_districts_per_city: 8,
			smart_routing_min_rating: 4.5,
			district_poi_min_candidates: 3,
			district_poi_expansion_factor: 2.0,

			candidates_per_block: 20,
			max_radius_km: 15.0,

			guest_max_trips: 1,

			fast_draft_llm_timeout_seconds: 20,
			fast_draft_external_concurrency: 8,
			fast_draft_per_category_limit: 6,
			fast_draft_fetch_deadline_seconds: 55,

			replacement_default_limit: 5,
			replacement_max_distance_m: 3000.0,
		}
	}
}

impl Settings {
	/// Loads defaults, then overlays any env vars present (via `.env` through
	/// `dotenvy`). Unset vars keep the built-in default; unparsable ones are
	/// ignored rather than panicking, since these are tuning knobs, not
	/// required secrets.
	pub fn load() -> Self {
		dotenvy::dotenv().ok();
		let mut settings = Self::default();

		macro_rules! overlay {
			($field:ident) => {
				if let Ok(raw) = std::env::var(stringify!($field).to_uppercase()) {
					if let Ok(parsed) = raw.parse() {
						settings.$field = parsed;
					}
				}
			};
		}

		overlay!(use_llm_for_poi_preferences);
		overlay!(use_llm_for_poi_selection);
		overlay!(enable_day_level_poi_selection);
		overlay!(poi_selection_max_candidates);
		overlay!(use_llm_for_district_planning);
		overlay!(use_llm_for_route_optimization);
		overlay!(hotel_anchor_enabled);
		overlay!(hotel_anchor_blocks);
		overlay!(hotel_anchor_distance_weight);
		overlay!(enable_daily_route_optimization);
		overlay!(max_optimization_blocks_per_cluster);
		overlay!(enable_travel_hop_limit);
		overlay!(max_travel_minutes_per_hop);
		overlay!(max_hop_distance_km);
		overlay!(enable_smart_routing);
		overlay!(cluster_cell_size_km);
		overlay!(min_pois_per_district);
		overlay!(max_districts_per_city);
		overlay!(smart_routing_min_rating);
		overlay!(district_poi_min_candidates);
		overlay!(district_poi_expansion_factor);
		overlay!(candidates_per_block);
		overlay!(max_radius_km);
		overlay!(guest_max_trips);
		overlay!(fast_draft_llm_timeout_seconds);
		overlay!(fast_draft_external_concurrency);
		overlay!(fast_draft_per_category_limit);
		overlay!(fast_draft_fetch_deadline_seconds);
		overlay!(replacement_default_limit);
		overlay!(replacement_max_distance_m);

		settings
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_match_original_source() {
		let s = Settings::default();
		assert_eq!(s.min_pois_per_district, 5);
		assert_eq!(s.max_districts_per_city, 8);
		assert_eq!(s.max_travel_minutes_per_hop, 40);
		assert_eq!(s.max_hop_distance_km, 8.0);
		assert_eq!(s.guest_max_trips, 1);
	}
}
