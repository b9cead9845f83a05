/*
 * src/ports/catalog.rs
 *
 * File for the Places Catalog capability
 *
 * Purpose:
 *   Unified POI search over a local cache plus an external text-search
 *   provider (spec.md §6). The trait is the seam; a `GoogleMapsCatalog`
 *   adapter built on the `google_maps` crate (the teacher's
 *   `agent::tools::research::NearbySearchTool` pattern) implements it
 *   outside the core's test-covered surface.
 *
 * Include:
 *   PlacesCatalog  - search/bulk-search/details port
 *   PoiSearchQuery - the shared search request shape
 */

use std::collections::HashMap;

use async_trait::async_trait;

use crate::domain::poi::POICandidate;
use crate::domain::skeleton::BlockType;
use crate::error::CoreResult;

#[derive(Debug, Clone, Default)]
pub struct PoiSearchQuery {
	pub city: String,
	pub desired_categories: Vec<String>,
	pub budget: Option<crate::domain::trip_spec::Budget>,
	pub limit: usize,
	pub center_location: Option<(f64, f64)>,
	pub city_center: Option<(f64, f64)>,
	/// Defaults to 15km per spec.md §6 unless overridden.
	pub max_radius_km: Option<f64>,
	pub block_type: Option<BlockType>,
	/// Meal-only free-text keywords (e.g. "michelin").
	pub search_keywords: Vec<String>,
}

#[async_trait]
pub trait PlacesCatalog: Send + Sync {
	/// Local-cache lookup first, external text search second; external
	/// results are persisted to the cache before returning. Applies
	/// block-type suitability filtering (§6): meal excludes class/school/
	/// tour-like names, activity/nightlife allow-list external types.
	async fn search_pois(&self, query: PoiSearchQuery) -> CoreResult<Vec<POICandidate>>;

	/// Single-pass fetch of every category at once, used by the fast-draft
	/// planner to bound total round trips.
	async fn search_pois_bulk(
		&self,
		city: &str,
		categories: &[String],
		center_location: Option<(f64, f64)>,
		per_category_limit: usize,
	) -> CoreResult<HashMap<String, Vec<POICandidate>>>;

	async fn fetch_place_details(&self, external_id: &str) -> CoreResult<POICandidate>;
}

/// Block-type suitability filter applied by every `PlacesCatalog`
/// implementation before returning results (spec.md §6).
pub fn filter_for_block_type(pois: Vec<POICandidate>, block_type: BlockType) -> Vec<POICandidate> {
	match block_type {
		BlockType::Meal => pois.into_iter().filter(|p| !p.looks_like_a_class()).collect(),
		_ => pois,
	}
}
