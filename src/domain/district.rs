/*
 * src/domain/district.rs
 *
 * File for District / ClusteringResult
 *
 * Purpose:
 *   Transient (per-trip-generation-pass) spatial clustering of POIs into
 *   named districts, produced by the Geographic Clusterer and consumed by
 *   the District Planner and Smart Route Optimizer.
 *
 * Include:
 *   District         - one labeled geographic cluster of POIs
 *   ClusteringResult - the full set of districts for a clustering pass
 */

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::poi::POICandidate;
use crate::pipeline::scoring::haversine_km;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct District {
	/// Single uppercase letter ("A", "B", ...).
	pub id: String,
	pub name: String,
	pub center: (f64, f64),
	pub pois: Vec<POICandidate>,
	pub category_counts: BTreeMap<String, u32>,
	pub avg_rating: f64,
	pub total_pois: usize,
	/// §4.6 step 3: average of the top-5 `score_candidate` values over this
	/// district's POIs against the trip's full required-category union.
	/// Populated by the smart route optimizer after clustering; zero until
	/// then.
	pub preference_score: f64,
	/// Profile keywords (must-include/tag boosts) matched by name+tags
	/// across this district's POIs.
	pub preference_signals: Vec<String>,
	/// Subset of the trip's required categories this district covers.
	pub category_coverage: Vec<String>,
}

impl District {
	pub fn new(id: String, center: (f64, f64)) -> Self {
		Self {
			id,
			name: String::new(),
			center,
			pois: Vec::new(),
			category_counts: BTreeMap::new(),
			avg_rating: 0.0,
			total_pois: 0,
			preference_score: 0.0,
			preference_signals: Vec::new(),
			category_coverage: Vec::new(),
		}
	}

	pub fn add_poi(&mut self, poi: POICandidate) {
		if !poi.category.is_empty() {
			*self.category_counts.entry(poi.category.clone()).or_insert(0) += 1;
		}
		self.pois.push(poi);
		self.total_pois = self.pois.len();
		let ratings: Vec<f64> = self.pois.iter().filter_map(|p| p.rating).collect();
		self.avg_rating = if ratings.is_empty() {
			0.0
		} else {
			ratings.iter().sum::<f64>() / ratings.len() as f64
		};
	}

	/// Dominant category by POI count, used to name the district
	/// ("District {letter} ({top category})").
	pub fn top_category(&self) -> Option<&str> {
		self.category_counts
			.iter()
			.max_by_key(|(_, count)| **count)
			.map(|(cat, _)| cat.as_str())
	}

	pub fn has_category(&self, categories: &[String]) -> bool {
		if categories.is_empty() {
			return true;
		}
		categories.iter().any(|cat| {
			let cat = cat.to_lowercase();
			self.category_counts.keys().any(|c| c.to_lowercase() == cat)
				|| self.pois.iter().any(|p| p.tags.iter().any(|t| t.to_lowercase().contains(&cat)))
		})
	}

	pub fn pois_by_category(
		&self,
		categories: &[String],
		min_rating: f64,
		exclude: &std::collections::HashSet<Uuid>,
	) -> Vec<POICandidate> {
		let mut result: Vec<POICandidate> = self
			.pois
			.iter()
			.filter(|p| !exclude.contains(&p.poi_id))
			.filter(|p| p.rating.unwrap_or(0.0) >= min_rating)
			.filter(|p| {
				if categories.is_empty() {
					return true;
				}
				let cat_match = categories
					.iter()
					.any(|c| p.category.eq_ignore_ascii_case(c));
				let tag_match = categories
					.iter()
					.any(|c| p.tags.iter().any(|t| t.to_lowercase().contains(&c.to_lowercase())));
				cat_match || tag_match
			})
			.cloned()
			.collect();
		result.sort_by(|a, b| b.rating.unwrap_or(0.0).partial_cmp(&a.rating.unwrap_or(0.0)).unwrap());
		result
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusteringResult {
	pub districts: BTreeMap<String, District>,
	pub hotel_district_id: Option<String>,
	pub city_center: Option<(f64, f64)>,
}

impl ClusteringResult {
	pub fn get(&self, district_id: &str) -> Option<&District> {
		self.districts.get(district_id)
	}

	/// Nearest district to a point, optionally filtered to ones covering
	/// `categories` (spec.md §4.2 `get_nearest_district`).
	pub fn nearest_district(&self, lat: f64, lon: f64, categories: &[String]) -> Option<&District> {
		self.districts
			.values()
			.filter(|d| categories.is_empty() || d.has_category(categories))
			.min_by(|a, b| {
				let da = haversine_km(lat, lon, a.center.0, a.center.1);
				let db = haversine_km(lat, lon, b.center.0, b.center.1);
				da.partial_cmp(&db).unwrap()
			})
	}

	pub fn districts_sorted_by_distance(&self, lat: f64, lon: f64) -> Vec<(&District, f64)> {
		let mut result: Vec<(&District, f64)> = self
			.districts
			.values()
			.map(|d| (d, haversine_km(lat, lon, d.center.0, d.center.1)))
			.collect();
		result.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap());
		result
	}
}
