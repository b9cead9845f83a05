/*
 * src/domain/poi.rs
 *
 * File for POICandidate and PreferenceProfile
 *
 * Purpose:
 *   POICandidate is the shared, read-only-downstream record cached from the
 *   Places Catalog. PreferenceProfile is the per-trip scoring profile built
 *   once by the preference agent and threaded through every scoring stage.
 *
 * Include:
 *   POICandidate      - a scored, cacheable place of interest
 *   PreferenceProfile - keyword/category boosts, price/rating constraints
 */

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::trip_spec::StructuredPreference;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct POICandidate {
	pub poi_id: Uuid,
	pub name: String,
	pub category: String,
	pub tags: Vec<String>,
	pub rating: Option<f64>,
	pub user_ratings_total: Option<u32>,
	pub price_level: Option<u8>,
	pub business_status: Option<String>,
	pub open_now: Option<bool>,
	pub address: Option<String>,
	pub lat: Option<f64>,
	pub lon: Option<f64>,
	pub description: Option<String>,
	pub reviews: Vec<String>,
	/// Base score from the catalog provider before preference scoring.
	pub rank_score: f64,
}

impl POICandidate {
	pub fn has_coords(&self) -> bool {
		self.lat.is_some() && self.lon.is_some()
	}

	pub fn coords(&self) -> Option<(f64, f64)> {
		match (self.lat, self.lon) {
			(Some(lat), Some(lon)) => Some((lat, lon)),
			_ => None,
		}
	}

	pub fn is_operational(&self) -> bool {
		match &self.business_status {
			Some(status) => status.eq_ignore_ascii_case("operational"),
			None => true,
		}
	}

	/// Block-type suitability filter for meal candidates (§6 Places Catalog
	/// contract): names matching school/class/tour-style venues are not
	/// restaurants regardless of what category they were tagged with.
	pub fn looks_like_a_class(&self) -> bool {
		const DISALLOWED: &[&str] = &[
			"class", "school", "course", "workshop", "tour", "lesson", "academy",
			"institute", "training", "education",
		];
		let haystack = self.name.to_lowercase();
		DISALLOWED.iter().any(|kw| haystack.contains(kw))
	}

	pub fn haystack(&self) -> String {
		format!("{} {}", self.name, self.tags.join(" ")).to_lowercase()
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferenceProfile {
	pub must_include_keywords: Vec<String>,
	pub avoid_keywords: Vec<String>,
	pub search_keywords: Vec<String>,
	pub category_boosts: HashMap<String, f64>,
	pub tag_boosts: HashMap<String, f64>,
	pub min_rating: f64,
	pub preferred_price_levels: Vec<u8>,
	pub rating_weight: f64,
	pub popularity_weight: f64,
	pub price_level_weight: f64,
	pub structured_preferences: Vec<StructuredPreference>,
}

impl Default for PreferenceProfile {
	fn default() -> Self {
		Self {
			must_include_keywords: Vec::new(),
			avoid_keywords: Vec::new(),
			search_keywords: Vec::new(),
			category_boosts: HashMap::new(),
			tag_boosts: HashMap::new(),
			min_rating: 4.2,
			preferred_price_levels: Vec::new(),
			rating_weight: 1.0,
			popularity_weight: 0.25,
			price_level_weight: 1.5,
			structured_preferences: Vec::new(),
		}
	}
}

impl PreferenceProfile {
	/// Clamps `min_rating` into [3.5, 4.8] per spec.md §4.1/§8.
	pub fn clamp_min_rating(&mut self) {
		self.min_rating = self.min_rating.clamp(3.5, 4.8);
	}
}
