/*
 * src/pipeline/district_planner.rs
 *
 * File for the District Planner
 *
 * Purpose:
 *   Per-day assignment of each skeleton block to exactly one geographic
 *   district (spec.md §4.3), grounded on
 *   `original_source/src/application/district_planner.py`. LLM-assisted
 *   with a deterministic fallback that is always correct on its own.
 *
 * Include:
 *   DayDistrictPlan    - block_index -> district_id assignments for one day
 *   plan_day_districts - LLM-assisted entry point
 *   deterministic_plan - the fallback (and default) planner
 */

use std::collections::HashMap;

use tracing::warn;

use crate::domain::district::ClusteringResult;
use crate::domain::skeleton::{BlockType, DaySkeleton};
use crate::ports::{Deps, LlmGateway};

#[derive(Debug, Clone, Default)]
pub struct DayDistrictPlan {
	pub assignments: HashMap<usize, String>,
}

impl DayDistrictPlan {
	pub fn district_for(&self, block_index: usize) -> Option<&str> {
		self.assignments.get(&block_index).map(|s| s.as_str())
	}
}

pub async fn plan_day_districts(
	deps: &Deps,
	city: &str,
	skeleton: &DaySkeleton,
	clustering: &ClusteringResult,
	previous_day_anchor: Option<(f64, f64)>,
	previous_day_district: Option<&str>,
) -> DayDistrictPlan {
	if clustering.districts.is_empty() {
		return DayDistrictPlan::default();
	}

	if !deps.settings.use_llm_for_district_planning {
		return deterministic_plan(skeleton, clustering, previous_day_anchor, previous_day_district);
	}

	let districts_info: Vec<_> = clustering
		.districts
		.values()
		.map(|d| {
			serde_json::json!({
				"district_id": d.id,
				"name": d.name,
				"total_pois": d.total_pois,
				"top_categories": d.category_counts.keys().take(5).collect::<Vec<_>>(),
			})
		})
		.collect();
	let blocks_info: Vec<_> = skeleton
		.blocks
		.iter()
		.enumerate()
		.map(|(idx, b)| {
			serde_json::json!({
				"block_index": idx,
				"type": format!("{:?}", b.block_type),
				"required_categories": b.desired_categories,
			})
		})
		.collect();

	let prompt = format!(
		"Plan district assignments for day {} in {city}.\nDistricts: {districts_info}\nBlocks: {blocks_info}\n\
		 Assign every block to a district id from the list. Minimize district changes.",
		skeleton.day_number,
	);
	const SYSTEM_PROMPT: &str = "You are a travel route optimizer assigning city districts to time blocks. \
		You MUST assign EVERY block to a district from the provided list. Output ONLY valid JSON: \
		{\"assignments\": [{\"block_index\": 0, \"district_id\": \"A\"}]}";

	match deps.llm.generate_structured(&prompt, Some(SYSTEM_PROMPT), 512).await {
		Ok(response) => match validate_llm_plan(&response, skeleton, clustering) {
			Some(plan) => return plan,
			None => warn!(stage = "district_planner", "llm response failed validation, falling back"),
		},
		Err(err) => warn!(stage = "district_planner", reason = %err, "llm district planning failed, falling back"),
	}

	deterministic_plan(skeleton, clustering, previous_day_anchor, previous_day_district)
}

fn validate_llm_plan(
	response: &serde_json::Value,
	skeleton: &DaySkeleton,
	clustering: &ClusteringResult,
) -> Option<DayDistrictPlan> {
	let assignments = response["assignments"].as_array()?;
	let mut plan = DayDistrictPlan::default();
	for entry in assignments {
		let block_index = entry["block_index"].as_u64()? as usize;
		let district_id = entry["district_id"].as_str()?.to_string();
		if !clustering.districts.contains_key(&district_id) {
			return None;
		}
		plan.assignments.insert(block_index, district_id);
	}
	if plan.assignments.len() != skeleton.blocks.len() {
		return None;
	}
	Some(plan)
}

/// Deterministic fallback (§4.3): start in the previous-day anchor's
/// district if known, else hotel district, else the first district; for
/// each block stay if the current district covers its categories, else move
/// to the nearest district that does; override the last meal/rest block to
/// the hotel district when it covers its categories.
pub fn deterministic_plan(
	skeleton: &DaySkeleton,
	clustering: &ClusteringResult,
	previous_day_anchor: Option<(f64, f64)>,
	previous_day_district: Option<&str>,
) -> DayDistrictPlan {
	let mut plan = DayDistrictPlan::default();
	if clustering.districts.is_empty() {
		return plan;
	}

	let first_district_id = clustering.districts.keys().next().cloned().unwrap();
	let mut current = previous_day_district
		.filter(|id| clustering.districts.contains_key(*id))
		.map(String::from)
		.or_else(|| clustering.hotel_district_id.clone())
		.unwrap_or(first_district_id);

	if let Some((lat, lon)) = previous_day_anchor {
		if let Some(nearest) = clustering.nearest_district(lat, lon, &[]) {
			current = nearest.id.clone();
		}
	}

	for (idx, block) in skeleton.blocks.iter().enumerate() {
		let covers_current = clustering
			.get(&current)
			.map(|d| d.has_category(&block.desired_categories))
			.unwrap_or(false);

		if !covers_current {
			if let Some(nearest) = clustering.nearest_district(
				clustering.get(&current).map(|d| d.center.0).unwrap_or(0.0),
				clustering.get(&current).map(|d| d.center.1).unwrap_or(0.0),
				&block.desired_categories,
			) {
				current = nearest.id.clone();
			}
		}

		plan.assignments.insert(idx, current.clone());
	}

	// Last-block-to-hotel override for meal/rest.
	if let Some(hotel_id) = &clustering.hotel_district_id {
		if let Some((last_idx, last_block)) = skeleton.blocks.iter().enumerate().last() {
			if matches!(last_block.block_type, BlockType::Meal | BlockType::Rest) {
				if clustering.get(hotel_id).map(|d| d.has_category(&last_block.desired_categories)).unwrap_or(false) {
					plan.assignments.insert(last_idx, hotel_id.clone());
				}
			}
		}
	}

	plan
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::domain::district::District;
	use crate::domain::poi::POICandidate;
	use crate::domain::skeleton::SkeletonBlock;
	use chrono::NaiveTime;

	fn poi(category: &str) -> POICandidate {
		POICandidate {
			poi_id: uuid::Uuid::new_v4(),
			name: "P".into(),
			category: category.into(),
			tags: vec![],
			rating: Some(4.5),
			user_ratings_total: None,
			price_level: None,
			business_status: None,
			open_now: None,
			address: None,
			lat: Some(48.85),
			lon: Some(2.35),
			description: None,
			reviews: vec![],
			rank_score: 1.0,
		}
	}

	fn block(block_type: BlockType, categories: &[&str]) -> SkeletonBlock {
		SkeletonBlock {
			block_type,
			start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
			end_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
			theme: String::new(),
			desired_categories: categories.iter().map(|s| s.to_string()).collect(),
		}
	}

	#[test]
	fn single_district_gets_every_block_with_no_changes() {
		let mut district = District::new("A".into(), (48.85, 2.35));
		district.add_poi(poi("cafe"));
		district.add_poi(poi("park"));
		let mut districts = std::collections::BTreeMap::new();
		districts.insert("A".to_string(), district);
		let clustering = ClusteringResult { districts, hotel_district_id: Some("A".into()), city_center: None };

		let skeleton = DaySkeleton {
			day_number: 1,
			date: chrono::NaiveDate::from_ymd_opt(2026, 7, 1).unwrap(),
			theme: "Day".into(),
			blocks: vec![block(BlockType::Meal, &["cafe"]), block(BlockType::Activity, &["park"])],
		};

		let plan = deterministic_plan(&skeleton, &clustering, None, None);
		assert_eq!(plan.district_for(0), Some("A"));
		assert_eq!(plan.district_for(1), Some("A"));
	}

	#[test]
	fn ends_with_dinner_back_at_hotel_district() {
		let mut district_a = District::new("A".into(), (48.85, 2.35));
		district_a.add_poi(poi("cafe"));
		district_a.add_poi(poi("restaurant"));
		let mut district_b = District::new("B".into(), (48.90, 2.40));
		district_b.add_poi(poi("park"));

		let mut districts = std::collections::BTreeMap::new();
		districts.insert("A".to_string(), district_a);
		districts.insert("B".to_string(), district_b);
		let clustering = ClusteringResult { districts, hotel_district_id: Some("A".into()), city_center: None };

		let skeleton = DaySkeleton {
			day_number: 1,
			date: chrono::NaiveDate::from_ymd_opt(2026, 7, 1).unwrap(),
			theme: "Day".into(),
			blocks: vec![
				block(BlockType::Meal, &["cafe"]),
				block(BlockType::Activity, &["park"]),
				block(BlockType::Meal, &["restaurant"]),
				block(BlockType::Activity, &["park"]),
				block(BlockType::Meal, &["restaurant"]),
			],
		};

		let plan = deterministic_plan(&skeleton, &clustering, None, None);
		assert_eq!(plan.district_for(4), Some("A"));
	}
}
