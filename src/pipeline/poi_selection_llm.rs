/*
 * src/pipeline/poi_selection_llm.rs
 *
 * File for the POI Selection LLM Service
 *
 * Purpose:
 *   §4.11: the LLM only ever selects among the candidate ids the POI
 *   Planner already filtered and scored. Day-level mode makes one call per
 *   day covering every POI-needing block; per-block mode (the fallback for
 *   whichever blocks the day-level call left unfilled) makes one call per
 *   block. Any unknown id, any id duplicated across blocks, or malformed
 *   JSON is dropped rather than trusted, leaving the caller to fall back to
 *   its deterministic top-ranked candidate for that block (spec.md §4.5
 *   step 6, §4.11), grounded on
 *   `original_source/src/application/poi_planner.py`'s
 *   `day_block_candidates`/`selected_by_block` day-then-per-block dance and
 *   `original_source/src/application/poi_selection_llm.py`'s safety
 *   invariant ("the LLM can ONLY choose from candidates provided to it").
 *
 * Include:
 *   select_day   - one call per day; block_index -> chosen poi_id, partial
 *   select_block - per-block fallback; returns the LLM's pick, if valid
 */

use std::collections::{HashMap, HashSet};

use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use crate::domain::poi::POICandidate;
use crate::domain::skeleton::DaySkeleton;
use crate::domain::trip_spec::TripSpec;
use crate::ports::Deps;

fn candidate_summary(candidate: &POICandidate) -> Value {
	serde_json::json!({
		"id": candidate.poi_id,
		"name": candidate.name,
		"category": candidate.category,
		"tags": candidate.tags,
		"rating": candidate.rating,
		"price_level": candidate.price_level,
		"description": candidate.description,
	})
}

const DAY_SELECTION_SYSTEM_PROMPT: &str = "You are selecting places of interest for a trip itinerary. \
	You MUST pick exactly one candidate id per block, and ONLY from that block's own candidate list. \
	Never invent an id. Output ONLY valid JSON: \
	{\"selections\": [{\"block_index\": 0, \"poi_id\": \"<uuid from that block's candidates>\"}]}";

const BLOCK_SELECTION_SYSTEM_PROMPT: &str = "You are selecting a place of interest for one itinerary block. \
	You MUST pick exactly one candidate id, and ONLY from the provided candidate list. Never invent an id. \
	Output ONLY valid JSON: {\"poi_id\": \"<uuid from the candidate list>\"}";

/// §4.11 day-level selection: one call covering every POI-needing block of
/// `skeleton`. Returns `block_index -> poi_id` only for the entries that
/// validated (known block, known id, id not reused across another block in
/// this response); a block absent from the result is the caller's cue to
/// fall back to per-block selection or the deterministic top candidate.
pub async fn select_day(
	deps: &Deps,
	trip: &TripSpec,
	skeleton: &DaySkeleton,
	candidates_by_block: &HashMap<usize, Vec<POICandidate>>,
	already_selected: &HashSet<Uuid>,
) -> HashMap<usize, Uuid> {
	if candidates_by_block.is_empty() {
		return HashMap::new();
	}

	let ordered_indices: Vec<usize> = {
		let mut v: Vec<usize> = candidates_by_block.keys().copied().collect();
		v.sort_unstable();
		v
	};
	let blocks_info: Vec<Value> = ordered_indices
		.iter()
		.map(|&idx| {
			let block = &skeleton.blocks[idx];
			serde_json::json!({
				"block_index": idx,
				"block_type": format!("{:?}", block.block_type),
				"theme": block.theme,
				"start_time": block.start_time.to_string(),
				"desired_categories": block.desired_categories,
				"candidates": candidates_by_block[&idx].iter().map(candidate_summary).collect::<Vec<_>>(),
			})
		})
		.collect();

	let prompt = format!(
		"Day {} of a trip to {} ({:?} pace, {:?} budget). Theme: {}.\n\
		 Places already used elsewhere in the trip: {:?}\n\
		 Blocks needing a place: {blocks_info}",
		skeleton.day_number, trip.city, trip.pace, trip.budget, skeleton.theme, already_selected,
	);

	let response = match deps.llm.generate_structured(&prompt, Some(DAY_SELECTION_SYSTEM_PROMPT), 1024).await {
		Ok(response) => response,
		Err(err) => {
			warn!(stage = "poi_selection_llm", reason = %err, "day-level llm selection failed, falling back");
			return HashMap::new();
		}
	};

	validate_day_selections(&response, candidates_by_block)
}

/// Parses and validates `{"selections": [{"block_index", "poi_id"}]}`
/// against the candidate ids actually offered for each block index,
/// dropping any entry with an unknown block, an id outside that block's own
/// list, or an id that repeats across another entry in the same response.
fn validate_day_selections(response: &Value, candidates_by_block: &HashMap<usize, Vec<POICandidate>>) -> HashMap<usize, Uuid> {
	let Some(entries) = response["selections"].as_array() else {
		warn!(stage = "poi_selection_llm", "day-level llm response missing a selections array, falling back");
		return HashMap::new();
	};

	let mut raw: Vec<(usize, Uuid)> = Vec::new();
	for entry in entries {
		let Some(block_index) = entry["block_index"].as_u64().map(|n| n as usize) else { continue };
		let Some(poi_id) = entry["poi_id"].as_str().and_then(|s| Uuid::parse_str(s).ok()) else { continue };
		let Some(candidates) = candidates_by_block.get(&block_index) else { continue };
		if !candidates.iter().any(|c| c.poi_id == poi_id) {
			continue;
		}
		raw.push((block_index, poi_id));
	}

	let mut seen_ids: HashSet<Uuid> = HashSet::new();
	let mut duplicated: HashSet<Uuid> = HashSet::new();
	for (_, poi_id) in &raw {
		if !seen_ids.insert(*poi_id) {
			duplicated.insert(*poi_id);
		}
	}

	raw.into_iter().filter(|(_, poi_id)| !duplicated.contains(poi_id)).collect()
}

/// §4.11 per-block fallback: one call selecting (and optionally reordering)
/// among the candidates already offered for a single block. Returns the
/// LLM's pick if it names a candidate from the supplied list, else `None`.
pub async fn select_block(deps: &Deps, trip: &TripSpec, skeleton: &DaySkeleton, block_index: usize, candidates: &[POICandidate]) -> Option<Uuid> {
	if candidates.is_empty() {
		return None;
	}
	let block = skeleton.blocks.get(block_index)?;

	let prompt = format!(
		"Day {} of a trip to {} ({:?} pace, {:?} budget). Block: {:?} \"{}\" starting {}.\nCandidates: {}",
		skeleton.day_number,
		trip.city,
		trip.pace,
		trip.budget,
		block.block_type,
		block.theme,
		block.start_time,
		serde_json::Value::Array(candidates.iter().map(candidate_summary).collect()),
	);

	let response = match deps.llm.generate_structured(&prompt, Some(BLOCK_SELECTION_SYSTEM_PROMPT), 256).await {
		Ok(response) => response,
		Err(err) => {
			warn!(stage = "poi_selection_llm", reason = %err, "per-block llm selection failed, falling back");
			return None;
		}
	};

	let poi_id = response["poi_id"].as_str().and_then(|s| Uuid::parse_str(s).ok())?;
	candidates.iter().any(|c| c.poi_id == poi_id).then_some(poi_id)
}
