/*
 * src/domain/skeleton.rs
 *
 * File for DaySkeleton / SkeletonBlock
 *
 * Purpose:
 *   The macro planner's output: day-by-day themed, timed blocks without
 *   concrete POIs. Stable input to every downstream POI/routing stage.
 *
 * Include:
 *   DaySkeleton    - one day of the macro plan
 *   SkeletonBlock  - one timed, typed block within a day
 *   BlockType      - meal/activity/nightlife/rest/travel
 */

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
	Meal,
	Activity,
	Nightlife,
	Rest,
	Travel,
}

impl BlockType {
	/// Whether this block type counts toward active/pace-fatigue hours in
	/// the trip critic (§4.8 `_is_active_block`).
	pub fn is_active(self) -> bool {
		matches!(self, BlockType::Meal | BlockType::Activity | BlockType::Nightlife)
	}

	/// Whether blocks of this type carry a POI and can be reordered by the
	/// route optimizer (meals are fixed to their time window; rest/travel
	/// never carry a POI).
	pub fn is_reorderable(self) -> bool {
		matches!(self, BlockType::Activity | BlockType::Nightlife)
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkeletonBlock {
	pub block_type: BlockType,
	pub start_time: NaiveTime,
	pub end_time: NaiveTime,
	pub theme: String,
	pub desired_categories: Vec<String>,
}

impl SkeletonBlock {
	/// Crossing midnight is only legal for nightlife, per spec.md §3.
	pub fn crosses_midnight(&self) -> bool {
		self.end_time < self.start_time
	}

	pub fn is_time_valid(&self) -> bool {
		self.start_time < self.end_time
			|| (self.block_type == BlockType::Nightlife && self.crosses_midnight())
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaySkeleton {
	pub day_number: u32,
	pub date: NaiveDate,
	pub theme: String,
	pub blocks: Vec<SkeletonBlock>,
}

impl DaySkeleton {
	/// No intra-day overlap unless the overlapping block is nightlife
	/// crossing midnight (spec.md §3 invariant).
	pub fn has_overlap(&self) -> bool {
		for pair in self.blocks.windows(2) {
			let (cur, next) = (&pair[0], &pair[1]);
			if cur.crosses_midnight() {
				continue;
			}
			if cur.end_time > next.start_time {
				return true;
			}
		}
		false
	}
}
