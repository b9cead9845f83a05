/*
 * src/domain/change.rs
 *
 * File for the Day Editor's change payload
 *
 * Purpose:
 *   Tagged-variant representation of §9's "dynamic change payload" design
 *   note: a sum type in place of the original's free-shape dict-per-type.
 *
 * Include:
 *   Change    - one granular day edit
 *   Placement - where to insert an added place
 */

use uuid::Uuid;
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::domain::trip_spec::{Budget, Pace};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
	/// Insert at this block index (clamped to the day's block count).
	InSlot(usize),
	/// Insert at the nearest slot to this time.
	AtTime(NaiveTime),
	/// Append; the route optimizer will reorder later.
	Auto,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Change {
	UpdateSettings {
		tempo: Option<Pace>,
		start: Option<NaiveTime>,
		end: Option<NaiveTime>,
		budget: Option<Budget>,
	},
	SetPreset {
		preset: Option<String>,
	},
	AddPlace {
		place_id: Uuid,
		placement: Placement,
	},
	ReplacePlace {
		from_place_id: Uuid,
		to_place_id: Option<Uuid>,
	},
	RemovePlace {
		place_id: Uuid,
	},
	AddWishMessage {
		text: String,
	},
}

impl Change {
	/// Deterministic changes (POI add/replace/remove) vs. context changes
	/// (settings/preset/wish), per §4.9 step 2.
	pub fn is_deterministic(&self) -> bool {
		matches!(self, Change::AddPlace { .. } | Change::ReplacePlace { .. } | Change::RemovePlace { .. })
	}
}
