/*
 * src/pipeline/macro_planner.rs
 *
 * File for the Macro Planner
 *
 * Purpose:
 *   Produces `DaySkeleton[]` from `TripSpec` (spec.md §4.4), one themed day
 *   per calendar date, honoring the daily routine's meal windows. LLM path
 *   generates themes; the deterministic builder used here and by the Day
 *   Editor's single-day rebuild always produces a valid skeleton on its own.
 *
 * Include:
 *   plan_macro_days     - full multi-day macro plan (LLM-assisted, with fallback)
 *   rebuild_single_day  - §4.4's "simplified single-day rebuild" used by the day editor
 */

use chrono::{Duration, NaiveTime};
use tracing::warn;

use crate::domain::skeleton::{BlockType, DaySkeleton, SkeletonBlock};
use crate::domain::trip_spec::{DailyRoutine, TripSpec};
use crate::ports::Deps;

pub async fn plan_macro_days(deps: &Deps, trip: &TripSpec) -> Vec<DaySkeleton> {
	let deterministic = deterministic_days(trip);

	let prompt = format!(
		"Generate a {}-day trip skeleton for {} (interests: {:?}, pace: {:?}).",
		trip.day_count(),
		trip.city,
		trip.interests,
		trip.pace
	);
	match deps
		.llm
		.generate_structured(&prompt, Some("Propose day themes only; times and blocks are fixed by the caller."), 800)
		.await
	{
		Ok(response) => apply_llm_themes(deterministic, &response),
		Err(err) => {
			warn!(stage = "macro_planner", reason = %err, "llm macro planning failed, using deterministic skeleton");
			deterministic_days(trip)
		}
	}
}

fn apply_llm_themes(mut days: Vec<DaySkeleton>, response: &serde_json::Value) -> Vec<DaySkeleton> {
	if let Some(themes) = response["day_themes"].as_array() {
		for (day, theme) in days.iter_mut().zip(themes.iter()) {
			if let Some(theme) = theme.as_str() {
				day.theme = theme.to_string();
			}
		}
	}
	days
}

/// The deterministic skeleton builder with no LLM involvement, exposed for
/// callers (the fast-draft planner) that need to skip the themed LLM path
/// entirely under a hard timeout.
pub fn deterministic_skeleton(trip: &TripSpec) -> Vec<DaySkeleton> {
	deterministic_days(trip)
}

fn deterministic_days(trip: &TripSpec) -> Vec<DaySkeleton> {
	let mut days = Vec::new();
	let mut date = trip.start_date;
	let mut day_number = 1u32;
	let wants_nightlife = trip
		.additional_preferences
		.values()
		.any(|v| v.to_lowercase().contains("nightlife"))
		|| trip.interests.iter().any(|i| i.to_lowercase().contains("nightlife"));

	while date <= trip.end_date {
		let blocks = build_day_blocks(&trip.daily_routine, wants_nightlife);
		days.push(DaySkeleton { day_number, date, theme: format!("Day {day_number} in {}", trip.city), blocks });
		date += Duration::days(1);
		day_number += 1;
	}
	days
}

fn block(block_type: BlockType, start: NaiveTime, end: NaiveTime, theme: &str, categories: &[&str]) -> SkeletonBlock {
	SkeletonBlock {
		block_type,
		start_time: start,
		end_time: end,
		theme: theme.to_string(),
		desired_categories: categories.iter().map(|s| s.to_string()).collect(),
	}
}

fn t(hour: u32, min: u32) -> NaiveTime {
	NaiveTime::from_hms_opt(hour, min, 0).unwrap()
}

/// §4.4's "simplified single-day rebuild" insertion rules, shared by the
/// full macro plan and the Day Editor's single-day rebuild.
pub fn build_day_blocks(routine: &DailyRoutine, wants_nightlife: bool) -> Vec<SkeletonBlock> {
	build_day_blocks_in_window(routine.wake_time, routine.sleep_time, routine, wants_nightlife)
}

pub fn build_day_blocks_in_window(
	day_start: NaiveTime,
	day_end: NaiveTime,
	routine: &DailyRoutine,
	wants_nightlife: bool,
) -> Vec<SkeletonBlock> {
	let mut blocks = Vec::new();
	let mut cursor = day_start;

	// Breakfast if the day starts before 10:00.
	if day_start < t(10, 0) {
		let end = routine.breakfast_window.1.max(cursor + Duration::minutes(45));
		blocks.push(block(BlockType::Meal, cursor, end, "Breakfast", &["cafe", "restaurant"]));
		cursor = end;
	}

	// Morning activity after breakfast, or from start if starting later.
	let morning_end = t(12, 0).max(cursor + Duration::minutes(30));
	if cursor < morning_end {
		blocks.push(block(BlockType::Activity, cursor, morning_end, "Morning exploration", &["museum", "attraction"]));
		cursor = morning_end;
	}

	// Lunch near 12:30-13:30 if the day extends past 13:00.
	if day_end > t(13, 0) {
		let start = cursor.max(t(12, 30));
		let end = start + Duration::minutes(60);
		blocks.push(block(BlockType::Meal, start, end, "Lunch", &["restaurant", "cafe"]));
		cursor = end;
	}

	// Afternoon activity if the day extends past 15:00.
	if day_end > t(15, 0) {
		let end = t(17, 0).min(day_end).max(cursor + Duration::minutes(30));
		if end > cursor {
			blocks.push(block(BlockType::Activity, cursor, end, "Afternoon activity", &["attraction", "park"]));
			cursor = end;
		}
	}

	// Dinner starting at 19:00, earlier if the day ends before 19:00 (min 17:00).
	let dinner_start = if day_end < t(19, 0) { cursor.max(t(17, 0)) } else { t(19, 0).max(cursor) };
	let dinner_end = (dinner_start + Duration::minutes(90)).min(day_end.max(dinner_start + Duration::minutes(60)));
	blocks.push(block(BlockType::Meal, dinner_start, dinner_end, "Dinner", &["restaurant"]));
	cursor = dinner_end;

	// Nightlife if the day ends >= 21:00 or the nightlife preset is active.
	if day_end >= t(21, 0) || wants_nightlife {
		let start = cursor.max(t(21, 0));
		let end = day_end.max(start + Duration::minutes(90));
		blocks.push(block(BlockType::Nightlife, start, end, "Nightlife", &["bar", "nightclub"]));
	}

	blocks
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn single_day_has_all_three_meals_when_routine_fits() {
		let routine = DailyRoutine::default();
		let blocks = build_day_blocks(&routine, false);
		let meal_count = blocks.iter().filter(|b| b.block_type == BlockType::Meal).count();
		assert!(meal_count >= 3, "expected >= 3 meals, got {meal_count}");
	}

	#[test]
	fn blocks_are_time_ordered_and_non_overlapping() {
		let routine = DailyRoutine::default();
		let blocks = build_day_blocks(&routine, false);
		for pair in blocks.windows(2) {
			assert!(pair[0].end_time <= pair[1].start_time, "{:?} overlaps {:?}", pair[0], pair[1]);
		}
	}

	#[test]
	fn nightlife_forced_by_preset_even_if_day_ends_early() {
		let routine = DailyRoutine::default();
		let blocks = build_day_blocks_in_window(t(8, 0), t(18, 0), &routine, true);
		assert!(blocks.iter().any(|b| b.block_type == BlockType::Nightlife));
	}
}
