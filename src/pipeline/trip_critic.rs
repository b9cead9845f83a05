/*
 * src/pipeline/trip_critic.rs
 *
 * File for the Trip Critic
 *
 * Purpose:
 *   Deterministic rule-based validator producing typed issues (spec.md
 *   §4.8), grounded on `original_source/src/application/trip_critic.py`
 *   field-for-field, including its exact thresholds.
 *
 * Include:
 *   critique_itinerary - entry point; runs every rule over every day
 */

use chrono::{Duration, NaiveTime};

use crate::domain::critique::{CritiqueIssue, IssueCode};
use crate::domain::itinerary::{ItineraryBlock, ItineraryDay};
use crate::domain::skeleton::BlockType;
use crate::domain::trip_spec::Pace;

fn pace_threshold_hours(pace: Pace) -> f64 {
	match pace {
		Pace::Slow => 7.0,
		Pace::Medium => 9.0,
		Pace::Fast => 12.0,
	}
}

fn breakfast_window() -> (u32, u32) {
	(6, 11)
}
fn lunch_window() -> (u32, u32) {
	(11, 16)
}
fn dinner_window() -> (u32, u32) {
	(17, 23)
}

const LONG_TRAVEL_MINUTES: i64 = 45;
const LATE_NIGHTLIFE_HOURS: f64 = 2.0;
const CONSECUTIVE_INTENSE_STREAK: usize = 3;
const CONSECUTIVE_INTENSE_FRACTION: f64 = 0.90;

/// Block duration in hours, handling a nightlife block crossing midnight.
fn block_duration_hours(block: &ItineraryBlock) -> f64 {
	let minutes = if block.end_time < block.start_time {
		let to_midnight = NaiveTime::from_hms_opt(23, 59, 59).unwrap() - block.start_time + Duration::seconds(1);
		let from_midnight = block.end_time - NaiveTime::from_hms_opt(0, 0, 0).unwrap();
		to_midnight + from_midnight
	} else {
		block.end_time - block.start_time
	};
	minutes.num_seconds() as f64 / 3600.0
}

fn active_hours(day: &ItineraryDay) -> f64 {
	day.blocks.iter().filter(|b| b.block_type.is_active()).map(block_duration_hours).sum()
}

fn is_crossing_midnight(start: NaiveTime, end: NaiveTime) -> bool {
	end.hour_lt_6() && start.hour_gt_18()
}

trait HourChecks {
	fn hour_lt_6(&self) -> bool;
	fn hour_gt_18(&self) -> bool;
}
impl HourChecks for NaiveTime {
	fn hour_lt_6(&self) -> bool {
		use chrono::Timelike;
		self.hour() < 6
	}
	fn hour_gt_18(&self) -> bool {
		use chrono::Timelike;
		self.hour() > 18
	}
}

/// Runs every §4.8 rule over every day, plus the cross-day
/// CONSECUTIVE_INTENSE_DAYS rule.
pub fn critique_itinerary(days: &[ItineraryDay], pace: Pace, sleep_time: NaiveTime) -> Vec<CritiqueIssue> {
	use chrono::Timelike;

	let mut issues = Vec::new();
	let pace_threshold = pace_threshold_hours(pace);
	let mut intense_streak = 0usize;

	for day in days {
		let day_active_hours = active_hours(day);
		if day_active_hours > pace_threshold {
			issues.push(
				CritiqueIssue::new(
					IssueCode::DayTooBusy,
					format!("Day {} has {day_active_hours:.1}h of activity, over the {pace_threshold:.1}h pace limit", day.day_number),
				)
				.with_day(day.day_number),
			);
		}

		if day_active_hours > pace_threshold * CONSECUTIVE_INTENSE_FRACTION {
			intense_streak += 1;
			if intense_streak == CONSECUTIVE_INTENSE_STREAK {
				issues.push(
					CritiqueIssue::new(
						IssueCode::ConsecutiveIntenseDays,
						format!("{CONSECUTIVE_INTENSE_STREAK} consecutive days near or over the pace limit ending on day {}", day.day_number),
					)
					.with_day(day.day_number),
				);
				intense_streak = 0;
			}
		} else {
			intense_streak = 0;
		}

		let meal_starts: Vec<u32> = day
			.blocks
			.iter()
			.filter(|b| b.block_type == BlockType::Meal)
			.map(|b| b.start_time.hour())
			.collect();

		let (b_start, b_end) = breakfast_window();
		if !meal_starts.iter().any(|h| (b_start..b_end).contains(h)) {
			issues.push(
				CritiqueIssue::new(IssueCode::MissingBreakfast, format!("Day {} has no breakfast block", day.day_number))
					.with_day(day.day_number),
			);
		}
		let (l_start, l_end) = lunch_window();
		if !meal_starts.iter().any(|h| (l_start..l_end).contains(h)) {
			issues.push(
				CritiqueIssue::new(IssueCode::MissingLunch, format!("Day {} has no lunch block", day.day_number))
					.with_day(day.day_number),
			);
		}
		let (d_start, d_end) = dinner_window();
		if !meal_starts.iter().any(|h| (d_start..d_end).contains(h)) {
			issues.push(
				CritiqueIssue::new(IssueCode::MissingDinner, format!("Day {} has no dinner block", day.day_number))
					.with_day(day.day_number),
			);
		}

		for (idx, block) in day.blocks.iter().enumerate() {
			let crosses_midnight = is_crossing_midnight(block.start_time, block.end_time);
			if block.end_time <= block.start_time && !crosses_midnight {
				issues.push(
					CritiqueIssue::new(
						IssueCode::InvalidTimeRange,
						format!("Day {} block {idx} ends at or before it starts", day.day_number),
					)
					.with_day(day.day_number)
					.with_block(idx),
				);
			}

			if block.travel_time_from_prev > LONG_TRAVEL_MINUTES {
				issues.push(
					CritiqueIssue::new(
						IssueCode::LongTravel,
						format!("Day {} block {idx} has a {} minute hop from the previous block", day.day_number, block.travel_time_from_prev),
					)
					.with_day(day.day_number)
					.with_block(idx),
				);
			}

			if block.block_type == BlockType::Nightlife {
				let overshoot_hours = nightlife_overshoot_hours(block.end_time, sleep_time);
				if overshoot_hours > LATE_NIGHTLIFE_HOURS {
					issues.push(
						CritiqueIssue::new(
							IssueCode::LateNightlife,
							format!("Day {} nightlife block runs {overshoot_hours:.1}h past bedtime", day.day_number),
						)
						.with_day(day.day_number)
						.with_block(idx),
					);
				}
			}

			if let Some(next) = day.blocks.get(idx + 1) {
				if block.end_time > next.start_time {
					issues.push(
						CritiqueIssue::new(
							IssueCode::BlockOverlap,
							format!("Day {} block {idx} overlaps the next block", day.day_number),
						)
						.with_day(day.day_number)
						.with_block(idx),
					);
				}
			}
		}
	}

	issues
}

/// How many hours a nightlife block's end time exceeds `sleep_time`. Each of
/// `end_time`/`sleep_time` independently gets 24h added when its own hour is
/// before 6am, so a post-midnight sleep time is treated as later than an
/// evening one rather than earlier.
fn nightlife_overshoot_hours(end_time: NaiveTime, sleep_time: NaiveTime) -> f64 {
	let end_seconds = if end_time.hour_lt_6() { end_time.num_seconds_from_midnight() + 24 * 3600 } else { end_time.num_seconds_from_midnight() };
	let sleep_seconds = if sleep_time.hour_lt_6() { sleep_time.num_seconds_from_midnight() + 24 * 3600 } else { sleep_time.num_seconds_from_midnight() };
	(end_seconds as f64 - sleep_seconds as f64) / 3600.0
}

trait SecondsFromMidnight {
	fn num_seconds_from_midnight(&self) -> i64;
}
impl SecondsFromMidnight for NaiveTime {
	fn num_seconds_from_midnight(&self) -> i64 {
		use chrono::Timelike;
		self.num_seconds_from_midnight() as i64
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::NaiveDate;

	fn block(block_type: BlockType, start: (u32, u32), end: (u32, u32)) -> ItineraryBlock {
		ItineraryBlock {
			block_type,
			start_time: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
			end_time: NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
			poi: None,
			travel_time_from_prev: 0,
			travel_distance_meters: None,
			travel_polyline: None,
			notes: None,
			geo_suboptimal: false,
		}
	}

	fn day(day_number: u32, blocks: Vec<ItineraryBlock>) -> ItineraryDay {
		ItineraryDay { day_number, date: NaiveDate::from_ymd_opt(2026, 7, 1).unwrap(), theme: String::new(), blocks }
	}

	#[test]
	fn single_activity_day_flags_all_three_missing_meals() {
		let d = day(1, vec![block(BlockType::Activity, (10, 0), (18, 0))]);
		let issues = critique_itinerary(&[d], Pace::Medium, NaiveTime::from_hms_opt(23, 0, 0).unwrap());
		let codes: Vec<_> = issues.iter().map(|i| i.code).collect();
		assert!(codes.contains(&IssueCode::MissingBreakfast));
		assert!(codes.contains(&IssueCode::MissingLunch));
		assert!(codes.contains(&IssueCode::MissingDinner));
	}

	#[test]
	fn long_travel_flagged_over_45_minutes() {
		let mut activity = block(BlockType::Activity, (10, 0), (11, 0));
		activity.travel_time_from_prev = 50;
		let d = day(1, vec![activity]);
		let issues = critique_itinerary(&[d], Pace::Medium, NaiveTime::from_hms_opt(23, 0, 0).unwrap());
		assert!(issues.iter().any(|i| i.code == IssueCode::LongTravel));
	}

	#[test]
	fn day_too_busy_over_pace_threshold() {
		let d = day(
			1,
			vec![
				block(BlockType::Meal, (7, 0), (8, 0)),
				block(BlockType::Activity, (8, 30), (13, 0)),
				block(BlockType::Meal, (13, 0), (14, 0)),
				block(BlockType::Activity, (14, 30), (22, 0)),
			],
		);
		let issues = critique_itinerary(&[d], Pace::Slow, NaiveTime::from_hms_opt(23, 0, 0).unwrap());
		assert!(issues.iter().any(|i| i.code == IssueCode::DayTooBusy));
	}

	#[test]
	fn block_overlap_detected() {
		let d = day(
			1,
			vec![block(BlockType::Activity, (10, 0), (12, 0)), block(BlockType::Activity, (11, 0), (13, 0))],
		);
		let issues = critique_itinerary(&[d], Pace::Medium, NaiveTime::from_hms_opt(23, 0, 0).unwrap());
		assert!(issues.iter().any(|i| i.code == IssueCode::BlockOverlap));
	}

	#[test]
	fn consecutive_intense_days_refires_every_third_day() {
		let intense_day = |n: u32| {
			day(
				n,
				vec![
					block(BlockType::Meal, (7, 0), (8, 0)),
					block(BlockType::Activity, (8, 30), (13, 0)),
					block(BlockType::Meal, (13, 0), (14, 0)),
					block(BlockType::Activity, (14, 30), (22, 0)),
				],
			)
		};
		let days: Vec<_> = (1..=6).map(intense_day).collect();
		let issues = critique_itinerary(&days, Pace::Slow, NaiveTime::from_hms_opt(23, 0, 0).unwrap());
		let consecutive_days: Vec<u32> = issues
			.iter()
			.filter(|i| i.code == IssueCode::ConsecutiveIntenseDays)
			.filter_map(|i| i.day_number)
			.collect();
		assert_eq!(consecutive_days, vec![3, 6]);
	}
}
