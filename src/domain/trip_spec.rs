/*
 * src/domain/trip_spec.rs
 *
 * File for TripSpec and its nested value types
 *
 * Purpose:
 *   Normalized trip intent: city, dates, pace, budget, interests, daily
 *   routine windows, hotel, and free-form/structured preferences. The sole
 *   input to the macro planner and the sole mutation target of trip chat.
 *
 * Include:
 *   TripSpec            - normalized trip intent
 *   Owner                - exactly one of {user, device, legacy-public}
 *   Pace, Budget         - trip-wide dials
 *   DailyRoutine         - wake/sleep/meal windows
 *   Hotel                - text + coordinates
 *   StructuredPreference - keyword/category/price-level preference
 *   PriceLevel           - cheap/moderate/expensive bucket
 */

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreResult, Error};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pace {
	Slow,
	Medium,
	Fast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Budget {
	Low,
	Medium,
	High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceLevel {
	Cheap,
	Moderate,
	Expensive,
}

impl PriceLevel {
	/// Maps a structured preference's price bucket to Google-style 0-4 price
	/// levels, per `original_source/src/application/poi_agent.py`'s
	/// `price_map` (`cheap→{0,1}`, `moderate→{2}`, `expensive→{3,4}`).
	pub fn levels(self) -> &'static [u8] {
		match self {
			PriceLevel::Cheap => &[0, 1],
			PriceLevel::Moderate => &[2],
			PriceLevel::Expensive => &[3, 4],
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredPreference {
	pub keyword: Option<String>,
	pub category: Option<String>,
	pub price_level: Option<PriceLevel>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DailyRoutine {
	pub wake_time: NaiveTime,
	pub sleep_time: NaiveTime,
	pub breakfast_window: (NaiveTime, NaiveTime),
	pub lunch_window: (NaiveTime, NaiveTime),
	pub dinner_window: (NaiveTime, NaiveTime),
}

impl Default for DailyRoutine {
	fn default() -> Self {
		Self {
			wake_time: NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
			sleep_time: NaiveTime::from_hms_opt(23, 0, 0).unwrap(),
			breakfast_window: (
				NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
				NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
			),
			lunch_window: (
				NaiveTime::from_hms_opt(12, 30, 0).unwrap(),
				NaiveTime::from_hms_opt(13, 30, 0).unwrap(),
			),
			dinner_window: (
				NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
				NaiveTime::from_hms_opt(20, 30, 0).unwrap(),
			),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hotel {
	pub text: String,
	pub lat: f64,
	pub lon: f64,
}

/// Exactly one of {user, device, legacy-public} per the owner invariant in
/// spec.md §3. Ownership checks (`own`) live in `crate::ports::auth`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Owner {
	User(Uuid),
	Device(String),
	LegacyPublic,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripSpec {
	pub id: Uuid,
	pub city: String,
	pub city_center: (f64, f64),
	pub start_date: NaiveDate,
	pub end_date: NaiveDate,
	pub traveler_count: u32,
	pub pace: Pace,
	pub budget: Budget,
	pub interests: Vec<String>,
	pub daily_routine: DailyRoutine,
	pub hotel: Hotel,
	/// Free-form chat-collected preferences, keyed by topic.
	pub additional_preferences: HashMap<String, String>,
	pub structured_preferences: Vec<StructuredPreference>,
	pub owner: Owner,
}

impl TripSpec {
	/// Number of days in the trip, inclusive of both endpoints.
	pub fn day_count(&self) -> i64 {
		(self.end_date - self.start_date).num_days() + 1
	}

	pub fn validate(&self) -> CoreResult<()> {
		if self.end_date < self.start_date {
			return Err(Error::InvalidInput(
				"end_date must be on or after start_date".into(),
			));
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn spec(start: NaiveDate, end: NaiveDate) -> TripSpec {
		TripSpec {
			id: Uuid::nil(),
			city: "Paris".into(),
			city_center: (48.8566, 2.3522),
			start_date: start,
			end_date: end,
			traveler_count: 2,
			pace: Pace::Medium,
			budget: Budget::Medium,
			interests: vec![],
			daily_routine: DailyRoutine::default(),
			hotel: Hotel { text: "Hotel".into(), lat: 48.85, lon: 2.35 },
			additional_preferences: HashMap::new(),
			structured_preferences: vec![],
			owner: Owner::LegacyPublic,
		}
	}

	#[test]
	fn single_day_trip_has_one_day() {
		let d = NaiveDate::from_ymd_opt(2026, 7, 1).unwrap();
		assert_eq!(spec(d, d).day_count(), 1);
	}

	#[test]
	fn end_before_start_is_invalid() {
		let start = NaiveDate::from_ymd_opt(2026, 7, 2).unwrap();
		let end = NaiveDate::from_ymd_opt(2026, 7, 1).unwrap();
		assert!(spec(start, end).validate().is_err());
	}
}
