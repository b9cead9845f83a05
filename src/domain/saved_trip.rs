/*
 * src/domain/saved_trip.rs
 *
 * File for SavedTrip / GuestDevice
 *
 * Purpose:
 *   User-managed trip bookmarks and the guest-device trip-count gate that
 *   the core's orchestrator consults before running paid-tier stages.
 *
 * Include:
 *   SavedTrip   - a user's bookmark of a trip
 *   GuestDevice - per-device generated-trip counter
 */

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedTrip {
	pub id: Uuid,
	pub user_id: Uuid,
	pub trip_id: Uuid,
	pub city_name: String,
	pub dates: (NaiveDate, NaiveDate),
	pub hero_image: Option<String>,
	pub route_snapshot: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuestDevice {
	pub device_id: String,
	pub generated_trips_count: u32,
}

impl GuestDevice {
	/// §5 "Guest limits": a device may generate at most `guest_max_trips`
	/// plans; content for unauthenticated callers is day-1-only.
	pub fn can_generate_another(&self, guest_max_trips: u32) -> bool {
		self.generated_trips_count < guest_max_trips
	}
}

/// Truncates a full itinerary to day 1 for unauthenticated/guest callers
/// (§5). Pure predicate/transform; the identity/session layer that decides
/// *who* is a guest is out of scope.
pub fn limit_to_first_day<T: Clone>(days: &[T], is_guest: bool) -> Vec<T> {
	if is_guest {
		days.iter().take(1).cloned().collect()
	} else {
		days.to_vec()
	}
}
