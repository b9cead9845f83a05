/*
 * src/ports/auth.rs
 *
 * File for the auth-context capability
 *
 * Purpose:
 *   The core only consumes an `AuthContext` and the ownership predicate
 *   (spec.md §1, §6); the session/device identity layer and freemium gate
 *   themselves are out of scope.
 *
 * Include:
 *   AuthContext - the caller identity as seen by the core
 *   own         - ownership predicate
 */

use uuid::Uuid;

use crate::domain::trip_spec::{Owner, TripSpec};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthContext {
	User(Uuid),
	Device(String),
	/// Legacy trips created before auth existed; publicly accessible.
	Anonymous,
}

/// `trip.user_id == ctx.user_id` for authenticated callers,
/// `trip.device_id == ctx.device_id` for guests, or `trip.is_legacy_public`
/// otherwise (spec.md §6).
pub fn own(trip: &TripSpec, ctx: &AuthContext) -> bool {
	match (&trip.owner, ctx) {
		(Owner::User(owner_id), AuthContext::User(caller_id)) => owner_id == caller_id,
		(Owner::Device(owner_device), AuthContext::Device(caller_device)) => owner_device == caller_device,
		(Owner::LegacyPublic, _) => true,
		_ => false,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::NaiveDate;
	use std::collections::HashMap;

	fn trip_with_owner(owner: Owner) -> TripSpec {
		TripSpec {
			id: Uuid::nil(),
			city: "Paris".into(),
			city_center: (48.8566, 2.3522),
			start_date: NaiveDate::from_ymd_opt(2026, 7, 1).unwrap(),
			end_date: NaiveDate::from_ymd_opt(2026, 7, 1).unwrap(),
			traveler_count: 1,
			pace: crate::domain::trip_spec::Pace::Medium,
			budget: crate::domain::trip_spec::Budget::Medium,
			interests: vec![],
			daily_routine: Default::default(),
			hotel: crate::domain::trip_spec::Hotel { text: String::new(), lat: 0.0, lon: 0.0 },
			additional_preferences: HashMap::new(),
			structured_preferences: vec![],
			owner,
		}
	}

	#[test]
	fn user_owns_their_trip() {
		let id = Uuid::new_v4();
		let trip = trip_with_owner(Owner::User(id));
		assert!(own(&trip, &AuthContext::User(id)));
		assert!(!own(&trip, &AuthContext::User(Uuid::new_v4())));
	}

	#[test]
	fn legacy_public_is_open() {
		let trip = trip_with_owner(Owner::LegacyPublic);
		assert!(own(&trip, &AuthContext::Anonymous));
		assert!(own(&trip, &AuthContext::User(Uuid::new_v4())));
	}

	#[test]
	fn device_must_match() {
		let trip = trip_with_owner(Owner::Device("dev-1".into()));
		assert!(own(&trip, &AuthContext::Device("dev-1".into())));
		assert!(!own(&trip, &AuthContext::Device("dev-2".into())));
	}
}
