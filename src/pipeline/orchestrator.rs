/*
 * src/pipeline/orchestrator.rs
 *
 * File for the Trip Planner Orchestrator
 *
 * Purpose:
 *   Runs the full pipeline for one trip: macro plan, then either the smart
 *   district router or the classic POI-plan + route/time path, then the
 *   critic (spec.md §2 "Trip Planner Orchestrator", §5 ordering guarantees).
 *   Idempotent: re-running overwrites the trip's single itinerary row with
 *   freshly computed artifacts rather than appending.
 *
 * Include:
 *   plan_trip - entry point; persists a full Itinerary and returns it
 */

use tracing::info;

use crate::domain::itinerary::Itinerary;
use crate::domain::saved_trip::{limit_to_first_day, GuestDevice};
use crate::domain::trip_spec::TripSpec;
use crate::error::{CoreResult, Error};
use crate::pipeline::macro_planner::plan_macro_days;
use crate::pipeline::poi_planner::plan_pois;
use crate::pipeline::preference_agent::build_profile;
use crate::pipeline::route_optimizer::optimize_day_route;
use crate::pipeline::smart_route_optimizer::build_smart_itinerary;
use crate::pipeline::trip_critic::critique_itinerary;
use crate::ports::{Deps, Repository};

/// §5 "Guest limits": consulted before running the (paid-tier) full
/// pipeline for an unauthenticated device. The identity/session layer
/// decides *who* is a guest; this predicate only encodes the count gate.
pub fn guest_gate(device: Option<&GuestDevice>, guest_max_trips: u32) -> bool {
	match device {
		Some(device) => device.can_generate_another(guest_max_trips),
		None => true,
	}
}

/// Full pipeline for one trip, idempotent under re-runs: macro plan ->
/// (smart route | POI plan -> route/time) -> critique -> persist.
pub async fn plan_trip(deps: &Deps, trip: &TripSpec) -> CoreResult<Itinerary> {
	trip.validate()?;

	info!(stage = "orchestrator", trip_id = %trip.id, "starting trip plan");

	let profile = build_profile(deps, trip).await;
	let skeletons = plan_macro_days(deps, trip).await;

	let days = if deps.settings.enable_smart_routing {
		build_smart_itinerary(deps, trip, &skeletons, &profile).await
	} else {
		let poi_plan = plan_pois(deps, trip, &skeletons, &profile).await;
		let mut days = Vec::with_capacity(skeletons.len());
		for skeleton in &skeletons {
			days.push(optimize_day_route(deps, skeleton, &poi_plan).await);
		}
		days
	};

	let critique_issues = critique_itinerary(&days, trip.pace, trip.daily_routine.sleep_time);

	let mut itinerary = deps.repository.get_itinerary(trip.id).await?.unwrap_or_else(|| Itinerary::new(trip.id, chrono::Utc::now()));
	itinerary.macro_plan = Some(skeletons);
	itinerary.days = Some(days);
	itinerary.critique_issues = critique_issues;
	itinerary.updated_at = chrono::Utc::now();

	if !deps.settings.enable_smart_routing {
		// poi_plan is only produced by the classic path; the smart router
		// folds selection directly into `days` and leaves no separate plan.
		itinerary.poi_plan = None;
	}

	deps.repository.put_itinerary(&itinerary).await?;

	info!(stage = "orchestrator", trip_id = %trip.id, days = itinerary.days.as_ref().map(|d| d.len()).unwrap_or(0), "trip plan complete");

	Ok(itinerary)
}

/// Guest-limited view of a freshly planned or loaded itinerary: content
/// beyond day 1 is withheld from unauthenticated callers (§5).
pub fn view_for_guest(itinerary: &Itinerary, is_guest: bool) -> Itinerary {
	let mut limited = itinerary.clone();
	if let Some(days) = &itinerary.days {
		limited.days = Some(limit_to_first_day(days, is_guest));
	}
	limited
}

/// Runs the full pipeline after checking the guest gate, bumping the
/// device's generated-trip counter on success. The boundary layer maps a
/// refused gate to PAYWALL_REQUIRED (§6); the core only needs to refuse
/// the stage, via `Error::InvalidInput`.
pub async fn plan_trip_for_device(deps: &Deps, trip: &TripSpec, device_id: &str) -> CoreResult<Itinerary> {
	let device = deps.repository.get_guest_device(device_id).await?;
	if !guest_gate(device.as_ref(), deps.settings.guest_max_trips) {
		return Err(Error::InvalidInput(format!("device {device_id} has reached its guest trip limit")));
	}

	let itinerary = plan_trip(deps, trip).await?;
	deps.repository.increment_guest_trip_count(device_id).await?;
	Ok(itinerary)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::domain::poi::POICandidate;
	use crate::testing::test_deps_with_pois;
	use chrono::NaiveDate;
	use uuid::Uuid;

	fn poi(category: &str, lat: f64, lon: f64) -> POICandidate {
		POICandidate {
			poi_id: Uuid::new_v4(),
			name: "Place".into(),
			category: category.into(),
			tags: vec![],
			rating: Some(4.6),
			user_ratings_total: Some(500),
			price_level: None,
			business_status: None,
			open_now: None,
			address: None,
			lat: Some(lat),
			lon: Some(lon),
			description: None,
			reviews: vec![],
			rank_score: 1.0,
		}
	}

	fn trip() -> TripSpec {
		TripSpec {
			id: Uuid::new_v4(),
			city: "Rome".into(),
			city_center: (41.9028, 12.4964),
			start_date: NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
			end_date: NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
			traveler_count: 2,
			pace: crate::domain::trip_spec::Pace::Medium,
			budget: crate::domain::trip_spec::Budget::Medium,
			interests: vec!["museum".into()],
			daily_routine: Default::default(),
			hotel: crate::domain::trip_spec::Hotel { text: "H".into(), lat: 41.90, lon: 12.49 },
			additional_preferences: Default::default(),
			structured_preferences: vec![],
			owner: crate::domain::trip_spec::Owner::LegacyPublic,
		}
	}

	#[tokio::test]
	async fn plan_trip_produces_one_day_with_critique() {
		let pois: Vec<POICandidate> = (0..20)
			.map(|i| poi(["restaurant", "cafe", "museum", "attraction", "bar"][i % 5], 41.90 + (i as f64) * 0.001, 12.49))
			.collect();
		let deps = test_deps_with_pois(pois);
		let t = trip();

		let itinerary = plan_trip(&deps, &t).await.unwrap();
		assert_eq!(itinerary.days.as_ref().unwrap().len(), 1);

		let reloaded = deps.repository.get_itinerary(t.id).await.unwrap().unwrap();
		assert_eq!(reloaded.days.as_ref().unwrap().len(), 1);
	}

	#[test]
	fn guest_gate_blocks_after_limit_reached() {
		let device = GuestDevice { device_id: "d1".into(), generated_trips_count: 1 };
		assert!(!guest_gate(Some(&device), 1));
		assert!(guest_gate(Some(&device), 2));
		assert!(guest_gate(None, 1));
	}

	#[test]
	fn view_for_guest_truncates_to_first_day() {
		let mut itinerary = Itinerary::new(Uuid::new_v4(), chrono::Utc::now());
		itinerary.days = Some(vec![
			crate::domain::itinerary::ItineraryDay {
				day_number: 1,
				date: NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
				theme: String::new(),
				blocks: vec![],
			},
			crate::domain::itinerary::ItineraryDay {
				day_number: 2,
				date: NaiveDate::from_ymd_opt(2026, 9, 2).unwrap(),
				theme: String::new(),
				blocks: vec![],
			},
		]);
		let limited = view_for_guest(&itinerary, true);
		assert_eq!(limited.days.unwrap().len(), 1);
		let full = view_for_guest(&itinerary, false);
		assert_eq!(full.days.unwrap().len(), 2);
	}
}
