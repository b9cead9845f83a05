/*
 * src/ports/travel_time.rs
 *
 * File for the Travel-Time capability
 *
 * Purpose:
 *   Returns duration, distance, and polyline between two coordinates
 *   (spec.md §6). Every implementation falls back to haversine distance
 *   scaled by a walking/driving speed plus 30% routing slack on error or
 *   timeout (§5).
 *
 * Include:
 *   TravelTimeService - estimate-travel port
 *   TravelMode        - drive/walk/bicycle/transit
 *   TravelEstimate     - duration/distance/polyline result
 *   haversine_fallback - the deterministic fallback implementation
 */

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CoreResult;
use crate::pipeline::scoring::haversine_km;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TravelMode {
	Drive,
	Walk,
	Bicycle,
	Transit,
}

impl TravelMode {
	/// km/h used by the haversine fallback.
	fn fallback_speed_kmh(self) -> f64 {
		match self {
			TravelMode::Walk => 4.0,
			TravelMode::Bicycle => 15.0,
			TravelMode::Drive => 30.0,
			TravelMode::Transit => 20.0,
		}
	}
}

#[derive(Debug, Clone, Copy)]
pub struct TravelEstimate {
	pub duration_minutes: i64,
	pub distance_meters: Option<f64>,
	pub polyline: Option<()>,
}

#[async_trait]
pub trait TravelTimeService: Send + Sync {
	async fn estimate_travel(
		&self,
		origin: (f64, f64),
		destination: (f64, f64),
		mode: TravelMode,
	) -> CoreResult<TravelEstimate>;
}

/// Haversine distance × 1.3 routing slack / speed-by-mode (spec.md §5, §6).
pub fn haversine_fallback(origin: (f64, f64), destination: (f64, f64), mode: TravelMode) -> TravelEstimate {
	let distance_km = haversine_km(origin.0, origin.1, destination.0, destination.1);
	let slacked_km = distance_km * 1.3;
	let hours = slacked_km / mode.fallback_speed_kmh();
	TravelEstimate {
		duration_minutes: (hours * 60.0).round() as i64,
		distance_meters: Some(distance_km * 1000.0),
		polyline: None,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn walking_fallback_is_reasonable_for_short_hops() {
		let est = haversine_fallback((48.8566, 2.3522), (48.8606, 2.3376), TravelMode::Walk);
		assert!(est.duration_minutes > 0 && est.duration_minutes < 60);
	}

	#[test]
	fn zero_distance_is_zero_minutes() {
		let est = haversine_fallback((48.8566, 2.3522), (48.8566, 2.3522), TravelMode::Walk);
		assert_eq!(est.duration_minutes, 0);
	}
}
