/*
 * src/testing/mod.rs
 *
 * File for in-process test doubles
 *
 * Purpose:
 *   Lets every pipeline stage be unit tested without network or database
 *   access, generalized from the teacher's `agent::configs::mock::MockLLM`
 *   and mirroring its `InMemory`-style test fixtures.
 *
 * Include:
 *   InMemoryRepository   - Repository test double backed by a Mutex<HashMap>
 *   NullLlmGateway        - LlmGateway that always reports ProviderUnavailable
 *   StubLlmGateway        - LlmGateway that returns a fixed JSON value
 *   NullPlacesCatalog     - PlacesCatalog returning a fixed POI list
 *   NullTravelTimeService - TravelTimeService backed by the haversine fallback
 *   test_deps             - a ready-to-use `Deps` wired with the above
 *   test_deps_with_settings - same, with caller-supplied `Settings`
 */

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::config::Settings;
use crate::domain::itinerary::Itinerary;
use crate::domain::poi::POICandidate;
use crate::domain::saved_trip::GuestDevice;
use crate::domain::trip_spec::TripSpec;
use crate::error::{CoreResult, Error};
use crate::pipeline::place_replacement::ReplacementOutcome;
use crate::ports::catalog::PoiSearchQuery;
use crate::ports::travel_time::{haversine_fallback, TravelEstimate, TravelMode};
use crate::ports::{Deps, LlmGateway, PlacesCatalog, Repository, TravelTimeService};

#[derive(Default)]
pub struct InMemoryRepository {
	trips: Mutex<HashMap<Uuid, TripSpec>>,
	itineraries: Mutex<HashMap<Uuid, Itinerary>>,
	poi_cache: Mutex<HashMap<(String, String), POICandidate>>,
	guest_devices: Mutex<HashMap<String, GuestDevice>>,
	idempotent_replacements: Mutex<HashMap<String, ReplacementOutcome>>,
}

impl InMemoryRepository {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn seed_trip(&self, trip: TripSpec) {
		self.trips.lock().unwrap().insert(trip.id, trip);
	}

	pub fn seed_itinerary(&self, itinerary: Itinerary) {
		self.itineraries.lock().unwrap().insert(itinerary.trip_id, itinerary);
	}
}

#[async_trait]
impl Repository for InMemoryRepository {
	async fn get_trip(&self, trip_id: Uuid) -> CoreResult<TripSpec> {
		self.trips
			.lock()
			.unwrap()
			.get(&trip_id)
			.cloned()
			.ok_or_else(|| Error::NotFound(format!("trip {trip_id}")))
	}

	async fn put_trip(&self, trip: &TripSpec) -> CoreResult<()> {
		self.trips.lock().unwrap().insert(trip.id, trip.clone());
		Ok(())
	}

	async fn get_itinerary(&self, trip_id: Uuid) -> CoreResult<Option<Itinerary>> {
		Ok(self.itineraries.lock().unwrap().get(&trip_id).cloned())
	}

	async fn put_itinerary(&self, itinerary: &Itinerary) -> CoreResult<()> {
		self.itineraries.lock().unwrap().insert(itinerary.trip_id, itinerary.clone());
		Ok(())
	}

	async fn get_cached_poi(&self, source: &str, external_id: &str) -> CoreResult<Option<POICandidate>> {
		Ok(self.poi_cache.lock().unwrap().get(&(source.to_string(), external_id.to_string())).cloned())
	}

	async fn put_cached_poi(&self, source: &str, external_id: &str, poi: &POICandidate) -> CoreResult<()> {
		self.poi_cache.lock().unwrap().insert((source.to_string(), external_id.to_string()), poi.clone());
		Ok(())
	}

	async fn get_guest_device(&self, device_id: &str) -> CoreResult<Option<GuestDevice>> {
		Ok(self.guest_devices.lock().unwrap().get(device_id).cloned())
	}

	async fn increment_guest_trip_count(&self, device_id: &str) -> CoreResult<GuestDevice> {
		let mut guard = self.guest_devices.lock().unwrap();
		let entry = guard.entry(device_id.to_string()).or_insert_with(|| GuestDevice {
			device_id: device_id.to_string(),
			generated_trips_count: 0,
		});
		entry.generated_trips_count += 1;
		Ok(entry.clone())
	}

	async fn get_idempotent_replacement(&self, key: &str) -> CoreResult<Option<ReplacementOutcome>> {
		Ok(self.idempotent_replacements.lock().unwrap().get(key).cloned())
	}

	async fn put_idempotent_replacement(&self, key: &str, outcome: &ReplacementOutcome) -> CoreResult<()> {
		self.idempotent_replacements.lock().unwrap().insert(key.to_string(), outcome.clone());
		Ok(())
	}
}

/// Always fails, forcing every LLM-assisted stage onto its deterministic
/// fallback path, per §9's "exceptions for control flow in fallback paths".
pub struct NullLlmGateway;

#[async_trait]
impl LlmGateway for NullLlmGateway {
	async fn generate_text(&self, _prompt: &str, _system: Option<&str>, _max_tokens: u32) -> CoreResult<String> {
		Err(Error::ProviderUnavailable("NullLlmGateway never answers".into()))
	}

	async fn generate_structured(&self, _prompt: &str, _system: Option<&str>, _max_tokens: u32) -> CoreResult<Value> {
		Err(Error::ProviderUnavailable("NullLlmGateway never answers".into()))
	}
}

/// Returns a fixed response, for tests that exercise the LLM-assisted path
/// directly rather than its fallback.
pub struct StubLlmGateway {
	pub structured_response: Value,
	pub text_response: String,
}

#[async_trait]
impl LlmGateway for StubLlmGateway {
	async fn generate_text(&self, _prompt: &str, _system: Option<&str>, _max_tokens: u32) -> CoreResult<String> {
		Ok(self.text_response.clone())
	}

	async fn generate_structured(&self, _prompt: &str, _system: Option<&str>, _max_tokens: u32) -> CoreResult<Value> {
		Ok(self.structured_response.clone())
	}
}

/// Returns whatever POIs were seeded, ignoring the query's filters except
/// `limit`, so tests control candidate sets directly.
#[derive(Default)]
pub struct NullPlacesCatalog {
	pub pois: Vec<POICandidate>,
}

#[async_trait]
impl PlacesCatalog for NullPlacesCatalog {
	async fn search_pois(&self, query: PoiSearchQuery) -> CoreResult<Vec<POICandidate>> {
		Ok(self.pois.iter().take(query.limit.max(1)).cloned().collect())
	}

	async fn search_pois_bulk(
		&self,
		_city: &str,
		categories: &[String],
		_center_location: Option<(f64, f64)>,
		per_category_limit: usize,
	) -> CoreResult<HashMap<String, Vec<POICandidate>>> {
		Ok(categories
			.iter()
			.map(|c| (c.clone(), self.pois.iter().take(per_category_limit).cloned().collect()))
			.collect())
	}

	async fn fetch_place_details(&self, external_id: &str) -> CoreResult<POICandidate> {
		self.pois
			.iter()
			.find(|p| p.poi_id.to_string() == external_id)
			.cloned()
			.ok_or_else(|| Error::NotFound(format!("poi {external_id}")))
	}
}

pub struct NullTravelTimeService;

#[async_trait]
impl TravelTimeService for NullTravelTimeService {
	async fn estimate_travel(
		&self,
		origin: (f64, f64),
		destination: (f64, f64),
		mode: TravelMode,
	) -> CoreResult<TravelEstimate> {
		Ok(haversine_fallback(origin, destination, mode))
	}
}

/// A `Deps` wired entirely with in-memory/null test doubles, for tests that
/// need a fully-formed dependency bundle without caring about its contents.
pub fn test_deps() -> Deps {
	test_deps_with_settings(Settings::default())
}

pub fn test_deps_with_settings(settings: Settings) -> Deps {
	Deps {
		settings,
		repository: Arc::new(InMemoryRepository::new()),
		catalog: Arc::new(NullPlacesCatalog::default()),
		travel_time: Arc::new(NullTravelTimeService),
		llm: Arc::new(NullLlmGateway),
	}
}

pub fn test_deps_with_pois(pois: Vec<POICandidate>) -> Deps {
	Deps {
		settings: Settings::default(),
		repository: Arc::new(InMemoryRepository::new()),
		catalog: Arc::new(NullPlacesCatalog { pois }),
		travel_time: Arc::new(NullTravelTimeService),
		llm: Arc::new(NullLlmGateway),
	}
}
