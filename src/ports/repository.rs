/*
 * src/ports/repository.rs
 *
 * File for the transactional repository capability
 *
 * Purpose:
 *   The core consumes persistence through this trait only (spec.md §6);
 *   relational schema, migrations, and connection pooling are out of scope.
 *   Implementations must treat every `put_itinerary` as one logical
 *   transaction (§5 "Shared-resource policy").
 *
 * Include:
 *   Repository - trip/itinerary/POI-cache/guest-device/idempotency port
 */

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::itinerary::Itinerary;
use crate::domain::poi::POICandidate;
use crate::domain::saved_trip::GuestDevice;
use crate::domain::trip_spec::TripSpec;
use crate::error::CoreResult;
use crate::pipeline::place_replacement::ReplacementOutcome;

#[async_trait]
pub trait Repository: Send + Sync {
	async fn get_trip(&self, trip_id: Uuid) -> CoreResult<TripSpec>;
	async fn put_trip(&self, trip: &TripSpec) -> CoreResult<()>;

	async fn get_itinerary(&self, trip_id: Uuid) -> CoreResult<Option<Itinerary>>;
	async fn put_itinerary(&self, itinerary: &Itinerary) -> CoreResult<()>;

	/// Cache lookup by (source, external_id); used by the Places Catalog
	/// adapter before falling through to the external provider.
	async fn get_cached_poi(&self, source: &str, external_id: &str) -> CoreResult<Option<POICandidate>>;
	async fn put_cached_poi(&self, source: &str, external_id: &str, poi: &POICandidate) -> CoreResult<()>;

	async fn get_guest_device(&self, device_id: &str) -> CoreResult<Option<GuestDevice>>;
	async fn increment_guest_trip_count(&self, device_id: &str) -> CoreResult<GuestDevice>;

	/// Idempotency-key ledger for `apply_replacement` (§4.10, §8).
	async fn get_idempotent_replacement(&self, key: &str) -> CoreResult<Option<ReplacementOutcome>>;
	async fn put_idempotent_replacement(&self, key: &str, outcome: &ReplacementOutcome) -> CoreResult<()>;
}
