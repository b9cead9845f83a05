/*
 * src/ports/mod.rs
 *
 * File for the external capability ports and the `Deps` bundle
 *
 * Purpose:
 *   Generalizes the teacher's implicit ambient globals (`settings`,
 *   `llm_client`, `poi_provider`, `travel_time_provider`, `cache`) into
 *   explicit dependencies (§9 design note). Every pipeline stage takes a
 *   `&Deps` rather than reaching for a module-level singleton.
 *
 * Include:
 *   Deps - bundled Settings + Repository + PlacesCatalog + TravelTimeService + LlmGateway
 */

pub mod auth;
pub mod catalog;
pub mod llm;
pub mod repository;
pub mod travel_time;

use std::sync::Arc;

use crate::config::Settings;

pub use auth::{own, AuthContext};
pub use catalog::{PlacesCatalog, PoiSearchQuery};
pub use llm::LlmGateway;
pub use repository::Repository;
pub use travel_time::{TravelMode, TravelTimeService};

#[derive(Clone)]
pub struct Deps {
	pub settings: Settings,
	pub repository: Arc<dyn Repository>,
	pub catalog: Arc<dyn PlacesCatalog>,
	pub travel_time: Arc<dyn TravelTimeService>,
	pub llm: Arc<dyn LlmGateway>,
}
