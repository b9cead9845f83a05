/*
 * src/domain/mod.rs
 *
 * File for the domain model module tree
 *
 * Purpose:
 *   Re-exports the value types described in spec.md §3. Kept as plain owned
 *   value types (§9 "in-place JSON mutation" design note): persisted JSON
 *   columns are whole blobs written through on commit, never mutated by
 *   reference.
 */

pub mod change;
pub mod critique;
pub mod district;
pub mod itinerary;
pub mod poi;
pub mod saved_trip;
pub mod skeleton;
pub mod trip_spec;

pub use change::{Change, Placement};
pub use critique::{CritiqueIssue, IssueCode, Severity};
pub use district::{ClusteringResult, District};
pub use itinerary::{Itinerary, ItineraryBlock, ItineraryDay, POIPlanBlock};
pub use poi::{POICandidate, PreferenceProfile};
pub use saved_trip::{GuestDevice, SavedTrip};
pub use skeleton::{BlockType, DaySkeleton, SkeletonBlock};
pub use trip_spec::{Budget, DailyRoutine, Hotel, Owner, Pace, PriceLevel, StructuredPreference, TripSpec};
