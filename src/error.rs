/*
 * src/error.rs
 *
 * File for the core error taxonomy
 *
 * Purpose:
 *   Single error type shared by every pipeline stage. Mirrors the
 *   boundary-facing taxonomy described by the owning HTTP layer (NOT_FOUND,
 *   FORBIDDEN, UNPROCESSABLE, CONFLICT, INTERNAL) without depending on that
 *   layer's framework types.
 *
 * Include:
 *   Error      - Core error enum
 *   CoreResult - Result alias used throughout the pipeline
 */

use std::fmt;

/// Result alias used by every pipeline/stage function.
pub type CoreResult<T> = std::result::Result<T, Error>;

/// Errors produced by the trip-planning core.
///
/// `ProviderUnavailable` is always caught and downgraded to a deterministic
/// fallback inside the stage that issued the call; it should never be seen
/// escaping a public pipeline function in practice, but the variant exists
/// so adapters have somewhere to report failure before the stage decides
/// what to do about it.
#[derive(Debug)]
pub enum Error {
	/// Missing trip, itinerary, macro plan, POI plan, day, or block.
	NotFound(String),
	/// The auth/ownership predicate rejected the caller.
	OwnershipDenied,
	/// Malformed change payload, illegal index, bad date range, empty field.
	InvalidInput(String),
	/// Reserved: concurrent apply on a replacement once explicit versioning
	/// lands (see SPEC_FULL.md Open Questions).
	VersionConflict { expected: i64, actual: i64 },
	/// LLM, catalog, travel-time, or geocoder failure after retries.
	ProviderUnavailable(String),
	/// Invariant violation that should not occur; reported with stable wording.
	Internal(String),
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Error::NotFound(what) => write!(f, "not found: {what}"),
			Error::OwnershipDenied => write!(f, "ownership check failed"),
			Error::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
			Error::VersionConflict { expected, actual } => write!(
				f,
				"version conflict: expected {expected}, current is {actual}"
			),
			Error::ProviderUnavailable(provider) => write!(f, "provider unavailable: {provider}"),
			Error::Internal(msg) => write!(f, "internal error: {msg}"),
		}
	}
}

impl std::error::Error for Error {}

impl Error {
	pub fn not_found(what: impl Into<String>) -> Self {
		Error::NotFound(what.into())
	}

	pub fn invalid(msg: impl Into<String>) -> Self {
		Error::InvalidInput(msg.into())
	}

	pub fn provider(name: impl Into<String>) -> Self {
		Error::ProviderUnavailable(name.into())
	}
}
