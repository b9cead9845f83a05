/*
 * src/domain/critique.rs
 *
 * File for CritiqueIssue
 *
 * Purpose:
 *   Typed output of the deterministic Trip Critic (§4.8). `code` is an
 *   enumerated symbolic constant so callers can switch on it; `message` is
 *   the pre-rendered, localizable text.
 *
 * Include:
 *   CritiqueIssue - one validation finding
 *   IssueCode     - enumerated rule codes
 *   Severity      - info/warning/error
 */

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
	Info,
	Warning,
	Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueCode {
	DayTooBusy,
	MissingBreakfast,
	MissingLunch,
	MissingDinner,
	InvalidTimeRange,
	BlockOverlap,
	LongTravel,
	LateNightlife,
	ConsecutiveIntenseDays,
}

impl IssueCode {
	pub fn severity(self) -> Severity {
		match self {
			IssueCode::DayTooBusy
			| IssueCode::MissingBreakfast
			| IssueCode::MissingLunch
			| IssueCode::MissingDinner
			| IssueCode::LongTravel
			| IssueCode::ConsecutiveIntenseDays => Severity::Warning,
			IssueCode::InvalidTimeRange | IssueCode::BlockOverlap => Severity::Error,
			IssueCode::LateNightlife => Severity::Info,
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CritiqueIssue {
	pub code: IssueCode,
	pub severity: Severity,
	pub message: String,
	pub day_number: Option<u32>,
	pub block_index: Option<usize>,
	#[serde(default)]
	pub details: Value,
}

impl CritiqueIssue {
	pub fn new(code: IssueCode, message: impl Into<String>) -> Self {
		Self {
			severity: code.severity(),
			code,
			message: message.into(),
			day_number: None,
			block_index: None,
			details: Value::Null,
		}
	}

	pub fn with_day(mut self, day_number: u32) -> Self {
		self.day_number = Some(day_number);
		self
	}

	pub fn with_block(mut self, block_index: usize) -> Self {
		self.block_index = Some(block_index);
		self
	}

	pub fn with_details(mut self, details: Value) -> Self {
		self.details = details;
		self
	}
}
