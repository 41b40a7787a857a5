//! Listener priority buckets.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Execution bucket of a subscription.
///
/// Buckets run in ascending order: [`Priority::Lowest`] first, [`Priority::Monitor`] last.
/// Later buckets therefore get the final say over an event's mutable state. Listeners at
/// [`Priority::Monitor`] are expected to observe the outcome, not change it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
	Lowest,
	Low,
	#[default]
	Normal,
	High,
	Highest,
	Monitor,
}

impl Priority {
	/// Every priority in execution order.
	pub const ALL: [Priority; 6] = [
		Priority::Lowest,
		Priority::Low,
		Priority::Normal,
		Priority::High,
		Priority::Highest,
		Priority::Monitor,
	];

	/// Number of buckets.
	pub const COUNT: usize = Self::ALL.len();

	/// Dense bucket index, `0` for the first bucket to run.
	#[inline]
	pub const fn slot(self) -> usize {
		self as usize
	}

	pub const fn as_str(self) -> &'static str {
		match self {
			Priority::Lowest => "lowest",
			Priority::Low => "low",
			Priority::Normal => "normal",
			Priority::High => "high",
			Priority::Highest => "highest",
			Priority::Monitor => "monitor",
		}
	}
}

impl fmt::Display for Priority {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Error returned when parsing an unknown priority name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown priority {0:?} (expected one of lowest, low, normal, high, highest, monitor)")]
pub struct ParsePriorityError(pub String);

impl FromStr for Priority {
	type Err = ParsePriorityError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Priority::ALL
			.into_iter()
			.find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
			.ok_or_else(|| ParsePriorityError(s.to_string()))
	}
}
