use crate::owner::{ListenerId, OwnerId};
use crate::priority::Priority;

/// Registration failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegisterError {
	/// The same callback is already registered for this owner at this priority.
	#[error("{listener} of {owner} is already registered to {event} at priority {priority}")]
	Duplicate {
		event: &'static str,
		owner: OwnerId,
		listener: ListenerId,
		priority: Priority,
	},
}

/// Configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("invalid dispatch config: {0}")]
	Parse(#[from] toml::de::Error),
}

/// Global catalog installation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InitError {
	#[error("global event catalog already initialized")]
	AlreadyInitialized,
}
