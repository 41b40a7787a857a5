//! Dispatch configuration.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::priority::Priority;

/// Knobs applied by a [`Catalog`](crate::Catalog).
///
/// Every field is optional in TOML; missing fields take their defaults.
///
/// ```toml
/// timings = true
/// default-priority = "high"
/// bake-after-listener-registration = false
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct DispatchConfig {
	/// Attach [`Timings`](crate::Timings) to subscriptions registered through the catalog.
	pub timings: bool,
	/// Priority used by [`ListenerBinder::on`](crate::ListenerBinder::on).
	pub default_priority: Priority,
	/// Run [`Catalog::bake_all`](crate::Catalog::bake_all) after each
	/// [`Catalog::register_listener`](crate::Catalog::register_listener).
	pub bake_after_listener_registration: bool,
}

impl Default for DispatchConfig {
	fn default() -> Self {
		Self {
			timings: false,
			default_priority: Priority::Normal,
			bake_after_listener_registration: true,
		}
	}
}

impl DispatchConfig {
	pub fn from_toml_str(src: &str) -> Result<Self, ConfigError> {
		Ok(toml::from_str(src)?)
	}
}
