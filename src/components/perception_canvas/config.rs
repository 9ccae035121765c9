//! Tunable constants for the canvas engine.
//!
//! Everything the camera, history and catalog clamp against lives here so the
//! bounds can be tuned in one place. The browser shell can override any field
//! from a `<script id="map-config" type="application/json">` element; missing
//! fields keep their defaults.

use serde::Deserialize;

/// How many domains a dropped node may be tagged with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainMembership {
	/// Every containing circle tags the node.
	#[default]
	Multiple,
	/// Only the containing circle with the nearest centre tags the node.
	Single,
}

/// Zoom bounds and step sizes.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ZoomConfig {
	pub min: f64,
	pub max: f64,
	/// Step per modifier+wheel tick.
	pub wheel_step: f64,
	/// Step per toolbar button press.
	pub button_step: f64,
	/// Zoom restored by reset-view.
	pub default: f64,
	/// Zoom the camera settles at when focusing a domain.
	pub focus: f64,
}

impl Default for ZoomConfig {
	fn default() -> Self {
		Self {
			min: 0.3,
			max: 3.0,
			wheel_step: 0.1,
			button_step: 0.2,
			default: 1.0,
			focus: 1.2,
		}
	}
}

/// Complete engine configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct MapConfig {
	pub zoom: ZoomConfig,
	/// Seconds the camera takes to glide to a focus target.
	pub focus_animation_secs: f64,
	/// Maximum number of history snapshots kept.
	pub history_limit: usize,
	/// Maximum number of lenses in the catalog.
	pub lens_limit: usize,
	/// Opacity of nodes and edges outside the focused domain.
	pub dim_opacity: f64,
	pub domain_membership: DomainMembership,
	/// Prefix for keys in the browser's local storage.
	pub storage_prefix: String,
	/// Maximum number of remembered meta tags.
	pub recent_tag_limit: usize,
}

impl Default for MapConfig {
	fn default() -> Self {
		Self {
			zoom: ZoomConfig::default(),
			focus_animation_secs: 0.45,
			history_limit: 50,
			lens_limit: 10,
			dim_opacity: 0.15,
			domain_membership: DomainMembership::Multiple,
			storage_prefix: "perception-map".to_string(),
			recent_tag_limit: 12,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn partial_override_keeps_defaults() {
		let config: MapConfig = serde_json::from_str(r#"{ "zoom": { "max": 2.0 } }"#).unwrap();
		assert_eq!(config.zoom.max, 2.0);
		assert_eq!(config.zoom.min, 0.3);
		assert_eq!(config.history_limit, 50);
	}

	#[test]
	fn single_membership_is_opt_in() {
		let config: MapConfig = serde_json::from_str(r#"{ "domain_membership": "single" }"#).unwrap();
		assert_eq!(config.domain_membership, DomainMembership::Single);
		assert_eq!(MapConfig::default().domain_membership, DomainMembership::Multiple);
	}
}
