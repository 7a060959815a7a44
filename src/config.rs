//! Runtime settings, read from a JSON block in the host page.

use serde::Deserialize;

use crate::graph::builder::DEFAULT_PREBUILT_NODE_SIZE;
use crate::graph::cache::DEFAULT_CAPACITY;
use crate::graph::sizing::DEFAULT_BASE_DISTANCE;
use crate::graph::{Error, Result};

/// Id of the `<script type="application/json">` element holding overrides.
pub const CONFIG_ELEMENT_ID: &str = "image-graph-config";

/// Settings for the explorer. Missing keys take their defaults.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ViewConfig {
	/// Query Service origin.
	pub api_base_url: String,
	/// Prefix `display_url`s are resolved against.
	pub asset_root: String,
	pub base_link_distance: f64,
	pub image_cache_capacity: usize,
	pub default_weight_threshold: f64,
	pub prebuilt_node_size: f64,
}

impl Default for ViewConfig {
	fn default() -> Self {
		Self {
			api_base_url: "http://127.0.0.1:8000".into(),
			asset_root: "/".into(),
			base_link_distance: DEFAULT_BASE_DISTANCE,
			image_cache_capacity: DEFAULT_CAPACITY,
			default_weight_threshold: 0.5,
			prebuilt_node_size: DEFAULT_PREBUILT_NODE_SIZE,
		}
	}
}

impl ViewConfig {
	/// Parses and validates a JSON document.
	pub fn from_json(text: &str) -> Result<Self> {
		let config: Self = serde_json::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
		positive("base_link_distance", config.base_link_distance)?;
		positive("prebuilt_node_size", config.prebuilt_node_size)?;
		if !(config.default_weight_threshold.is_finite() && config.default_weight_threshold >= 0.0) {
			return Err(Error::Config(format!(
				"default_weight_threshold must be finite and non-negative, got {}",
				config.default_weight_threshold
			)));
		}
		if config.image_cache_capacity == 0 {
			return Err(Error::Config("image_cache_capacity must be at least 1".into()));
		}
		url::Url::parse(&config.api_base_url)
			.map_err(|e| Error::Config(format!("api_base_url {}: {e}", config.api_base_url)))?;
		Ok(config)
	}

	/// Reads overrides from the host page, falling back to defaults.
	pub fn from_document() -> Self {
		let text = web_sys::window()
			.and_then(|w| w.document())
			.and_then(|d| d.get_element_by_id(CONFIG_ELEMENT_ID))
			.and_then(|el| el.text_content());
		let Some(text) = text else {
			return Self::default();
		};
		Self::from_json(&text).unwrap_or_else(|err| {
			log::warn!("using default configuration: {err}");
			Self::default()
		})
	}

	/// Absolute or root-relative URL of an asset.
	pub fn asset_url(&self, display_url: &str) -> String {
		format!("{}/{}", self.asset_root.trim_end_matches('/'), display_url)
	}
}

fn positive(key: &str, value: f64) -> Result<()> {
	if value.is_finite() && value > 0.0 {
		Ok(())
	} else {
		Err(Error::Config(format!("{key} must be positive, got {value}")))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn missing_keys_take_defaults() {
		let config = ViewConfig::from_json(r#"{"api_base_url": "http://10.0.0.2:9000"}"#).unwrap();
		assert_eq!(config.api_base_url, "http://10.0.0.2:9000");
		assert_eq!(config.base_link_distance, 300.0);
		assert_eq!(config.image_cache_capacity, DEFAULT_CAPACITY);
	}

	#[test]
	fn rejects_invalid_values() {
		assert!(matches!(
			ViewConfig::from_json(r#"{"base_link_distance": 0}"#),
			Err(Error::Config(_))
		));
		assert!(ViewConfig::from_json(r#"{"api_base_url": "not a url"}"#).is_err());
		assert!(ViewConfig::from_json("[").is_err());
	}

	#[test]
	fn rejects_out_of_range_sizes_and_thresholds() {
		for text in [
			r#"{"prebuilt_node_size": -4}"#,
			r#"{"prebuilt_node_size": 0}"#,
			r#"{"default_weight_threshold": -0.1}"#,
			r#"{"image_cache_capacity": 0}"#,
		] {
			assert!(matches!(ViewConfig::from_json(text), Err(Error::Config(_))), "{text}");
		}
		let config = ViewConfig::from_json(r#"{"default_weight_threshold": 0}"#).unwrap();
		assert_eq!(config.default_weight_threshold, 0.0);
	}

	#[test]
	fn asset_url_joins_root() {
		let mut config = ViewConfig::default();
		assert_eq!(config.asset_url("images/a.png"), "/images/a.png");
		config.asset_root = "https://cdn.example/static/".into();
		assert_eq!(config.asset_url("classes/cat"), "https://cdn.example/static/classes/cat");
	}
}
