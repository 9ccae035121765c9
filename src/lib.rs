//! perception-map: Infinite-canvas perception mapping.
//!
//! This crate provides a WASM canvas app for mapping perceptions across
//! private, public and abstract domains, with lenses, typed connections,
//! undo/redo, and JSON/PNG export. The engine underneath is plain Rust and
//! is tested natively.

use leptos::prelude::*;
use leptos_meta::*;
use log::{Level, info, warn};
use wasm_bindgen::JsCast;
use web_sys::{HtmlScriptElement, Window};

pub mod components;

pub use components::perception_canvas::{
	DomainMembership, GraphError, MapConfig, MapSession, MemoryStore, PerceptionCanvas, PersistentStore, StoreError,
};

/// Initialize logging and panic hooks for the WASM target.
pub fn init_logging() {
	let _ = console_log::init_with_level(Level::Debug);
	console_error_panic_hook::set_once();
	info!("perception-map: logging initialized");
}

/// Load configuration overrides from a script element with id="map-config".
/// Missing fields keep their defaults; an absent element means all defaults.
fn load_config() -> MapConfig {
	let text = || -> Option<String> {
		let window: Window = web_sys::window()?;
		let element = window.document()?.get_element_by_id("map-config")?;
		let script: HtmlScriptElement = element.dyn_into().ok()?;
		script.text().ok()
	};
	let Some(json_text) = text() else {
		return MapConfig::default();
	};

	match serde_json::from_str::<MapConfig>(&json_text) {
		Ok(config) => {
			info!("perception-map: loaded config overrides");
			config
		}
		Err(e) => {
			warn!("perception-map: failed to parse map config, using defaults: {}", e);
			MapConfig::default()
		}
	}
}

/// Main application component.
#[component]
pub fn App() -> impl IntoView {
	provide_meta_context();

	let config = load_config();

	view! {
		<Html attr:lang="en" attr:dir="ltr" attr:data-theme="dark" />
		<Title text="Perception Map" />
		<Meta charset="UTF-8" />
		<Meta name="viewport" content="width=device-width, initial-scale=1.0" />

		<div class="fullscreen-map">
			<PerceptionCanvas config=config />
			<div class="map-overlay">
				<h1>"Perception Map"</h1>
				<p class="subtitle">
					"Drag nodes between domains. Ctrl+scroll to zoom. Space or H to pan. Click a domain to focus."
				</p>
			</div>
		</div>
	}
}
