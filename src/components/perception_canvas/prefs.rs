//! User preferences and map purpose, kept in the store's settings records.

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::StoreError;
use super::store::PersistentStore;
use super::types::PurposeData;

const THEME_KEY: &str = "theme";
const RECENT_TAGS_KEY: &str = "recentTags";
const PURPOSE_KEY: &str = "purposeData";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
	#[default]
	Dark,
	Light,
}

impl ThemeMode {
	pub fn toggled(self) -> Self {
		match self {
			ThemeMode::Dark => ThemeMode::Light,
			ThemeMode::Light => ThemeMode::Dark,
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct Preferences {
	pub theme: ThemeMode,
	/// Most recently used first, no duplicates.
	recent_tags: Vec<String>,
	recent_tag_limit: usize,
}

impl Preferences {
	pub fn new(recent_tag_limit: usize) -> Self {
		Self {
			theme: ThemeMode::default(),
			recent_tags: Vec::new(),
			recent_tag_limit,
		}
	}

	pub fn recent_tags(&self) -> &[String] {
		&self.recent_tags
	}

	/// Moves `tag` to the front of the recent list, evicting the oldest past the limit.
	pub fn remember_tag(&mut self, tag: &str) {
		let tag = tag.trim();
		if tag.is_empty() {
			return;
		}
		self.recent_tags.retain(|t| t != tag);
		self.recent_tags.insert(0, tag.to_string());
		self.recent_tags.truncate(self.recent_tag_limit);
	}

	/// Reads preferences, falling back to defaults for anything missing or unreadable.
	pub async fn load<S: PersistentStore>(store: &S, recent_tag_limit: usize) -> Self {
		let mut prefs = Self::new(recent_tag_limit);
		if let Some(theme) = read_setting(store, THEME_KEY).await {
			prefs.theme = theme;
		}
		if let Some(tags) = read_setting::<_, Vec<String>>(store, RECENT_TAGS_KEY).await {
			for tag in tags.iter().rev() {
				prefs.remember_tag(tag);
			}
		}
		prefs
	}

	pub async fn save<S: PersistentStore>(&self, store: &mut S) -> Result<(), StoreError> {
		store
			.set_setting(THEME_KEY, serde_json::to_value(self.theme)?)
			.await?;
		store
			.set_setting(RECENT_TAGS_KEY, Value::from(self.recent_tags.clone()))
			.await
	}
}

async fn read_setting<S, T>(store: &S, key: &str) -> Option<T>
where
	S: PersistentStore,
	T: for<'de> Deserialize<'de>,
{
	match store.get_setting(key).await {
		Ok(Some(value)) => match serde_json::from_value(value) {
			Ok(parsed) => Some(parsed),
			Err(e) => {
				warn!("perception-map: ignoring unreadable setting {}: {}", key, e);
				None
			}
		},
		Ok(None) => None,
		Err(e) => {
			warn!("perception-map: failed to read setting {}: {}", key, e);
			None
		}
	}
}

pub async fn load_purpose<S: PersistentStore>(store: &S) -> PurposeData {
	read_setting(store, PURPOSE_KEY).await.unwrap_or_default()
}

pub async fn save_purpose<S: PersistentStore>(
	store: &mut S,
	purpose: &PurposeData,
) -> Result<(), StoreError> {
	store
		.set_setting(PURPOSE_KEY, serde_json::to_value(purpose)?)
		.await
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::perception_canvas::store::MemoryStore;
	use futures::executor::block_on;
	use pretty_assertions::assert_eq;

	#[test]
	fn recent_tags_are_deduped_and_bounded() {
		let mut prefs = Preferences::new(3);
		for tag in ["a", "b", "c", "a", "d", "  "] {
			prefs.remember_tag(tag);
		}
		assert_eq!(prefs.recent_tags(), ["d", "a", "c"]);
	}

	#[test]
	fn preferences_round_trip_through_settings() {
		let mut store = MemoryStore::new();
		let mut prefs = Preferences::new(12);
		prefs.theme = ThemeMode::Light;
		prefs.remember_tag("Control loop");
		prefs.remember_tag("Over-analysis");
		block_on(prefs.save(&mut store)).unwrap();

		let loaded = block_on(Preferences::load(&store, 12));
		assert_eq!(loaded, prefs);
		assert_eq!(
			store.records().settings.get("theme"),
			Some(&Value::from("light"))
		);
	}

	#[test]
	fn unreadable_settings_fall_back_to_defaults() {
		let mut store = MemoryStore::new();
		block_on(store.set_setting("theme", Value::from(42))).unwrap();
		let loaded = block_on(Preferences::load(&store, 12));
		assert_eq!(loaded.theme, ThemeMode::Dark);

		store.set_offline(true);
		assert_eq!(block_on(load_purpose(&store)), PurposeData::default());
	}
}
