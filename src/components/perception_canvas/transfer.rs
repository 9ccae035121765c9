//! Map import and export as JSON files.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::error::GraphError;
use super::types::{Edge, Lens, Node, PurposeData};

/// Title used for filenames when the map has none.
pub const UNTITLED_MAP: &str = "Untitled Map";

#[derive(Debug, Error)]
pub enum TransferError {
	#[error("invalid map file: {0}")]
	Malformed(#[source] serde_json::Error),

	#[error("invalid map file: missing `{0}` array")]
	MissingKey(&'static str),

	#[error("could not encode map: {0}")]
	Encode(#[source] serde_json::Error),

	#[error(transparent)]
	Graph(#[from] GraphError),
}

/// Everything written to an exported map file.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument<'a> {
	pub nodes: &'a [Node],
	pub edges: &'a [Edge],
	pub lenses: &'a [Lens],
	pub purpose_data: &'a PurposeData,
	pub exported_at: DateTime<Utc>,
}

/// Contents read from an imported map file.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportDocument {
	pub nodes: Vec<Node>,
	pub edges: Vec<Edge>,
	#[serde(default)]
	pub lenses: Option<Vec<Lens>>,
	#[serde(default)]
	pub purpose_data: Option<PurposeData>,
}

pub fn export_json(document: &ExportDocument<'_>) -> Result<String, TransferError> {
	serde_json::to_string_pretty(document).map_err(TransferError::Encode)
}

/// Parses a map file. Fails without side effects when `nodes` or `edges` is absent.
pub fn parse_import(text: &str) -> Result<ImportDocument, TransferError> {
	let value: Value = serde_json::from_str(text).map_err(TransferError::Malformed)?;
	for key in ["nodes", "edges"] {
		if !value.get(key).is_some_and(Value::is_array) {
			return Err(TransferError::MissingKey(key));
		}
	}
	serde_json::from_value(value).map_err(TransferError::Malformed)
}

/// Lowercase ASCII alphanumerics joined by single dashes.
pub fn slugify(title: &str) -> String {
	let slug = title
		.split(|c: char| !c.is_ascii_alphanumeric())
		.filter(|part| !part.is_empty())
		.map(str::to_ascii_lowercase)
		.collect::<Vec<_>>()
		.join("-");
	if slug.is_empty() {
		slugify(UNTITLED_MAP)
	} else {
		slug
	}
}

/// `<slug>-<YYYYMMDD-HHMMSS>.<extension>`
pub fn export_filename(title: &str, at: DateTime<Utc>, extension: &str) -> String {
	format!(
		"{}-{}.{}",
		slugify(title),
		at.format("%Y%m%d-%H%M%S"),
		extension
	)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::perception_canvas::seed;
	use chrono::TimeZone;
	use pretty_assertions::assert_eq;

	#[test]
	fn export_uses_wire_names() {
		let nodes = seed::seed_nodes();
		let edges = seed::seed_edges();
		let lenses = seed::default_lenses();
		let purpose = PurposeData {
			title: "Work".into(),
			..Default::default()
		};
		let text = export_json(&ExportDocument {
			nodes: &nodes,
			edges: &edges,
			lenses: &lenses,
			purpose_data: &purpose,
			exported_at: Utc.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap(),
		})
		.unwrap();
		let value: Value = serde_json::from_str(&text).unwrap();
		assert_eq!(value["purposeData"]["title"], "Work");
		assert_eq!(value["exportedAt"], "2025-03-04T05:06:07Z");
		assert_eq!(value["nodes"][0]["type"], "domain");
		assert!(text.contains('\n'));

		let back = parse_import(&text).unwrap();
		assert_eq!(back.nodes.len(), 6);
		assert_eq!(back.purpose_data.unwrap().title, "Work");
	}

	#[test]
	fn import_requires_nodes_and_edges() {
		assert!(matches!(
			parse_import(r#"{ "nodes": [] }"#),
			Err(TransferError::MissingKey("edges"))
		));
		assert!(matches!(
			parse_import(r#"{ "nodes": {}, "edges": [] }"#),
			Err(TransferError::MissingKey("nodes"))
		));
		assert!(matches!(parse_import("not json"), Err(TransferError::Malformed(_))));

		let minimal = parse_import(r#"{ "nodes": [], "edges": [], "extra": 1 }"#).unwrap();
		assert_eq!(minimal, ImportDocument::default());
	}

	#[test]
	fn filenames_are_slugged_and_stamped() {
		let at = Utc.with_ymd_and_hms(2025, 11, 2, 14, 30, 9).unwrap();
		assert_eq!(
			export_filename("My Inner  Weather!", at, "json"),
			"my-inner-weather-20251102-143009.json"
		);
		assert_eq!(export_filename("", at, "png"), "untitled-map-20251102-143009.png");
	}
}
