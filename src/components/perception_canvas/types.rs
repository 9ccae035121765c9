//! Map data structures and their JSON wire format.
//!
//! The wire format matches exported map files: nodes carry a `type`
//! discriminator (`"domain"` or `"content"`), field names are camelCase, and
//! enum values are kebab-case strings.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use log::warn;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use super::geometry::Point;

/// Identifier of a node. Seed data uses `d-*` for domains and `n-*` for content.
pub type NodeId = String;
/// Identifier of an edge.
pub type EdgeId = String;
/// Identifier of a lens in the catalog.
pub type LensId = String;

/// One of the three fixed spatial regions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainId {
	Private,
	Public,
	Abstract,
}

impl DomainId {
	pub const ALL: [DomainId; 3] = [DomainId::Private, DomainId::Public, DomainId::Abstract];

	pub fn as_str(self) -> &'static str {
		match self {
			DomainId::Private => "private",
			DomainId::Public => "public",
			DomainId::Abstract => "abstract",
		}
	}

	pub fn label(self) -> &'static str {
		match self {
			DomainId::Private => "Private",
			DomainId::Public => "Public",
			DomainId::Abstract => "Abstract",
		}
	}
}

impl fmt::Display for DomainId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// How a perception was primarily taken in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
	FieldFirst,
	ConceptFirst,
	SocialFirst,
	NarrativeFirst,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PatternType {
	Trigger,
	Loop,
	Reframe,
	Insight,
	Conflict,
	Resolution,
}

impl PatternType {
	pub const ALL: [PatternType; 6] = [
		PatternType::Trigger,
		PatternType::Loop,
		PatternType::Reframe,
		PatternType::Insight,
		PatternType::Conflict,
		PatternType::Resolution,
	];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgencyOrientation {
	Resourced,
	Curious,
	Reflective,
	Protective,
	Reactive,
	Detached,
	Collaborative,
}

impl AgencyOrientation {
	pub const ALL: [AgencyOrientation; 7] = [
		AgencyOrientation::Resourced,
		AgencyOrientation::Curious,
		AgencyOrientation::Reflective,
		AgencyOrientation::Protective,
		AgencyOrientation::Reactive,
		AgencyOrientation::Detached,
		AgencyOrientation::Collaborative,
	];
}

/// Semantic type of a directed connection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectionType {
	#[default]
	Influences,
	Mirrors,
	Contradicts,
	Refines,
	MetaPattern,
}

impl ConnectionType {
	pub const ALL: [ConnectionType; 5] = [
		ConnectionType::Influences,
		ConnectionType::Mirrors,
		ConnectionType::Contradicts,
		ConnectionType::Refines,
		ConnectionType::MetaPattern,
	];

	pub fn label(self) -> &'static str {
		match self {
			ConnectionType::Influences => "Influences",
			ConnectionType::Mirrors => "Mirrors",
			ConnectionType::Contradicts => "Contradicts",
			ConnectionType::Refines => "Refines",
			ConnectionType::MetaPattern => "Shares Meta Pattern",
		}
	}
}

/// Upper bound of [`ContentData::agency_intensity`].
pub const MAX_AGENCY_INTENSITY: u8 = 10;

/// Reflection record attached to a content node.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContentData {
	pub title: String,
	pub perceived_pattern: String,
	pub interpretation: String,
	pub active_questions: String,
	pub felt_sense: String,
	pub before_state: String,
	pub after_state: String,
	pub notes: String,
	pub domain_ids: BTreeSet<DomainId>,
	pub lens_ids: BTreeSet<LensId>,
	#[serde(deserialize_with = "lenient_enum")]
	pub mode: Option<Mode>,
	#[serde(deserialize_with = "lenient_enum")]
	pub pattern_type: Option<PatternType>,
	#[serde(deserialize_with = "lenient_enum")]
	pub agency_orientation: Option<AgencyOrientation>,
	#[serde(deserialize_with = "clamped_intensity")]
	pub agency_intensity: u8,
	pub refines_node_id: Option<NodeId>,
	pub meta_tags: BTreeSet<String>,
	pub created_at: DateTime<Utc>,
}

impl ContentData {
	/// Blank record for a freshly created node.
	pub fn new(title: impl Into<String>, created_at: DateTime<Utc>) -> Self {
		Self {
			title: title.into(),
			agency_intensity: 5,
			created_at,
			..Default::default()
		}
	}
}

/// Reads an optional enum, treating unknown or empty values as unset.
///
/// Older map files carry mode values such as `"capture"` that no longer exist.
fn lenient_enum<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
	D: Deserializer<'de>,
	T: DeserializeOwned,
{
	let value = Option::<serde_json::Value>::deserialize(deserializer)?;
	Ok(value.and_then(|v| match serde_json::from_value(v.clone()) {
		Ok(parsed) => Some(parsed),
		Err(_) => {
			if v.as_str().is_some_and(|s| !s.is_empty()) {
				warn!("perception-map: ignoring unknown enum value {}", v);
			}
			None
		}
	}))
}

fn clamped_intensity<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
	D: Deserializer<'de>,
{
	let value = Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0);
	Ok(value.round().clamp(0.0, MAX_AGENCY_INTENSITY as f64) as u8)
}

/// Label and region id of a domain marker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainData {
	pub label: String,
	pub domain_id: DomainId,
}

/// Circular region marker. Never dragged or edited after creation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DomainNode {
	pub id: NodeId,
	pub position: Point,
	/// Circle diameter.
	pub width: f64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub height: Option<f64>,
	pub data: DomainData,
}

/// User-created perception entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContentNode {
	pub id: NodeId,
	pub position: Point,
	pub data: ContentData,
}

/// A node on the canvas.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Node {
	Domain(DomainNode),
	Content(ContentNode),
}

impl Node {
	pub fn id(&self) -> &str {
		match self {
			Node::Domain(d) => &d.id,
			Node::Content(c) => &c.id,
		}
	}

	pub fn position(&self) -> Point {
		match self {
			Node::Domain(d) => d.position,
			Node::Content(c) => c.position,
		}
	}

	pub fn as_domain(&self) -> Option<&DomainNode> {
		match self {
			Node::Domain(d) => Some(d),
			Node::Content(_) => None,
		}
	}

	pub fn as_content(&self) -> Option<&ContentNode> {
		match self {
			Node::Content(c) => Some(c),
			Node::Domain(_) => None,
		}
	}

	/// Whether this node belongs to (content) or is (domain) the given domain.
	pub fn touches_domain(&self, domain: DomainId) -> bool {
		match self {
			Node::Domain(d) => d.data.domain_id == domain,
			Node::Content(c) => c.data.domain_ids.contains(&domain),
		}
	}
}

/// Directed, typed connection between two nodes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
	pub id: EdgeId,
	pub source: NodeId,
	pub target: NodeId,
	#[serde(default)]
	pub label: String,
	#[serde(rename = "type", default)]
	pub connection_type: ConnectionType,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub explanation: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub meta_pattern_id: Option<String>,
}

impl Edge {
	pub fn touches(&self, node_id: &str) -> bool {
		self.source == node_id || self.target == node_id
	}
}

/// Interpretive category applied to content nodes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Lens {
	pub id: LensId,
	pub name: String,
	pub color: String,
	#[serde(default)]
	pub questions: Vec<String>,
}

impl Lens {
	/// Builds a lens whose id is derived from its name.
	pub fn named(name: &str, color: &str, questions: Vec<String>) -> Self {
		Self {
			id: lens_id_from_name(name),
			name: name.to_string(),
			color: color.to_string(),
			questions,
		}
	}
}

/// Lowercases a lens name and joins whitespace runs with `-`.
pub fn lens_id_from_name(name: &str) -> LensId {
	name.split_whitespace()
		.map(str::to_lowercase)
		.collect::<Vec<_>>()
		.join("-")
}

/// Framing the user gave the map before starting.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PurposeData {
	pub title: String,
	pub purpose: String,
	pub current_state: String,
	pub orientation_question: String,
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	#[test]
	fn content_node_reads_seed_shape() {
		let json = r#"{
			"id": "n-9",
			"type": "content",
			"position": { "x": 420, "y": 340 },
			"data": {
				"title": "Argument",
				"feltSense": "Tightness",
				"agencyOrientation": "protective",
				"agencyIntensity": 7,
				"metaTags": ["Control loop"],
				"patternType": "conflict",
				"lensIds": ["empathy"],
				"domainIds": ["private", "public"],
				"mode": "social-first",
				"refinesNodeId": null,
				"createdAt": "2025-01-02T03:04:05Z"
			}
		}"#;
		let node: Node = serde_json::from_str(json).unwrap();
		let content = node.as_content().unwrap();
		assert_eq!(content.data.felt_sense, "Tightness");
		assert_eq!(content.data.agency_orientation, Some(AgencyOrientation::Protective));
		assert_eq!(content.data.agency_intensity, 7);
		assert_eq!(content.data.mode, Some(Mode::SocialFirst));
		assert_eq!(
			content.data.domain_ids,
			BTreeSet::from([DomainId::Private, DomainId::Public])
		);
	}

	#[test]
	fn unknown_enum_values_and_fields_are_tolerated() {
		let json = r#"{
			"id": "n-1",
			"type": "content",
			"position": { "x": 0, "y": 0 },
			"data": { "title": "Old", "mode": "capture", "patternType": "", "body": "legacy", "agencyIntensity": 42 }
		}"#;
		let node: Node = serde_json::from_str(json).unwrap();
		let data = &node.as_content().unwrap().data;
		assert_eq!(data.mode, None);
		assert_eq!(data.pattern_type, None);
		assert_eq!(data.agency_intensity, MAX_AGENCY_INTENSITY);
	}

	#[test]
	fn edge_without_type_defaults_to_influences() {
		let edge: Edge =
			serde_json::from_str(r#"{"id":"e-1","source":"a","target":"b","label":"Connected to"}"#)
				.unwrap();
		assert_eq!(edge.connection_type, ConnectionType::Influences);

		let json = serde_json::to_value(&edge).unwrap();
		assert_eq!(json["type"], "influences");
		assert!(json.get("explanation").is_none());
	}

	#[test]
	fn lens_ids_derive_from_names() {
		assert_eq!(lens_id_from_name("Inner  Child Work"), "inner-child-work");
		assert_eq!(Lens::named("Systems", "#3B82F6", vec![]).id, "systems");
	}
}
