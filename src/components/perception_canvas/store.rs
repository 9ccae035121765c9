//! Persistence seam for the graph store.
//!
//! [`PersistentStore`] is the embedded key-value collaborator the graph is
//! mirrored into. It holds four record kinds (nodes, edges, lenses and
//! settings), each addressable by id. Lenses and the node/edge collections
//! also support bulk replacement, which undo/redo and import rely on.
//!
//! [`Records`] implements the record semantics once (cascading deletes,
//! partial updates). [`MemoryStore`] wraps it directly, and the browser store
//! round-trips it through local storage.

use std::collections::BTreeMap;

use serde_json::Value;

use super::error::StoreError;
use super::geometry::Point;
use super::types::{ConnectionType, ContentData, ContentNode, Edge, EdgeId, Lens, Node, NodeId};

/// Partial update of a content node. `None` fields are left as they are.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodePatch {
	pub position: Option<Point>,
	pub data: Option<ContentData>,
}

impl NodePatch {
	pub fn apply(&self, node: &mut ContentNode) {
		if let Some(position) = self.position {
			node.position = position;
		}
		if let Some(data) = &self.data {
			node.data = data.clone();
		}
	}
}

/// Partial update of an edge. Endpoints are fixed once created.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EdgePatch {
	pub label: Option<String>,
	pub connection_type: Option<ConnectionType>,
	pub explanation: Option<Option<String>>,
	pub meta_pattern_id: Option<Option<String>>,
}

impl EdgePatch {
	pub fn apply(&self, edge: &mut Edge) {
		if let Some(label) = &self.label {
			edge.label = label.clone();
		}
		if let Some(connection_type) = self.connection_type {
			edge.connection_type = connection_type;
		}
		if let Some(explanation) = &self.explanation {
			edge.explanation = explanation.clone();
		}
		if let Some(meta_pattern_id) = &self.meta_pattern_id {
			edge.meta_pattern_id = meta_pattern_id.clone();
		}
	}
}

/// Embedded persistence used by [`GraphStore`](super::graph::GraphStore).
///
/// All methods are asynchronous. A mutation's future resolves once the write
/// is durable from the backend's point of view.
#[allow(
	async_fn_in_trait,
	reason = "stores run on the single-threaded UI event loop, futures never cross threads"
)]
pub trait PersistentStore {
	async fn load_all_nodes(&self) -> Result<Vec<Node>, StoreError>;
	async fn load_all_edges(&self) -> Result<Vec<Edge>, StoreError>;
	async fn load_all_lenses(&self) -> Result<Vec<Lens>, StoreError>;

	/// Stores a new node and returns the id it was stored under.
	async fn insert_node(&mut self, node: &Node) -> Result<NodeId, StoreError>;
	async fn update_node(&mut self, id: &str, patch: &NodePatch) -> Result<(), StoreError>;
	/// Deletes a node together with every edge that references it.
	async fn delete_node(&mut self, id: &str) -> Result<(), StoreError>;

	async fn insert_edge(&mut self, edge: &Edge) -> Result<EdgeId, StoreError>;
	async fn update_edge(&mut self, id: &str, patch: &EdgePatch) -> Result<(), StoreError>;
	async fn delete_edge(&mut self, id: &str) -> Result<(), StoreError>;

	/// Clears the lens catalog and bulk-inserts `lenses`.
	async fn replace_lens_catalog(&mut self, lenses: &[Lens]) -> Result<(), StoreError>;
	/// Clears nodes and edges and bulk-inserts the given collections.
	async fn replace_graph(&mut self, nodes: &[Node], edges: &[Edge]) -> Result<(), StoreError>;

	async fn get_setting(&self, key: &str) -> Result<Option<Value>, StoreError>;
	async fn set_setting(&mut self, key: &str, value: Value) -> Result<(), StoreError>;
}

/// The four record collections and their mutation rules.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Records {
	pub nodes: Vec<Node>,
	pub edges: Vec<Edge>,
	pub lenses: Vec<Lens>,
	pub settings: BTreeMap<String, Value>,
}

impl Records {
	pub fn insert_node(&mut self, node: &Node) -> NodeId {
		let id = node.id().to_string();
		self.nodes.retain(|n| n.id() != id);
		self.nodes.push(node.clone());
		id
	}

	pub fn update_node(&mut self, id: &str, patch: &NodePatch) -> Result<(), StoreError> {
		match self.nodes.iter_mut().find(|n| n.id() == id) {
			Some(Node::Content(content)) => {
				patch.apply(content);
				Ok(())
			}
			Some(Node::Domain(_)) => Err(StoreError::Backend(format!(
				"domain node `{id}` is read-only"
			))),
			None => Err(StoreError::Missing {
				kind: "node",
				id: id.to_string(),
			}),
		}
	}

	pub fn delete_node(&mut self, id: &str) {
		self.edges.retain(|e| !e.touches(id));
		self.nodes.retain(|n| n.id() != id);
	}

	pub fn insert_edge(&mut self, edge: &Edge) -> EdgeId {
		self.edges.retain(|e| e.id != edge.id);
		self.edges.push(edge.clone());
		edge.id.clone()
	}

	pub fn update_edge(&mut self, id: &str, patch: &EdgePatch) -> Result<(), StoreError> {
		let edge = self
			.edges
			.iter_mut()
			.find(|e| e.id == id)
			.ok_or_else(|| StoreError::Missing {
				kind: "edge",
				id: id.to_string(),
			})?;
		patch.apply(edge);
		Ok(())
	}

	pub fn delete_edge(&mut self, id: &str) {
		self.edges.retain(|e| e.id != id);
	}
}

/// In-memory store. Used by tests and as a fallback when no backend exists.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
	records: Records,
	offline: bool,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_records(records: Records) -> Self {
		Self {
			records,
			offline: false,
		}
	}

	pub fn records(&self) -> &Records {
		&self.records
	}

	/// While offline every call fails with [`StoreError::Unavailable`].
	pub fn set_offline(&mut self, offline: bool) {
		self.offline = offline;
	}

	fn check(&self) -> Result<(), StoreError> {
		if self.offline {
			Err(StoreError::Unavailable("memory store is offline".into()))
		} else {
			Ok(())
		}
	}
}

impl PersistentStore for MemoryStore {
	async fn load_all_nodes(&self) -> Result<Vec<Node>, StoreError> {
		self.check()?;
		Ok(self.records.nodes.clone())
	}

	async fn load_all_edges(&self) -> Result<Vec<Edge>, StoreError> {
		self.check()?;
		Ok(self.records.edges.clone())
	}

	async fn load_all_lenses(&self) -> Result<Vec<Lens>, StoreError> {
		self.check()?;
		Ok(self.records.lenses.clone())
	}

	async fn insert_node(&mut self, node: &Node) -> Result<NodeId, StoreError> {
		self.check()?;
		Ok(self.records.insert_node(node))
	}

	async fn update_node(&mut self, id: &str, patch: &NodePatch) -> Result<(), StoreError> {
		self.check()?;
		self.records.update_node(id, patch)
	}

	async fn delete_node(&mut self, id: &str) -> Result<(), StoreError> {
		self.check()?;
		self.records.delete_node(id);
		Ok(())
	}

	async fn insert_edge(&mut self, edge: &Edge) -> Result<EdgeId, StoreError> {
		self.check()?;
		Ok(self.records.insert_edge(edge))
	}

	async fn update_edge(&mut self, id: &str, patch: &EdgePatch) -> Result<(), StoreError> {
		self.check()?;
		self.records.update_edge(id, patch)
	}

	async fn delete_edge(&mut self, id: &str) -> Result<(), StoreError> {
		self.check()?;
		self.records.delete_edge(id);
		Ok(())
	}

	async fn replace_lens_catalog(&mut self, lenses: &[Lens]) -> Result<(), StoreError> {
		self.check()?;
		self.records.lenses = lenses.to_vec();
		Ok(())
	}

	async fn replace_graph(&mut self, nodes: &[Node], edges: &[Edge]) -> Result<(), StoreError> {
		self.check()?;
		self.records.nodes = nodes.to_vec();
		self.records.edges = edges.to_vec();
		Ok(())
	}

	async fn get_setting(&self, key: &str) -> Result<Option<Value>, StoreError> {
		self.check()?;
		Ok(self.records.settings.get(key).cloned())
	}

	async fn set_setting(&mut self, key: &str, value: Value) -> Result<(), StoreError> {
		self.check()?;
		self.records.settings.insert(key.to_string(), value);
		Ok(())
	}
}
