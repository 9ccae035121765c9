//! In-memory graph mirrored into a [`PersistentStore`].
//!
//! Every mutation calls the store first and only touches the in-memory
//! collections once the store call has resolved successfully. A failed store
//! call leaves memory untouched and surfaces the error. There is no rollback
//! of whatever the backend may have partially written.

use std::collections::{BTreeSet, HashSet};

use chrono::Utc;
use log::{debug, info, warn};

use super::config::MapConfig;
use super::error::GraphError;
use super::geometry::Point;
use super::seed;
use super::store::{EdgePatch, NodePatch, PersistentStore};
use super::types::{
	ConnectionType, ContentData, ContentNode, DomainId, DomainNode, Edge, EdgeId, Lens, Node,
	NodeId,
};

/// Label given to edges created without one.
pub const DEFAULT_EDGE_LABEL: &str = "Connected to";

/// Request to connect two nodes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NewEdge {
	pub source: NodeId,
	pub target: NodeId,
	pub label: Option<String>,
	pub connection_type: ConnectionType,
	pub explanation: Option<String>,
	pub meta_pattern_id: Option<String>,
}

/// Checks the fields a detail save requires.
pub fn validate_details(data: &ContentData) -> Result<(), GraphError> {
	if data.lens_ids.is_empty() {
		return Err(GraphError::MissingLens);
	}
	if data.domain_ids.is_empty() {
		return Err(GraphError::MissingDomain);
	}
	Ok(())
}

/// Checks a full lens catalog before it replaces the current one.
pub fn validate_lens_catalog(lenses: &[Lens], limit: usize) -> Result<(), GraphError> {
	if lenses.len() > limit {
		return Err(GraphError::LensCatalogFull { max: limit });
	}
	let mut seen = HashSet::new();
	for lens in lenses {
		if lens.name.trim().is_empty() || lens.id.is_empty() {
			return Err(GraphError::UnnamedLens);
		}
		if !seen.insert(lens.id.as_str()) {
			return Err(GraphError::DuplicateLens(lens.id.clone()));
		}
	}
	Ok(())
}

/// Single source of truth for nodes, edges and lenses during a session.
pub struct GraphStore<S> {
	store: S,
	nodes: Vec<Node>,
	edges: Vec<Edge>,
	lenses: Vec<Lens>,
	lens_limit: usize,
	id_seq: u64,
}

impl<S: PersistentStore> GraphStore<S> {
	/// Wraps a store without loading anything.
	pub fn new(store: S, config: &MapConfig) -> Self {
		Self {
			store,
			nodes: Vec::new(),
			edges: Vec::new(),
			lenses: seed::default_lenses(),
			lens_limit: config.lens_limit,
			id_seq: 0,
		}
	}

	/// Seeds empty collections, then loads the whole store into memory.
	///
	/// Persistence failures are logged and the graph falls back to the seed
	/// map and default lens catalog, held in memory only.
	pub async fn open(store: S, config: &MapConfig) -> Self {
		let mut graph = Self::new(store, config);
		graph.seed_if_empty().await;
		if let Err(e) = graph.reload().await {
			warn!("perception-map: failed to load map, using defaults: {}", e);
			graph.nodes = seed::seed_nodes();
			graph.edges = seed::seed_edges();
		}
		graph
	}

	async fn seed_if_empty(&mut self) {
		let result: Result<(), GraphError> = async {
			let nodes = self.store.load_all_nodes().await?;
			let edges = self.store.load_all_edges().await?;
			if nodes.is_empty() && edges.is_empty() {
				self.store
					.replace_graph(&seed::seed_nodes(), &seed::seed_edges())
					.await?;
				info!("perception-map: seeded nodes and edges");
			}
			if self.store.load_all_lenses().await?.is_empty() {
				self.store
					.replace_lens_catalog(&seed::default_lenses())
					.await?;
				info!("perception-map: seeded lenses");
			}
			Ok(())
		}
		.await;
		if let Err(e) = result {
			warn!("perception-map: failed to initialize store: {}", e);
		}
	}

	/// Replaces memory with the store's current contents.
	pub async fn reload(&mut self) -> Result<(), GraphError> {
		let nodes = self.store.load_all_nodes().await?;
		let edges = self.store.load_all_edges().await?;
		let lenses = self.store.load_all_lenses().await?;
		info!(
			"perception-map: loaded {} nodes, {} edges, {} lenses",
			nodes.len(),
			edges.len(),
			lenses.len()
		);
		self.edges = without_dangling(&nodes, edges);
		self.nodes = nodes;
		if !lenses.is_empty() {
			self.lenses = lenses;
		}
		Ok(())
	}

	pub fn nodes(&self) -> &[Node] {
		&self.nodes
	}

	pub fn edges(&self) -> &[Edge] {
		&self.edges
	}

	pub fn lenses(&self) -> &[Lens] {
		&self.lenses
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty() && self.edges.is_empty()
	}

	pub fn node(&self, id: &str) -> Option<&Node> {
		self.nodes.iter().find(|n| n.id() == id)
	}

	pub fn content_node(&self, id: &str) -> Option<&ContentNode> {
		self.node(id).and_then(Node::as_content)
	}

	pub fn edge(&self, id: &str) -> Option<&Edge> {
		self.edges.iter().find(|e| e.id == id)
	}

	pub fn domain_nodes(&self) -> impl Iterator<Item = &DomainNode> {
		self.nodes.iter().filter_map(Node::as_domain)
	}

	pub fn store(&self) -> &S {
		&self.store
	}

	pub fn store_mut(&mut self) -> &mut S {
		&mut self.store
	}

	fn next_id(&mut self, prefix: &str) -> String {
		loop {
			self.id_seq += 1;
			let id = format!("{prefix}-{}-{}", Utc::now().timestamp_millis(), self.id_seq);
			if self.node(&id).is_none() && self.edge(&id).is_none() {
				return id;
			}
		}
	}

	/// Adds a content node and returns the id the store assigned.
	pub async fn create_node(
		&mut self,
		position: Point,
		data: ContentData,
	) -> Result<NodeId, GraphError> {
		let mut content = ContentNode {
			id: self.next_id("n"),
			position,
			data,
		};
		let stored_id = self
			.store
			.insert_node(&Node::Content(content.clone()))
			.await?;
		content.id = stored_id.clone();
		self.nodes.push(Node::Content(content));
		debug!("perception-map: created node {}", stored_id);
		Ok(stored_id)
	}

	/// Applies a partial update to a content node.
	pub async fn update_node(&mut self, id: &str, patch: NodePatch) -> Result<(), GraphError> {
		match self.node(id) {
			None => return Err(GraphError::NodeNotFound(id.to_string())),
			Some(Node::Domain(_)) => return Err(GraphError::DomainNodeImmutable(id.to_string())),
			Some(Node::Content(_)) => {}
		}
		self.store.update_node(id, &patch).await?;
		if let Some(Node::Content(content)) = self.nodes.iter_mut().find(|n| n.id() == id) {
			patch.apply(content);
		}
		Ok(())
	}

	/// Moves a content node and replaces its domain tags.
	pub async fn move_node(
		&mut self,
		id: &str,
		position: Point,
		domain_ids: BTreeSet<DomainId>,
	) -> Result<(), GraphError> {
		let mut data = self
			.content_node(id)
			.map(|c| c.data.clone())
			.ok_or_else(|| match self.node(id) {
				Some(_) => GraphError::DomainNodeImmutable(id.to_string()),
				None => GraphError::NodeNotFound(id.to_string()),
			})?;
		data.domain_ids = domain_ids;
		self.update_node(
			id,
			NodePatch {
				position: Some(position),
				data: Some(data),
			},
		)
		.await
	}

	/// Saves edited node fields. Requires at least one lens and one domain.
	pub async fn save_node_details(&mut self, id: &str, data: ContentData) -> Result<(), GraphError> {
		validate_details(&data)?;
		self.update_node(
			id,
			NodePatch {
				position: None,
				data: Some(data),
			},
		)
		.await
	}

	/// Removes a content node and every edge that references it.
	pub async fn delete_node(&mut self, id: &str) -> Result<(), GraphError> {
		match self.node(id) {
			None => return Err(GraphError::NodeNotFound(id.to_string())),
			Some(Node::Domain(_)) => return Err(GraphError::DomainNodeImmutable(id.to_string())),
			Some(Node::Content(_)) => {}
		}
		self.store.delete_node(id).await?;
		self.nodes.retain(|n| n.id() != id);
		let before = self.edges.len();
		self.edges.retain(|e| !e.touches(id));
		debug!(
			"perception-map: deleted node {} and {} edges",
			id,
			before - self.edges.len()
		);
		Ok(())
	}

	pub async fn create_edge(&mut self, new_edge: NewEdge) -> Result<EdgeId, GraphError> {
		for endpoint in [&new_edge.source, &new_edge.target] {
			if self.node(endpoint).is_none() {
				return Err(GraphError::DanglingEndpoint(endpoint.clone()));
			}
		}
		if new_edge.source == new_edge.target {
			return Err(GraphError::SelfLoop(new_edge.source));
		}
		let edge = Edge {
			id: self.next_id("e"),
			source: new_edge.source,
			target: new_edge.target,
			label: new_edge
				.label
				.filter(|l| !l.trim().is_empty())
				.unwrap_or_else(|| DEFAULT_EDGE_LABEL.to_string()),
			connection_type: new_edge.connection_type,
			explanation: new_edge.explanation,
			meta_pattern_id: new_edge.meta_pattern_id,
		};
		let stored_id = self.store.insert_edge(&edge).await?;
		self.edges.push(Edge {
			id: stored_id.clone(),
			..edge
		});
		Ok(stored_id)
	}

	pub async fn update_edge(&mut self, id: &str, patch: EdgePatch) -> Result<(), GraphError> {
		if self.edge(id).is_none() {
			return Err(GraphError::EdgeNotFound(id.to_string()));
		}
		self.store.update_edge(id, &patch).await?;
		if let Some(edge) = self.edges.iter_mut().find(|e| e.id == id) {
			patch.apply(edge);
		}
		Ok(())
	}

	pub async fn delete_edge(&mut self, id: &str) -> Result<(), GraphError> {
		if self.edge(id).is_none() {
			return Err(GraphError::EdgeNotFound(id.to_string()));
		}
		self.store.delete_edge(id).await?;
		self.edges.retain(|e| e.id != id);
		Ok(())
	}

	/// Replaces the whole lens catalog.
	pub async fn replace_lenses(&mut self, lenses: Vec<Lens>) -> Result<(), GraphError> {
		validate_lens_catalog(&lenses, self.lens_limit)?;
		self.store.replace_lens_catalog(&lenses).await?;
		self.lenses = lenses;
		Ok(())
	}

	/// Swaps in a complete node/edge state, as undo/redo does.
	pub async fn restore(&mut self, nodes: Vec<Node>, edges: Vec<Edge>) -> Result<(), GraphError> {
		self.store.replace_graph(&nodes, &edges).await?;
		self.nodes = nodes;
		self.edges = edges;
		Ok(())
	}

	/// Swaps in externally supplied data, dropping edges whose endpoints are missing.
	pub async fn replace_graph(
		&mut self,
		nodes: Vec<Node>,
		edges: Vec<Edge>,
	) -> Result<(), GraphError> {
		let kept = without_dangling(&nodes, edges);
		self.restore(nodes, kept).await
	}
}

/// Keeps the edges whose endpoints are both in `nodes`, warning about the rest.
fn without_dangling(nodes: &[Node], edges: Vec<Edge>) -> Vec<Edge> {
	let ids: HashSet<&str> = nodes.iter().map(Node::id).collect();
	let (kept, dropped): (Vec<Edge>, Vec<Edge>) = edges
		.into_iter()
		.partition(|e| ids.contains(e.source.as_str()) && ids.contains(e.target.as_str()));
	for edge in &dropped {
		warn!(
			"perception-map: dropping edge {} ({} -> {}), endpoint missing",
			edge.id, edge.source, edge.target
		);
	}
	kept
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::perception_canvas::store::{MemoryStore, Records};
	use futures::executor::block_on;
	use pretty_assertions::assert_eq;

	fn seeded() -> GraphStore<MemoryStore> {
		block_on(GraphStore::open(MemoryStore::new(), &MapConfig::default()))
	}

	#[test]
	fn open_seeds_an_empty_store() {
		let graph = seeded();
		assert_eq!(graph.nodes().len(), 6);
		assert_eq!(graph.edges().len(), 3);
		assert_eq!(graph.lenses().len(), 7);
		assert_eq!(graph.store().records().nodes.len(), 6);
	}

	#[test]
	fn open_keeps_existing_content() {
		let records = Records {
			nodes: seed::seed_nodes().into_iter().take(3).collect(),
			lenses: vec![Lens::named("Only", "#fff", vec![])],
			..Default::default()
		};
		let graph = block_on(GraphStore::open(
			MemoryStore::with_records(records),
			&MapConfig::default(),
		));
		assert_eq!(graph.nodes().len(), 3);
		assert!(graph.edges().is_empty());
		assert_eq!(graph.lenses().len(), 1);
	}

	#[test]
	fn open_falls_back_to_defaults_when_store_fails() {
		let mut store = MemoryStore::new();
		store.set_offline(true);
		let graph = block_on(GraphStore::open(store, &MapConfig::default()));
		assert_eq!(graph.nodes().len(), 6);
		assert_eq!(graph.edges().len(), 3);
		assert_eq!(graph.lenses().len(), 7);
		assert!(graph.store().records().nodes.is_empty());
	}

	#[test]
	fn delete_node_removes_incident_edges_only() {
		let mut graph = seeded();
		block_on(graph.delete_node("n-2")).unwrap();

		let ids: Vec<&str> = graph.edges().iter().map(|e| e.id.as_str()).collect();
		assert_eq!(ids, vec!["e3"]);
		assert!(graph.node("n-2").is_none());
		assert_eq!(graph.store().records().edges.len(), 1);
	}

	#[test]
	fn domain_nodes_cannot_be_moved_or_deleted() {
		let mut graph = seeded();
		assert!(matches!(
			block_on(graph.delete_node("d-public")),
			Err(GraphError::DomainNodeImmutable(_))
		));
		assert!(matches!(
			block_on(graph.move_node("d-public", Point::ORIGIN, BTreeSet::new())),
			Err(GraphError::DomainNodeImmutable(_))
		));
	}

	#[test]
	fn save_without_lens_is_rejected_and_not_persisted() {
		let mut graph = seeded();
		let mut data = graph.content_node("n-1").unwrap().data.clone();
		data.lens_ids.clear();
		data.title = "changed".into();

		let result = block_on(graph.save_node_details("n-1", data));
		assert!(matches!(result, Err(GraphError::MissingLens)));
		assert_eq!(graph.content_node("n-1").unwrap().data.title, "Argument with Sam");
		let stored = graph.store().records().nodes.iter().find(|n| n.id() == "n-1");
		assert_eq!(
			stored.and_then(Node::as_content).map(|c| c.data.title.as_str()),
			Some("Argument with Sam")
		);
	}

	#[test]
	fn save_without_domain_is_rejected() {
		let mut graph = seeded();
		let mut data = graph.content_node("n-2").unwrap().data.clone();
		data.domain_ids.clear();
		assert!(matches!(
			block_on(graph.save_node_details("n-2", data)),
			Err(GraphError::MissingDomain)
		));
	}

	#[test]
	fn failed_persistence_leaves_memory_untouched() {
		let mut graph = seeded();
		graph.store_mut().set_offline(true);
		let result = block_on(graph.move_node("n-1", Point::new(5.0, 5.0), BTreeSet::new()));
		assert!(matches!(result, Err(GraphError::Store(_))));
		assert_eq!(graph.node("n-1").unwrap().position(), Point::new(420.0, 340.0));
	}

	#[test]
	fn edges_require_existing_distinct_endpoints() {
		let mut graph = seeded();
		let missing = NewEdge {
			source: "n-1".into(),
			target: "ghost".into(),
			..Default::default()
		};
		assert!(matches!(
			block_on(graph.create_edge(missing)),
			Err(GraphError::DanglingEndpoint(id)) if id == "ghost"
		));

		let self_loop = NewEdge {
			source: "n-1".into(),
			target: "n-1".into(),
			..Default::default()
		};
		assert!(matches!(
			block_on(graph.create_edge(self_loop)),
			Err(GraphError::SelfLoop(_))
		));

		let id = block_on(graph.create_edge(NewEdge {
			source: "n-3".into(),
			target: "n-2".into(),
			..Default::default()
		}))
		.unwrap();
		let edge = graph.edge(&id).unwrap();
		assert_eq!(edge.label, DEFAULT_EDGE_LABEL);
		assert_eq!(edge.connection_type, ConnectionType::Influences);
	}

	#[test]
	fn lens_catalog_is_capped() {
		let mut graph = seeded();
		let eleven: Vec<Lens> = (0..11)
			.map(|i| Lens::named(&format!("Lens {i}"), "#000000", vec![]))
			.collect();
		assert!(matches!(
			block_on(graph.replace_lenses(eleven)),
			Err(GraphError::LensCatalogFull { max: 10 })
		));

		let dupes = vec![
			Lens::named("Same", "#000000", vec![]),
			Lens::named("same", "#ffffff", vec![]),
		];
		assert!(matches!(
			block_on(graph.replace_lenses(dupes)),
			Err(GraphError::DuplicateLens(_))
		));
		assert_eq!(graph.lenses().len(), 7);
	}

	#[test]
	fn replace_graph_drops_dangling_edges() {
		let mut graph = seeded();
		let nodes: Vec<Node> = seed::seed_nodes()
			.into_iter()
			.filter(|n| n.id() != "n-3")
			.collect();
		block_on(graph.replace_graph(nodes, seed::seed_edges())).unwrap();
		let ids: Vec<&str> = graph.edges().iter().map(|e| e.id.as_str()).collect();
		assert_eq!(ids, vec!["e1"]);
	}

	#[test]
	fn reopening_keeps_deleted_edges_deleted() {
		let mut graph = seeded();
		block_on(graph.delete_node("n-2")).unwrap();
		block_on(graph.delete_edge("e3")).unwrap();
		assert!(graph.edges().is_empty());

		let reopened = block_on(GraphStore::open(
			graph.store().clone(),
			&MapConfig::default(),
		));
		assert!(reopened.edges().is_empty());
		assert!(reopened.node("n-2").is_none());
	}

	#[test]
	fn reload_skips_edges_with_missing_endpoints() {
		let mut records = Records {
			nodes: seed::seed_nodes(),
			edges: seed::seed_edges(),
			..Default::default()
		};
		records.nodes.retain(|n| n.id() != "n-3");
		let graph = block_on(GraphStore::open(
			MemoryStore::with_records(records),
			&MapConfig::default(),
		));
		let ids: Vec<&str> = graph.edges().iter().map(|e| e.id.as_str()).collect();
		assert_eq!(ids, vec!["e1"]);
		assert_eq!(graph.store().records().edges.len(), 3);
	}
}
