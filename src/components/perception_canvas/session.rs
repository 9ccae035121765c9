//! Application state for one open map.
//!
//! [`MapSession`] owns the graph, history, camera, tools, filters and
//! preferences, and routes user input through them. Every successful graph
//! mutation records a history snapshot; failed ones leave everything as it
//! was.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};

use super::analytics::{self, MapSummary};
use super::camera::Camera;
use super::config::MapConfig;
use super::error::GraphError;
use super::filter::{self, ActiveFilters, ViewMode};
use super::geometry::{
	Point, Size, content_node_hit, domain_bounds, domains_containing, screen_to_world,
	world_to_screen,
};
use super::graph::{GraphStore, NewEdge};
use super::history::{History, Snapshot};
use super::interaction::{
	Interaction, KeyCommand, KeyInput, PointerDown, PointerTarget, PointerUp, Tool,
	key_down_command, key_up_command,
};
use super::prefs::{self, Preferences, ThemeMode};
use super::store::{EdgePatch, PersistentStore};
use super::transfer::{self, ExportDocument, TransferError, UNTITLED_MAP};
use super::types::{ContentData, ContentNode, DomainId, Edge, EdgeId, Lens, Node, NodeId, PurposeData};

/// Title given to nodes created from the toolbar.
pub const NEW_NODE_TITLE: &str = "New Node";
/// Lens given to new nodes when the catalog is empty.
pub const FALLBACK_LENS: &str = "empathy";

/// One open map and everything the canvas needs to show and edit it.
pub struct MapSession<S> {
	graph: GraphStore<S>,
	history: History,
	camera: Camera,
	interaction: Interaction,
	view_mode: ViewMode,
	filters: ActiveFilters,
	viewport: Size,
	selected: Option<NodeId>,
	prefs: Preferences,
	purpose: PurposeData,
	config: MapConfig,
}

impl<S: PersistentStore> MapSession<S> {
	/// Loads (seeding if empty) the map and preferences, and records the initial snapshot.
	pub async fn open(store: S, config: MapConfig) -> Self {
		let graph = GraphStore::open(store, &config).await;
		let prefs = Preferences::load(graph.store(), config.recent_tag_limit).await;
		let purpose = prefs::load_purpose(graph.store()).await;
		let mut history = History::new(config.history_limit);
		history.record_initial(Snapshot::new(graph.nodes(), graph.edges()));

		Self {
			graph,
			history,
			camera: Camera::new(&config),
			interaction: Interaction::default(),
			view_mode: ViewMode::All,
			filters: ActiveFilters::default(),
			viewport: Size::new(0.0, 0.0),
			selected: None,
			prefs,
			purpose,
			config,
		}
	}

	pub fn graph(&self) -> &GraphStore<S> {
		&self.graph
	}

	pub fn history(&self) -> &History {
		&self.history
	}

	pub fn camera(&self) -> &Camera {
		&self.camera
	}

	pub fn camera_mut(&mut self) -> &mut Camera {
		&mut self.camera
	}

	pub fn interaction(&self) -> &Interaction {
		&self.interaction
	}

	pub fn config(&self) -> &MapConfig {
		&self.config
	}

	pub fn preferences(&self) -> &Preferences {
		&self.prefs
	}

	pub fn purpose(&self) -> &PurposeData {
		&self.purpose
	}

	pub fn viewport(&self) -> Size {
		self.viewport
	}

	pub fn set_viewport(&mut self, viewport: Size) {
		self.viewport = viewport;
	}

	pub fn view_mode(&self) -> ViewMode {
		self.view_mode
	}

	pub fn set_view_mode(&mut self, view_mode: ViewMode) {
		self.view_mode = view_mode;
	}

	pub fn filters(&self) -> &ActiveFilters {
		&self.filters
	}

	pub fn filters_mut(&mut self) -> &mut ActiveFilters {
		&mut self.filters
	}

	pub fn tool(&self) -> Tool {
		self.interaction.tool()
	}

	pub fn select_tool(&mut self, tool: Tool) {
		self.interaction.tools.select(tool);
	}

	pub fn selected(&self) -> Option<&ContentNode> {
		self.selected
			.as_deref()
			.and_then(|id| self.graph.content_node(id))
	}

	pub fn summary(&self) -> MapSummary {
		analytics::summarize(self.graph.nodes(), self.graph.lenses())
	}

	fn record(&mut self) {
		self.history
			.record(Snapshot::new(self.graph.nodes(), self.graph.edges()));
	}

	// Graph mutations

	pub async fn create_node(
		&mut self,
		position: Point,
		data: ContentData,
	) -> Result<NodeId, GraphError> {
		let id = self.graph.create_node(position, data).await?;
		self.record();
		Ok(id)
	}

	/// Adds a blank node at the centre of the viewport and selects it.
	pub async fn create_node_at_center(&mut self, now: DateTime<Utc>) -> Result<NodeId, GraphError> {
		let position = screen_to_world(
			self.viewport.center(),
			self.camera.pan(),
			self.camera.zoom(),
		);
		let lens = self
			.graph
			.lenses()
			.first()
			.map_or_else(|| FALLBACK_LENS.to_string(), |l| l.id.clone());
		let mut data = ContentData::new(NEW_NODE_TITLE, now);
		data.lens_ids.insert(lens);

		let id = self.create_node(position, data).await?;
		self.selected = Some(id.clone());
		Ok(id)
	}

	/// Saves edited fields and remembers the node's meta tags.
	pub async fn save_node_details(&mut self, id: &str, data: ContentData) -> Result<(), GraphError> {
		let tags: Vec<String> = data.meta_tags.iter().cloned().collect();
		self.graph.save_node_details(id, data).await?;
		self.record();

		if !tags.is_empty() {
			for tag in &tags {
				self.prefs.remember_tag(tag);
			}
			self.save_preferences().await;
		}
		Ok(())
	}

	/// Moves a content node to `position` and re-derives its domains from there.
	pub async fn move_node(&mut self, id: &str, position: Point) -> Result<(), GraphError> {
		let domains = domains_containing(
			position,
			self.graph.domain_nodes(),
			self.config.domain_membership,
		);
		debug!("perception-map: dropped {} into {:?}", id, domains);
		self.graph.move_node(id, position, domains).await?;
		self.record();
		Ok(())
	}

	pub async fn delete_node(&mut self, id: &str) -> Result<(), GraphError> {
		self.graph.delete_node(id).await?;
		if self.selected.as_deref() == Some(id) {
			self.selected = None;
		}
		self.record();
		Ok(())
	}

	pub async fn create_edge(&mut self, new_edge: NewEdge) -> Result<EdgeId, GraphError> {
		let id = self.graph.create_edge(new_edge).await?;
		self.record();
		Ok(id)
	}

	pub async fn update_edge(&mut self, id: &str, patch: EdgePatch) -> Result<(), GraphError> {
		self.graph.update_edge(id, patch).await?;
		self.record();
		Ok(())
	}

	pub async fn delete_edge(&mut self, id: &str) -> Result<(), GraphError> {
		self.graph.delete_edge(id).await?;
		self.record();
		Ok(())
	}

	/// Replaces the lens catalog. Not part of undo history.
	pub async fn replace_lenses(&mut self, lenses: Vec<Lens>) -> Result<(), GraphError> {
		self.graph.replace_lenses(lenses).await?;
		let known: HashSet<&str> = self.graph.lenses().iter().map(|l| l.id.as_str()).collect();
		self.filters.lenses.retain(|id| known.contains(id.as_str()));
		Ok(())
	}

	/// Restores the previous snapshot. `Ok(false)` when there is nothing to undo.
	pub async fn undo(&mut self) -> Result<bool, GraphError> {
		let Some(snapshot) = self.history.begin_undo() else {
			return Ok(false);
		};
		self.replay(snapshot).await
	}

	/// Re-applies the next snapshot. `Ok(false)` when there is nothing to redo.
	pub async fn redo(&mut self) -> Result<bool, GraphError> {
		let Some(snapshot) = self.history.begin_redo() else {
			return Ok(false);
		};
		self.replay(snapshot).await
	}

	async fn replay(&mut self, snapshot: Snapshot) -> Result<bool, GraphError> {
		match self.graph.restore(snapshot.nodes, snapshot.edges).await {
			Ok(()) => {
				self.history.complete_replay();
				debug!("perception-map: history at {:?}", self.history.index());
				if self.selected().is_none() {
					self.selected = None;
				}
				Ok(true)
			}
			Err(e) => {
				self.history.cancel_replay();
				Err(e)
			}
		}
	}

	// Purpose, preferences, import/export

	pub async fn set_purpose(&mut self, purpose: PurposeData) {
		if let Err(e) = prefs::save_purpose(self.graph.store_mut(), &purpose).await {
			warn!("perception-map: failed to save purpose: {}", e);
		}
		self.purpose = purpose;
	}

	pub async fn set_theme(&mut self, theme: ThemeMode) {
		self.prefs.theme = theme;
		self.save_preferences().await;
	}

	async fn save_preferences(&mut self) {
		if let Err(e) = self.prefs.save(self.graph.store_mut()).await {
			warn!("perception-map: failed to save preferences: {}", e);
		}
	}

	/// Replaces the whole map with the contents of a map file.
	///
	/// Nothing changes when the file cannot be parsed. The import itself is
	/// recorded in history, so it can be undone.
	pub async fn import(&mut self, text: &str) -> Result<(), TransferError> {
		let document = transfer::parse_import(text)?;
		let (nodes, edges) = (document.nodes.len(), document.edges.len());
		self.graph.replace_graph(document.nodes, document.edges).await?;
		if let Some(lenses) = document.lenses.filter(|l| !l.is_empty()) {
			if let Err(e) = self.replace_lenses(lenses).await {
				warn!("perception-map: keeping current lenses, imported catalog rejected: {}", e);
			}
		}
		if let Some(purpose) = document.purpose_data {
			self.set_purpose(purpose).await;
		}
		self.selected = None;
		self.record();
		info!("perception-map: imported {} nodes, {} edges", nodes, edges);
		Ok(())
	}

	fn title(&self) -> &str {
		let title = self.purpose.title.trim();
		if title.is_empty() { UNTITLED_MAP } else { title }
	}

	/// Serialized map file and its filename.
	pub fn export_json(&self, now: DateTime<Utc>) -> Result<(String, String), TransferError> {
		let body = transfer::export_json(&ExportDocument {
			nodes: self.graph.nodes(),
			edges: self.graph.edges(),
			lenses: self.graph.lenses(),
			purpose_data: &self.purpose,
			exported_at: now,
		})?;
		let filename = transfer::export_filename(self.title(), now, "json");
		info!("perception-map: exported {}", filename);
		Ok((filename, body))
	}

	pub fn export_png_filename(&self, now: DateTime<Utc>) -> String {
		transfer::export_filename(self.title(), now, "png")
	}

	// View

	pub fn visible_nodes(&self) -> Vec<&Node> {
		filter::visible_nodes(self.graph.nodes(), self.view_mode, &self.filters)
	}

	pub fn visible_edges(&self) -> Vec<&Edge> {
		let ids: HashSet<&str> = self.visible_nodes().into_iter().map(Node::id).collect();
		filter::visible_edges(self.graph.edges(), &ids)
	}

	pub fn node_opacity(&self, node: &Node) -> f64 {
		filter::node_opacity(node, self.camera.focused_domain(), self.config.dim_opacity)
	}

	pub fn edge_opacity(&self, edge: &Edge) -> f64 {
		filter::edge_opacity(
			edge,
			self.graph.nodes(),
			self.camera.focused_domain(),
			self.config.dim_opacity,
		)
	}

	/// Focuses a domain, or leaves focus when it is already focused.
	pub fn toggle_focus(&mut self, domain: DomainId) -> Option<DomainId> {
		let Some(node) = self
			.graph
			.domain_nodes()
			.find(|d| d.data.domain_id == domain)
		else {
			warn!("perception-map: no domain node for {}", domain);
			return self.camera.focused_domain();
		};
		self.camera.toggle_focus(node, self.viewport)
	}

	pub fn exit_focus(&mut self) -> bool {
		self.camera.exit_focus()
	}

	/// Advances camera animation. Returns whether a redraw is needed.
	pub fn tick(&mut self, dt: f64) -> bool {
		self.camera.tick(dt)
	}

	// Input

	/// What lies under a screen point: the topmost visible content node, then
	/// the nearest domain circle, then bare canvas.
	pub fn hit_test(&self, screen: Point) -> PointerTarget {
		let (pan, zoom) = (self.camera.pan(), self.camera.zoom());
		let world = screen_to_world(screen, pan, zoom);
		let visible = self.visible_nodes();

		let content = visible
			.iter()
			.rev()
			.filter_map(|n| n.as_content())
			.find(|c| content_node_hit(c.position, world));
		if let Some(node) = content {
			return PointerTarget::ContentNode {
				id: node.id.clone(),
				offset: screen - world_to_screen(node.position, pan, zoom),
			};
		}

		visible
			.iter()
			.filter_map(|n| n.as_domain())
			.map(|d| (d, domain_bounds(d)))
			.filter(|(_, bounds)| bounds.contains(world))
			.min_by(|a, b| {
				let da = world.distance_to(a.1.center);
				let db = world.distance_to(b.1.center);
				da.total_cmp(&db)
			})
			.map_or(PointerTarget::Canvas, |(d, _)| {
				PointerTarget::DomainNode(d.id.clone())
			})
	}

	pub fn pointer_down(&mut self, screen: Point, button: i16) -> PointerDown {
		let target = self.hit_test(screen);
		let outcome = self.interaction.pointer_down(screen, button, target);
		if outcome == PointerDown::BeginPan {
			self.camera.begin_pan(screen);
		}
		outcome
	}

	/// Returns whether the view changed.
	pub fn pointer_move(&mut self, screen: Point) -> bool {
		self.camera.update_pan(screen) | self.interaction.pointer_move(screen)
	}

	/// Finishes the current gesture, persisting a drop.
	pub async fn pointer_up(&mut self, screen: Point) -> Result<(), GraphError> {
		self.camera.end_pan();
		match self.interaction.pointer_up(screen) {
			PointerUp::None | PointerUp::EndPan => Ok(()),
			PointerUp::ClickNode(id) => {
				self.selected = Some(id);
				Ok(())
			}
			PointerUp::ClickDomain(id) => {
				let domain = self.graph.node(&id).and_then(Node::as_domain);
				if let Some(domain) = domain.map(|d| d.data.domain_id) {
					self.toggle_focus(domain);
				}
				Ok(())
			}
			PointerUp::Drop(drag) => {
				let position = drag.world_position(self.camera.pan(), self.camera.zoom());
				self.move_node(&drag.node_id, position).await
			}
		}
	}

	pub fn pointer_cancel(&mut self) {
		self.camera.end_pan();
		self.interaction.cancel();
	}

	/// Node id and world position of an in-progress drag.
	pub fn drag_preview(&self) -> Option<(&str, Point)> {
		self.interaction
			.drag_preview(self.camera.pan(), self.camera.zoom())
	}

	/// Applies a keyboard shortcut. Returns the command that ran, if any.
	pub async fn key_down(&mut self, input: &KeyInput<'_>) -> Result<Option<KeyCommand>, GraphError> {
		let Some(command) = key_down_command(input) else {
			return Ok(None);
		};
		match command {
			KeyCommand::Undo => {
				self.undo().await?;
			}
			KeyCommand::Redo => {
				self.redo().await?;
			}
			KeyCommand::SelectTool(tool) => self.select_tool(tool),
			KeyCommand::HoldHand => {
				self.interaction.tools.space_down(input.repeat);
			}
			KeyCommand::ReleaseHand => {
				self.interaction.tools.space_up();
			}
			KeyCommand::ExitFocus => {
				self.exit_focus();
			}
		}
		Ok(Some(command))
	}

	pub fn key_up(&mut self, input: &KeyInput<'_>) -> Option<KeyCommand> {
		let command = key_up_command(input)?;
		if command == KeyCommand::ReleaseHand {
			self.interaction.tools.space_up();
		}
		Some(command)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::perception_canvas::store::MemoryStore;
	use futures::executor::block_on;
	use pretty_assertions::assert_eq;

	fn session() -> MapSession<MemoryStore> {
		let mut session = block_on(MapSession::open(MemoryStore::new(), MapConfig::default()));
		session.set_viewport(Size::new(1000.0, 800.0));
		session
	}

	#[test]
	fn open_records_initial_snapshot() {
		let session = session();
		assert_eq!(session.history().len(), 1);
		assert_eq!(session.history().index(), Some(0));
		assert_eq!(session.graph().nodes().len(), 6);
	}

	#[test]
	fn new_node_lands_at_viewport_centre() {
		let mut session = session();
		session.camera_mut().begin_pan(Point::ORIGIN);
		session.camera_mut().update_pan(Point::new(100.0, 0.0));
		session.camera_mut().end_pan();

		let id = block_on(session.create_node_at_center(Utc::now())).unwrap();
		let node = session.graph().content_node(&id).unwrap();
		assert_eq!(node.position, Point::new(400.0, 400.0));
		assert_eq!(node.data.title, NEW_NODE_TITLE);
		assert!(node.data.lens_ids.contains("psychological"));
		assert!(node.data.domain_ids.is_empty());
		assert_eq!(session.selected().map(|n| n.id.as_str()), Some(id.as_str()));
		assert_eq!(session.history().len(), 2);
	}

	#[test]
	fn failed_mutation_records_nothing() {
		let mut session = session();
		let mut data = session.graph().content_node("n-1").unwrap().data.clone();
		data.lens_ids.clear();
		assert!(block_on(session.save_node_details("n-1", data)).is_err());
		assert_eq!(session.history().len(), 1);
	}

	#[test]
	fn saving_details_remembers_tags() {
		let mut session = session();
		let mut data = session.graph().content_node("n-2").unwrap().data.clone();
		data.meta_tags.insert("Belonging loop".into());
		block_on(session.save_node_details("n-2", data)).unwrap();
		assert!(
			session
				.preferences()
				.recent_tags()
				.iter()
				.any(|t| t == "Belonging loop")
		);
	}

	#[test]
	fn hit_test_prefers_content_over_domains() {
		let session = session();
		// n-1 sits at (420, 340), outside every domain circle
		let target = session.hit_test(Point::new(430.0, 350.0));
		assert_eq!(
			target,
			PointerTarget::ContentNode {
				id: "n-1".into(),
				offset: Point::new(10.0, 10.0),
			}
		);
		assert_eq!(
			session.hit_test(Point::new(100.0, 100.0)),
			PointerTarget::DomainNode("d-private".into())
		);
		assert_eq!(session.hit_test(Point::new(-500.0, 900.0)), PointerTarget::Canvas);
	}

	#[test]
	fn dragging_a_node_updates_domains_and_history() {
		let mut session = session();
		assert_eq!(session.pointer_down(Point::new(430.0, 350.0), 0), PointerDown::BeginDrag);
		session.pointer_move(Point::new(850.0, 300.0));
		let (id, preview) = session.drag_preview().unwrap();
		assert_eq!((id, preview), ("n-1", Point::new(840.0, 290.0)));

		block_on(session.pointer_up(Point::new(850.0, 300.0))).unwrap();
		let node = session.graph().content_node("n-1").unwrap();
		assert_eq!(node.position, Point::new(840.0, 290.0));
		// public circle centre (800, 100), radius 300
		assert_eq!(
			node.data.domain_ids.iter().copied().collect::<Vec<_>>(),
			vec![DomainId::Public]
		);
		assert_eq!(session.history().len(), 2);
	}

	#[test]
	fn clicking_a_domain_toggles_focus() {
		let mut session = session();
		session.pointer_down(Point::new(100.0, 100.0), 0);
		block_on(session.pointer_up(Point::new(101.0, 100.0))).unwrap();
		assert_eq!(session.camera().focused_domain(), Some(DomainId::Private));

		let escape = KeyInput {
			key: "Escape",
			..Default::default()
		};
		assert_eq!(
			block_on(session.key_down(&escape)).unwrap(),
			Some(KeyCommand::ExitFocus)
		);
		assert_eq!(session.camera().focused_domain(), None);
	}

	#[test]
	fn undo_shortcut_restores_previous_graph() {
		let mut session = session();
		block_on(session.delete_node("n-3")).unwrap();
		let undo = KeyInput {
			key: "z",
			ctrl: true,
			..Default::default()
		};
		block_on(session.key_down(&undo)).unwrap();
		assert!(session.graph().node("n-3").is_some());
		assert_eq!(session.graph().edges().len(), 3);
		assert_eq!(session.history().index(), Some(0));
		assert!(!block_on(session.undo()).unwrap());
	}

	#[test]
	fn space_hold_switches_to_hand_temporarily() {
		let mut session = session();
		let space = KeyInput {
			key: " ",
			..Default::default()
		};
		block_on(session.key_down(&space)).unwrap();
		assert_eq!(session.tool(), Tool::Hand);
		session.key_up(&space);
		assert_eq!(session.tool(), Tool::Select);
	}

	#[test]
	fn export_names_file_after_purpose() {
		let mut session = session();
		block_on(session.set_purpose(PurposeData {
			title: "Team Friction".into(),
			..Default::default()
		}));
		let now = Utc::now();
		let (filename, body) = session.export_json(now).unwrap();
		assert!(filename.starts_with("team-friction-"));
		assert!(filename.ends_with(".json"));
		assert!(body.contains("\"purposeData\""));
		assert!(session.export_png_filename(now).ends_with(".png"));
	}

	#[test]
	fn import_replaces_map_and_is_undoable() {
		let mut session = session();
		let text = r#"{
			"nodes": [
				{ "id": "x", "type": "content", "position": { "x": 0, "y": 0 }, "data": { "title": "Only" } }
			],
			"edges": [ { "id": "dangling", "source": "x", "target": "gone" } ],
			"purposeData": { "title": "Imported" }
		}"#;
		block_on(session.import(text)).unwrap();
		assert_eq!(session.graph().nodes().len(), 1);
		assert!(session.graph().edges().is_empty());
		assert_eq!(session.purpose().title, "Imported");

		assert!(block_on(session.undo()).unwrap());
		assert_eq!(session.graph().nodes().len(), 6);

		assert!(block_on(session.import("{}")).is_err());
		assert_eq!(session.graph().nodes().len(), 6);
	}
}
