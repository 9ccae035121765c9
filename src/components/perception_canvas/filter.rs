//! View mode, active filters and focus dimming.
//!
//! Visibility is always derived from the graph on demand; nothing here is
//! stored alongside the nodes.

use std::collections::{BTreeSet, HashSet};

use super::types::{DomainId, Edge, LensId, Mode, Node};

/// Which part of the map is shown.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ViewMode {
	#[default]
	All,
	Domain(DomainId),
}

impl ViewMode {
	pub fn label(self) -> &'static str {
		match self {
			ViewMode::All => "All",
			ViewMode::Domain(domain) => domain.label(),
		}
	}
}

/// Sidebar filter selections. An empty set means "no restriction".
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ActiveFilters {
	pub domains: BTreeSet<DomainId>,
	pub lenses: BTreeSet<LensId>,
	pub modes: BTreeSet<Mode>,
}

fn toggle<T: Ord>(set: &mut BTreeSet<T>, value: T) {
	if !set.remove(&value) {
		set.insert(value);
	}
}

impl ActiveFilters {
	pub fn toggle_domain(&mut self, domain: DomainId) {
		toggle(&mut self.domains, domain);
	}

	pub fn toggle_lens(&mut self, lens: impl Into<LensId>) {
		toggle(&mut self.lenses, lens.into());
	}

	pub fn toggle_mode(&mut self, mode: Mode) {
		toggle(&mut self.modes, mode);
	}

	pub fn clear(&mut self) {
		*self = Self::default();
	}

	pub fn is_empty(&self) -> bool {
		self.domains.is_empty() && self.lenses.is_empty() && self.modes.is_empty()
	}
}

/// Whether a single node passes the view mode and filters.
pub fn is_visible(node: &Node, view_mode: ViewMode, filters: &ActiveFilters) -> bool {
	let Node::Content(content) = node else {
		return true;
	};
	let data = &content.data;
	let in_view = match view_mode {
		ViewMode::All => true,
		ViewMode::Domain(domain) => data.domain_ids.contains(&domain),
	};
	in_view
		&& (filters.domains.is_empty() || !filters.domains.is_disjoint(&data.domain_ids))
		&& (filters.lenses.is_empty() || !filters.lenses.is_disjoint(&data.lens_ids))
		&& (filters.modes.is_empty() || data.mode.is_some_and(|m| filters.modes.contains(&m)))
}

/// Nodes shown for the current view. Domain nodes are always included.
pub fn visible_nodes<'a>(
	nodes: &'a [Node],
	view_mode: ViewMode,
	filters: &ActiveFilters,
) -> Vec<&'a Node> {
	nodes
		.iter()
		.filter(|node| is_visible(node, view_mode, filters))
		.collect()
}

/// Edges whose endpoints are both visible.
pub fn visible_edges<'a>(edges: &'a [Edge], visible_node_ids: &HashSet<&str>) -> Vec<&'a Edge> {
	edges
		.iter()
		.filter(|e| {
			visible_node_ids.contains(e.source.as_str()) && visible_node_ids.contains(e.target.as_str())
		})
		.collect()
}

pub fn node_opacity(node: &Node, focused: Option<DomainId>, dim: f64) -> f64 {
	match focused {
		Some(domain) if !node.touches_domain(domain) => dim,
		_ => 1.0,
	}
}

/// Edges stay opaque when either endpoint belongs to the focused domain.
pub fn edge_opacity(edge: &Edge, nodes: &[Node], focused: Option<DomainId>, dim: f64) -> f64 {
	let Some(domain) = focused else {
		return 1.0;
	};
	let touches = nodes
		.iter()
		.filter(|n| n.id() == edge.source || n.id() == edge.target)
		.any(|n| n.touches_domain(domain));
	if touches { 1.0 } else { dim }
}
