//! [`PersistentStore`] backed by the browser's `localStorage`.
//!
//! Each collection is one JSON record under `<prefix>/<collection>`. The
//! store keeps a decoded copy in memory and writes a collection back whenever
//! it changes; the copy is only updated after the write succeeds.

use log::warn;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use wasm_bindgen::JsValue;
use web_sys::Storage;

use super::error::StoreError;
use super::store::{EdgePatch, MemoryStore, NodePatch, PersistentStore, Records};
use super::types::{Edge, EdgeId, Lens, Node, NodeId};

const NODES: &str = "nodes";
const EDGES: &str = "edges";
const LENSES: &str = "lenses";
const SETTINGS: &str = "settings";

/// Graph collections serialized in write order. Edges go first, so a node
/// write that fails after a delete leaves nodes without edges, never edges
/// without nodes.
fn graph_entries(records: &Records) -> Result<[(&'static str, String); 2], StoreError> {
	Ok([
		(EDGES, serde_json::to_string(&records.edges)?),
		(NODES, serde_json::to_string(&records.nodes)?),
	])
}

fn js_error(e: JsValue) -> StoreError {
	StoreError::Backend(e.as_string().unwrap_or_else(|| format!("{e:?}")))
}

pub struct LocalStorageStore {
	storage: Storage,
	prefix: String,
	records: Records,
}

impl LocalStorageStore {
	/// Opens the window's local storage and decodes every collection under `prefix`.
	pub fn open(prefix: &str) -> Result<Self, StoreError> {
		let window = web_sys::window()
			.ok_or_else(|| StoreError::Unavailable("no window".into()))?;
		let storage = window
			.local_storage()
			.map_err(js_error)?
			.ok_or_else(|| StoreError::Unavailable("local storage is disabled".into()))?;

		let mut store = Self {
			storage,
			prefix: prefix.to_string(),
			records: Records::default(),
		};
		store.records = Records {
			nodes: store.read(NODES)?,
			edges: store.read(EDGES)?,
			lenses: store.read(LENSES)?,
			settings: store.read(SETTINGS)?,
		};
		Ok(store)
	}

	fn key(&self, collection: &str) -> String {
		format!("{}/{}", self.prefix, collection)
	}

	fn read<T: DeserializeOwned + Default>(&self, collection: &str) -> Result<T, StoreError> {
		match self.storage.get_item(&self.key(collection)).map_err(js_error)? {
			Some(json) => Ok(serde_json::from_str(&json)?),
			None => Ok(T::default()),
		}
	}

	fn write<T: Serialize + ?Sized>(&self, collection: &str, value: &T) -> Result<(), StoreError> {
		let json = serde_json::to_string(value)?;
		self.storage
			.set_item(&self.key(collection), &json)
			.map_err(js_error)
	}

	/// Writes the graph collections of `next` and adopts it on success.
	fn commit_graph(&mut self, next: Records) -> Result<(), StoreError> {
		for (collection, json) in graph_entries(&next)? {
			self.storage
				.set_item(&self.key(collection), &json)
				.map_err(js_error)?;
		}
		self.records = next;
		Ok(())
	}
}

impl PersistentStore for LocalStorageStore {
	async fn load_all_nodes(&self) -> Result<Vec<Node>, StoreError> {
		Ok(self.records.nodes.clone())
	}

	async fn load_all_edges(&self) -> Result<Vec<Edge>, StoreError> {
		Ok(self.records.edges.clone())
	}

	async fn load_all_lenses(&self) -> Result<Vec<Lens>, StoreError> {
		Ok(self.records.lenses.clone())
	}

	async fn insert_node(&mut self, node: &Node) -> Result<NodeId, StoreError> {
		let mut next = self.records.clone();
		let id = next.insert_node(node);
		self.write(NODES, &next.nodes)?;
		self.records = next;
		Ok(id)
	}

	async fn update_node(&mut self, id: &str, patch: &NodePatch) -> Result<(), StoreError> {
		let mut next = self.records.clone();
		next.update_node(id, patch)?;
		self.write(NODES, &next.nodes)?;
		self.records = next;
		Ok(())
	}

	async fn delete_node(&mut self, id: &str) -> Result<(), StoreError> {
		let mut next = self.records.clone();
		next.delete_node(id);
		self.commit_graph(next)
	}

	async fn insert_edge(&mut self, edge: &Edge) -> Result<EdgeId, StoreError> {
		let mut next = self.records.clone();
		let id = next.insert_edge(edge);
		self.write(EDGES, &next.edges)?;
		self.records = next;
		Ok(id)
	}

	async fn update_edge(&mut self, id: &str, patch: &EdgePatch) -> Result<(), StoreError> {
		let mut next = self.records.clone();
		next.update_edge(id, patch)?;
		self.write(EDGES, &next.edges)?;
		self.records = next;
		Ok(())
	}

	async fn delete_edge(&mut self, id: &str) -> Result<(), StoreError> {
		let mut next = self.records.clone();
		next.delete_edge(id);
		self.write(EDGES, &next.edges)?;
		self.records = next;
		Ok(())
	}

	async fn replace_lens_catalog(&mut self, lenses: &[Lens]) -> Result<(), StoreError> {
		self.write(LENSES, lenses)?;
		self.records.lenses = lenses.to_vec();
		Ok(())
	}

	async fn replace_graph(&mut self, nodes: &[Node], edges: &[Edge]) -> Result<(), StoreError> {
		let next = Records {
			nodes: nodes.to_vec(),
			edges: edges.to_vec(),
			..self.records.clone()
		};
		self.commit_graph(next)
	}

	async fn get_setting(&self, key: &str) -> Result<Option<Value>, StoreError> {
		Ok(self.records.settings.get(key).cloned())
	}

	async fn set_setting(&mut self, key: &str, value: Value) -> Result<(), StoreError> {
		let mut settings = self.records.settings.clone();
		settings.insert(key.to_string(), value);
		self.write(SETTINGS, &settings)?;
		self.records.settings = settings;
		Ok(())
	}
}

/// Local storage when the browser allows it, otherwise memory for the life of the tab.
pub enum BrowserStore {
	Local(LocalStorageStore),
	Memory(MemoryStore),
}

impl BrowserStore {
	pub fn open(prefix: &str) -> Self {
		match LocalStorageStore::open(prefix) {
			Ok(store) => BrowserStore::Local(store),
			Err(e) => {
				warn!("perception-map: local storage unusable, changes will not persist: {}", e);
				BrowserStore::Memory(MemoryStore::new())
			}
		}
	}
}

macro_rules! dispatch {
	($self:ident, $store:ident => $call:expr) => {
		match $self {
			BrowserStore::Local($store) => $call,
			BrowserStore::Memory($store) => $call,
		}
	};
}

impl PersistentStore for BrowserStore {
	async fn load_all_nodes(&self) -> Result<Vec<Node>, StoreError> {
		dispatch!(self, s => s.load_all_nodes().await)
	}

	async fn load_all_edges(&self) -> Result<Vec<Edge>, StoreError> {
		dispatch!(self, s => s.load_all_edges().await)
	}

	async fn load_all_lenses(&self) -> Result<Vec<Lens>, StoreError> {
		dispatch!(self, s => s.load_all_lenses().await)
	}

	async fn insert_node(&mut self, node: &Node) -> Result<NodeId, StoreError> {
		dispatch!(self, s => s.insert_node(node).await)
	}

	async fn update_node(&mut self, id: &str, patch: &NodePatch) -> Result<(), StoreError> {
		dispatch!(self, s => s.update_node(id, patch).await)
	}

	async fn delete_node(&mut self, id: &str) -> Result<(), StoreError> {
		dispatch!(self, s => s.delete_node(id).await)
	}

	async fn insert_edge(&mut self, edge: &Edge) -> Result<EdgeId, StoreError> {
		dispatch!(self, s => s.insert_edge(edge).await)
	}

	async fn update_edge(&mut self, id: &str, patch: &EdgePatch) -> Result<(), StoreError> {
		dispatch!(self, s => s.update_edge(id, patch).await)
	}

	async fn delete_edge(&mut self, id: &str) -> Result<(), StoreError> {
		dispatch!(self, s => s.delete_edge(id).await)
	}

	async fn replace_lens_catalog(&mut self, lenses: &[Lens]) -> Result<(), StoreError> {
		dispatch!(self, s => s.replace_lens_catalog(lenses).await)
	}

	async fn replace_graph(&mut self, nodes: &[Node], edges: &[Edge]) -> Result<(), StoreError> {
		dispatch!(self, s => s.replace_graph(nodes, edges).await)
	}

	async fn get_setting(&self, key: &str) -> Result<Option<Value>, StoreError> {
		dispatch!(self, s => s.get_setting(key).await)
	}

	async fn set_setting(&mut self, key: &str, value: Value) -> Result<(), StoreError> {
		dispatch!(self, s => s.set_setting(key, value).await)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::perception_canvas::seed;
	use pretty_assertions::assert_eq;

	#[test]
	fn graph_entries_write_edges_before_nodes() {
		let records = Records {
			nodes: seed::seed_nodes(),
			edges: seed::seed_edges(),
			..Default::default()
		};
		let entries = graph_entries(&records).unwrap();
		let order: Vec<&str> = entries.iter().map(|(collection, _)| *collection).collect();
		assert_eq!(order, vec![EDGES, NODES]);

		let edges: Vec<Edge> = serde_json::from_str(&entries[0].1).unwrap();
		assert_eq!(edges, records.edges);
		assert_eq!(entries[1].1, serde_json::to_string(&records.nodes).unwrap());
	}
}
