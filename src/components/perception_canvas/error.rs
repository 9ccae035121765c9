//! Error types for persistence and graph mutations.

use thiserror::Error;

use super::types::{EdgeId, NodeId};

/// Failure reported by a [`PersistentStore`](super::store::PersistentStore).
#[derive(Debug, Error)]
pub enum StoreError {
	#[error("storage backend unavailable: {0}")]
	Unavailable(String),

	#[error("storage backend rejected the write: {0}")]
	Backend(String),

	#[error("stored record is not valid JSON: {0}")]
	Serialization(#[from] serde_json::Error),

	#[error("no {kind} with id `{id}` in the store")]
	Missing { kind: &'static str, id: String },
}

/// Failure of a graph operation. Nothing in memory changes when one is returned.
#[derive(Debug, Error)]
pub enum GraphError {
	#[error(transparent)]
	Store(#[from] StoreError),

	#[error("node `{0}` does not exist")]
	NodeNotFound(NodeId),

	#[error("edge `{0}` does not exist")]
	EdgeNotFound(EdgeId),

	#[error("domain node `{0}` cannot be modified")]
	DomainNodeImmutable(NodeId),

	#[error("edge endpoint `{0}` does not exist")]
	DanglingEndpoint(NodeId),

	#[error("an edge cannot connect node `{0}` to itself")]
	SelfLoop(NodeId),

	#[error("please select at least one lens")]
	MissingLens,

	#[error("please select at least one domain")]
	MissingDomain,

	#[error("the lens catalog holds at most {max} lenses")]
	LensCatalogFull { max: usize },

	#[error("lens `{0}` appears more than once in the catalog")]
	DuplicateLens(String),

	#[error("lens names cannot be empty")]
	UnnamedLens,
}
