//! Perception map canvas.
//!
//! An infinite canvas holding three domain circles (private, public,
//! abstract) and free-floating content nodes joined by typed connections:
//! - Persistent graph with cascade deletes and validated edits
//! - Bounded undo/redo over whole-graph snapshots
//! - Pan, zoom and animated domain focus with dimming
//! - Domain membership derived from where a node is dropped
//! - View-mode and domain/lens/mode filters
//! - JSON import/export and PNG export
//!
//! The engine modules are plain Rust and run natively; only
//! [`PerceptionCanvas`] and the local-storage store need a browser.
//!
//! # Example
//!
//! ```ignore
//! use perception_map::{MapConfig, PerceptionCanvas};
//!
//! view! { <PerceptionCanvas config=MapConfig::default() /> }
//! ```

pub mod analytics;
mod browser_store;
pub mod camera;
mod component;
pub mod config;
pub mod error;
pub mod filter;
pub mod geometry;
pub mod graph;
pub mod history;
pub mod interaction;
pub mod prefs;
mod render;
pub mod seed;
pub mod session;
pub mod store;
pub mod theme;
pub mod transfer;
pub mod types;

pub use component::PerceptionCanvas;
pub use config::{DomainMembership, MapConfig};
pub use error::{GraphError, StoreError};
pub use session::MapSession;
pub use store::{MemoryStore, PersistentStore};
pub use theme::Theme;
