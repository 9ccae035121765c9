//! Coordinate-space math and domain-membership geometry.
//!
//! # Coordinate Spaces
//!
//! - **World-space**: the infinite canvas the map lives on. Node positions are
//!   stored in world units and never change with the camera.
//! - **Screen-space**: pixel coordinates relative to the canvas element's
//!   top-left corner.
//!
//! The camera maps one onto the other with `screen = world * zoom + pan`.

use std::collections::BTreeSet;
use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

use super::config::DomainMembership;
use super::types::{DomainId, DomainNode, Node};

/// A 2D point or offset. Used for world positions, screen positions and pan.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
	pub x: f64,
	pub y: f64,
}

impl Point {
	pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

	pub const fn new(x: f64, y: f64) -> Self {
		Self { x, y }
	}

	pub fn distance_to(self, other: Point) -> f64 {
		let (dx, dy) = (self.x - other.x, self.y - other.y);
		(dx * dx + dy * dy).sqrt()
	}

	/// Linear interpolation towards `other`.
	pub fn lerp(self, other: Point, t: f64) -> Self {
		Self {
			x: self.x + (other.x - self.x) * t,
			y: self.y + (other.y - self.y) * t,
		}
	}
}

impl Add for Point {
	type Output = Point;

	fn add(self, rhs: Point) -> Point {
		Point::new(self.x + rhs.x, self.y + rhs.y)
	}
}

impl Sub for Point {
	type Output = Point;

	fn sub(self, rhs: Point) -> Point {
		Point::new(self.x - rhs.x, self.y - rhs.y)
	}
}

impl Mul<f64> for Point {
	type Output = Point;

	fn mul(self, k: f64) -> Point {
		Point::new(self.x * k, self.y * k)
	}
}

/// Width and height of an axis-aligned box.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Size {
	pub width: f64,
	pub height: f64,
}

impl Size {
	pub const fn new(width: f64, height: f64) -> Self {
		Self { width, height }
	}

	pub fn center(self) -> Point {
		Point::new(self.width / 2.0, self.height / 2.0)
	}
}

/// Fixed footprint used to anchor content nodes, whatever their rendered size.
pub const CONTENT_NODE_SIZE: Size = Size::new(210.0, 80.0);

/// Maps a world-space point to screen-space.
pub fn world_to_screen(point: Point, pan: Point, zoom: f64) -> Point {
	point * zoom + pan
}

/// Maps a screen-space point back to world-space.
pub fn screen_to_world(point: Point, pan: Point, zoom: f64) -> Point {
	Point::new((point.x - pan.x) / zoom, (point.y - pan.y) / zoom)
}

/// Circle inscribed in a domain node's square bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DomainBounds {
	pub center: Point,
	pub radius: f64,
}

impl DomainBounds {
	pub fn contains(&self, point: Point) -> bool {
		point.distance_to(self.center) <= self.radius
	}
}

pub fn domain_bounds(domain: &DomainNode) -> DomainBounds {
	let radius = domain.width / 2.0;
	DomainBounds {
		center: Point::new(domain.position.x + radius, domain.position.y + radius),
		radius,
	}
}

/// Domains whose circle contains `point`. Boundary points count as inside.
///
/// Overlapping circles all match, so a point in the overlap of two domains
/// yields both ids under [`DomainMembership::Multiple`]. Under
/// [`DomainMembership::Single`] only the domain with the nearest centre is kept.
pub fn domains_containing<'a>(
	point: Point,
	domains: impl IntoIterator<Item = &'a DomainNode>,
	membership: DomainMembership,
) -> BTreeSet<DomainId> {
	let hits = domains.into_iter().filter_map(|domain| {
		let bounds = domain_bounds(domain);
		bounds
			.contains(point)
			.then(|| (domain.data.domain_id, point.distance_to(bounds.center)))
	});

	match membership {
		DomainMembership::Multiple => hits.map(|(id, _)| id).collect(),
		DomainMembership::Single => hits
			.min_by(|a, b| a.1.total_cmp(&b.1))
			.map(|(id, _)| id)
			.into_iter()
			.collect(),
	}
}

/// Anchor point for edge endpoints.
pub fn node_center(node: &Node) -> Point {
	match node {
		Node::Domain(domain) => domain_bounds(domain).center,
		Node::Content(content) => content.position + CONTENT_NODE_SIZE.center(),
	}
}

/// True when a world-space point falls on a content node's footprint.
pub fn content_node_hit(position: Point, point: Point) -> bool {
	point.x >= position.x
		&& point.x <= position.x + CONTENT_NODE_SIZE.width
		&& point.y >= position.y
		&& point.y <= position.y + CONTENT_NODE_SIZE.height
}
