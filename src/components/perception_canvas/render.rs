//! Canvas rendering for the perception map.
//!
//! Rendering uses multiple passes for correct z-ordering:
//! 1. Background (screen space)
//! 2. Domain circles, then edges, then content nodes (world space)
//! 3. The dragged node on top, at its live preview position

use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use super::geometry::{CONTENT_NODE_SIZE, Point, domain_bounds, node_center};
use super::session::MapSession;
use super::store::PersistentStore;
use super::theme::{Color, Theme, connection_style, domain_color};
use super::types::{ContentNode, DomainNode, Edge, Lens, Node};

const NODE_RADIUS: f64 = 10.0;
const ARROW_SIZE: f64 = 10.0;
const TITLE_MAX_CHARS: usize = 26;

/// Renders the complete map to the canvas.
pub fn render<S: PersistentStore>(
	session: &MapSession<S>,
	ctx: &CanvasRenderingContext2d,
	theme: &Theme,
	width: f64,
	height: f64,
) {
	let camera = session.camera();
	let preview = session.drag_preview();
	let position_of = |node: &Node| match preview {
		Some((id, position)) if id == node.id() => position,
		_ => node.position(),
	};

	ctx.set_fill_style_str(&theme.background.to_css());
	ctx.fill_rect(0.0, 0.0, width, height);

	ctx.save();
	let _ = ctx.translate(camera.pan().x, camera.pan().y);
	let _ = ctx.scale(camera.zoom(), camera.zoom());

	let nodes = session.visible_nodes();
	for node in nodes.iter().copied() {
		if let Node::Domain(domain) = node {
			draw_domain(ctx, domain, theme, session.node_opacity(node));
		}
	}

	let find = |id: &str| nodes.iter().copied().find(|n| n.id() == id);
	for edge in session.visible_edges() {
		let (Some(source), Some(target)) = (find(&edge.source), find(&edge.target)) else {
			continue;
		};
		let from = anchor(source, position_of(source));
		let alpha = session.edge_opacity(edge);
		draw_edge(ctx, edge, from, target, position_of(target), theme, alpha);
	}

	let selected = session.selected().map(|n| n.id.as_str());
	let lenses = session.graph().lenses();
	let dragged = preview.map(|(id, _)| id);
	for node in nodes.iter().copied().filter(|n| Some(n.id()) != dragged) {
		if let Node::Content(content) = node {
			let style = NodeStyle {
				alpha: session.node_opacity(node),
				selected: selected == Some(content.id.as_str()),
				lifted: false,
			};
			draw_content(ctx, content, content.position, lenses, theme, style);
		}
	}

	if let Some((id, position)) = preview {
		if let Some(content) = session.graph().content_node(id) {
			let style = NodeStyle {
				alpha: 0.9,
				selected: selected == Some(id),
				lifted: true,
			};
			draw_content(ctx, content, position, lenses, theme, style);
		}
	}

	ctx.restore();
}

/// Centre of a node drawn at `position`.
fn anchor(node: &Node, position: Point) -> Point {
	node_center(node) + (position - node.position())
}

/// Where the segment from `from` towards the node's centre crosses its outline.
fn boundary_point(node: &Node, center: Point, from: Point) -> Point {
	let d = from - center;
	if d.x == 0.0 && d.y == 0.0 {
		return center;
	}
	match node {
		Node::Domain(domain) => {
			let radius = domain_bounds(domain).radius;
			center + d * (radius / from.distance_to(center))
		}
		Node::Content(_) => {
			let half = CONTENT_NODE_SIZE.center();
			let sx = if d.x == 0.0 { f64::INFINITY } else { half.x / d.x.abs() };
			let sy = if d.y == 0.0 { f64::INFINITY } else { half.y / d.y.abs() };
			center + d * sx.min(sy).min(1.0)
		}
	}
}

fn draw_domain(ctx: &CanvasRenderingContext2d, domain: &DomainNode, theme: &Theme, alpha: f64) {
	let bounds = domain_bounds(domain);
	let color = domain_color(domain.data.domain_id);

	ctx.set_global_alpha(alpha);
	ctx.begin_path();
	let _ = ctx.arc(bounds.center.x, bounds.center.y, bounds.radius, 0.0, 2.0 * PI);
	ctx.set_fill_style_str(&color.with_alpha(theme.domain_fill_alpha).to_css());
	ctx.fill();
	ctx.set_stroke_style_str(&color.with_alpha(0.5).to_css());
	ctx.set_line_width(2.0);
	ctx.stroke();

	ctx.set_fill_style_str(&color.to_css());
	ctx.set_font("600 22px sans-serif");
	ctx.set_text_align("center");
	let _ = ctx.fill_text(
		&domain.data.label,
		bounds.center.x,
		bounds.center.y - bounds.radius + 40.0,
	);
	ctx.set_text_align("start");
	ctx.set_global_alpha(1.0);
}

fn line_dash(segments: &[f64]) -> JsValue {
	let array = js_sys::Array::new();
	for segment in segments {
		array.push(&JsValue::from_f64(*segment));
	}
	array.into()
}

fn draw_edge(
	ctx: &CanvasRenderingContext2d,
	edge: &Edge,
	from: Point,
	target: &Node,
	target_position: Point,
	theme: &Theme,
	alpha: f64,
) {
	let style = connection_style(edge.connection_type);
	let tip = boundary_point(target, anchor(target, target_position), from);

	ctx.set_global_alpha(alpha);
	ctx.set_stroke_style_str(&style.color.to_css());
	ctx.set_line_width(2.0);
	let _ = ctx.set_line_dash(&line_dash(style.dash));
	ctx.begin_path();
	ctx.move_to(from.x, from.y);
	ctx.line_to(tip.x, tip.y);
	ctx.stroke();
	let _ = ctx.set_line_dash(&line_dash(&[]));

	if style.arrow {
		let angle = (tip.y - from.y).atan2(tip.x - from.x);
		ctx.set_fill_style_str(&style.color.to_css());
		ctx.begin_path();
		ctx.move_to(tip.x, tip.y);
		for side in [-1.0, 1.0] {
			let a = angle + side * PI / 7.0;
			ctx.line_to(tip.x - ARROW_SIZE * a.cos(), tip.y - ARROW_SIZE * a.sin());
		}
		ctx.close_path();
		ctx.fill();
	}

	if !edge.label.is_empty() {
		let mid = from.lerp(tip, 0.5);
		ctx.set_fill_style_str(&theme.muted_text.to_css());
		ctx.set_font("12px sans-serif");
		ctx.set_text_align("center");
		let _ = ctx.fill_text(&edge.label, mid.x, mid.y - 6.0);
		ctx.set_text_align("start");
	}
	ctx.set_global_alpha(1.0);
}

fn rounded_rect(ctx: &CanvasRenderingContext2d, origin: Point, width: f64, height: f64, r: f64) {
	let (x, y) = (origin.x, origin.y);
	ctx.begin_path();
	ctx.move_to(x + r, y);
	let _ = ctx.arc_to(x + width, y, x + width, y + height, r);
	let _ = ctx.arc_to(x + width, y + height, x, y + height, r);
	let _ = ctx.arc_to(x, y + height, x, y, r);
	let _ = ctx.arc_to(x, y, x + width, y, r);
	ctx.close_path();
}

fn truncate(title: &str) -> String {
	if title.chars().count() <= TITLE_MAX_CHARS {
		title.to_string()
	} else {
		let mut short: String = title.chars().take(TITLE_MAX_CHARS - 1).collect();
		short.push('…');
		short
	}
}

#[derive(Clone, Copy)]
struct NodeStyle {
	alpha: f64,
	selected: bool,
	lifted: bool,
}

fn draw_content(
	ctx: &CanvasRenderingContext2d,
	node: &ContentNode,
	position: Point,
	lenses: &[Lens],
	theme: &Theme,
	style: NodeStyle,
) {
	let size = CONTENT_NODE_SIZE;
	ctx.set_global_alpha(style.alpha);

	if style.lifted {
		ctx.set_shadow_color("rgba(0, 0, 0, 0.35)");
		ctx.set_shadow_blur(18.0);
	}

	let stops = theme.node_fill(node.data.domain_ids.iter().copied());
	rounded_rect(ctx, position, size.width, size.height, NODE_RADIUS);
	if let [only] = stops.as_slice() {
		ctx.set_fill_style_str(&only.to_css());
	} else {
		let gradient = ctx.create_linear_gradient(
			position.x,
			position.y,
			position.x + size.width,
			position.y + size.height,
		);
		let last = (stops.len() - 1) as f32;
		for (i, stop) in stops.iter().enumerate() {
			let _ = gradient.add_color_stop(i as f32 / last, &stop.to_css());
		}
		#[allow(deprecated)]
		ctx.set_fill_style(&gradient);
	}
	ctx.fill();
	ctx.set_shadow_blur(0.0);
	ctx.set_shadow_color("rgba(0, 0, 0, 0)");

	let border = if style.selected {
		theme.accent
	} else {
		theme.node_border
	};
	ctx.set_stroke_style_str(&border.to_css());
	ctx.set_line_width(if style.selected { 2.5 } else { 1.0 });
	ctx.stroke();

	ctx.set_fill_style_str(&theme.text.to_css());
	ctx.set_font("600 14px sans-serif");
	let _ = ctx.fill_text(&truncate(&node.data.title), position.x + 14.0, position.y + 30.0);

	let dots = lenses
		.iter()
		.filter(|lens| node.data.lens_ids.contains(&lens.id))
		.filter_map(|lens| Color::from_hex(&lens.color));
	for (i, color) in dots.enumerate() {
		ctx.begin_path();
		let _ = ctx.arc(
			position.x + 20.0 + i as f64 * 16.0,
			position.y + size.height - 20.0,
			5.0,
			0.0,
			2.0 * PI,
		);
		ctx.set_fill_style_str(&color.to_css());
		ctx.fill();
	}
	ctx.set_global_alpha(1.0);
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::perception_canvas::seed;

	#[test]
	fn content_boundary_clips_to_box() {
		let node = seed::seed_nodes().remove(3);
		let center = node_center(&node);
		let right = boundary_point(&node, center, center + Point::new(420.0, 0.0));
		assert_eq!(right, center + Point::new(105.0, 0.0));
		let below = boundary_point(&node, center, center + Point::new(0.0, 320.0));
		assert_eq!(below, center + Point::new(0.0, 40.0));
	}

	#[test]
	fn anchor_follows_preview_position() {
		let node = seed::seed_nodes().remove(3);
		let moved = anchor(&node, node.position() + Point::new(10.0, -5.0));
		assert_eq!(moved, node_center(&node) + Point::new(10.0, -5.0));
	}

	#[test]
	fn long_titles_are_shortened() {
		assert_eq!(truncate("short"), "short");
		let long = truncate("a title that keeps going well past the end");
		assert_eq!(long.chars().count(), TITLE_MAX_CHARS);
		assert!(long.ends_with('…'));
	}
}
