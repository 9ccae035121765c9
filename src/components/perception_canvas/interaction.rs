//! Tool selection, keyboard commands and the pointer gesture state machine.
//!
//! Nothing here touches the graph or the camera directly. Each handler
//! returns what happened and [`MapSession`](super::session::MapSession)
//! applies it.

use log::debug;

use super::geometry::{Point, screen_to_world};
use super::types::NodeId;

/// Pointer travel (screen px) below which a press and release count as a click.
pub const CLICK_SLOP: f64 = 4.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Tool {
	#[default]
	Select,
	Hand,
}

impl Tool {
	pub fn label(self) -> &'static str {
		match self {
			Tool::Select => "Select (V)",
			Tool::Hand => "Hand (H)",
		}
	}
}

/// Active tool plus the temporary space-bar override.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ToolState {
	tool: Tool,
	space_override: bool,
}

impl ToolState {
	pub fn tool(&self) -> Tool {
		self.tool
	}

	/// Explicit selection from the toolbar or `v`/`h`. Cancels any space override.
	pub fn select(&mut self, tool: Tool) {
		if self.tool != tool {
			debug!("perception-map: tool {:?}", tool);
		}
		self.tool = tool;
		self.space_override = false;
	}

	/// Space pressed. Switches select to hand; returns whether anything changed.
	pub fn space_down(&mut self, repeat: bool) -> bool {
		if repeat || self.space_override || self.tool != Tool::Select {
			return false;
		}
		self.tool = Tool::Hand;
		self.space_override = true;
		true
	}

	/// Space released. Only undoes a switch made by [`Self::space_down`].
	pub fn space_up(&mut self) -> bool {
		if !self.space_override {
			return false;
		}
		self.tool = Tool::Select;
		self.space_override = false;
		true
	}
}

/// The parts of a keyboard event the canvas cares about.
#[derive(Clone, Copy, Debug, Default)]
pub struct KeyInput<'a> {
	pub key: &'a str,
	pub ctrl: bool,
	pub meta: bool,
	pub shift: bool,
	pub repeat: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyCommand {
	Undo,
	Redo,
	SelectTool(Tool),
	HoldHand,
	ReleaseHand,
	ExitFocus,
}

/// Maps a keydown to a command.
pub fn key_down_command(input: &KeyInput<'_>) -> Option<KeyCommand> {
	let key = input.key.to_ascii_lowercase();
	if input.ctrl || input.meta {
		return match key.as_str() {
			"z" if input.shift => Some(KeyCommand::Redo),
			"z" => Some(KeyCommand::Undo),
			"y" => Some(KeyCommand::Redo),
			_ => None,
		};
	}
	match key.as_str() {
		"v" => Some(KeyCommand::SelectTool(Tool::Select)),
		"h" => Some(KeyCommand::SelectTool(Tool::Hand)),
		" " if !input.repeat => Some(KeyCommand::HoldHand),
		"escape" => Some(KeyCommand::ExitFocus),
		_ => None,
	}
}

pub fn key_up_command(input: &KeyInput<'_>) -> Option<KeyCommand> {
	(input.key == " ").then_some(KeyCommand::ReleaseHand)
}

/// What the pointer went down on.
#[derive(Clone, Debug, PartialEq)]
pub enum PointerTarget {
	Canvas,
	DomainNode(NodeId),
	/// `offset` is the pointer position minus the node's screen top-left.
	ContentNode { id: NodeId, offset: Point },
}

/// Tracks an in-progress content node drag.
#[derive(Clone, Debug, PartialEq)]
pub struct DragState {
	pub node_id: NodeId,
	pub offset: Point,
	/// Where the pointer went down.
	pub press: Point,
	pub pointer: Point,
}

impl DragState {
	/// World position of the node's top-left if it were dropped now.
	pub fn world_position(&self, pan: Point, zoom: f64) -> Point {
		drop_position(self.pointer, self.offset, pan, zoom)
	}
}

/// Converts a release point to the dragged node's new world position.
pub fn drop_position(pointer: Point, offset: Point, pan: Point, zoom: f64) -> Point {
	screen_to_world(pointer - offset, pan, zoom)
}

#[derive(Clone, Debug, Default, PartialEq)]
enum Gesture {
	#[default]
	Idle,
	Panning {
		press: Point,
		domain: Option<NodeId>,
	},
	Dragging(DragState),
}

/// Result of a pointer press.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerDown {
	Ignored,
	BeginPan,
	BeginDrag,
}

/// Result of a pointer release.
#[derive(Clone, Debug, PartialEq)]
pub enum PointerUp {
	None,
	EndPan,
	/// A press and release on a domain node without moving.
	ClickDomain(NodeId),
	/// A press and release on a content node without moving.
	ClickNode(NodeId),
	Drop(DragState),
}

#[derive(Clone, Debug, Default)]
pub struct Interaction {
	pub tools: ToolState,
	gesture: Gesture,
}

impl Interaction {
	pub fn tool(&self) -> Tool {
		self.tools.tool()
	}

	/// Starts a gesture. Only the primary button (0) does anything.
	pub fn pointer_down(&mut self, pointer: Point, button: i16, target: PointerTarget) -> PointerDown {
		if button != 0 {
			return PointerDown::Ignored;
		}
		self.gesture = match (self.tools.tool(), target) {
			(Tool::Select, PointerTarget::ContentNode { id, offset }) => {
				debug!("perception-map: dragging {}", id);
				Gesture::Dragging(DragState {
					node_id: id,
					offset,
					press: pointer,
					pointer,
				})
			}
			(Tool::Select, PointerTarget::DomainNode(id)) => Gesture::Panning {
				press: pointer,
				domain: Some(id),
			},
			_ => Gesture::Panning {
				press: pointer,
				domain: None,
			},
		};
		match self.gesture {
			Gesture::Dragging(_) => PointerDown::BeginDrag,
			_ => PointerDown::BeginPan,
		}
	}

	/// Updates the live drag position. Returns whether a drag is in progress.
	pub fn pointer_move(&mut self, pointer: Point) -> bool {
		match &mut self.gesture {
			Gesture::Dragging(drag) => {
				drag.pointer = pointer;
				true
			}
			_ => false,
		}
	}

	pub fn pointer_up(&mut self, pointer: Point) -> PointerUp {
		match std::mem::take(&mut self.gesture) {
			Gesture::Idle => PointerUp::None,
			Gesture::Dragging(drag) if drag.press.distance_to(pointer) < CLICK_SLOP => {
				PointerUp::ClickNode(drag.node_id)
			}
			Gesture::Dragging(mut drag) => {
				drag.pointer = pointer;
				PointerUp::Drop(drag)
			}
			Gesture::Panning {
				press,
				domain: Some(id),
			} if press.distance_to(pointer) < CLICK_SLOP => PointerUp::ClickDomain(id),
			Gesture::Panning { .. } => PointerUp::EndPan,
		}
	}

	/// Abandons the current gesture, e.g. when the pointer leaves the canvas.
	pub fn cancel(&mut self) {
		self.gesture = Gesture::Idle;
	}

	pub fn drag(&self) -> Option<&DragState> {
		match &self.gesture {
			Gesture::Dragging(drag) => Some(drag),
			_ => None,
		}
	}

	/// Node id and world position to draw the dragged node at.
	pub fn drag_preview(&self, pan: Point, zoom: f64) -> Option<(&str, Point)> {
		self.drag()
			.map(|drag| (drag.node_id.as_str(), drag.world_position(pan, zoom)))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn key(key: &str) -> KeyInput<'_> {
		KeyInput {
			key,
			..Default::default()
		}
	}

	#[test]
	fn space_only_overrides_select() {
		let mut tools = ToolState::default();
		assert!(tools.space_down(false));
		assert_eq!(tools.tool(), Tool::Hand);
		assert!(!tools.space_down(true));
		assert!(tools.space_up());
		assert_eq!(tools.tool(), Tool::Select);

		tools.select(Tool::Hand);
		assert!(!tools.space_down(false));
		assert!(!tools.space_up());
		assert_eq!(tools.tool(), Tool::Hand);
	}

	#[test]
	fn shortcuts_map_to_commands() {
		let undo = KeyInput {
			key: "z",
			ctrl: true,
			..Default::default()
		};
		let redo = KeyInput {
			key: "Z",
			meta: true,
			shift: true,
			..Default::default()
		};
		let redo_y = KeyInput {
			key: "y",
			ctrl: true,
			..Default::default()
		};
		assert_eq!(key_down_command(&undo), Some(KeyCommand::Undo));
		assert_eq!(key_down_command(&redo), Some(KeyCommand::Redo));
		assert_eq!(key_down_command(&redo_y), Some(KeyCommand::Redo));
		assert_eq!(key_down_command(&key("h")), Some(KeyCommand::SelectTool(Tool::Hand)));
		assert_eq!(key_down_command(&key("V")), Some(KeyCommand::SelectTool(Tool::Select)));
		assert_eq!(key_down_command(&key("Escape")), Some(KeyCommand::ExitFocus));
		assert_eq!(key_down_command(&key(" ")), Some(KeyCommand::HoldHand));
		assert_eq!(
			key_down_command(&KeyInput {
				key: " ",
				repeat: true,
				..Default::default()
			}),
			None
		);
		assert_eq!(key_up_command(&key(" ")), Some(KeyCommand::ReleaseHand));
		assert_eq!(key_down_command(&key("q")), None);
	}

	#[test]
	fn drop_accounts_for_offset_pan_and_zoom() {
		let mut interaction = Interaction::default();
		let target = PointerTarget::ContentNode {
			id: "n-1".into(),
			offset: Point::new(20.0, 10.0),
		};
		assert_eq!(
			interaction.pointer_down(Point::new(100.0, 100.0), 0, target),
			PointerDown::BeginDrag
		);
		interaction.pointer_move(Point::new(220.0, 110.0));
		let (_, preview) = interaction.drag_preview(Point::new(0.0, 0.0), 2.0).unwrap();
		assert_eq!(preview, Point::new(100.0, 50.0));

		let PointerUp::Drop(drag) = interaction.pointer_up(Point::new(250.0, 60.0)) else {
			panic!("expected a drop");
		};
		assert_eq!(drag.world_position(Point::new(30.0, -50.0), 2.0), Point::new(100.0, 50.0));
		assert!(interaction.drag().is_none());
	}

	#[test]
	fn hand_tool_pans_over_nodes() {
		let mut interaction = Interaction::default();
		interaction.tools.select(Tool::Hand);
		let target = PointerTarget::ContentNode {
			id: "n-1".into(),
			offset: Point::ORIGIN,
		};
		assert_eq!(
			interaction.pointer_down(Point::ORIGIN, 0, target),
			PointerDown::BeginPan
		);
		assert!(!interaction.pointer_move(Point::new(5.0, 5.0)));
		assert_eq!(interaction.pointer_up(Point::new(5.0, 5.0)), PointerUp::EndPan);
	}

	#[test]
	fn domain_click_versus_pan() {
		let mut interaction = Interaction::default();
		interaction.pointer_down(Point::ORIGIN, 0, PointerTarget::DomainNode("d-public".into()));
		assert_eq!(
			interaction.pointer_up(Point::new(1.0, 1.0)),
			PointerUp::ClickDomain("d-public".into())
		);

		interaction.pointer_down(Point::ORIGIN, 0, PointerTarget::DomainNode("d-public".into()));
		assert_eq!(interaction.pointer_up(Point::new(40.0, 0.0)), PointerUp::EndPan);

		let target = PointerTarget::ContentNode {
			id: "n-2".into(),
			offset: Point::ORIGIN,
		};
		interaction.pointer_down(Point::ORIGIN, 0, target);
		assert_eq!(
			interaction.pointer_up(Point::new(2.0, 0.0)),
			PointerUp::ClickNode("n-2".into())
		);

		assert_eq!(
			interaction.pointer_down(Point::ORIGIN, 2, PointerTarget::Canvas),
			PointerDown::Ignored
		);
		assert_eq!(interaction.pointer_up(Point::ORIGIN), PointerUp::None);
	}
}
