//! UI components.

pub mod perception_canvas;
