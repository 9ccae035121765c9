//! Zoom, pan and domain focus for the canvas view.
//!
//! The camera maps world-space to screen-space with `screen = world * zoom +
//! pan`. Zoom is clamped to [`ZoomConfig::min`]..=[`ZoomConfig::max`] after
//! every change, including every animation frame.

use log::debug;

use super::config::{MapConfig, ZoomConfig};
use super::geometry::{Point, Size, domain_bounds};
use super::types::{DomainId, DomainNode};

/// Cubic ease-in-out on `0..=1`.
pub fn smooth_step(t: f64) -> f64 {
	let t = t.clamp(0.0, 1.0);
	t * t * (3.0 - 2.0 * t)
}

/// Pan and zoom applied to the whole map.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
	pub pan: Point,
	pub zoom: f64,
}

/// Tracks an in-progress canvas pan.
#[derive(Clone, Copy, Debug, Default)]
struct PanState {
	active: bool,
	/// `pointer - pan` at the moment the pan started.
	anchor: Point,
}

/// Glide from one transform to another.
#[derive(Clone, Copy, Debug)]
struct CameraAnimation {
	from: ViewTransform,
	to: ViewTransform,
	elapsed: f64,
	duration: f64,
}

#[derive(Clone, Debug)]
pub struct Camera {
	transform: ViewTransform,
	focused_domain: Option<DomainId>,
	pan: PanState,
	animation: Option<CameraAnimation>,
	limits: ZoomConfig,
	animation_secs: f64,
}

impl Camera {
	pub fn new(config: &MapConfig) -> Self {
		Self {
			transform: ViewTransform {
				pan: Point::ORIGIN,
				zoom: config.zoom.default,
			},
			focused_domain: None,
			pan: PanState::default(),
			animation: None,
			limits: config.zoom.clone(),
			animation_secs: config.focus_animation_secs,
		}
	}

	pub fn zoom(&self) -> f64 {
		self.transform.zoom
	}

	pub fn pan(&self) -> Point {
		self.transform.pan
	}

	pub fn focused_domain(&self) -> Option<DomainId> {
		self.focused_domain
	}

	fn clamp_zoom(&self, zoom: f64) -> f64 {
		zoom.clamp(self.limits.min, self.limits.max)
	}

	pub fn set_zoom(&mut self, zoom: f64) {
		self.animation = None;
		self.transform.zoom = self.clamp_zoom(zoom);
	}

	/// Handles one wheel tick. Only zooms while Ctrl/Cmd is held.
	///
	/// Returns whether the event was consumed.
	pub fn wheel(&mut self, delta_y: f64, modifier: bool) -> bool {
		if !modifier || delta_y == 0.0 {
			return false;
		}
		let step = if delta_y > 0.0 {
			-self.limits.wheel_step
		} else {
			self.limits.wheel_step
		};
		self.set_zoom(self.transform.zoom + step);
		true
	}

	pub fn zoom_in(&mut self) {
		self.set_zoom(self.transform.zoom + self.limits.button_step);
	}

	pub fn zoom_out(&mut self) {
		self.set_zoom(self.transform.zoom - self.limits.button_step);
	}

	pub fn begin_pan(&mut self, pointer: Point) {
		self.animation = None;
		self.pan = PanState {
			active: true,
			anchor: pointer - self.transform.pan,
		};
	}

	/// Follows the pointer while a pan is active.
	pub fn update_pan(&mut self, pointer: Point) -> bool {
		if !self.pan.active {
			return false;
		}
		self.transform.pan = pointer - self.pan.anchor;
		true
	}

	pub fn end_pan(&mut self) {
		self.pan.active = false;
	}

	pub fn is_panning(&self) -> bool {
		self.pan.active
	}

	fn home(&self) -> ViewTransform {
		ViewTransform {
			pan: Point::ORIGIN,
			zoom: self.clamp_zoom(self.limits.default),
		}
	}

	/// Jumps back to the default zoom with no pan, leaving any focus.
	pub fn reset_view(&mut self) {
		self.animation = None;
		self.focused_domain = None;
		self.transform = self.home();
	}

	/// Transform that centres `domain` in a viewport of the given size.
	pub fn focus_target(&self, domain: &DomainNode, viewport: Size) -> ViewTransform {
		let zoom = self.clamp_zoom(self.limits.focus);
		let center = domain_bounds(domain).center;
		ViewTransform {
			pan: viewport.center() - center * zoom,
			zoom,
		}
	}

	/// Focuses `domain`, or leaves focus when it is already focused.
	///
	/// Returns the domain focused afterwards.
	pub fn toggle_focus(&mut self, domain: &DomainNode, viewport: Size) -> Option<DomainId> {
		let id = domain.data.domain_id;
		if self.focused_domain == Some(id) {
			self.exit_focus();
		} else {
			let target = self.focus_target(domain, viewport);
			self.focused_domain = Some(id);
			self.animate_to(target);
			debug!("perception-map: focusing {} domain", id);
		}
		self.focused_domain
	}

	/// Leaves focus mode and glides back to the default view.
	///
	/// Returns `false` when no domain was focused.
	pub fn exit_focus(&mut self) -> bool {
		if self.focused_domain.take().is_none() {
			return false;
		}
		let home = self.home();
		self.animate_to(home);
		true
	}

	fn animate_to(&mut self, to: ViewTransform) {
		self.pan.active = false;
		if self.animation_secs <= 0.0 {
			self.transform = to;
			self.animation = None;
			return;
		}
		self.animation = Some(CameraAnimation {
			from: self.transform,
			to,
			elapsed: 0.0,
			duration: self.animation_secs,
		});
	}

	pub fn is_animating(&self) -> bool {
		self.animation.is_some()
	}

	/// Advances the focus animation by `dt` seconds.
	///
	/// Returns whether the camera moved.
	pub fn tick(&mut self, dt: f64) -> bool {
		let Some(mut animation) = self.animation else {
			return false;
		};
		animation.elapsed += dt.max(0.0);
		if animation.elapsed >= animation.duration {
			self.transform = animation.to;
			self.animation = None;
			return true;
		}
		let t = smooth_step(animation.elapsed / animation.duration);
		let zoom = animation.from.zoom + (animation.to.zoom - animation.from.zoom) * t;
		self.transform = ViewTransform {
			pan: animation.from.pan.lerp(animation.to.pan, t),
			zoom: self.clamp_zoom(zoom),
		};
		self.animation = Some(animation);
		true
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::perception_canvas::seed;

	fn camera() -> Camera {
		Camera::new(&MapConfig::default())
	}

	fn domain(id: &str) -> DomainNode {
		seed::seed_nodes()
			.into_iter()
			.find(|n| n.id() == id)
			.and_then(|n| n.as_domain().cloned())
			.unwrap()
	}

	fn finish(camera: &mut Camera) {
		while camera.is_animating() {
			camera.tick(1.0 / 60.0);
		}
	}

	#[test]
	fn zoom_is_clamped_both_ways() {
		let mut camera = camera();
		for _ in 0..50 {
			camera.zoom_in();
			assert!(camera.zoom() <= 3.0);
		}
		assert_eq!(camera.zoom(), 3.0);
		for _ in 0..50 {
			camera.zoom_out();
			assert!(camera.zoom() >= 0.3);
		}
		assert_eq!(camera.zoom(), 0.3);
	}

	#[test]
	fn wheel_requires_modifier() {
		let mut camera = camera();
		assert!(!camera.wheel(-120.0, false));
		assert_eq!(camera.zoom(), 1.0);

		assert!(camera.wheel(-120.0, true));
		assert!((camera.zoom() - 1.1).abs() < 1e-9);
		assert!(camera.wheel(120.0, true));
		assert!((camera.zoom() - 1.0).abs() < 1e-9);
	}

	#[test]
	fn horizontal_only_wheel_leaves_zoom() {
		let mut camera = camera();
		assert!(!camera.wheel(0.0, true));
		assert_eq!(camera.zoom(), 1.0);
	}

	#[test]
	fn pan_follows_pointer_from_anchor() {
		let mut camera = camera();
		camera.begin_pan(Point::new(100.0, 100.0));
		camera.update_pan(Point::new(130.0, 90.0));
		assert_eq!(camera.pan(), Point::new(30.0, -10.0));

		camera.end_pan();
		assert!(!camera.update_pan(Point::new(500.0, 500.0)));

		camera.begin_pan(Point::new(0.0, 0.0));
		camera.update_pan(Point::new(10.0, 10.0));
		assert_eq!(camera.pan(), Point::new(40.0, 0.0));
	}

	#[test]
	fn focus_centres_domain_in_viewport() {
		let mut camera = camera();
		let private = domain("d-private");
		let viewport = Size::new(1000.0, 800.0);

		assert_eq!(camera.toggle_focus(&private, viewport), Some(DomainId::Private));
		finish(&mut camera);

		// circle centre is (100, 100); 500 - 100 * 1.2 = 380, 400 - 120 = 280
		assert!((camera.zoom() - 1.2).abs() < 1e-9);
		let pan = camera.pan();
		assert!((pan.x - 380.0).abs() < 1e-9 && (pan.y - 280.0).abs() < 1e-9);
	}

	#[test]
	fn focusing_same_domain_again_resets() {
		let mut camera = camera();
		let public = domain("d-public");
		let viewport = Size::new(800.0, 600.0);
		camera.toggle_focus(&public, viewport);
		finish(&mut camera);

		assert_eq!(camera.toggle_focus(&public, viewport), None);
		finish(&mut camera);
		assert_eq!(camera.zoom(), 1.0);
		assert_eq!(camera.pan(), Point::ORIGIN);
		assert!(!camera.exit_focus());
	}

	#[test]
	fn reset_view_leaves_focus() {
		let mut camera = camera();
		let private = domain("d-private");
		camera.toggle_focus(&private, Size::new(1000.0, 800.0));
		finish(&mut camera);

		camera.reset_view();
		assert_eq!(camera.focused_domain(), None);
		assert_eq!(camera.zoom(), 1.0);
		assert_eq!(camera.pan(), Point::ORIGIN);
		assert!(!camera.is_animating());
		// a later click on the same domain focuses again instead of toggling off
		assert_eq!(camera.toggle_focus(&private, Size::new(1000.0, 800.0)), Some(DomainId::Private));
	}

	#[test]
	fn animation_stays_within_clamp() {
		let config = MapConfig {
			zoom: ZoomConfig {
				focus: 9.0,
				..ZoomConfig::default()
			},
			..MapConfig::default()
		};
		let mut camera = Camera::new(&config);
		camera.toggle_focus(&domain("d-abstract"), Size::new(800.0, 600.0));
		while camera.tick(0.05) {
			assert!(camera.zoom() <= 3.0);
		}
		assert_eq!(camera.zoom(), 3.0);
	}

	#[test]
	fn smooth_step_is_clamped() {
		assert_eq!(smooth_step(-1.0), 0.0);
		assert_eq!(smooth_step(0.5), 0.5);
		assert_eq!(smooth_step(2.0), 1.0);
	}
}
