//! Visual theming for the perception canvas.
//!
//! Domain colours and connection styles are fixed; the surrounding chrome
//! comes in a dark and a light variant picked by [`ThemeMode`].

use super::prefs::ThemeMode;
use super::types::{ConnectionType, DomainId};

/// RGBA color representation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
	pub r: u8,
	pub g: u8,
	pub b: u8,
	pub a: f64,
}

impl Color {
	pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
		Self { r, g, b, a: 1.0 }
	}

	pub const fn rgba(r: u8, g: u8, b: u8, a: f64) -> Self {
		Self { r, g, b, a }
	}

	pub fn with_alpha(self, a: f64) -> Self {
		Self { a, ..self }
	}

	/// Linear interpolation between two colors
	pub fn lerp(self, other: Color, t: f64) -> Self {
		let t = t.clamp(0.0, 1.0);
		let mix = |a: u8, b: u8| (a as f64 * (1.0 - t) + b as f64 * t).round() as u8;
		Self {
			r: mix(self.r, other.r),
			g: mix(self.g, other.g),
			b: mix(self.b, other.b),
			a: self.a * (1.0 - t) + other.a * t,
		}
	}

	pub fn to_css(self) -> String {
		if (self.a - 1.0).abs() < 0.001 {
			format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
		} else {
			format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
		}
	}

	/// Parses `#RRGGBB` (as stored on lenses). Anything else yields `None`.
	pub fn from_hex(hex: &str) -> Option<Self> {
		let digits = hex.strip_prefix('#')?;
		if digits.len() != 6 || !digits.is_ascii() {
			return None;
		}
		let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
		Some(Self::rgb(channel(0)?, channel(2)?, channel(4)?))
	}
}

pub fn domain_color(domain: DomainId) -> Color {
	match domain {
		DomainId::Private => Color::rgb(0xFF, 0xB8, 0x4D),
		DomainId::Public => Color::rgb(0x4D, 0x9F, 0xFF),
		DomainId::Abstract => Color::rgb(0x6E, 0xE7, 0xB7),
	}
}

/// Stroke style of an edge.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConnectionStyle {
	pub color: Color,
	/// Canvas line-dash segments; empty for a solid line.
	pub dash: &'static [f64],
	pub arrow: bool,
}

pub fn connection_style(connection: ConnectionType) -> ConnectionStyle {
	match connection {
		ConnectionType::Influences => ConnectionStyle {
			color: Color::rgb(0x6C, 0x63, 0xFF),
			dash: &[],
			arrow: true,
		},
		ConnectionType::Mirrors => ConnectionStyle {
			color: Color::rgb(0x10, 0xB9, 0x81),
			dash: &[5.0, 5.0],
			arrow: false,
		},
		ConnectionType::Contradicts => ConnectionStyle {
			color: Color::rgb(0xEF, 0x44, 0x44),
			dash: &[],
			arrow: false,
		},
		ConnectionType::Refines => ConnectionStyle {
			color: Color::rgb(0xF5, 0x9E, 0x0B),
			dash: &[],
			arrow: true,
		},
		ConnectionType::MetaPattern => ConnectionStyle {
			color: Color::rgb(0xA7, 0x8B, 0xFA),
			dash: &[2.0, 4.0],
			arrow: false,
		},
	}
}

/// Complete visual theme.
#[derive(Clone, Debug, PartialEq)]
pub struct Theme {
	pub background: Color,
	/// Fill of content nodes with no domain.
	pub surface: Color,
	pub text: Color,
	pub muted_text: Color,
	pub accent: Color,
	/// Alpha of domain circle fills.
	pub domain_fill_alpha: f64,
	/// Alpha of the domain tint on content nodes.
	pub node_tint_alpha: f64,
	pub node_border: Color,
}

impl Theme {
	pub fn dark() -> Self {
		Self {
			background: Color::rgb(0x0F, 0x17, 0x24),
			surface: Color::rgb(0x1E, 0x29, 0x3B),
			text: Color::rgb(0xE6, 0xEE, 0xF8),
			muted_text: Color::rgb(0x94, 0xA3, 0xB8),
			accent: Color::rgb(0x6C, 0x63, 0xFF),
			domain_fill_alpha: 0.08,
			node_tint_alpha: 0.15,
			node_border: Color::rgba(255, 255, 255, 0.12),
		}
	}

	pub fn light() -> Self {
		Self {
			background: Color::rgb(0xF8, 0xFA, 0xFC),
			surface: Color::rgb(0xFF, 0xFF, 0xFF),
			text: Color::rgb(0x0F, 0x17, 0x2A),
			muted_text: Color::rgb(0x64, 0x74, 0x8B),
			accent: Color::rgb(0x6C, 0x63, 0xFF),
			domain_fill_alpha: 0.12,
			node_tint_alpha: 0.22,
			node_border: Color::rgba(15, 23, 42, 0.15),
		}
	}

	pub fn for_mode(mode: ThemeMode) -> Self {
		match mode {
			ThemeMode::Dark => Self::dark(),
			ThemeMode::Light => Self::light(),
		}
	}

	/// Gradient stops for a content node tagged with `domains`.
	///
	/// Untagged nodes get the flat surface colour.
	pub fn node_fill(&self, domains: impl IntoIterator<Item = DomainId>) -> Vec<Color> {
		let stops: Vec<Color> = domains
			.into_iter()
			.map(|d| self.surface.lerp(domain_color(d), self.node_tint_alpha))
			.collect();
		if stops.is_empty() {
			vec![self.surface]
		} else {
			stops
		}
	}
}

impl Default for Theme {
	fn default() -> Self {
		Self::dark()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn hex_parsing() {
		assert_eq!(Color::from_hex("#3B82F6"), Some(Color::rgb(0x3B, 0x82, 0xF6)));
		assert_eq!(Color::from_hex("3B82F6"), None);
		assert_eq!(Color::from_hex("#3B82"), None);
		assert_eq!(Color::from_hex("#zz0000"), None);
	}

	#[test]
	fn css_output() {
		assert_eq!(domain_color(DomainId::Private).to_css(), "#ffb84d");
		assert_eq!(
			Color::rgb(1, 2, 3).with_alpha(0.5).to_css(),
			"rgba(1, 2, 3, 0.5)"
		);
	}

	#[test]
	fn only_directional_types_have_arrows() {
		let arrows: Vec<ConnectionType> = ConnectionType::ALL
			.into_iter()
			.filter(|c| connection_style(*c).arrow)
			.collect();
		assert_eq!(arrows, vec![ConnectionType::Influences, ConnectionType::Refines]);
		assert!(connection_style(ConnectionType::Mirrors).dash.len() == 2);
	}

	#[test]
	fn node_fill_blends_each_domain() {
		let theme = Theme::dark();
		assert_eq!(theme.node_fill([]), vec![theme.surface]);
		let stops = theme.node_fill([DomainId::Private, DomainId::Public]);
		assert_eq!(stops.len(), 2);
		assert_ne!(stops[0], stops[1]);
	}
}
