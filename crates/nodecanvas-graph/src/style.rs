//! Canvas style system.
//!
//! Colors are looked up from an explicit [`Theme`] handed to the painter,
//! never from ambient state.

use nodecanvas_core::Compatibility;

/// RGBA color representation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn from_hex(hex: u32) -> Self {
        Self::rgb((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
    }

    /// Hue, saturation and brightness in `[0, 1]`. The hue wraps around.
    pub fn from_hsb(hue: f32, saturation: f32, brightness: f32) -> Self {
        if saturation <= 0.0 {
            let v = (brightness * 255.0 + 0.5) as u8;
            return Self::rgb(v, v, v);
        }
        let h = (hue - hue.floor()) * 6.0;
        let f = h - h.floor();
        let p = brightness * (1.0 - saturation);
        let q = brightness * (1.0 - saturation * f);
        let t = brightness * (1.0 - saturation * (1.0 - f));
        let (r, g, b) = match h as u32 {
            0 => (brightness, t, p),
            1 => (q, brightness, p),
            2 => (p, brightness, t),
            3 => (p, q, brightness),
            4 => (t, p, brightness),
            _ => (brightness, p, q),
        };
        let channel = |v: f32| (v * 255.0 + 0.5) as u8;
        Self::rgb(channel(r), channel(g), channel(b))
    }

    pub fn to_tuple(&self) -> (u8, u8, u8, u8) {
        (self.r, self.g, self.b, self.a)
    }

    /// `#rrggbb`, alpha ignored.
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    pub fn with_alpha(&self, a: u8) -> Self {
        Self { a, ..*self }
    }

    pub fn darken(&self, factor: f32) -> Self {
        Self {
            r: ((self.r as f32) * (1.0 - factor)) as u8,
            g: ((self.g as f32) * (1.0 - factor)) as u8,
            b: ((self.b as f32) * (1.0 - factor)) as u8,
            a: self.a,
        }
    }

    pub fn lighten(&self, factor: f32) -> Self {
        Self {
            r: ((self.r as f32) + (255.0 - self.r as f32) * factor) as u8,
            g: ((self.g as f32) + (255.0 - self.g as f32) * factor) as u8,
            b: ((self.b as f32) + (255.0 - self.b as f32) * factor) as u8,
            a: self.a,
        }
    }
}

/// Edge color and style
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeStyle {
    pub color: Color,
    pub width: f32,
    pub dashed: bool,
    pub arrow_head: bool,
}

// ============================================================================
// Color Constants
// ============================================================================

pub const COLOR_COMMENT_EDGE: Color = Color::rgb(194, 141, 0);
pub const COLOR_TRIVIAL_EDGE: Color = Color::from_hex(0x737880);
pub const COLOR_LOSSY_EDGE: Color = Color::from_hex(0x2957C2);
pub const COLOR_INCOMPATIBLE_EDGE: Color = Color::rgb(255, 0, 0);
pub const COLOR_HIDDEN_EDGE: Color = Color::rgb(211, 211, 211);
pub const COLOR_RESIZE_HANDLE: Color = Color::from_hex(0x22A02D);

pub const MULTICOLOR_SATURATION: f32 = 0.45;
pub const MULTICOLOR_BRIGHTNESS: f32 = 0.65;

/// Palette used by the painter.
#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub background: Color,
    pub grid: Color,
    pub node_fill: Color,
    pub node_border: Color,
    pub node_text: Color,
    pub annotation_fill: Color,
    pub comment_fill: Color,
    pub port_fill: Color,
    pub port_border: Color,
    pub add_port_fill: Color,
    pub selection: Color,
    pub hover: Color,
    pub marquee_fill: Color,
    pub marquee_border: Color,
    pub cursor: Color,
    pub resize_handle: Color,
    pub comment_edge: Color,
    pub trivial_edge: Color,
    pub lossy_edge: Color,
    pub incompatible_edge: Color,
    pub hidden_edge: Color,
    pub connect_preview: Color,
    pub disconnect_preview: Color,
    pub minimap_edge: Color,
    pub minimap_node: Color,
    pub minimap_selection: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            background: Color::rgb(255, 255, 255),
            grid: Color::rgb(235, 235, 235),
            node_fill: Color::rgb(245, 245, 245),
            node_border: Color::rgb(120, 120, 120),
            node_text: Color::rgb(30, 30, 30),
            annotation_fill: Color::rgba(255, 250, 205, 200),
            comment_fill: Color::rgb(255, 244, 196),
            port_fill: Color::rgb(225, 230, 238),
            port_border: Color::rgb(150, 160, 175),
            add_port_fill: Color::rgb(210, 235, 210),
            selection: Color::rgb(57, 105, 206),
            hover: Color::rgba(0, 0, 0, 30),
            marquee_fill: Color::rgba(57, 105, 206, 40),
            marquee_border: Color::rgb(57, 105, 206),
            cursor: Color::rgb(200, 60, 60),
            resize_handle: COLOR_RESIZE_HANDLE,
            comment_edge: COLOR_COMMENT_EDGE,
            trivial_edge: COLOR_TRIVIAL_EDGE,
            lossy_edge: COLOR_LOSSY_EDGE,
            incompatible_edge: COLOR_INCOMPATIBLE_EDGE,
            hidden_edge: COLOR_HIDDEN_EDGE,
            connect_preview: Color::rgb(0, 160, 0),
            disconnect_preview: Color::rgb(220, 0, 0),
            minimap_edge: COLOR_HIDDEN_EDGE,
            minimap_node: Color::rgb(160, 160, 160),
            minimap_selection: Color::rgb(57, 105, 206),
        }
    }
}

impl Theme {
    /// Semantic edge color from data-type compatibility.
    pub fn compatibility_color(&self, compatibility: Compatibility) -> Color {
        match compatibility {
            Compatibility::Trivial => self.trivial_edge,
            Compatibility::Lossy => self.lossy_edge,
            Compatibility::Incompatible => self.incompatible_edge,
        }
    }

    /// Distinct hue for the `index`-th of `count` colored edges.
    pub fn multicolor(&self, index: usize, count: usize) -> Color {
        let count = count.max(1);
        Color::from_hsb(
            index as f32 / count as f32,
            MULTICOLOR_SATURATION,
            MULTICOLOR_BRIGHTNESS,
        )
    }
}
