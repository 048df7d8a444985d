use glam::Vec2;

/// A rectangle in screen-space pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.x
            && point.x < self.x + self.width
            && point.y >= self.y
            && point.y < self.y + self.height
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Shrink by `amount` on every side.
    pub fn inset(&self, amount: f32) -> Self {
        Self::new(
            self.x + amount,
            self.y + amount,
            (self.width - 2.0 * amount).max(0.0),
            (self.height - 2.0 * amount).max(0.0),
        )
    }
}

/// RGBA color in sRGB space, straight alpha.
///
/// This is the space colors are picked and displayed in; convert with
/// [`Color::to_linear`] before writing to an sRGB render target.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Opaque color from a `0xRRGGBB` value.
    ///
    /// ```
    /// use shape_lab::Color;
    ///
    /// let c = Color::from_hex(0xff8000);
    /// assert_eq!(c.to_hex(), 0xff8000);
    /// ```
    pub const fn from_hex(hex: u32) -> Self {
        Self::rgb(
            ((hex >> 16) & 0xff) as f32 / 255.0,
            ((hex >> 8) & 0xff) as f32 / 255.0,
            (hex & 0xff) as f32 / 255.0,
        )
    }

    pub fn to_hex(self) -> u32 {
        let channel = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u32;
        (channel(self.r) << 16) | (channel(self.g) << 8) | channel(self.b)
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    /// Convert RGB from sRGB to linear; alpha is unchanged.
    pub fn to_linear(self) -> Self {
        fn channel(c: f32) -> f32 {
            if c <= 0.04045 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        }
        Self::rgba(channel(self.r), channel(self.g), channel(self.b), self.a)
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);

    /// Semi-transparent dark background for overlay panels.
    pub const PANEL_BG: Color = Color::rgba(0.12, 0.12, 0.12, 0.94);
    pub const PANEL_BORDER: Color = Color::rgba(0.4, 0.4, 0.4, 1.0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn hex_round_trips_through_components() {
        let c = Color::from_hex(0xf68002);
        assert_relative_eq!(c.r, 246.0 / 255.0);
        assert_relative_eq!(c.b, 2.0 / 255.0);
        assert_eq!(c.to_hex(), 0xf68002);
    }

    #[test]
    fn linear_conversion_keeps_endpoints() {
        let black = Color::BLACK.to_linear();
        let white = Color::WHITE.to_linear();
        assert_relative_eq!(black.r, 0.0);
        assert_relative_eq!(white.g, 1.0, epsilon = 1e-6);
        assert_relative_eq!(Color::rgb(0.5, 0.5, 0.5).to_linear().r, 0.21404, epsilon = 1e-4);
    }

    #[test]
    fn rect_contains_is_half_open() {
        let r = Rect::new(10.0, 10.0, 5.0, 5.0);
        assert!(r.contains(Vec2::new(10.0, 10.0)));
        assert!(!r.contains(Vec2::new(15.0, 12.0)));
    }
}
