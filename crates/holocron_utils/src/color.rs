//! Color types shared by the parsers and the world builder

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RGB8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl From<RGB8> for RGBA8 {
    #[inline]
    fn from(value: RGB8) -> Self {
        RGBA8 {
            r: value.r,
            g: value.g,
            b: value.b,
            a: 255,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RGBA8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl RGBA8 {
    pub const TRANSPARENT: RGBA8 = RGBA8 {
        r: 0,
        g: 0,
        b: 0,
        a: 0,
    };
}

/// Floating point color, used for light values and per-vertex colors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RGBAf {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl RGBAf {
    pub const WHITE: RGBAf = RGBAf::new(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: RGBAf = RGBAf::new(0.0, 0.0, 0.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Gray color of given intensity, opaque
    pub const fn from_intensity(value: f32) -> Self {
        Self::new(value, value, value, 1.0)
    }

    /// Clamps every channel into `0..=1`
    pub fn clamped(self) -> Self {
        Self::new(
            self.r.clamp(0.0, 1.0),
            self.g.clamp(0.0, 1.0),
            self.b.clamp(0.0, 1.0),
            self.a.clamp(0.0, 1.0),
        )
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl Default for RGBAf {
    fn default() -> Self {
        Self::BLACK
    }
}

impl From<RGBA8> for RGBAf {
    fn from(value: RGBA8) -> Self {
        Self::new(
            value.r as f32 / 255.0,
            value.g as f32 / 255.0,
            value.b as f32 / 255.0,
            value.a as f32 / 255.0,
        )
    }
}
