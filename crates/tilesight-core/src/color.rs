//! Light colours: [`Rgb`] for sources and [`Light`] for per-tile
//! accumulators.

use std::fmt;
use std::ops::{AddAssign, Neg, SubAssign};

// ---------------------------------------------------------------------------
// Rgb
// ---------------------------------------------------------------------------

/// An 8-bit-per-channel colour.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Self = Self::new(0, 0, 0);
    pub const WHITE: Self = Self::new(255, 255, 255);

    #[inline]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl From<(u8, u8, u8)> for Rgb {
    #[inline]
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Self::new(r, g, b)
    }
}

// ---------------------------------------------------------------------------
// Light
// ---------------------------------------------------------------------------

/// Additive light accumulated on a tile, one signed integer per channel.
///
/// Contributions are quantized with [`Light::scaled`], which truncates
/// toward zero. Truncation is odd-symmetric (`scaled(c, -i) ==
/// -scaled(c, i)`), so subtracting a contribution that was previously
/// added restores the accumulator exactly, whatever was added in between.
/// Storage is never clamped; use [`Light::clamped`] for display.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Light {
    pub r: i32,
    pub g: i32,
    pub b: i32,
}

impl Light {
    pub const ZERO: Self = Self { r: 0, g: 0, b: 0 };

    #[inline]
    pub const fn new(r: i32, g: i32, b: i32) -> Self {
        Self { r, g, b }
    }

    /// The quantized contribution of `rgb` at `intensity`.
    #[inline]
    pub fn scaled(rgb: Rgb, intensity: f64) -> Self {
        Self {
            r: (intensity * rgb.r as f64) as i32,
            g: (intensity * rgb.g as f64) as i32,
            b: (intensity * rgb.b as f64) as i32,
        }
    }

    /// Clamp each channel to the displayable `0..=255` range.
    #[inline]
    pub fn clamped(self) -> Rgb {
        Rgb::new(
            self.r.clamp(0, 255) as u8,
            self.g.clamp(0, 255) as u8,
            self.b.clamp(0, 255) as u8,
        )
    }

    #[inline]
    pub fn is_zero(self) -> bool {
        self == Self::ZERO
    }
}

impl AddAssign for Light {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        self.r += rhs.r;
        self.g += rhs.g;
        self.b += rhs.b;
    }
}

impl SubAssign for Light {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        self.r -= rhs.r;
        self.g -= rhs.g;
        self.b -= rhs.b;
    }
}

impl Neg for Light {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.r, -self.g, -self.b)
    }
}
