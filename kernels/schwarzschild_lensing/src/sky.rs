// Background sky sampling for the lensing render
//
// An escaping ray leaves the scene in some direction (θ, φ); the sky maps
// that direction to a color. Two backdrops are provided: a procedural one
// that needs no assets and makes the lensing structure obvious (hemisphere
// split plus azimuthal stripes), and an equirectangular texture loaded from
// an image file.

use std::f64::consts::PI;
use std::path::Path;

use image::RgbImage;

// Linear RGB color with channels in [0, 1]
pub type Color = [f64; 3];

// Captured rays render as the shadow of the hole
pub const SHADOW_COLOR: Color = [0.0, 0.0, 0.0];

// Sentinel for per-pixel computation failures. Deliberately unmistakable:
// one bad pixel flags itself instead of corrupting its neighborhood.
pub const ERROR_COLOR: Color = [1.0, 0.0, 1.0];

// ============================================================================
// SKY TRAIT
// ============================================================================

// Direction-to-color lookup on the celestial sphere.
// θ ∈ [0, π] from the north pole, φ unbounded (wrapped mod 2π).
// Sync because the renderer samples from its worker threads.
pub trait Sky: Sync {
    fn sample(&self, theta: f64, phi: f64) -> Color;
}

// ============================================================================
// PROCEDURAL BACKDROP
// ============================================================================

// Synthetic sky: blue upper hemisphere, orange lower, brightened stripes
// where sin(5φ) > 0. Crude, but deflected stripes and the Einstein ring
// read instantly against it.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntheticSky;

impl Sky for SyntheticSky {
    fn sample(&self, theta: f64, phi: f64) -> Color {
        let base: Color = if theta < PI / 2.0 {
            [0.1, 0.3, 0.8]
        } else {
            [0.9, 0.5, 0.1]
        };
        let stripe = if (5.0 * phi).sin() > 0.0 { 0.2 } else { 0.0 };
        [
            (base[0] + stripe).clamp(0.0, 1.0),
            (base[1] + stripe).clamp(0.0, 1.0),
            (base[2] + stripe).clamp(0.0, 1.0),
        ]
    }
}

// ============================================================================
// EQUIRECTANGULAR TEXTURE
// ============================================================================

// Starfield texture in equirectangular projection: φ maps across the width,
// θ down the height, north up.
pub struct EquirectangularSky {
    pixels: RgbImage,
}

impl EquirectangularSky {
    pub fn open(path: &Path) -> Result<Self, image::ImageError> {
        let pixels = image::open(path)?.to_rgb8();
        Ok(Self::from_image(pixels))
    }

    pub fn from_image(pixels: RgbImage) -> Self {
        assert!(
            pixels.width() > 0 && pixels.height() > 0,
            "Sky texture must not be empty"
        );
        Self { pixels }
    }
}

impl Sky for EquirectangularSky {
    fn sample(&self, theta: f64, phi: f64) -> Color {
        // u = (φ mod 2π)/2π, v = θ/π, flipped vertically so north is up
        let u = phi.rem_euclid(2.0 * PI) / (2.0 * PI);
        let v = (theta / PI).clamp(0.0, 1.0);

        let px = (u * (self.pixels.width() - 1) as f64) as u32;
        let py = ((1.0 - v) * (self.pixels.height() - 1) as f64) as u32;

        let pixel = self.pixels.get_pixel(px, py);
        [
            pixel[0] as f64 / 255.0,
            pixel[1] as f64 / 255.0,
            pixel[2] as f64 / 255.0,
        ]
    }
}

// ============================================================================
// TESTS
// ============================================================================
