// Pixel-grid lensing renderer
//
// Every pixel maps through the camera to an impact parameter, traces one
// photon, and colors itself from the outcome: captured rays paint the
// shadow, escaping rays sample the sky along their final direction, and a
// failed trace paints the sentinel color rather than aborting the image.
//
// The pixels are independent, so the buffer fills from a parallel iterator;
// the only shared state is a handful of atomic counters for progress and
// statistics.

use std::f64::consts::PI;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use image::{Rgb, RgbImage};
use rayon::prelude::*;

use crate::geodesic::TrajectoryRegime;
use crate::integration::trace_ray;
use crate::sky::{Color, Sky, ERROR_COLOR, SHADOW_COLOR};
use crate::types::{BlackHole, Camera, IntegrationConfig, RenderConfig};

// ============================================================================
// RENDER OUTPUT
// ============================================================================

// Per-outcome pixel counts, reported when the render completes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    // Captured rays (the shadow of the hole)
    pub shadow_pixels: usize,
    // Escaping rays that sampled the background
    pub sky_pixels: usize,
    // Sentinel-colored trace failures
    pub error_pixels: usize,
}

// A completed lensing render in linear [0, 1] color
#[derive(Debug, Clone)]
pub struct LensedImage {
    pub width: u32,
    pub height: u32,
    // Row-major, top row first
    pub pixels: Vec<Color>,
    pub stats: RenderStats,
}

// ============================================================================
// RENDERING
// ============================================================================

// Render the lensed view of `sky` through the pixel grid.
//
// `progress` is called with the running count of completed pixels, from
// whichever worker finishes one; hook a progress bar's set_position to it.
//
// Escaping rays sample the sky at polar angle θ = π/2 regardless of the
// pixel's vertical offset; the integration lives in the equatorial plane
// and carries no θ motion. Known approximation, kept deliberately.
pub fn render_image<S, F>(
    black_hole: &BlackHole,
    camera: &Camera,
    render: &RenderConfig,
    integration: &IntegrationConfig,
    sky: &S,
    progress: F,
) -> LensedImage
where
    S: Sky + ?Sized,
    F: Fn(u64) + Sync,
{
    let mut pixels = vec![SHADOW_COLOR; render.pixel_count()];
    let shadow = AtomicUsize::new(0);
    let sampled = AtomicUsize::new(0);
    let errors = AtomicUsize::new(0);
    let done = AtomicU64::new(0);

    pixels.par_iter_mut().enumerate().for_each(|(idx, out)| {
        let px = idx as u32 % render.width;
        let py = idx as u32 / render.width;
        let b = camera.impact_parameter(px, py, render);

        *out = match trace_ray(b, black_hole, integration) {
            Ok(ray) if ray.regime == TrajectoryRegime::Captured => {
                shadow.fetch_add(1, Ordering::Relaxed);
                SHADOW_COLOR
            }
            Ok(ray) => {
                sampled.fetch_add(1, Ordering::Relaxed);
                sky.sample(PI / 2.0, ray.phi_end())
            }
            Err(_) => {
                errors.fetch_add(1, Ordering::Relaxed);
                ERROR_COLOR
            }
        };

        progress(done.fetch_add(1, Ordering::Relaxed) + 1);
    });

    LensedImage {
        width: render.width,
        height: render.height,
        pixels,
        stats: RenderStats {
            shadow_pixels: shadow.into_inner(),
            sky_pixels: sampled.into_inner(),
            error_pixels: errors.into_inner(),
        },
    }
}

// Quantize the linear color buffer into an 8-bit RGB image
pub fn to_rgb_image(image: &LensedImage) -> RgbImage {
    RgbImage::from_fn(image.width, image.height, |x, y| {
        let c = image.pixels[(y * image.width + x) as usize];
        Rgb([channel(c[0]), channel(c[1]), channel(c[2])])
    })
}

#[inline]
fn channel(value: f64) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

// ============================================================================
// TESTS
// ============================================================================
