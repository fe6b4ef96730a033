// Type definitions for Schwarzschild photon lensing

use std::f64::consts::PI;

// ============================================================================
// BLACK HOLE DEFINITION
// ============================================================================

// A non-rotating (Schwarzschild) black hole
//
// Physics concepts:
// - Mass (M): Sets the size scale. We use geometric units where G=c=1, so
//   every length below is a multiple of M. M=1 keeps the numbers readable.
// - Schwarzschild radius (Rs = 2M): The event horizon. Light that crosses
//   it never comes back out.
// - Photon sphere (r = 3M): The radius where light can orbit the hole on a
//   circle. The orbit is unstable; any perturbation grows exponentially.
// - Critical impact parameter (b_crit = 3√3·M ≈ 5.196M): A photon aimed
//   from far away with offset b from the hole's center grazes the photon
//   sphere exactly when b = b_crit. Larger b deflects and escapes, smaller
//   b spirals in. This single number decides every photon's fate.
#[derive(Debug, Clone, Copy)]
pub struct BlackHole {
    // Mass in geometric units
    pub mass: f64,
}

impl BlackHole {
    // Create a new black hole with the given mass
    pub fn new(mass: f64) -> Self {
        assert!(mass > 0.0, "Mass must be positive");
        Self { mass }
    }

    // Event horizon radius Rs = 2M
    #[inline]
    pub fn schwarzschild_radius(&self) -> f64 {
        2.0 * self.mass
    }

    // Unstable circular photon orbit radius r = 3M
    #[inline]
    pub fn photon_sphere_radius(&self) -> f64 {
        3.0 * self.mass
    }

    // Critical impact parameter b_crit = 3√3·M
    //
    // Math: for a photon with impact parameter b the turning-point condition
    // r³ - b²r + 2Mb² = 0 develops a double root at r = 3M exactly when
    // b² = 27M². Below that there is no turning point at all.
    #[inline]
    pub fn critical_impact_parameter(&self) -> f64 {
        3.0 * 3.0_f64.sqrt() * self.mass
    }
}

impl Default for BlackHole {
    fn default() -> Self {
        Self::new(1.0)
    }
}

// ============================================================================
// INTEGRATION CONFIGURATION
// ============================================================================

// Numerical settings for the geodesic integration
//
// The defaults reproduce the canonical run: tight tolerances (the photon
// sphere region is exponentially sensitive), a ±20 radian azimuthal span
// (enough for the full in/out arc plus the slow near-critical winding), and
// an "effectively at infinity" radius of 500M for the escape event.
#[derive(Debug, Clone, Copy)]
pub struct IntegrationConfig {
    // Relative tolerance of the adaptive stepper
    pub rtol: f64,

    // Absolute tolerance of the adaptive stepper
    pub atol: f64,

    // Half-width of the azimuthal integration window, in radians.
    // Deflected/critical rays run over φ ∈ [-phi_span, +phi_span].
    pub phi_span: f64,

    // Radius treated as infinity: crossing it fires the (non-terminal)
    // escape event
    pub r_infinity: f64,
}

impl IntegrationConfig {
    pub fn new(rtol: f64, atol: f64, phi_span: f64, r_infinity: f64) -> Self {
        assert!(rtol > 0.0 && rtol.is_finite(), "rtol must be positive and finite");
        assert!(atol > 0.0 && atol.is_finite(), "atol must be positive and finite");
        assert!(phi_span > 0.0, "Angular span must be positive");
        assert!(r_infinity > 0.0, "Escape radius must be positive");
        Self { rtol, atol, phi_span, r_infinity }
    }
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self::new(1e-9, 1e-12, 20.0, 500.0)
    }
}

// ============================================================================
// CAMERA MODEL
// ============================================================================

// Pinhole camera for the lensing render
//
// The observer sits in the equatorial plane at `distance` (in units of M)
// from the hole and looks straight at it. Each pixel maps to an angular
// offset from the optical axis, and that angle maps to the impact parameter
// of the backward-traced photon:
//
//   b = distance · tan(angle)
//
// One deliberate simplification rides along with this model: escaping rays
// are looked up on the sky at polar angle θ = π/2 regardless of the pixel's
// vertical offset, because the integration lives entirely in the equatorial
// plane. Off-axis pixels therefore see an azimuthally-correct but
// polar-collapsed sky. A full treatment needs the θ equation of motion.
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    // Observer distance from the hole, in units of M
    pub distance: f64,

    // Full field of view in degrees
    pub fov: f64,
}

impl Camera {
    pub fn new(distance: f64, fov: f64) -> Self {
        assert!(distance > 0.0, "Observer distance must be positive");
        assert!(fov > 0.0 && fov < 180.0, "FOV must be in (0, 180) degrees");
        Self { distance, fov }
    }

    // Field of view in radians
    #[inline]
    pub fn fov_rad(&self) -> f64 {
        self.fov * PI / 180.0
    }

    // Impact parameter of the photon seen by pixel (px, py)
    //
    // Pixels map to normalized device coordinates in [-1, 1] on both axes,
    // the radial NDC offset scales to an angle within the half-FOV, and the
    // pinhole projection applies tan (not a linear approximation).
    pub fn impact_parameter(&self, px: u32, py: u32, config: &RenderConfig) -> f64 {
        let ndc_x = (px as f64 / (config.width - 1) as f64) * 2.0 - 1.0;
        let ndc_y = (py as f64 / (config.height - 1) as f64) * 2.0 - 1.0;

        let half_fov = self.fov_rad() * 0.5;
        let angle = (ndc_x * ndc_x + ndc_y * ndc_y).sqrt() * half_fov;

        self.distance * angle.tan()
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(50.0, 90.0)
    }
}

// ============================================================================
// RENDER CONFIGURATION
// ============================================================================

// Output image properties
#[derive(Debug, Clone, Copy)]
pub struct RenderConfig {
    // Image width in pixels
    pub width: u32,

    // Image height in pixels
    pub height: u32,
}

impl RenderConfig {
    pub fn new(width: u32, height: u32) -> Self {
        // The NDC mapping divides by (n - 1), so a 1-pixel axis is degenerate
        assert!(width > 1 && height > 1, "Image must be at least 2x2 pixels");
        Self { width, height }
    }

    // Total number of pixels to render
    #[inline]
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self::new(400, 400)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_radii() {
        let bh = BlackHole::new(1.0);
        assert_eq!(bh.schwarzschild_radius(), 2.0, "Horizon should sit at 2M");
        assert_eq!(bh.photon_sphere_radius(), 3.0, "Photon sphere should sit at 3M");
        assert!(
            (bh.critical_impact_parameter() - 5.196152422706632).abs() < 1e-12,
            "b_crit should equal 3*sqrt(3) for M=1"
        );
    }

    #[test]
    fn test_radii_scale_with_mass() {
        let bh = BlackHole::new(2.5);
        assert!((bh.schwarzschild_radius() - 5.0).abs() < 1e-12);
        assert!((bh.photon_sphere_radius() - 7.5).abs() < 1e-12);
        assert!(
            (bh.critical_impact_parameter() - 2.5 * 3.0 * 3.0_f64.sqrt()).abs() < 1e-12,
            "b_crit should scale linearly with mass"
        );
    }

    #[test]
    fn test_camera_center_pixel_hits_dead_on() {
        let camera = Camera::default();
        let config = RenderConfig::new(3, 3);
        let b = camera.impact_parameter(1, 1, &config);
        assert!(b.abs() < 1e-15, "Center pixel should aim straight at the hole");
    }

    #[test]
    fn test_camera_edge_pixel_angle() {
        // Edge-center pixel sits at ndc (-1, 0): half the 90° FOV, so
        // b = 50 * tan(45°) = 50
        let camera = Camera::new(50.0, 90.0);
        let config = RenderConfig::new(3, 3);
        let b = camera.impact_parameter(0, 1, &config);
        assert!((b - 50.0).abs() < 1e-9, "Edge pixel should map to b = D*tan(fov/2)");
    }

    #[test]
    fn test_camera_impact_parameter_grows_with_radius() {
        let camera = Camera::default();
        let config = RenderConfig::new(5, 5);
        let center = camera.impact_parameter(2, 2, &config);
        let mid = camera.impact_parameter(1, 2, &config);
        let corner = camera.impact_parameter(0, 0, &config);
        assert!(center < mid && mid < corner, "b should increase away from the optical axis");
    }

    #[test]
    fn test_render_config_pixel_count() {
        let config = RenderConfig::new(400, 300);
        assert_eq!(config.pixel_count(), 120_000);
    }

    #[test]
    #[should_panic(expected = "Mass must be positive")]
    fn test_rejects_nonpositive_mass() {
        BlackHole::new(0.0);
    }

    #[test]
    #[should_panic(expected = "FOV must be in (0, 180)")]
    fn test_rejects_silly_fov() {
        Camera::new(50.0, 180.0);
    }
}
