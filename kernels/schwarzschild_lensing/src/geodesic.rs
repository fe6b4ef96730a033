// Binet equation and trajectory classification for Schwarzschild photons

use crate::solver::OdeSystem;
use crate::types::BlackHole;

// ============================================================================
// NUMERICAL GUARDS
// ============================================================================

// Relative half-width of the classification bands around b_crit
pub const REGIME_EPSILON: f64 = 1e-6;

// Floor applied to u = 1/r before inversion. Adaptive overshoot can push u
// to zero or slightly negative once a photon is effectively at infinity;
// the floor keeps r finite instead of blowing up the division.
pub const U_FLOOR: f64 = 1e-15;

// Radius from the reduced variable u = 1/r, with the overshoot floor
#[inline]
pub fn r_from_u(u: f64) -> f64 {
    1.0 / u.max(U_FLOOR)
}

// ============================================================================
// GEODESIC EQUATION (BINET FORM)
// ============================================================================

// Null geodesic in the equatorial plane, written in Binet's form
//
// Physics: instead of integrating the full time-parameterized geodesic,
// substitute u(φ) = 1/r(φ) and use the azimuthal angle as the independent
// variable. The equation of motion collapses to
//
//   u'' + u = 3 M u²
//
// The left side is a Newtonian straight line (u = cos φ / b); the 3Mu² term
// is the entire general-relativistic correction. It is negligible far out
// and dominant near the photon sphere, which is exactly the regime split
// the trajectory classification below encodes.
//
// The right-hand side is evaluated thousands of times per ray inside the
// adaptive stepper, so it stays a branch-free pair of multiplications.
// Pathologically large u produces a large but finite derivative, never an
// error; the stepper's own finite-state check catches true divergence.
#[derive(Debug, Clone, Copy)]
pub struct BinetEquation {
    mass: f64,
}

impl BinetEquation {
    pub fn new(black_hole: &BlackHole) -> Self {
        Self { mass: black_hole.mass }
    }
}

impl OdeSystem<2> for BinetEquation {
    // State y = [u, u']  →  y' = [u', 3Mu² - u]
    #[inline]
    fn rhs(&self, _phi: f64, y: &[f64; 2], dydt: &mut [f64; 2]) {
        let u = y[0];
        dydt[0] = y[1];
        dydt[1] = 3.0 * self.mass * u * u - u;
    }
}

// ============================================================================
// TRAJECTORY REGIMES
// ============================================================================

// A photon's fate, decided entirely by its impact parameter
//
// Physics: b_crit = 3√3·M is the aim offset that grazes the photon sphere.
// Above it the photon turns around at a periapsis and escapes (deflected);
// below it there is no turning point and the photon spirals into the
// horizon (captured); within a narrow band the photon hovers on the
// unstable circular orbit at 3M (critical).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrajectoryRegime {
    // Turns at a periapsis outside the photon sphere and escapes
    Deflected,
    // Hovers near the unstable r = 3M orbit before peeling off
    Critical,
    // No turning point; crosses the horizon
    Captured,
}

impl TrajectoryRegime {
    // Classify an impact parameter. Total over b ≥ 0: every value lands in
    // exactly one regime. Callers validate b before classifying.
    //
    // The deflected threshold is relative (b > b_crit·(1+ε)) while the
    // critical band is absolute (|b - b_crit| ≤ ε), so a thin slice just
    // above the critical band still classifies captured. Rays there plunge
    // like any other captured ray.
    pub fn classify(b: f64, black_hole: &BlackHole) -> Self {
        let b_crit = black_hole.critical_impact_parameter();
        if b > b_crit * (1.0 + REGIME_EPSILON) {
            TrajectoryRegime::Deflected
        } else if (b - b_crit).abs() <= REGIME_EPSILON {
            TrajectoryRegime::Critical
        } else {
            TrajectoryRegime::Captured
        }
    }

    // Human-readable label for legends and manifests
    pub fn name(&self) -> &'static str {
        match self {
            TrajectoryRegime::Deflected => "deflected",
            TrajectoryRegime::Critical => "critical",
            TrajectoryRegime::Captured => "captured",
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
