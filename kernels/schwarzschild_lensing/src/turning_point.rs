// Closed-form turning-point (periapsis) solver
//
// A photon with impact parameter b turns around where its radial motion
// stops, which in Schwarzschild geometry is a root of the cubic
//
//   r³ - b²r + 2Mb² = 0
//
// Solving the cubic in closed form gives the exact periapsis, with none of
// the instability an iterative shooting method would suffer near b_crit
// where the turning point merges with the photon sphere.

use std::f64::consts::PI;

use crate::types::BlackHole;

// ============================================================================
// PERIAPSIS FROM IMPACT PARAMETER
// ============================================================================

// Closest-approach radius for a photon arriving from infinity.
//
// Returns `Ok(None)` for b below b_crit: the cubic has no turning point
// above the horizon and the photon is captured, which is an answer, not a
// failure. For b at or above b_crit the cubic has three real roots; the
// trigonometric form of Cardano's method enumerates them without any
// complex arithmetic:
//
//   r³ + p·r + q = 0,  p = -b²,  q = 2Mb²
//   r_k = 2√(-p/3) · cos[(arccos(3q/(2p)·√(-3/p)) - 2πk) / 3]
//
// Two of the roots can clear the horizon. The smaller one bounds the
// trapped-orbit region inside the photon sphere and is never reached by a
// photon falling in from far away; the larger one is where that photon
// actually stops descending, so it is the physical periapsis and the one
// returned here.
//
// `NoValidRootError` signals b ≥ b_crit with no root above the horizon.
// That combination cannot arise from the algebra, so seeing it means the
// solver itself has degenerated; it is fatal to the ray and must not be
// defaulted away.
pub fn closest_approach(b: f64, black_hole: &BlackHole) -> Result<Option<f64>, NoValidRootError> {
    let b_crit = black_hole.critical_impact_parameter();
    if b < b_crit {
        return Ok(None);
    }

    let m = black_hole.mass;
    let p = -b * b;
    let q = 2.0 * m * b * b;

    let amplitude = 2.0 * (-p / 3.0).sqrt();
    let cos_arg = (3.0 * q / (2.0 * p)) * (-3.0 / p).sqrt();
    // At b = b_crit the cubic has a double root at 3M and the argument sits
    // exactly on -1; roundoff can push it just outside [-1, 1]
    let theta = cos_arg.clamp(-1.0, 1.0).acos();

    let rs = black_hole.schwarzschild_radius();
    let mut periapsis: Option<f64> = None;
    for k in 0..3 {
        let root = amplitude * ((theta - 2.0 * PI * k as f64) / 3.0).cos();
        if root > rs && periapsis.map_or(true, |held| root > held) {
            periapsis = Some(root);
        }
    }

    periapsis.map(Some).ok_or(NoValidRootError { b })
}

// ============================================================================
// ERRORS
// ============================================================================

// b should have a turning point above the horizon, but the cubic produced
// none. Indicates solver degeneracy, not a physical outcome.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoValidRootError {
    pub b: f64,
}

impl std::fmt::Display for NoValidRootError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "No turning point above the horizon for impact parameter b = {}",
            self.b
        )
    }
}

impl std::error::Error for NoValidRootError {}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // Residual of the original cubic, normalized so large-b roots don't
    // drown the comparison in magnitude
    fn normalized_residual(r: f64, b: f64, m: f64) -> f64 {
        let residual = r * r * r - b * b * r + 2.0 * m * b * b;
        residual.abs() / (r * r * r).abs().max(1.0)
    }

    #[test]
    fn test_periapsis_satisfies_cubic() {
        let bh = BlackHole::new(1.0);
        for b in [6.0, 1.2 * bh.critical_impact_parameter(), 10.0, 1000.0] {
            let r_min = closest_approach(b, &bh)
                .expect("admissible root expected")
                .expect("turning point expected above b_crit");
            assert!(
                normalized_residual(r_min, b, 1.0) < 1e-10,
                "Root r = {} does not satisfy the cubic for b = {}",
                r_min,
                b
            );
            assert!(r_min > bh.schwarzschild_radius());
        }
    }

    #[test]
    fn test_periapsis_outside_photon_sphere() {
        // The scattering periapsis of a deflected photon always sits above
        // 3M; the root inside (2M, 3M) must not be returned
        let bh = BlackHole::new(1.0);
        let b = 1.2 * bh.critical_impact_parameter();
        let r_min = closest_approach(b, &bh).unwrap().unwrap();
        assert!(
            r_min > bh.photon_sphere_radius(),
            "Periapsis {} fell inside the photon sphere",
            r_min
        );
    }

    #[test]
    fn test_critical_impact_parameter_grazes_photon_sphere() {
        let bh = BlackHole::new(1.0);
        let r_min = closest_approach(bh.critical_impact_parameter(), &bh)
            .unwrap()
            .unwrap();
        assert!(
            (r_min - 3.0).abs() < 1e-6,
            "Double root at b_crit should sit at 3M, got {}",
            r_min
        );
    }

    #[test]
    fn test_subcritical_has_no_turning_point() {
        let bh = BlackHole::new(1.0);
        assert_eq!(closest_approach(0.0, &bh), Ok(None));
        assert_eq!(closest_approach(4.0, &bh), Ok(None));
        assert_eq!(
            closest_approach(0.99 * bh.critical_impact_parameter(), &bh),
            Ok(None)
        );
    }

    #[test]
    fn test_large_b_approaches_straight_line() {
        // Weak-field limit: r_min ≈ b - M for b >> b_crit
        let bh = BlackHole::new(1.0);
        let b = 1000.0;
        let r_min = closest_approach(b, &bh).unwrap().unwrap();
        assert!(
            (r_min - (b - 1.0)).abs() < 0.01,
            "Far periapsis {} should approach b - M",
            r_min
        );
    }

    #[test]
    fn test_periapsis_scales_with_mass() {
        let small = BlackHole::new(1.0);
        let big = BlackHole::new(2.0);
        let b = 1.2 * small.critical_impact_parameter();

        let r_small = closest_approach(b, &small).unwrap().unwrap();
        let r_big = closest_approach(2.0 * b, &big).unwrap().unwrap();
        assert!(
            (r_big - 2.0 * r_small).abs() < 1e-9,
            "Geometry should scale linearly with mass"
        );
    }

    #[test]
    fn test_error_carries_impact_parameter() {
        let err = NoValidRootError { b: 7.5 };
        assert!(err.to_string().contains("7.5"));
    }
}
