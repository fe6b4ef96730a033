// Ray integrator: regime-specific setup, event-driven integration,
// trajectory assembly
//
// The regime decides everything about how a ray starts:
// - Deflected photons anchor at their periapsis (u' = 0 there by
//   definition) and integrate both azimuthal directions from it.
// - Critical photons start on the photon sphere, nudged off the unstable
//   equilibrium so the spiral becomes visible.
// - Captured photons have no turning point to anchor on, so an asymptotic
//   state far out is pre-integrated toward the hole and the resulting
//   mid-plunge state seeds the visible half-span.
//
// Every visible integration watches two events: reaching the escape radius
// (informational, the asymptotic regime begins there) and crossing the
// horizon from above (terminal, the photon is gone).

use crate::geodesic::{r_from_u, BinetEquation, TrajectoryRegime};
use crate::solver::{EventAction, EventDirection, EventSpec, Rk45, SolverError, Tolerances};
use crate::turning_point::{closest_approach, NoValidRootError};
use crate::types::{BlackHole, IntegrationConfig};
use crate::validation;

// ============================================================================
// TUNING CONSTANTS
// ============================================================================

// Trial size of the first adaptive step, in radians
const INITIAL_STEP: f64 = 1e-3;

// Multiplicative nudge off the exact photon-sphere equilibrium. The exact
// orbit is a fixed point of the ODE; without the nudge the critical ray
// would sit on it forever.
const CRITICAL_NUDGE: f64 = 1e-6;

// u value of the asymptotic start of a captured ray (r = 10⁶ in units of M),
// also the floor for 1/b when b is (near) zero
const ASYMPTOTIC_U: f64 = 1e-6;

// Captured rays hand off from the pre-integration to the visible half-span
// when they reach this multiple of the horizon radius. A visualization
// constant, not physics: it only decides how much of the plunge the visible
// samples show before the horizon event ends them.
const HANDOFF_RADIUS_FACTOR: f64 = 2.0;

// ============================================================================
// RAY RECORD
// ============================================================================

// One computed photon trajectory. Built once per integration call and never
// mutated afterwards; consumers (CSV export, renderer, manifest) only read.
#[derive(Debug, Clone, PartialEq)]
pub struct Ray {
    // Impact parameter that produced this trajectory
    pub b: f64,
    pub regime: TrajectoryRegime,
    // Azimuthal angle at each sample, strictly ascending
    pub phi: Vec<f64>,
    // Radius at each sample
    pub r: Vec<f64>,
    // Cartesian projection x = r·cos(φ)
    pub x: Vec<f64>,
    // Cartesian projection y = r·sin(φ)
    pub y: Vec<f64>,
    // The escape radius was crossed somewhere along the trajectory
    pub escaped: bool,
    // The horizon event ended the integration
    pub crossed_horizon: bool,
}

impl Ray {
    fn from_samples(
        b: f64,
        regime: TrajectoryRegime,
        phi: Vec<f64>,
        states: Vec<[f64; 2]>,
        escaped: bool,
        crossed_horizon: bool,
    ) -> Self {
        let r: Vec<f64> = states.iter().map(|s| r_from_u(s[0])).collect();
        let x = phi.iter().zip(&r).map(|(p, r)| r * p.cos()).collect();
        let y = phi.iter().zip(&r).map(|(p, r)| r * p.sin()).collect();
        Self {
            b,
            regime,
            phi,
            r,
            x,
            y,
            escaped,
            crossed_horizon,
        }
    }

    // Number of trajectory samples
    pub fn len(&self) -> usize {
        self.phi.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phi.is_empty()
    }

    // Final azimuthal angle; for escaping rays this is the sky direction
    pub fn phi_end(&self) -> f64 {
        self.phi.last().copied().unwrap_or(0.0)
    }

    // Smallest sampled radius
    pub fn r_min(&self) -> f64 {
        self.r.iter().copied().fold(f64::INFINITY, f64::min)
    }
}

// ============================================================================
// RAY INTEGRATION
// ============================================================================

// Trace one photon. Pure function of its inputs: identical arguments give
// bitwise-identical rays.
pub fn trace_ray(
    b: f64,
    black_hole: &BlackHole,
    config: &IntegrationConfig,
) -> Result<Ray, TraceError> {
    if !b.is_finite() || b < 0.0 {
        return Err(TraceError::InvalidImpactParameter { b });
    }

    let regime = TrajectoryRegime::classify(b, black_hole);
    let equation = BinetEquation::new(black_hole);
    let rs = black_hole.schwarzschild_radius();
    let span = config.phi_span;

    let r_infinity = config.r_infinity;
    let escape = move |_phi: f64, y: &[f64; 2]| r_from_u(y[0]) - r_infinity;
    let horizon = move |_phi: f64, y: &[f64; 2]| r_from_u(y[0]) - rs;
    let events = [
        EventSpec {
            g: &escape,
            direction: EventDirection::Any,
            action: EventAction::Continue,
        },
        EventSpec {
            g: &horizon,
            direction: EventDirection::Falling,
            action: EventAction::Stop,
        },
    ];

    let mut solver = Rk45::new(Tolerances::new(config.rtol, config.atol));

    let (phi, states, escaped, crossed_horizon) = match regime {
        TrajectoryRegime::Deflected => {
            // Classification guarantees b > b_crit here, so the cubic must
            // yield a periapsis; a missing one is solver degeneracy
            let r_min = closest_approach(b, black_hole)?.ok_or(NoValidRootError { b })?;
            symmetric_arc(&mut solver, &equation, [1.0 / r_min, 0.0], span, &events)?
        }
        TrajectoryRegime::Critical => {
            let u0 = (1.0 + CRITICAL_NUDGE) / black_hole.photon_sphere_radius();
            symmetric_arc(&mut solver, &equation, [u0, 0.0], span, &events)?
        }
        TrajectoryRegime::Captured => {
            let y0 = [ASYMPTOTIC_U, 1.0 / b.max(ASYMPTOTIC_U)];
            let handoff = move |_phi: f64, y: &[f64; 2]| {
                r_from_u(y[0]) - HANDOFF_RADIUS_FACTOR * rs
            };
            let pre_events = [EventSpec {
                g: &handoff,
                direction: EventDirection::Falling,
                action: EventAction::Stop,
            }];
            let pre = solver
                .solve(&equation, -span, &y0, 0.0, INITIAL_STEP, &pre_events)
                .map_err(TraceError::Integration)?;
            let (_, seed) = pre.final_state();

            let half = 0.5 * span;
            let visible = solver
                .solve(&equation, -half, &seed, half, INITIAL_STEP, &events)
                .map_err(TraceError::Integration)?;
            let escaped = !visible.events.is_empty();
            let crossed = visible.terminal.is_some();
            (visible.t, visible.y, escaped, crossed)
        }
    };

    debug_assert!(
        validation::relative_drift(&states, black_hole.mass) < validation::DRIFT_TOLERANCE,
        "First integral drifted beyond tolerance for b = {}",
        b
    );

    Ok(Ray::from_samples(b, regime, phi, states, escaped, crossed_horizon))
}

// Integrate both azimuthal directions from the φ = 0 anchor and stitch the
// legs into a single ascending-φ sample sequence
fn symmetric_arc(
    solver: &mut Rk45<2>,
    equation: &BinetEquation,
    y0: [f64; 2],
    span: f64,
    events: &[EventSpec<'_, 2>],
) -> Result<(Vec<f64>, Vec<[f64; 2]>, bool, bool), TraceError> {
    let backward = solver
        .solve(equation, 0.0, &y0, -span, -INITIAL_STEP, events)
        .map_err(TraceError::Integration)?;
    let forward = solver
        .solve(equation, 0.0, &y0, span, INITIAL_STEP, events)
        .map_err(TraceError::Integration)?;

    let total = backward.len() + forward.len() - 1;
    let mut phi = Vec::with_capacity(total);
    let mut states = Vec::with_capacity(total);
    for i in (0..backward.len()).rev() {
        phi.push(backward.t[i]);
        states.push(backward.y[i]);
    }
    // The anchor sample is shared by both legs; emit it once
    phi.extend_from_slice(&forward.t[1..]);
    states.extend_from_slice(&forward.y[1..]);

    let escaped = !backward.events.is_empty() || !forward.events.is_empty();
    let crossed = backward.terminal.is_some() || forward.terminal.is_some();
    Ok((phi, states, escaped, crossed))
}

// ============================================================================
// ERRORS
// ============================================================================

// Ways a single ray's computation can fail. Failures stay local to the ray;
// whether they halt a batch or turn into a sentinel pixel is the caller's
// policy.
#[derive(Debug, Clone)]
pub enum TraceError {
    // Impact parameter was negative or non-finite; rejected before solving
    InvalidImpactParameter { b: f64 },
    // Turning-point solver degeneracy
    NoValidRoot(NoValidRootError),
    // The adaptive stepper failed to converge or left the finite domain
    Integration(SolverError),
}

impl std::fmt::Display for TraceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TraceError::InvalidImpactParameter { b } => {
                write!(f, "Impact parameter must be finite and non-negative, got {}", b)
            }
            TraceError::NoValidRoot(err) => write!(f, "Turning-point solver failed: {}", err),
            TraceError::Integration(err) => write!(f, "Geodesic integration failed: {}", err),
        }
    }
}

impl std::error::Error for TraceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TraceError::InvalidImpactParameter { .. } => None,
            TraceError::NoValidRoot(err) => Some(err),
            TraceError::Integration(err) => Some(err),
        }
    }
}

impl From<NoValidRootError> for TraceError {
    fn from(err: NoValidRootError) -> Self {
        TraceError::NoValidRoot(err)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (BlackHole, IntegrationConfig) {
        (BlackHole::default(), IntegrationConfig::default())
    }

    #[test]
    fn test_deflected_ray_turns_at_periapsis_and_escapes() {
        let (bh, config) = setup();
        let b = 1.2 * bh.critical_impact_parameter();

        let ray = trace_ray(b, &bh, &config).unwrap();
        assert_eq!(ray.regime, TrajectoryRegime::Deflected);
        assert!(!ray.crossed_horizon);
        assert!(ray.escaped, "Deflected ray should cross the escape radius");

        let r_min = closest_approach(b, &bh).unwrap().unwrap();
        assert!(r_min > bh.schwarzschild_radius());

        // The anchor sample sits at φ = 0 with u' = 0, i.e. exactly at the
        // periapsis the cubic predicted
        let (center, _) = ray
            .phi
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.abs().partial_cmp(&b.1.abs()).unwrap())
            .unwrap();
        assert!((ray.r[center] - r_min).abs() < 1e-9);
        assert!(
            (ray.r_min() - r_min).abs() < 1e-6,
            "No sample should dip below the turning point"
        );

        // Symmetric span, both ends reached (escape is non-terminal)
        assert!((ray.phi[0] + config.phi_span).abs() < 1e-9);
        assert!((ray.phi_end() - config.phi_span).abs() < 1e-9);
        assert!(ray.r.iter().any(|&r| r >= config.r_infinity));
    }

    #[test]
    fn test_captured_ray_ends_on_horizon() {
        let (bh, config) = setup();
        let b = 0.8 * bh.critical_impact_parameter();

        let ray = trace_ray(b, &bh, &config).unwrap();
        assert_eq!(ray.regime, TrajectoryRegime::Captured);
        assert!(ray.crossed_horizon);
        assert!(!ray.escaped);

        let last = *ray.r.last().unwrap();
        assert!(
            (last - bh.schwarzschild_radius()).abs() < 1e-6,
            "Final radius {} should sit on the horizon",
            last
        );
        assert!(
            ray.phi_end() < 0.5 * config.phi_span,
            "Horizon event must terminate before the span runs out"
        );
        assert!(ray.r.iter().all(|&r| r < config.r_infinity));
    }

    #[test]
    fn test_critical_ray_hovers_near_photon_sphere() {
        let (bh, config) = setup();
        let b = bh.critical_impact_parameter();

        let ray = trace_ray(b, &bh, &config).unwrap();
        assert_eq!(ray.regime, TrajectoryRegime::Critical);

        // The nudge grows like cosh(φ), so the hover holds through |φ| ≈ 10
        // and the peel-off lands well inside the ±20 span
        for (phi, r) in ray.phi.iter().zip(&ray.r) {
            if phi.abs() <= 10.0 {
                assert!(
                    (r - 3.0).abs() < 0.5,
                    "Radius {} strayed from the photon sphere at phi = {}",
                    r,
                    phi
                );
            }
        }
        assert!(!ray.escaped, "Critical ray must not reach the escape radius");
        assert!(ray.crossed_horizon, "The outward nudge in u spirals in eventually");
        let phi_end = ray.phi_end().abs();
        assert!(
            phi_end > 5.0 && phi_end < config.phi_span,
            "Peel-off at |phi| = {} should be late but inside the span",
            phi_end
        );
        let last = *ray.r.last().unwrap();
        assert!((last - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_impact_parameter_falls_straight_in() {
        let (bh, config) = setup();

        let ray = trace_ray(0.0, &bh, &config).unwrap();
        assert_eq!(ray.regime, TrajectoryRegime::Captured);
        assert!(ray.crossed_horizon);
        // A radial plunge sweeps essentially no azimuth
        let sweep = ray.phi_end() - ray.phi[0];
        assert!(sweep < 1e-3, "Radial plunge swept {} radians", sweep);
    }

    #[test]
    fn test_far_ray_is_nearly_straight() {
        let (bh, config) = setup();
        let b = 1000.0;

        let ray = trace_ray(b, &bh, &config).unwrap();
        assert_eq!(ray.regime, TrajectoryRegime::Deflected);
        // Weak-field periapsis sits at b - M, far outside the escape radius
        assert!((ray.r_min() - (b - 1.0)).abs() < 0.1);

        // u reaches zero (r pinned at the floor) just past φ = π/2: the
        // asymptote of an almost undeflected line
        let cross = ray
            .phi
            .iter()
            .zip(&ray.r)
            .find(|(phi, r)| **phi > 0.0 && **r > 1e6)
            .map(|(phi, _)| *phi)
            .expect("far ray should straighten out within the span");
        assert!(
            cross > 1.4 && cross < 2.4,
            "Asymptote at phi = {} should sit near pi/2",
            cross
        );
    }

    #[test]
    fn test_cartesian_roundtrip() {
        let (bh, config) = setup();
        for factor in [1.2, 1.0, 0.8] {
            let ray = trace_ray(factor * bh.critical_impact_parameter(), &bh, &config).unwrap();
            for i in 0..ray.len() {
                let recovered = (ray.x[i] * ray.x[i] + ray.y[i] * ray.y[i]).sqrt();
                assert!(
                    (recovered - ray.r[i]).abs() <= 1e-9 * ray.r[i],
                    "x/y projection inconsistent with r at sample {}",
                    i
                );
            }
        }
    }

    #[test]
    fn test_idempotence() {
        let (bh, config) = setup();
        let b = bh.critical_impact_parameter();

        let first = trace_ray(b, &bh, &config).unwrap();
        let second = trace_ray(b, &bh, &config).unwrap();
        assert_eq!(first, second, "Repeated calls must agree bitwise");
    }

    #[test]
    fn test_phi_samples_ascend() {
        let (bh, config) = setup();
        for factor in [1.2, 1.0, 0.8] {
            let ray = trace_ray(factor * bh.critical_impact_parameter(), &bh, &config).unwrap();
            assert!(
                ray.phi.windows(2).all(|w| w[1] > w[0]),
                "Stitched sample sequence must ascend in phi"
            );
        }
    }

    #[test]
    fn test_first_integral_conserved_across_regimes() {
        let (bh, config) = setup();
        for factor in [1.2, 1.0, 0.8] {
            let b = factor * bh.critical_impact_parameter();
            // The debug_assert inside trace_ray performs the drift check on
            // the raw states; this exercises it for every regime
            let ray = trace_ray(b, &bh, &config).unwrap();
            assert!(!ray.is_empty());
        }
    }

    #[test]
    fn test_invalid_impact_parameters_rejected() {
        let (bh, config) = setup();
        for bad in [-1.0, f64::NAN, f64::INFINITY] {
            let result = trace_ray(bad, &bh, &config);
            assert!(
                matches!(result, Err(TraceError::InvalidImpactParameter { .. })),
                "b = {} must be rejected before solving",
                bad
            );
        }
    }

    #[test]
    fn test_trace_error_display_and_source() {
        use std::error::Error;

        let invalid = TraceError::InvalidImpactParameter { b: -2.0 };
        assert!(invalid.to_string().contains("-2"));
        assert!(invalid.source().is_none());

        let wrapped = TraceError::NoValidRoot(NoValidRootError { b: 6.0 });
        assert!(wrapped.source().is_some());
    }
}
