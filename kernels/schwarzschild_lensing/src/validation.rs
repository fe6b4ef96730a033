// Conservation checks for the Binet integration

// ============================================================================
// FIRST INTEGRAL OF BINET'S EQUATION
// ============================================================================

// Multiplying u'' + u = 3Mu² by u' and integrating once gives the conserved
// quantity
//
//   I(u, u') = u'² + u² - 2Mu³
//
// On a trajectory with impact parameter b this equals 1/b² exactly, so any
// change of I along a computed trajectory is pure integration error. The
// ray integrator checks the drift in debug builds and the scenario tests
// assert it on every regime.

// Largest acceptable relative drift of the first integral over one ray.
// Local step errors at rtol = 1e-9 accumulate additively over the few
// thousand steps of a ±20 rad span, so the budget sits well above the
// per-step tolerance.
pub const DRIFT_TOLERANCE: f64 = 1e-5;

// The conserved quantity at a single state
#[inline]
pub fn binet_invariant(u: f64, u_prime: f64, mass: f64) -> f64 {
    u_prime * u_prime + u * u - 2.0 * mass * u * u * u
}

// Maximum relative drift of the first integral over a sample sequence,
// measured against its value at the first sample
pub fn relative_drift(states: &[[f64; 2]], mass: f64) -> f64 {
    let Some(first) = states.first() else {
        return 0.0;
    };
    let reference = binet_invariant(first[0], first[1], mass);
    let scale = reference.abs().max(1e-30);

    states
        .iter()
        .map(|s| (binet_invariant(s[0], s[1], mass) - reference).abs() / scale)
        .fold(0.0, f64::max)
}

// ============================================================================
// TESTS
// ============================================================================
