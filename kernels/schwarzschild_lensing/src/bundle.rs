// Batch driver: map impact parameters to rays

use rayon::prelude::*;

use crate::integration::{trace_ray, Ray, TraceError};
use crate::types::{BlackHole, IntegrationConfig};

// Trace one ray per impact parameter, in input order.
//
// Rays share no state, so the bundle maps in parallel. The collection
// short-circuits on the first failure: rayon stops handing out new rays
// once an error is seen, which gives the batch best-effort early
// termination. This is the propagate policy for scientific runs; the
// renderer applies its own sentinel policy instead.
pub fn trace_bundle(
    b_list: &[f64],
    black_hole: &BlackHole,
    config: &IntegrationConfig,
) -> Result<Vec<Ray>, TraceError> {
    b_list
        .par_iter()
        .map(|&b| trace_ray(b, black_hole, config))
        .collect()
}

// The canonical three-regime bundle: one deflected, one critical, one
// captured photon
pub fn demo_impact_parameters(black_hole: &BlackHole) -> Vec<f64> {
    let b_crit = black_hole.critical_impact_parameter();
    vec![1.20 * b_crit, 1.00 * b_crit, 0.80 * b_crit]
}

// ============================================================================
// TESTS
// ============================================================================
