// kernels/schwarzschild_lensing/src/lib.rs

// Schwarzschild Photon Lensing Core
//
// This library integrates null geodesics in the equatorial plane of a
// Schwarzschild black hole. A photon's impact parameter decides its fate
// (deflected, critical, or captured); the integrator produces the spatial
// trajectory for each regime with event detection at the horizon and the
// escape radius. All computations use f64: the near-critical dynamics are
// exponentially sensitive and need every bit of precision.

pub mod bundle;
pub mod export;
pub mod geodesic;
pub mod integration;
pub mod render;
pub mod sky;
pub mod solver;
pub mod turning_point;
pub mod types;
pub mod validation;

pub use bundle::{demo_impact_parameters, trace_bundle};
pub use export::{export_rays_to_csv, write_manifest, RaySummary, RunManifest};
pub use geodesic::{r_from_u, BinetEquation, TrajectoryRegime};
pub use integration::{trace_ray, Ray, TraceError};
pub use render::{render_image, to_rgb_image, LensedImage, RenderStats};
pub use sky::{Color, EquirectangularSky, Sky, SyntheticSky, ERROR_COLOR, SHADOW_COLOR};
pub use solver::{
    EventAction, EventDirection, EventFunction, EventRecord, EventSpec, OdeSystem, Rk45, Solution,
    SolverError, Tolerances,
};
pub use turning_point::{closest_approach, NoValidRootError};
pub use types::{BlackHole, Camera, IntegrationConfig, RenderConfig};
