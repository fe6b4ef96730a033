// Trajectory export: per-ray CSV files and the run manifest
//
// The CSVs are the hand-off to the external 3D scene builder, which
// reconstructs poly-curves from the rows; the schema is exactly `x,y,z`
// with z always 0.0 for equatorial motion. The manifest carries the physics
// constants and a per-ray summary so plotting tools can draw the overlay
// circles and legend labels without re-deriving anything.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Serialize;

use crate::integration::Ray;
use crate::types::{BlackHole, IntegrationConfig};

// ============================================================================
// CSV EXPORT
// ============================================================================

// Write one CSV per ray into `out_dir`, named ray_0000.csv onward
// (ray_0000.csv.gz when gzipped). Returns the written paths in ray order.
pub fn export_rays_to_csv(
    rays: &[Ray],
    out_dir: &Path,
    gzip: bool,
) -> std::io::Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir)?;

    let mut paths = Vec::with_capacity(rays.len());
    for (i, ray) in rays.iter().enumerate() {
        let name = if gzip {
            format!("ray_{:04}.csv.gz", i)
        } else {
            format!("ray_{:04}.csv", i)
        };
        let path = out_dir.join(name);
        let file = File::create(&path)?;

        if gzip {
            let mut writer = GzEncoder::new(BufWriter::new(file), Compression::default());
            write_rows(&mut writer, ray)?;
            writer.finish()?;
        } else {
            let mut writer = BufWriter::new(file);
            write_rows(&mut writer, ray)?;
            writer.flush()?;
        }
        paths.push(path);
    }
    Ok(paths)
}

fn write_rows<W: Write>(writer: &mut W, ray: &Ray) -> std::io::Result<()> {
    writeln!(writer, "x,y,z")?;
    for (x, y) in ray.x.iter().zip(&ray.y) {
        writeln!(writer, "{},{},0.0", x, y)?;
    }
    Ok(())
}

// ============================================================================
// RUN MANIFEST
// ============================================================================

// Per-ray summary line in the manifest
#[derive(Debug, Clone, Serialize)]
pub struct RaySummary {
    pub file: String,
    pub b: f64,
    pub regime: String,
    pub samples: usize,
    pub r_min: f64,
    pub phi_end: f64,
    pub escaped: bool,
    pub crossed_horizon: bool,
}

// Metadata for a trace run, serialized to manifest.json alongside the CSVs
#[derive(Debug, Clone, Serialize)]
pub struct RunManifest {
    pub mass: f64,
    pub schwarzschild_radius: f64,
    pub photon_sphere_radius: f64,
    pub critical_impact_parameter: f64,
    pub rtol: f64,
    pub atol: f64,
    pub phi_span: f64,
    pub r_infinity: f64,
    pub rays: Vec<RaySummary>,
}

impl RunManifest {
    pub fn new(
        black_hole: &BlackHole,
        config: &IntegrationConfig,
        rays: &[Ray],
        files: &[PathBuf],
    ) -> Self {
        let summaries = rays
            .iter()
            .zip(files)
            .map(|(ray, path)| RaySummary {
                file: path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                b: ray.b,
                regime: ray.regime.name().to_string(),
                samples: ray.len(),
                r_min: ray.r_min(),
                phi_end: ray.phi_end(),
                escaped: ray.escaped,
                crossed_horizon: ray.crossed_horizon,
            })
            .collect();

        Self {
            mass: black_hole.mass,
            schwarzschild_radius: black_hole.schwarzschild_radius(),
            photon_sphere_radius: black_hole.photon_sphere_radius(),
            critical_impact_parameter: black_hole.critical_impact_parameter(),
            rtol: config.rtol,
            atol: config.atol,
            phi_span: config.phi_span,
            r_infinity: config.r_infinity,
            rays: summaries,
        }
    }
}

// Pretty-printed JSON manifest next to the trajectory files
pub fn write_manifest(manifest: &RunManifest, path: &Path) -> std::io::Result<()> {
    let json = serde_json::to_string_pretty(manifest)?;
    fs::write(path, json)
}

// ============================================================================
// TESTS
// ============================================================================
