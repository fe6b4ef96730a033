// Photon Bundle Tracer CLI
//
// Traces a set of impact parameters, writes one trajectory CSV per ray for
// the external scene builder, and drops a manifest.json with the physics
// constants and per-ray summaries next to them.

use clap::Parser;
use std::fs;
use std::path::PathBuf;

use schwarzschild_lensing::*;

/// CLI arguments for the bundle tracer
#[derive(Parser, Debug)]
#[command(name = "trace")]
#[command(about = "Trace photon trajectories around a Schwarzschild black hole", long_about = None)]
struct Args {
    /// Comma-separated impact parameters in units of M (defaults to the
    /// three-regime demo bundle at 1.2, 1.0, 0.8 times b_crit)
    #[arg(short = 'b', long)]
    impact_parameters: Option<String>,

    /// Black hole mass in geometric units (G = c = 1)
    #[arg(short, long, default_value_t = 1.0)]
    mass: f64,

    /// Relative tolerance of the adaptive stepper
    #[arg(long, default_value_t = 1e-9)]
    rtol: f64,

    /// Absolute tolerance of the adaptive stepper
    #[arg(long, default_value_t = 1e-12)]
    atol: f64,

    /// Half-width of the azimuthal integration span, in radians
    #[arg(long, default_value_t = 20.0)]
    phi_span: f64,

    /// Radius treated as infinity for the escape event, in units of M
    #[arg(long, default_value_t = 500.0)]
    r_infinity: f64,

    /// Output directory for the trajectory CSVs and manifest
    #[arg(short, long, default_value = "data/trajectories")]
    output: PathBuf,

    /// Gzip-compress the CSV files (creates .csv.gz)
    #[arg(long, default_value_t = false)]
    gzip: bool,
}

/// Parse a comma-separated impact parameter list
fn parse_impact_parameters(list: &str) -> Result<Vec<f64>, String> {
    list.split(',')
        .map(|field| {
            field
                .trim()
                .parse::<f64>()
                .map_err(|_| format!("Invalid impact parameter: '{}'", field.trim()))
        })
        .collect()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let black_hole = BlackHole::new(args.mass);
    let config = IntegrationConfig::new(args.rtol, args.atol, args.phi_span, args.r_infinity);

    let b_list = match &args.impact_parameters {
        Some(list) => parse_impact_parameters(list)?,
        None => demo_impact_parameters(&black_hole),
    };

    println!("\nSchwarzschild Photon Bundle Tracer");
    println!("=======================================");
    println!("  Mass: {} (geometric units)", black_hole.mass);
    println!("  Horizon: Rs = {}", black_hole.schwarzschild_radius());
    println!(
        "  Critical impact parameter: b_crit = {:.6}",
        black_hole.critical_impact_parameter()
    );
    println!("  Tolerances: rtol = {:e}, atol = {:e}", config.rtol, config.atol);
    println!(
        "  Span: phi in [-{0}, {0}], escape at r = {1}",
        config.phi_span, config.r_infinity
    );
    println!("  Rays: {}", b_list.len());
    println!("=======================================\n");

    println!("Tracing photons...");
    let rays = trace_bundle(&b_list, &black_hole, &config)?;
    for ray in &rays {
        println!(
            "  b = {:8.4}  {:9}  {:5} samples  r_min = {:8.4}  phi_end = {:8.4}",
            ray.b,
            ray.regime.name(),
            ray.len(),
            ray.r_min(),
            ray.phi_end()
        );
    }

    println!("\nWriting trajectories...");
    let files = export_rays_to_csv(&rays, &args.output, args.gzip)?;
    for (path, ray) in files.iter().zip(&rays) {
        let bytes = fs::metadata(path)?.len();
        println!(
            "  ✓ Wrote {} ({} rows, {:.1} KB)",
            path.display(),
            ray.len(),
            bytes as f64 / 1_000.0
        );
    }

    let manifest = RunManifest::new(&black_hole, &config, &rays, &files);
    let manifest_path = args.output.join("manifest.json");
    write_manifest(&manifest, &manifest_path)?;
    println!("  ✓ Wrote {}", manifest_path.display());

    Ok(())
}
