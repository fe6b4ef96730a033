// Lensing Renderer CLI
//
// Traces one photon per pixel backward from the observer and paints the
// lensed view of a background sky: the shadow where photons are captured,
// the (heavily distorted) sky where they escape, and sentinel magenta for
// any pixel whose trace fails.

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Instant;

use schwarzschild_lensing::*;

/// CLI arguments for the lensing renderer
#[derive(Parser, Debug)]
#[command(name = "render")]
#[command(about = "Render a gravitationally lensed background sky", long_about = None)]
struct Args {
    /// Image width in pixels
    #[arg(short, long, default_value_t = 400)]
    width: u32,

    /// Image height in pixels
    #[arg(short = 'H', long, default_value_t = 400)]
    height: u32,

    /// Full field of view in degrees
    #[arg(short, long, default_value_t = 90.0)]
    fov: f64,

    /// Observer distance from the hole, in units of M
    #[arg(short, long, default_value_t = 50.0)]
    distance: f64,

    /// Black hole mass in geometric units (G = c = 1)
    #[arg(short, long, default_value_t = 1.0)]
    mass: f64,

    /// Equirectangular sky texture; the synthetic backdrop is used when
    /// omitted
    #[arg(short, long)]
    sky: Option<PathBuf>,

    /// Output PNG path
    #[arg(short, long, default_value = "lensing.png")]
    output: PathBuf,

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
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let black_hole = BlackHole::new(args.mass);
    let camera = Camera::new(args.distance, args.fov);
    let render = RenderConfig::new(args.width, args.height);
    let integration = IntegrationConfig::new(args.rtol, args.atol, args.phi_span, args.r_infinity);

    let sky: Box<dyn Sky> = match &args.sky {
        Some(path) => Box::new(EquirectangularSky::open(path)?),
        None => Box::new(SyntheticSky),
    };

    println!("\nSchwarzschild Lensing Renderer");
    println!("=======================================");
    println!("  Mass: {} (geometric units)", black_hole.mass);
    println!("  Observer: {}M, FOV {} degrees", camera.distance, camera.fov);
    println!("  Resolution: {}x{}", render.width, render.height);
    println!(
        "  Sky: {}",
        args.sky
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "synthetic backdrop".to_string())
    );
    println!("=======================================\n");

    let pb = ProgressBar::new(render.pixel_count() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} pixels ({percent}%)")?
            .progress_chars("█▓▒░ "),
    );

    println!("Tracing pixel rays...");
    let start = Instant::now();
    let image = render_image(&black_hole, &camera, &render, &integration, sky.as_ref(), |done| {
        pb.set_position(done)
    });
    pb.finish();

    let rgb = to_rgb_image(&image);
    rgb.save(&args.output)?;

    let stats = image.stats;
    println!("\nRender complete in {:.1}s", start.elapsed().as_secs_f64());
    println!("  Shadow pixels: {}", stats.shadow_pixels);
    println!("  Sky pixels:    {}", stats.sky_pixels);
    println!("  Error pixels:  {}", stats.error_pixels);
    println!("  ✓ Wrote {}", args.output.display());

    Ok(())
}
