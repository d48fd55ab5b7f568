// Offline harness for the scanner: feeds six still photos through the same
// pipeline the server uses, writes the annotated frames next to each other for
// inspection and prints the facelet string (and, optionally, the solution).

use anyhow::{Context, Result, bail};
use clap::Parser;
use cube_scan::core_modules::notation;
use cube_scan::{CubeScanConfig, FACES_ORDER, ScanError, ScanPipeline, StillFrameSource};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "scan_tester", about = "Scan six face photos and print the cube notation")]
struct Args {
    /// Face photos in scan order: Up, Right, Front, Down, Left, Back
    #[arg(num_args = 6, required = true)]
    faces: Vec<PathBuf>,

    /// Directory for the annotated frames
    #[arg(short, long, default_value = "scan_output")]
    out: PathBuf,

    /// Config file (TOML)
    #[arg(short, long, env = "CUBE_SCAN_CONFIG")]
    config: Option<PathBuf>,

    /// Run the configured solver on the result
    #[arg(long)]
    solve: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cube_scan=info,scan_tester=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = CubeScanConfig::resolve(args.config.as_deref()).context("loading config")?;
    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("creating {}", args.out.display()))?;

    let mut pipeline =
        ScanPipeline::from_config(StillFrameSource::default(), config.solver(), &config);

    for (index, (path, label)) in args.faces.iter().zip(FACES_ORDER).enumerate() {
        let mut frame = image::open(path)
            .with_context(|| format!("reading {}", path.display()))?
            .to_rgba8();

        let outcome = pipeline.commit_frame(&mut frame);

        let annotated = args.out.join(format!("{}_{}.png", index + 1, label.name().to_lowercase()));
        frame
            .save(&annotated)
            .with_context(|| format!("writing {}", annotated.display()))?;

        match outcome {
            Ok(committed) => {
                let letters: String = committed.face.colors().iter().map(|c| c.letter()).collect();
                println!("{:<6} {}  ({})", label.name(), letters, path.display());
            }
            Err(err @ ScanError::UnknownColorDetected { .. }) => {
                warn!(face = %label, annotated = %annotated.display(), "face rejected");
                bail!("{label} face: {err}");
            }
            Err(err) => return Err(err.into()),
        }
    }

    let translation = notation::translate(pipeline.session())?;
    println!();
    println!("notation: {}", translation.notation);
    let centers: Vec<String> = translation
        .center_map
        .iter()
        .map(|(color, face)| format!("{}={}", color.letter(), face.letter()))
        .collect();
    println!("centers:  {}", centers.join(" "));

    if args.solve {
        let solved = pipeline.translate_and_solve()?;
        if solved.solution.is_empty() {
            println!("solution: already solved");
        } else {
            println!("solution: {} ({} moves)", solved.solution, solved.solution.len());
        }
    }

    info!(out = %args.out.display(), "annotated frames written");
    Ok(())
}
