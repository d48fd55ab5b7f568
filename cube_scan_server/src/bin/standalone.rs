use anyhow::{Context, Result};
use clap::Parser;
use cube_scan::{CubeScanConfig, ImageFolderSource, ScanPipeline};
use cube_scan_server::{AppState, BoxedSource, FrameBus, ServerConfig, start_server};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Serves the cube scanner over HTTP with a live MJPEG preview.
#[derive(Parser, Debug)]
#[command(name = "cube_scan_server")]
struct Args {
    /// Config file (TOML)
    #[arg(short, long, env = "CUBE_SCAN_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address, overrides `server.bind_addr`
    #[arg(short, long, env = "CUBE_SCAN_BIND")]
    bind: Option<String>,

    /// Serve a folder of images as a capture device (repeatable, device ids in order)
    #[arg(long = "image-folder")]
    image_folders: Vec<PathBuf>,
}

fn frame_source(config: &CubeScanConfig) -> Result<BoxedSource> {
    if !config.camera.image_folders.is_empty() {
        return Ok(Box::new(ImageFolderSource::new(config.camera.image_folders.clone())));
    }
    #[cfg(feature = "camera")]
    {
        Ok(Box::new(cube_scan_server::camera::OpenCvCamera::new()))
    }
    #[cfg(not(feature = "camera"))]
    {
        anyhow::bail!("no capture source: pass --image-folder or build with --features camera")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cube_scan=info,cube_scan_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = CubeScanConfig::resolve(args.config.as_deref()).context("loading config")?;
    if let Some(bind) = args.bind {
        config.server.bind_addr = bind;
    }
    if !args.image_folders.is_empty() {
        config.camera.image_folders = args.image_folders;
    }

    let source = frame_source(&config)?;
    let mut pipeline = ScanPipeline::from_config(source, config.solver(), &config);
    match pipeline.open_default_device() {
        Ok(_) => info!(device = config.camera.default_device, "capture device opened"),
        Err(err) => warn!(error = %err, "default capture device not ready; preview stays empty until a switch succeeds"),
    }

    let state = AppState::new(pipeline, FrameBus::new(2));
    let handle = start_server(state, ServerConfig::from(&config)).await?;

    tokio::select! {
        _ = handle => {}
        _ = tokio::signal::ctrl_c() => info!("shutting down"),
    }
    Ok(())
}
