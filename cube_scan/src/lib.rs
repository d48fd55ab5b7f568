// THEORY:
// This file is the main entry point for the `cube_scan` library crate. It exposes
// `ScanPipeline` as the high-level interface: guide the user through the six faces,
// classify each face's nine stickers, and turn a complete capture into the facelet
// string a two-phase solver consumes.
//
// The building blocks live in `core_modules` and stay public so the server and the
// offline tester can reach the frame sources and data types directly.

pub mod config;
pub mod core_modules;
pub mod error;
pub mod pipeline;

pub use config::{CONFIG_ENV_VAR, ConfigError, CubeScanConfig};
pub use core_modules::color_classifier::{ColorClassifier, ColorCode};
pub use core_modules::face_grid::FaceGridSampler;
pub use core_modules::frame_source::{
    DeviceId, DeviceSwitch, Frame, FrameSource, ImageFolderSource, StillFrameSource,
};
pub use core_modules::notation::{CenterMap, NotationString, SolvedCube, Translation};
pub use core_modules::scan_session::{
    CommittedFace, FACES_ORDER, PositionLabel, RemovedFace, ScanSession, SessionState,
};
pub use core_modules::solver::{CommandSolver, Solution, SolverGateway};
pub use error::{Result, ScanError};
pub use pipeline::ScanPipeline;
