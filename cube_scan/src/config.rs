//! Scanner configuration.
//!
//! Every section has defaults, so an empty file (or no file at all) gives a working
//! scanner. Binaries resolve the file path from a command-line flag first, then the
//! `CUBE_SCAN_CONFIG` environment variable, and fall back to the defaults.

use crate::core_modules::color_classifier::ColorClassifier;
use crate::core_modules::face_grid::FaceGridSampler;
use crate::core_modules::frame_source::{DeviceId, ReadinessPolicy};
use crate::core_modules::solver::CommandSolver;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "CUBE_SCAN_CONFIG";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Edge length of one grid cell in pixels.
    pub cell_size: u32,
    /// Margin trimmed from each cell edge before sampling.
    pub inset: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            cell_size: 60,
            inset: 10,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Route low-saturation samples darker than this HSV value (0..255) to
    /// `Unknown` instead of `White`. Disabled when absent.
    pub low_light_value_floor: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Device opened at startup and used as the fallback after a failed switch.
    pub default_device: DeviceId,
    pub ready_timeout_ms: u64,
    pub ready_poll_ms: u64,
    /// Delay between preview frames on the stream.
    pub preview_interval_ms: u64,
    /// Folders served as devices when no real camera is compiled in.
    pub image_folders: Vec<PathBuf>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            default_device: 0,
            ready_timeout_ms: 3000,
            ready_poll_ms: 50,
            preview_interval_ms: 66,
            image_folders: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub command: String,
    pub args: Vec<String>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        let solver = CommandSolver::default();
        Self {
            command: solver.command,
            args: solver.args,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:5000".to_string(),
        }
    }
}

/// Full scanner configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CubeScanConfig {
    pub grid: GridConfig,
    pub classifier: ClassifierConfig,
    pub camera: CameraConfig,
    pub solver: SolverConfig,
    pub server: ServerConfig,
}

impl CubeScanConfig {
    pub fn from_toml_str(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text, path)
    }

    /// Loads from `cli_path`, else from `$CUBE_SCAN_CONFIG`, else returns defaults.
    pub fn resolve(cli_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = cli_path {
            return Self::load(path);
        }
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) if !path.is_empty() => Self::load(Path::new(&path)),
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid.cell_size == 0 {
            return Err(ConfigError::Invalid("grid.cell_size must be positive".into()));
        }
        if self.grid.inset * 2 >= self.grid.cell_size {
            return Err(ConfigError::Invalid(format!(
                "grid.inset {} leaves nothing to sample in a {} px cell",
                self.grid.inset, self.grid.cell_size
            )));
        }
        if self.solver.command.trim().is_empty() {
            return Err(ConfigError::Invalid("solver.command is empty".into()));
        }
        Ok(())
    }

    pub fn sampler(&self) -> FaceGridSampler {
        FaceGridSampler::new(
            self.grid.cell_size,
            self.grid.inset,
            ColorClassifier::new(self.classifier.low_light_value_floor),
        )
    }

    pub fn readiness(&self) -> ReadinessPolicy {
        let poll = Duration::from_millis(self.camera.ready_poll_ms.max(1));
        ReadinessPolicy {
            timeout: Duration::from_millis(self.camera.ready_timeout_ms),
            poll_interval: poll,
            max_poll_interval: poll * 8,
        }
    }

    pub fn solver(&self) -> CommandSolver {
        CommandSolver::new(self.solver.command.clone(), self.solver.args.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = CubeScanConfig::from_toml_str("", Path::new("empty.toml")).unwrap();
        assert_eq!(config, CubeScanConfig::default());
        assert_eq!(config.grid.cell_size, 60);
        assert_eq!(config.grid.inset, 10);
        assert_eq!(config.camera.default_device, 0);
        assert_eq!(config.solver.command, "kociemba");
        assert_eq!(config.server.bind_addr, "127.0.0.1:5000");
        assert_eq!(config.classifier.low_light_value_floor, None);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let text = r#"
            [grid]
            cell_size = 80

            [classifier]
            low_light_value_floor = 90.0

            [solver]
            command = "python3"
            args = ["-m", "kociemba"]
        "#;
        let config = CubeScanConfig::from_toml_str(text, Path::new("partial.toml")).unwrap();
        assert_eq!(config.grid.cell_size, 80);
        assert_eq!(config.grid.inset, 10);
        assert_eq!(config.sampler().classifier.low_light_value_floor, Some(90.0));
        assert_eq!(config.solver().args, vec!["-m", "kociemba"]);
        assert_eq!(config.camera, CameraConfig::default());
    }

    #[test]
    fn oversized_inset_is_rejected() {
        let text = "[grid]\ncell_size = 20\ninset = 10\n";
        assert!(matches!(
            CubeScanConfig::from_toml_str(text, Path::new("bad.toml")),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn syntax_errors_name_the_file() {
        let err = CubeScanConfig::from_toml_str("[grid", Path::new("broken.toml")).unwrap_err();
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn load_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cube_scan.toml");
        std::fs::write(&path, "[camera]\ndefault_device = 2\nready_timeout_ms = 500\n").unwrap();
        let config = CubeScanConfig::resolve(Some(&path)).unwrap();
        assert_eq!(config.camera.default_device, 2);
        assert_eq!(config.readiness().timeout, Duration::from_millis(500));
        assert!(matches!(
            CubeScanConfig::load(&dir.path().join("missing.toml")),
            Err(ConfigError::Read { .. })
        ));
    }
}
