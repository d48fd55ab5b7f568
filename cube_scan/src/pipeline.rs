// THEORY:
// The `pipeline` module is the top-level API of the scanner. A `ScanPipeline` owns
// everything one user's scan needs: the capture source, the grid sampler, the scan
// session and the solver gateway. There is no process-wide state; whoever serves a
// user owns that user's pipeline and passes it around by reference.
//
// It exposes the five operations the outside world triggers:
// - `sample_for_preview`: annotated frame for the live view, nothing committed.
// - `commit_face`: capture, classify and push the next face.
// - `undo_last_face`: pop the latest face.
// - `translate_and_solve`: centers -> notation -> solver.
// - `reset`: start over.
// plus `switch_device` for the capture-device lifecycle.

use crate::config::CubeScanConfig;
use crate::core_modules::face_grid::FaceGridSampler;
use crate::core_modules::frame_source::{
    DeviceId, DeviceSwitch, Frame, FrameSource, ReadinessPolicy, switch_device,
};
use crate::core_modules::notation::{self, SolvedCube};
use crate::core_modules::overlay::{self, BANNER_COLOR};
use crate::core_modules::scan_session::{CommittedFace, RemovedFace, ScanSession};
use crate::core_modules::solver::SolverGateway;
use crate::error::{Result, ScanError};
use tracing::{debug, info, warn};

const BANNER_ORIGIN: (i32, i32) = (20, 20);
const BANNER_SCALE: u32 = 3;

/// The scanner for one user's session.
pub struct ScanPipeline<S, G> {
    source: S,
    solver: G,
    sampler: FaceGridSampler,
    session: ScanSession,
    readiness: ReadinessPolicy,
    default_device: DeviceId,
}

impl<S: FrameSource, G: SolverGateway> ScanPipeline<S, G> {
    pub fn new(source: S, solver: G, sampler: FaceGridSampler) -> Self {
        Self {
            source,
            solver,
            sampler,
            session: ScanSession::new(),
            readiness: ReadinessPolicy::default(),
            default_device: 0,
        }
    }

    pub fn from_config(source: S, solver: G, config: &CubeScanConfig) -> Self {
        Self {
            readiness: config.readiness(),
            default_device: config.camera.default_device,
            ..Self::new(source, solver, config.sampler())
        }
    }

    pub fn session(&self) -> &ScanSession {
        &self.session
    }

    pub fn sampler(&self) -> &FaceGridSampler {
        &self.sampler
    }

    pub fn active_device(&self) -> Option<DeviceId> {
        self.source.device()
    }

    /// Instruction line drawn on preview frames.
    pub fn instruction(&self) -> String {
        match self.session.next_label() {
            Some(label) => format!("SHOW FACE: {}", label.name().to_ascii_uppercase()),
            None => "SCAN COMPLETE".to_string(),
        }
    }

    fn read_frame(&mut self) -> Result<Frame> {
        self.source.read().inspect_err(|err| {
            warn!(error = %err, "frame capture failed");
        })
    }

    /// Reads a frame and annotates it for the live view. Nothing is committed.
    pub fn sample_for_preview(&mut self) -> Result<Frame> {
        let mut frame = self.read_frame()?;
        self.sampler.sample(&mut frame, false);
        let (x, y) = BANNER_ORIGIN;
        overlay::draw_text(&mut frame, &self.instruction(), x, y, BANNER_SCALE, BANNER_COLOR);
        Ok(frame)
    }

    /// Captures a frame and commits it as the next face.
    pub fn commit_face(&mut self) -> Result<CommittedFace> {
        if self.session.is_complete() {
            return Err(ScanError::SessionComplete);
        }
        let mut frame = self.read_frame()?;
        self.commit_frame(&mut frame)
    }

    /// Commits an already captured frame as the next face, annotating it in place.
    pub fn commit_frame(&mut self, frame: &mut Frame) -> Result<CommittedFace> {
        if self.session.is_complete() {
            return Err(ScanError::SessionComplete);
        }
        let codes = self.sampler.sample(frame, true);
        debug!(
            face = ?self.session.next_label(),
            codes = %codes.iter().map(|c| c.letter()).collect::<String>(),
            "face sampled"
        );
        self.session.commit_face(&codes).inspect_err(|err| {
            if let ScanError::UnknownColorDetected { cells } = err {
                warn!(?cells, "face rejected, unrecognised cells");
            }
        })
    }

    pub fn undo_last_face(&mut self) -> Result<RemovedFace> {
        self.session.undo_last_face()
    }

    pub fn translate_and_solve(&self) -> Result<SolvedCube> {
        notation::translate_and_solve(&self.session, &self.solver)
    }

    pub fn reset(&mut self) {
        self.session.reset();
    }

    /// Opens the configured default device and waits until it delivers frames.
    pub fn open_default_device(&mut self) -> Result<DeviceSwitch> {
        let device = self.default_device;
        self.source.release();
        self.source.open(device)?;
        self.readiness.wait_until_ready(&mut self.source)?;
        info!(device, "capture device ready");
        Ok(DeviceSwitch {
            requested: device,
            active: device,
            fell_back: false,
        })
    }

    pub fn switch_device(&mut self, device: DeviceId) -> Result<DeviceSwitch> {
        switch_device(&mut self.source, device, self.default_device, &self.readiness)
    }
}
