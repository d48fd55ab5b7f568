// THEORY:
// Frames come from a capture device the core does not own. `FrameSource` is the
// boundary: read one frame, open a device by id, release it. Everything behind it
// (a webcam driver, a folder of still images, frames handed over by a test) is
// interchangeable.
//
// Switching devices is a resource-lifecycle event:
// 1.  release the current handle,
// 2.  open the requested device,
// 3.  poll it with reads until it produces a frame or the readiness timeout runs out
//     (exponential backoff between attempts, never a blind fixed delay),
// 4.  if it never becomes ready, fall back to the known-good default device so the
//     scanner is never left without a capture source.

use crate::error::{Result, ScanError};
use image::RgbaImage;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub type Frame = RgbaImage;
pub type DeviceId = u32;

const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "webp"];

/// A source of captured frames.
pub trait FrameSource {
    /// Reads the next frame from the active device.
    fn read(&mut self) -> Result<Frame>;

    /// Opens `device`. The previous device must already be released.
    fn open(&mut self, device: DeviceId) -> Result<()>;

    /// Releases the active device, if any.
    fn release(&mut self);

    /// The device currently open.
    fn device(&self) -> Option<DeviceId>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn read(&mut self) -> Result<Frame> {
        (**self).read()
    }

    fn open(&mut self, device: DeviceId) -> Result<()> {
        (**self).open(device)
    }

    fn release(&mut self) {
        (**self).release()
    }

    fn device(&self) -> Option<DeviceId> {
        (**self).device()
    }
}

/// Bounded readiness poll used after opening a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessPolicy {
    pub timeout: Duration,
    pub poll_interval: Duration,
    pub max_poll_interval: Duration,
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(3),
            poll_interval: Duration::from_millis(50),
            max_poll_interval: Duration::from_millis(400),
        }
    }
}

impl ReadinessPolicy {
    /// Reads until the source yields a frame or the timeout elapses. At least one
    /// read is always attempted.
    pub fn wait_until_ready<S: FrameSource + ?Sized>(&self, source: &mut S) -> Result<Frame> {
        let deadline = Instant::now() + self.timeout;
        let mut interval = self.poll_interval;
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match source.read() {
                Ok(frame) => {
                    debug!(attempts, "capture device ready");
                    return Ok(frame);
                }
                Err(err) => {
                    if Instant::now() + interval > deadline {
                        return Err(ScanError::CaptureFailure(format!(
                            "device not ready after {attempts} attempt(s): {err}"
                        )));
                    }
                    std::thread::sleep(interval);
                    interval = (interval * 2).min(self.max_poll_interval);
                }
            }
        }
    }
}

/// Outcome of a device switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct DeviceSwitch {
    pub requested: DeviceId,
    pub active: DeviceId,
    pub fell_back: bool,
}

fn open_and_wait<S: FrameSource + ?Sized>(
    source: &mut S,
    device: DeviceId,
    policy: &ReadinessPolicy,
) -> Result<()> {
    source.open(device)?;
    policy.wait_until_ready(source).map(|_| ())
}

/// Switches `source` to `requested`, falling back to `fallback` when the requested
/// device cannot be opened or never becomes ready.
pub fn switch_device<S: FrameSource + ?Sized>(
    source: &mut S,
    requested: DeviceId,
    fallback: DeviceId,
    policy: &ReadinessPolicy,
) -> Result<DeviceSwitch> {
    source.release();
    match open_and_wait(source, requested, policy) {
        Ok(()) => {
            info!(device = requested, "capture device switched");
            Ok(DeviceSwitch {
                requested,
                active: requested,
                fell_back: false,
            })
        }
        Err(err) if requested != fallback => {
            warn!(device = requested, fallback, error = %err, "capture device unavailable, falling back");
            source.release();
            if let Err(fallback_err) = open_and_wait(source, fallback, policy) {
                source.release();
                return Err(fallback_err);
            }
            Ok(DeviceSwitch {
                requested,
                active: fallback,
                fell_back: true,
            })
        }
        Err(err) => {
            source.release();
            Err(err)
        }
    }
}

/// Frames handed over up front, yielded once each in order.
#[derive(Debug, Default)]
pub struct StillFrameSource {
    frames: VecDeque<Frame>,
    open: bool,
}

impl StillFrameSource {
    pub fn new(frames: impl IntoIterator<Item = Frame>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
            open: true,
        }
    }
}

impl FrameSource for StillFrameSource {
    fn read(&mut self) -> Result<Frame> {
        if !self.open {
            return Err(ScanError::CaptureFailure("no device open".to_string()));
        }
        self.frames
            .pop_front()
            .ok_or_else(|| ScanError::CaptureFailure("no frames left".to_string()))
    }

    fn open(&mut self, device: DeviceId) -> Result<()> {
        if device != 0 {
            return Err(ScanError::CaptureFailure(format!("no device {device}")));
        }
        self.open = true;
        Ok(())
    }

    fn release(&mut self) {
        self.open = false;
    }

    fn device(&self) -> Option<DeviceId> {
        self.open.then_some(0)
    }
}

/// Treats each folder as a capture device that cycles through the images in it.
#[derive(Debug)]
pub struct ImageFolderSource {
    folders: Vec<PathBuf>,
    active: Option<DeviceId>,
    images: Vec<PathBuf>,
    cursor: usize,
}

impl ImageFolderSource {
    pub fn new(folders: Vec<PathBuf>) -> Self {
        Self {
            folders,
            active: None,
            images: Vec::new(),
            cursor: 0,
        }
    }

    fn list_images(folder: &Path) -> Result<Vec<PathBuf>> {
        let entries = std::fs::read_dir(folder)
            .map_err(|e| ScanError::CaptureFailure(format!("{}: {e}", folder.display())))?;
        let mut images: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            })
            .collect();
        images.sort();
        Ok(images)
    }
}

impl FrameSource for ImageFolderSource {
    fn read(&mut self) -> Result<Frame> {
        if self.active.is_none() {
            return Err(ScanError::CaptureFailure("no device open".to_string()));
        }
        if self.images.is_empty() {
            return Err(ScanError::CaptureFailure("device has no images".to_string()));
        }
        let path = &self.images[self.cursor % self.images.len()];
        self.cursor = (self.cursor + 1) % self.images.len();
        image::open(path)
            .map(|image| image.to_rgba8())
            .map_err(|e| ScanError::CaptureFailure(format!("{}: {e}", path.display())))
    }

    fn open(&mut self, device: DeviceId) -> Result<()> {
        let folder = self
            .folders
            .get(device as usize)
            .ok_or_else(|| ScanError::CaptureFailure(format!("no device {device}")))?;
        self.images = Self::list_images(folder)?;
        self.cursor = 0;
        self.active = Some(device);
        debug!(device, images = self.images.len(), folder = %folder.display(), "image folder opened");
        Ok(())
    }

    fn release(&mut self) {
        self.active = None;
        self.images.clear();
    }

    fn device(&self) -> Option<DeviceId> {
        self.active
    }
}
