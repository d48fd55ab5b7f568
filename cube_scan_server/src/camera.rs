//! Webcam capture through OpenCV.

use cube_scan::{DeviceId, Frame, FrameSource, Result, ScanError};
use image::RgbaImage;
use opencv::{
    core::Mat,
    imgproc,
    prelude::*,
    videoio::{self, VideoCapture},
};
use tracing::debug;

fn cv_error(err: opencv::Error) -> ScanError {
    ScanError::CaptureFailure(err.to_string())
}

/// A `VideoCapture` device addressed by its index.
#[derive(Default)]
pub struct OpenCvCamera {
    capture: Option<VideoCapture>,
    device: Option<DeviceId>,
}

impl OpenCvCamera {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameSource for OpenCvCamera {
    fn read(&mut self) -> Result<Frame> {
        let capture = self
            .capture
            .as_mut()
            .ok_or_else(|| ScanError::CaptureFailure("no device open".to_string()))?;

        let mut bgr = Mat::default();
        if !capture.read(&mut bgr).map_err(cv_error)? || bgr.empty() {
            return Err(ScanError::CaptureFailure("camera returned no frame".to_string()));
        }

        // OpenCV hands out BGR; the scanner works on RGBA.
        let mut rgba = Mat::default();
        imgproc::cvt_color(&bgr, &mut rgba, imgproc::COLOR_BGR2RGBA, 0).map_err(cv_error)?;
        let bytes = rgba.data_bytes().map_err(cv_error)?.to_vec();
        RgbaImage::from_raw(rgba.cols() as u32, rgba.rows() as u32, bytes)
            .ok_or_else(|| ScanError::CaptureFailure("frame buffer size mismatch".to_string()))
    }

    fn open(&mut self, device: DeviceId) -> Result<()> {
        let capture = VideoCapture::new(device as i32, videoio::CAP_ANY).map_err(cv_error)?;
        if !capture.is_opened().map_err(cv_error)? {
            return Err(ScanError::CaptureFailure(format!("cannot open camera {device}")));
        }
        debug!(device, "camera opened");
        self.capture = Some(capture);
        self.device = Some(device);
        Ok(())
    }

    fn release(&mut self) {
        if let Some(mut capture) = self.capture.take() {
            if let Err(err) = capture.release() {
                debug!(error = %err, "camera release failed");
            }
        }
        self.device = None;
    }

    fn device(&self) -> Option<DeviceId> {
        self.device
    }
}
