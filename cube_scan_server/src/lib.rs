// THEORY:
// The server is a thin HTTP skin over one `ScanPipeline`. It owns nothing the core
// does not already model: the pipeline sits behind an async mutex, every operation
// takes the lock, runs the blocking capture/classify/solve work on the blocking pool
// while holding an owned guard, and turns the typed result into a JSON reply.
//
// Live preview runs beside the request handlers. A ticker task samples annotated
// frames, JPEG-encodes them and publishes them on a broadcast `FrameBus`. Each
// `/video_feed` client subscribes to the bus and receives a multipart MJPEG stream.
// Slow clients skip frames; they never block the capture loop or each other.

#[cfg(feature = "camera")]
pub mod camera;

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse},
    routing::{get, post},
};
use bytes::{Bytes, BytesMut};
use cube_scan::{
    CenterMap, ColorCode, CubeScanConfig, DeviceId, DeviceSwitch, Frame, FrameSource,
    PositionLabel, ScanError, ScanPipeline, SolverGateway,
};
use futures_util::Stream;
use image::codecs::jpeg::JpegEncoder;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, broadcast};
use tokio::task::{JoinError, JoinHandle};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

const JPEG_QUALITY: u8 = 80;
const MJPEG_BOUNDARY: &str = "frame";

/// One encoded preview frame.
#[derive(Debug, Clone)]
pub struct FramePacket {
    pub width: u32,
    pub height: u32,
    pub data: Bytes,
}

/// Fan-out of preview frames to every connected stream.
#[derive(Clone)]
pub struct FrameBus {
    pub frames_tx: broadcast::Sender<FramePacket>,
}

impl FrameBus {
    pub fn new(capacity: usize) -> Self {
        let (frames_tx, _) = broadcast::channel::<FramePacket>(capacity.max(1));
        Self { frames_tx }
    }
}

/// Solver gateways the server can hand to the blocking pool.
pub trait Gateway: SolverGateway + Send + 'static {}

impl<G: SolverGateway + Send + 'static> Gateway for G {}

pub type BoxedSource = Box<dyn FrameSource + Send>;
pub type Pipeline<G> = ScanPipeline<BoxedSource, G>;

pub struct AppState<G> {
    pub pipeline: Arc<Mutex<Pipeline<G>>>,
    pub bus: FrameBus,
}

impl<G> Clone for AppState<G> {
    fn clone(&self) -> Self {
        Self {
            pipeline: Arc::clone(&self.pipeline),
            bus: self.bus.clone(),
        }
    }
}

impl<G: Gateway> AppState<G> {
    pub fn new(pipeline: Pipeline<G>, bus: FrameBus) -> Self {
        Self {
            pipeline: Arc::new(Mutex::new(pipeline)),
            bus,
        }
    }

    /// Runs `op` on the blocking pool with exclusive access to the pipeline.
    pub async fn with_pipeline<T, F>(&self, op: F) -> Result<T, JoinError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Pipeline<G>) -> T + Send + 'static,
    {
        let mut guard = Arc::clone(&self.pipeline).lock_owned().await;
        tokio::task::spawn_blocking(move || op(&mut guard)).await
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyStatus {
    #[default]
    Ok,
    Complete,
    Error,
    Solved,
    Reset,
}

/// JSON body of every control endpoint.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ApiReply {
    pub status: ReplyStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub face: Option<PositionLabel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colors: Option<Vec<ColorCode>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moves: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub center_map: Option<CenterMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<DeviceSwitch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cells: Option<Vec<usize>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

impl ApiReply {
    fn with_status(status: ReplyStatus) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    fn from_error(err: &ScanError) -> Self {
        let status = match err {
            ScanError::SessionComplete => ReplyStatus::Complete,
            _ => ReplyStatus::Error,
        };
        let cells = match err {
            ScanError::UnknownColorDetected { cells } => Some(cells.clone()),
            _ => None,
        };
        Self {
            status,
            cells,
            kind: Some(err.kind()),
            msg: Some(err.to_string()),
            ..Self::default()
        }
    }
}

type Reply = (StatusCode, Json<ApiReply>);

/// Domain failures are normal replies; only a crashed worker is a server error.
fn respond<T>(
    outcome: Result<cube_scan::Result<T>, JoinError>,
    on_success: impl FnOnce(T) -> ApiReply,
) -> Reply {
    match outcome {
        Ok(Ok(value)) => (StatusCode::OK, Json(on_success(value))),
        Ok(Err(err)) => {
            debug!(kind = err.kind(), error = %err, "operation refused");
            (StatusCode::OK, Json(ApiReply::from_error(&err)))
        }
        Err(join) => {
            error!(error = %join, "pipeline worker failed");
            let reply = ApiReply {
                kind: Some("internal"),
                msg: Some("internal error".to_string()),
                ..ApiReply::with_status(ReplyStatus::Error)
            };
            (StatusCode::INTERNAL_SERVER_ERROR, Json(reply))
        }
    }
}

async fn scan_face<G: Gateway>(State(state): State<AppState<G>>) -> Reply {
    let outcome = state.with_pipeline(|p| p.commit_face()).await;
    respond(outcome, |committed| ApiReply {
        face: Some(committed.label),
        colors: Some(committed.face.colors().to_vec()),
        next_index: Some(committed.next_index),
        ..ApiReply::with_status(ReplyStatus::Ok)
    })
}

async fn undo<G: Gateway>(State(state): State<AppState<G>>) -> Reply {
    let outcome = state.with_pipeline(|p| p.undo_last_face()).await;
    respond(outcome, |removed| ApiReply {
        face: Some(removed.label),
        next_index: Some(removed.next_index),
        ..ApiReply::with_status(ReplyStatus::Ok)
    })
}

async fn solve<G: Gateway>(State(state): State<AppState<G>>) -> Reply {
    let outcome = state.with_pipeline(|p| p.translate_and_solve()).await;
    respond(outcome, |solved| ApiReply {
        solution: Some(solved.solution.to_string()),
        moves: Some(solved.solution.moves),
        center_map: Some(solved.translation.center_map),
        ..ApiReply::with_status(ReplyStatus::Solved)
    })
}

async fn reset<G: Gateway>(State(state): State<AppState<G>>) -> Reply {
    let outcome = state
        .with_pipeline(|p| {
            p.reset();
            Ok::<(), ScanError>(())
        })
        .await;
    respond(outcome, |()| ApiReply {
        next_index: Some(0),
        ..ApiReply::with_status(ReplyStatus::Reset)
    })
}

async fn switch_camera<G: Gateway>(
    State(state): State<AppState<G>>,
    Path(device): Path<DeviceId>,
) -> Reply {
    let outcome = state.with_pipeline(move |p| p.switch_device(device)).await;
    respond(outcome, |switch| ApiReply {
        device: Some(switch),
        ..ApiReply::with_status(ReplyStatus::Ok)
    })
}

/// Multipart body parts for the frames published on `rx`.
pub fn mjpeg_parts(
    mut rx: broadcast::Receiver<FramePacket>,
) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send + 'static {
    async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(packet) => {
                    let mut part = BytesMut::with_capacity(packet.data.len() + 64);
                    part.extend_from_slice(format!("--{MJPEG_BOUNDARY}\r\n").as_bytes());
                    part.extend_from_slice(b"Content-Type: image/jpeg\r\n\r\n");
                    part.extend_from_slice(&packet.data);
                    part.extend_from_slice(b"\r\n");
                    yield Ok(part.freeze());
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "stream client lagging");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }
}

async fn video_feed<G: Gateway>(State(state): State<AppState<G>>) -> impl IntoResponse {
    let parts = mjpeg_parts(state.bus.frames_tx.subscribe());
    (
        [(
            header::CONTENT_TYPE,
            format!("multipart/x-mixed-replace; boundary={MJPEG_BOUNDARY}"),
        )],
        Body::from_stream(parts),
    )
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub fn router<G: Gateway>(state: AppState<G>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/healthz", get(|| async { "ok" }))
        .route("/video_feed", get(video_feed::<G>))
        .route("/scan_face", post(scan_face::<G>))
        .route("/undo", post(undo::<G>))
        .route("/solve", post(solve::<G>))
        .route("/reset", post(reset::<G>))
        .route("/camera/:id", post(switch_camera::<G>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Encodes an annotated frame for the stream.
pub fn encode_jpeg(frame: Frame) -> Result<FramePacket, image::ImageError> {
    let (width, height) = frame.dimensions();
    let rgb = image::DynamicImage::ImageRgba8(frame).into_rgb8();
    let mut data = Vec::new();
    JpegEncoder::new_with_quality(&mut data, JPEG_QUALITY).encode_image(&rgb)?;
    Ok(FramePacket {
        width,
        height,
        data: Bytes::from(data),
    })
}

async fn capture_preview<G: Gateway>(state: &AppState<G>) -> anyhow::Result<FramePacket> {
    let frame = state.with_pipeline(|p| p.sample_for_preview()).await??;
    let packet = tokio::task::spawn_blocking(move || encode_jpeg(frame)).await??;
    Ok(packet)
}

/// Publishes annotated preview frames while anyone is watching.
pub fn spawn_preview_loop<G: Gateway>(state: AppState<G>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            if state.bus.frames_tx.receiver_count() == 0 {
                continue;
            }
            match capture_preview(&state).await {
                Ok(packet) => {
                    let _ = state.bus.frames_tx.send(packet);
                }
                Err(err) => debug!(error = %err, "preview frame skipped"),
            }
        }
    })
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub preview_interval: Duration,
}

impl From<&CubeScanConfig> for ServerConfig {
    fn from(config: &CubeScanConfig) -> Self {
        Self {
            bind_addr: config.server.bind_addr.clone(),
            preview_interval: Duration::from_millis(config.camera.preview_interval_ms.max(1)),
        }
    }
}

/// Binds the listener, starts the preview loop and serves until the task is dropped.
pub async fn start_server<G: Gateway>(
    state: AppState<G>,
    cfg: ServerConfig,
) -> anyhow::Result<JoinHandle<()>> {
    use anyhow::Context;

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr)
        .await
        .with_context(|| format!("binding {}", cfg.bind_addr))?;
    let local_addr = listener.local_addr()?;

    let preview = spawn_preview_loop(state.clone(), cfg.preview_interval);
    let app = router(state);
    let server = tokio::spawn(async move {
        info!("cube scan server listening on http://{local_addr}");
        if let Err(err) = axum::serve(listener, app).await {
            error!(error = %err, "server stopped");
        }
        preview.abort();
    });
    Ok(server)
}

const INDEX_HTML: &str = r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>Cube Scan</title></head>
<body style="font-family:sans-serif; background:#222; color:#eee">
  <h2>Cube Scan</h2>
  <img src="/video_feed" width="640" height="480" style="border:1px solid #555">
  <div style="margin:8px 0; display:flex; gap:8px; align-items:center">
    <button onclick="call('/scan_face')">Scan face</button>
    <button onclick="call('/undo')">Undo</button>
    <button onclick="call('/solve')">Solve</button>
    <button onclick="call('/reset')">Reset</button>
    <input id="device" type="number" min="0" value="0" style="width:4em">
    <button onclick="call('/camera/' + document.getElementById('device').value)">Switch camera</button>
  </div>
  <pre id="out" style="font-family:monospace"></pre>
  <script>
    async function call(path) {
      const res = await fetch(path, { method: 'POST' });
      const body = await res.json();
      document.getElementById('out').textContent = JSON.stringify(body, null, 2);
    }
  </script>
</body>
</html>
"#;
