use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use anyhow::{Result, anyhow};
use crossbeam_channel::Sender;
use nokhwa::{
    Camera,
    pixel_format::RgbFormat,
    query,
    utils::{
        ApiBackend, CameraFormat, CameraIndex, CameraInfo, FrameFormat, RequestedFormat,
        RequestedFormatType, Resolution,
    },
};

use super::rgba_converter;
use crate::types::Frame;

// Limit the number of frames handed to the detection worker to reduce load.
const DETECTOR_TARGET_FPS: u64 = 10;
const DETECTOR_FRAME_INTERVAL: Duration = Duration::from_millis(1_000 / DETECTOR_TARGET_FPS);

// Prefer pixel formats that are widely supported on macOS (the built-in cameras
// often reject YUYV even though Nokhwa reports it).
const PREFERRED_PIXEL_FORMATS: &[FrameFormat] = &[
    FrameFormat::RAWRGB,
    FrameFormat::RAWBGR,
    FrameFormat::GRAY,
    FrameFormat::YUYV,
    FrameFormat::NV12,
    FrameFormat::MJPEG,
];

fn requested_formats(width: u32, height: u32) -> [RequestedFormat<'static>; 3] {
    let target = CameraFormat::new(Resolution::new(width, height), FrameFormat::MJPEG, 30);
    [
        RequestedFormat::with_formats(RequestedFormatType::Closest(target), PREFERRED_PIXEL_FORMATS),
        RequestedFormat::with_formats(
            RequestedFormatType::AbsoluteHighestFrameRate,
            PREFERRED_PIXEL_FORMATS,
        ),
        // Fall back to any format Nokhwa can decode.
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::None),
    ]
}

#[derive(Clone, Debug)]
pub struct CameraDevice {
    pub index: CameraIndex,
    pub label: String,
}

#[derive(Debug)]
pub struct CameraStream {
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl CameraStream {
    /// Stop capturing and release the device. The capture thread checks the
    /// flag each iteration and exits cooperatively.
    pub fn stop(mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for CameraStream {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

pub fn available_cameras() -> Result<Vec<CameraDevice>> {
    let cameras = query(ApiBackend::Auto)?;
    Ok(cameras
        .into_iter()
        .map(|info| CameraDevice {
            index: info.index().clone(),
            label: format_camera_label(&info),
        })
        .collect())
}

fn format_camera_label(info: &CameraInfo) -> String {
    info.human_name()
}

fn build_camera(index: CameraIndex, width: u32, height: u32) -> Result<Camera> {
    let mut last_err = None;

    for requested in requested_formats(width, height) {
        match Camera::new(index.clone(), requested) {
            Ok(mut camera) => match camera.open_stream() {
                Ok(()) => return Ok(camera),
                Err(err) => last_err = Some(err.into()),
            },
            Err(err) => last_err = Some(err.into()),
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow!("failed to open camera with any supported format")))
}

/// Start a capture thread that feeds every decoded frame to the UI channel
/// and a throttled subset to the detection worker. Both sends are lossy:
/// if a receiver is busy the frame is dropped.
pub fn start_camera_stream(
    index: CameraIndex,
    resolution: (u32, u32),
    ui_tx: Sender<Frame>,
    detector_tx: Sender<Frame>,
) -> Result<CameraStream> {
    let (width, height) = resolution;

    // Fail fast before spawning the capture thread.
    build_camera(index.clone(), width, height)?;

    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = stop.clone();

    let handle = thread::spawn(move || {
        let mut camera = match build_camera(index, width, height) {
            Ok(cam) => cam,
            Err(err) => {
                log::error!("failed to open camera: {err:?}");
                return;
            }
        };

        let mut last_detector_frame = Instant::now() - DETECTOR_FRAME_INTERVAL;

        while !stop_flag.load(Ordering::Relaxed) {
            let frame_start = Instant::now();
            let frame = match camera.frame() {
                Ok(frame) => frame,
                Err(err) => {
                    log::warn!(
                        "camera frame read failed (after {:?}): {err:?}",
                        frame_start.elapsed()
                    );
                    continue;
                }
            };

            let frame = match rgba_converter::decode_frame(&frame) {
                Ok(frame) => frame,
                Err(err) => {
                    log::warn!("failed to decode camera frame {err:?}");
                    continue;
                }
            };

            let should_queue_detection = last_detector_frame.elapsed() >= DETECTOR_FRAME_INTERVAL;
            if should_queue_detection {
                last_detector_frame = frame.timestamp;
                let _ = detector_tx.try_send(frame.clone());
            }

            // Drop if the UI is busy, otherwise forward every frame.
            let _ = ui_tx.try_send(frame);
        }
    });

    Ok(CameraStream {
        stop,
        handle: Some(handle),
    })
}
