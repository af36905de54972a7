mod common;
mod ort;
mod palm;

use std::{path::PathBuf, thread};

use crossbeam_channel::{Receiver, Sender};

use crate::{
    config::Config,
    gesture,
    model_download::{ModelKind, model_path},
    types::{DetectionResult, Frame},
};

use self::common::LandmarkOutput;

// Landmark sets below this model confidence are treated as "no hand".
const MIN_HAND_CONFIDENCE: f32 = 0.2;

pub(crate) trait HandLandmarkEngine: Send + 'static {
    fn infer(&mut self, frame: &Frame) -> anyhow::Result<LandmarkOutput>;
}

/// Serial detection loop. Frames are drained down to the newest one before
/// each inference, so a slow model never builds a backlog and every result
/// reflects a recent frame.
fn run_worker_loop<E: HandLandmarkEngine>(
    mut engine: E,
    frame_rx: Receiver<Frame>,
    result_tx: Sender<DetectionResult>,
) {
    while let Some(frame) = recv_latest_frame(&frame_rx) {
        match engine.infer(&frame) {
            Ok(output) => {
                let result = build_detection_result(output, &frame);
                let _ = result_tx.try_send(result);
            }
            Err(err) => {
                log::warn!("hand landmark inference failed: {err:?}");
            }
        }
    }
}

fn recv_latest_frame(frame_rx: &Receiver<Frame>) -> Option<Frame> {
    let mut frame = frame_rx.recv().ok()?;
    while let Ok(newer) = frame_rx.try_recv() {
        frame = newer;
    }
    Some(frame)
}

#[derive(Clone, Debug)]
pub struct DetectorBackend {
    palm_model_path: PathBuf,
    landmark_model_path: PathBuf,
}

impl DetectorBackend {
    pub fn from_config(config: &Config) -> Self {
        Self {
            palm_model_path: model_path(ModelKind::PalmDetector, &config.model_dir),
            landmark_model_path: model_path(ModelKind::HandLandmark, &config.model_dir),
        }
    }

    pub fn palm_model_path(&self) -> PathBuf {
        self.palm_model_path.clone()
    }

    pub fn landmark_model_path(&self) -> PathBuf {
        self.landmark_model_path.clone()
    }
}

pub fn start_detector(
    backend: DetectorBackend,
    frame_rx: Receiver<Frame>,
    result_tx: Sender<DetectionResult>,
) -> thread::JoinHandle<()> {
    ort::start_worker(backend, frame_rx, result_tx)
}

pub(crate) fn build_detection_result(output: LandmarkOutput, frame: &Frame) -> DetectionResult {
    let has_hand = output.confidence >= MIN_HAND_CONFIDENCE
        && output.projected_landmarks.len() >= gesture::NUM_LANDMARKS;

    let gesture = if has_hand {
        let points: Vec<gesture::Landmark> = output
            .projected_landmarks
            .iter()
            .map(|&(x, y)| [x, y, 0.0])
            .collect();
        gesture::classify(&points)
    } else {
        None
    };

    DetectionResult {
        landmarks: has_hand.then(|| output.projected_landmarks),
        gesture,
        confidence: output.confidence,
        timestamp: frame.timestamp,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    fn frame_640x480() -> Frame {
        Frame {
            rgba: vec![0u8; 640 * 480 * 4],
            width: 640,
            height: 480,
            timestamp: Instant::now(),
        }
    }

    fn output(confidence: f32, landmark_count: usize) -> LandmarkOutput {
        LandmarkOutput {
            projected_landmarks: vec![(100.0, 100.0); landmark_count],
            confidence,
        }
    }

    #[test]
    fn low_confidence_yields_no_hand() {
        let result = build_detection_result(output(0.1, 21), &frame_640x480());
        assert!(result.landmarks.is_none());
        assert!(result.gesture.is_none());
    }

    #[test]
    fn confident_hand_keeps_landmarks() {
        let result = build_detection_result(output(0.9, 21), &frame_640x480());
        assert_eq!(result.landmarks.as_ref().map(Vec::len), Some(21));
    }

    #[test]
    fn incomplete_landmark_set_is_ignored() {
        let result = build_detection_result(output(0.9, 10), &frame_640x480());
        assert!(result.landmarks.is_none());
        assert!(result.gesture.is_none());
    }

    #[test]
    fn latest_frame_wins_when_backlogged() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let old = frame_640x480();
        let newer = Frame {
            width: 320,
            height: 240,
            rgba: vec![0u8; 320 * 240 * 4],
            timestamp: Instant::now(),
        };
        tx.send(old).unwrap();
        tx.send(newer).unwrap();

        let picked = recv_latest_frame(&rx).unwrap();
        assert_eq!(picked.width, 320);
    }

    #[test]
    fn worker_exits_when_sender_drops() {
        let (tx, rx) = crossbeam_channel::bounded::<Frame>(1);
        drop(tx);
        assert!(recv_latest_frame(&rx).is_none());
    }
}
