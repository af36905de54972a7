use std::{path::Path, thread};

use anyhow::{Context, Result, anyhow};
use crossbeam_channel::{Receiver, Sender};
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Tensor;

use super::{
    DetectorBackend, HandLandmarkEngine,
    common::{self, LandmarkOutput},
    palm::{PalmDetector, PalmDetectorConfig, crop_from_palm, pick_primary_region},
    run_worker_loop,
};
use crate::{
    model_download::{ModelKind, ensure_model_ready_with_progress},
    types::{DetectionResult, Frame},
};

pub fn start_worker(
    backend: DetectorBackend,
    frame_rx: Receiver<Frame>,
    result_tx: Sender<DetectionResult>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let landmark_model_path = backend.landmark_model_path();
        let palm_model_path = backend.palm_model_path();

        if let Err(err) =
            ensure_model_ready_with_progress(ModelKind::HandLandmark, &landmark_model_path)
        {
            log::error!(
                "failed to prepare hand landmark model at {}: {err:?}",
                landmark_model_path.display()
            );
            return;
        }

        if let Err(err) = ensure_model_ready_with_progress(ModelKind::PalmDetector, &palm_model_path)
        {
            log::error!(
                "failed to prepare palm detector model at {}: {err:?}",
                palm_model_path.display()
            );
            return;
        }

        let engine = match OrtEngine::new(&landmark_model_path, &palm_model_path) {
            Ok(engine) => {
                log::info!(
                    "hand landmark ORT backend ready using {} and palm detector {}",
                    landmark_model_path.display(),
                    palm_model_path.display()
                );
                engine
            }
            Err(err) => {
                log::error!("failed to load ORT hand landmark model: {err:?}");
                return;
            }
        };

        run_worker_loop(engine, frame_rx, result_tx);
    })
}

struct OrtEngine {
    landmark_session: Session,
    palm_detector: PalmDetector,
}

impl OrtEngine {
    fn new(landmark_model_path: &Path, palm_model_path: &Path) -> Result<Self> {
        let landmark_session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(2)?
            .commit_from_file(landmark_model_path)
            .with_context(|| {
                format!(
                    "failed to load ORT session from {}",
                    landmark_model_path.display()
                )
            })?;

        let palm_detector = PalmDetector::new(palm_model_path, PalmDetectorConfig::default())?;

        Ok(Self {
            landmark_session,
            palm_detector,
        })
    }
}

impl HandLandmarkEngine for OrtEngine {
    fn infer(&mut self, frame: &Frame) -> Result<LandmarkOutput> {
        let palm_regions = self.palm_detector.detect(frame).unwrap_or_else(|err| {
            log::warn!("palm detection failed: {err:?}");
            Vec::new()
        });

        let Some(selected) = pick_primary_region(&palm_regions) else {
            return Ok(LandmarkOutput {
                projected_landmarks: Vec::new(),
                confidence: 0.0,
            });
        };
        let (center, side, angle) = crop_from_palm(selected);
        let selected_score = selected.score;

        let (input, transform) =
            common::prepare_rotated_crop(frame, center, side, angle, common::LANDMARK_INPUT_SIZE)?;
        let tensor = Tensor::from_array(input)?;
        let outputs = self
            .landmark_session
            .run(ort::inputs![tensor])
            .context("failed to run ORT session")?;

        if outputs.len() == 0 {
            return Err(anyhow!("model returned no outputs"));
        }

        let coords = outputs[0].try_extract_array::<f32>()?;
        let flattened: Vec<f32> = coords.iter().copied().collect();
        let landmarks = common::decode_landmarks(&flattened)?;

        let confidence = if outputs.len() > 1 {
            outputs[1]
                .try_extract_array::<f32>()
                .ok()
                .and_then(|arr| arr.iter().next().copied())
                .unwrap_or(0.0)
        } else {
            0.0
        };

        let projected = common::project_landmarks_with_transform(&landmarks, &transform);

        Ok(LandmarkOutput {
            projected_landmarks: projected,
            confidence: (confidence * selected_score).clamp(0.0, 1.0),
        })
    }
}
