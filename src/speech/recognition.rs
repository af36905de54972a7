//! One-shot voice recognition: capture a single utterance from the default
//! microphone, then transcribe it locally with whisper.

use std::{
    path::PathBuf,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use anyhow::{Context, Result, anyhow};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::Sender;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use super::audio::{WHISPER_SAMPLE_RATE, downmix_to_mono, resample_to_16k};

// Hard cap on a single utterance so a forgotten session cannot record forever.
const MAX_UTTERANCE: Duration = Duration::from_secs(10);
const CAPTURE_POLL: Duration = Duration::from_millis(50);

#[derive(Clone, Debug)]
pub enum RecognitionEvent {
    Transcript(String),
    Failed(String),
}

/// Handle to an in-flight recognition. `finish` stops the capture early and
/// transcribes whatever was recorded; dropping the handle does the same.
pub struct RecognitionSession {
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl RecognitionSession {
    pub fn finish(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

impl Drop for RecognitionSession {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

pub fn start_recognition(
    model_path: PathBuf,
    language: String,
    event_tx: Sender<RecognitionEvent>,
) -> RecognitionSession {
    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = stop.clone();

    let handle = thread::spawn(move || {
        match capture_and_transcribe(&model_path, &language, &stop_flag) {
            Ok(text) if !text.is_empty() => {
                let _ = event_tx.try_send(RecognitionEvent::Transcript(text));
            }
            Ok(_) => {
                let _ = event_tx.try_send(RecognitionEvent::Failed(
                    "no speech detected".to_string(),
                ));
            }
            Err(err) => {
                log::warn!("voice recognition failed: {err:?}");
                let _ = event_tx.try_send(RecognitionEvent::Failed(err.to_string()));
            }
        }
    });

    RecognitionSession {
        stop,
        handle: Some(handle),
    }
}

fn capture_and_transcribe(
    model_path: &PathBuf,
    language: &str,
    stop: &AtomicBool,
) -> Result<String> {
    let (samples, sample_rate, channels) = capture_utterance(stop)?;

    let mono = downmix_to_mono(&samples, channels);
    let mut conditioned = resample_to_16k(&mono, sample_rate);
    // whisper rejects clips shorter than a second.
    if conditioned.len() < WHISPER_SAMPLE_RATE as usize {
        conditioned.resize(WHISPER_SAMPLE_RATE as usize, 0.0);
    }

    transcribe(model_path, language, &conditioned)
}

fn capture_utterance(stop: &AtomicBool) -> Result<(Vec<f32>, u32, u16)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("no input device available"))?;
    let supported = device
        .default_input_config()
        .context("failed to query input device config")?;

    let sample_rate = supported.sample_rate().0;
    let channels = supported.channels();
    let stream_config: cpal::StreamConfig = supported.config();

    let captured: Arc<Mutex<Vec<f32>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = captured.clone();
    let err_fn = |err| log::warn!("input stream error: {err}");

    let stream = match supported.sample_format() {
        cpal::SampleFormat::F32 => device.build_input_stream(
            &stream_config,
            move |data: &[f32], _| {
                if let Ok(mut buffer) = sink.lock() {
                    buffer.extend_from_slice(data);
                }
            },
            err_fn,
            None,
        ),
        cpal::SampleFormat::I16 => device.build_input_stream(
            &stream_config,
            move |data: &[i16], _| {
                if let Ok(mut buffer) = sink.lock() {
                    buffer.extend(data.iter().map(|&s| s as f32 / i16::MAX as f32));
                }
            },
            err_fn,
            None,
        ),
        cpal::SampleFormat::U16 => device.build_input_stream(
            &stream_config,
            move |data: &[u16], _| {
                if let Ok(mut buffer) = sink.lock() {
                    buffer.extend(
                        data.iter()
                            .map(|&s| (s as f32 / u16::MAX as f32) * 2.0 - 1.0),
                    );
                }
            },
            err_fn,
            None,
        ),
        format => return Err(anyhow!("unsupported input sample format {format:?}")),
    }
    .context("failed to build input stream")?;

    stream.play().context("failed to start input stream")?;

    let started = Instant::now();
    while !stop.load(Ordering::Relaxed) && started.elapsed() < MAX_UTTERANCE {
        thread::sleep(CAPTURE_POLL);
    }
    drop(stream);

    let samples = captured
        .lock()
        .map_err(|_| anyhow!("capture buffer poisoned"))?
        .clone();
    Ok((samples, sample_rate, channels))
}

fn transcribe(model_path: &PathBuf, language: &str, samples: &[f32]) -> Result<String> {
    let model_path = model_path
        .to_str()
        .ok_or_else(|| anyhow!("model path is not valid UTF-8"))?;
    let ctx = WhisperContext::new_with_params(model_path, WhisperContextParameters::default())
        .context("failed to load speech recognition model")?;
    let mut state = ctx
        .create_state()
        .context("failed to create recognition state")?;

    let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
    params.set_language(Some(language));
    params.set_translate(false);
    params.set_print_special(false);
    params.set_print_progress(false);
    params.set_print_realtime(false);
    params.set_print_timestamps(false);

    state
        .full(params, samples)
        .context("speech transcription failed")?;

    let segment_count = state.full_n_segments().context("no segments available")?;
    let mut text = String::new();
    for i in 0..segment_count {
        let segment = state
            .full_get_segment_text(i)
            .with_context(|| format!("failed to read segment {i}"))?;
        text.push_str(&segment);
    }

    Ok(text.trim().to_string())
}
