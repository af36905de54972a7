use std::{
    fs,
    io::{Read, Write},
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelKind {
    PalmDetector,
    HandLandmark,
    SpeechRecognizer,
}

impl ModelKind {
    /// Every model the app needs, in download order.
    pub const ALL: [ModelKind; 3] = [
        ModelKind::PalmDetector,
        ModelKind::HandLandmark,
        ModelKind::SpeechRecognizer,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ModelKind::PalmDetector => "palm detector",
            ModelKind::HandLandmark => "hand landmark estimator",
            ModelKind::SpeechRecognizer => "speech recognizer",
        }
    }

    fn filename(&self) -> &'static str {
        match self {
            ModelKind::PalmDetector => "palm_detection_mediapipe_2023feb.onnx",
            ModelKind::HandLandmark => "handpose_estimation_mediapipe_2023feb.onnx",
            ModelKind::SpeechRecognizer => "ggml-tiny.bin",
        }
    }

    fn url(&self) -> &'static str {
        match self {
            ModelKind::PalmDetector => "https://raw.githubusercontent.com/214zzl995/gesture-universe/refs/heads/main/models/palm_detection_mediapipe_2023feb.onnx",
            ModelKind::HandLandmark => "https://raw.githubusercontent.com/214zzl995/gesture-universe/refs/heads/main/models/handpose_estimation_mediapipe_2023feb.onnx",
            ModelKind::SpeechRecognizer => "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/ggml-tiny.bin",
        }
    }
}

pub fn model_path(kind: ModelKind, model_dir: &str) -> PathBuf {
    PathBuf::from(model_dir).join(kind.filename())
}

#[derive(Clone, Debug)]
pub enum ModelDownloadEvent {
    AlreadyPresent {
        model: ModelKind,
    },
    Started {
        model: ModelKind,
        total: Option<u64>,
    },
    Progress {
        model: ModelKind,
        downloaded: u64,
        total: Option<u64>,
    },
    Finished {
        model: ModelKind,
    },
}

/// Make sure one model file exists locally, downloading it if missing.
/// Progress is reported through `on_event` so callers can render their own
/// progress UI.
pub fn ensure_model_ready<F>(kind: ModelKind, model_path: &Path, mut on_event: F) -> anyhow::Result<()>
where
    F: FnMut(ModelDownloadEvent),
{
    if model_path.exists() {
        on_event(ModelDownloadEvent::AlreadyPresent { model: kind });
        on_event(ModelDownloadEvent::Finished { model: kind });
        return Ok(());
    }

    if let Some(parent) = model_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create model directory {}", parent.display()))?;
    }

    download_to_path(kind, kind.url(), model_path, &mut on_event).with_context(|| {
        format!(
            "failed to download {} model to {}",
            kind.label(),
            model_path.display()
        )
    })
}

/// Console variant used by non-UI entry points: same logic plus an
/// indicatif progress bar.
pub fn ensure_model_ready_with_progress(kind: ModelKind, model_path: &Path) -> anyhow::Result<()> {
    let mut progress: Option<ProgressBar> = None;
    ensure_model_ready(kind, model_path, |event| match &event {
        ModelDownloadEvent::Started { total, .. } => {
            progress = Some(create_progress_bar(*total));
        }
        ModelDownloadEvent::Progress { downloaded, .. } => {
            if let Some(pb) = progress.as_ref() {
                pb.set_position(*downloaded);
            }
        }
        ModelDownloadEvent::Finished { model } => {
            if let Some(pb) = progress.take() {
                pb.finish_with_message(format!("{} model ready", model.label()));
            }
        }
        ModelDownloadEvent::AlreadyPresent { .. } => {}
    })
}

fn download_to_path<F>(
    model: ModelKind,
    url: &str,
    dest: &Path,
    on_event: &mut F,
) -> anyhow::Result<()>
where
    F: FnMut(ModelDownloadEvent),
{
    log::info!(
        "downloading {} model from {url} to {}",
        model.label(),
        dest.display()
    );

    let client = Client::new();
    let mut response = client
        .get(url)
        .send()
        .context("failed to start model download")?
        .error_for_status()
        .context("model download returned error status")?;

    let total_size = response.content_length();
    on_event(ModelDownloadEvent::Started {
        model,
        total: total_size,
    });

    let tmp_path = dest.with_extension("download");
    let mut file = fs::File::create(&tmp_path)
        .with_context(|| format!("failed to create {}", tmp_path.display()))?;

    let mut downloaded: u64 = 0;
    let mut buffer = [0u8; 16 * 1024];
    loop {
        let bytes_read = response
            .read(&mut buffer)
            .context("failed while reading model bytes")?;
        if bytes_read == 0 {
            break;
        }

        file.write_all(&buffer[..bytes_read])
            .context("failed while writing model to disk")?;
        downloaded += bytes_read as u64;
        on_event(ModelDownloadEvent::Progress {
            model,
            downloaded,
            total: total_size,
        });
    }

    file.sync_all()
        .context("failed to flush downloaded model to disk")?;
    fs::rename(&tmp_path, dest).with_context(|| {
        format!(
            "failed to move temp model {} into place at {}",
            tmp_path.display(),
            dest.display()
        )
    })?;

    on_event(ModelDownloadEvent::Finished { model });
    Ok(())
}

fn create_progress_bar(total_size: Option<u64>) -> ProgressBar {
    match total_size {
        Some(total) if total > 0 => {
            let pb = ProgressBar::new(total);
            let style = ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({eta})",
            )
            .unwrap()
            .progress_chars("=>-");
            pb.set_style(style);
            pb
        }
        _ => {
            let pb = ProgressBar::new_spinner();
            let style = ProgressStyle::with_template("{spinner:.green} downloading model").unwrap();
            pb.set_style(style);
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        }
    }
}
