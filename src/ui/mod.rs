use std::{mem, sync::Arc, thread};

use crossbeam_channel::{Receiver, Sender, unbounded};
use gpui::{
    AnyElement, App, AppContext, ClipboardItem, Context, IntoElement, ObjectFit, ParentElement,
    Render, RenderImage, SharedString, Styled, StyledImage, TitlebarOptions, Window,
    WindowOptions, div, img, px,
};
use gpui_component::{
    ActiveTheme, StyledExt,
    button::{Button, ButtonVariants},
    h_flex,
    tag::Tag,
    v_flex,
};
use image::{Frame as ImageFrame, ImageBuffer, Rgba};

use crate::{
    config::Config,
    model_download::ModelDownloadEvent,
    pipeline::{
        self, CameraStream, DetectorBackend,
        camera::{available_cameras, start_camera_stream},
    },
    speech::{RecognitionEvent, RecognitionSession, Speaker},
    types::{DetectionResult, Frame},
};

mod download;
mod main_view;
mod render_util;

const PANEL_WIDTH: f32 = 560.0;
const DEFAULT_CAMERA_RATIO: f32 = 4.0 / 3.0;
const CAMERA_MIN_HEIGHT: f32 = 240.0;
const CAMERA_MAX_HEIGHT: f32 = 540.0;

// Displayed while no translation text is available.
const TRANSLATION_PLACEHOLDER: &str = "سيظهر نص الترجمة هنا...";
// Displayed while the voice widget has no transcript.
const TRANSCRIPT_PLACEHOLDER: &str = "سيظهر النص المنطوق هنا...";

pub fn launch_ui(
    app: &mut App,
    config: Config,
    frame_rx: Receiver<Frame>,
    frame_tx: Sender<Frame>,
    detector_frame_rx: Receiver<Frame>,
    detector_frame_tx: Sender<Frame>,
    result_rx: Receiver<DetectionResult>,
    result_tx: Sender<DetectionResult>,
) -> gpui::Result<()> {
    let window_options = WindowOptions {
        titlebar: Some(TitlebarOptions {
            title: Some("SignSpeak".into()),
            ..Default::default()
        }),
        ..Default::default()
    };

    app.open_window(window_options, move |window, app| {
        let view = app.new(|_| {
            AppView::new(
                config,
                frame_rx,
                frame_tx,
                detector_frame_rx,
                detector_frame_tx,
                result_rx,
                result_tx,
            )
        });
        app.new(|cx| gpui_component::Root::new(view, window, cx))
    })?;

    Ok(())
}

struct AppView {
    config: Config,
    screen: Screen,
    frame_rx: Receiver<Frame>,
    frame_tx: Sender<Frame>,
    detector_frame_rx: Option<Receiver<Frame>>,
    detector_frame_tx: Sender<Frame>,
    result_rx: Receiver<DetectionResult>,
    result_tx: Option<Sender<DetectionResult>>,
    detector_handle: Option<thread::JoinHandle<()>>,
    camera_stream: Option<CameraStream>,
    camera_error: Option<String>,
    latest_frame: Option<Frame>,
    latest_result: Option<DetectionResult>,
    latest_image: Option<Arc<RenderImage>>,
    word_display: main_view::WordDisplay,
    transcript_text: String,
    speaker: Option<Speaker>,
    speech_error: Option<String>,
    recognition_rx: Receiver<RecognitionEvent>,
    recognition_tx: Sender<RecognitionEvent>,
    recognition_session: Option<RecognitionSession>,
    recognition_error: Option<String>,
    download_rx: Receiver<DownloadMessage>,
    _download_handle: thread::JoinHandle<()>,
}

enum Screen {
    Download(DownloadState),
    Main,
}

struct DownloadState {
    downloaded: u64,
    total: Option<u64>,
    ready_models: usize,
    message: String,
    error: Option<String>,
    finished: bool,
}

impl DownloadState {
    fn new() -> Self {
        Self {
            downloaded: 0,
            total: None,
            ready_models: 0,
            message: "Preparing model downloads...".to_string(),
            error: None,
            finished: false,
        }
    }
}

enum DownloadMessage {
    Event(ModelDownloadEvent),
    AllReady,
    Error(String),
}

impl AppView {
    fn new(
        config: Config,
        frame_rx: Receiver<Frame>,
        frame_tx: Sender<Frame>,
        detector_frame_rx: Receiver<Frame>,
        detector_frame_tx: Sender<Frame>,
        result_rx: Receiver<DetectionResult>,
        result_tx: Sender<DetectionResult>,
    ) -> Self {
        let (download_tx, download_rx) = unbounded();
        let download_handle = download::spawn_model_downloads(config.model_dir.clone(), download_tx);
        let (recognition_tx, recognition_rx) = unbounded();

        Self {
            config,
            screen: Screen::Download(DownloadState::new()),
            frame_rx,
            frame_tx,
            detector_frame_rx: Some(detector_frame_rx),
            detector_frame_tx,
            result_rx,
            result_tx: Some(result_tx),
            detector_handle: None,
            camera_stream: None,
            camera_error: None,
            latest_frame: None,
            latest_result: None,
            latest_image: None,
            word_display: main_view::WordDisplay::default(),
            transcript_text: String::new(),
            speaker: None,
            speech_error: None,
            recognition_rx,
            recognition_tx,
            recognition_session: None,
            recognition_error: None,
            download_rx,
            _download_handle: download_handle,
        }
    }

    fn start_detector_if_needed(&mut self) {
        if self.detector_handle.is_some() {
            return;
        }

        let Some(frame_rx) = self.detector_frame_rx.take() else {
            log::warn!("missing frame receiver for detector");
            return;
        };
        let Some(result_tx) = self.result_tx.take() else {
            log::warn!("missing result sender for detector");
            return;
        };

        let backend = DetectorBackend::from_config(&self.config);
        self.detector_handle = Some(pipeline::start_detector(backend, frame_rx, result_tx));
    }

    fn start_speaker_if_needed(&mut self) {
        if self.speaker.is_some() || self.speech_error.is_some() {
            return;
        }

        match Speaker::spawn(&self.config.speech) {
            Ok(speaker) => self.speaker = Some(speaker),
            Err(err) => {
                log::warn!("speech synthesis unavailable: {err}");
                self.speech_error = Some(err.to_string());
            }
        }
    }

    fn start_camera_if_needed(&mut self) {
        if self.camera_stream.is_some() {
            return;
        }

        let resolution = (self.config.camera.width, self.config.camera.height);
        let result = available_cameras().and_then(|cameras| {
            let device = cameras
                .into_iter()
                .next()
                .ok_or_else(|| anyhow::anyhow!("no camera detected"))?;
            log::info!("opening camera '{}'", device.label);
            start_camera_stream(
                device.index,
                resolution,
                self.frame_tx.clone(),
                self.detector_frame_tx.clone(),
            )
        });

        match result {
            Ok(stream) => {
                self.camera_stream = Some(stream);
                self.camera_error = None;
            }
            Err(err) => {
                log::error!("failed to start camera: {err:?}");
                self.camera_error = Some(format!("{err:#}"));
            }
        }
    }

    fn stop_camera(&mut self) {
        if let Some(stream) = self.camera_stream.take() {
            stream.stop();
        }
        self.latest_frame = None;
        self.latest_result = None;
        self.latest_image = None;
    }

    fn copy_translation(&self, cx: &mut Context<'_, Self>) {
        if let Some(word) = self.word_display.text() {
            cx.write_to_clipboard(ClipboardItem::new_string(word.to_string()));
        }
    }

    fn speak_translation(&self) {
        let Some(word) = self.word_display.text() else {
            return;
        };
        if let Some(speaker) = &self.speaker {
            if let Err(err) = speaker.say(word) {
                log::warn!("failed to queue speech: {err}");
            }
        }
    }

    fn clear_translation(&mut self) {
        self.word_display.clear();
        self.transcript_text.clear();
        if let Some(speaker) = &self.speaker {
            let _ = speaker.stop();
        }
    }

    fn toggle_recognition(&mut self) {
        if let Some(session) = &self.recognition_session {
            session.finish();
            return;
        }

        self.recognition_error = None;
        let model_path = crate::model_download::model_path(
            crate::model_download::ModelKind::SpeechRecognizer,
            &self.config.model_dir,
        );
        self.recognition_session = Some(crate::speech::start_recognition(
            model_path,
            self.config.speech.language.clone(),
            self.recognition_tx.clone(),
        ));
    }
}

impl Render for AppView {
    fn render(
        &mut self,
        window: &mut Window,
        cx: &mut Context<'_, Self>,
    ) -> impl gpui::IntoElement {
        cx.defer_in(window, |_, _, cx| {
            cx.notify();
        });

        let mut screen = mem::replace(&mut self.screen, Screen::Main);
        let view = match screen {
            Screen::Download(mut state) => {
                self.poll_download_events(&mut state);
                // A failed model download only disables its feature; the app
                // still starts and surfaces the failure on the main screen.
                // The camera stays off until the user toggles it on.
                let should_switch = state.finished;
                let view = self.render_download_view(&state, cx);
                if should_switch {
                    self.start_detector_if_needed();
                    self.start_speaker_if_needed();
                    screen = Screen::Main;
                } else {
                    screen = Screen::Download(state);
                }
                view
            }
            Screen::Main => {
                screen = Screen::Main;
                self.render_main(window, cx)
            }
        };
        self.screen = screen;
        view
    }
}
