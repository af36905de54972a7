//! Text-to-speech worker. The platform engine is owned by a dedicated OS
//! thread and driven through a channel, so the UI never blocks on audio.

use std::thread;

use crossbeam_channel::{Sender, bounded, unbounded};
use thiserror::Error;
use tts::Tts;

use crate::config::SpeechConfig;

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("speech engine unavailable: {0}")]
    Init(String),
    #[error("speech worker stopped")]
    WorkerGone,
}

enum SpeechCommand {
    Say(String),
    Stop,
    Shutdown,
}

/// Handle to the speech worker. Dropping it shuts the worker down after the
/// current utterance.
pub struct Speaker {
    tx: Sender<SpeechCommand>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Speaker {
    /// Spawn the worker and wait for the platform engine to come up. Engine
    /// construction happens on the worker thread because some platform
    /// backends are not `Send`.
    pub fn spawn(config: &SpeechConfig) -> Result<Self, SpeechError> {
        let (tx, rx) = unbounded::<SpeechCommand>();
        let (init_tx, init_rx) = bounded::<Result<(), String>>(1);
        let language = config.language.clone();
        let rate_multiplier = config.rate;

        let handle = thread::spawn(move || {
            let mut engine = match Tts::default() {
                Ok(engine) => engine,
                Err(err) => {
                    let _ = init_tx.send(Err(err.to_string()));
                    return;
                }
            };

            configure_engine(&mut engine, &language, rate_multiplier);
            let _ = init_tx.send(Ok(()));

            while let Ok(command) = rx.recv() {
                match command {
                    SpeechCommand::Say(text) => {
                        // Interrupt whatever is still playing, matching the
                        // cancel-then-speak behavior users expect from the
                        // translation flow.
                        if let Err(err) = engine.speak(&text, true) {
                            log::warn!("speech synthesis failed: {err}");
                        }
                    }
                    SpeechCommand::Stop => {
                        if let Err(err) = engine.stop() {
                            log::warn!("failed to stop speech: {err}");
                        }
                    }
                    SpeechCommand::Shutdown => break,
                }
            }
        });

        match init_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                tx,
                handle: Some(handle),
            }),
            Ok(Err(message)) => {
                let _ = handle.join();
                Err(SpeechError::Init(message))
            }
            Err(_) => {
                let _ = handle.join();
                Err(SpeechError::WorkerGone)
            }
        }
    }

    /// Queue an utterance, interrupting any speech still in progress.
    pub fn say(&self, text: impl Into<String>) -> Result<(), SpeechError> {
        self.tx
            .send(SpeechCommand::Say(text.into()))
            .map_err(|_| SpeechError::WorkerGone)
    }

    pub fn stop(&self) -> Result<(), SpeechError> {
        self.tx
            .send(SpeechCommand::Stop)
            .map_err(|_| SpeechError::WorkerGone)
    }
}

impl Drop for Speaker {
    fn drop(&mut self) {
        let _ = self.tx.send(SpeechCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn configure_engine(engine: &mut Tts, language: &str, rate_multiplier: f32) {
    match engine.voices() {
        Ok(voices) => {
            let preferred = voices
                .iter()
                .find(|voice| voice.language().to_string().starts_with(language));
            match preferred {
                Some(voice) => {
                    if let Err(err) = engine.set_voice(voice) {
                        log::warn!("failed to select voice for '{language}': {err}");
                    }
                }
                None => {
                    log::warn!("no installed voice matches language '{language}'");
                }
            }
        }
        Err(err) => log::warn!("failed to list voices: {err}"),
    }

    let rate = (engine.normal_rate() * rate_multiplier)
        .clamp(engine.min_rate(), engine.max_rate());
    if let Err(err) = engine.set_rate(rate) {
        log::warn!("failed to set speech rate: {err}");
    }
}
