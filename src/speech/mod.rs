pub mod audio;
pub mod recognition;
pub mod synth;

pub use recognition::{RecognitionEvent, RecognitionSession, start_recognition};
pub use synth::{Speaker, SpeechError};
