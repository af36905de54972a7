use std::time::Instant;

#[derive(Clone, Debug)]
pub struct Frame {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub timestamp: Instant,
}

/// One recognized static hand shape, mapped to a spoken/displayed word.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gesture {
    Hello,
    Thanks,
    Yes,
    No,
    Help,
}

impl Gesture {
    /// Localized word shown in the UI and handed to speech synthesis.
    pub fn word(&self) -> &'static str {
        match self {
            Gesture::Hello => "مرحباً",
            Gesture::Thanks => "شكراً",
            Gesture::Yes => "نعم",
            Gesture::No => "لا",
            Gesture::Help => "مساعدة",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Gesture::Hello => "hello",
            Gesture::Thanks => "thanks",
            Gesture::Yes => "yes",
            Gesture::No => "no",
            Gesture::Help => "help",
        }
    }
}

/// Per-frame output of the detection worker. Recomputed every frame,
/// never persisted.
#[derive(Clone, Debug)]
pub struct DetectionResult {
    /// Landmarks projected to frame pixel coordinates, present when a hand
    /// was detected this frame.
    pub landmarks: Option<Vec<(f32, f32)>>,
    pub gesture: Option<Gesture>,
    pub confidence: f32,
    pub timestamp: Instant,
}

#[derive(Clone, Debug)]
pub struct PalmRegion {
    pub bbox: [f32; 4],
    pub landmarks: Vec<(f32, f32)>,
    pub score: f32,
}
