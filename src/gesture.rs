//! Geometric gesture classification over a 21-point hand skeleton.
//!
//! The classifier is a pure function of a single frame's landmarks: an
//! ordered rule list evaluated first-match-wins. Several rules can hold for
//! the same hand at once, so the evaluation order is part of the contract.

use crate::types::Gesture;

/// One tracked point, (x, y, z) in frame pixel units. The classifier only
/// looks at x and y.
pub type Landmark = [f32; 3];

pub const NUM_LANDMARKS: usize = 21;

const WRIST: usize = 0;
const THUMB_TIP: usize = 4;
const INDEX_TIP: usize = 8;
const MIDDLE_TIP: usize = 12;
const RING_TIP: usize = 16;
const PINKY_TIP: usize = 20;

const THUMB_BASE: usize = 1;
const INDEX_BASE: usize = 5;
const MIDDLE_BASE: usize = 9;
const RING_BASE: usize = 13;
const PINKY_BASE: usize = 17;

// Tip / mid-joint pairs used by the open-palm check (thumb excluded).
const OPEN_PALM_TIPS: [usize; 4] = [INDEX_TIP, MIDDLE_TIP, RING_TIP, PINKY_TIP];
const OPEN_PALM_JOINTS: [usize; 4] = [6, 10, 14, 18];

/// Distance-ratio thresholds for the rule list. `Default` reproduces the
/// shipped behavior exactly.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Thresholds {
    /// Tip-to-tip distance below this fraction of the tip-to-base distance
    /// counts as touching (Thanks, Yes).
    pub touch: f32,
    /// Tip-to-wrist below this multiple of base-to-wrist counts as a closed
    /// finger (No, Help).
    pub closed: f32,
    /// Tip-to-wrist above this multiple of base-to-wrist disqualifies the
    /// Yes rule's curled fingers.
    pub curled: f32,
    /// Tip-to-wrist above this multiple of base-to-wrist counts as an
    /// extended finger (No, Help).
    pub extended: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            touch: 0.3,
            closed: 1.1,
            curled: 1.2,
            extended: 1.3,
        }
    }
}

/// Classify one hand's landmarks into a gesture, if any pattern matches.
///
/// Hands with fewer than 21 landmarks yield `None` (insufficient data, not
/// an error). Pure and deterministic; no state survives between calls.
pub fn classify(landmarks: &[Landmark]) -> Option<Gesture> {
    classify_with(landmarks, &Thresholds::default())
}

pub fn classify_with(landmarks: &[Landmark], thresholds: &Thresholds) -> Option<Gesture> {
    if landmarks.len() < NUM_LANDMARKS {
        return None;
    }

    // First match wins; the order must not be rearranged.
    const RULES: [(fn(&[Landmark], &Thresholds) -> bool, Gesture); 5] = [
        (is_open_palm, Gesture::Hello),
        (is_thumb_on_middle, Gesture::Thanks),
        (is_pinch_sign, Gesture::Yes),
        (is_index_point, Gesture::No),
        (is_thumb_pinky_spread, Gesture::Help),
    ];

    RULES
        .iter()
        .find(|(rule, _)| rule(landmarks, thresholds))
        .map(|&(_, gesture)| gesture)
}

/// Hello: all four non-thumb fingertips above their mid joints (frame y
/// grows downward, so "above" is numerically smaller).
fn is_open_palm(l: &[Landmark], _t: &Thresholds) -> bool {
    OPEN_PALM_TIPS
        .iter()
        .zip(OPEN_PALM_JOINTS.iter())
        .filter(|&(&tip, &joint)| l[tip][1] < l[joint][1])
        .count()
        >= 4
}

/// Thanks: thumb tip touching or near the middle fingertip.
fn is_thumb_on_middle(l: &[Landmark], t: &Thresholds) -> bool {
    dist(l[THUMB_TIP], l[MIDDLE_TIP]) < dist(l[THUMB_TIP], l[MIDDLE_BASE]) * t.touch
}

/// Yes: thumb/index pinch with the remaining fingers curled in.
fn is_pinch_sign(l: &[Landmark], t: &Thresholds) -> bool {
    if dist(l[THUMB_TIP], l[INDEX_TIP]) >= dist(l[THUMB_TIP], l[INDEX_BASE]) * t.touch {
        return false;
    }

    let curled = |tip: usize, base: usize| {
        !(dist(l[tip], l[WRIST]) > dist(l[base], l[WRIST]) * t.curled)
    };
    curled(MIDDLE_TIP, MIDDLE_BASE) && curled(RING_TIP, RING_BASE) && curled(PINKY_TIP, PINKY_BASE)
}

/// No: index finger pointing, every other finger (thumb included) closed.
fn is_index_point(l: &[Landmark], t: &Thresholds) -> bool {
    extended(l, INDEX_TIP, INDEX_BASE, t)
        && closed(l, MIDDLE_TIP, MIDDLE_BASE, t)
        && closed(l, RING_TIP, RING_BASE, t)
        && closed(l, PINKY_TIP, PINKY_BASE, t)
        && closed(l, THUMB_TIP, THUMB_BASE, t)
}

/// Help: thumb and pinky out, index/middle/ring closed.
fn is_thumb_pinky_spread(l: &[Landmark], t: &Thresholds) -> bool {
    extended(l, THUMB_TIP, THUMB_BASE, t)
        && extended(l, PINKY_TIP, PINKY_BASE, t)
        && closed(l, INDEX_TIP, INDEX_BASE, t)
        && closed(l, MIDDLE_TIP, MIDDLE_BASE, t)
        && closed(l, RING_TIP, RING_BASE, t)
}

fn extended(l: &[Landmark], tip: usize, base: usize, t: &Thresholds) -> bool {
    dist(l[tip], l[WRIST]) > dist(l[base], l[WRIST]) * t.extended
}

fn closed(l: &[Landmark], tip: usize, base: usize, t: &Thresholds) -> bool {
    dist(l[tip], l[WRIST]) < dist(l[base], l[WRIST]) * t.closed
}

// 2-D Euclidean distance; z carries depth from the model and is ignored here.
fn dist(a: Landmark, b: Landmark) -> f32 {
    ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(x: f32, y: f32) -> Landmark {
        [x, y, 0.0]
    }

    /// A fist-like template: wrist at the origin, y negative is up, every
    /// fingertip tucked near its base. Tests move the tips around.
    fn fist() -> Vec<Landmark> {
        let mut l = vec![point(0.0, 0.0); NUM_LANDMARKS];
        // thumb chain
        l[1] = point(-30.0, -20.0);
        l[2] = point(-45.0, -35.0);
        l[3] = point(-48.0, -40.0);
        l[4] = point(-25.0, -25.0);
        // index chain
        l[5] = point(-15.0, -60.0);
        l[6] = point(-15.0, -80.0);
        l[7] = point(-15.0, -85.0);
        l[8] = point(-15.0, -55.0);
        // middle chain
        l[9] = point(0.0, -62.0);
        l[10] = point(0.0, -84.0);
        l[11] = point(0.0, -90.0);
        l[12] = point(0.0, -55.0);
        // ring chain
        l[13] = point(15.0, -60.0);
        l[14] = point(15.0, -80.0);
        l[15] = point(15.0, -85.0);
        l[16] = point(15.0, -55.0);
        // pinky chain
        l[17] = point(30.0, -55.0);
        l[18] = point(30.0, -72.0);
        l[19] = point(30.0, -78.0);
        l[20] = point(30.0, -50.0);
        l
    }

    fn open_hand() -> Vec<Landmark> {
        let mut l = fist();
        l[8] = point(-15.0, -95.0);
        l[12] = point(0.0, -100.0);
        l[16] = point(15.0, -95.0);
        l[20] = point(30.0, -85.0);
        l[4] = point(-50.0, -45.0);
        l
    }

    #[test]
    fn short_hand_returns_none() {
        let l = vec![point(0.0, 0.0); NUM_LANDMARKS - 1];
        assert_eq!(classify(&l), None);
        assert_eq!(classify(&[]), None);
    }

    #[test]
    fn open_palm_is_hello() {
        assert_eq!(classify(&open_hand()), Some(Gesture::Hello));
    }

    #[test]
    fn hello_takes_precedence_over_thanks() {
        // Open palm with the thumb tip resting on the middle fingertip:
        // both rule 1 and rule 2 hold, rule 1 must win.
        let mut l = open_hand();
        l[4] = point(1.0, -100.0);
        assert!(is_thumb_on_middle(&l, &Thresholds::default()));
        assert_eq!(classify(&l), Some(Gesture::Hello));
    }

    #[test]
    fn thumb_on_middle_is_thanks() {
        let mut l = fist();
        // Thumb tip one pixel from the middle fingertip, well inside 30% of
        // its distance to the middle base.
        l[4] = point(1.0, -55.0);
        assert!(!is_open_palm(&l, &Thresholds::default()));
        assert_eq!(classify(&l), Some(Gesture::Thanks));
    }

    #[test]
    fn pinch_with_curled_fingers_is_yes() {
        let mut l = fist();
        l[8] = point(-18.0, -75.0);
        l[4] = point(-17.0, -74.0);
        l[12] = point(0.0, -60.0);
        l[16] = point(15.0, -58.0);
        l[20] = point(30.0, -52.0);
        assert_eq!(classify(&l), Some(Gesture::Yes));
    }

    #[test]
    fn index_point_is_no() {
        let mut l = fist();
        l[8] = point(-15.0, -95.0);
        assert_eq!(classify(&l), Some(Gesture::No));
    }

    #[test]
    fn thumb_and_pinky_out_is_help() {
        let mut l = fist();
        l[4] = point(-55.0, -40.0);
        l[20] = point(32.0, -85.0);
        assert!(!is_open_palm(&l, &Thresholds::default()));
        assert_eq!(classify(&l), Some(Gesture::Help));
    }

    #[test]
    fn neutral_hand_matches_nothing() {
        let mut l = fist();
        // Tips floated away from the bases but short of every ratio gate.
        l[4] = point(-40.0, -30.0);
        l[8] = point(-16.0, -65.0);
        l[12] = point(0.0, -66.0);
        l[16] = point(16.0, -63.0);
        l[20] = point(30.0, -60.0);
        assert_eq!(classify(&l), None);
    }

    #[test]
    fn classification_is_idempotent() {
        for hand in [fist(), open_hand()] {
            assert_eq!(classify(&hand), classify(&hand));
        }
    }

    #[test]
    fn default_thresholds_match_shipped_constants() {
        let t = Thresholds::default();
        assert_eq!((t.touch, t.closed, t.curled, t.extended), (0.3, 1.1, 1.2, 1.3));
    }
}
