//! Capture buffer conditioning for the speech recognizer, which wants
//! 16 kHz mono f32.

pub const WHISPER_SAMPLE_RATE: u32 = 16_000;

/// Average interleaved channels down to mono. A channel count of 0 or 1
/// returns the input unchanged.
pub fn downmix_to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }

    let channels = channels as usize;
    samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// Linear-interpolation resample from `from_rate` to 16 kHz.
pub fn resample_to_16k(samples: &[f32], from_rate: u32) -> Vec<f32> {
    if from_rate == WHISPER_SAMPLE_RATE || samples.is_empty() || from_rate == 0 {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / WHISPER_SAMPLE_RATE as f64;
    let out_len = ((samples.len() as f64) / ratio).floor() as usize;
    let mut out = Vec::with_capacity(out_len);
    for i in 0..out_len {
        let src_pos = i as f64 * ratio;
        let idx = src_pos as usize;
        let frac = (src_pos - idx as f64) as f32;
        let a = samples[idx];
        let b = samples.get(idx + 1).copied().unwrap_or(a);
        out.push(a + (b - a) * frac);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mono_passthrough() {
        let samples = vec![0.1, 0.2, 0.3];
        assert_eq!(downmix_to_mono(&samples, 1), samples);
    }

    #[test]
    fn stereo_downmix_averages_pairs() {
        let samples = vec![1.0, 0.0, 0.0, 1.0, 0.5, 0.5];
        assert_eq!(downmix_to_mono(&samples, 2), vec![0.5, 0.5, 0.5]);
    }

    #[test]
    fn resample_is_identity_at_16k() {
        let samples = vec![0.1, -0.1, 0.2];
        assert_eq!(resample_to_16k(&samples, WHISPER_SAMPLE_RATE), samples);
    }

    #[test]
    fn resample_halves_48k_to_a_third() {
        let samples = vec![0.0; 48_000];
        let out = resample_to_16k(&samples, 48_000);
        assert_eq!(out.len(), 16_000);
    }

    #[test]
    fn resample_interpolates_between_samples() {
        // 32 kHz → 16 kHz picks every second position, halfway between pairs
        // falls exactly on input samples here.
        let samples = vec![0.0, 1.0, 2.0, 3.0];
        let out = resample_to_16k(&samples, 32_000);
        assert_eq!(out, vec![0.0, 2.0]);
    }
}
