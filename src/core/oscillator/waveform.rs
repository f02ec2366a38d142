use std::f64::consts::PI;

use super::envelope::{apply_edge_fades, decay_gain, edge_fade_len};
use super::note::Note;
use crate::error::Result;

/// Number of samples a note of `duration` seconds occupies
pub fn buffer_len(duration: f32, sample_rate: u32) -> usize {
    (duration as f64 * sample_rate as f64).round().max(0.0) as usize
}

/// Render a decaying sine for `note`.
///
/// `amplitude * sin(2*pi*f*t) * exp(-decay*t)` over `[0, duration)`, with a short
/// linear fade at both edges when the buffer is long enough to hold them.
pub fn render_tone(note: Note, duration: f32, decay: f32, amplitude: f32, sample_rate: u32) -> Vec<f32> {
    let len = buffer_len(duration, sample_rate);
    let omega = 2.0 * PI * note.frequency();
    let rate = sample_rate as f64;

    let mut samples: Vec<f32> = (0..len)
        .map(|i| {
            let t = i as f64 / rate;
            (amplitude as f64 * (omega * t).sin() * decay_gain(decay, t)) as f32
        })
        .collect();

    apply_edge_fades(&mut samples, edge_fade_len(sample_rate));
    samples
}

/// Render a note given by name, e.g. `note_wave("A4", 1.0, 0.5, 0.25, 44100)`
pub fn note_wave(note: &str, duration: f32, decay: f32, amplitude: f32, sample_rate: u32) -> Result<Vec<f32>> {
    let note: Note = note.parse()?;
    Ok(render_tone(note, duration, decay, amplitude, sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    const RATE: u32 = 44100;

    #[test]
    fn test_length_matches_duration() {
        for duration in [0.0, 0.001, 0.01, 0.25, 1.0, 2.5] {
            let wave = note_wave("A4", duration, 0.5, 0.25, RATE).unwrap();
            assert_eq!(wave.len(), (duration as f64 * RATE as f64).round() as usize);
        }
    }

    #[test]
    fn test_short_note_skips_fades() {
        let wave = note_wave("C5", 0.004, 0.5, 0.5, RATE).unwrap();
        assert_eq!(wave.len(), 176);

        // Unfaded: the sample equals the raw formula
        let f = note_freq_hz("C5");
        let t = 100.0 / RATE as f64;
        let expected = (0.5 * (2.0 * PI * f * t).sin() * (-0.5 * t).exp()) as f32;
        assert_eq!(wave[100], expected);
    }

    #[test]
    fn test_fades_reach_zero() {
        let wave = note_wave("A4", 0.5, 0.5, 1.0, RATE).unwrap();
        assert_eq!(wave[0], 0.0);
        assert_eq!(*wave.last().unwrap(), 0.0);
        assert!(wave.iter().all(|s| s.abs() <= 1.0));
    }

    #[test]
    fn test_deterministic() {
        let a = note_wave("F#3", 0.2, 0.3, 0.4, RATE).unwrap();
        let b = note_wave("F#3", 0.2, 0.3, 0.4, RATE).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_decay_shrinks_amplitude() {
        let wave = note_wave("A4", 2.0, 1.0, 1.0, RATE).unwrap();
        let peak = |range: std::ops::Range<usize>| {
            wave[range].iter().fold(0.0f32, |max, s| max.max(s.abs()))
        };
        assert!(peak(1000..2000) > peak(80000..81000));
    }

    #[test]
    fn test_invalid_note_rejected() {
        assert!(matches!(
            note_wave("Q4", 1.0, 0.5, 0.25, RATE),
            Err(Error::InvalidNote(_))
        ));
    }

    fn note_freq_hz(name: &str) -> f64 {
        crate::core::oscillator::note_freq(name).unwrap()
    }
}
