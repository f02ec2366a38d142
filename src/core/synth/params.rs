use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};

pub const AMPLITUDE_RANGE: (f32, f32) = (0.0, 1.0);
pub const DECAY_RANGE: (f32, f32) = (0.01, 1.0);
pub const DURATION_RANGE: (f32, f32) = (1.0, 20.0);
pub const RELEASE_RANGE: (f32, f32) = (0.1, 5.0);

/// Plain copy of the synthesis parameters taken when a note is rendered
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamSnapshot {
    /// Peak amplitude of a freshly rendered note
    pub amplitude: f32,
    /// Exponential decay rate per second
    pub decay: f32,
    /// Rendered note length in seconds
    pub duration: f32,
    /// Fade-out length applied on note release, in seconds
    pub release: f32,
}

impl Default for ParamSnapshot {
    fn default() -> Self {
        Self {
            amplitude: 0.25,
            decay: 0.5,
            duration: 10.0,
            release: 0.1,
        }
    }
}

impl ParamSnapshot {
    /// Clamp every field into its control range
    pub fn clamped(self) -> Self {
        Self {
            amplitude: clamp(self.amplitude, AMPLITUDE_RANGE),
            decay: clamp(self.decay, DECAY_RANGE),
            duration: clamp(self.duration, DURATION_RANGE),
            release: clamp(self.release, RELEASE_RANGE),
        }
    }
}

fn clamp(value: f32, (min, max): (f32, f32)) -> f32 {
    if value.is_nan() {
        return min;
    }
    value.clamp(min, max)
}

/// f32 stored as raw bits so it can be shared without a lock
#[derive(Debug)]
struct AtomicF32(AtomicU32);

impl AtomicF32 {
    fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed)
    }
}

/// Live synthesis parameters shared between the control side and note rendering.
///
/// Each field is read independently; a snapshot taken during a concurrent
/// update may mix old and new values, which only affects the next note.
#[derive(Debug)]
pub struct SynthParams {
    amplitude: AtomicF32,
    decay: AtomicF32,
    duration: AtomicF32,
    release: AtomicF32,
}

impl SynthParams {
    pub fn new(initial: ParamSnapshot) -> Self {
        let initial = initial.clamped();
        Self {
            amplitude: AtomicF32::new(initial.amplitude),
            decay: AtomicF32::new(initial.decay),
            duration: AtomicF32::new(initial.duration),
            release: AtomicF32::new(initial.release),
        }
    }

    pub fn snapshot(&self) -> ParamSnapshot {
        ParamSnapshot {
            amplitude: self.amplitude.load(),
            decay: self.decay.load(),
            duration: self.duration.load(),
            release: self.release.load(),
        }
    }

    pub fn release(&self) -> f32 {
        self.release.load()
    }

    pub fn set_amplitude(&self, value: f32) {
        self.amplitude.store(clamp(value, AMPLITUDE_RANGE));
    }

    pub fn set_decay(&self, value: f32) {
        self.decay.store(clamp(value, DECAY_RANGE));
    }

    pub fn set_duration(&self, value: f32) {
        self.duration.store(clamp(value, DURATION_RANGE));
    }

    pub fn set_release(&self, value: f32) {
        self.release.store(clamp(value, RELEASE_RANGE));
    }

    /// Replace all four values
    pub fn apply(&self, snapshot: ParamSnapshot) {
        self.set_amplitude(snapshot.amplitude);
        self.set_decay(snapshot.decay);
        self.set_duration(snapshot.duration);
        self.set_release(snapshot.release);
    }
}

impl Default for SynthParams {
    fn default() -> Self {
        Self::new(ParamSnapshot::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = SynthParams::default();
        assert_eq!(params.snapshot(), ParamSnapshot::default());
        assert_eq!(params.release(), 0.1);
    }

    #[test]
    fn test_setters_clamp() {
        let params = SynthParams::default();
        params.set_amplitude(3.0);
        params.set_decay(0.0);
        params.set_duration(0.5);
        params.set_release(f32::NAN);
        let snap = params.snapshot();
        assert_eq!(snap.amplitude, 1.0);
        assert_eq!(snap.decay, 0.01);
        assert_eq!(snap.duration, 1.0);
        assert_eq!(snap.release, 0.1);
    }

    #[test]
    fn test_apply_and_serde() {
        let params = SynthParams::default();
        let wanted = ParamSnapshot { amplitude: 0.5, decay: 0.2, duration: 4.0, release: 1.5 };
        params.apply(wanted);
        assert_eq!(params.snapshot(), wanted);

        let json = serde_json::to_string(&wanted).unwrap();
        let back: ParamSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, wanted);

        // Missing fields fall back to defaults
        let partial: ParamSnapshot = serde_json::from_str(r#"{"amplitude":0.7}"#).unwrap();
        assert_eq!(partial.amplitude, 0.7);
        assert_eq!(partial.duration, 10.0);
    }
}
