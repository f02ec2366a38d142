pub mod audio;
pub mod params;

use log::debug;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::core::oscillator::{render_tone, Note};
use crate::core::voice::{Voice, VoiceState};
use crate::error::Result;
use params::{ParamSnapshot, SynthParams};

/// Default output sample rate when no device dictates one
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Main synthesizer engine.
///
/// Holds the registry of sounding notes. Trigger calls and the audio callback
/// share it through one mutex; nothing inside that lock renders audio, so
/// the callback only ever waits for slicing and summing work.
pub struct Synth {
    sample_rate: u32,
    params: SynthParams,
    voices: Mutex<HashMap<Note, Voice>>,
    dropped_voices: AtomicUsize,
}

impl Synth {
    /// Create a new synthesizer instance
    pub fn new(sample_rate: u32, initial: ParamSnapshot) -> Self {
        Synth {
            sample_rate,
            params: SynthParams::new(initial),
            voices: Mutex::new(HashMap::new()),
            dropped_voices: AtomicUsize::new(0),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn params(&self) -> &SynthParams {
        &self.params
    }

    // A panic elsewhere must not silence the engine, so poisoning is ignored
    fn voices(&self) -> MutexGuard<'_, HashMap<Note, Voice>> {
        self.voices.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Start (or restart) a note by name
    pub fn play(&self, note: &str) -> Result<Note> {
        let note: Note = note.parse()?;
        self.play_note(note);
        Ok(note)
    }

    /// Render a fresh full-length buffer with the current parameters and
    /// replace whatever the registry held for `note`.
    pub fn play_note(&self, note: Note) {
        let snap = self.params.snapshot();
        let samples = render_tone(note, snap.duration, snap.decay, snap.amplitude, self.sample_rate);
        debug!("play {} ({} samples)", note, samples.len());

        let voice = Voice::new(samples);
        self.voices().insert(note, voice);
    }

    /// Release a note by name; unknown but well-formed notes are a no-op
    pub fn stop(&self, note: &str) -> Result<bool> {
        let note: Note = note.parse()?;
        Ok(self.stop_note(note))
    }

    /// Cut the note's remaining buffer to a short fading tail.
    ///
    /// Returns whether the note was sounding.
    pub fn stop_note(&self, note: Note) -> bool {
        let fade_len = self.release_len();
        let mut voices = self.voices();
        let Some(voice) = voices.get_mut(&note) else {
            return false;
        };
        voice.release(fade_len);
        if !voice.is_active() {
            voices.remove(&note);
        }
        debug!("stop {}", note);
        true
    }

    /// Release every sounding note
    pub fn release_all(&self) {
        let fade_len = self.release_len();
        let mut voices = self.voices();
        for voice in voices.values_mut() {
            voice.release(fade_len);
        }
        voices.retain(|_, v| v.is_active());
    }

    fn release_len(&self) -> usize {
        (self.params.release() as f64 * self.sample_rate as f64) as usize
    }

    pub fn is_sounding(&self, note: Note) -> bool {
        self.voices().contains_key(&note)
    }

    pub fn voice_state(&self, note: Note) -> Option<VoiceState> {
        self.voices().get(&note).map(|v| v.state())
    }

    /// Samples left for `note`, if it is in the registry
    pub fn remaining_len(&self, note: Note) -> Option<usize> {
        self.voices().get(&note).map(|v| v.remaining_len())
    }

    /// Copy of the samples left for `note`
    pub fn remaining_samples(&self, note: Note) -> Option<Vec<f32>> {
        self.voices().get(&note).map(|v| v.remaining_samples())
    }

    /// Sorted list of notes currently in the registry
    pub fn active_notes(&self) -> Vec<Note> {
        let mut notes: Vec<Note> = self.voices().keys().copied().collect();
        notes.sort();
        notes
    }

    pub fn voice_count(&self) -> usize {
        self.voices().len()
    }

    /// Total voices discarded by the mixer because of corrupt samples
    pub fn dropped_voices(&self) -> usize {
        self.dropped_voices.load(Ordering::Relaxed)
    }

    #[cfg(test)]
    pub(crate) fn insert_voice(&self, note: Note, samples: Vec<f32>) {
        self.voices().insert(note, Voice::new(samples));
    }
}

impl Default for Synth {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE, ParamSnapshot::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::oscillator::buffer_len;
    use crate::error::Error;

    const RATE: u32 = 8000;

    fn test_synth() -> Synth {
        Synth::new(
            RATE,
            ParamSnapshot { amplitude: 0.5, decay: 0.5, duration: 1.0, release: 0.1 },
        )
    }

    fn note(name: &str) -> Note {
        name.parse().unwrap()
    }

    #[test]
    fn test_play_inserts_full_buffer() {
        let synth = test_synth();
        synth.play("A4").unwrap();
        assert!(synth.is_sounding(note("A4")));
        assert_eq!(synth.remaining_len(note("A4")), Some(buffer_len(1.0, RATE)));
        assert_eq!(synth.voice_state(note("A4")), Some(VoiceState::Sounding));
    }

    #[test]
    fn test_invalid_note_leaves_registry_untouched() {
        let synth = test_synth();
        assert!(matches!(synth.play("X9"), Err(Error::InvalidNote(_))));
        assert!(matches!(synth.stop("X9"), Err(Error::InvalidNote(_))));
        assert_eq!(synth.voice_count(), 0);
    }

    #[test]
    fn test_replay_overwrites() {
        let synth = test_synth();
        synth.play("C4").unwrap();
        let mut out = vec![0.0; 100];
        synth.render(&mut out);
        assert_eq!(synth.remaining_len(note("C4")), Some(RATE as usize - 100));

        synth.play("C4").unwrap();
        assert_eq!(synth.voice_count(), 1);
        assert_eq!(synth.remaining_len(note("C4")), Some(RATE as usize));
    }

    #[test]
    fn test_stop_releases_with_ramp() {
        let synth = test_synth();
        synth.play("A4").unwrap();
        assert!(synth.stop("A4").unwrap());

        let tail = synth.remaining_samples(note("A4")).unwrap();
        assert_eq!(tail.len(), 800);
        assert_eq!(*tail.last().unwrap(), 0.0);
        assert_eq!(synth.voice_state(note("A4")), Some(VoiceState::Releasing));
    }

    #[test]
    fn test_stop_clamps_to_remaining() {
        let synth = test_synth();
        synth.play("A4").unwrap();
        let mut out = vec![0.0; RATE as usize - 50];
        synth.render(&mut out);
        synth.stop("A4").unwrap();
        assert_eq!(synth.remaining_len(note("A4")), Some(50));
    }

    #[test]
    fn test_stop_absent_is_noop() {
        let synth = test_synth();
        assert!(!synth.stop("B2").unwrap());
        assert_eq!(synth.voice_count(), 0);
    }

    #[test]
    fn test_release_uses_current_parameter() {
        let synth = test_synth();
        synth.play("E4").unwrap();
        synth.params().set_release(0.5);
        synth.stop("E4").unwrap();
        assert_eq!(synth.remaining_len(note("E4")), Some(4000));
    }

    #[test]
    fn test_parameter_change_does_not_touch_active_notes() {
        let synth = test_synth();
        synth.play("E4").unwrap();
        let before = synth.remaining_samples(note("E4")).unwrap();
        synth.params().set_amplitude(1.0);
        synth.params().set_duration(2.0);
        assert_eq!(synth.remaining_samples(note("E4")).unwrap(), before);

        synth.play("G4").unwrap();
        assert_eq!(synth.remaining_len(note("G4")), Some(2 * RATE as usize));
    }

    #[test]
    fn test_release_all() {
        let synth = test_synth();
        synth.play("C4").unwrap();
        synth.play("E4").unwrap();
        synth.release_all();
        assert_eq!(synth.active_notes(), vec![note("C4"), note("E4")]);
        assert!(synth.active_notes().iter().all(|n| synth.remaining_len(*n) == Some(800)));
    }
}
