mod envelope;
mod note;
mod waveform;

// Re-export key types so they're accessible from core::oscillator
pub use self::envelope::{apply_edge_fades, edge_fade_len, ramp_value, EDGE_FADE_SECONDS};
pub use self::note::{note_freq, Note, A4_FREQ, NOTE_NAMES};
pub use self::waveform::{buffer_len, note_wave, render_tone};
