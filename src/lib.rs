//! synth-piano - polyphonic sine synthesizer
//!
//! Notes are rendered as decaying sine buffers and mixed by a real-time audio
//! callback. On top of the engine sit chord slots, a computer-key map that
//! follows a movable octave window, and timed playback of JSON scores.
//!
//! ```no_run
//! use synth_piano::core::synth::params::ParamSnapshot;
//! use synth_piano::Synth;
//!
//! let synth = Synth::new(44100, ParamSnapshot::default());
//! synth.play("A4")?;
//!
//! // What the audio callback does for every block
//! let mut block = vec![0.0f32; 512];
//! synth.render(&mut block);
//!
//! synth.stop("A4")?;
//! # Ok::<(), synth_piano::Error>(())
//! ```

pub mod app;
pub mod config;
pub mod core;
pub mod error;
pub mod messaging;
pub mod utils;

pub use app::PianoApp;
pub use config::Settings;
pub use crate::core::chord::{get_chord_notes, ChordQuality, ChordSelection};
pub use crate::core::oscillator::{note_freq, note_wave, Note};
pub use crate::core::score::{Score, ScoreEvent, Sound};
pub use crate::core::Synth;
pub use error::{Error, Result};
