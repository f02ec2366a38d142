pub mod chord;
pub mod keymap;
pub mod oscillator;
pub mod score;
pub mod synth;
pub mod voice;

pub use synth::Synth;
