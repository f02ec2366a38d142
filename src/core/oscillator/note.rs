use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Pitch class names in semitone order starting at C
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Concert pitch reference
pub const A4_FREQ: f64 = 440.0;

const A_PITCH_CLASS: i32 = 9;
const A4_OCTAVE: i32 = 4;

/// A pitch and octave, e.g. `C#4`.
///
/// Field order gives the derived `Ord` (octave, semitone) ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Note {
    octave: i8,
    pitch_class: u8,
}

impl Note {
    /// Build a note from a pitch class (wrapped into 0..12) and octave
    pub fn new(pitch_class: u8, octave: i8) -> Self {
        Self {
            octave,
            pitch_class: pitch_class % 12,
        }
    }

    pub fn octave(&self) -> i8 {
        self.octave
    }

    /// Letter portion of the name (`C`, `C#`, ...)
    pub fn name(&self) -> &'static str {
        NOTE_NAMES[self.pitch_class as usize]
    }

    pub fn is_sharp(&self) -> bool {
        self.name().ends_with('#')
    }

    /// Signed semitone distance from A4
    pub fn semitones_from_a4(&self) -> i32 {
        self.pitch_class as i32 - A_PITCH_CLASS + 12 * (self.octave as i32 - A4_OCTAVE)
    }

    /// Equal-tempered fundamental in Hz
    pub fn frequency(&self) -> f64 {
        A4_FREQ * 2.0f64.powf(self.semitones_from_a4() as f64 / 12.0)
    }

    /// Same letter, octave moved by `octaves`
    pub fn shift_octaves(&self, octaves: i8) -> Self {
        Self {
            octave: self.octave.saturating_add(octaves),
            pitch_class: self.pitch_class,
        }
    }

    /// Move by a number of semitones, carrying into the octave
    pub fn transpose(&self, semitones: i32) -> Self {
        let absolute = self.octave as i32 * 12 + self.pitch_class as i32 + semitones;
        Self {
            octave: absolute.div_euclid(12) as i8,
            pitch_class: absolute.rem_euclid(12) as u8,
        }
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name(), self.octave)
    }
}

impl FromStr for Note {
    type Err = Error;

    /// Parses `<letter>[#]<octave>`; the octave may have several digits so
    /// anything `Display` prints above B9 reads back.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidNote(s.to_string());
        let s_trimmed = s.trim();

        let split = s_trimmed
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(invalid)?;
        let (name, digits) = s_trimmed.split_at(split);
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let octave: i8 = digits.parse().map_err(|_| invalid())?;

        let pitch_class = NOTE_NAMES
            .iter()
            .position(|n| *n == name)
            .ok_or_else(invalid)?;

        Ok(Self::new(pitch_class as u8, octave))
    }
}

impl TryFrom<String> for Note {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Note> for String {
    fn from(note: Note) -> Self {
        note.to_string()
    }
}

/// Frequency in Hz for a note name such as `"A4"` or `"C#3"`
pub fn note_freq(note: &str) -> Result<f64> {
    Ok(note.parse::<Note>()?.frequency())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_a4_is_concert_pitch() {
        assert_eq!(note_freq("A4").unwrap(), 440.0);
        assert!((note_freq("A3").unwrap() - 220.0).abs() < 1e-9);
        assert!((note_freq("C4").unwrap() - 261.6255653).abs() < 1e-6);
    }

    #[test]
    fn test_frequency_is_monotonic() {
        let mut previous = 0.0;
        for octave in 0..=9 {
            for name in NOTE_NAMES {
                let freq = note_freq(&format!("{}{}", name, octave)).unwrap();
                assert!(freq > previous, "{}{} not above previous", name, octave);
                previous = freq;
            }
        }
    }

    #[test]
    fn test_invalid_notes() {
        for bad in ["", "4", "H4", "Db4", "C", "C#", "C#x", "c4", "C10x", "C4#", "C999"] {
            match note_freq(bad) {
                Err(Error::InvalidNote(name)) => assert_eq!(name, bad),
                other => panic!("expected InvalidNote for {:?}, got {:?}", bad, other),
            }
        }
    }

    #[test]
    fn test_display_round_trip() {
        let note: Note = "C#4".parse().unwrap();
        assert_eq!(note.name(), "C#");
        assert_eq!(note.octave(), 4);
        assert!(note.is_sharp());
        assert_eq!(note.to_string(), "C#4");
    }

    #[test]
    fn test_transpose_carries_octave() {
        let b3: Note = "B3".parse().unwrap();
        assert_eq!(b3.transpose(1).to_string(), "C4");
        assert_eq!(b3.transpose(-12).to_string(), "B2");
        assert_eq!(b3.shift_octaves(2).to_string(), "B5");
    }

    #[test]
    fn test_high_octaves_read_back() {
        let c10: Note = "C#10".parse().unwrap();
        assert_eq!(c10.octave(), 10);
        assert_eq!(c10.to_string(), "C#10");

        let b9: Note = "B9".parse().unwrap();
        let carried = b9.transpose(4);
        assert_eq!(carried.to_string().parse::<Note>().unwrap(), carried);
        assert!(carried.frequency() > b9.frequency());
    }

    #[test]
    fn test_serde_as_string() {
        let note: Note = serde_json::from_str("\"G#2\"").unwrap();
        assert_eq!(note, Note::new(8, 2));
        assert_eq!(serde_json::to_string(&note).unwrap(), "\"G#2\"");
        assert!(serde_json::from_str::<Note>("\"X2\"").is_err());
    }
}
