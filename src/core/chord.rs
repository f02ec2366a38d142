//! Chord slots: root + quality selections that play and release together

use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::core::oscillator::Note;
use crate::core::synth::Synth;
use crate::error::{Error, Result};

/// Number of chord trigger slots
pub const CHORD_SLOTS: usize = 11;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChordQuality {
    Major,
    Minor,
}

impl ChordQuality {
    /// Semitone offsets from the root
    pub fn intervals(&self) -> [i32; 3] {
        match self {
            ChordQuality::Major => [0, 4, 7],
            ChordQuality::Minor => [0, 3, 7],
        }
    }
}

impl fmt::Display for ChordQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChordQuality::Major => write!(f, "major"),
            ChordQuality::Minor => write!(f, "minor"),
        }
    }
}

impl FromStr for ChordQuality {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "major" | "maj" => Ok(ChordQuality::Major),
            "minor" | "min" | "m" => Ok(ChordQuality::Minor),
            other => Err(Error::InvalidChord(format!("unknown quality {:?}", other))),
        }
    }
}

/// Triad on `root`, octave carried past B
pub fn chord_notes(root: Note, quality: ChordQuality) -> [Note; 3] {
    quality.intervals().map(|interval| root.transpose(interval))
}

/// Triad note names for a root name such as `"A3"`
pub fn get_chord_notes(root: &str, quality: ChordQuality) -> Result<[Note; 3]> {
    Ok(chord_notes(root.parse()?, quality))
}

/// What a slot plays, written as `"<root> <quality>"` e.g. `"A3 minor"`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChordSelection {
    pub root: Note,
    pub quality: ChordQuality,
}

impl ChordSelection {
    pub fn new(root: Note, quality: ChordQuality) -> Self {
        Self { root, quality }
    }

    pub fn notes(&self) -> [Note; 3] {
        chord_notes(self.root, self.quality)
    }

    /// Selectable roots (A3 up to A4) crossed with both qualities
    pub fn options() -> Vec<ChordSelection> {
        let a3 = Note::new(9, 3);
        (0..=12)
            .flat_map(|step| {
                let root = a3.transpose(step);
                [ChordQuality::Major, ChordQuality::Minor]
                    .map(|quality| ChordSelection::new(root, quality))
            })
            .collect()
    }

    /// Initial selection for every slot, cycling through `options()`
    pub fn defaults() -> Vec<ChordSelection> {
        let options = Self::options();
        (0..CHORD_SLOTS).map(|i| options[i % options.len()]).collect()
    }
}

impl fmt::Display for ChordSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.root, self.quality)
    }
}

impl FromStr for ChordSelection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split_whitespace();
        let (Some(root), Some(quality), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(Error::InvalidChord(format!("expected \"<root> <quality>\", got {:?}", s)));
        };
        Ok(Self::new(root.parse()?, quality.parse()?))
    }
}

impl TryFrom<String> for ChordSelection {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ChordSelection> for String {
    fn from(selection: ChordSelection) -> Self {
        selection.to_string()
    }
}

#[derive(Debug, Clone)]
struct Slot {
    selection: ChordSelection,
    sounding: Vec<Note>,
}

/// Fixed set of chord slots driving a shared synth.
///
/// The slot lock is always taken before the synth's registry lock.
pub struct ChordBank {
    synth: Arc<Synth>,
    slots: Mutex<Vec<Slot>>,
}

impl ChordBank {
    pub fn new(synth: Arc<Synth>, selections: &[ChordSelection]) -> Self {
        let defaults = ChordSelection::defaults();
        let slots = (0..CHORD_SLOTS)
            .map(|i| Slot {
                selection: selections.get(i).copied().unwrap_or(defaults[i]),
                sounding: Vec::new(),
            })
            .collect();
        Self {
            synth,
            slots: Mutex::new(slots),
        }
    }

    fn slots(&self) -> MutexGuard<'_, Vec<Slot>> {
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn selections(&self) -> Vec<ChordSelection> {
        self.slots().iter().map(|s| s.selection).collect()
    }

    /// Change what a slot will play next; notes already sounding keep their
    /// recorded list so the next `stop_chord` still releases them.
    pub fn set_selection(&self, slot: usize, selection: ChordSelection) -> Result<()> {
        let mut slots = self.slots();
        let entry = slots.get_mut(slot).ok_or(Error::InvalidSlot(slot))?;
        entry.selection = selection;
        Ok(())
    }

    /// Play the slot's chord and remember its notes
    pub fn play_chord(&self, slot: usize) -> Result<Vec<Note>> {
        let mut slots = self.slots();
        let entry = slots.get_mut(slot).ok_or(Error::InvalidSlot(slot))?;

        for note in entry.sounding.drain(..) {
            self.synth.stop_note(note);
        }

        let notes = entry.selection.notes();
        for note in notes {
            self.synth.play_note(note);
        }
        entry.sounding = notes.to_vec();
        debug!("chord slot {} on: {}", slot, entry.selection);
        Ok(entry.sounding.clone())
    }

    /// Release the slot's recorded notes; an idle slot is a no-op
    pub fn stop_chord(&self, slot: usize) -> Result<()> {
        let mut slots = self.slots();
        let entry = slots.get_mut(slot).ok_or(Error::InvalidSlot(slot))?;
        if entry.sounding.is_empty() {
            return Ok(());
        }
        for note in entry.sounding.drain(..) {
            self.synth.stop_note(note);
        }
        debug!("chord slot {} off", slot);
        Ok(())
    }

    /// Notes the slot currently owns
    pub fn sounding(&self, slot: usize) -> Result<Vec<Note>> {
        self.slots()
            .get(slot)
            .map(|s| s.sounding.clone())
            .ok_or(Error::InvalidSlot(slot))
    }
}
