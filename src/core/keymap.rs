//! Computer key to note mapping with octave shifting
//!
//! Every key is bound to a note in a base table written at a fixed reference
//! octave. The live table is always re-derived from the base table, so any
//! sequence of shifts that returns to the same window gives the same map.

use std::collections::BTreeMap;

use crate::core::oscillator::Note;

/// Octave the base table is written in
pub const REFERENCE_OCTAVE: i8 = 2;

/// Lowest allowed `min_octave`
pub const MIN_OCTAVE_FLOOR: i8 = 1;

/// The window's top octave must stay below this
pub const OCTAVE_CEILING: i8 = 8;

/// Visible range of octaves: `min_octave .. min_octave + num_octaves`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OctaveWindow {
    min_octave: i8,
    num_octaves: i8,
}

impl OctaveWindow {
    pub fn new(min_octave: i8, num_octaves: i8) -> Self {
        let num_octaves = num_octaves.clamp(1, OCTAVE_CEILING - MIN_OCTAVE_FLOOR);
        let min_octave = min_octave.clamp(MIN_OCTAVE_FLOOR, OCTAVE_CEILING - num_octaves);
        Self { min_octave, num_octaves }
    }

    pub fn min_octave(&self) -> i8 {
        self.min_octave
    }

    pub fn num_octaves(&self) -> i8 {
        self.num_octaves
    }

    /// Move the window by one octave. Returns false at either limit.
    pub fn shift(&mut self, up: bool) -> bool {
        if up {
            if self.min_octave + self.num_octaves < OCTAVE_CEILING {
                self.min_octave += 1;
                return true;
            }
        } else if self.min_octave > MIN_OCTAVE_FLOOR {
            self.min_octave -= 1;
            return true;
        }
        false
    }

    /// C of the lowest visible octave
    pub fn lowest_note(&self) -> Note {
        Note::new(0, self.min_octave)
    }

    /// B of the highest visible octave
    pub fn highest_note(&self) -> Note {
        Note::new(11, self.min_octave + self.num_octaves - 1)
    }

    /// (lowest Hz, highest Hz) for display
    pub fn frequency_range(&self) -> (f64, f64) {
        (self.lowest_note().frequency(), self.highest_note().frequency())
    }

    /// Every note in the window, low to high
    pub fn notes(&self) -> Vec<Note> {
        (self.min_octave..self.min_octave + self.num_octaves)
            .flat_map(|octave| (0..12).map(move |pc| Note::new(pc, octave)))
            .collect()
    }
}

impl Default for OctaveWindow {
    fn default() -> Self {
        Self::new(3, 4)
    }
}

/// Key bindings shifted to follow the octave window
#[derive(Debug, Clone)]
pub struct KeyMap {
    base: BTreeMap<char, Note>,
    derived: BTreeMap<char, Note>,
}

impl KeyMap {
    pub fn new(base: BTreeMap<char, Note>, min_octave: i8) -> Self {
        let derived = derive(&base, min_octave);
        Self { base, derived }
    }

    /// German layout, white keys on the home row, black keys above
    ///
    /// ```text
    ///  w     r t     u i o     ü +
    /// a s   d f g   h j k l   ö ä #
    /// A2 B2 C3 D3 E3 F3 G3 A3 B3 C4 D4 E4
    /// ```
    pub fn german(min_octave: i8) -> Self {
        let table = [
            ('a', "A2"), ('s', "B2"), ('d', "C3"), ('f', "D3"), ('g', "E3"),
            ('h', "F3"), ('j', "G3"), ('k', "A3"), ('l', "B3"), ('ö', "C4"),
            ('ä', "D4"), ('#', "E4"),
            ('w', "A#2"), ('r', "C#3"), ('t', "D#3"), ('u', "F#3"), ('i', "G#3"),
            ('o', "A#3"), ('ü', "C#4"), ('+', "D#4"),
        ];
        let base = table
            .iter()
            .filter_map(|(key, name)| name.parse().ok().map(|note| (*key, note)))
            .collect();
        Self::new(base, min_octave)
    }

    /// Rebuild the live table for a new window from the base table
    pub fn remap(&mut self, min_octave: i8) {
        self.derived = derive(&self.base, min_octave);
    }

    pub fn note_for_key(&self, key: char) -> Option<Note> {
        self.derived.get(&key).copied()
    }

    pub fn entries(&self) -> &BTreeMap<char, Note> {
        &self.derived
    }
}

fn derive(base: &BTreeMap<char, Note>, min_octave: i8) -> BTreeMap<char, Note> {
    let shift = min_octave - REFERENCE_OCTAVE;
    base.iter()
        .map(|(key, note)| (*key, note.shift_octaves(shift)))
        .collect()
}

/// Keys currently held, with the note each one started.
///
/// Releasing a key stops the note it played even if the window moved since.
#[derive(Debug, Default)]
pub struct HeldKeys {
    held: BTreeMap<char, Note>,
}

impl HeldKeys {
    /// Note to play for a fresh press; None for repeats and unmapped keys
    pub fn press(&mut self, key: char, map: &KeyMap) -> Option<Note> {
        if self.held.contains_key(&key) {
            return None;
        }
        let note = map.note_for_key(key)?;
        self.held.insert(key, note);
        Some(note)
    }

    /// Note to stop for a release
    pub fn release(&mut self, key: char) -> Option<Note> {
        self.held.remove(&key)
    }
}
