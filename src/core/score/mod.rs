//! JSON scores: ordered note/rest steps with durations
//!
//! ```json
//! [
//!   {"notes": ["C4", "E4", "G4"], "duration": 1.0},
//!   {"note": "rest", "duration": 0.5},
//!   {"note": "A4"}
//! ]
//! ```
//!
//! `notes` wins over `note`, `duration` defaults to half a second and the
//! token `"rest"` is silence. Records are normalized when the score is loaded.

pub mod player;
pub mod render;

use log::info;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::core::oscillator::Note;
use crate::error::{Error, Result};

pub use player::{CancelToken, NoteSink, PlaybackHandle, PlaybackOutcome, ScorePlayer};
pub use render::{render_score, write_wav};

/// Token marking silence in a score
pub const REST: &str = "rest";

/// Step length when a record has no `duration`
pub const DEFAULT_STEP_SECONDS: f64 = 0.5;

/// What a score step sounds
#[derive(Debug, Clone, PartialEq)]
pub enum Sound {
    Notes(Vec<Note>),
    Rest,
}

/// One timed step of a score
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreEvent {
    pub sound: Sound,
    pub duration: Duration,
}

impl ScoreEvent {
    /// Notes to trigger; empty for a rest
    pub fn notes(&self) -> &[Note] {
        match &self.sound {
            Sound::Notes(notes) => notes,
            Sound::Rest => &[],
        }
    }

    pub fn is_rest(&self) -> bool {
        matches!(self.sound, Sound::Rest)
    }
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(default)]
    notes: Option<Vec<String>>,
    #[serde(default)]
    note: Option<String>,
    #[serde(default)]
    duration: Option<serde_json::Value>,
}

impl RawRecord {
    fn normalize(self, index: usize) -> Result<ScoreEvent> {
        let names = match (self.notes, self.note) {
            (Some(notes), _) if !notes.is_empty() => notes,
            (_, Some(note)) => vec![note],
            _ => {
                return Err(Error::ScoreFormat(format!(
                    "record {}: needs \"notes\" or \"note\"",
                    index
                )))
            }
        };

        let notes = names
            .iter()
            .filter(|name| name.as_str() != REST)
            .map(|name| name.parse())
            .collect::<Result<Vec<Note>>>()?;

        let sound = if notes.is_empty() {
            Sound::Rest
        } else {
            Sound::Notes(notes)
        };

        Ok(ScoreEvent {
            sound,
            duration: parse_duration(self.duration, index)?,
        })
    }
}

fn parse_duration(value: Option<serde_json::Value>, index: usize) -> Result<Duration> {
    let seconds = match value {
        None | Some(serde_json::Value::Null) => DEFAULT_STEP_SECONDS,
        Some(serde_json::Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(serde_json::Value::String(s)) => s.trim().parse().unwrap_or(f64::NAN),
        Some(other) => {
            return Err(Error::ScoreFormat(format!(
                "record {}: unparsable duration {}",
                index, other
            )))
        }
    };
    Duration::try_from_secs_f64(seconds).map_err(|_| {
        Error::ScoreFormat(format!("record {}: invalid duration {}", index, seconds))
    })
}

/// A fully validated score
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Score {
    events: Vec<ScoreEvent>,
}

impl Score {
    pub fn new(events: Vec<ScoreEvent>) -> Self {
        Self { events }
    }

    /// Parse a JSON array of records
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let serde_json::Value::Array(items) = value else {
            return Err(Error::ScoreFormat("score must be a JSON array".to_string()));
        };

        let events = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                let record: RawRecord = serde_json::from_value(item).map_err(|e| {
                    Error::ScoreFormat(format!("record {}: {}", index, e))
                })?;
                record.normalize(index)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { events })
    }

    /// Read and parse a score file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let score = Self::from_json(&contents)?;
        info!(
            "Loaded score {} ({} events, {:.1} s)",
            path.display(),
            score.len(),
            score.total_duration().as_secs_f64()
        );
        Ok(score)
    }

    pub fn events(&self) -> &[ScoreEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn total_duration(&self) -> Duration {
        self.events.iter().map(|e| e.duration).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn note(name: &str) -> Note {
        name.parse().unwrap()
    }

    #[test]
    fn test_normalizes_records() {
        let score = Score::from_json(
            r#"[
                {"notes": ["C4", "E4"], "duration": 0.1},
                {"note": "rest", "duration": 0.2},
                {"note": "A4"},
                {"notes": ["G4", "rest"], "note": "B4", "duration": 1}
            ]"#,
        )
        .unwrap();

        assert_eq!(score.len(), 4);
        let events = score.events();
        assert_eq!(events[0].sound, Sound::Notes(vec![note("C4"), note("E4")]));
        assert_eq!(events[0].duration, Duration::from_millis(100));
        assert!(events[1].is_rest());
        assert!(events[1].notes().is_empty());
        assert_eq!(events[2].notes(), &[note("A4")]);
        assert_eq!(events[2].duration, Duration::from_millis(500));
        assert_eq!(events[3].notes(), &[note("G4")]);
        assert_eq!(score.total_duration(), Duration::from_millis(1800));
    }

    #[test]
    fn test_empty_notes_falls_back_to_note() {
        let score = Score::from_json(r#"[{"notes": [], "note": "D3"}]"#).unwrap();
        assert_eq!(score.events()[0].notes(), &[note("D3")]);
    }

    #[test]
    fn test_string_duration() {
        let score = Score::from_json(r#"[{"note": "D3", "duration": "0.25"}]"#).unwrap();
        assert_eq!(score.events()[0].duration, Duration::from_millis(250));
    }

    #[test]
    fn test_format_errors() {
        let cases = [
            r#"{"note": "C4"}"#,
            r#"[{"duration": 1.0}]"#,
            r#"[{"note": "C4", "duration": "slow"}]"#,
            r#"[{"note": "C4", "duration": -1}]"#,
            r#"[{"note": "C4", "duration": [1]}]"#,
            r#"[{"notes": "C4"}]"#,
            r#"[42]"#,
        ];
        for json in cases {
            assert!(
                matches!(Score::from_json(json), Err(Error::ScoreFormat(_))),
                "expected ScoreFormat for {}",
                json
            );
        }
    }

    #[test]
    fn test_invalid_note_in_score() {
        assert!(matches!(
            Score::from_json(r#"[{"note": "C4"}, {"note": "H2"}]"#),
            Err(Error::InvalidNote(_))
        ));
    }

    #[test]
    fn test_broken_json() {
        assert!(matches!(Score::from_json("[{"), Err(Error::Json(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"notes": ["C4"], "duration": 0.1}}]"#).unwrap();
        let score = Score::load(file.path()).unwrap();
        assert_eq!(score.len(), 1);

        let missing = file.path().with_extension("missing");
        assert!(matches!(Score::load(&missing), Err(Error::Io(_))));
    }
}
