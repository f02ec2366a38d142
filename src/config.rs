use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use crate::core::chord::ChordSelection;
use crate::core::synth::params::ParamSnapshot;

const APP_DIR: &str = "synth-piano";
const SETTINGS_FILE: &str = "settings.json";

/// Persisted application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Synthesis parameters restored at startup
    pub params: ParamSnapshot,
    /// Lowest visible octave
    pub min_octave: i8,
    /// Number of visible octaves
    pub num_octaves: i8,
    /// Chord slot selections, one per slot
    pub chord_selections: Vec<ChordSelection>,
    /// Fixed audio callback size in frames; device default when unset
    pub frame_size: Option<u32>,
    /// Score loaded in the previous session
    pub last_score: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            params: ParamSnapshot::default(),
            min_octave: 3,
            num_octaves: 4,
            chord_selections: ChordSelection::defaults(),
            frame_size: None,
            last_score: None,
        }
    }
}

impl Settings {
    pub fn settings_dir() -> Result<PathBuf> {
        let mut path = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        path.push(APP_DIR);
        Ok(path)
    }

    pub fn settings_path() -> Result<PathBuf> {
        Ok(Self::settings_dir()?.join(SETTINGS_FILE))
    }

    /// Load from `path`, falling back to defaults when the file does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let file = File::open(path)
            .with_context(|| format!("Failed to open settings file {}", path.display()))?;
        let settings = serde_json::from_reader(file)
            .with_context(|| format!("Failed to parse settings file {}", path.display()))?;
        Ok(settings)
    }

    /// Load the user's settings; any problem yields defaults
    pub fn load_or_default() -> Self {
        Self::load_or_warn(Self::settings_path())
    }

    fn load_or_warn(path: Result<PathBuf>) -> Self {
        match path.and_then(|path| Self::load_from(&path)) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Using default settings: {:#}", e);
                Self::default()
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create settings directory")?;
        }
        let file = File::create(path).context("Failed to create settings file")?;
        serde_json::to_writer_pretty(file, self).context("Failed to write settings")?;
        info!("Saved settings to {}", path.display());
        Ok(())
    }

    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::settings_path()?;
        self.save_to(&path)?;
        Ok(path)
    }
}
