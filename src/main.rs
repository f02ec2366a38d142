//! synth-piano - play sine notes, chords and JSON scores from the terminal

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use std::path::{Path, PathBuf};

use synth_piano::core::score::{render_score, write_wav};
use synth_piano::messaging::{spawn_console, MessageBus};
use synth_piano::utils::helpers::{amplitude_to_db, normalize_samples, peak};
use synth_piano::{PianoApp, Score, Settings, Synth};

#[derive(Parser)]
#[command(name = "synth-piano")]
#[command(author, version, about = "Polyphonic sine synthesizer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Settings file (default: <config dir>/synth-piano/settings.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Score to load at startup
    #[arg(short, long)]
    score: Option<PathBuf>,

    /// Start playing the score right away
    #[arg(long)]
    play: bool,

    /// Fixed audio callback size in frames
    #[arg(long)]
    frames: Option<u32>,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a score to a WAV file without opening an audio device
    Render {
        /// Score file (JSON)
        score: PathBuf,
        /// Output WAV path (defaults to the score path with .wav)
        output: Option<PathBuf>,
        #[arg(long, default_value_t = 44100)]
        sample_rate: u32,
        /// Mixer block size in frames
        #[arg(long, default_value_t = 512)]
        frames: usize,
        /// Scale the result to full range
        #[arg(long)]
        normalize: bool,
    },
    /// Write a default settings file
    Init,
    /// Show the settings file path
    ConfigPath,
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    let settings_path = || match &cli.config {
        Some(path) => Ok(path.clone()),
        None => Settings::settings_path(),
    };

    match cli.command {
        Some(Commands::Init) => {
            let settings_path = settings_path()?;
            Settings::default().save_to(&settings_path)?;
            println!("Created default settings at: {}", settings_path.display());
            return Ok(());
        }
        Some(Commands::ConfigPath) => {
            println!("{}", settings_path()?.display());
            return Ok(());
        }
        Some(Commands::Render { score, output, sample_rate, frames, normalize }) => {
            let settings = load_settings(cli.config.as_deref())?;
            return render(settings, score, output, sample_rate, frames, normalize);
        }
        None => {}
    }

    let mut settings = load_settings(cli.config.as_deref())?;
    if cli.frames.is_some() {
        settings.frame_size = cli.frames;
    }
    if cli.score.is_some() {
        // Loaded explicitly below so a bad path is reported as an error
        settings.last_score = None;
    }

    let mut app = PianoApp::new(&settings).context("Failed to open audio output")?;

    if let Some(path) = &cli.score {
        app.load_score(path)
            .with_context(|| format!("Failed to load score {}", path.display()))?;
    }
    if cli.play {
        app.start_playback().context("Failed to start playback")?;
    }

    let bus = MessageBus::new();
    spawn_console(bus.sender())?;
    eprintln!("synth-piano ready, type \"help\" for commands");

    app.run(&bus);
    app.shutdown();
    Ok(())
}

/// An explicit settings file must load; the user's own file falls back to defaults
fn load_settings(path: Option<&Path>) -> Result<Settings> {
    match path {
        Some(path) => Settings::load_from(path),
        None => Ok(Settings::load_or_default()),
    }
}

fn render(
    settings: Settings,
    score_path: PathBuf,
    output: Option<PathBuf>,
    sample_rate: u32,
    frames: usize,
    normalize: bool,
) -> Result<()> {
    let score = Score::load(&score_path)
        .with_context(|| format!("Failed to load score {}", score_path.display()))?;
    let output = output.unwrap_or_else(|| score_path.with_extension("wav"));

    let synth = Synth::new(sample_rate, settings.params);
    let mut samples = render_score(&score, &synth, frames);

    let level = peak(&samples);
    info!("Peak level {:.1} dB", amplitude_to_db(level));
    if normalize {
        normalize_samples(&mut samples, 0.99);
    } else if level > 1.0 {
        warn!("Output clips (peak {:.2}); try --normalize", level);
    }

    write_wav(&output, &samples, sample_rate)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!("Wrote {}", output.display());
    Ok(())
}
