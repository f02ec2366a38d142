use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Sample, SampleFormat, Stream};
use crossbeam_channel::RecvTimeoutError;
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::config::Settings;
use crate::core::chord::{ChordBank, ChordSelection};
use crate::core::keymap::{HeldKeys, KeyMap, OctaveWindow};
use crate::core::oscillator::Note;
use crate::core::score::{NoteSink, PlaybackHandle, Score, ScorePlayer};
use crate::core::synth::Synth;
use crate::error::{Error, Result};
use crate::messaging::{MessageBus, SynthMessage};
use crate::utils::helpers::{format_frequency, format_time};

/// How often the application loop wakes up without input
const IDLE_TICK: Duration = Duration::from_millis(100);

/// Score played when `start` is issued before anything was loaded
pub const DEFAULT_SCORE_FILE: &str = "score.json";

/// Scratch frames reserved for the callback when the device picks its own block size
const DEFAULT_BLOCK_FRAMES: usize = 8192;

// Main app state
pub struct PianoApp {
    synth: Arc<Synth>,
    chords: ChordBank,
    window: OctaveWindow,
    key_map: KeyMap,
    held_keys: HeldKeys,
    player: ScorePlayer,
    score: Option<Arc<Score>>,
    score_path: Option<PathBuf>,
    default_score: PathBuf,
    sessions: Vec<PlaybackHandle>,
    frame_size: Option<u32>,
    reported_drops: usize,
    _stream: Option<Stream>,
}

impl PianoApp {
    /// Open the default output device and start streaming
    pub fn new(settings: &Settings) -> Result<Self> {
        let host = cpal::default_host();
        info!("Using audio host: {}", host.id().name());

        let device = host
            .default_output_device()
            .ok_or_else(|| Error::DeviceUnavailable("No output device available".to_string()))?;
        info!("Using output device: {:?}", device.name());

        let supported = device
            .default_output_config()
            .map_err(|e| Error::DeviceUnavailable(e.to_string()))?;
        debug!("Device config: {:?}", supported);

        let sample_format = supported.sample_format();
        let mut config = cpal::StreamConfig::from(supported);
        if let Some(frames) = settings.frame_size {
            config.buffer_size = cpal::BufferSize::Fixed(frames);
        }
        let sample_rate = config.sample_rate.0;
        info!("Using sample rate: {} ({} channels)", sample_rate, config.channels);

        let synth = Arc::new(Synth::new(sample_rate, settings.params));

        let stream = match sample_format {
            SampleFormat::F32 => create_stream::<f32>(&device, &config, Arc::clone(&synth)),
            SampleFormat::I16 => create_stream::<i16>(&device, &config, Arc::clone(&synth)),
            SampleFormat::U16 => create_stream::<u16>(&device, &config, Arc::clone(&synth)),
            other => Err(Error::DeviceUnavailable(format!(
                "Unsupported sample format {:?}",
                other
            ))),
        }?;

        stream
            .play()
            .map_err(|e| Error::DeviceUnavailable(e.to_string()))?;
        info!("Audio stream started");

        Ok(Self::build(settings, synth, Some(stream)))
    }

    /// App without an audio device; the caller pulls audio with `Synth::render`
    pub fn headless(settings: &Settings, sample_rate: u32) -> Self {
        let synth = Arc::new(Synth::new(sample_rate, settings.params));
        Self::build(settings, synth, None)
    }

    fn build(settings: &Settings, synth: Arc<Synth>, stream: Option<Stream>) -> Self {
        let window = OctaveWindow::new(settings.min_octave, settings.num_octaves);
        let sink: Arc<dyn NoteSink> = Arc::clone(&synth) as Arc<dyn NoteSink>;
        let mut app = PianoApp {
            chords: ChordBank::new(Arc::clone(&synth), &settings.chord_selections),
            key_map: KeyMap::german(window.min_octave()),
            held_keys: HeldKeys::default(),
            player: ScorePlayer::new(sink),
            window,
            synth,
            score: None,
            score_path: None,
            default_score: PathBuf::from(DEFAULT_SCORE_FILE),
            sessions: Vec::new(),
            frame_size: settings.frame_size,
            reported_drops: 0,
            _stream: stream,
        };

        if let Some(path) = &settings.last_score {
            if let Err(e) = app.load_score(path) {
                warn!("Could not reload score {}: {}", path.display(), e);
            }
        }
        app
    }

    pub fn synth(&self) -> &Arc<Synth> {
        &self.synth
    }

    // --- Triggers ---

    pub fn play(&self, note: &str) -> Result<Note> {
        self.synth.play(note)
    }

    pub fn stop(&self, note: &str) -> Result<()> {
        self.synth.stop(note).map(|_| ())
    }

    /// Press a mapped computer key; repeats and unmapped keys do nothing
    pub fn key_down(&mut self, key: char) -> Option<Note> {
        let note = self.held_keys.press(key, &self.key_map)?;
        self.synth.play_note(note);
        Some(note)
    }

    pub fn key_up(&mut self, key: char) -> Option<Note> {
        let note = self.held_keys.release(key)?;
        self.synth.stop_note(note);
        Some(note)
    }

    pub fn play_chord(&self, slot: usize) -> Result<Vec<Note>> {
        self.chords.play_chord(slot)
    }

    pub fn stop_chord(&self, slot: usize) -> Result<()> {
        self.chords.stop_chord(slot)
    }

    pub fn select_chord(&self, slot: usize, selection: ChordSelection) -> Result<()> {
        self.chords.set_selection(slot, selection)
    }

    pub fn set_amplitude(&self, value: f32) {
        self.synth.params().set_amplitude(value);
    }

    pub fn set_decay(&self, value: f32) {
        self.synth.params().set_decay(value);
    }

    pub fn set_duration(&self, value: f32) {
        self.synth.params().set_duration(value);
    }

    pub fn set_release(&self, value: f32) {
        self.synth.params().set_release(value);
    }

    /// Move the octave window and rebuild the key map
    pub fn shift_octave(&mut self, up: bool) -> bool {
        if !self.window.shift(up) {
            return false;
        }
        self.key_map.remap(self.window.min_octave());
        info!("min octave: {}", self.window.min_octave());
        true
    }

    pub fn load_score(&mut self, path: &Path) -> Result<()> {
        let score = Score::load(path)?;
        self.score = Some(Arc::new(score));
        self.score_path = Some(path.to_path_buf());
        Ok(())
    }

    /// Start a playback session of the loaded score. Returns the session id.
    ///
    /// With no score loaded, `score.json` in the working directory is loaded first.
    pub fn start_playback(&mut self) -> Result<u64> {
        if self.score.is_none() && self.default_score.is_file() {
            let path = self.default_score.clone();
            info!("No score loaded, using {}", path.display());
            self.load_score(&path)?;
        }
        let score = self.score.clone().ok_or(Error::NoScore)?;
        let handle = self.player.start(score)?;
        let id = handle.id();
        self.sessions.push(handle);
        Ok(id)
    }

    /// Cancel every live playback session. Returns how many were playing.
    pub fn stop_playback(&mut self) -> usize {
        let mut cancelled = 0;
        for session in &self.sessions {
            if session.is_playing() {
                session.cancel();
                cancelled += 1;
            }
        }
        cancelled
    }

    /// Release every note, chord and held key
    pub fn panic(&mut self) {
        self.stop_playback();
        for slot in 0..self.chords.selections().len() {
            let _ = self.chords.stop_chord(slot);
        }
        self.held_keys = HeldKeys::default();
        self.synth.release_all();
    }

    // --- Status ---

    /// (lowest note, Hz, highest note, Hz) of the visible window
    pub fn frequency_range(&self) -> (Note, f64, Note, f64) {
        let (low, high) = self.window.frequency_range();
        (self.window.lowest_note(), low, self.window.highest_note(), high)
    }

    pub fn key_map(&self) -> &BTreeMap<char, Note> {
        self.key_map.entries()
    }

    pub fn octave_window(&self) -> OctaveWindow {
        self.window
    }

    pub fn is_sounding(&self, note: Note) -> bool {
        self.synth.is_sounding(note)
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.iter().filter(|s| s.is_playing()).count()
    }

    pub fn status(&self) -> String {
        let (low_note, low, high_note, high) = self.frequency_range();
        let params = self.synth.params().snapshot();
        let sounding: Vec<String> = self
            .synth
            .active_notes()
            .iter()
            .map(|n| n.to_string())
            .collect();
        let keys: Vec<String> = self
            .key_map()
            .iter()
            .map(|(k, n)| format!("{}={}", k, n))
            .collect();

        format!(
            "Min: {} {} - Max: {} {}\n\
             amplitude {:.2}  decay {:.2}  duration {}  release {}\n\
             keys: {}\n\
             sounding: [{}]  playback sessions: {}",
            low_note,
            format_frequency(low),
            high_note,
            format_frequency(high),
            params.amplitude,
            params.decay,
            format_time(params.duration),
            format_time(params.release),
            keys.join(" "),
            sounding.join(" "),
            self.active_sessions(),
        )
    }

    /// Settings reflecting the current state
    pub fn current_settings(&self) -> Settings {
        Settings {
            params: self.synth.params().snapshot(),
            min_octave: self.window.min_octave(),
            num_octaves: self.window.num_octaves(),
            chord_selections: self.chords.selections(),
            frame_size: self.frame_size,
            last_score: self.score_path.clone(),
        }
    }

    // --- Message loop ---

    /// Apply one command. Returns false when the app should exit.
    pub fn handle_message(&mut self, msg: SynthMessage) -> bool {
        let result = match msg {
            SynthMessage::Play(note) => self.play(&note).map(|_| ()),
            SynthMessage::Stop(note) => self.stop(&note),
            SynthMessage::KeyDown(key) => {
                self.key_down(key);
                Ok(())
            }
            SynthMessage::KeyUp(key) => {
                self.key_up(key);
                Ok(())
            }
            SynthMessage::PlayChord(slot) => self.play_chord(slot).map(|_| ()),
            SynthMessage::StopChord(slot) => self.stop_chord(slot),
            SynthMessage::SelectChord(slot, selection) => self.select_chord(slot, selection),
            SynthMessage::SetAmplitude(v) => {
                self.set_amplitude(v);
                Ok(())
            }
            SynthMessage::SetDecay(v) => {
                self.set_decay(v);
                Ok(())
            }
            SynthMessage::SetDuration(v) => {
                self.set_duration(v);
                Ok(())
            }
            SynthMessage::SetRelease(v) => {
                self.set_release(v);
                Ok(())
            }
            SynthMessage::ShiftOctave(up) => {
                if !self.shift_octave(up) {
                    eprintln!("octave window is at its limit");
                }
                Ok(())
            }
            SynthMessage::LoadScore(path) => self.load_score(&path),
            SynthMessage::StartPlayback => self.start_playback().map(|id| {
                println!("playback {} started", id);
            }),
            SynthMessage::StopPlayback => {
                self.stop_playback();
                Ok(())
            }
            SynthMessage::Status => {
                println!("{}", self.status());
                Ok(())
            }
            SynthMessage::Panic => {
                self.panic();
                Ok(())
            }
            SynthMessage::SaveSettings => {
                match self.current_settings().save() {
                    Ok(path) => println!("settings saved to {}", path.display()),
                    Err(e) => eprintln!("{:#}", e),
                }
                Ok(())
            }
            SynthMessage::Quit => return false,
        };

        if let Err(e) = result {
            eprintln!("{}", e);
        }
        true
    }

    /// Process bus messages until `Quit` or every sender is gone
    pub fn run(&mut self, bus: &MessageBus) {
        loop {
            match bus.receive_timeout(IDLE_TICK) {
                Ok(msg) => {
                    if !self.handle_message(msg) {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
            self.prune_sessions();
            self.report_dropped_voices();
        }
    }

    /// Forget sessions whose thread has finished
    fn prune_sessions(&mut self) {
        self.sessions.retain_mut(|session| {
            if session.is_playing() {
                return true;
            }
            session.join();
            false
        });
    }

    fn report_dropped_voices(&mut self) {
        let dropped = self.synth.dropped_voices();
        if dropped > self.reported_drops {
            warn!("Mixer dropped {} corrupt voice(s)", dropped - self.reported_drops);
            self.reported_drops = dropped;
        }
    }

    /// Stop playback, wait for session threads and release all notes
    pub fn shutdown(&mut self) {
        self.stop_playback();
        for session in &mut self.sessions {
            session.join();
        }
        self.sessions.clear();
        self.synth.release_all();
        info!("Shut down");
    }
}

/// Frames to allocate up front so the callback never grows its scratch buffer
fn block_frames(config: &cpal::StreamConfig) -> usize {
    match config.buffer_size {
        cpal::BufferSize::Fixed(frames) => frames as usize,
        cpal::BufferSize::Default => DEFAULT_BLOCK_FRAMES,
    }
}

fn create_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    synth: Arc<Synth>,
) -> Result<Stream>
where
    T: Sample + Send + 'static + cpal::SizedSample + cpal::FromSample<f32>,
{
    let channels = config.channels.max(1) as usize;
    let err_fn = |err| warn!("an error occurred on the audio stream: {}", err);
    let mut mono = vec![0.0f32; block_frames(config)];

    let stream = device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                let frames = data.len() / channels;
                if mono.len() < frames {
                    // Only reached if the device exceeds the block it was asked for
                    mono.resize(frames, 0.0);
                }
                let block = &mut mono[..frames];
                synth.render(block);

                for (frame, value) in data.chunks_mut(channels).zip(block.iter()) {
                    let value_t = T::from_sample(*value);
                    for sample in frame.iter_mut() {
                        *sample = value_t;
                    }
                }
            },
            err_fn,
            None,
        )
        .map_err(|e| Error::DeviceUnavailable(e.to_string()))?;

    Ok(stream)
}
