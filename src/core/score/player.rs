use log::{debug, info};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::Score;
use crate::core::oscillator::Note;
use crate::core::synth::Synth;

/// Anything that can start and release notes
pub trait NoteSink: Send + Sync {
    fn note_on(&self, note: Note);
    fn note_off(&self, note: Note);
}

impl NoteSink for Synth {
    fn note_on(&self, note: Note) {
        self.play_note(note);
    }

    fn note_off(&self, note: Note) {
        self.stop_note(note);
    }
}

/// Playing flag for one playback session.
///
/// Cleared by `cancel` or when the session ends; waits wake as soon as it clears.
#[derive(Debug, Clone)]
pub struct CancelToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self {
            inner: Arc::new((Mutex::new(true), Condvar::new())),
        }
    }

    fn flag(&self) -> MutexGuard<'_, bool> {
        self.inner.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_active(&self) -> bool {
        *self.flag()
    }

    /// Clear the flag and wake any pending wait
    pub fn cancel(&self) {
        *self.flag() = false;
        self.inner.1.notify_all();
    }

    /// Sleep for `duration` unless cancelled first.
    ///
    /// Returns true if the full duration elapsed with the flag still set.
    pub fn wait(&self, duration: Duration) -> bool {
        let guard = self.flag();
        let (guard, _) = self
            .inner
            .1
            .wait_timeout_while(guard, duration, |active| *active)
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    Completed,
    Cancelled,
}

/// Run a score to the end on the calling thread.
///
/// The flag is checked before each step; a cancelled wait still releases the
/// step's notes before returning. The flag is always clear afterwards.
pub fn play_score(score: &Score, sink: &dyn NoteSink, token: &CancelToken) -> PlaybackOutcome {
    let mut outcome = PlaybackOutcome::Completed;

    for (index, event) in score.events().iter().enumerate() {
        if !token.is_active() {
            outcome = PlaybackOutcome::Cancelled;
            break;
        }

        for note in event.notes() {
            sink.note_on(*note);
        }
        let finished = token.wait(event.duration);
        for note in event.notes() {
            sink.note_off(*note);
        }

        if !finished {
            debug!("playback cancelled during event {}", index);
            outcome = PlaybackOutcome::Cancelled;
            break;
        }
    }

    token.cancel();
    outcome
}

/// A running playback session
pub struct PlaybackHandle {
    id: u64,
    token: CancelToken,
    thread: Option<JoinHandle<PlaybackOutcome>>,
}

impl PlaybackHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Ask this session to stop at the next step boundary
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_playing(&self) -> bool {
        self.token.is_active()
    }

    /// Wait for the session thread. None if it panicked or was already joined.
    pub fn join(&mut self) -> Option<PlaybackOutcome> {
        self.thread.take()?.join().ok()
    }
}

/// Starts score playback sessions on their own threads
pub struct ScorePlayer {
    sink: Arc<dyn NoteSink>,
    next_id: AtomicU64,
}

impl ScorePlayer {
    pub fn new(sink: Arc<dyn NoteSink>) -> Self {
        Self {
            sink,
            next_id: AtomicU64::new(1),
        }
    }

    /// Start playing `score` in the background
    pub fn start(&self, score: Arc<Score>) -> std::io::Result<PlaybackHandle> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = CancelToken::new();
        let sink = Arc::clone(&self.sink);
        let thread_token = token.clone();

        let thread = thread::Builder::new()
            .name(format!("score-{}", id))
            .spawn(move || {
                info!("Playback {} started ({} events)", id, score.len());
                let outcome = play_score(&score, sink.as_ref(), &thread_token);
                info!("Playback {} finished: {:?}", id, outcome);
                outcome
            })?;

        Ok(PlaybackHandle {
            id,
            token,
            thread: Some(thread),
        })
    }
}
