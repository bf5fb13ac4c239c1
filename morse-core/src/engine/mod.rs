//! `MorsePlayer`: top-level lifecycle controller.
//!
//! ## Lifecycle
//!
//! ```text
//! MorsePlayer::new()         → status = Stopped
//!     └─► start()            → scheduler thread spawned, status = Idle | Playing
//!         ├─► toggle_playback() → Idle ⇄ Playing (pausing forces tone off)
//!         └─► stop()         → cancelled, tone forced off, thread joined, status = Stopped
//! ```
//!
//! `start()`/`stop()` return an error when called in the wrong state rather
//! than panicking. A sink failure moves the status to `Error` and ends the
//! loop; the queue is left as it was.
//!
//! ## Threading
//!
//! The scheduler runs on its own OS thread and only ever blocks on
//! `CancelToken` waits, so `stop()` interrupts it immediately. Text producers
//! push through the `SharedQueue` handle from any thread.

pub mod cancel;
pub mod scheduler;

use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};
use std::thread::JoinHandle;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::{
    buffering::SharedQueue,
    config::PlayerConfig,
    error::{MorseError, Result},
    events::{CharacterEvent, PlayerStatus, PlayerStatusEvent},
    sink::SinkHandle,
};

pub use cancel::CancelToken;
pub use scheduler::{DiagnosticsSnapshot, PlaybackControls, SchedulerDiagnostics};

/// Broadcast channel capacity: 256 events buffered for slow consumers.
const BROADCAST_CAP: usize = 256;

struct Worker {
    cancel: CancelToken,
    handle: JoinHandle<()>,
}

/// The top-level player handle.
///
/// `MorsePlayer` is `Send + Sync`; all fields use interior mutability.
/// Wrap in `Arc<MorsePlayer>` to share between a UI, a text producer and
/// event-forwarding tasks.
pub struct MorsePlayer {
    config: PlayerConfig,
    queue: SharedQueue<char>,
    sink: SinkHandle,
    controls: Arc<PlaybackControls>,
    /// `true` while the scheduler loop is active.
    running: Arc<AtomicBool>,
    busy: Arc<AtomicBool>,
    /// Canonical status (written via Mutex, read from any thread).
    status: Arc<Mutex<PlayerStatus>>,
    status_tx: broadcast::Sender<PlayerStatusEvent>,
    character_tx: broadcast::Sender<CharacterEvent>,
    /// Monotonically increasing character event counter.
    seq: Arc<AtomicU64>,
    diagnostics: Arc<SchedulerDiagnostics>,
    /// Serialises start/stop and owns the live scheduler thread.
    worker: Mutex<Option<Worker>>,
}

impl MorsePlayer {
    /// Create a stopped player. Call `start()` to launch the scheduler.
    pub fn new(config: PlayerConfig, sink: SinkHandle) -> Self {
        let config = config.normalized();
        let (status_tx, _) = broadcast::channel(BROADCAST_CAP);
        let (character_tx, _) = broadcast::channel(BROADCAST_CAP);

        Self {
            queue: SharedQueue::new(config.queue_capacity),
            controls: Arc::new(PlaybackControls::new(config.initial_wpm)),
            config,
            sink,
            running: Arc::new(AtomicBool::new(false)),
            busy: Arc::new(AtomicBool::new(false)),
            status: Arc::new(Mutex::new(PlayerStatus::Stopped)),
            status_tx,
            character_tx,
            seq: Arc::new(AtomicU64::new(0)),
            diagnostics: Arc::new(SchedulerDiagnostics::default()),
            worker: Mutex::new(None),
        }
    }

    /// Launch the scheduler loop.
    ///
    /// # Errors
    /// - `MorseError::AlreadyRunning` if already started.
    /// - `MorseError::Io` if the scheduler thread cannot be spawned.
    pub fn start(&self) -> Result<()> {
        let mut worker = self.worker.lock();
        if self.running.load(Ordering::SeqCst) {
            return Err(MorseError::AlreadyRunning);
        }

        // Reap a loop that ended on its own after a sink failure.
        if let Some(previous) = worker.take() {
            let _ = previous.handle.join();
        }

        self.running.store(true, Ordering::SeqCst);

        let cancel = CancelToken::new();
        let ctx = scheduler::SchedulerContext {
            tick_interval: self.config.tick_interval(),
            queue: self.queue.clone(),
            sink: self.sink.clone(),
            controls: Arc::clone(&self.controls),
            cancel: cancel.clone(),
            running: Arc::clone(&self.running),
            busy: Arc::clone(&self.busy),
            status: Arc::clone(&self.status),
            status_tx: self.status_tx.clone(),
            character_tx: self.character_tx.clone(),
            seq: Arc::clone(&self.seq),
            diagnostics: Arc::clone(&self.diagnostics),
        };

        // Published before the spawn so a failure on the first tick is the
        // last status written.
        self.set_status(PlayerStatus::running(self.is_playing()), None);

        let handle = match std::thread::Builder::new()
            .name("morse-scheduler".into())
            .spawn(move || scheduler::run(ctx))
        {
            Ok(handle) => handle,
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                self.set_status(PlayerStatus::Error, Some(e.to_string()));
                return Err(e.into());
            }
        };

        *worker = Some(Worker { cancel, handle });
        info!(wpm = self.wpm(), "player started");
        Ok(())
    }

    /// Stop the scheduler.
    ///
    /// The tone is forced off before this returns, and no key-down can follow.
    ///
    /// # Errors
    /// - `MorseError::NotRunning` if not currently running.
    pub fn stop(&self) -> Result<()> {
        let mut worker = self.worker.lock();
        if !self.running.swap(false, Ordering::SeqCst) {
            if let Some(finished) = worker.take() {
                let _ = finished.handle.join();
            }
            return Err(MorseError::NotRunning);
        }

        let Some(Worker { cancel, handle }) = worker.take() else {
            return Err(MorseError::NotRunning);
        };

        cancel.cancel();
        self.force_tone_off();
        if handle.join().is_err() {
            warn!("scheduler thread panicked");
        }
        self.busy.store(false, Ordering::SeqCst);

        self.set_status(PlayerStatus::Stopped, None);
        info!("player stopped");
        Ok(())
    }

    /// Flip playback on/off. Turning it off silences the tone immediately.
    ///
    /// Returns the new play state.
    pub fn toggle_playback(&self) -> bool {
        let playing = self.controls.toggle();
        self.apply_play_state(playing);
        playing
    }

    pub fn set_playing(&self, playing: bool) {
        self.controls.set_playing(playing);
        self.apply_play_state(playing);
    }

    pub fn is_playing(&self) -> bool {
        self.controls.is_playing()
    }

    /// Change speed; takes effect at the next hold. Returns the clamped value.
    pub fn set_wpm(&self, wpm: f32) -> f32 {
        let applied = self.controls.set_wpm(wpm);
        info!(wpm = applied, "speed changed");
        applied
    }

    pub fn wpm(&self) -> f32 {
        self.controls.wpm()
    }

    /// Uppercase `text` and append it to the queue.
    ///
    /// Returns how many unread characters were overwritten to make room.
    pub fn push_text(&self, text: &str) -> usize {
        let dropped = self
            .queue
            .push_batch(text.chars().flat_map(char::to_uppercase));
        if dropped > 0 {
            self.diagnostics
                .characters_dropped
                .fetch_add(dropped, Ordering::Relaxed);
            warn!(dropped, "character queue full: oldest characters overwritten");
        }
        dropped
    }

    /// Shared queue handle for producers that push characters directly.
    pub fn queue(&self) -> &SharedQueue<char> {
        &self.queue
    }

    pub fn clear_queue(&self) {
        self.queue.clear();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// `true` while a character is being sounded.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Nothing queued and nothing mid-playback.
    pub fn is_drained(&self) -> bool {
        self.queue.is_empty() && !self.is_busy()
    }

    /// Current player status (snapshot).
    pub fn status(&self) -> PlayerStatus {
        *self.status.lock()
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// Subscribe to live status change events.
    pub fn subscribe_status(&self) -> broadcast::Receiver<PlayerStatusEvent> {
        self.status_tx.subscribe()
    }

    /// Subscribe to an event per character as it starts sounding.
    pub fn subscribe_characters(&self) -> broadcast::Receiver<CharacterEvent> {
        self.character_tx.subscribe()
    }

    /// Snapshot of scheduler counters for observability.
    pub fn diagnostics_snapshot(&self) -> DiagnosticsSnapshot {
        self.diagnostics.snapshot()
    }

    pub fn reset_diagnostics(&self) {
        self.diagnostics.reset();
    }

    // ── Internal helpers ─────────────────────────────────────────────────────

    fn apply_play_state(&self, playing: bool) {
        if !playing {
            self.force_tone_off();
        }
        if self.is_running() && self.status() != PlayerStatus::Error {
            self.set_status(PlayerStatus::running(playing), None);
        }
        info!(playing, "playback toggled");
    }

    fn force_tone_off(&self) {
        if let Err(e) = self.sink.0.lock().end_tone() {
            warn!("failed to force tone off: {e}");
        }
    }

    fn set_status(&self, new_status: PlayerStatus, detail: Option<String>) {
        *self.status.lock() = new_status;
        let _ = self.status_tx.send(PlayerStatusEvent {
            status: new_status,
            detail,
        });
    }
}

impl Drop for MorsePlayer {
    fn drop(&mut self) {
        if self.is_running() {
            let _ = self.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::NullSink;

    fn player() -> MorsePlayer {
        MorsePlayer::new(PlayerConfig::default(), SinkHandle::new(NullSink::new()))
    }

    #[test]
    fn lifecycle_errors_instead_of_panicking() {
        let player = player();
        assert!(matches!(player.stop(), Err(MorseError::NotRunning)));

        player.start().expect("start");
        assert!(matches!(player.start(), Err(MorseError::AlreadyRunning)));
        assert_eq!(player.status(), PlayerStatus::Idle);

        player.stop().expect("stop");
        assert_eq!(player.status(), PlayerStatus::Stopped);
        assert!(!player.is_running());

        player.start().expect("restart");
        player.stop().expect("stop again");
    }

    #[test]
    fn push_text_uppercases_and_counts_drops() {
        let config = PlayerConfig {
            queue_capacity: 4,
            ..PlayerConfig::default()
        };
        let player = MorsePlayer::new(config, SinkHandle::new(NullSink::new()));

        assert_eq!(player.push_text("cq"), 0);
        assert_eq!(player.queue().to_vec(), vec!['C', 'Q']);
        assert_eq!(player.push_text("de k1"), 3);
        assert_eq!(player.queue().to_vec(), vec!['E', ' ', 'K', '1']);
        assert_eq!(player.diagnostics_snapshot().characters_dropped, 3);

        player.reset_diagnostics();
        assert_eq!(player.diagnostics_snapshot().characters_dropped, 0);
    }

    #[test]
    fn toggling_updates_status_only_while_running() {
        let player = player();
        assert!(player.toggle_playback());
        assert_eq!(player.status(), PlayerStatus::Stopped);

        player.start().expect("start");
        assert_eq!(player.status(), PlayerStatus::Playing);
        assert!(!player.toggle_playback());
        assert_eq!(player.status(), PlayerStatus::Idle);
        player.stop().expect("stop");
    }

    #[test]
    fn wpm_is_clamped() {
        let player = player();
        assert_eq!(player.wpm(), 20.0);
        assert_eq!(player.set_wpm(40.0), 30.0);
        assert_eq!(player.set_wpm(4.0), 5.0);
        assert_eq!(player.wpm(), 5.0);
    }
}
