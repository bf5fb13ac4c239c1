//! Blocking Morse timing loop.
//!
//! ## Per tick
//!
//! ```text
//! 1. Wait for the tick deadline (interruptible by stop)
//! 2. If paused → next tick
//! 3. Pop one character; empty queue → next tick
//! 4. Resolve glyph: unmapped → skip, space → 7-unit gap
//! 5. For each hold: read WPM, extend the deadline, key tone on/off, wait
//! 6. Next tick starts one full tick after the character finished
//! ```
//!
//! Hold deadlines are chained from the character's start instant rather than
//! from "now", so lock or wake-up latency in one hold is absorbed by the next
//! one instead of accumulating.

use std::sync::{
    atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering},
    Arc,
};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::{
    buffering::SharedQueue,
    engine::cancel::CancelToken,
    error::Result,
    events::{CharacterEvent, PlayerStatus, PlayerStatusEvent},
    morse::{clamp_wpm, units_duration, Glyph},
    sink::SinkHandle,
};

/// User-adjustable playback state read by the loop at every decision point.
#[derive(Debug)]
pub struct PlaybackControls {
    /// `f32` WPM stored as raw bits.
    wpm_bits: AtomicU32,
    playing: AtomicBool,
}

impl PlaybackControls {
    pub fn new(wpm: f32) -> Self {
        Self {
            wpm_bits: AtomicU32::new(clamp_wpm(wpm).to_bits()),
            playing: AtomicBool::new(false),
        }
    }

    pub fn wpm(&self) -> f32 {
        f32::from_bits(self.wpm_bits.load(Ordering::Acquire))
    }

    /// Store a new speed, clamped to [5, 30]. Returns the stored value.
    pub fn set_wpm(&self, wpm: f32) -> f32 {
        let wpm = clamp_wpm(wpm);
        self.wpm_bits.store(wpm.to_bits(), Ordering::Release);
        wpm
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }

    pub fn set_playing(&self, playing: bool) {
        self.playing.store(playing, Ordering::Release);
    }

    /// Flip the play flag; returns the new value.
    pub fn toggle(&self) -> bool {
        !self.playing.fetch_xor(true, Ordering::AcqRel)
    }
}

pub struct SchedulerDiagnostics {
    pub ticks: AtomicUsize,
    pub characters_played: AtomicUsize,
    pub characters_skipped: AtomicUsize,
    pub characters_dropped: AtomicUsize,
    pub word_gaps: AtomicUsize,
    pub tones_emitted: AtomicUsize,
    pub holds_cancelled: AtomicUsize,
}

impl Default for SchedulerDiagnostics {
    fn default() -> Self {
        Self {
            ticks: AtomicUsize::new(0),
            characters_played: AtomicUsize::new(0),
            characters_skipped: AtomicUsize::new(0),
            characters_dropped: AtomicUsize::new(0),
            word_gaps: AtomicUsize::new(0),
            tones_emitted: AtomicUsize::new(0),
            holds_cancelled: AtomicUsize::new(0),
        }
    }
}

impl SchedulerDiagnostics {
    pub fn reset(&self) {
        self.ticks.store(0, Ordering::Relaxed);
        self.characters_played.store(0, Ordering::Relaxed);
        self.characters_skipped.store(0, Ordering::Relaxed);
        self.characters_dropped.store(0, Ordering::Relaxed);
        self.word_gaps.store(0, Ordering::Relaxed);
        self.tones_emitted.store(0, Ordering::Relaxed);
        self.holds_cancelled.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            characters_played: self.characters_played.load(Ordering::Relaxed),
            characters_skipped: self.characters_skipped.load(Ordering::Relaxed),
            characters_dropped: self.characters_dropped.load(Ordering::Relaxed),
            word_gaps: self.word_gaps.load(Ordering::Relaxed),
            tones_emitted: self.tones_emitted.load(Ordering::Relaxed),
            holds_cancelled: self.holds_cancelled.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsSnapshot {
    pub ticks: usize,
    pub characters_played: usize,
    pub characters_skipped: usize,
    pub characters_dropped: usize,
    pub word_gaps: usize,
    pub tones_emitted: usize,
    pub holds_cancelled: usize,
}

/// All context the loop needs, passed as one struct so the closure stays tidy.
pub struct SchedulerContext {
    pub tick_interval: Duration,
    pub queue: SharedQueue<char>,
    pub sink: SinkHandle,
    pub controls: Arc<PlaybackControls>,
    pub cancel: CancelToken,
    /// Cleared by the loop itself only when it exits on a sink failure.
    pub running: Arc<AtomicBool>,
    /// `true` while a character's holds are in progress.
    pub busy: Arc<AtomicBool>,
    pub status: Arc<Mutex<PlayerStatus>>,
    pub status_tx: broadcast::Sender<PlayerStatusEvent>,
    pub character_tx: broadcast::Sender<CharacterEvent>,
    pub seq: Arc<AtomicU64>,
    pub diagnostics: Arc<SchedulerDiagnostics>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Played,
    Skipped,
    /// Stopped or paused before the last hold finished.
    Interrupted,
}

/// Run the loop until `ctx.cancel` fires or the sink fails.
pub fn run(ctx: SchedulerContext) {
    info!(
        tick_ms = ctx.tick_interval.as_millis() as u64,
        "scheduler started"
    );

    let mut next_tick = Instant::now() + ctx.tick_interval;

    loop {
        if !ctx.cancel.wait_until(next_tick) {
            break;
        }
        ctx.diagnostics.ticks.fetch_add(1, Ordering::Relaxed);
        next_tick += ctx.tick_interval;

        if !ctx.controls.is_playing() {
            continue;
        }
        // Raised before the pop so "queue empty && !busy" never misses an
        // in-flight character.
        ctx.busy.store(true, Ordering::SeqCst);
        let Some(character) = ctx.queue.pop() else {
            ctx.busy.store(false, Ordering::Release);
            continue;
        };

        let result = play_character(&ctx, character);
        ctx.busy.store(false, Ordering::Release);

        match result {
            Ok(Outcome::Played) | Ok(Outcome::Skipped) => {}
            Ok(Outcome::Interrupted) => {
                debug!(character = %character.escape_debug(), "character interrupted");
            }
            Err(e) => {
                fail(&ctx, &e.to_string());
                return;
            }
        }

        // A full tick separates consecutive characters.
        let now = Instant::now();
        if next_tick < now + ctx.tick_interval {
            next_tick = now + ctx.tick_interval;
        }
    }

    key_up(&ctx);
    info!("scheduler stopped");
}

/// Sound one character. Never holds a lock across a wait.
fn play_character(ctx: &SchedulerContext, character: char) -> Result<Outcome> {
    let Some(glyph) = Glyph::of(character) else {
        ctx.diagnostics
            .characters_skipped
            .fetch_add(1, Ordering::Relaxed);
        debug!(character = %character.escape_debug(), "no Morse mapping, skipped");
        return Ok(Outcome::Skipped);
    };

    let wpm = ctx.controls.wpm();
    let seq = ctx.seq.fetch_add(1, Ordering::Relaxed);
    let _ = ctx.character_tx.send(CharacterEvent {
        seq,
        character,
        wpm,
    });
    debug!(character = %character, wpm, "playing character");

    if glyph == Glyph::WordGap {
        ctx.diagnostics.word_gaps.fetch_add(1, Ordering::Relaxed);
    }

    let mut deadline = Instant::now();
    for hold in glyph.holds() {
        deadline += units_duration(hold.units, ctx.controls.wpm());

        if hold.tone {
            if !key_down(ctx)? {
                return Ok(Outcome::Interrupted);
            }
            ctx.diagnostics.tones_emitted.fetch_add(1, Ordering::Relaxed);
            let completed = ctx.cancel.wait_until(deadline);
            key_up(ctx);
            if !completed {
                ctx.diagnostics.holds_cancelled.fetch_add(1, Ordering::Relaxed);
                return Ok(Outcome::Interrupted);
            }
        } else if !ctx.cancel.wait_until(deadline) {
            ctx.diagnostics.holds_cancelled.fetch_add(1, Ordering::Relaxed);
            return Ok(Outcome::Interrupted);
        }
    }

    ctx.diagnostics
        .characters_played
        .fetch_add(1, Ordering::Relaxed);
    Ok(Outcome::Played)
}

/// Key the tone unless a stop or pause has landed. Returns whether it keyed.
///
/// The flags are re-read under the sink lock; `stop`/pause set their flag
/// before taking the same lock to force the tone off.
fn key_down(ctx: &SchedulerContext) -> Result<bool> {
    let mut sink = ctx.sink.0.lock();
    if ctx.cancel.is_cancelled() || !ctx.controls.is_playing() {
        return Ok(false);
    }
    sink.begin_tone()?;
    Ok(true)
}

fn key_up(ctx: &SchedulerContext) {
    if let Err(e) = ctx.sink.0.lock().end_tone() {
        warn!("end_tone failed: {e}");
    }
}

fn fail(ctx: &SchedulerContext, detail: &str) {
    error!("audio sink failed, scheduler exiting: {detail}");
    key_up(ctx);
    ctx.running.store(false, Ordering::SeqCst);
    *ctx.status.lock() = PlayerStatus::Error;
    let _ = ctx.status_tx.send(PlayerStatusEvent {
        status: PlayerStatus::Error,
        detail: Some(detail.to_string()),
    });
}
