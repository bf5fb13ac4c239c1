use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use morse_core::events::{CharacterEvent, PlayerStatus, PlayerStatusEvent};
use morse_core::{MorseError, MorsePlayer, PlayerConfig, SinkHandle, ToneSink};
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Call {
    Begin,
    End,
}

type CallLog = Arc<Mutex<Vec<(Call, Instant)>>>;

/// Records every sink call with a timestamp.
struct RecordingSink {
    log: CallLog,
}

impl ToneSink for RecordingSink {
    fn begin_tone(&mut self) -> Result<(), MorseError> {
        self.log.lock().push((Call::Begin, Instant::now()));
        Ok(())
    }

    fn end_tone(&mut self) -> Result<(), MorseError> {
        self.log.lock().push((Call::End, Instant::now()));
        Ok(())
    }
}

/// Rejects every key-down, as a sink whose device went away would.
struct FailingSink;

impl ToneSink for FailingSink {
    fn begin_tone(&mut self) -> Result<(), MorseError> {
        Err(MorseError::SinkUnavailable("device disconnected".into()))
    }

    fn end_tone(&mut self) -> Result<(), MorseError> {
        Ok(())
    }
}

fn recording_player(wpm: f32, tick_ms: u64) -> (MorsePlayer, CallLog) {
    let log: CallLog = Arc::new(Mutex::new(Vec::new()));
    let config = PlayerConfig {
        initial_wpm: wpm,
        tick_interval_ms: tick_ms,
        ..PlayerConfig::default()
    };
    let sink = SinkHandle::new(RecordingSink {
        log: Arc::clone(&log),
    });
    (MorsePlayer::new(config, sink), log)
}

fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    condition()
}

fn begin_count(log: &CallLog) -> usize {
    log.lock().iter().filter(|(c, _)| *c == Call::Begin).count()
}

/// Length of each keyed interval, in order.
fn tone_intervals(log: &CallLog) -> Vec<Duration> {
    let calls = log.lock().clone();
    let mut open: Option<Instant> = None;
    let mut tones = Vec::new();
    for (call, at) in calls {
        match (call, open) {
            (Call::Begin, None) => open = Some(at),
            (Call::Begin, Some(_)) => panic!("key-down while tone already on"),
            (Call::End, Some(started)) => {
                tones.push(at - started);
                open = None;
            }
            (Call::End, None) => {}
        }
    }
    tones
}

fn recv_with_timeout<T: Clone>(rx: &mut broadcast::Receiver<T>, timeout: Duration) -> T {
    let start = Instant::now();
    loop {
        match rx.try_recv() {
            Ok(ev) => return ev,
            Err(TryRecvError::Empty) => {
                if start.elapsed() >= timeout {
                    panic!("timed out waiting for event");
                }
                thread::sleep(Duration::from_millis(2));
            }
            Err(TryRecvError::Lagged(_)) => continue,
            Err(TryRecvError::Closed) => panic!("event channel closed unexpectedly"),
        }
    }
}

#[test]
fn sos_keys_dots_and_dashes_in_order() {
    // 30 WPM → 40 ms unit, 120 ms dash.
    let (player, log) = recording_player(30.0, 5);
    player.push_text("SOS");
    player.set_playing(true);
    player.start().expect("start");

    let done = wait_until(Duration::from_secs(5), || {
        player.diagnostics_snapshot().characters_played == 3 && player.is_drained()
    });
    player.stop().expect("stop");
    assert!(done, "SOS did not finish in time");

    let tones = tone_intervals(&log);
    assert_eq!(tones.len(), 9);

    let pattern: String = tones
        .iter()
        .map(|d| if *d >= Duration::from_millis(80) { '-' } else { '.' })
        .collect();
    assert_eq!(pattern, "...---...");

    for dot in tones.iter().filter(|d| **d < Duration::from_millis(80)) {
        assert!(*dot >= Duration::from_millis(35), "dot too short: {dot:?}");
    }
    for dash in tones.iter().filter(|d| **d >= Duration::from_millis(80)) {
        assert!(*dash >= Duration::from_millis(115), "dash too short: {dash:?}");
    }
}

#[test]
fn silence_separates_consecutive_tones() {
    let (player, log) = recording_player(30.0, 5);
    player.push_text("EE");
    player.set_playing(true);
    player.start().expect("start");

    assert!(wait_until(Duration::from_secs(3), || {
        player.diagnostics_snapshot().characters_played == 2 && player.is_drained()
    }));
    player.stop().expect("stop");

    let calls = log.lock().clone();
    let begins: Vec<Instant> = calls
        .iter()
        .filter(|(c, _)| *c == Call::Begin)
        .map(|(_, at)| *at)
        .collect();
    let first_end = calls
        .iter()
        .find(|(c, _)| *c == Call::End)
        .map(|(_, at)| *at)
        .expect("first tone ended");

    // Character gap (3 units = 120 ms) plus one tick sits between the two dots.
    assert_eq!(begins.len(), 2);
    assert!(begins[1] - first_end >= Duration::from_millis(115));
}

#[test]
fn stop_mid_tone_forces_tone_off_before_returning() {
    // 5 WPM → 240 ms unit; a dash holds the tone for 720 ms.
    let (player, log) = recording_player(5.0, 5);
    player.push_text("TT");
    player.set_playing(true);
    player.start().expect("start");

    assert!(wait_until(Duration::from_secs(2), || begin_count(&log) == 1));

    let stop_started = Instant::now();
    player.stop().expect("stop");
    let stop_took = stop_started.elapsed();

    assert!(stop_took < Duration::from_millis(100), "stop took {stop_took:?}");
    assert_eq!(log.lock().last().map(|(c, _)| *c), Some(Call::End));
    assert_eq!(player.status(), PlayerStatus::Stopped);

    thread::sleep(Duration::from_millis(200));
    assert_eq!(begin_count(&log), 1, "no key-down may follow stop");
    assert!(player.diagnostics_snapshot().holds_cancelled >= 1);
    assert_eq!(player.queue().to_vec(), vec!['T']);
}

#[test]
fn pausing_mid_tone_silences_immediately() {
    let (player, log) = recording_player(5.0, 5);
    player.push_text("TT");
    player.set_playing(true);
    player.start().expect("start");

    assert!(wait_until(Duration::from_secs(2), || begin_count(&log) == 1));
    assert!(!player.toggle_playback());
    assert_eq!(log.lock().last().map(|(c, _)| *c), Some(Call::End));
    assert_eq!(player.status(), PlayerStatus::Idle);

    thread::sleep(Duration::from_millis(900));
    assert_eq!(begin_count(&log), 1);
    assert_eq!(player.queue().len(), 1, "paused loop must not dequeue");
    player.stop().expect("stop");
}

#[test]
fn idle_loop_ticks_without_dequeuing() {
    let (player, log) = recording_player(20.0, 5);
    player.push_text("ABC");
    player.start().expect("start");

    assert!(wait_until(Duration::from_secs(1), || {
        player.diagnostics_snapshot().ticks >= 5
    }));
    assert_eq!(player.queue().len(), 3);
    assert_eq!(begin_count(&log), 0);
    assert_eq!(player.status(), PlayerStatus::Idle);
    player.stop().expect("stop");
}

#[test]
fn unmapped_characters_are_skipped_without_sound() {
    let (player, log) = recording_player(30.0, 5);
    player.push_text("#E@");
    player.set_playing(true);
    player.start().expect("start");

    assert!(wait_until(Duration::from_secs(3), || {
        let diag = player.diagnostics_snapshot();
        diag.characters_skipped == 2 && diag.characters_played == 1 && player.is_drained()
    }));
    player.stop().expect("stop");
    assert_eq!(begin_count(&log), 1);
}

#[test]
fn character_events_follow_queue_order() {
    let (player, _log) = recording_player(30.0, 1);
    let mut rx = player.subscribe_characters();
    player.push_text("cq de");
    player.set_playing(true);
    player.start().expect("start");

    let received: Vec<CharacterEvent> = (0..5)
        .map(|_| recv_with_timeout(&mut rx, Duration::from_secs(10)))
        .collect();
    player.stop().expect("stop");

    let text: String = received.iter().map(|e| e.character).collect();
    assert_eq!(text, "CQ DE");
    assert!(received.windows(2).all(|w| w[0].seq < w[1].seq));
    assert!(received.iter().all(|e| e.wpm == 30.0));
}

#[test]
fn sink_failure_surfaces_error_and_keeps_queue() {
    let config = PlayerConfig {
        tick_interval_ms: 5,
        ..PlayerConfig::default()
    };
    let player = MorsePlayer::new(config, SinkHandle::new(FailingSink));
    let mut status_rx = player.subscribe_status();
    player.push_text("EE");
    player.set_playing(true);
    player.start().expect("start");

    let error_event: PlayerStatusEvent = loop {
        let ev = recv_with_timeout(&mut status_rx, Duration::from_secs(2));
        if ev.status == PlayerStatus::Error {
            break ev;
        }
    };

    assert!(error_event
        .detail
        .as_deref()
        .is_some_and(|d| d.contains("device disconnected")));
    assert!(wait_until(Duration::from_secs(1), || !player.is_running()));
    assert_eq!(player.status(), PlayerStatus::Error);
    assert_eq!(player.queue().to_vec(), vec!['E']);
    assert!(matches!(player.stop(), Err(MorseError::NotRunning)));

    // The loop can be restarted; paused so it does not hit the sink again.
    player.set_playing(false);
    player.start().expect("restart after failure");
    player.stop().expect("stop");
}

#[test]
fn speed_change_applies_from_the_next_hold() {
    // 5 WPM → 240 ms unit; 30 WPM → 40 ms unit.
    let (player, log) = recording_player(5.0, 5);
    player.push_text("II");
    player.set_playing(true);
    player.start().expect("start");

    assert!(wait_until(Duration::from_secs(2), || begin_count(&log) == 1));
    assert_eq!(player.set_wpm(30.0), 30.0);

    assert!(wait_until(Duration::from_secs(5), || {
        player.diagnostics_snapshot().characters_played == 2 && player.is_drained()
    }));
    player.stop().expect("stop");

    let tones = tone_intervals(&log);
    assert_eq!(tones.len(), 4);
    assert!(
        tones[0] >= Duration::from_millis(235),
        "tone in progress was shortened: {:?}",
        tones[0]
    );
    for tone in &tones[1..] {
        assert!(*tone >= Duration::from_millis(35), "dot too short: {tone:?}");
        assert!(*tone < Duration::from_millis(150), "old speed still used: {tone:?}");
    }
}

#[test]
fn word_gap_silences_seven_units_after_the_character_gap() {
    // 30 WPM → 40 ms unit: 3-unit character gap plus 7-unit word gap.
    let (player, log) = recording_player(30.0, 5);
    player.push_text("E E");
    player.set_playing(true);
    player.start().expect("start");

    assert!(wait_until(Duration::from_secs(3), || {
        player.diagnostics_snapshot().characters_played == 3 && player.is_drained()
    }));
    player.stop().expect("stop");
    assert_eq!(player.diagnostics_snapshot().word_gaps, 1);

    let calls = log.lock().clone();
    let first_end = calls
        .iter()
        .find(|(c, _)| *c == Call::End)
        .map(|(_, at)| *at)
        .expect("first tone ended");
    let second_begin = calls
        .iter()
        .filter(|(c, _)| *c == Call::Begin)
        .nth(1)
        .map(|(_, at)| *at)
        .expect("second tone began");

    let silence = second_begin - first_end;
    assert!(silence >= Duration::from_millis(395), "word gap too short: {silence:?}");
}

#[test]
fn failure_on_first_tick_is_the_final_status() {
    let config = PlayerConfig {
        tick_interval_ms: 1,
        ..PlayerConfig::default()
    };
    let player = MorsePlayer::new(config, SinkHandle::new(FailingSink));
    let mut status_rx = player.subscribe_status();
    player.push_text("E");
    player.set_playing(true);
    player.start().expect("start");

    assert!(wait_until(Duration::from_secs(1), || !player.is_running()));
    assert_eq!(player.status(), PlayerStatus::Error);

    let mut last = None;
    loop {
        match status_rx.try_recv() {
            Ok(ev) => last = Some(ev.status),
            Err(TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }
    assert_eq!(last, Some(PlayerStatus::Error));
}
