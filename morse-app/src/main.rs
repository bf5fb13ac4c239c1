mod settings;
mod story;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use morse_core::{
    audio::{device::list_output_devices, tone::REFERENCE_SAMPLE_RATE},
    render::{render_text, write_wav},
    MorsePlayer, NullSink, SinkHandle, ToneOutput,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::settings::{default_settings_path, load_settings, save_settings, AppSettings};
use crate::story::{flatten_whitespace, load_story};

const USAGE: &str = "Usage: morse [--story <file>] [--wpm <5-30>] [--device <name>] \\
  [--settings <file>] [--save-settings] [--wav <out.wav>] [--no-audio] [--list-devices]

Without --story, lines typed on stdin are played as they arrive.";

/// How often the host checks whether playback has drained.
const DRAIN_POLL: Duration = Duration::from_millis(100);

#[derive(Debug, Default)]
struct Args {
    story: Option<PathBuf>,
    wpm: Option<f32>,
    device: Option<String>,
    settings: Option<PathBuf>,
    save_settings: bool,
    wav: Option<PathBuf>,
    no_audio: bool,
    list_devices: bool,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args::default();

    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--story" => {
                let Some(v) = it.next() else {
                    return Err("missing value for --story".into());
                };
                args.story = Some(PathBuf::from(v));
            }
            "--wpm" => {
                let Some(v) = it.next() else {
                    return Err("missing value for --wpm".into());
                };
                args.wpm = Some(
                    v.parse::<f32>()
                        .map_err(|_| "invalid value for --wpm".to_string())?,
                );
            }
            "--device" => {
                let Some(v) = it.next() else {
                    return Err("missing value for --device".into());
                };
                args.device = Some(v);
            }
            "--settings" => {
                let Some(v) = it.next() else {
                    return Err("missing value for --settings".into());
                };
                args.settings = Some(PathBuf::from(v));
            }
            "--wav" => {
                let Some(v) = it.next() else {
                    return Err("missing value for --wav".into());
                };
                args.wav = Some(PathBuf::from(v));
            }
            "--save-settings" => args.save_settings = true,
            "--no-audio" => args.no_audio = true,
            "--list-devices" => args.list_devices = true,
            "--help" | "-h" => {
                println!("{USAGE}");
                std::process::exit(0);
            }
            other => {
                return Err(format!("unknown argument: {other}"));
            }
        }
    }
    Ok(args)
}

fn apply_overrides(settings: &mut AppSettings, args: &Args) {
    if let Some(wpm) = args.wpm {
        settings.player.initial_wpm = wpm;
    }
    if let Some(device) = &args.device {
        settings.preferred_output_device = Some(device.clone());
    }
    if let Some(story) = &args.story {
        settings.story_path = Some(story.clone());
    }
    settings.normalize();
}

/// Real audio output when available, otherwise a silent sink that keeps time.
fn open_sink(settings: &AppSettings, no_audio: bool) -> SinkHandle {
    if no_audio {
        info!("audio disabled, using silent sink");
        return SinkHandle::new(NullSink::new());
    }
    match ToneOutput::open_with_preference(
        settings.player.tone,
        settings.preferred_output_device.as_deref(),
    ) {
        Ok(output) => SinkHandle::new(output),
        Err(e) => {
            warn!("audio output unavailable ({e}), continuing without sound");
            SinkHandle::new(NullSink::new())
        }
    }
}

async fn read_stdin_text() -> anyhow::Result<String> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut text = String::new();
    while let Some(line) = lines.next_line().await? {
        text.push_str(&line);
        text.push(' ');
    }
    Ok(text)
}

fn export_wav(settings: &AppSettings, text: &str, out: &Path) -> anyhow::Result<()> {
    let samples = render_text(
        &flatten_whitespace(text),
        settings.player.initial_wpm,
        settings.player.tone,
        REFERENCE_SAMPLE_RATE,
    );
    write_wav(out, &samples, REFERENCE_SAMPLE_RATE)
        .with_context(|| format!("writing {}", out.display()))?;
    println!(
        "wrote {} ({:.1} s)",
        out.display(),
        samples.len() as f64 / REFERENCE_SAMPLE_RATE as f64
    );
    Ok(())
}

/// Print each character as it starts sounding.
fn spawn_character_echo(player: &MorsePlayer) {
    let mut rx = player.subscribe_characters();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    print!("{}", event.character);
                    let _ = std::io::stdout().flush();
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    tracing::debug!("character echo lagged by {n} events");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

/// Push stdin lines into the queue as they arrive. Resolves at EOF.
async fn feed_stdin(player: Arc<MorsePlayer>) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = flatten_whitespace(&line);
        if line.is_empty() {
            continue;
        }
        player.push_text(&line);
        player.push_text(" ");
    }
    Ok(())
}

async fn wait_for_drain(player: &MorsePlayer) {
    let mut poll = tokio::time::interval(DRAIN_POLL);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                return;
            }
            _ = poll.tick() => {
                if player.is_drained() || !player.is_running() {
                    return;
                }
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Tracing ───────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "morse=info,morse_core=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}\n\n{USAGE}");
            std::process::exit(2);
        }
    };

    if args.list_devices {
        for device in list_output_devices() {
            let marker = if device.is_default { " (default)" } else { "" };
            println!("{}{marker}", device.name);
        }
        return Ok(());
    }

    let settings_path = args.settings.clone().unwrap_or_else(default_settings_path);
    let mut settings = load_settings(&settings_path);
    apply_overrides(&mut settings, &args);
    info!(
        settings = %settings_path.display(),
        wpm = settings.player.initial_wpm,
        "Morse player starting"
    );

    if args.save_settings {
        save_settings(&settings_path, &settings)
            .with_context(|| format!("saving {}", settings_path.display()))?;
        info!("settings saved");
    }

    if let Some(out) = &args.wav {
        let text = match &settings.story_path {
            Some(path) => load_story(path),
            None => read_stdin_text().await?,
        };
        return export_wav(&settings, &text, out);
    }

    let sink = open_sink(&settings, args.no_audio);
    let player = Arc::new(MorsePlayer::new(settings.player.clone(), sink));
    spawn_character_echo(&player);

    player.start()?;
    player.set_playing(true);

    match &settings.story_path {
        Some(path) => {
            let text = flatten_whitespace(&load_story(path));
            player.push_text(&text);
            wait_for_drain(&player).await;
        }
        None => {
            let feeder = tokio::spawn(feed_stdin(Arc::clone(&player)));
            tokio::select! {
                _ = tokio::signal::ctrl_c() => info!("interrupted"),
                res = feeder => {
                    if let Ok(Err(e)) = res {
                        warn!("stdin reader failed: {e}");
                    }
                    wait_for_drain(&player).await;
                }
            }
        }
    }

    println!();
    let diagnostics = player.diagnostics_snapshot();
    info!(
        played = diagnostics.characters_played,
        skipped = diagnostics.characters_skipped,
        dropped = diagnostics.characters_dropped,
        "playback finished"
    );

    if player.is_running() {
        let stopper = Arc::clone(&player);
        tokio::task::spawn_blocking(move || stopper.stop()).await??;
    } else {
        warn!(status = ?player.status(), "player had already stopped");
    }
    Ok(())
}
