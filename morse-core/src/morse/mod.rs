//! Morse symbols, PARIS timing, and the per-character hold plan.
//!
//! ## Timing (in units, 1 unit = 1.2 / WPM seconds)
//!
//! ```text
//! dot 1 | dash 3 | symbol gap 1 | character gap 3 | word gap 7
//! ```
//!
//! A character is played as `tone, gap(1)` per element followed by a
//! trailing `gap(2)`, which together with the last symbol gap makes the
//! 3-unit character gap. A space is a single 7-unit gap.

pub mod table;

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use table::code_for;

pub const MIN_WPM: f32 = 5.0;
pub const MAX_WPM: f32 = 30.0;
pub const DEFAULT_WPM: f32 = 20.0;

/// Seconds per unit at 1 WPM (50 units per PARIS word, 60 s per minute).
const PARIS_SECONDS_PER_UNIT: f64 = 1.2;

/// One element of a Morse transmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MorseSymbol {
    Dot,
    Dash,
    SymbolGap,
    CharacterGap,
    WordGap,
}

impl MorseSymbol {
    /// Length in time units.
    pub fn units(self) -> u32 {
        match self {
            MorseSymbol::Dot => 1,
            MorseSymbol::Dash => 3,
            MorseSymbol::SymbolGap => 1,
            MorseSymbol::CharacterGap => 3,
            MorseSymbol::WordGap => 7,
        }
    }

    /// Whether the symbol keys the tone.
    pub fn is_tone(self) -> bool {
        matches!(self, MorseSymbol::Dot | MorseSymbol::Dash)
    }
}

/// Clamp a requested speed into the supported range. NaN maps to the default.
pub fn clamp_wpm(wpm: f32) -> f32 {
    if wpm.is_nan() {
        return DEFAULT_WPM;
    }
    wpm.clamp(MIN_WPM, MAX_WPM)
}

/// Length of one time unit in seconds: `1.2 / wpm`.
pub fn unit_seconds(wpm: f32) -> f64 {
    PARIS_SECONDS_PER_UNIT / clamp_wpm(wpm) as f64
}

/// Length of one time unit at `wpm`.
pub fn unit_duration(wpm: f32) -> Duration {
    Duration::from_secs_f64(unit_seconds(wpm))
}

/// Duration of `units` time units at `wpm`.
pub fn units_duration(units: u32, wpm: f32) -> Duration {
    Duration::from_secs_f64(unit_seconds(wpm) * units as f64)
}

/// One timed interval of the playback plan: tone on or silence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hold {
    pub tone: bool,
    pub units: u32,
}

impl Hold {
    const fn tone(units: u32) -> Self {
        Self { tone: true, units }
    }

    const fn silence(units: u32) -> Self {
        Self { tone: false, units }
    }
}

/// What a queued character plays as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Glyph {
    /// The space character: a word gap and nothing else.
    WordGap,
    Code(&'static [MorseSymbol]),
}

impl Glyph {
    /// Resolve a character. `None` means it is skipped with no tone and no delay.
    pub fn of(c: char) -> Option<Self> {
        if c == ' ' {
            return Some(Glyph::WordGap);
        }
        code_for(c).map(Glyph::Code)
    }

    /// Ordered tone/silence intervals, in units. Durations are resolved by
    /// the caller so WPM can change between holds.
    pub fn holds(self) -> Vec<Hold> {
        match self {
            Glyph::WordGap => vec![Hold::silence(MorseSymbol::WordGap.units())],
            Glyph::Code(code) => {
                let mut holds = Vec::with_capacity(code.len() * 2 + 1);
                for symbol in code {
                    holds.push(Hold::tone(symbol.units()));
                    holds.push(Hold::silence(MorseSymbol::SymbolGap.units()));
                }
                holds.push(Hold::silence(
                    MorseSymbol::CharacterGap.units() - MorseSymbol::SymbolGap.units(),
                ));
                holds
            }
        }
    }

    /// Total length in units.
    pub fn total_units(self) -> u32 {
        self.holds().iter().map(|h| h.units).sum()
    }
}

/// Encode text as a flat symbol stream for display and inspection.
///
/// Elements of one character are separated by `SymbolGap`, characters of a
/// word by `CharacterGap`, and each space becomes a `WordGap`. Unmapped
/// characters are dropped.
pub fn encode(text: &str) -> Vec<MorseSymbol> {
    let mut out = Vec::new();
    let mut after_character = false;

    for c in text.chars() {
        match Glyph::of(c) {
            Some(Glyph::WordGap) => {
                out.push(MorseSymbol::WordGap);
                after_character = false;
            }
            Some(Glyph::Code(code)) => {
                if after_character {
                    out.push(MorseSymbol::CharacterGap);
                }
                for (i, symbol) in code.iter().enumerate() {
                    if i > 0 {
                        out.push(MorseSymbol::SymbolGap);
                    }
                    out.push(*symbol);
                }
                after_character = true;
            }
            None => {}
        }
    }
    out
}
