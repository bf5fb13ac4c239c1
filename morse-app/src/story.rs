//! Story text loading.

use std::fs;
use std::path::Path;

use tracing::{info, warn};

/// Text queued in place of a story that could not be read.
pub const MISSING_STORY_TEXT: &str = "ERROR NO STORY.TXT";

/// Read the story at `path`, or the placeholder message if it can't be read.
pub fn load_story(path: &Path) -> String {
    match fs::read_to_string(path) {
        Ok(text) => {
            info!(path = %path.display(), chars = text.chars().count(), "story loaded");
            text
        }
        Err(e) => {
            warn!(path = %path.display(), "failed to read story: {e}");
            MISSING_STORY_TEXT.to_string()
        }
    }
}

/// Collapse line breaks and runs of whitespace into single spaces so each
/// break plays as one word gap.
pub fn flatten_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
