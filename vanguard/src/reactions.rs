use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

// One pictograph, optionally dressed with a variation selector or skin tone,
// optionally joined to further pictographs with ZWJ. Keycaps and bare digits are out.
static EMOJI: LazyLock<Regex> = LazyLock::new(|| {
    let glyph = r"(?:\p{Extended_Pictographic}|\p{Emoji_Presentation})[\x{FE0F}\p{Emoji_Modifier}]*";
    Regex::new(&format!(r"^(?:\p{{Regional_Indicator}}{{2}}|{glyph}(?:\x{{200D}}{glyph})*)$")).expect("emoji pattern is valid")
});

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReactionError {
    #[error("reaction cannot be empty")]
    Empty,
    #[error("reaction must be a single emoji, got {0:?}")]
    NotEmoji(String),
}

/// Validate a reaction and return it trimmed.
pub fn validate_emoji(raw: &str) -> Result<String, ReactionError> {
    let emoji = raw.trim();
    if emoji.is_empty() {
        return Err(ReactionError::Empty);
    }
    if !EMOJI.is_match(emoji) {
        return Err(ReactionError::NotEmoji(emoji.to_string()));
    }
    Ok(emoji.to_string())
}
