//! Text preparation in front of the synthesis engine.

use std::borrow::Cow;

use crate::{SynthesisEngine, SynthesisResult, VoiceParams};

const TERMINAL_PUNCTUATION: [char; 3] = ['.', '!', '?'];

/// Trim `text` and make sure it ends in `.`, `!` or `?`.
///
/// Kokoro reads a bare word such as "Pushups" with rising, question-like
/// intonation; a trailing period forces a statement.
pub fn with_terminal_punctuation(text: &str) -> Cow<'_, str> {
    let trimmed = text.trim();
    if trimmed.ends_with(TERMINAL_PUNCTUATION) {
        Cow::Borrowed(trimmed)
    } else {
        Cow::Owned(format!("{trimmed}."))
    }
}

/// Speak one item's text with the run's voice settings.
pub fn speak<E: SynthesisEngine + ?Sized>(
    engine: &mut E,
    text: &str,
    params: &VoiceParams,
) -> Result<SynthesisResult, Box<dyn std::error::Error>> {
    let prepared = with_terminal_punctuation(text);
    log::debug!("Synthesizing {prepared:?} with voice {}", params.voice);
    engine.synthesize(&prepared, params)
}
