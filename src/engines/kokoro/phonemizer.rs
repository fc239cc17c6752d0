use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use super::model::KokoroError;

/// Location of the espeak-ng binary and its data directory.
#[derive(Debug, Clone, Default)]
pub struct EspeakConfig {
    /// `None` runs `espeak-ng` from PATH.
    pub bin_path: Option<PathBuf>,
    /// `None` uses the binary's compiled-in data directory.
    pub data_path: Option<PathBuf>,
}

impl EspeakConfig {
    fn command(&self) -> Command {
        let mut cmd = Command::new(
            self.bin_path
                .as_deref()
                .unwrap_or_else(|| std::path::Path::new("espeak-ng")),
        );
        if let Some(data) = &self.data_path {
            cmd.env("ESPEAK_DATA_PATH", data);
        }
        cmd
    }
}

/// Map a voice name prefix to an espeak-ng language code.
pub fn voice_lang(voice: &str) -> &'static str {
    match voice.get(..2).unwrap_or_default() {
        "af" | "am" => "en-us",
        "bf" | "bm" => "en-gb",
        "ef" | "em" => "es",
        "ff" => "fr",
        "hf" | "hm" => "hi",
        "if" | "im" => "it",
        "jf" | "jm" => "ja",
        "pf" | "pm" => "pt-br",
        "zf" | "zm" => "cmn",
        _ => "en-us",
    }
}

/// Convert text to Kokoro token ids.
///
/// Words go through espeak-ng; sentence punctuation is kept as its own token
/// so the model sees the statement or question mark at the end. Characters
/// missing from `vocab` are dropped.
pub fn phonemize(
    text: &str,
    lang: &str,
    vocab: &HashMap<char, i64>,
    espeak: &EspeakConfig,
) -> Result<Vec<i64>, KokoroError> {
    let parts = split_text_parts(text);
    let words: Vec<&str> = parts
        .iter()
        .filter_map(|part| match part {
            TextPart::Text(segment) => Some(segment.as_str()),
            TextPart::Punct(_) => None,
        })
        .collect();
    if words.is_empty() {
        return Ok(parts
            .iter()
            .filter_map(|part| match part {
                TextPart::Punct(ch) => vocab.get(ch).copied(),
                TextPart::Text(_) => None,
            })
            .collect());
    }

    let mut phonemes = phonemize_lines(&words, lang, espeak)?.into_iter();
    let mut ids = Vec::new();
    for part in &parts {
        match part {
            TextPart::Text(_) => {
                if let Some(ipa) = phonemes.next() {
                    ids.extend(ipa_to_ids(&ipa, vocab));
                }
            }
            TextPart::Punct(ch) => ids.extend(vocab.get(ch)),
        }
    }
    Ok(ids)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TextPart {
    Text(String),
    Punct(char),
}

fn split_text_parts(text: &str) -> Vec<TextPart> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let chars: Vec<char> = text.chars().collect();

    for (i, &ch) in chars.iter().enumerate() {
        let between_digits = matches!(ch, '.' | ',')
            && i > 0
            && chars[i - 1].is_ascii_digit()
            && chars.get(i + 1).is_some_and(char::is_ascii_digit);

        match boundary_punctuation(ch) {
            Some(punct) if !between_digits => {
                flush_text(&mut parts, &mut current);
                parts.push(TextPart::Punct(punct));
            }
            _ if ch.is_whitespace() => {
                if !current.is_empty() && !current.ends_with(' ') {
                    current.push(' ');
                }
            }
            _ => current.push(ch),
        }
    }
    flush_text(&mut parts, &mut current);
    parts
}

fn flush_text(parts: &mut Vec<TextPart>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        parts.push(TextPart::Text(trimmed.to_string()));
    }
    current.clear();
}

fn boundary_punctuation(ch: char) -> Option<char> {
    match ch {
        '.' | '!' | '?' | ',' | ';' | ':' | '—' | '…' | '"' | '(' | ')' | '\u{201c}'
        | '\u{201d}' => Some(ch),
        '\n' | '\r' => Some('.'),
        _ => None,
    }
}

/// Phonemize each segment, one espeak-ng line per segment.
///
/// Falls back to one process per segment if espeak-ng merges or splits lines.
fn phonemize_lines(
    segments: &[&str],
    lang: &str,
    espeak: &EspeakConfig,
) -> Result<Vec<String>, KokoroError> {
    let output = run_espeak(&segments.join("\n"), lang, espeak)?;
    let lines: Vec<String> = output.lines().map(str::to_string).collect();
    if lines.len() == segments.len() {
        return Ok(lines);
    }

    log::debug!(
        "espeak-ng returned {} lines for {} segments, retrying one by one",
        lines.len(),
        segments.len()
    );
    segments
        .iter()
        .map(|segment| run_espeak(segment, lang, espeak))
        .collect()
}

fn run_espeak(input: &str, lang: &str, espeak: &EspeakConfig) -> Result<String, KokoroError> {
    let mut child = espeak
        .command()
        .args(["--ipa", "--stdin", "-q", "-v", lang])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => KokoroError::EspeakNotFound,
            _ => KokoroError::Io(e),
        })?;

    // espeak-ng under-processes a final line without a terminator
    let mut payload = input.as_bytes().to_vec();
    if !payload.ends_with(b"\n") {
        payload.push(b'\n');
    }
    // feed stdin from its own thread so a full stdout pipe cannot stall us
    let writer = child.stdin.take().map(|mut stdin| {
        std::thread::spawn(move || stdin.write_all(&payload))
    });

    let output = child.wait_with_output()?;
    if let Some(writer) = writer {
        writer
            .join()
            .map_err(|_| KokoroError::PhonemizerFailed("stdin writer panicked".to_string()))??;
    }
    if !output.status.success() {
        return Err(KokoroError::PhonemizerFailed(format!(
            "espeak-ng exited with code {:?}: {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stderr)
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn ipa_to_ids(ipa: &str, vocab: &HashMap<char, i64>) -> Vec<i64> {
    ipa.lines()
        .flat_map(|line| line.trim().chars())
        .filter(|&ch| ch != '_')
        .filter_map(|ch| vocab.get(&ch).copied())
        .collect()
}
