use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::model::{KokoroError, STYLE_DIM};

type StyleVector = [f32; STYLE_DIM];

/// Style vectors for every voice in the archive.
///
/// Each voice holds one vector per phoneme-sequence length; picking the
/// vector by token count keeps prosody consistent with utterance length.
pub struct VoiceStore {
    voices: HashMap<String, Vec<StyleVector>>,
}

impl VoiceStore {
    /// Load every `<voice>.npy` entry of a numpy `.npz` archive.
    pub fn load(path: &Path) -> Result<Self, KokoroError> {
        let mut zip = zip::ZipArchive::new(File::open(path)?)
            .map_err(|e| KokoroError::VoiceParse(format!("{}: {e}", path.display())))?;

        let mut voices = HashMap::new();
        for i in 0..zip.len() {
            let mut entry = zip
                .by_index(i)
                .map_err(|e| KokoroError::VoiceParse(format!("zip entry {i}: {e}")))?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().trim_end_matches(".npy").to_string();
            if name.is_empty() {
                continue;
            }

            let mut data = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut data)?;
            let styles = parse_npy(&data, &name)?;
            voices.insert(name, styles);
        }

        log::info!("Loaded {} voices from {}", voices.len(), path.display());
        Ok(Self { voices })
    }

    /// Style vector for `voice` at `idx`, clamped to the last available one.
    pub fn get_style(&self, voice: &str, idx: usize) -> Result<StyleVector, KokoroError> {
        let styles = self
            .voices
            .get(voice)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| KokoroError::VoiceNotFound(voice.to_string()))?;
        Ok(styles[idx.min(styles.len() - 1)])
    }

    /// All voice names, sorted.
    pub fn list_voices(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.voices.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Parse a little-endian float32 `.npy` payload shaped `[N, 256]` (or
/// `[N, 1, 256]`; only the element count matters).
fn parse_npy(data: &[u8], name: &str) -> Result<Vec<StyleVector>, KokoroError> {
    let bad = |reason: String| KokoroError::VoiceParse(format!("{name}: {reason}"));

    if data.len() < 10 || &data[..6] != b"\x93NUMPY" {
        return Err(bad("not a numpy file".to_string()));
    }
    // v1 headers store a u16 length at [8..10], v2+ a u32 at [8..12]
    let (header_len, prefix) = match data[6] {
        1 => (u16::from_le_bytes([data[8], data[9]]) as usize, 10),
        _ if data.len() >= 12 => (
            u32::from_le_bytes([data[8], data[9], data[10], data[11]]) as usize,
            12,
        ),
        _ => return Err(bad("truncated header".to_string())),
    };
    let payload = data
        .get(prefix + header_len..)
        .ok_or_else(|| bad(format!("header claims {header_len} bytes")))?;

    let row_bytes = STYLE_DIM * 4;
    if payload.len() % row_bytes != 0 {
        return Err(bad(format!(
            "{} payload bytes is not a whole number of {STYLE_DIM}-float rows",
            payload.len()
        )));
    }

    Ok(payload
        .chunks_exact(row_bytes)
        .map(|row| {
            let mut style = [0f32; STYLE_DIM];
            for (dst, bytes) in style.iter_mut().zip(row.chunks_exact(4)) {
                *dst = f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            }
            style
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn npy(rows: usize) -> Vec<u8> {
        let header = b"{'descr': '<f4', 'fortran_order': False, 'shape': (2, 256), }\n";
        let mut data = b"\x93NUMPY\x01\x00".to_vec();
        data.extend_from_slice(&(header.len() as u16).to_le_bytes());
        data.extend_from_slice(header);
        for r in 0..rows {
            for c in 0..STYLE_DIM {
                data.extend_from_slice(&((r * 1000 + c) as f32).to_le_bytes());
            }
        }
        data
    }

    #[test]
    fn parses_style_rows() {
        let styles = parse_npy(&npy(2), "af_test").unwrap();
        assert_eq!(styles.len(), 2);
        assert_eq!(styles[1][0], 1000.0);
        assert_eq!(styles[1][255], 1255.0);
    }

    #[test]
    fn rejects_partial_rows_and_bad_magic() {
        let mut data = npy(1);
        data.pop();
        assert!(parse_npy(&data, "x").is_err());
        assert!(parse_npy(b"PK\x03\x04garbage", "x").is_err());
    }

    #[test]
    fn style_index_is_clamped() {
        let store = VoiceStore {
            voices: HashMap::from([("af_test".to_string(), parse_npy(&npy(2), "af_test").unwrap())]),
        };
        assert_eq!(store.get_style("af_test", 99).unwrap()[0], 1000.0);
        assert!(matches!(
            store.get_style("bf_nope", 0),
            Err(KokoroError::VoiceNotFound(_))
        ));
        assert_eq!(store.list_voices(), ["af_test"]);
    }
}
