//! Work-list extraction: activity names, coaching sentences and numbers.
//!
//! Every item gets its destination path from [`normalize_filename`], so two
//! texts that differ only in case or in space/underscore choice share one file.
//! Duplicates are dropped here, before the orchestrator ever sees them.

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::config::PipelineConfig;
use crate::error::CorpusError;

/// Numbers spoken during countdowns and rep counts.
pub const DEFAULT_NUMBERS: RangeInclusive<u32> = 0..=50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemCategory {
    Activity,
    Sentence,
    Number,
}

impl fmt::Display for ItemCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemCategory::Activity => write!(f, "activity"),
            ItemCategory::Sentence => write!(f, "sentence"),
            ItemCategory::Number => write!(f, "number"),
        }
    }
}

/// One text to speak and the file it ends up in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeakableItem {
    pub text: String,
    pub category: ItemCategory,
    pub destination: PathBuf,
}

impl SpeakableItem {
    /// File name of the final asset, for progress lines.
    pub fn file_name(&self) -> String {
        self.destination
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Where the external content lives.
#[derive(Debug, Clone)]
pub struct CorpusSources {
    /// Directory of per-day workout definitions (`*.json`).
    pub workout_dir: PathBuf,
    /// Flat JSON array of coaching sentences. Optional on disk.
    pub sentences_file: PathBuf,
    pub numbers: RangeInclusive<u32>,
    /// Skip malformed workout files with a warning instead of aborting.
    pub lenient_workouts: bool,
}

impl CorpusSources {
    /// Sources laid out as `<data_dir>/workouts/*.json` and `<data_dir>/sentences.json`.
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        let data_dir = data_dir.as_ref();
        Self {
            workout_dir: data_dir.join("workouts"),
            sentences_file: data_dir.join("sentences.json"),
            numbers: DEFAULT_NUMBERS,
            lenient_workouts: false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WorkoutDay {
    #[serde(default)]
    activities: Vec<Activity>,
}

#[derive(Debug, Deserialize)]
struct Activity {
    #[serde(default)]
    name: Option<String>,
}

/// Turn display text into a file stem.
///
/// Lowercases, maps spaces, underscores and other whitespace to `-`, keeps
/// ASCII letters, digits, `-` and `&`, and drops everything else.
pub fn normalize_filename(text: &str) -> String {
    text.chars()
        .flat_map(char::to_lowercase)
        .filter_map(|ch| match ch {
            '_' => Some('-'),
            c if c.is_whitespace() => Some('-'),
            c if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '&' => Some(c),
            _ => None,
        })
        .collect()
}

/// Build the ordered work list: sorted activities, then sentences in file
/// order, then the number range ascending.
///
/// Fails when the workout directory is missing or (unless lenient) any
/// workout file cannot be read or parsed.
pub fn extract(
    sources: &CorpusSources,
    config: &PipelineConfig,
) -> Result<Vec<SpeakableItem>, CorpusError> {
    let activities = extract_activity_names(&sources.workout_dir, sources.lenient_workouts)?;
    let sentences = extract_sentences(&sources.sentences_file)?;
    log::info!(
        "Found {} activities and {} sentences",
        activities.len(),
        sentences.len()
    );

    let mut items = Vec::new();
    let mut seen = HashSet::new();
    let mut push = |text: String, stem: String, category: ItemCategory| {
        if stem.is_empty() {
            log::warn!("Skipping {category} {text:?}: no usable filename characters");
            return;
        }
        let destination = config.destination(&stem);
        if !seen.insert(destination.clone()) {
            log::debug!("Dropping duplicate {category} {text:?} -> {}", destination.display());
            return;
        }
        items.push(SpeakableItem {
            text,
            category,
            destination,
        });
    };

    for name in activities {
        let stem = normalize_filename(&name);
        push(name, stem, ItemCategory::Activity);
    }
    for sentence in sentences {
        let stem = normalize_filename(&sentence);
        push(sentence, stem, ItemCategory::Sentence);
    }
    for n in sources.numbers.clone() {
        push(n.to_string(), n.to_string(), ItemCategory::Number);
    }

    Ok(items)
}

/// Collect every activity `name` across the workout files into a sorted set.
pub fn extract_activity_names(
    workout_dir: &Path,
    lenient: bool,
) -> Result<BTreeSet<String>, CorpusError> {
    if !workout_dir.is_dir() {
        return Err(CorpusError::MissingWorkoutDir(workout_dir.to_path_buf()));
    }

    let read_err = |source| CorpusError::Read {
        path: workout_dir.to_path_buf(),
        source,
    };
    let mut files = Vec::new();
    for entry in std::fs::read_dir(workout_dir).map_err(read_err)? {
        let path = entry.map_err(read_err)?.path();
        if path.extension().and_then(|e| e.to_str()) == Some("json") {
            files.push(path);
        }
    }
    files.sort();

    let mut names = BTreeSet::new();
    for path in files {
        match read_json::<WorkoutDay>(&path) {
            Ok(day) => names.extend(
                day.activities
                    .into_iter()
                    .filter_map(|a| a.name)
                    .filter(|n| !n.trim().is_empty()),
            ),
            Err(e) if lenient => log::warn!("Skipping workout file: {e}"),
            Err(e) => return Err(e),
        }
    }
    Ok(names)
}

/// Read the sentence list. A missing file or a non-array document yields nothing.
pub fn extract_sentences(path: &Path) -> Result<Vec<String>, CorpusError> {
    if !path.exists() {
        log::info!("No sentences file at {}", path.display());
        return Ok(Vec::new());
    }

    let value: serde_json::Value = read_json(path)?;
    let Some(entries) = value.as_array() else {
        log::warn!("{} is not a JSON array, ignoring it", path.display());
        return Ok(Vec::new());
    };

    Ok(entries
        .iter()
        .filter_map(|entry| match entry.as_str() {
            Some(s) => Some(s.to_string()),
            None => {
                log::warn!("Ignoring non-string sentence entry {entry}");
                None
            }
        })
        .collect())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, CorpusError> {
    let content = std::fs::read_to_string(path).map_err(|source| CorpusError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| CorpusError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfigBuilder;
    use std::fs;

    fn config(out: &Path) -> PipelineConfig {
        PipelineConfigBuilder::default().output_dir(out).build().unwrap()
    }

    fn sources(root: &Path) -> CorpusSources {
        fs::create_dir_all(root.join("workouts")).unwrap();
        CorpusSources::new(root)
    }

    #[test]
    fn normalizes_case_spaces_and_underscores() {
        assert_eq!(normalize_filename("Jumping Jacks"), "jumping-jacks");
        assert_eq!(normalize_filename("jumping_jacks"), "jumping-jacks");
        assert_eq!(normalize_filename("Good job!"), "good-job");
        assert_eq!(normalize_filename("Rock & Roll"), "rock-&-roll");
        assert_eq!(normalize_filename("Café"), "caf");
        assert_eq!(normalize_filename("?!"), "");
    }

    #[test]
    fn normalized_names_are_lowercase_ascii() {
        for text in ["ÄBC def", "Tab\there", "Push-Ups_2", "Ünïcödé ß", "MiXeD"] {
            let name = normalize_filename(text);
            assert_eq!(name, normalize_filename(text));
            assert!(name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '&'));
        }
    }

    #[test]
    fn case_differing_activities_collapse_to_one_item() {
        let dir = tempfile::tempdir().unwrap();
        let src = sources(dir.path());
        fs::write(
            src.workout_dir.join("day1.json"),
            r#"{"activities": [{"name": "Jumping Jacks"}, {"name": "Squats"}]}"#,
        )
        .unwrap();
        fs::write(
            src.workout_dir.join("day2.json"),
            r#"{"activities": [{"name": "jumping jacks"}, {"duration": 30}]}"#,
        )
        .unwrap();

        let items = extract(&src, &config(Path::new("out"))).unwrap();
        let activities: Vec<_> = items
            .iter()
            .filter(|i| i.category == ItemCategory::Activity)
            .collect();
        assert_eq!(activities.len(), 2);
        assert_eq!(activities[0].text, "Jumping Jacks");
        assert_eq!(activities[0].file_name(), "jumping-jacks.m4a");
        assert_eq!(activities[1].file_name(), "squats.m4a");
    }

    #[test]
    fn numbers_cover_zero_through_fifty() {
        let dir = tempfile::tempdir().unwrap();
        let items = extract(&sources(dir.path()), &config(Path::new("out"))).unwrap();

        assert_eq!(items.len(), 51);
        assert_eq!(items[0].file_name(), "0.m4a");
        assert_eq!(items[50].file_name(), "50.m4a");
        assert!(items.iter().all(|i| i.category == ItemCategory::Number));
        assert!(!items.iter().any(|i| i.text == "51"));
    }

    #[test]
    fn order_is_activities_then_sentences_then_numbers() {
        let dir = tempfile::tempdir().unwrap();
        let mut src = sources(dir.path());
        src.numbers = 0..=1;
        fs::write(
            src.workout_dir.join("day1.json"),
            r#"{"activities": [{"name": "Squats"}, {"name": "Burpees"}]}"#,
        )
        .unwrap();
        fs::write(&src.sentences_file, r#"["Keep going!", "Good job", 7]"#).unwrap();

        let items = extract(&src, &config(Path::new("out"))).unwrap();
        let texts: Vec<_> = items.iter().map(|i| i.text.as_str()).collect();
        assert_eq!(texts, ["Burpees", "Squats", "Keep going!", "Good job", "0", "1"]);
    }

    #[test]
    fn missing_sentences_file_yields_no_sentences() {
        let dir = tempfile::tempdir().unwrap();
        assert!(extract_sentences(&dir.path().join("sentences.json"))
            .unwrap()
            .is_empty());

        let not_a_list = dir.path().join("object.json");
        fs::write(&not_a_list, r#"{"a": 1}"#).unwrap();
        assert!(extract_sentences(&not_a_list).unwrap().is_empty());
    }

    #[test]
    fn malformed_workout_aborts_unless_lenient() {
        let dir = tempfile::tempdir().unwrap();
        let mut src = sources(dir.path());
        fs::write(src.workout_dir.join("bad.json"), "{ not json").unwrap();
        fs::write(
            src.workout_dir.join("good.json"),
            r#"{"activities": [{"name": "Lunges"}]}"#,
        )
        .unwrap();

        let err = extract(&src, &config(Path::new("out"))).unwrap_err();
        assert!(matches!(err, CorpusError::Parse { .. }));

        src.lenient_workouts = true;
        let names = extract_activity_names(&src.workout_dir, true).unwrap();
        assert_eq!(names.into_iter().collect::<Vec<_>>(), ["Lunges"]);
    }

    #[test]
    fn missing_workout_dir_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let src = CorpusSources::new(dir.path().join("nope"));
        assert!(matches!(
            extract(&src, &config(Path::new("out"))),
            Err(CorpusError::MissingWorkoutDir(_))
        ));
    }
}
