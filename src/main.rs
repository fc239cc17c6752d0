//! `workout-voices` - render every spoken asset of the workout app.
//!
//! Reads the workout definitions and sentence list of a project checkout,
//! synthesizes each missing item with Kokoro, applies the robotic preset and
//! writes AAC files into the per-voice output directory.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use clap::builder::PossibleValuesParser;
use clap::Parser;

use workout_voices::config::{PipelineConfig, PipelineConfigBuilder};
use workout_voices::corpus::{self, CorpusSources};
use workout_voices::effects::EffectPreset;
use workout_voices::engines::kokoro::{KokoroEngine, KokoroModelParams};
use workout_voices::output::FfmpegTranscoder;
use workout_voices::pipeline::Pipeline;
use workout_voices::{SynthesisEngine, VoiceParams};

#[derive(Parser, Debug)]
#[command(name = "workout-voices")]
#[command(version, about = "Generate robotic voice-over assets for the workout app", long_about = None)]
struct Cli {
    /// Project checkout holding `src/lib/data` and `static/`
    #[arg(long, env = "WORKOUT_PROJECT_ROOT", default_value = ".")]
    project_root: PathBuf,

    /// Directory of per-day workout JSON files [default: <root>/src/lib/data/workouts]
    #[arg(long, env = "WORKOUT_DIR")]
    workout_dir: Option<PathBuf>,

    /// Coaching sentences JSON array [default: <root>/src/lib/data/sentences.json]
    #[arg(long, env = "WORKOUT_SENTENCES_FILE")]
    sentences_file: Option<PathBuf>,

    /// Directory with kokoro-v1.0.onnx and voices-v1.0.bin [default: <root>]
    #[arg(long, short = 'd', env = "MODEL_DIR")]
    model_dir: Option<PathBuf>,

    /// Where assets are written [default: <root>/static/audio/voice/<voice>]
    #[arg(long, short = 'o', env = "WORKOUT_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Kokoro voice name
    #[arg(long, env = "WORKOUT_VOICE", default_value = "af_heart")]
    voice: String,

    /// Speech speed multiplier (0.5 - 2.0)
    #[arg(long, default_value = "0.8")]
    speed: f32,

    /// espeak-ng language code
    #[arg(long, default_value = "en-us")]
    lang: String,

    /// Effect preset applied to every item
    #[arg(long, default_value = "robotic", value_parser = PossibleValuesParser::new(EffectPreset::NAMES))]
    preset: String,

    /// Extension of the final files
    #[arg(long, default_value = "m4a")]
    extension: String,

    /// ffmpeg binary used for transcoding
    #[arg(long, env = "FFMPEG", default_value = "ffmpeg")]
    ffmpeg: PathBuf,

    /// Extra ffmpeg attempts after a failed transcode
    #[arg(long, default_value = "2")]
    transcode_retries: u32,

    /// Skip malformed workout files instead of aborting
    #[arg(long)]
    lenient_workouts: bool,

    /// Print the work list without synthesizing anything
    #[arg(long)]
    dry_run: bool,

    /// List the voices in the voice archive and exit
    #[arg(long)]
    list_voices: bool,

    /// ONNX Runtime intra-op threads [default: all cores]
    #[arg(long, env = "WORKOUT_THREADS")]
    threads: Option<usize>,
}

impl Cli {
    fn voice_params(&self) -> VoiceParams {
        VoiceParams {
            voice: self.voice.clone(),
            speed: self.speed,
            lang: Some(self.lang.clone()),
            style_index: None,
        }
    }

    fn corpus_sources(&self) -> CorpusSources {
        let mut sources = CorpusSources::new(self.project_root.join("src").join("lib").join("data"));
        if let Some(dir) = &self.workout_dir {
            sources.workout_dir = dir.clone();
        }
        if let Some(file) = &self.sentences_file {
            sources.sentences_file = file.clone();
        }
        sources.lenient_workouts = self.lenient_workouts;
        sources
    }

    fn pipeline_config(&self) -> Result<PipelineConfig> {
        let voice = self.voice_params();
        let output_dir = self
            .output_dir
            .clone()
            .unwrap_or_else(|| PipelineConfig::default_output_dir(&self.project_root, &voice));
        let preset = EffectPreset::by_name(&self.preset)
            .ok_or_else(|| anyhow!("unknown preset {:?}", self.preset))?;

        PipelineConfigBuilder::default()
            .output_dir(output_dir)
            .extension(self.extension.clone())
            .voice(voice)
            .preset(preset)
            .dry_run(self.dry_run)
            .build()
            .context("invalid configuration")
    }

    fn transcoder(&self) -> FfmpegTranscoder {
        FfmpegTranscoder {
            program: self.ffmpeg.clone(),
            retries: self.transcode_retries,
            ..FfmpegTranscoder::default()
        }
    }
}

fn load_engine(cli: &Cli) -> Result<KokoroEngine> {
    let model_dir = cli.model_dir.as_ref().unwrap_or(&cli.project_root);
    log::info!("Loading Kokoro from {}", model_dir.display());

    let start = Instant::now();
    let mut engine = KokoroEngine::new();
    engine
        .load_model_with_params(
            model_dir,
            KokoroModelParams {
                num_threads: cli.threads,
            },
        )
        .map_err(|e| anyhow!("{e}"))
        .with_context(|| format!("failed to load Kokoro from {}", model_dir.display()))?;
    log::info!("Model loaded in {:.2?}", start.elapsed());
    Ok(engine)
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = cli.pipeline_config()?;

    if cli.list_voices {
        let engine = load_engine(&cli)?;
        for voice in engine.list_voices() {
            println!("{voice}");
        }
        return Ok(ExitCode::SUCCESS);
    }

    let items = corpus::extract(&cli.corpus_sources(), &config)
        .context("failed to extract the work list")?;
    let transcoder = cli.transcoder();

    if config.dry_run {
        log::info!(
            "Dry run with preset {}",
            serde_json::to_string(&config.preset).context("failed to serialize preset")?
        );
        let mut engine = KokoroEngine::new();
        let summary = Pipeline::new(&mut engine, &transcoder, &config).plan(&items);
        println!(
            "{} items: {} to generate, {} already present in {}",
            summary.total(),
            summary.done,
            summary.skipped,
            config.output_dir.display()
        );
        return Ok(ExitCode::SUCCESS);
    }

    let mut engine = load_engine(&cli)?;
    engine.ensure_voice(&config.voice.voice)?;

    let start = Instant::now();
    let summary = Pipeline::new(&mut engine, &transcoder, &config).run(&items)?;
    let elapsed = Duration::from_secs(start.elapsed().as_secs());
    println!("{summary}");
    println!("Finished in {elapsed:?}");

    Ok(if summary.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
