use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use corpuscut::config::{load_policy_from_sources, ChunkPolicy, RuntimePolicy};
use corpuscut::corpus::run_corpus;
use corpuscut::metadata::{write_metadata, CommandPhonemizer};
use corpuscut::transcription::{transcribe_corpus, TranscriberOptions};

/// corpuscut - speech corpus chunk preparation tool
///
/// Transcribes recordings, selects one well-formed utterance chunk per
/// recording, and phonemizes the results into a training metadata table.
#[derive(Parser, Debug)]
#[command(name = "corpuscut")]
#[command(version)]
#[command(about = "Speech corpus chunk preparation tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Transcribe a folder of WAV recordings into word-level transcript JSONs.
    Transcribe(TranscribeArgs),
    /// Select and export one bounded utterance chunk per recording.
    Chunk(ChunkArgs),
    /// Phonemize exported chunk records into a tab-separated metadata table.
    Metadata(MetadataArgs),
}

#[derive(Args, Debug)]
struct TranscribeArgs {
    /// Directory containing input WAV files.
    #[arg(value_name = "WAV_DIR")]
    wav_dir: PathBuf,

    /// Directory where transcript JSONs will be written.
    #[arg(value_name = "OUT_DIR")]
    out_dir: PathBuf,

    /// Path to the Whisper ggml model (falls back to WHISPER_MODEL_PATH).
    #[arg(long, value_name = "PATH")]
    model: Option<PathBuf>,

    /// Language hint passed to the model.
    #[arg(long, default_value = "he")]
    language: String,
}

#[derive(Args, Debug)]
struct ChunkArgs {
    /// Corpus root containing transcripts/ and wav/ subdirectories.
    #[arg(value_name = "SRC_DIR")]
    src_dir: PathBuf,

    /// Output root; chunk pairs land in wav/ and transcripts/ underneath.
    #[arg(value_name = "DST_DIR")]
    dst_dir: PathBuf,

    /// JSON policy overrides (inline JSON string).
    #[arg(long, value_name = "JSON", conflicts_with = "policy_file")]
    policy_json: Option<String>,

    /// Path to a JSON policy override file.
    #[arg(long, value_name = "PATH", conflicts_with = "policy_json")]
    policy_file: Option<PathBuf>,

    /// Minimum accepted chunk duration in seconds.
    #[arg(long)]
    min_dur: Option<f64>,

    /// Maximum accepted chunk duration in seconds.
    #[arg(long)]
    max_dur: Option<f64>,

    /// Required silence before the next segment, in seconds.
    #[arg(long)]
    gap_required: Option<f64>,

    /// Audio padding taken on each side of a chunk, in seconds.
    #[arg(long)]
    silence_dur: Option<f64>,

    /// Tolerance around the corpus mean speech rate (fraction in [0, 1)).
    #[arg(long)]
    speed_tol: Option<f64>,

    /// Keep only chunks slower than the tolerance bound (true) or accept a
    /// band around the mean (false).
    #[arg(long)]
    strict_slow: Option<bool>,

    /// Number of parallel recording workers.
    #[arg(long, default_value_t = 1)]
    workers: usize,
}

impl ChunkArgs {
    fn validate(&self) -> Result<()> {
        if !self.src_dir.is_dir() {
            anyhow::bail!("Source corpus is not a directory: {:?}", self.src_dir);
        }
        if self.workers == 0 {
            anyhow::bail!("Worker count must be at least 1");
        }
        if self.dst_dir.exists() && !self.dst_dir.is_dir() {
            anyhow::bail!("Output path must be a directory: {:?}", self.dst_dir);
        }
        Ok(())
    }

    /// Defaults, then file/inline JSON overrides, then individual flags.
    fn policy(&self) -> Result<ChunkPolicy> {
        let overlay =
            load_policy_from_sources(self.policy_file.as_deref(), self.policy_json.as_deref())?;
        let base = overlay.apply_to(ChunkPolicy::default())?;
        let flags = RuntimePolicy {
            min_dur: self.min_dur,
            max_dur: self.max_dur,
            gap_required: self.gap_required,
            silence_dur: self.silence_dur,
            speed_tol: self.speed_tol,
            strict_slow: self.strict_slow,
        };
        flags.apply_to(base)
    }
}

#[derive(Args, Debug)]
struct MetadataArgs {
    /// Output root of the chunk step (reads transcripts/ underneath).
    #[arg(value_name = "SRC_DIR")]
    src_dir: PathBuf,

    /// Output metadata file (defaults to metadata.csv inside SRC_DIR).
    #[arg(long, value_name = "PATH")]
    out: Option<PathBuf>,

    /// External phonemizer program: chunk text on stdin, one
    /// "diacritized<TAB>phonemes" line on stdout.
    #[arg(long, value_name = "PROGRAM")]
    phonemizer: String,

    /// Extra argument passed to the phonemizer program (repeatable).
    #[arg(long = "phonemizer-arg", value_name = "ARG")]
    phonemizer_args: Vec<String>,

    /// Number of parallel phonemizer workers.
    #[arg(long, default_value_t = 16)]
    workers: usize,
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Command::Transcribe(args) => handle_transcribe(&args),
        Command::Chunk(args) => handle_chunk(&args),
        Command::Metadata(args) => handle_metadata(&args),
    }
}

fn handle_transcribe(args: &TranscribeArgs) -> Result<()> {
    let options = TranscriberOptions {
        model_path: args.model.clone(),
        language: args.language.clone(),
    };
    let written = transcribe_corpus(&args.wav_dir, &args.out_dir, &options)
        .context("Transcription pass failed")?;
    println!("Wrote {} transcripts to {:?}", written, args.out_dir);
    Ok(())
}

fn handle_chunk(args: &ChunkArgs) -> Result<()> {
    args.validate()
        .context("Failed to validate command-line arguments")?;
    let policy = args.policy().context("Failed to resolve chunk policy")?;

    let summary = run_corpus(&args.src_dir, &args.dst_dir, &policy, args.workers)?;

    println!("Mean speech rate: {:.2} words/sec", summary.mean_rate);
    println!(
        "Kept {} files, skipped {}",
        summary.stats.kept, summary.stats.skipped
    );
    println!(
        "Total duration in new folder: {}",
        summary.stats.formatted_duration()
    );
    Ok(())
}

fn handle_metadata(args: &MetadataArgs) -> Result<()> {
    let record_dir = args.src_dir.join("transcripts");
    let out_path = args
        .out
        .clone()
        .unwrap_or_else(|| args.src_dir.join("metadata.csv"));
    let phonemizer =
        CommandPhonemizer::new(args.phonemizer.as_str(), args.phonemizer_args.clone());
    let written = write_metadata(&record_dir, &out_path, &phonemizer, args.workers)?;
    println!("Wrote {} metadata rows to {:?}", written, out_path);
    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
