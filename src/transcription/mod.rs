//! Transcription module - converts audio to word-level transcripts
//!
//! Thin wrapper around whisper-rs. The model is loaded once and reused for
//! the whole corpus; token timestamps with single-token segments give the
//! word-level timing the chunk scanner needs.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use tracing::{info, warn};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::audio::decoder::decode_audio;
use crate::types::{AudioData, Transcript, WordSegment};

/// Whisper operates on 16 kHz mono input.
pub const WHISPER_SAMPLE_RATE: u32 = 16_000;

pub struct TranscriberOptions {
    /// Path to a ggml model file; falls back to `WHISPER_MODEL_PATH`.
    pub model_path: Option<PathBuf>,
    /// ISO 639-1 language hint passed to the model.
    pub language: String,
}

pub struct Transcriber {
    ctx: WhisperContext,
    language: String,
}

impl Transcriber {
    pub fn new(options: &TranscriberOptions) -> Result<Self> {
        let model_path = match &options.model_path {
            Some(path) => path.display().to_string(),
            None => std::env::var("WHISPER_MODEL_PATH")
                .unwrap_or_else(|_| "./models/ggml-base.bin".to_string()),
        };
        let ctx = WhisperContext::new_with_params(&model_path, WhisperContextParameters::default())
            .with_context(|| format!("Failed to load Whisper model from {model_path}"))?;
        Ok(Self {
            ctx,
            language: options.language.clone(),
        })
    }

    /// Transcribe one recording to word-level segments with times in seconds.
    pub fn transcribe(&self, audio: &AudioData) -> Result<Transcript> {
        ensure!(
            audio.sample_rate == WHISPER_SAMPLE_RATE,
            "Whisper input must be {} Hz, got {} Hz",
            WHISPER_SAMPLE_RATE,
            audio.sample_rate
        );

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_language(Some(&self.language));
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);
        // One token per segment so each emitted segment is a single word.
        params.set_token_timestamps(true);
        params.set_max_len(1);
        params.set_split_on_word(true);

        let mut state = self
            .ctx
            .create_state()
            .context("Failed to create Whisper state")?;
        state
            .full(params, &audio.samples)
            .context("Failed to transcribe audio")?;

        let mut segments = Vec::new();
        let mut full_text = String::new();

        for segment in state.as_iter() {
            let text = segment
                .to_str()
                .context("Failed to get segment text")?
                .to_string();

            // Timestamps are in centiseconds, convert to seconds
            let start = segment.start_timestamp() as f64 / 100.0;
            let end = segment.end_timestamp() as f64 / 100.0;

            full_text.push_str(&text);
            segments.push(WordSegment { start, end, text });
        }

        Ok(Transcript {
            text: full_text,
            segments,
        })
    }
}

/// Transcribe every WAV under `wav_dir`, writing `<stem>.json` transcripts
/// to `out_dir`. Per-recording failures are logged and skipped; returns the
/// number of transcripts written.
pub fn transcribe_corpus(
    wav_dir: &Path,
    out_dir: &Path,
    options: &TranscriberOptions,
) -> Result<usize> {
    let transcriber = Transcriber::new(options)?;

    let entries = fs::read_dir(wav_dir)
        .with_context(|| format!("Failed to read audio directory {:?}", wav_dir))?;
    let mut wav_paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().and_then(|ext| ext.to_str()) == Some("wav"))
        .collect();
    wav_paths.sort();
    ensure!(!wav_paths.is_empty(), "No WAV files found in {:?}", wav_dir);

    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create transcript directory {:?}", out_dir))?;

    let mut written = 0usize;
    for path in &wav_paths {
        match transcribe_one(&transcriber, path, out_dir) {
            Ok(()) => written += 1,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping recording");
            }
        }
    }
    info!(written, total = wav_paths.len(), "transcription pass complete");
    Ok(written)
}

fn transcribe_one(transcriber: &Transcriber, wav_path: &Path, out_dir: &Path) -> Result<()> {
    let stem = wav_path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .with_context(|| format!("Audio path has no usable stem: {:?}", wav_path))?;
    let audio = decode_audio(wav_path)?;
    let transcript = transcriber.transcribe(&audio)?;
    let json =
        serde_json::to_string_pretty(&transcript).context("Failed to serialize transcript")?;
    let out_path = out_dir.join(format!("{stem}.json"));
    fs::write(&out_path, json)
        .with_context(|| format!("Failed to write transcript to {:?}", out_path))?;
    Ok(())
}
