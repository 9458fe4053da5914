//! Corpus driver: pairs transcripts with audio by stem, runs the corpus-wide
//! rate pass, then scans and materializes each recording independently.
//!
//! Per-recording failures never abort the run; they are logged, counted as
//! skipped, and processing continues. Only an empty corpus is fatal.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;

use anyhow::{ensure, Context, Result};
use tracing::{debug, info, warn};

use crate::audio::decoder::decode_audio;
use crate::chunking::find_chunk;
use crate::config::ChunkPolicy;
use crate::export::materialize_chunk;
use crate::rate::mean_speech_rate;
use crate::types::{CorpusStats, Transcript};

/// One recording queued for processing: transcript already loaded, audio
/// decoded lazily only when a chunk is accepted.
struct Recording {
    stem: String,
    audio_path: PathBuf,
    transcript: Transcript,
}

/// Result of a full corpus pass.
#[derive(Debug, Clone, Copy)]
pub struct CorpusSummary {
    pub mean_rate: f64,
    pub stats: CorpusStats,
}

/// Process every recording under `src` and write accepted chunks under
/// `dst`. Expects `<src>/transcripts/*.json` with sibling `<src>/wav/<stem>.wav`
/// files; outputs land in `<dst>/wav` and `<dst>/transcripts`.
pub fn run_corpus(
    src: &Path,
    dst: &Path,
    policy: &ChunkPolicy,
    workers: usize,
) -> Result<CorpusSummary> {
    let transcript_dir = src.join("transcripts");
    let wav_dir = src.join("wav");
    let out_wav_dir = dst.join("wav");
    let out_record_dir = dst.join("transcripts");

    let transcript_paths = discover_transcripts(&transcript_dir)?;
    ensure!(
        !transcript_paths.is_empty(),
        "No transcripts found in {:?}",
        transcript_dir
    );

    fs::create_dir_all(&out_wav_dir)
        .with_context(|| format!("Failed to create output directory {:?}", out_wav_dir))?;
    fs::create_dir_all(&out_record_dir)
        .with_context(|| format!("Failed to create output directory {:?}", out_record_dir))?;

    let mut stats = CorpusStats::default();
    let mut recordings = Vec::with_capacity(transcript_paths.len());
    for path in &transcript_paths {
        match load_recording(path, &wav_dir) {
            Ok(recording) => recordings.push(recording),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping unreadable transcript");
                stats.record_skipped();
            }
        }
    }

    let mean_rate = mean_speech_rate(recordings.iter().map(|r| &r.transcript));
    info!(mean_rate, recordings = recordings.len(), "corpus rate pass complete");

    let ctx = WorkerContext {
        mean_rate,
        policy: *policy,
        out_wav_dir,
        out_record_dir,
    };

    if workers <= 1 {
        for recording in &recordings {
            let outcome = process_recording(recording, &ctx);
            record_outcome(&mut stats, &recording.stem, outcome);
        }
    } else {
        process_parallel(recordings, &ctx, workers, &mut stats)?;
    }

    Ok(CorpusSummary { mean_rate, stats })
}

#[derive(Clone)]
struct WorkerContext {
    mean_rate: f64,
    policy: ChunkPolicy,
    out_wav_dir: PathBuf,
    out_record_dir: PathBuf,
}

/// Scan one recording and, on acceptance, decode its audio and export the
/// chunk pair. Returns the exported duration; 0.0 means nothing was kept.
fn process_recording(recording: &Recording, ctx: &WorkerContext) -> Result<f64> {
    let chunk = match find_chunk(&recording.transcript.segments, ctx.mean_rate, &ctx.policy) {
        Some(chunk) => chunk,
        None => {
            debug!(stem = %recording.stem, "no acceptable window");
            return Ok(0.0);
        }
    };

    let audio = decode_audio(&recording.audio_path).with_context(|| {
        format!(
            "Failed to open audio for recording '{}' at {:?}",
            recording.stem, recording.audio_path
        )
    })?;

    materialize_chunk(
        &audio,
        &chunk,
        &ctx.policy,
        &recording.stem,
        &ctx.out_wav_dir,
        &ctx.out_record_dir,
    )
}

fn record_outcome(stats: &mut CorpusStats, stem: &str, outcome: Result<f64>) {
    match outcome {
        Ok(secs) if secs > 0.0 => {
            debug!(stem, secs, "kept recording");
            stats.record_kept(secs);
        }
        Ok(_) => stats.record_skipped(),
        Err(err) => {
            warn!(stem, error = %err, "skipping recording after failure");
            stats.record_skipped();
        }
    }
}

/// Fan recordings out to a fixed pool. Workers pull jobs from a shared
/// channel and send per-recording outcomes back; the driver alone owns the
/// running totals, so no update is ever lost.
fn process_parallel(
    recordings: Vec<Recording>,
    ctx: &WorkerContext,
    workers: usize,
    stats: &mut CorpusStats,
) -> Result<()> {
    let expected = recordings.len();
    let (job_tx, job_rx) = mpsc::channel::<Recording>();
    let job_rx = Arc::new(Mutex::new(job_rx));
    let (outcome_tx, outcome_rx) = mpsc::channel::<(String, Result<f64>)>();

    let mut handles = Vec::with_capacity(workers);
    for worker in 0..workers {
        let job_rx = Arc::clone(&job_rx);
        let outcome_tx = outcome_tx.clone();
        let ctx = ctx.clone();
        let handle = thread::Builder::new()
            .name(format!("chunk-worker-{worker}"))
            .spawn(move || loop {
                let job = {
                    let guard = match job_rx.lock() {
                        Ok(guard) => guard,
                        Err(_) => break,
                    };
                    guard.recv()
                };
                let recording = match job {
                    Ok(recording) => recording,
                    Err(_) => break,
                };
                let outcome = process_recording(&recording, &ctx);
                if outcome_tx.send((recording.stem, outcome)).is_err() {
                    break;
                }
            })
            .context("Failed to spawn chunk worker thread")?;
        handles.push(handle);
    }

    for recording in recordings {
        // Send only fails if every worker died; remaining jobs then count
        // as skipped through the outcome tally below.
        if job_tx.send(recording).is_err() {
            break;
        }
    }
    drop(job_tx);
    drop(outcome_tx);

    let mut received = 0usize;
    for (stem, outcome) in outcome_rx {
        record_outcome(stats, &stem, outcome);
        received += 1;
    }
    for handle in handles {
        let _ = handle.join();
    }
    for _ in received..expected {
        stats.record_skipped();
    }
    Ok(())
}

fn discover_transcripts(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read transcript directory {:?}", dir))?;
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().and_then(|ext| ext.to_str()) == Some("json"))
        .collect();
    paths.sort();
    Ok(paths)
}

fn load_recording(transcript_path: &Path, wav_dir: &Path) -> Result<Recording> {
    let stem = transcript_path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .with_context(|| format!("Transcript path has no usable stem: {:?}", transcript_path))?
        .to_string();
    let data = fs::read_to_string(transcript_path)
        .with_context(|| format!("Failed to read transcript {:?}", transcript_path))?;
    let transcript: Transcript = serde_json::from_str(&data)
        .with_context(|| format!("Failed to parse transcript {:?}", transcript_path))?;
    let audio_path = wav_dir.join(format!("{stem}.wav"));
    Ok(Recording {
        stem,
        audio_path,
        transcript,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discovery_is_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("2.json"), "{}").unwrap();
        fs::write(dir.path().join("1.json"), "{}").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let paths = discover_transcripts(dir.path()).unwrap();
        let names: Vec<_> = paths
            .iter()
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()))
            .collect();
        assert_eq!(names, vec!["1.json", "2.json"]);
    }

    #[test]
    fn empty_corpus_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("transcripts")).unwrap();
        let result = run_corpus(
            dir.path(),
            &dir.path().join("out"),
            &ChunkPolicy::default(),
            1,
        );
        assert!(result.is_err());
    }

    #[test]
    fn malformed_transcript_is_rejected_by_loader() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("7.json");
        fs::write(&path, "not json").unwrap();
        assert!(load_recording(&path, dir.path()).is_err());
    }
}
