//! Chunk materialization: slice the accepted span out of the source audio
//! and persist the audio/metadata pair for one recording.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::audio::encoder::encode_wav;
use crate::audio::slicer::extract_padded;
use crate::config::ChunkPolicy;
use crate::types::{AcceptedChunk, AudioData, ChunkRecord};

/// Write `<base_name>.wav` and `<base_name>.json` for an accepted chunk,
/// overwriting existing artifacts, and return the exported audio duration
/// in seconds. A positive return value is the driver's only accept signal.
pub fn materialize_chunk(
    audio: &AudioData,
    chunk: &AcceptedChunk,
    policy: &ChunkPolicy,
    base_name: &str,
    wav_dir: &Path,
    record_dir: &Path,
) -> Result<f64> {
    let slice = extract_padded(audio, chunk.start_time, chunk.end_time, policy.silence_dur);

    let wav_path = wav_dir.join(format!("{base_name}.wav"));
    encode_wav(&slice.samples, slice.sample_rate, &wav_path)
        .with_context(|| format!("Failed to export chunk audio to {:?}", wav_path))?;

    let record = build_record(chunk, policy);
    let record_path = record_dir.join(format!("{base_name}.json"));
    let json = serde_json::to_string_pretty(&record)
        .context("Failed to serialize chunk record")?;
    fs::write(&record_path, json)
        .with_context(|| format!("Failed to write chunk record to {:?}", record_path))?;

    debug!(
        base_name,
        duration = slice.duration_secs(),
        "materialized chunk"
    );
    Ok(slice.duration_secs())
}

/// The metadata record keeps the padded start clamped at zero, while the
/// padded end is written as-is even when it runs past the audio length.
fn build_record(chunk: &AcceptedChunk, policy: &ChunkPolicy) -> ChunkRecord {
    let text = chunk
        .segments
        .iter()
        .map(|segment| segment.text.trim())
        .collect::<Vec<_>>()
        .join(" ");
    ChunkRecord {
        text,
        segments: chunk.segments.clone(),
        start: (chunk.start_time - policy.silence_dur).max(0.0),
        end: chunk.end_time + policy.silence_dur,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WordSegment;

    fn word(start: f64, end: f64, text: &str) -> WordSegment {
        WordSegment {
            start,
            end,
            text: text.to_string(),
        }
    }

    fn accepted() -> AcceptedChunk {
        AcceptedChunk {
            segments: vec![word(0.0, 0.5, " שלום "), word(0.5, 1.2, "עולם. ")],
            start_time: 0.0,
            end_time: 1.2,
        }
    }

    #[test]
    fn record_text_is_trimmed_and_space_joined() {
        let record = build_record(&accepted(), &ChunkPolicy::default());
        assert_eq!(record.text, "שלום עולם.");
        assert_eq!(record.segments.len(), 2);
    }

    #[test]
    fn record_start_clamps_but_end_does_not() {
        let record = build_record(&accepted(), &ChunkPolicy::default());
        assert_eq!(record.start, 0.0);
        assert!((record.end - 1.5).abs() < 1e-9);
    }

    #[test]
    fn materialize_writes_pair_and_reports_slice_length() {
        let dir = tempfile::tempdir().unwrap();
        let audio = AudioData {
            samples: vec![0.1; 1400], // 1.4s at 1 kHz
            sample_rate: 1000,
        };
        let secs = materialize_chunk(
            &audio,
            &accepted(),
            &ChunkPolicy::default(),
            "42",
            dir.path(),
            dir.path(),
        )
        .unwrap();
        // padded slice is 0.0s..1.4s: end padding clamps at the buffer
        assert!((secs - 1.4).abs() < 1e-9);

        let record: ChunkRecord = serde_json::from_str(
            &fs::read_to_string(dir.path().join("42.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(record.start, 0.0);
        assert!((record.end - 1.5).abs() < 1e-9);
        assert!(dir.path().join("42.wav").exists());
    }
}
