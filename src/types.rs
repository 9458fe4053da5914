//! Core types for the corpuscut preparation pipeline

use serde::{Deserialize, Serialize};

/// One transcribed word (or token) with its time span in seconds.
///
/// Produced by the transcriber and treated as immutable afterwards;
/// `end >= start` is assumed, not enforced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl WordSegment {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Whitespace-separated token count of the segment text.
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// A recording's transcript: full text plus time-ordered word segments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    #[serde(default)]
    pub text: String,
    pub segments: Vec<WordSegment>,
}

/// Raw audio data representation (mono, f32 samples)
#[derive(Debug, Clone)]
pub struct AudioData {
    /// Audio samples, normalized to [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Sample rate in Hz (e.g., 16000)
    pub sample_rate: u32,
}

impl AudioData {
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// A slice of a recording with its position in the source audio
#[derive(Debug, Clone)]
pub struct AudioChunk {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub start_time: f64, // original position in source audio
    pub end_time: f64,
}

impl AudioChunk {
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// The first contiguous run of segments that satisfied every acceptance
/// predicate for one recording. At most one exists per recording.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptedChunk {
    pub segments: Vec<WordSegment>,
    /// Start of the first segment in the run.
    pub start_time: f64,
    /// End of the last segment in the run.
    pub end_time: f64,
}

/// Exported metadata record for one chunk, persisted next to its WAV.
///
/// `start` is clamped at zero after padding; `end` is padded but never
/// clamped to the audio length, while the exported audio slice is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub text: String,
    pub segments: Vec<WordSegment>,
    pub start: f64,
    pub end: f64,
}

/// Running totals for one corpus pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct CorpusStats {
    pub kept: usize,
    pub skipped: usize,
    /// Exported audio duration in seconds across all kept recordings.
    pub total_duration: f64,
}

impl CorpusStats {
    pub fn record_kept(&mut self, exported_secs: f64) {
        self.kept += 1;
        self.total_duration += exported_secs;
    }

    pub fn record_skipped(&mut self) {
        self.skipped += 1;
    }

    pub fn total(&self) -> usize {
        self.kept + self.skipped
    }

    /// Total exported duration as HH:MM:SS.
    pub fn formatted_duration(&self) -> String {
        let whole = self.total_duration as u64;
        let hours = whole / 3600;
        let minutes = (whole % 3600) / 60;
        let seconds = whole % 60;
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    }
}
