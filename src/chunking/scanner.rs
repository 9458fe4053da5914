use tracing::debug;

use crate::config::ChunkPolicy;
use crate::types::{AcceptedChunk, WordSegment};

use super::predicates::{
    chunk_rate, duration_within, ends_at_boundary, gap_satisfied, rate_acceptable,
};

/// Outcome of feeding one segment to the scanner.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanState {
    /// Still growing the candidate; no acceptable boundary yet.
    Accumulating,
    /// All predicates passed at a boundary; scanning must stop.
    Accepted(AcceptedChunk),
    /// The sequence ended without an acceptable boundary.
    Rejected,
}

/// Single-pass scanner over one recording's ordered word segments.
///
/// The candidate buffer only ever grows: a boundary that fails a predicate
/// keeps the accumulated segments and scanning continues from the next one.
pub struct ChunkScanner {
    mean_rate: f64,
    policy: ChunkPolicy,
    buffer: Vec<WordSegment>,
    start_time: f64,
    end_time: f64,
}

impl ChunkScanner {
    pub fn new(mean_rate: f64, policy: ChunkPolicy) -> Self {
        Self {
            mean_rate,
            policy,
            buffer: Vec::new(),
            start_time: 0.0,
            end_time: 0.0,
        }
    }

    /// Append the next segment and evaluate acceptance if it closes a
    /// boundary. `next_start` is the start of the following segment in the
    /// full sequence, if any.
    pub fn step(&mut self, segment: &WordSegment, next_start: Option<f64>) -> ScanState {
        if self.buffer.is_empty() {
            self.start_time = segment.start;
        }
        self.buffer.push(segment.clone());
        self.end_time = segment.end;

        if !ends_at_boundary(&segment.text) {
            return ScanState::Accumulating;
        }

        if self.boundary_accepts(next_start) {
            let chunk = AcceptedChunk {
                segments: std::mem::take(&mut self.buffer),
                start_time: self.start_time,
                end_time: self.end_time,
            };
            debug!(
                start = chunk.start_time,
                end = chunk.end_time,
                segments = chunk.segments.len(),
                "chunk accepted at boundary"
            );
            return ScanState::Accepted(chunk);
        }

        ScanState::Accumulating
    }

    /// Mark the scan as exhausted. The candidate is discarded.
    pub fn finish(self) -> ScanState {
        ScanState::Rejected
    }

    fn boundary_accepts(&self, next_start: Option<f64>) -> bool {
        let duration = self.end_time - self.start_time;
        if !duration_within(duration, &self.policy) {
            return false;
        }
        let rate = chunk_rate(&self.buffer, duration);
        if !rate_acceptable(rate, self.mean_rate, &self.policy) {
            debug!(rate, mean_rate = self.mean_rate, "boundary failed rate check");
            return false;
        }
        gap_satisfied(self.end_time, next_start, &self.policy)
    }
}
