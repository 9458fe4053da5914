//! First-fit utterance chunk selection over word-level transcripts.
//!
//! One recording yields at most one chunk: the scan accepts the first
//! candidate that ends on sentence-terminal punctuation and satisfies the
//! duration, speech-rate, and trailing-gap predicates, then stops.

mod predicates;
mod scanner;


pub use scanner::{ChunkScanner, ScanState};

use crate::config::ChunkPolicy;
use crate::types::{AcceptedChunk, WordSegment};

/// Scan one recording's ordered segments and return the first acceptable
/// chunk, or `None` when the sequence is exhausted without acceptance.
pub fn find_chunk(
    segments: &[WordSegment],
    mean_rate: f64,
    policy: &ChunkPolicy,
) -> Option<AcceptedChunk> {
    let mut scanner = ChunkScanner::new(mean_rate, *policy);
    for (idx, segment) in segments.iter().enumerate() {
        let next_start = segments.get(idx + 1).map(|next| next.start);
        if let ScanState::Accepted(chunk) = scanner.step(segment, next_start) {
            return Some(chunk);
        }
    }
    None
}
