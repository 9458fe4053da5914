//! corpuscut - speech corpus chunk preparation
//!
//! Turns long recordings plus word-level transcripts into short, well-formed
//! audio/text chunk pairs: one bounded-duration utterance per recording,
//! selected by a first-fit scan over punctuation boundaries and exported
//! with silence padding, plus optional transcription and phonemization
//! passes around the core.

pub mod audio;
pub mod chunking;
pub mod config;
pub mod corpus;
pub mod export;
pub mod metadata;
pub mod rate;
pub mod transcription;
pub mod types;
