use crate::config::ChunkPolicy;
use crate::types::WordSegment;

/// A boundary fires only when the segment text, trimmed, ends with
/// sentence-terminal punctuation. A trailing comma counts as a cut point.
pub(super) fn ends_at_boundary(text: &str) -> bool {
    text.trim()
        .ends_with(|c: char| matches!(c, '.' | ',' | '!' | '?'))
}

pub(super) fn duration_within(duration: f64, policy: &ChunkPolicy) -> bool {
    policy.min_dur <= duration && duration <= policy.max_dur
}

/// Chunk speech rate in words per second; 0 for non-positive durations.
pub(super) fn chunk_rate(segments: &[WordSegment], duration: f64) -> f64 {
    if duration <= 0.0 {
        return 0.0;
    }
    let words: usize = segments.iter().map(WordSegment::word_count).sum();
    words as f64 / duration
}

/// Speech-rate acceptance against the corpus mean.
///
/// Strict-slow keeps only chunks below the lower tolerance bound; the band
/// mode keeps chunks within the tolerance band around the mean. A corpus
/// with no measurable mean rate accepts nothing.
pub(super) fn rate_acceptable(rate: f64, mean_rate: f64, policy: &ChunkPolicy) -> bool {
    if mean_rate <= 0.0 {
        return false;
    }
    let lower = mean_rate * (1.0 - policy.speed_tol);
    if policy.strict_slow {
        rate <= lower
    } else {
        let upper = mean_rate * (1.0 + policy.speed_tol);
        lower <= rate && rate <= upper
    }
}

/// The exported chunk must be acoustically isolated from following speech.
/// Vacuously satisfied at the end of the segment sequence.
pub(super) fn gap_satisfied(end_time: f64, next_start: Option<f64>, policy: &ChunkPolicy) -> bool {
    match next_start {
        Some(next) => next - end_time >= policy.gap_required,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(start: f64, end: f64, text: &str) -> WordSegment {
        WordSegment {
            start,
            end,
            text: text.to_string(),
        }
    }

    #[test]
    fn boundary_detects_terminal_punctuation() {
        assert!(ends_at_boundary("done."));
        assert!(ends_at_boundary("wait, "));
        assert!(ends_at_boundary("really?"));
        assert!(ends_at_boundary("now!"));
        assert!(!ends_at_boundary("still going"));
        assert!(!ends_at_boundary(""));
    }

    #[test]
    fn duration_bounds_are_inclusive() {
        let policy = ChunkPolicy::default();
        assert!(duration_within(1.0, &policy));
        assert!(duration_within(5.0, &policy));
        assert!(!duration_within(0.999, &policy));
        assert!(!duration_within(5.001, &policy));
    }

    #[test]
    fn rate_is_zero_for_degenerate_duration() {
        let segments = vec![word(0.0, 0.0, "word")];
        assert_eq!(chunk_rate(&segments, 0.0), 0.0);
        assert_eq!(chunk_rate(&segments, -1.0), 0.0);
    }

    #[test]
    fn strict_slow_rejects_above_lower_bound() {
        let policy = ChunkPolicy::default(); // tol 0.2, strict
        assert!(rate_acceptable(1.5, 2.0, &policy)); // 1.5 <= 1.6
        assert!(!rate_acceptable(1.7, 2.0, &policy)); // 1.7 > 1.6
    }

    #[test]
    fn band_mode_requires_both_bounds() {
        let policy = ChunkPolicy {
            strict_slow: false,
            ..ChunkPolicy::default()
        };
        assert!(rate_acceptable(2.0, 2.0, &policy));
        assert!(rate_acceptable(1.6, 2.0, &policy));
        assert!(rate_acceptable(2.4, 2.0, &policy));
        assert!(!rate_acceptable(1.5, 2.0, &policy));
        assert!(!rate_acceptable(2.5, 2.0, &policy));
    }

    #[test]
    fn zero_mean_rate_accepts_nothing() {
        let strict = ChunkPolicy::default();
        let band = ChunkPolicy {
            strict_slow: false,
            ..strict
        };
        assert!(!rate_acceptable(0.0, 0.0, &strict));
        assert!(!rate_acceptable(0.0, 0.0, &band));
        assert!(!rate_acceptable(1.0, 0.0, &strict));
    }

    #[test]
    fn gap_is_vacuous_at_end_of_sequence() {
        let policy = ChunkPolicy::default();
        assert!(gap_satisfied(1.2, None, &policy));
        assert!(gap_satisfied(1.2, Some(1.5), &policy));
        assert!(!gap_satisfied(1.2, Some(1.4), &policy));
    }
}
