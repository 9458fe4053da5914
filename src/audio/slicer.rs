use crate::types::{AudioChunk, AudioData};

/// Extract the `[start, end)` range widened by `pad` seconds on each side.
///
/// The slice is clamped to the available audio on both ends; callers that
/// need the unclamped padded times compute them from the original range.
pub fn extract_padded(audio: &AudioData, start: f64, end: f64, pad: f64) -> AudioChunk {
    let sr = audio.sample_rate as f64;
    let total = audio.samples.len();

    let padded_start = (start - pad).max(0.0);
    let start_sample = ((padded_start * sr) as usize).min(total);
    let end_sample = (((end + pad) * sr) as usize).min(total).max(start_sample);

    AudioChunk {
        samples: audio.samples[start_sample..end_sample].to_vec(),
        sample_rate: audio.sample_rate,
        start_time: padded_start,
        end_time: end_sample as f64 / sr,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_second_audio() -> AudioData {
        AudioData {
            samples: vec![0.0; 1000],
            sample_rate: 1000,
        }
    }

    #[test]
    fn pads_both_sides_inside_the_buffer() {
        let audio = one_second_audio();
        let chunk = extract_padded(&audio, 0.4, 0.6, 0.1);
        assert_eq!(chunk.samples.len(), 400); // 0.3s..0.7s
        assert!((chunk.start_time - 0.3).abs() < 1e-9);
        assert!((chunk.end_time - 0.7).abs() < 1e-9);
    }

    #[test]
    fn start_padding_clamps_at_zero() {
        let audio = one_second_audio();
        let chunk = extract_padded(&audio, 0.05, 0.5, 0.3);
        assert_eq!(chunk.start_time, 0.0);
        assert_eq!(chunk.samples.len(), 800); // 0.0s..0.8s
    }

    #[test]
    fn end_padding_clamps_at_audio_length() {
        let audio = one_second_audio();
        let chunk = extract_padded(&audio, 0.5, 0.95, 0.3);
        assert!((chunk.end_time - 1.0).abs() < 1e-9);
        assert_eq!(chunk.samples.len(), 800); // 0.2s..1.0s
    }

    #[test]
    fn degenerate_range_yields_empty_slice() {
        let audio = one_second_audio();
        let chunk = extract_padded(&audio, 2.0, 3.0, 0.0);
        assert!(chunk.samples.is_empty());
    }
}
