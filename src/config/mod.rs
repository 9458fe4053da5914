use std::fs;
use std::path::Path;

use anyhow::{bail, ensure, Context, Result};
use serde::Deserialize;

/// Acceptance and padding parameters for chunk selection.
///
/// Passed explicitly into the rate estimator and the scanner so that
/// several configurations can run side by side.
#[derive(Debug, Clone, Copy)]
pub struct ChunkPolicy {
    /// Minimum accepted chunk duration in seconds.
    pub min_dur: f64,
    /// Maximum accepted chunk duration in seconds.
    pub max_dur: f64,
    /// Required silence before the next segment, in seconds.
    pub gap_required: f64,
    /// Padding taken from the source audio on each side, in seconds.
    pub silence_dur: f64,
    /// Tolerance around the corpus mean speech rate (fraction, 0..1).
    pub speed_tol: f64,
    /// When true, keep only chunks spoken slower than the tolerance
    /// below the corpus mean; otherwise accept a band around the mean.
    pub strict_slow: bool,
}

impl Default for ChunkPolicy {
    fn default() -> Self {
        Self {
            min_dur: 1.0,
            max_dur: 5.0,
            gap_required: 0.3,
            silence_dur: 0.3,
            speed_tol: 0.2,
            strict_slow: true,
        }
    }
}

/// Runtime-configurable policy parsed from JSON input.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuntimePolicy {
    #[serde(default, alias = "minDuration", alias = "min_duration")]
    pub min_dur: Option<f64>,
    #[serde(default, alias = "maxDuration", alias = "max_duration")]
    pub max_dur: Option<f64>,
    #[serde(default, alias = "gap", alias = "gapRequired")]
    pub gap_required: Option<f64>,
    #[serde(default, alias = "silence", alias = "silenceDuration")]
    pub silence_dur: Option<f64>,
    #[serde(default, alias = "speedTolerance", alias = "tolerance")]
    pub speed_tol: Option<f64>,
    #[serde(default, alias = "strictSlow")]
    pub strict_slow: Option<bool>,
}

impl RuntimePolicy {
    /// Overlay the provided fields on top of `base` and validate the result.
    pub fn apply_to(&self, base: ChunkPolicy) -> Result<ChunkPolicy> {
        let policy = ChunkPolicy {
            min_dur: self.min_dur.unwrap_or(base.min_dur),
            max_dur: self.max_dur.unwrap_or(base.max_dur),
            gap_required: self.gap_required.unwrap_or(base.gap_required),
            silence_dur: self.silence_dur.unwrap_or(base.silence_dur),
            speed_tol: self.speed_tol.unwrap_or(base.speed_tol),
            strict_slow: self.strict_slow.unwrap_or(base.strict_slow),
        };
        validate_policy(&policy)?;
        Ok(policy)
    }
}

pub fn validate_policy(policy: &ChunkPolicy) -> Result<()> {
    ensure!(
        policy.min_dur > 0.0,
        "Minimum chunk duration must be positive, got {}",
        policy.min_dur
    );
    ensure!(
        policy.max_dur >= policy.min_dur,
        "Maximum chunk duration ({}) must be >= minimum ({})",
        policy.max_dur,
        policy.min_dur
    );
    ensure!(
        policy.gap_required >= 0.0,
        "Required trailing gap must be non-negative, got {}",
        policy.gap_required
    );
    ensure!(
        policy.silence_dur >= 0.0,
        "Silence padding must be non-negative, got {}",
        policy.silence_dur
    );
    ensure!(
        (0.0..1.0).contains(&policy.speed_tol),
        "Speed tolerance must lie in [0, 1), got {}",
        policy.speed_tol
    );
    Ok(())
}

/// Load a runtime policy from a JSON file or an inline JSON string.
/// Returns an empty overlay when neither source is given.
pub fn load_policy_from_sources(
    path: Option<&Path>,
    json: Option<&str>,
) -> Result<RuntimePolicy> {
    match (path, json) {
        (Some(p), None) => {
            let data = fs::read_to_string(p)
                .with_context(|| format!("Failed to read policy file {:?}", p))?;
            parse_runtime_policy(&data)
        }
        (None, Some(raw)) => parse_runtime_policy(raw),
        (None, None) => Ok(RuntimePolicy::default()),
        (Some(_), Some(_)) => bail!("Provide a policy file or inline JSON, not both"),
    }
}

fn parse_runtime_policy(raw: &str) -> Result<RuntimePolicy> {
    serde_json::from_str(raw).context("Failed to parse policy JSON")
}
