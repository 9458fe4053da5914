//! Metadata table generation: run an external diacritization/phonemization
//! program across exported chunk records and write one tab-separated row per
//! record, in input order.
//!
//! Workers pull records from a shared channel; completions land in an
//! index-keyed buffer that a single sequential writer drains in order, so
//! output order never depends on worker scheduling.

use std::collections::BTreeMap;
use std::fs;
use std::io::{BufWriter, Write as IoWrite};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;

use anyhow::{bail, ensure, Context, Result};
use tracing::{info, warn};

use crate::types::ChunkRecord;

/// Output of the external inference model for one record.
#[derive(Debug, Clone, PartialEq)]
pub struct PhonemeRow {
    pub diacritized: String,
    pub phonemes: String,
}

/// Seam for the external diacritization/phonemization capability.
pub trait Phonemizer: Send + Sync {
    fn phonemize(&self, text: &str) -> Result<PhonemeRow>;
}

/// Shells out to a user-supplied program per record: the chunk text goes to
/// stdin, the program answers `diacritized<TAB>phonemes` on stdout.
pub struct CommandPhonemizer {
    program: String,
    args: Vec<String>,
}

impl CommandPhonemizer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl Phonemizer for CommandPhonemizer {
    fn phonemize(&self, text: &str) -> Result<PhonemeRow> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to spawn phonemizer '{}'", self.program))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(text.as_bytes())
                .context("Failed to write text to phonemizer stdin")?;
        }

        let output = child
            .wait_with_output()
            .context("Failed to read phonemizer output")?;
        ensure!(
            output.status.success(),
            "Phonemizer '{}' exited with {}",
            self.program,
            output.status
        );

        let stdout = String::from_utf8(output.stdout).context("Phonemizer output is not UTF-8")?;
        let line = stdout.lines().next().unwrap_or("");
        match line.split_once('\t') {
            Some((diacritized, phonemes)) => Ok(PhonemeRow {
                diacritized: diacritized.to_string(),
                phonemes: phonemes.to_string(),
            }),
            None => bail!(
                "Phonemizer '{}' output has no tab separator: {:?}",
                self.program,
                line
            ),
        }
    }
}

struct RecordJob {
    index: usize,
    stem: String,
    text: String,
}

/// Phonemize every chunk record under `record_dir` and write the metadata
/// table to `out_path`. Returns the number of rows written; records whose
/// phonemization fails are logged and dropped from the table.
pub fn write_metadata(
    record_dir: &Path,
    out_path: &Path,
    phonemizer: &dyn Phonemizer,
    workers: usize,
) -> Result<usize> {
    let jobs = collect_jobs(record_dir)?;
    ensure!(
        !jobs.is_empty(),
        "No chunk records found in {:?}",
        record_dir
    );
    let total = jobs.len();

    let file = fs::File::create(out_path)
        .with_context(|| format!("Failed to create metadata file {:?}", out_path))?;
    let mut writer = BufWriter::new(file);
    let written = stream_rows(jobs, phonemizer, workers.max(1), &mut writer)?;
    writer.flush().context("Failed to flush metadata file")?;

    info!(written, total, path = %out_path.display(), "metadata table written");
    Ok(written)
}

/// Fan jobs out to `workers` threads and emit rows in job order regardless
/// of completion order.
fn stream_rows(
    jobs: Vec<RecordJob>,
    phonemizer: &dyn Phonemizer,
    workers: usize,
    out: &mut dyn IoWrite,
) -> Result<usize> {
    thread::scope(|scope| -> Result<usize> {
        let (job_tx, job_rx) = mpsc::channel::<RecordJob>();
        let job_rx = Arc::new(Mutex::new(job_rx));
        let (row_tx, row_rx) = mpsc::channel::<(usize, String, Result<PhonemeRow>)>();

        for _ in 0..workers {
            let job_rx = Arc::clone(&job_rx);
            let row_tx = row_tx.clone();
            scope.spawn(move || loop {
                let job = {
                    let guard = match job_rx.lock() {
                        Ok(guard) => guard,
                        Err(_) => break,
                    };
                    guard.recv()
                };
                let job = match job {
                    Ok(job) => job,
                    Err(_) => break,
                };
                let row = phonemizer.phonemize(&job.text);
                if row_tx.send((job.index, job.stem, row)).is_err() {
                    break;
                }
            });
        }

        for job in jobs {
            if job_tx.send(job).is_err() {
                break;
            }
        }
        drop(job_tx);
        drop(row_tx);

        // Order-indexed completion buffer: hold finished rows until all of
        // their predecessors have been written.
        let mut pending: BTreeMap<usize, (String, Result<PhonemeRow>)> = BTreeMap::new();
        let mut next = 0usize;
        let mut written = 0usize;
        for (index, stem, row) in row_rx {
            pending.insert(index, (stem, row));
            while let Some((stem, row)) = pending.remove(&next) {
                next += 1;
                match row {
                    Ok(row) => {
                        writeln!(
                            out,
                            "{}\t{}\t{}",
                            stem,
                            sanitize(&row.diacritized),
                            sanitize(&row.phonemes)
                        )
                        .context("Failed to write metadata row")?;
                        written += 1;
                    }
                    Err(err) => {
                        warn!(stem = %stem, error = %err, "dropping record from metadata table");
                    }
                }
            }
        }
        Ok(written)
    })
}

/// Chunk records sorted numerically when every stem is an integer,
/// lexicographically otherwise.
fn collect_jobs(record_dir: &Path) -> Result<Vec<RecordJob>> {
    let entries = fs::read_dir(record_dir)
        .with_context(|| format!("Failed to read record directory {:?}", record_dir))?;
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().and_then(|ext| ext.to_str()) == Some("json"))
        .collect();

    let numeric: Option<Vec<u64>> = paths
        .iter()
        .map(|path| stem_of(path).and_then(|stem| stem.parse::<u64>().ok()))
        .collect();
    match numeric {
        Some(keys) => {
            let mut keyed: Vec<(u64, PathBuf)> = keys.into_iter().zip(paths).collect();
            keyed.sort_by_key(|(key, _)| *key);
            paths = keyed.into_iter().map(|(_, path)| path).collect();
        }
        None => paths.sort(),
    }

    let mut jobs = Vec::with_capacity(paths.len());
    for (index, path) in paths.iter().enumerate() {
        let stem = stem_of(path)
            .with_context(|| format!("Record path has no usable stem: {:?}", path))?
            .to_string();
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read chunk record {:?}", path))?;
        let record: ChunkRecord = serde_json::from_str(&data)
            .with_context(|| format!("Failed to parse chunk record {:?}", path))?;
        jobs.push(RecordJob {
            index,
            stem,
            text: record.text,
        });
    }
    Ok(jobs)
}

fn stem_of(path: &Path) -> Option<&str> {
    path.file_stem().and_then(|stem| stem.to_str())
}

/// Tabs and newlines would break the table format.
fn sanitize(field: &str) -> String {
    field.replace('\t', " ").replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct ReversingDelay;

    impl Phonemizer for ReversingDelay {
        fn phonemize(&self, text: &str) -> Result<PhonemeRow> {
            // Later records finish first, scrambling completion order.
            let index: u64 = text.trim().parse().unwrap_or(0);
            thread::sleep(Duration::from_millis(40u64.saturating_sub(index * 10)));
            Ok(PhonemeRow {
                diacritized: format!("d{}", text.trim()),
                phonemes: format!("p{}", text.trim()),
            })
        }
    }

    struct FailsOn(String);

    impl Phonemizer for FailsOn {
        fn phonemize(&self, text: &str) -> Result<PhonemeRow> {
            ensure!(text != self.0, "refusing {}", text);
            Ok(PhonemeRow {
                diacritized: text.to_string(),
                phonemes: text.to_string(),
            })
        }
    }

    fn jobs_from(texts: &[&str]) -> Vec<RecordJob> {
        texts
            .iter()
            .enumerate()
            .map(|(index, text)| RecordJob {
                index,
                stem: index.to_string(),
                text: text.to_string(),
            })
            .collect()
    }

    #[test]
    fn rows_keep_input_order_under_scrambled_completion() {
        let mut out = Vec::new();
        let written = stream_rows(jobs_from(&["0", "1", "2", "3"]), &ReversingDelay, 4, &mut out)
            .unwrap();
        assert_eq!(written, 4);
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "0\td0\tp0\n1\td1\tp1\n2\td2\tp2\n3\td3\tp3\n");
    }

    #[test]
    fn failed_record_is_dropped_without_aborting() {
        let mut out = Vec::new();
        let written = stream_rows(
            jobs_from(&["a", "bad", "c"]),
            &FailsOn("bad".to_string()),
            2,
            &mut out,
        )
        .unwrap();
        assert_eq!(written, 2);
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "0\ta\ta\n2\tc\tc\n");
    }

    #[test]
    fn sanitize_flattens_tabs_and_newlines() {
        assert_eq!(sanitize("a\tb\nc"), "a b c");
    }

    #[test]
    fn numeric_stems_sort_numerically() {
        let dir = tempfile::tempdir().unwrap();
        for stem in ["10", "2", "1"] {
            let record = ChunkRecord {
                text: stem.to_string(),
                segments: Vec::new(),
                start: 0.0,
                end: 1.0,
            };
            fs::write(
                dir.path().join(format!("{stem}.json")),
                serde_json::to_string(&record).unwrap(),
            )
            .unwrap();
        }
        let jobs = collect_jobs(dir.path()).unwrap();
        let stems: Vec<_> = jobs.iter().map(|job| job.stem.as_str()).collect();
        assert_eq!(stems, vec!["1", "2", "10"]);
    }
}
