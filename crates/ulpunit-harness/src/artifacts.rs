//! Run artifacts on disk and their SHA-256 index.
//!
//! A bundle directory holds the plain-text report, the JSONL log (when one
//! was written), the run summary, and `artifact_index.json` listing every
//! file with its digest.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use ulpunit::RunSummary;
use ulpunit::structured_log::now_utc;

pub const INDEX_FILE: &str = "artifact_index.json";
pub const REPORT_FILE: &str = "report.txt";
pub const SUMMARY_FILE: &str = "summary.json";
pub const LOG_FILE: &str = "log.jsonl";

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("artifact path escapes the bundle: {0}")]
    OutsideBundle(String),
}

/// A single artifact entry in the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactEntry {
    /// Path relative to the bundle directory.
    pub path: String,
    pub kind: String,
    pub sha256: String,
    pub size_bytes: u64,
}

/// Artifact index linking a run to its files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactIndex {
    pub index_version: u32,
    pub run_id: String,
    pub suite: String,
    pub generated_utc: String,
    pub artifacts: Vec<ArtifactEntry>,
}

impl ArtifactIndex {
    #[must_use]
    pub fn new(run_id: impl Into<String>, suite: impl Into<String>) -> Self {
        Self {
            index_version: 1,
            run_id: run_id.into(),
            suite: suite.into(),
            generated_utc: now_utc(),
            artifacts: Vec::new(),
        }
    }

    /// Hash `relative` (inside `bundle`) and add it to the index.
    pub fn add_file(
        &mut self,
        bundle: &Path,
        relative: &str,
        kind: &str,
    ) -> Result<&mut Self, ArtifactError> {
        let data = std::fs::read(bundle.join(relative))?;
        self.artifacts.push(ArtifactEntry {
            path: relative.to_string(),
            kind: kind.to_string(),
            sha256: sha256_hex(&data),
            size_bytes: data.len() as u64,
        });
        Ok(self)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write the index as `artifact_index.json` inside `bundle`.
    pub fn write(&self, bundle: &Path) -> Result<PathBuf, ArtifactError> {
        let path = bundle.join(INDEX_FILE);
        std::fs::write(&path, self.to_json()?)?;
        Ok(path)
    }

    pub fn load(bundle: &Path) -> Result<Self, ArtifactError> {
        let content = std::fs::read_to_string(bundle.join(INDEX_FILE))?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Write the report and summary of one run into `bundle` and index them.
///
/// `log` names a JSONL log already written inside the bundle, if any.
pub fn write_run_bundle(
    bundle: &Path,
    run_id: &str,
    report: &str,
    summary: &RunSummary,
    log: Option<&str>,
) -> Result<ArtifactIndex, ArtifactError> {
    std::fs::create_dir_all(bundle)?;
    std::fs::write(bundle.join(REPORT_FILE), report)?;
    std::fs::write(
        bundle.join(SUMMARY_FILE),
        serde_json::to_string_pretty(summary)?,
    )?;

    let mut index = ArtifactIndex::new(run_id, summary.suite.clone());
    index
        .add_file(bundle, REPORT_FILE, "report")?
        .add_file(bundle, SUMMARY_FILE, "summary")?;
    if let Some(log) = log {
        resolve(bundle, log)?;
        index.add_file(bundle, log, "log")?;
    }
    index.write(bundle)?;
    Ok(index)
}

/// Problem found while re-checking an index against the files on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactIssue {
    pub path: String,
    pub problem: String,
}

/// Re-hash every indexed file and report missing or altered ones.
pub fn verify_bundle(bundle: &Path) -> Result<Vec<ArtifactIssue>, ArtifactError> {
    let index = ArtifactIndex::load(bundle)?;
    let mut issues = Vec::new();
    for entry in &index.artifacts {
        let resolved = resolve(bundle, &entry.path)?;
        match std::fs::read(&resolved) {
            Ok(data) => {
                let actual = sha256_hex(&data);
                if !actual.eq_ignore_ascii_case(&entry.sha256) {
                    issues.push(ArtifactIssue {
                        path: entry.path.clone(),
                        problem: format!("sha256 mismatch: expected={}, actual={actual}", entry.sha256),
                    });
                }
            }
            Err(err) => issues.push(ArtifactIssue {
                path: entry.path.clone(),
                problem: format!("unreadable: {err}"),
            }),
        }
    }
    Ok(issues)
}

fn resolve(bundle: &Path, relative: &str) -> Result<PathBuf, ArtifactError> {
    let candidate = Path::new(relative);
    let escapes = candidate.is_absolute()
        || candidate
            .components()
            .any(|c| matches!(c, std::path::Component::ParentDir));
    if escapes {
        return Err(ArtifactError::OutsideBundle(relative.to_string()));
    }
    Ok(bundle.join(candidate))
}

#[must_use]
pub fn sha256_hex(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest.iter() {
        let _ = write!(out, "{b:02x}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("ulpunit-artifacts-{tag}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn sha256_of_empty_input() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn index_round_trips_and_detects_tampering() {
        let dir = scratch("tamper");
        std::fs::write(dir.join("report.txt"), "SUCCESS\n").unwrap();

        let mut index = ArtifactIndex::new("run-7", "selfcheck");
        index.add_file(&dir, "report.txt", "report").unwrap();
        index.write(&dir).unwrap();
        assert!(verify_bundle(&dir).unwrap().is_empty());

        std::fs::write(dir.join("report.txt"), "UNIT TEST FAILED!\n").unwrap();
        let issues = verify_bundle(&dir).unwrap();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].problem.starts_with("sha256 mismatch"));

        std::fs::remove_file(dir.join("report.txt")).unwrap();
        let issues = verify_bundle(&dir).unwrap();
        assert!(issues[0].problem.starts_with("unreadable"));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn parent_paths_are_rejected() {
        let dir = scratch("escape");
        let err = resolve(&dir, "../secret").unwrap_err();
        assert!(matches!(err, ArtifactError::OutsideBundle(_)));
        std::fs::remove_dir_all(&dir).ok();
    }
}
