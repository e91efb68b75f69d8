//! Release artifact export
//!
//! An export step copies the first existing file from an ordered list of
//! candidate paths into a destination directory, optionally under a fixed
//! name. A step never fails the build: a missing artifact is a skip, and a
//! copy error is reported in the outcome.

use crate::artifact::ArtifactKind;
use distkit_core::error::{Error, Result, ResultExt};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

/// A single copy step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportStep {
    /// Step name, e.g. `exportReleaseApk`
    pub name: String,
    /// Kind of artifact handled
    pub kind: ArtifactKind,
    /// Source paths in priority order
    pub candidates: Vec<PathBuf>,
    /// Directory the artifact is copied into
    pub destination_dir: PathBuf,
    /// File name at the destination; the source name is kept when unset
    pub rename: Option<String>,
}

impl ExportStep {
    /// Create a step with no candidates
    pub fn new(name: impl Into<String>, kind: ArtifactKind, destination_dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            kind,
            candidates: Vec::new(),
            destination_dir: destination_dir.into(),
            rename: None,
        }
    }

    /// Append a candidate source path (lower priority than those already added)
    pub fn with_candidate(mut self, path: impl Into<PathBuf>) -> Self {
        self.candidates.push(path.into());
        self
    }

    /// Append several candidate source paths
    pub fn with_candidates<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.candidates.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Copy under a fixed file name
    pub fn renamed(mut self, file_name: impl Into<String>) -> Self {
        self.rename = Some(file_name.into());
        self
    }

    /// First candidate that exists as a regular file
    pub fn locate_source(&self) -> Option<&Path> {
        self.candidates
            .iter()
            .map(PathBuf::as_path)
            .find(|path| path.is_file())
    }

    /// Destination path for a given source
    pub fn destination_for(&self, source: &Path) -> Option<PathBuf> {
        let file_name = match &self.rename {
            Some(name) => std::ffi::OsString::from(name),
            None => source.file_name()?.to_os_string(),
        };
        Some(self.destination_dir.join(file_name))
    }

    /// Run the step
    ///
    /// Performs no filesystem writes when no candidate exists.
    pub fn run(&self) -> StepReport {
        let _span = tracing::info_span!("export", step = %self.name).entered();

        let Some(source) = self.locate_source() else {
            tracing::debug!(candidates = ?self.candidates, "no artifact found, skipping");
            return self.report(ExportOutcome::Skipped {
                reason: format!("no release {} found", self.kind.display_name()),
            });
        };

        let Some(destination) = self.destination_for(source) else {
            return self.report(ExportOutcome::Failed {
                source: source.to_path_buf(),
                error: format!("{} has no file name", source.display()),
            });
        };

        let outcome = match copy_artifact(source, &destination) {
            Ok(CopyStatus::Copied { bytes, sha256 }) => {
                tracing::info!(
                    source = %source.display(),
                    destination = %destination.display(),
                    bytes,
                    "artifact exported"
                );
                ExportOutcome::Copied {
                    source: source.to_path_buf(),
                    destination,
                    bytes,
                    sha256,
                }
            }
            Ok(CopyStatus::Unchanged { bytes, sha256 }) => {
                tracing::info!(destination = %destination.display(), "artifact already up to date");
                ExportOutcome::Unchanged {
                    source: source.to_path_buf(),
                    destination,
                    bytes,
                    sha256,
                }
            }
            Err(err) => {
                tracing::warn!(source = %source.display(), error = %err, "artifact export failed");
                ExportOutcome::Failed {
                    source: source.to_path_buf(),
                    error: err.to_string(),
                }
            }
        };

        self.report(outcome)
    }

    fn report(&self, outcome: ExportOutcome) -> StepReport {
        StepReport {
            step: self.name.clone(),
            kind: self.kind,
            outcome,
        }
    }
}

/// Result of running one export step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExportOutcome {
    /// The artifact was written to the destination
    Copied {
        /// Candidate that was copied
        source: PathBuf,
        /// File written
        destination: PathBuf,
        /// Size in bytes
        bytes: u64,
        /// Hex SHA-256 of the content
        sha256: String,
    },
    /// The destination already held identical bytes
    Unchanged {
        /// Candidate that was checked
        source: PathBuf,
        /// File left in place
        destination: PathBuf,
        /// Size in bytes
        bytes: u64,
        /// Hex SHA-256 of the content
        sha256: String,
    },
    /// No candidate source existed
    Skipped {
        /// Why nothing was copied
        reason: String,
    },
    /// The copy failed; the build is not affected
    Failed {
        /// Candidate that could not be copied
        source: PathBuf,
        /// Error message
        error: String,
    },
}

impl ExportOutcome {
    /// Destination file, when one exists after the step
    pub fn destination(&self) -> Option<&Path> {
        match self {
            ExportOutcome::Copied { destination, .. }
            | ExportOutcome::Unchanged { destination, .. } => Some(destination),
            _ => None,
        }
    }

    /// Whether the destination now holds the artifact
    pub fn is_exported(&self) -> bool {
        self.destination().is_some()
    }
}

/// Outcome of a named step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    /// Step name
    pub step: String,
    /// Artifact kind
    pub kind: ArtifactKind,
    /// What happened
    #[serde(flatten)]
    pub outcome: ExportOutcome,
}

enum CopyStatus {
    Copied { bytes: u64, sha256: String },
    Unchanged { bytes: u64, sha256: String },
}

/// Copy `source` to `destination`, replacing it atomically
///
/// The destination is left untouched when it already has the same content.
fn copy_artifact(source: &Path, destination: &Path) -> Result<CopyStatus> {
    let source_len = std::fs::metadata(source)?.len();
    let sha256 = file_sha256(source)?;

    if destination.is_file() {
        if same_file(source, destination) {
            return Ok(CopyStatus::Unchanged {
                bytes: source_len,
                sha256,
            });
        }
        let dest_len = std::fs::metadata(destination)?.len();
        if dest_len == source_len && file_sha256(destination)? == sha256 {
            return Ok(CopyStatus::Unchanged {
                bytes: source_len,
                sha256,
            });
        }
    }

    let dir = destination
        .parent()
        .ok_or_else(|| Error::export(format!("{} has no parent directory", destination.display())))?;
    std::fs::create_dir_all(dir).context(format!("Creating {}", dir.display()))?;

    let mut staged = tempfile::NamedTempFile::new_in(dir)?;
    let mut reader = File::open(source)?;
    let bytes = std::io::copy(&mut reader, staged.as_file_mut())?;
    staged.as_file().sync_all()?;
    staged
        .persist(destination)
        .map_err(|e| e.error)
        .context(format!("Moving artifact into {}", destination.display()))?;

    Ok(CopyStatus::Copied { bytes, sha256 })
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Hex-encoded SHA-256 of a file
pub fn file_sha256(path: &Path) -> Result<String> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(path: &Path, content: &[u8]) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn apk_step(temp: &TempDir) -> ExportStep {
        let build = temp.path().join("app/build/outputs");
        ExportStep::new("exportReleaseApk", ArtifactKind::Apk, temp.path().join("dist"))
            .with_candidate(build.join("flutter-apk/app-release.apk"))
            .with_candidate(build.join("apk/release/app-release.apk"))
            .renamed("medirem-v1.0-release.apk")
    }

    #[test]
    fn test_copies_primary_under_fixed_name() {
        let temp = TempDir::new().unwrap();
        let step = apk_step(&temp);
        write(&step.candidates[0], b"primary apk");

        let report = step.run();
        let dest = temp.path().join("dist/medirem-v1.0-release.apk");

        assert!(matches!(report.outcome, ExportOutcome::Copied { bytes: 11, .. }));
        assert_eq!(report.outcome.destination(), Some(dest.as_path()));
        assert_eq!(std::fs::read(&dest).unwrap(), b"primary apk");
        assert_eq!(std::fs::read(&step.candidates[0]).unwrap(), b"primary apk");
    }

    #[test]
    fn test_falls_back_to_second_candidate() {
        let temp = TempDir::new().unwrap();
        let step = apk_step(&temp);
        write(&step.candidates[1], b"fallback apk");

        let report = step.run();

        match &report.outcome {
            ExportOutcome::Copied { source, .. } => assert_eq!(source, &step.candidates[1]),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(
            std::fs::read(temp.path().join("dist/medirem-v1.0-release.apk")).unwrap(),
            b"fallback apk"
        );
    }

    #[test]
    fn test_primary_wins_when_both_exist() {
        let temp = TempDir::new().unwrap();
        let step = apk_step(&temp);
        write(&step.candidates[0], b"primary");
        write(&step.candidates[1], b"fallback");

        step.run();

        assert_eq!(
            std::fs::read(temp.path().join("dist/medirem-v1.0-release.apk")).unwrap(),
            b"primary"
        );
    }

    #[test]
    fn test_missing_artifact_is_a_silent_skip() {
        let temp = TempDir::new().unwrap();
        let step = apk_step(&temp);

        let report = step.run();

        assert!(matches!(report.outcome, ExportOutcome::Skipped { .. }));
        assert!(!report.outcome.is_exported());
        // No writes at all: not even the dist directory
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_rerun_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let step = apk_step(&temp);
        write(&step.candidates[0], b"same bytes");

        let first = step.run();
        let second = step.run();

        assert!(matches!(first.outcome, ExportOutcome::Copied { .. }));
        match (&first.outcome, &second.outcome) {
            (
                ExportOutcome::Copied { sha256: a, .. },
                ExportOutcome::Unchanged { sha256: b, .. },
            ) => assert_eq!(a, b),
            other => panic!("unexpected outcomes: {:?}", other),
        }
        assert_eq!(
            std::fs::read(temp.path().join("dist/medirem-v1.0-release.apk")).unwrap(),
            b"same bytes"
        );
        assert_eq!(std::fs::read_dir(temp.path().join("dist")).unwrap().count(), 1);
    }

    #[test]
    fn test_changed_source_overwrites() {
        let temp = TempDir::new().unwrap();
        let step = apk_step(&temp);
        write(&step.candidates[0], b"v1");
        step.run();
        write(&step.candidates[0], b"v2");

        let report = step.run();

        assert!(matches!(report.outcome, ExportOutcome::Copied { .. }));
        assert_eq!(
            std::fs::read(temp.path().join("dist/medirem-v1.0-release.apk")).unwrap(),
            b"v2"
        );
    }

    #[test]
    fn test_keeps_source_name_without_rename() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("app/build/outputs/apk/release/app-release.apk");
        write(&source, b"apk");
        let step = ExportStep::new("copyReleaseToFlutterOut", ArtifactKind::Apk, temp.path().join("out"))
            .with_candidate(&source);

        step.run();

        assert!(temp.path().join("out/app-release.apk").is_file());
    }

    #[test]
    fn test_copy_onto_itself_is_unchanged() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("out/app-release.apk");
        write(&source, b"apk");
        let step = ExportStep::new("mirror", ArtifactKind::Apk, temp.path().join("out"))
            .with_candidate(&source);

        let report = step.run();

        assert!(matches!(report.outcome, ExportOutcome::Unchanged { .. }));
        assert_eq!(std::fs::read(&source).unwrap(), b"apk");
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_error_is_reported_not_raised() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("app-release.aab");
        write(&source, b"aab");
        // A regular file where the destination directory should be
        let blocker = temp.path().join("dist");
        write(&blocker, b"not a directory");
        let step = ExportStep::new("exportReleaseBundle", ArtifactKind::Aab, &blocker)
            .with_candidate(&source)
            .renamed("app-v1-release.aab");

        let report = step.run();

        assert!(matches!(report.outcome, ExportOutcome::Failed { .. }));
    }

    #[test]
    fn test_report_serializes_flat() {
        let report = StepReport {
            step: "exportReleaseBundle".to_string(),
            kind: ArtifactKind::Aab,
            outcome: ExportOutcome::Skipped {
                reason: "no release App Bundle found".to_string(),
            },
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "skipped");
        assert_eq!(json["kind"], "aab");
        assert_eq!(json["step"], "exportReleaseBundle");
    }

    #[test]
    fn test_file_sha256() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a");
        std::fs::write(&path, b"abc").unwrap();
        assert_eq!(
            file_sha256(&path).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
