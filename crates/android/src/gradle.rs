//! Gradle build system integration
//!
//! Runs tasks through the project's Gradle wrapper and finalizes release
//! tasks with their export steps.

use crate::artifact::ArtifactKind;
use crate::export::StepReport;
use crate::signing::ReleaseBuildType;
use crate::tasks::ExportPlan;
use distkit_core::error::{Error, Result};
use distkit_core::process::{run_command_in_dir, run_command_streaming_in_dir};
use distkit_telemetry::Timer;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Gradle wrapper runner for one project
#[derive(Debug, Clone)]
pub struct Gradle {
    project_dir: PathBuf,
    wrapper: PathBuf,
    stream_output: bool,
}

impl Gradle {
    /// Runner for the project at `project_dir` using `wrapper`
    pub fn new(project_dir: impl Into<PathBuf>, wrapper: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
            wrapper: wrapper.into(),
            stream_output: false,
        }
    }

    /// Stream Gradle output to the terminal instead of capturing it
    pub fn streaming(mut self, stream: bool) -> Self {
        self.stream_output = stream;
        self
    }

    /// Fail early when the wrapper script is missing
    pub fn ensure_wrapper(&self) -> Result<&Path> {
        if self.wrapper.is_file() {
            Ok(&self.wrapper)
        } else {
            Err(Error::command_not_found(&self.wrapper.display().to_string())
                .with_context(format!("Gradle project: {}", self.project_dir.display()))
                .with_suggestion("Run from the Android project root or set project.android_dir in distkit.toml"))
        }
    }

    /// Run a task with extra arguments and environment variables
    pub fn run_task(
        &self,
        task: &str,
        extra_args: &[String],
        envs: &[(String, String)],
    ) -> Result<TaskOutcome> {
        let wrapper = self.ensure_wrapper()?;
        let mut args: Vec<String> = Vec::with_capacity(extra_args.len() + 1);
        args.push(task.to_string());
        args.extend(extra_args.iter().cloned());

        tracing::info!(task, args = ?args, "running gradle task");
        let timer = Timer::start(task);

        let (exit_code, output) = if self.stream_output {
            (run_command_streaming_in_dir(wrapper, args.as_slice(), &self.project_dir, envs)?, None)
        } else {
            let result = run_command_in_dir(wrapper, args.as_slice(), &self.project_dir, envs)?;
            (result.exit_code, Some(result.combined_output()))
        };

        let duration = timer.stop();
        let success = exit_code == 0;
        if success {
            tracing::info!(task, duration_ms = duration.as_millis() as u64, "gradle task succeeded");
        } else {
            tracing::warn!(task, exit_code, "gradle task failed");
        }

        Ok(TaskOutcome {
            task: task.to_string(),
            success,
            exit_code,
            duration,
            output,
        })
    }

    /// Clean build outputs
    pub fn clean(&self) -> Result<TaskOutcome> {
        self.run_task("clean", &[], &[])
    }
}

/// Result of a Gradle task
#[derive(Debug, Clone, Serialize)]
pub struct TaskOutcome {
    /// Task name
    pub task: String,
    /// Exit status was zero
    pub success: bool,
    /// Wrapper exit code
    pub exit_code: i32,
    /// Wall time
    #[serde(serialize_with = "serialize_millis")]
    pub duration: Duration,
    /// Captured output, when not streamed
    #[serde(skip)]
    pub output: Option<String>,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

/// A release task and the export steps that finalized it
#[derive(Debug, Clone, Serialize)]
pub struct ReleaseRun {
    /// Artifact kind built
    pub kind: ArtifactKind,
    /// Whether the release build was signed by distkit
    pub signed: bool,
    /// The Gradle task
    pub task: TaskOutcome,
    /// Finalizer outcomes, in run order
    pub exports: Vec<StepReport>,
}

impl ReleaseRun {
    /// Whether the build itself succeeded; export outcomes never count
    pub fn success(&self) -> bool {
        self.task.success
    }
}

/// Build a release artifact and run its finalizers
///
/// Finalizers run after the task whatever its result. Without a plan the
/// export is skipped entirely.
pub fn run_release(
    gradle: &Gradle,
    kind: ArtifactKind,
    build_type: &ReleaseBuildType,
    plan: Option<&ExportPlan>,
) -> Result<ReleaseRun> {
    let task_name = kind.release_task();
    let task = gradle.run_task(task_name, &build_type.gradle_args(), &build_type.gradle_env())?;

    let exports = plan
        .map(|plan| plan.run_finalizers(task_name))
        .unwrap_or_default();

    Ok(ReleaseRun {
        kind,
        signed: build_type.is_signed(),
        task,
        exports,
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::artifact::ReleaseName;
    use crate::layout::ProjectLayout;
    use crate::signing::SigningCredentials;
    use distkit_core::config::{ConfigSchema, SigningSettings};
    use distkit_core::ErrorCode;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    /// Fake wrapper: records its arguments and environment, produces the release APK
    fn install_fake_wrapper(layout: &ProjectLayout, exit_code: i32) {
        std::fs::create_dir_all(&layout.root).unwrap();
        let script = format!(
            "#!/bin/sh\necho \"$@\" > gradle-args.txt\ncat /proc/$$/environ > gradle-env.txt 2>/dev/null\nif [ \"$1\" = assembleRelease ]; then\n  mkdir -p app/build/outputs/apk/release\n  printf 'signed apk' > app/build/outputs/apk/release/app-release.apk\nfi\nexit {}\n",
            exit_code
        );
        let wrapper = layout.gradle_wrapper();
        std::fs::write(&wrapper, script).unwrap();
        std::fs::set_permissions(&wrapper, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    fn setup(exit_code: i32) -> (TempDir, ProjectLayout, ExportPlan, Gradle) {
        let temp = TempDir::new().unwrap();
        let config = ConfigSchema::default();
        let layout = ProjectLayout::resolve(temp.path(), &config);
        install_fake_wrapper(&layout, exit_code);
        let name = ReleaseName::new("medirem", "1.0").unwrap();
        let plan = ExportPlan::standard(&layout, &config.export, &name);
        let gradle = Gradle::new(&layout.root, layout.gradle_wrapper());
        (temp, layout, plan, gradle)
    }

    #[test]
    fn test_missing_wrapper() {
        let temp = TempDir::new().unwrap();
        let gradle = Gradle::new(temp.path(), temp.path().join("gradlew"));
        let err = gradle.clean().unwrap_err();
        assert_eq!(err.code, ErrorCode::CommandNotFound);
    }

    #[test]
    fn test_release_build_is_finalized_by_export() {
        let (_temp, layout, plan, gradle) = setup(0);

        let run = run_release(&gradle, ArtifactKind::Apk, &ReleaseBuildType::default(), Some(&plan)).unwrap();

        assert!(run.success());
        assert!(!run.signed);
        assert_eq!(run.exports.len(), 2);
        assert_eq!(
            std::fs::read(layout.dist_dir.join("medirem-v1.0-release.apk")).unwrap(),
            b"signed apk"
        );
        let args = std::fs::read_to_string(layout.root.join("gradle-args.txt")).unwrap();
        assert_eq!(args.trim(), "assembleRelease");
    }

    #[test]
    fn test_finalizers_run_after_failed_build() {
        let (_temp, layout, plan, gradle) = setup(1);

        let run = run_release(&gradle, ArtifactKind::Apk, &ReleaseBuildType::default(), Some(&plan)).unwrap();

        assert!(!run.success());
        assert_eq!(run.task.exit_code, 1);
        // The fake wrapper still produced an APK before failing
        assert!(run.exports.iter().any(|r| r.outcome.is_exported()));
    }

    #[test]
    fn test_signing_arguments_are_passed() {
        let (_temp, layout, plan, gradle) = setup(0);
        let creds = SigningCredentials::new("/keys/upload.jks", "store-pass-7x", "upload", "key-pass-9y");
        let build = ReleaseBuildType::configure(Some(creds), &SigningSettings::default());

        let run = run_release(&gradle, ArtifactKind::Aab, &build, Some(&plan)).unwrap();

        assert!(run.signed);
        let args = std::fs::read_to_string(layout.root.join("gradle-args.txt")).unwrap();
        assert!(args.starts_with("bundleRelease "));
        assert!(args.contains("-Pandroid.injected.signing.key.alias=upload"));
        assert!(!args.contains("password"));
        assert!(!args.contains("store-pass-7x"));
        assert!(!args.contains("key-pass-9y"));

        #[cfg(target_os = "linux")]
        {
            let env = std::fs::read(layout.root.join("gradle-env.txt")).unwrap();
            let env = String::from_utf8_lossy(&env);
            assert!(env
                .split('\0')
                .any(|var| var == "ORG_GRADLE_PROJECT_android.injected.signing.store.password=store-pass-7x"));
            assert!(env
                .split('\0')
                .any(|var| var == "ORG_GRADLE_PROJECT_android.injected.signing.key.password=key-pass-9y"));
        }
        // No bundle was produced by the fake wrapper
        assert_eq!(run.exports.len(), 1);
        assert!(!run.exports[0].outcome.is_exported());
        assert!(!layout.dist_dir.exists());
    }

    #[test]
    fn test_skip_export() {
        let (_temp, layout, _plan, gradle) = setup(0);

        let run = run_release(&gradle, ArtifactKind::Apk, &ReleaseBuildType::default(), None).unwrap();

        assert!(run.exports.is_empty());
        assert!(!layout.dist_dir.exists());
    }
}
