//! Build task finalizers
//!
//! Each release task is finalized by export steps that run after it,
//! whether the task succeeded or not. A step that finds no artifact is a
//! no-op, so running finalizers after a failed build is harmless.

use crate::artifact::{ArtifactKind, ReleaseName};
use crate::export::{ExportStep, StepReport};
use crate::layout::ProjectLayout;
use distkit_core::config::ExportConfig;
use serde::Serialize;

/// Gradle task building the release APK
pub const ASSEMBLE_RELEASE: &str = "assembleRelease";
/// Gradle task building the release bundle
pub const BUNDLE_RELEASE: &str = "bundleRelease";

/// Step copying the release APK into the distribution directory
pub const EXPORT_RELEASE_APK: &str = "exportReleaseApk";
/// Step copying the release bundle into the distribution directory
pub const EXPORT_RELEASE_BUNDLE: &str = "exportReleaseBundle";
/// Step mirroring the Gradle-built APK into the Flutter output directory
pub const COPY_RELEASE_TO_FRAMEWORK_OUT: &str = "copyReleaseToFlutterOut";

/// Gradle-relative path of the APK produced by `assembleRelease`
const GRADLE_RELEASE_APK: &str = "outputs/apk/release/app-release.apk";

/// A finalizer registration: `task` is finalized by `step`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finalizer {
    /// Task being finalized
    pub task: String,
    /// Step run after it
    pub step: ExportStep,
}

/// Ordered finalizer registrations
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExportPlan {
    finalizers: Vec<Finalizer>,
}

impl ExportPlan {
    /// Create an empty plan
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `step` to run after `task`; steps run in registration order
    pub fn finalize(mut self, task: impl Into<String>, step: ExportStep) -> Self {
        self.finalizers.push(Finalizer {
            task: task.into(),
            step,
        });
        self
    }

    /// The standard plan for a release build
    ///
    /// - `assembleRelease` → mirror into the Flutter output directory (when
    ///   enabled), then `exportReleaseApk`
    /// - `bundleRelease` → `exportReleaseBundle`
    pub fn standard(layout: &ProjectLayout, export: &ExportConfig, name: &ReleaseName) -> Self {
        let mut plan = Self::new();

        if export.mirror_to_framework_output {
            plan = plan.finalize(
                ASSEMBLE_RELEASE,
                ExportStep::new(
                    COPY_RELEASE_TO_FRAMEWORK_OUT,
                    ArtifactKind::Apk,
                    &layout.framework_output_dir,
                )
                .with_candidate(layout.in_app_build(GRADLE_RELEASE_APK)),
            );
        }

        let apk = ExportStep::new(EXPORT_RELEASE_APK, ArtifactKind::Apk, &layout.dist_dir)
            .with_candidates(export.apk_candidates.iter().map(|c| layout.in_app_build(c)))
            .renamed(name.file_name(ArtifactKind::Apk));

        let aab = ExportStep::new(EXPORT_RELEASE_BUNDLE, ArtifactKind::Aab, &layout.dist_dir)
            .with_candidates(export.aab_candidates.iter().map(|c| layout.in_app_build(c)))
            .renamed(name.file_name(ArtifactKind::Aab));

        plan.finalize(ASSEMBLE_RELEASE, apk)
            .finalize(BUNDLE_RELEASE, aab)
    }

    /// Steps finalizing `task`, in run order
    pub fn finalizers_for<'a>(&'a self, task: &'a str) -> impl Iterator<Item = &'a ExportStep> + 'a {
        self.finalizers
            .iter()
            .filter(move |f| f.task == task)
            .map(|f| &f.step)
    }

    /// Steps handling a given artifact kind, in run order
    pub fn steps_for_kind(&self, kind: ArtifactKind) -> impl Iterator<Item = &ExportStep> {
        self.finalizers
            .iter()
            .map(|f| &f.step)
            .filter(move |s| s.kind == kind)
    }

    /// Look up a step by name
    pub fn step(&self, name: &str) -> Option<&ExportStep> {
        self.finalizers.iter().map(|f| &f.step).find(|s| s.name == name)
    }

    /// All registrations, in order
    pub fn finalizers(&self) -> &[Finalizer] {
        &self.finalizers
    }

    /// Finalized task names, first registration order, deduplicated
    pub fn tasks(&self) -> Vec<&str> {
        let mut tasks: Vec<&str> = Vec::new();
        for f in &self.finalizers {
            if !tasks.contains(&f.task.as_str()) {
                tasks.push(&f.task);
            }
        }
        tasks
    }

    /// Run every step finalizing `task`
    pub fn run_finalizers(&self, task: &str) -> Vec<StepReport> {
        let reports: Vec<StepReport> = self.finalizers_for(task).map(ExportStep::run).collect();
        tracing::debug!(task, steps = reports.len(), "finalizers completed");
        reports
    }

    /// Run every step handling `kind`, outside of any build
    pub fn run_for_kind(&self, kind: ArtifactKind) -> Vec<StepReport> {
        self.steps_for_kind(kind).map(ExportStep::run).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::ExportOutcome;
    use distkit_core::config::ConfigSchema;
    use std::path::Path;
    use tempfile::TempDir;

    fn plan_in(temp: &TempDir, config: &ConfigSchema) -> (ProjectLayout, ExportPlan) {
        let layout = ProjectLayout::resolve(temp.path(), config);
        let name = ReleaseName::new("medirem", "1.0").unwrap();
        let plan = ExportPlan::standard(&layout, &config.export, &name);
        (layout, plan)
    }

    fn write(path: &Path, content: &[u8]) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_standard_plan_registrations() {
        let temp = TempDir::new().unwrap();
        let (_, plan) = plan_in(&temp, &ConfigSchema::default());

        let assemble: Vec<&str> = plan
            .finalizers_for(ASSEMBLE_RELEASE)
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(assemble, vec![COPY_RELEASE_TO_FRAMEWORK_OUT, EXPORT_RELEASE_APK]);

        let bundle: Vec<&str> = plan
            .finalizers_for(BUNDLE_RELEASE)
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(bundle, vec![EXPORT_RELEASE_BUNDLE]);

        assert_eq!(plan.tasks(), vec![ASSEMBLE_RELEASE, BUNDLE_RELEASE]);
        assert_eq!(plan.finalizers_for("assembleDebug").count(), 0);
    }

    #[test]
    fn test_standard_plan_names_and_priority() {
        let temp = TempDir::new().unwrap();
        let (layout, plan) = plan_in(&temp, &ConfigSchema::default());

        let apk = plan.step(EXPORT_RELEASE_APK).unwrap();
        assert_eq!(apk.rename.as_deref(), Some("medirem-v1.0-release.apk"));
        assert_eq!(apk.destination_dir, layout.dist_dir);
        assert_eq!(
            apk.candidates,
            vec![
                layout.in_app_build("outputs/flutter-apk/app-release.apk"),
                layout.in_app_build("outputs/apk/release/app-release.apk"),
            ]
        );

        let aab = plan.step(EXPORT_RELEASE_BUNDLE).unwrap();
        assert_eq!(aab.rename.as_deref(), Some("medirem-v1.0-release.aab"));
    }

    #[test]
    fn test_mirror_can_be_disabled() {
        let temp = TempDir::new().unwrap();
        let mut config = ConfigSchema::default();
        config.export.mirror_to_framework_output = false;
        let (_, plan) = plan_in(&temp, &config);

        assert!(plan.step(COPY_RELEASE_TO_FRAMEWORK_OUT).is_none());
        assert_eq!(plan.finalizers_for(ASSEMBLE_RELEASE).count(), 1);
    }

    #[test]
    fn test_assemble_finalizers_export_gradle_apk() {
        let temp = TempDir::new().unwrap();
        let (layout, plan) = plan_in(&temp, &ConfigSchema::default());
        write(&layout.in_app_build(GRADLE_RELEASE_APK), b"gradle apk");

        let reports = plan.run_finalizers(ASSEMBLE_RELEASE);

        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|r| r.outcome.is_exported()));
        assert_eq!(
            std::fs::read(layout.framework_output_dir.join("app-release.apk")).unwrap(),
            b"gradle apk"
        );
        assert_eq!(
            std::fs::read(layout.dist_dir.join("medirem-v1.0-release.apk")).unwrap(),
            b"gradle apk"
        );
    }

    #[test]
    fn test_bundle_finalizers_skip_without_artifact() {
        let temp = TempDir::new().unwrap();
        let (layout, plan) = plan_in(&temp, &ConfigSchema::default());

        let reports = plan.run_finalizers(BUNDLE_RELEASE);

        assert_eq!(reports.len(), 1);
        assert!(matches!(reports[0].outcome, ExportOutcome::Skipped { .. }));
        assert!(!layout.dist_dir.exists());
    }

    #[test]
    fn test_run_for_kind() {
        let temp = TempDir::new().unwrap();
        let (layout, plan) = plan_in(&temp, &ConfigSchema::default());
        write(
            &layout.in_app_build("outputs/bundle/release/app-release.aab"),
            b"bundle",
        );

        let reports = plan.run_for_kind(ArtifactKind::Aab);

        assert_eq!(reports.len(), 1);
        assert!(layout.dist_dir.join("medirem-v1.0-release.aab").is_file());
    }
}
