//! distkit Android CLI
//!
//! Builds signed release artifacts and exports them under stable names.

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use distkit_android::gradle::{self, Gradle, ReleaseRun};
use distkit_android::signing::{self, SigningCredentials, SigningSummary};
use distkit_android::tasks::Finalizer;
use distkit_android::version::{resolve_version_name, VersionName};
use distkit_android::{
    ArtifactKind, ExportOutcome, ExportPlan, ProjectLayout, ReleaseBuildType, ReleaseName,
    StepReport,
};
use distkit_cli::output::{self, display_path, format_count, format_duration, format_size, Status};
use distkit_cli::progress;
use distkit_core::config::Config;
use distkit_core::error::{exit_codes, Error, ErrorCode};
use distkit_telemetry::{level_for_verbosity, TelemetryConfig};
use owo_colors::OwoColorize;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "distkit-android")]
#[command(about = "Sign and export Android release builds")]
#[command(version)]
struct Cli {
    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory containing distkit.toml and the project
    #[arg(short = 'C', long, global = true, default_value = ".")]
    project_dir: PathBuf,

    /// Increase output verbosity (streams Gradle output)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build release artifacts and export them
    Release {
        /// Build the app bundle (AAB) instead of the APK
        #[arg(long)]
        bundle: bool,
        /// Build both the APK and the app bundle
        #[arg(long, conflicts_with = "bundle")]
        all: bool,
        /// Clean before building
        #[arg(long)]
        clean: bool,
        /// Do not run export steps after the build
        #[arg(long)]
        skip_export: bool,
        /// Override the version name used in exported file names
        #[arg(long)]
        version_name: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Export already-built artifacts without running Gradle
    Export {
        /// Which artifacts to export
        #[arg(value_enum, default_value_t = ExportTarget::All)]
        target: ExportTarget,
        /// Override the version name used in exported file names
        #[arg(long)]
        version_name: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect or create release signing credentials
    Signing {
        #[command(subcommand)]
        action: SigningAction,
    },

    /// Show export steps per build task and the resolved paths
    Plan {
        /// Override the version name used in exported file names
        #[arg(long)]
        version_name: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum SigningAction {
    /// Show whether release builds will be signed
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write key.properties
    Init {
        /// Keystore path (relative paths resolve against the app module)
        #[arg(long)]
        store_file: PathBuf,
        /// Key alias
        #[arg(long)]
        alias: String,
        /// Environment variable holding the keystore password
        #[arg(long, default_value = "DISTKIT_STORE_PASSWORD")]
        store_password_env: String,
        /// Environment variable holding the key password
        #[arg(long, default_value = "DISTKIT_KEY_PASSWORD")]
        key_password_env: String,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ExportTarget {
    Apk,
    Aab,
    All,
}

impl ExportTarget {
    fn kinds(self) -> &'static [ArtifactKind] {
        match self {
            ExportTarget::Apk => &[ArtifactKind::Apk],
            ExportTarget::Aab => &[ArtifactKind::Aab],
            ExportTarget::All => &ArtifactKind::ALL,
        }
    }
}

/// Loaded configuration and resolved layout shared by commands
struct Context {
    config: Config,
    layout: ProjectLayout,
    verbose: u8,
    quiet: bool,
}

impl Context {
    fn version(&self, version_override: Option<&str>) -> distkit_core::Result<VersionName> {
        let configured = version_override.or(self.config.schema.app.version_name.as_deref());
        resolve_version_name(configured, &self.layout)
    }

    fn release_name(&self, version: &VersionName) -> distkit_core::Result<ReleaseName> {
        ReleaseName::new(self.config.schema.app.product.clone(), version.value.clone())
    }

    fn plan(&self, name: &ReleaseName) -> ExportPlan {
        ExportPlan::standard(&self.layout, &self.config.schema.export, name)
    }

    fn build_type(&self) -> distkit_core::Result<ReleaseBuildType> {
        ReleaseBuildType::load(
            &self.layout.key_properties,
            &self.layout.app_dir,
            &self.config.schema.signing,
        )
    }
}

#[derive(Serialize)]
struct ReleaseReport<'a> {
    generated_at: DateTime<Utc>,
    product: &'a str,
    version: &'a str,
    runs: &'a [ReleaseRun],
}

#[derive(Serialize)]
struct ExportReport<'a> {
    generated_at: DateTime<Utc>,
    product: &'a str,
    version: &'a str,
    exports: &'a [StepReport],
}

#[derive(Serialize)]
struct PlanReport<'a> {
    layout: &'a ProjectLayout,
    version: &'a VersionName,
    signing: SigningSummary,
    finalizers: &'a [Finalizer],
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        owo_colors::set_override(false);
    }

    let config = match Config::load(cli.config.as_deref(), &cli.project_dir) {
        Ok(config) => config,
        Err(e) => {
            Status::error(&e.to_string());
            std::process::exit(e.exit_code());
        }
    };

    let logging = &config.schema.logging;
    let log_guard = distkit_telemetry::init_with_config(TelemetryConfig {
        log_level: level_for_verbosity(cli.verbose, cli.quiet, &logging.level),
        log_directory: logging.directory.as_ref().map(|d| cli.project_dir.join(d)),
        ..TelemetryConfig::default()
    })?;

    let layout = ProjectLayout::resolve(&cli.project_dir, &config.schema);
    let ctx = Context {
        config,
        layout,
        verbose: cli.verbose,
        quiet: cli.quiet,
    };
    tracing::debug!(
        config = ?ctx.config.path,
        root = %ctx.layout.root.display(),
        "configuration loaded"
    );

    let exit_code = match cli.command {
        Commands::Release { bundle, all, clean, skip_export, version_name, json } => {
            let kinds: &[ArtifactKind] = if all {
                &ArtifactKind::ALL
            } else if bundle {
                &[ArtifactKind::Aab]
            } else {
                &[ArtifactKind::Apk]
            };
            run_release(&ctx, kinds, clean, skip_export, version_name.as_deref(), json)
        }
        Commands::Export { target, version_name, json } => {
            run_export(&ctx, target, version_name.as_deref(), json)
        }
        Commands::Signing { action } => match action {
            SigningAction::Status { json } => run_signing_status(&ctx, json),
            SigningAction::Init {
                store_file,
                alias,
                store_password_env,
                key_password_env,
                force,
            } => run_signing_init(&ctx, store_file, &alias, &store_password_env, &key_password_env, force),
        },
        Commands::Plan { version_name, json } => run_plan(&ctx, version_name.as_deref(), json),
    };

    drop(log_guard);
    std::process::exit(exit_code);
}

fn fail(err: &Error) -> i32 {
    Status::error(&err.to_string());
    err.exit_code()
}

fn run_release(
    ctx: &Context,
    kinds: &[ArtifactKind],
    clean: bool,
    skip_export: bool,
    version_override: Option<&str>,
    json: bool,
) -> i32 {
    // Configuration is resolved up front, before any Gradle task runs
    let version = match ctx.version(version_override) {
        Ok(v) => v,
        Err(e) => return fail(&e),
    };
    let name = match ctx.release_name(&version) {
        Ok(n) => n,
        Err(e) => return fail(&e),
    };
    let build_type = match ctx.build_type() {
        Ok(b) => b,
        Err(e) => return fail(&e),
    };
    let plan = ctx.plan(&name);

    let stream = ctx.verbose > 0 && !json;
    let gradle = Gradle::new(&ctx.layout.root, ctx.layout.gradle_wrapper()).streaming(stream);
    let chatty = !json && !ctx.quiet;

    if chatty {
        Status::header(&format!("{} {}", name.product(), name.version()));
        if build_type.is_signed() {
            Status::info("Release signing: attached from key.properties");
        } else {
            Status::info("Release signing: not configured (no key.properties)");
        }
    }

    if clean {
        match run_gradle_step(&gradle, "clean", chatty, stream, || gradle.clean()) {
            Ok(outcome) if outcome.success => {}
            Ok(outcome) => {
                Status::error("Clean failed");
                print_captured(&outcome.output);
                return exit_codes::FAILURE;
            }
            Err(e) => return fail(&e),
        }
    }

    let mut runs = Vec::with_capacity(kinds.len());
    for kind in kinds {
        let task = kind.release_task();
        let result = run_gradle_step(&gradle, task, chatty, stream, || {
            gradle::run_release(&gradle, *kind, &build_type, (!skip_export).then_some(&plan))
        });

        let run = match result {
            Ok(run) => run,
            Err(e) => return fail(&e),
        };

        if !run.success() && !json {
            Status::error(&format!("{} failed (exit code {})", task, run.task.exit_code));
            print_captured(&run.task.output);
        }
        if chatty {
            print_reports(&run.exports, &ctx.layout.root);
        }
        runs.push(run);
    }

    if json {
        let report = ReleaseReport {
            generated_at: Utc::now(),
            product: name.product(),
            version: name.version(),
            runs: &runs,
        };
        if let Err(e) = output::print_json(&report) {
            return fail(&Error::from(e));
        }
    }

    if runs.iter().all(ReleaseRun::success) {
        exit_codes::SUCCESS
    } else {
        exit_codes::FAILURE
    }
}

/// Anything that reports whether its Gradle task succeeded
trait TaskResult {
    fn succeeded(&self) -> bool;
    fn elapsed(&self) -> std::time::Duration;
}

impl TaskResult for gradle::TaskOutcome {
    fn succeeded(&self) -> bool {
        self.success
    }
    fn elapsed(&self) -> std::time::Duration {
        self.duration
    }
}

impl TaskResult for ReleaseRun {
    fn succeeded(&self) -> bool {
        self.success()
    }
    fn elapsed(&self) -> std::time::Duration {
        self.task.duration
    }
}

/// Run a Gradle step behind a spinner, unless output is streamed or hidden
fn run_gradle_step<T: TaskResult>(
    gradle: &Gradle,
    task: &str,
    chatty: bool,
    stream: bool,
    f: impl FnOnce() -> distkit_core::Result<T>,
) -> distkit_core::Result<T> {
    gradle.ensure_wrapper()?;

    if stream || !chatty {
        if stream {
            Status::info(&format!("Running {}...", task));
        }
        return f();
    }

    let pb = progress::spinner(&format!("Running {}...", task));
    let result = f();
    match &result {
        Ok(r) if r.succeeded() => progress::finish_success(
            &pb,
            &format!("{} ({})", task, format_duration(r.elapsed())),
        ),
        _ => progress::finish_error(&pb, task),
    }
    result
}

fn print_captured(output: &Option<String>) {
    if let Some(text) = output {
        let tail: Vec<&str> = text.lines().rev().take(40).collect();
        for line in tail.into_iter().rev() {
            eprintln!("  {}", line.dimmed());
        }
    }
}

fn run_export(ctx: &Context, target: ExportTarget, version_override: Option<&str>, json: bool) -> i32 {
    let version = match ctx.version(version_override) {
        Ok(v) => v,
        Err(e) => return fail(&e),
    };
    let name = match ctx.release_name(&version) {
        Ok(n) => n,
        Err(e) => return fail(&e),
    };
    let plan = ctx.plan(&name);

    let reports: Vec<StepReport> = target
        .kinds()
        .iter()
        .flat_map(|kind| plan.run_for_kind(*kind))
        .collect();

    if json {
        let report = ExportReport {
            generated_at: Utc::now(),
            product: name.product(),
            version: name.version(),
            exports: &reports,
        };
        if let Err(e) = output::print_json(&report) {
            return fail(&Error::from(e));
        }
    } else if !ctx.quiet {
        print_reports(&reports, &ctx.layout.root);
        let exported = reports.iter().filter(|r| r.outcome.is_exported()).count();
        if exported == 0 {
            Status::info("Nothing to export; build a release first");
        }
    }

    // Export is advisory: missing artifacts never fail the command
    exit_codes::SUCCESS
}

fn print_reports(reports: &[StepReport], base: &Path) {
    for report in reports {
        match &report.outcome {
            ExportOutcome::Copied { destination, bytes, sha256, .. } => Status::success(&format!(
                "{}: {} ({}, sha256 {})",
                report.step,
                display_path(destination, base),
                format_size(*bytes),
                &sha256[..12.min(sha256.len())]
            )),
            ExportOutcome::Unchanged { destination, .. } => Status::success(&format!(
                "{}: {} (up to date)",
                report.step,
                display_path(destination, base)
            )),
            ExportOutcome::Skipped { reason } => {
                Status::skipped(&format!("{}: {}", report.step, reason))
            }
            ExportOutcome::Failed { error, .. } => {
                Status::warning(&format!("{}: export failed: {}", report.step, error))
            }
        }
    }

    let exported = reports.iter().filter(|r| r.outcome.is_exported()).count();
    if exported > 0 {
        Status::info(&format!("Exported {}", format_count(exported, "artifact", "artifacts")));
    }
}

fn run_signing_status(ctx: &Context, json: bool) -> i32 {
    let build_type = match ctx.build_type() {
        Ok(b) => b,
        Err(e) => return fail(&e),
    };
    let summary = build_type.summary();

    if json {
        if let Err(e) = output::print_json(&summary) {
            return fail(&Error::from(e));
        }
        return exit_codes::SUCCESS;
    }

    print_signing_summary(&summary, &ctx.layout);
    exit_codes::SUCCESS
}

fn print_signing_summary(summary: &SigningSummary, layout: &ProjectLayout) {
    let key_properties = display_path(&layout.key_properties, &layout.root);
    if !summary.attached {
        Status::info(&format!(
            "Release signing not attached: {} missing or empty",
            key_properties
        ));
        return;
    }

    Status::success(&format!("Release signing attached from {}", key_properties));
    if let Some(store) = &summary.store_file {
        Status::detail("keystore", &store.display().to_string());
    }
    if let Some(alias) = &summary.key_alias {
        Status::detail("alias", alias);
    }
    Status::detail(
        "schemes",
        &format!(
            "v1={} v2={}",
            summary.v1_enabled.unwrap_or_default(),
            summary.v2_enabled.unwrap_or_default()
        ),
    );
    if summary.store_file_exists == Some(false) {
        Status::warning("Keystore file does not exist; Gradle will fail to sign");
    }
}

fn run_signing_init(
    ctx: &Context,
    store_file: PathBuf,
    alias: &str,
    store_password_env: &str,
    key_password_env: &str,
    force: bool,
) -> i32 {
    let read_secret = |var: &str| {
        std::env::var(var).map_err(|_| {
            Error::new(ErrorCode::InvalidInput, format!("Environment variable {} is not set", var))
                .with_suggestion(format!("export {}=... before running signing init", var))
        })
    };

    let store_password = match read_secret(store_password_env) {
        Ok(p) => p,
        Err(e) => return fail(&e),
    };
    let key_password = match read_secret(key_password_env) {
        Ok(p) => p,
        Err(e) => return fail(&e),
    };

    let credentials = SigningCredentials::new(store_file, store_password, alias, key_password);
    match signing::write_key_properties(&ctx.layout.key_properties, &credentials, force) {
        Ok(()) => {
            if !ctx.quiet {
                Status::success(&format!(
                    "Wrote {}",
                    display_path(&ctx.layout.key_properties, &ctx.layout.root)
                ));
                Status::warning("Keep key.properties out of version control");
            }
            exit_codes::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

fn run_plan(ctx: &Context, version_override: Option<&str>, json: bool) -> i32 {
    let version = match ctx.version(version_override) {
        Ok(v) => v,
        Err(e) => return fail(&e),
    };
    let name = match ctx.release_name(&version) {
        Ok(n) => n,
        Err(e) => return fail(&e),
    };
    let build_type = match ctx.build_type() {
        Ok(b) => b,
        Err(e) => return fail(&e),
    };
    let plan = ctx.plan(&name);

    if json {
        let report = PlanReport {
            layout: &ctx.layout,
            version: &version,
            signing: build_type.summary(),
            finalizers: plan.finalizers(),
        };
        if let Err(e) = output::print_json(&report) {
            return fail(&Error::from(e));
        }
        return exit_codes::SUCCESS;
    }

    let base = &ctx.layout.root;
    Status::header(&format!("{} {}", name.product(), name.version()));
    print_signing_summary(&build_type.summary(), &ctx.layout);

    for task in plan.tasks() {
        Status::header(&format!("{} finalized by", task));
        for step in plan.finalizers_for(task) {
            println!("  {}", step.name.bold());
            for (i, candidate) in step.candidates.iter().enumerate() {
                let marker = if candidate.is_file() {
                    "found".green().to_string()
                } else {
                    "missing".dimmed().to_string()
                };
                println!("    {}. {} [{}]", i + 1, display_path(candidate, base), marker);
            }
            let destination = match &step.rename {
                Some(file_name) => step.destination_dir.join(file_name),
                None => step.destination_dir.join("<source name>"),
            };
            println!("    → {}", display_path(&destination, base));
        }
    }

    exit_codes::SUCCESS
}
