//! Roster Sync CLI
//!
//! Reconciles the roster with the remote classroom service, one task
//! category per flag.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use roster_sync::{
    config,
    error::Result,
    models::TaskKind,
    pipeline::{self, Projector, Selection},
    services::{ClassroomHttpClient, ClassroomService},
    storage::{ErrorSink, FileErrorLog, NullErrorSink},
    utils::log as console,
};

/// Roster Sync - timetable to classroom reconciliation
#[derive(Parser, Debug)]
#[command(
    name = "roster-sync",
    version,
    about = "Reconciles timetabled subjects and classes with classroom courses"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "data/config.toml")]
    config: PathBuf,

    /// Roster file (overrides sync.roster_path)
    #[arg(long)]
    roster: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate and run sync tasks for the selected categories
    Sync(SyncArgs),

    /// Validate configuration and roster without contacting the service
    Validate,
}

#[derive(Args, Debug)]
struct SyncArgs {
    /// Create courses missing from the remote service
    #[arg(long)]
    add_courses: bool,

    /// Update attributes of existing courses
    #[arg(long)]
    update_courses: bool,

    /// Enrol missing teachers
    #[arg(long)]
    add_teachers: bool,

    /// Remove teachers no longer timetabled
    #[arg(long)]
    remove_teachers: bool,

    /// Enrol missing students
    #[arg(long)]
    add_students: bool,

    /// Remove students no longer timetabled
    #[arg(long)]
    remove_students: bool,

    /// Archive class courses no longer timetabled
    #[arg(long)]
    archive_courses: bool,

    /// Run every category
    #[arg(long)]
    all_tasks: bool,

    /// List generated tasks without running them
    #[arg(long, visible_alias = "show-tasks", conflicts_with = "all_tasks")]
    show_tasks_only: bool,
}

impl SyncArgs {
    fn selection(&self) -> Result<Selection> {
        let flags = [
            (TaskKind::CreateCourse, self.add_courses),
            (TaskKind::UpdateCourse, self.update_courses),
            (TaskKind::AddTeacher, self.add_teachers),
            (TaskKind::RemoveTeacher, self.remove_teachers),
            (TaskKind::AddStudent, self.add_students),
            (TaskKind::RemoveStudent, self.remove_students),
            (TaskKind::ArchiveCourse, self.archive_courses),
        ];
        let kinds = flags
            .into_iter()
            .filter(|(_, selected)| *selected)
            .map(|(kind, _)| kind);

        Selection::new(kinds, self.all_tasks, self.show_tasks_only)
    }
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let (config, roster) = config::load_all(&cli.config, cli.roster.as_deref())?;
    console::init(if cli.verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    });

    log::info!("Loaded configuration from {}", cli.config.display());

    match cli.command {
        Command::Sync(args) => {
            let selection = args.selection()?;

            if config.classroom.access_token.is_none() {
                console::warn("No access token configured; requests will be unauthenticated");
            }

            let service: Arc<dyn ClassroomService> = Arc::new(
                ClassroomHttpClient::new(&config.classroom)?
                    .with_concurrency(config.invoker.max_concurrent),
            );
            let sink: Arc<dyn ErrorSink> = if selection.show_tasks_only() {
                Arc::new(NullErrorSink)
            } else {
                Arc::new(FileErrorLog::new(&config.sync.error_log_path))
            };

            let summary = pipeline::run_sync(&config, &roster, service, sink, &selection).await?;

            let mut items: Vec<(&str, String)> = vec![
                ("Desired courses", summary.desired_courses.to_string()),
                ("Remote courses", summary.remote_courses.to_string()),
            ];
            for outcome in &summary.outcomes {
                let value = match &outcome.report {
                    Some(report) if report.retry_exhausted() => format!(
                        "{} generated, {} failed after {} passes",
                        outcome.generated,
                        report.failures.len(),
                        report.passes
                    ),
                    Some(report) => format!(
                        "{} generated, {} failed",
                        outcome.generated,
                        report.failures.len()
                    ),
                    None => format!("{} generated", outcome.generated),
                };
                items.push((outcome.kind.title(), value));
            }
            console::summary(
                if summary.dry_run {
                    "Sync (dry run)"
                } else {
                    "Sync"
                },
                &items,
            );

            if summary.total_failures() > 0 {
                console::warn(&format!(
                    "{} tasks failed; see {}",
                    summary.total_failures(),
                    config.sync.error_log_path.display()
                ));
            }
        }

        Command::Validate => {
            log::info!("Validating roster...");

            let projection = Projector::from_config(&config.sync).project(&roster)?;
            console::summary(
                "Validation",
                &[
                    ("Academic year", config.sync.academic_year.to_string()),
                    ("Class admin", config.sync.class_admin.clone()),
                    ("Subjects", roster.subjects.len().to_string()),
                    ("Classes", roster.class_count().to_string()),
                    ("Courses", projection.course_count().to_string()),
                ],
            );

            log::info!("All validations passed!");
        }
    }

    log::info!("Done!");

    Ok(())
}
