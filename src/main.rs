//! Command line view over the local workout log.

use clap::{Parser, Subcommand};
use log::info;
use minimal_workout_log::{
    JsonFileStore, SessionQuery, Store, TemplateQuery, WorkoutSession, analysis, export, history, report,
    settings::UserSettings, store::SessionSort,
};
use std::error::Error;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "mwl", about = "Minimal workout log - review and export finished workouts")]
struct Cli {
    /// Defaults to `history`
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List finished workouts with their summaries, newest first
    History,

    /// List templates and their planned exercises
    Templates,

    /// Show totals across finished workouts and per exercise
    Stats,

    /// Export every logged set of finished workouts as CSV
    ExportCsv {
        /// Destination file
        path: PathBuf,
    },

    /// Export finished workouts as JSON
    ExportJson {
        /// Destination file
        path: PathBuf,
    },

    /// Write an HTML summary of one session
    Report {
        /// Id of the session to summarize
        session_id: Uuid,
        /// Destination file
        path: PathBuf,
    },
}

fn finished_sessions(store: &JsonFileStore) -> Result<Vec<WorkoutSession>, Box<dyn Error>> {
    let query = SessionQuery {
        finalized_only: true,
        sort: SessionSort::DateDescending,
        ..SessionQuery::default()
    };
    Ok(store.sessions(&query)?)
}

fn print_history(store: &JsonFileStore, settings: &UserSettings) -> Result<(), Box<dyn Error>> {
    let sessions = finished_sessions(store)?;
    if sessions.is_empty() {
        println!("No finished workouts yet");
    }
    for session in &sessions {
        let name = match session.template_id {
            Some(id) => store.template(id)?.map(|t| t.name),
            None => None,
        };
        println!("{} {}", session.date, name.as_deref().unwrap_or("Workout"));
        for line in report::summary_lines(&analysis::summarize(session), settings.weight_unit) {
            println!("  {line}");
        }
    }
    Ok(())
}

fn print_templates(store: &JsonFileStore) -> Result<(), Box<dyn Error>> {
    for template in store.templates(&TemplateQuery::default())? {
        println!("{} ({})", template.name, template.id);
        for exercise in template.sorted_exercises() {
            let reps = exercise
                .rep_range_label()
                .map(|r| format!(" x {r}"))
                .unwrap_or_default();
            println!("  {} sets{} {}", exercise.planned_sets, reps, exercise.name);
        }
    }
    Ok(())
}

fn print_stats(store: &JsonFileStore) -> Result<(), Box<dyn Error>> {
    let sessions = finished_sessions(store)?;
    let stats = analysis::compute_stats(&sessions, None, None);
    println!("Total workouts: {}", stats.total_workouts);
    println!("Avg sets/workout: {:.1}", stats.avg_sets_per_workout);
    println!("Avg days between: {:.1}", stats.avg_days_between);
    if let Some(ex) = &stats.most_common_exercise {
        println!("Most common exercise: {ex}");
    }
    let mut per_exercise: Vec<_> = analysis::aggregate_exercise_stats(&sessions).into_iter().collect();
    per_exercise.sort_by(|a, b| a.0.cmp(&b.0));
    for (name, s) in per_exercise {
        println!(
            "  {name}: {} sets, {} reps, {:.0} volume",
            s.total_sets, s.total_reps, s.total_volume
        );
    }
    Ok(())
}

fn write_report(
    store: &JsonFileStore,
    settings: &UserSettings,
    id: Uuid,
    path: &Path,
) -> Result<(), Box<dyn Error>> {
    let session = store
        .session(id)?
        .ok_or_else(|| format!("no session with id {id}"))?;
    let template = match session.template_id {
        Some(template_id) => store.template(template_id)?,
        None => None,
    };
    let comparison = match &template {
        Some(t) => history::most_recent_session(store, t.id, Some(session.id))?
            .map(|previous| analysis::compare_sessions(&session, &previous)),
        None => None,
    };
    let title = template.as_ref().map_or("Workout", |t| t.name.as_str());
    report::export_html_summary(
        path,
        title,
        &analysis::summarize(&session),
        comparison.as_ref(),
        settings.weight_unit,
    )?;
    info!("Wrote report for session {id} to {}", path.display());
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let cli = Cli::parse();
    let settings = UserSettings::load();
    let store = JsonFileStore::open_default()?;
    info!("Using data file {}", store.path().display());

    match cli.command.unwrap_or(Commands::History) {
        Commands::History => print_history(&store, &settings)?,
        Commands::Templates => print_templates(&store)?,
        Commands::Stats => print_stats(&store)?,
        Commands::ExportCsv { path } => export::save_sessions_csv(&path, &finished_sessions(&store)?)?,
        Commands::ExportJson { path } => export::save_sessions_json(&path, &finished_sessions(&store)?)?,
        Commands::Report { session_id, path } => write_report(&store, &settings, session_id, &path)?,
    }
    Ok(())
}
