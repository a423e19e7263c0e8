use crate::{
    analysis::{BasicStats, ExerciseStats, SessionSummary},
    models::{ExerciseOrigin, WorkoutSession},
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// One logged set flattened with its session and exercise context.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SetRow {
    pub session_id: String,
    pub date: NaiveDate,
    pub exercise: String,
    pub exercise_order: u32,
    pub origin: ExerciseOrigin,
    pub set_index: u32,
    pub reps: u32,
    pub weight: f64,
    pub volume: f64,
    pub is_extra: bool,
    pub is_pr: bool,
    pub completed_at: DateTime<Utc>,
}

/// Flatten sessions into set rows ordered by session, exercise and set.
pub fn set_rows(sessions: &[WorkoutSession]) -> Vec<SetRow> {
    let mut rows = Vec::new();
    for session in sessions {
        for slot in &session.exercises {
            let mut sets: Vec<_> = slot.sets.iter().collect();
            sets.sort_by_key(|s| s.set_index);
            for set in sets {
                rows.push(SetRow {
                    session_id: session.id.to_string(),
                    date: session.date,
                    exercise: slot.name.clone(),
                    exercise_order: slot.order_index,
                    origin: slot.origin,
                    set_index: set.set_index,
                    reps: set.reps,
                    weight: set.weight,
                    volume: set.volume(),
                    is_extra: set.is_extra,
                    is_pr: set.is_pr,
                    completed_at: set.completed_at,
                });
            }
        }
    }
    rows
}

pub fn write_json<T: Serialize + ?Sized, P: AsRef<Path>>(
    value: &T,
    path: P,
) -> std::io::Result<()> {
    let file = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(file, value).map_err(std::io::Error::other)
}

pub fn write_csv<T: Serialize>(writer: impl Write, records: &[T]) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for r in records {
        wtr.serialize(r)?;
    }
    wtr.flush().map_err(Into::into)
}

pub fn save_sessions_csv<P: AsRef<Path>>(path: P, sessions: &[WorkoutSession]) -> csv::Result<()> {
    write_csv(std::fs::File::create(path)?, &set_rows(sessions))
}

pub fn save_sessions_json<P: AsRef<Path>>(
    path: P,
    sessions: &[WorkoutSession],
) -> std::io::Result<()> {
    write_json(sessions, path)
}

pub fn save_summary_json<P: AsRef<Path>>(path: P, summary: &SessionSummary) -> std::io::Result<()> {
    write_json(summary, path)
}

pub fn save_exercise_stats_csv<P: AsRef<Path>>(
    path: P,
    stats: &[(String, ExerciseStats)],
) -> csv::Result<()> {
    #[derive(Serialize)]
    struct Row<'a> {
        exercise: &'a str,
        #[serde(flatten)]
        stats: &'a ExerciseStats,
    }
    let rows: Vec<Row> = stats
        .iter()
        .map(|(ex, s)| Row {
            exercise: ex,
            stats: s,
        })
        .collect();
    write_csv(std::fs::File::create(path)?, &rows)
}

#[derive(Serialize)]
pub struct StatsExport<'a> {
    pub summary: &'a BasicStats,
    pub exercises: &'a [(String, ExerciseStats)],
}

pub fn save_stats_json<P: AsRef<Path>>(
    path: P,
    summary: &BasicStats,
    exercises: &[(String, ExerciseStats)],
) -> std::io::Result<()> {
    let export = StatsExport { summary, exercises };
    write_json(&export, path)
}
