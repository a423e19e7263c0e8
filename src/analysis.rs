// Module for analyzing workout sessions
use crate::models::{ExerciseOrigin, SessionMood, WorkoutSession, WorkoutSet};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Estimated time under load for one logged set.
pub const ESTIMATED_SECONDS_PER_SET: i64 = 40;

/// The heaviest set of a session measured by reps × weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestSet {
    pub exercise_name: String,
    pub set_index: u32,
    pub reps: u32,
    pub weight: f64,
    pub completed_at: DateTime<Utc>,
}

impl BestSet {
    pub fn volume(&self) -> f64 {
        self.reps as f64 * self.weight
    }
}

/// Sets and volume of one slot, used for the summary breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseVolume {
    pub name: String,
    pub order_index: u32,
    pub origin: ExerciseOrigin,
    pub sets: usize,
    pub volume: f64,
}

/// Everything shown once a session is finished.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub duration_minutes: Option<i64>,
    pub estimated_work_seconds: i64,
    pub total_weight_lifted: f64,
    pub total_sets: usize,
    pub best_set: Option<BestSet>,
    pub breakdown: Vec<ExerciseVolume>,
    pub notes: Vec<(String, String)>,
    pub has_changes: bool,
    pub mood: Option<SessionMood>,
}

/// Summary statistics across many finished sessions.
#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BasicStats {
    pub total_workouts: usize,
    pub avg_sets_per_workout: f32,
    pub avg_days_between: f32,
    pub most_common_exercise: Option<String>,
}

/// Aggregated statistics for a single exercise name.
#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExerciseStats {
    pub total_sets: usize,
    pub total_reps: u32,
    pub total_volume: f64,
    pub best_weight: Option<f64>,
    pub best_set_volume: Option<f64>,
}

/// How a session compares with the previous one from the same template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionComparison {
    pub previous_session_id: uuid::Uuid,
    pub previous_weight_lifted: f64,
    pub previous_sets: usize,
    pub weight_delta: f64,
    pub sets_delta: i64,
}

pub fn exercise_volume(sets: &[WorkoutSet]) -> f64 {
    sets.iter().map(WorkoutSet::volume).sum()
}

/// Sum of reps × weight over every set of the session, without rounding.
pub fn total_weight_lifted(session: &WorkoutSession) -> f64 {
    session.exercises.iter().map(|s| exercise_volume(&s.sets)).sum()
}

pub fn total_sets(session: &WorkoutSession) -> usize {
    session.exercises.iter().map(|s| s.sets.len()).sum()
}

/// Find the set with the largest reps × weight.
///
/// Ties go to the set completed first. The owning exercise name is reported
/// with the set.
pub fn best_set(session: &WorkoutSession) -> Option<BestSet> {
    let mut best: Option<(&str, &WorkoutSet)> = None;
    for slot in &session.exercises {
        for set in &slot.sets {
            let replace = match best {
                None => true,
                Some((_, current)) => {
                    set.volume() > current.volume()
                        || (set.volume() == current.volume()
                            && set.completed_at < current.completed_at)
                }
            };
            if replace {
                best = Some((slot.name.as_str(), set));
            }
        }
    }
    best.map(|(name, set)| BestSet {
        exercise_name: name.to_string(),
        set_index: set.set_index,
        reps: set.reps,
        weight: set.weight,
        completed_at: set.completed_at,
    })
}

/// Whole minutes between start and end, truncated. `None` until finalized.
pub fn duration_minutes(session: &WorkoutSession) -> Option<i64> {
    session
        .end_time
        .map(|end| (end - session.start_time).num_seconds() / 60)
}

/// True when at least one slot was squeezed in or swapped in.
pub fn has_changes(session: &WorkoutSession) -> bool {
    session
        .exercises
        .iter()
        .any(|s| s.origin != ExerciseOrigin::FromTemplate)
}

pub fn estimated_work_seconds(session: &WorkoutSession) -> i64 {
    total_sets(session) as i64 * ESTIMATED_SECONDS_PER_SET
}

/// Session duration not spent under load, floored at zero.
pub fn estimated_rest_seconds(session: &WorkoutSession) -> i64 {
    match session.end_time {
        Some(end) => {
            let elapsed = (end - session.start_time).num_seconds();
            (elapsed - estimated_work_seconds(session)).max(0)
        }
        None => 0,
    }
}

/// Overwrite the four derived totals from the sets they summarize.
pub fn recompute_totals(session: &mut WorkoutSession) {
    session.total_sets = total_sets(session);
    session.total_weight_lifted = total_weight_lifted(session);
    session.total_work_seconds = estimated_work_seconds(session);
    session.total_rest_seconds = estimated_rest_seconds(session);
}

pub fn volume_breakdown(session: &WorkoutSession) -> Vec<ExerciseVolume> {
    session
        .exercises
        .iter()
        .map(|s| ExerciseVolume {
            name: s.name.clone(),
            order_index: s.order_index,
            origin: s.origin,
            sets: s.sets.len(),
            volume: exercise_volume(&s.sets),
        })
        .collect()
}

pub fn summarize(session: &WorkoutSession) -> SessionSummary {
    let notes = session
        .exercises
        .iter()
        .filter_map(|s| match s.notes.as_deref() {
            Some(note) if !note.trim().is_empty() => Some((s.name.clone(), note.to_string())),
            _ => None,
        })
        .collect();
    SessionSummary {
        duration_minutes: duration_minutes(session),
        estimated_work_seconds: estimated_work_seconds(session),
        total_weight_lifted: total_weight_lifted(session),
        total_sets: total_sets(session),
        best_set: best_set(session),
        breakdown: volume_breakdown(session),
        notes,
        has_changes: has_changes(session),
        mood: session.mood,
    }
}

pub fn compare_sessions(current: &WorkoutSession, previous: &WorkoutSession) -> SessionComparison {
    let current_weight = total_weight_lifted(current);
    let previous_weight = total_weight_lifted(previous);
    let current_sets = total_sets(current);
    let previous_sets = total_sets(previous);
    SessionComparison {
        previous_session_id: previous.id,
        previous_weight_lifted: previous_weight,
        previous_sets,
        weight_delta: current_weight - previous_weight,
        sets_delta: current_sets as i64 - previous_sets as i64,
    }
}

/// Aggregate per-exercise statistics over finished sessions.
///
/// Sessions still in progress are skipped. Slots are grouped by name, so a
/// renamed template exercise starts a new series.
pub fn aggregate_exercise_stats(sessions: &[WorkoutSession]) -> HashMap<String, ExerciseStats> {
    let mut map: HashMap<String, ExerciseStats> = HashMap::new();

    for session in sessions.iter().filter(|s| s.is_finalized()) {
        for slot in &session.exercises {
            let stats = map.entry(slot.name.clone()).or_default();
            for set in &slot.sets {
                stats.total_sets += 1;
                stats.total_reps += set.reps;
                stats.total_volume += set.volume();
                stats.best_weight = match stats.best_weight {
                    Some(w) if w >= set.weight => Some(w),
                    _ => Some(set.weight),
                };
                stats.best_set_volume = match stats.best_set_volume {
                    Some(v) if v >= set.volume() => Some(v),
                    _ => Some(set.volume()),
                };
            }
        }
    }

    map
}

/// Compute overall statistics for finished sessions.
///
/// Only sessions dated within the optional `start` and `end` range count.
pub fn compute_stats(
    sessions: &[WorkoutSession],
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> BasicStats {
    let in_range: Vec<&WorkoutSession> = sessions
        .iter()
        .filter(|s| s.is_finalized())
        .filter(|s| start.is_none_or(|d| s.date >= d) && end.is_none_or(|d| s.date <= d))
        .collect();

    if in_range.is_empty() {
        return BasicStats::default();
    }

    log::info!("Computing statistics for {} sessions", in_range.len());

    let total_workouts = in_range.len();
    let sets: usize = in_range.iter().map(|s| total_sets(s)).sum();
    let avg_sets_per_workout = sets as f32 / total_workouts as f32;

    let mut dates: Vec<NaiveDate> = in_range.iter().map(|s| s.date).collect();
    dates.sort();
    dates.dedup();
    let total_gap_days: i64 = dates.windows(2).map(|w| (w[1] - w[0]).num_days()).sum();
    let avg_days_between = if dates.len() > 1 {
        total_gap_days as f32 / (dates.len() as f32 - 1.0)
    } else {
        0.0
    };

    let mut exercise_counts: HashMap<&str, usize> = HashMap::new();
    for slot in in_range.iter().flat_map(|s| s.exercises.iter()) {
        *exercise_counts.entry(slot.name.as_str()).or_insert(0) += slot.sets.len();
    }
    let most_common_exercise = exercise_counts
        .into_iter()
        .filter(|(_, c)| *c > 0)
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
        .map(|(ex, _)| ex.to_string());

    BasicStats {
        total_workouts,
        avg_sets_per_workout,
        avg_days_between,
        most_common_exercise,
    }
}
