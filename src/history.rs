//! "Last time" lookups against earlier sessions.

use uuid::Uuid;

use crate::error::StoreResult;
use crate::models::{WorkoutSession, WorkoutSet};
use crate::store::{SessionQuery, Store};

/// The most recent session started from `template_id`, finished or not.
///
/// `exclude` keeps the caller's own in-progress session out of the result
/// once it has been persisted. No prior session is `Ok(None)`.
pub fn most_recent_session<S: Store + ?Sized>(
    store: &S,
    template_id: Uuid,
    exclude: Option<Uuid>,
) -> StoreResult<Option<WorkoutSession>> {
    let mut query = SessionQuery::for_template(template_id).excluding(exclude);
    query.limit = Some(1);
    Ok(store.sessions(&query)?.into_iter().next())
}

/// Sets logged for `exercise_name` in `session`, ordered by set index.
///
/// Slots are matched by name, so renaming a template exercise breaks the
/// link to older sessions. No match yields an empty list.
pub fn sets_for_exercise(session: &WorkoutSession, exercise_name: &str) -> Vec<WorkoutSet> {
    let mut sets = session
        .exercises
        .iter()
        .find(|s| s.name == exercise_name)
        .map(|s| s.sets.clone())
        .unwrap_or_default();
    sets.sort_by_key(|s| s.set_index);
    sets
}

/// Convenience wrapper: the previous session's sets for one exercise.
pub fn previous_sets<S: Store + ?Sized>(
    store: &S,
    template_id: Uuid,
    exercise_name: &str,
    exclude: Option<Uuid>,
) -> StoreResult<Vec<WorkoutSet>> {
    Ok(most_recent_session(store, template_id, exclude)?
        .map(|s| sets_for_exercise(&s, exercise_name))
        .unwrap_or_default())
}

/// Largest reps × weight ever logged for `exercise_name` in a finished
/// session, or `None` when the exercise has no history.
pub fn best_volume_for_exercise<S: Store + ?Sized>(
    store: &S,
    exercise_name: &str,
    exclude: Option<Uuid>,
) -> StoreResult<Option<f64>> {
    let sessions = store.sessions(&SessionQuery::finalized().excluding(exclude))?;
    Ok(sessions
        .iter()
        .flat_map(|s| s.exercises.iter())
        .filter(|slot| slot.name == exercise_name)
        .flat_map(|slot| slot.sets.iter())
        .map(WorkoutSet::volume)
        .fold(None, |best: Option<f64>, v| Some(best.map_or(v, |b| b.max(v)))))
}
