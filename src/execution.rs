//! Live workout state machine.
//!
//! A [`WorkoutExecution`] drives one session from a template snapshot: it
//! tracks the cursor, lazily creates exercise slots, logs sets, and handles
//! squeeze-ins, swaps and finalization. Every mutation is saved before the
//! call returns; when the save fails the in-memory state is rolled back and
//! the failure is returned to the caller.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::analysis::{self, SessionComparison, SessionSummary};
use crate::error::{Result, StoreResult, WorkoutError};
use crate::history;
use crate::models::{
    ExerciseOrigin, ExerciseSession, SessionMood, TemplateExercise, WorkoutSession,
    WorkoutSet, WorkoutTemplate,
};
use crate::store::Store;

pub const CUSTOM_SLOT_NAME: &str = "Custom";
pub const SWAPPED_SLOT_NAME: &str = "Swapped";
const FINISH_LABEL: &str = "Finish";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created but never saved.
    NotStarted,
    InProgress,
    Finalized,
}

/// What occupies one position of the session's plan.
#[derive(Debug, Clone, PartialEq)]
enum PlanEntry {
    Template(TemplateExercise),
    AdHoc,
}

/// Raw text the user typed for the next set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetInput {
    pub reps: String,
    pub weight: String,
}

impl SetInput {
    pub fn new(reps: impl Into<String>, weight: impl Into<String>) -> Self {
        Self {
            reps: reps.into(),
            weight: weight.into(),
        }
    }

    /// Reps must be a positive integer and weight a positive finite number.
    fn parse(&self) -> Option<(u32, f64)> {
        let reps = self.reps.trim().parse::<u32>().ok().filter(|r| *r > 0)?;
        let weight = self
            .weight
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|w| w.is_finite() && *w > 0.0)?;
        Some((reps, weight))
    }

    fn clear(&mut self) {
        self.reps.clear();
        self.weight.clear();
    }
}

/// Result of [`WorkoutExecution::advance`].
#[derive(Debug, Clone, PartialEq)]
pub enum Advance {
    Moved { cursor: u32 },
    Finished(SessionSummary),
}

#[derive(Debug, Clone)]
struct Checkpoint {
    plan: Vec<PlanEntry>,
    session: WorkoutSession,
    cursor: u32,
    input: SetInput,
    persisted: bool,
}

#[derive(Debug, Clone)]
pub struct WorkoutExecution {
    template: WorkoutTemplate,
    plan: Vec<PlanEntry>,
    session: WorkoutSession,
    cursor: u32,
    input: SetInput,
    persisted: bool,
}

impl WorkoutExecution {
    pub fn start(template: &WorkoutTemplate) -> Self {
        Self::start_at(template, Utc::now())
    }

    /// Begin a session from a snapshot of `template`. Nothing is saved yet.
    pub fn start_at(template: &WorkoutTemplate, at: DateTime<Utc>) -> Self {
        let session = WorkoutSession::start(Some(template.id), at);
        log::info!("Starting session {} from template '{}'", session.id, template.name);
        Self {
            template: template.clone(),
            plan: plan_for(template),
            session,
            cursor: 0,
            input: SetInput::default(),
            persisted: false,
        }
    }

    /// Pick up a session that was saved earlier, e.g. after the app was
    /// killed mid-workout. The cursor lands on the last slot with sets.
    pub fn resume(template: &WorkoutTemplate, session: WorkoutSession) -> Self {
        let mut plan = plan_for(template);
        for slot in &session.exercises {
            let idx = slot.order_index as usize;
            match slot.origin {
                ExerciseOrigin::SqueezedIn => plan.insert(idx.min(plan.len()), PlanEntry::AdHoc),
                ExerciseOrigin::SwappedIn => {
                    while plan.len() <= idx {
                        plan.push(PlanEntry::AdHoc);
                    }
                    plan[idx] = PlanEntry::AdHoc;
                }
                ExerciseOrigin::FromTemplate => {}
            }
        }
        let cursor = session
            .exercises
            .iter()
            .filter(|s| !s.sets.is_empty())
            .map(|s| s.order_index)
            .max()
            .unwrap_or(0);
        log::info!("Resuming session {} at exercise {}", session.id, cursor);
        Self {
            template: template.clone(),
            plan,
            session,
            cursor,
            input: SetInput::default(),
            persisted: true,
        }
    }

    pub fn state(&self) -> SessionState {
        if self.session.is_finalized() {
            SessionState::Finalized
        } else if self.persisted {
            SessionState::InProgress
        } else {
            SessionState::NotStarted
        }
    }

    pub fn session(&self) -> &WorkoutSession {
        &self.session
    }

    pub fn template(&self) -> &WorkoutTemplate {
        &self.template
    }

    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    /// Number of positions the cursor can visit, squeeze-ins included.
    pub fn position_count(&self) -> usize {
        self.plan.len()
    }

    pub fn input(&self) -> &SetInput {
        &self.input
    }

    pub fn set_input(&mut self, reps: impl Into<String>, weight: impl Into<String>) {
        self.input = SetInput::new(reps, weight);
    }

    /// Save the empty session so it shows up as in progress.
    pub fn begin<S: Store + ?Sized>(&mut self, store: &mut S) -> Result<()> {
        self.ensure_open()?;
        let checkpoint = self.checkpoint();
        self.persist(store, checkpoint)
    }

    /// The slot under the cursor, created on first access.
    ///
    /// A position planned from the template binds to that template
    /// exercise. Anything else becomes an ad hoc "Custom" slot. Repeated
    /// calls return the same slot. A finished session only hands out slots
    /// it already has and fails with [`WorkoutError::SessionFinalized`]
    /// otherwise.
    pub fn current_slot(&mut self) -> Result<&ExerciseSession> {
        let idx = match self.position_of(self.cursor) {
            Some(pos) => pos,
            None => {
                self.ensure_open()?;
                self.materialize()
            }
        };
        Ok(&self.session.exercises.as_slice()[idx])
    }

    /// Planned set count of the current position, `None` for ad hoc slots.
    pub fn planned_sets(&self) -> Option<u32> {
        match self.session.exercises.slot_at(self.cursor) {
            Some(slot) => slot
                .template_exercise_id
                .and_then(|id| self.template.exercise(id))
                .map(|e| e.planned_sets),
            None => match self.plan.get(self.cursor as usize) {
                Some(PlanEntry::Template(e)) => Some(e.planned_sets),
                _ => None,
            },
        }
    }

    /// Name shown for the current position without creating its slot.
    pub fn current_name(&self) -> String {
        self.name_at(self.cursor)
            .unwrap_or_else(|| CUSTOM_SLOT_NAME.to_string())
    }

    /// Header such as `Bench — Set 2 of 3`. Ad hoc slots count up without
    /// a target.
    pub fn header_label(&self) -> String {
        let logged = self
            .session
            .exercises
            .slot_at(self.cursor)
            .map_or(0, |s| s.sets.len() as u32);
        let next = logged + 1;
        let planned = self.planned_sets().unwrap_or(next);
        format!("{} — Set {} of {}", self.current_name(), next, planned)
    }

    /// Name of the position after the cursor, or "Finish" at the end.
    pub fn next_exercise_name(&self) -> String {
        if (self.cursor as usize + 1) < self.plan.len() {
            self.name_at(self.cursor + 1)
                .unwrap_or_else(|| CUSTOM_SLOT_NAME.to_string())
        } else {
            FINISH_LABEL.to_string()
        }
    }

    /// Sets logged for the current exercise the last time this template
    /// was used. Empty when there is no earlier session.
    pub fn previous_sets<S: Store + ?Sized>(&self, store: &S) -> StoreResult<Vec<WorkoutSet>> {
        match self.session.template_id {
            Some(template_id) => history::previous_sets(
                store,
                template_id,
                &self.current_name(),
                Some(self.session.id),
            ),
            None => Ok(Vec::new()),
        }
    }

    pub fn compare_with_previous<S: Store + ?Sized>(
        &self,
        store: &S,
    ) -> StoreResult<Option<SessionComparison>> {
        let Some(template_id) = self.session.template_id else {
            return Ok(None);
        };
        Ok(
            history::most_recent_session(store, template_id, Some(self.session.id))?
                .map(|previous| analysis::compare_sessions(&self.session, &previous)),
        )
    }

    /// Log a set from the current input buffers, timestamped now.
    pub fn log_set<S: Store + ?Sized>(&mut self, store: &mut S) -> Result<WorkoutSet> {
        self.log_set_at(store, Utc::now())
    }

    /// Log a set from the input buffers against the current slot.
    ///
    /// Unparseable or non-positive input is rejected with
    /// [`WorkoutError::InvalidInput`] and leaves everything untouched. On
    /// success the set gets the next index, is flagged extra past the
    /// planned count (always for ad hoc slots) and flagged as a PR when it
    /// beats every finished session's best for the same exercise name. The
    /// input buffers are cleared.
    pub fn log_set_at<S: Store + ?Sized>(
        &mut self,
        store: &mut S,
        at: DateTime<Utc>,
    ) -> Result<WorkoutSet> {
        self.ensure_open()?;
        let Some((reps, weight)) = self.input.parse() else {
            return Err(WorkoutError::InvalidInput {
                reps: self.input.reps.clone(),
                weight: self.input.weight.clone(),
            });
        };

        let checkpoint = self.checkpoint();
        let planned = self.planned_sets();
        let exercise_name = self.current_name();
        let record = match history::best_volume_for_exercise(&*store, &exercise_name, Some(self.session.id)) {
            Ok(best) => best,
            Err(e) => {
                log::warn!("Skipping PR check for '{exercise_name}': {e}");
                None
            }
        };

        let pos = self.materialize();
        let slot = &mut self.session.exercises.slots_mut()[pos];
        let set_index = slot.next_set_index();
        let volume = reps as f64 * weight;
        let set = WorkoutSet {
            id: Uuid::new_v4(),
            exercise_session_id: slot.id,
            set_index,
            reps,
            weight,
            completed_at: at,
            is_extra: planned.is_none_or(|p| set_index > p),
            is_pr: record.is_some_and(|best| volume > best),
        };
        slot.sets.push(set.clone());
        self.input.clear();
        log::debug!(
            "Logged set {} of '{}': {} x {} (extra: {}, pr: {})",
            set.set_index,
            exercise_name,
            reps,
            weight,
            set.is_extra,
            set.is_pr
        );

        self.persist(store, checkpoint)?;
        Ok(set)
    }

    pub fn advance<S: Store + ?Sized>(&mut self, store: &mut S) -> Result<Advance> {
        self.advance_at(store, Utc::now())
    }

    /// Move to the next position, or finalize when the cursor is on the
    /// last one.
    pub fn advance_at<S: Store + ?Sized>(
        &mut self,
        store: &mut S,
        at: DateTime<Utc>,
    ) -> Result<Advance> {
        self.ensure_open()?;
        if (self.cursor as usize + 1) < self.plan.len() {
            self.cursor += 1;
            Ok(Advance::Moved {
                cursor: self.cursor,
            })
        } else {
            self.finalize_at(store, at).map(Advance::Finished)
        }
    }

    /// Insert an ad hoc slot right after the cursor without moving it.
    pub fn squeeze_in<S: Store + ?Sized>(
        &mut self,
        store: &mut S,
        name: Option<&str>,
    ) -> Result<&ExerciseSession> {
        self.ensure_open()?;
        let checkpoint = self.checkpoint();
        self.cover_cursor();

        let at = self.cursor + 1;
        let slot = ExerciseSession::ad_hoc(
            self.session.id,
            name.unwrap_or(CUSTOM_SLOT_NAME),
            at,
            ExerciseOrigin::SqueezedIn,
        );
        let pos = self.session.exercises.append(slot, at);
        let plan_pos = (at as usize).min(self.plan.len());
        self.plan.insert(plan_pos, PlanEntry::AdHoc);
        log::debug!("Squeezed in exercise at position {at}");

        self.persist(store, checkpoint)?;
        Ok(&self.session.exercises.as_slice()[pos])
    }

    /// Replace the current slot with a fresh ad hoc one.
    ///
    /// Rejected with [`WorkoutError::SetsAlreadyLogged`] once the current
    /// slot has sets, so a swap never throws logged work away.
    pub fn swap<S: Store + ?Sized>(
        &mut self,
        store: &mut S,
        name: Option<&str>,
    ) -> Result<&ExerciseSession> {
        self.ensure_open()?;
        if let Some(slot) = self.session.exercises.slot_at(self.cursor) {
            if !slot.sets.is_empty() {
                return Err(WorkoutError::SetsAlreadyLogged {
                    name: slot.name.clone(),
                    sets: slot.sets.len(),
                });
            }
        }
        let checkpoint = self.checkpoint();
        self.cover_cursor();

        let slot = ExerciseSession::ad_hoc(
            self.session.id,
            name.unwrap_or(SWAPPED_SLOT_NAME),
            self.cursor,
            ExerciseOrigin::SwappedIn,
        );
        let pos = self.insert_at_cursor(slot);
        self.plan[self.cursor as usize] = PlanEntry::AdHoc;
        log::debug!("Swapped exercise at position {}", self.cursor);

        self.persist(store, checkpoint)?;
        Ok(&self.session.exercises.as_slice()[pos])
    }

    /// Attach free-text notes to the current slot.
    pub fn set_notes<S: Store + ?Sized>(
        &mut self,
        store: &mut S,
        notes: Option<String>,
    ) -> Result<()> {
        self.ensure_open()?;
        let checkpoint = self.checkpoint();
        let pos = self.materialize();
        self.session.exercises.slots_mut()[pos].notes = notes.filter(|n| !n.trim().is_empty());
        self.persist(store, checkpoint)
    }

    /// Mood stays editable after the session is finished.
    pub fn set_mood<S: Store + ?Sized>(
        &mut self,
        store: &mut S,
        mood: Option<SessionMood>,
    ) -> Result<()> {
        let checkpoint = self.checkpoint();
        self.session.mood = mood;
        self.persist(store, checkpoint)
    }

    pub fn set_notes_summary<S: Store + ?Sized>(
        &mut self,
        store: &mut S,
        notes: Option<String>,
    ) -> Result<()> {
        let checkpoint = self.checkpoint();
        self.session.notes_summary = notes.filter(|n| !n.trim().is_empty());
        self.persist(store, checkpoint)
    }

    pub fn finalize<S: Store + ?Sized>(&mut self, store: &mut S) -> Result<SessionSummary> {
        self.finalize_at(store, Utc::now())
    }

    /// Finish the session: stamp the end time, recompute the totals from the
    /// logged sets and save. Works from any cursor position.
    pub fn finalize_at<S: Store + ?Sized>(
        &mut self,
        store: &mut S,
        at: DateTime<Utc>,
    ) -> Result<SessionSummary> {
        self.ensure_open()?;
        let checkpoint = self.checkpoint();
        self.session.end_time = Some(at.max(self.session.start_time));
        analysis::recompute_totals(&mut self.session);
        self.persist(store, checkpoint)?;
        log::info!(
            "Finished session {}: {} sets, {} total weight",
            self.session.id,
            self.session.total_sets,
            self.session.total_weight_lifted
        );
        Ok(analysis::summarize(&self.session))
    }

    fn ensure_open(&self) -> Result<()> {
        if self.session.is_finalized() {
            Err(WorkoutError::SessionFinalized(self.session.id))
        } else {
            Ok(())
        }
    }

    /// Make sure the plan has an entry for the cursor position.
    fn cover_cursor(&mut self) {
        while self.plan.len() <= self.cursor as usize {
            self.plan.push(PlanEntry::AdHoc);
        }
    }

    /// Create the slot under the cursor if needed; returns its storage
    /// position in the timeline.
    fn materialize(&mut self) -> usize {
        if let Some(pos) = self.position_of(self.cursor) {
            return pos;
        }
        self.cover_cursor();
        let slot = match &self.plan[self.cursor as usize] {
            PlanEntry::Template(exercise) => {
                ExerciseSession::from_template(self.session.id, exercise, self.cursor)
            }
            PlanEntry::AdHoc => ExerciseSession::ad_hoc(
                self.session.id,
                CUSTOM_SLOT_NAME,
                self.cursor,
                ExerciseOrigin::SqueezedIn,
            ),
        };
        self.insert_at_cursor(slot)
    }

    /// Put `slot` at the cursor, replacing any slot there; returns its
    /// storage position.
    fn insert_at_cursor(&mut self, slot: ExerciseSession) -> usize {
        let pos = self
            .session
            .exercises
            .as_slice()
            .partition_point(|s| s.order_index < self.cursor);
        self.session.exercises.replace(self.cursor, slot);
        pos
    }

    fn position_of(&self, order_index: u32) -> Option<usize> {
        self.session
            .exercises
            .iter()
            .position(|s| s.order_index == order_index)
    }

    fn name_at(&self, order_index: u32) -> Option<String> {
        if let Some(slot) = self.session.exercises.slot_at(order_index) {
            return Some(slot.name.clone());
        }
        match self.plan.get(order_index as usize) {
            Some(PlanEntry::Template(e)) => Some(e.name.clone()),
            _ => None,
        }
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            plan: self.plan.clone(),
            session: self.session.clone(),
            cursor: self.cursor,
            input: self.input.clone(),
            persisted: self.persisted,
        }
    }

    fn persist<S: Store + ?Sized>(&mut self, store: &mut S, checkpoint: Checkpoint) -> Result<()> {
        let saved = store
            .upsert_session(&self.session)
            .and_then(|_| store.save());
        match saved {
            Ok(()) => {
                self.persisted = true;
                Ok(())
            }
            Err(e) => {
                log::warn!("Save failed for session {}, rolling back: {e}", self.session.id);
                store.discard();
                self.plan = checkpoint.plan;
                self.session = checkpoint.session;
                self.cursor = checkpoint.cursor;
                self.input = checkpoint.input;
                self.persisted = checkpoint.persisted;
                Err(WorkoutError::Persistence(e))
            }
        }
    }
}

fn plan_for(template: &WorkoutTemplate) -> Vec<PlanEntry> {
    template
        .sorted_exercises()
        .into_iter()
        .map(|e| PlanEntry::Template(e.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::store::{JsonFileStore, MemoryStore, SessionQuery, TemplateQuery};
    use chrono::{Duration, TimeZone};

    /// Memory store whose commits can be made to fail.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        fail_saves: bool,
    }

    impl Store for FlakyStore {
        fn insert_template(&mut self, template: WorkoutTemplate) -> StoreResult<()> {
            self.inner.insert_template(template)
        }
        fn update_template(&mut self, template: &WorkoutTemplate) -> StoreResult<()> {
            self.inner.update_template(template)
        }
        fn archive_template(&mut self, id: Uuid) -> StoreResult<()> {
            self.inner.archive_template(id)
        }
        fn delete_template(&mut self, id: Uuid) -> StoreResult<()> {
            self.inner.delete_template(id)
        }
        fn template(&self, id: Uuid) -> StoreResult<Option<WorkoutTemplate>> {
            self.inner.template(id)
        }
        fn templates(&self, query: &TemplateQuery) -> StoreResult<Vec<WorkoutTemplate>> {
            self.inner.templates(query)
        }
        fn upsert_session(&mut self, session: &WorkoutSession) -> StoreResult<()> {
            self.inner.upsert_session(session)
        }
        fn delete_session(&mut self, id: Uuid) -> StoreResult<()> {
            self.inner.delete_session(id)
        }
        fn session(&self, id: Uuid) -> StoreResult<Option<WorkoutSession>> {
            self.inner.session(id)
        }
        fn sessions(&self, query: &SessionQuery) -> StoreResult<Vec<WorkoutSession>> {
            self.inner.sessions(query)
        }
        fn save(&mut self) -> StoreResult<()> {
            if self.fail_saves {
                return Err(StoreError::Unavailable("disk full".into()));
            }
            self.inner.save()
        }
        fn discard(&mut self) {
            self.inner.discard()
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap()
    }

    fn two_exercise_template() -> WorkoutTemplate {
        let mut t = WorkoutTemplate::new("Full Body");
        t.add_exercise("Exercise A", 3, Some((8, 10)));
        t.add_exercise("Exercise B", 2, None);
        t
    }

    fn log(
        exec: &mut WorkoutExecution,
        store: &mut impl Store,
        reps: &str,
        weight: &str,
        minute: i64,
    ) -> Result<WorkoutSet> {
        exec.set_input(reps, weight);
        exec.log_set_at(store, t0() + Duration::minutes(minute))
    }

    #[test]
    fn full_session_scenario() {
        let template = two_exercise_template();
        let mut store = MemoryStore::new();
        let mut exec = WorkoutExecution::start_at(&template, t0());
        assert_eq!(exec.state(), SessionState::NotStarted);

        log(&mut exec, &mut store, "10", "50", 1).unwrap();
        log(&mut exec, &mut store, "10", "55", 3).unwrap();
        log(&mut exec, &mut store, "8", "60", 5).unwrap();
        assert_eq!(exec.state(), SessionState::InProgress);
        assert_eq!(exec.advance(&mut store).unwrap(), Advance::Moved { cursor: 1 });
        log(&mut exec, &mut store, "12", "20", 8).unwrap();
        log(&mut exec, &mut store, "12", "20", 10).unwrap();

        let outcome = exec
            .advance_at(&mut store, t0() + Duration::minutes(42))
            .unwrap();
        let Advance::Finished(summary) = outcome else {
            panic!("expected the session to finish");
        };
        assert_eq!(exec.state(), SessionState::Finalized);
        assert_eq!(summary.total_sets, 5);
        assert_eq!(summary.total_weight_lifted, 2010.0);
        assert_eq!(summary.duration_minutes, Some(42));
        let best = summary.best_set.unwrap();
        assert_eq!(best.exercise_name, "Exercise A");
        assert_eq!((best.reps, best.weight), (10, 55.0));
        assert!(!summary.has_changes);

        let stored = store.session(exec.session().id).unwrap().unwrap();
        assert_eq!(stored.total_sets, 5);
        assert_eq!(stored.total_weight_lifted, 2010.0);
        assert_eq!(stored.total_work_seconds, 200);
        assert!(stored.end_time.is_some());
    }

    #[test]
    fn extra_flag_only_past_planned_sets() {
        let template = two_exercise_template();
        let mut store = MemoryStore::new();
        let mut exec = WorkoutExecution::start_at(&template, t0());
        let flags: Vec<(u32, bool)> = (0..4)
            .map(|i| log(&mut exec, &mut store, "5", "100", i).unwrap())
            .map(|s| (s.set_index, s.is_extra))
            .collect();
        assert_eq!(flags, vec![(1, false), (2, false), (3, false), (4, true)]);
    }

    #[test]
    fn ad_hoc_sets_are_always_extra() {
        let template = two_exercise_template();
        let mut store = MemoryStore::new();
        let mut exec = WorkoutExecution::start_at(&template, t0());
        exec.swap(&mut store, Some("Cable Row")).unwrap();
        let set = log(&mut exec, &mut store, "12", "40", 1).unwrap();
        assert_eq!(set.set_index, 1);
        assert!(set.is_extra);
    }

    #[test]
    fn invalid_input_is_a_no_op() {
        let template = two_exercise_template();
        let mut store = MemoryStore::new();
        let mut exec = WorkoutExecution::start_at(&template, t0());
        for (reps, weight) in [("abc", "50"), ("10", ""), ("0", "50"), ("10", "-5"), ("10", "0"), ("2.5", "50")] {
            let err = log(&mut exec, &mut store, reps, weight, 1).unwrap_err();
            assert!(matches!(err, WorkoutError::InvalidInput { .. }));
            assert_eq!(exec.input(), &SetInput::new(reps, weight));
        }
        assert!(exec.session().exercises.sets().next().is_none());
        assert!(store.data().sessions.is_empty());
    }

    #[test]
    fn successful_log_clears_input() {
        let template = two_exercise_template();
        let mut store = MemoryStore::new();
        let mut exec = WorkoutExecution::start_at(&template, t0());
        log(&mut exec, &mut store, " 8 ", "62.5", 1).unwrap();
        assert_eq!(exec.input(), &SetInput::default());
        let set = exec.session().exercises.sets().next().unwrap();
        assert_eq!((set.reps, set.weight), (8, 62.5));
    }

    #[test]
    fn current_slot_is_materialized_once() {
        let template = two_exercise_template();
        let mut exec = WorkoutExecution::start_at(&template, t0());
        let first = exec.current_slot().unwrap().clone();
        let second = exec.current_slot().unwrap().clone();
        assert_eq!(first.id, second.id);
        assert_eq!(first.origin, ExerciseOrigin::FromTemplate);
        assert_eq!(first.template_exercise_id, Some(template.sorted_exercises()[0].id));
        assert_eq!(exec.session().exercises.len(), 1);
    }

    #[test]
    fn empty_template_falls_back_to_custom_slot() {
        let template = WorkoutTemplate::new("Freestyle");
        let mut store = MemoryStore::new();
        let mut exec = WorkoutExecution::start_at(&template, t0());
        let slot = exec.current_slot().unwrap().clone();
        assert_eq!(slot.name, CUSTOM_SLOT_NAME);
        assert!(slot.is_ad_hoc());
        let set = log(&mut exec, &mut store, "10", "20", 1).unwrap();
        assert!(set.is_extra);
        assert!(matches!(exec.advance(&mut store).unwrap(), Advance::Finished(_)));
    }

    #[test]
    fn squeeze_in_goes_next_without_moving_cursor() {
        let template = two_exercise_template();
        let mut store = MemoryStore::new();
        let mut exec = WorkoutExecution::start_at(&template, t0());
        log(&mut exec, &mut store, "10", "50", 1).unwrap();
        let squeezed = exec.squeeze_in(&mut store, None).unwrap().clone();
        assert_eq!(squeezed.origin, ExerciseOrigin::SqueezedIn);
        assert_eq!(squeezed.order_index, 1);
        assert_eq!(exec.cursor(), 0);
        assert_eq!(exec.next_exercise_name(), CUSTOM_SLOT_NAME);
        assert_eq!(exec.position_count(), 3);

        assert_eq!(exec.advance(&mut store).unwrap(), Advance::Moved { cursor: 1 });
        assert_eq!(exec.current_slot().unwrap().id, squeezed.id);
        assert_eq!(exec.next_exercise_name(), "Exercise B");
        assert_eq!(exec.advance(&mut store).unwrap(), Advance::Moved { cursor: 2 });
        assert_eq!(exec.current_slot().unwrap().name, "Exercise B");
        assert_eq!(exec.next_exercise_name(), "Finish");

        let summary = exec.finalize(&mut store).unwrap();
        assert!(summary.has_changes);
    }

    #[test]
    fn squeeze_in_on_empty_timeline_appends() {
        let template = two_exercise_template();
        let mut store = MemoryStore::new();
        let mut exec = WorkoutExecution::start_at(&template, t0());
        assert!(exec.session().exercises.is_empty());
        exec.squeeze_in(&mut store, Some("Face Pull")).unwrap();
        let names: Vec<&str> = exec.session().exercises.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Face Pull"]);
        assert_eq!(exec.current_slot().unwrap().name, "Exercise A");
        let order: Vec<(u32, &str)> = exec
            .session()
            .exercises
            .iter()
            .map(|s| (s.order_index, s.name.as_str()))
            .collect();
        assert_eq!(order, vec![(0, "Exercise A"), (1, "Face Pull")]);
    }

    #[test]
    fn repeated_squeeze_ins_keep_unique_order_indices() {
        let template = two_exercise_template();
        let mut store = MemoryStore::new();
        let mut exec = WorkoutExecution::start_at(&template, t0());
        exec.squeeze_in(&mut store, Some("First")).unwrap();
        exec.squeeze_in(&mut store, Some("Second")).unwrap();
        let order: Vec<(u32, &str)> = exec
            .session()
            .exercises
            .iter()
            .map(|s| (s.order_index, s.name.as_str()))
            .collect();
        assert_eq!(order, vec![(1, "Second"), (2, "First")]);
        assert_eq!(exec.position_count(), 4);
    }

    #[test]
    fn swap_before_sets_replaces_slot() {
        let template = two_exercise_template();
        let mut store = MemoryStore::new();
        let mut exec = WorkoutExecution::start_at(&template, t0());
        exec.current_slot().unwrap();
        let swapped = exec.swap(&mut store, None).unwrap().clone();
        assert_eq!(swapped.name, SWAPPED_SLOT_NAME);
        assert_eq!(swapped.origin, ExerciseOrigin::SwappedIn);
        assert!(swapped.sets.is_empty());
        assert_eq!(exec.session().exercises.len(), 1);
        assert_eq!(exec.planned_sets(), None);
        assert_eq!(exec.header_label(), "Swapped — Set 1 of 1");
    }

    #[test]
    fn swap_after_sets_is_rejected() {
        let template = two_exercise_template();
        let mut store = MemoryStore::new();
        let mut exec = WorkoutExecution::start_at(&template, t0());
        log(&mut exec, &mut store, "10", "50", 1).unwrap();
        let err = exec.swap(&mut store, None).unwrap_err();
        assert!(matches!(err, WorkoutError::SetsAlreadyLogged { sets: 1, .. }));
        let slot = exec.current_slot().unwrap();
        assert_eq!(slot.origin, ExerciseOrigin::FromTemplate);
        assert_eq!(slot.sets.len(), 1);
    }

    #[test]
    fn header_and_preview_labels() {
        let template = two_exercise_template();
        let mut store = MemoryStore::new();
        let mut exec = WorkoutExecution::start_at(&template, t0());
        assert_eq!(exec.header_label(), "Exercise A — Set 1 of 3");
        log(&mut exec, &mut store, "10", "50", 1).unwrap();
        assert_eq!(exec.header_label(), "Exercise A — Set 2 of 3");
        assert_eq!(exec.next_exercise_name(), "Exercise B");
    }

    #[test]
    fn failed_save_rolls_back_logged_set() {
        let template = two_exercise_template();
        let mut store = FlakyStore::default();
        let mut exec = WorkoutExecution::start_at(&template, t0());
        log(&mut exec, &mut store, "10", "50", 1).unwrap();

        store.fail_saves = true;
        let err = log(&mut exec, &mut store, "10", "55", 2).unwrap_err();
        assert!(matches!(err, WorkoutError::Persistence(_)));
        assert_eq!(exec.current_slot().unwrap().sets.len(), 1);
        assert_eq!(exec.input(), &SetInput::new("10", "55"));

        store.fail_saves = false;
        let set = exec.log_set_at(&mut store, t0() + Duration::minutes(3)).unwrap();
        assert_eq!(set.set_index, 2);
        let stored = store.session(exec.session().id).unwrap().unwrap();
        assert_eq!(stored.exercises.sets().count(), 2);
    }

    #[test]
    fn failed_finalize_stays_in_progress() {
        let template = two_exercise_template();
        let mut store = FlakyStore::default();
        let mut exec = WorkoutExecution::start_at(&template, t0());
        log(&mut exec, &mut store, "10", "50", 1).unwrap();
        store.fail_saves = true;
        assert!(matches!(exec.finalize(&mut store), Err(WorkoutError::Persistence(_))));
        assert_eq!(exec.state(), SessionState::InProgress);
        assert!(exec.session().end_time.is_none());
        assert_eq!(exec.session().total_sets, 0);
    }

    #[test]
    fn failed_squeeze_in_restores_plan() {
        let template = two_exercise_template();
        let mut store = FlakyStore {
            fail_saves: true,
            ..FlakyStore::default()
        };
        let mut exec = WorkoutExecution::start_at(&template, t0());
        assert!(exec.squeeze_in(&mut store, None).is_err());
        assert_eq!(exec.position_count(), 2);
        assert!(exec.session().exercises.is_empty());
        assert_eq!(exec.state(), SessionState::NotStarted);
    }

    #[test]
    fn finalized_session_rejects_mutation_but_accepts_mood() {
        let template = two_exercise_template();
        let mut store = MemoryStore::new();
        let mut exec = WorkoutExecution::start_at(&template, t0());
        exec.begin(&mut store).unwrap();
        exec.finalize(&mut store).unwrap();

        exec.set_input("5", "5");
        assert!(matches!(exec.log_set(&mut store), Err(WorkoutError::SessionFinalized(_))));
        assert!(matches!(exec.advance(&mut store), Err(WorkoutError::SessionFinalized(_))));
        assert!(exec.squeeze_in(&mut store, None).is_err());
        assert!(exec.swap(&mut store, None).is_err());
        assert!(exec.finalize(&mut store).is_err());

        exec.set_mood(&mut store, Some(SessionMood::Hard)).unwrap();
        exec.set_notes_summary(&mut store, Some("grip gave out".into())).unwrap();
        let stored = store.session(exec.session().id).unwrap().unwrap();
        assert_eq!(stored.mood, Some(SessionMood::Hard));
        assert_eq!(stored.notes_summary.as_deref(), Some("grip gave out"));
    }

    #[test]
    fn finalized_session_does_not_grow_slots() {
        let template = WorkoutTemplate::new("Freestyle");
        let mut store = MemoryStore::new();
        let mut exec = WorkoutExecution::start_at(&template, t0());
        exec.begin(&mut store).unwrap();
        exec.finalize(&mut store).unwrap();

        assert!(matches!(exec.current_slot(), Err(WorkoutError::SessionFinalized(_))));
        exec.set_mood(&mut store, Some(SessionMood::Good)).unwrap();
        let stored = store.session(exec.session().id).unwrap().unwrap();
        assert!(stored.exercises.is_empty());
        assert!(!analysis::has_changes(&stored));
    }

    #[test]
    fn finalized_session_still_shows_existing_slot() {
        let template = two_exercise_template();
        let mut store = MemoryStore::new();
        let mut exec = WorkoutExecution::start_at(&template, t0());
        log(&mut exec, &mut store, "10", "50", 1).unwrap();
        exec.finalize(&mut store).unwrap();
        let slot = exec.current_slot().unwrap();
        assert_eq!(slot.name, "Exercise A");
        assert_eq!(slot.sets.len(), 1);
    }

    #[test]
    fn failed_file_save_is_not_written_later() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let template = two_exercise_template();
        let mut store = JsonFileStore::open(&path).unwrap();
        let mut exec = WorkoutExecution::start_at(&template, t0());
        log(&mut exec, &mut store, "10", "50", 1).unwrap();

        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("blocker"), "x").unwrap();
        let err = log(&mut exec, &mut store, "10", "55", 2).unwrap_err();
        assert!(matches!(err, WorkoutError::Persistence(_)));

        std::fs::remove_dir_all(&path).unwrap();
        store.insert_template(WorkoutTemplate::new("Other")).unwrap();
        store.save().unwrap();

        let reopened = JsonFileStore::open(&path).unwrap();
        let stored = reopened.session(exec.session().id).unwrap().unwrap();
        assert_eq!(exec.session().exercises.sets().count(), 1);
        assert_eq!(stored.exercises.sets().count(), 1);
    }

    #[test]
    fn early_finalize_from_first_exercise() {
        let template = two_exercise_template();
        let mut store = MemoryStore::new();
        let mut exec = WorkoutExecution::start_at(&template, t0());
        log(&mut exec, &mut store, "10", "50", 1).unwrap();
        let summary = exec
            .finalize_at(&mut store, t0() + Duration::minutes(5))
            .unwrap();
        assert_eq!(summary.total_sets, 1);
        assert_eq!(summary.duration_minutes, Some(5));
    }

    fn finished_session(store: &mut MemoryStore, template: &WorkoutTemplate, day: i64, sets: &[(&str, &str)]) -> WorkoutSession {
        let start = t0() - Duration::days(day);
        let mut exec = WorkoutExecution::start_at(template, start);
        for (reps, weight) in sets {
            exec.set_input(*reps, *weight);
            exec.log_set_at(store, start + Duration::minutes(1)).unwrap();
        }
        exec.finalize_at(store, start + Duration::hours(1)).unwrap();
        exec.session().clone()
    }

    #[test]
    fn pr_flag_requires_beating_history() {
        let template = two_exercise_template();
        let mut store = MemoryStore::new();

        let mut exec = WorkoutExecution::start_at(&template, t0());
        let first = log(&mut exec, &mut store, "10", "100", 1).unwrap();
        assert!(!first.is_pr, "no history means no record to beat");

        finished_session(&mut store, &template, 7, &[("10", "50"), ("10", "55")]);
        let mut exec = WorkoutExecution::start_at(&template, t0());
        assert!(!log(&mut exec, &mut store, "10", "55", 1).unwrap().is_pr);
        assert!(log(&mut exec, &mut store, "10", "56", 2).unwrap().is_pr);
    }

    #[test]
    fn previous_sets_come_from_last_session() {
        let template = two_exercise_template();
        let mut store = MemoryStore::new();
        let mut exec = WorkoutExecution::start_at(&template, t0());
        assert!(exec.previous_sets(&store).unwrap().is_empty());

        finished_session(&mut store, &template, 14, &[("5", "40")]);
        let last = finished_session(&mut store, &template, 7, &[("8", "50"), ("6", "52.5")]);

        exec.begin(&mut store).unwrap();
        let sets = exec.previous_sets(&store).unwrap();
        let shown: Vec<(u32, u32, f64)> = sets.iter().map(|s| (s.set_index, s.reps, s.weight)).collect();
        assert_eq!(shown, vec![(1, 8, 50.0), (2, 6, 52.5)]);

        let cmp = exec.compare_with_previous(&store).unwrap().unwrap();
        assert_eq!(cmp.previous_session_id, last.id);
        assert_eq!(cmp.previous_sets, 2);
    }

    #[test]
    fn resume_rebuilds_plan_and_cursor() {
        let template = two_exercise_template();
        let mut store = MemoryStore::new();
        let mut exec = WorkoutExecution::start_at(&template, t0());
        exec.squeeze_in(&mut store, Some("Plank")).unwrap();
        exec.advance(&mut store).unwrap();
        log(&mut exec, &mut store, "1", "10", 1).unwrap();

        let saved = store.session(exec.session().id).unwrap().unwrap();
        let resumed = WorkoutExecution::resume(&template, saved);
        assert_eq!(resumed.state(), SessionState::InProgress);
        assert_eq!(resumed.cursor(), 1);
        assert_eq!(resumed.position_count(), 3);
        assert_eq!(resumed.current_name(), "Plank");
        assert_eq!(resumed.next_exercise_name(), "Exercise B");
    }

    #[test]
    fn notes_attach_to_current_slot() {
        let template = two_exercise_template();
        let mut store = MemoryStore::new();
        let mut exec = WorkoutExecution::start_at(&template, t0());
        exec.set_notes(&mut store, Some("elbows tucked".into())).unwrap();
        let summary = exec.finalize(&mut store).unwrap();
        assert_eq!(
            summary.notes,
            vec![("Exercise A".to_string(), "elbows tucked".to_string())]
        );
    }
}
