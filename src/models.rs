//! Records shared by templates, live sessions and history.
//!
//! Ownership is flat: a template owns its exercises, a session owns its
//! slots and a slot owns its sets. Every cross reference (parent, template,
//! template exercise) is a [`Uuid`] looked up by the caller.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::error::TemplateError;
use crate::timeline::ExerciseTimeline;

/// How an exercise slot came to exist within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum ExerciseOrigin {
    #[default]
    FromTemplate,
    SqueezedIn,
    SwappedIn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionMood {
    Good,
    Neutral,
    Hard,
}

pub const ALL_MOODS: [SessionMood; 3] = [SessionMood::Good, SessionMood::Neutral, SessionMood::Hard];

impl SessionMood {
    pub fn label(self) -> &'static str {
        match self {
            SessionMood::Good => "Good",
            SessionMood::Neutral => "Neutral",
            SessionMood::Hard => "Hard",
        }
    }
}

/// A reusable, ordered plan of exercises.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutTemplate {
    pub id: Uuid,
    pub name: String,
    pub exercises: Vec<TemplateExercise>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub is_archived: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateExercise {
    pub id: Uuid,
    pub template_id: Uuid,
    pub name: String,
    pub order_index: u32,
    pub planned_sets: u32,
    pub rep_range_min: Option<u32>,
    pub rep_range_max: Option<u32>,
}

impl WorkoutTemplate {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            exercises: Vec::new(),
            created_at: now,
            updated_at: now,
            is_archived: false,
        }
    }

    /// Append an exercise after the current highest order index.
    pub fn add_exercise(
        &mut self,
        name: impl Into<String>,
        planned_sets: u32,
        rep_range: Option<(u32, u32)>,
    ) -> &TemplateExercise {
        let order_index = self
            .exercises
            .iter()
            .map(|e| e.order_index + 1)
            .max()
            .unwrap_or(0);
        self.exercises.push(TemplateExercise {
            id: Uuid::new_v4(),
            template_id: self.id,
            name: name.into(),
            order_index,
            planned_sets,
            rep_range_min: rep_range.map(|r| r.0),
            rep_range_max: rep_range.map(|r| r.1),
        });
        self.updated_at = Utc::now();
        &self.exercises[self.exercises.len() - 1]
    }

    /// Exercises ordered by their order index, not by storage position.
    pub fn sorted_exercises(&self) -> Vec<&TemplateExercise> {
        let mut sorted: Vec<&TemplateExercise> = self.exercises.iter().collect();
        sorted.sort_by_key(|e| e.order_index);
        sorted
    }

    pub fn exercise(&self, id: Uuid) -> Option<&TemplateExercise> {
        self.exercises.iter().find(|e| e.id == id)
    }

    /// Check the invariants the authoring flow must uphold before saving.
    pub fn validate(&self) -> Result<(), TemplateError> {
        if self.name.trim().is_empty() {
            return Err(TemplateError::EmptyName);
        }
        let mut seen = BTreeSet::new();
        for e in &self.exercises {
            if !seen.insert(e.order_index) {
                return Err(TemplateError::DuplicateOrderIndex(e.order_index));
            }
            if e.planned_sets == 0 {
                return Err(TemplateError::NoPlannedSets(e.name.clone()));
            }
            if let (Some(min), Some(max)) = (e.rep_range_min, e.rep_range_max) {
                if min > max {
                    return Err(TemplateError::InvalidRepRange {
                        name: e.name.clone(),
                        min,
                        max,
                    });
                }
            }
        }
        Ok(())
    }
}

impl TemplateExercise {
    /// Human readable rep target such as `8-12`, `8+` or `up to 12`.
    pub fn rep_range_label(&self) -> Option<String> {
        match (self.rep_range_min, self.rep_range_max) {
            (Some(min), Some(max)) if min == max => Some(min.to_string()),
            (Some(min), Some(max)) => Some(format!("{min}-{max}")),
            (Some(min), None) => Some(format!("{min}+")),
            (None, Some(max)) => Some(format!("up to {max}")),
            (None, None) => None,
        }
    }
}

/// One execution of a template.
///
/// `end_time` doubles as the lifecycle flag: `None` while in progress and
/// set once finalized. The four totals are only meaningful after
/// finalization and are always recomputed from the sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSession {
    pub id: Uuid,
    pub date: NaiveDate,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub template_id: Option<Uuid>,
    pub exercises: ExerciseTimeline,
    #[serde(default)]
    pub total_work_seconds: i64,
    #[serde(default)]
    pub total_rest_seconds: i64,
    #[serde(default)]
    pub total_weight_lifted: f64,
    #[serde(default)]
    pub total_sets: usize,
    pub mood: Option<SessionMood>,
    pub notes_summary: Option<String>,
}

impl WorkoutSession {
    pub fn start(template_id: Option<Uuid>, start_time: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            date: start_time.date_naive(),
            start_time,
            end_time: None,
            template_id,
            exercises: ExerciseTimeline::default(),
            total_work_seconds: 0,
            total_rest_seconds: 0,
            total_weight_lifted: 0.0,
            total_sets: 0,
            mood: None,
            notes_summary: None,
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.end_time.is_some()
    }
}

/// One exercise's occurrence within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseSession {
    pub id: Uuid,
    pub session_id: Uuid,
    pub template_exercise_id: Option<Uuid>,
    pub name: String,
    pub order_index: u32,
    #[serde(default)]
    pub origin: ExerciseOrigin,
    #[serde(default)]
    pub sets: Vec<WorkoutSet>,
    pub notes: Option<String>,
}

impl ExerciseSession {
    /// A slot bound to a template exercise. The name is copied so later
    /// template edits leave history untouched.
    pub fn from_template(session_id: Uuid, exercise: &TemplateExercise, order_index: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            template_exercise_id: Some(exercise.id),
            name: exercise.name.clone(),
            order_index,
            origin: ExerciseOrigin::FromTemplate,
            sets: Vec::new(),
            notes: None,
        }
    }

    pub fn ad_hoc(
        session_id: Uuid,
        name: impl Into<String>,
        order_index: u32,
        origin: ExerciseOrigin,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            template_exercise_id: None,
            name: name.into(),
            order_index,
            origin,
            sets: Vec::new(),
            notes: None,
        }
    }

    pub fn is_ad_hoc(&self) -> bool {
        self.template_exercise_id.is_none()
    }

    /// Index the next logged set will receive.
    pub fn next_set_index(&self) -> u32 {
        self.sets.len() as u32 + 1
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSet {
    pub id: Uuid,
    pub exercise_session_id: Uuid,
    /// 1-based, assigned at log time and never reused.
    pub set_index: u32,
    pub reps: u32,
    pub weight: f64,
    pub completed_at: DateTime<Utc>,
    #[serde(default)]
    pub is_extra: bool,
    #[serde(default)]
    pub is_pr: bool,
}

impl WorkoutSet {
    pub fn volume(&self) -> f64 {
        self.reps as f64 * self.weight
    }
}
