//! Workout session execution and history for a personal workout log.
//!
//! Templates plan exercises, a [`execution::WorkoutExecution`] runs one live
//! session against a template, and the [`analysis`] and [`history`] modules
//! summarize finished sessions and look up earlier ones through a
//! [`store::Store`].

pub mod analysis;
pub mod error;
pub mod execution;
pub mod export;
pub mod history;
pub mod models;
pub mod report;
pub mod settings;
pub mod store;
pub mod timeline;

pub use error::{StoreError, TemplateError, WorkoutError};
pub use execution::{Advance, SessionState, WorkoutExecution};
pub use models::{
    ExerciseOrigin, ExerciseSession, SessionMood, TemplateExercise, WorkoutSession, WorkoutSet,
    WorkoutTemplate,
};
pub use store::{JsonFileStore, MemoryStore, SessionQuery, Store, TemplateQuery};
