use uuid::Uuid;

/// Errors raised by a [`crate::store::Store`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("record not found: {0}")]
    NotFound(Uuid),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Problems found while validating a template before it is stored.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TemplateError {
    #[error("template name is empty")]
    EmptyName,

    #[error("exercise order index {0} is used more than once")]
    DuplicateOrderIndex(u32),

    #[error("exercise '{0}' must plan at least one set")]
    NoPlannedSets(String),

    #[error("exercise '{name}' has rep range {min}..{max} with min above max")]
    InvalidRepRange { name: String, min: u32, max: u32 },
}

/// Rejections and failures reported by the live workout state machine.
#[derive(Debug, thiserror::Error)]
pub enum WorkoutError {
    /// Reps or weight did not parse as a positive number. Nothing changed.
    #[error("invalid set input: reps '{reps}', weight '{weight}'")]
    InvalidInput { reps: String, weight: String },

    #[error("session {0} is already finished")]
    SessionFinalized(Uuid),

    #[error("cannot swap '{name}': {sets} set(s) already logged")]
    SetsAlreadyLogged { name: String, sets: usize },

    /// The save failed and the in-memory change was rolled back.
    #[error("failed to persist session: {0}")]
    Persistence(#[from] StoreError),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
pub type Result<T> = std::result::Result<T, WorkoutError>;
