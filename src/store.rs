//! Storage collaborator used by the session state machine and history.
//!
//! Two implementations ship with the crate: [`MemoryStore`] keeps records in
//! process memory and [`JsonFileStore`] persists the same records as a single
//! JSON document, rewritten on every [`Store::save`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use dirs_next as dirs;

use crate::error::{StoreError, StoreResult};
use crate::models::{WorkoutSession, WorkoutTemplate};

const DATA_DIR: &str = "minimal_workout_log";
const DATA_FILE: &str = "store.json";
const DATA_FILE_ENV: &str = "MWL_DATA_FILE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionSort {
    #[default]
    StartTimeDescending,
    DateDescending,
}

/// Filter and ordering for [`Store::sessions`].
#[derive(Debug, Clone, Default)]
pub struct SessionQuery {
    pub template_id: Option<Uuid>,
    pub finalized_only: bool,
    pub exclude: Option<Uuid>,
    pub sort: SessionSort,
    pub limit: Option<usize>,
}

impl SessionQuery {
    pub fn for_template(template_id: Uuid) -> Self {
        Self {
            template_id: Some(template_id),
            ..Self::default()
        }
    }

    pub fn finalized() -> Self {
        Self {
            finalized_only: true,
            ..Self::default()
        }
    }

    pub fn excluding(mut self, id: Option<Uuid>) -> Self {
        self.exclude = id;
        self
    }

    fn matches(&self, session: &WorkoutSession) -> bool {
        self.template_id.is_none_or(|t| session.template_id == Some(t))
            && (!self.finalized_only || session.is_finalized())
            && self.exclude != Some(session.id)
    }

    /// Apply the filter, sort and limit to a list of sessions.
    pub fn apply<'a, I>(&self, sessions: I) -> Vec<WorkoutSession>
    where
        I: IntoIterator<Item = &'a WorkoutSession>,
    {
        let mut out: Vec<WorkoutSession> = sessions
            .into_iter()
            .filter(|s| self.matches(s))
            .cloned()
            .collect();
        match self.sort {
            SessionSort::StartTimeDescending => out.sort_by(|a, b| b.start_time.cmp(&a.start_time)),
            SessionSort::DateDescending => out.sort_by(|a, b| {
                b.date.cmp(&a.date).then_with(|| b.start_time.cmp(&a.start_time))
            }),
        }
        if let Some(limit) = self.limit {
            out.truncate(limit);
        }
        out
    }
}

/// Filter for [`Store::templates`]. Results are ordered by creation time.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateQuery {
    pub include_archived: bool,
}

impl TemplateQuery {
    pub fn apply<'a, I>(&self, templates: I) -> Vec<WorkoutTemplate>
    where
        I: IntoIterator<Item = &'a WorkoutTemplate>,
    {
        let mut out: Vec<WorkoutTemplate> = templates
            .into_iter()
            .filter(|t| self.include_archived || !t.is_archived)
            .cloned()
            .collect();
        out.sort_by_key(|t| t.created_at);
        out
    }
}

/// Persistence operations the core relies on.
///
/// Mutations are staged until [`Store::save`] commits them. Owned children
/// travel with their parent so deletes cascade naturally: removing a
/// template drops its exercises, removing a session drops its slots and sets.
pub trait Store {
    fn insert_template(&mut self, template: WorkoutTemplate) -> StoreResult<()>;
    fn update_template(&mut self, template: &WorkoutTemplate) -> StoreResult<()>;
    /// Soft delete; sessions keep resolving the template by id.
    fn archive_template(&mut self, id: Uuid) -> StoreResult<()>;
    fn delete_template(&mut self, id: Uuid) -> StoreResult<()>;
    fn template(&self, id: Uuid) -> StoreResult<Option<WorkoutTemplate>>;
    fn templates(&self, query: &TemplateQuery) -> StoreResult<Vec<WorkoutTemplate>>;

    /// Insert the session or update it in place when the id already exists.
    fn upsert_session(&mut self, session: &WorkoutSession) -> StoreResult<()>;
    fn delete_session(&mut self, id: Uuid) -> StoreResult<()>;
    fn session(&self, id: Uuid) -> StoreResult<Option<WorkoutSession>>;
    fn sessions(&self, query: &SessionQuery) -> StoreResult<Vec<WorkoutSession>>;

    fn save(&mut self) -> StoreResult<()>;
    /// Drop every mutation made since the last successful [`Store::save`].
    fn discard(&mut self);
}

/// Records held by both store implementations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreData {
    #[serde(default)]
    pub templates: Vec<WorkoutTemplate>,
    #[serde(default)]
    pub sessions: Vec<WorkoutSession>,
}

impl StoreData {
    fn template_mut(&mut self, id: Uuid) -> StoreResult<&mut WorkoutTemplate> {
        self.templates
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(StoreError::NotFound(id))
    }
}

impl Store for StoreData {
    fn insert_template(&mut self, template: WorkoutTemplate) -> StoreResult<()> {
        match self.templates.iter_mut().find(|t| t.id == template.id) {
            Some(existing) => *existing = template,
            None => self.templates.push(template),
        }
        Ok(())
    }

    fn update_template(&mut self, template: &WorkoutTemplate) -> StoreResult<()> {
        *self.template_mut(template.id)? = template.clone();
        Ok(())
    }

    fn archive_template(&mut self, id: Uuid) -> StoreResult<()> {
        let template = self.template_mut(id)?;
        template.is_archived = true;
        template.updated_at = chrono::Utc::now();
        Ok(())
    }

    fn delete_template(&mut self, id: Uuid) -> StoreResult<()> {
        let before = self.templates.len();
        self.templates.retain(|t| t.id != id);
        if self.templates.len() == before {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    fn template(&self, id: Uuid) -> StoreResult<Option<WorkoutTemplate>> {
        Ok(self.templates.iter().find(|t| t.id == id).cloned())
    }

    fn templates(&self, query: &TemplateQuery) -> StoreResult<Vec<WorkoutTemplate>> {
        Ok(query.apply(&self.templates))
    }

    fn upsert_session(&mut self, session: &WorkoutSession) -> StoreResult<()> {
        match self.sessions.iter_mut().find(|s| s.id == session.id) {
            Some(existing) => *existing = session.clone(),
            None => self.sessions.push(session.clone()),
        }
        Ok(())
    }

    fn delete_session(&mut self, id: Uuid) -> StoreResult<()> {
        let before = self.sessions.len();
        self.sessions.retain(|s| s.id != id);
        if self.sessions.len() == before {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    fn session(&self, id: Uuid) -> StoreResult<Option<WorkoutSession>> {
        Ok(self.sessions.iter().find(|s| s.id == id).cloned())
    }

    fn sessions(&self, query: &SessionQuery) -> StoreResult<Vec<WorkoutSession>> {
        Ok(query.apply(&self.sessions))
    }

    fn save(&mut self) -> StoreResult<()> {
        Ok(())
    }

    fn discard(&mut self) {}
}

/// In-memory store. Staged changes become visible to readers once saved.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    staged: StoreData,
    committed: StoreData,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data(&self) -> &StoreData {
        &self.committed
    }
}

impl Store for MemoryStore {
    fn insert_template(&mut self, template: WorkoutTemplate) -> StoreResult<()> {
        self.staged.insert_template(template)
    }

    fn update_template(&mut self, template: &WorkoutTemplate) -> StoreResult<()> {
        self.staged.update_template(template)
    }

    fn archive_template(&mut self, id: Uuid) -> StoreResult<()> {
        self.staged.archive_template(id)
    }

    fn delete_template(&mut self, id: Uuid) -> StoreResult<()> {
        self.staged.delete_template(id)
    }

    fn template(&self, id: Uuid) -> StoreResult<Option<WorkoutTemplate>> {
        self.committed.template(id)
    }

    fn templates(&self, query: &TemplateQuery) -> StoreResult<Vec<WorkoutTemplate>> {
        self.committed.templates(query)
    }

    fn upsert_session(&mut self, session: &WorkoutSession) -> StoreResult<()> {
        self.staged.upsert_session(session)
    }

    fn delete_session(&mut self, id: Uuid) -> StoreResult<()> {
        self.staged.delete_session(id)
    }

    fn session(&self, id: Uuid) -> StoreResult<Option<WorkoutSession>> {
        self.committed.session(id)
    }

    fn sessions(&self, query: &SessionQuery) -> StoreResult<Vec<WorkoutSession>> {
        self.committed.sessions(query)
    }

    fn save(&mut self) -> StoreResult<()> {
        self.committed = self.staged.clone();
        Ok(())
    }

    fn discard(&mut self) {
        self.staged = self.committed.clone();
    }
}

/// Store backed by one pretty-printed JSON file.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    data: MemoryStore,
}

/// Determine where the data file lives.
///
/// The `MWL_DATA_FILE` environment variable takes precedence over the
/// platform data directory.
pub fn default_data_path() -> Option<PathBuf> {
    std::env::var_os(DATA_FILE_ENV)
        .map(PathBuf::from)
        .or_else(|| dirs::data_dir().map(|p| p.join(DATA_DIR).join(DATA_FILE)))
}

impl JsonFileStore {
    /// Open the store at `path`. A missing file yields an empty store.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let data = if path.exists() {
            let text = std::fs::read_to_string(&path)?;
            serde_json::from_str::<StoreData>(&text)?
        } else {
            StoreData::default()
        };
        log::info!(
            "Opened {} with {} templates and {} sessions",
            path.display(),
            data.templates.len(),
            data.sessions.len()
        );
        Ok(Self {
            path,
            data: MemoryStore {
                staged: data.clone(),
                committed: data,
            },
        })
    }

    pub fn open_default() -> StoreResult<Self> {
        let path = default_data_path()
            .ok_or_else(|| StoreError::Unavailable("no data directory available".into()))?;
        Self::open(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, data: &StoreData) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(data)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl Store for JsonFileStore {
    fn insert_template(&mut self, template: WorkoutTemplate) -> StoreResult<()> {
        self.data.insert_template(template)
    }

    fn update_template(&mut self, template: &WorkoutTemplate) -> StoreResult<()> {
        self.data.update_template(template)
    }

    fn archive_template(&mut self, id: Uuid) -> StoreResult<()> {
        self.data.archive_template(id)
    }

    fn delete_template(&mut self, id: Uuid) -> StoreResult<()> {
        self.data.delete_template(id)
    }

    fn template(&self, id: Uuid) -> StoreResult<Option<WorkoutTemplate>> {
        self.data.template(id)
    }

    fn templates(&self, query: &TemplateQuery) -> StoreResult<Vec<WorkoutTemplate>> {
        self.data.templates(query)
    }

    fn upsert_session(&mut self, session: &WorkoutSession) -> StoreResult<()> {
        self.data.upsert_session(session)
    }

    fn delete_session(&mut self, id: Uuid) -> StoreResult<()> {
        self.data.delete_session(id)
    }

    fn session(&self, id: Uuid) -> StoreResult<Option<WorkoutSession>> {
        self.data.session(id)
    }

    fn sessions(&self, query: &SessionQuery) -> StoreResult<Vec<WorkoutSession>> {
        self.data.sessions(query)
    }

    fn save(&mut self) -> StoreResult<()> {
        if let Err(e) = self.write(&self.data.staged) {
            log::error!("Failed to write {}: {e}", self.path.display());
            return Err(e);
        }
        self.data.save()
    }

    fn discard(&mut self) {
        self.data.discard();
    }
}
