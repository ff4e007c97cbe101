use anyhow::{Context, anyhow};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use crate::leisure::{LeisureEntry, LeisureKind, LeisureLog};
use crate::prefs::{ColorMode, Preferences, Theme};
use crate::storage::{self, KeyValueStore, Loaded, Slot};
use crate::targets::{TargetList, WeeklyTarget};
use crate::task::{self, StoredTask, Task, TaskCategory, TaskList, TaskStatus};
use crate::view::{self, CategoryFilter, Page, Stats};

/// Shown until the quote fetch reports back.
pub const PLACEHOLDER_QUOTE: &str = "LEVEL UP YOUR REALITY.";

/// Every way the application state can change.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    AddTask { text: String, category: TaskCategory },
    EditTask { id: String, text: String, category: TaskCategory },
    SetTaskStatus { id: String, status: TaskStatus },
    RemoveTask { id: String },
    AddTarget { text: String },
    ToggleTarget { id: String },
    RemoveTarget { id: String },
    LogMovie { title: String },
    LogGame { title: String, hours: String },
    LogShow { title: String, hours: String },
    SetTheme(Theme),
    CycleTheme,
    SetColorMode(ColorMode),
    ToggleColorMode,
    QuoteLoaded(String),
}

/// Owns every collection and the store behind them. Each mutation is
/// applied in memory first and then flushed to its slot; a failed flush is
/// logged and the in-memory copy stays authoritative.
#[derive(Debug)]
pub struct AppState<S: KeyValueStore> {
    store: S,
    tasks: TaskList,
    targets: TargetList,
    leisure: LeisureLog,
    prefs: Preferences,
    quote: String,
}

impl<S: KeyValueStore> AppState<S> {
    #[instrument(skip(store))]
    pub fn load(store: S) -> Self {
        let tasks = match storage::load_json::<_, Vec<StoredTask>>(&store, Slot::Tasks) {
            Loaded::Present(stored) => task::upgrade_tasks(stored),
            Loaded::Missing | Loaded::Corrupt => Vec::new(),
        };

        let targets = match storage::load_json::<_, Vec<WeeklyTarget>>(&store, Slot::WeeklyTargets) {
            Loaded::Present(targets) => TargetList::new(targets),
            Loaded::Missing | Loaded::Corrupt => TargetList::seeded(),
        };

        let leisure = LeisureLog::new(
            load_entries(&store, LeisureKind::Movie),
            load_entries(&store, LeisureKind::Game),
            load_entries(&store, LeisureKind::Show),
        );

        let theme = storage::load_raw(&store, Slot::Theme);
        let color_mode = storage::load_raw(&store, Slot::ColorMode);
        let prefs = Preferences::from_stored(theme.as_deref(), color_mode.as_deref());

        info!(
            tasks = tasks.len(),
            targets = targets.len(),
            theme = %prefs.theme,
            color_mode = %prefs.color_mode,
            "loaded application state"
        );

        Self {
            store,
            tasks: TaskList::new(tasks),
            targets,
            leisure,
            prefs,
            quote: PLACEHOLDER_QUOTE.to_string(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn tasks(&self) -> &[Task] {
        self.tasks.as_slice()
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id)
    }

    /// See [`TaskList::resolve_prefix`].
    pub fn resolve_task(&self, prefix: &str) -> anyhow::Result<Option<String>> {
        self.tasks.resolve_prefix(prefix)
    }

    pub fn targets(&self) -> &TargetList {
        &self.targets
    }

    pub fn leisure(&self) -> &LeisureLog {
        &self.leisure
    }

    pub fn preferences(&self) -> Preferences {
        self.prefs
    }

    pub fn quote(&self) -> &str {
        &self.quote
    }

    pub fn view(&self, page: Page, category: CategoryFilter) -> Vec<&Task> {
        view::filter_tasks(self.tasks.as_slice(), page, category)
    }

    pub fn stats(&self) -> Stats {
        Stats::compute(self.tasks.as_slice())
    }

    // ==================== tasks ====================

    #[instrument(skip(self, text))]
    pub fn add_task(&mut self, text: &str, category: TaskCategory) -> Option<String> {
        self.add_task_at(text, category, Utc::now())
    }

    pub fn add_task_at(&mut self, text: &str, category: TaskCategory, now: DateTime<Utc>) -> Option<String> {
        let id = self.tasks.add(text, category, now)?;
        debug!(%id, "task added");
        self.flush(Slot::Tasks);
        Some(id)
    }

    #[instrument(skip(self, text))]
    pub fn edit_task(&mut self, id: &str, text: &str, category: TaskCategory) -> bool {
        let changed = self.tasks.edit(id, text, category);
        self.flush(Slot::Tasks);
        changed
    }

    #[instrument(skip(self))]
    pub fn set_task_status(&mut self, id: &str, status: TaskStatus) -> bool {
        let changed = self.tasks.set_status(id, status);
        self.flush(Slot::Tasks);
        changed
    }

    #[instrument(skip(self))]
    pub fn remove_task(&mut self, id: &str) -> bool {
        let changed = self.tasks.remove(id);
        self.flush(Slot::Tasks);
        changed
    }

    // ==================== weekly targets ====================

    #[instrument(skip(self, text))]
    pub fn add_target(&mut self, text: &str) -> Option<String> {
        let id = self.targets.add(text);
        self.flush(Slot::WeeklyTargets);
        id
    }

    #[instrument(skip(self))]
    pub fn toggle_target(&mut self, id: &str) -> bool {
        let changed = self.targets.toggle(id);
        self.flush(Slot::WeeklyTargets);
        changed
    }

    #[instrument(skip(self))]
    pub fn remove_target(&mut self, id: &str) -> bool {
        let changed = self.targets.remove(id);
        self.flush(Slot::WeeklyTargets);
        changed
    }

    // ==================== leisure ====================

    #[instrument(skip(self))]
    pub fn log_movie(&mut self, title: &str) -> Option<String> {
        let id = self.leisure.log_movie(title);
        self.flush(Slot::Movies);
        id
    }

    #[instrument(skip(self))]
    pub fn log_game(&mut self, title: &str, hours: &str) -> Option<String> {
        let id = self.leisure.log_game(title, hours);
        self.flush(Slot::Games);
        id
    }

    #[instrument(skip(self))]
    pub fn log_show(&mut self, title: &str, hours: &str) -> Option<String> {
        let id = self.leisure.log_show(title, hours);
        self.flush(Slot::Shows);
        id
    }

    // ==================== preferences ====================

    pub fn set_theme(&mut self, theme: Theme) {
        self.prefs.theme = theme;
        self.flush(Slot::Theme);
    }

    pub fn cycle_theme(&mut self) -> Theme {
        let next = self.prefs.theme.next();
        self.set_theme(next);
        next
    }

    pub fn set_color_mode(&mut self, mode: ColorMode) {
        self.prefs.color_mode = mode;
        self.flush(Slot::ColorMode);
    }

    pub fn toggle_color_mode(&mut self) -> ColorMode {
        let next = self.prefs.color_mode.toggled();
        self.set_color_mode(next);
        next
    }

    /// Single entry point for deferred updates such as the quote result.
    #[instrument(skip(self))]
    pub fn apply(&mut self, action: Action) {
        match action {
            Action::AddTask { text, category } => {
                self.add_task(&text, category);
            }
            Action::EditTask { id, text, category } => {
                self.edit_task(&id, &text, category);
            }
            Action::SetTaskStatus { id, status } => {
                self.set_task_status(&id, status);
            }
            Action::RemoveTask { id } => {
                self.remove_task(&id);
            }
            Action::AddTarget { text } => {
                self.add_target(&text);
            }
            Action::ToggleTarget { id } => {
                self.toggle_target(&id);
            }
            Action::RemoveTarget { id } => {
                self.remove_target(&id);
            }
            Action::LogMovie { title } => {
                self.log_movie(&title);
            }
            Action::LogGame { title, hours } => {
                self.log_game(&title, &hours);
            }
            Action::LogShow { title, hours } => {
                self.log_show(&title, &hours);
            }
            Action::SetTheme(theme) => self.set_theme(theme),
            Action::CycleTheme => {
                self.cycle_theme();
            }
            Action::SetColorMode(mode) => self.set_color_mode(mode),
            Action::ToggleColorMode => {
                self.toggle_color_mode();
            }
            Action::QuoteLoaded(line) => self.quote = line,
        }
    }

    // ==================== export / import ====================

    /// Every slot as one JSON object keyed by slot name.
    pub fn export(&self) -> anyhow::Result<Value> {
        let mut out = Map::new();
        for slot in Slot::ALL {
            out.insert(slot.key().to_string(), self.slot_value(slot)?);
        }
        Ok(Value::Object(out))
    }

    /// Replaces the slots named in `dump`. Values may be decoded JSON or the
    /// string form local storage keeps them in. A `null` value clears the
    /// slot back to its default and removes its key. Unknown keys are
    /// skipped. Nothing is applied unless every present slot decodes.
    #[instrument(skip(self, dump))]
    pub fn import(&mut self, dump: &Value) -> anyhow::Result<Vec<Slot>> {
        let object = dump
            .as_object()
            .ok_or_else(|| anyhow!("import data must be a JSON object keyed by slot name"))?;

        let mut staged = self.snapshot();
        let mut imported = Vec::new();

        for (key, raw) in object {
            let Some(slot) = Slot::from_key(key) else {
                warn!(key = %key, "skipping unknown slot in import");
                continue;
            };
            staged.apply_slot(slot, raw)?;
            imported.push(slot);
        }

        self.tasks = staged.tasks;
        self.targets = staged.targets;
        self.leisure = staged.leisure;
        self.prefs = staged.prefs;
        for slot in &imported {
            if staged.cleared.contains(slot) {
                self.clear(*slot);
            } else {
                self.flush(*slot);
            }
        }
        info!(slots = imported.len(), "import applied");
        Ok(imported)
    }

    fn snapshot(&self) -> Staged {
        Staged {
            tasks: self.tasks.clone(),
            targets: self.targets.clone(),
            leisure: self.leisure.clone(),
            prefs: self.prefs,
            cleared: Vec::new(),
        }
    }

    fn slot_value(&self, slot: Slot) -> anyhow::Result<Value> {
        let value = match slot {
            Slot::Tasks => serde_json::to_value(self.tasks.as_slice())?,
            Slot::WeeklyTargets => serde_json::to_value(self.targets.as_slice())?,
            Slot::Movies => serde_json::to_value(self.leisure.entries(LeisureKind::Movie))?,
            Slot::Games => serde_json::to_value(self.leisure.entries(LeisureKind::Game))?,
            Slot::Shows => serde_json::to_value(self.leisure.entries(LeisureKind::Show))?,
            Slot::Theme => Value::String(self.prefs.theme.as_str().to_string()),
            Slot::ColorMode => Value::String(self.prefs.color_mode.as_str().to_string()),
        };
        Ok(value)
    }

    fn flush(&mut self, slot: Slot) {
        if let Err(err) = self.try_flush(slot) {
            warn!(slot = slot.key(), error = %err, "failed to persist slot; keeping in-memory state");
        }
    }

    fn clear(&mut self, slot: Slot) {
        match self.store.remove(slot.key()) {
            Ok(()) => debug!(slot = slot.key(), "slot cleared"),
            Err(err) => warn!(slot = slot.key(), error = %err, "failed to clear slot; keeping in-memory state"),
        }
    }

    fn try_flush(&mut self, slot: Slot) -> anyhow::Result<()> {
        match slot {
            Slot::Tasks => storage::save_json(&mut self.store, slot, self.tasks.as_slice()),
            Slot::WeeklyTargets => storage::save_json(&mut self.store, slot, self.targets.as_slice()),
            Slot::Movies => storage::save_json(&mut self.store, slot, self.leisure.entries(LeisureKind::Movie)),
            Slot::Games => storage::save_json(&mut self.store, slot, self.leisure.entries(LeisureKind::Game)),
            Slot::Shows => storage::save_json(&mut self.store, slot, self.leisure.entries(LeisureKind::Show)),
            Slot::Theme => self.store.set(slot.key(), self.prefs.theme.as_str()),
            Slot::ColorMode => self.store.set(slot.key(), self.prefs.color_mode.as_str()),
        }
    }
}

struct Staged {
    tasks: TaskList,
    targets: TargetList,
    leisure: LeisureLog,
    prefs: Preferences,
    cleared: Vec<Slot>,
}

impl Staged {
    fn apply_slot(&mut self, slot: Slot, raw: &Value) -> anyhow::Result<()> {
        if raw.is_null() {
            self.reset_slot(slot);
            self.cleared.push(slot);
            return Ok(());
        }
        self.cleared.retain(|cleared| *cleared != slot);

        if !slot.is_json() {
            let text = raw
                .as_str()
                .ok_or_else(|| anyhow!("{} must be a string", slot.key()))?;
            match slot {
                Slot::Theme => self.prefs.theme = text.parse()?,
                _ => self.prefs.color_mode = text.parse()?,
            }
            return Ok(());
        }

        let value = decode_embedded(raw).with_context(|| format!("invalid JSON in {}", slot.key()))?;
        let context = || format!("unexpected shape for {}", slot.key());
        match slot {
            Slot::Tasks => {
                let stored: Vec<StoredTask> = serde_json::from_value(value).with_context(context)?;
                self.tasks = TaskList::new(task::upgrade_tasks(stored));
            }
            Slot::WeeklyTargets => {
                let targets: Vec<WeeklyTarget> = serde_json::from_value(value).with_context(context)?;
                self.targets = TargetList::new(targets);
            }
            Slot::Movies | Slot::Games | Slot::Shows => {
                let entries: Vec<LeisureEntry> = serde_json::from_value(value).with_context(context)?;
                let kind = match slot {
                    Slot::Movies => LeisureKind::Movie,
                    Slot::Games => LeisureKind::Game,
                    _ => LeisureKind::Show,
                };
                self.leisure.set_entries(kind, entries);
            }
            Slot::Theme | Slot::ColorMode => {}
        }
        Ok(())
    }
}

impl Staged {
    /// What a fresh load would produce for a missing slot.
    fn reset_slot(&mut self, slot: Slot) {
        match slot {
            Slot::Tasks => self.tasks = TaskList::default(),
            Slot::WeeklyTargets => self.targets = TargetList::seeded(),
            Slot::Movies => self.leisure.set_entries(LeisureKind::Movie, Vec::new()),
            Slot::Games => self.leisure.set_entries(LeisureKind::Game, Vec::new()),
            Slot::Shows => self.leisure.set_entries(LeisureKind::Show, Vec::new()),
            Slot::Theme => self.prefs.theme = Theme::default(),
            Slot::ColorMode => self.prefs.color_mode = ColorMode::default(),
        }
    }
}

/// Local storage dumps keep JSON values as strings; decode those once.
fn decode_embedded(raw: &Value) -> anyhow::Result<Value> {
    match raw {
        Value::String(text) => Ok(serde_json::from_str(text)?),
        other => Ok(other.clone()),
    }
}

fn load_entries<S: KeyValueStore>(store: &S, kind: LeisureKind) -> Vec<LeisureEntry> {
    storage::load_json::<_, Vec<LeisureEntry>>(store, kind.slot()).unwrap_or_else(Vec::new)
}
