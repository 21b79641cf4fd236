//! The session: the single in-memory source of truth for task data,
//! wired to its three collaborators (store, confirmer, sync transport)
//! and driven by a cooperative tick loop.
//!
//! Control flow on a mutation: the cascade engine updates the collection,
//! both debounce timers re-arm, the save fires after the quiet period and
//! reads the state current at that moment, and a successful save lets the
//! sync coordinator schedule a reconcile pass.

use std::collections::HashSet;
use std::time::Instant;

use chrono::{DateTime, Utc};

use crate::io::journal::Journal;
use crate::model::todo::{DataSource, Todo, TodoList};
use crate::model::{ArchivedTodos, Settings};
use crate::ops::cascade::{self, DeleteOutcome, TodoError};
use crate::ops::transfer::{self, ImportOutcome, TransferError};
use crate::port::{Confirmer, RemoteConfig, StoreError, SyncReport, SyncTransport, TodoStore};
use crate::sched::PersistScheduler;
use crate::sync::{ConnectionStatus, SyncCoordinator, SyncError, SyncStatus};
use crate::util::time::archive_eligible;

pub struct Session<S: TodoStore, C: Confirmer, T: SyncTransport> {
    store: S,
    confirmer: C,
    journal: Option<Journal>,
    todos: TodoList,
    settings: Settings,
    remote_config: Option<RemoteConfig>,
    sync: SyncCoordinator<T>,
    sched: PersistScheduler,
    /// Sticky persistence error; cleared by the next successful save.
    last_error: Option<String>,
}

impl<S: TodoStore, C: Confirmer, T: SyncTransport> Session<S, C, T> {
    pub fn new(store: S, confirmer: C, transport: T) -> Self {
        Session {
            store,
            confirmer,
            journal: None,
            todos: TodoList::new(Utc::now()),
            settings: Settings::default(),
            remote_config: None,
            sync: SyncCoordinator::new(transport),
            sched: PersistScheduler::new(),
            last_error: None,
        }
    }

    /// Attach the failure journal for automatic-flow errors.
    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = Some(journal);
        self
    }

    // -----------------------------------------------------------------------
    // Startup / shutdown
    // -----------------------------------------------------------------------

    /// Load persisted state. Load failures leave the defaults in place
    /// and surface through `last_error`; they never abort startup.
    pub fn load(&mut self) {
        match self.store.load_todos() {
            Ok(Some(list)) => self.todos = list,
            Ok(None) => {}
            Err(e) => self.record_failure("load", &e.to_string(), None),
        }
        match self.store.load_settings() {
            Ok(loaded) => self.settings.merge_loaded(loaded),
            Err(e) => self.record_failure("load", &e.to_string(), None),
        }
        match self.store.load_remote_config() {
            Ok(config) => self.remote_config = config,
            Err(e) => self.record_failure("load", &e.to_string(), None),
        }
        self.sync
            .set_auto_sync(&self.settings.auto_sync, Instant::now());
    }

    /// Flush a pending save, then clear every timer.
    pub fn shutdown(&mut self) {
        if self.sched.save.pending() {
            self.save_now();
        }
        self.sched.cancel_pending();
        self.sync.disconnect();
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn todos(&self) -> &TodoList {
        &self.todos
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn sync_status(&self) -> SyncStatus {
        self.sync.snapshot()
    }

    pub fn has_remote_config(&self) -> bool {
        self.remote_config.is_some()
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    pub fn add(
        &mut self,
        text: &str,
        parent_id: Option<&str>,
        deadline: Option<DateTime<Utc>>,
    ) -> Result<String, TodoError> {
        let id = cascade::add_todo(&mut self.todos, text, parent_id, deadline, Utc::now())?;
        self.mark_mutated();
        Ok(id)
    }

    pub fn toggle(&mut self, id: &str) -> Result<(), TodoError> {
        cascade::toggle_todo(&mut self.todos, id, Utc::now(), &mut self.confirmer)?;
        self.mark_mutated();
        Ok(())
    }

    pub fn delete(&mut self, id: &str) -> Result<DeleteOutcome, TodoError> {
        let outcome = cascade::delete_todo(&mut self.todos, id, Utc::now(), &mut self.confirmer)?;
        if matches!(outcome, DeleteOutcome::Deleted(_)) {
            self.mark_mutated();
        }
        Ok(outcome)
    }

    pub fn update_text(&mut self, id: &str, text: &str) -> Result<(), TodoError> {
        cascade::update_text(&mut self.todos, id, text, Utc::now())?;
        self.mark_mutated();
        Ok(())
    }

    pub fn set_deadline(
        &mut self,
        id: &str,
        deadline: Option<DateTime<Utc>>,
    ) -> Result<(), TodoError> {
        cascade::set_deadline(&mut self.todos, id, deadline, Utc::now())?;
        self.mark_mutated();
        Ok(())
    }

    pub fn import(&mut self, json: &str) -> Result<ImportOutcome, TransferError> {
        let outcome = transfer::import_todos(&mut self.todos, json, Utc::now(), &mut self.confirmer)?;
        if matches!(outcome, ImportOutcome::Imported(_)) {
            self.mark_mutated();
        }
        Ok(outcome)
    }

    pub fn export_json(&self) -> String {
        transfer::export_json(&self.todos, Utc::now())
    }

    // -----------------------------------------------------------------------
    // Settings and remote configuration
    // -----------------------------------------------------------------------

    pub fn set_archive_days(&mut self, days: u32) -> Result<(), StoreError> {
        self.settings.archive_days = days;
        self.save_settings()
    }

    /// Change the auto-sync interval. While connected the standing timer
    /// re-arms immediately; otherwise the new interval waits for the next
    /// connection.
    pub fn set_auto_sync(&mut self, spec: &str) -> Result<(), StoreError> {
        self.settings.auto_sync = spec.to_string();
        self.sync.set_auto_sync(spec, Instant::now());
        self.save_settings()
    }

    fn save_settings(&mut self) -> Result<(), StoreError> {
        self.settings.last_update = Some(Utc::now());
        self.store.save_settings(&self.settings)
    }

    /// Store new connection settings. The sync session resets; the next
    /// connect runs against the new configuration.
    pub fn set_remote_config(&mut self, config: RemoteConfig) -> Result<(), StoreError> {
        self.store.save_remote_config(&config)?;
        self.remote_config = Some(config);
        self.sync.disconnect();
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Sync
    // -----------------------------------------------------------------------

    /// Run the connect sequence against the stored configuration.
    pub fn connect(&mut self) -> ConnectionStatus {
        self.sync.connect(self.remote_config.as_ref(), Instant::now())
    }

    pub fn disconnect(&mut self) {
        self.sync.disconnect();
    }

    /// User-invoked sync; errors propagate to the caller.
    pub fn sync_now(&mut self) -> Result<SyncReport, SyncError> {
        self.sync.start_sync(Utc::now())
    }

    // -----------------------------------------------------------------------
    // Archive
    // -----------------------------------------------------------------------

    /// User-invoked archive pass; errors propagate. Returns how many
    /// items were moved.
    pub fn archive_now(&mut self) -> Result<usize, StoreError> {
        self.run_archive(Utc::now(), Instant::now())
    }

    pub fn clear_archive(&mut self) -> Result<(), StoreError> {
        self.store.clear_archive()
    }

    pub fn load_archive(&mut self) -> Result<ArchivedTodos, StoreError> {
        self.store.load_archive()
    }

    // -----------------------------------------------------------------------
    // Tick loop
    // -----------------------------------------------------------------------

    /// Drive all cooperative timers. Call from the host's idle loop.
    pub fn tick(&mut self, now: Instant) {
        if self.sched.save.fire(now) && self.save_now() {
            self.sync.notify_saved(now);
        }

        if self.sched.archive.fire(now)
            && let Err(e) = self.run_archive(Utc::now(), now)
        {
            self.record_failure("archive", &e.to_string(), None);
        }

        if self.sync.tick(now, Utc::now(), self.remote_config.as_ref()) {
            self.reload_after_sync();
        }
    }

    fn mark_mutated(&mut self) {
        self.sched.mark_mutated(Instant::now());
    }

    /// Save the collection as it is right now. On failure the in-memory
    /// state is kept, the error sticks, and the payload is journaled.
    fn save_now(&mut self) -> bool {
        match self.store.save_todos(&self.todos) {
            Ok(()) => {
                self.last_error = None;
                true
            }
            Err(e) => {
                let payload = serde_json::to_string(&self.todos).ok();
                self.record_failure("save", &e.to_string(), payload.as_deref());
                false
            }
        }
    }

    /// Move archive-eligible items into the archive store. Read-modify-
    /// write: existing archived items are never dropped. Any store
    /// failure leaves the live collection untouched.
    fn run_archive(&mut self, now_utc: DateTime<Utc>, now: Instant) -> Result<usize, StoreError> {
        let archive_days = self.settings.archive_days;
        let eligible: HashSet<String> = self
            .todos
            .data
            .iter()
            .filter(|t| {
                t.completed
                    && t.completed_at
                        .is_some_and(|c| archive_eligible(c, now_utc, archive_days))
            })
            .map(|t| t.id.clone())
            .collect();
        if eligible.is_empty() {
            return Ok(0);
        }

        let mut archive = self.store.load_archive()?;
        let items: Vec<Todo> = self
            .todos
            .data
            .iter()
            .filter(|t| eligible.contains(&t.id))
            .cloned()
            .collect();
        archive.append(items, now_utc);
        self.store.save_archive(&archive)?;

        self.todos.remove_all(&eligible);
        self.todos.touch(now_utc, DataSource::Manual);
        self.sched.save.trigger(now);
        Ok(eligible.len())
    }

    /// After an interval-driven sync pulled remote changes, adopt what
    /// landed on disk.
    fn reload_after_sync(&mut self) {
        match self.store.load_todos() {
            Ok(Some(list)) => self.todos = list,
            Ok(None) => {}
            Err(e) => self.record_failure("reload", &e.to_string(), None),
        }
    }

    fn record_failure(&mut self, category: &str, message: &str, payload: Option<&str>) {
        self.last_error = Some(message.to_string());
        if let Some(journal) = &self.journal {
            journal.record(category, message, payload);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
