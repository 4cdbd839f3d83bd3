//! Application state for the API server.

use std::sync::Arc;

use curfew_core::{Clock, ContentFilter, HookSet, LocalClock, PassThrough, RestrictionEvaluator};
use curfew_storage::{Database, StorageError};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Settings and catalog store.
    pub db: Arc<Database>,
    /// Behaviors registered for the configuration loaded at startup.
    pub hooks: Arc<HookSet>,
}

impl AppState {
    /// Loads the restriction settings from `db` and registers the hooks.
    pub fn new(db: Database) -> Result<Self, StorageError> {
        Self::with_components(db, Arc::new(LocalClock), Arc::new(PassThrough))
    }

    /// Creates application state with a custom clock and content filter.
    pub fn with_components(
        db: Database,
        clock: Arc<dyn Clock>,
        filter: Arc<dyn ContentFilter>,
    ) -> Result<Self, StorageError> {
        let db = Arc::new(db);
        let config = db.load_restriction_config()?;

        let evaluator = RestrictionEvaluator::new(config, db.clone())
            .with_clock(clock)
            .with_content_filter(filter);
        let hooks = HookSet::from_evaluator(Arc::new(evaluator));

        Ok(Self {
            db,
            hooks: Arc::new(hooks),
        })
    }

    /// Wraps an already-built hook set. The hooks' catalog is the one the
    /// category endpoints consult.
    pub fn from_parts(db: Arc<Database>, hooks: Arc<HookSet>) -> Self {
        Self { db, hooks }
    }

    pub fn evaluator(&self) -> &RestrictionEvaluator {
        self.hooks.evaluator()
    }
}
