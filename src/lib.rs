//! Core library for replyguard.  This module wires together the
//! configuration store, the panel registry and the navigation-driven
//! orchestrator that attaches one confirm-before-send guard per helpdesk
//! panel.
//!
//! Page access (DOM queries, click listeners, dialogs) comes in through the
//! traits in [`dom`]; HTTP, storage and timers through [`store`] and
//! [`waiter`].  Nothing here is a process-wide singleton: build a [`Guard`]
//! once and hand its [`Orchestrator`] to whatever reports navigation.

mod config;
pub mod dom;
pub mod error;
pub mod locale;
pub mod matcher;
pub mod orchestrator;
pub mod panel;
pub mod store;
pub mod util;
pub mod waiter;

pub use config::{GuardSettings, Selectors, DEFAULT_STORAGE_KEY, DEFAULT_TICKET_PATH};
pub use error::{ConfigFetchError, GuardError, NotFoundError};
pub use locale::Locale;
pub use orchestrator::{Location, NavigationObserver, Orchestrator, RunOutcome};
pub use panel::{ClickDecision, GuardState, PanelRegistry, PanelValidator};
pub use store::{ConfigStore, Configuration, FileStore, HttpFetch, KeyValueStore, MemoryStore, ReqwestFetcher};

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{fmt, EnvFilter};

use crate::dom::{Dom, Prompter};
use crate::waiter::{Clock, ElementWaiter, TokioClock};

/// Everything one page needs, constructed once at startup.
#[derive(Clone)]
pub struct Guard {
    pub settings: GuardSettings,
    pub store: Arc<ConfigStore>,
    pub registry: Arc<PanelRegistry>,
    pub orchestrator: Arc<Orchestrator>,
}

impl Guard {
    /// Assemble a guard from explicit boundaries.  Used directly by tests
    /// and by [`build_guard_from_env`].
    pub fn new(
        settings: GuardSettings,
        dom: Arc<dyn Dom>,
        prompter: Arc<dyn Prompter>,
        storage: Arc<dyn KeyValueStore>,
        http: Arc<dyn HttpFetch>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let store = Arc::new(ConfigStore::new(
            storage,
            http,
            settings.storage_key.clone(),
            settings.locale,
        ));
        let registry = Arc::new(PanelRegistry::new(
            settings.selectors.clone(),
            dom.clone(),
            prompter.clone(),
        ));
        let waiter = ElementWaiter::new(dom.clone(), clock)
            .with_timing(settings.wait_timeout, settings.poll_interval);
        let orchestrator = Arc::new(Orchestrator::new(
            store.clone(),
            registry.clone(),
            waiter,
            dom,
            prompter,
            settings.ticket_path.clone(),
            settings.locale,
        ));
        Self {
            settings,
            store,
            registry,
            orchestrator,
        }
    }

    pub fn observer(&self) -> Arc<dyn NavigationObserver> {
        self.orchestrator.clone()
    }
}

/// Build a guard from environment variables with production boundaries:
/// `reqwest` for the configuration fetch, a [`FileStore`] when
/// `REPLYGUARD_STORE_PATH` is set (otherwise [`MemoryStore`]) and real
/// timers.  The page-facing `dom` and `prompter` are always supplied by the
/// caller.
pub fn build_guard_from_env(
    dom: Arc<dyn Dom>,
    prompter: Arc<dyn Prompter>,
) -> anyhow::Result<Guard> {
    let settings = GuardSettings::from_env()?;
    if settings.log_stdout {
        init_logging();
    }
    let storage: Arc<dyn KeyValueStore> = match settings.store_path.as_deref() {
        Some(path) => Arc::new(FileStore::open(path)?),
        None => {
            tracing::warn!("REPLYGUARD_STORE_PATH not set; configuration URL will not persist");
            Arc::new(MemoryStore::new())
        }
    };
    let http = Arc::new(
        ReqwestFetcher::new(settings.fetch_timeout).context("Failed to build HTTP client")?,
    );
    tracing::info!(
        locale = settings.locale.as_str(),
        storage_key = %settings.storage_key,
        "replyguard initialised"
    );
    Ok(Guard::new(
        settings,
        dom,
        prompter,
        storage,
        http,
        Arc::new(TokioClock),
    ))
}

/// Install a `tracing` subscriber filtered by `RUST_LOG` (default `info`).
/// Returns false if a global subscriber was already set.
pub fn init_logging() -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).try_init().is_ok()
}
