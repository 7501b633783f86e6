//! Drives validator attachment from navigation events.
//!
//! The embedding application owns the actual navigation hook and reports
//! every in-app navigation through [`NavigationObserver::navigated`].  Runs
//! may interleave at the fetch and element-wait await points; the registry
//! is what keeps them from attaching twice to the same panel.

use std::sync::Arc;

use regex::Regex;

use crate::dom::{Dom, Prompter};
use crate::error::GuardError;
use crate::locale::Locale;
use crate::panel::PanelRegistry;
use crate::store::ConfigStore;
use crate::waiter::ElementWaiter;

/// Where the operator currently is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub host: String,
    pub path: String,
}

impl Location {
    pub fn new(host: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            path: path.into(),
        }
    }
}

/// How a run ended when nothing went wrong.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    NotTicketView,
    NotTargetHost,
    /// No unguarded panel appeared before the wait timed out.
    PanelNotFound,
    /// The located element has no ancestor carrying the panel id attribute.
    MissingPanelId,
    AlreadyGuarded(String),
    Attached(String),
}

#[async_trait::async_trait]
pub trait NavigationObserver: Send + Sync {
    async fn navigated(&self, location: &Location) -> Result<RunOutcome, GuardError>;
}

pub struct Orchestrator {
    store: Arc<ConfigStore>,
    registry: Arc<PanelRegistry>,
    waiter: ElementWaiter,
    dom: Arc<dyn Dom>,
    prompter: Arc<dyn Prompter>,
    ticket_path: Regex,
    locale: Locale,
}

impl Orchestrator {
    pub fn new(
        store: Arc<ConfigStore>,
        registry: Arc<PanelRegistry>,
        waiter: ElementWaiter,
        dom: Arc<dyn Dom>,
        prompter: Arc<dyn Prompter>,
        ticket_path: Regex,
        locale: Locale,
    ) -> Self {
        Self {
            store,
            registry,
            waiter,
            dom,
            prompter,
            ticket_path,
            locale,
        }
    }

    /// First run after page load.  Asks for the configuration URL when
    /// none is stored yet, then handles `location` like any navigation.
    pub async fn start(&self, location: &Location) -> Result<RunOutcome, GuardError> {
        self.ensure_config_url();
        self.run(location).await
    }

    /// Prompt for the configuration URL if the store is empty.  A cancelled
    /// or invalid answer leaves it empty so the prompt recurs next start.
    pub fn ensure_config_url(&self) {
        if !self.store.is_url_empty() {
            return;
        }
        match self.prompter.prompt(self.locale.config_url_prompt(), "") {
            Some(answer) => self.store.set_url(&answer),
            None => tracing::info!("configuration URL prompt cancelled"),
        }
    }

    pub async fn run(&self, location: &Location) -> Result<RunOutcome, GuardError> {
        if !self.ticket_path.is_match(&location.path) {
            tracing::trace!(path = %location.path, "not a ticket view");
            return Ok(RunOutcome::NotTicketView);
        }

        if let Err(err) = self.store.fetch().await {
            self.prompter.alert(err.message());
            return Err(err.into());
        }

        if !self.store.is_target_host(&location.host)? {
            tracing::debug!(host = %location.host, "host is not a target, skipping");
            return Ok(RunOutcome::NotTargetHost);
        }

        let selector = self.registry.target_selector();
        let element = match self.waiter.wait(&selector).await {
            Ok(element) => element,
            Err(err) => {
                tracing::debug!(error = %err, "no unguarded panel found");
                return Ok(RunOutcome::PanelNotFound);
            }
        };

        let attribute = &self.registry.selectors().panel_id_attribute;
        let Some(panel_id) = self.dom.closest_attribute(&element, attribute) else {
            tracing::warn!(attribute = %attribute, "located panel carries no id");
            return Ok(RunOutcome::MissingPanelId);
        };

        let words = self.store.words_for(&location.host)?;
        match self
            .registry
            .add_validator(&words, Some(panel_id.as_str()), self.locale)?
        {
            Some(_) => Ok(RunOutcome::Attached(panel_id)),
            None => Ok(RunOutcome::AlreadyGuarded(panel_id)),
        }
    }

    pub fn registry(&self) -> &Arc<PanelRegistry> {
        &self.registry
    }

    pub fn store(&self) -> &Arc<ConfigStore> {
        &self.store
    }
}

#[async_trait::async_trait]
impl NavigationObserver for Orchestrator {
    async fn navigated(&self, location: &Location) -> Result<RunOutcome, GuardError> {
        let outcome = self.run(location).await;
        match &outcome {
            Ok(o) => tracing::debug!(host = %location.host, path = %location.path, outcome = ?o, "navigation handled"),
            Err(e) => tracing::warn!(host = %location.host, path = %location.path, error = %e, "navigation run failed"),
        }
        outcome
    }
}
