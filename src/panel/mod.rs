//! Per-panel guards and the registry that keeps them unique.
//!
//! Panels are identified by the id attribute of their container.  The
//! registry only grows: a closed panel's id stays tracked, so a platform
//! that reuses an id for a new panel leaves that panel unguarded.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::config::Selectors;
use crate::dom::{Dom, Prompter};
use crate::error::GuardError;
use crate::locale::Locale;

pub mod validator;

pub use self::validator::{ClickDecision, GuardState, PanelValidator};

#[derive(Default)]
struct Tracked {
    order: Vec<String>,
    ids: HashSet<String>,
    validators: Vec<Arc<PanelValidator>>,
}

pub struct PanelRegistry {
    selectors: Selectors,
    dom: Arc<dyn Dom>,
    prompter: Arc<dyn Prompter>,
    tracked: Mutex<Tracked>,
}

impl PanelRegistry {
    pub fn new(selectors: Selectors, dom: Arc<dyn Dom>, prompter: Arc<dyn Prompter>) -> Self {
        Self {
            selectors,
            dom,
            prompter,
            tracked: Mutex::new(Tracked::default()),
        }
    }

    pub fn has_validator(&self, id: &str) -> bool {
        self.tracked
            .lock()
            .map(|t| t.ids.contains(id))
            .unwrap_or(false)
    }

    /// Attach a validator to panel `id` unless one is already there.
    ///
    /// Returns `Ok(None)` for a missing or already tracked id.  The
    /// membership check, validator construction and insert happen under one
    /// lock; a word list that fails to compile leaves the id untracked.
    pub fn add_validator(
        &self,
        words: &[String],
        id: Option<&str>,
        locale: Locale,
    ) -> Result<Option<Arc<PanelValidator>>, GuardError> {
        let Some(id) = id.filter(|id| !id.is_empty()) else {
            return Ok(None);
        };
        let validator = {
            let Ok(mut tracked) = self.tracked.lock() else {
                return Ok(None);
            };
            if tracked.ids.contains(id) {
                tracing::debug!(panel = %id, "panel already guarded");
                return Ok(None);
            }
            let validator = Arc::new(PanelValidator::new(
                id,
                words,
                locale,
                &self.selectors,
                self.dom.clone(),
                self.prompter.clone(),
            )?);
            tracked.ids.insert(id.to_owned());
            tracked.order.push(id.to_owned());
            tracked.validators.push(validator.clone());
            validator
        };
        // Registered outside the lock; the page may call back into us.
        validator.run();
        Ok(Some(validator))
    }

    /// Selector for the first visible panel button area whose panel carries
    /// an id and is not yet guarded.  Panels without an id are skipped so
    /// they cannot hide the ones after them.
    pub fn target_selector(&self) -> String {
        let mut selector = self.selectors.panel.clone();
        selector.push_str(&self.selectors.has_id());
        if let Ok(tracked) = self.tracked.lock() {
            for id in &tracked.order {
                selector.push_str(&format!(":not({})", self.selectors.id_equals(id)));
            }
        }
        selector.push(' ');
        selector.push_str(&self.selectors.button_area);
        selector
    }

    /// Guarded panel ids in attachment order.
    pub fn tracked_ids(&self) -> Vec<String> {
        self.tracked
            .lock()
            .map(|t| t.order.clone())
            .unwrap_or_default()
    }

    pub fn validator(&self, id: &str) -> Option<Arc<PanelValidator>> {
        self.tracked
            .lock()
            .ok()?
            .validators
            .iter()
            .find(|v| v.panel_id() == id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.tracked.lock().map(|t| t.order.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn selectors(&self) -> &Selectors {
        &self.selectors
    }
}
