use std::sync::{Arc, Mutex};

use crate::config::Selectors;
use crate::dom::{ClickEvent, ClickListener, Dom, Prompter};
use crate::error::GuardError;
use crate::locale::Locale;
use crate::matcher::CompiledPatterns;
use crate::util::strip_markup;

/// Where a validator is in the intercept/confirm/resubmit cycle.
///
/// `Idle -> Confirming -> Idle` when the operator declines, and
/// `Idle -> Confirming -> Bypassing -> Idle` when they accept.  `Bypassing`
/// lasts exactly as long as the synthetic re-dispatch, so the only click
/// that can observe it is the validator's own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    Idle,
    Confirming,
    Bypassing,
}

/// What a single click resulted in.  Recorded for logs and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickDecision {
    /// Not public or no NG word: native action untouched.
    Allowed,
    /// Own synthetic click passed through.
    Bypassed,
    /// Intercepted and the operator cancelled.
    Declined,
    /// Intercepted, confirmed and re-dispatched.
    Resubmitted,
    /// Click arrived while a confirmation was already open.
    Swallowed,
}

/// Confirm-before-send guard for one panel's submit control.
pub struct PanelValidator {
    panel_id: String,
    target: String,
    compose_text: String,
    active_mode_tab: String,
    public_mode_class: String,
    words: CompiledPatterns,
    locale: Locale,
    dom: Arc<dyn Dom>,
    prompter: Arc<dyn Prompter>,
    state: Mutex<GuardState>,
    last_decision: Mutex<Option<ClickDecision>>,
}

impl PanelValidator {
    /// Compile `words` and bind to the panel identified by `panel_id`.
    /// A word that is not a valid regex fails construction.
    pub fn new(
        panel_id: &str,
        words: &[String],
        locale: Locale,
        selectors: &Selectors,
        dom: Arc<dyn Dom>,
        prompter: Arc<dyn Prompter>,
    ) -> Result<Self, GuardError> {
        let words = CompiledPatterns::compile(words)?;
        Ok(Self {
            panel_id: panel_id.to_owned(),
            target: selectors.within_panel(panel_id, &selectors.submit_button),
            compose_text: selectors.within_panel(panel_id, &selectors.compose_text),
            active_mode_tab: selectors.within_panel(panel_id, &selectors.active_mode_tab),
            public_mode_class: selectors.public_mode_class.clone(),
            words,
            locale,
            dom,
            prompter,
            state: Mutex::new(GuardState::Idle),
            last_decision: Mutex::new(None),
        })
    }

    /// Install the click listener.  Called once by the registry.
    pub fn run(self: &Arc<Self>) {
        let listener: Arc<dyn ClickListener> = self.clone();
        self.dom.listen_click(&self.target, listener);
        tracing::info!(
            panel = %self.panel_id,
            words = self.words.len(),
            locale = self.locale.as_str(),
            "validator attached"
        );
    }

    pub fn panel_id(&self) -> &str {
        &self.panel_id
    }

    pub fn target_selector(&self) -> &str {
        &self.target
    }

    pub fn state(&self) -> GuardState {
        self.state.lock().map(|s| *s).unwrap_or(GuardState::Idle)
    }

    pub fn last_decision(&self) -> Option<ClickDecision> {
        self.last_decision.lock().ok().and_then(|d| *d)
    }

    /// Plain text of the panel's compose region.
    pub fn reply_text(&self) -> String {
        self.dom
            .inner_html(&self.compose_text)
            .map(|html| strip_markup(&html))
            .unwrap_or_default()
    }

    /// True when the active compose tab is the public-reply tab.  No active
    /// tab means not public.
    pub fn is_public_response(&self) -> bool {
        self.dom
            .class_list(&self.active_mode_tab)
            .map(|classes| classes.iter().any(|c| *c == self.public_mode_class))
            .unwrap_or(false)
    }

    fn set_state(&self, next: GuardState) {
        if let Ok(mut state) = self.state.lock() {
            *state = next;
        }
    }

    fn record(&self, decision: ClickDecision) -> ClickDecision {
        if let Ok(mut last) = self.last_decision.lock() {
            *last = Some(decision);
        }
        decision
    }

    fn handle_click(&self, event: &mut ClickEvent) -> ClickDecision {
        // Claim the click under the lock, release before any dialog or
        // re-dispatch so the synthetic click can read the state.
        let text = {
            let Ok(mut state) = self.state.lock() else {
                return ClickDecision::Allowed;
            };
            match *state {
                GuardState::Bypassing => return ClickDecision::Bypassed,
                GuardState::Confirming => {
                    event.prevent_default();
                    event.stop_propagation();
                    return ClickDecision::Swallowed;
                }
                GuardState::Idle => {}
            }

            if !self.is_public_response() {
                return ClickDecision::Allowed;
            }
            let text = self.reply_text();
            if !self.words.is_match(&text) {
                return ClickDecision::Allowed;
            }
            tracing::info!(
                panel = %self.panel_id,
                matched = ?self.words.matching(&text),
                "NG word in public reply, asking for confirmation"
            );
            event.prevent_default();
            event.stop_propagation();
            *state = GuardState::Confirming;
            text
        };

        let message = self.locale.confirm_text(&text);
        if !self.prompter.confirm(&message) {
            self.set_state(GuardState::Idle);
            tracing::info!(panel = %self.panel_id, "operator cancelled reply");
            return ClickDecision::Declined;
        }

        self.set_state(GuardState::Bypassing);
        self.dom.dispatch_click(&self.target);
        self.set_state(GuardState::Idle);
        tracing::info!(panel = %self.panel_id, "operator confirmed reply, resubmitted");
        ClickDecision::Resubmitted
    }
}

impl ClickListener for PanelValidator {
    fn on_click(&self, event: &mut ClickEvent) {
        let decision = self.handle_click(event);
        self.record(decision);
        tracing::debug!(panel = %self.panel_id, decision = ?decision, "click handled");
    }
}

impl std::fmt::Debug for PanelValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PanelValidator")
            .field("panel_id", &self.panel_id)
            .field("target", &self.target)
            .field("words", &self.words.patterns())
            .field("locale", &self.locale)
            .field("state", &self.state())
            .finish()
    }
}
