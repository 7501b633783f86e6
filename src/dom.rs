//! Boundary to the helpdesk page.
//!
//! The guard never touches a real document directly.  The embedding
//! application implements [`Dom`] and [`Prompter`] over whatever page
//! access it has; tests use in-memory fakes.  All selectors are plain CSS
//! selector strings taken from [`crate::config::Selectors`].

use std::sync::Arc;

/// Handle to an element returned by [`Dom::query`].  Opaque to the guard.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Element(pub u64);

/// A click delivered to a listener.  Listeners flip the flags; the
/// implementation honours them after all listeners have run.
#[derive(Debug, Default)]
pub struct ClickEvent {
    default_prevented: bool,
    propagation_stopped: bool,
}

impl ClickEvent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

pub trait ClickListener: Send + Sync {
    fn on_click(&self, event: &mut ClickEvent);
}

pub trait Dom: Send + Sync {
    /// First element matching `selector`, if any.
    fn query(&self, selector: &str) -> Option<Element>;

    /// Value of `attribute` on `element` or its nearest ancestor carrying it.
    fn closest_attribute(&self, element: &Element, attribute: &str) -> Option<String>;

    /// Inner HTML of the first element matching `selector`.
    fn inner_html(&self, selector: &str) -> Option<String>;

    /// Class list of the first element matching `selector`.
    fn class_list(&self, selector: &str) -> Option<Vec<String>>;

    /// Register `listener` for clicks on elements matching `selector`.
    fn listen_click(&self, selector: &str, listener: Arc<dyn ClickListener>);

    /// Fire a synthetic click on the first element matching `selector`.
    /// Listeners run synchronously before this returns, then the native
    /// action unless a listener prevented it.
    fn dispatch_click(&self, selector: &str);
}

/// Blocking operator dialogs.
pub trait Prompter: Send + Sync {
    /// Text input; `None` when the operator cancels.
    fn prompt(&self, message: &str, default: &str) -> Option<String>;

    /// OK/Cancel; true on OK.
    fn confirm(&self, message: &str) -> bool;

    fn alert(&self, message: &str);
}
