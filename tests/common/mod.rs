#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use replyguard::dom::{ClickEvent, ClickListener, Dom, Element, Prompter};
use replyguard::store::{HttpFetch, HttpResponse};
use replyguard::waiter::Clock;
use replyguard::Selectors;

/// Tracks environment variable mutations and restores originals on drop.
pub struct EnvGuard {
    originals: HashMap<String, Option<String>>,
}

impl EnvGuard {
    pub fn new() -> Self {
        Self {
            originals: HashMap::new(),
        }
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.capture(key);
        std::env::set_var(key, value);
    }

    pub fn remove(&mut self, key: &str) {
        self.capture(key);
        std::env::remove_var(key);
    }

    fn capture(&mut self, key: &str) {
        if self.originals.contains_key(key) {
            return;
        }
        let original = std::env::var(key).ok();
        self.originals.insert(key.to_string(), original);
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, original) in self.originals.drain() {
            match original {
                Some(value) => std::env::set_var(&key, value),
                None => std::env::remove_var(&key),
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Public,
    Private,
    /// No tab carries the active marker.
    Unselected,
}

struct FakePanel {
    id: String,
    panel_el: u64,
    button_area_el: u64,
    /// Queries to answer with "not rendered" before the panel shows up.
    hidden_polls: usize,
}

#[derive(Default)]
struct DomState {
    next_el: u64,
    parents: HashMap<u64, u64>,
    attrs: HashMap<u64, HashMap<String, String>>,
    panels: Vec<FakePanel>,
    html: HashMap<String, String>,
    classes: HashMap<String, Vec<String>>,
    listeners: HashMap<String, Vec<Arc<dyn ClickListener>>>,
    native_clicks: HashMap<String, usize>,
}

static EXCLUDED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#":not\(\[id="((?:[^"\\]|\\.)*)"\]\)"#).unwrap());
static CSS_ESCAPE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\(.)").unwrap());

/// In-memory helpdesk page.  Understands the registry's "next unguarded
/// panel" selector and the panel-scoped selectors built from `Selectors`;
/// everything else resolves to nothing.
pub struct FakeDom {
    selectors: Selectors,
    state: Mutex<DomState>,
    pub queries: AtomicUsize,
}

impl FakeDom {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            selectors: Selectors::default(),
            state: Mutex::new(DomState::default()),
            queries: AtomicUsize::new(0),
        })
    }

    pub fn open_panel(&self, id: &str, mode: Mode, html: &str) {
        self.open_panel_after(id, mode, html, 0);
    }

    /// Panel that only becomes visible after `hidden_polls` queries.
    pub fn open_panel_after(&self, id: &str, mode: Mode, html: &str, hidden_polls: usize) {
        let mut st = self.state.lock().unwrap();
        let panel_el = st.next_el;
        let button_area_el = st.next_el + 1;
        st.next_el += 2;
        st.attrs
            .insert(panel_el, HashMap::from([("id".to_string(), id.to_string())]));
        st.parents.insert(button_area_el, panel_el);
        st.panels.push(FakePanel {
            id: id.to_string(),
            panel_el,
            button_area_el,
            hidden_polls,
        });
        st.html.insert(self.compose(id), html.to_string());
        drop(st);
        self.set_mode(id, mode);
    }

    /// A button area whose panel lost its id attribute.
    pub fn open_anonymous_panel(&self) {
        let mut st = self.state.lock().unwrap();
        let panel_el = st.next_el;
        let button_area_el = st.next_el + 1;
        st.next_el += 2;
        st.parents.insert(button_area_el, panel_el);
        st.panels.push(FakePanel {
            id: String::new(),
            panel_el,
            button_area_el,
            hidden_polls: 0,
        });
    }

    pub fn set_mode(&self, id: &str, mode: Mode) {
        let key = self.selectors.within_panel(id, &self.selectors.active_mode_tab);
        let mut st = self.state.lock().unwrap();
        match mode {
            Mode::Public => {
                st.classes.insert(
                    key,
                    vec!["ember-view".into(), "btn".into(), "track-id-publicComment".into(), "active".into()],
                );
            }
            Mode::Private => {
                st.classes.insert(
                    key,
                    vec!["ember-view".into(), "btn".into(), "track-id-privateComment".into(), "active".into()],
                );
            }
            Mode::Unselected => {
                st.classes.remove(&key);
            }
        }
    }

    pub fn set_text(&self, id: &str, html: &str) {
        let key = self.compose(id);
        self.state.lock().unwrap().html.insert(key, html.to_string());
    }

    pub fn submit_selector(&self, id: &str) -> String {
        self.selectors.within_panel(id, &self.selectors.submit_button)
    }

    /// Operator clicks the panel's submit button.
    pub fn click_submit(&self, id: &str) {
        self.dispatch_click(&self.submit_selector(id));
    }

    pub fn native_submits(&self, id: &str) -> usize {
        let key = self.submit_selector(id);
        *self.state.lock().unwrap().native_clicks.get(&key).unwrap_or(&0)
    }

    pub fn listener_count(&self, id: &str) -> usize {
        let key = self.submit_selector(id);
        self.state
            .lock()
            .unwrap()
            .listeners
            .get(&key)
            .map(|l| l.len())
            .unwrap_or(0)
    }

    fn compose(&self, id: &str) -> String {
        self.selectors.within_panel(id, &self.selectors.compose_text)
    }

    fn unguarded_prefix(&self) -> &str {
        &self.selectors.panel
    }
}

impl Dom for FakeDom {
    fn query(&self, selector: &str) -> Option<Element> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let suffix = format!(" {}", self.selectors.button_area);
        if !(selector.starts_with(self.unguarded_prefix()) && selector.ends_with(&suffix)) {
            return None;
        }
        let requires_id = selector[self.unguarded_prefix().len()..].starts_with("[id]");
        let excluded: Vec<String> = EXCLUDED_RE
            .captures_iter(selector)
            .map(|c| CSS_ESCAPE_RE.replace_all(&c[1], "$1").into_owned())
            .collect();
        let mut st = self.state.lock().unwrap();
        for panel in st.panels.iter_mut() {
            if panel.hidden_polls > 0 {
                panel.hidden_polls -= 1;
                continue;
            }
            if requires_id && panel.id.is_empty() {
                continue;
            }
            if !excluded.contains(&panel.id) {
                return Some(Element(panel.button_area_el));
            }
        }
        None
    }

    fn closest_attribute(&self, element: &Element, attribute: &str) -> Option<String> {
        let st = self.state.lock().unwrap();
        let mut current = Some(element.0);
        while let Some(el) = current {
            if let Some(value) = st.attrs.get(&el).and_then(|a| a.get(attribute)) {
                return Some(value.clone());
            }
            current = st.parents.get(&el).copied();
        }
        None
    }

    fn inner_html(&self, selector: &str) -> Option<String> {
        self.state.lock().unwrap().html.get(selector).cloned()
    }

    fn class_list(&self, selector: &str) -> Option<Vec<String>> {
        self.state.lock().unwrap().classes.get(selector).cloned()
    }

    fn listen_click(&self, selector: &str, listener: Arc<dyn ClickListener>) {
        self.state
            .lock()
            .unwrap()
            .listeners
            .entry(selector.to_string())
            .or_default()
            .push(listener);
    }

    fn dispatch_click(&self, selector: &str) {
        let listeners = self
            .state
            .lock()
            .unwrap()
            .listeners
            .get(selector)
            .cloned()
            .unwrap_or_default();
        let mut event = ClickEvent::new();
        for listener in listeners {
            listener.on_click(&mut event);
            if event.propagation_stopped() {
                break;
            }
        }
        if !event.default_prevented() {
            *self
                .state
                .lock()
                .unwrap()
                .native_clicks
                .entry(selector.to_string())
                .or_default() += 1;
        }
    }
}

/// Scripted operator.
#[derive(Default)]
pub struct FakePrompter {
    confirm_answers: Mutex<VecDeque<bool>>,
    prompt_answer: Mutex<Option<String>>,
    pub confirms: Mutex<Vec<String>>,
    pub alerts: Mutex<Vec<String>>,
    pub prompts: Mutex<Vec<String>>,
}

impl FakePrompter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn answer_confirm(&self, answer: bool) {
        self.confirm_answers.lock().unwrap().push_back(answer);
    }

    pub fn answer_prompt(&self, answer: Option<&str>) {
        *self.prompt_answer.lock().unwrap() = answer.map(str::to_string);
    }

    pub fn confirm_count(&self) -> usize {
        self.confirms.lock().unwrap().len()
    }

    pub fn alert_messages(&self) -> Vec<String> {
        self.alerts.lock().unwrap().clone()
    }
}

impl Prompter for FakePrompter {
    fn prompt(&self, message: &str, _default: &str) -> Option<String> {
        self.prompts.lock().unwrap().push(message.to_string());
        self.prompt_answer.lock().unwrap().clone()
    }

    fn confirm(&self, message: &str) -> bool {
        self.confirms.lock().unwrap().push(message.to_string());
        self.confirm_answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(false)
    }

    fn alert(&self, message: &str) {
        self.alerts.lock().unwrap().push(message.to_string());
    }
}

/// Clock that never waits; counts the sleeps instead.
#[derive(Default)]
pub struct InstantClock {
    pub sleeps: AtomicUsize,
}

#[async_trait::async_trait]
impl Clock for InstantClock {
    async fn sleep(&self, _duration: Duration) {
        self.sleeps.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
    }
}

/// Serves a fixed response and counts requests.
pub struct StaticFetch {
    status: u16,
    body: String,
    pub calls: AtomicUsize,
}

impl StaticFetch {
    pub fn ok(body: serde_json::Value) -> Arc<Self> {
        Arc::new(Self {
            status: 200,
            body: body.to_string(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn status(status: u16) -> Arc<Self> {
        Arc::new(Self {
            status,
            body: String::new(),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait::async_trait]
impl HttpFetch for StaticFetch {
    async fn get(&self, _url: &str) -> anyhow::Result<HttpResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(HttpResponse {
            status: self.status,
            body: self.body.clone(),
        })
    }
}

pub fn sample_config() -> serde_json::Value {
    serde_json::json!({
        "hosts": ["a.example.com"],
        "targetWords": {
            "common": ["test"],
            "a.example.com": ["foo"]
        }
    })
}
