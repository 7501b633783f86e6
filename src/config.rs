use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use regex::Regex;

use crate::locale::Locale;

pub const DEFAULT_STORAGE_KEY: &str = "replyguardConfigURL";
pub const DEFAULT_TICKET_PATH: &str = r"^/agent/tickets/\d+";

/// Selectors describing the helpdesk page.  These are constants of the
/// page layout, not computed by the guard.
#[derive(Debug, Clone)]
pub struct Selectors {
    /// A visible ticket panel (workspace).
    pub panel: String,
    /// Attribute on the panel element that identifies it.
    pub panel_id_attribute: String,
    /// Footer area holding the submit control, relative to a panel.
    pub button_area: String,
    /// The submit control, relative to a panel.
    pub submit_button: String,
    /// Currently active compose-mode tab, relative to a panel.
    pub active_mode_tab: String,
    /// Class carried by the public-reply tab.
    pub public_mode_class: String,
    /// Rich text compose region, relative to a panel.
    pub compose_text: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            panel: "div.ember-view.workspace:not([style*=\"display: none\"])".to_owned(),
            panel_id_attribute: "id".to_owned(),
            button_area: "footer .ticket-resolution-footer-pane".to_owned(),
            submit_button: "footer .ticket-resolution-footer-pane button.save".to_owned(),
            active_mode_tab: ".comment_input_wrapper .header .active".to_owned(),
            public_mode_class: "track-id-publicComment".to_owned(),
            compose_text: ".comment_input_wrapper .zendesk-editor--rich-text-comment".to_owned(),
        }
    }
}

impl Selectors {
    /// `relative` scoped to the panel whose id attribute is `panel_id`.
    pub fn within_panel(&self, panel_id: &str, relative: &str) -> String {
        format!("{}{} {}", self.panel, self.id_equals(panel_id), relative)
    }

    /// `[attr="id"]` with the id quoted as a CSS string.
    pub fn id_equals(&self, panel_id: &str) -> String {
        format!("[{}=\"{}\"]", self.panel_id_attribute, css_string_escape(panel_id))
    }

    /// `[attr]`: the panel carries an id at all.
    pub fn has_id(&self) -> String {
        format!("[{}]", self.panel_id_attribute)
    }
}

/// Escape `value` for use inside a double-quoted CSS string.
pub fn css_string_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[derive(Debug, Clone)]
pub struct GuardSettings {
    pub storage_key: String,
    /// Durable store backing file.  `None` keeps the URL in memory only.
    pub store_path: Option<PathBuf>,
    pub locale: Locale,
    pub ticket_path: Regex,
    pub wait_timeout: Duration,
    pub poll_interval: Duration,
    pub fetch_timeout: Duration,
    pub log_stdout: bool,
    pub selectors: Selectors,
}

impl Default for GuardSettings {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_owned(),
            store_path: None,
            locale: Locale::default(),
            ticket_path: default_ticket_path(),
            wait_timeout: crate::waiter::DEFAULT_TIMEOUT,
            poll_interval: crate::waiter::DEFAULT_INTERVAL,
            fetch_timeout: Duration::from_millis(5_000),
            log_stdout: false,
            selectors: Selectors::default(),
        }
    }
}

fn default_ticket_path() -> Regex {
    Regex::new(DEFAULT_TICKET_PATH).unwrap()
}

impl GuardSettings {
    pub fn from_env() -> Result<Self> {
        let storage_key = env::var("REPLYGUARD_STORAGE_KEY")
            .ok()
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_STORAGE_KEY.to_owned());

        let store_path = env::var("REPLYGUARD_STORE_PATH")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        // Read once; fixed for the process lifetime.
        let language = env::var("REPLYGUARD_LANG")
            .or_else(|_| env::var("LANG"))
            .unwrap_or_default();
        let locale = Locale::from_language(&language);

        let ticket_path = match env::var("REPLYGUARD_TICKET_PATH") {
            Ok(raw) if !raw.trim().is_empty() => Regex::new(raw.trim()).with_context(|| {
                format!("Failed to parse REPLYGUARD_TICKET_PATH '{}': invalid regex", raw)
            })?,
            _ => default_ticket_path(),
        };

        let wait_timeout_ms = parse_optional_u64("REPLYGUARD_WAIT_TIMEOUT_MS")?.unwrap_or(10_000);
        let poll_interval_ms = parse_optional_u64("REPLYGUARD_POLL_INTERVAL_MS")?
            .filter(|n| *n > 0)
            .unwrap_or(100);
        let fetch_timeout_ms = parse_optional_u64("REPLYGUARD_FETCH_TIMEOUT_MS")?.unwrap_or(5_000);
        let log_stdout = parse_bool_env("REPLYGUARD_LOG_STDOUT")?.unwrap_or(false);

        Ok(Self {
            storage_key,
            store_path,
            locale,
            ticket_path,
            wait_timeout: Duration::from_millis(wait_timeout_ms),
            poll_interval: Duration::from_millis(poll_interval_ms),
            fetch_timeout: Duration::from_millis(fetch_timeout_ms),
            log_stdout,
            selectors: Selectors::default(),
        })
    }
}

fn parse_optional_u64(var: &str) -> Result<Option<u64>> {
    match env::var(var) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| anyhow!("{} must be a positive integer", var)),
        Ok(_) => Ok(None),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

fn parse_bool_env(var: &str) -> Result<Option<bool>> {
    match env::var(var) {
        Ok(value) if !value.trim().is_empty() => parse_bool(&value)
            .map(Some)
            .ok_or_else(|| anyhow!("{} must be a boolean (true/false/1/0)", var)),
        Ok(_) => Ok(None),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
