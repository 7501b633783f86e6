use std::sync::Arc;

use regex::RegexSet;

use crate::util::regex_set_for;

/// Returns true when any pattern, read as a regular expression, finds a
/// match anywhere in `text`.  An invalid pattern is an error for the whole
/// list.
pub fn matches(patterns: &[String], text: &str) -> Result<bool, regex::Error> {
    Ok(CompiledPatterns::compile(patterns)?.is_match(text))
}

/// A word list compiled once, held by a validator for its whole lifetime.
#[derive(Clone, Debug)]
pub struct CompiledPatterns {
    patterns: Vec<String>,
    set: Arc<RegexSet>,
}

impl CompiledPatterns {
    pub fn compile(patterns: &[String]) -> Result<Self, regex::Error> {
        let set = regex_set_for(patterns)?;
        Ok(Self {
            patterns: patterns.to_vec(),
            set,
        })
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.set.is_match(text)
    }

    /// Patterns that matched, in word list order.  Used for logging.
    pub fn matching(&self, text: &str) -> Vec<&str> {
        self.set
            .matches(text)
            .into_iter()
            .map(|i| self.patterns[i].as_str())
            .collect()
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
