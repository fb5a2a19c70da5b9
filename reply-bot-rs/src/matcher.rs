use regex::{Regex, RegexBuilder};

use crate::error::{BotError, Result};

/// Compiled trigger patterns, evaluated in configuration order
#[derive(Debug, Clone)]
pub struct TriggerMatcher {
    patterns: Vec<(String, Regex)>,
}

impl TriggerMatcher {
    /// Compile every trigger case-insensitively; the first invalid pattern is an error
    pub fn new(triggers: &[String]) -> Result<Self> {
        let patterns = triggers
            .iter()
            .map(|trigger| {
                compile(trigger)
                    .map(|re| (trigger.clone(), re))
                    .map_err(|source| BotError::InvalidTrigger {
                        pattern: trigger.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { patterns })
    }

    /// Whether any trigger occurs anywhere in `text`
    pub fn matches(&self, text: &str) -> bool {
        self.first_match(text).is_some()
    }

    /// The earliest configured trigger that matches `text`
    pub fn first_match(&self, text: &str) -> Option<&str> {
        self.patterns
            .iter()
            .find(|(_, re)| re.is_match(text))
            .map(|(trigger, _)| trigger.as_str())
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

fn compile(pattern: &str) -> std::result::Result<Regex, regex::Error> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .unicode(true)
        .build()
}

/// One-shot form of [`TriggerMatcher::matches`]. Patterns that fail to
/// compile are treated as non-matching.
pub fn matches(text: &str, triggers: &[String]) -> bool {
    triggers
        .iter()
        .filter_map(|trigger| compile(trigger).ok())
        .any(|re| re.is_match(text))
}
