//! Canned answers for greetings and thanks, served without a provider call.

use crate::Result;
use std::collections::HashMap;

const BUILTIN_TABLE: &str = include_str!("../data/quick_replies.json");

#[derive(Debug, Clone, Default)]
pub struct QuickReplyTable {
    entries: HashMap<String, String>,
}

impl QuickReplyTable {
    /// The table shipped in `data/quick_replies.json`.
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_TABLE)
    }

    /// Parse a JSON object of `trigger -> reply`. Triggers are normalized on load.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: HashMap<String, String> = serde_json::from_str(json)?;
        Ok(raw.into_iter().collect())
    }

    pub fn lookup(&self, message: &str) -> Option<&str> {
        self.entries.get(&normalize(message)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, String)> for QuickReplyTable {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let entries = iter
            .into_iter()
            .map(|(trigger, reply)| (normalize(&trigger), reply))
            .filter(|(trigger, _)| !trigger.is_empty())
            .collect();
        Self { entries }
    }
}

/// Lowercase, collapse whitespace and drop trailing punctuation, so
/// "Halo!!" and "  halo " hit the same entry.
pub fn normalize(message: &str) -> String {
    let collapsed = message
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    collapsed
        .trim_end_matches(|c: char| c.is_ascii_punctuation() || c.is_whitespace())
        .to_string()
}
