use serde::{Deserialize, Serialize};

/// Maximum number of remembered searches.
pub const HISTORY_LIMIT: usize = 5;

/// Recently searched city names, most recent first.
///
/// Names are unique (exact, case-sensitive match) and the list never grows
/// past [`HISTORY_LIMIT`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct History {
    entries: Vec<String>,
}

impl History {
    /// Builds a history from persisted entries, dropping duplicates and
    /// anything past the limit.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut history = Self::default();
        for entry in entries {
            if history.entries.len() == HISTORY_LIMIT {
                break;
            }
            if !history.entries.contains(&entry) {
                history.entries.push(entry);
            }
        }
        history
    }

    /// Moves `name` to the front, removing any earlier occurrence.
    pub fn record(&mut self, name: &str) {
        self.entries.retain(|entry| entry != name);
        self.entries.insert(0, name.to_owned());
        self.entries.truncate(HISTORY_LIMIT);
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Vec<String>> for History {
    fn from(entries: Vec<String>) -> Self {
        Self::from_entries(entries)
    }
}

impl From<History> for Vec<String> {
    fn from(history: History) -> Self {
        history.entries
    }
}
