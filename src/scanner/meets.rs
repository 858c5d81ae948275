//! Meets - the user's known words and how often each was met
//!
//! `Meets` is the `word -> encounter count` mapping served by the remote
//! word service. `MeetsCache` holds the last fetched copy; any write to the
//! service (adding or forgetting a scene, toggling a word as known)
//! invalidates it as a whole.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct Meets(HashMap<String, u32>);

impl Meets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a service response: either the bare mapping or `{ "data": mapping }`
    pub fn from_json(json: &str) -> Result<Meets, serde_json::Error> {
        Self::from_value(serde_json::from_str(json)?)
    }

    /// Same as `from_json`, for an already parsed value. Keys are
    /// lowercased like the tokens they are matched against.
    pub fn from_value(mut value: serde_json::Value) -> Result<Meets, serde_json::Error> {
        // a word literally named "data" carries a number, never an object
        let enveloped = match value.get_mut("data") {
            Some(data) if data.is_null() => return Ok(Meets::new()),
            Some(data) if data.is_object() => Some(data.take()),
            _ => None,
        };
        let raw: HashMap<String, u32> = serde_json::from_value(enveloped.unwrap_or(value))?;
        Ok(raw.into_iter().collect())
    }

    pub fn times(&self, word: &str) -> Option<u32> {
        self.0.get(word).copied()
    }

    pub fn insert(&mut self, word: &str, times: u32) {
        self.0.insert(word.to_ascii_lowercase(), times);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, u32)> for Meets {
    fn from_iter<I: IntoIterator<Item = (String, u32)>>(iter: I) -> Self {
        Meets(
            iter.into_iter()
                .map(|(word, times)| (word.to_ascii_lowercase(), times))
                .collect(),
        )
    }
}

// =============================================================================
// MeetsCache
// =============================================================================

/// Single-entry cache, invalidated as a whole
#[derive(Clone, Debug, Default)]
pub struct MeetsCache {
    meets: Meets,
    valid: bool,
    refresh_count: u64,
}

impl MeetsCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// The cached mapping, only while valid
    pub fn get(&self) -> Option<&Meets> {
        self.valid.then_some(&self.meets)
    }

    /// The last stored mapping, valid or not
    pub fn stale(&self) -> &Meets {
        &self.meets
    }

    pub fn store(&mut self, meets: Meets) {
        self.meets = meets;
        self.valid = true;
    }

    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    /// Number of fetches that went through `get_or_refresh`
    pub fn refresh_count(&self) -> u64 {
        self.refresh_count
    }

    /// Serve the cached mapping, fetching a fresh one when invalid.
    ///
    /// On fetch failure the cache stays invalid and the previous mapping
    /// remains reachable through `stale()`.
    pub fn get_or_refresh<E, F>(&mut self, fetch: F) -> Result<&Meets, E>
    where
        F: FnOnce() -> Result<Meets, E>,
    {
        if !self.valid {
            self.refresh_count += 1;
            let meets = fetch()?;
            self.store(meets);
        }
        Ok(&self.meets)
    }
}
