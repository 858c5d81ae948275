//! ChangeDetector: skip re-annotating unchanged pages
//!
//! Page-ready events fire repeatedly (SPA navigation, lazy content, tab
//! focus). The detector fingerprints the visible text of a document and
//! reports whether it differs from the last annotated version. Marking words
//! never changes text content, so an annotated page fingerprints the same as
//! its pristine source.

use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::dom::Document;

// =============================================================================
// Types
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeResult {
    pub has_changed: bool,
    pub content_hash: u64,
    pub previous_hash: Option<u64>,
}

// =============================================================================
// ChangeDetector
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct ChangeDetector {
    last_hash: Option<u64>,
    check_count: u64,
    skip_count: u64,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fingerprint of a document's text content
    pub fn fingerprint(doc: &Document) -> u64 {
        let mut hasher = DefaultHasher::new();
        for node in doc.text_nodes(doc.root()) {
            if let Some(text) = doc.text(node) {
                hasher.write(text.as_bytes());
            }
        }
        hasher.finish()
    }

    /// Compare a document against the last checked one
    pub fn check_document(&mut self, doc: &Document) -> ChangeResult {
        self.record(Self::fingerprint(doc))
    }

    /// Compare raw text against the last checked content
    pub fn check(&mut self, text: &str) -> ChangeResult {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        self.record(hasher.finish())
    }

    fn record(&mut self, content_hash: u64) -> ChangeResult {
        self.check_count += 1;
        let previous_hash = self.last_hash.replace(content_hash);
        let has_changed = previous_hash != Some(content_hash);
        if !has_changed {
            self.skip_count += 1;
        }
        ChangeResult {
            has_changed,
            content_hash,
            previous_hash,
        }
    }

    /// Percentage of checks that found nothing new
    pub fn skip_rate(&self) -> f64 {
        if self.check_count == 0 {
            return 0.0;
        }
        (self.skip_count as f64 / self.check_count as f64) * 100.0
    }

    pub fn check_count(&self) -> u64 {
        self.check_count
    }

    pub fn skip_count(&self) -> u64 {
        self.skip_count
    }

    pub fn last_hash(&self) -> Option<u64> {
        self.last_hash
    }

    /// Forget the last fingerprint; the next check always reports a change
    pub fn reset(&mut self) {
        self.last_hash = None;
        self.check_count = 0;
        self.skip_count = 0;
    }
}

// =============================================================================
// Tests
// =============================================================================
