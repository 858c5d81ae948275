//! MetCortex: the WASM entry point
//!
//! One object per tab. The content script hands over the page HTML, the
//! known-words map fetched from the word service, and user selections
//! (text nodes addressed by their document-order ordinal in the current
//! `html()`, which the page keeps normalized). Everything else
//! happens on the Rust side; results come back as plain JS objects.
//!
//! The known-words map lives in a `MeetsCache`. Actions that write to the
//! service (`plusOne`, `know`) invalidate it; the JS side refetches and
//! calls `hydrateMeets` when `meetsValid()` turns false.

use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

use super::change::ChangeDetector;
use super::config::MetConfig;
use super::meets::{Meets, MeetsCache};
use super::page::{AnnotateStats, Encounter, Page, PageError};
use super::scene::{Scene, SceneSubmission};
use super::tokenize::{selected_word, Tokenizer, WordIndex};
use crate::dom::{BoundaryPoint, DomRange};

// =============================================================================
// Types
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AnnotateReport {
    pub stats: AnnotateStats,
    /// Content hash as hex string (u64 would overflow JS Number.MAX_SAFE_INTEGER)
    pub content_hash: String,
    pub was_skipped: bool,
    pub elapsed_ms: f64,
}

// =============================================================================
// MetCortex
// =============================================================================

#[wasm_bindgen]
pub struct MetCortex {
    config: MetConfig,
    tokenizer: Tokenizer,
    page: Option<Page>,
    meets: MeetsCache,
    change_detector: ChangeDetector,
    last_report: Option<AnnotateReport>,
}

impl Default for MetCortex {
    fn default() -> Self {
        Self::with_config(MetConfig::default())
    }
}

#[wasm_bindgen]
impl MetCortex {
    /// # Arguments
    /// * `config` - Optional configuration object, see `MetConfig`
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<MetCortex, JsValue> {
        let config: MetConfig = if config.is_null() || config.is_undefined() {
            MetConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config)
                .map_err(|e| JsValue::from_str(&format!("Invalid config: {}", e)))?
        };
        Ok(Self::with_config(config))
    }

    /// Replace the current page with freshly loaded HTML
    #[wasm_bindgen(js_name = load)]
    pub fn js_load(&mut self, html: &str) {
        self.load(html);
    }

    /// Store the known-words map: `{ word: times }` or `{ data: { word: times } }`
    #[wasm_bindgen(js_name = hydrateMeets)]
    pub fn js_hydrate_meets(&mut self, meets: JsValue) -> Result<(), JsValue> {
        let value: serde_json::Value = serde_wasm_bindgen::from_value(meets)
            .map_err(|e| JsValue::from_str(&format!("Invalid meets: {}", e)))?;
        let meets = Meets::from_value(value)
            .map_err(|e| JsValue::from_str(&format!("Invalid meets: {}", e)))?;
        self.hydrate_meets(meets);
        Ok(())
    }

    #[wasm_bindgen(js_name = invalidateMeets)]
    pub fn js_invalidate_meets(&mut self) {
        self.meets.invalidate();
    }

    #[wasm_bindgen(js_name = meetsValid)]
    pub fn meets_valid(&self) -> bool {
        self.meets.is_valid()
    }

    /// Mark known words on the loaded page
    #[wasm_bindgen(js_name = annotate)]
    pub fn js_annotate(&mut self) -> Result<JsValue, JsValue> {
        if !self.meets.is_valid() {
            web_sys::console::warn_1(&"[MetCortex] Annotating with a stale meets map".into());
        }
        let report = self.annotate().map_err(|e| JsValue::from_str(&e.to_string()))?;
        to_js(&report)
    }

    /// Handle a mouse-up selection
    #[wasm_bindgen(js_name = select)]
    pub fn js_select(
        &mut self,
        start_text: usize,
        start_offset: usize,
        end_text: usize,
        end_offset: usize,
    ) -> Result<JsValue, JsValue> {
        let encounter = self
            .select(start_text, start_offset, end_text, end_offset)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        to_js(&encounter)
    }

    #[wasm_bindgen(js_name = plusOne)]
    pub fn js_plus_one(&mut self) -> Result<JsValue, JsValue> {
        let encounter = self.plus_one().map_err(|e| JsValue::from_str(&e.to_string()))?;
        to_js(&encounter)
    }

    #[wasm_bindgen(js_name = know)]
    pub fn js_know(&mut self) -> Result<String, JsValue> {
        self.know().map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Sentence around the selected word
    #[wasm_bindgen(js_name = scene)]
    pub fn js_scene(&self) -> Result<JsValue, JsValue> {
        let scene = self.scene().map_err(|e| JsValue::from_str(&e.to_string()))?;
        to_js(&scene)
    }

    /// Request body for the word service's "add scene" endpoint
    #[wasm_bindgen(js_name = submission)]
    pub fn js_submission(&self, id: &str, url: &str) -> Result<JsValue, JsValue> {
        let submission = self.submission(id, url).map_err(|e| JsValue::from_str(&e.to_string()))?;
        to_js(&submission)
    }

    #[wasm_bindgen(js_name = clearSelection)]
    pub fn js_clear_selection(&mut self) {
        self.clear_selection();
    }

    /// Serialized page, empty when nothing is loaded
    #[wasm_bindgen(js_name = html)]
    pub fn js_html(&self) -> String {
        self.html().unwrap_or_default()
    }

    #[wasm_bindgen(js_name = tokenize)]
    pub fn js_tokenize(&self, text: &str) -> JsValue {
        let tokens: Vec<WordIndex> = self.tokenizer.tokenize(text);
        to_js(&tokens).unwrap_or(JsValue::NULL)
    }

    #[wasm_bindgen(js_name = selectedWord)]
    pub fn js_selected_word(&self, raw: &str) -> Option<String> {
        selected_word(raw)
    }

    #[wasm_bindgen(js_name = skipRate)]
    pub fn skip_rate(&self) -> f64 {
        self.change_detector.skip_rate()
    }

    /// Forget the rescan fingerprint and the last report
    #[wasm_bindgen(js_name = reset)]
    pub fn js_reset(&mut self) {
        self.reset();
    }
}

fn elapsed_ms(since: instant::Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(|e| {
        web_sys::console::error_1(&format!("[MetCortex] Serialization failed: {:?}", e).into());
        JsValue::from_str(&format!("Serialization failed: {}", e))
    })
}

impl MetCortex {
    pub fn with_config(config: MetConfig) -> Self {
        Self {
            tokenizer: Tokenizer::new(config.min_word_len),
            config,
            page: None,
            meets: MeetsCache::new(),
            change_detector: ChangeDetector::new(),
            last_report: None,
        }
    }

    pub fn config(&self) -> &MetConfig {
        &self.config
    }

    pub fn page(&self) -> Option<&Page> {
        self.page.as_ref()
    }

    fn page_mut(&mut self) -> Result<&mut Page, PageError> {
        self.page.as_mut().ok_or(PageError::NotLoaded)
    }

    pub fn load(&mut self, html: &str) {
        self.page = Some(Page::from_html(html, &self.config));
        self.reset();
    }

    /// New meets can change counts, so the next annotate always runs
    pub fn hydrate_meets(&mut self, meets: Meets) {
        self.meets.store(meets);
        self.reset();
    }

    pub fn meets(&self) -> &MeetsCache {
        &self.meets
    }

    /// Annotate the page, or replay the last report when neither the page
    /// text nor the meets changed since
    pub fn annotate(&mut self) -> Result<AnnotateReport, PageError> {
        let started = instant::Instant::now();
        let page = self.page.as_mut().ok_or(PageError::NotLoaded)?;
        let change = self.change_detector.check_document(page.document());
        let content_hash = format!("{:x}", change.content_hash);

        if !change.has_changed {
            if let Some(last) = &self.last_report {
                return Ok(AnnotateReport {
                    was_skipped: true,
                    content_hash,
                    elapsed_ms: elapsed_ms(started),
                    ..last.clone()
                });
            }
        }

        let stats = page.annotate(self.meets.stale())?;
        let report = AnnotateReport {
            stats,
            content_hash,
            was_skipped: false,
            elapsed_ms: elapsed_ms(started),
        };
        self.last_report = Some(report.clone());
        Ok(report)
    }

    /// Select the text between two `(text node ordinal, UTF-16 offset)` points.
    ///
    /// Ordinals count the text nodes of the current `html()`, so they stay
    /// valid across `annotate` and earlier selections.
    pub fn select(
        &mut self,
        start_text: usize,
        start_offset: usize,
        end_text: usize,
        end_offset: usize,
    ) -> Result<Encounter, PageError> {
        let page = self.page.as_mut().ok_or(PageError::NotLoaded)?;
        let start = page
            .text_node(start_text)
            .ok_or(PageError::UnknownTextNode(start_text))?;
        let end = page
            .text_node(end_text)
            .ok_or(PageError::UnknownTextNode(end_text))?;
        let range = DomRange::new(
            BoundaryPoint::new(start, start_offset),
            BoundaryPoint::new(end, end_offset),
        );
        page.select(&range, self.meets.stale())
    }

    /// Count one more encounter; the service copy of meets is now outdated
    pub fn plus_one(&mut self) -> Result<Encounter, PageError> {
        let encounter = self.page_mut()?.plus_one()?;
        self.meets.invalidate();
        Ok(encounter)
    }

    pub fn know(&mut self) -> Result<String, PageError> {
        let word = self.page_mut()?.know()?;
        self.meets.invalidate();
        Ok(word)
    }

    pub fn scene(&self) -> Result<Scene, PageError> {
        self.page.as_ref().ok_or(PageError::NotLoaded)?.scene()
    }

    pub fn submission(&self, id: &str, url: &str) -> Result<SceneSubmission, PageError> {
        Ok(self.scene()?.submission(id, url))
    }

    pub fn clear_selection(&mut self) {
        if let Some(page) = self.page.as_mut() {
            page.clear_selection();
        }
    }

    pub fn html(&self) -> Option<String> {
        self.page.as_ref().map(Page::html)
    }

    pub fn reset(&mut self) {
        self.change_detector.reset();
        self.last_report = None;
    }

    pub fn last_report(&self) -> Option<&AnnotateReport> {
        self.last_report.as_ref()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = "<p>Hello world. The second paragraph starts here.</p>";

    fn cortex_with(pairs: &[(&str, u32)]) -> MetCortex {
        let mut cortex = MetCortex::default();
        cortex.load(PAGE);
        cortex.hydrate_meets(pairs.iter().map(|(w, t)| (w.to_string(), *t)).collect());
        cortex
    }

    #[test]
    fn test_requires_loaded_page() {
        let mut cortex = MetCortex::default();
        assert!(matches!(cortex.annotate(), Err(PageError::NotLoaded)));
        assert!(matches!(cortex.select(0, 0, 0, 1), Err(PageError::NotLoaded)));
        assert!(cortex.html().is_none());
    }

    #[test]
    fn test_annotate_then_skip_unchanged() {
        let mut cortex = cortex_with(&[("world", 2), ("paragraph", 1)]);

        let first = cortex.annotate().unwrap();
        assert!(!first.was_skipped);
        assert_eq!(first.stats.known, 2);
        assert_eq!(first.stats.marked, 2);

        let second = cortex.annotate().unwrap();
        assert!(second.was_skipped);
        assert_eq!(second.stats, first.stats);
        assert_eq!(second.content_hash, first.content_hash);
    }

    #[test]
    fn test_new_meets_refresh_existing_markers() {
        let mut cortex = cortex_with(&[("world", 2)]);
        cortex.annotate().unwrap();

        cortex.hydrate_meets([("world".to_string(), 5)].into_iter().collect());
        let report = cortex.annotate().unwrap();
        assert!(!report.was_skipped);
        assert_eq!(report.stats.refreshed, 1);
        assert_eq!(report.stats.marked, 0);
        assert!(cortex.html().unwrap().contains("data-times=\"-----\""));
    }

    #[test]
    fn test_select_and_write_actions_invalidate_meets() {
        let mut cortex = cortex_with(&[("world", 1)]);
        let encounter = cortex.select(0, 6, 0, 11).unwrap();
        assert_eq!(encounter.word, "world");
        assert_eq!(encounter.times, 1);
        assert!(cortex.meets().is_valid());

        let bumped = cortex.plus_one().unwrap();
        assert_eq!(bumped.times, 2);
        assert!(!cortex.meets().is_valid());

        let submission = cortex.submission("7", "https://example.com/a").unwrap();
        assert_eq!(submission.text, "Hello <xmet>world</xmet>.");
        assert_eq!(submission.id, "7");
    }

    #[test]
    fn test_select_by_ordinal_after_annotate() {
        let mut cortex = cortex_with(&[("world", 2), ("paragraph", 1)]);
        cortex.annotate().unwrap();
        // "Hello ", "world", ". The second ", "paragraph", " starts here."

        let annotated = cortex.select(3, 0, 3, 9).unwrap();
        assert_eq!(annotated.word, "paragraph");
        assert_eq!(annotated.times, 1);
        assert_eq!(annotated.scene.sentence, "The second <xmet>paragraph</xmet> starts here.");

        let plain = cortex.select(4, 1, 4, 7).unwrap();
        assert_eq!(plain.word, "starts");
        assert_eq!(plain.times, 0);
        assert_eq!(plain.scene.sentence, "The second paragraph <xmet>starts</xmet> here.");

        let html = cortex.html().unwrap();
        assert_eq!(html.matches("<xmetword").count(), 3);
        assert_eq!(html.matches("metword-selected").count(), 1);

        // ordinals still line up with what the tab shows after re-rendering
        let page = cortex.page().unwrap();
        let reparsed = crate::dom::Document::parse_html(&html);
        assert_eq!(
            page.document().text_nodes(page.document().root()).len(),
            reparsed.text_nodes(reparsed.root()).len()
        );
        let here = page.text_node(6).unwrap();
        assert_eq!(page.document().text(here), Some(" here."));
    }

    #[test]
    fn test_unknown_text_ordinal() {
        let mut cortex = cortex_with(&[]);
        assert!(matches!(
            cortex.select(0, 0, 9, 1),
            Err(PageError::UnknownTextNode(9))
        ));
    }
}
