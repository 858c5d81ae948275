//! MetCore: in-page word detection and scene extraction
//!
//! A Rust/WASM implementation of the Metwords content-script engine.
//!
//! # Architecture
//!
//! ## DOM (`dom`)
//! - `document.rs` - Arena `Document`: nodes, attributes, tree edits, `split_text`
//! - `range.rs` - `DomRange`: boundary points in UTF-16 offsets, split tracking
//! - `extract.rs` - `extract_contents`: cut a range out, cloning partial ancestors
//! - `html.rs` - HTML loading (scraper) and serialization
//!
//! ## Scanner Components (`scanner`)
//! - `tokenize.rs` - Tokenizer: English word boundaries with UTF-16 offsets
//! - `indexer.rs` - RangeIndexer: first-occurrence range per distinct word
//! - `marker.rs` - Marker: wraps ranges in `<xmetword>` with an encounter count
//! - `scene.rs` - SceneExtractor: sentence around a selection via sentinels
//! - `selection.rs` - Selection qualification (one word, text boundaries)
//! - `meets.rs` - Known-words map and its cache
//! - `page.rs` - Page: annotate / select / plus-one / know pipeline
//! - `change.rs` - ChangeDetector: skip re-annotating unchanged pages
//! - `cortex.rs` - MetCortex: the WASM facade
//!
//! # Usage (WASM)
//! ```javascript,ignore
//! import init, { MetCortex } from 'metcore';
//!
//! await init();
//!
//! const cortex = new MetCortex({ boundary_rule: 'lenient' });
//! cortex.load(document.body.outerHTML);
//! cortex.hydrateMeets(await fetchMeets());   // { hello: 2, world: 1 }
//!
//! const report = cortex.annotate();          // { stats: { marked, ... }, was_skipped }
//!
//! document.body.outerHTML = cortex.html();
//!
//! // mouse-up: text nodes are addressed by document-order ordinal
//! const encounter = cortex.select(3, 6, 3, 11);
//! console.log(encounter.scene.sentence);     // "Hello <xmet>world</xmet>."
//!
//! const bumped = cortex.plusOne();
//! await addScene(cortex.submission(id, location.href));
//! ```

pub mod dom;
pub mod scanner;

// Public exports - Scanner
pub use scanner::*;

// Public exports - DOM
pub use dom::{BoundaryPoint, Document, DomError, DomRange, NodeId};

use wasm_bindgen::prelude::*;

// When the `wee_alloc` feature is enabled, use `wee_alloc` as the global
// allocator for smaller WASM bundle size.
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

/// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn main() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Get version information
#[wasm_bindgen]
pub fn version() -> String {
    format!("metcore v{}", env!("CARGO_PKG_VERSION"))
}
