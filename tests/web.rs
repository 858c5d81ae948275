//! Browser smoke tests for the WASM facade
#![cfg(target_arch = "wasm32")]

use metcore::{AnnotateReport, Encounter, MetCortex};
use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

const PAGE: &str = "<p>Hello world. The second paragraph starts here.</p>";

fn cortex() -> MetCortex {
    let mut cortex = MetCortex::new(JsValue::NULL).unwrap();
    cortex.js_load(PAGE);
    let meets = js_sys::JSON::parse(r#"{"data": {"world": 2}}"#).unwrap();
    cortex.js_hydrate_meets(meets).unwrap();
    cortex
}

#[wasm_bindgen_test]
fn test_version() {
    assert!(metcore::version().starts_with("metcore v"));
}

#[wasm_bindgen_test]
fn test_config_from_js_object() {
    let config = js_sys::JSON::parse(r#"{"boundary_rule": "capitalized"}"#).unwrap();
    assert!(MetCortex::new(config).is_ok());

    let bad = js_sys::JSON::parse(r#"{"boundary_rule": "sometimes"}"#).unwrap();
    assert!(MetCortex::new(bad).is_err());
}

#[wasm_bindgen_test]
fn test_annotate_round_trip() {
    let mut cortex = cortex();
    let report: AnnotateReport = serde_wasm_bindgen::from_value(cortex.js_annotate().unwrap()).unwrap();
    assert_eq!(report.stats.marked, 1);
    assert!(!report.was_skipped);
    assert!(cortex.js_html().contains("data-times=\"--\""));
}

#[wasm_bindgen_test]
fn test_select_and_plus_one() {
    let mut cortex = cortex();
    let encounter: Encounter = serde_wasm_bindgen::from_value(cortex.js_select(0, 6, 0, 11).unwrap()).unwrap();
    assert_eq!(encounter.word, "world");
    assert_eq!(encounter.scene.sentence, "Hello <xmet>world</xmet>.");

    let bumped: Encounter = serde_wasm_bindgen::from_value(cortex.js_plus_one().unwrap()).unwrap();
    assert_eq!(bumped.times, 3);
    assert!(!cortex.meets_valid());
}

#[wasm_bindgen_test]
fn test_rejected_selection_is_an_error() {
    let mut cortex = cortex();
    assert!(cortex.js_select(0, 0, 0, 11).is_err());
    assert_eq!(cortex.js_selected_word(" Hello "), Some("hello".to_string()));
}

#[wasm_bindgen_test]
fn test_hydrate_plain_object_then_select_after_annotate() {
    let mut cortex = MetCortex::new(JsValue::NULL).unwrap();
    cortex.js_load(PAGE);
    let meets = js_sys::JSON::parse(r#"{"World": 2, "paragraph": 1}"#).unwrap();
    cortex.js_hydrate_meets(meets).unwrap();

    let report: AnnotateReport = serde_wasm_bindgen::from_value(cortex.js_annotate().unwrap()).unwrap();
    assert_eq!(report.stats.marked, 2);

    // "Hello ", "world", ". The second ", "paragraph", " starts here."
    let encounter: Encounter = serde_wasm_bindgen::from_value(cortex.js_select(1, 0, 1, 5).unwrap()).unwrap();
    assert_eq!(encounter.word, "world");
    assert_eq!(encounter.times, 2);
}
