use std::collections::BTreeMap;

use clausemap_engine::{DecompositionRecord, EngineConfig, OrderTable, Pipeline};
use clausemap_parser::GreedyParser;
use serde::Serialize;
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
}

/// The structured response sent back to JavaScript.
#[derive(Serialize)]
pub struct AnalysisReport {
    pub record: DecompositionRecord,
    /// Same content as `record`, keyed by slot path for table views.
    pub flat: BTreeMap<String, String>,
}

impl From<DecompositionRecord> for AnalysisReport {
    fn from(record: DecompositionRecord) -> Self {
        Self { flat: record.to_flat(), record }
    }
}

fn browser_config(toml: Option<String>) -> Result<EngineConfig, JsValue> {
    let mut config = match toml {
        Some(source) => EngineConfig::from_toml_str(&source).map_err(to_js)?,
        None => EngineConfig::default(),
    };
    // No monotonic clock or threads on wasm32-unknown-unknown.
    config.deadline_ms = 0;
    config.parallel_scoring = false;
    Ok(config)
}

fn to_js(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// The engine instance running in the browser.
#[wasm_bindgen]
pub struct ClausemapEngine {
    pipeline: Pipeline,
}

#[wasm_bindgen]
impl ClausemapEngine {
    /// `config` is optional TOML text, e.g. fetched next to the page.
    #[wasm_bindgen(constructor)]
    pub fn new(config: Option<String>) -> Result<ClausemapEngine, JsValue> {
        let pipeline = Pipeline::with_parser(Box::new(GreedyParser::new()), browser_config(config)?).map_err(to_js)?;
        Ok(Self { pipeline })
    }

    /// Text -> parse -> coordinate -> JSON.
    pub fn analyze(&self, input: &str) -> Result<JsValue, JsValue> {
        let record = self.pipeline.decompose_text(input).map_err(to_js)?;
        serde_wasm_bindgen::to_value(&AnalysisReport::from(record)).map_err(JsValue::from)
    }

    /// Loads an order-table snapshot produced by `clausemap-batch compile-order`.
    #[wasm_bindgen(js_name = loadOrderTable)]
    pub fn load_order_table(&self, snapshot: &[u8]) -> Result<String, JsValue> {
        let table = OrderTable::from_snapshot(snapshot).map_err(to_js)?;
        let v_group = table.v_group.clone();
        self.pipeline.orders().insert(table);
        Ok(v_group)
    }

    /// Like `analyze`, with the slots laid out in the columns of a loaded group.
    #[wasm_bindgen(js_name = analyzeInGroup)]
    pub fn analyze_in_group(&self, input: &str, v_group: &str) -> Result<JsValue, JsValue> {
        let record = self.pipeline.decompose_text(input).map_err(to_js)?;
        let assignment = self
            .pipeline
            .orders()
            .assign_loaded(v_group, &record.result.slots)
            .ok_or_else(|| to_js(format!("no order table loaded for '{}'", v_group)))?;
        let record = record.with_assignment(v_group, assignment);
        serde_wasm_bindgen::to_value(&AnalysisReport::from(record)).map_err(JsValue::from)
    }
}
