use std::collections::BTreeMap;
use std::sync::Arc;

use clausemap_parser::ParserAdapter;
use clausemap_protocol::ParsedSentence;
use serde::Serialize;

use crate::cache::OrderTableCache;
use crate::config::EngineConfig;
use crate::coordinator::{CoordinationResult, Coordinator};
use crate::error::EngineError;
use crate::order::{Assignment, PositionedSlot};
use crate::population::GroupPopulationSource;
use crate::registry::{default_registry, DetectorRegistry};

/// Parse, decompose and (optionally) lay out one sentence.
pub struct Pipeline {
    parser: Box<dyn ParserAdapter>,
    coordinator: Coordinator,
    orders: OrderTableCache,
    config: EngineConfig,
}

/// Everything known about one decomposed sentence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecompositionRecord {
    pub sentence: String,
    pub result: CoordinationResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub v_group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<PositionedSlot>>,
    /// Column labels appended because the group's table had not seen them.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stale_columns: Vec<String>,
}

impl DecompositionRecord {
    pub fn new(sentence: &ParsedSentence, result: CoordinationResult) -> Self {
        Self {
            sentence: sentence.text.clone(),
            result,
            v_group: None,
            columns: None,
            stale_columns: Vec::new(),
        }
    }

    pub fn with_assignment(mut self, v_group: &str, assignment: Assignment) -> Self {
        self.v_group = Some(v_group.to_string());
        self.stale_columns = assignment.appended.iter().map(|k| k.label()).collect();
        self.columns = Some(assignment.positioned);
        self
    }

    /// Slot paths (with `?` for question words) mapped to their text.
    pub fn slot_texts(&self) -> BTreeMap<String, String> {
        self.result
            .slots
            .flatten()
            .into_iter()
            .map(|(path, slot)| {
                let key = if slot.question { format!("{}?", path) } else { path };
                (key, slot.text.clone())
            })
            .collect()
    }

    /// A flat key/value view: slot paths, then `strategy`, `status`,
    /// `detectors`, and `col.NN` entries when columns were assigned.
    pub fn to_flat(&self) -> BTreeMap<String, String> {
        let mut flat = self.slot_texts();
        flat.insert("sentence".to_string(), self.sentence.clone());
        flat.insert("strategy".to_string(), self.result.strategy.as_str().to_string());
        flat.insert("status".to_string(), self.result.status.as_str().to_string());
        flat.insert("detectors".to_string(), self.result.contributors.join(","));
        if let Some(group) = &self.v_group {
            flat.insert("v_group".to_string(), group.clone());
        }
        for column in self.columns.iter().flatten() {
            let value = match &column.text {
                Some(text) => format!("{}={}", column.key.label(), text),
                None => format!("{}=", column.key.label()),
            };
            flat.insert(format!("col.{:02}", column.column), value);
        }
        flat
    }
}

impl Pipeline {
    pub fn new(
        parser: Box<dyn ParserAdapter>,
        registry: Arc<DetectorRegistry>,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            parser,
            coordinator: Coordinator::new(registry, config.clone()),
            orders: OrderTableCache::new(config.effective_stability_tolerance()),
            config,
        })
    }

    /// Built-in detectors with the given config.
    pub fn with_parser(parser: Box<dyn ParserAdapter>, config: EngineConfig) -> Result<Self, EngineError> {
        Self::new(parser, Arc::new(default_registry()), config)
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    pub fn orders(&self) -> &OrderTableCache {
        &self.orders
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn parse(&self, text: &str) -> Result<ParsedSentence, EngineError> {
        Ok(self.parser.parse(text)?)
    }

    pub fn decompose_parsed(&self, sentence: &ParsedSentence) -> DecompositionRecord {
        DecompositionRecord::new(sentence, self.coordinator.decompose(sentence))
    }

    /// Only a parse failure is an error; everything else is reported in the record.
    pub fn decompose_text(&self, text: &str) -> Result<DecompositionRecord, EngineError> {
        let sentence = self.parse(text)?;
        Ok(self.decompose_parsed(&sentence))
    }

    pub fn decompose_in_group(
        &self,
        text: &str,
        v_group: &str,
        source: &dyn GroupPopulationSource,
    ) -> Result<DecompositionRecord, EngineError> {
        let record = self.decompose_text(text)?;
        let assignment = self.orders.assign(v_group, source, &record.result.slots)?;
        Ok(record.with_assignment(v_group, assignment))
    }
}
