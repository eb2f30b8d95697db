use std::collections::BTreeMap;
use std::path::Path;

use clausemap_protocol::{DepRelation, RelationSet, SlotName};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::expander::default_rules;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("unknown slot '{0}' in [expansion]")]
    UnknownSlot(String),

    #[error("unknown dependency relation '{relation}' for slot {slot}")]
    UnknownRelation { slot: String, relation: String },

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Tuning knobs for the decomposition pipeline, usually read from
/// `clausemap.toml`. Every field has a default so partial files work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Detectors scoring below this are not applicable at all.
    pub applicability_floor: f32,
    /// Detectors scoring at or above this count as active.
    pub active_threshold: f32,
    /// Score gap that lets one of two active detectors run alone.
    pub dominance_margin: f32,
    pub max_depth: u8,
    pub min_sub_tokens: usize,
    pub sub_threshold: f32,
    /// Per-sentence budget in milliseconds. `0` disables the deadline.
    /// Repeated runs are identical only while the budget is not hit; with
    /// `0` they always are.
    pub deadline_ms: u64,
    pub parallel_scoring: bool,
    pub scoring_threads: Option<usize>,
    /// How far a column's mean position may drift before a rebuild renumbers columns.
    pub stability_tolerance: f64,
    pub disabled_detectors: Vec<String>,
    /// Slot label to dependency relation labels, overriding the built-in rules.
    pub expansion: BTreeMap<String, Vec<String>>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            applicability_floor: 0.1,
            active_threshold: 0.5,
            dominance_margin: 0.25,
            max_depth: 3,
            min_sub_tokens: 2,
            sub_threshold: 0.5,
            deadline_ms: 250,
            parallel_scoring: false,
            scoring_threads: None,
            stability_tolerance: 0.5,
            disabled_detectors: Vec::new(),
            expansion: BTreeMap::new(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml_str(&source)?;
        tracing::debug!(path = %path.as_ref().display(), "engine config loaded");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("applicability_floor", self.applicability_floor),
            ("active_threshold", self.active_threshold),
            ("dominance_margin", self.dominance_margin),
            ("sub_threshold", self.sub_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("{} is outside 0..=1", value),
                });
            }
        }
        if self.applicability_floor > self.active_threshold {
            return Err(ConfigError::Invalid {
                field: "applicability_floor",
                reason: "must not exceed active_threshold".to_string(),
            });
        }
        self.expansion_rules()?;
        Ok(())
    }

    pub fn effective_max_depth(&self) -> u8 {
        self.max_depth.min(8)
    }

    pub fn effective_min_sub_tokens(&self) -> usize {
        self.min_sub_tokens.max(1)
    }

    pub fn effective_stability_tolerance(&self) -> f64 {
        if self.stability_tolerance.is_finite() {
            self.stability_tolerance.max(0.0)
        } else {
            0.0
        }
    }

    /// `None` when the deadline is disabled.
    pub fn effective_deadline(&self) -> Option<std::time::Duration> {
        (self.deadline_ms > 0).then(|| std::time::Duration::from_millis(self.deadline_ms))
    }

    /// `None` means the global rayon pool.
    pub fn effective_scoring_threads(&self) -> Option<usize> {
        self.scoring_threads.filter(|n| *n > 0)
    }

    pub fn is_disabled(&self, detector: &str) -> bool {
        self.disabled_detectors.iter().any(|d| d == detector)
    }

    /// Built-in expansion rules with the `[expansion]` table laid over them.
    /// A slot listed in the table gets exactly the listed relations.
    pub fn expansion_rules(&self) -> Result<BTreeMap<SlotName, RelationSet>, ConfigError> {
        let mut rules = default_rules();
        for (label, relations) in &self.expansion {
            let slot = SlotName::parse(label).ok_or_else(|| ConfigError::UnknownSlot(label.clone()))?;
            let mut set = RelationSet::empty();
            for relation in relations {
                let parsed = DepRelation::from_label(relation);
                if parsed == DepRelation::Dep && !relation.eq_ignore_ascii_case("dep") {
                    return Err(ConfigError::UnknownRelation {
                        slot: label.clone(),
                        relation: relation.clone(),
                    });
                }
                set |= parsed.flag();
            }
            rules.insert(slot, set);
        }
        Ok(rules)
    }
}
