use clausemap_protocol::{ParsedSentence, Slot, SlotName};

use crate::config::EngineConfig;
use crate::coordinator::{coordinate_view, push_diagnostic, Diagnostic};
use crate::deadline::Deadline;
use crate::detector::normalize_score;
use crate::expander::BoundaryExpander;
use crate::graph::DependencyGraph;
use crate::merge::{CoordinationStrategy, SelectionThresholds};
use crate::registry::LoadedDetector;
use crate::view::SentenceView;

/// Re-runs clause-level detection inside a slot's span to find an embedded
/// clause, then recurses into the sub-slots it finds.
///
/// Recursion stops at `max_depth`, below `min_sub_tokens`, when no verb is
/// found, or when the deadline passes. Reaching a limit is a normal result.
pub struct SublevelDecomposer<'a> {
    detectors: Vec<&'a LoadedDetector>,
    expander: &'a BoundaryExpander,
    thresholds: SelectionThresholds,
    max_depth: u8,
    min_tokens: usize,
    sub_threshold: f32,
}

impl<'a> SublevelDecomposer<'a> {
    /// Sentence-scoped detectors are left out: they read the whole
    /// utterance and say nothing about an embedded clause.
    pub fn new(detectors: &'a [LoadedDetector], expander: &'a BoundaryExpander, config: &EngineConfig) -> Self {
        Self {
            detectors: detectors.iter().filter(|d| !d.detector.sentence_scoped()).collect(),
            expander,
            thresholds: SelectionThresholds::from_config(config),
            max_depth: config.effective_max_depth(),
            min_tokens: config.effective_min_sub_tokens(),
            sub_threshold: config.sub_threshold,
        }
    }

    /// Fills `slot.sub_slots` for a slot found at `depth`.
    pub fn decompose_nested(
        &self,
        slot: Slot,
        sentence: &ParsedSentence,
        graph: &DependencyGraph,
        depth: u8,
        deadline: &Deadline,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Slot {
        let path = slot.label().to_string();
        self.descend(slot, &path, sentence, graph, depth, deadline, diagnostics)
    }

    #[allow(clippy::too_many_arguments)]
    fn descend(
        &self,
        mut slot: Slot,
        path: &str,
        sentence: &ParsedSentence,
        graph: &DependencyGraph,
        depth: u8,
        deadline: &Deadline,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Slot {
        if depth >= self.max_depth {
            tracing::trace!(path, depth, "maximum nesting depth reached");
            return slot;
        }
        // a verb group has no inner clause
        if matches!(slot.name, SlotName::V | SlotName::Aux) || slot.span.len() < self.min_tokens {
            return slot;
        }
        if deadline.expired() {
            push_diagnostic(diagnostics, Diagnostic::DeadlineExceeded { stage: "nested".to_string() });
            return slot;
        }

        let view = SentenceView::new(sentence, graph, slot.span);
        if view.clause_head().is_none() {
            return slot;
        }

        let scores: Vec<f32> = self
            .detectors
            .iter()
            .map(|d| normalize_score(d.detector.score(&view)))
            .collect();
        let outcome = coordinate_view(
            &view,
            &self.detectors,
            &scores,
            &self.thresholds,
            self.expander,
            depth + 1,
            path,
            deadline,
            diagnostics,
        );

        if outcome.strategy == CoordinationStrategy::NoDetector || outcome.best_score < self.sub_threshold {
            return slot;
        }
        if !outcome.slots.iter().any(|s| s.name == SlotName::V) {
            tracing::trace!(path, "no internal verb, slot stays flat");
            return slot;
        }

        let mut sub_slots = Vec::with_capacity(outcome.slots.len());
        for sub in outcome.slots {
            if !slot.span.contains_span(&sub.span) {
                tracing::warn!(path, sub = sub.label(), "sub-slot escapes its parent span, dropped");
                continue;
            }
            let sub_path = format!("{}.{}", path, sub.label());
            sub_slots.push(self.descend(sub, &sub_path, sentence, graph, depth + 1, deadline, diagnostics));
        }
        tracing::trace!(path, depth, found = sub_slots.len(), "embedded clause decomposed");
        slot.sub_slots = sub_slots;
        slot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::fixtures::parse;
    use crate::registry::default_registry;
    use clausemap_protocol::TokenSpan;

    fn nested(text: &str, span: TokenSpan, name: SlotName, config: EngineConfig) -> (ParsedSentence, Slot, Vec<Diagnostic>) {
        let (sentence, graph) = parse(text);
        let loaded = default_registry().load_all();
        let expander = BoundaryExpander::with_defaults();
        let decomposer = SublevelDecomposer::new(&loaded, &expander, &config);
        let slot = Slot::new(name, span, 0.8).with_text(&sentence);
        let mut diagnostics = Vec::new();
        let out = decomposer.decompose_nested(slot, &sentence, &graph, 0, &Deadline::unlimited(), &mut diagnostics);
        (sentence, out, diagnostics)
    }

    #[test]
    fn test_relative_clause_inside_subject() {
        let (_, slot, diagnostics) = nested(
            "The man who lives here closed the door",
            TokenSpan::new(0, 5),
            SlotName::S,
            EngineConfig::default(),
        );

        let labels: Vec<(&str, &str)> = slot.sub_slots.iter().map(|s| (s.label(), s.text.as_str())).collect();
        assert_eq!(labels, vec![("sub-s", "who"), ("sub-v", "lives"), ("sub-m1", "here")]);
        assert!(slot.sub_slots.iter().all(|s| s.depth == 1));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_flat_noun_phrase_stays_flat() {
        let (_, slot, _) = nested(
            "The tall man quickly closed the door.",
            TokenSpan::new(0, 3),
            SlotName::S,
            EngineConfig::default(),
        );
        assert!(slot.sub_slots.is_empty());
    }

    #[test]
    fn test_depth_limit() {
        let config = EngineConfig { max_depth: 0, ..EngineConfig::default() };
        let (_, slot, _) = nested("The man who lives here closed the door", TokenSpan::new(0, 5), SlotName::S, config);
        assert!(slot.sub_slots.is_empty());
    }

    #[test]
    fn test_short_span_skipped() {
        let config = EngineConfig { min_sub_tokens: 6, ..EngineConfig::default() };
        let (_, slot, _) = nested("The man who lives here closed the door", TokenSpan::new(0, 5), SlotName::S, config);
        assert!(slot.sub_slots.is_empty());
    }

    #[test]
    fn test_infinitive_complement_gets_sub_verb() {
        let (_, slot, _) = nested("She can't want to leave", TokenSpan::new(4, 6), SlotName::C1, EngineConfig::default());
        assert_eq!(slot.sub_slot(SlotName::V).map(|s| s.text.as_str()), Some("to leave"));
        assert_eq!(slot.sub_slots[0].label(), "sub-v");
    }

    #[test]
    fn test_question_detector_excluded() {
        let loaded = default_registry().load_all();
        let expander = BoundaryExpander::with_defaults();
        let decomposer = SublevelDecomposer::new(&loaded, &expander, &EngineConfig::default());
        assert!(decomposer.detectors.iter().all(|d| d.name != "question"));
        assert_eq!(decomposer.detectors.len(), 5);
    }
}
