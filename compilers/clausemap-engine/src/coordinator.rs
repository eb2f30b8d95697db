use std::collections::BTreeMap;
use std::sync::Arc;

use clausemap_protocol::{ParsedSentence, Slot, SlotMap, SlotName, TokenSpan};
use rayon::prelude::*;
use serde::Serialize;

use crate::config::EngineConfig;
use crate::deadline::Deadline;
use crate::detector::{normalize_score, DetectorResult};
use crate::expander::{BoundaryExpander, ExpansionOutcome};
use crate::graph::DependencyGraph;
use crate::merge::{merge_results, select_strategy, Candidate, CoordinationStrategy, SelectionThresholds};
use crate::registry::{DetectorRegistry, LoadedDetector};
use crate::sublevel::SublevelDecomposer;
use crate::view::SentenceView;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CoordinationStatus {
    Complete,
    /// No detector cleared the applicability floor; the slot map is empty.
    NoApplicableDetector,
}

impl CoordinationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CoordinationStatus::Complete => "complete",
            CoordinationStatus::NoApplicableDetector => "no-applicable-detector",
        }
    }
}

/// A degraded condition that did not stop the sentence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Diagnostic {
    DetectorUnavailable { detector: String, reason: String },
    ExpansionAmbiguity { path: String },
    ClaimDropped { path: String, detector: String },
    DeadlineExceeded { stage: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectorScore {
    pub detector: String,
    pub score: f32,
}

/// The merged decomposition of one sentence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoordinationResult {
    pub slots: SlotMap,
    pub strategy: CoordinationStrategy,
    pub status: CoordinationStatus,
    /// Detectors with at least one surviving top-level slot, by priority.
    pub contributors: Vec<String>,
    /// Which detector supplied each top-level slot.
    pub provenance: BTreeMap<SlotName, String>,
    /// Every detector's score, in registration order.
    pub scores: Vec<DetectorScore>,
    pub diagnostics: Vec<Diagnostic>,
}

impl CoordinationResult {
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn text(&self, name: SlotName) -> Option<&str> {
        self.slots.text(name)
    }

    /// Sub-slots only, keyed by dotted path (`S.sub-v`), in pre-order.
    pub fn nested_slots(&self) -> Vec<(String, &Slot)> {
        self.slots
            .flatten()
            .into_iter()
            .filter(|(_, slot)| slot.depth > 0)
            .collect()
    }
}

pub(crate) fn push_diagnostic(diagnostics: &mut Vec<Diagnostic>, diagnostic: Diagnostic) {
    if !diagnostics.contains(&diagnostic) {
        diagnostics.push(diagnostic);
    }
}

fn slot_path(prefix: &str, name: SlotName, depth: u8) -> String {
    let label = if depth == 0 { name.as_str() } else { name.sub_label() };
    if prefix.is_empty() {
        label.to_string()
    } else {
        format!("{}.{}", prefix, label)
    }
}

/// What coordinating one view produced.
pub(crate) struct ViewOutcome {
    pub strategy: CoordinationStrategy,
    /// Highest score among the detectors that ran.
    pub best_score: f32,
    /// Expanded slots at the requested depth, in canonical order.
    pub slots: Vec<Slot>,
    pub provenance: Vec<(SlotName, &'static str)>,
    pub contributors: Vec<&'static str>,
}

/// Select, extract, merge and expand for one window. Shared by the
/// top level and every nested level.
#[allow(clippy::too_many_arguments)]
pub(crate) fn coordinate_view(
    view: &SentenceView<'_>,
    detectors: &[&LoadedDetector],
    scores: &[f32],
    thresholds: &SelectionThresholds,
    expander: &BoundaryExpander,
    depth: u8,
    prefix: &str,
    deadline: &Deadline,
    diagnostics: &mut Vec<Diagnostic>,
) -> ViewOutcome {
    let candidates: Vec<Candidate> = detectors
        .iter()
        .zip(scores)
        .map(|(d, &score)| Candidate {
            kind: d.detector.kind(),
            priority: d.detector.priority(),
            order: d.order,
            score,
        })
        .collect();
    let (strategy, chosen) = select_strategy(&candidates, thresholds);
    if chosen.is_empty() {
        return ViewOutcome {
            strategy,
            best_score: 0.0,
            slots: Vec::new(),
            provenance: Vec::new(),
            contributors: Vec::new(),
        };
    }

    let window = view.window();
    let results: Vec<DetectorResult> = chosen
        .iter()
        .map(|&i| {
            let loaded = detectors[i];
            let slots = loaded
                .detector
                .extract(view)
                .into_iter()
                .filter(|slot| !slot.span.is_empty() && window.contains_span(&slot.span))
                .collect();
            DetectorResult {
                detector: loaded.detector.id(),
                kind: candidates[i].kind,
                priority: candidates[i].priority,
                order: loaded.order,
                score: scores[i],
                slots,
            }
        })
        .collect();
    let best_score = results.iter().map(|r| r.score).fold(0.0f32, f32::max);

    let merged = merge_results(strategy, &results);
    for lost in &merged.dropped {
        push_diagnostic(
            diagnostics,
            Diagnostic::ClaimDropped {
                path: slot_path(prefix, lost.slot.name, depth),
                detector: lost.detector.to_string(),
            },
        );
    }

    let mut spans: Vec<TokenSpan> = merged.accepted.iter().map(|c| c.slot.span).collect();
    for i in 0..spans.len() {
        if deadline.expired() {
            push_diagnostic(diagnostics, Diagnostic::DeadlineExceeded { stage: "expansion".to_string() });
            break;
        }
        let claimed: Vec<TokenSpan> = spans
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(_, span)| *span)
            .collect();
        let name = merged.accepted[i].slot.name;
        let expansion = expander.expand(name, spans[i], view, &claimed);
        if expansion.outcome == ExpansionOutcome::Ambiguous {
            push_diagnostic(
                diagnostics,
                Diagnostic::ExpansionAmbiguity { path: slot_path(prefix, name, depth) },
            );
        }
        spans[i] = expansion.span;
    }

    let contributors = merged.contributors();
    let provenance = merged.accepted.iter().map(|c| (c.slot.name, c.detector)).collect();
    let slots = merged
        .accepted
        .into_iter()
        .zip(spans)
        .map(|(claim, span)| {
            let mut slot = claim.slot;
            slot.span = span;
            slot.at_depth(depth).with_text(view.sentence())
        })
        .collect();

    ViewOutcome { strategy, best_score, slots, provenance, contributors }
}

/// Runs every registered detector over a sentence and merges the result.
pub struct Coordinator {
    registry: Arc<DetectorRegistry>,
    expander: BoundaryExpander,
    config: EngineConfig,
    pool: Option<rayon::ThreadPool>,
}

impl Coordinator {
    /// Falls back to the built-in expansion rules if the config's `[expansion]`
    /// table does not validate.
    pub fn new(registry: Arc<DetectorRegistry>, config: EngineConfig) -> Self {
        let expander = match config.expansion_rules() {
            Ok(rules) => BoundaryExpander::new(rules),
            Err(err) => {
                tracing::warn!(error = %err, "invalid expansion rules, using defaults");
                BoundaryExpander::with_defaults()
            }
        };
        let pool = match (config.parallel_scoring, config.effective_scoring_threads()) {
            (true, Some(threads)) => match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
                Ok(pool) => Some(pool),
                Err(err) => {
                    tracing::warn!(error = %err, threads, "scoring pool unavailable, using the global pool");
                    None
                }
            },
            _ => None,
        };
        Self { registry, expander, config, pool }
    }

    pub fn registry(&self) -> &DetectorRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn expander(&self) -> &BoundaryExpander {
        &self.expander
    }

    /// Detectors that take part, after registry and config filtering.
    pub fn active_detectors(&self) -> Vec<LoadedDetector> {
        self.registry
            .load_all()
            .into_iter()
            .filter(|d| !self.config.is_disabled(&d.name))
            .collect()
    }

    pub fn decompose(&self, sentence: &ParsedSentence) -> CoordinationResult {
        let deadline = Deadline::after(self.config.effective_deadline());
        let graph = DependencyGraph::from_sentence(sentence);
        let view = SentenceView::whole(sentence, &graph);

        let mut diagnostics: Vec<Diagnostic> = self
            .registry
            .unavailable()
            .into_iter()
            .filter(|(name, _)| !self.config.is_disabled(name))
            .map(|(detector, reason)| Diagnostic::DetectorUnavailable { detector, reason })
            .collect();

        let loaded = self.active_detectors();
        let detectors: Vec<&LoadedDetector> = loaded.iter().collect();
        let scores = self.score_all(&detectors, &view);
        let thresholds = SelectionThresholds::from_config(&self.config);

        let outcome = coordinate_view(
            &view,
            &detectors,
            &scores,
            &thresholds,
            &self.expander,
            0,
            "",
            &deadline,
            &mut diagnostics,
        );

        // A detector can clear the floor and still leave nothing standing.
        let status = if outcome.slots.is_empty() {
            tracing::debug!(sentence = sentence.id.0, strategy = outcome.strategy.as_str(), "no slot claimed");
            CoordinationStatus::NoApplicableDetector
        } else {
            CoordinationStatus::Complete
        };

        let nested = SublevelDecomposer::new(&loaded, &self.expander, &self.config);
        let slots: SlotMap = outcome
            .slots
            .into_iter()
            .map(|slot| nested.decompose_nested(slot, sentence, &graph, 0, &deadline, &mut diagnostics))
            .collect();

        tracing::debug!(
            sentence = sentence.id.0,
            strategy = outcome.strategy.as_str(),
            contributors = ?outcome.contributors,
            slots = slots.len(),
            "sentence decomposed"
        );

        CoordinationResult {
            slots,
            strategy: outcome.strategy,
            status,
            contributors: outcome.contributors.iter().map(|id| id.to_string()).collect(),
            provenance: outcome
                .provenance
                .into_iter()
                .map(|(name, id)| (name, id.to_string()))
                .collect(),
            scores: detectors
                .iter()
                .zip(&scores)
                .map(|(d, &score)| DetectorScore { detector: d.name.clone(), score })
                .collect(),
            diagnostics,
        }
    }

    /// Scores come back in registration order whether or not they were
    /// computed in parallel.
    fn score_all(&self, detectors: &[&LoadedDetector], view: &SentenceView<'_>) -> Vec<f32> {
        let score = |d: &&LoadedDetector| normalize_score(d.detector.score(view));
        if !self.config.parallel_scoring {
            return detectors.iter().map(score).collect();
        }
        match &self.pool {
            Some(pool) => pool.install(|| detectors.par_iter().map(score).collect()),
            None => detectors.par_iter().map(score).collect(),
        }
    }
}
