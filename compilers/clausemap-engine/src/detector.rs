use clausemap_protocol::Slot;
use serde::Serialize;

use crate::view::SentenceView;

/// How a detector takes part in coordination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetectorKind {
    /// Covers the general S-V-O-C skeleton of any clause.
    Foundation,
    /// Knows one construction well and refines the slots it claims.
    Specialist,
    Generic,
}

/// A pluggable grammatical-pattern detector.
///
/// `score` and `extract` must be pure functions of the view: the same
/// window always yields the same score and the same claims.
pub trait Detector: Send + Sync {
    /// Stable identity, also the registry key.
    fn id(&self) -> &'static str;

    fn kind(&self) -> DetectorKind;

    /// Lower wins ties between equally confident claims.
    fn priority(&self) -> u8;

    /// Sentence-scoped detectors look at the whole utterance (punctuation,
    /// word order) and never run on an embedded clause.
    fn sentence_scoped(&self) -> bool {
        false
    }

    /// Applicability in `0.0..=1.0`.
    fn score(&self, view: &SentenceView<'_>) -> f32;

    /// Claims minimal spans: usually just the head token of each slot.
    /// Boundaries are widened later by the expander.
    fn extract(&self, view: &SentenceView<'_>) -> Vec<Slot>;
}

/// One detector's score and claims for one view.
#[derive(Debug, Clone)]
pub struct DetectorResult {
    pub detector: &'static str,
    pub kind: DetectorKind,
    pub priority: u8,
    /// Registration order, the final tie-break.
    pub order: usize,
    pub score: f32,
    pub slots: Vec<Slot>,
}

/// Scores outside `0..=1` or NaN are clamped so one faulty detector cannot
/// dominate the selection.
pub fn normalize_score(score: f32) -> f32 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}
