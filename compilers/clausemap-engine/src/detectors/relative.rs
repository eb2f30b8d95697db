use clausemap_protocol::{DepRelation, Slot, TokenSpan};

use super::nominal_slot;
use crate::detector::{Detector, DetectorKind};
use crate::view::SentenceView;

/// Re-anchors a noun-phrase slot whose noun carries a relative clause so
/// that the claim already spans the whole clause.
#[derive(Debug, Default)]
pub struct RelativeClauseDetector;

impl RelativeClauseDetector {
    fn anchors(view: &SentenceView<'_>) -> Vec<Slot> {
        let Some(verb) = view.clause_head() else {
            return Vec::new();
        };
        let window = view.window();
        let mut out = Vec::new();

        for (noun, rel) in view.children(verb.id) {
            let Some(name) = nominal_slot(view, verb, rel) else {
                continue;
            };
            let Some((clause, _)) = view
                .children(noun.id)
                .into_iter()
                .find(|(_, r)| *r == DepRelation::Relcl)
            else {
                continue;
            };
            let span = TokenSpan::single(noun.id).cover(&view.graph().subtree_span(clause.id));
            if window.contains_span(&span) && !out.iter().any(|s: &Slot| s.name == name) {
                out.push(Slot::new(name, span, 0.85));
            }
        }
        out
    }
}

impl Detector for RelativeClauseDetector {
    fn id(&self) -> &'static str {
        "relative"
    }

    fn kind(&self) -> DetectorKind {
        DetectorKind::Specialist
    }

    fn priority(&self) -> u8 {
        10
    }

    fn score(&self, view: &SentenceView<'_>) -> f32 {
        if Self::anchors(view).is_empty() {
            0.0
        } else {
            0.85
        }
    }

    fn extract(&self, view: &SentenceView<'_>) -> Vec<Slot> {
        Self::anchors(view)
    }
}
