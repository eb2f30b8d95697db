use clausemap_protocol::{DepRelation, Slot, SlotName};

use super::claim;
use crate::detector::{Detector, DetectorKind};
use crate::view::SentenceView;

/// Passive voice: the patient becomes S, the participle is V.
#[derive(Debug, Default)]
pub struct PassiveDetector;

impl Detector for PassiveDetector {
    fn id(&self) -> &'static str {
        "passive"
    }

    fn kind(&self) -> DetectorKind {
        DetectorKind::Specialist
    }

    fn priority(&self) -> u8 {
        15
    }

    fn score(&self, view: &SentenceView<'_>) -> f32 {
        let Some(verb) = view.clause_head() else {
            return 0.0;
        };
        let passive = view
            .children(verb.id)
            .iter()
            .any(|(_, rel)| matches!(rel, DepRelation::NsubjPass | DepRelation::AuxPass));
        if passive {
            0.85
        } else {
            0.0
        }
    }

    fn extract(&self, view: &SentenceView<'_>) -> Vec<Slot> {
        if self.score(view) == 0.0 {
            return Vec::new();
        }
        let Some(verb) = view.clause_head() else {
            return Vec::new();
        };
        let mut slots = vec![claim(SlotName::V, verb, 0.85)];
        if let Some(patient) = view.child(verb.id, DepRelation::NsubjPass) {
            slots.push(claim(SlotName::S, patient, 0.85));
        }
        slots
    }
}
