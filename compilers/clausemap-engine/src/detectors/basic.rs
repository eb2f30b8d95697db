use clausemap_protocol::{DepRelation, Slot, SlotName, Token};

use super::{claim, nominal_slot};
use crate::detector::{Detector, DetectorKind};
use crate::view::SentenceView;

/// The S-V-O-C skeleton of an active clause.
#[derive(Debug, Default)]
pub struct BasicClauseDetector;

const CONFIDENCE: f32 = 0.8;

impl Detector for BasicClauseDetector {
    fn id(&self) -> &'static str {
        "basic"
    }

    fn kind(&self) -> DetectorKind {
        DetectorKind::Foundation
    }

    fn priority(&self) -> u8 {
        50
    }

    fn score(&self, view: &SentenceView<'_>) -> f32 {
        let Some(verb) = view.clause_head() else {
            return 0.0;
        };
        let children = view.children(verb.id);
        let has_subject = children
            .iter()
            .any(|(_, rel)| matches!(rel, DepRelation::Nsubj | DepRelation::Csubj | DepRelation::Expl));
        let has_argument = children.iter().any(|(_, rel)| {
            matches!(
                rel,
                DepRelation::Dobj | DepRelation::Dative | DepRelation::Iobj | DepRelation::Attr | DepRelation::Acomp
            )
        });

        match (has_subject, has_argument) {
            (true, _) => 0.9,
            (false, true) => 0.7,
            (false, false) => 0.6,
        }
    }

    fn extract(&self, view: &SentenceView<'_>) -> Vec<Slot> {
        let Some(verb) = view.clause_head() else {
            return Vec::new();
        };
        let mut slots = vec![claim(SlotName::V, verb, CONFIDENCE)];
        let children = view.children(verb.id);
        let has_object = children
            .iter()
            .any(|(_, rel)| matches!(rel, DepRelation::Dobj | DepRelation::Dative | DepRelation::Iobj));

        for &(child, rel) in &children {
            match rel {
                DepRelation::Nsubj
                | DepRelation::Csubj
                | DepRelation::Expl
                | DepRelation::Dobj
                | DepRelation::Dative
                | DepRelation::Iobj
                | DepRelation::Oprd => {
                    if let Some(name) = nominal_slot(view, verb, rel) {
                        let name = if rel == DepRelation::Oprd && !has_object { SlotName::C1 } else { name };
                        push_once(&mut slots, name, child);
                    }
                }
                DepRelation::Ccomp if !has_object => push_once(&mut slots, SlotName::O1, child),
                DepRelation::Attr | DepRelation::Acomp | DepRelation::Xcomp => {
                    let taken = slots.iter().any(|s| s.name == SlotName::C1);
                    push_once(&mut slots, if taken { SlotName::C2 } else { SlotName::C1 }, child);
                }
                _ => {}
            }
        }
        slots
    }
}

fn push_once(slots: &mut Vec<Slot>, name: SlotName, token: &Token) {
    if !slots.iter().any(|s| s.name == name) {
        slots.push(claim(name, token, CONFIDENCE));
    }
}
