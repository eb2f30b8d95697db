use clausemap_protocol::{DepRelation, Slot, SlotName, Token};

use super::claim;
use crate::detector::{Detector, DetectorKind};
use crate::view::SentenceView;

/// Adverbials and prepositional phrases hanging off the clause verb,
/// numbered M1..M3 in surface order.
#[derive(Debug, Default)]
pub struct ModifierDetector;

impl ModifierDetector {
    fn adverbials<'a>(view: &SentenceView<'a>) -> Vec<&'a Token> {
        let Some(verb) = view.clause_head() else {
            return Vec::new();
        };
        view.children(verb.id)
            .into_iter()
            .filter(|(_, rel)| {
                matches!(
                    rel,
                    DepRelation::Advmod
                        | DepRelation::Npadvmod
                        | DepRelation::Prep
                        | DepRelation::Agent
                        | DepRelation::Advcl
                )
            })
            .map(|(token, _)| token)
            .collect()
    }
}

impl Detector for ModifierDetector {
    fn id(&self) -> &'static str {
        "modifier"
    }

    fn kind(&self) -> DetectorKind {
        DetectorKind::Specialist
    }

    fn priority(&self) -> u8 {
        30
    }

    fn score(&self, view: &SentenceView<'_>) -> f32 {
        match Self::adverbials(view).len() {
            0 => 0.0,
            n => (0.6 + 0.1 * n as f32).min(0.9),
        }
    }

    fn extract(&self, view: &SentenceView<'_>) -> Vec<Slot> {
        Self::adverbials(view)
            .into_iter()
            .zip(SlotName::MODIFIERS)
            .map(|(token, name)| claim(name, token, 0.7))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::fixtures::{claims, parse};

    #[test]
    fn test_single_adverb() {
        let (sentence, graph) = parse("The tall man quickly closed the door.");
        let view = SentenceView::whole(&sentence, &graph);

        assert!((ModifierDetector.score(&view) - 0.7).abs() < 1e-6);
        assert_eq!(
            claims(&sentence, &ModifierDetector.extract(&view)),
            vec![("M1".to_string(), "quickly".to_string())]
        );
    }

    #[test]
    fn test_no_adverbials() {
        let (sentence, graph) = parse("She gave him a book");
        let view = SentenceView::whole(&sentence, &graph);

        assert_eq!(ModifierDetector.score(&view), 0.0);
        assert!(ModifierDetector.extract(&view).is_empty());
    }
}
