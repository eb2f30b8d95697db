use clausemap_protocol::{DepRelation, Slot, SlotName, Token, TokenSpan};

use super::MODAL_LEMMAS;
use crate::detector::{Detector, DetectorKind};
use crate::view::SentenceView;

/// Modal auxiliaries go to Aux, together with a contracted `n't`.
#[derive(Debug, Default)]
pub struct ModalDetector;

impl ModalDetector {
    fn modal<'a>(view: &SentenceView<'a>) -> Option<&'a Token> {
        let verb = view.clause_head()?;
        view.children(verb.id)
            .into_iter()
            .find(|(token, rel)| *rel == DepRelation::Aux && MODAL_LEMMAS.contains(&token.lemma.as_str()))
            .map(|(token, _)| token)
    }
}

impl Detector for ModalDetector {
    fn id(&self) -> &'static str {
        "modal"
    }

    fn kind(&self) -> DetectorKind {
        DetectorKind::Specialist
    }

    fn priority(&self) -> u8 {
        20
    }

    fn score(&self, view: &SentenceView<'_>) -> f32 {
        if Self::modal(view).is_some() {
            0.8
        } else {
            0.0
        }
    }

    fn extract(&self, view: &SentenceView<'_>) -> Vec<Slot> {
        let Some(modal) = Self::modal(view) else {
            return Vec::new();
        };
        let mut span = TokenSpan::single(modal.id);
        let next = clausemap_protocol::TokenId(modal.id.0 + 1);
        if let Some(neg) = view.token(next) {
            if neg.relation == DepRelation::Neg {
                span = span.cover(&TokenSpan::single(neg.id));
            }
        }
        vec![Slot::new(SlotName::Aux, span, 0.8)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::fixtures::{claims, parse};

    #[test]
    fn test_modal_with_contracted_negation() {
        let (sentence, graph) = parse("She can't want to leave");
        let view = SentenceView::whole(&sentence, &graph);

        assert_eq!(ModalDetector.score(&view), 0.8);
        assert_eq!(
            claims(&sentence, &ModalDetector.extract(&view)),
            vec![("Aux".to_string(), "can't".to_string())]
        );
    }

    #[test]
    fn test_do_support_is_not_modal() {
        let (sentence, graph) = parse("What did you see?");
        let view = SentenceView::whole(&sentence, &graph);

        assert_eq!(ModalDetector.score(&view), 0.0);
    }
}
