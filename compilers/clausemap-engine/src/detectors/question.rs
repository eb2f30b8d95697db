use clausemap_protocol::{DepRelation, PartOfSpeech, Slot, SlotName, Token, TokenSpan};

use super::{claim, nominal_slot, WH_LEMMAS};
use crate::detector::{Detector, DetectorKind};
use crate::view::SentenceView;

/// Fronted wh-words. The slot they fill is marked as a question word so
/// order tables keep `O1?` apart from an ordinary `O1`.
#[derive(Debug, Default)]
pub struct QuestionDetector;

impl QuestionDetector {
    fn fronted_wh<'a>(view: &SentenceView<'a>) -> Option<&'a Token> {
        let mut tokens = view.tokens().filter(|t| t.pos != PartOfSpeech::Punctuation);
        let first = tokens.next()?;
        let candidate = if first.pos == PartOfSpeech::Adposition {
            tokens.next()?
        } else {
            first
        };
        WH_LEMMAS.contains(&candidate.lemma.as_str()).then_some(candidate)
    }

    fn ends_with_question_mark(view: &SentenceView<'_>) -> bool {
        view.tokens().last().map_or(false, |t| t.text == "?")
    }

    /// An auxiliary placed before the subject: `did` in `What did you see?`.
    fn inverted_aux<'a>(view: &SentenceView<'a>, verb: &Token) -> Option<&'a Token> {
        let children = view.children(verb.id);
        let subject = children
            .iter()
            .find(|(_, rel)| matches!(rel, DepRelation::Nsubj | DepRelation::NsubjPass))
            .map(|(t, _)| t.id)?;
        children
            .into_iter()
            .find(|(t, rel)| matches!(rel, DepRelation::Aux | DepRelation::AuxPass) && t.id < subject)
            .map(|(t, _)| t)
    }

    fn wh_claim(view: &SentenceView<'_>, verb: &Token, wh: &Token) -> Option<Slot> {
        let sentence = view.sentence();
        let mut anchor = wh;
        let mut span = TokenSpan::single(wh.id);

        // `Which house ...`: the wh-word is a determiner of the real filler
        if wh.relation == DepRelation::Det {
            anchor = sentence.token(wh.head)?;
            span = span.cover(&TokenSpan::single(anchor.id));
        }
        // `To whom ...`: claim the whole prepositional phrase
        if anchor.relation == DepRelation::Pobj {
            let prep = sentence.token(anchor.head)?;
            span = span.cover(&TokenSpan::single(prep.id));
            anchor = prep;
        }

        let name = match anchor.relation {
            DepRelation::Advmod | DepRelation::Npadvmod | DepRelation::Prep => SlotName::M1,
            rel => nominal_slot(view, verb, rel)?,
        };
        Some(Slot::new(name, span, 0.9).question_word())
    }
}

impl Detector for QuestionDetector {
    fn id(&self) -> &'static str {
        "question"
    }

    fn kind(&self) -> DetectorKind {
        DetectorKind::Specialist
    }

    fn priority(&self) -> u8 {
        5
    }

    fn sentence_scoped(&self) -> bool {
        true
    }

    fn score(&self, view: &SentenceView<'_>) -> f32 {
        if Self::fronted_wh(view).is_none() {
            return 0.0;
        }
        let inverted = view
            .clause_head()
            .and_then(|verb| Self::inverted_aux(view, verb))
            .is_some();
        if Self::ends_with_question_mark(view) || inverted {
            0.9
        } else {
            0.6
        }
    }

    fn extract(&self, view: &SentenceView<'_>) -> Vec<Slot> {
        let (Some(wh), Some(verb)) = (Self::fronted_wh(view), view.clause_head()) else {
            return Vec::new();
        };
        let mut slots = Vec::new();
        if let Some(slot) = Self::wh_claim(view, verb, wh) {
            slots.push(slot);
        }
        if let Some(aux) = Self::inverted_aux(view, verb) {
            slots.push(claim(SlotName::Aux, aux, 0.9));
        }
        slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::fixtures::{claims, parse};

    #[test]
    fn test_object_question() {
        let (sentence, graph) = parse("What did you see?");
        let view = SentenceView::whole(&sentence, &graph);

        assert_eq!(QuestionDetector.score(&view), 0.9);
        let slots = QuestionDetector.extract(&view);
        assert_eq!(
            claims(&sentence, &slots),
            vec![
                ("O1".to_string(), "What".to_string()),
                ("Aux".to_string(), "did".to_string()),
            ]
        );
        assert!(slots[0].question);
        assert!(!slots[1].question);
    }

    #[test]
    fn test_relative_pronoun_is_not_a_question() {
        let (sentence, graph) = parse("The man who lives here closed the door");
        let view = SentenceView::whole(&sentence, &graph);

        assert_eq!(QuestionDetector.score(&view), 0.0);
        assert!(QuestionDetector.extract(&view).is_empty());
        assert!(QuestionDetector.sentence_scoped());
    }
}
