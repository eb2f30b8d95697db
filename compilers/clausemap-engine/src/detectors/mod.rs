//! Built-in detectors. Each one is a small, stateless heuristic over the
//! dependency arcs of a [`SentenceView`].

mod basic;
mod modal;
mod modifier;
mod passive;
mod question;
mod relative;

pub use basic::BasicClauseDetector;
pub use modal::ModalDetector;
pub use modifier::ModifierDetector;
pub use passive::PassiveDetector;
pub use question::QuestionDetector;
pub use relative::RelativeClauseDetector;

use clausemap_protocol::{DepRelation, Slot, SlotName, Token, TokenSpan};

use crate::detector::Detector;
use crate::error::DetectorInitError;
use crate::registry::DetectorFactory;
use crate::view::SentenceView;

pub(crate) const MODAL_LEMMAS: &[&str] = &[
    "can", "ca", "could", "will", "wo", "would", "shall", "should", "may", "might", "must",
];

pub(crate) const WH_LEMMAS: &[&str] = &[
    "who", "whom", "whose", "what", "which", "where", "when", "why", "how",
];

/// Name → factory pairs for every built-in detector, in registration order.
pub fn builtin_factories() -> Vec<(&'static str, DetectorFactory)> {
    vec![
        ("basic", boxed::<BasicClauseDetector> as DetectorFactory),
        ("modifier", boxed::<ModifierDetector> as DetectorFactory),
        ("relative", boxed::<RelativeClauseDetector> as DetectorFactory),
        ("passive", boxed::<PassiveDetector> as DetectorFactory),
        ("modal", boxed::<ModalDetector> as DetectorFactory),
        ("question", boxed::<QuestionDetector> as DetectorFactory),
    ]
}

fn boxed<D: Detector + Default + 'static>() -> Result<Box<dyn Detector>, DetectorInitError> {
    Ok(Box::new(D::default()))
}

pub(crate) fn claim(name: SlotName, token: &Token, confidence: f32) -> Slot {
    Slot::new(name, TokenSpan::single(token.id), confidence)
}

/// The slot a noun phrase fills, judged from its arc to the clause head.
pub(crate) fn nominal_slot(view: &SentenceView<'_>, clause_head: &Token, relation: DepRelation) -> Option<SlotName> {
    match relation {
        DepRelation::Nsubj | DepRelation::NsubjPass | DepRelation::Csubj | DepRelation::Expl => Some(SlotName::S),
        DepRelation::Dative | DepRelation::Iobj => Some(SlotName::O1),
        DepRelation::Dobj => {
            let ditransitive = view
                .children(clause_head.id)
                .iter()
                .any(|(_, rel)| matches!(rel, DepRelation::Dative | DepRelation::Iobj));
            Some(if ditransitive { SlotName::O2 } else { SlotName::O1 })
        }
        DepRelation::Attr | DepRelation::Acomp => Some(SlotName::C1),
        DepRelation::Oprd => Some(SlotName::C2),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use clausemap_parser::{GreedyParser, ParserAdapter};
    use clausemap_protocol::{ParsedSentence, Slot};

    use crate::graph::DependencyGraph;

    pub fn parse(text: &str) -> (ParsedSentence, DependencyGraph) {
        let sentence = GreedyParser::new().parse(text).unwrap();
        let graph = DependencyGraph::from_sentence(&sentence);
        (sentence, graph)
    }

    /// `(label, text)` of each claim, for compact assertions.
    pub fn claims(sentence: &ParsedSentence, slots: &[Slot]) -> Vec<(String, String)> {
        slots
            .iter()
            .map(|s| (s.name.as_str().to_string(), sentence.span_text(&s.span).to_string()))
            .collect()
    }
}
