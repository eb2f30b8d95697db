//! Group populations: the example sentences of one V-group, used to build
//! order tables. Storage is external; the engine only reads through
//! [`GroupPopulationSource`].

use std::collections::{BTreeMap, HashMap};

use clausemap_protocol::{ParsedSentence, Slot, SlotMap, SlotName, TokenSpan};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PopulationError {
    #[error("unknown v-group '{0}'")]
    UnknownGroup(String),

    #[error("'{label}' is not a slot path")]
    UnknownSlot { label: String },

    #[error("text '{text}' for {label} not found in the sentence")]
    Unlocated { label: String, text: String },

    #[error("sub-slot {path} has no parent slot")]
    OrphanSubSlot { path: String },
}

/// One example sentence of a group with its expected slot map.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupExample {
    pub id: String,
    pub slots: SlotMap,
}

/// Splits `O1.sub-s?` into slot names and the question marker.
pub fn parse_slot_path(path: &str) -> Result<(Vec<SlotName>, bool), PopulationError> {
    let unknown = || PopulationError::UnknownSlot { label: path.to_string() };
    let (bare, question) = match path.strip_suffix('?') {
        Some(bare) => (bare, true),
        None => (path, false),
    };
    let names = bare
        .split('.')
        .map(|segment| SlotName::parse(segment.trim()).ok_or_else(unknown))
        .collect::<Result<Vec<_>, _>>()?;
    if names.is_empty() {
        return Err(unknown());
    }
    Ok((names, question))
}

/// First span inside `window` whose surface text equals `text`.
fn locate(sentence: &ParsedSentence, window: TokenSpan, text: &str) -> Option<TokenSpan> {
    let wanted = text.trim();
    if wanted.is_empty() {
        return None;
    }
    (window.start..window.end).find_map(|start| {
        (start + 1..=window.end)
            .map(|end| TokenSpan::new(start, end))
            .find(|span| sentence.span_text(span) == wanted)
    })
}

impl GroupExample {
    pub fn new(id: impl Into<String>, slots: SlotMap) -> Self {
        Self { id: id.into(), slots }
    }

    /// Builds an example from a parsed sentence and a `path → text` map such
    /// as `{"S": "She", "O1?": "What", "O1.sub-v": "lives"}`. Each text is
    /// located inside its parent slot, so nesting must be consistent.
    pub fn from_expected(
        id: impl Into<String>,
        sentence: &ParsedSentence,
        expected: &BTreeMap<String, String>,
    ) -> Result<Self, PopulationError> {
        let mut entries = expected
            .iter()
            .map(|(path, text)| parse_slot_path(path).map(|(names, question)| (path, names, question, text)))
            .collect::<Result<Vec<_>, _>>()?;
        // parents before children
        entries.sort_by_key(|(_, names, _, _)| names.len());

        let mut slots = SlotMap::new();
        for (path, names, question, text) in entries {
            let (last, parents) = names.split_last().ok_or_else(|| PopulationError::UnknownSlot {
                label: path.clone(),
            })?;
            let depth = parents.len() as u8;

            let parent = match parents.split_first() {
                None => None,
                Some((top, rest)) => {
                    let mut node = slots.get_mut(*top);
                    for name in rest {
                        node = node.and_then(|slot| slot.sub_slots.iter_mut().find(|s| s.name == *name));
                    }
                    Some(node.ok_or_else(|| PopulationError::OrphanSubSlot { path: path.clone() })?)
                }
            };

            let window = parent.as_ref().map_or(sentence.full_span(), |p| p.span);
            let span = locate(sentence, window, text).ok_or_else(|| PopulationError::Unlocated {
                label: path.clone(),
                text: text.clone(),
            })?;
            let mut slot = Slot::new(*last, span, 1.0).at_depth(depth).with_text(sentence);
            slot.question = question;

            match parent {
                Some(parent) => {
                    parent.sub_slots.retain(|s| s.name != *last);
                    parent.sub_slots.push(slot);
                    parent.sub_slots.sort_by_key(|s| s.name);
                }
                None => {
                    slots.insert(slot);
                }
            }
        }
        Ok(Self::new(id, slots))
    }
}

/// Read access to the external corpus.
pub trait GroupPopulationSource: Send + Sync {
    fn group_population(&self, v_group: &str) -> Result<Vec<GroupExample>, PopulationError>;
}

/// An in-memory population, for tools and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticPopulation {
    groups: HashMap<String, Vec<GroupExample>>,
}

impl StaticPopulation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, v_group: impl Into<String>, examples: Vec<GroupExample>) {
        self.groups.insert(v_group.into(), examples);
    }

    pub fn push(&mut self, v_group: &str, example: GroupExample) {
        self.groups.entry(v_group.to_string()).or_default().push(example);
    }
}

impl GroupPopulationSource for StaticPopulation {
    fn group_population(&self, v_group: &str) -> Result<Vec<GroupExample>, PopulationError> {
        self.groups
            .get(v_group)
            .cloned()
            .ok_or_else(|| PopulationError::UnknownGroup(v_group.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::fixtures::parse;

    fn expected(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_parse_slot_path() {
        assert_eq!(parse_slot_path("O1").unwrap(), (vec![SlotName::O1], false));
        assert_eq!(
            parse_slot_path("S.sub-v").unwrap(),
            (vec![SlotName::S, SlotName::V], false)
        );
        assert_eq!(parse_slot_path("O1?").unwrap(), (vec![SlotName::O1], true));
        assert!(parse_slot_path("X9").is_err());
    }

    #[test]
    fn test_from_expected_with_nesting() {
        let (sentence, _) = parse("The man who lives here closed the door");
        let example = GroupExample::from_expected(
            "ex-1",
            &sentence,
            &expected(&[
                ("S", "The man who lives here"),
                ("S.sub-v", "lives"),
                ("S.sub-s", "who"),
                ("V", "closed"),
                ("O1", "the door"),
            ]),
        )
        .unwrap();

        let s = example.slots.get(SlotName::S).unwrap();
        assert_eq!(s.span, TokenSpan::new(0, 5));
        let subs: Vec<&str> = s.sub_slots.iter().map(|s| s.label()).collect();
        assert_eq!(subs, vec!["sub-s", "sub-v"]);
        assert_eq!(example.slots.get(SlotName::O1).unwrap().span.start, 6);
    }

    #[test]
    fn test_from_expected_errors() {
        let (sentence, _) = parse("She gave him a book");

        let missing = GroupExample::from_expected("x", &sentence, &expected(&[("O2", "a pen")]));
        assert!(matches!(missing, Err(PopulationError::Unlocated { .. })));

        let orphan = GroupExample::from_expected("x", &sentence, &expected(&[("O2.sub-v", "book")]));
        assert!(matches!(orphan, Err(PopulationError::OrphanSubSlot { .. })));
    }

    #[test]
    fn test_static_population() {
        let mut population = StaticPopulation::new();
        population.push("give", GroupExample::new("a", SlotMap::new()));
        assert_eq!(population.group_population("give").unwrap().len(), 1);
        assert_eq!(
            population.group_population("take"),
            Err(PopulationError::UnknownGroup("take".to_string()))
        );
    }
}
