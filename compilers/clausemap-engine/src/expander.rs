use std::collections::{BTreeMap, BTreeSet};

use clausemap_protocol::{RelationSet, SlotName, TokenId, TokenSpan};
use serde::Serialize;

use crate::view::SentenceView;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExpansionOutcome {
    Expanded,
    Unchanged,
    /// The grown span would not be contiguous; the minimal span was kept.
    Ambiguous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expansion {
    pub span: TokenSpan,
    pub outcome: ExpansionOutcome,
}

/// Built-in per-slot relation lists.
pub fn default_rules() -> BTreeMap<SlotName, RelationSet> {
    let nominal = RelationSet::DET
        | RelationSet::PREDET
        | RelationSet::AMOD
        | RelationSet::COMPOUND
        | RelationSet::POSS
        | RelationSet::CASE
        | RelationSet::NUMMOD
        | RelationSet::NMOD
        | RelationSet::PREP
        | RelationSet::POBJ
        | RelationSet::RELCL
        | RelationSet::ACL
        | RelationSet::APPOS
        | RelationSet::ADVMOD
        | RelationSet::NEG;
    // a clausal filler (`to leave`, `that she left`) keeps its whole clause
    let clausal = RelationSet::AUX
        | RelationSet::MARK
        | RelationSet::NSUBJ
        | RelationSet::DOBJ
        | RelationSet::DATIVE
        | RelationSet::ATTR
        | RelationSet::ACOMP
        | RelationSet::XCOMP
        | RelationSet::CCOMP
        | RelationSet::PRT;
    let verbal = RelationSet::AUX | RelationSet::AUXPASS | RelationSet::NEG | RelationSet::PRT;
    let adverbial = RelationSet::ADVMOD
        | RelationSet::POBJ
        | RelationSet::PCOMP
        | RelationSet::PREP
        | RelationSet::DET
        | RelationSet::AMOD
        | RelationSet::COMPOUND
        | RelationSet::POSS
        | RelationSet::NUMMOD
        | RelationSet::CASE;

    let mut rules = BTreeMap::new();
    for name in SlotName::ALL {
        let set = match name {
            _ if name.is_nominal() => nominal | clausal,
            SlotName::V => verbal,
            SlotName::Aux => RelationSet::NEG,
            _ => adverbial,
        };
        rules.insert(name, set);
    }
    rules
}

/// Grows minimal slot spans along configured dependency relations.
#[derive(Debug, Clone)]
pub struct BoundaryExpander {
    rules: BTreeMap<SlotName, RelationSet>,
}

impl BoundaryExpander {
    pub fn new(rules: BTreeMap<SlotName, RelationSet>) -> Self {
        Self { rules }
    }

    pub fn with_defaults() -> Self {
        Self::new(default_rules())
    }

    pub fn rules_for(&self, name: SlotName) -> RelationSet {
        self.rules.get(&name).copied().unwrap_or_else(RelationSet::empty)
    }

    /// Grows `minimal` by the subtrees of its head's qualifying dependents.
    ///
    /// A dependent is taken whole or not at all: if any token of its subtree
    /// lies outside the view or inside a `claimed` span it is skipped. One
    /// pass over the direct children suffices since subtrees come along.
    pub fn expand(
        &self,
        name: SlotName,
        minimal: TokenSpan,
        view: &SentenceView<'_>,
        claimed: &[TokenSpan],
    ) -> Expansion {
        let unchanged = Expansion { span: minimal, outcome: ExpansionOutcome::Unchanged };
        if minimal.is_empty() {
            return unchanged;
        }
        let sentence = view.sentence();
        let graph = view.graph();

        // the span's head: the token whose own head lies outside the span
        let Some(head) = minimal
            .tokens()
            .filter_map(|id| sentence.token(id))
            .find(|t| t.head == t.id || !minimal.contains(t.head))
        else {
            return unchanged;
        };

        let rules = self.rules_for(name);
        let blocked = |id: TokenId| !view.contains(id) || claimed.iter().any(|span| span.contains(id));
        let mut covered: BTreeSet<u32> = minimal.tokens().map(|id| id.0).collect();

        for (child, relation) in graph.children(head.id) {
            if minimal.contains(child) || !rules.has(relation) {
                continue;
            }
            let subtree = graph.subtree(child);
            if subtree.iter().any(|&id| blocked(id)) {
                tracing::trace!(
                    slot = name.as_str(),
                    child = child.0,
                    relation = relation.label(),
                    "dependent blocked by a claimed or out-of-view token"
                );
                continue;
            }
            covered.extend(subtree.iter().map(|id| id.0));
        }

        if covered.len() == minimal.len() {
            return unchanged;
        }
        let (Some(&start), Some(&last)) = (covered.first(), covered.last()) else {
            return unchanged;
        };
        let span = TokenSpan::new(start, last + 1);
        if span.len() != covered.len() {
            tracing::debug!(slot = name.as_str(), "expansion not contiguous, keeping minimal span");
            return Expansion { span: minimal, outcome: ExpansionOutcome::Ambiguous };
        }
        tracing::trace!(slot = name.as_str(), from = ?minimal, to = ?span, "slot expanded");
        Expansion { span, outcome: ExpansionOutcome::Expanded }
    }
}

impl Default for BoundaryExpander {
    fn default() -> Self {
        Self::with_defaults()
    }
}
