//! Strategy selection and claim merging, shared by the top-level
//! coordinator and the nested decomposer.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use clausemap_protocol::{Slot, SlotName};
use serde::Serialize;

use crate::config::EngineConfig;
use crate::detector::{DetectorKind, DetectorResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CoordinationStrategy {
    SingleOptimal,
    FoundationPlusSpecialist,
    MultiCooperative,
    /// Nothing cleared the applicability floor.
    NoDetector,
}

impl CoordinationStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            CoordinationStrategy::SingleOptimal => "single-optimal",
            CoordinationStrategy::FoundationPlusSpecialist => "foundation-plus-specialist",
            CoordinationStrategy::MultiCooperative => "multi-cooperative",
            CoordinationStrategy::NoDetector => "none",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionThresholds {
    pub floor: f32,
    pub threshold: f32,
    pub margin: f32,
}

impl SelectionThresholds {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            floor: config.applicability_floor,
            threshold: config.active_threshold,
            margin: config.dominance_margin,
        }
    }
}

impl Default for SelectionThresholds {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

/// What selection needs to know about one scored detector.
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    pub kind: DetectorKind,
    pub priority: u8,
    pub order: usize,
    pub score: f32,
}

/// Picks a strategy and the candidates (indices into `candidates`) that run.
pub fn select_strategy(candidates: &[Candidate], t: &SelectionThresholds) -> (CoordinationStrategy, Vec<usize>) {
    let mut ranked: Vec<usize> = (0..candidates.len())
        .filter(|&i| candidates[i].score >= t.floor)
        .collect();
    ranked.sort_by(|&a, &b| {
        let (a, b) = (&candidates[a], &candidates[b]);
        b.score
            .total_cmp(&a.score)
            .then(a.priority.cmp(&b.priority))
            .then(a.order.cmp(&b.order))
    });

    let Some(&best) = ranked.first() else {
        return (CoordinationStrategy::NoDetector, Vec::new());
    };
    let active: Vec<usize> = ranked
        .iter()
        .copied()
        .filter(|&i| candidates[i].score >= t.threshold)
        .collect();

    match active.as_slice() {
        [] => (CoordinationStrategy::SingleOptimal, vec![best]),
        [only] => (CoordinationStrategy::SingleOptimal, vec![*only]),
        [first, second] => {
            let kinds = (candidates[*first].kind, candidates[*second].kind);
            match kinds {
                (DetectorKind::Foundation, DetectorKind::Specialist)
                | (DetectorKind::Specialist, DetectorKind::Foundation) => {
                    (CoordinationStrategy::FoundationPlusSpecialist, vec![*first, *second])
                }
                _ if candidates[*first].score - candidates[*second].score >= t.margin => {
                    (CoordinationStrategy::SingleOptimal, vec![*first])
                }
                _ => (CoordinationStrategy::MultiCooperative, vec![*first, *second]),
            }
        }
        _ => (CoordinationStrategy::MultiCooperative, active),
    }
}

/// A slot together with where it came from.
#[derive(Debug, Clone)]
pub struct Claim {
    pub slot: Slot,
    pub detector: &'static str,
    pub priority: u8,
    pub order: usize,
}

/// Higher confidence first, then lower priority, then earlier registration.
pub fn rank(a: &Claim, b: &Claim) -> Ordering {
    b.slot
        .confidence
        .total_cmp(&a.slot.confidence)
        .then(a.priority.cmp(&b.priority))
        .then(a.order.cmp(&b.order))
}

#[derive(Debug, Clone, Default)]
pub struct MergeOutcome {
    /// Surviving claims, one per slot name, in canonical slot order.
    pub accepted: Vec<Claim>,
    /// Claims that lost to an overlapping higher-ranked claim.
    pub dropped: Vec<Claim>,
}

impl MergeOutcome {
    /// Detectors with at least one surviving claim, by priority then order.
    pub fn contributors(&self) -> Vec<&'static str> {
        let mut seen: Vec<(u8, usize, &'static str)> = self
            .accepted
            .iter()
            .map(|c| (c.priority, c.order, c.detector))
            .collect();
        seen.sort();
        seen.dedup();
        seen.into_iter().map(|(_, _, id)| id).collect()
    }
}

/// Merges the results of the detectors chosen by [`select_strategy`].
pub fn merge_results(strategy: CoordinationStrategy, results: &[DetectorResult]) -> MergeOutcome {
    let mut by_name: BTreeMap<SlotName, Claim> = BTreeMap::new();
    let claims_of = |result: &DetectorResult| -> Vec<Claim> {
        result
            .slots
            .iter()
            .map(|slot| Claim {
                slot: slot.clone(),
                detector: result.detector,
                priority: result.priority,
                order: result.order,
            })
            .collect()
    };

    match strategy {
        CoordinationStrategy::NoDetector => return MergeOutcome::default(),
        CoordinationStrategy::SingleOptimal => {
            if let Some(result) = results.first() {
                for claim in claims_of(result) {
                    by_name.entry(claim.slot.name).or_insert(claim);
                }
            }
        }
        CoordinationStrategy::FoundationPlusSpecialist => {
            // foundation fills everything, the specialist overrides its own names
            let (foundation, rest): (Vec<&DetectorResult>, Vec<&DetectorResult>) =
                results.iter().partition(|r| r.kind == DetectorKind::Foundation);
            for result in foundation.into_iter().chain(rest) {
                let mut own: BTreeMap<SlotName, Claim> = BTreeMap::new();
                for claim in claims_of(result) {
                    own.entry(claim.slot.name).or_insert(claim);
                }
                by_name.extend(own);
            }
        }
        CoordinationStrategy::MultiCooperative => {
            for claim in results.iter().flat_map(claims_of) {
                let wins = by_name
                    .get(&claim.slot.name)
                    .map_or(true, |held| rank(&claim, held) == Ordering::Less);
                if wins {
                    by_name.insert(claim.slot.name, claim);
                }
            }
        }
    }

    resolve_overlaps(by_name.into_values().collect())
}

/// Keeps sibling spans disjoint: walking claims from best to worst, a claim
/// overlapping an already accepted one is dropped.
fn resolve_overlaps(mut claims: Vec<Claim>) -> MergeOutcome {
    claims.sort_by(rank);
    let mut outcome = MergeOutcome::default();
    for claim in claims {
        let clash = outcome
            .accepted
            .iter()
            .find(|held| held.slot.span.overlaps(&claim.slot.span))
            .map(|held| held.slot.name);
        match clash {
            Some(winner) => {
                tracing::debug!(
                    slot = claim.slot.name.as_str(),
                    detector = claim.detector,
                    winner = winner.as_str(),
                    "overlapping claim dropped"
                );
                outcome.dropped.push(claim);
            }
            None => outcome.accepted.push(claim),
        }
    }
    outcome.accepted.sort_by_key(|c| c.slot.name);
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use clausemap_protocol::TokenSpan;
    use proptest::prelude::*;

    fn candidate(kind: DetectorKind, priority: u8, order: usize, score: f32) -> Candidate {
        Candidate { kind, priority, order, score }
    }

    fn result(
        detector: &'static str,
        kind: DetectorKind,
        priority: u8,
        order: usize,
        slots: Vec<Slot>,
    ) -> DetectorResult {
        DetectorResult { detector, kind, priority, order, score: 0.9, slots }
    }

    fn slot(name: SlotName, start: u32, confidence: f32) -> Slot {
        Slot::new(name, TokenSpan::new(start, start + 1), confidence)
    }

    #[test]
    fn test_nothing_applicable() {
        let t = SelectionThresholds::default();
        let c = [candidate(DetectorKind::Foundation, 50, 0, 0.05)];
        assert_eq!(select_strategy(&c, &t), (CoordinationStrategy::NoDetector, vec![]));
        assert_eq!(select_strategy(&[], &t).0, CoordinationStrategy::NoDetector);
    }

    #[test]
    fn test_weak_scores_fall_back_to_best() {
        let t = SelectionThresholds::default();
        let c = [
            candidate(DetectorKind::Foundation, 50, 0, 0.2),
            candidate(DetectorKind::Specialist, 10, 1, 0.3),
        ];
        assert_eq!(select_strategy(&c, &t), (CoordinationStrategy::SingleOptimal, vec![1]));
    }

    #[test]
    fn test_foundation_and_specialist() {
        let t = SelectionThresholds::default();
        let c = [
            candidate(DetectorKind::Foundation, 50, 0, 0.9),
            candidate(DetectorKind::Specialist, 30, 1, 0.7),
            candidate(DetectorKind::Specialist, 10, 2, 0.0),
        ];
        assert_eq!(
            select_strategy(&c, &t),
            (CoordinationStrategy::FoundationPlusSpecialist, vec![0, 1])
        );
    }

    #[test]
    fn test_two_specialists_dominance_and_cooperation() {
        let t = SelectionThresholds::default();
        let dominant = [
            candidate(DetectorKind::Specialist, 10, 0, 0.95),
            candidate(DetectorKind::Specialist, 20, 1, 0.6),
        ];
        assert_eq!(select_strategy(&dominant, &t), (CoordinationStrategy::SingleOptimal, vec![0]));

        let close = [
            candidate(DetectorKind::Specialist, 10, 0, 0.8),
            candidate(DetectorKind::Generic, 20, 1, 0.7),
        ];
        assert_eq!(
            select_strategy(&close, &t),
            (CoordinationStrategy::MultiCooperative, vec![0, 1])
        );
    }

    #[test]
    fn test_three_active_cooperate() {
        let t = SelectionThresholds::default();
        let c = [
            candidate(DetectorKind::Foundation, 50, 0, 0.6),
            candidate(DetectorKind::Specialist, 30, 1, 0.7),
            candidate(DetectorKind::Specialist, 15, 2, 0.85),
        ];
        assert_eq!(
            select_strategy(&c, &t),
            (CoordinationStrategy::MultiCooperative, vec![2, 1, 0])
        );
    }

    #[test]
    fn test_specialist_overrides_only_its_claims() {
        let foundation = result(
            "basic",
            DetectorKind::Foundation,
            50,
            0,
            vec![slot(SlotName::S, 1, 0.8), slot(SlotName::V, 2, 0.8)],
        );
        let specialist = result(
            "relative",
            DetectorKind::Specialist,
            10,
            1,
            vec![Slot::new(SlotName::S, TokenSpan::new(0, 2), 0.85)],
        );

        let merged = merge_results(CoordinationStrategy::FoundationPlusSpecialist, &[specialist, foundation]);
        assert_eq!(merged.accepted.len(), 2);
        assert_eq!(merged.accepted[0].detector, "relative");
        assert_eq!(merged.accepted[0].slot.span, TokenSpan::new(0, 2));
        assert_eq!(merged.accepted[1].detector, "basic");
        assert_eq!(merged.contributors(), vec!["relative", "basic"]);
    }

    #[test]
    fn test_overlapping_claims_are_dropped() {
        let a = result("a", DetectorKind::Specialist, 10, 0, vec![Slot::new(SlotName::S, TokenSpan::new(0, 3), 0.9)]);
        let b = result("b", DetectorKind::Specialist, 20, 1, vec![slot(SlotName::O1, 2, 0.7)]);

        let merged = merge_results(CoordinationStrategy::MultiCooperative, &[a, b]);
        assert_eq!(merged.accepted.len(), 1);
        assert_eq!(merged.dropped.len(), 1);
        assert_eq!(merged.dropped[0].slot.name, SlotName::O1);
        assert_eq!(merged.contributors(), vec!["a"]);
    }

    proptest! {
        #[test]
        fn prop_higher_confidence_wins(c1 in 0.0f32..1.0, c2 in 0.0f32..1.0, swap in any::<bool>()) {
            let a = result("a", DetectorKind::Specialist, 10, 0, vec![slot(SlotName::O1, 3, c1)]);
            let b = result("b", DetectorKind::Generic, 40, 1, vec![slot(SlotName::O1, 5, c2)]);
            let results = if swap { vec![b, a] } else { vec![a, b] };

            let merged = merge_results(CoordinationStrategy::MultiCooperative, &results);
            prop_assert_eq!(merged.accepted.len(), 1);
            let expected = if c2 > c1 { "b" } else { "a" };
            prop_assert_eq!(merged.accepted[0].detector, expected);
        }

        #[test]
        fn prop_equal_confidence_resolved_by_priority(c in 0.0f32..1.0, pa in 0u8..100, pb in 0u8..100, swap in any::<bool>()) {
            prop_assume!(pa != pb);
            let a = result("a", DetectorKind::Specialist, pa, 0, vec![slot(SlotName::M1, 1, c)]);
            let b = result("b", DetectorKind::Specialist, pb, 1, vec![slot(SlotName::M1, 4, c)]);
            let results = if swap { vec![b, a] } else { vec![a, b] };

            let merged = merge_results(CoordinationStrategy::MultiCooperative, &results);
            let expected = if pa < pb { "a" } else { "b" };
            prop_assert_eq!(merged.accepted[0].detector, expected);
        }
    }
}
