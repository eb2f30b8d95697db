//! Absolute column order for the slots of one V-group.
//!
//! Every slot path ever seen in a group's population gets a column, sorted
//! by where that slot tends to start in the sentence. Sentences of the group
//! are then laid out against those columns, with explicit gaps for slots
//! they lack.

use std::collections::HashMap;
use std::fmt;

use clausemap_protocol::{SlotMap, TokenSpan};
use rkyv::ser::serializers::AllocSerializer;
use rkyv::ser::Serializer;
use rkyv::{Archive, Deserialize, Serialize};
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};

use crate::error::SnapshotError;
use crate::population::GroupExample;

/// Identity of a column: the dotted slot path plus whether a question word
/// fills it. `O1` and `O1?` never share a column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize)]
#[archive(check_bytes)]
pub struct OrderKey {
    pub path: String,
    pub question: bool,
}

impl OrderKey {
    pub fn new(path: impl Into<String>, question: bool) -> Self {
        Self { path: path.into(), question }
    }

    pub fn label(&self) -> String {
        if self.question {
            format!("{}?", self.path)
        } else {
            self.path.clone()
        }
    }
}

impl fmt::Display for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)?;
        if self.question {
            f.write_str("?")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize)]
#[archive(check_bytes)]
pub struct OrderColumn {
    pub key: OrderKey,
    pub column: u32,
    pub mean_position: f64,
    pub occurrences: u32,
}

#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize)]
#[archive(check_bytes)]
pub struct OrderTable {
    pub v_group: String,
    /// `columns[i].column == i` always holds.
    pub columns: Vec<OrderColumn>,
    pub population_size: u32,
    /// Set when assignment met a key the population never showed.
    pub needs_rebuild: bool,
}

/// A slot (or a reserved gap) placed in its column.
#[derive(Debug, Clone, PartialEq, SerdeSerialize)]
pub struct PositionedSlot {
    pub key: OrderKey,
    pub column: u32,
    /// The column is reserved but this sentence has no such slot.
    pub empty: bool,
    pub text: Option<String>,
    pub span: Option<TokenSpan>,
}

#[derive(Debug, Clone, PartialEq, Default, SerdeSerialize)]
pub struct Assignment {
    /// One entry per column, in column order.
    pub positioned: Vec<PositionedSlot>,
    /// Keys the table had never seen, appended as trailing columns.
    pub appended: Vec<OrderKey>,
}

impl Assignment {
    pub fn is_stale(&self) -> bool {
        !self.appended.is_empty()
    }
}

/// Every `(key, start position)` occurrence in a slot map, pre-order.
pub fn occurrences(slots: &SlotMap) -> Vec<(OrderKey, u32)> {
    slots
        .flatten()
        .into_iter()
        .map(|(path, slot)| (OrderKey::new(path, slot.question), slot.span.start))
        .collect()
}

#[derive(Default)]
struct Stats {
    // first-seen order
    keys: Vec<OrderKey>,
    index: HashMap<OrderKey, usize>,
    sums: Vec<f64>,
    counts: Vec<u32>,
}

impl Stats {
    fn collect(population: &[GroupExample]) -> Self {
        let mut stats = Stats::default();
        for example in population {
            for (key, position) in occurrences(&example.slots) {
                let i = match stats.index.get(&key) {
                    Some(&i) => i,
                    None => {
                        stats.index.insert(key.clone(), stats.keys.len());
                        stats.keys.push(key);
                        stats.sums.push(0.0);
                        stats.counts.push(0);
                        stats.keys.len() - 1
                    }
                };
                stats.sums[i] += f64::from(position);
                stats.counts[i] += 1;
            }
        }
        stats
    }

    fn mean(&self, i: usize) -> f64 {
        self.sums[i] / f64::from(self.counts[i].max(1))
    }

    fn mean_of(&self, key: &OrderKey) -> Option<(f64, u32)> {
        self.index.get(key).map(|&i| (self.mean(i), self.counts[i]))
    }

    /// Columns sorted by mean position; the sort is stable so ties keep
    /// first-seen order.
    fn columns(&self, keys: impl Iterator<Item = usize>, first_column: u32) -> Vec<OrderColumn> {
        let mut ranked: Vec<usize> = keys.collect();
        ranked.sort_by(|&a, &b| self.mean(a).total_cmp(&self.mean(b)));
        ranked
            .into_iter()
            .enumerate()
            .map(|(n, i)| OrderColumn {
                key: self.keys[i].clone(),
                column: first_column + n as u32,
                mean_position: self.mean(i),
                occurrences: self.counts[i],
            })
            .collect()
    }
}

impl OrderTable {
    pub fn build(v_group: impl Into<String>, population: &[GroupExample]) -> Self {
        let stats = Stats::collect(population);
        let table = Self {
            v_group: v_group.into(),
            columns: stats.columns(0..stats.keys.len(), 0),
            population_size: population.len() as u32,
            needs_rebuild: false,
        };
        tracing::debug!(v_group = %table.v_group, columns = table.columns.len(), "order table built");
        table
    }

    /// Rebuild against a changed population. Every column up to the last one
    /// whose mean stayed within `tolerance` keeps its number (drifted ones in
    /// that range only get a new mean). The drifted run after it is re-sorted
    /// together with the keys the table has never seen.
    pub fn rebuild_stable(&self, population: &[GroupExample], tolerance: f64) -> Self {
        let stats = Stats::collect(population);
        let moved: Vec<bool> = self
            .columns
            .iter()
            .map(|c| {
                stats
                    .mean_of(&c.key)
                    .map_or(false, |(mean, _)| (mean - c.mean_position).abs() > tolerance)
            })
            .collect();
        let settled = moved.iter().rposition(|m| !m).map_or(0, |i| i + 1);

        let mut columns: Vec<OrderColumn> = self.columns[..settled]
            .iter()
            .zip(&moved)
            .map(|(c, &drifted)| {
                if drifted {
                    tracing::debug!(v_group = %self.v_group, key = %c.key, column = c.column, "column drifted, number kept");
                }
                match stats.mean_of(&c.key) {
                    Some((mean, count)) => OrderColumn {
                        mean_position: mean,
                        occurrences: count,
                        ..c.clone()
                    },
                    None => c.clone(),
                }
            })
            .collect();
        let trailing = (0..stats.keys.len()).filter(|&i| {
            self.column_of(&stats.keys[i])
                .map_or(true, |column| column as usize >= settled)
        });
        columns.extend(stats.columns(trailing, settled as u32));

        Self {
            v_group: self.v_group.clone(),
            columns,
            population_size: population.len() as u32,
            needs_rebuild: false,
        }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn column_of(&self, key: &OrderKey) -> Option<u32> {
        self.columns.iter().find(|c| &c.key == key).map(|c| c.column)
    }

    /// Lays `slots` out over the table's columns. A key the table never saw
    /// becomes a new trailing column and flags the table for rebuild.
    pub fn assign(&mut self, slots: &SlotMap) -> Assignment {
        let mut assignment = Assignment::default();
        let mut filled: HashMap<u32, PositionedSlot> = HashMap::new();

        for (path, slot) in slots.flatten() {
            let key = OrderKey::new(path, slot.question);
            let column = match self.column_of(&key) {
                Some(column) => column,
                None => {
                    let column = self.columns.len() as u32;
                    tracing::warn!(v_group = %self.v_group, key = %key, column, "slot not in order table, appending column");
                    self.columns.push(OrderColumn {
                        key: key.clone(),
                        column,
                        mean_position: f64::from(slot.span.start),
                        occurrences: 0,
                    });
                    self.needs_rebuild = true;
                    assignment.appended.push(key.clone());
                    column
                }
            };
            filled.insert(
                column,
                PositionedSlot {
                    key,
                    column,
                    empty: false,
                    text: Some(slot.text.clone()),
                    span: Some(slot.span),
                },
            );
        }

        assignment.positioned = self
            .columns
            .iter()
            .map(|c| {
                filled.remove(&c.column).unwrap_or_else(|| PositionedSlot {
                    key: c.key.clone(),
                    column: c.column,
                    empty: true,
                    text: None,
                    span: None,
                })
            })
            .collect();
        assignment
    }

    pub fn to_snapshot(&self) -> Result<Vec<u8>, SnapshotError> {
        let mut serializer = AllocSerializer::<1024>::default();
        serializer
            .serialize_value(self)
            .map_err(|e| SnapshotError::Write(format!("{:?}", e)))?;
        Ok(serializer.into_serializer().into_inner().to_vec())
    }

    pub fn from_snapshot(bytes: &[u8]) -> Result<Self, SnapshotError> {
        // archives must be read from aligned memory
        let mut aligned = rkyv::AlignedVec::with_capacity(bytes.len());
        aligned.extend_from_slice(bytes);
        rkyv::from_bytes::<OrderTable>(&aligned).map_err(|e| SnapshotError::Corrupt(format!("{:?}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clausemap_protocol::{Slot, SlotName};
    use proptest::prelude::*;

    fn slot(name: SlotName, start: u32, len: u32) -> Slot {
        let mut slot = Slot::new(name, TokenSpan::new(start, start + len), 1.0);
        slot.text = format!("{}@{}", name, start);
        slot
    }

    fn example(id: &str, slots: Vec<Slot>) -> GroupExample {
        GroupExample::new(id, slots.into_iter().collect())
    }

    fn give_population() -> Vec<GroupExample> {
        vec![
            // She gave him a book yesterday
            example(
                "a",
                vec![
                    slot(SlotName::S, 0, 1),
                    slot(SlotName::V, 1, 1),
                    slot(SlotName::O1, 2, 1),
                    slot(SlotName::O2, 3, 2),
                    slot(SlotName::M1, 5, 1),
                ],
            ),
            // The coach gave the class homework
            example(
                "b",
                vec![
                    slot(SlotName::S, 0, 2),
                    slot(SlotName::V, 2, 1),
                    slot(SlotName::O1, 3, 2),
                    slot(SlotName::O2, 5, 1),
                ],
            ),
        ]
    }

    fn labels(table: &OrderTable) -> Vec<String> {
        table.columns.iter().map(|c| c.key.label()).collect()
    }

    #[test]
    fn test_build_sorts_by_mean_position() {
        let table = OrderTable::build("give", &give_population());
        assert_eq!(labels(&table), vec!["S", "V", "O1", "O2", "M1"]);
        assert_eq!(table.columns[2].mean_position, 2.5);
        assert_eq!(table.columns[4].occurrences, 1);
        assert_eq!(table.population_size, 2);
        assert!(table.columns.iter().enumerate().all(|(i, c)| c.column == i as u32));
    }

    #[test]
    fn test_ties_keep_first_seen_order() {
        let population = vec![
            example("a", vec![slot(SlotName::M1, 0, 1)]),
            example("b", vec![slot(SlotName::S, 0, 1)]),
        ];
        let table = OrderTable::build("g", &population);
        assert_eq!(labels(&table), vec!["M1", "S"]);
    }

    #[test]
    fn test_question_word_gets_its_own_column() {
        let population = vec![
            example("a", vec![slot(SlotName::S, 0, 1), slot(SlotName::V, 1, 1), slot(SlotName::O1, 2, 1)]),
            example(
                "b",
                vec![slot(SlotName::O1, 0, 1).question_word(), slot(SlotName::S, 2, 1), slot(SlotName::V, 3, 1)],
            ),
        ];
        let table = OrderTable::build("see", &population);
        assert_eq!(labels(&table), vec!["O1?", "S", "V", "O1"]);
    }

    #[test]
    fn test_missing_slot_reserves_empty_column() {
        let mut table = OrderTable::build("give", &give_population());
        let sentence: SlotMap = vec![
            slot(SlotName::S, 0, 1),
            slot(SlotName::V, 1, 1),
            slot(SlotName::O1, 2, 1),
            slot(SlotName::O2, 3, 1),
        ]
        .into_iter()
        .collect();

        let assignment = table.assign(&sentence);
        assert!(!assignment.is_stale());
        assert_eq!(assignment.positioned.len(), 5);
        let m1 = &assignment.positioned[4];
        assert_eq!((m1.key.label(), m1.column, m1.empty), ("M1".to_string(), 4, true));
        assert!(assignment.positioned[..4].iter().all(|p| !p.empty));
    }

    #[test]
    fn test_unknown_key_appends_and_flags() {
        let mut table = OrderTable::build("give", &give_population());
        let sentence: SlotMap = vec![slot(SlotName::S, 0, 1), slot(SlotName::C1, 1, 1)].into_iter().collect();

        let assignment = table.assign(&sentence);
        assert_eq!(assignment.appended, vec![OrderKey::new("C1", false)]);
        assert!(table.needs_rebuild);
        assert_eq!(table.column_of(&OrderKey::new("C1", false)), Some(5));
        assert_eq!(assignment.positioned.len(), 6);
        assert!(!assignment.positioned[5].empty);
    }

    #[test]
    fn test_nested_paths_are_columns() {
        let mut s = slot(SlotName::S, 0, 5);
        s.sub_slots = vec![slot(SlotName::S, 2, 1).at_depth(1), slot(SlotName::V, 3, 1).at_depth(1)];
        let table = OrderTable::build("g", &[example("a", vec![s, slot(SlotName::V, 5, 1)])]);
        assert_eq!(labels(&table), vec!["S", "S.sub-s", "S.sub-v", "V"]);
    }

    #[test]
    fn test_stable_rebuild_appends_new_keys() {
        let mut population = give_population();
        let table = OrderTable::build("give", &population);

        population.push(example(
            "c",
            vec![
                slot(SlotName::S, 0, 1),
                slot(SlotName::Aux, 1, 1),
                slot(SlotName::V, 2, 1),
                slot(SlotName::O1, 3, 1),
                slot(SlotName::O2, 4, 1),
            ],
        ));
        let rebuilt = table.rebuild_stable(&population, 0.75);
        assert_eq!(labels(&rebuilt), vec!["S", "V", "O1", "O2", "M1", "Aux"]);
        assert_eq!(rebuilt.population_size, 3);

        // V and O1 drift past a tight tolerance but settled columns follow them
        let tight = table.rebuild_stable(&population, 0.1);
        assert_eq!(labels(&tight), labels(&rebuilt));
        assert!((tight.columns[1].mean_position - 5.0 / 3.0).abs() < 1e-9);
        // only a fresh build sorts Aux by position
        assert_eq!(labels(&OrderTable::build("give", &population)), vec!["S", "Aux", "V", "O1", "O2", "M1"]);
    }

    #[test]
    fn test_drifted_trailing_column_is_resorted_alone() {
        let mut population = vec![example(
            "a",
            vec![slot(SlotName::S, 0, 1), slot(SlotName::V, 1, 1), slot(SlotName::O1, 2, 1), slot(SlotName::M1, 3, 1)],
        )];
        let table = OrderTable::build("close", &population);

        population.push(example("b", vec![slot(SlotName::M1, 0, 1), slot(SlotName::C1, 1, 1)]));
        let rebuilt = table.rebuild_stable(&population, 0.5);
        for key in ["S", "V", "O1"] {
            let key = OrderKey::new(key, false);
            assert_eq!(rebuilt.column_of(&key), table.column_of(&key));
        }
        // M1 (mean 1.5) and the new C1 (mean 1) share the tail, sorted by mean
        assert_eq!(labels(&rebuilt), vec!["S", "V", "O1", "C1", "M1"]);
        assert!(rebuilt.columns.iter().enumerate().all(|(i, c)| c.column == i as u32));
    }

    #[test]
    fn test_drifted_column_before_settled_ones_keeps_its_number() {
        let mut population = vec![example(
            "a",
            vec![slot(SlotName::S, 0, 1), slot(SlotName::M1, 1, 1), slot(SlotName::V, 2, 1), slot(SlotName::O1, 3, 1)],
        )];
        let table = OrderTable::build("close", &population);

        population.push(example("b", vec![slot(SlotName::M1, 6, 1)]));
        let rebuilt = table.rebuild_stable(&population, 0.5);
        assert_eq!(labels(&rebuilt), labels(&table));
        assert_eq!(rebuilt.columns[1].mean_position, 3.5);
        assert_eq!(rebuilt.columns[1].occurrences, 2);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let table = OrderTable::build("give", &give_population());
        let bytes = table.to_snapshot().unwrap();
        assert_eq!(OrderTable::from_snapshot(&bytes).unwrap(), table);
        assert!(OrderTable::from_snapshot(&[]).is_err());
        assert!(OrderTable::from_snapshot(&[7, 7, 7]).is_err());
    }

    proptest! {
        #[test]
        fn prop_build_is_deterministic(starts in proptest::collection::vec((0u32..10, 0u32..10, 0u32..10), 1..8)) {
            let population: Vec<GroupExample> = starts
                .iter()
                .enumerate()
                .map(|(i, &(s, v, o))| example(&i.to_string(), vec![slot(SlotName::S, s, 1), slot(SlotName::V, v, 1), slot(SlotName::O1, o, 1)]))
                .collect();
            prop_assert_eq!(OrderTable::build("g", &population), OrderTable::build("g", &population));
        }

        #[test]
        fn prop_rebuild_on_same_population_keeps_columns(starts in proptest::collection::vec((0u32..10, 0u32..10), 1..8)) {
            let population: Vec<GroupExample> = starts
                .iter()
                .enumerate()
                .map(|(i, &(s, m))| example(&i.to_string(), vec![slot(SlotName::S, s, 1), slot(SlotName::M1, m, 1)]))
                .collect();
            let table = OrderTable::build("g", &population);
            prop_assert_eq!(table.rebuild_stable(&population, 0.0), table);
        }
    }
}
