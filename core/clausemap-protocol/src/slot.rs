use rkyv::{Archive, Deserialize, Serialize};
use crate::model::{ParsedSentence, TokenSpan};
use alloc::collections::btree_map::{self, BTreeMap};
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};

/// The closed set of top-level grammatical slots, in canonical display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Archive, Serialize, Deserialize)]
#[cfg_attr(feature = "serde", derive(SerdeDeserialize, SerdeSerialize))]
#[archive(check_bytes)]
#[repr(u8)]
pub enum SlotName {
    S = 0,
    V = 1,
    O1 = 2,
    O2 = 3,
    C1 = 4,
    C2 = 5,
    Aux = 6,
    M1 = 7,
    M2 = 8,
    M3 = 9,
}

impl SlotName {
    pub const ALL: [SlotName; 10] = [
        SlotName::S,
        SlotName::V,
        SlotName::O1,
        SlotName::O2,
        SlotName::C1,
        SlotName::C2,
        SlotName::Aux,
        SlotName::M1,
        SlotName::M2,
        SlotName::M3,
    ];

    pub const MODIFIERS: [SlotName; 3] = [SlotName::M1, SlotName::M2, SlotName::M3];

    pub fn as_str(self) -> &'static str {
        match self {
            SlotName::S => "S",
            SlotName::V => "V",
            SlotName::O1 => "O1",
            SlotName::O2 => "O2",
            SlotName::C1 => "C1",
            SlotName::C2 => "C2",
            SlotName::Aux => "Aux",
            SlotName::M1 => "M1",
            SlotName::M2 => "M2",
            SlotName::M3 => "M3",
        }
    }

    /// Label used for the same role inside an embedded clause.
    pub fn sub_label(self) -> &'static str {
        match self {
            SlotName::S => "sub-s",
            SlotName::V => "sub-v",
            SlotName::O1 => "sub-o1",
            SlotName::O2 => "sub-o2",
            SlotName::C1 => "sub-c1",
            SlotName::C2 => "sub-c2",
            SlotName::Aux => "sub-aux",
            SlotName::M1 => "sub-m1",
            SlotName::M2 => "sub-m2",
            SlotName::M3 => "sub-m3",
        }
    }

    /// Accepts both the top-level (`O1`) and nested (`sub-o1`) spellings.
    pub fn parse(label: &str) -> Option<SlotName> {
        let bare = label
            .strip_prefix("sub-")
            .or_else(|| label.strip_prefix("SUB-"))
            .unwrap_or(label);
        SlotName::ALL
            .iter()
            .copied()
            .find(|name| name.as_str().eq_ignore_ascii_case(bare))
    }

    pub fn is_nominal(self) -> bool {
        matches!(
            self,
            SlotName::S | SlotName::O1 | SlotName::O2 | SlotName::C1 | SlotName::C2
        )
    }
}

impl fmt::Display for SlotName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A filled slot. `depth == 0` is a top-level slot; nested slots live in
/// `sub_slots` and their spans always sit inside the parent's span.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(SerdeDeserialize, SerdeSerialize))]
pub struct Slot {
    pub name: SlotName,
    pub depth: u8,
    pub span: TokenSpan,
    pub text: String,
    pub confidence: f32,
    /// A question word fills this slot (`What did you see?` puts `What` in O1).
    pub question: bool,
    pub sub_slots: Vec<Slot>,
}

impl Slot {
    pub fn new(name: SlotName, span: TokenSpan, confidence: f32) -> Self {
        Self {
            name,
            depth: 0,
            span,
            text: String::new(),
            confidence,
            question: false,
            sub_slots: Vec::new(),
        }
    }

    pub fn question_word(mut self) -> Self {
        self.question = true;
        self
    }

    pub fn at_depth(mut self, depth: u8) -> Self {
        self.depth = depth;
        self
    }

    /// Refreshes `text` from the sentence after the span changed.
    pub fn with_text(mut self, sentence: &ParsedSentence) -> Self {
        self.text = sentence.span_text(&self.span).to_string();
        self
    }

    pub fn label(&self) -> &'static str {
        if self.depth == 0 {
            self.name.as_str()
        } else {
            self.name.sub_label()
        }
    }

    /// Visits this slot and every nested slot in pre-order, handing out the
    /// dotted label path (`O1`, `O1.sub-s`, ...).
    pub fn walk<'a, F>(&'a self, visit: &mut F)
    where
        F: FnMut(&str, &'a Slot),
    {
        self.walk_with_prefix("", visit);
    }

    fn walk_with_prefix<'a, F>(&'a self, prefix: &str, visit: &mut F)
    where
        F: FnMut(&str, &'a Slot),
    {
        let path = if prefix.is_empty() {
            self.label().to_string()
        } else {
            format!("{}.{}", prefix, self.label())
        };
        visit(&path, self);
        for sub in &self.sub_slots {
            sub.walk_with_prefix(&path, visit);
        }
    }

    pub fn sub_slot(&self, name: SlotName) -> Option<&Slot> {
        self.sub_slots.iter().find(|s| s.name == name)
    }
}

/// At most one slot per [`SlotName`], iterated in canonical order.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(SerdeDeserialize, SerdeSerialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct SlotMap {
    slots: BTreeMap<SlotName, Slot>,
}

impl SlotMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `slot`, replacing any slot with the same name.
    pub fn insert(&mut self, slot: Slot) -> Option<Slot> {
        self.slots.insert(slot.name, slot)
    }

    pub fn get(&self, name: SlotName) -> Option<&Slot> {
        self.slots.get(&name)
    }

    pub fn get_mut(&mut self, name: SlotName) -> Option<&mut Slot> {
        self.slots.get_mut(&name)
    }

    pub fn remove(&mut self, name: SlotName) -> Option<Slot> {
        self.slots.remove(&name)
    }

    pub fn contains(&self, name: SlotName) -> bool {
        self.slots.contains_key(&name)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> btree_map::Values<'_, SlotName, Slot> {
        self.slots.values()
    }

    pub fn iter_mut(&mut self) -> btree_map::ValuesMut<'_, SlotName, Slot> {
        self.slots.values_mut()
    }

    pub fn names(&self) -> impl Iterator<Item = SlotName> + '_ {
        self.slots.keys().copied()
    }

    /// Text of a top-level slot, if present.
    pub fn text(&self, name: SlotName) -> Option<&str> {
        self.slots.get(&name).map(|s| s.text.as_str())
    }

    /// Every slot at every depth with its dotted path, in pre-order.
    pub fn flatten(&self) -> Vec<(String, &Slot)> {
        let mut out = Vec::new();
        for slot in self.slots.values() {
            slot.walk(&mut |path, s| out.push((path.to_string(), s)));
        }
        out
    }
}

impl FromIterator<Slot> for SlotMap {
    fn from_iter<I: IntoIterator<Item = Slot>>(iter: I) -> Self {
        let mut map = SlotMap::new();
        for slot in iter {
            map.insert(slot);
        }
        map
    }
}

impl IntoIterator for SlotMap {
    type Item = Slot;
    type IntoIter = btree_map::IntoValues<SlotName, Slot>;

    fn into_iter(self) -> Self::IntoIter {
        self.slots.into_values()
    }
}
