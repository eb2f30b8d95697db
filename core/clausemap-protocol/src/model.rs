use rkyv::{Archive, Deserialize, Serialize};
use crate::grammar::{DepRelation, PartOfSpeech};
use crate::ids::{SentenceId, TokenId};
use alloc::string::String;
use alloc::vec::Vec;
use core::ops::Range;

#[cfg(feature = "serde")]
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};

/// One token of a parsed sentence together with its dependency edge.
///
/// `byte_start..byte_end` indexes into [`ParsedSentence::text`]. The root
/// token points at itself through `head`.
#[derive(Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize)]
#[cfg_attr(feature = "serde", derive(SerdeDeserialize, SerdeSerialize))]
#[archive(check_bytes)]
pub struct Token {
    pub id: TokenId,
    pub text: String,
    pub lemma: String,
    pub pos: PartOfSpeech,
    pub head: TokenId,
    pub relation: DepRelation,
    pub byte_start: u32,
    pub byte_end: u32,
}

impl Token {
    pub fn is_root(&self) -> bool {
        self.head == self.id || self.relation == DepRelation::Root
    }

    /// Lowercased surface form, used by the closed-class word lists.
    pub fn lower(&self) -> String {
        self.text.to_lowercase()
    }
}

/// A half-open, contiguous range of token indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Archive, Serialize, Deserialize)]
#[cfg_attr(feature = "serde", derive(SerdeDeserialize, SerdeSerialize))]
#[archive(check_bytes)]
pub struct TokenSpan {
    pub start: u32,
    pub end: u32,
}

impl TokenSpan {
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub const fn single(token: TokenId) -> Self {
        Self { start: token.0, end: token.0 + 1 }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn contains(&self, token: TokenId) -> bool {
        self.start <= token.0 && token.0 < self.end
    }

    pub fn contains_span(&self, other: &TokenSpan) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn overlaps(&self, other: &TokenSpan) -> bool {
        !self.is_empty() && !other.is_empty() && self.start < other.end && other.start < self.end
    }

    /// Smallest span covering both.
    pub fn cover(&self, other: &TokenSpan) -> TokenSpan {
        TokenSpan {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn tokens(&self) -> impl Iterator<Item = TokenId> {
        (self.start..self.end).map(TokenId)
    }

    pub fn range(&self) -> Range<usize> {
        self.start as usize..self.end as usize
    }
}

/// The immutable output of a parser adapter.
#[derive(Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize)]
#[cfg_attr(feature = "serde", derive(SerdeDeserialize, SerdeSerialize))]
#[archive(check_bytes)]
pub struct ParsedSentence {
    pub id: SentenceId,
    pub text: String,
    pub tokens: Vec<Token>,
}

impl ParsedSentence {
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn token(&self, id: TokenId) -> Option<&Token> {
        self.tokens.get(id.index())
    }

    pub fn root(&self) -> Option<&Token> {
        self.tokens.iter().find(|t| t.is_root())
    }

    /// Direct dependents of `id`, in surface order.
    pub fn children(&self, id: TokenId) -> impl Iterator<Item = &Token> + '_ {
        self.tokens
            .iter()
            .filter(move |t| t.head == id && t.id != id)
    }

    pub fn full_span(&self) -> TokenSpan {
        TokenSpan::new(0, self.tokens.len() as u32)
    }

    /// Byte range of `span` inside [`ParsedSentence::text`].
    pub fn char_range(&self, span: &TokenSpan) -> Option<Range<usize>> {
        if span.is_empty() {
            return None;
        }
        let first = self.tokens.get(span.start as usize)?;
        let last = self.tokens.get(span.end as usize - 1)?;
        Some(first.byte_start as usize..last.byte_end as usize)
    }

    /// Surface text covered by `span`; empty for an empty or out-of-range span.
    pub fn span_text(&self, span: &TokenSpan) -> &str {
        self.char_range(span)
            .and_then(|range| self.text.get(range))
            .unwrap_or("")
    }
}
