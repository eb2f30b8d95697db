use std::collections::VecDeque;

use clausemap_protocol::{DepRelation, ParsedSentence, Token, TokenId, TokenSpan};

use crate::graph::DependencyGraph;

/// A window onto a sentence. Detectors only ever see the tokens inside
/// `window`: the whole sentence at the top level, a slot's span when
/// decomposing an embedded clause.
#[derive(Clone, Copy)]
pub struct SentenceView<'a> {
    sentence: &'a ParsedSentence,
    graph: &'a DependencyGraph,
    window: TokenSpan,
}

impl<'a> SentenceView<'a> {
    pub fn new(sentence: &'a ParsedSentence, graph: &'a DependencyGraph, window: TokenSpan) -> Self {
        let window = TokenSpan::new(
            window.start.min(sentence.len() as u32),
            window.end.min(sentence.len() as u32),
        );
        Self { sentence, graph, window }
    }

    pub fn whole(sentence: &'a ParsedSentence, graph: &'a DependencyGraph) -> Self {
        Self::new(sentence, graph, sentence.full_span())
    }

    pub fn sentence(&self) -> &'a ParsedSentence {
        self.sentence
    }

    pub fn graph(&self) -> &'a DependencyGraph {
        self.graph
    }

    pub fn window(&self) -> TokenSpan {
        self.window
    }

    pub fn contains(&self, token: TokenId) -> bool {
        self.window.contains(token)
    }

    pub fn tokens(&self) -> impl Iterator<Item = &'a Token> {
        self.sentence.tokens[self.window.range()].iter()
    }

    pub fn token(&self, id: TokenId) -> Option<&'a Token> {
        if self.contains(id) {
            self.sentence.token(id)
        } else {
            None
        }
    }

    /// Dependents of `head` that fall inside the window.
    pub fn children(&self, head: TokenId) -> Vec<(&'a Token, DepRelation)> {
        self.graph
            .children(head)
            .into_iter()
            .filter_map(|(id, rel)| self.token(id).map(|t| (t, rel)))
            .collect()
    }

    pub fn child(&self, head: TokenId, relation: DepRelation) -> Option<&'a Token> {
        self.children(head)
            .into_iter()
            .find(|(_, rel)| *rel == relation)
            .map(|(t, _)| t)
    }

    /// The highest token of the window: the one whose head lies outside it.
    pub fn head(&self) -> Option<&'a Token> {
        self.tokens()
            .filter(|t| t.head == t.id || !self.contains(t.head))
            .min_by_key(|t| (self.graph.depth(t.id), t.id))
    }

    /// The verb heading the clause this window holds, if any: the window's
    /// head itself when verbal, else the nearest verbal token below it that
    /// attaches through a clausal relation.
    pub fn clause_head(&self) -> Option<&'a Token> {
        let head = self.head()?;
        if head.pos.is_verbal() {
            return Some(head);
        }

        let mut queue: VecDeque<TokenId> = VecDeque::from([head.id]);
        while let Some(current) = queue.pop_front() {
            for (child, rel) in self.children(current) {
                if rel.is_clausal() && child.pos.is_verbal() {
                    return Some(child);
                }
                queue.push_back(child.id);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clausemap_parser::{GreedyParser, ParserAdapter};

    #[test]
    fn test_whole_sentence_clause_head_is_root() {
        let sentence = GreedyParser::new().parse("The tall man quickly closed the door.").unwrap();
        let graph = DependencyGraph::from_sentence(&sentence);
        let view = SentenceView::whole(&sentence, &graph);

        assert_eq!(view.head().unwrap().text, "closed");
        assert_eq!(view.clause_head().unwrap().text, "closed");
    }

    #[test]
    fn test_relative_clause_inside_subject_window() {
        let sentence = GreedyParser::new()
            .parse("The man who lives here closed the door")
            .unwrap();
        let graph = DependencyGraph::from_sentence(&sentence);
        let view = SentenceView::new(&sentence, &graph, TokenSpan::new(0, 5));

        assert_eq!(view.head().unwrap().text, "man");
        assert_eq!(view.clause_head().unwrap().text, "lives");
        // `closed` is outside the window
        assert!(view.token(TokenId(5)).is_none());
    }

    #[test]
    fn test_plain_noun_phrase_has_no_clause() {
        let sentence = GreedyParser::new().parse("The tall man quickly closed the door.").unwrap();
        let graph = DependencyGraph::from_sentence(&sentence);
        let view = SentenceView::new(&sentence, &graph, TokenSpan::new(0, 3));

        assert_eq!(view.head().unwrap().text, "man");
        assert!(view.clause_head().is_none());
    }
}
