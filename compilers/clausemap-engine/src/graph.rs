use clausemap_protocol::{DepRelation, ParsedSentence, TokenId, TokenSpan};
use petgraph::graph::{Graph, NodeIndex};
use petgraph::visit::{Dfs, EdgeRef};
use petgraph::Directed;

/// The dependency tree of one sentence as a head → dependent graph.
///
/// Built once per sentence and shared by the detectors and the expander.
pub struct DependencyGraph {
    graph: Graph<TokenId, DepRelation, Directed>,
    // index_map[token] is the node of that token
    index_map: Vec<NodeIndex>,
}

impl DependencyGraph {
    pub fn from_sentence(sentence: &ParsedSentence) -> Self {
        let mut graph = Graph::with_capacity(sentence.len(), sentence.len());
        let index_map: Vec<NodeIndex> = sentence.tokens.iter().map(|t| graph.add_node(t.id)).collect();

        for token in &sentence.tokens {
            if token.head == token.id {
                continue;
            }
            if let (Some(&head), Some(&dependent)) =
                (index_map.get(token.head.index()), index_map.get(token.id.index()))
            {
                graph.add_edge(head, dependent, token.relation);
            }
        }

        Self { graph, index_map }
    }

    pub fn len(&self) -> usize {
        self.index_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index_map.is_empty()
    }

    /// Direct dependents in surface order.
    pub fn children(&self, head: TokenId) -> Vec<(TokenId, DepRelation)> {
        let Some(&node) = self.index_map.get(head.index()) else {
            return Vec::new();
        };
        let mut out: Vec<(TokenId, DepRelation)> = self
            .graph
            .edges(node)
            .map(|edge| (self.graph[edge.target()], *edge.weight()))
            .collect();
        out.sort_by_key(|(id, _)| *id);
        out
    }

    pub fn has_child(&self, head: TokenId, relation: DepRelation) -> bool {
        self.children(head).iter().any(|(_, rel)| *rel == relation)
    }

    /// `token` and everything below it, sorted.
    pub fn subtree(&self, token: TokenId) -> Vec<TokenId> {
        let Some(&node) = self.index_map.get(token.index()) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        let mut dfs = Dfs::new(&self.graph, node);
        while let Some(next) = dfs.next(&self.graph) {
            out.push(self.graph[next]);
        }
        out.sort();
        out
    }

    /// Smallest span covering the subtree of `token`.
    pub fn subtree_span(&self, token: TokenId) -> TokenSpan {
        let subtree = self.subtree(token);
        match (subtree.first(), subtree.last()) {
            (Some(first), Some(last)) => TokenSpan::new(first.0, last.0 + 1),
            _ => TokenSpan::single(token),
        }
    }

    /// Number of arcs between `token` and the root.
    pub fn depth(&self, token: TokenId) -> usize {
        let Some(&start) = self.index_map.get(token.index()) else {
            return 0;
        };
        let mut depth = 0;
        let mut node = start;
        while let Some(edge) = self
            .graph
            .edges_directed(node, petgraph::Direction::Incoming)
            .next()
        {
            node = edge.source();
            depth += 1;
            if depth > self.index_map.len() {
                break;
            }
        }
        depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clausemap_parser::{GreedyParser, ParserAdapter};

    #[test]
    fn test_children_and_subtree() {
        let sentence = GreedyParser::new()
            .parse("The man who lives here closed the door")
            .unwrap();
        let graph = DependencyGraph::from_sentence(&sentence);

        // The(0) man(1) who(2) lives(3) here(4) closed(5) the(6) door(7)
        let children = graph.children(TokenId(1));
        assert_eq!(
            children,
            vec![(TokenId(0), DepRelation::Det), (TokenId(3), DepRelation::Relcl)]
        );
        assert_eq!(graph.subtree_span(TokenId(3)), TokenSpan::new(2, 5));
        assert_eq!(graph.subtree_span(TokenId(1)), TokenSpan::new(0, 5));
        assert_eq!(graph.subtree(TokenId(5)).len(), sentence.len());
        assert!(graph.has_child(TokenId(5), DepRelation::Dobj));
    }

    #[test]
    fn test_depth() {
        let sentence = GreedyParser::new()
            .parse("The man who lives here closed the door")
            .unwrap();
        let graph = DependencyGraph::from_sentence(&sentence);

        assert_eq!(graph.depth(TokenId(5)), 0);
        assert_eq!(graph.depth(TokenId(1)), 1);
        assert_eq!(graph.depth(TokenId(2)), 3);
    }
}
