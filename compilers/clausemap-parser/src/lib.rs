pub mod conll;
pub mod lexer;
pub mod lexicon;
pub mod syntax;
pub mod token;

use clausemap_protocol::{ParsedSentence, TokenId};
use thiserror::Error;

pub use crate::conll::ConllAdapter;
pub use crate::syntax::GreedyParser;

/// Why an adapter refused to produce a sentence. There is no partial parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("input contains no tokens")]
    Empty,
    #[error("malformed input on line {line}: {reason}")]
    Malformed { line: usize, reason: String },
    #[error("dependency tree has no root")]
    NoRoot,
    #[error("dependency tree has {count} roots")]
    MultipleRoots { count: usize },
    #[error("token {token} points at head {head}, outside the sentence")]
    HeadOutOfRange { token: u32, head: u32 },
    #[error("token {token} is part of a dependency cycle")]
    Cycle { token: u32 },
}

/// Turns raw text into a [`ParsedSentence`].
pub trait ParserAdapter: Send + Sync {
    fn parse(&self, text: &str) -> Result<ParsedSentence, ParseError>;
}

/// Checks the tree shape every downstream stage relies on: one root,
/// in-range heads, no cycles.
pub fn validate_tree(sentence: &ParsedSentence) -> Result<(), ParseError> {
    let n = sentence.tokens.len();
    if n == 0 {
        return Err(ParseError::Empty);
    }

    for token in &sentence.tokens {
        if token.head.index() >= n {
            return Err(ParseError::HeadOutOfRange {
                token: token.id.0,
                head: token.head.0,
            });
        }
    }

    let roots = sentence.tokens.iter().filter(|t| t.head == t.id).count();
    match roots {
        0 => return Err(ParseError::NoRoot),
        1 => {}
        count => return Err(ParseError::MultipleRoots { count }),
    }

    // Every head chain must reach the root within n steps
    for token in &sentence.tokens {
        let mut current: TokenId = token.id;
        let mut steps = 0;
        while sentence.tokens[current.index()].head != current {
            current = sentence.tokens[current.index()].head;
            steps += 1;
            if steps > n {
                return Err(ParseError::Cycle { token: token.id.0 });
            }
        }
    }

    tracing::trace!(tokens = n, "dependency tree validated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clausemap_protocol::{DepRelation, PartOfSpeech, SentenceId, Token};

    fn sentence(heads: &[u32]) -> ParsedSentence {
        ParsedSentence {
            id: SentenceId(0),
            text: String::new(),
            tokens: heads
                .iter()
                .enumerate()
                .map(|(i, &h)| Token {
                    id: TokenId(i as u32),
                    text: "x".to_string(),
                    lemma: "x".to_string(),
                    pos: PartOfSpeech::Other,
                    head: TokenId(h),
                    relation: if h == i as u32 { DepRelation::Root } else { DepRelation::Dep },
                    byte_start: 0,
                    byte_end: 0,
                })
                .collect(),
        }
    }

    #[test]
    fn test_valid_tree() {
        assert_eq!(validate_tree(&sentence(&[1, 1, 1])), Ok(()));
    }

    #[test]
    fn test_rejected_trees() {
        assert_eq!(validate_tree(&sentence(&[])), Err(ParseError::Empty));
        assert_eq!(validate_tree(&sentence(&[1, 0])), Err(ParseError::NoRoot));
        assert_eq!(
            validate_tree(&sentence(&[0, 1])),
            Err(ParseError::MultipleRoots { count: 2 })
        );
        assert_eq!(
            validate_tree(&sentence(&[1, 7])),
            Err(ParseError::HeadOutOfRange { token: 1, head: 7 })
        );
        assert_eq!(
            validate_tree(&sentence(&[1, 2, 1, 3])),
            Err(ParseError::Cycle { token: 0 })
        );
    }
}
