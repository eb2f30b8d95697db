use clausemap_protocol::{DepRelation, ParsedSentence, SentenceId, Token, TokenId};
use crate::lexer::lex;
use crate::lexicon::{classify, is_relativizer, WordClass};
use crate::token::{RawToken, Span};
use crate::{validate_tree, ParseError, ParserAdapter};

#[derive(Debug, Clone)]
struct Word<'a> {
    text: &'a str,
    span: Span,
    class: WordClass,
    relative: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClauseKind {
    Main,
    Relative { antecedent: Option<usize>, pronoun: usize },
    Infinitive,
    Adverbial { marker: usize },
    Coordinated { conjunction: usize },
    Complement,
}

/// A run of auxiliaries, negation and at most one main verb.
#[derive(Debug, Clone)]
struct VerbGroup {
    members: Vec<usize>,
    head: usize,
    /// Subject chunk sitting between an inverted auxiliary and the verb.
    inverted_subject: Option<(usize, usize)>,
    passive: bool,
    kind: ClauseKind,
}

impl VerbGroup {
    fn start(&self) -> usize {
        self.members[0]
    }

    fn end(&self) -> usize {
        self.members[self.members.len() - 1] + 1
    }
}

/// Noun phrase chunk `[start, end)` with its head index.
#[derive(Debug, Clone, Copy)]
struct Chunk {
    start: usize,
    end: usize,
    head: usize,
}

/// Greedy English dependency parser for plain text.
///
/// Handles:
/// - determiner/adjective/noun chunking
/// - auxiliary, modal, negation and passive verb groups
/// - subject/object/dative assignment by position
/// - relative, infinitival, adverbial and coordinated clauses
/// - prepositional phrases and do-support questions
#[derive(Debug, Default, Clone, Copy)]
pub struct GreedyParser;

impl GreedyParser {
    pub fn new() -> Self {
        Self
    }
}

impl ParserAdapter for GreedyParser {
    fn parse(&self, text: &str) -> Result<ParsedSentence, ParseError> {
        let words: Vec<Word> = lex(text)
            .into_iter()
            .map(|(span, raw)| {
                let class = match &raw {
                    RawToken::Punct(_) => WordClass::Punct,
                    RawToken::Word(w) | RawToken::Clitic(w) => classify(w),
                };
                Word { text: raw.text(text, span), span, class, relative: false }
            })
            .collect();

        if words.iter().all(|w| w.class == WordClass::Punct) {
            return Err(ParseError::Empty);
        }

        let arcs = parse_greedy(words.clone());
        let tokens = words
            .iter()
            .zip(arcs)
            .enumerate()
            .map(|(i, (word, (head, relation, class)))| Token {
                id: TokenId(i as u32),
                text: word.text.to_string(),
                lemma: word.text.to_lowercase(),
                pos: class.pos(),
                head: TokenId(head as u32),
                relation,
                byte_start: word.span.start as u32,
                byte_end: word.span.end as u32,
            })
            .collect();

        let sentence = ParsedSentence {
            id: SentenceId(0),
            text: text.to_string(),
            tokens,
        };
        validate_tree(&sentence)?;
        Ok(sentence)
    }
}

/// Returns `(head, relation, final word class)` per word.
fn parse_greedy(mut words: Vec<Word>) -> Vec<(usize, DepRelation, WordClass)> {
    retag(&mut words);

    let mut groups = verb_groups(&words);
    type_clauses(&words, &mut groups);
    let chunks = noun_chunks(&words, &groups);

    let root = groups
        .iter()
        .find(|g| g.kind == ClauseKind::Main)
        .or_else(|| groups.first())
        .map(|g| g.head)
        .or_else(|| chunks.first().map(|c| c.head))
        .unwrap_or(0);

    let mut arcs: Vec<Option<(usize, DepRelation)>> = vec![None; words.len()];
    arcs[root] = Some((root, DepRelation::Root));

    attach_groups(&words, &groups, root, &mut arcs);
    attach_chunks(&words, &groups, &chunks, root, &mut arcs);
    attach_rest(&words, &groups, &chunks, root, &mut arcs);

    arcs.into_iter()
        .zip(words.iter())
        .map(|(arc, word)| {
            let (head, rel) = arc.unwrap_or((root, DepRelation::Dep));
            (head, rel, word.class)
        })
        .collect()
}

/// Position-based corrections on top of the lexicon.
fn retag(words: &mut [Word]) {
    let n = words.len();
    let mut seen_verb = false;

    for i in 0..n {
        let prev = if i > 0 { Some(words[i - 1].class) } else { None };
        let next = words.get(i + 1).map(|w| w.class);
        let lower = words[i].text.to_lowercase();

        match words[i].class {
            WordClass::Preposition if lower == "to" => {
                if matches!(next, Some(WordClass::Verb | WordClass::Be | WordClass::Have)) {
                    words[i].class = WordClass::Infinitive;
                }
            }
            WordClass::Verb | WordClass::Participle
                if matches!(prev, Some(WordClass::Determiner | WordClass::Possessive | WordClass::Adjective)) =>
            {
                words[i].class = WordClass::Noun;
            }
            WordClass::Noun if matches!(prev, Some(WordClass::Be)) && lower.len() > 4 && lower.ends_with("ing") => {
                words[i].class = WordClass::Verb;
            }
            WordClass::Noun
                if !seen_verb
                    && matches!(prev, Some(WordClass::Noun | WordClass::Pronoun))
                    && lower.len() > 2
                    && lower.ends_with('s') =>
            {
                words[i].class = WordClass::Verb;
            }
            _ => {}
        }

        if i > 0
            && is_relativizer(&lower)
            && matches!(words[i - 1].class, WordClass::Noun | WordClass::Pronoun)
        {
            words[i].relative = true;
            words[i].class = WordClass::WhWord;
        }

        if words[i].class.is_verbal() {
            seen_verb = true;
        }
    }
}

fn verb_groups(words: &[Word]) -> Vec<VerbGroup> {
    let n = words.len();
    let mut groups = Vec::new();
    let mut i = 0;

    while i < n {
        let class = words[i].class;
        if !(class.is_verbal() || class == WordClass::Infinitive) {
            i += 1;
            continue;
        }

        let mut members = Vec::new();
        let mut j = i;
        while j < n {
            let c = words[j].class;
            let take = j == i
                || c.is_verbal()
                || c == WordClass::Negation
                || (c == WordClass::Adverb && words.get(j + 1).map_or(false, |w| w.class.is_verbal()));
            if !take {
                break;
            }
            members.push(j);
            j += 1;
            if matches!(c, WordClass::Verb | WordClass::Participle) {
                break;
            }
        }

        let mut inverted_subject = None;
        let has_main = members
            .iter()
            .any(|&m| matches!(words[m].class, WordClass::Verb | WordClass::Participle));
        let question_position = i == 0 || words[i - 1].class == WordClass::WhWord;
        if !has_main && question_position && words[i].class.is_auxiliary() {
            let chunk_end = (j..n).find(|&k| !words[k].class.is_nominal_part()).unwrap_or(n);
            if chunk_end > j {
                let verb = (chunk_end..n)
                    .take_while(|&k| matches!(words[k].class, WordClass::Adverb | WordClass::Negation | WordClass::Verb | WordClass::Participle))
                    .find(|&k| matches!(words[k].class, WordClass::Verb | WordClass::Participle));
                if let Some(v) = verb {
                    inverted_subject = Some((j, chunk_end));
                    members.extend(chunk_end..=v);
                    j = v + 1;
                }
            }
        }

        let head = members
            .iter()
            .rev()
            .copied()
            .find(|&m| matches!(words[m].class, WordClass::Verb | WordClass::Participle))
            .or_else(|| members.iter().rev().copied().find(|&m| words[m].class.is_auxiliary()))
            .unwrap_or(members[members.len() - 1]);

        let passive = words[head].class == WordClass::Participle
            && members.iter().any(|&m| m != head && words[m].class == WordClass::Be);

        groups.push(VerbGroup {
            members,
            head,
            inverted_subject,
            passive,
            kind: ClauseKind::Main,
        });
        i = j;
    }

    groups
}

fn type_clauses(words: &[Word], groups: &mut [VerbGroup]) {
    let mut main_seen = false;
    let mut prev_end = 0;

    for g in 0..groups.len() {
        let start = groups[g].start();
        let gap = prev_end..start;

        let relative = gap.clone().rev().find(|&k| words[k].relative);
        let marker = gap.clone().find(|&k| words[k].class == WordClass::SubordConj);
        let conjunction = gap.clone().find(|&k| words[k].class == WordClass::CoordConj);

        groups[g].kind = if words[start].class == WordClass::Infinitive && g > 0 {
            ClauseKind::Infinitive
        } else if let Some(pronoun) = relative {
            let antecedent = (0..pronoun).rev().find(|&k| {
                matches!(words[k].class, WordClass::Noun | WordClass::Pronoun | WordClass::Numeral)
            });
            ClauseKind::Relative { antecedent, pronoun }
        } else if let Some(marker) = marker {
            ClauseKind::Adverbial { marker }
        } else if let (Some(conjunction), true) = (conjunction, main_seen) {
            ClauseKind::Coordinated { conjunction }
        } else if !main_seen {
            ClauseKind::Main
        } else {
            ClauseKind::Complement
        };

        if groups[g].kind == ClauseKind::Main {
            main_seen = true;
        }
        prev_end = groups[g].end();
    }

    // A leading adverbial clause ("If it rains, we stay") leaves the main clause later.
    if !main_seen {
        if let Some(first) = groups.iter_mut().find(|g| !matches!(g.kind, ClauseKind::Relative { .. })) {
            first.kind = ClauseKind::Main;
        }
    }
}

fn noun_chunks(words: &[Word], groups: &[VerbGroup]) -> Vec<Chunk> {
    let in_group = |k: usize| groups.iter().any(|g| g.members.contains(&k));
    let chunkable = |k: usize| {
        !in_group(k)
            && !words[k].relative
            && (words[k].class.is_nominal_part()
                || (words[k].class == WordClass::WhWord && is_nominal_wh(words[k].text)))
    };

    let mut chunks = Vec::new();
    let mut k = 0;
    while k < words.len() {
        if !chunkable(k) {
            k += 1;
            continue;
        }
        let start = k;
        let mut has_noun = false;
        while k < words.len() && chunkable(k) {
            let class = words[k].class;
            if k > start && has_noun && matches!(class, WordClass::Determiner | WordClass::Possessive) {
                break;
            }
            if k > start && words[k - 1].class == WordClass::Pronoun {
                break;
            }
            if k > start && class == WordClass::WhWord {
                break;
            }
            if matches!(class, WordClass::Noun | WordClass::Pronoun | WordClass::Numeral | WordClass::WhWord) {
                has_noun = true;
            }
            k += 1;
            if class == WordClass::WhWord {
                break;
            }
        }
        let head = (start..k)
            .rev()
            .find(|&h| matches!(words[h].class, WordClass::Noun | WordClass::Pronoun | WordClass::WhWord))
            .or_else(|| (start..k).rev().find(|&h| words[h].class == WordClass::Numeral))
            .unwrap_or(k - 1);
        chunks.push(Chunk { start, end: k, head });
    }
    chunks
}

fn is_nominal_wh(text: &str) -> bool {
    matches!(text.to_lowercase().as_str(), "who" | "whom" | "what" | "which")
}

fn attach_groups(
    words: &[Word],
    groups: &[VerbGroup],
    root: usize,
    arcs: &mut [Option<(usize, DepRelation)>],
) {
    let main_head = root;

    for (g, group) in groups.iter().enumerate() {
        for &m in &group.members {
            if m == group.head {
                continue;
            }
            if group.inverted_subject.map_or(false, |(s, e)| (s..e).contains(&m)) {
                continue;
            }
            let rel = match words[m].class {
                WordClass::Negation => DepRelation::Neg,
                WordClass::Adverb => DepRelation::Advmod,
                WordClass::Be if group.passive => DepRelation::AuxPass,
                _ => DepRelation::Aux,
            };
            arcs[m] = Some((group.head, rel));
        }

        if group.head == root {
            continue;
        }

        let parent = groups[..g].last().map(|p| p.head).unwrap_or(main_head);
        arcs[group.head] = Some(match group.kind {
            ClauseKind::Main => (main_head, DepRelation::Conj),
            ClauseKind::Relative { antecedent, pronoun } => {
                let subject_between = (pronoun + 1..group.start()).any(|k| words[k].class.is_nominal_part());
                let pronoun_rel = if subject_between {
                    DepRelation::Dobj
                } else if group.passive {
                    DepRelation::NsubjPass
                } else {
                    DepRelation::Nsubj
                };
                arcs[pronoun] = Some((group.head, pronoun_rel));
                (antecedent.unwrap_or(main_head), DepRelation::Relcl)
            }
            ClauseKind::Infinitive => (parent, DepRelation::Xcomp),
            ClauseKind::Adverbial { marker } => {
                arcs[marker] = Some((group.head, DepRelation::Mark));
                (main_head, DepRelation::Advcl)
            }
            ClauseKind::Coordinated { conjunction } => {
                arcs[conjunction] = Some((main_head, DepRelation::Cc));
                (main_head, DepRelation::Conj)
            }
            ClauseKind::Complement => (parent, DepRelation::Ccomp),
        });
    }
}

fn attach_chunks(
    words: &[Word],
    groups: &[VerbGroup],
    chunks: &[Chunk],
    root: usize,
    arcs: &mut [Option<(usize, DepRelation)>],
) {
    let main = groups.iter().find(|g| g.head == root);

    for (c, chunk) in chunks.iter().enumerate() {
        for k in chunk.start..chunk.end {
            if k == chunk.head {
                continue;
            }
            let rel = match words[k].class {
                WordClass::Determiner => DepRelation::Det,
                WordClass::Possessive => DepRelation::Poss,
                WordClass::Adjective => DepRelation::Amod,
                WordClass::Numeral => DepRelation::Nummod,
                _ => DepRelation::Compound,
            };
            arcs[k] = Some((chunk.head, rel));
        }

        if chunk.head == root {
            continue;
        }

        // Prepositional object
        if chunk.start > 0 && words[chunk.start - 1].class == WordClass::Preposition {
            arcs[chunk.head] = Some((chunk.start - 1, DepRelation::Pobj));
            continue;
        }

        if let Some(group) = groups
            .iter()
            .find(|g| g.inverted_subject.map_or(false, |(s, e)| s <= chunk.start && chunk.end <= e))
        {
            arcs[chunk.head] = Some((group.head, subject_relation(group)));
            continue;
        }

        let prev_group = groups.iter().rev().find(|g| g.end() <= chunk.start);
        let next_group = groups.iter().find(|g| g.start() >= chunk.end);

        // Subject of a relative clause: "the book [she] read"
        if let Some(next) = next_group {
            if let ClauseKind::Relative { pronoun, .. } = next.kind {
                if pronoun < chunk.start {
                    arcs[chunk.head] = Some((next.head, subject_relation(next)));
                    continue;
                }
            }
        }

        // Fronted question word before an inverted auxiliary: "What did you see?"
        if let (Some(next), WordClass::WhWord) = (next_group, words[chunk.head].class) {
            if next.inverted_subject.is_some() && prev_group.is_none() {
                let rel = if words[next.head].class == WordClass::Be {
                    DepRelation::Attr
                } else {
                    DepRelation::Dobj
                };
                arcs[chunk.head] = Some((next.head, rel));
                continue;
            }
        }

        let adjacent_to_next = next_group.map_or(false, |next| {
            (chunk.end..next.start()).all(|k| words[k].class == WordClass::Adverb)
        });

        match (prev_group, next_group) {
            (None, Some(_)) | (None, None) => {
                let governor = main.or(next_group);
                match governor {
                    Some(g) => arcs[chunk.head] = Some((g.head, subject_relation(g))),
                    None => arcs[chunk.head] = Some((root, DepRelation::Dep)),
                }
            }
            (Some(_), Some(next))
                if adjacent_to_next
                    && !matches!(next.kind, ClauseKind::Main | ClauseKind::Infinitive | ClauseKind::Relative { .. }) =>
            {
                arcs[chunk.head] = Some((next.head, subject_relation(next)));
            }
            (Some(prev), _) => {
                let objects_before = chunks[..c]
                    .iter()
                    .filter(|o| o.start >= prev.end() && arcs[o.head].map_or(false, |(h, _)| h == prev.head))
                    .count();
                let followed_by_chunk = chunks
                    .get(c + 1)
                    .map_or(false, |next_chunk| next_chunk.start == chunk.end);
                let rel = if words[prev.head].class == WordClass::Be {
                    if words[chunk.head].class == WordClass::Adjective {
                        DepRelation::Acomp
                    } else {
                        DepRelation::Attr
                    }
                } else if words[chunk.head].class == WordClass::Adjective {
                    DepRelation::Acomp
                } else if objects_before == 0 && followed_by_chunk {
                    DepRelation::Dative
                } else if objects_before == 0 || objects_before == 1 {
                    DepRelation::Dobj
                } else {
                    DepRelation::Npadvmod
                };
                arcs[chunk.head] = Some((prev.head, rel));
            }
        }
    }
}

fn subject_relation(group: &VerbGroup) -> DepRelation {
    if group.passive {
        DepRelation::NsubjPass
    } else {
        DepRelation::Nsubj
    }
}

/// Prepositions, adverbs, wh-adverbs, conjunctions and punctuation.
fn attach_rest(
    words: &[Word],
    groups: &[VerbGroup],
    chunks: &[Chunk],
    root: usize,
    arcs: &mut [Option<(usize, DepRelation)>],
) {
    let nearest_verb = |k: usize| -> usize {
        groups
            .iter()
            .min_by_key(|g| {
                let distance = if g.head >= k { g.head - k } else { k - g.head };
                // Ties go to the preceding verb
                (distance, g.head > k)
            })
            .map(|g| g.head)
            .unwrap_or(root)
    };

    for k in 0..words.len() {
        if arcs[k].is_some() {
            continue;
        }
        let lower = words[k].text.to_lowercase();
        arcs[k] = Some(match words[k].class {
            WordClass::Preposition => {
                let prev_noun = chunks.iter().find(|c| c.end == k).map(|c| c.head);
                let before_any_verb = groups.iter().all(|g| g.start() > k);
                let passive_agent = lower == "by"
                    && groups.iter().any(|g| g.passive && g.end() <= k);
                match prev_noun {
                    Some(noun) if lower == "of" || before_any_verb => (noun, DepRelation::Prep),
                    _ if passive_agent => (nearest_verb(k), DepRelation::Agent),
                    _ => (nearest_verb(k), DepRelation::Prep),
                }
            }
            WordClass::Adverb => {
                if words.get(k + 1).map_or(false, |w| w.class == WordClass::Adjective) {
                    (k + 1, DepRelation::Advmod)
                } else {
                    (nearest_verb(k), DepRelation::Advmod)
                }
            }
            WordClass::WhWord => {
                let next = groups.iter().find(|g| g.start() > k).map(|g| g.head);
                (next.unwrap_or(root), DepRelation::Advmod)
            }
            WordClass::Negation => (nearest_verb(k), DepRelation::Neg),
            WordClass::CoordConj => (root, DepRelation::Cc),
            WordClass::SubordConj => (nearest_verb(k), DepRelation::Mark),
            WordClass::Punct => (root, DepRelation::Punct),
            _ => (root, DepRelation::Dep),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arc(sentence: &ParsedSentence, text: &str) -> (String, DepRelation) {
        let token = sentence
            .tokens
            .iter()
            .find(|t| t.text == text)
            .unwrap_or_else(|| panic!("no token {}", text));
        let head = &sentence.tokens[token.head.index()];
        (head.text.clone(), token.relation)
    }

    #[test]
    fn test_simple_svo() {
        let s = GreedyParser::new()
            .parse("The tall man quickly closed the door.")
            .unwrap();

        assert_eq!(s.root().unwrap().text, "closed");
        assert_eq!(arc(&s, "man"), ("closed".to_string(), DepRelation::Nsubj));
        assert_eq!(arc(&s, "The"), ("man".to_string(), DepRelation::Det));
        assert_eq!(arc(&s, "tall"), ("man".to_string(), DepRelation::Amod));
        assert_eq!(arc(&s, "quickly"), ("closed".to_string(), DepRelation::Advmod));
        assert_eq!(arc(&s, "door"), ("closed".to_string(), DepRelation::Dobj));
        assert_eq!(arc(&s, "."), ("closed".to_string(), DepRelation::Punct));
    }

    #[test]
    fn test_ditransitive() {
        let s = GreedyParser::new().parse("She gave him a book").unwrap();

        assert_eq!(arc(&s, "She"), ("gave".to_string(), DepRelation::Nsubj));
        assert_eq!(arc(&s, "him"), ("gave".to_string(), DepRelation::Dative));
        assert_eq!(arc(&s, "book"), ("gave".to_string(), DepRelation::Dobj));
    }

    #[test]
    fn test_relative_clause() {
        let s = GreedyParser::new()
            .parse("The man who lives here closed the door")
            .unwrap();

        assert_eq!(s.root().unwrap().text, "closed");
        assert_eq!(arc(&s, "lives"), ("man".to_string(), DepRelation::Relcl));
        assert_eq!(arc(&s, "who"), ("lives".to_string(), DepRelation::Nsubj));
        assert_eq!(arc(&s, "here"), ("lives".to_string(), DepRelation::Advmod));
        assert_eq!(arc(&s, "man"), ("closed".to_string(), DepRelation::Nsubj));
    }

    #[test]
    fn test_passive_with_agent() {
        let s = GreedyParser::new()
            .parse("The door was closed by the wind")
            .unwrap();

        assert_eq!(arc(&s, "door"), ("closed".to_string(), DepRelation::NsubjPass));
        assert_eq!(arc(&s, "was"), ("closed".to_string(), DepRelation::AuxPass));
        assert_eq!(arc(&s, "by"), ("closed".to_string(), DepRelation::Agent));
        assert_eq!(arc(&s, "wind"), ("by".to_string(), DepRelation::Pobj));
    }

    #[test]
    fn test_do_support_question() {
        let s = GreedyParser::new().parse("What did you see?").unwrap();

        assert_eq!(s.root().unwrap().text, "see");
        assert_eq!(arc(&s, "What"), ("see".to_string(), DepRelation::Dobj));
        assert_eq!(arc(&s, "did"), ("see".to_string(), DepRelation::Aux));
        assert_eq!(arc(&s, "you"), ("see".to_string(), DepRelation::Nsubj));
    }

    #[test]
    fn test_modal_negation_infinitive() {
        let s = GreedyParser::new().parse("She can't want to leave").unwrap();

        assert_eq!(s.root().unwrap().text, "want");
        assert_eq!(arc(&s, "ca"), ("want".to_string(), DepRelation::Aux));
        assert_eq!(arc(&s, "n't"), ("want".to_string(), DepRelation::Neg));
        assert_eq!(arc(&s, "leave"), ("want".to_string(), DepRelation::Xcomp));
        assert_eq!(arc(&s, "to"), ("leave".to_string(), DepRelation::Aux));
    }

    #[test]
    fn test_empty_input_fails() {
        assert!(matches!(GreedyParser::new().parse(" ... "), Err(ParseError::Empty)));
    }
}
