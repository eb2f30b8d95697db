use nom::{
    bytes::complete::take_till1,
    character::complete::{digit1, space0, space1},
    combinator::{all_consuming, map_res},
    multi::separated_list1,
    sequence::preceded,
    IResult,
};
use clausemap_protocol::{DepRelation, ParsedSentence, PartOfSpeech, SentenceId, Token, TokenId};
use crate::{validate_tree, ParseError, ParserAdapter};

/// Reads pre-annotated sentences, one token per line:
///
/// ```text
/// # comment
/// 1   The     the     DET    2   det
/// 2   man     man     NOUN   3   nsubj
/// 3   left    leave   VERB   0   root
/// ```
///
/// Full ten-column CoNLL-U lines are accepted as well (HEAD and DEPREL
/// are then read from columns 7 and 8). Multiword ranges (`1-2`) and empty
/// nodes (`1.1`) are skipped.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConllAdapter;

struct Row<'a> {
    form: &'a str,
    lemma: &'a str,
    upos: &'a str,
    head: u32,
    deprel: &'a str,
}

fn fields(line: &str) -> IResult<&str, Vec<&str>> {
    preceded(
        space0,
        separated_list1(space1, take_till1(|c: char| c == ' ' || c == '\t')),
    )(line)
}

fn number(field: &str) -> IResult<&str, u32> {
    all_consuming(map_res(digit1, str::parse::<u32>))(field)
}

fn malformed(line: usize, reason: impl Into<String>) -> ParseError {
    ParseError::Malformed { line, reason: reason.into() }
}

fn row(line_no: usize, line: &str) -> Result<Option<(u32, Row<'_>)>, ParseError> {
    let (_, cols) = fields(line).map_err(|_| malformed(line_no, "no columns"))?;

    if cols[0].contains('-') || cols[0].contains('.') {
        return Ok(None);
    }

    let (head_col, rel_col) = match cols.len() {
        6 => (4, 5),
        n if n >= 8 => (6, 7),
        n => return Err(malformed(line_no, format!("expected 6 or 10 columns, found {}", n))),
    };

    let (_, id) = number(cols[0]).map_err(|_| malformed(line_no, format!("bad token id '{}'", cols[0])))?;
    let (_, head) = number(cols[head_col])
        .map_err(|_| malformed(line_no, format!("bad head '{}'", cols[head_col])))?;

    Ok(Some((
        id,
        Row {
            form: cols[1],
            lemma: cols[2],
            upos: cols[3],
            head,
            deprel: cols[rel_col],
        },
    )))
}

fn attaches_left(form: &str) -> bool {
    matches!(form, "." | "," | ";" | ":" | "?" | "!" | ")" | "n't" | "'s" | "'re" | "'m" | "'ve" | "'ll" | "'d")
}

impl ConllAdapter {
    pub fn new() -> Self {
        Self
    }

    /// Splits a multi-sentence document on blank lines, numbering sentences from 0.
    pub fn parse_document(&self, text: &str) -> Result<Vec<ParsedSentence>, ParseError> {
        let mut sentences = Vec::new();
        let mut block = String::new();

        for line in text.lines().chain(std::iter::once("")) {
            if line.trim().is_empty() {
                if !block.trim().is_empty() {
                    let mut sentence = self.parse(&block)?;
                    sentence.id = SentenceId(sentences.len() as u32);
                    sentences.push(sentence);
                }
                block.clear();
            } else {
                block.push_str(line);
                block.push('\n');
            }
        }

        Ok(sentences)
    }
}

impl ParserAdapter for ConllAdapter {
    fn parse(&self, text: &str) -> Result<ParsedSentence, ParseError> {
        let mut rows = Vec::new();
        for (i, line) in text.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            if let Some((id, row)) = row(i + 1, line)? {
                if id as usize != rows.len() + 1 {
                    return Err(malformed(i + 1, format!("token id {} out of sequence", id)));
                }
                rows.push(row);
            }
        }

        if rows.is_empty() {
            return Err(ParseError::Empty);
        }

        let mut surface = String::new();
        let mut tokens = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            let no_space = i == 0 || attaches_left(row.form) || surface.ends_with('(');
            if !no_space {
                surface.push(' ');
            }
            let start = surface.len();
            surface.push_str(row.form);

            let own = TokenId(i as u32);
            let head = if row.head == 0 { own } else { TokenId(row.head - 1) };
            tokens.push(Token {
                id: own,
                text: row.form.to_string(),
                lemma: if row.lemma == "_" { row.form.to_lowercase() } else { row.lemma.to_string() },
                pos: PartOfSpeech::from_tag(row.upos),
                head,
                relation: if row.head == 0 { DepRelation::Root } else { DepRelation::from_label(row.deprel) },
                byte_start: start as u32,
                byte_end: surface.len() as u32,
            });
        }

        let sentence = ParsedSentence {
            id: SentenceId(0),
            text: surface,
            tokens,
        };
        validate_tree(&sentence)?;
        tracing::debug!(tokens = sentence.len(), "read annotated sentence");
        Ok(sentence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SENTENCE: &str = "\
# text = The man left.
1\tThe\tthe\tDET\t2\tdet
2\tman\tman\tNOUN\t3\tnsubj
3\tleft\tleave\tVERB\t0\troot
4\t.\t.\tPUNCT\t3\tpunct
";

    #[test]
    fn test_reads_six_columns() {
        let s = ConllAdapter::new().parse(SENTENCE).unwrap();

        assert_eq!(s.text, "The man left.");
        assert_eq!(s.len(), 4);
        assert_eq!(s.tokens[1].relation, DepRelation::Nsubj);
        assert_eq!(s.tokens[1].head, TokenId(2));
        assert_eq!(s.tokens[2].head, TokenId(2));
        assert_eq!(s.tokens[2].lemma, "leave");
        assert_eq!(s.tokens[3].pos, PartOfSpeech::Punctuation);
        assert_eq!(s.span_text(&clausemap_protocol::TokenSpan::new(0, 2)), "The man");
    }

    #[test]
    fn test_reads_conllu_and_skips_ranges() {
        let input = "\
1-2\tdon't\t_\t_\t_\t_\t_\t_\t_\t_
1\tdo\tdo\tAUX\t_\t_\t3\taux\t_\t_
2\tn't\tnot\tPART\t_\t_\t3\tadvmod\t_\t_
3\tgo\tgo\tVERB\t_\t_\t0\troot\t_\t_
";
        let s = ConllAdapter::new().parse(input).unwrap();
        assert_eq!(s.text, "don't go");
        assert_eq!(s.tokens[0].relation, DepRelation::Aux);
        assert_eq!(s.root().unwrap().text, "go");
    }

    #[test]
    fn test_malformed_lines() {
        let err = ConllAdapter::new().parse("1\tThe\tthe\tDET\n").unwrap_err();
        assert!(matches!(err, ParseError::Malformed { line: 1, .. }));

        let err = ConllAdapter::new().parse("1 a a X x dep\n").unwrap_err();
        assert!(matches!(err, ParseError::Malformed { line: 1, .. }));

        let err = ConllAdapter::new().parse("2 a a X 0 root\n").unwrap_err();
        assert!(matches!(err, ParseError::Malformed { .. }));
    }

    #[test]
    fn test_document_split() {
        let doc = format!("{}\n{}", SENTENCE, SENTENCE);
        let sentences = ConllAdapter::new().parse_document(&doc).unwrap();
        assert_eq!(sentences.len(), 2);
        assert_eq!(sentences[1].id, SentenceId(1));
    }
}
