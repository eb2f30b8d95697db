use nom::{
    branch::alt,
    bytes::complete::take_while1,
    character::complete::{multispace0, one_of},
    combinator::map,
    IResult,
};
use crate::token::{RawToken, Span};

/// Letters, digits and the word-internal apostrophe/hyphen.
fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '\'' || c == '\u{2019}' || c == '-'
}

fn raw_token(input: &str) -> IResult<&str, RawToken<'_>> {
    alt((
        map(take_while1(is_word_char), RawToken::Word),
        map(one_of(".,;:?!\"()"), RawToken::Punct),
    ))(input)
}

/// Splits text into words and punctuation with their byte spans.
/// Unknown characters are skipped so that lexing never fails.
pub fn lex(original_input: &str) -> Vec<(Span, RawToken<'_>)> {
    let mut input = original_input;
    let mut result = Vec::new();

    loop {
        let (next_input, _) = match multispace0::<&str, nom::error::Error<&str>>(input) {
            Ok(res) => res,
            Err(_) => break,
        };
        input = next_input;

        if input.is_empty() {
            break;
        }

        match raw_token(input) {
            Ok((next_input, token)) => {
                let len = input.len() - next_input.len();
                let start = original_input.len() - input.len();
                push_token(&mut result, Span::new(start, start + len), token);
                input = next_input;
            }
            Err(_) => {
                // Skip one char to recover (resilient lexing)
                if let Some(c) = input.chars().next() {
                    input = &input[c.len_utf8()..];
                } else {
                    break;
                }
            }
        }
    }

    result
}

fn push_token<'a>(out: &mut Vec<(Span, RawToken<'a>)>, span: Span, token: RawToken<'a>) {
    if let RawToken::Word(word) = token {
        let lower = word.to_ascii_lowercase();
        if lower.len() > 3 && (lower.ends_with("n't") || lower.ends_with("n\u{2019}t")) {
            let clitic_len = if lower.ends_with("n't") { 3 } else { "n\u{2019}t".len() };
            // "can't" keeps its "ca" host, as treebanks do
            let split = word.len() - clitic_len;
            out.push((Span::new(span.start, span.start + split), RawToken::Word(&word[..split])));
            out.push((Span::new(span.start + split, span.end), RawToken::Clitic(&word[split..])));
            return;
        }
    }
    out.push((span, token));
}
