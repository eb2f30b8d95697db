/// Byte range of a lexeme in the input text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawToken<'a> {
    Word(&'a str),
    /// Contracted negation split off its host ("didn't" -> "did" + "n't").
    Clitic(&'a str),
    Punct(char),
}

impl<'a> RawToken<'a> {
    pub fn text(&self, input: &'a str, span: Span) -> &'a str {
        match self {
            RawToken::Word(s) | RawToken::Clitic(s) => s,
            RawToken::Punct(_) => &input[span.start..span.end],
        }
    }
}
