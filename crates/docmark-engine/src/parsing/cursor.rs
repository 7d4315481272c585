use super::matcher::{MatchResult, Matcher};
use super::source::{SourceInfo, advance};

/// A cursor over the text of a [`SourceInfo`] with line/column tracking.
///
/// Matching is non-destructive ([`Cursor::try_match`]); only
/// [`Cursor::consume`] moves the cursor, returning the consumed span.
#[derive(Clone)]
pub struct Cursor<'a> {
    source: &'a SourceInfo,
    /// The text being tokenized.
    s: &'a str,
    /// Current local index into `s`.
    i: usize,
    line: usize,
    column: usize,
}

impl<'a> Cursor<'a> {
    /// Creates a cursor at the start of `source`.
    pub fn new(source: &'a SourceInfo) -> Self {
        Self {
            source,
            s: source.markdown(),
            i: 0,
            line: source.line,
            column: source.column,
        }
    }

    /// Current local byte index.
    pub fn pos(&self) -> usize {
        self.i
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn column(&self) -> usize {
        self.column
    }

    /// Returns true if at end of the text.
    pub fn eof(&self) -> bool {
        self.i >= self.s.len()
    }

    /// The unconsumed text.
    pub fn rest(&self) -> &'a str {
        &self.s[self.i..]
    }

    /// The whole text this cursor walks.
    pub fn text(&self) -> &'a str {
        self.s
    }

    /// Peeks at the current character without advancing.
    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// The character just before the cursor, if any.
    pub fn prev_char(&self) -> Option<char> {
        self.s[..self.i].chars().next_back()
    }

    /// Checks if the remaining input starts with `pat`.
    pub fn starts_with(&self, pat: &str) -> bool {
        self.rest().starts_with(pat)
    }

    /// True at the start of a line of the underlying text.
    pub fn at_line_start(&self) -> bool {
        self.i == 0 || self.s.as_bytes()[self.i - 1] == b'\n'
    }

    /// Matches at the cursor without advancing.
    pub fn try_match(&self, matcher: &Matcher) -> Option<MatchResult<'a>> {
        matcher.match_at(self.s, self.i)
    }

    /// The span of `len` bytes at the cursor, without advancing.
    pub fn peek_span(&self, len: usize) -> SourceInfo {
        let len = len.min(self.s.len() - self.i);
        self.source.sub_at(self.i, len, self.line, self.column)
    }

    /// Advances by `len` bytes, returning the consumed span.
    ///
    /// `len` is clamped to the remaining text. Consuming zero bytes returns
    /// an empty span and leaves the cursor where it was.
    pub fn consume(&mut self, len: usize) -> SourceInfo {
        let span = self.peek_span(len);
        let (line, column) = advance(self.line, self.column, span.markdown());
        self.i += span.len();
        self.line = line;
        self.column = column;
        span
    }
}
