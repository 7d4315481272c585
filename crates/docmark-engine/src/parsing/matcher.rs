//! # Matcher Combinators
//!
//! Composable, stateless matching primitives used by every grammar rule in
//! place of regular-expression strings. A [`Matcher`] is built once (rules
//! build theirs when the grammar is constructed) and then matched against any
//! number of documents.
//!
//! Semantics are PEG-like: sequences match left to right, alternation is an
//! ordered choice (first alternative that matches wins), repetition is greedy
//! and never gives characters back. Lookahead ([`Matcher::lookahead`],
//! [`Matcher::negative`]) covers the cases where a regex would need lazy
//! quantifiers.
//!
//! ```
//! use docmark_engine::parsing::matcher::Matcher;
//!
//! let heading = Matcher::ch('#').repeat(1, 6).group("level")
//!     + Matcher::white_space_in_line().plus()
//!     + Matcher::any_char_not("\n").plus().group("title");
//!
//! let m = heading.match_at("## Install\n", 0).unwrap();
//! assert_eq!(m.group("level"), Some("##"));
//! assert_eq!(m.group("title"), Some("Install"));
//! ```

use std::ops::{Add, BitOr};

/// A set of characters tested by [`Matcher::AnyCharIn`] / [`Matcher::AnyCharNot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CharClass {
    /// Any character of the string.
    Set(String),
    /// Space or tab.
    WhiteSpace,
    /// ASCII digit.
    Digit,
    /// ASCII letter.
    Letter,
    /// Alphanumeric or `_`.
    Word,
}

impl CharClass {
    pub fn contains(&self, c: char) -> bool {
        match self {
            CharClass::Set(s) => s.contains(c),
            CharClass::WhiteSpace => c == ' ' || c == '\t',
            CharClass::Digit => c.is_ascii_digit(),
            CharClass::Letter => c.is_ascii_alphabetic(),
            CharClass::Word => c.is_alphanumeric() || c == '_',
        }
    }
}

/// A composable matching predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher {
    /// A single literal character.
    Literal(char),
    /// A literal string.
    LiteralString(String),
    /// A literal string compared ASCII case-insensitively.
    LiteralIgnoreCase(String),
    /// Any single character.
    AnyChar,
    AnyCharIn(CharClass),
    AnyCharNot(CharClass),
    /// A `\n` character.
    NewLine,
    /// Succeeds only at the end of the text, consuming nothing.
    EndOfString,
    Sequence(Vec<Matcher>),
    /// Ordered choice: the first alternative that matches wins.
    Alternation(Vec<Matcher>),
    /// Greedy repetition of `inner`, between `min` and `max` times.
    Repeat {
        min: usize,
        max: usize,
        inner: Box<Matcher>,
    },
    /// Records the text matched by `inner` under `name`.
    Group {
        name: &'static str,
        inner: Box<Matcher>,
    },
    /// Matches the text most recently captured under the name.
    BackReference(&'static str),
    /// Positive lookahead: succeeds if `inner` matches, consuming nothing.
    Test(Box<Matcher>),
    /// Negative lookahead: succeeds if `inner` does not match, consuming nothing.
    Not(Box<Matcher>),
}

/// A named capture, as byte offsets into the matched text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capture {
    pub name: &'static str,
    pub start: usize,
    pub end: usize,
}

/// The outcome of a successful match.
#[derive(Debug, Clone)]
pub struct MatchResult<'t> {
    text: &'t str,
    /// Byte offset where the match starts.
    pub start: usize,
    /// Number of bytes matched.
    pub length: usize,
    captures: Vec<Capture>,
}

impl<'t> MatchResult<'t> {
    /// The matched text.
    pub fn as_str(&self) -> &'t str {
        &self.text[self.start..self.start + self.length]
    }

    /// The last capture recorded under `name`.
    pub fn group(&self, name: &str) -> Option<&'t str> {
        self.group_range(name).map(|(s, e)| &self.text[s..e])
    }

    /// Every capture recorded under `name`, in match order.
    pub fn groups<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'t str> + 'a {
        self.captures
            .iter()
            .filter(move |c| c.name == name)
            .map(|c| &self.text[c.start..c.end])
    }

    /// Offsets of the last capture under `name`, relative to the match start.
    pub fn group_offset(&self, name: &str) -> Option<(usize, usize)> {
        self.group_range(name)
            .map(|(s, e)| (s - self.start, e - self.start))
    }

    fn group_range(&self, name: &str) -> Option<(usize, usize)> {
        self.captures
            .iter()
            .rev()
            .find(|c| c.name == name)
            .map(|c| (c.start, c.end))
    }
}

impl Matcher {
    pub fn ch(c: char) -> Self {
        Matcher::Literal(c)
    }

    pub fn string(s: &str) -> Self {
        Matcher::LiteralString(s.to_string())
    }

    pub fn string_ignore_case(s: &str) -> Self {
        Matcher::LiteralIgnoreCase(s.to_string())
    }

    pub fn any_char() -> Self {
        Matcher::AnyChar
    }

    pub fn any_char_in(set: &str) -> Self {
        Matcher::AnyCharIn(CharClass::Set(set.to_string()))
    }

    pub fn any_char_not(set: &str) -> Self {
        Matcher::AnyCharNot(CharClass::Set(set.to_string()))
    }

    pub fn white_space_in_line() -> Self {
        Matcher::AnyCharIn(CharClass::WhiteSpace)
    }

    pub fn digit() -> Self {
        Matcher::AnyCharIn(CharClass::Digit)
    }

    pub fn letter() -> Self {
        Matcher::AnyCharIn(CharClass::Letter)
    }

    pub fn word_char() -> Self {
        Matcher::AnyCharIn(CharClass::Word)
    }

    pub fn new_line() -> Self {
        Matcher::NewLine
    }

    pub fn end_of_string() -> Self {
        Matcher::EndOfString
    }

    pub fn sequence(items: impl IntoIterator<Item = Matcher>) -> Self {
        Matcher::Sequence(items.into_iter().collect())
    }

    pub fn any_of(items: impl IntoIterator<Item = Matcher>) -> Self {
        Matcher::Alternation(items.into_iter().collect())
    }

    pub fn back_reference(name: &'static str) -> Self {
        Matcher::BackReference(name)
    }

    pub fn lookahead(inner: Matcher) -> Self {
        Matcher::Test(Box::new(inner))
    }

    pub fn negative(inner: Matcher) -> Self {
        Matcher::Not(Box::new(inner))
    }

    /// Rest of the current line, excluding the newline.
    pub fn rest_of_line() -> Self {
        Matcher::any_char_not("\n").star()
    }

    /// Trailing blanks, then a newline or the end of the text.
    pub fn line_end() -> Self {
        Matcher::white_space_in_line().star() + (Matcher::new_line() | Matcher::end_of_string())
    }

    /// Any number of newlines, or the end of the text.
    pub fn blank_lines_or_end() -> Self {
        Matcher::new_line().plus() | Matcher::end_of_string()
    }

    pub fn repeat(self, min: usize, max: usize) -> Self {
        Matcher::Repeat {
            min,
            max,
            inner: Box::new(self),
        }
    }

    pub fn star(self) -> Self {
        self.repeat(0, usize::MAX)
    }

    pub fn plus(self) -> Self {
        self.repeat(1, usize::MAX)
    }

    pub fn optional(self) -> Self {
        self.repeat(0, 1)
    }

    pub fn group(self, name: &'static str) -> Self {
        Matcher::Group {
            name,
            inner: Box::new(self),
        }
    }

    /// True when this matcher can succeed without consuming anything.
    ///
    /// Rule matchers must not: a zero-length match would stall dispatch.
    pub fn can_match_empty(&self) -> bool {
        match self {
            Matcher::Literal(_)
            | Matcher::AnyChar
            | Matcher::AnyCharIn(_)
            | Matcher::AnyCharNot(_)
            | Matcher::NewLine => false,
            Matcher::LiteralString(s) | Matcher::LiteralIgnoreCase(s) => s.is_empty(),
            Matcher::EndOfString
            | Matcher::BackReference(_)
            | Matcher::Test(_)
            | Matcher::Not(_) => true,
            Matcher::Sequence(items) => items.iter().all(Matcher::can_match_empty),
            Matcher::Alternation(items) => items.iter().any(Matcher::can_match_empty),
            Matcher::Repeat { min, inner, .. } => *min == 0 || inner.can_match_empty(),
            Matcher::Group { inner, .. } => inner.can_match_empty(),
        }
    }

    /// Matches at byte offset `start` of `text`.
    ///
    /// Never panics on malformed input; a failure is simply `None`.
    pub fn match_at<'t>(&self, text: &'t str, start: usize) -> Option<MatchResult<'t>> {
        if start > text.len() || !text.is_char_boundary(start) {
            return None;
        }
        let mut captures = Vec::new();
        let end = self.run(text, start, &mut captures)?;
        Some(MatchResult {
            text,
            start,
            length: end - start,
            captures,
        })
    }

    fn run(&self, text: &str, pos: usize, caps: &mut Vec<Capture>) -> Option<usize> {
        let rest = &text[pos..];
        match self {
            Matcher::Literal(c) => rest.starts_with(*c).then(|| pos + c.len_utf8()),
            Matcher::LiteralString(s) => rest.starts_with(s.as_str()).then(|| pos + s.len()),
            Matcher::LiteralIgnoreCase(s) => rest
                .get(..s.len())
                .filter(|head| head.eq_ignore_ascii_case(s))
                .map(|_| pos + s.len()),
            Matcher::AnyChar => rest.chars().next().map(|c| pos + c.len_utf8()),
            Matcher::AnyCharIn(class) => rest
                .chars()
                .next()
                .filter(|c| class.contains(*c))
                .map(|c| pos + c.len_utf8()),
            Matcher::AnyCharNot(class) => rest
                .chars()
                .next()
                .filter(|c| !class.contains(*c))
                .map(|c| pos + c.len_utf8()),
            Matcher::NewLine => rest.starts_with('\n').then_some(pos + 1),
            Matcher::EndOfString => rest.is_empty().then_some(pos),
            Matcher::Sequence(items) => {
                let mark = caps.len();
                let mut p = pos;
                for item in items {
                    match item.run(text, p, caps) {
                        Some(next) => p = next,
                        None => {
                            caps.truncate(mark);
                            return None;
                        }
                    }
                }
                Some(p)
            }
            Matcher::Alternation(items) => items.iter().find_map(|item| {
                let mark = caps.len();
                let r = item.run(text, pos, caps);
                if r.is_none() {
                    caps.truncate(mark);
                }
                r
            }),
            Matcher::Repeat { min, max, inner } => {
                let mark = caps.len();
                let mut p = pos;
                let mut count = 0usize;
                while count < *max {
                    let before = caps.len();
                    match inner.run(text, p, caps) {
                        Some(next) if next > p => {
                            p = next;
                            count += 1;
                        }
                        Some(_) => {
                            // An empty match could repeat forever; treat the
                            // remaining repetitions as satisfied.
                            count = count.max(*min);
                            break;
                        }
                        None => {
                            caps.truncate(before);
                            break;
                        }
                    }
                }
                if count < *min {
                    caps.truncate(mark);
                    None
                } else {
                    Some(p)
                }
            }
            Matcher::Group { name, inner } => {
                let end = inner.run(text, pos, caps)?;
                caps.push(Capture {
                    name,
                    start: pos,
                    end,
                });
                Some(end)
            }
            Matcher::BackReference(name) => {
                let cap = caps.iter().rev().find(|c| c.name == *name)?;
                let captured = &text[cap.start..cap.end];
                rest.starts_with(captured).then(|| pos + captured.len())
            }
            Matcher::Test(inner) => {
                let mark = caps.len();
                let r = inner.run(text, pos, caps);
                caps.truncate(mark);
                r.map(|_| pos)
            }
            Matcher::Not(inner) => {
                let mark = caps.len();
                let r = inner.run(text, pos, caps);
                caps.truncate(mark);
                match r {
                    Some(_) => None,
                    None => Some(pos),
                }
            }
        }
    }
}

impl Add for Matcher {
    type Output = Matcher;

    fn add(self, rhs: Matcher) -> Matcher {
        match self {
            Matcher::Sequence(mut items) => {
                items.push(rhs);
                Matcher::Sequence(items)
            }
            lhs => Matcher::Sequence(vec![lhs, rhs]),
        }
    }
}

impl BitOr for Matcher {
    type Output = Matcher;

    fn bitor(self, rhs: Matcher) -> Matcher {
        match self {
            Matcher::Alternation(mut items) => {
                items.push(rhs);
                Matcher::Alternation(items)
            }
            lhs => Matcher::Alternation(vec![lhs, rhs]),
        }
    }
}
