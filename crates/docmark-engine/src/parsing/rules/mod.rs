//! # Grammar Rules
//!
//! Each rule recognizes one construct at the cursor and, on success, consumes
//! it and returns a token. Rules are tried in grammar order; the first one
//! that matches wins. A rule that does not match must leave the cursor where
//! it found it (dispatch restores it defensively).
//!
//! ## Modules
//!
//! - **`blocks`**: block rules (paragraphs, headings, code, quotes, lists,
//!   tables, tab groups, notes, includes, code snippets, YAML header)
//! - **`inline`**: inline rules (emphasis, code spans, links, xrefs, includes)

pub mod blocks;
pub mod inline;

use crate::error::Result;

use super::cursor::Cursor;
use super::parser::{BlockParser, InlineParser};
use super::token::TokenRef;

/// Identity of the rule that produced a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleId {
    Document,
    // Block rules
    YamlHeader,
    NewLine,
    Code,
    Fences,
    CodeSnippet,
    TabGroup,
    Heading,
    NpTable,
    Hr,
    IncludeBlock,
    NoteMarker,
    Blockquote,
    List,
    Html,
    Def,
    Table,
    LHeading,
    Paragraph,
    Text,
    // Inline rules
    Escape,
    IncludeInline,
    XrefAutoLink,
    XrefShortcut,
    AutoLink,
    Url,
    Tag,
    Link,
    RefLink,
    NoLink,
    Strong,
    Em,
    CodeSpan,
    Br,
    Del,
    InlineText,
}

pub trait BlockRule: Send + Sync {
    fn id(&self) -> RuleId;

    fn try_match(
        &self,
        parser: &mut BlockParser<'_>,
        cursor: &mut Cursor<'_>,
    ) -> Result<Option<TokenRef>>;
}

pub trait InlineRule: Send + Sync {
    fn id(&self) -> RuleId;

    fn try_match(&self, parser: &InlineParser<'_>, cursor: &mut Cursor<'_>)
    -> Result<Option<TokenRef>>;
}

/// Builds an anchor id from heading text: lower case, runs of other
/// characters collapsed to `-`.
pub fn heading_id(text: &str) -> String {
    let mut id = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.chars() {
        if c.is_alphanumeric() || c == '_' {
            if pending_dash && !id.is_empty() {
                id.push('-');
            }
            pending_dash = false;
            id.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    id
}

/// Returns `(offset, len)` of `s` with surrounding whitespace removed.
pub(crate) fn trimmed_range(s: &str) -> (usize, usize) {
    let start = s.len() - s.trim_start().len();
    let trimmed = s.trim();
    (start, trimmed.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Title", "title")]
    #[case("Getting Started!", "getting-started")]
    #[case("  C# and .NET  ", "c-and-net")]
    #[case("snake_case", "snake_case")]
    #[case("***", "")]
    fn heading_ids(#[case] text: &str, #[case] expected: &str) {
        assert_eq!(heading_id(text), expected);
    }

    #[test]
    fn trimmed_range_of_padded_text() {
        assert_eq!(trimmed_range("  ab "), (2, 2));
        assert_eq!(trimmed_range("   "), (3, 0));
    }
}
