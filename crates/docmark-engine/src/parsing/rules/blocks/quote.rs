//! Blockquotes and the note markers that live inside them.

use crate::error::Result;
use crate::parsing::context::ParseFlags;
use crate::parsing::cursor::Cursor;
use crate::parsing::matcher::Matcher;
use crate::parsing::parser::BlockParser;
use crate::parsing::rules::{BlockRule, RuleId};
use crate::parsing::source::SourceInfo;
use crate::parsing::token::{TokenKind, TokenRef};

use super::{atx_heading_start, fence_open, hr_line, indent, note_marker, quote_start};

/// `>` quoted lines plus lazy continuation lines. The content, with one
/// level of `>` removed, is tokenized as blocks in a derived buffer.
pub(crate) struct BlockquoteRule {
    matcher: Matcher,
}

impl BlockquoteRule {
    pub(crate) fn new() -> Self {
        let quote_line = quote_start() + Matcher::rest_of_line();
        let lazy_line = Matcher::new_line()
            + Matcher::negative(hr_line() | atx_heading_start() | fence_open())
            + Matcher::any_char_not("\n").plus();
        Self {
            matcher: (quote_line + lazy_line.star() + Matcher::new_line().star()).plus(),
        }
    }
}

/// Removes one level of quote prefix (`>` and one following space).
fn strip_quote(line: &str) -> &str {
    let unindented = line.trim_start_matches(' ');
    match unindented.strip_prefix('>') {
        Some(rest) => rest.strip_prefix(' ').unwrap_or(rest),
        None => line,
    }
}

impl BlockRule for BlockquoteRule {
    fn id(&self) -> RuleId {
        RuleId::Blockquote
    }

    fn try_match(
        &self,
        parser: &mut BlockParser<'_>,
        cursor: &mut Cursor<'_>,
    ) -> Result<Option<TokenRef>> {
        let Some(m) = cursor.try_match(&self.matcher) else {
            return Ok(None);
        };
        let mut content = m
            .as_str()
            .trim_end_matches('\n')
            .split('\n')
            .map(strip_quote)
            .collect::<Vec<_>>()
            .join("\n");
        content.push('\n');

        let span = cursor.consume(m.length);
        let inner = SourceInfo::derived(content, &span, span.line);
        let flags = ParseFlags {
            nested: true,
            in_quote: true,
            ..parser.flags()
        };
        let children = parser.tokenize_nested(&inner, flags)?;
        Ok(Some(parser.token(
            RuleId::Blockquote,
            span,
            TokenKind::Blockquote { children },
        )))
    }
}

/// `[!NOTE]`, `[!WARNING]`, ... at the start of a line inside a blockquote.
pub(crate) struct NoteMarkerRule {
    matcher: Matcher,
}

impl NoteMarkerRule {
    pub(crate) fn new() -> Self {
        Self {
            matcher: indent() + note_marker() + Matcher::new_line().star(),
        }
    }
}

impl BlockRule for NoteMarkerRule {
    fn id(&self) -> RuleId {
        RuleId::NoteMarker
    }

    fn try_match(
        &self,
        parser: &mut BlockParser<'_>,
        cursor: &mut Cursor<'_>,
    ) -> Result<Option<TokenRef>> {
        if !parser.flags().in_quote {
            return Ok(None);
        }
        let Some(m) = cursor.try_match(&self.matcher) else {
            return Ok(None);
        };
        let kind = m.group("kind").unwrap_or_default().to_ascii_uppercase();
        let span = cursor.consume(m.length);
        Ok(Some(parser.token(
            RuleId::NoteMarker,
            span,
            TokenKind::NoteMarker { kind },
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::context::MarkdownContext;
    use crate::parsing::parser::{EngineKind, Grammar};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn blocks(text: &str) -> Vec<TokenRef> {
        let grammar = Grammar::get(EngineKind::Dfm);
        let mut parser = BlockParser::new(grammar, MarkdownContext::default());
        parser
            .tokenize(&SourceInfo::document(text, None))
            .unwrap()
    }

    #[rstest]
    #[case("> a", "a")]
    #[case(">a", "a")]
    #[case("  >  a", " a")]
    #[case("> > a", "> a")]
    #[case("lazy", "lazy")]
    fn quote_prefix_removal(#[case] line: &str, #[case] expected: &str) {
        assert_eq!(strip_quote(line), expected);
    }

    #[test]
    fn quote_content_is_nested() {
        let tokens = blocks("> # Title\n> body\nlazy\n\nafter\n");
        assert_eq!(tokens.len(), 2);
        let quote = &tokens[0];
        assert_eq!(quote.rule, RuleId::Blockquote);
        let children = quote.children();
        assert_eq!(children[0].rule, RuleId::Heading);
        assert!(children[0].flags.in_quote);
        assert!(children[0].flags.nested);
        assert_eq!(children[1].rule, RuleId::Paragraph);
        assert_eq!(children[1].source.markdown(), "body\nlazy\n");
        // derived buffer keeps document line numbers
        assert_eq!(children[1].source.line, 2);
    }

    #[test]
    fn nested_quotes() {
        let tokens = blocks("> > deep\n");
        let outer = &tokens[0];
        let inner = &outer.children()[0];
        assert_eq!(inner.rule, RuleId::Blockquote);
        assert_eq!(inner.children()[0].rule, RuleId::Paragraph);
    }

    #[test]
    fn note_marker_inside_quote_only() {
        let tokens = blocks("> [!warning]\n> Careful.\n");
        let children = tokens[0].children();
        assert_eq!(
            children[0].kind,
            TokenKind::NoteMarker {
                kind: "WARNING".into()
            }
        );
        assert_eq!(children[1].rule, RuleId::Paragraph);

        let top = blocks("[!NOTE]\n");
        assert_eq!(top[0].rule, RuleId::Paragraph);
    }

    #[test]
    fn lazy_continuation_stops_at_hr() {
        let tokens = blocks("> quoted\n---\n");
        assert_eq!(tokens[0].rule, RuleId::Blockquote);
        assert_eq!(tokens[1].rule, RuleId::Hr);
    }
}
