//! Standard Markdown block rules.

use crate::error::Result;
use crate::parsing::context::LinkDefinition;
use crate::parsing::cursor::Cursor;
use crate::parsing::matcher::Matcher;
use crate::parsing::parser::{BlockParser, EngineKind};
use crate::parsing::rules::{BlockRule, RuleId, heading_id, trimmed_range};
use crate::parsing::token::{PendingInline, PendingShape, TokenKind, TokenRef};

use super::{
    atx_heading_start, def_line, directive_start, fence_open, hr_line, html_start, indent,
    quote_start, setext_heading,
};

pub(crate) struct NewLineRule {
    matcher: Matcher,
}

impl NewLineRule {
    pub(crate) fn new() -> Self {
        Self {
            matcher: Matcher::new_line().plus(),
        }
    }
}

impl BlockRule for NewLineRule {
    fn id(&self) -> RuleId {
        RuleId::NewLine
    }

    fn try_match(
        &self,
        parser: &mut BlockParser<'_>,
        cursor: &mut Cursor<'_>,
    ) -> Result<Option<TokenRef>> {
        let Some(m) = cursor.try_match(&self.matcher) else {
            return Ok(None);
        };
        let span = cursor.consume(m.length);
        Ok(Some(parser.token(RuleId::NewLine, span, TokenKind::NewLine)))
    }
}

/// Code indented by four spaces.
pub(crate) struct IndentedCodeRule {
    matcher: Matcher,
}

impl IndentedCodeRule {
    pub(crate) fn new() -> Self {
        Self {
            matcher: (Matcher::string("    ")
                + Matcher::any_char_not("\n").plus()
                + Matcher::new_line().star())
            .plus(),
        }
    }
}

impl BlockRule for IndentedCodeRule {
    fn id(&self) -> RuleId {
        RuleId::Code
    }

    fn try_match(
        &self,
        parser: &mut BlockParser<'_>,
        cursor: &mut Cursor<'_>,
    ) -> Result<Option<TokenRef>> {
        let Some(m) = cursor.try_match(&self.matcher) else {
            return Ok(None);
        };
        let code = m
            .as_str()
            .trim_end_matches('\n')
            .split('\n')
            .map(|line| line.strip_prefix("    ").unwrap_or(line))
            .collect::<Vec<_>>()
            .join("\n");
        let span = cursor.consume(m.length);
        Ok(Some(parser.token(
            RuleId::Code,
            span,
            TokenKind::Code {
                lang: None,
                code,
                fenced: false,
            },
        )))
    }
}

/// ```` ``` ```` or `~~~` fenced code. An unterminated fence runs to the end
/// of the input.
pub(crate) struct FencesRule {
    matcher: Matcher,
}

impl FencesRule {
    pub(crate) fn new() -> Self {
        let line_or_end = Matcher::new_line() | Matcher::end_of_string();
        let open = indent()
            + (Matcher::ch('`').repeat(3, usize::MAX) | Matcher::ch('~').repeat(3, usize::MAX))
                .group("fence")
            + Matcher::white_space_in_line().star()
            + Matcher::any_char_not(" \t\n`~").plus().group("lang").optional()
            + Matcher::rest_of_line()
            + line_or_end.clone();
        let close = indent()
            + Matcher::back_reference("fence")
            + Matcher::any_char_in("`~").star()
            + Matcher::white_space_in_line().star()
            + line_or_end.clone();
        let body_line = Matcher::negative(close.clone())
            + Matcher::negative(Matcher::end_of_string())
            + Matcher::rest_of_line()
            + line_or_end;
        Self {
            matcher: open
                + body_line.star().group("code")
                + (close | Matcher::end_of_string())
                + Matcher::new_line().star(),
        }
    }
}

impl BlockRule for FencesRule {
    fn id(&self) -> RuleId {
        RuleId::Fences
    }

    fn try_match(
        &self,
        parser: &mut BlockParser<'_>,
        cursor: &mut Cursor<'_>,
    ) -> Result<Option<TokenRef>> {
        if !parser.options().gfm {
            return Ok(None);
        }
        let Some(m) = cursor.try_match(&self.matcher) else {
            return Ok(None);
        };
        let lang = m.group("lang").map(str::to_string);
        let code = m.group("code").unwrap_or_default();
        let code = code.strip_suffix('\n').unwrap_or(code).to_string();
        let span = cursor.consume(m.length);
        Ok(Some(parser.token(
            RuleId::Fences,
            span,
            TokenKind::Code {
                lang,
                code,
                fenced: true,
            },
        )))
    }
}

/// ATX heading. In legacy mode the space after `#` is optional.
pub(crate) struct HeadingRule {
    strict: Matcher,
    legacy: Matcher,
}

impl HeadingRule {
    pub(crate) fn new() -> Self {
        let level = indent() + Matcher::ch('#').repeat(1, 6).group("level");
        let end = Matcher::new_line().plus() | Matcher::end_of_string();
        let strict = level.clone()
            + (Matcher::white_space_in_line().plus() + Matcher::rest_of_line().group("title")
                | Matcher::lookahead(Matcher::new_line() | Matcher::end_of_string()))
            + end.clone();
        let legacy = level
            + Matcher::white_space_in_line().star()
            + Matcher::rest_of_line().group("title")
            + end;
        Self { strict, legacy }
    }
}

/// Strips an optional closing `#` sequence and surrounding blanks.
fn heading_title(title: &str) -> (usize, usize) {
    let trimmed = title.trim_end();
    let without = trimmed.trim_end_matches('#');
    let kept = if without.is_empty() || without.ends_with([' ', '\t']) {
        without.trim_end()
    } else {
        trimmed
    };
    trimmed_range(kept)
}

impl BlockRule for HeadingRule {
    fn id(&self) -> RuleId {
        RuleId::Heading
    }

    fn try_match(
        &self,
        parser: &mut BlockParser<'_>,
        cursor: &mut Cursor<'_>,
    ) -> Result<Option<TokenRef>> {
        let matcher = if parser.options().legacy {
            &self.legacy
        } else {
            &self.strict
        };
        let Some(m) = cursor.try_match(matcher) else {
            return Ok(None);
        };
        let level = m.group("level").map_or(1, str::len) as u8;
        let (title_start, title) = match (m.group_offset("title"), m.group("title")) {
            (Some((start, _)), Some(title)) => (start, title),
            _ => (m.length, ""),
        };
        let (offset, len) = heading_title(title);
        let span = cursor.consume(m.length);
        let title_span = span.slice(title_start + offset, len);
        let id = heading_id(title_span.markdown());
        Ok(Some(parser.token(
            RuleId::Heading,
            span,
            TokenKind::Pending(PendingInline {
                shape: PendingShape::Heading { level, id },
                spans: vec![title_span],
            }),
        )))
    }
}

/// Setext heading: a line underlined with `=` (level 1) or `-` (level 2).
pub(crate) struct LHeadingRule {
    matcher: Matcher,
}

impl LHeadingRule {
    pub(crate) fn new() -> Self {
        Self {
            matcher: setext_heading() + Matcher::new_line().star(),
        }
    }
}

impl BlockRule for LHeadingRule {
    fn id(&self) -> RuleId {
        RuleId::LHeading
    }

    fn try_match(
        &self,
        parser: &mut BlockParser<'_>,
        cursor: &mut Cursor<'_>,
    ) -> Result<Option<TokenRef>> {
        let Some(m) = cursor.try_match(&self.matcher) else {
            return Ok(None);
        };
        let level = if m.group("underline").is_some_and(|u| u.starts_with('=')) {
            1
        } else {
            2
        };
        let (offset, len) = trimmed_range(m.group("title").unwrap_or_default());
        let span = cursor.consume(m.length);
        let title_span = span.slice(offset, len);
        let id = heading_id(title_span.markdown());
        Ok(Some(parser.token(
            RuleId::LHeading,
            span,
            TokenKind::Pending(PendingInline {
                shape: PendingShape::Heading { level, id },
                spans: vec![title_span],
            }),
        )))
    }
}

pub(crate) struct HrRule {
    matcher: Matcher,
}

impl HrRule {
    pub(crate) fn new() -> Self {
        Self {
            matcher: hr_line() + Matcher::new_line().star(),
        }
    }
}

impl BlockRule for HrRule {
    fn id(&self) -> RuleId {
        RuleId::Hr
    }

    fn try_match(
        &self,
        parser: &mut BlockParser<'_>,
        cursor: &mut Cursor<'_>,
    ) -> Result<Option<TokenRef>> {
        let Some(m) = cursor.try_match(&self.matcher) else {
            return Ok(None);
        };
        let span = cursor.consume(m.length);
        Ok(Some(parser.token(RuleId::Hr, span, TokenKind::Hr)))
    }
}

/// Raw html up to the next blank line.
pub(crate) struct HtmlRule {
    matcher: Matcher,
}

impl HtmlRule {
    pub(crate) fn new() -> Self {
        Self {
            matcher: html_start()
                + Matcher::rest_of_line()
                + (Matcher::new_line() + Matcher::any_char_not("\n").plus()).star()
                + Matcher::new_line().star(),
        }
    }
}

impl BlockRule for HtmlRule {
    fn id(&self) -> RuleId {
        RuleId::Html
    }

    fn try_match(
        &self,
        parser: &mut BlockParser<'_>,
        cursor: &mut Cursor<'_>,
    ) -> Result<Option<TokenRef>> {
        let Some(m) = cursor.try_match(&self.matcher) else {
            return Ok(None);
        };
        let raw = m.as_str().trim_end().to_string();
        let span = cursor.consume(m.length);
        Ok(Some(parser.token(RuleId::Html, span, TokenKind::Html { raw })))
    }
}

/// `[key]: href "title"`, recorded in the context for reference links.
pub(crate) struct DefRule {
    matcher: Matcher,
}

impl DefRule {
    pub(crate) fn new() -> Self {
        Self {
            matcher: def_line() + Matcher::new_line().star(),
        }
    }
}

impl BlockRule for DefRule {
    fn id(&self) -> RuleId {
        RuleId::Def
    }

    fn try_match(
        &self,
        parser: &mut BlockParser<'_>,
        cursor: &mut Cursor<'_>,
    ) -> Result<Option<TokenRef>> {
        if !parser.flags().top_level() {
            return Ok(None);
        }
        let Some(m) = cursor.try_match(&self.matcher) else {
            return Ok(None);
        };
        let key = m.group("key").unwrap_or_default().to_string();
        let href = m.group("href").unwrap_or_default().to_string();
        let title = m.group("title").map(str::to_string);
        parser.context_mut().define_link(
            &key,
            LinkDefinition {
                href: href.clone(),
                title: title.clone(),
            },
        );
        let span = cursor.consume(m.length);
        Ok(Some(parser.token(
            RuleId::Def,
            span,
            TokenKind::LinkDefinition { key, href, title },
        )))
    }
}

/// Consecutive non-blank lines, up to a line that starts another block.
///
/// Inside list items and quotes a list bullet also ends the paragraph.
pub(crate) struct ParagraphRule {
    top_level: Matcher,
    nested: Matcher,
}

impl ParagraphRule {
    pub(crate) fn new(kind: EngineKind) -> Self {
        let mut interrupts = vec![
            hr_line(),
            atx_heading_start(),
            fence_open(),
            quote_start(),
            html_start(),
            def_line(),
            setext_heading(),
        ];
        if kind == EngineKind::Dfm {
            interrupts.push(directive_start());
        }
        let build = |interrupts: Vec<Matcher>| {
            let line = Matcher::any_char_not("\n").plus();
            let continuation =
                Matcher::new_line() + Matcher::negative(Matcher::any_of(interrupts)) + line.clone();
            (line + continuation.star()).group("content") + Matcher::new_line().star()
        };
        let top_level = build(interrupts.clone());
        interrupts.push(
            indent()
                + (Matcher::any_char_in("*+-") | Matcher::digit().repeat(1, 9) + Matcher::ch('.'))
                + Matcher::white_space_in_line().plus(),
        );
        Self {
            top_level,
            nested: build(interrupts),
        }
    }
}

impl BlockRule for ParagraphRule {
    fn id(&self) -> RuleId {
        RuleId::Paragraph
    }

    fn try_match(
        &self,
        parser: &mut BlockParser<'_>,
        cursor: &mut Cursor<'_>,
    ) -> Result<Option<TokenRef>> {
        let matcher = if parser.flags().nested {
            &self.nested
        } else {
            &self.top_level
        };
        let Some(m) = cursor.try_match(matcher) else {
            return Ok(None);
        };
        let content_len = m.group("content").map_or(m.length, str::len);
        let span = cursor.consume(m.length);
        let content = span.slice(0, content_len);
        Ok(Some(parser.token(
            RuleId::Paragraph,
            span,
            TokenKind::Pending(PendingInline {
                shape: PendingShape::Paragraph,
                spans: vec![content],
            }),
        )))
    }
}

/// Fallback: one line of plain text.
pub(crate) struct TextRule {
    matcher: Matcher,
}

impl TextRule {
    pub(crate) fn new() -> Self {
        Self {
            matcher: Matcher::any_char_not("\n").plus() + Matcher::new_line().star(),
        }
    }
}

impl BlockRule for TextRule {
    fn id(&self) -> RuleId {
        RuleId::Text
    }

    fn try_match(
        &self,
        parser: &mut BlockParser<'_>,
        cursor: &mut Cursor<'_>,
    ) -> Result<Option<TokenRef>> {
        let Some(m) = cursor.try_match(&self.matcher) else {
            return Ok(None);
        };
        let content = m.as_str().trim_end_matches('\n').to_string();
        let span = cursor.consume(m.length);
        Ok(Some(parser.token(
            RuleId::Text,
            span,
            TokenKind::Text { content },
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::context::MarkdownContext;
    use crate::parsing::parser::Grammar;
    use crate::parsing::source::SourceInfo;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn blocks(text: &str) -> Vec<TokenRef> {
        let grammar = Grammar::get(EngineKind::Dfm);
        let mut parser = BlockParser::new(grammar, MarkdownContext::default());
        parser
            .tokenize(&SourceInfo::document(text, None))
            .unwrap()
    }

    fn pending(token: &TokenRef) -> &PendingInline {
        match &token.kind {
            TokenKind::Pending(p) => p,
            other => panic!("expected pending token, got {other:?}"),
        }
    }

    #[rstest]
    #[case("# Title\n", 1, "Title")]
    #[case("### Deep ###\n", 3, "Deep")]
    #[case("## C#\n", 2, "C#")]
    #[case("#Legacy", 1, "Legacy")]
    #[case("#\n", 1, "")]
    fn atx_headings(#[case] text: &str, #[case] level: u8, #[case] title: &str) {
        let tokens = blocks(text);
        assert_eq!(tokens[0].rule, RuleId::Heading);
        let p = pending(&tokens[0]);
        assert_eq!(p.spans[0].markdown(), title);
        match &p.shape {
            PendingShape::Heading { level: l, .. } => assert_eq!(*l, level),
            other => panic!("unexpected shape {other:?}"),
        }
    }

    #[test]
    fn strict_heading_needs_space() {
        let grammar = Grammar::get(EngineKind::Markdown);
        let mut ctx = MarkdownContext::default();
        ctx.options.legacy = false;
        let mut parser = BlockParser::new(grammar, ctx);
        let tokens = parser
            .tokenize(&SourceInfo::document("#hashtag\n", None))
            .unwrap();
        assert_eq!(tokens[0].rule, RuleId::Paragraph);
    }

    #[test]
    fn setext_heading_levels() {
        let tokens = blocks("Title\n=====\n\nSub\n---\n");
        assert_eq!(tokens[0].rule, RuleId::LHeading);
        assert_eq!(pending(&tokens[0]).spans[0].markdown(), "Title");
        assert_eq!(tokens[1].rule, RuleId::LHeading);
        match &pending(&tokens[1]).shape {
            PendingShape::Heading { level, id } => {
                assert_eq!(*level, 2);
                assert_eq!(id, "sub");
            }
            other => panic!("unexpected shape {other:?}"),
        }
    }

    #[test]
    fn fenced_code_with_language() {
        let tokens = blocks("```rust\nfn main() {}\n```\nafter\n");
        assert_eq!(
            tokens[0].kind,
            TokenKind::Code {
                lang: Some("rust".into()),
                code: "fn main() {}".into(),
                fenced: true,
            }
        );
        assert_eq!(tokens[1].rule, RuleId::Paragraph);
    }

    #[test]
    fn unterminated_fence_runs_to_end() {
        let tokens = blocks("~~~\na\nb");
        assert_eq!(tokens.len(), 1);
        assert_eq!(
            tokens[0].kind,
            TokenKind::Code {
                lang: None,
                code: "a\nb".into(),
                fenced: true,
            }
        );
    }

    #[test]
    fn fence_needs_matching_closer() {
        let tokens = blocks("````\n```\n````\n");
        match &tokens[0].kind {
            TokenKind::Code { code, .. } => assert_eq!(code, "```"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn indented_code_strips_indent() {
        let tokens = blocks("    let x = 1;\n      nested\n\ntext\n");
        assert_eq!(
            tokens[0].kind,
            TokenKind::Code {
                lang: None,
                code: "let x = 1;\n  nested".into(),
                fenced: false,
            }
        );
    }

    #[test]
    fn paragraph_stops_at_interrupting_block() {
        let tokens = blocks("one\ntwo\n# three\n");
        assert_eq!(pending(&tokens[0]).spans[0].markdown(), "one\ntwo");
        assert_eq!(tokens[1].rule, RuleId::Heading);
    }

    #[test]
    fn paragraph_yields_last_line_to_setext_heading() {
        let tokens = blocks("a\nb\n---\n");
        assert_eq!(pending(&tokens[0]).spans[0].markdown(), "a");
        assert_eq!(tokens[1].rule, RuleId::LHeading);
    }

    #[test]
    fn definition_is_recorded() {
        let grammar = Grammar::get(EngineKind::Markdown);
        let mut parser = BlockParser::new(grammar, MarkdownContext::default());
        let tokens = parser
            .tokenize(&SourceInfo::document("[Home]: <http://x.org> 'Start'\n", None))
            .unwrap();
        assert_eq!(
            tokens[0].kind,
            TokenKind::LinkDefinition {
                key: "Home".into(),
                href: "http://x.org".into(),
                title: Some("Start".into()),
            }
        );
        assert_eq!(parser.context().link("home").unwrap().href, "http://x.org");
    }

    #[test]
    fn html_block_runs_to_blank_line() {
        let tokens = blocks("<div>\n  *x*\n</div>\n\npara\n");
        assert_eq!(
            tokens[0].kind,
            TokenKind::Html {
                raw: "<div>\n  *x*\n</div>".into()
            }
        );
        assert_eq!(tokens[1].rule, RuleId::Paragraph);
    }

    #[test]
    fn hr_and_newlines() {
        let tokens = blocks("\n\n***\n");
        assert_eq!(tokens[0].kind, TokenKind::NewLine);
        assert_eq!(tokens[1].kind, TokenKind::Hr);
    }
}
