//! Emphasis, code spans, breaks, escapes and plain text.

use crate::error::Result;
use crate::parsing::cursor::Cursor;
use crate::parsing::matcher::{MatchResult, Matcher};
use crate::parsing::parser::{EngineKind, InlineParser};
use crate::parsing::rules::{InlineRule, RuleId};
use crate::parsing::source::SourceInfo;
use crate::parsing::token::{TokenKind, TokenRef};

/// Tokenizes the `content` group of a match as nested inline content.
fn nested_content(
    parser: &InlineParser<'_>,
    m: &MatchResult<'_>,
    span: &SourceInfo,
) -> Result<Vec<TokenRef>> {
    let (start, end) = m.group_offset("content").unwrap_or_default();
    parser.tokenize(&span.slice(start, end - start))
}

pub(crate) struct EscapeRule {
    matcher: Matcher,
}

impl EscapeRule {
    pub(crate) fn new() -> Self {
        Self {
            matcher: Matcher::ch('\\')
                + Matcher::any_char_in("\\`*{}[]()#+-.!_>~|@<\"'").group("ch"),
        }
    }
}

impl InlineRule for EscapeRule {
    fn id(&self) -> RuleId {
        RuleId::Escape
    }

    fn try_match(
        &self,
        parser: &InlineParser<'_>,
        cursor: &mut Cursor<'_>,
    ) -> Result<Option<TokenRef>> {
        let Some(m) = cursor.try_match(&self.matcher) else {
            return Ok(None);
        };
        let Some(ch) = m.group("ch").and_then(|s| s.chars().next()) else {
            return Ok(None);
        };
        let span = cursor.consume(m.length);
        Ok(Some(parser.token(RuleId::Escape, span, TokenKind::Escape { ch })))
    }
}

/// `**strong**` or `__strong__`.
pub(crate) struct StrongRule {
    matcher: Matcher,
}

impl StrongRule {
    pub(crate) fn new() -> Self {
        let delimited = |d: &str, c: char| {
            Matcher::string(d)
                + (Matcher::negative(Matcher::string(d)) + Matcher::any_char())
                    .plus()
                    .group("content")
                + Matcher::string(d)
                + Matcher::negative(Matcher::ch(c))
        };
        Self {
            matcher: delimited("__", '_') | delimited("**", '*'),
        }
    }
}

impl InlineRule for StrongRule {
    fn id(&self) -> RuleId {
        RuleId::Strong
    }

    fn try_match(
        &self,
        parser: &InlineParser<'_>,
        cursor: &mut Cursor<'_>,
    ) -> Result<Option<TokenRef>> {
        let Some(m) = cursor.try_match(&self.matcher) else {
            return Ok(None);
        };
        let span = cursor.consume(m.length);
        let children = nested_content(parser, &m, &span)?;
        Ok(Some(parser.token(
            RuleId::Strong,
            span,
            TokenKind::Strong { children },
        )))
    }
}

/// `*em*` or `_em_`. An underscore only opens emphasis at a word boundary.
pub(crate) struct EmRule {
    matcher: Matcher,
}

impl EmRule {
    pub(crate) fn new() -> Self {
        let underscore = Matcher::ch('_')
            + (Matcher::string("__") | Matcher::any_char_not("_"))
                .plus()
                .group("content")
            + Matcher::ch('_')
            + Matcher::negative(Matcher::word_char());
        let star = Matcher::ch('*')
            + (Matcher::string("**") | Matcher::negative(Matcher::ch('*')) + Matcher::any_char())
                .plus()
                .group("content")
            + Matcher::ch('*')
            + Matcher::negative(Matcher::ch('*'));
        Self {
            matcher: underscore | star,
        }
    }
}

impl InlineRule for EmRule {
    fn id(&self) -> RuleId {
        RuleId::Em
    }

    fn try_match(
        &self,
        parser: &InlineParser<'_>,
        cursor: &mut Cursor<'_>,
    ) -> Result<Option<TokenRef>> {
        let after_word = cursor
            .prev_char()
            .is_some_and(|c| c.is_alphanumeric() || c == '_');
        if cursor.peek() == Some('_') && after_word {
            return Ok(None);
        }
        let Some(m) = cursor.try_match(&self.matcher) else {
            return Ok(None);
        };
        let span = cursor.consume(m.length);
        let children = nested_content(parser, &m, &span)?;
        Ok(Some(parser.token(RuleId::Em, span, TokenKind::Em { children })))
    }
}

/// Backtick code span; the closing run must be as long as the opening one.
pub(crate) struct CodeSpanRule {
    matcher: Matcher,
}

impl CodeSpanRule {
    pub(crate) fn new() -> Self {
        let close = Matcher::back_reference("ticks") + Matcher::negative(Matcher::ch('`'));
        Self {
            matcher: Matcher::ch('`').plus().group("ticks")
                + (Matcher::negative(close.clone()) + Matcher::any_char())
                    .plus()
                    .group("code")
                + close,
        }
    }
}

impl InlineRule for CodeSpanRule {
    fn id(&self) -> RuleId {
        RuleId::CodeSpan
    }

    fn try_match(
        &self,
        parser: &InlineParser<'_>,
        cursor: &mut Cursor<'_>,
    ) -> Result<Option<TokenRef>> {
        let Some(m) = cursor.try_match(&self.matcher) else {
            return Ok(None);
        };
        let code = m.group("code").unwrap_or_default().trim().to_string();
        let span = cursor.consume(m.length);
        Ok(Some(parser.token(
            RuleId::CodeSpan,
            span,
            TokenKind::CodeSpan { code },
        )))
    }
}

/// Two or more spaces before a newline that is followed by more text.
pub(crate) struct BrRule {
    matcher: Matcher,
}

impl BrRule {
    pub(crate) fn new() -> Self {
        Self {
            matcher: Matcher::ch(' ').repeat(2, usize::MAX)
                + Matcher::new_line()
                + Matcher::negative(
                    Matcher::any_char_in(" \t\n").star() + Matcher::end_of_string(),
                ),
        }
    }
}

impl InlineRule for BrRule {
    fn id(&self) -> RuleId {
        RuleId::Br
    }

    fn try_match(
        &self,
        parser: &InlineParser<'_>,
        cursor: &mut Cursor<'_>,
    ) -> Result<Option<TokenRef>> {
        let Some(m) = cursor.try_match(&self.matcher) else {
            return Ok(None);
        };
        let span = cursor.consume(m.length);
        Ok(Some(parser.token(RuleId::Br, span, TokenKind::Br)))
    }
}

/// `~~strikethrough~~` (GitHub flavour).
pub(crate) struct DelRule {
    matcher: Matcher,
}

impl DelRule {
    pub(crate) fn new() -> Self {
        Self {
            matcher: Matcher::string("~~")
                + Matcher::lookahead(Matcher::any_char_not(" \t\n"))
                + (Matcher::negative(Matcher::string("~~")) + Matcher::any_char())
                    .plus()
                    .group("content")
                + Matcher::string("~~"),
        }
    }
}

impl InlineRule for DelRule {
    fn id(&self) -> RuleId {
        RuleId::Del
    }

    fn try_match(
        &self,
        parser: &InlineParser<'_>,
        cursor: &mut Cursor<'_>,
    ) -> Result<Option<TokenRef>> {
        if !parser.options().gfm {
            return Ok(None);
        }
        let Some(m) = cursor.try_match(&self.matcher) else {
            return Ok(None);
        };
        let span = cursor.consume(m.length);
        let children = nested_content(parser, &m, &span)?;
        Ok(Some(parser.token(RuleId::Del, span, TokenKind::Del { children })))
    }
}

/// Plain text up to the next character that may start another inline rule.
pub(crate) struct TextRule {
    matcher: Matcher,
}

impl TextRule {
    pub(crate) fn new(kind: EngineKind) -> Self {
        let specials = match kind {
            EngineKind::Markdown => "\\<![_*`~",
            EngineKind::Dfm => "\\<![_*`~@",
        };
        let stop = Matcher::any_char_in(specials)
            | Matcher::string("http://")
            | Matcher::string("https://")
            | Matcher::ch(' ').repeat(2, usize::MAX) + Matcher::new_line();
        Self {
            matcher: Matcher::any_char() + (Matcher::negative(stop) + Matcher::any_char()).star(),
        }
    }
}

impl InlineRule for TextRule {
    fn id(&self) -> RuleId {
        RuleId::InlineText
    }

    fn try_match(
        &self,
        parser: &InlineParser<'_>,
        cursor: &mut Cursor<'_>,
    ) -> Result<Option<TokenRef>> {
        let Some(m) = cursor.try_match(&self.matcher) else {
            return Ok(None);
        };
        let span = cursor.consume(m.length);
        let content = span.markdown().to_string();
        Ok(Some(parser.token(
            RuleId::InlineText,
            span,
            TokenKind::Text { content },
        )))
    }
}
