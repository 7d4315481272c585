//! Cross references and inline includes.

use crate::error::Result;
use crate::parsing::cursor::Cursor;
use crate::parsing::matcher::Matcher;
use crate::parsing::parser::InlineParser;
use crate::parsing::rules::blocks::{include_directive, include_from};
use crate::parsing::rules::{InlineRule, RuleId};
use crate::parsing::token::{TokenKind, TokenRef, Xref, XrefResolution};

/// Splits `uid?query` into the uid and the raw query string.
pub(crate) fn split_uid(raw: &str) -> (String, Option<String>) {
    match raw.split_once('?') {
        Some((uid, query)) => (
            uid.trim().to_string(),
            (!query.is_empty()).then(|| query.to_string()),
        ),
        None => (raw.trim().to_string(), None),
    }
}

fn xref(uid: String, query: Option<String>, hard: bool) -> TokenKind {
    TokenKind::Xref(Xref {
        uid,
        query,
        title: None,
        throw_if_unresolved: hard,
        resolution: XrefResolution::Unresolved,
        children: Vec::new(),
    })
}

/// `<xref:System.String>`.
pub(crate) struct XrefAutoLinkRule {
    matcher: Matcher,
}

impl XrefAutoLinkRule {
    pub(crate) fn new() -> Self {
        Self {
            matcher: Matcher::string_ignore_case("<xref:")
                + Matcher::any_char_not("<>\n").plus().group("uid")
                + Matcher::ch('>'),
        }
    }
}

impl InlineRule for XrefAutoLinkRule {
    fn id(&self) -> RuleId {
        RuleId::XrefAutoLink
    }

    fn try_match(
        &self,
        parser: &InlineParser<'_>,
        cursor: &mut Cursor<'_>,
    ) -> Result<Option<TokenRef>> {
        let Some(m) = cursor.try_match(&self.matcher) else {
            return Ok(None);
        };
        let raw = m.group("uid").unwrap_or_default();
        let raw = raw.trim_matches(|c| c == '"' || c == '\'');
        let (uid, query) = split_uid(raw);
        if uid.is_empty() {
            return Ok(None);
        }
        let span = cursor.consume(m.length);
        Ok(Some(parser.token(RuleId::XrefAutoLink, span, xref(uid, query, true))))
    }
}

/// `@uid`, `@"uid with spaces"` or `@'uid'`. Soft: an unknown uid is kept
/// for the renderer to flag.
pub(crate) struct XrefShortcutRule {
    matcher: Matcher,
}

impl XrefShortcutRule {
    pub(crate) fn new() -> Self {
        let quoted = |q: char| {
            let quote = q.to_string();
            Matcher::ch(q)
                + Matcher::any_char_not(&(quote + "\n")).plus().group("uid")
                + Matcher::ch(q)
        };
        let bare = (Matcher::letter()
            + (Matcher::word_char() | Matcher::any_char_in(".-*#:~`%")).star())
        .group("uid");
        Self {
            matcher: Matcher::ch('@') + (quoted('"') | quoted('\'') | bare),
        }
    }
}

/// Trailing characters a bare uid cannot end with.
fn trim_bare_uid(uid: &str) -> &str {
    uid.trim_end_matches(|c: char| !(c.is_alphanumeric() || c == '_' || c == '*' || c == '`'))
}

impl InlineRule for XrefShortcutRule {
    fn id(&self) -> RuleId {
        RuleId::XrefShortcut
    }

    fn try_match(
        &self,
        parser: &InlineParser<'_>,
        cursor: &mut Cursor<'_>,
    ) -> Result<Option<TokenRef>> {
        if cursor
            .prev_char()
            .is_some_and(|c| c.is_alphanumeric() || c == '_')
        {
            return Ok(None);
        }
        let Some(m) = cursor.try_match(&self.matcher) else {
            return Ok(None);
        };
        let raw = m.group("uid").unwrap_or_default();
        let quoted = matches!(m.as_str().as_bytes().get(1), Some(b'"' | b'\''));
        let (length, raw) = if quoted {
            (m.length, raw)
        } else {
            let trimmed = trim_bare_uid(raw);
            (1 + trimmed.len(), trimmed)
        };
        let (uid, query) = split_uid(raw);
        if uid.is_empty() {
            return Ok(None);
        }
        let span = cursor.consume(length);
        Ok(Some(parser.token(RuleId::XrefShortcut, span, xref(uid, query, false))))
    }
}

/// An include directive in running text.
pub(crate) struct IncludeInlineRule {
    matcher: Matcher,
}

impl IncludeInlineRule {
    pub(crate) fn new() -> Self {
        Self {
            matcher: include_directive(),
        }
    }
}

impl InlineRule for IncludeInlineRule {
    fn id(&self) -> RuleId {
        RuleId::IncludeInline
    }

    fn try_match(
        &self,
        parser: &InlineParser<'_>,
        cursor: &mut Cursor<'_>,
    ) -> Result<Option<TokenRef>> {
        let Some(m) = cursor.try_match(&self.matcher) else {
            return Ok(None);
        };
        let include = include_from(&m);
        let span = cursor.consume(m.length);
        Ok(Some(parser.token(
            RuleId::IncludeInline,
            span,
            TokenKind::IncludeInline(include),
        )))
    }
}
