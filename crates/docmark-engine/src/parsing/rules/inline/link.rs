//! Links, images, autolinks, bare urls and inline html tags.

use crate::error::Result;
use crate::parsing::cursor::Cursor;
use crate::parsing::matcher::{MatchResult, Matcher};
use crate::parsing::parser::{EngineKind, InlineParser};
use crate::parsing::rules::{InlineRule, RuleId};
use crate::parsing::source::SourceInfo;
use crate::parsing::token::{TokenKind, TokenRef, Xref, XrefResolution};

use super::split_uid;

/// Link text: balanced single-level brackets, or a `]` that is closed later.
fn link_text() -> Matcher {
    (Matcher::ch('[') + Matcher::any_char_not("]").star() + Matcher::ch(']')
        | Matcher::any_char_not("[]")
        | Matcher::ch(']')
            + Matcher::lookahead(Matcher::any_char_not("[]").star() + Matcher::ch(']')))
    .star()
}

/// `<http://example.com>` or `<me@example.com>`.
pub(crate) struct AutoLinkRule {
    matcher: Matcher,
}

impl AutoLinkRule {
    pub(crate) fn new() -> Self {
        Self {
            matcher: Matcher::ch('<')
                + Matcher::any_char_not(" <>\n").plus().group("href")
                + Matcher::ch('>'),
        }
    }
}

impl InlineRule for AutoLinkRule {
    fn id(&self) -> RuleId {
        RuleId::AutoLink
    }

    fn try_match(
        &self,
        parser: &InlineParser<'_>,
        cursor: &mut Cursor<'_>,
    ) -> Result<Option<TokenRef>> {
        let Some(m) = cursor.try_match(&self.matcher) else {
            return Ok(None);
        };
        let target = m.group("href").unwrap_or_default();
        let href = if target.contains(':') {
            target.to_string()
        } else if target.contains('@') {
            format!("mailto:{target}")
        } else {
            return Ok(None);
        };
        let (text_at, _) = m.group_offset("href").unwrap_or_default();
        let span = cursor.consume(m.length);
        let text = span.slice(text_at, target.len());
        let label = parser.token(
            RuleId::InlineText,
            text,
            TokenKind::Text {
                content: target.to_string(),
            },
        );
        Ok(Some(parser.token(
            RuleId::AutoLink,
            span,
            TokenKind::Link {
                href,
                title: None,
                children: vec![label],
            },
        )))
    }
}

/// Bare `http://` and `https://` urls, outside of link text.
pub(crate) struct UrlRule {
    matcher: Matcher,
}

impl UrlRule {
    pub(crate) fn new() -> Self {
        Self {
            matcher: (Matcher::string("https://") | Matcher::string("http://"))
                + Matcher::any_char_not(" \t\n<").plus(),
        }
    }
}

impl InlineRule for UrlRule {
    fn id(&self) -> RuleId {
        RuleId::Url
    }

    fn try_match(
        &self,
        parser: &InlineParser<'_>,
        cursor: &mut Cursor<'_>,
    ) -> Result<Option<TokenRef>> {
        if !parser.options().gfm || parser.flags().in_link {
            return Ok(None);
        }
        let Some(m) = cursor.try_match(&self.matcher) else {
            return Ok(None);
        };
        let url = m.as_str().trim_end_matches(['.', ',', ':', ';', '"', '\'', ')', ']']);
        let span = cursor.consume(url.len());
        let label = parser.token(
            RuleId::InlineText,
            span.clone(),
            TokenKind::Text {
                content: url.to_string(),
            },
        );
        Ok(Some(parser.token(
            RuleId::Url,
            span,
            TokenKind::Link {
                href: url.to_string(),
                title: None,
                children: vec![label],
            },
        )))
    }
}

/// Inline html: a tag with attributes, or a comment.
pub(crate) struct TagRule {
    matcher: Matcher,
}

impl TagRule {
    pub(crate) fn new() -> Self {
        let comment = Matcher::string("<!--")
            + (Matcher::negative(Matcher::string("-->")) + Matcher::any_char()).star()
            + Matcher::string("-->");
        let attribute = Matcher::ch('"') + Matcher::any_char_not("\"").star() + Matcher::ch('"')
            | Matcher::ch('\'') + Matcher::any_char_not("'").star() + Matcher::ch('\'')
            | Matcher::any_char_not("'\">");
        let tag = Matcher::ch('<')
            + Matcher::ch('/').optional()
            + Matcher::letter()
            + Matcher::word_char().star()
            + attribute.star()
            + Matcher::ch('>');
        Self {
            matcher: comment | tag,
        }
    }
}

impl InlineRule for TagRule {
    fn id(&self) -> RuleId {
        RuleId::Tag
    }

    fn try_match(
        &self,
        parser: &InlineParser<'_>,
        cursor: &mut Cursor<'_>,
    ) -> Result<Option<TokenRef>> {
        let Some(m) = cursor.try_match(&self.matcher) else {
            return Ok(None);
        };
        let raw = m.as_str().to_string();
        let span = cursor.consume(m.length);
        Ok(Some(parser.token(RuleId::Tag, span, TokenKind::Tag { raw })))
    }
}

/// Builds a link, image or (for `xref:` targets) a cross reference from the
/// `text` group of `m`.
fn link_token(
    parser: &InlineParser<'_>,
    rule: RuleId,
    m: &MatchResult<'_>,
    span: SourceInfo,
    href: &str,
    title: Option<String>,
) -> Result<TokenRef> {
    let (text_start, text_end) = m.group_offset("text").unwrap_or_default();
    let text = span.slice(text_start, text_end - text_start);

    if m.as_str().starts_with('!') {
        return Ok(parser.token(
            rule,
            span,
            TokenKind::Image {
                src: href.to_string(),
                alt: text.markdown().to_string(),
                title,
            },
        ));
    }

    let children = parser.in_link().tokenize(&text)?;
    let xref_target = href
        .get(..5)
        .filter(|scheme| scheme.eq_ignore_ascii_case("xref:"))
        .map(|_| &href[5..]);
    let xref_uid = xref_target
        .filter(|_| parser.grammar().kind == EngineKind::Dfm)
        .map(split_uid)
        .filter(|(uid, _)| !uid.is_empty());
    if let Some((uid, query)) = xref_uid {
        return Ok(parser.token(
            rule,
            span,
            TokenKind::Xref(Xref {
                uid,
                query,
                title,
                throw_if_unresolved: true,
                resolution: XrefResolution::Unresolved,
                children,
            }),
        ));
    }

    Ok(parser.token(
        rule,
        span,
        TokenKind::Link {
            href: href.to_string(),
            title,
            children,
        },
    ))
}

/// `[text](href "title")` and `![alt](src)`.
pub(crate) struct LinkRule {
    matcher: Matcher,
}

impl LinkRule {
    pub(crate) fn new() -> Self {
        let ws = Matcher::white_space_in_line();
        let href = Matcher::ch('<')
            + Matcher::any_char_not(">\n").star().group("href")
            + Matcher::ch('>')
            | (Matcher::ch('(') + Matcher::any_char_not("() \t\n").star() + Matcher::ch(')')
                | Matcher::any_char_not(" \t\n()"))
            .star()
            .group("href");
        let title = Matcher::ch('"')
            + Matcher::any_char_not("\"").star().group("title")
            + Matcher::ch('"')
            | Matcher::ch('\'') + Matcher::any_char_not("'").star().group("title") + Matcher::ch('\'');
        Self {
            matcher: Matcher::ch('!').optional()
                + Matcher::ch('[')
                + link_text().group("text")
                + Matcher::string("](")
                + ws.clone().star()
                + href
                + (ws.clone().plus() + title).optional()
                + ws.star()
                + Matcher::ch(')'),
        }
    }
}

impl InlineRule for LinkRule {
    fn id(&self) -> RuleId {
        RuleId::Link
    }

    fn try_match(
        &self,
        parser: &InlineParser<'_>,
        cursor: &mut Cursor<'_>,
    ) -> Result<Option<TokenRef>> {
        let Some(m) = cursor.try_match(&self.matcher) else {
            return Ok(None);
        };
        let href = m.group("href").unwrap_or_default().to_string();
        let title = m.group("title").map(str::to_string);
        let span = cursor.consume(m.length);
        link_token(parser, RuleId::Link, &m, span, &href, title).map(Some)
    }
}

/// Resolves `[text][id]` / `[id]` against the link definitions. An unknown
/// reference gives back its first character as text.
fn reference(
    parser: &InlineParser<'_>,
    rule: RuleId,
    cursor: &mut Cursor<'_>,
    m: &MatchResult<'_>,
) -> Result<TokenRef> {
    let key = match m.group("id") {
        Some(id) if !id.trim().is_empty() => id,
        _ => m.group("text").unwrap_or_default(),
    };
    match parser.context().link(key) {
        Some(def) => {
            let span = cursor.consume(m.length);
            link_token(parser, rule, m, span, &def.href, def.title.clone())
        }
        None => {
            let first = cursor.peek().map_or(1, char::len_utf8);
            let span = cursor.consume(first);
            let content = span.markdown().to_string();
            Ok(parser.token(RuleId::InlineText, span, TokenKind::Text { content }))
        }
    }
}

/// `[text][id]`.
pub(crate) struct RefLinkRule {
    matcher: Matcher,
}

impl RefLinkRule {
    pub(crate) fn new() -> Self {
        Self {
            matcher: Matcher::ch('!').optional()
                + Matcher::ch('[')
                + link_text().group("text")
                + Matcher::ch(']')
                + Matcher::white_space_in_line().star()
                + Matcher::ch('[')
                + Matcher::any_char_not("]").star().group("id")
                + Matcher::ch(']'),
        }
    }
}

impl InlineRule for RefLinkRule {
    fn id(&self) -> RuleId {
        RuleId::RefLink
    }

    fn try_match(
        &self,
        parser: &InlineParser<'_>,
        cursor: &mut Cursor<'_>,
    ) -> Result<Option<TokenRef>> {
        let Some(m) = cursor.try_match(&self.matcher) else {
            return Ok(None);
        };
        reference(parser, RuleId::RefLink, cursor, &m).map(Some)
    }
}

/// `[id]` shortcut reference.
pub(crate) struct NoLinkRule {
    matcher: Matcher,
}

impl NoLinkRule {
    pub(crate) fn new() -> Self {
        Self {
            matcher: Matcher::ch('!').optional()
                + Matcher::ch('[')
                + (Matcher::ch('[') + Matcher::any_char_not("]").star() + Matcher::ch(']')
                    | Matcher::any_char_not("[]"))
                .star()
                .group("text")
                + Matcher::ch(']'),
        }
    }
}

impl InlineRule for NoLinkRule {
    fn id(&self) -> RuleId {
        RuleId::NoLink
    }

    fn try_match(
        &self,
        parser: &InlineParser<'_>,
        cursor: &mut Cursor<'_>,
    ) -> Result<Option<TokenRef>> {
        let Some(m) = cursor.try_match(&self.matcher) else {
            return Ok(None);
        };
        reference(parser, RuleId::NoLink, cursor, &m).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::super::tokenize_with;
    use super::*;
    use crate::parsing::context::{LinkDefinition, MarkdownContext};
    use crate::parsing::token::TokenTag;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn one(text: &str, kind: EngineKind, ctx: &MarkdownContext) -> TokenRef {
        let mut tokens = tokenize_with(text, kind, ctx);
        assert_eq!(tokens.len(), 1, "{tokens:?}");
        tokens.remove(0)
    }

    #[test]
    fn inline_link_with_title() {
        let token = one(
            "[the *docs*](http://x.org/a_(b) \"Docs\")",
            EngineKind::Markdown,
            &MarkdownContext::default(),
        );
        let TokenKind::Link { href, title, children } = &token.kind else {
            panic!("expected link, got {:?}", token.kind);
        };
        assert_eq!(href, "http://x.org/a_(b)");
        assert_eq!(title.as_deref(), Some("Docs"));
        assert_eq!(children.len(), 2);
        assert!(children.iter().all(|c| c.flags.in_link));
        assert_eq!(token.plain_text(), "the docs");
    }

    #[test]
    fn image() {
        let token = one("![a cat](cat.png)", EngineKind::Markdown, &MarkdownContext::default());
        assert_eq!(
            token.kind,
            TokenKind::Image {
                src: "cat.png".into(),
                alt: "a cat".into(),
                title: None,
            }
        );
    }

    #[test]
    fn xref_link_in_dfm_only() {
        let ctx = MarkdownContext::default();
        let token = one("[String](xref:System.String)", EngineKind::Dfm, &ctx);
        let TokenKind::Xref(xref) = &token.kind else {
            panic!("expected xref, got {:?}", token.kind);
        };
        assert_eq!(xref.uid, "System.String");
        assert!(xref.throw_if_unresolved);
        assert_eq!(token.plain_text(), "String");

        let plain = one("[String](xref:System.String)", EngineKind::Markdown, &ctx);
        assert_eq!(plain.tag(), TokenTag::Link);
    }

    #[rstest]
    #[case("[see](xref:)")]
    #[case("[see](xref:?text=a)")]
    fn xref_link_without_uid_stays_a_link(#[case] text: &str) {
        let token = one(text, EngineKind::Dfm, &MarkdownContext::default());
        let TokenKind::Link { href, .. } = &token.kind else {
            panic!("expected link, got {:?}", token.kind);
        };
        assert_eq!(href, &text[6..text.len() - 1]);
        assert_eq!(token.plain_text(), "see");
    }

    #[test]
    fn reference_links() {
        let mut ctx = MarkdownContext::default();
        ctx.define_link(
            "home",
            LinkDefinition {
                href: "/index.html".into(),
                title: Some("Home".into()),
            },
        );
        let full = one("[Go home][Home]", EngineKind::Markdown, &ctx);
        assert!(matches!(&full.kind, TokenKind::Link { href, .. } if href == "/index.html"));
        let short = one("[home]", EngineKind::Markdown, &ctx);
        assert_eq!(short.rule, RuleId::NoLink);
        assert_eq!(short.plain_text(), "home");
    }

    #[test]
    fn unknown_reference_degrades_to_text() {
        let tokens = tokenize_with("[nope]", EngineKind::Markdown, &MarkdownContext::default());
        assert!(tokens.iter().all(|t| t.tag() == TokenTag::Text));
        let text: String = tokens.iter().map(|t| t.plain_text()).collect();
        assert_eq!(text, "[nope]");
    }

    #[test]
    fn autolinks() {
        let ctx = MarkdownContext::default();
        let web = one("<https://x.org>", EngineKind::Markdown, &ctx);
        assert!(matches!(&web.kind, TokenKind::Link { href, .. } if href == "https://x.org"));
        let mail = one("<me@x.org>", EngineKind::Markdown, &ctx);
        assert!(matches!(&mail.kind, TokenKind::Link { href, .. } if href == "mailto:me@x.org"));
        assert_eq!(mail.plain_text(), "me@x.org");
    }

    #[test]
    fn bare_url_drops_trailing_punctuation() {
        let tokens = tokenize_with(
            "see https://x.org/a.",
            EngineKind::Markdown,
            &MarkdownContext::default(),
        );
        assert_eq!(tokens[1].tag(), TokenTag::Link);
        assert_eq!(tokens[1].plain_text(), "https://x.org/a");
        assert_eq!(tokens[2].plain_text(), ".");
    }

    #[test]
    fn no_bare_urls_inside_link_text() {
        let token = one(
            "[https://x.org](https://x.org)",
            EngineKind::Markdown,
            &MarkdownContext::default(),
        );
        assert!(token.children().iter().all(|c| c.tag() == TokenTag::Text));
    }

    #[test]
    fn inline_tags() {
        let ctx = MarkdownContext::default();
        let tokens = tokenize_with("a <b class=\"x\">b</b>", EngineKind::Markdown, &ctx);
        let tags: Vec<_> = tokens.iter().map(|t| t.tag()).collect();
        assert_eq!(
            tags,
            vec![TokenTag::Text, TokenTag::Tag, TokenTag::Text, TokenTag::Tag]
        );
    }
}
