use std::sync::Arc;

use crate::parsing::rules::RuleId;
use crate::parsing::token::{Token, TokenKind, TokenRef, TokenTag};
use crate::rewriting::rewriter::Rewriter;

/// Tokens whose children are inline content.
const INLINE_CONTAINERS: [TokenTag; 10] = [
    TokenTag::Paragraph,
    TokenTag::Heading,
    TokenTag::TableCell,
    TokenTag::TabTitle,
    TokenTag::Strong,
    TokenTag::Em,
    TokenTag::Del,
    TokenTag::Link,
    TokenTag::Xref,
    TokenTag::IncludeInline,
];

/// Merges runs of adjacent text tokens that cover contiguous source.
pub fn merge_text() -> Rewriter {
    Rewriter::composite(
        INLINE_CONTAINERS
            .iter()
            .map(|tag| Rewriter::lambda("merge_text", *tag, |_, token| Ok(merged(token)))),
    )
}

fn adjacent(a: &Token, b: &Token) -> bool {
    matches!(
        (&a.kind, &b.kind),
        (TokenKind::Text { .. }, TokenKind::Text { .. })
    ) && a.source.same_buffer(&b.source)
        && a.source.end() == b.source.start()
}

fn merged(token: &TokenRef) -> Option<TokenRef> {
    let children = token.children();
    if !children.windows(2).any(|w| adjacent(&w[0], &w[1])) {
        return None;
    }
    let mut out: Vec<TokenRef> = Vec::with_capacity(children.len());
    for child in children {
        match out.last_mut() {
            Some(last) if adjacent(last, child) => {
                let content = format!("{}{}", last.plain_text(), child.plain_text());
                *last = Token::new(
                    RuleId::InlineText,
                    last.flags,
                    last.source.join(&child.source),
                    TokenKind::Text { content },
                );
            }
            _ => out.push(Arc::clone(child)),
        }
    }
    Some(token.with_children(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::context::ParseOptions;
    use crate::parsing::parse;
    use crate::rewriting::engine::RewriteEngine;
    use pretty_assertions::assert_eq;

    fn rewrite(text: &str) -> TokenRef {
        let doc = parse(text, &ParseOptions::default()).unwrap();
        RewriteEngine::for_document(&doc)
            .rewrite(&doc.root, &merge_text())
            .unwrap()
    }

    #[test]
    fn split_text_runs_are_joined() {
        let root = rewrite("snake_case_name and [nope]\n");
        let paragraph = &root.children()[0];
        assert_eq!(paragraph.children().len(), 1);
        let text = &paragraph.children()[0];
        assert_eq!(
            text.kind,
            TokenKind::Text {
                content: "snake_case_name and [nope]".into()
            }
        );
        assert_eq!(text.source.markdown(), "snake_case_name and [nope]");
    }

    #[test]
    fn text_around_other_tokens_is_kept_apart() {
        let root = rewrite("a *b* c\n");
        let tags: Vec<_> = root.children()[0].children().iter().map(|t| t.tag()).collect();
        assert_eq!(tags, vec![TokenTag::Text, TokenTag::Em, TokenTag::Text]);
    }

    #[test]
    fn nested_containers_are_merged() {
        let root = rewrite("**x_y_z**\n");
        let strong = &root.children()[0].children()[0];
        assert_eq!(strong.children().len(), 1);
        assert_eq!(strong.plain_text(), "x_y_z");
    }
}
