//! Inline rules, in grammar order.

mod basic;
mod link;
mod xref;

pub(crate) use basic::{BrRule, CodeSpanRule, DelRule, EmRule, EscapeRule, StrongRule, TextRule};
pub(crate) use link::{AutoLinkRule, LinkRule, NoLinkRule, RefLinkRule, TagRule, UrlRule};
pub(crate) use xref::{IncludeInlineRule, XrefAutoLinkRule, XrefShortcutRule, split_uid};

use crate::parsing::parser::EngineKind;

use super::InlineRule;

pub fn rules(kind: EngineKind) -> Vec<Box<dyn InlineRule>> {
    let dfm = kind == EngineKind::Dfm;
    let mut rules: Vec<Box<dyn InlineRule>> = vec![Box::new(EscapeRule::new())];
    if dfm {
        rules.push(Box::new(IncludeInlineRule::new()));
        rules.push(Box::new(XrefAutoLinkRule::new()));
        rules.push(Box::new(XrefShortcutRule::new()));
    }
    rules.push(Box::new(AutoLinkRule::new()));
    rules.push(Box::new(UrlRule::new()));
    rules.push(Box::new(TagRule::new()));
    rules.push(Box::new(LinkRule::new()));
    rules.push(Box::new(RefLinkRule::new()));
    rules.push(Box::new(NoLinkRule::new()));
    rules.push(Box::new(StrongRule::new()));
    rules.push(Box::new(EmRule::new()));
    rules.push(Box::new(CodeSpanRule::new()));
    rules.push(Box::new(BrRule::new()));
    rules.push(Box::new(DelRule::new()));
    rules.push(Box::new(TextRule::new(kind)));
    rules
}

#[cfg(test)]
pub(crate) fn tokenize_with(
    text: &str,
    kind: EngineKind,
    context: &crate::parsing::context::MarkdownContext,
) -> Vec<crate::parsing::token::TokenRef> {
    use crate::parsing::context::ParseFlags;
    use crate::parsing::parser::{Grammar, InlineParser};
    use crate::parsing::source::SourceInfo;

    InlineParser::new(Grammar::get(kind), context, ParseFlags::default())
        .tokenize(&SourceInfo::document(text, None))
        .unwrap()
}
