//! # Block and Inline Dispatch
//!
//! A [`Grammar`] is an ordered list of block rules and inline rules. The two
//! grammars ([`EngineKind::Markdown`] and [`EngineKind::Dfm`]) are built once
//! per process and shared by every parse.
//!
//! Dispatch tries each rule at the cursor in grammar order. The first rule
//! that returns a token wins; a rule that claims a match without consuming
//! anything is a grammar bug and fails the parse with
//! [`EngineError::ZeroLengthMatch`] instead of looping forever.

use once_cell::sync::Lazy;

use crate::error::{EngineError, Result};

use super::context::{MarkdownContext, ParseFlags, ParseOptions};
use super::cursor::Cursor;
use super::rules::{BlockRule, InlineRule, RuleId, blocks, inline};
use super::source::SourceInfo;
use super::token::{Token, TokenKind, TokenRef};

/// Which rule set a grammar carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineKind {
    /// Plain Markdown with the GitHub additions.
    Markdown,
    /// Markdown plus the documentation extensions.
    Dfm,
}

pub struct Grammar {
    pub kind: EngineKind,
    pub block: Vec<Box<dyn BlockRule>>,
    pub inline: Vec<Box<dyn InlineRule>>,
}

static MARKDOWN: Lazy<Grammar> = Lazy::new(|| Grammar::build(EngineKind::Markdown));
static DFM: Lazy<Grammar> = Lazy::new(|| Grammar::build(EngineKind::Dfm));

impl Grammar {
    fn build(kind: EngineKind) -> Self {
        Self {
            kind,
            block: blocks::rules(kind),
            inline: inline::rules(kind),
        }
    }

    pub fn get(kind: EngineKind) -> &'static Grammar {
        match kind {
            EngineKind::Markdown => &MARKDOWN,
            EngineKind::Dfm => &DFM,
        }
    }

    pub fn for_options(options: &ParseOptions) -> &'static Grammar {
        Self::get(if options.extensions {
            EngineKind::Dfm
        } else {
            EngineKind::Markdown
        })
    }

    pub fn block_rule_ids(&self) -> impl Iterator<Item = RuleId> + '_ {
        self.block.iter().map(|r| r.id())
    }

    pub fn inline_rule_ids(&self) -> impl Iterator<Item = RuleId> + '_ {
        self.inline.iter().map(|r| r.id())
    }
}

/// Block-level tokenizer.
///
/// Owns the document's [`MarkdownContext`] for the duration of the block
/// pass, so rules can record link definitions as they go.
pub struct BlockParser<'g> {
    grammar: &'g Grammar,
    context: MarkdownContext,
    flags: ParseFlags,
}

impl<'g> BlockParser<'g> {
    pub fn new(grammar: &'g Grammar, context: MarkdownContext) -> Self {
        Self {
            grammar,
            context,
            flags: ParseFlags::default(),
        }
    }

    pub fn grammar(&self) -> &'g Grammar {
        self.grammar
    }

    pub fn options(&self) -> &ParseOptions {
        &self.context.options
    }

    pub fn context(&self) -> &MarkdownContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut MarkdownContext {
        &mut self.context
    }

    pub fn into_context(self) -> MarkdownContext {
        self.context
    }

    /// Flags of the block being tokenized.
    pub fn flags(&self) -> ParseFlags {
        self.flags
    }

    /// Builds a token carrying the current flags.
    pub fn token(&self, rule: RuleId, source: SourceInfo, kind: TokenKind) -> TokenRef {
        Token::new(rule, self.flags, source, kind)
    }

    /// Tokenizes `source` into a sequence of block tokens.
    pub fn tokenize(&mut self, source: &SourceInfo) -> Result<Vec<TokenRef>> {
        let mut cursor = Cursor::new(source);
        let mut tokens = Vec::new();
        while !cursor.eof() {
            tokens.push(self.dispatch(&mut cursor)?);
        }
        Ok(tokens)
    }

    /// Tokenizes nested block content (quote, list item, tab content) under
    /// `flags`, sharing this parser's context.
    pub fn tokenize_nested(
        &mut self,
        source: &SourceInfo,
        flags: ParseFlags,
    ) -> Result<Vec<TokenRef>> {
        let saved = std::mem::replace(&mut self.flags, flags);
        let result = self.tokenize(source);
        self.flags = saved;
        result
    }

    fn dispatch(&mut self, cursor: &mut Cursor<'_>) -> Result<TokenRef> {
        let grammar = self.grammar;
        for rule in &grammar.block {
            let snapshot = cursor.clone();
            match rule.try_match(self, cursor)? {
                Some(token) => {
                    if cursor.pos() == snapshot.pos() {
                        return Err(EngineError::ZeroLengthMatch {
                            rule: rule.id(),
                            location: cursor.peek_span(0),
                        });
                    }
                    log::trace!("{}: block {:?}", token.source, rule.id());
                    return Ok(token);
                }
                None => *cursor = snapshot,
            }
        }
        Ok(fallback_line(cursor, self.flags))
    }
}

/// Inline tokenizer. Reads the context the block pass filled in.
#[derive(Clone, Copy)]
pub struct InlineParser<'p> {
    grammar: &'p Grammar,
    context: &'p MarkdownContext,
    flags: ParseFlags,
}

impl<'p> InlineParser<'p> {
    pub fn new(grammar: &'p Grammar, context: &'p MarkdownContext, flags: ParseFlags) -> Self {
        Self {
            grammar,
            context,
            flags: ParseFlags {
                inline: true,
                ..flags
            },
        }
    }

    pub fn grammar(&self) -> &'p Grammar {
        self.grammar
    }

    pub fn context(&self) -> &'p MarkdownContext {
        self.context
    }

    pub fn options(&self) -> &'p ParseOptions {
        &self.context.options
    }

    pub fn flags(&self) -> ParseFlags {
        self.flags
    }

    /// A parser for link text, where links and urls are not recognized.
    pub fn in_link(&self) -> Self {
        Self {
            flags: ParseFlags {
                in_link: true,
                ..self.flags
            },
            ..*self
        }
    }

    pub fn token(&self, rule: RuleId, source: SourceInfo, kind: TokenKind) -> TokenRef {
        Token::new(rule, self.flags, source, kind)
    }

    pub fn tokenize(&self, source: &SourceInfo) -> Result<Vec<TokenRef>> {
        let mut cursor = Cursor::new(source);
        let mut tokens = Vec::new();
        while !cursor.eof() {
            tokens.push(self.dispatch(&mut cursor)?);
        }
        Ok(tokens)
    }

    fn dispatch(&self, cursor: &mut Cursor<'_>) -> Result<TokenRef> {
        for rule in &self.grammar.inline {
            let snapshot = cursor.clone();
            match rule.try_match(self, cursor)? {
                Some(token) => {
                    if cursor.pos() == snapshot.pos() {
                        return Err(EngineError::ZeroLengthMatch {
                            rule: rule.id(),
                            location: cursor.peek_span(0),
                        });
                    }
                    return Ok(token);
                }
                None => *cursor = snapshot,
            }
        }
        let ch_len = cursor.peek().map_or(1, char::len_utf8);
        let span = cursor.consume(ch_len);
        Ok(self.token(
            RuleId::InlineText,
            span.clone(),
            TokenKind::Text {
                content: span.markdown().to_string(),
            },
        ))
    }
}

/// Consumes one line as text when no block rule matched.
fn fallback_line(cursor: &mut Cursor<'_>, flags: ParseFlags) -> TokenRef {
    let rest = cursor.rest();
    let len = rest.find('\n').map_or(rest.len(), |i| i + 1);
    let span = cursor.consume(len);
    let content = span.markdown().trim_end_matches('\n').to_string();
    Token::new(RuleId::Text, flags, span, TokenKind::Text { content })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn grammars_are_shared() {
        let opts = ParseOptions::default();
        assert!(std::ptr::eq(
            Grammar::for_options(&opts),
            Grammar::get(EngineKind::Dfm)
        ));
        let plain = ParseOptions {
            extensions: false,
            ..ParseOptions::default()
        };
        assert_eq!(Grammar::for_options(&plain).kind, EngineKind::Markdown);
    }

    #[test]
    fn markdown_grammar_has_no_extension_rules() {
        let grammar = Grammar::get(EngineKind::Markdown);
        let ids: Vec<_> = grammar.block_rule_ids().collect();
        assert!(!ids.contains(&RuleId::TabGroup));
        assert!(!ids.contains(&RuleId::NoteMarker));
        assert!(!grammar.inline_rule_ids().any(|id| id == RuleId::XrefShortcut));
    }

    #[test]
    fn block_rule_order() {
        let ids: Vec<_> = Grammar::get(EngineKind::Dfm).block_rule_ids().collect();
        assert_eq!(
            ids,
            vec![
                RuleId::YamlHeader,
                RuleId::NewLine,
                RuleId::Code,
                RuleId::Fences,
                RuleId::CodeSnippet,
                RuleId::TabGroup,
                RuleId::Heading,
                RuleId::NpTable,
                RuleId::Hr,
                RuleId::IncludeBlock,
                RuleId::NoteMarker,
                RuleId::Blockquote,
                RuleId::List,
                RuleId::Html,
                RuleId::Def,
                RuleId::Table,
                RuleId::LHeading,
                RuleId::Paragraph,
                RuleId::Text,
            ]
        );
    }

    #[test]
    fn tokenize_empty_source_yields_nothing() {
        let grammar = Grammar::get(EngineKind::Markdown);
        let mut parser = BlockParser::new(grammar, MarkdownContext::default());
        let src = SourceInfo::document("", None);
        assert!(parser.tokenize(&src).unwrap().is_empty());
    }

    #[test]
    fn nested_flags_are_restored() {
        let grammar = Grammar::get(EngineKind::Markdown);
        let mut parser = BlockParser::new(grammar, MarkdownContext::default());
        let src = SourceInfo::document("text\n", None);
        let nested = ParseFlags {
            nested: true,
            ..ParseFlags::default()
        };
        let tokens = parser.tokenize_nested(&src, nested).unwrap();
        assert!(tokens[0].flags.nested);
        assert_eq!(parser.flags(), ParseFlags::default());
    }

    #[test]
    fn inline_parser_marks_tokens_inline() {
        let grammar = Grammar::get(EngineKind::Markdown);
        let ctx = MarkdownContext::default();
        let parser = InlineParser::new(grammar, &ctx, ParseFlags::default());
        let src = SourceInfo::document("plain", None);
        let tokens = parser.tokenize(&src).unwrap();
        assert_eq!(tokens.len(), 1);
        assert!(tokens[0].flags.inline);
        assert!(parser.in_link().flags().in_link);
    }
}
