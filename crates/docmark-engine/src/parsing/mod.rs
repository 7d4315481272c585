//! # Parsing
//!
//! Text goes through three steps:
//!
//! 1. [`preprocess`] normalizes line endings, tabs and blank lines.
//! 2. The block pass ([`parser::BlockParser`]) splits the text into block
//!    tokens and fills the [`MarkdownContext`] with link definitions. Inline
//!    content is left as [`token::TokenKind::Pending`].
//! 3. The second pass ([`two_phase`]) tokenizes the pending inline content
//!    with the finished context.
//!
//! The result is an immutable tree of [`token::TokenRef`] rooted at a
//! `Document` token.

pub mod context;
pub mod cursor;
pub mod matcher;
pub mod parser;
pub mod rules;
pub mod snapshot;
pub mod source;
pub mod token;
pub mod two_phase;

use std::sync::Arc;

use crate::error::Result;

use context::{MarkdownContext, ParseFlags, ParseOptions};
use parser::{BlockParser, EngineKind, Grammar, InlineParser};
use rules::RuleId;
use source::SourceInfo;
use token::{Token, TokenKind, TokenRef};

/// A parsed document: the token tree plus the context it was parsed with.
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub root: TokenRef,
    pub context: MarkdownContext,
    pub kind: EngineKind,
}

/// Normalizes raw Markdown before tokenizing.
///
/// `\r\n` and `\r` become `\n`, tabs become four spaces, non-breaking spaces
/// become plain spaces, `\u{2424}` (symbol for newline) becomes `\n`, and
/// lines holding only spaces become empty.
pub fn preprocess(text: &str) -> String {
    let text = text
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\t', "    ")
        .replace('\u{00a0}', " ")
        .replace('\u{2424}', "\n");
    let mut out = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        let body = line.strip_suffix('\n').unwrap_or(line);
        if body.is_empty() || body.bytes().any(|b| b != b' ') {
            out.push_str(line);
        } else if line.ends_with('\n') {
            out.push('\n');
        }
    }
    out
}

/// Parses a Markdown document that has no file name.
pub fn parse(text: &str, options: &ParseOptions) -> Result<ParsedDocument> {
    parse_file(text, None, options)
}

/// Parses a Markdown document; `file` shows up in every [`SourceInfo`].
pub fn parse_file(
    text: &str,
    file: Option<&str>,
    options: &ParseOptions,
) -> Result<ParsedDocument> {
    let grammar = Grammar::for_options(options);
    log::debug!(
        "parsing {} with the {:?} grammar",
        file.unwrap_or("<input>"),
        grammar.kind
    );
    let source = SourceInfo::document(preprocess(text), file.map(Arc::from));

    let mut parser = BlockParser::new(grammar, MarkdownContext::new(options.clone()));
    let children = parser.tokenize(&source)?;
    let context = parser.into_context();
    let root = Token::new(
        RuleId::Document,
        ParseFlags::default(),
        source,
        TokenKind::Document { children },
    );
    let root = two_phase::resolve(&root, grammar, &context)?;
    Ok(ParsedDocument {
        root,
        context,
        kind: grammar.kind,
    })
}

/// Tokenizes `text` as inline content only, with the links of `context`.
pub fn parse_inline(
    text: &str,
    file: Option<&str>,
    context: &MarkdownContext,
) -> Result<Vec<TokenRef>> {
    let grammar = Grammar::for_options(&context.options);
    let text = preprocess(text);
    let source = SourceInfo::document(text.trim_end_matches('\n'), file.map(Arc::from));
    InlineParser::new(grammar, context, ParseFlags::default()).tokenize(&source)
}
