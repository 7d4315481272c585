//! Rule-based Markdown tokenizer and rewriter for documentation builds.
//!
//! [`parse`] turns Markdown (plain or with the documentation extensions:
//! notes, tabs, cross references, includes, code snippets, YAML headers) into
//! an immutable token tree. [`Pipeline`] then runs the rewriters that resolve
//! the extensions, calling out to the [`collaborators`] for anything outside
//! the document.

pub mod collaborators;
pub mod error;
pub mod parsing;
pub mod rewriting;

pub use collaborators::{
    ActiveTabs, IncludeError, IncludeResolver, MapIncludeResolver, MapXrefResolver, TabConditions,
    XrefResolver, XrefSpec, include_target,
};
pub use error::{EngineError, Result};
pub use parsing::context::{MarkdownContext, ParseFlags, ParseOptions};
pub use parsing::parser::EngineKind;
pub use parsing::rules::RuleId;
pub use parsing::source::SourceInfo;
pub use parsing::token::{Token, TokenKind, TokenRef, TokenTag};
pub use parsing::{ParsedDocument, parse, parse_file, parse_inline, preprocess};
pub use rewriting::{Pipeline, RewriteEngine, Rewriter};
