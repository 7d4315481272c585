use std::sync::Arc;

use crate::error::{EngineError, Result};
use crate::parsing::context::{MarkdownContext, ParseOptions};
use crate::parsing::parser::EngineKind;
use crate::parsing::token::TokenRef;
use crate::parsing::{self, ParsedDocument};

use super::rewriter::Rewriter;

/// Walks token trees and applies rewriters.
///
/// The engine also carries what rewriters need to produce new content: the
/// grammar kind and the parse options, so that an include expansion parses
/// its file the same way the including document was parsed.
#[derive(Debug, Clone)]
pub struct RewriteEngine {
    kind: EngineKind,
    options: ParseOptions,
}

impl RewriteEngine {
    pub fn new(kind: EngineKind, options: ParseOptions) -> Self {
        Self { kind, options }
    }

    pub fn for_document(doc: &ParsedDocument) -> Self {
        Self::new(doc.kind, doc.context.options.clone())
    }

    pub fn kind(&self) -> EngineKind {
        self.kind
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Rewrites `root` until a whole pass changes nothing.
    ///
    /// Returns the same `Arc` when nothing changed at all. More than
    /// `max_loop_count` changing passes is a fatal [`EngineError::TooManyLoops`].
    pub fn rewrite(&self, root: &TokenRef, rewriter: &Rewriter) -> Result<TokenRef> {
        let max = self.options.max_loop_count;
        let mut current = Arc::clone(root);
        for pass in 0..=max {
            match self.rewrite_once(&current, rewriter)? {
                Some(new) => {
                    log::debug!("{}: rewrite pass {} changed the tree", root.source, pass + 1);
                    current = new;
                }
                None => return Ok(current),
            }
        }
        Err(EngineError::TooManyLoops {
            max,
            location: root.source.clone(),
        })
    }

    /// One pass over the tree. `Ok(None)` when nothing changed.
    ///
    /// The rewriter sees a token before its children. A replacement is kept
    /// as is for this pass; otherwise the children are visited and the token
    /// is rebuilt only if one of them changed.
    pub fn rewrite_once(&self, token: &TokenRef, rewriter: &Rewriter) -> Result<Option<TokenRef>> {
        if let Some(new) = rewriter.rewrite(self, token)? {
            return Ok(Some(new));
        }
        self.rewrite_children(token, rewriter)
    }

    /// Visits the children of `token` only.
    pub fn rewrite_children(
        &self,
        token: &TokenRef,
        rewriter: &Rewriter,
    ) -> Result<Option<TokenRef>> {
        let children = token.children();
        let mut rebuilt: Option<Vec<TokenRef>> = None;
        for (i, child) in children.iter().enumerate() {
            match self.rewrite_once(child, rewriter)? {
                Some(new) => rebuilt
                    .get_or_insert_with(|| children[..i].to_vec())
                    .push(new),
                None => {
                    if let Some(rebuilt) = rebuilt.as_mut() {
                        rebuilt.push(Arc::clone(child));
                    }
                }
            }
        }
        Ok(rebuilt.map(|children| token.with_children(children)))
    }

    /// Parses included block content with this engine's options.
    pub fn parse_blocks(&self, text: &str, file: Option<&str>) -> Result<Vec<TokenRef>> {
        let doc = parsing::parse_file(text, file, &self.options)?;
        Ok(doc.root.children().to_vec())
    }

    /// Parses included inline content with this engine's options.
    pub fn parse_inline(&self, text: &str, file: Option<&str>) -> Result<Vec<TokenRef>> {
        parsing::parse_inline(text, file, &MarkdownContext::new(self.options.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::parse;
    use crate::parsing::token::{TokenKind, TokenTag};
    use pretty_assertions::assert_eq;

    fn shout() -> Rewriter {
        Rewriter::lambda("shout", TokenTag::Text, |_, token| {
            let text = token.plain_text();
            let upper = text.to_uppercase();
            Ok((upper != text).then(|| token.with_kind(TokenKind::Text { content: upper })))
        })
    }

    #[test]
    fn untouched_tree_is_the_same_arc() {
        let doc = parse("# a\n\nb *c*\n", &ParseOptions::default()).unwrap();
        let engine = RewriteEngine::for_document(&doc);
        let same = engine.rewrite(&doc.root, &Rewriter::Null).unwrap();
        assert!(Arc::ptr_eq(&same, &doc.root));
    }

    #[test]
    fn only_changed_paths_are_rebuilt() {
        let doc = parse("# a\n\nb *c*\n", &ParseOptions::default()).unwrap();
        let engine = RewriteEngine::for_document(&doc);
        let only_em = Rewriter::lambda("em", TokenTag::Em, |engine, token| {
            engine.rewrite_children(token, &shout())
        });
        let new = engine.rewrite(&doc.root, &only_em).unwrap();
        assert!(!Arc::ptr_eq(&new, &doc.root));
        assert!(Arc::ptr_eq(&new.children()[0], &doc.root.children()[0]));
        let paragraph = &new.children()[1];
        assert!(Arc::ptr_eq(&paragraph.children()[0], &doc.root.children()[1].children()[0]));
        assert_eq!(paragraph.plain_text(), "b C");
    }

    #[test]
    fn converged_rewrite_is_idempotent() {
        let doc = parse("# a\n\nb *c*\n", &ParseOptions::default()).unwrap();
        let engine = RewriteEngine::for_document(&doc);
        let once = engine.rewrite(&doc.root, &shout()).unwrap();
        assert_eq!(once.plain_text(), "AB C");
        let twice = engine.rewrite(&once, &shout()).unwrap();
        assert!(Arc::ptr_eq(&once, &twice));
    }

    #[test]
    fn passes_are_bounded() {
        let options = ParseOptions {
            max_loop_count: 2,
            ..ParseOptions::default()
        };
        let doc = parse("a\n", &options).unwrap();
        let engine = RewriteEngine::for_document(&doc);
        let always = Rewriter::lambda("always", TokenTag::Text, |_, token| {
            Ok(Some(token.with_kind(token.kind.clone())))
        });
        let err = engine.rewrite(&doc.root, &always).unwrap_err();
        assert!(matches!(err, EngineError::TooManyLoops { max: 2, .. }));
    }
}
