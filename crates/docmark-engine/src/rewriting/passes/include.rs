use std::sync::Arc;

use crate::collaborators::{IncludeResolver, include_target};
use crate::error::Result;
use crate::parsing::parser::EngineKind;
use crate::parsing::token::{Include, IncludeState, TokenKind, TokenRef, TokenTag};
use crate::rewriting::engine::RewriteEngine;
use crate::rewriting::rewriter::Rewriter;

#[derive(Clone, Copy)]
enum Placement {
    Block,
    Inline,
}

fn expand(
    engine: &RewriteEngine,
    token: &TokenRef,
    resolver: &dyn IncludeResolver,
    placement: Placement,
) -> Result<Option<TokenRef>> {
    let (TokenKind::IncludeBlock(include) | TokenKind::IncludeInline(include)) = &token.kind
    else {
        return Ok(None);
    };
    if include.state != IncludeState::Unexpanded {
        return Ok(None);
    }

    let expanded = match resolver.resolve(&include.path, &token.source) {
        Ok(text) => {
            let target = include_target(&token.source, &include.path);
            let file = Some(target.as_str());
            let children = match placement {
                Placement::Block => engine.parse_blocks(&text, file)?,
                Placement::Inline => engine.parse_inline(&text, file)?,
            };
            log::debug!("{}: included {target}", token.source);
            Include {
                state: IncludeState::Expanded,
                children,
                ..include.clone()
            }
        }
        Err(err) => {
            log::warn!("{}: {err}", token.source);
            Include {
                state: IncludeState::Failed(err.to_string()),
                ..include.clone()
            }
        }
    };
    let kind = match placement {
        Placement::Block => TokenKind::IncludeBlock(expanded),
        Placement::Inline => TokenKind::IncludeInline(expanded),
    };
    Ok(Some(token.with_kind(kind)))
}

/// Replaces the content of include directives with the parsed text of the
/// included file. A resolver failure is kept on the token as `Failed`.
///
/// Included content is visited by later passes like any other subtree, so
/// nested includes expand one level per pass.
pub fn expand_includes(resolver: Arc<dyn IncludeResolver>) -> Rewriter {
    let inline_resolver = Arc::clone(&resolver);
    Rewriter::composite([
        Rewriter::lambda("expand_include_block", TokenTag::IncludeBlock, move |engine, token| {
            expand(engine, token, resolver.as_ref(), Placement::Block)
        })
        .for_engine(EngineKind::Dfm),
        Rewriter::lambda("expand_include_inline", TokenTag::IncludeInline, move |engine, token| {
            expand(engine, token, inline_resolver.as_ref(), Placement::Inline)
        })
        .for_engine(EngineKind::Dfm),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::MapIncludeResolver;
    use crate::error::EngineError;
    use crate::parsing::context::ParseOptions;
    use crate::parsing::parse;
    use crate::parsing::snapshot::dump;
    use pretty_assertions::assert_eq;

    fn rewrite_with(text: &str, resolver: MapIncludeResolver) -> Result<TokenRef> {
        let doc = parse(text, &ParseOptions::default()).unwrap();
        RewriteEngine::for_document(&doc).rewrite(&doc.root, &expand_includes(Arc::new(resolver)))
    }

    #[test]
    fn block_include_is_parsed_as_blocks() {
        let files = MapIncludeResolver::new().with("shared/intro.md", "## Intro\n\nHello.\n");
        let root = rewrite_with("[!include[intro](shared/intro.md)]\n", files).unwrap();
        let expected = "\
Document
  IncludeBlock path=\"shared/intro.md\" expanded
    Heading level=2 id=\"intro\"
      Text \"Intro\"
    Paragraph
      Text \"Hello.\"
";
        assert_eq!(dump(&root), expected);
        let heading = &root.children()[0].children()[0];
        assert_eq!(heading.source.file(), Some("shared/intro.md"));
    }

    #[test]
    fn inline_include_is_parsed_as_inline() {
        let files = MapIncludeResolver::new().with("v.md", "*1.0*\n");
        let root = rewrite_with("Version [!include[v](v.md)] is out.\n", files).unwrap();
        let include = &root.children()[0].children()[1];
        assert_eq!(include.tag(), TokenTag::IncludeInline);
        assert_eq!(include.children()[0].tag(), TokenTag::Em);
        assert_eq!(root.children()[0].plain_text(), "Version 1.0 is out.");
    }

    #[test]
    fn missing_file_is_folded_into_the_tree() {
        let root = rewrite_with("[!include[x](nope.md)]\n", MapIncludeResolver::new()).unwrap();
        let TokenKind::IncludeBlock(include) = &root.children()[0].kind else {
            panic!("expected include block");
        };
        assert_eq!(
            include.state,
            IncludeState::Failed("included file not found: nope.md".into())
        );
    }

    #[test]
    fn nested_includes_expand_on_later_passes() {
        let files = MapIncludeResolver::new()
            .with("a.md", "[!include[b](b.md)]\n")
            .with("b.md", "deep\n");
        let root = rewrite_with("[!include[a](a.md)]\n", files).unwrap();
        assert_eq!(root.plain_text(), "deep");
    }

    #[test]
    fn nested_paths_are_relative_to_the_including_file() {
        let files = MapIncludeResolver::new()
            .with("docs/a.md", "[!include[b](parts/b.md)]\n")
            .with("docs/parts/b.md", "[!include[c](../c.md)]\n")
            .with("docs/c.md", "bottom\n");
        let root = rewrite_with("[!include[a](docs/a.md)]\n", files).unwrap();
        assert_eq!(root.plain_text(), "bottom");

        let mut token = root.clone();
        while !token.children().is_empty() {
            token = token.children()[0].clone();
        }
        assert_eq!(token.source.file(), Some("docs/c.md"));
    }

    #[test]
    fn include_cycles_hit_the_pass_limit() {
        let files = MapIncludeResolver::new().with("self.md", "[!include[me](self.md)]\n");
        let err = rewrite_with("[!include[me](self.md)]\n", files).unwrap_err();
        assert!(matches!(err, EngineError::TooManyLoops { .. }));
    }
}
