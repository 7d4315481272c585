use std::sync::Arc;

use crate::collaborators::{XrefResolver, XrefSpec};
use crate::error::EngineError;
use crate::parsing::parser::EngineKind;
use crate::parsing::rules::RuleId;
use crate::parsing::token::{Token, TokenKind, TokenRef, TokenTag, Xref, XrefResolution};
use crate::rewriting::rewriter::Rewriter;

/// Value of `key` in a `a=1&b=2` query string.
fn query_param<'q>(query: &'q str, key: &str) -> Option<&'q str> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v)
}

/// Text shown for a resolved reference that has no title content.
///
/// `?text=...` wins, then `?displayProperty=fullName`, then the name, then
/// the uid itself.
fn display_text(xref: &Xref, spec: &XrefSpec) -> String {
    let query = xref.query.as_deref().unwrap_or_default();
    if let Some(text) = query_param(query, "text") {
        return text.to_string();
    }
    let full = query_param(query, "displayProperty")
        .is_some_and(|p| p.eq_ignore_ascii_case("fullName"));
    let preferred = if full { &spec.full_name } else { &spec.name };
    preferred
        .as_ref()
        .or(spec.name.as_ref())
        .cloned()
        .unwrap_or_else(|| xref.uid.clone())
}

/// Resolves cross references through `resolver`.
///
/// An unknown uid on a hard reference (`<xref:...>`, `[..](xref:...)`) is a
/// fatal [`EngineError::UnresolvedXref`]; a soft one (`@uid`) is marked
/// `Missing` and left for the renderer.
pub fn resolve_xrefs(resolver: Arc<dyn XrefResolver>) -> Rewriter {
    Rewriter::lambda("resolve_xrefs", TokenTag::Xref, move |_, token| {
        let TokenKind::Xref(xref) = &token.kind else {
            return Ok(None);
        };
        if xref.resolution != XrefResolution::Unresolved {
            return Ok(None);
        }
        let resolved = match resolver.resolve(&xref.uid) {
            Some(spec) => {
                let mut children = xref.children.clone();
                if children.is_empty() {
                    children.push(display(token, display_text(xref, &spec)));
                }
                Xref {
                    resolution: XrefResolution::Resolved {
                        href: spec.href.clone(),
                        name: spec.name.clone(),
                    },
                    children,
                    ..xref.clone()
                }
            }
            None if xref.throw_if_unresolved => {
                return Err(EngineError::UnresolvedXref {
                    uid: xref.uid.clone(),
                    location: token.source.clone(),
                });
            }
            None => {
                log::warn!("{}: unresolved cross reference '{}'", token.source, xref.uid);
                Xref {
                    resolution: XrefResolution::Missing,
                    ..xref.clone()
                }
            }
        };
        Ok(Some(token.with_kind(TokenKind::Xref(resolved))))
    })
    .for_engine(EngineKind::Dfm)
}

fn display(token: &Token, content: String) -> TokenRef {
    Token::new(
        RuleId::InlineText,
        token.flags,
        token.source.clone(),
        TokenKind::Text { content },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::MapXrefResolver;
    use crate::error::Result;
    use crate::parsing::context::ParseOptions;
    use crate::parsing::parse;
    use crate::rewriting::engine::RewriteEngine;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn resolver() -> Arc<dyn XrefResolver> {
        let mut map =
            MapXrefResolver::new().with("System.String", "/api/System.String.html", "String");
        map.insert(
            "System.Int32",
            XrefSpec {
                href: "/api/System.Int32.html".into(),
                name: Some("Int32".into()),
                full_name: Some("System.Int32".into()),
            },
        );
        Arc::new(map)
    }

    fn rewrite(text: &str) -> Result<TokenRef> {
        let doc = parse(text, &ParseOptions::default()).unwrap();
        RewriteEngine::for_document(&doc).rewrite(&doc.root, &resolve_xrefs(resolver()))
    }

    fn first_xref(root: &TokenRef) -> TokenRef {
        let paragraph = &root.children()[0];
        paragraph
            .children()
            .iter()
            .find(|t| t.tag() == TokenTag::Xref)
            .cloned()
            .unwrap()
    }

    #[rstest]
    #[case("@System.String", "String")]
    #[case("<xref:System.Int32>", "Int32")]
    #[case("<xref:System.Int32?displayProperty=fullName>", "System.Int32")]
    #[case("<xref:System.Int32?text=int>", "int")]
    #[case("[a string](xref:System.String)", "a string")]
    fn resolved_display_text(#[case] text: &str, #[case] shown: &str) {
        let root = rewrite(text).unwrap();
        let xref = first_xref(&root);
        assert_eq!(xref.plain_text(), shown);
        let TokenKind::Xref(xref) = &xref.kind else {
            unreachable!();
        };
        assert!(matches!(xref.resolution, XrefResolution::Resolved { .. }));
    }

    #[test]
    fn soft_reference_is_marked_missing() {
        let root = rewrite("see @Nope.Missing here").unwrap();
        let xref = first_xref(&root);
        let TokenKind::Xref(xref) = &xref.kind else {
            unreachable!();
        };
        assert_eq!(xref.resolution, XrefResolution::Missing);
    }

    #[test]
    fn hard_reference_fails() {
        let err = rewrite("line one\nsee <xref:Nope>\n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "(2,5): unable to resolve cross reference 'Nope'"
        );
    }

    #[test]
    fn resolution_is_stable() {
        let root = rewrite("@System.String\n").unwrap();
        let doc_engine = RewriteEngine::new(EngineKind::Dfm, ParseOptions::default());
        let again = doc_engine
            .rewrite(&root, &resolve_xrefs(resolver()))
            .unwrap();
        assert!(Arc::ptr_eq(&root, &again));
    }
}
