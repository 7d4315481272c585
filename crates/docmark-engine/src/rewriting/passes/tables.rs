use crate::error::EngineError;
use crate::parsing::token::{TokenKind, TokenTag};
use crate::rewriting::rewriter::Rewriter;

/// Fails when a table's header row and alignment row differ in width.
///
/// Body rows are already padded or truncated to the header width when the
/// table is parsed; a header that does not line up with its alignment row
/// cannot be repaired.
pub fn validate_tables() -> Rewriter {
    Rewriter::lambda("validate_tables", TokenTag::Table, |_, table| {
        let TokenKind::Table { align, children } = &table.kind else {
            return Ok(None);
        };
        let header = children.first().map_or(0, |row| row.children().len());
        if header != align.len() {
            return Err(EngineError::TableShapeMismatch {
                header,
                align: align.len(),
                location: table.source.clone(),
            });
        }
        Ok(None)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::context::ParseOptions;
    use crate::parsing::parse;
    use crate::rewriting::engine::RewriteEngine;
    use std::sync::Arc;

    #[test]
    fn well_formed_table_passes_unchanged() {
        let doc = parse("| a | b |\n|---|:-:|\n| 1 |\n", &ParseOptions::default()).unwrap();
        let root = RewriteEngine::for_document(&doc)
            .rewrite(&doc.root, &validate_tables())
            .unwrap();
        assert!(Arc::ptr_eq(&root, &doc.root));
    }

    #[test]
    fn header_alignment_mismatch_is_fatal() {
        let doc = parse("| a | b | c |\n|---|---|\n| 1 | 2 |\n", &ParseOptions::default()).unwrap();
        let err = RewriteEngine::for_document(&doc)
            .rewrite(&doc.root, &validate_tables())
            .unwrap_err();
        match err {
            EngineError::TableShapeMismatch {
                header,
                align,
                location,
            } => {
                assert_eq!((header, align), (3, 2));
                assert_eq!((location.line, location.column), (1, 1));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
