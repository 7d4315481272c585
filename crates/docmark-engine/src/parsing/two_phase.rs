//! Second parsing pass.
//!
//! The block pass leaves inline content as [`TokenKind::Pending`] tokens
//! because link definitions may appear after their first use. Once the block
//! pass is done and the [`MarkdownContext`] holds every definition, this pass
//! walks the tree and replaces each pending token with the final token of
//! its rule. Subtrees without pending tokens are kept as the same `Arc`.

use std::sync::Arc;

use crate::error::Result;

use super::context::MarkdownContext;
use super::parser::{Grammar, InlineParser};
use super::source::SourceInfo;
use super::token::{Align, PendingInline, PendingShape, Token, TokenKind, TokenRef};

/// Resolves every pending token below `root`.
pub fn resolve(root: &TokenRef, grammar: &Grammar, context: &MarkdownContext) -> Result<TokenRef> {
    Ok(resolve_token(root, grammar, context)?.unwrap_or_else(|| Arc::clone(root)))
}

/// `None` when nothing below `token` was pending.
fn resolve_token(
    token: &TokenRef,
    grammar: &Grammar,
    context: &MarkdownContext,
) -> Result<Option<TokenRef>> {
    if let TokenKind::Pending(pending) = &token.kind {
        let inline = InlineParser::new(grammar, context, token.flags);
        return complete(token, pending, &inline).map(Some);
    }

    let children = token.children();
    let mut rebuilt: Option<Vec<TokenRef>> = None;
    for (i, child) in children.iter().enumerate() {
        if let Some(resolved) = resolve_token(child, grammar, context)? {
            rebuilt
                .get_or_insert_with(|| children[..i].to_vec())
                .push(resolved);
        } else if let Some(rebuilt) = rebuilt.as_mut() {
            rebuilt.push(Arc::clone(child));
        }
    }
    Ok(rebuilt.map(|children| token.with_children(children)))
}

fn complete(
    token: &Token,
    pending: &PendingInline,
    inline: &InlineParser<'_>,
) -> Result<TokenRef> {
    let first_span = || {
        pending
            .spans
            .first()
            .cloned()
            .unwrap_or_else(|| token.source.slice(0, 0))
    };
    let kind = match &pending.shape {
        PendingShape::Paragraph => TokenKind::Paragraph {
            children: inline.tokenize(&first_span())?,
        },
        PendingShape::Heading { level, id } => TokenKind::Heading {
            level: *level,
            id: id.clone(),
            children: inline.tokenize(&first_span())?,
        },
        PendingShape::TabTitle => TokenKind::TabTitle {
            children: inline.tokenize(&first_span())?,
        },
        PendingShape::Table { align, widths } => {
            table(token, align, widths, &pending.spans, inline)?
        }
    };
    Ok(token.with_kind(kind))
}

/// Builds header and body rows. Body rows are padded with empty cells at the
/// end of the row or truncated so that every row is as wide as the header.
fn table(
    token: &Token,
    align: &[Align],
    widths: &[usize],
    spans: &[SourceInfo],
    inline: &InlineParser<'_>,
) -> Result<TokenKind> {
    let header_width = widths.first().copied().unwrap_or_default();
    let mut rows = Vec::with_capacity(widths.len());
    let mut next = 0;
    for (row_index, &width) in widths.iter().enumerate() {
        let cells = &spans[next.min(spans.len())..(next + width).min(spans.len())];
        next += width;
        let header = row_index == 0;
        if !header && width != header_width {
            log::debug!(
                "{}: table row {row_index} has {width} cells, header has {header_width}",
                token.source
            );
        }
        let kept = if header { cells } else { &cells[..width.min(header_width)] };
        let mut row_cells = Vec::with_capacity(header_width.max(kept.len()));
        for span in kept {
            row_cells.push(cell(token, span.clone(), inline)?);
        }
        let row_end = match kept.last() {
            Some(last) => last.slice(last.len(), 0),
            None => token.source.slice(0, 0),
        };
        if !header {
            while row_cells.len() < header_width {
                row_cells.push(cell(token, row_end.clone(), inline)?);
            }
        }
        let row_source = match (kept.first(), kept.last()) {
            (Some(first), Some(last)) => first.join(last),
            _ => row_end,
        };
        rows.push(Token::new(
            token.rule,
            token.flags,
            row_source,
            TokenKind::TableRow {
                header,
                children: row_cells,
            },
        ));
    }
    Ok(TokenKind::Table {
        align: align.to_vec(),
        children: rows,
    })
}

fn cell(token: &Token, span: SourceInfo, inline: &InlineParser<'_>) -> Result<TokenRef> {
    let children = inline.tokenize(&span)?;
    Ok(Token::new(
        token.rule,
        token.flags,
        span,
        TokenKind::TableCell { children },
    ))
}

/// True when no pending token is left below `token`.
pub fn is_resolved(token: &Token) -> bool {
    !matches!(token.kind, TokenKind::Pending(_))
        && token.children().iter().all(|c| is_resolved(c))
}
