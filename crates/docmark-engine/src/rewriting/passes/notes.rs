//! Turns blockquotes carrying `[!NOTE]`-style markers into note tokens.

use std::sync::Arc;

use crate::parsing::parser::EngineKind;
use crate::parsing::rules::RuleId;
use crate::parsing::token::{Token, TokenKind, TokenRef, TokenTag};
use crate::rewriting::rewriter::Rewriter;

/// Splits a blockquote at its note markers.
///
/// Blocks before the first marker stay in a blockquote; each marker starts a
/// `Note` holding the blocks up to the next marker. A quote that starts with
/// its only marker becomes a single `Note`, anything else a `BlockSplit`.
pub fn note_blocks() -> Rewriter {
    Rewriter::lambda("note_blocks", TokenTag::Blockquote, |_, quote| {
        let children = quote.children();
        let Some(first_marker) = children.iter().position(|c| c.tag() == TokenTag::NoteMarker)
        else {
            return Ok(None);
        };

        let mut parts = Vec::new();
        if first_marker > 0 {
            parts.push(quote.with_children(children[..first_marker].to_vec()));
        }
        let mut rest = &children[first_marker..];
        while let Some((marker, after)) = rest.split_first() {
            let TokenKind::NoteMarker { kind } = &marker.kind else {
                break;
            };
            let len = after
                .iter()
                .position(|c| c.tag() == TokenTag::NoteMarker)
                .unwrap_or(after.len());
            let body = after[..len].to_vec();
            let source = match body.last() {
                Some(last) => marker.source.join(&last.source),
                None => marker.source.clone(),
            };
            parts.push(Token::new(
                RuleId::NoteMarker,
                quote.flags,
                source,
                TokenKind::Note {
                    kind: kind.clone(),
                    children: body,
                },
            ));
            rest = &after[len..];
        }

        if parts.len() == 1 && first_marker == 0 {
            let note = &parts[0];
            return Ok(Some(Token::new(
                note.rule,
                note.flags,
                quote.source.clone(),
                note.kind.clone(),
            )));
        }
        Ok(Some(quote.with_kind(TokenKind::BlockSplit { children: parts })))
    })
    .for_engine(EngineKind::Dfm)
}

/// Lifts the children of a `BlockSplit` nested directly in another one.
pub fn flatten_block_split() -> Rewriter {
    Rewriter::lambda("flatten_block_split", TokenTag::BlockSplit, |_, split| {
        let children = split.children();
        if !children.iter().any(|c| c.tag() == TokenTag::BlockSplit) {
            return Ok(None);
        }
        let mut flat = Vec::with_capacity(children.len());
        for child in children {
            if child.tag() == TokenTag::BlockSplit {
                flat.extend(child.children().iter().map(Arc::clone));
            } else {
                flat.push(Arc::clone(child));
            }
        }
        Ok(Some(split.with_children(flat)))
    })
}

/// Both note rewrites, repeated until the token settles.
pub fn notes(max_loop_count: usize) -> Rewriter {
    Rewriter::composite([note_blocks(), flatten_block_split()]).looped(max_loop_count)
}

/// A note's kind, if `token` is one.
pub fn note_kind(token: &TokenRef) -> Option<&str> {
    match &token.kind {
        TokenKind::Note { kind, .. } => Some(kind),
        _ => None,
    }
}
