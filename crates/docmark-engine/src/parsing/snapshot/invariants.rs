use crate::parsing::token::{Token, TokenKind};

/// Lists every structural problem found below `root`.
///
/// - a child that shares its parent's buffer must lie inside the parent span
/// - neighbouring children in the same buffer must not overlap and must come
///   in source order
/// - no `Pending` token may be left once parsing has finished
pub fn violations(root: &Token) -> Vec<String> {
    let mut found = Vec::new();
    visit(root, &mut found);
    found
}

fn visit(token: &Token, found: &mut Vec<String>) {
    if let TokenKind::Pending(_) = token.kind {
        found.push(format!("{}: unresolved {:?} token", token.source, token.rule));
    }
    for child in token.children() {
        if token.source.same_buffer(&child.source) && !token.source.contains(&child.source) {
            found.push(format!(
                "{}: {:?} [{}..{}] is outside its parent {:?} [{}..{}]",
                child.source,
                child.tag(),
                child.source.start(),
                child.source.end(),
                token.tag(),
                token.source.start(),
                token.source.end(),
            ));
        }
        visit(child, found);
    }
    for pair in token.children().windows(2) {
        let (prev, next) = (&pair[0].source, &pair[1].source);
        if prev.same_buffer(next) && prev.end() > next.start() {
            found.push(format!(
                "{next}: {:?} [{}..{}] starts before the end of its previous sibling {:?} [{}..{}]",
                pair[1].tag(),
                next.start(),
                next.end(),
                pair[0].tag(),
                prev.start(),
                prev.end(),
            ));
        }
    }
}

/// Validates parser output invariants.
///
/// # Panics
/// Panics with every violation found if the tree is not well formed.
pub fn check(root: &Token) {
    let found = violations(root);
    assert!(found.is_empty(), "token tree invariants violated:\n{}", found.join("\n"));
}
