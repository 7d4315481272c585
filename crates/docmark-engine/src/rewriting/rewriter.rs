use std::fmt;
use std::sync::Arc;

use crate::error::{EngineError, Result};
use crate::parsing::parser::EngineKind;
use crate::parsing::token::{TokenRef, TokenTag};

use super::engine::RewriteEngine;

/// The function behind a [`Rewriter::Lambda`]. `Ok(None)` means "no change".
pub type RewriteFn = dyn Fn(&RewriteEngine, &TokenRef) -> Result<Option<TokenRef>> + Send + Sync;

/// A composable token rewrite.
///
/// Every variant answers the same question for one token: `Ok(None)` if it
/// leaves the token alone, `Ok(Some(new))` with a replacement, or a fatal
/// error.
#[derive(Clone)]
pub enum Rewriter {
    /// Never changes anything.
    Null,
    /// Runs `func` on tokens tagged `target`, optionally only for one grammar.
    Lambda {
        name: &'static str,
        target: TokenTag,
        engine: Option<EngineKind>,
        func: Arc<RewriteFn>,
    },
    /// The first inner rewriter that changes the token wins.
    Composite(Vec<Rewriter>),
    /// Threads the token through every inner rewriter in order.
    Sequence(Vec<Rewriter>),
    /// Re-applies `inner` until it stops changing the token.
    Loop { inner: Box<Rewriter>, max: usize },
}

impl Rewriter {
    pub fn lambda<F>(name: &'static str, target: TokenTag, func: F) -> Self
    where
        F: Fn(&RewriteEngine, &TokenRef) -> Result<Option<TokenRef>> + Send + Sync + 'static,
    {
        Rewriter::Lambda {
            name,
            target,
            engine: None,
            func: Arc::new(func),
        }
    }

    /// Restricts a lambda to one grammar. Other variants are returned as is.
    pub fn for_engine(self, kind: EngineKind) -> Self {
        match self {
            Rewriter::Lambda {
                name, target, func, ..
            } => Rewriter::Lambda {
                name,
                target,
                engine: Some(kind),
                func,
            },
            other => other,
        }
    }

    pub fn composite(rewriters: impl IntoIterator<Item = Rewriter>) -> Self {
        Rewriter::Composite(rewriters.into_iter().collect())
    }

    pub fn sequence(rewriters: impl IntoIterator<Item = Rewriter>) -> Self {
        Rewriter::Sequence(rewriters.into_iter().collect())
    }

    pub fn looped(self, max: usize) -> Self {
        Rewriter::Loop {
            inner: Box::new(self),
            max,
        }
    }

    /// Applies this rewriter to `token` alone, without visiting children.
    pub fn rewrite(&self, engine: &RewriteEngine, token: &TokenRef) -> Result<Option<TokenRef>> {
        match self {
            Rewriter::Null => Ok(None),
            Rewriter::Lambda {
                name,
                target,
                engine: kind,
                func,
            } => {
                if token.tag() != *target || kind.is_some_and(|k| k != engine.kind()) {
                    return Ok(None);
                }
                let result = func(engine, token)?;
                if let Some(new) = &result {
                    if Arc::ptr_eq(new, token) {
                        return Ok(None);
                    }
                    log::trace!("{}: {name} rewrote {:?}", token.source, target);
                }
                Ok(result)
            }
            Rewriter::Composite(rewriters) => {
                for rewriter in rewriters {
                    if let Some(new) = rewriter.rewrite(engine, token)? {
                        return Ok(Some(new));
                    }
                }
                Ok(None)
            }
            Rewriter::Sequence(rewriters) => {
                let mut current = Arc::clone(token);
                let mut changed = false;
                for rewriter in rewriters {
                    if let Some(new) = rewriter.rewrite(engine, &current)? {
                        current = new;
                        changed = true;
                    }
                }
                Ok(changed.then_some(current))
            }
            Rewriter::Loop { inner, max } => {
                let mut current = Arc::clone(token);
                let mut changed = false;
                for _ in 0..=*max {
                    match inner.rewrite(engine, &current)? {
                        Some(new) => {
                            current = new;
                            changed = true;
                        }
                        None => return Ok(changed.then_some(current)),
                    }
                }
                Err(EngineError::TooManyLoops {
                    max: *max,
                    location: token.source.clone(),
                })
            }
        }
    }
}

impl fmt::Debug for Rewriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rewriter::Null => write!(f, "Null"),
            Rewriter::Lambda {
                name,
                target,
                engine,
                ..
            } => f
                .debug_struct("Lambda")
                .field("name", name)
                .field("target", target)
                .field("engine", engine)
                .finish(),
            Rewriter::Composite(inner) => f.debug_tuple("Composite").field(inner).finish(),
            Rewriter::Sequence(inner) => f.debug_tuple("Sequence").field(inner).finish(),
            Rewriter::Loop { inner, max } => f
                .debug_struct("Loop")
                .field("inner", inner)
                .field("max", max)
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::context::{ParseFlags, ParseOptions};
    use crate::parsing::rules::RuleId;
    use crate::parsing::source::SourceInfo;
    use crate::parsing::token::{Token, TokenKind};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn text(content: &str) -> TokenRef {
        Token::new(
            RuleId::InlineText,
            ParseFlags::default(),
            SourceInfo::document(content, None),
            TokenKind::Text {
                content: content.into(),
            },
        )
    }

    fn content(token: &TokenRef) -> String {
        token.plain_text()
    }

    fn append(suffix: &'static str) -> Rewriter {
        Rewriter::lambda("append", TokenTag::Text, move |_, token| {
            Ok(Some(token.with_kind(TokenKind::Text {
                content: format!("{}{suffix}", token.plain_text()),
            })))
        })
    }

    /// Appends `x` until the text is `limit` characters long.
    fn grow_to(limit: usize) -> Rewriter {
        Rewriter::lambda("grow", TokenTag::Text, move |_, token| {
            let current = token.plain_text();
            Ok((current.len() < limit).then(|| {
                token.with_kind(TokenKind::Text {
                    content: format!("{current}x"),
                })
            }))
        })
    }

    fn engine() -> RewriteEngine {
        RewriteEngine::new(EngineKind::Dfm, ParseOptions::default())
    }

    #[test]
    fn null_never_changes() {
        assert!(Rewriter::Null.rewrite(&engine(), &text("a")).unwrap().is_none());
    }

    #[test]
    fn lambda_filters_by_tag_and_engine() {
        let token = text("a");
        let wrong_tag = Rewriter::lambda("never", TokenTag::Em, |_, _| panic!("called"));
        assert!(wrong_tag.rewrite(&engine(), &token).unwrap().is_none());

        let markdown_only = append("!").for_engine(EngineKind::Markdown);
        assert!(markdown_only.rewrite(&engine(), &token).unwrap().is_none());

        let dfm_only = append("!").for_engine(EngineKind::Dfm);
        let new = dfm_only.rewrite(&engine(), &token).unwrap().unwrap();
        assert_eq!(content(&new), "a!");
    }

    #[test]
    fn returning_the_same_token_is_no_change() {
        let same = Rewriter::lambda("same", TokenTag::Text, |_, token| Ok(Some(Arc::clone(token))));
        assert!(same.rewrite(&engine(), &text("a")).unwrap().is_none());
    }

    #[test]
    fn composite_takes_first_change() {
        let rewriter = Rewriter::composite([Rewriter::Null, append("1"), append("2")]);
        let new = rewriter.rewrite(&engine(), &text("a")).unwrap().unwrap();
        assert_eq!(content(&new), "a1");
    }

    #[test]
    fn sequence_threads_through_all() {
        let rewriter = Rewriter::sequence([append("1"), Rewriter::Null, append("2")]);
        let new = rewriter.rewrite(&engine(), &text("a")).unwrap().unwrap();
        assert_eq!(content(&new), "a12");
        let unchanged = Rewriter::sequence([Rewriter::Null, Rewriter::Null]);
        assert!(unchanged.rewrite(&engine(), &text("a")).unwrap().is_none());
    }

    #[test]
    fn loop_runs_to_a_fixed_point() {
        let new = grow_to(4).looped(10).rewrite(&engine(), &text("a")).unwrap().unwrap();
        assert_eq!(content(&new), "axxx");
        assert!(grow_to(1).looped(10).rewrite(&engine(), &text("a")).unwrap().is_none());
    }

    #[test]
    fn loop_gives_up_after_max_plus_one_attempts() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let always = Rewriter::lambda("always", TokenTag::Text, move |_, token| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Some(token.with_kind(token.kind.clone())))
        });
        let err = always.looped(3).rewrite(&engine(), &text("a")).unwrap_err();
        assert!(matches!(err, EngineError::TooManyLoops { max: 3, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn a_loop_may_settle_on_its_last_allowed_change() {
        // three changes, then the fourth attempt reports no change
        let new = grow_to(4).looped(3).rewrite(&engine(), &text("a")).unwrap();
        assert_eq!(new.map(|t| content(&t)).as_deref(), Some("axxx"));
    }
}
