use crate::parsing::{rules::RuleId, source::SourceInfo};

/// Fatal errors of the tokenizer and the rewriters.
///
/// Recoverable conditions never show up here: they are folded into the token
/// tree (fallback text, padded table cells, missing xrefs, failed includes).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("{location}: rule {rule:?} matched without consuming input")]
    ZeroLengthMatch { rule: RuleId, location: SourceInfo },

    #[error("{location}: too many loops, rewriting did not settle within {max} iterations")]
    TooManyLoops { max: usize, location: SourceInfo },

    #[error("{location}: table header has {header} columns but the alignment row has {align}")]
    TableShapeMismatch {
        header: usize,
        align: usize,
        location: SourceInfo,
    },

    #[error("{location}: unable to resolve cross reference '{uid}'")]
    UnresolvedXref { uid: String, location: SourceInfo },
}

impl EngineError {
    /// Where in the Markdown source the error happened.
    pub fn source_info(&self) -> &SourceInfo {
        match self {
            EngineError::ZeroLengthMatch { location, .. }
            | EngineError::TooManyLoops { location, .. }
            | EngineError::TableShapeMismatch { location, .. }
            | EngineError::UnresolvedXref { location, .. } => location,
        }
    }
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
