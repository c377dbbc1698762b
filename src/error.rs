/// Error types surfaced by pattern compilation.
use thiserror::Error;

/// A malformed pattern. Every variant carries the offending fragment of the
/// pattern and the char offset at which it starts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unclosed group at offset {offset}: `{fragment}`")]
    UnclosedGroup { fragment: String, offset: usize },
    #[error("unmatched ')' at offset {offset}: `{fragment}`")]
    UnmatchedParen { fragment: String, offset: usize },
    #[error("unterminated character class at offset {offset}: `{fragment}`")]
    UnterminatedClass { fragment: String, offset: usize },
    #[error("descending range in character class at offset {offset}: `{fragment}`")]
    DescendingRange { fragment: String, offset: usize },
    #[error("nothing to repeat at offset {offset}: `{fragment}`")]
    NothingToRepeat { fragment: String, offset: usize },
    #[error("invalid counted repetition at offset {offset}: `{fragment}`")]
    InvalidRepetition { fragment: String, offset: usize },
    #[error("repetition count exceeds {limit} at offset {offset}: `{fragment}`")]
    RepetitionTooLarge {
        fragment: String,
        offset: usize,
        limit: u32,
    },
    #[error("dangling escape at offset {offset}: `{fragment}`")]
    DanglingEscape { fragment: String, offset: usize },
    #[error("unsupported group syntax at offset {offset}: `{fragment}`")]
    UnsupportedGroup { fragment: String, offset: usize },
    #[error("groups nested deeper than {limit} at offset {offset}: `{fragment}`")]
    NestingTooDeep {
        fragment: String,
        offset: usize,
        limit: usize,
    },
}

impl ParseError {
    /// The slice of the pattern that triggered the error.
    pub fn fragment(&self) -> &str {
        match self {
            ParseError::UnclosedGroup { fragment, .. }
            | ParseError::UnmatchedParen { fragment, .. }
            | ParseError::UnterminatedClass { fragment, .. }
            | ParseError::DescendingRange { fragment, .. }
            | ParseError::NothingToRepeat { fragment, .. }
            | ParseError::InvalidRepetition { fragment, .. }
            | ParseError::RepetitionTooLarge { fragment, .. }
            | ParseError::DanglingEscape { fragment, .. }
            | ParseError::UnsupportedGroup { fragment, .. }
            | ParseError::NestingTooDeep { fragment, .. } => fragment,
        }
    }

    /// Char offset of the fragment within the pattern.
    pub fn offset(&self) -> usize {
        match self {
            ParseError::UnclosedGroup { offset, .. }
            | ParseError::UnmatchedParen { offset, .. }
            | ParseError::UnterminatedClass { offset, .. }
            | ParseError::DescendingRange { offset, .. }
            | ParseError::NothingToRepeat { offset, .. }
            | ParseError::InvalidRepetition { offset, .. }
            | ParseError::RepetitionTooLarge { offset, .. }
            | ParseError::DanglingEscape { offset, .. }
            | ParseError::UnsupportedGroup { offset, .. }
            | ParseError::NestingTooDeep { offset, .. } => *offset,
        }
    }
}

/// Any error returned by this crate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
}

pub type Result<T> = std::result::Result<T, Error>;
