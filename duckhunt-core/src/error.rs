use thiserror::Error;

/// Failed to parse a label selector string.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseSelectorError {
    /// A requirement had no key
    #[error("missing key in requirement {0:?}")]
    MissingKey(String),

    /// A set based requirement was not closed with a parenthesis
    #[error("unterminated value set in requirement {0:?}")]
    UnterminatedSet(String),

    /// A set based requirement listed no values
    #[error("empty value set in requirement {0:?}")]
    EmptySet(String),

    /// A requirement used an operator that is not understood
    #[error("unknown operator in requirement {0:?}")]
    UnknownOperator(String),
}
