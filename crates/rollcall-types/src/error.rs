//! Error types for the shared vocabulary.

/// Errors raised while parsing shared types from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypesError {
    /// The status string is neither `present` nor `excused`.
    #[error("unknown attendance status: {0}")]
    UnknownStatus(String),

    /// The text is not a participant id in any accepted form.
    #[error("not a participant id: {0}")]
    InvalidParticipant(String),

    /// A stored timestamp or date didn't match the expected format.
    #[error("invalid {field} value: {value}")]
    InvalidTime {
        /// Which column or field was being parsed.
        field: &'static str,
        /// The offending text.
        value: String,
    },
}
