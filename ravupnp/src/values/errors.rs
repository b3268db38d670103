//! Erreurs de conversion de valeurs.

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ValueError {
    #[error("invalid value: {0}")]
    ParseError(String),

    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("decode error: {0}")]
    DecodeError(String),
}
