use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConvertError {
    /// A style-mapping entry could not be turned into a rule.
    #[error("style mapping `{entry}`: {reason}")]
    Config { entry: String, reason: String },

    /// The source package or its document part lacks the structure we walk.
    #[error("source document: {0}")]
    SourceFormat(String),
}

impl ConvertError {
    pub fn config(entry: impl Into<String>, reason: impl Into<String>) -> Self {
        ConvertError::Config {
            entry: entry.into(),
            reason: reason.into(),
        }
    }

    pub fn source(reason: impl Into<String>) -> Self {
        ConvertError::SourceFormat(reason.into())
    }
}
