#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("malformed row at line {line}: {reason}")]
    MalformedRow { line: usize, reason: String },

    #[error("missing column at index {index}")]
    MissingColumn { index: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}
