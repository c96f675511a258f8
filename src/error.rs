use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("no practice content with id '{0}'")]
    NotFound(String),

    #[error("practice catalog is empty")]
    Empty,

    #[error("invalid catalog data: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("catalog file error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("results database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("results storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to export results: {0}")]
    Export(#[from] csv::Error),

    #[error("feedback message must not be blank")]
    BlankFeedback,
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("user id must not be blank")]
    BlankUser,

    #[error("identity file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid identity file: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum PracticeError {
    #[error("practice content '{id}' is unavailable")]
    ContentUnavailable {
        id: String,
        #[source]
        source: ContentError,
    },
}
