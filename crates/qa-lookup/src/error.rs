use qa_common::error::CommonError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("unknown topic: {0}")]
    UnknownTopic(String),

    #[error(transparent)]
    Common(#[from] CommonError),
}
