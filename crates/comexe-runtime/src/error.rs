use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("offset {0} does not name a present instance")]
    InvalidOffset(usize),
    #[error("startup script is missing or empty")]
    StartupScriptMissing,
    #[error("failed to join instance thread")]
    JoinFailed,
}

pub type Result<T> = std::result::Result<T, Error>;
