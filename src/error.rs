use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
  #[error("{0}")]
  Validation(String),
  #[error("{0}")]
  Conflict(String),
  #[error("database error: {0}")]
  Database(#[from] rusqlite::Error),
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
  #[error("background task failed: {0}")]
  Task(#[from] tokio::task::JoinError),
}

impl CatalogError {
  pub fn validation(message: impl Into<String>) -> Self {
    Self::Validation(message.into())
  }
}

#[derive(Debug, Error)]
pub enum ClientError {
  #[error("{0}")]
  Validation(String),
  #[error("{0}")]
  Conflict(String),
  #[error("server responded {status}: {message}")]
  Status { status: u16, message: String },
  #[error("request failed: {0}")]
  Transport(#[from] reqwest::Error),
  #[error("local cache error: {0}")]
  Cache(String),
}

impl ClientError {
  pub fn validation(message: impl Into<String>) -> Self {
    Self::Validation(message.into())
  }

  pub fn is_conflict(&self) -> bool {
    matches!(self, ClientError::Conflict(_))
  }
}
