//! Error type for `macrocoach-connectors`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConnectorError {
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("xml error at byte {position}: {message}")]
  Xml { position: u64, message: String },
}

pub type Result<T, E = ConnectorError> = std::result::Result<T, E>;
