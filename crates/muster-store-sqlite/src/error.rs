//! Error type for `muster-store-sqlite`.

use muster_core::store::Operation;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The generic failure every [`DirectoryStore`] operation reports. The
  /// underlying fault is kept as the source and logged when wrapped.
  ///
  /// [`DirectoryStore`]: muster_core::store::DirectoryStore
  #[error("{op}")]
  Failed {
    op:     Operation,
    #[source]
    source: Box<Error>,
  },

  #[error("core error: {0}")]
  Core(#[from] muster_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),
}

impl Error {
  /// Wrap this fault as the failure of `op`, logging the cause.
  pub(crate) fn during(self, op: Operation) -> Self {
    tracing::error!(error = %self, "{op}");
    Self::Failed { op, source: Box::new(self) }
  }

  /// The operation that failed, for errors returned by the store.
  pub fn operation(&self) -> Option<Operation> {
    match self {
      Self::Failed { op, .. } => Some(*op),
      _ => None,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
