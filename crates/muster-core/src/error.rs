//! Error types for `muster-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  /// A required field was absent or empty on create.
  #[error("missing required field: {0}")]
  MissingField(&'static str),

  #[error("invalid user id: {0:?}")]
  InvalidId(String),

  #[error("unknown sort type: {0}")]
  InvalidSortType(usize),

  #[error("user not found: {0}")]
  UserNotFound(Uuid),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
