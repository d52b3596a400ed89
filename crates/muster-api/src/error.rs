//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Wrap a store failure. A [`muster_core::Error::UserNotFound`] anywhere in
  /// its source chain becomes [`ApiError::NotFound`], so a record deleted
  /// mid-request answers 404 rather than 500.
  pub(crate) fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    let mut cause: Option<&(dyn std::error::Error + 'static)> = Some(&e);
    while let Some(err) = cause {
      if let Some(muster_core::Error::UserNotFound(id)) =
        err.downcast_ref::<muster_core::Error>()
      {
        return Self::NotFound(format!("user {id} not found"));
      }
      cause = err.source();
    }
    Self::Store(Box::new(e))
  }
}

/// Core errors that reach a handler come from validating client input, so
/// they answer 400.
impl From<muster_core::Error> for ApiError {
  fn from(e: muster_core::Error) -> Self { Self::BadRequest(e.to_string()) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Store(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
