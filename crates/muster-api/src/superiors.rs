//! Handlers for `/superiors` endpoints — bulk edits of the superior pointer
//! held by every direct report of a user.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `DELETE` | `/superiors/:sup_id` | Nulls superior and superior name on every report |
//! | `PUT`    | `/superiors/:sup_id` | Body: [`ReassignBody`]; repoints every report |
//!
//! Both return `{"modified": n}`. The subordinate lists on either side are
//! not touched.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use muster_core::store::DirectoryStore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Serialize, Deserialize)]
pub struct Modified {
  pub modified: u64,
}

/// `DELETE /superiors/:sup_id`
pub async fn clear<S>(
  State(store): State<Arc<S>>,
  Path(superior_id): Path<Uuid>,
) -> Result<Json<Modified>, ApiError>
where
  S: DirectoryStore,
{
  let modified = store
    .delete_user_superior(superior_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(Modified { modified }))
}

#[derive(Debug, Deserialize)]
pub struct ReassignBody {
  pub superior_id:   Uuid,
  pub superior_name: String,
}

/// `PUT /superiors/:sup_id`
pub async fn reassign<S>(
  State(store): State<Arc<S>>,
  Path(superior_id): Path<Uuid>,
  Json(body): Json<ReassignBody>,
) -> Result<Json<Modified>, ApiError>
where
  S: DirectoryStore,
{
  let modified = store
    .update_user_superior(superior_id, body.superior_id, body.superior_name)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(Modified { modified }))
}
