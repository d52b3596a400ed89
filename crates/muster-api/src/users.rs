//! Handlers for `/users` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/users/all` | Every record, unpaginated |
//! | `GET`    | `/users` | [`ListParams`]; returns a [`Page`] |
//! | `POST`   | `/users` | Body: [`CreateBody`]; returns 201 + stored user |
//! | `GET`    | `/users/:id` | 404 if not found |
//! | `PUT`    | `/users/:id` | Body: [`UpdateBody`] |
//! | `DELETE` | `/users/:id` | Returns the deleted record |
//! | `GET`    | `/users/:id/subordinates` | Every descendant id |
//! | `POST`   | `/users/:id/subordinates` | Body: `{"subordinate_id":"..."}` |
//! | `POST`   | `/users/:id/subordinates/transfer` | Body: `{"subordinates":[...]}` |
//! | `DELETE` | `/users/:id/subordinates/:sub_id` | |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{DateTime, Utc};
use muster_core::{
  Error as CoreError,
  query::{Page, SortOrder, UserQuery},
  store::DirectoryStore,
  user::{NewUser, SuperiorChange, User, UserUpdate},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

/// Parse an optional id where an empty string means "absent".
fn optional_id(raw: Option<&str>) -> Result<Option<Uuid>, ApiError> {
  match raw {
    None | Some("") => Ok(None),
    Some(s) => Uuid::parse_str(s)
      .map(Some)
      .map_err(|_| CoreError::InvalidId(s.to_owned()).into()),
  }
}

fn not_found(id: Uuid) -> ApiError { ApiError::NotFound(format!("user {id} not found")) }

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /users/all`
pub async fn list_all<S>(
  State(store): State<Arc<S>>,
) -> Result<Json<Vec<User>>, ApiError>
where
  S: DirectoryStore,
{
  let users = store.get_all_users().await.map_err(ApiError::store)?;
  Ok(Json(users))
}

#[derive(Debug, Deserialize, Default)]
pub struct ListParams {
  pub page_size:   Option<u64>,
  /// 1-based.
  pub page_number: Option<u64>,
  /// Index into [`SortOrder`]; omitted means insertion order.
  pub sort_type:   Option<usize>,
  pub search_text: Option<String>,
  /// Restrict to direct reports of this user. Empty is ignored.
  pub superior_id: Option<String>,
}

/// `GET /users[?page_size=..][&page_number=..][&sort_type=..][&search_text=..][&superior_id=..]`
pub async fn list<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Page<User>>, ApiError>
where
  S: DirectoryStore,
{
  let sort = params
    .sort_type
    .map(|i| SortOrder::from_index(i).ok_or(CoreError::InvalidSortType(i)))
    .transpose()?;

  let query = UserQuery {
    search_text: params.search_text,
    superior_id: optional_id(params.superior_id.as_deref())?,
    sort,
    page: params.page_number,
    limit: params.page_size,
  };

  let page = store.get_users(&query).await.map_err(ApiError::store)?;
  Ok(Json(page))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /users`. Field names follow the legacy
/// document layout.
#[derive(Debug, Deserialize, Default)]
pub struct CreateBody {
  #[serde(default)]
  pub name:         String,
  #[serde(default)]
  pub sex:          String,
  #[serde(default)]
  pub phone:        String,
  #[serde(default)]
  pub email:        String,
  #[serde(default)]
  pub rank:         String,
  pub startdate:    Option<DateTime<Utc>>,
  pub avatar:       Option<String>,
  pub superior:     Option<String>,
  pub superiorname: Option<String>,
}

impl TryFrom<CreateBody> for NewUser {
  type Error = ApiError;

  fn try_from(b: CreateBody) -> Result<Self, ApiError> {
    let user = NewUser {
      superior:      optional_id(b.superior.as_deref())?,
      superior_name: b.superiorname.filter(|n| !n.is_empty()),
      name:          b.name,
      sex:           b.sex,
      phone:         b.phone,
      email:         b.email,
      rank:          b.rank,
      start_date:    b.startdate,
      avatar:        b.avatar,
    };
    user.validate()?;
    Ok(user)
  }
}

/// `POST /users` — returns 201 + the stored [`User`].
pub async fn create<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DirectoryStore,
{
  let input = NewUser::try_from(body)?;
  let user = store.create_user(input).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(user)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /users/:id`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<User>, ApiError>
where
  S: DirectoryStore,
{
  let user = store
    .get_user_by_id(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| not_found(id))?;
  Ok(Json(user))
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// JSON body accepted by `PUT /users/:id`. Absent fields are left unchanged;
/// an empty `superior` or `superiorname` clears both.
#[derive(Debug, Deserialize, Default)]
pub struct UpdateBody {
  pub name:         Option<String>,
  pub sex:          Option<String>,
  pub phone:        Option<String>,
  pub email:        Option<String>,
  pub rank:         Option<String>,
  pub startdate:    Option<DateTime<Utc>>,
  pub avatar:       Option<String>,
  pub superior:     Option<String>,
  pub superiorname: Option<String>,
}

impl TryFrom<UpdateBody> for UserUpdate {
  type Error = ApiError;

  fn try_from(b: UpdateBody) -> Result<Self, ApiError> {
    let superior =
      SuperiorChange::from_raw(b.superior.as_deref(), b.superiorname.as_deref())?;
    Ok(UserUpdate {
      name: b.name,
      sex: b.sex,
      phone: b.phone,
      email: b.email,
      rank: b.rank,
      start_date: b.startdate,
      avatar: b.avatar,
      superior,
    })
  }
}

/// `PUT /users/:id` — returns the updated record.
pub async fn update_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<UpdateBody>,
) -> Result<Json<User>, ApiError>
where
  S: DirectoryStore,
{
  let update = UserUpdate::try_from(body)?;
  let user = store
    .update_user_by_id(id, update)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| not_found(id))?;
  Ok(Json(user))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /users/:id` — returns the deleted record. References held by
/// other records are not touched.
pub async fn delete_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<User>, ApiError>
where
  S: DirectoryStore,
{
  let user = store
    .delete_user_by_id(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| not_found(id))?;
  Ok(Json(user))
}

// ─── Subordinates ─────────────────────────────────────────────────────────────

/// `GET /users/:id/subordinates` — every descendant id, depth-first. A
/// missing root surfaces from the store as a not-found error.
pub async fn descendants<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Uuid>>, ApiError>
where
  S: DirectoryStore,
{
  let ids = store.get_subordinates(id).await.map_err(ApiError::store)?;
  Ok(Json(ids))
}

#[derive(Debug, Deserialize)]
pub struct AddSubordinateBody {
  pub subordinate_id: Uuid,
}

/// `POST /users/:id/subordinates` — adds the id unless already listed.
pub async fn add_subordinate<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<AddSubordinateBody>,
) -> Result<Json<User>, ApiError>
where
  S: DirectoryStore,
{
  let user = store
    .add_user_subordinates(id, body.subordinate_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| not_found(id))?;
  Ok(Json(user))
}

#[derive(Debug, Deserialize)]
pub struct TransferBody {
  pub subordinates: Vec<Uuid>,
}

/// `POST /users/:id/subordinates/transfer` — appends every id in order.
pub async fn transfer_subordinates<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<TransferBody>,
) -> Result<Json<User>, ApiError>
where
  S: DirectoryStore,
{
  let user = store
    .transfer_user_subordinates(id, body.subordinates)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| not_found(id))?;
  Ok(Json(user))
}

/// `DELETE /users/:id/subordinates/:sub_id`
pub async fn remove_subordinate<S>(
  State(store): State<Arc<S>>,
  Path((id, sub_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<User>, ApiError>
where
  S: DirectoryStore,
{
  let user = store
    .delete_user_subordinates(id, sub_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| not_found(id))?;
  Ok(Json(user))
}
