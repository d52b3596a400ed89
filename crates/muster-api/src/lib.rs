//! JSON REST API for Muster.
//!
//! Exposes an axum [`Router`] backed by any
//! [`muster_core::store::DirectoryStore`]. Auth, TLS, and transport concerns
//! are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", muster_api::api_router(store.clone()))
//! ```

pub mod error;
pub mod superiors;
pub mod users;

use std::sync::Arc;

use axum::{
  Router,
  routing::{delete, get, post},
};
use muster_core::store::DirectoryStore;

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: DirectoryStore + 'static,
{
  Router::new()
    // Records
    .route("/users", get(users::list::<S>).post(users::create::<S>))
    .route("/users/all", get(users::list_all::<S>))
    .route(
      "/users/{id}",
      get(users::get_one::<S>)
        .put(users::update_one::<S>)
        .delete(users::delete_one::<S>),
    )
    // Subordinate lists
    .route(
      "/users/{id}/subordinates",
      get(users::descendants::<S>).post(users::add_subordinate::<S>),
    )
    .route(
      "/users/{id}/subordinates/transfer",
      post(users::transfer_subordinates::<S>),
    )
    .route(
      "/users/{id}/subordinates/{sub_id}",
      delete(users::remove_subordinate::<S>),
    )
    // Superior pointers
    .route(
      "/superiors/{sup_id}",
      delete(superiors::clear::<S>).put(superiors::reassign::<S>),
    )
    .with_state(store)
}

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use muster_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;
  use uuid::Uuid;

  async fn make_store() -> Arc<SqliteStore> {
    Arc::new(SqliteStore::open_in_memory().await.unwrap())
  }

  async fn send(
    store:  &Arc<SqliteStore>,
    method: &str,
    uri:    &str,
    body:   Option<Value>,
  ) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
      Some(v) => {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
        Body::from(v.to_string())
      }
      None => Body::empty(),
    };
    let resp = api_router(store.clone())
      .oneshot(builder.body(body).unwrap())
      .await
      .unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    let value = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
  }

  fn soldier(name: &str) -> Value {
    json!({
      "name":  name,
      "sex":   "M",
      "phone": "555-0100",
      "email": "someone@example.mil",
      "rank":  "Private",
    })
  }

  async fn create(store: &Arc<SqliteStore>, body: Value) -> Value {
    let (status, user) = send(store, "POST", "/users", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    user
  }

  // ── Records ─────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn create_then_get_by_id() {
    let store = make_store().await;
    let created = create(&store, soldier("Ann Kerr")).await;
    assert_eq!(created["avatar"], "../../public/avatar/default.png");
    assert!(created["Timestamp"].is_string());

    let id = created["user_id"].as_str().unwrap();
    let (status, fetched) = send(&store, "GET", &format!("/users/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);
  }

  #[tokio::test]
  async fn create_missing_required_field_is_400() {
    let store = make_store().await;
    let (status, body) = send(
      &store,
      "POST",
      "/users",
      Some(json!({ "name": "Ann Kerr", "sex": "F" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("phone"));
  }

  #[tokio::test]
  async fn get_missing_user_is_404() {
    let store = make_store().await;
    let (status, _) =
      send(&store, "GET", &format!("/users/{}", Uuid::new_v4()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn list_paginates_and_sorts() {
    let store = make_store().await;
    for name in ["Cy", "Al", "Bea"] {
      create(&store, soldier(name)).await;
    }

    let (status, page) = send(
      &store,
      "GET",
      "/users?page_size=2&page_number=1&sort_type=1&search_text=",
      None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["totalDocs"], 3);
    assert_eq!(page["totalPages"], 2);
    assert_eq!(page["hasNextPage"], true);
    assert_eq!(page["docs"][0]["name"], "Al");
    assert_eq!(page["docs"][1]["name"], "Bea");

    let (_, all) = send(&store, "GET", "/users/all", None).await;
    assert_eq!(all.as_array().unwrap().len(), 3);
  }

  #[tokio::test]
  async fn list_rejects_unknown_sort_type() {
    let store = make_store().await;
    let (status, _) = send(&store, "GET", "/users?sort_type=15", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn update_with_empty_superior_clears_both() {
    let store = make_store().await;
    let boss = create(&store, soldier("Ann Kerr")).await;
    let mut body = soldier("Bo Reyes");
    body["superior"] = boss["user_id"].clone();
    body["superiorname"] = json!("Ann Kerr");
    let sub = create(&store, body).await;
    assert_eq!(sub["superior"], boss["user_id"]);

    let id = sub["user_id"].as_str().unwrap();
    let (status, updated) = send(
      &store,
      "PUT",
      &format!("/users/{id}"),
      Some(json!({ "rank": "Corporal", "superior": "", "superiorname": "Ann Kerr" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["rank"], "Corporal");
    assert!(updated["superior"].is_null());
    assert!(updated["superiorname"].is_null());
  }

  #[tokio::test]
  async fn delete_returns_record_then_404() {
    let store = make_store().await;
    let user = create(&store, soldier("Ann Kerr")).await;
    let uri = format!("/users/{}", user["user_id"].as_str().unwrap());

    let (status, deleted) = send(&store, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["name"], "Ann Kerr");

    let (status, _) = send(&store, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  // ── Subordinates ────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn subordinate_list_edits() {
    let store = make_store().await;
    let boss = create(&store, soldier("Ann Kerr")).await;
    let boss_id = boss["user_id"].as_str().unwrap();
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let uri = format!("/users/{boss_id}/subordinates");

    for _ in 0..2 {
      let (status, _) =
        send(&store, "POST", &uri, Some(json!({ "subordinate_id": a }))).await;
      assert_eq!(status, StatusCode::OK);
    }
    let (_, user) = send(
      &store,
      "POST",
      &format!("{uri}/transfer"),
      Some(json!({ "subordinates": [b] })),
    )
    .await;
    assert_eq!(user["subordinates"], json!([a, b]));

    let (_, user) = send(&store, "DELETE", &format!("{uri}/{a}"), None).await;
    assert_eq!(user["subordinates"], json!([b]));
  }

  #[tokio::test]
  async fn descendants_cover_the_tree() {
    let store = make_store().await;
    let top = create(&store, soldier("Ann Kerr")).await;
    let mid = create(&store, soldier("Bo Reyes")).await;
    let low = create(&store, soldier("Cy Moss")).await;
    let (top_id, mid_id, low_id) = (
      top["user_id"].as_str().unwrap(),
      mid["user_id"].as_str().unwrap(),
      low["user_id"].as_str().unwrap(),
    );

    send(
      &store,
      "POST",
      &format!("/users/{top_id}/subordinates"),
      Some(json!({ "subordinate_id": mid_id })),
    )
    .await;
    send(
      &store,
      "POST",
      &format!("/users/{mid_id}/subordinates"),
      Some(json!({ "subordinate_id": low_id })),
    )
    .await;

    let (status, ids) =
      send(&store, "GET", &format!("/users/{top_id}/subordinates"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids, json!([mid_id, low_id]));

    let (status, _) = send(
      &store,
      "GET",
      &format!("/users/{}/subordinates", Uuid::new_v4()),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[test]
  fn wrapped_user_not_found_maps_to_404() {
    let id = Uuid::new_v4();
    let failure = muster_store_sqlite::Error::Failed {
      op:     muster_core::store::Operation::GetSubordinates,
      source: Box::new(muster_core::Error::UserNotFound(id).into()),
    };
    assert!(matches!(ApiError::store(failure), ApiError::NotFound(_)));

    let failure = muster_store_sqlite::Error::DateParse("bad".into());
    assert!(matches!(ApiError::store(failure), ApiError::Store(_)));
  }

  // ── Superiors ───────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn superior_bulk_edits_report_counts() {
    let store = make_store().await;
    let boss = create(&store, soldier("Ann Kerr")).await;
    let heir = create(&store, soldier("Dee Pratt")).await;
    for name in ["Bo Reyes", "Cy Moss"] {
      let mut body = soldier(name);
      body["superior"] = boss["user_id"].clone();
      body["superiorname"] = json!("Ann Kerr");
      create(&store, body).await;
    }
    let boss_id = boss["user_id"].as_str().unwrap();

    let (status, res) = send(
      &store,
      "PUT",
      &format!("/superiors/{boss_id}"),
      Some(json!({ "superior_id": heir["user_id"], "superior_name": "Dee Pratt" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(res["modified"], 2);

    let heir_id = heir["user_id"].as_str().unwrap();
    let (_, page) =
      send(&store, "GET", &format!("/users?superior_id={heir_id}"), None).await;
    assert_eq!(page["totalDocs"], 2);

    let (_, res) =
      send(&store, "DELETE", &format!("/superiors/{heir_id}"), None).await;
    assert_eq!(res["modified"], 2);

    let (_, page) =
      send(&store, "GET", &format!("/users?superior_id={heir_id}"), None).await;
    assert_eq!(page["totalDocs"], 0);
  }
}
