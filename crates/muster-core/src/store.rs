//! The `DirectoryStore` trait and the operation names used in its errors.
//!
//! The trait is implemented by storage backends (e.g. `muster-store-sqlite`).
//! Higher layers (`muster-api`, `muster-server`) depend on this abstraction,
//! not on any concrete backend.

use std::{fmt, future::Future};

use uuid::Uuid;

use crate::{
  query::{Page, UserQuery},
  user::{NewUser, User, UserUpdate},
};

// ─── Operations ──────────────────────────────────────────────────────────────

/// Names a directory operation. A backend reports every fault as a single
/// generic failure of the operation that hit it; the `Display` form is that
/// failure's message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
  GetAllUsers,
  GetUsers,
  GetUserById(Uuid),
  CreateUser,
  AddUserSubordinates,
  TransferUserSubordinates,
  DeleteUserSubordinates,
  DeleteUserSuperior,
  DeleteUserById(Uuid),
  UpdateUserById(Uuid),
  UpdateUserSuperior,
  GetSubordinates,
}

impl fmt::Display for Operation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::GetAllUsers | Self::GetUsers => f.write_str("error getting users from db"),
      Self::GetUserById(id) => write!(f, "error getting user by id: {id}"),
      Self::CreateUser => f.write_str("error creating user"),
      Self::AddUserSubordinates => f.write_str("error adding user subordinates"),
      Self::TransferUserSubordinates => {
        f.write_str("error transferring user subordinates")
      }
      Self::DeleteUserSubordinates => f.write_str("error deleting user subordinates"),
      Self::DeleteUserSuperior => f.write_str("error deleting user superior"),
      Self::DeleteUserById(id) => write!(f, "error deleting user by id: {id}"),
      Self::UpdateUserById(id) => write!(f, "error updating user by id: {id}"),
      Self::UpdateUserSuperior => f.write_str("error updating user superior"),
      Self::GetSubordinates => f.write_str("error getting user subordinates"),
    }
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Muster directory backend.
///
/// Single-record operations return `Ok(None)` when the record does not exist.
/// The superior pointer and the subordinate list are edited by separate calls;
/// nothing here keeps the two sides consistent.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait DirectoryStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Every record, unfiltered, in insertion order.
  fn get_all_users(
    &self,
  ) -> impl Future<Output = Result<Vec<User>, Self::Error>> + Send + '_;

  /// Filter, sort and paginate. See [`UserQuery`] for the matching rules.
  fn get_users<'a>(
    &'a self,
    query: &'a UserQuery,
  ) -> impl Future<Output = Result<Page<User>, Self::Error>> + Send + 'a;

  fn get_user_by_id(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Every descendant of `id`, depth-first: each subordinate is followed by
  /// its own descendants before the next sibling. Fails if `id` itself does
  /// not exist.
  fn get_subordinates(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Vec<Uuid>, Self::Error>> + Send + '_;

  // ── Record writes ─────────────────────────────────────────────────────

  /// Persist a new record. Identity, creation stamp and defaults are set by
  /// the store.
  fn create_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  /// Replace the given fields and return the updated record.
  fn update_user_by_id(
    &self,
    id: Uuid,
    update: UserUpdate,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Remove a record and return it. References to it held by other records
  /// are left in place.
  fn delete_user_by_id(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  // ── Subordinate list ──────────────────────────────────────────────────

  /// Add `subordinate_id` unless it is already listed.
  fn add_user_subordinates(
    &self,
    id: Uuid,
    subordinate_id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Append every id in `subordinates`, in order, without de-duplication.
  fn transfer_user_subordinates(
    &self,
    id: Uuid,
    subordinates: Vec<Uuid>,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Remove every occurrence of `subordinate_id`.
  fn delete_user_subordinates(
    &self,
    id: Uuid,
    subordinate_id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  // ── Superior pointers (bulk) ──────────────────────────────────────────

  /// Null `superior` and `superior_name` on every record reporting to
  /// `superior_id`. Returns the number of records changed.
  fn delete_user_superior(
    &self,
    superior_id: Uuid,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Repoint every record reporting to `superior_id` at `new_id`, caching
  /// `new_name`. Returns the number of records changed.
  fn update_user_superior(
    &self,
    superior_id: Uuid,
    new_id: Uuid,
    new_name: String,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn failure_messages_name_the_record() {
    let id = Uuid::nil();
    assert_eq!(
      Operation::GetUserById(id).to_string(),
      format!("error getting user by id: {id}")
    );
    assert_eq!(Operation::GetUsers.to_string(), "error getting users from db");
    assert_eq!(Operation::CreateUser.to_string(), "error creating user");
  }
}
