//! [`SqliteStore`] — the SQLite implementation of [`DirectoryStore`].

use std::{collections::HashSet, path::Path};

use chrono::{Local, SubsecRound as _, Utc};
use rusqlite::{OptionalExtension as _, functions::FunctionFlags, types::Value};
use uuid::Uuid;

use muster_core::{
  query::{Page, UserQuery},
  store::{DirectoryStore, Operation},
  user::{DEFAULT_AVATAR, NewUser, SuperiorChange, User, UserUpdate, creation_stamp},
};

use crate::{
  Error, Result,
  encode::{
    RawUser, SEARCH_COLUMNS, USER_COLUMNS, decode_ids, encode_dt, encode_uuid,
    like_pattern, order_by,
  },
  schema::SCHEMA,
};

// ─── Row helpers ─────────────────────────────────────────────────────────────

const FOLD_FN: &str = "muster_fold";

fn select_user(
  conn: &rusqlite::Connection,
  id_str: &str,
) -> rusqlite::Result<Option<RawUser>> {
  conn
    .query_row(
      &format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"),
      rusqlite::params![id_str],
      RawUser::from_row,
    )
    .optional()
}

/// Registers `muster_fold(text)`, the Unicode lowercase of its argument. SQLite's
/// own `LIKE` only folds ASCII letters.
fn register_fold(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
  conn.create_scalar_function(
    FOLD_FN,
    1,
    FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
    |ctx| {
      let text: Option<String> = ctx.get(0)?;
      Ok(text.map(|t| t.to_lowercase()))
    },
  )
}

fn search_clause() -> String {
  let text = SEARCH_COLUMNS
    .iter()
    .map(|col| format!("{FOLD_FN}({col}) LIKE {FOLD_FN}(?1) ESCAPE '\\'"))
    .collect::<Vec<_>>()
    .join(" OR ");
  format!("WHERE ({text}) AND (?2 IS NULL OR superior = ?2)")
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Muster directory backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init().await?;
    Ok(store)
  }

  async fn init(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        register_fold(conn)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Reads ───────────────────────────────────────────────────────────────

  async fn fetch_all(&self) -> Result<Vec<User>> {
    let raws: Vec<RawUser> = self
      .conn
      .call(|conn| {
        let mut stmt = conn
          .prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY rowid ASC"))?;
        let rows = stmt
          .query_map([], RawUser::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawUser::into_user).collect()
  }

  async fn fetch_page(&self, query: &UserQuery) -> Result<Page<User>> {
    let pattern    = like_pattern(query.search_text.as_deref());
    let superior   = query.superior_id.map(encode_uuid);
    let order      = order_by(query.sort);
    let page       = query.page();
    let limit      = query.limit();
    let limit_val  = i64::try_from(limit).unwrap_or(i64::MAX);
    let offset_val = i64::try_from(query.offset()).unwrap_or(i64::MAX);

    let (total, raws): (u64, Vec<RawUser>) = self
      .conn
      .call(move |conn| {
        let filter = search_clause();

        let total: i64 = conn.query_row(
          &format!("SELECT COUNT(*) FROM users {filter}"),
          rusqlite::params![pattern, superior],
          |r| r.get(0),
        )?;

        if limit == 0 {
          return Ok((total as u64, Vec::new()));
        }

        let mut stmt = conn.prepare(&format!(
          "SELECT {USER_COLUMNS} FROM users {filter} {order} LIMIT ?3 OFFSET ?4"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![pattern, superior, limit_val, offset_val],
            RawUser::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((total as u64, rows))
      })
      .await?;

    let docs = raws
      .into_iter()
      .map(RawUser::into_user)
      .collect::<Result<Vec<_>>>()?;

    Ok(Page::new(docs, total, page, limit))
  }

  async fn fetch_user(&self, id: Uuid) -> Result<Option<User>> {
    let id_str = encode_uuid(id);

    let raw = self
      .conn
      .call(move |conn| Ok(select_user(conn, &id_str)?))
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  /// The subordinate list of `id`, or `None` if the record does not exist.
  async fn fetch_subordinate_ids(&self, id: Uuid) -> Result<Option<Vec<Uuid>>> {
    let id_str = encode_uuid(id);

    let raw: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT subordinates FROM users WHERE user_id = ?1",
              rusqlite::params![id_str],
              |r| r.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    raw.as_deref().map(decode_ids).transpose()
  }

  /// Depth-first walk over subordinate lists. Each id is visited once, so
  /// cycles and repeated entries terminate.
  async fn collect_subordinates(&self, root: Uuid) -> Result<Vec<Uuid>> {
    let direct = self
      .fetch_subordinate_ids(root)
      .await?
      .ok_or(muster_core::Error::UserNotFound(root))?;

    let mut seen = HashSet::from([root]);
    let mut found = Vec::new();
    let mut stack: Vec<Uuid> = direct.into_iter().rev().collect();

    while let Some(id) = stack.pop() {
      if !seen.insert(id) {
        continue;
      }
      found.push(id);
      match self.fetch_subordinate_ids(id).await? {
        Some(children) => stack.extend(children.into_iter().rev()),
        None => tracing::warn!(%root, subordinate = %id, "dangling subordinate reference"),
      }
    }

    Ok(found)
  }

  // ── Record writes ───────────────────────────────────────────────────────

  async fn insert_user(&self, input: NewUser) -> Result<User> {
    input.validate()?;

    // Stored timestamps keep microseconds; truncate up front so the returned
    // record equals what a later read yields.
    let now = Utc::now().trunc_subsecs(6);
    let user = User {
      user_id:       Uuid::new_v4(),
      name:          input.name,
      sex:           input.sex,
      phone:         input.phone,
      email:         input.email,
      rank:          input.rank,
      start_date:    input.start_date.map_or(now, |d| d.trunc_subsecs(6)),
      avatar:        input.avatar.unwrap_or_else(|| DEFAULT_AVATAR.to_owned()),
      superior:      input.superior,
      superior_name: input.superior_name,
      subordinates:  Vec::new(),
      timestamp:     creation_stamp(Local::now().naive_local()),
    };

    let raw = RawUser::from_user(&user)?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (
             user_id, name, sex, phone, email, rank, start_date, avatar,
             superior, superior_name, subordinates, timestamp
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
          rusqlite::params![
            raw.user_id,
            raw.name,
            raw.sex,
            raw.phone,
            raw.email,
            raw.rank,
            raw.start_date,
            raw.avatar,
            raw.superior,
            raw.superior_name,
            raw.subordinates,
            raw.timestamp,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(user)
  }

  async fn apply_update(&self, id: Uuid, update: UserUpdate) -> Result<Option<User>> {
    let id_str = encode_uuid(id);

    let mut sets: Vec<(&'static str, Value)> = Vec::new();
    let text_fields = [
      ("name", update.name),
      ("sex", update.sex),
      ("phone", update.phone),
      ("email", update.email),
      ("rank", update.rank),
    ];
    for (col, value) in text_fields {
      if let Some(v) = value {
        sets.push((col, Value::Text(v)));
      }
    }
    if let Some(d) = update.start_date {
      sets.push(("start_date", Value::Text(encode_dt(d))));
    }
    if let Some(a) = update.avatar {
      sets.push(("avatar", Value::Text(a)));
    }
    match update.superior {
      SuperiorChange::Keep => {}
      SuperiorChange::Clear => {
        sets.push(("superior", Value::Null));
        sets.push(("superior_name", Value::Null));
      }
      SuperiorChange::Assign { superior_id, superior_name } => {
        if let Some(s) = superior_id {
          sets.push(("superior", Value::Text(encode_uuid(s))));
        }
        if let Some(n) = superior_name {
          sets.push(("superior_name", Value::Text(n)));
        }
      }
    }

    let raw = self
      .conn
      .call(move |conn| {
        if !sets.is_empty() {
          let assignments = sets
            .iter()
            .enumerate()
            .map(|(i, (col, _))| format!("{col} = ?{}", i + 1))
            .collect::<Vec<_>>()
            .join(", ");
          let sql = format!(
            "UPDATE users SET {assignments} WHERE user_id = ?{}",
            sets.len() + 1
          );
          let values = sets
            .into_iter()
            .map(|(_, v)| v)
            .chain(std::iter::once(Value::Text(id_str.clone())));
          conn.execute(&sql, rusqlite::params_from_iter(values))?;
        }
        Ok(select_user(conn, &id_str)?)
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn remove_user(&self, id: Uuid) -> Result<Option<User>> {
    let id_str = encode_uuid(id);

    let raw = self
      .conn
      .call(move |conn| {
        let existing = select_user(conn, &id_str)?;
        if existing.is_some() {
          conn.execute(
            "DELETE FROM users WHERE user_id = ?1",
            rusqlite::params![id_str],
          )?;
        }
        Ok(existing)
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  // ── Subordinate list ────────────────────────────────────────────────────

  async fn add_subordinate(&self, id: Uuid, subordinate_id: Uuid) -> Result<Option<User>> {
    let id_str  = encode_uuid(id);
    let sub_str = encode_uuid(subordinate_id);

    let raw = self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE users
             SET subordinates = json_insert(subordinates, '$[#]', ?2)
           WHERE user_id = ?1
             AND NOT EXISTS (
               SELECT 1 FROM json_each(users.subordinates) WHERE value = ?2
             )",
          rusqlite::params![id_str, sub_str],
        )?;
        Ok(select_user(conn, &id_str)?)
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn append_subordinates(
    &self,
    id: Uuid,
    subordinates: Vec<Uuid>,
  ) -> Result<Option<User>> {
    let id_str = encode_uuid(id);
    let subs: Vec<String> = subordinates.into_iter().map(encode_uuid).collect();

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        for sub in &subs {
          tx.execute(
            "UPDATE users
               SET subordinates = json_insert(subordinates, '$[#]', ?2)
             WHERE user_id = ?1",
            rusqlite::params![id_str, sub],
          )?;
        }
        let raw = select_user(&tx, &id_str)?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn remove_subordinate(
    &self,
    id: Uuid,
    subordinate_id: Uuid,
  ) -> Result<Option<User>> {
    let id_str  = encode_uuid(id);
    let sub_str = encode_uuid(subordinate_id);

    let raw = self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE users
             SET subordinates = (
               SELECT json_group_array(value)
               FROM json_each(users.subordinates)
               WHERE value != ?2
             )
           WHERE user_id = ?1",
          rusqlite::params![id_str, sub_str],
        )?;
        Ok(select_user(conn, &id_str)?)
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  // ── Superior pointers ───────────────────────────────────────────────────

  async fn repoint_superior(
    &self,
    superior_id: Uuid,
    new_superior: Option<(Uuid, String)>,
  ) -> Result<u64> {
    let sup_str = encode_uuid(superior_id);
    let (new_id, new_name) = match new_superior {
      Some((id, name)) => (Some(encode_uuid(id)), Some(name)),
      None => (None, None),
    };

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE users SET superior = ?2, superior_name = ?3 WHERE superior = ?1",
          rusqlite::params![sup_str, new_id, new_name],
        )?)
      })
      .await?;

    Ok(changed as u64)
  }
}

// ─── DirectoryStore impl ─────────────────────────────────────────────────────

impl DirectoryStore for SqliteStore {
  type Error = Error;

  async fn get_all_users(&self) -> Result<Vec<User>> {
    tracing::debug!("get_all_users");
    self
      .fetch_all()
      .await
      .map_err(|e| e.during(Operation::GetAllUsers))
  }

  async fn get_users(&self, query: &UserQuery) -> Result<Page<User>> {
    tracing::debug!(?query, "get_users");
    self
      .fetch_page(query)
      .await
      .map_err(|e| e.during(Operation::GetUsers))
  }

  async fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
    tracing::debug!(%id, "get_user_by_id");
    self
      .fetch_user(id)
      .await
      .map_err(|e| e.during(Operation::GetUserById(id)))
  }

  async fn get_subordinates(&self, id: Uuid) -> Result<Vec<Uuid>> {
    tracing::debug!(%id, "get_subordinates");
    self
      .collect_subordinates(id)
      .await
      .map_err(|e| e.during(Operation::GetSubordinates))
  }

  async fn create_user(&self, input: NewUser) -> Result<User> {
    tracing::debug!(name = %input.name, "create_user");
    self
      .insert_user(input)
      .await
      .map_err(|e| e.during(Operation::CreateUser))
  }

  async fn update_user_by_id(&self, id: Uuid, update: UserUpdate) -> Result<Option<User>> {
    tracing::debug!(%id, "update_user_by_id");
    self
      .apply_update(id, update)
      .await
      .map_err(|e| e.during(Operation::UpdateUserById(id)))
  }

  async fn delete_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
    tracing::debug!(%id, "delete_user_by_id");
    self
      .remove_user(id)
      .await
      .map_err(|e| e.during(Operation::DeleteUserById(id)))
  }

  async fn add_user_subordinates(
    &self,
    id: Uuid,
    subordinate_id: Uuid,
  ) -> Result<Option<User>> {
    tracing::debug!(%id, %subordinate_id, "add_user_subordinates");
    self
      .add_subordinate(id, subordinate_id)
      .await
      .map_err(|e| e.during(Operation::AddUserSubordinates))
  }

  async fn transfer_user_subordinates(
    &self,
    id: Uuid,
    subordinates: Vec<Uuid>,
  ) -> Result<Option<User>> {
    tracing::debug!(%id, count = subordinates.len(), "transfer_user_subordinates");
    self
      .append_subordinates(id, subordinates)
      .await
      .map_err(|e| e.during(Operation::TransferUserSubordinates))
  }

  async fn delete_user_subordinates(
    &self,
    id: Uuid,
    subordinate_id: Uuid,
  ) -> Result<Option<User>> {
    tracing::debug!(%id, %subordinate_id, "delete_user_subordinates");
    self
      .remove_subordinate(id, subordinate_id)
      .await
      .map_err(|e| e.during(Operation::DeleteUserSubordinates))
  }

  async fn delete_user_superior(&self, superior_id: Uuid) -> Result<u64> {
    tracing::debug!(%superior_id, "delete_user_superior");
    self
      .repoint_superior(superior_id, None)
      .await
      .map_err(|e| e.during(Operation::DeleteUserSuperior))
  }

  async fn update_user_superior(
    &self,
    superior_id: Uuid,
    new_id: Uuid,
    new_name: String,
  ) -> Result<u64> {
    tracing::debug!(%superior_id, %new_id, "update_user_superior");
    self
      .repoint_superior(superior_id, Some((new_id, new_name)))
      .await
      .map_err(|e| e.during(Operation::UpdateUserSuperior))
  }
}
