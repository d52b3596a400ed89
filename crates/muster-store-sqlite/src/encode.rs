//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC strings so that text
//! ordering is chronological. The subordinate list is a compact JSON array.
//! UUIDs are stored as hyphenated lowercase strings.

use chrono::{DateTime, SecondsFormat, Utc};
use muster_core::{query::{SortField, SortOrder}, user::User};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Subordinates ─────────────────────────────────────────────────────────────

pub fn encode_ids(ids: &[Uuid]) -> Result<String> {
  let strs: Vec<String> = ids.iter().copied().map(encode_uuid).collect();
  Ok(serde_json::to_string(&strs)?)
}

pub fn decode_ids(s: &str) -> Result<Vec<Uuid>> {
  let strs: Vec<String> = serde_json::from_str(s)?;
  strs.iter().map(|s| decode_uuid(s)).collect()
}

// ─── Search and ordering ─────────────────────────────────────────────────────

/// Columns matched by free-text search.
pub const SEARCH_COLUMNS: [&str; 6] =
  ["name", "rank", "sex", "phone", "email", "superior_name"];

/// Build a `LIKE ... ESCAPE '\'` pattern that matches `text` literally as a
/// substring.
pub fn like_pattern(text: Option<&str>) -> String {
  let mut pattern = String::from("%");
  for c in text.unwrap_or_default().chars() {
    if matches!(c, '%' | '_' | '\\') {
      pattern.push('\\');
    }
    pattern.push(c);
  }
  pattern.push('%');
  pattern
}

fn sort_column(field: SortField) -> &'static str {
  match field {
    SortField::Timestamp => "timestamp",
    SortField::Name => "name",
    SortField::Sex => "sex",
    SortField::Rank => "rank",
    SortField::StartDate => "start_date",
    SortField::Phone => "phone",
    SortField::Email => "email",
    SortField::SuperiorName => "superior_name",
  }
}

/// `ORDER BY` clause for a listing; ties fall back to insertion order.
pub fn order_by(sort: Option<SortOrder>) -> String {
  match sort {
    Some(order) => format!(
      "ORDER BY {} {}, rowid ASC",
      sort_column(order.field()),
      if order.is_descending() { "DESC" } else { "ASC" }
    ),
    None => "ORDER BY rowid ASC".to_owned(),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawUser::from_row`].
pub const USER_COLUMNS: &str = "user_id, name, sex, phone, email, rank, \
                                start_date, avatar, superior, superior_name, \
                                subordinates, timestamp";

/// Raw strings read directly from a `users` row.
pub struct RawUser {
  pub user_id:       String,
  pub name:          String,
  pub sex:           String,
  pub phone:         String,
  pub email:         String,
  pub rank:          String,
  pub start_date:    String,
  pub avatar:        String,
  pub superior:      Option<String>,
  pub superior_name: Option<String>,
  pub subordinates:  String,
  pub timestamp:     String,
}

impl RawUser {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:       row.get(0)?,
      name:          row.get(1)?,
      sex:           row.get(2)?,
      phone:         row.get(3)?,
      email:         row.get(4)?,
      rank:          row.get(5)?,
      start_date:    row.get(6)?,
      avatar:        row.get(7)?,
      superior:      row.get(8)?,
      superior_name: row.get(9)?,
      subordinates:  row.get(10)?,
      timestamp:     row.get(11)?,
    })
  }

  pub fn from_user(user: &User) -> Result<Self> {
    Ok(Self {
      user_id:       encode_uuid(user.user_id),
      name:          user.name.clone(),
      sex:           user.sex.clone(),
      phone:         user.phone.clone(),
      email:         user.email.clone(),
      rank:          user.rank.clone(),
      start_date:    encode_dt(user.start_date),
      avatar:        user.avatar.clone(),
      superior:      user.superior.map(encode_uuid),
      superior_name: user.superior_name.clone(),
      subordinates:  encode_ids(&user.subordinates)?,
      timestamp:     user.timestamp.clone(),
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:       decode_uuid(&self.user_id)?,
      name:          self.name,
      sex:           self.sex,
      phone:         self.phone,
      email:         self.email,
      rank:          self.rank,
      start_date:    decode_dt(&self.start_date)?,
      avatar:        self.avatar,
      superior:      self.superior.as_deref().map(decode_uuid).transpose()?,
      superior_name: self.superior_name,
      subordinates:  decode_ids(&self.subordinates)?,
      timestamp:     self.timestamp,
    })
  }
}
