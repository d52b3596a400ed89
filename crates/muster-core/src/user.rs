//! User records — the single entity of the Muster directory.
//!
//! A user carries personnel details plus both halves of the chain of
//! command: a pointer to its superior and a denormalized list of its
//! subordinates. The two halves are maintained by separate calls and are not
//! kept consistent by the store.

use chrono::{DateTime, Datelike, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Avatar assigned when a record is created without one.
pub const DEFAULT_AVATAR: &str = "../../public/avatar/default.png";

// ─── User ────────────────────────────────────────────────────────────────────

/// A personnel record as stored.
///
/// Field names on the wire follow the legacy document layout (`startdate`,
/// `superiorname`, `Timestamp`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub user_id:       Uuid,
  pub name:          String,
  pub sex:           String,
  pub phone:         String,
  pub email:         String,
  pub rank:          String,
  #[serde(rename = "startdate")]
  pub start_date:    DateTime<Utc>,
  pub avatar:        String,
  /// The direct superior, if any.
  pub superior:      Option<Uuid>,
  /// Cached copy of the superior's name; not refreshed when the superior is
  /// renamed.
  #[serde(rename = "superiorname")]
  pub superior_name: Option<String>,
  pub subordinates:  Vec<Uuid>,
  /// Creation stamp; see [`creation_stamp`].
  #[serde(rename = "Timestamp")]
  pub timestamp:     String,
}

/// Render the creation stamp stored on every new record.
///
/// The components are concatenated without separators or zero padding, so
/// 2024-03-05 07:08:09 becomes `"202435789"`. Sorting on this string is only
/// loosely chronological.
pub fn creation_stamp(at: NaiveDateTime) -> String {
  format!(
    "{}{}{}{}{}{}",
    at.year(),
    at.month(),
    at.day(),
    at.hour(),
    at.minute(),
    at.second()
  )
}

// ─── NewUser ─────────────────────────────────────────────────────────────────

/// Input to [`crate::store::DirectoryStore::create_user`].
///
/// Identity, creation stamp and the empty subordinate list are always set by
/// the store.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
  pub name:          String,
  pub sex:           String,
  pub phone:         String,
  pub email:         String,
  pub rank:          String,
  /// Defaults to the creation time.
  pub start_date:    Option<DateTime<Utc>>,
  /// Defaults to [`DEFAULT_AVATAR`].
  pub avatar:        Option<String>,
  pub superior:      Option<Uuid>,
  pub superior_name: Option<String>,
}

impl NewUser {
  /// Reject the record if any required field is empty. This is the only
  /// validation the directory performs.
  pub fn validate(&self) -> Result<()> {
    let required = [
      ("name", &self.name),
      ("sex", &self.sex),
      ("phone", &self.phone),
      ("email", &self.email),
      ("rank", &self.rank),
    ];
    match required.into_iter().find(|(_, v)| v.is_empty()) {
      Some((field, _)) => Err(Error::MissingField(field)),
      None => Ok(()),
    }
  }
}

// ─── UserUpdate ──────────────────────────────────────────────────────────────

/// What an update does to the superior pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SuperiorChange {
  /// Leave `superior` and `superior_name` as they are.
  #[default]
  Keep,
  /// Null `superior` and `superior_name` together.
  Clear,
  /// Overwrite whichever half is `Some`.
  Assign {
    superior_id:   Option<Uuid>,
    superior_name: Option<String>,
  },
}

impl SuperiorChange {
  /// Interpret the raw string pair submitted by a client.
  ///
  /// An empty string in *either* position clears both fields. Absent values
  /// are left untouched.
  pub fn from_raw(
    superior: Option<&str>,
    superior_name: Option<&str>,
  ) -> Result<Self> {
    if superior == Some("") || superior_name == Some("") {
      return Ok(Self::Clear);
    }
    if superior.is_none() && superior_name.is_none() {
      return Ok(Self::Keep);
    }
    let superior_id = superior
      .map(|s| Uuid::parse_str(s).map_err(|_| Error::InvalidId(s.to_owned())))
      .transpose()?;
    Ok(Self::Assign {
      superior_id,
      superior_name: superior_name.map(str::to_owned),
    })
  }
}

/// Input to [`crate::store::DirectoryStore::update_user_by_id`].
/// `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
  pub name:       Option<String>,
  pub sex:        Option<String>,
  pub phone:      Option<String>,
  pub email:      Option<String>,
  pub rank:       Option<String>,
  pub start_date: Option<DateTime<Utc>>,
  pub avatar:     Option<String>,
  pub superior:   SuperiorChange,
}
