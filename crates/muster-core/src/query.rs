//! Query and pagination types for listing users.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Page size used when a query does not set one.
pub const DEFAULT_PAGE_SIZE: u64 = 10;

// ─── Sort order ──────────────────────────────────────────────────────────────

/// The fixed set of orderings a listing can request, addressed by index.
///
/// The discriminants are the indices clients send; they must not be
/// reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
  TimestampDesc    = 0,
  NameAsc          = 1,
  NameDesc         = 2,
  SexAsc           = 3,
  SexDesc          = 4,
  RankAsc          = 5,
  RankDesc         = 6,
  StartDateAsc     = 7,
  StartDateDesc    = 8,
  PhoneAsc         = 9,
  PhoneDesc        = 10,
  EmailAsc         = 11,
  EmailDesc        = 12,
  SuperiorNameAsc  = 13,
  SuperiorNameDesc = 14,
}

impl SortOrder {
  pub const ALL: [SortOrder; 15] = [
    Self::TimestampDesc,
    Self::NameAsc,
    Self::NameDesc,
    Self::SexAsc,
    Self::SexDesc,
    Self::RankAsc,
    Self::RankDesc,
    Self::StartDateAsc,
    Self::StartDateDesc,
    Self::PhoneAsc,
    Self::PhoneDesc,
    Self::EmailAsc,
    Self::EmailDesc,
    Self::SuperiorNameAsc,
    Self::SuperiorNameDesc,
  ];

  /// Look up a sort order by its client-facing index.
  pub fn from_index(index: usize) -> Option<Self> { Self::ALL.get(index).copied() }

  pub fn index(self) -> usize { self as usize }

  /// The field this order sorts on.
  pub fn field(self) -> SortField {
    match self {
      Self::TimestampDesc => SortField::Timestamp,
      Self::NameAsc | Self::NameDesc => SortField::Name,
      Self::SexAsc | Self::SexDesc => SortField::Sex,
      Self::RankAsc | Self::RankDesc => SortField::Rank,
      Self::StartDateAsc | Self::StartDateDesc => SortField::StartDate,
      Self::PhoneAsc | Self::PhoneDesc => SortField::Phone,
      Self::EmailAsc | Self::EmailDesc => SortField::Email,
      Self::SuperiorNameAsc | Self::SuperiorNameDesc => SortField::SuperiorName,
    }
  }

  pub fn is_descending(self) -> bool {
    matches!(
      self,
      Self::TimestampDesc
        | Self::NameDesc
        | Self::SexDesc
        | Self::RankDesc
        | Self::StartDateDesc
        | Self::PhoneDesc
        | Self::EmailDesc
        | Self::SuperiorNameDesc
    )
  }
}

/// A sortable user field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
  Timestamp,
  Name,
  Sex,
  Rank,
  StartDate,
  Phone,
  Email,
  SuperiorName,
}

// ─── Query ───────────────────────────────────────────────────────────────────

/// Parameters for [`crate::store::DirectoryStore::get_users`].
#[derive(Debug, Clone, Default)]
pub struct UserQuery {
  /// Case-insensitive substring matched against name, rank, sex, phone,
  /// email and superior name. `None` or empty matches everything.
  pub search_text: Option<String>,
  /// Restrict to direct subordinates of this user.
  pub superior_id: Option<Uuid>,
  /// `None` returns records in insertion order.
  pub sort:        Option<SortOrder>,
  /// 1-based page number; defaults to 1.
  pub page:        Option<u64>,
  /// Defaults to [`DEFAULT_PAGE_SIZE`].
  pub limit:       Option<u64>,
}

impl UserQuery {
  pub fn page(&self) -> u64 { self.page.unwrap_or(1).max(1) }

  pub fn limit(&self) -> u64 { self.limit.unwrap_or(DEFAULT_PAGE_SIZE) }

  /// Number of matching rows to skip before the requested page. Saturates
  /// for page numbers past the addressable range.
  pub fn offset(&self) -> u64 { (self.page() - 1).saturating_mul(self.limit()) }
}

// ─── Page ────────────────────────────────────────────────────────────────────

/// One page of results plus the bookkeeping clients use to navigate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
  pub docs:           Vec<T>,
  pub total_docs:     u64,
  pub limit:          u64,
  pub page:           u64,
  pub total_pages:    u64,
  /// 1-based position of the first doc on this page within the full result.
  pub paging_counter: u64,
  pub has_prev_page:  bool,
  pub has_next_page:  bool,
  pub prev_page:      Option<u64>,
  pub next_page:      Option<u64>,
}

impl<T> Page<T> {
  /// Assemble a page from its docs and the total match count.
  ///
  /// A zero `limit` yields a single empty page carrying only the count.
  pub fn new(docs: Vec<T>, total_docs: u64, page: u64, limit: u64) -> Self {
    let page = page.max(1);
    let total_pages = if limit == 0 {
      1
    } else {
      total_docs.div_ceil(limit).max(1)
    };
    let has_prev_page = page > 1;
    let has_next_page = page < total_pages;
    Self {
      docs,
      total_docs,
      limit,
      page,
      total_pages,
      paging_counter: (page - 1).saturating_mul(limit).saturating_add(1),
      has_prev_page,
      has_next_page,
      prev_page: has_prev_page.then(|| page - 1),
      next_page: has_next_page.then(|| page + 1),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn sort_indices_match_discriminants() {
    for (i, order) in SortOrder::ALL.iter().enumerate() {
      assert_eq!(order.index(), i);
      assert_eq!(SortOrder::from_index(i), Some(*order));
    }
    assert_eq!(SortOrder::from_index(15), None);
  }

  #[test]
  fn sort_order_fields_and_direction() {
    assert!(SortOrder::TimestampDesc.is_descending());
    assert_eq!(SortOrder::from_index(1).unwrap().field(), SortField::Name);
    assert!(!SortOrder::NameAsc.is_descending());
    assert!(SortOrder::SuperiorNameDesc.is_descending());
    assert_eq!(SortOrder::SuperiorNameDesc.field(), SortField::SuperiorName);
  }

  #[test]
  fn query_defaults() {
    let q = UserQuery::default();
    assert_eq!(q.page(), 1);
    assert_eq!(q.limit(), DEFAULT_PAGE_SIZE);
    assert_eq!(q.offset(), 0);

    let q = UserQuery { page: Some(3), limit: Some(5), ..UserQuery::default() };
    assert_eq!(q.offset(), 10);
  }

  #[test]
  fn huge_page_numbers_saturate() {
    let q = UserQuery { page: Some(u64::MAX), limit: Some(10), ..UserQuery::default() };
    assert_eq!(q.offset(), u64::MAX);

    let page: Page<u8> = Page::new(vec![], 3, u64::MAX, 10);
    assert_eq!(page.paging_counter, u64::MAX);
    assert!(page.has_prev_page);
    assert!(!page.has_next_page);
    assert_eq!(page.next_page, None);
  }

  #[test]
  fn page_bookkeeping() {
    let page = Page::new(vec![1, 2], 12, 3, 5);
    assert_eq!(page.total_pages, 3);
    assert_eq!(page.paging_counter, 11);
    assert!(page.has_prev_page);
    assert!(!page.has_next_page);
    assert_eq!(page.prev_page, Some(2));
    assert_eq!(page.next_page, None);
  }

  #[test]
  fn empty_result_is_one_page() {
    let page: Page<u8> = Page::new(vec![], 0, 1, 10);
    assert_eq!(page.total_pages, 1);
    assert!(!page.has_next_page);
    assert!(!page.has_prev_page);
  }

  #[test]
  fn zero_limit_reports_count_only() {
    let page: Page<u8> = Page::new(vec![], 42, 1, 0);
    assert_eq!(page.total_docs, 42);
    assert_eq!(page.total_pages, 1);
    assert!(page.docs.is_empty());
  }
}
