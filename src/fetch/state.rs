use crate::pokeapi::types::{Detail, ListItem};

/// Entries per list page.
pub const PAGE_SIZE: u32 = 20;

/// Where the current result set sits in the full listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
  pub current_page: u32,
  /// `None` until the first page has been loaded
  pub total_pages: Option<u32>,
  pub total_count: u32,
  pub page_size: u32,
}

impl Default for Pagination {
  fn default() -> Self {
    Self {
      current_page: 1,
      total_pages: None,
      total_count: 0,
      page_size: PAGE_SIZE,
    }
  }
}

impl Pagination {
  pub fn for_page(page: u32, total_count: u32) -> Self {
    Self {
      current_page: page,
      total_pages: Some(total_count.div_ceil(PAGE_SIZE)),
      total_count,
      page_size: PAGE_SIZE,
    }
  }

  /// A single search hit shown on its own page.
  pub fn single_result() -> Self {
    Self::for_page(1, 1)
  }

  /// Whether `page` may be requested. The page count bounds it once known,
  /// and the page's offset must always be representable.
  pub fn accepts(&self, page: u32) -> bool {
    let in_range = match self.total_pages {
      Some(total) => page <= total,
      None => true,
    };
    page >= 1 && in_range && Self::offset_of(page).is_some()
  }

  /// Offset of the first entry on `page`, or `None` if it overflows.
  pub fn offset_of(page: u32) -> Option<u32> {
    page.saturating_sub(1).checked_mul(PAGE_SIZE)
  }
}

/// Everything the presentation layer renders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogState {
  pub items: Vec<ListItem>,
  pub selected: Option<Detail>,
  /// True only while a remote call is outstanding
  pub loading: bool,
  pub error: Option<String>,
  pub pagination: Pagination,
  pub search_term: String,
}
