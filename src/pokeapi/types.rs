use serde::{Deserialize, Serialize};

/// Summary of an entry for list views
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListItem {
  pub id: u32,
  pub name: String,
  /// Resource URL on the remote service, when it reported one
  pub url: Option<String>,
}

/// One page of the catalog listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListPage {
  pub total_count: u32,
  pub items: Vec<ListItem>,
}

/// Full entry details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detail {
  pub id: u32,
  pub name: String,
  pub height: u32,
  pub weight: u32,
  pub base_experience: Option<u32>,
  pub types: Vec<String>,
  pub abilities: Vec<String>,
  pub sprite_url: Option<String>,
  pub artwork_url: Option<String>,
}

impl Detail {
  /// The list row this record would appear as.
  pub fn to_list_item(&self) -> ListItem {
    ListItem {
      id: self.id,
      name: self.name.clone(),
      url: None,
    }
  }
}
