pub mod catalog_list;
pub mod entry_detail;
