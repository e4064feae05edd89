pub mod data_table;
pub mod graphs;
pub mod header;
pub mod layout;
pub mod sidebar;
