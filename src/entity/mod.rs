//! SeaORM entity definitions for PostgreSQL database.

pub mod inspection;
pub mod inspection_item;
pub mod inspection_item_name;
pub mod inspection_name;
pub mod label;
