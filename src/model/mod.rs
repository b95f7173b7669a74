//! Database models module
//!
//! All entity structs are consolidated in models.rs,
//! with table.rs holding the generic table handle.

mod models;
mod table;

pub use models::*;

pub use table::Table;
