pub mod list_item;
pub mod schema;
pub mod task;
