pub mod add;
pub mod auth_cmd;
pub mod common;
pub mod completions;
pub mod config;
pub mod delete;
pub mod list;
pub mod log;
pub mod move_item;
pub mod start;
pub mod sync;
