pub mod add;
pub mod delete;
pub mod edit;
pub mod import;
pub mod lifecycle;
pub mod list;
pub mod show;
pub mod stats;
pub mod theme;
pub mod tui;
