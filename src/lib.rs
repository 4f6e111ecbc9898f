//! SHELF application library: the books module and its dashboard.

pub mod app;
pub mod dashboard;
pub mod modules;
pub mod utils;

pub use app::Application;
