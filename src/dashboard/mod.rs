//! Dashboard UI Module
//!
//! Desktop front end: open a document, rotate it, run an extraction on a
//! background thread and inspect the grounded result.

pub mod app;
pub mod components;
pub mod state;
pub mod theme;
pub mod views;

pub use app::run_dashboard;
