//! Dashboard views

pub mod document;
pub mod results;
pub mod settings;

pub use document::render_document_view;
pub use results::render_results_view;
pub use settings::render_settings_view;
