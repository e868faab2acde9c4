// Presentation layer - HTTP handlers, state and error rendering
pub mod app_state;
pub mod error;
pub mod handlers;
