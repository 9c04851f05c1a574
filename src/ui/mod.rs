//! Ratatui front-end. `app` owns the state machine and drawing, `terminal`
//! the raw-mode event loop; the remaining modules hold per-screen state and
//! small rendering helpers.

mod app;
mod forms;
mod helpers;
mod screens;
mod terminal;

pub use app::App;
pub use terminal::run_app;
