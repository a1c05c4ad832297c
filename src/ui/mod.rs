mod app;
mod theme;
mod views;

pub use app::TimetableApp;
pub use theme::{setup_fonts, setup_theme};
