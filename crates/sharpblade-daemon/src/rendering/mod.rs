//! Rendering module for the touchpad dashboard.

mod canvas;
mod dashboard;

pub use canvas::Canvas;
pub use dashboard::Dashboard;
